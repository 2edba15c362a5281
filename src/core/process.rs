//! External command execution with consistent error handling.
//!
//! Every git, composer, mysql and platform-console call goes through a
//! [`Runner`]. Output is fully buffered; a non-zero exit becomes
//! `process.failed` carrying the rendered command and captured stderr, and a
//! process that cannot be spawned becomes `process.launch_failed`.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use serde::Serialize;

use crate::error::{Error, ErrorCode, Result};
use crate::shell;

/// Captured output from a finished command.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CapturedOutput {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stderr: String,
}

impl CapturedOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
    /// Left out of the rendered command line.
    pub secret: bool,
}

/// One external command: program, arguments, and where/how to run it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
    pub envs: Vec<EnvVar>,
    pub stdin_file: Option<PathBuf>,
    script: bool,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            envs: Vec::new(),
            stdin_file: None,
            script: false,
        }
    }

    /// A shell pipeline run through `shell -c`.
    pub fn script(shell: impl Into<String>, script: impl Into<String>) -> Self {
        let mut invocation = Self::new(shell);
        invocation.args = vec!["-c".to_string(), script.into()];
        invocation.script = true;
        invocation
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push(EnvVar {
            key: key.into(),
            value: value.into(),
            secret: false,
        });
        self
    }

    pub fn secret_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push(EnvVar {
            key: key.into(),
            value: value.into(),
            secret: true,
        });
        self
    }

    pub fn stdin_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin_file = Some(path.into());
        self
    }

    /// The script body for pipelines, otherwise `None`.
    pub fn script_body(&self) -> Option<&str> {
        if self.script {
            self.args.get(1).map(String::as_str)
        } else {
            None
        }
    }

    /// Command line as shown in logs and errors. Secret env values never appear.
    pub fn display(&self) -> String {
        let mut parts: Vec<String> = self
            .envs
            .iter()
            .filter(|e| !e.secret)
            .map(|e| format!("{}={}", e.key, shell::quote_arg(&e.value)))
            .collect();

        match self.script_body() {
            Some(body) => parts.push(body.to_string()),
            None => parts.push(shell::render_command(&self.program, &self.args)),
        }

        let mut rendered = parts.join(" ");
        if let Some(stdin) = &self.stdin_file {
            rendered.push_str(&format!(" < {}", shell::quote_arg(&stdin.to_string_lossy())));
        }
        rendered
    }

    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.envs
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }
}

/// Executes invocations. The seam every stage runs external tools through.
pub trait Runner {
    fn run(&self, invocation: &Invocation) -> Result<CapturedOutput>;
}

/// Runs invocations as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Runner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<CapturedOutput> {
        let rendered = invocation.display();
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);

        if let Some(dir) = &invocation.current_dir {
            cmd.current_dir(dir);
        }

        for var in &invocation.envs {
            cmd.env(&var.key, &var.value);
        }

        match &invocation.stdin_file {
            Some(path) => {
                let file = File::open(path)
                    .map_err(|e| Error::process_launch_failed(&rendered, e.to_string()))?;
                cmd.stdin(Stdio::from(file));
            }
            None => {
                cmd.stdin(Stdio::null());
            }
        }

        let output = cmd
            .output()
            .map_err(|e| Error::process_launch_failed(&rendered, e.to_string()))?;

        into_captured(&rendered, output)
    }
}

fn into_captured(rendered: &str, output: Output) -> Result<CapturedOutput> {
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if !output.status.success() {
        return Err(Error::process_failed(
            rendered,
            output.status.code().unwrap_or(-1),
            stdout,
            stderr,
        ));
    }

    Ok(CapturedOutput { stdout, stderr })
}

/// Check a program can be launched by running `program --version`.
pub fn require_program(runner: &dyn Runner, program: &str) -> Result<()> {
    match runner.run(&Invocation::new(program).arg("--version")) {
        Ok(_) => Ok(()),
        Err(e) if e.code == ErrorCode::ProcessLaunchFailed => {
            Err(Error::tool_unavailable(program, e.message))
        }
        Err(e) => Err(Error::tool_unavailable(program, e.detail())),
    }
}

/// True when `path` holds a manifest for `file_name` (e.g. `composer.json`).
pub fn has_manifest(path: &Path, file_name: &str) -> bool {
    path.join(file_name).is_file()
}
