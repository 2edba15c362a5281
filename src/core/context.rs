//! Per-run execution context threaded through every stage.

use std::env;
use std::path::{Path, PathBuf};

use crate::confirm::{Answer, ConfirmMode, Gate};
use crate::defaults::{self, Defaults};
use crate::error::{Error, Result};
use crate::process::{CapturedOutput, Invocation, Runner, SystemRunner};
use crate::project::ProjectLayout;
use crate::prompt::{Prompter, StdinPrompter};

pub const MAX_VERBOSITY: u8 = 3;

pub struct ExecContext {
    project_root: PathBuf,
    verbosity: u8,
    defaults: Defaults,
    gate: Gate,
    runner: Box<dyn Runner>,
    superuser: bool,
}

impl ExecContext {
    /// Context with the real process runner, stdin prompts and stagehand.json defaults.
    pub fn new(project_root: impl Into<PathBuf>, mode: ConfirmMode) -> Self {
        Self {
            project_root: project_root.into(),
            verbosity: 0,
            defaults: defaults::load_defaults(),
            gate: Gate::new(mode, Box::new(StdinPrompter)),
            runner: Box::new(SystemRunner::new()),
            superuser: running_as_superuser(),
        }
    }

    pub fn with_runner(mut self, runner: Box<dyn Runner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_prompter(mut self, prompter: Box<dyn Prompter>) -> Self {
        self.gate = Gate::new(self.gate.mode(), prompter);
        self
    }

    pub fn with_defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity.min(MAX_VERBOSITY);
        self
    }

    /// Override superuser detection.
    pub fn with_superuser(mut self, superuser: bool) -> Self {
        self.superuser = superuser;
        self
    }

    pub fn is_superuser(&self) -> bool {
        self.superuser
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn layout(&self) -> ProjectLayout {
        ProjectLayout::new(&self.project_root)
    }

    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    pub fn confirm_mode(&self) -> ConfirmMode {
        self.gate.mode()
    }

    pub fn confirm(&self, question: &str) -> Result<Answer> {
        self.gate.confirm(question)
    }

    pub fn prompt_value(&self, question: &str) -> Result<String> {
        self.gate.prompt_value(question)
    }

    pub fn runner(&self) -> &dyn Runner {
        self.runner.as_ref()
    }

    /// Run an external command, echoing it first at the highest verbosity.
    pub fn run(&self, invocation: &Invocation) -> Result<CapturedOutput> {
        if self.verbosity >= MAX_VERBOSITY {
            crate::log_status!("debug", "[DEBUG] Running command: {}", invocation.display());
        }
        self.runner.run(invocation)
    }

    /// Run `f` with the process working directory set to `dir`.
    ///
    /// The previous directory is restored when `f` returns, fails or panics.
    pub fn with_working_dir<T>(&self, dir: &Path, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let _guard = WorkingDirGuard::enter(dir)?;
        f()
    }
}

#[cfg(unix)]
fn running_as_superuser() -> bool {
    nix::unistd::Uid::effective().is_root()
}

#[cfg(not(unix))]
fn running_as_superuser() -> bool {
    false
}

struct WorkingDirGuard {
    previous: PathBuf,
}

impl WorkingDirGuard {
    fn enter(dir: &Path) -> Result<Self> {
        let previous = env::current_dir()
            .map_err(|e| Error::internal_io(e.to_string(), Some("read working directory".to_string())))?;
        env::set_current_dir(dir).map_err(|e| {
            Error::internal_io(
                e.to_string(),
                Some(format!("change working directory to {}", dir.display())),
            )
        })?;
        Ok(Self { previous })
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        if let Err(e) = env::set_current_dir(&self.previous) {
            crate::log_status!(
                "context",
                "WARNING! Unable to restore working directory {}: {}",
                self.previous.display(),
                e
            );
        }
    }
}

/// Serializes tests that change the process working directory.
#[cfg(test)]
pub(crate) static CWD_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
