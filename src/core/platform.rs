//! The platform's own command surface: the console binary inside the project
//! and the section importer.
//!
//! Console calls run with the docroot and pre-boot config in the environment
//! and authenticate with the administrative token.

use std::fs;
use std::path::PathBuf;

use serde::Serialize;

use crate::context::ExecContext;
use crate::error::{Error, Result};
use crate::process::Invocation;
use crate::project::ProjectLayout;
use crate::shell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionAction {
    Install,
    Uninstall,
    Enable,
    Disable,
}

impl ExtensionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtensionAction::Install => "install",
            ExtensionAction::Uninstall => "uninstall",
            ExtensionAction::Enable => "enable",
            ExtensionAction::Disable => "disable",
        }
    }
}

pub struct Console<'a> {
    ctx: &'a ExecContext,
    token: &'a str,
}

impl<'a> Console<'a> {
    pub fn new(ctx: &'a ExecContext, token: &'a str) -> Self {
        Self { ctx, token }
    }

    fn environment(&self) -> [(&'static str, String); 3] {
        let layout = self.ctx.layout();
        let platform = &self.ctx.defaults().platform;
        [
            (
                "SYMPHONY_DOCROOT",
                layout.resolve(&platform.docroot).to_string_lossy().to_string(),
            ),
            ("symphony_enable_preboot", "1".to_string()),
            (
                "symphony_preboot_config",
                layout.resolve(&platform.preboot_config).to_string_lossy().to_string(),
            ),
        ]
    }

    fn console(&self) -> Invocation {
        let binary = self.ctx.layout().resolve(&self.ctx.defaults().platform.console);
        let mut invocation = Invocation::new(binary.to_string_lossy());
        for (key, value) in self.environment() {
            invocation = invocation.env(key, value);
        }
        invocation
    }

    fn companion(&self) -> &str {
        &self.ctx.defaults().platform.companion_name
    }

    pub fn extension_invocation(&self, action: ExtensionAction, name: &str) -> Invocation {
        self.console()
            .args([self.companion(), "extension", action.as_str(), name])
            .arg(format!("--token={}", self.token))
    }

    pub fn extension(&self, action: ExtensionAction, name: &str) -> Result<()> {
        self.ctx.run(&self.extension_invocation(action, name))?;
        Ok(())
    }

    pub fn seed(&self) -> Result<()> {
        self.ctx.run(
            &self
                .console()
                .arg(format!("--token={}", self.token))
                .args([self.companion(), "seed"]),
        )?;
        Ok(())
    }

    pub fn migrate(&self) -> Result<()> {
        self.ctx.run(
            &self
                .console()
                .arg(format!("--token={}", self.token))
                .args([self.companion(), "migrate"]),
        )?;
        Ok(())
    }

    /// Write `bin/extension`, forwarding its arguments to the console's
    /// extension command with this token.
    pub fn write_helper_scripts(&self) -> Result<Vec<PathBuf>> {
        let layout = self.ctx.layout();
        let bin = layout.bin_dir();
        fs::create_dir_all(&bin)
            .map_err(|e| Error::internal_io(e.to_string(), Some(format!("create {}", bin.display()))))?;

        let env: Vec<String> = self
            .environment()
            .iter()
            .map(|(key, value)| format!("{}={}", key, shell::quote_arg(value)))
            .collect();
        let binary = layout.resolve(&self.ctx.defaults().platform.console);
        let script = format!(
            "#!/usr/bin/env sh\n{} {} {} -t {} extension \"$@\"\n",
            env.join(" "),
            shell::quote_path(&binary.to_string_lossy()),
            shell::quote_arg(self.companion()),
            shell::quote_arg(self.token),
        );

        let path = bin.join("extension");
        fs::write(&path, script)
            .map_err(|e| Error::internal_io(e.to_string(), Some(format!("write {}", path.display()))))?;
        make_executable(&path)?;
        Ok(vec![path])
    }
}

#[cfg(unix)]
fn make_executable(path: &std::path::Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(|e| Error::internal_io(e.to_string(), Some(format!("chmod {}", path.display()))))
}

#[cfg(not(unix))]
fn make_executable(_path: &std::path::Path) -> Result<()> {
    Ok(())
}

/// Run the section importer against `.stagehand/sections.json`.
pub fn import_sections_invocation(ctx: &ExecContext, layout: &ProjectLayout) -> Invocation {
    let platform = &ctx.defaults().platform;
    Invocation::new(layout.resolve(&platform.section_importer).to_string_lossy())
        .arg("-j")
        .arg(layout.sections().to_string_lossy())
        .arg(format!("--symphony={}", layout.resolve(&platform.docroot).display()))
        .arg(format!("--manifest={}", layout.output_manifest_dir().display()))
}

pub fn import_sections(ctx: &ExecContext) -> Result<()> {
    ctx.run(&import_sections_invocation(ctx, &ctx.layout()))?;
    Ok(())
}
