//! Dependency installer: clone or refresh one library/extension, run composer
//! on it and delete its cleanup paths.
//!
//! Re-running against an installed dependency is safe: an existing checkout is
//! reset and pulled instead of cloned. A target that exists but is not a
//! checkout is never overwritten.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Serialize;

use crate::composer;
use crate::context::ExecContext;
use crate::error::{Error, Result};
use crate::git;
use crate::manifest::{self, ResolvedDependency};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallFlags {
    pub skip_dependency_manager: bool,
    pub skip_git_reset: bool,
    pub shallow: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOutcome {
    /// No repository declared; the directory is managed by hand.
    NotVersioned,
    Cloned,
    /// Existing checkout reset to its branch and pulled.
    Updated,
    /// Existing checkout left untouched (`--skip-git-reset`).
    Existing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallReport {
    pub source: SourceOutcome,
    pub dependency_manager: bool,
    pub cleaned: Vec<String>,
}

impl InstallReport {
    /// The checkout was already there before this run.
    pub fn already_present(&self) -> bool {
        matches!(self.source, SourceOutcome::Updated | SourceOutcome::Existing)
    }
}

pub fn install(ctx: &ExecContext, dependency: &ResolvedDependency, flags: InstallFlags) -> Result<InstallReport> {
    let source = match &dependency.repository {
        Some(repo) => {
            let target = &dependency.target;
            if target.exists() && git::is_checkout(target) {
                if flags.skip_git_reset {
                    SourceOutcome::Existing
                } else {
                    crate::log_status!("install", "Resetting and updating to {}", repo.branch);
                    git::reset_and_pull(ctx, target, &repo.branch)?;
                    SourceOutcome::Updated
                }
            } else {
                if target.exists() && !is_empty_dir(target) {
                    return Err(Error::package_cannot_clone(&repo.url, target.to_string_lossy()));
                }
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(|e| {
                        Error::internal_io(e.to_string(), Some(format!("create {}", parent.display())))
                    })?;
                }
                git::clone(ctx, &repo.url, target, &repo.branch, flags.shallow)?;
                SourceOutcome::Cloned
            }
        }
        None => SourceOutcome::NotVersioned,
    };

    let mut dependency_manager = false;
    if !flags.skip_dependency_manager && composer::is_installable(&dependency.target) {
        crate::log_status!("install", "Updating composer packages in {}", dependency.target.display());
        composer::update(ctx, &dependency.target)?;
        dependency_manager = true;
    }

    let cleaned = cleanup(&dependency.target, &dependency.cleanup)?;

    Ok(InstallReport {
        source,
        dependency_manager,
        cleaned,
    })
}

/// Delete each relative path under `root`. Missing paths are not an error.
pub fn cleanup(root: &Path, paths: &[String]) -> Result<Vec<String>> {
    let mut removed = Vec::new();
    for path in paths {
        let relative = manifest::relative_path(path, "cleanup")?;
        let full = root.join(relative);

        let metadata = match fs::symlink_metadata(&full) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => {
                return Err(Error::internal_io(e.to_string(), Some(format!("inspect {}", full.display()))))
            }
        };

        crate::log_status!("install", "Cleanup: removing {}", path);
        let result = if metadata.is_dir() {
            fs::remove_dir_all(&full)
        } else {
            fs::remove_file(&full)
        };
        match result {
            Ok(()) => removed.push(path.clone()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(Error::internal_io(e.to_string(), Some(format!("remove {}", full.display()))))
            }
        }
    }
    Ok(removed)
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}
