//! Idempotent creation of declared directories and symbolic links.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::Serialize;

use crate::context::ExecContext;
use crate::error::{Error, Result};
use crate::manifest::ResolvedSymlink;

/// Result of a create-if-absent step. Existing entries are not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Created,
    AlreadyPresent,
}

/// Create `path` and any missing parents.
pub fn realize_directory(path: &Path) -> Result<Outcome> {
    if path.is_dir() {
        return Ok(Outcome::AlreadyPresent);
    }

    fs::create_dir_all(path).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("create directory {}", path.display())))
    })?;
    Ok(Outcome::Created)
}

/// Create `dest_dir/name -> src`. The link text is written as given, so a
/// relative `src` resolves from `dest_dir`.
pub fn link(ctx: &ExecContext, symlink: &ResolvedSymlink) -> Result<Outcome> {
    if !symlink.dest_dir.is_dir() {
        return Err(Error::symlink_target_missing(symlink.dest_dir.to_string_lossy()));
    }

    if fs::symlink_metadata(symlink.dest_dir.join(&symlink.name)).is_ok() {
        return Ok(Outcome::AlreadyPresent);
    }

    ctx.with_working_dir(&symlink.dest_dir, || {
        match create_symlink(Path::new(&symlink.src), Path::new(&symlink.name)) {
            Ok(()) => Ok(Outcome::Created),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(Outcome::AlreadyPresent),
            Err(e) => Err(Error::internal_io(
                e.to_string(),
                Some(format!("symlink {} -> {}", symlink.name, symlink.src)),
            )),
        }
    })
}

#[cfg(unix)]
fn create_symlink(src: &Path, name: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(src, name)
}

#[cfg(windows)]
fn create_symlink(src: &Path, name: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(src, name)
}
