//! Git operations used by the dependency installer.

use std::path::Path;

use crate::context::ExecContext;
use crate::error::Result;
use crate::process::Invocation;

/// Flags added to `git clone` for shallow installs.
pub const SHALLOW_FLAGS: [&str; 2] = ["--single-branch", "--depth=1"];

/// True when `path` holds a git checkout (`.git` directory or worktree file).
pub fn is_checkout(path: &Path) -> bool {
    path.join(".git").exists()
}

pub fn clone_invocation(
    ctx: &ExecContext,
    url: &str,
    destination: &Path,
    branch: &str,
    shallow: bool,
) -> Invocation {
    let mut invocation = Invocation::new(&ctx.defaults().programs.git).arg("clone");
    if shallow {
        invocation = invocation.args(SHALLOW_FLAGS);
    }
    invocation
        .args(["-b", branch, url])
        .arg(destination.to_string_lossy())
}

/// Clone `url` at `branch` into `destination`.
pub fn clone(ctx: &ExecContext, url: &str, destination: &Path, branch: &str, shallow: bool) -> Result<()> {
    ctx.run(&clone_invocation(ctx, url, destination, branch, shallow))?;
    Ok(())
}

/// Hard-reset an existing checkout to `branch` and pull from origin.
pub fn reset_and_pull(ctx: &ExecContext, path: &Path, branch: &str) -> Result<()> {
    let git = &ctx.defaults().programs.git;
    ctx.run(
        &Invocation::new(git)
            .args(["reset", "--hard", branch])
            .current_dir(path),
    )?;
    ctx.run(
        &Invocation::new(git)
            .args(["pull", "origin", branch])
            .current_dir(path),
    )?;
    Ok(())
}
