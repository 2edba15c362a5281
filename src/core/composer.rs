//! Composer, the dependency manager run on installed packages.

use std::path::Path;

use crate::context::ExecContext;
use crate::error::Result;
use crate::process::{self, Invocation};

pub const MANIFEST: &str = "composer.json";

/// Production-mode flags: no dev packages, prompts, progress or scripts.
pub const UPDATE_FLAGS: [&str; 8] = [
    "-v",
    "--no-ansi",
    "--no-interaction",
    "--no-progress",
    "--no-scripts",
    "--optimize-autoloader",
    "--prefer-dist",
    "--no-cache",
];

pub fn is_installable(path: &Path) -> bool {
    process::has_manifest(path, MANIFEST)
}

pub fn update_invocation(ctx: &ExecContext, path: &Path) -> Invocation {
    let dir = path.to_string_lossy();
    Invocation::new(&ctx.defaults().programs.composer)
        .args(["update", "--no-dev"])
        .arg(format!("--working-dir={}", dir.trim_end_matches('/')))
        .args(UPDATE_FLAGS)
}

/// Run `composer update` in production mode against `path`.
pub fn update(ctx: &ExecContext, path: &Path) -> Result<()> {
    ctx.run(&update_invocation(ctx, path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::confirm::ConfirmMode;
    use crate::context::testing::context;
    use crate::process::testing::ScriptedRunner;
    use crate::prompt::testing::ScriptedPrompter;

    #[test]
    fn update_runs_in_production_mode() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Rc::new(ScriptedRunner::ok());
        let ctx = context(
            dir.path(),
            ConfirmMode::AssumeYes,
            Rc::clone(&runner),
            Rc::new(ScriptedPrompter::silent()),
        );

        update(&ctx, Path::new("/srv/lib/repo/")).unwrap();
        let rendered = runner.rendered().remove(0);
        assert!(rendered.starts_with("composer update --no-dev --working-dir=/srv/lib/repo -v"));
        assert!(rendered.contains("--no-interaction"));
        assert!(rendered.contains("--no-scripts"));
        assert!(rendered.contains("--optimize-autoloader"));
    }

    #[test]
    fn installable_needs_manifest() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_installable(dir.path()));
        std::fs::write(dir.path().join(MANIFEST), "{}").unwrap();
        assert!(is_installable(dir.path()));
    }
}
