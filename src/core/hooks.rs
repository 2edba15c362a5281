//! Project hook scripts run at the end of a build.

use serde::Serialize;

use crate::context::ExecContext;
use crate::error::Result;
use crate::process::Invocation;

pub const PROJECT_ROOT_ENV: &str = "STAGEHAND_PROJECT_ROOT";
pub const AUTHOR_TOKEN_ENV: &str = "STAGEHAND_AUTHOR_TOKEN";

/// Result of running a hook script.
#[derive(Debug, Clone, Serialize)]
pub struct HookRunResult {
    pub script: String,
    pub stdout: String,
    pub stderr: String,
}

/// Run `.stagehand/postbuild.sh` from the project root. `None` when absent.
pub fn run_postbuild(ctx: &ExecContext, token: &str) -> Result<Option<HookRunResult>> {
    let layout = ctx.layout();
    let script = layout.postbuild_hook();
    if !script.is_file() {
        return Ok(None);
    }

    let output = ctx.run(
        &Invocation::new(&ctx.defaults().programs.shell)
            .arg(script.to_string_lossy())
            .current_dir(layout.root())
            .env(PROJECT_ROOT_ENV, layout.root().to_string_lossy())
            .env(AUTHOR_TOKEN_ENV, token),
    )?;

    Ok(Some(HookRunResult {
        script: script.to_string_lossy().to_string(),
        stdout: output.stdout,
        stderr: output.stderr,
    }))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::rc::Rc;

    use super::*;
    use crate::confirm::ConfirmMode;
    use crate::context::testing::context;
    use crate::context::ExecContext;
    use crate::process::testing::ScriptedRunner;
    use crate::prompt::testing::ScriptedPrompter;

    #[test]
    fn absent_hook_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Rc::new(ScriptedRunner::ok());
        let ctx = context(dir.path(), ConfirmMode::AssumeYes, Rc::clone(&runner), Rc::new(ScriptedPrompter::silent()));
        assert!(run_postbuild(&ctx, "tok").unwrap().is_none());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn hook_runs_with_project_environment() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".stagehand")).unwrap();
        fs::write(
            dir.path().join(".stagehand/postbuild.sh"),
            "echo \"$STAGEHAND_AUTHOR_TOKEN in $(basename \"$STAGEHAND_PROJECT_ROOT\")\"\n",
        )
        .unwrap();

        let ctx = ExecContext::new(dir.path(), ConfirmMode::AssumeYes)
            .with_defaults(Default::default())
            .with_prompter(Box::new(ScriptedPrompter::silent()));
        let result = run_postbuild(&ctx, "abcd1234").unwrap().unwrap();

        let name = dir.path().file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(result.stdout, format!("abcd1234 in {}", name));
    }
}
