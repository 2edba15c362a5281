use clap::Args;

use stagehand::project::{self, InitOutput};

use super::{CmdResult, GlobalArgs};

#[derive(Args)]
pub struct InitArgs {
    /// Project name (defaults to the directory name)
    pub name: Option<String>,
}

pub fn run(args: InitArgs, global: &GlobalArgs) -> CmdResult<InitOutput> {
    let ctx = global.context()?;
    let output = project::init(
        &ctx.layout(),
        args.name.as_deref(),
        &ctx.defaults().platform.companion_name,
    )?;
    Ok((output, 0))
}
