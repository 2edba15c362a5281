use std::path::PathBuf;

use clap::Args;

use stagehand::build::{self, Action, BuildOptions};
use stagehand::BuildReport;

use super::{CmdResult, GlobalArgs};

#[derive(Args, Debug, Default)]
pub struct BuildArgs {
    /// Do not run composer on the project, libraries or extensions
    #[arg(long)]
    pub skip_composer: bool,

    /// Leave existing checkouts as they are instead of resetting and pulling
    #[arg(long)]
    pub skip_git_reset: bool,

    /// Clone with --single-branch --depth=1
    #[arg(long)]
    pub git_shallow: bool,

    /// Keep the existing authors and reuse the primary author's token
    #[arg(long)]
    pub skip_create_author: bool,

    #[arg(long)]
    pub skip_enable_extensions: bool,

    #[arg(long)]
    pub skip_seeders: bool,

    /// Do not run .stagehand/postbuild.sh
    #[arg(long)]
    pub skip_postbuild: bool,

    #[arg(long)]
    pub skip_import_sections: bool,

    /// Drop every table before importing. Destructive
    #[arg(long)]
    pub database_drop_tables: bool,

    /// Dump the database to PATH before any drop or import
    #[arg(long, value_name = "PATH")]
    pub database_create_backup: Option<PathBuf>,

    #[arg(long)]
    pub database_skip_import_structure: bool,

    #[arg(long)]
    pub database_skip_import_data: bool,

    /// Run the platform's pending migrations
    #[arg(long)]
    pub run_migrations: bool,
}

impl From<BuildArgs> for BuildOptions {
    fn from(args: BuildArgs) -> Self {
        Self {
            skip_composer: args.skip_composer,
            skip_git_reset: args.skip_git_reset,
            git_shallow: args.git_shallow,
            skip_create_author: args.skip_create_author,
            skip_enable_extensions: args.skip_enable_extensions,
            skip_seeders: args.skip_seeders,
            skip_postbuild: args.skip_postbuild,
            skip_import_sections: args.skip_import_sections,
            database_drop_tables: args.database_drop_tables,
            database_create_backup: args.database_create_backup,
            database_skip_import_structure: args.database_skip_import_structure,
            database_skip_import_data: args.database_skip_import_data,
            run_migrations: args.run_migrations,
        }
    }
}

pub fn run(args: BuildArgs, global: &GlobalArgs, action: Action) -> CmdResult<BuildReport> {
    let ctx = global.context()?;
    Ok((build::run(&ctx, action, args.into())?, 0))
}
