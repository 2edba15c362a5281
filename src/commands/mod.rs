use std::path::PathBuf;

use clap::Args;

use stagehand::confirm::ConfirmMode;
use stagehand::context::{ExecContext, MAX_VERBOSITY};

pub type CmdResult<T> = stagehand::Result<(T, i32)>;

/// Flags shared by every subcommand.
#[derive(Args, Debug, Default)]
pub(crate) struct GlobalArgs {
    /// Answer "yes" to every confirmation
    #[arg(short = 'y', long, global = true)]
    pub assume_yes: bool,

    /// Answer "no" to every confirmation (stops at the first one)
    #[arg(long, global = true)]
    pub assume_no: bool,

    /// Answer "skip" to every confirmation
    #[arg(long, global = true)]
    pub assume_skip: bool,

    /// Project root to operate on (defaults to the current directory)
    #[arg(long, value_name = "DIR", global = true)]
    pub working_directory: Option<String>,

    /// Increase verbosity; -vvv logs every external command
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl GlobalArgs {
    /// Resolve `--working-directory`, expanding `~`. The directory must exist.
    pub fn project_root(&self) -> stagehand::Result<PathBuf> {
        let Some(raw) = &self.working_directory else {
            return std::env::current_dir().map_err(|e| {
                stagehand::Error::internal_io(e.to_string(), Some("read current directory".to_string()))
            });
        };

        let expanded = shellexpand::tilde(raw).to_string();
        let path = PathBuf::from(&expanded);
        if !path.is_dir() {
            return Err(stagehand::Error::validation_invalid_argument(
                "working-directory",
                format!("{} is not a directory", expanded),
            ));
        }
        Ok(path)
    }

    pub fn context(&self) -> stagehand::Result<ExecContext> {
        let mode = ConfirmMode::from_flags(self.assume_yes, self.assume_no, self.assume_skip)?;
        Ok(ExecContext::new(self.project_root()?, mode).with_verbosity(self.verbose.min(MAX_VERBOSITY)))
    }
}

pub mod build;
pub mod init;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
    ($args:expr, $global:expr, $action:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global, $action))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (stagehand::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::Init(args) => dispatch!(args, global, init),
        crate::Commands::Build(args) => dispatch!(args, global, stagehand::build::Action::Build, build),
        crate::Commands::Update(args) => dispatch!(args, global, stagehand::build::Action::Update, build),
    }
}
