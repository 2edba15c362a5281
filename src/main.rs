use clap::{Parser, Subcommand};

use commands::GlobalArgs;

mod commands;
mod output;

use commands::{build, init};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "stagehand")]
#[command(version = VERSION)]
#[command(about = "Build and update Symphony CMS projects from a declarative manifest")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .stagehand/ in the working directory from the bundled template
    Init(init::InitArgs),
    /// Run the full build pipeline
    Build(build::BuildArgs),
    /// Rebuild without touching the database schema, data or authors, then run migrations
    Update(build::BuildArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let (json_result, exit_code) = commands::run_json(cli.command, &cli.global);

    if let Err(err) = &json_result {
        eprintln!("CRITICAL ERROR! {}", err.message);
    }
    if let Err(err) = output::print_json_result(json_result) {
        eprintln!("CRITICAL ERROR! {}", err.message);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
