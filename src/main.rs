//! qfrun - run QF-Test suites from a CI job
//!
//! Assembles QF-Test command lines from a job file, runs them and maps
//! the outcome to a build result the calling CI system understands.

use std::path::PathBuf;

use clap::Parser;
use qfrun::{cli, commands::Commands, common::logging};

#[derive(Parser)]
#[command(name = "qfrun", about = "Run QF-Test suites and generate reports")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Use this configuration file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_cli(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    match cli::dispatch(cli.command, cli.config.as_deref()).await {
        Ok(result) => std::process::exit(result.exit_code()),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
