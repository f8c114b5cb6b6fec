//! CLI command definitions
//!
//! Defines the clap commands for the qfrun CLI.

use clap::Subcommand;
use std::path::PathBuf;

use crate::args::RunMode;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the job's test-suites, then generate reports from the run logs
    Run(JobArgs),

    /// Generate test documentation for the job's test-suites
    Doc(JobArgs),

    /// Print the command line assembled from presets and tokens
    Args {
        /// QF-Test binary placed at the front of the command line
        binary: String,

        /// Run mode: run, genreport or gendoc
        #[arg(long, default_value = "run")]
        mode: RunMode,

        /// Emit KEY[=VALUE] now and drop later occurrences
        #[arg(long, value_name = "KEY[=VALUE]", allow_hyphen_values = true)]
        enforce: Vec<String>,

        /// Drop KEY (and its value when written KEY= or KEY=VALUE)
        #[arg(long = "drop", value_name = "KEY[=VALUE]", allow_hyphen_values = true)]
        drop_args: Vec<String>,

        /// Replace the value following KEY
        #[arg(long, value_name = "KEY=VALUE", allow_hyphen_values = true)]
        overwrite: Vec<String>,

        /// Emit KEY VALUE unless the tokens carry KEY themselves
        #[arg(long, value_name = "KEY=VALUE", allow_hyphen_values = true)]
        default: Vec<String>,

        /// Tokens to append after the presets
        #[arg(last = true)]
        tokens: Vec<String>,
    },

    /// Show the configuration file location and runner settings
    Config,
}

/// Arguments shared by the job commands
#[derive(clap::Args, Debug, Clone)]
pub struct JobArgs {
    /// Job file (TOML, or YAML with a .yaml/.yml extension)
    pub job: PathBuf,

    /// Workspace the suites are resolved against
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Job name (defaults to the job file's `name`, then its file stem)
    #[arg(long)]
    pub job_name: Option<String>,

    /// Build number used for the reports directory and `$BUILD_NUMBER`
    #[arg(long, default_value_t = 1)]
    pub build_number: u64,

    /// Print command lines instead of running QF-Test
    #[arg(long)]
    pub dry_run: bool,

    /// Output the step report as JSON
    #[arg(long)]
    pub json: bool,
}
