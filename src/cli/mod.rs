//! CLI command handling
//!
//! Dispatches CLI commands to the build steps and formats output.

use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::args::{CommandLine, PresetKind, RunMode};
use crate::build::{BuildContext, BuildResult, BuildStep, JobConfig, StepReport};
use crate::commands::{Commands, JobArgs};
use crate::common::{config, paths, Config, Result};
use crate::launcher::{DryRunLauncher, ProcessLauncher, TokioLauncher};

/// Dispatch a CLI command
///
/// Returns the build result; commands that do not run a build report
/// success.
pub async fn dispatch(command: Commands, config_path: Option<&Path>) -> Result<BuildResult> {
    let config = match config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match command {
        Commands::Run(job_args) => run_job(&config, job_args, Step::Tests).await,
        Commands::Doc(job_args) => run_job(&config, job_args, Step::Docs).await,

        Commands::Args {
            binary,
            mode,
            enforce,
            drop_args,
            overwrite,
            default,
            tokens,
        } => {
            let presets = [
                (PresetKind::Enforce, enforce),
                (PresetKind::Default, default),
                (PresetKind::Drop, drop_args),
                (PresetKind::Overwrite, overwrite),
            ];
            let cmd = assemble(binary, mode, &presets, &tokens)?;
            println!("{}", cmd);
            Ok(BuildResult::Success)
        }

        Commands::Config => {
            show_config(&config, config_path);
            Ok(BuildResult::Success)
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Tests,
    Docs,
}

async fn run_job(config: &Config, args: JobArgs, step: Step) -> Result<BuildResult> {
    let job = JobConfig::load(&args.job)?;
    let job_name = args
        .job_name
        .clone()
        .or_else(|| job.name.clone())
        .or_else(|| {
            args.job
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "job".to_string());
    let workspace = args
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| args.workspace.clone());

    let ctx = BuildContext::new(workspace, job_name, args.build_number);
    let launcher: Box<dyn ProcessLauncher> = if args.dry_run {
        tracing::warn!("Dry run: no run logs are written, report generation will fail");
        Box::new(DryRunLauncher)
    } else {
        Box::new(TokioLauncher::new(config.timeouts.run_secs))
    };

    let build = BuildStep::new(config, &job, &ctx, launcher.as_ref());
    let report = match step {
        Step::Tests => build.run_tests().await,
        Step::Docs => build.generate_docs().await,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(report.result)
}

/// Build a command line from `KEY[=VALUE]` presets and raw tokens
///
/// Presets are registered kind by kind in the order given.
pub fn assemble(
    binary: String,
    mode: RunMode,
    presets: &[(PresetKind, Vec<String>)],
    tokens: &[String],
) -> Result<CommandLine> {
    let mut cmd = CommandLine::new(binary, mode);
    for (kind, entries) in presets {
        for entry in entries {
            let (key, value) = split_preset(entry);
            cmd.preset(*kind, key, value)?;
        }
    }
    cmd.add_tokenized(&tokens.join(" "));
    Ok(cmd)
}

/// `-key` has no value, `-key=` an empty one
fn split_preset(entry: &str) -> (&str, Option<&str>) {
    match entry.split_once('=') {
        Some((key, value)) => (key, Some(value)),
        None => (entry, None),
    }
}

fn print_report(report: &StepReport) {
    println!();
    for invocation in &report.invocations {
        let icon = match invocation.result {
            BuildResult::Success => "✓".green(),
            BuildResult::Unstable => "!".yellow(),
            BuildResult::Failure => "✗".red(),
        };
        let exit = invocation
            .exit_code
            .map(|code| format!("exit {}", code))
            .unwrap_or_else(|| "not run".to_string());
        let suite = invocation.suite.as_deref().unwrap_or("run logs");
        println!("  {} {:10} {} ({})", icon, invocation.mode, suite, exit.dimmed());
        if let Some(error) = &invocation.error {
            println!("      {}", error.red());
        }
    }
    for error in &report.errors {
        println!("  {} {}", "✗".red(), error);
    }

    println!();
    let verdict = match report.result {
        BuildResult::Success => report.result.to_string().green().bold(),
        BuildResult::Unstable => report.result.to_string().yellow().bold(),
        BuildResult::Failure => report.result.to_string().red().bold(),
    };
    println!("{} {} #{}", verdict, report.job, report.build_number);
    if let Some(dir) = &report.reports_dir {
        println!("Reports: {}", dir.display());
    }
}

fn show_config(config: &Config, explicit: Option<&Path>) {
    let location: Option<PathBuf> = explicit.map(Path::to_path_buf).or_else(paths::config_path);
    match location {
        Some(path) if path.exists() => println!("Config file: {}", path.display()),
        Some(path) => println!("Config file: {} (not present, using defaults)", path.display()),
        None => println!("Config file: no configuration directory on this platform"),
    }

    match config.platform_runner_path() {
        Some(path) => println!("Runner path: {}", path.display()),
        None => println!("Runner path: not set, searching PATH for {}", config::runner_name()),
    }
    match config.runner_binary(None) {
        Ok(binary) => println!("Runner:      {}", binary.display().to_string().green()),
        Err(e) => println!("Runner:      {}", e.to_string().red()),
    }
    println!("Reports dir: {}", config.reports.directory);
    match config.timeouts.run_secs {
        0 => println!("Run timeout: none"),
        secs => println!("Run timeout: {}s", secs),
    }
}
