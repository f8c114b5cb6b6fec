//! Build steps: run suites, generate reports, generate documentation
//!
//! Suites run one after another; each invocation is awaited before the
//! next starts. Nothing in here aborts a build with an error: problems are
//! logged and turned into a failure result, the way a CI system expects.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::job::JobConfig;
use super::layout::ReportLayout;
use super::result::BuildResult;
use crate::args::{CommandLine, RunMode};
use crate::common::{Config, Error};
use crate::env::EnvVars;
use crate::launcher::{LaunchRequest, ProcessLauncher};
use crate::suites::{SuiteDeclaration, SuiteResolver, WorkspaceResolver, RUN_LOG_SEARCH};

/// Report parameters that are meaningless while running suites
const RUN_DROPPED_REPORT_ARGS: &[&str] = &[
    "-report",
    "-report.html",
    "-report.junit",
    "-report.xml",
    "-report.name",
];

/// Run parameters that are meaningless while generating reports
const REPORT_DROPPED_RUN_ARGS: &[&str] = &["-runlogdir", "-runlog", "-runid", "-suitesfile"];

/// Where and for whom a build runs
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub workspace: PathBuf,
    pub job_name: String,
    pub build_number: u64,
    /// Base environment, usually the process environment
    pub env: EnvVars,
}

impl BuildContext {
    pub fn new(workspace: impl Into<PathBuf>, job_name: impl Into<String>, build_number: u64) -> Self {
        Self {
            workspace: workspace.into(),
            job_name: job_name.into(),
            build_number,
            env: EnvVars::from_process(),
        }
    }

    /// Environment used to expand placeholders
    pub fn environment(&self, job: &JobConfig) -> EnvVars {
        let mut env = self.env.clone();
        env.extend(self.build_variables(job).iter());
        env
    }

    /// Variables the runner gets on top of the inherited environment
    pub fn build_variables(&self, job: &JobConfig) -> EnvVars {
        let mut env: EnvVars = job.env.iter().collect();
        env.insert("JOB_NAME", self.job_name.clone())
            .insert("BUILD_NUMBER", self.build_number.to_string())
            .insert("WORKSPACE", self.workspace.to_string_lossy());
        env
    }
}

/// A single runner invocation (or an attempt at one)
#[derive(Debug, Clone, Serialize)]
pub struct Invocation {
    pub mode: RunMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suite: Option<String>,
    pub command_line: Vec<String>,
    pub exit_code: Option<i32>,
    pub result: BuildResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a build step
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub job: String,
    pub build_number: u64,
    pub result: BuildResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reports_dir: Option<PathBuf>,
    pub invocations: Vec<Invocation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl StepReport {
    fn new(ctx: &BuildContext) -> Self {
        Self {
            job: ctx.job_name.clone(),
            build_number: ctx.build_number,
            result: BuildResult::Success,
            reports_dir: None,
            invocations: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn record(&mut self, invocation: Invocation) {
        self.result = self.result.combine(invocation.result);
        self.invocations.push(invocation);
    }

    fn fail(&mut self, error: &Error) {
        tracing::error!("{}", error);
        self.errors.push(error.to_string());
        self.result = BuildResult::Failure;
    }
}

/// Everything a step needs once the job has been checked
struct Prepared {
    binary: String,
    layout: ReportLayout,
    env: EnvVars,
    runner_env: EnvVars,
}

/// Runs the configured suites of one job
pub struct BuildStep<'a> {
    config: &'a Config,
    job: &'a JobConfig,
    ctx: &'a BuildContext,
    launcher: &'a dyn ProcessLauncher,
    resolver: &'a dyn SuiteResolver,
}

impl<'a> BuildStep<'a> {
    pub fn new(
        config: &'a Config,
        job: &'a JobConfig,
        ctx: &'a BuildContext,
        launcher: &'a dyn ProcessLauncher,
    ) -> Self {
        Self {
            config,
            job,
            ctx,
            launcher,
            resolver: &WorkspaceResolver,
        }
    }

    /// Resolve suites with something other than the file system
    pub fn with_resolver(mut self, resolver: &'a dyn SuiteResolver) -> Self {
        self.resolver = resolver;
        self
    }

    fn reports_dir(&self) -> &str {
        self.job
            .reports_directory
            .as_deref()
            .unwrap_or(&self.config.reports.directory)
    }

    /// Run every suite, then generate reports from the run logs
    pub async fn run_tests(&self) -> StepReport {
        let mut report = StepReport::new(self.ctx);
        let Some(prepared) = self.prepare(&mut report) else {
            return report;
        };

        for declared in &self.job.suites {
            for warning in declared.warnings() {
                tracing::warn!("{}", warning);
            }
            let suite = declared.expand_env(&prepared.env).consider_suitesfile();
            tracing::info!("Running {}", suite);

            for single in self.split_for_daemon(suite) {
                let cmd = self.run_command_line(&prepared);
                report.record(self.execute(cmd, &single, &prepared.runner_env).await);
            }
        }

        tracing::info!("Generating reports...");
        report.record(self.generate_reports(&prepared).await);

        self.finish(&mut report, &prepared.layout);
        report
    }

    /// Generate test documentation for every suite
    pub async fn generate_docs(&self) -> StepReport {
        let mut report = StepReport::new(self.ctx);
        let Some(prepared) = self.prepare(&mut report) else {
            return report;
        };

        for declared in &self.job.suites {
            let suite = declared.expand_env(&prepared.env).consider_suitesfile();
            tracing::info!("Generating documentation for {}", suite);

            let mut cmd = CommandLine::new(prepared.binary.as_str(), RunMode::GenDoc);
            cmd.enforce("-batch", None)
                .default_arg("-testdoc", &prepared.layout.doc.to_string_lossy());
            report.record(self.execute(cmd, &suite, &prepared.runner_env).await);
        }

        self.finish(&mut report, &prepared.layout);
        report
    }

    fn prepare(&self, report: &mut StepReport) -> Option<Prepared> {
        let reports_dir = self.reports_dir();
        if let Err(e) = self.job.validate(reports_dir, &self.ctx.job_name) {
            report.fail(&e);
            return None;
        }

        let binary = match self.config.runner_binary(self.job.runner_path.as_deref()) {
            Ok(binary) => binary,
            Err(e) => {
                report.fail(&e);
                return None;
            }
        };
        tracing::info!("Using QF-Test at {}", binary.display());

        let layout = ReportLayout::new(
            &self.ctx.workspace,
            reports_dir,
            &self.ctx.job_name,
            self.ctx.build_number,
        );
        match layout.prepare() {
            Ok(removed) => {
                for dir in removed {
                    tracing::debug!("Removed old reports {}", dir.display());
                }
            }
            Err(e) => {
                report.fail(&e);
                return None;
            }
        }
        report.reports_dir = Some(layout.root.clone());

        Some(Prepared {
            binary: binary.to_string_lossy().into_owned(),
            layout,
            env: self.ctx.environment(self.job),
            runner_env: self.ctx.build_variables(self.job),
        })
    }

    /// Daemons run one suite per invocation
    fn split_for_daemon(&self, suite: SuiteDeclaration) -> Vec<SuiteDeclaration> {
        if self.job.daemon.is_none() {
            return vec![suite];
        }
        match suite.expand(&self.ctx.workspace, self.resolver) {
            Ok(expanded) if !expanded.is_empty() => {
                if expanded.len() > 1 {
                    tracing::warn!(
                        "Daemon mode runs one test-suite per invocation; '{}' expands to {} invocations",
                        suite.suitename,
                        expanded.len()
                    );
                }
                expanded
            }
            Ok(_) => vec![suite],
            Err(e) => {
                tracing::warn!("Could not expand '{}': {}", suite.suitename, e);
                vec![suite]
            }
        }
    }

    fn run_command_line(&self, prepared: &Prepared) -> CommandLine {
        let mut cmd = CommandLine::new(prepared.binary.as_str(), RunMode::Run);
        cmd.enforce("-batch", None)
            .enforce("-exitcodeignoreexception", None)
            .enforce("-nomessagewindow", None);

        if let Some(daemon) = &self.job.daemon {
            cmd.enforce("-calldaemon", None)
                .enforce("-daemonhost", Some(&daemon.host))
                .enforce("-daemonport", Some(&daemon.port.to_string()));
        }

        cmd.enforce("-runlogdir", Some(&prepared.layout.logs.to_string_lossy()))
            .drop_arg("-runlog", Some(""))
            .default_arg(
                "-runid",
                &prepared.env.expand("$JOB_NAME-$BUILD_NUMBER-+y+M+d+h+m+s"),
            );
        for key in RUN_DROPPED_REPORT_ARGS {
            cmd.drop_arg(key, Some(""));
        }
        cmd
    }

    fn report_command_line(&self, prepared: &Prepared) -> CommandLine {
        let mut cmd = CommandLine::new(prepared.binary.as_str(), RunMode::GenReport);
        cmd.enforce("-batch", None);
        for key in REPORT_DROPPED_RUN_ARGS {
            cmd.drop_arg(key, Some(""));
        }
        cmd.default_arg("-report.html", &prepared.layout.html.to_string_lossy())
            .default_arg("-report.junit", &prepared.layout.junit.to_string_lossy());

        for declared in &self.job.suites {
            cmd.add_tokenized(&declared.expand_env(&prepared.env).custom_param);
            cmd.settle();
        }
        cmd
    }

    async fn generate_reports(&self, prepared: &Prepared) -> Invocation {
        let mut cmd = self.report_command_line(prepared);
        let logs = SuiteDeclaration::new("", "").with_search(RUN_LOG_SEARCH);

        match cmd.add_suite_config(&prepared.layout.logs, &logs, self.resolver) {
            Ok(0) => {
                tracing::error!("No run logs found. Marking run with test failure");
                let error = Error::NoSuitesResolved(prepared.layout.logs.display().to_string());
                self.not_launched(cmd, None, error)
            }
            Ok(_) => self.launch(cmd, None, &prepared.runner_env).await,
            Err(e) => self.not_launched(cmd, None, e),
        }
    }

    /// Add the suite to `cmd` and run it
    async fn execute(
        &self,
        mut cmd: CommandLine,
        suite: &SuiteDeclaration,
        runner_env: &EnvVars,
    ) -> Invocation {
        let label = Some(suite.suitename.clone());

        match cmd.add_suite_config(&self.ctx.workspace, suite, self.resolver) {
            Ok(0) => {
                tracing::error!("No test-suites found for {}", suite);
                self.not_launched(cmd, label, Error::NoSuitesResolved(suite.suitename.clone()))
            }
            Ok(_) => self.launch(cmd, label, runner_env).await,
            Err(e) => self.not_launched(cmd, label, e),
        }
    }

    /// `runner_env` is added to the inherited process environment
    async fn launch(
        &self,
        cmd: CommandLine,
        suite: Option<String>,
        runner_env: &EnvVars,
    ) -> Invocation {
        let mode = cmd.mode();
        tracing::info!("{}", cmd.to_quoted_string());

        let request = LaunchRequest {
            tokens: cmd.into_tokens(),
            working_dir: self.ctx.workspace.clone(),
            env: runner_env.clone(),
        };
        let policy = &self.job.results;

        match self.launcher.launch(&request).await {
            Ok(code) => {
                let result = match mode {
                    RunMode::GenDoc if code != 0 => policy.on_failure,
                    _ => policy.for_exit_code(code),
                };
                tracing::info!("{} finished with exit code {} ({})", mode, code, result);
                Invocation {
                    mode,
                    suite,
                    command_line: request.tokens,
                    exit_code: Some(code),
                    result,
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!("Couldn't run {}: {}", request.program(), e);
                Invocation {
                    mode,
                    suite,
                    command_line: request.tokens,
                    exit_code: None,
                    result: policy.on_failure,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    fn not_launched(&self, cmd: CommandLine, suite: Option<String>, error: Error) -> Invocation {
        Invocation {
            mode: cmd.mode(),
            suite,
            command_line: cmd.into_tokens(),
            exit_code: None,
            result: self.job.results.on_failure,
            error: Some(error.to_string()),
        }
    }

    fn finish(&self, report: &mut StepReport, layout: &ReportLayout) {
        if let Err(e) = write_summary(report, &layout.summary_path()) {
            tracing::warn!("Could not write summary: {}", e);
        }
        if self.job.cleanup {
            if let Err(e) = layout.mark_for_deletion() {
                tracing::warn!("Could not mark {} for deletion: {}", layout.root.display(), e);
            }
        }
        tracing::info!("Done: {}", report.result);
    }
}

fn write_summary(report: &StepReport, path: &Path) -> crate::common::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::DryRunLauncher;

    fn prepared(ctx: &BuildContext, job: &JobConfig) -> Prepared {
        Prepared {
            binary: "qftest".to_string(),
            layout: ReportLayout::new(&ctx.workspace, "reports", &ctx.job_name, ctx.build_number),
            env: ctx.environment(job),
            runner_env: ctx.build_variables(job),
        }
    }

    fn context() -> BuildContext {
        let mut ctx = BuildContext::new("/ws", "nightly", 7);
        ctx.env = EnvVars::new();
        ctx
    }

    #[test]
    fn test_environment_adds_build_variables() {
        let mut job = JobConfig::default();
        job.env.insert("JOB_NAME".to_string(), "ignored".to_string());
        job.env.insert("STAGE".to_string(), "qa".to_string());

        let env = context().environment(&job);
        assert_eq!(env.get("JOB_NAME"), Some("nightly"));
        assert_eq!(env.get("BUILD_NUMBER"), Some("7"));
        assert_eq!(env.get("STAGE"), Some("qa"));
    }

    #[test]
    fn test_runner_gets_only_build_variables() {
        let mut ctx = context();
        ctx.env.insert("HOME", "/home/ci");
        let mut job = JobConfig::default();
        job.env.insert("STAGE".to_string(), "qa".to_string());

        let runner_env = ctx.build_variables(&job);
        assert_eq!(runner_env.get("HOME"), None);
        assert_eq!(runner_env.get("STAGE"), Some("qa"));
        assert_eq!(runner_env.get("WORKSPACE"), Some("/ws"));
        // expansion still sees the inherited variables
        assert_eq!(ctx.environment(&job).expand("$HOME/$STAGE"), "/home/ci/qa");
    }

    #[test]
    fn test_run_command_line_presets() {
        let ctx = context();
        let job = JobConfig::default();
        let config = Config::default();
        let step = BuildStep::new(&config, &job, &ctx, &DryRunLauncher);
        let prepared = prepared(&ctx, &job);

        let mut cmd = step.run_command_line(&prepared);
        cmd.add_tokenized("-runlog x -runlogdir y -report.html z -runid mine -batch -variable a=1");

        let logs = prepared.layout.logs.to_string_lossy().into_owned();
        let expected: Vec<String> = [
            "qftest",
            "-run",
            "-batch",
            "-exitcodeignoreexception",
            "-nomessagewindow",
            "-runlogdir",
            logs.as_str(),
            "-runid",
            "mine",
            "-variable",
            "a=1",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(cmd.into_tokens(), expected);
    }

    #[test]
    fn test_run_command_line_daemon() {
        let ctx = context();
        let job = JobConfig {
            daemon: Some(crate::build::DaemonTarget {
                host: "testhost".to_string(),
                port: 3543,
            }),
            ..Default::default()
        };
        let config = Config::default();
        let step = BuildStep::new(&config, &job, &ctx, &DryRunLauncher);

        let cmd = step.run_command_line(&prepared(&ctx, &job));
        let line = cmd.to_string();
        assert!(line.contains("-calldaemon -daemonhost testhost -daemonport 3543"));
        assert!(line.contains("-runid nightly-7-+y+M+d+h+m+s"));
    }

    #[test]
    fn test_report_command_line_keeps_user_report_dirs() {
        let ctx = context();
        let job = JobConfig {
            suites: vec![
                SuiteDeclaration::new("a.qft", "-report.html custom -runlog x"),
                SuiteDeclaration::new("b.qft", "-runid r -suitesfile list.txt"),
            ],
            ..Default::default()
        };
        let config = Config::default();
        let step = BuildStep::new(&config, &job, &ctx, &DryRunLauncher);
        let prepared = prepared(&ctx, &job);

        let cmd = step.report_command_line(&prepared);
        let junit = prepared.layout.junit.to_string_lossy().into_owned();
        assert_eq!(
            cmd.to_string(),
            format!("qftest -genreport -batch -report.junit {} -report.html custom", junit)
        );
    }
}
