//! End-to-end integration tests for qfrun
//!
//! The build steps run against a temporary workspace with a scripted
//! launcher standing in for QF-Test. The binary itself is exercised through
//! the `args` and `run --dry-run` subcommands, which need no QF-Test
//! installation.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use async_trait::async_trait;
use qfrun::build::{BuildContext, BuildResult, BuildStep, DaemonTarget, JobConfig};
use qfrun::common::Config;
use qfrun::env::EnvVars;
use qfrun::launcher::{LaunchRequest, ProcessLauncher};
use qfrun::suites::SuiteDeclaration;
use qfrun::RunMode;
use tempfile::TempDir;

/// Stands in for QF-Test: records every call and answers with fixed codes
struct FakeLauncher {
    run_code: i32,
    report_code: i32,
    /// Write a run log into `-runlogdir` like a real run would
    write_logs: bool,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeLauncher {
    fn new(run_code: i32) -> Self {
        Self {
            run_code,
            report_code: 0,
            write_logs: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn without_logs(mut self) -> Self {
        self.write_logs = false;
        self
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

fn value_of<'a>(tokens: &'a [String], key: &str) -> Option<&'a str> {
    tokens
        .iter()
        .position(|t| t == key)
        .and_then(|i| tokens.get(i + 1))
        .map(String::as_str)
}

#[async_trait]
impl ProcessLauncher for FakeLauncher {
    async fn launch(&self, request: &LaunchRequest) -> qfrun::Result<i32> {
        let count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(request.tokens.clone());
            calls.len()
        };

        match request.args().first().map(String::as_str) {
            Some("-run") => {
                if self.write_logs {
                    if let Some(dir) = value_of(&request.tokens, "-runlogdir") {
                        fs::write(Path::new(dir).join(format!("run{}.qrz", count)), b"")?;
                    }
                }
                Ok(self.run_code)
            }
            Some("-genreport") => Ok(self.report_code),
            _ => Ok(0),
        }
    }
}

/// Temporary workspace with a fake runner binary and two suites
struct TestContext {
    dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create workspace");
        fs::create_dir_all(dir.path().join("suites/sub")).unwrap();
        fs::write(dir.path().join("suites/a.qft"), "").unwrap();
        fs::write(dir.path().join("suites/sub/b.qft"), "").unwrap();
        fs::write(dir.path().join("qftest"), "").unwrap();
        Self { dir }
    }

    fn workspace(&self) -> &Path {
        self.dir.path()
    }

    fn runner(&self) -> PathBuf {
        self.workspace().join("qftest")
    }

    fn job(&self, suites: Vec<SuiteDeclaration>) -> JobConfig {
        JobConfig {
            name: Some("nightly".to_string()),
            suites,
            runner_path: Some(self.runner()),
            cleanup: true,
            ..Default::default()
        }
    }

    fn context(&self) -> BuildContext {
        let mut ctx = BuildContext::new(self.workspace(), "nightly", 12);
        ctx.env = EnvVars::new();
        ctx
    }

    fn build_dir(&self) -> PathBuf {
        self.workspace().join("qftestJenkinsReports/nightly/12")
    }
}

#[tokio::test]
async fn test_run_step_success() {
    let ctx = TestContext::new();
    let job = ctx.job(vec![SuiteDeclaration::new("suites", "-variable x=1 -runlog old")]);
    let config = Config::default();
    let launcher = FakeLauncher::new(0);
    let build = ctx.context();

    let report = BuildStep::new(&config, &job, &build, &launcher).run_tests().await;

    assert_eq!(report.result, BuildResult::Success, "{:?}", report);
    let calls = launcher.calls();
    assert_eq!(calls.len(), 2);

    let run = &calls[0];
    let logs = ctx.build_dir().join("logs");
    assert_eq!(run[0], ctx.runner().to_string_lossy());
    assert_eq!(run[1], "-run");
    assert_eq!(value_of(run, "-runlogdir"), Some(logs.to_str().unwrap()));
    assert_eq!(value_of(run, "-runid"), Some("nightly-12-+y+M+d+h+m+s"));
    assert!(!run.contains(&"-runlog".to_string()));
    assert!(run.contains(&"-variable".to_string()));
    assert!(run.last().unwrap().ends_with("b.qft"));

    let report_call = &calls[1];
    assert_eq!(report_call[1], "-genreport");
    assert!(!report_call.contains(&"-runlogdir".to_string()));
    assert!(report_call.last().unwrap().ends_with("run1.qrz"));

    assert!(ctx.build_dir().join("summary.json").is_file());
    assert!(ctx.build_dir().join("deleteMark").is_file());
}

#[tokio::test]
async fn test_run_step_warning_is_unstable() {
    let ctx = TestContext::new();
    let job = ctx.job(vec![SuiteDeclaration::new("suites/a.qft", "")]);
    let config = Config::default();
    let launcher = FakeLauncher::new(1);
    let build = ctx.context();

    let report = BuildStep::new(&config, &job, &build, &launcher).run_tests().await;

    assert_eq!(report.result, BuildResult::Unstable);
    assert_eq!(report.invocations[0].exit_code, Some(1));
    assert_eq!(report.invocations[1].mode, RunMode::GenReport);
}

#[tokio::test]
async fn test_run_step_without_logs_fails() {
    let ctx = TestContext::new();
    let job = ctx.job(vec![SuiteDeclaration::new("suites/a.qft", "")]);
    let config = Config::default();
    let launcher = FakeLauncher::new(0).without_logs();
    let build = ctx.context();

    let report = BuildStep::new(&config, &job, &build, &launcher).run_tests().await;

    assert_eq!(report.result, BuildResult::Failure);
    // report generation is never launched
    assert_eq!(launcher.calls().len(), 1);
    let genreport = &report.invocations[1];
    assert_eq!(genreport.exit_code, None);
    assert!(genreport.error.is_some());
}

#[tokio::test]
async fn test_unmatched_suite_fails_without_launch() {
    let ctx = TestContext::new();
    let job = ctx.job(vec![
        SuiteDeclaration::new("missing/*.qft", ""),
        SuiteDeclaration::new("suites/a.qft", ""),
    ]);
    let config = Config::default();
    let launcher = FakeLauncher::new(0);
    let build = ctx.context();

    let report = BuildStep::new(&config, &job, &build, &launcher).run_tests().await;

    assert_eq!(report.result, BuildResult::Failure);
    assert_eq!(report.invocations[0].exit_code, None);
    assert_eq!(report.invocations[1].exit_code, Some(0));
    // the second suite and report generation still ran
    assert_eq!(launcher.calls().len(), 2);
}

#[tokio::test]
async fn test_empty_suite_name_runs_nothing() {
    let ctx = TestContext::new();
    let job = ctx.job(vec![SuiteDeclaration::new("", "-batch")]);
    let config = Config::default();
    let launcher = FakeLauncher::new(0);
    let build = ctx.context();

    let report = BuildStep::new(&config, &job, &build, &launcher).run_tests().await;

    assert_eq!(report.result, BuildResult::Failure);
    assert!(report.invocations.is_empty());
    assert_eq!(report.errors.len(), 1);
    assert!(launcher.calls().is_empty());
}

#[tokio::test]
async fn test_daemon_runs_one_suite_per_invocation() {
    let ctx = TestContext::new();
    let mut job = ctx.job(vec![SuiteDeclaration::new("suites", "")]);
    job.daemon = Some(DaemonTarget {
        host: "testhost".to_string(),
        port: 3543,
    });
    let config = Config::default();
    let launcher = FakeLauncher::new(0);
    let build = ctx.context();

    let report = BuildStep::new(&config, &job, &build, &launcher).run_tests().await;

    assert_eq!(report.result, BuildResult::Success);
    let calls = launcher.calls();
    assert_eq!(calls.len(), 3);
    for run in &calls[..2] {
        assert_eq!(value_of(run, "-daemonhost"), Some("testhost"));
        assert_eq!(value_of(run, "-daemonport"), Some("3543"));
        assert!(run.last().unwrap().ends_with(".qft"));
        assert_eq!(run.iter().filter(|t| t.ends_with(".qft")).count(), 1);
    }
    // both run logs reach report generation
    assert_eq!(calls[2].iter().filter(|t| t.ends_with(".qrz")).count(), 2);
}

#[tokio::test]
async fn test_doc_step() {
    let ctx = TestContext::new();
    let job = ctx.job(vec![SuiteDeclaration::new("suites/a.qft", "-testdoc mine")]);
    let config = Config::default();
    let launcher = FakeLauncher::new(0);
    let build = ctx.context();

    let report = BuildStep::new(&config, &job, &build, &launcher)
        .generate_docs()
        .await;

    assert_eq!(report.result, BuildResult::Success);
    let calls = launcher.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0][1], "-gendoc");
    assert_eq!(value_of(&calls[0], "-testdoc"), Some("mine"));
    assert_eq!(value_of(&calls[0], "-batch"), Some("-testdoc"));
}

#[tokio::test]
async fn test_previous_marked_build_is_removed() {
    let ctx = TestContext::new();
    let job = ctx.job(vec![SuiteDeclaration::new("suites/a.qft", "")]);
    let config = Config::default();
    let launcher = FakeLauncher::new(0);

    let mut first = ctx.context();
    first.build_number = 11;
    BuildStep::new(&config, &job, &first, &launcher).run_tests().await;
    let first_dir = ctx.workspace().join("qftestJenkinsReports/nightly/11");
    assert!(first_dir.join("deleteMark").is_file());

    BuildStep::new(&config, &job, &ctx.context(), &launcher)
        .run_tests()
        .await;
    assert!(!first_dir.exists());
    assert!(ctx.build_dir().is_dir());
}

#[tokio::test]
async fn test_job_name_cannot_escape_reports_dir() {
    let ctx = TestContext::new();
    let job = ctx.job(vec![SuiteDeclaration::new("suites/a.qft", "")]);
    let config = Config::default();
    let launcher = FakeLauncher::new(0);

    // a marked directory next to the reports tree must survive
    let outside = ctx.workspace().join("keep");
    fs::create_dir_all(&outside).unwrap();
    fs::write(outside.join("deleteMark"), "delete\n").unwrap();

    let mut build = ctx.context();
    build.job_name = "../..".to_string();
    let report = BuildStep::new(&config, &job, &build, &launcher).run_tests().await;

    assert_eq!(report.result, BuildResult::Failure);
    assert_eq!(report.errors.len(), 1);
    assert!(launcher.calls().is_empty());
    assert!(outside.is_dir());
}

#[tokio::test]
async fn test_suites_file_supplies_missing_suite_name() {
    let ctx = TestContext::new();
    fs::write(ctx.workspace().join("list.txt"), "suites/a.qft\n").unwrap();
    let job = ctx.job(vec![SuiteDeclaration::new("", "-suitesfile list.txt")]);
    let config = Config::default();
    let launcher = FakeLauncher::new(0);
    let build = ctx.context();

    let report = BuildStep::new(&config, &job, &build, &launcher).run_tests().await;

    assert_eq!(report.result, BuildResult::Success, "{:?}", report);
    let run = &launcher.calls()[0];
    assert!(value_of(run, "-suitesfile").unwrap().ends_with("list.txt"));
}

fn qfrun(config: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_qfrun"));
    cmd.arg("--config").arg(config);
    cmd
}

#[test]
fn test_binary_args_subcommand() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "").unwrap();

    let output = qfrun(&config)
        .args(["args", "qftest", "--enforce", "-batch", "--", "aSuite.qft"])
        .output()
        .expect("Failed to run qfrun");
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "qftest -run -batch aSuite.qft"
    );

    let output = qfrun(&config)
        .args([
            "args",
            "qftest",
            "--mode",
            "genreport",
            "--drop=-runlog=",
            "--default=-report.html=html",
            "--",
            "-run",
            "-runlog",
            "old.qrl",
            "logs/run.qrz",
        ])
        .output()
        .expect("Failed to run qfrun");
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "qftest -genreport -report.html html logs/run.qrz"
    );
}

#[test]
fn test_binary_dry_run_reports_failure_without_logs() {
    let ctx = TestContext::new();
    let config = ctx.workspace().join("config.toml");
    fs::write(&config, "").unwrap();
    let job = ctx.workspace().join("job.toml");
    fs::write(
        &job,
        format!(
            "name = \"dry\"\nrunner_path = {:?}\n\n[[suites]]\nsuitename = \"suites/a.qft\"\n",
            ctx.runner().to_string_lossy()
        ),
    )
    .unwrap();

    let output = qfrun(&config)
        .arg("run")
        .arg(&job)
        .arg("--workspace")
        .arg(ctx.workspace())
        .arg("--dry-run")
        .output()
        .expect("Failed to run qfrun");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(" -run -batch -exitcodeignoreexception -nomessagewindow"));
    assert_eq!(output.status.code(), Some(BuildResult::Failure.exit_code()));
}
