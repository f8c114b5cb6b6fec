//! Configuration file handling
//!
//! The global configuration holds the QF-Test installation paths shared
//! by all jobs on this host. It is loaded once and handed to the build
//! steps explicitly.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::paths::config_path;
use super::{Error, Result};

/// Default directory (relative to the workspace) for run logs and reports
pub const DEFAULT_REPORTS_DIR: &str = "qftestJenkinsReports";

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// QF-Test installation settings
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Report directory settings
    #[serde(default)]
    pub reports: ReportsConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,
}

/// Where to find the QF-Test runner
#[derive(Debug, Deserialize, Default, Clone)]
pub struct RunnerConfig {
    /// Installation (or binary) path used on Windows hosts
    pub path: Option<PathBuf>,

    /// Installation (or binary) path used on Unix hosts
    pub path_unix: Option<PathBuf>,
}

/// Report directory settings
#[derive(Debug, Deserialize, Clone)]
pub struct ReportsConfig {
    /// Directory below the workspace holding per-build reports
    #[serde(default = "default_reports_dir")]
    pub directory: String,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            directory: default_reports_dir(),
        }
    }
}

fn default_reports_dir() -> String {
    DEFAULT_REPORTS_DIR.to_string()
}

/// Timeout settings in seconds
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Timeouts {
    /// Limit for a single runner invocation, 0 for none
    #[serde(default)]
    pub run_secs: u64,
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// Configured installation path for the current platform
    pub fn platform_runner_path(&self) -> Option<&Path> {
        if cfg!(windows) {
            self.runner.path.as_deref()
        } else {
            self.runner.path_unix.as_deref()
        }
    }

    /// Locate the QF-Test binary
    ///
    /// Priority: the job's own installation path, then the configured path
    /// for this platform, then `PATH`.
    pub fn runner_binary(&self, job_path: Option<&Path>) -> Result<PathBuf> {
        let name = runner_name();
        let mut searched = Vec::new();

        if let Some(path) = job_path.or_else(|| self.platform_runner_path()) {
            if let Some(binary) = find_in_installation(path, name) {
                return Ok(binary);
            }
            searched.push(path.display().to_string());
            return Err(Error::runner_not_found(name, &searched));
        }

        searched.push("PATH".to_string());
        which::which(name).map_err(|_| Error::runner_not_found(name, &searched))
    }
}

/// Name of the console runner on this platform
pub fn runner_name() -> &'static str {
    if cfg!(windows) {
        "qftestc"
    } else {
        "qftest"
    }
}

/// Accept the binary itself, `<dir>/<name>` or `<dir>/bin/<name>`
fn find_in_installation(path: &Path, name: &str) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    let file_name = format!("{}{}", name, std::env::consts::EXE_SUFFIX);
    [path.join(&file_name), path.join("bin").join(&file_name)]
        .into_iter()
        .find(|candidate| candidate.is_file())
}
