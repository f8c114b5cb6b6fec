//! Job configuration
//!
//! A job file describes which suites to run and how. TOML is the default
//! format; files ending in `.yaml` or `.yml` are read as YAML.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::result::ResultPolicy;
use crate::common::{Error, Result};
use crate::suites::SuiteDeclaration;

/// Characters not allowed in the reports directory name
const ILLEGAL_REPORT_CHARS: &[char] = &[':', '*', '?', '<', '>', '|'];

/// A complete job loaded from a job file
#[derive(Deserialize, Debug, Clone, Default)]
pub struct JobConfig {
    /// Job name, used for `$JOB_NAME` and the reports directory
    pub name: Option<String>,
    /// Suites to run, in order
    #[serde(default)]
    pub suites: Vec<SuiteDeclaration>,
    /// Specific QF-Test installation for this job
    pub runner_path: Option<PathBuf>,
    /// Reports directory below the workspace, overriding the global setting
    pub reports_directory: Option<String>,
    /// Run the suites on a QF-Test daemon
    pub daemon: Option<DaemonTarget>,
    /// How runner exit codes map to build results
    #[serde(default)]
    pub results: ResultPolicy,
    /// Extra variables for placeholder expansion and the runner environment
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Mark this build's reports for removal by the next build
    #[serde(default = "default_cleanup")]
    pub cleanup: bool,
}

fn default_cleanup() -> bool {
    true
}

/// A QF-Test daemon to run suites on
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DaemonTarget {
    pub host: String,
    pub port: u16,
}

impl JobConfig {
    /// Load a job file, picking the format from the extension
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        if is_yaml {
            serde_yaml::from_str(&content)
                .map_err(|e| Error::ConfigParse(format!("{}: {}", path.display(), e)))
        } else {
            toml::from_str(&content)
                .map_err(|e| Error::ConfigParse(format!("{}: {}", path.display(), e)))
        }
    }

    /// Check the job before anything runs
    ///
    /// An empty suite name is fine when `-suitesfile <file>` supplies it.
    pub fn validate(&self, reports_dir: &str, job_name: &str) -> Result<()> {
        let unnamed = |s: &SuiteDeclaration| s.consider_suitesfile().suitename.trim().is_empty();
        if self.suites.is_empty() || self.suites.iter().any(unnamed) {
            return Err(Error::Config(
                "No suites were added to this job or a suite name is empty".to_string(),
            ));
        }

        if reports_dir.contains(ILLEGAL_REPORT_CHARS) {
            return Err(Error::Config(format!(
                "The reports directory '{}' contains one or more of these illegal characters: * ? < > | :",
                reports_dir
            )));
        }

        // the job name becomes a directory below the reports directory
        let trimmed = job_name.trim();
        if trimmed.is_empty() || trimmed == "." || trimmed == ".." || job_name.contains(['/', '\\']) {
            return Err(Error::Config(format!(
                "The job name '{}' cannot be used as a directory name",
                job_name
            )));
        }

        Ok(())
    }
}
