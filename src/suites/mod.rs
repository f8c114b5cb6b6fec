//! Test-suite declarations and their resolution against a workspace
//!
//! A declaration names a suite file, a directory of suites or a pattern,
//! together with the custom parameters for the runner.

mod pattern;

pub use pattern::AntPattern;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::common::Result;
use crate::env::EnvVars;

/// Pattern used to expand a directory into suite files
pub const SUITE_SEARCH: &str = "**/*.qft";

/// Pattern used to find run logs for report generation
pub const RUN_LOG_SEARCH: &str = "**/*.qrz,**/*.qrl";

const SUITES_FILE_ARG: &str = "-suitesfile";

/// Parameters the tool controls itself; user values are dropped
const CONTROLLED_ARGS: &[&str] = &["-runlogdir"];

/// A suite (or set of suites) plus the custom parameters to run it with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteDeclaration {
    /// Suite file, directory of suites, or pattern relative to the workspace
    pub suitename: String,
    /// Raw custom command line parameters
    #[serde(default, alias = "customParam")]
    pub custom_param: String,
    /// Include pattern used when `suitename` is a directory
    #[serde(default = "default_search")]
    pub search: String,
}

fn default_search() -> String {
    SUITE_SEARCH.to_string()
}

impl SuiteDeclaration {
    pub fn new(suitename: impl Into<String>, custom_param: impl Into<String>) -> Self {
        Self {
            suitename: suitename.into(),
            custom_param: custom_param.into(),
            search: default_search(),
        }
    }

    /// Use a different directory search pattern
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    /// Expand environment placeholders in the suite name and parameters
    pub fn expand_env(&self, env: &EnvVars) -> Self {
        Self {
            suitename: env.expand(&self.suitename),
            custom_param: env.expand(&self.custom_param),
            search: self.search.clone(),
        }
    }

    /// Move a `-suitesfile <file>` parameter into the suite name
    ///
    /// Resolution relies on `suitename` pointing at an existing file, so the
    /// file following `-suitesfile` becomes the suite name and the flag
    /// itself is moved to the end of the parameters. Without a following
    /// token the current suite name is kept.
    pub fn consider_suitesfile(&self) -> Self {
        let mut args: Vec<&str> = self.custom_param.split_whitespace().collect();
        let Some(idx) = args.iter().position(|a| *a == SUITES_FILE_ARG) else {
            return self.clone();
        };

        args.remove(idx);
        let file = if idx < args.len() {
            args.remove(idx).to_string()
        } else {
            self.suitename.clone()
        };
        args.push(SUITES_FILE_ARG);

        Self {
            suitename: file,
            custom_param: args.join(" "),
            search: self.search.clone(),
        }
    }

    /// One declaration per resolved suite file, sharing the parameters
    pub fn expand<R>(&self, workspace: &Path, resolver: &R) -> Result<Vec<SuiteDeclaration>>
    where
        R: SuiteResolver + ?Sized,
    {
        let suite = self.consider_suitesfile();
        Ok(resolver
            .resolve(workspace, &suite)?
            .into_iter()
            .map(|path| Self {
                suitename: path.to_string_lossy().into_owned(),
                custom_param: suite.custom_param.clone(),
                search: suite.search.clone(),
            })
            .collect())
    }

    /// Warnings about parameters that will not take effect
    pub fn warnings(&self) -> Vec<String> {
        CONTROLLED_ARGS
            .iter()
            .filter(|arg| self.custom_param.split_whitespace().any(|t| t == **arg))
            .map(|arg| {
                format!(
                    "Setting a custom `{}` parameter contradicts qfrun behavior and will be dropped",
                    arg
                )
            })
            .collect()
    }
}

impl fmt::Display for SuiteDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "suite config with custom params: `{}' and suites: `{}'",
            self.custom_param, self.suitename
        )
    }
}

/// Turns a suite declaration into concrete files
pub trait SuiteResolver {
    fn resolve(&self, workspace: &Path, suite: &SuiteDeclaration) -> Result<Vec<PathBuf>>;
}

/// Resolves declarations against the file system
///
/// - an existing directory expands to the files matching `search` below it
/// - an existing file resolves to itself
/// - anything else is treated as a pattern relative to the workspace
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkspaceResolver;

impl SuiteResolver for WorkspaceResolver {
    fn resolve(&self, workspace: &Path, suite: &SuiteDeclaration) -> Result<Vec<PathBuf>> {
        let candidate = workspace.join(&suite.suitename);
        if candidate.exists() {
            if candidate.is_dir() {
                Ok(AntPattern::parse(&suite.search).list(&candidate))
            } else {
                Ok(vec![candidate])
            }
        } else {
            Ok(AntPattern::parse(&suite.suitename).list(workspace))
        }
    }
}
