//! Build results and the exit-code policy
//!
//! QF-Test reports its outcome through the exit code:
//! 0 = ok, 1 = warnings, 2 = errors, 3 = exceptions. Everything else,
//! including negative codes, means the run itself failed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Verdict of a build step, ordered from best to worst
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BuildResult {
    #[default]
    Success,
    Unstable,
    Failure,
}

impl BuildResult {
    /// The worse of two results
    pub fn combine(self, other: BuildResult) -> BuildResult {
        self.max(other)
    }

    /// Process exit code reported by the CLI
    pub fn exit_code(self) -> i32 {
        match self {
            BuildResult::Success => 0,
            BuildResult::Unstable => 2,
            BuildResult::Failure => 3,
        }
    }
}

impl fmt::Display for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildResult::Success => write!(f, "SUCCESS"),
            BuildResult::Unstable => write!(f, "UNSTABLE"),
            BuildResult::Failure => write!(f, "FAILURE"),
        }
    }
}

/// What a runner exit code means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCategory {
    Ok,
    Warning,
    Error,
    Exception,
    /// The runner did not complete (or could not be run at all)
    Failure,
}

impl ExitCategory {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ExitCategory::Ok,
            1 => ExitCategory::Warning,
            2 => ExitCategory::Error,
            3 => ExitCategory::Exception,
            _ => ExitCategory::Failure,
        }
    }
}

/// Maps exit categories to build results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPolicy {
    #[serde(default = "unstable")]
    pub on_warning: BuildResult,
    #[serde(default = "failure")]
    pub on_error: BuildResult,
    #[serde(default = "failure")]
    pub on_exception: BuildResult,
    #[serde(default = "failure")]
    pub on_failure: BuildResult,
}

fn unstable() -> BuildResult {
    BuildResult::Unstable
}

fn failure() -> BuildResult {
    BuildResult::Failure
}

impl Default for ResultPolicy {
    fn default() -> Self {
        Self {
            on_warning: unstable(),
            on_error: failure(),
            on_exception: failure(),
            on_failure: failure(),
        }
    }
}

impl ResultPolicy {
    pub fn result_for(&self, category: ExitCategory) -> BuildResult {
        match category {
            ExitCategory::Ok => BuildResult::Success,
            ExitCategory::Warning => self.on_warning,
            ExitCategory::Error => self.on_error,
            ExitCategory::Exception => self.on_exception,
            ExitCategory::Failure => self.on_failure,
        }
    }

    pub fn for_exit_code(&self, code: i32) -> BuildResult {
        self.result_for(ExitCategory::from_code(code))
    }
}
