//! Command line assembler
//!
//! Specializes [`ArgumentList`] for one QF-Test run mode. The mode marker
//! of the target mode is enforced and every other marker is dropped, so a
//! finished command line carries exactly one of them.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;

use super::engine::ArgumentList;
use crate::common::Result;
use crate::suites::{SuiteDeclaration, SuiteResolver};

/// What a QF-Test invocation does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Execute test suites
    Run,
    /// Generate HTML/JUnit reports from run logs
    GenReport,
    /// Generate test documentation
    GenDoc,
}

impl RunMode {
    pub const ALL: [RunMode; 3] = [RunMode::Run, RunMode::GenReport, RunMode::GenDoc];

    /// The command line flag selecting this mode
    pub fn marker(self) -> &'static str {
        match self {
            RunMode::Run => "-run",
            RunMode::GenReport => "-genreport",
            RunMode::GenDoc => "-gendoc",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.marker())
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim_start_matches('-') {
            "run" => Ok(RunMode::Run),
            "genreport" => Ok(RunMode::GenReport),
            "gendoc" => Ok(RunMode::GenDoc),
            other => Err(format!(
                "unknown run mode '{}'. Supported modes: run, genreport, gendoc",
                other
            )),
        }
    }
}

/// Command line for a single QF-Test invocation
#[derive(Debug, Clone)]
pub struct CommandLine {
    args: ArgumentList,
    mode: RunMode,
}

impl CommandLine {
    /// Start a command line for `binary` in `mode`
    pub fn new(binary: impl Into<String>, mode: RunMode) -> Self {
        let mut args = ArgumentList::new();
        args.push_literal(binary);
        for candidate in RunMode::ALL {
            if candidate == mode {
                args.enforce(candidate.marker(), None);
            } else {
                args.drop_arg(candidate.marker(), None);
            }
        }
        Self { args, mode }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn into_tokens(self) -> Vec<String> {
        self.args.into_tokens()
    }

    /// Append a suite declaration
    ///
    /// The custom parameters go through the presets, the resolved suite
    /// files are appended verbatim. Returns the number of resolved files;
    /// zero means nothing matched and the caller decides what that costs.
    pub fn add_suite_config<R>(
        &mut self,
        workspace: &Path,
        suite: &SuiteDeclaration,
        resolver: &R,
    ) -> Result<usize>
    where
        R: SuiteResolver + ?Sized,
    {
        self.args.add_tokenized(&suite.custom_param);
        let paths = resolver.resolve(workspace, suite)?;
        self.args.settle();
        for path in &paths {
            self.args.push_literal(path.to_string_lossy());
        }
        Ok(paths.len())
    }
}

impl Deref for CommandLine {
    type Target = ArgumentList;

    fn deref(&self) -> &Self::Target {
        &self.args
    }
}

impl DerefMut for CommandLine {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.args
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.args, f)
    }
}
