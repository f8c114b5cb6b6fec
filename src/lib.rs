//! qfrun - run QF-Test suites from a CI job
//!
//! The core is an argument list with override presets that keeps user
//! supplied parameters from undermining the flags a build depends on.
//! Around it sit suite resolution, process launching and the build steps
//! that turn QF-Test exit codes into build results.

pub mod args;
pub mod build;
pub mod cli;
pub mod commands;
pub mod common;
pub mod env;
pub mod launcher;
pub mod suites;

// Re-export commonly used types for tests
pub use args::{ArgumentList, CommandLine, PresetKind, RunMode};
pub use common::{Error, Result};
