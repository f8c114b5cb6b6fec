//! Command line construction for the QF-Test runner

mod assembler;
mod engine;

pub use assembler::{CommandLine, RunMode};
pub use engine::{AppendState, ArgumentList, PresetKind};
