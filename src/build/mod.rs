//! Build steps and everything they are configured with

pub mod job;
pub mod layout;
pub mod result;
pub mod step;

pub use job::{DaemonTarget, JobConfig};
pub use layout::ReportLayout;
pub use result::{BuildResult, ExitCategory, ResultPolicy};
pub use step::{BuildContext, BuildStep, Invocation, StepReport};
