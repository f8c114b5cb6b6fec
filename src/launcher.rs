//! Process launching
//!
//! The build steps hand finished command lines to a [`ProcessLauncher`]
//! and only look at the exit code.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::common::{Error, Result};
use crate::env::EnvVars;

/// One runner invocation
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    /// Program followed by its arguments
    pub tokens: Vec<String>,
    pub working_dir: PathBuf,
    /// Set on top of the inherited environment
    pub env: EnvVars,
}

impl LaunchRequest {
    pub fn program(&self) -> &str {
        self.tokens.first().map(String::as_str).unwrap_or_default()
    }

    pub fn args(&self) -> &[String] {
        self.tokens.get(1..).unwrap_or_default()
    }
}

/// Runs a command line to completion and reports its exit code
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    async fn launch(&self, request: &LaunchRequest) -> Result<i32>;
}

/// Spawns real processes with inherited stdio
#[derive(Debug, Clone, Default)]
pub struct TokioLauncher {
    timeout: Option<Duration>,
}

impl TokioLauncher {
    /// `timeout_secs` of 0 means no limit
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

#[async_trait]
impl ProcessLauncher for TokioLauncher {
    async fn launch(&self, request: &LaunchRequest) -> Result<i32> {
        let program = request.program();
        if program.is_empty() {
            return Err(Error::Internal("Empty command line".to_string()));
        }

        tracing::debug!(program, args = ?request.args(), dir = %request.working_dir.display(), "Launching");

        let mut child = Command::new(program)
            .args(request.args())
            .current_dir(&request.working_dir)
            .envs(request.env.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::launch_failed(program, e))?;

        let status = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    tracing::warn!(program, "Runner exceeded {:?}, killing it", limit);
                    let _ = child.kill().await;
                    return Err(Error::Timeout(limit.as_secs()));
                }
            },
            None => child.wait().await?,
        };

        status
            .code()
            .ok_or_else(|| Error::launch_failed(program, "terminated by signal"))
    }
}

/// Prints command lines instead of running them
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunLauncher;

#[async_trait]
impl ProcessLauncher for DryRunLauncher {
    async fn launch(&self, request: &LaunchRequest) -> Result<i32> {
        println!("{}", request.tokens.join(" "));
        Ok(0)
    }
}
