//! Per-build reports directory
//!
//! `<workspace>/<reports>/<job>/<build>/` holds the run logs, the generated
//! reports and a summary. A build whose reports are no longer needed is
//! flagged with a `deleteMark` file and removed by a later build of the
//! same job.

use std::fs;
use std::path::{Path, PathBuf};

use crate::common::Result;

const DELETE_MARK: &str = "deleteMark";

/// Directory layout of one build's artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLayout {
    pub root: PathBuf,
    pub logs: PathBuf,
    pub html: PathBuf,
    pub junit: PathBuf,
    pub doc: PathBuf,
}

impl ReportLayout {
    pub fn new(workspace: &Path, reports_dir: &str, job_name: &str, build_number: u64) -> Self {
        let root = workspace
            .join(reports_dir)
            .join(job_name)
            .join(build_number.to_string());
        Self {
            logs: root.join("logs"),
            html: root.join("html"),
            junit: root.join("junit"),
            doc: root.join("doc"),
            root,
        }
    }

    /// Remove marked builds of the same job and create this build's directories
    ///
    /// Returns the removed directories.
    pub fn prepare(&self) -> Result<Vec<PathBuf>> {
        let removed = self.remove_marked_siblings();
        fs::create_dir_all(&self.logs)?;
        Ok(removed)
    }

    /// Flag this build's directory for removal
    pub fn mark_for_deletion(&self) -> Result<()> {
        fs::write(self.root.join(DELETE_MARK), "delete\n")?;
        Ok(())
    }

    pub fn summary_path(&self) -> PathBuf {
        self.root.join("summary.json")
    }

    fn remove_marked_siblings(&self) -> Vec<PathBuf> {
        let Some(job_dir) = self.root.parent() else {
            return Vec::new();
        };
        let Ok(entries) = fs::read_dir(job_dir) else {
            return Vec::new();
        };

        let mut removed = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path == self.root || !path.join(DELETE_MARK).is_file() {
                continue;
            }
            match fs::remove_dir_all(&path) {
                Ok(()) => removed.push(path),
                Err(e) => tracing::warn!("Could not remove old reports {}: {}", path.display(), e),
            }
        }
        removed
    }
}
