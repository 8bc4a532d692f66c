//! Job-scoped temp directories.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::MediaResult;

/// Working directory for one job's temp files (continuity frames, audio
/// tracks, concat manifests). The directory and everything in it is deleted
/// when the workspace drops, bounding disk usage regardless of how the step
/// exits.
#[derive(Debug)]
pub struct JobWorkspace {
    dir: TempDir,
}

impl JobWorkspace {
    /// Create a fresh workspace.
    pub fn new() -> MediaResult<Self> {
        let dir = tempfile::Builder::new().prefix("adgen-job-").tempdir()?;
        Ok(Self { dir })
    }

    /// Root of the workspace.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path for a file inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}
