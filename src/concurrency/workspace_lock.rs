//! Cross-process workspace lock using advisory file locking (fs2 flock).
//!
//! Serializes command batches against the same workspace across processes
//! so that two `shellward run` invocations never interleave their effects.
//! Different workspaces use different lock files and never contend.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::paths::Paths;

/// Advisory file lock for one workspace.
///
/// The lock file lives under `state_dir/locks/`, outside the workspace, so
/// it never shows up in the workspace tree.
#[derive(Clone)]
pub struct WorkspaceLock {
    path: PathBuf,
}

/// RAII guard that releases the lock on drop.
pub struct WorkspaceLockGuard {
    file: File,
}

impl Drop for WorkspaceLockGuard {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl WorkspaceLock {
    /// Lock for `workspace`, which should already be canonical.
    pub fn for_workspace(paths: &Paths, workspace: &Path) -> Result<Self> {
        Self::at(paths.workspace_lock(workspace))
    }

    /// Lock backed by an explicit file.
    pub fn at(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create lock directory: {}", parent.display())
            })?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Blocking acquire. Waits until the lock is available.
    ///
    /// Returns an RAII guard that releases the lock on drop.
    pub fn acquire(&self) -> Result<WorkspaceLockGuard> {
        let file = File::create(&self.path)
            .with_context(|| format!("Failed to open lock file: {}", self.path.display()))?;
        file.lock_exclusive()?;
        Ok(WorkspaceLockGuard { file })
    }

    /// Non-blocking acquire. Returns `None` if another process holds it.
    pub fn try_acquire(&self) -> Result<Option<WorkspaceLockGuard>> {
        let file = File::create(&self.path)
            .with_context(|| format!("Failed to open lock file: {}", self.path.display()))?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(WorkspaceLockGuard { file })),
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            #[cfg(unix)]
            Err(ref e) if e.raw_os_error() == Some(35) || e.raw_os_error() == Some(11) => {
                // EAGAIN(11) / EWOULDBLOCK(35 on macOS)
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
