//! Directory and file creation inside the workspace.
//!
//! Both handlers consult the [`PathGuard`] first and never touch the disk
//! for a path that fails it.

use std::fs::{self, OpenOptions};
use tracing::{debug, warn};

use super::guard::PathGuard;
use super::result::{ExecError, Outcome};

/// Create a directory and any missing parents. Succeeds if it already exists.
pub fn make_directory(guard: &PathGuard, path: &str) -> Result<Outcome, ExecError> {
    let target = guard.resolve(path).ok_or_else(|| {
        warn!("Blocked mkdir outside workspace: {}", path);
        ExecError::SecurityViolation
    })?;

    debug!("Creating directory: {}", target.display());
    fs::create_dir_all(&target)?;

    Ok(Outcome::Created {
        absolute_path: target,
        message: "Directory created successfully".to_string(),
    })
}

/// Create an empty file, creating parent directories first. An existing
/// file or directory is left untouched and counts as success.
pub fn make_file(guard: &PathGuard, path: &str) -> Result<Outcome, ExecError> {
    let target = guard.resolve(path).ok_or_else(|| {
        warn!("Blocked touch outside workspace: {}", path);
        ExecError::SecurityViolation
    })?;

    if target.is_dir() {
        debug!("Directory already exists, nothing to touch: {}", target.display());
        return Ok(Outcome::Created {
            absolute_path: target,
            message: "File created successfully".to_string(),
        });
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    debug!("Creating file: {}", target.display());
    OpenOptions::new().create(true).append(true).open(&target)?;

    Ok(Outcome::Created {
        absolute_path: target,
        message: "File created successfully".to_string(),
    })
}
