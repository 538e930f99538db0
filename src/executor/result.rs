use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use super::command::{CommandDescriptor, CommandKind};

/// Maximum characters of a command body carried in a result.
pub const COMMAND_DISPLAY_CHARS: usize = 200;

/// Failure categories reported in results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Candidate path failed the workspace boundary check.
    SecurityViolation,
    /// Process exceeded the configured timeout.
    Timeout,
    /// Process exited non-zero or could not be started.
    ProcessFailure,
    /// No handler exists for the descriptor's kind.
    UnknownKind,
    /// Filesystem operation failed.
    IoFailure,
}

/// Handler-level error. Never leaves the executor; the dispatcher turns it
/// into a failed [`ExecutionResult`].
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("path outside workspace boundary (security violation)")]
    SecurityViolation,

    #[error("command timed out after {0} seconds")]
    Timeout(u64),

    #[error("failed to run process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("unknown command kind: {0}")]
    UnknownKind(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ExecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecError::SecurityViolation => ErrorKind::SecurityViolation,
            ExecError::Timeout(_) => ErrorKind::Timeout,
            ExecError::Spawn(_) => ErrorKind::ProcessFailure,
            ExecError::UnknownKind(_) => ErrorKind::UnknownKind,
            ExecError::Io(_) => ErrorKind::IoFailure,
        }
    }
}

/// What the result is about. Serializes as a `path` or `command` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Path(String),
    Command(String),
}

/// Kind-specific detail of a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Created {
        absolute_path: PathBuf,
        message: String,
    },
    Completed {
        return_code: i32,
        stdout: String,
        stderr: String,
        message: String,
    },
    Failed {
        error_kind: ErrorKind,
        error: String,
    },
}

impl From<ExecError> for Outcome {
    fn from(err: ExecError) -> Self {
        Outcome::Failed {
            error_kind: err.kind(),
            error: err.to_string(),
        }
    }
}

/// Outcome of one descriptor. A batch of N descriptors always yields N of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub kind: CommandKind,
    #[serde(flatten)]
    pub target: Target,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub original_command: String,
}

impl ExecutionResult {
    pub fn new(descriptor: &CommandDescriptor, target: Target, outcome: Outcome) -> Self {
        let success = match &outcome {
            Outcome::Created { .. } => true,
            Outcome::Completed { return_code, .. } => *return_code == 0,
            Outcome::Failed { .. } => false,
        };

        Self {
            success,
            kind: descriptor.kind.clone(),
            target,
            outcome,
            original_command: descriptor.original.clone(),
        }
    }

    /// Failure category, if any. A completed process with a non-zero exit
    /// code reports `ProcessFailure`.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.outcome {
            Outcome::Failed { error_kind, .. } => Some(*error_kind),
            Outcome::Completed { return_code, .. } if *return_code != 0 => {
                Some(ErrorKind::ProcessFailure)
            }
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn return_code(&self) -> Option<i32> {
        match &self.outcome {
            Outcome::Completed { return_code, .. } => Some(*return_code),
            _ => None,
        }
    }

    pub fn stdout(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Completed { stdout, .. } => Some(stdout),
            _ => None,
        }
    }

    pub fn stderr(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Completed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }

    /// One-line human summary, used by the CLI text output.
    pub fn summary(&self) -> String {
        let subject = match &self.target {
            Target::Path(p) => p.as_str(),
            Target::Command(c) => c.lines().next().unwrap_or(""),
        };
        let status = if self.success { "ok" } else { "FAIL" };

        match &self.outcome {
            Outcome::Created { message, .. } => {
                format!("[{}] {} {}: {}", status, self.kind, subject, message)
            }
            Outcome::Completed { return_code, .. } => {
                format!("[{}] {} {} (exit {})", status, self.kind, subject, return_code)
            }
            Outcome::Failed { error, .. } => {
                format!("[{}] {} {}: {}", status, self.kind, subject, error)
            }
        }
    }
}

/// Truncate to at most `max` characters on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
