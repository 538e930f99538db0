//! Workspace-confined command execution for untrusted model output.
//!
//! [`CommandExecutor`] ties the pieces together: text goes through the
//! [`CommandDetector`], each descriptor is dispatched by kind to the
//! filesystem handlers (behind the [`PathGuard`]) or the [`ProcessRunner`],
//! and every descriptor yields exactly one [`ExecutionResult`].
//!
//! Execution within one call is sequential. The executor holds only the
//! canonical workspace root and immutable settings, so one instance can be
//! shared across tasks behind an `Arc`.

pub mod command;
pub mod detect;
pub mod fs_ops;
pub mod guard;
pub mod result;
pub mod runner;
pub mod shell;
pub mod tree;

pub use command::{CommandDescriptor, CommandKind};
pub use detect::CommandDetector;
pub use guard::{PathContainment, PathGuard};
pub use result::{ErrorKind, ExecError, ExecutionResult, Outcome, Target};
pub use runner::ProcessRunner;
pub use shell::{PosixShell, PowerShell, ShellProvider, provider_for};
pub use tree::WorkspaceTree;

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ExecutorConfig;
use result::{COMMAND_DISPLAY_CHARS, truncate_chars};

/// Timeout applied to every spawned process unless configured otherwise.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub struct CommandExecutor {
    workspace: PathBuf,
    detector: CommandDetector,
    guard: PathGuard,
    runner: ProcessRunner,
}

impl CommandExecutor {
    /// Create the workspace directory if needed and pin its canonical path.
    pub fn new(workspace: impl AsRef<Path>, config: &ExecutorConfig) -> Result<Self> {
        let workspace = workspace.as_ref();
        fs::create_dir_all(workspace).with_context(|| {
            format!("Failed to create workspace directory: {}", workspace.display())
        })?;
        let root = workspace
            .canonicalize()
            .with_context(|| format!("Failed to resolve workspace: {}", workspace.display()))?;

        let shell = provider_for(&config.shell, &config.python);
        info!(
            "CommandExecutor initialized with workspace: {} (shell: {}, timeout: {}s)",
            root.display(),
            shell.name(),
            config.timeout_secs
        );

        Ok(Self {
            detector: CommandDetector::new(config.allow_overlapping_detections),
            guard: PathGuard::new(root.clone(), config.path_containment),
            runner: ProcessRunner::new(
                root.clone(),
                shell,
                config.timeout_secs,
                config.max_output_bytes,
            ),
            workspace: root,
        })
    }

    /// Replace the shell provider chosen from config.
    pub fn with_shell(mut self, shell: Arc<dyn ShellProvider>) -> Self {
        self.runner = ProcessRunner::new(
            self.workspace.clone(),
            shell,
            self.runner.timeout_secs(),
            self.runner.max_output_bytes(),
        );
        self
    }

    /// Canonical workspace root.
    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn detect(&self, text: &str) -> Vec<CommandDescriptor> {
        self.detector.detect(text)
    }

    pub fn is_safe_path(&self, path: &str) -> bool {
        self.guard.is_safe(path)
    }

    /// Execute a single descriptor. Never fails; failures are results.
    pub async fn execute(&self, descriptor: &CommandDescriptor) -> ExecutionResult {
        let payload = descriptor.payload.as_str();
        debug!("Dispatching {} ({})", descriptor.kind, truncate_chars(payload, 100));

        match &descriptor.kind {
            CommandKind::MakeDirectory | CommandKind::MakeFile => {
                let outcome = if descriptor.kind == CommandKind::MakeDirectory {
                    fs_ops::make_directory(&self.guard, payload)
                } else {
                    fs_ops::make_file(&self.guard, payload)
                };

                let shown = match &outcome {
                    Ok(Outcome::Created { absolute_path, .. }) => {
                        self.guard.display_relative(absolute_path, payload)
                    }
                    _ => payload.to_string(),
                };

                ExecutionResult::new(
                    descriptor,
                    Target::Path(shown),
                    outcome.unwrap_or_else(Outcome::from),
                )
            }
            CommandKind::TerminalBlock | CommandKind::TerminalLine | CommandKind::PythonScript => {
                let outcome = self.runner.run(payload, &descriptor.kind).await;
                ExecutionResult::new(
                    descriptor,
                    Target::Command(truncate_chars(payload, COMMAND_DISPLAY_CHARS).to_string()),
                    outcome.unwrap_or_else(Outcome::from),
                )
            }
            CommandKind::Unknown(kind) => ExecutionResult::new(
                descriptor,
                Target::Command(truncate_chars(payload, COMMAND_DISPLAY_CHARS).to_string()),
                ExecError::UnknownKind(kind.clone()).into(),
            ),
        }
    }

    /// Execute descriptors one after another, in order. One result per
    /// descriptor; a failure does not stop the batch.
    pub async fn execute_all(&self, descriptors: &[CommandDescriptor]) -> Vec<ExecutionResult> {
        let mut results = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            results.push(self.execute(descriptor).await);
        }
        results
    }

    /// Detect and execute every command in `text`. Returns the text
    /// unchanged together with the results.
    pub async fn process_output(&self, text: &str) -> (String, Vec<ExecutionResult>) {
        let descriptors = self.detect(text);
        if descriptors.is_empty() {
            return (text.to_string(), Vec::new());
        }

        let results = self.execute_all(&descriptors).await;

        let succeeded = results.iter().filter(|r| r.success).count();
        info!(
            "Executed {}/{} commands successfully",
            succeeded,
            results.len()
        );

        (text.to_string(), results)
    }

    /// Current workspace listing. Recomputed on every call.
    pub fn snapshot(&self) -> WorkspaceTree {
        WorkspaceTree::capture(&self.workspace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::shell::MockShellProvider;
    use tokio::process::Command;

    fn config() -> ExecutorConfig {
        ExecutorConfig {
            shell: "sh".to_string(),
            ..ExecutorConfig::default()
        }
    }

    fn executor(root: &Path) -> CommandExecutor {
        CommandExecutor::new(root, &config()).unwrap()
    }

    #[test]
    fn new_creates_missing_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = tmp.path().join("nested/llm_workspace");

        let exec = executor(&ws);
        assert!(ws.is_dir());
        assert_eq!(exec.workspace(), ws.canonicalize().unwrap());
    }

    #[tokio::test]
    async fn no_commands_returns_text_unchanged() {
        let tmp = tempfile::tempdir().unwrap();
        let exec = executor(tmp.path());

        let text = "Recursion is when a function calls itself.";
        let (out, results) = exec.process_output(text).await;
        assert_eq!(out, text);
        assert!(results.is_empty());
        assert_eq!(exec.snapshot().tree_lines.len(), 1);
    }

    #[tokio::test]
    async fn unknown_kind_has_no_side_effects() {
        let tmp = tempfile::tempdir().unwrap();

        let mut shell = MockShellProvider::new();
        shell.expect_name().return_const("mock".to_string());
        shell.expect_shell_command().never();
        shell.expect_python_command().never();

        let exec = executor(tmp.path()).with_shell(Arc::new(shell));
        let descriptor = CommandDescriptor::new("bogus", "mkdir nope", "bogus text");
        let result = exec.execute(&descriptor).await;

        assert!(!result.success);
        assert_eq!(result.error_kind(), Some(ErrorKind::UnknownKind));
        assert!(result.error().unwrap().starts_with("unknown command kind"));
        assert_eq!(result.original_command, "bogus text");
        assert_eq!(std::fs::read_dir(exec.workspace()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn make_directory_twice_then_snapshot() {
        let tmp = tempfile::tempdir().unwrap();
        let exec = executor(tmp.path());
        let descriptor = CommandDescriptor::new("make-directory", "a/b", "mkdir a/b");

        let first = exec.execute(&descriptor).await;
        let before = exec.snapshot();
        let second = exec.execute(&descriptor).await;
        let after = exec.snapshot();

        assert!(first.success && second.success);
        assert_eq!(first.target, Target::Path("a/b".to_string()));
        assert_eq!(before, after);
        assert_eq!(&after.tree_lines[1..], &["└── a", "    └── b"]);
    }

    #[tokio::test]
    async fn traversal_is_rejected_without_mutation() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = tmp.path().join("ws");
        let exec = executor(&ws);

        let results = exec
            .execute_all(&[
                CommandDescriptor::new("make-directory", "../escape", "mkdir ../escape"),
                CommandDescriptor::new("make-file", "../../x.txt", "touch ../../x.txt"),
            ])
            .await;

        assert_eq!(results.len(), 2);
        for r in &results {
            assert!(!r.success);
            assert_eq!(r.error_kind(), Some(ErrorKind::SecurityViolation));
        }
        assert!(!tmp.path().join("escape").exists());
    }

    #[tokio::test]
    async fn string_prefix_mode_reproduces_sibling_flaw() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = tmp.path().join("sandbox");

        let legacy = CommandExecutor::new(
            &ws,
            &ExecutorConfig {
                path_containment: PathContainment::StringPrefix,
                ..config()
            },
        )
        .unwrap();
        assert!(legacy.is_safe_path("../sandbox-other"));

        let fixed = executor(&ws);
        assert!(!fixed.is_safe_path("../sandbox-other"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn fenced_mkdir_runs_both_descriptors() {
        let tmp = tempfile::tempdir().unwrap();
        let exec = executor(tmp.path());

        let text = "Create it:\n```bash\nmkdir test\n```\n";
        let (out, results) = exec.process_output(text).await;

        assert_eq!(out, text);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].kind, CommandKind::TerminalBlock);
        assert!(results[0].success, "{:?}", results[0]);
        assert_eq!(results[1].kind, CommandKind::MakeDirectory);
        assert!(results[1].success);
        assert_eq!(results[1].original_command, "mkdir test");
        assert!(exec.workspace().join("test").is_dir());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn echo_line_reports_stdout() {
        let tmp = tempfile::tempdir().unwrap();
        let exec = executor(tmp.path());

        let (_, results) = exec.process_output("$ echo hello\n").await;
        assert_eq!(results.len(), 1);
        let r = &results[0];
        assert!(r.success);
        assert_eq!(r.return_code(), Some(0));
        assert_eq!(r.stdout(), Some("hello"));
        assert_eq!(r.target, Target::Command("echo hello".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failures_do_not_stop_the_batch() {
        let tmp = tempfile::tempdir().unwrap();
        let exec = CommandExecutor::new(
            tmp.path(),
            &ExecutorConfig {
                timeout_secs: 1,
                ..config()
            },
        )
        .unwrap();

        let text = "$ sleep 5\n$ exit 2\ntouch done.txt\nmkdir ../../nope\n";
        let (_, results) = exec.process_output(text).await;

        let kinds: Vec<Option<ErrorKind>> = results.iter().map(|r| r.error_kind()).collect();
        assert_eq!(
            kinds,
            vec![
                Some(ErrorKind::Timeout),
                Some(ErrorKind::ProcessFailure),
                Some(ErrorKind::SecurityViolation),
                None,
            ]
        );
        assert!(results[0].error().unwrap().contains("timed out after 1 seconds"));
        assert!(exec.workspace().join("done.txt").is_file());
    }

    #[tokio::test]
    async fn injected_shell_receives_terminal_bodies() {
        let tmp = tempfile::tempdir().unwrap();

        let mut shell = MockShellProvider::new();
        shell.expect_name().return_const("mock".to_string());
        shell
            .expect_shell_command()
            .withf(|body: &str| body == "do-the-thing")
            .times(1)
            .returning(|_| {
                let mut cmd = Command::new(std::env::current_exe().unwrap());
                cmd.arg("--list");
                cmd
            });

        let exec = executor(tmp.path()).with_shell(Arc::new(shell));
        let result = exec
            .execute(&CommandDescriptor::new(
                "terminal-line",
                "do-the-thing",
                "$ do-the-thing",
            ))
            .await;

        assert_eq!(result.kind, CommandKind::TerminalLine);
        assert!(result.return_code().is_some());
    }

    #[tokio::test]
    async fn long_commands_are_truncated_for_display() {
        let tmp = tempfile::tempdir().unwrap();
        let exec = executor(tmp.path());

        let body = "x".repeat(500);
        let result = exec
            .execute(&CommandDescriptor::new("bogus", body.clone(), body))
            .await;
        match result.target {
            Target::Command(c) => assert_eq!(c.len(), COMMAND_DISPLAY_CHARS),
            other => panic!("unexpected target {:?}", other),
        }
    }
}
