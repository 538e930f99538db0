//! Shell providers: how a command body becomes a process invocation.
//!
//! One provider is chosen when the executor is built and used for every
//! process it spawns. Alternate backends only need to implement
//! [`ShellProvider`].

use std::path::Path;
use std::sync::Arc;
use tokio::process::Command;

#[cfg_attr(test, mockall::automock)]
pub trait ShellProvider: Send + Sync {
    /// Short name for logs and diagnostics.
    fn name(&self) -> String;

    /// Command that runs `body` as a shell script.
    fn shell_command(&self, body: &str) -> Command;

    /// Command that runs the python script at `script`.
    fn python_command(&self, script: &Path) -> Command;
}

/// `bash -c <body>` (or another POSIX shell).
#[derive(Debug, Clone)]
pub struct PosixShell {
    program: String,
    python: String,
}

impl PosixShell {
    pub fn new(program: impl Into<String>, python: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            python: python.into(),
        }
    }
}

impl ShellProvider for PosixShell {
    fn name(&self) -> String {
        self.program.clone()
    }

    fn shell_command(&self, body: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-c").arg(body);
        cmd
    }

    fn python_command(&self, script: &Path) -> Command {
        let mut cmd = Command::new(&self.python);
        cmd.arg(script);
        cmd
    }
}

/// `powershell -NoProfile -Command <body>`.
#[derive(Debug, Clone)]
pub struct PowerShell {
    program: String,
    python: String,
}

impl PowerShell {
    pub fn new(program: impl Into<String>, python: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            python: python.into(),
        }
    }
}

impl ShellProvider for PowerShell {
    fn name(&self) -> String {
        self.program.clone()
    }

    fn shell_command(&self, body: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-NoProfile").arg("-Command").arg(body);
        cmd
    }

    fn python_command(&self, script: &Path) -> Command {
        let mut cmd = Command::new(&self.python);
        cmd.arg(script);
        cmd
    }
}

/// Pick a provider from the `shell` config value.
///
/// `"auto"` means PowerShell on Windows and bash elsewhere. Names containing
/// `powershell` or `pwsh` select the PowerShell provider; anything else is
/// treated as a POSIX shell program.
pub fn provider_for(shell: &str, python: &str) -> Arc<dyn ShellProvider> {
    let shell = shell.trim();
    if shell.is_empty() || shell.eq_ignore_ascii_case("auto") {
        if cfg!(windows) {
            return Arc::new(PowerShell::new("powershell", python));
        }
        return Arc::new(PosixShell::new("bash", python));
    }

    let lower = shell.to_ascii_lowercase();
    if lower.contains("powershell") || lower.contains("pwsh") {
        Arc::new(PowerShell::new(shell, python))
    } else {
        Arc::new(PosixShell::new(shell, python))
    }
}

/// Default python interpreter name for this platform.
pub fn default_python() -> String {
    if cfg!(windows) {
        "python".to_string()
    } else {
        "python3".to_string()
    }
}
