//! Process execution with a hard timeout.
//!
//! Every process runs in the workspace root with stdin closed and its
//! output captured. Each stream keeps at most `max_output_bytes` in memory;
//! anything past that is read and counted but not stored. On Unix the child leads its own process group, so a
//! timeout kills everything it spawned. Elsewhere only the direct child is
//! killed and descendants may outlive the timeout.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

use super::command::CommandKind;
use super::result::{ExecError, Outcome, truncate_chars};
use super::shell::ShellProvider;

/// Runs command bodies through the configured shell provider.
#[derive(Clone)]
pub struct ProcessRunner {
    workspace: PathBuf,
    shell: Arc<dyn ShellProvider>,
    timeout_secs: u64,
    max_output_bytes: usize,
}

impl ProcessRunner {
    pub fn new(
        workspace: PathBuf,
        shell: Arc<dyn ShellProvider>,
        timeout_secs: u64,
        max_output_bytes: usize,
    ) -> Self {
        Self {
            workspace,
            shell,
            timeout_secs,
            max_output_bytes,
        }
    }

    pub fn shell_name(&self) -> String {
        self.shell.name()
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    pub fn max_output_bytes(&self) -> usize {
        self.max_output_bytes
    }

    /// Run `body` as the given kind. Python scripts go through a temporary
    /// file in the workspace that is removed when this call returns,
    /// whatever the outcome.
    pub async fn run(&self, body: &str, kind: &CommandKind) -> Result<Outcome, ExecError> {
        debug!(
            "Executing {} in workspace via {}: {}",
            kind,
            self.shell.name(),
            truncate_chars(body, 100)
        );

        match kind {
            CommandKind::PythonScript => {
                let script = self.write_script(body)?;
                let cmd = self.shell.python_command(&script);
                self.run_command(cmd).await
                // `script` dropped here, deleting the file
            }
            _ => self.run_command(self.shell.shell_command(body)).await,
        }
    }

    fn write_script(&self, body: &str) -> Result<tempfile::TempPath, ExecError> {
        use std::io::Write;

        let mut file = tempfile::Builder::new()
            .prefix("_script_")
            .suffix(".py")
            .tempfile_in(&self.workspace)?;
        file.write_all(body.as_bytes())?;
        file.flush()?;
        Ok(file.into_temp_path())
    }

    async fn run_command(&self, mut cmd: Command) -> Result<Outcome, ExecError> {
        cmd.current_dir(&self.workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.as_std_mut().process_group(0);
        }

        let mut child = cmd.spawn().map_err(ExecError::Spawn)?;
        let pid = child.id();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let limit = self.max_output_bytes;

        let collected = async {
            tokio::try_join!(
                child.wait(),
                read_capped(stdout, limit),
                read_capped(stderr, limit)
            )
        };
        let waited =
            tokio::time::timeout(Duration::from_secs(self.timeout_secs), collected).await;

        let (status, stdout, stderr) = match waited {
            Ok(result) => result.map_err(ExecError::Spawn)?,
            Err(_) => {
                warn!(
                    "Command timed out after {}s (pid {:?})",
                    self.timeout_secs, pid
                );
                kill_process_group(pid);
                return Err(ExecError::Timeout(self.timeout_secs));
            }
        };

        let return_code = status.code().unwrap_or(-1);
        let stdout = stdout.into_text();
        let stderr = stderr.into_text();

        let message = if return_code == 0 {
            "Command executed successfully"
        } else {
            "Command failed"
        };

        Ok(Outcome::Completed {
            return_code,
            stdout,
            stderr,
            message: message.to_string(),
        })
    }
}

/// Output read from one stream. At most `limit` bytes are kept; the rest is
/// read and counted so the child never blocks on a full pipe.
#[derive(Debug, Default)]
struct Captured {
    kept: Vec<u8>,
    total: usize,
}

impl Captured {
    fn truncated(&self) -> bool {
        self.total > self.kept.len()
    }

    /// Lossy decode and trim, with a marker when bytes were dropped.
    fn into_text(mut self) -> String {
        if self.truncated()
            && let Err(e) = std::str::from_utf8(&self.kept)
            && e.error_len().is_none()
        {
            // Cut landed inside a multi-byte character
            self.kept.truncate(e.valid_up_to());
        }

        let text = String::from_utf8_lossy(&self.kept);
        let text = text.trim();
        if self.truncated() {
            format!("{}\n[output truncated, {} bytes total]", text, self.total)
        } else {
            text.to_string()
        }
    }
}

async fn read_capped<R>(reader: Option<R>, limit: usize) -> std::io::Result<Captured>
where
    R: AsyncRead + Unpin,
{
    let mut captured = Captured::default();
    let Some(mut reader) = reader else {
        return Ok(captured);
    };

    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        let room = if limit == 0 {
            n
        } else {
            limit.saturating_sub(captured.kept.len()).min(n)
        };
        captured.kept.extend_from_slice(&buf[..room]);
        captured.total += n;
    }

    Ok(captured)
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Some(pid) = pid else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        debug!("killpg({}) failed: {}", pid, e);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {
    // kill_on_drop already took down the direct child
}
