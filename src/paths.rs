//! XDG Base Directory Specification compliant path resolution.
//!
//! Every directory is resolved through a three-level fallback:
//! 1. Shellward-specific env var (SHELLWARD_CONFIG_DIR, etc.)
//! 2. XDG env var (XDG_CONFIG_HOME, etc.) via `etcetera`
//! 3. Platform default (~/.config, etc.)
//!
//! All paths are absolute. Relative paths from env vars are ignored as XDG requires.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Resolved directory paths for the entire application.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Config directory: config.toml lives here
    pub config_dir: PathBuf,

    /// Data directory root: contains the default workspace
    pub data_dir: PathBuf,

    /// Workspace root all commands are confined to.
    /// May be overridden independently via SHELLWARD_WORKSPACE.
    pub workspace: PathBuf,

    /// State directory: workspace locks
    pub state_dir: PathBuf,
}

impl Paths {
    /// Resolve all paths using real environment variables.
    pub fn resolve() -> Result<Self> {
        Self::resolve_with_env(|key| std::env::var(key))
    }

    /// Resolve paths with a custom env var lookup (for testing).
    pub fn resolve_with_env<F>(env_fn: F) -> Result<Self>
    where
        F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
    {
        use etcetera::BaseStrategy;

        let strategy = etcetera::choose_base_strategy()
            .map_err(|e| anyhow::anyhow!("Failed to determine base directories: {}", e))?;

        let config_dir = env_or(&env_fn, "SHELLWARD_CONFIG_DIR", || {
            strategy.config_dir().join("shellward")
        });

        let data_dir = env_or(&env_fn, "SHELLWARD_DATA_DIR", || {
            strategy.data_dir().join("shellward")
        });

        let state_dir = env_or(&env_fn, "SHELLWARD_STATE_DIR", || {
            let base_state = strategy.state_dir().unwrap_or_else(|| strategy.data_dir());
            base_state.join("shellward")
        });

        let workspace = resolve_workspace(&env_fn, &data_dir);

        Ok(Self {
            config_dir,
            data_dir,
            workspace,
            state_dir,
        })
    }

    /// Config file: config_dir/config.toml
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Locks directory: state_dir/locks
    pub fn locks_dir(&self) -> PathBuf {
        self.state_dir.join("locks")
    }

    /// Lock file for one workspace, keyed by a hash of its path so that
    /// different workspaces never contend.
    pub fn workspace_lock(&self, workspace: &Path) -> PathBuf {
        let digest = Sha256::digest(workspace.to_string_lossy().as_bytes());
        let key = format!("{:x}", digest);
        self.locks_dir().join(format!("workspace-{}.lock", &key[..16]))
    }

    /// Create all directories with appropriate permissions.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.config_dir, &self.data_dir, &self.state_dir] {
            create_dir_with_mode(dir)?;
        }
        Ok(())
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::resolve().unwrap_or_else(|_| {
            // Only reached when no home directory can be determined
            let home = etcetera::home_dir().unwrap_or_else(|_| PathBuf::from("."));
            let data_dir = home.join(".local").join("share").join("shellward");
            Self {
                config_dir: home.join(".config").join("shellward"),
                workspace: data_dir.join("workspace"),
                data_dir,
                state_dir: home.join(".local").join("state").join("shellward"),
            }
        })
    }
}

/// Resolve an env var with fallback. Ignores empty and relative paths as XDG requires.
fn env_or<F>(env_fn: &F, var: &str, default: impl FnOnce() -> PathBuf) -> PathBuf
where
    F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
{
    env_fn(var)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .filter(|p| p.is_absolute()) // XDG: relative paths are invalid
        .unwrap_or_else(default)
}

/// Resolve workspace path with SHELLWARD_WORKSPACE or default.
fn resolve_workspace<F>(env_fn: &F, data_dir: &Path) -> PathBuf
where
    F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
{
    if let Ok(ws) = env_fn("SHELLWARD_WORKSPACE") {
        let trimmed = ws.trim();
        if !trimmed.is_empty() {
            let expanded = shellexpand::tilde(trimmed);
            let path = PathBuf::from(expanded.to_string());
            if path.is_absolute() {
                return path;
            }
        }
    }

    data_dir.join("workspace")
}

/// Create a directory with mode 0700 as XDG requires.
fn create_dir_with_mode(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
            .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}
