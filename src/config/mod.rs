use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::executor::DEFAULT_TIMEOUT_SECS;
use crate::executor::guard::PathContainment;
use crate::executor::shell::default_python;
use crate::paths::Paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Resolved XDG-compliant paths (not serialized)
    #[serde(skip)]
    pub paths: Paths,

    #[serde(default)]
    pub workspace: WorkspaceConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Workspace root. Overridden by SHELLWARD_WORKSPACE.
    /// Default: data_dir/workspace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Timeout for every spawned process, in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Cap on captured stdout and stderr, each (0 = unlimited)
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,

    /// Keep descriptors found inside another match (e.g. a `mkdir` line
    /// inside a fenced bash block). Both then execute.
    #[serde(default = "default_true")]
    pub allow_overlapping_detections: bool,

    /// Workspace boundary check: "component" | "string-prefix"
    #[serde(default)]
    pub path_containment: PathContainment,

    /// Shell program: "auto" | "bash" | "sh" | "powershell" | "pwsh" | path
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Interpreter for fenced python blocks
    #[serde(default = "default_python")]
    pub python: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: "text" | "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_true() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_max_output_bytes() -> usize {
    1024 * 1024 // 1MB
}
fn default_shell() -> String {
    "auto".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_output_bytes: default_max_output_bytes(),
            allow_overlapping_detections: default_true(),
            path_containment: PathContainment::default(),
            shell: default_shell(),
            python: default_python(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Dotted keys understood by [`Config::get_value`] and [`Config::set_value`].
pub const CONFIG_KEYS: &[&str] = &[
    "workspace.path",
    "executor.timeout_secs",
    "executor.max_output_bytes",
    "executor.allow_overlapping_detections",
    "executor.path_containment",
    "executor.shell",
    "executor.python",
    "logging.level",
    "logging.format",
];

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Paths::resolve()?;
        paths.ensure_dirs()?;
        let path = paths.config_file();

        if !path.exists() {
            // Create default config file on first run
            let config = Config {
                paths,
                ..Config::default()
            };
            config.save_with_template()?;
            return Ok(config);
        }

        let mut config = Self::load_from(&path)?;
        config.paths = paths;
        config.apply_workspace_override();
        Ok(config)
    }

    /// Parse a config file without touching the resolved paths.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        Ok(config)
    }

    /// `workspace.path` from the config file applies unless SHELLWARD_WORKSPACE is set.
    fn apply_workspace_override(&mut self) {
        if std::env::var("SHELLWARD_WORKSPACE").is_ok() {
            return;
        }
        if let Some(ref ws) = self.workspace.path {
            let expanded = shellexpand::tilde(ws.trim());
            let ws_path = PathBuf::from(expanded.to_string());
            if ws_path.is_absolute() {
                self.paths.workspace = ws_path;
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = self.paths.config_file();

        // Create parent directories
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;

        Ok(())
    }

    /// Save config with a helpful template (for first-time setup)
    pub fn save_with_template(&self) -> Result<()> {
        let path = self.paths.config_file();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, DEFAULT_CONFIG_TEMPLATE)?;
        eprintln!("Created default config at {}", path.display());

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let paths = Paths::resolve()?;
        Ok(paths.config_file())
    }

    pub fn get_value(&self, key: &str) -> Result<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["workspace", "path"] => Ok(self.workspace.path.clone().unwrap_or_default()),
            ["executor", "timeout_secs"] => Ok(self.executor.timeout_secs.to_string()),
            ["executor", "max_output_bytes"] => Ok(self.executor.max_output_bytes.to_string()),
            ["executor", "allow_overlapping_detections"] => {
                Ok(self.executor.allow_overlapping_detections.to_string())
            }
            ["executor", "path_containment"] => Ok(match self.executor.path_containment {
                PathContainment::Component => "component".to_string(),
                PathContainment::StringPrefix => "string-prefix".to_string(),
            }),
            ["executor", "shell"] => Ok(self.executor.shell.clone()),
            ["executor", "python"] => Ok(self.executor.python.clone()),
            ["logging", "level"] => Ok(self.logging.level.clone()),
            ["logging", "format"] => Ok(self.logging.format.clone()),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["workspace", "path"] => self.workspace.path = Some(value.to_string()),
            ["executor", "timeout_secs"] => self.executor.timeout_secs = value.parse()?,
            ["executor", "max_output_bytes"] => self.executor.max_output_bytes = value.parse()?,
            ["executor", "allow_overlapping_detections"] => {
                self.executor.allow_overlapping_detections = value.parse()?
            }
            ["executor", "path_containment"] => {
                self.executor.path_containment = match value {
                    "component" => PathContainment::Component,
                    "string-prefix" => PathContainment::StringPrefix,
                    other => anyhow::bail!(
                        "Invalid path_containment '{}': expected component or string-prefix",
                        other
                    ),
                }
            }
            ["executor", "shell"] => self.executor.shell = value.to_string(),
            ["executor", "python"] => self.executor.python = value.to_string(),
            ["logging", "level"] => self.logging.level = value.to_string(),
            ["logging", "format"] => match value {
                "text" | "json" => self.logging.format = value.to_string(),
                other => anyhow::bail!("Invalid logging.format '{}': expected text or json", other),
            },
            _ => anyhow::bail!("Unknown config key: {}", key),
        }

        Ok(())
    }

    /// Get workspace path from resolved Paths.
    ///
    /// Resolution order:
    /// 1. SHELLWARD_WORKSPACE env var (absolute path override)
    /// 2. workspace.path from the config file
    /// 3. Default: data_dir/workspace
    pub fn workspace_path(&self) -> PathBuf {
        self.paths.workspace.clone()
    }
}

/// Default config template with helpful comments (used for first-time setup)
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Shellward Configuration
# Auto-created on first run. Edit as needed.

[workspace]
# All commands are confined to this directory (created if missing).
# Default: XDG data dir (~/.local/share/shellward/workspace)
# Override with SHELLWARD_WORKSPACE=/path/to/workspace or --workspace
# path = "~/llm_workspace"

[executor]
timeout_secs = 30                       # applies to every spawned process
max_output_bytes = 1048576              # per stream, 0 = unlimited

# A `mkdir` line inside a fenced bash block is detected twice (as the block
# and as a filesystem command) and both run. Set false to keep only the block.
allow_overlapping_detections = true

# "component" compares path segments; "string-prefix" compares raw strings
# and accepts sibling directories that share the root's name as a prefix.
path_containment = "component"

shell = "auto"                          # auto | bash | sh | powershell | pwsh
# python = "python3"

[logging]
level = "info"
format = "text"                         # text | json
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_to_defaults() {
        let config: Config = toml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.executor.timeout_secs, 30);
        assert_eq!(config.executor.max_output_bytes, 1024 * 1024);
        assert!(config.executor.allow_overlapping_detections);
        assert_eq!(config.executor.path_containment, PathContainment::Component);
        assert_eq!(config.executor.shell, "auto");
        assert_eq!(config.executor.python, default_python());
        assert!(config.workspace.path.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.executor.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.logging.format, "text");
    }

    #[test]
    fn string_prefix_containment_parses() {
        let config: Config = toml::from_str(
            r#"
            [executor]
            path_containment = "string-prefix"
            allow_overlapping_detections = false
            timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(
            config.executor.path_containment,
            PathContainment::StringPrefix
        );
        assert!(!config.executor.allow_overlapping_detections);
        assert_eq!(config.executor.timeout_secs, 5);
    }

    #[test]
    fn get_and_set_round_trip() {
        let mut config = Config::default();

        config.set_value("executor.timeout_secs", "12").unwrap();
        config
            .set_value("executor.path_containment", "string-prefix")
            .unwrap();
        config.set_value("workspace.path", "/srv/ws").unwrap();

        assert_eq!(config.get_value("executor.timeout_secs").unwrap(), "12");
        assert_eq!(
            config.get_value("executor.path_containment").unwrap(),
            "string-prefix"
        );
        assert_eq!(config.get_value("workspace.path").unwrap(), "/srv/ws");
    }

    #[test]
    fn every_listed_key_is_readable() {
        let config = Config::default();
        for key in CONFIG_KEYS {
            assert!(config.get_value(key).is_ok(), "{}", key);
        }
    }

    #[test]
    fn unknown_and_invalid_keys_are_rejected() {
        let mut config = Config::default();
        assert!(config.get_value("executor.nope").is_err());
        assert!(config.set_value("executor.timeout_secs", "soon").is_err());
        assert!(
            config
                .set_value("executor.path_containment", "loose")
                .is_err()
        );
        assert!(config.set_value("logging.format", "xml").is_err());
    }

    #[test]
    fn saved_config_reloads() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");

        let mut config = Config::default();
        config.executor.timeout_secs = 7;
        fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.executor.timeout_secs, 7);
    }
}
