pub mod check;
pub mod config;
pub mod detect;
pub mod paths;
pub mod run;
pub mod tree;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "shellward")]
#[command(
    author,
    version,
    about = "Run the commands an LLM writes, confined to one workspace"
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Workspace directory (overrides config)
    #[arg(short, long, global = true, env = "SHELLWARD_WORKSPACE")]
    pub workspace: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect and execute every command in a piece of LLM output
    Run(run::RunArgs),

    /// List the commands found in a piece of LLM output without running them
    Detect(detect::DetectArgs),

    /// Show the workspace contents as a tree
    Tree(tree::TreeArgs),

    /// Check whether a path stays inside the workspace
    CheckPath(check::CheckPathArgs),

    /// Configuration management
    Config(config::ConfigArgs),

    /// Show resolved XDG directory paths
    Paths,
}

/// Load config and apply the `--workspace` override. A relative override
/// is taken relative to the current directory.
pub fn load_config(workspace: Option<&Path>) -> Result<Config> {
    let mut config = Config::load()?;
    if let Some(ws) = workspace {
        let expanded = shellexpand::tilde(&ws.to_string_lossy()).to_string();
        let path = PathBuf::from(expanded);
        config.paths.workspace = if path.is_absolute() {
            path
        } else {
            std::env::current_dir()
                .context("Failed to read current directory")?
                .join(path)
        };
    }
    Ok(config)
}

/// Read the whole input from `file`, or from stdin when no file (or `-`) is given.
pub async fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path != Path::new("-") => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}
