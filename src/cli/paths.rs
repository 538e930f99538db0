//! CLI subcommand: `shellward paths`
//!
//! Prints all resolved XDG-compliant paths for debugging and scripting.

use anyhow::Result;

use crate::config::Config;

pub fn run(config: &Config) -> Result<()> {
    let paths = &config.paths;
    let canonical = paths
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| paths.workspace.clone());

    println!("Shellward Paths (XDG Base Directory)");
    println!("=====================================");
    println!();
    println!("Config:     {}", paths.config_dir.display());
    println!("  config.toml:    {}", paths.config_file().display());
    println!();
    println!("Data:       {}", paths.data_dir.display());
    println!("  workspace:      {}", paths.workspace.display());
    println!();
    println!("State:      {}", paths.state_dir.display());
    println!("  locks:          {}", paths.locks_dir().display());
    println!(
        "  workspace lock: {}",
        paths.workspace_lock(&canonical).display()
    );

    Ok(())
}
