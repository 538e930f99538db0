use anyhow::Result;
use clap::Args;

use crate::config::Config;
use crate::executor::PathGuard;

#[derive(Args)]
pub struct CheckPathArgs {
    /// Path as it would appear in a command, relative to the workspace
    pub path: String,
}

/// Prints the verdict and exits non-zero when the path is rejected.
pub async fn run(args: CheckPathArgs, config: &Config) -> Result<()> {
    let workspace = config.workspace_path();
    std::fs::create_dir_all(&workspace)?;
    let guard = PathGuard::new(workspace.canonicalize()?, config.executor.path_containment);

    match guard.resolve(&args.path) {
        Some(resolved) => {
            println!("allowed: {} -> {}", args.path, resolved.display());
            Ok(())
        }
        None => anyhow::bail!(
            "blocked: {} resolves outside {}",
            args.path,
            guard.root().display()
        ),
    }
}
