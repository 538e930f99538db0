use anyhow::Result;
use clap::Args;

use crate::config::Config;
use crate::executor::CommandExecutor;

#[derive(Args)]
pub struct TreeArgs {
    /// Output format: text (default) or json
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

pub async fn run(args: TreeArgs, config: &Config) -> Result<()> {
    let executor = CommandExecutor::new(config.workspace_path(), &config.executor)?;
    let tree = executor.snapshot();

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&tree)?),
        _ => println!("{}", tree.tree_text),
    }

    Ok(())
}
