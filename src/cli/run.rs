use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::concurrency::WorkspaceLock;
use crate::config::Config;
use crate::executor::{CommandExecutor, ExecutionResult};

use super::read_input;

#[derive(Args)]
pub struct RunArgs {
    /// File with the LLM output to process (default: stdin)
    pub file: Option<PathBuf>,

    /// Output format: text (default) or json
    #[arg(short, long, default_value = "text")]
    pub format: String,

    /// Fail instead of waiting when another process is using the workspace
    #[arg(long)]
    pub no_wait: bool,
}

pub async fn run(args: RunArgs, config: &Config) -> Result<()> {
    let text = read_input(args.file.as_deref()).await?;
    let executor = CommandExecutor::new(config.workspace_path(), &config.executor)?;

    let lock = WorkspaceLock::for_workspace(&config.paths, executor.workspace())?;
    let _lock_guard = if args.no_wait {
        match lock.try_acquire()? {
            Some(guard) => guard,
            None => anyhow::bail!(
                "Workspace {} is in use by another process",
                executor.workspace().display()
            ),
        }
    } else {
        tokio::task::spawn_blocking(move || lock.acquire()).await??
    };

    let (text, results) = executor.process_output(&text).await;

    match args.format.as_str() {
        "json" => {
            let output = serde_json::json!({
                "workspace": executor.workspace(),
                "text": text,
                "results": results,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => print_results(&results),
    }

    Ok(())
}

fn print_results(results: &[ExecutionResult]) {
    if results.is_empty() {
        println!("No commands found.");
        return;
    }

    for result in results {
        println!("{}", result.summary());
        if let Some(stdout) = result.stdout()
            && !stdout.is_empty()
        {
            println!("{}", indent(stdout));
        }
        if let Some(stderr) = result.stderr()
            && !stderr.is_empty()
        {
            println!("{}", indent(stderr));
        }
    }

    let succeeded = results.iter().filter(|r| r.success).count();
    println!();
    println!("{}/{} commands succeeded", succeeded, results.len());
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}
