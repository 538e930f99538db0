use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::config::Config;
use crate::executor::{CommandDescriptor, CommandDetector};

use super::read_input;

#[derive(Args)]
pub struct DetectArgs {
    /// File with the LLM output to scan (default: stdin)
    pub file: Option<PathBuf>,

    /// Output format: text (default) or json
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

pub async fn run(args: DetectArgs, config: &Config) -> Result<()> {
    let text = read_input(args.file.as_deref()).await?;
    let detector = CommandDetector::new(config.executor.allow_overlapping_detections);
    let descriptors = detector.detect(&text);

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&descriptors)?),
        _ => {
            if descriptors.is_empty() {
                println!("No commands found.");
            }
            for descriptor in &descriptors {
                println!("{}", describe(descriptor));
            }
        }
    }

    Ok(())
}

fn describe(descriptor: &CommandDescriptor) -> String {
    let mut lines = descriptor.payload.lines();
    let first = lines.next().unwrap_or("");
    let more = lines.count();

    if more == 0 {
        format!("{:<16} {}", descriptor.kind.as_str(), first)
    } else {
        format!(
            "{:<16} {} (+{} more lines)",
            descriptor.kind.as_str(),
            first,
            more
        )
    }
}
