use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use shellward::cli::{self, Cli, Commands};
use shellward::config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    init_logging(cli.verbose);

    let workspace = cli.workspace.as_deref();
    match cli.command {
        Commands::Run(args) => cli::run::run(args, &cli::load_config(workspace)?).await,
        Commands::Detect(args) => cli::detect::run(args, &cli::load_config(workspace)?).await,
        Commands::Tree(args) => cli::tree::run(args, &cli::load_config(workspace)?).await,
        Commands::CheckPath(args) => cli::check::run(args, &cli::load_config(workspace)?).await,
        Commands::Config(args) => cli::config::run(args).await,
        Commands::Paths => cli::paths::run(&cli::load_config(workspace)?),
    }
}

/// RUST_LOG wins, then `--verbose`, then `[logging]` from an existing
/// config file. Never creates the config file.
fn init_logging(verbose: bool) {
    let logging = Config::config_path()
        .ok()
        .filter(|path| path.exists())
        .and_then(|path| Config::load_from(&path).ok())
        .map(|config| config.logging)
        .unwrap_or_default();

    let level = if verbose {
        "debug"
    } else {
        logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

