mod config;
mod probe;
mod provider;
mod runner;
mod summary;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use log::info;

use runner::Runner;

#[derive(Parser, Debug)]
#[command(name = "cdn-ops")]
#[command(about = "Purge a Cloudflare zone's cache and verify the domain still responds")]
struct Args {
    /// Path to the configuration file; credentials may also come from the environment
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Load configuration first (before logger init)
    let config = config::Config::load(args.config.as_deref())?;

    // Initialize logger with config log level (env var takes precedence)
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&config.logging.level)
    ).init();

    match &args.config {
        Some(path) => info!("Loaded configuration from: {}", path.display()),
        None => info!("Loaded configuration from environment"),
    }
    info!("Cloudflare settings: {:?}", config.cloudflare);

    let runner = Runner::new(&config)?;
    let summary = runner.run().await;

    Ok(ExitCode::from(summary.exit_status()))
}
