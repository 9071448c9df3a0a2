use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use track_search::config::Config;
use track_search::ui::run_tui_app;
use track_search::utils::logging::init_tracing_with_dual_logging;
use tracing::info;

/// Search a music library from the terminal
#[derive(Parser, Debug)]
#[command(name = "track-search", version, about)]
struct Args {
    /// Base URL of the search service (overrides config)
    #[arg(short, long)]
    url: Option<String>,

    /// Request timeout in milliseconds, 0 to wait forever (overrides config)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Query submitted on startup (overrides config)
    #[arg(short, long)]
    query: Option<String>,

    /// Read configuration from this file instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write a commented default configuration (to --config or the
    /// default location) and exit
    #[arg(long)]
    generate_config: bool,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().context("Failed to load configuration")?,
    };

    if let Some(url) = &args.url {
        config.endpoint.base_url = url.clone();
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.endpoint.request_timeout_ms = timeout_ms;
    }
    if let Some(query) = &args.query {
        config.behavior.initial_query = query.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.generate_config {
        let path = match &args.config {
            Some(path) => path.clone(),
            None => Config::get_config_path()?,
        };
        Config::write_default(&path)?;
        println!("Configuration file created at: {}", path.display());
        return Ok(());
    }

    let config = load_config(&args)?;

    let _log_buffer = init_tracing_with_dual_logging();
    info!(
        target: "system",
        "Starting track-search v{} against {}",
        env!("CARGO_PKG_VERSION"),
        config.endpoint.base_url
    );

    run_tui_app(config)
}
