use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use weathervane::config::LoggingConfig;
use weathervane::{AppState, HistoryStore, OpenWeatherMapClient, WeathervaneConfig, web};

#[derive(Parser)]
#[command(name = "weathervane", version, about = "Weather forecasts with search history")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Port to listen on, overrides the configured one
    #[arg(short, long)]
    port: Option<u16>,
    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if logging.format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config =
        WeathervaneConfig::load_from_path(cli.config).context("Failed to load configuration")?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    init_logging(&config.logging, cli.verbose);
    info!("Starting weathervane {}", weathervane::VERSION);

    let provider = OpenWeatherMapClient::new(&config.weather)?;
    let store = HistoryStore::open(&config.storage.location, config.defaults.history_limit)
        .with_context(|| format!("Failed to open history store at {}", config.storage.location))?;

    let addr = config.bind_address();
    let state = AppState::new(config, Arc::new(provider), store);
    web::run(state, &addr).await
}
