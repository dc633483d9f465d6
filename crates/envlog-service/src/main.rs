//! envlog service - HTTP ingest and query API.
//!
//! Run with: `cargo run -p envlog-service`

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use envlog_service::{AppState, Config, app};
use envlog_store::Backend;

/// envlog service - HTTP ingest and query API for environmental readings.
#[derive(Parser, Debug)]
#[command(name = "envlog-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(short, long)]
    bind: Option<String>,

    /// Storage path (overrides config): database file or log directory.
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Storage backend (overrides config).
    #[arg(long, value_parser = parse_backend)]
    backend: Option<Backend>,

    /// IANA time zone for dates and slots (overrides config and environment).
    #[arg(short, long)]
    timezone: Option<String>,
}

fn parse_backend(s: &str) -> Result<Backend, String> {
    match s.to_ascii_lowercase().as_str() {
        "sqlite" => Ok(Backend::Sqlite),
        "jsonl" => Ok(Backend::Jsonl),
        other => Err(format!("unknown backend '{}': expected sqlite or jsonl", other)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("envlog_service=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    // Load configuration: file, then environment, then CLI
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default().unwrap_or_default(),
    };
    config.apply_env();

    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(backend) = args.backend {
        config.storage.backend = backend;
    }
    if let Some(path) = args.database {
        config.storage.path = Some(path);
    }
    if let Some(tz) = args.timezone {
        config.time.timezone = tz;
    }
    config.validate()?;

    // Open the store
    let path = config.storage.resolved_path();
    info!("Opening {} store at {:?}", config.storage.backend, path);
    let store = envlog_store::open(config.storage.backend, &path)?;

    if config.security.api_key.is_some() {
        info!("API key required for writes");
    }

    let addr: SocketAddr = config.server.bind.parse()?;
    let state = AppState::new(store, config);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
