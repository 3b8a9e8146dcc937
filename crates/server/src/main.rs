use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pipestream_core::{load_config, load_default_config, validate_config, Config};
use pipestream_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("pipestream v{}", VERSION);

    let config = load()?;
    validate_config(&config).context("Configuration validation failed")?;

    let credentials = &config.credentials;
    for (purpose, path) in [
        ("info", &credentials.info_cookie_file),
        ("stream", &credentials.stream_cookie_file),
    ] {
        match path {
            Some(path) if path.is_file() => info!(purpose, path = %path.display(), "Using cookie file"),
            Some(path) => warn!(purpose, path = %path.display(), "Cookie file not found"),
            None => {}
        }
    }
    info!(
        downloader = %config.tools.downloader_path.display(),
        muxer = %config.tools.muxer_path.display(),
        "External tools"
    );

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::from_config(config));
    let app = create_router(state);

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Loads the config file named by `PIPESTREAM_CONFIG` (default `config.toml`),
/// falling back to defaults plus environment when the default file is absent.
fn load() -> Result<Config> {
    let explicit = std::env::var("PIPESTREAM_CONFIG").ok().map(PathBuf::from);
    let config_path = explicit
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    if explicit.is_none() && !config_path.exists() {
        info!("No config.toml found, using defaults and environment");
        return load_default_config().context("Failed to load configuration from environment");
    }

    info!("Loading configuration from {:?}", config_path);
    load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
