use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tubecast_core::{
    load_config, validate_config, AudioTranscoder, FfmpegTranscoder, MediaFetcher, YtDlpFetcher,
};
use tubecast_server::{api::create_router, state::AppState};

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

    // Determine config path
    let config_path = std::env::var("TUBECAST_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        version = VERSION,
        config_hash = &config_hash[..16],
        "Configuration loaded successfully"
    );
    info!("Output directory: {:?}", config.storage.output_dir);
    info!("Temp directory: {:?}", config.storage.temp_dir);

    tokio::fs::create_dir_all(&config.storage.output_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create output directory {:?}",
                config.storage.output_dir
            )
        })?;

    // External tools
    let fetcher: Arc<dyn MediaFetcher> = Arc::new(YtDlpFetcher::new(config.tools.clone()));
    let transcoder: Arc<dyn AudioTranscoder> =
        Arc::new(FfmpegTranscoder::new(config.tools.clone()));

    // Jobs will fail until the tools are installed; the server still starts.
    match transcoder.validate().await {
        Ok(()) => info!("Using fetcher {} and transcoder {}", fetcher.name(), transcoder.name()),
        Err(e) => warn!("Transcoder not ready, conversions will fail: {}", e),
    }

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), fetcher, transcoder));

    // Create router
    let app = create_router(Arc::clone(&state));

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    let running = state.registry().len();
    if running > 0 {
        warn!("Shutting down with {} conversion(s) still running", running);
    }
    info!("Server shut down");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
