//! mgc-api - Music genre classification service
//!
//! Serves genre predictions and catalog recommendations over HTTP:
//! - `GET /health`
//! - `GET /api/samples`
//! - `POST /api/predict`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mgc_api::AppState;
use mgc_common::config::load_service_config;
use mgc_common::features::backend_available;

/// Command-line arguments for mgc-api
#[derive(Parser, Debug)]
#[command(name = "mgc-api")]
#[command(about = "Music genre classification and recommendation API")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "MGC_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "MGC_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "MGC_PORT")]
    port: Option<u16>,

    /// Trained model bundle; mock predictions are used when absent
    #[arg(long, env = "MGC_MODEL_PATH")]
    model_path: Option<PathBuf>,

    /// External catalog TOML replacing the built-in one
    #[arg(long, env = "MGC_CATALOG_PATH")]
    catalog_path: Option<PathBuf>,

    /// Maximum request body size in bytes
    #[arg(long, env = "MGC_MAX_UPLOAD_BYTES")]
    max_upload_bytes: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting mgc-api v{}", env!("CARGO_PKG_VERSION"));

    let mut config = load_service_config(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(path) = args.model_path {
        config.model_path = Some(path);
    }
    if let Some(path) = args.catalog_path {
        config.catalog_path = Some(path);
    }
    if let Some(limit) = args.max_upload_bytes {
        config.max_upload_bytes = limit;
    }

    let state = AppState::from_config(&config).context("Failed to initialize service")?;
    info!("Classifier mode: {}", state.classifier.mode());
    if backend_available() {
        info!("Audio backend: available");
    } else {
        warn!("Audio backend not compiled in, uploads use mock features");
    }

    let app = mgc_api::build_router(state);

    info!("Starting HTTP server on {}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .context("Failed to bind to address")?;
    if let Ok(addr) = listener.local_addr() {
        info!("Listening on http://{}", addr);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
