//! wqp-ps (Prediction Service) - HTTP shell over the wine quality pipeline
//!
//! Loads the scaling transform and the predictor once at startup and serves
//! predictions until shut down. If either artifact fails to load the service
//! exits non-zero without binding a port.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use wqp_common::config::{resolve_artifacts_dir, TomlConfig, ENV_PORT};
use wqp_common::PredictionContext;
use wqp_ps::logging::init_tracing;
use wqp_ps::{build_router, AppState};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "wqp-ps")]
#[command(about = "Wine quality prediction service")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides config file)
    #[arg(short, long, env = ENV_PORT)]
    port: Option<u16>,

    /// Address to bind (overrides config file)
    #[arg(short, long)]
    bind: Option<String>,

    /// Directory holding scaler.json and model.json
    #[arg(short, long)]
    artifacts_dir: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, source) = TomlConfig::locate_and_load(args.config.as_deref())
        .context("Failed to load configuration")?;

    init_tracing(&config.logging.level);

    // Build identification first, before any artifact I/O
    info!(
        "Starting WQP Prediction Service (wqp-ps) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    if source.is_defaults() {
        warn!("No config file found, using {}", source);
    } else {
        info!("Configuration: {}", source);
    }

    let artifacts_dir = resolve_artifacts_dir(args.artifacts_dir.as_deref(), &config);
    info!("Artifacts directory: {}", artifacts_dir.display());

    let paths = config.artifact_paths(&artifacts_dir);
    let context = match PredictionContext::load(&paths) {
        Ok(context) => {
            info!("✓ Artifacts loaded");
            context
        }
        Err(e) => {
            error!("Failed to load artifacts: {}", e);
            return Err(e).context("Refusing to serve without valid artifacts");
        }
    };

    let state = AppState::new(Arc::new(context));
    let app = build_router(state);

    let bind = args.bind.unwrap_or(config.bind_address);
    let port = args.port.unwrap_or(config.port);
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("wqp-ps listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("wqp-ps stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
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
