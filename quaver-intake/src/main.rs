//! Command intake process - main entry point
//!
//! Serves the HTTP command surface and publishes action messages to the
//! execution process.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quaver_common::bridge::RedisBridge;
use quaver_common::config::{ConfigOverrides, Settings};
use quaver_common::db::init_database;
use quaver_common::queue::PersistentQueue;
use quaver_intake::api::{self, AppContext};
use quaver_intake::controller::IntakeController;

/// Command-line arguments for quaver-intake
#[derive(Parser, Debug)]
#[command(name = "quaver-intake")]
#[command(about = "Command intake process for quaver")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "QUAVER_CONFIG")]
    config: Option<PathBuf>,

    /// Override the queue database path
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Override the Redis URL for the bridge
    #[arg(long)]
    redis_url: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "QUAVER_INTAKE_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "quaver_intake=debug,quaver_common=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Log build identification immediately after tracing init
    info!(
        "Starting quaver-intake v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let mut settings =
        Settings::load(args.config.as_deref()).context("Failed to load configuration")?;
    settings.apply_overrides(ConfigOverrides {
        database_path: args.database,
        redis_url: args.redis_url,
    });
    if let Some(port) = args.port {
        settings.intake.port = port;
    }

    let pool = init_database(&settings.database_path)
        .await
        .context("Failed to initialize database")?;
    let queue = PersistentQueue::new(pool);

    let bridge = Arc::new(
        RedisBridge::connect(&settings.redis_url, &settings.bridge_channel)
            .await
            .context("Failed to connect to the action bridge")?,
    );

    let controller = IntakeController::new(queue, bridge);

    // Build the application router
    let app = api::build_router(AppContext { controller });

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.intake.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

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
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
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
