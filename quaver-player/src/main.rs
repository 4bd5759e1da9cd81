//! Playback execution process - main entry point
//!
//! Subscribes to the action bridge, runs the playback coordinator, and
//! serves the read-only state API.

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
use quaver_player::api::{self, AppContext};
use quaver_player::coordinator::{CoordinatorConfig, PlaybackCoordinator};
use quaver_player::engine::NullEngine;
use quaver_player::listener::spawn_listener;
use quaver_player::resolver::DirectResolver;

/// Command-line arguments for quaver-player
#[derive(Parser, Debug)]
#[command(name = "quaver-player")]
#[command(about = "Playback execution process for quaver")]
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
    #[arg(short, long, env = "QUAVER_PLAYER_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "quaver_player=debug,quaver_common=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Log build identification immediately after tracing init
    info!(
        "Starting quaver-player v{} [{}] built {} ({})",
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
        settings.player.port = port;
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

    let coordinator = PlaybackCoordinator::new(
        queue,
        Arc::new(NullEngine),
        Arc::new(DirectResolver),
        CoordinatorConfig::from(&settings.player),
    );

    let listener_task = spawn_listener(coordinator.clone(), bridge);
    let reconcile_task = coordinator.spawn_reconcile_loop();

    // Build the application router
    let app = api::build_router(AppContext {
        coordinator: coordinator.clone(),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.player.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    listener_task.abort();
    reconcile_task.abort();

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
