//! Heylisten playlist monitor
//!
//! Watches Spotify playlists on a fixed interval and notifies the users who
//! follow them when tracks are added or removed. An HTTP API allows adding
//! and removing playlists and triggering checks on demand.
//!
//! Usage:
//!   SPOT_CLIENT_ID=... SPOT_CLIENT_SECRET=... heylisten --port 8000

use anyhow::{Context, Result};
use clap::Parser;
use heylisten_monitor::{
    Deliverer, DiscordDeliverer, LogDeliverer, MonitorController, NotificationRouter, Scheduler,
    SpotifyFetcher,
};
use heylisten_monitor::notify::WEBHOOKS_FILE_NAME;
use heylisten_server::{build_router, AppState, Config};
use heylisten_storage::{Registry, SnapshotStore, REGISTRY_FILE_NAME, SNAPSHOT_DIR_NAME};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    let default_level = if config.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Heylisten starting...");
    let spotify = match config.spotify_config() {
        Ok(spotify) => spotify,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    let data_dir = &config.data_dir;
    tokio::fs::create_dir_all(data_dir)
        .await
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let registry = Arc::new(Registry::open(data_dir.join(REGISTRY_FILE_NAME)).await?);
    let snapshots = Arc::new(SnapshotStore::open(data_dir.join(SNAPSHOT_DIR_NAME)).await?);
    let ids = registry.playlist_ids().await;
    let cached = snapshots.preload(&ids).await;
    info!(
        "Loaded {} monitored playlist(s), {} cached snapshot(s)",
        ids.len(),
        cached
    );

    let fetcher = Arc::new(SpotifyFetcher::new(spotify)?);

    let discord = if config.discord {
        Some(Arc::new(
            DiscordDeliverer::open(data_dir.join(WEBHOOKS_FILE_NAME)).await?,
        ))
    } else {
        None
    };
    let deliverer: Arc<dyn Deliverer> = match &discord {
        Some(discord) => discord.clone(),
        None => Arc::new(LogDeliverer::new()),
    };
    if !config.enable_notifications {
        warn!("Notifications are disabled; changes will only be logged");
    }
    let router = NotificationRouter::new(deliverer, config.enable_notifications);

    let controller = Arc::new(MonitorController::new(
        fetcher,
        registry,
        snapshots,
        router,
        config.monitor_config(),
    ));

    let scheduler = Scheduler::new(controller.clone(), config.interval()).spawn();

    let mut state = AppState::new(controller);
    if let Some(discord) = discord {
        state = state.with_discord(discord);
    }
    let app = build_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!("HTTP API listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Shutting down, waiting for the current cycle to finish");
    scheduler.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
