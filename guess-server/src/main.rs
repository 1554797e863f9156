use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use guess_server::rooms::{RetentionPolicy, RoomStore};
use guess_server::{AppState, config::Config, create_routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting guess rooms server...");

    let config = Config::from_env().context("failed to load configuration")?;
    let state = AppState::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = Arc::new(state.scheduler(config.scheduler_config()));
    let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx.clone()));

    let sweep_task = tokio::spawn(run_retention_sweep(
        state.rooms.clone(),
        config.retention_policy(),
        shutdown_rx,
    ));

    let routes = create_routes(state);

    let addr = (
        config
            .host
            .parse::<std::net::IpAddr>()
            .with_context(|| format!("invalid HOST {:?}", config.host))?,
        config.port,
    );

    let (addr, server) = warp::serve(routes).try_bind_with_graceful_shutdown(addr, async {
        // Wait for SIGINT (Ctrl+C) or SIGTERM
        #[cfg(unix)]
        {
            let sigint = signal::unix::signal(signal::unix::SignalKind::interrupt());
            let sigterm = signal::unix::signal(signal::unix::SignalKind::terminate());

            match (sigint, sigterm) {
                (Ok(mut sigint), Ok(mut sigterm)) => {
                    tokio::select! {
                        _ = sigint.recv() => {
                            info!("Received SIGINT, shutting down gracefully...");
                        }
                        _ = sigterm.recv() => {
                            info!("Received SIGTERM, shutting down gracefully...");
                        }
                    }
                }
                _ => {
                    let _ = signal::ctrl_c().await;
                    info!("Received Ctrl+C, shutting down gracefully...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = signal::ctrl_c().await;
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    })?;

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;

    let _ = shutdown_tx.send(true);
    let _ = tokio::join!(scheduler_task, sweep_task);
    info!("Server shutdown complete.");
    Ok(())
}

async fn run_retention_sweep(
    rooms: Arc<RoomStore>,
    policy: RetentionPolicy,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(policy.sweep_interval);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                rooms.evict_expired(Utc::now(), policy.scored_room_ttl).await;
            }
            _ = shutdown.changed() => break,
        }
    }
}
