mod api;
mod config;
mod controller;
mod display;
mod error;
mod logging;
mod model;
mod session;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use api::AppState;
use config::Config;
use controller::{QueueController, SessionCoordinator};
use session::{LibrespotSession, SessionClient};

/// How long the display gets to show the farewell before exit
const DISPLAY_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    if let Err(e) = logging::init_logging(&config.log_dir) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "=== sponos starting ===");

    let trailer = config.display_trailer.clone();
    let display = match &config.display_device {
        Some(path) => {
            let port = display::open_serial(path, config.display_baud, config.display_speed)?;
            display::spawn_dispatcher(port, trailer)?
        }
        None => {
            tracing::info!("No display device configured, display messages are discarded");
            display::spawn_dispatcher(io::sink(), trailer)?
        }
    };

    let (events, receiver) = mpsc::unbounded_channel();
    let session: Arc<dyn SessionClient> =
        Arc::new(LibrespotSession::new(config.session_settings(), events)?);
    let queue = Arc::new(QueueController::new(session.clone(), display.clone()));
    let coordinator = SessionCoordinator::new(session, queue, display.clone(), config.session_timeout());
    let event_listener = coordinator.start_event_listener(receiver);

    display.enqueue("Ready..");

    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    api::serve(listener, AppState::new(coordinator.clone()), shutdown_signal()).await?;

    if let Err(e) = coordinator.shutdown().await {
        tracing::warn!(error = %e, "Session did not shut down cleanly");
    }

    event_listener.abort();
    let _ = event_listener.await;

    let drained = tokio::task::spawn_blocking(move || display.drain(DISPLAY_DRAIN_TIMEOUT))
        .await
        .unwrap_or(false);
    if drained {
        tracing::debug!("Display drained");
    } else {
        tracing::warn!(timeout = ?DISPLAY_DRAIN_TIMEOUT, "Display did not drain in time");
    }

    tracing::info!("=== sponos stopped ===");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Ctrl-C received, shutting down");
}
