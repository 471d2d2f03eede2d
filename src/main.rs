//! gesture-deck-daemon: Background daemon for hand-gesture slideshow control
//!
//! This daemon provides:
//! - A landmark source replaying hand observations (JSON Lines)
//! - Per-frame finger classification and gesture mapping
//! - Hold confirmation so each sustained gesture fires exactly once
//! - Presentation control through configurable shell commands
//! - IPC server for status queries, pause/resume and event subscription
//!
//! Camera capture and the hand-landmark estimator live outside the daemon;
//! they produce the recording it consumes.

mod clock;
mod config;
mod dispatch;
mod events;
mod gesture;
mod ipc;
mod landmarks;
mod lifecycle;
mod state;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::clock::SystemClock;
use crate::config::Config;
use crate::dispatch::{CommandBackend, Dispatcher, LogBackend, PresentationBackend};
use crate::events::GestureEvent;
use crate::ipc::{Controls, Server};
use crate::landmarks::ReplaySource;
use crate::lifecycle::ShutdownSignal;
use crate::state::{HoldTracker, Session};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "gesture-deck-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(
        ?config.socket_path,
        ?config.source,
        hold_ms = config.hold_threshold.as_millis() as u64,
        mirror = config.mirror,
        "configuration loaded"
    );

    // Create shutdown signal handler
    let shutdown = ShutdownSignal::new();

    // Create channels for inter-component communication
    // Landmark source -> detection session
    let (observation_tx, observation_rx) = mpsc::channel(64);
    // Detection session -> IPC server (for broadcasting gesture events)
    let (event_tx, _event_rx) = broadcast::channel::<GestureEvent>(64);

    let paused = Arc::new(AtomicBool::new(false));

    let backend: Box<dyn PresentationBackend> = if config.commands.is_empty() {
        warn!("no presentation commands configured, gestures will only be logged");
        Box::new(LogBackend)
    } else {
        Box::new(CommandBackend::new(config.commands.clone()))
    };

    let session = Session::new(
        HoldTracker::new(config.hold_threshold),
        Dispatcher::new(backend),
        config.mirror,
        Arc::clone(&paused),
        event_tx.clone(),
    );

    // Run the pipeline on its own thread; it only blocks on the next frame
    let (session_done_tx, session_done_rx) = oneshot::channel::<()>();
    thread::Builder::new()
        .name("detection-session".to_string())
        .spawn(move || {
            session.run_blocking(observation_rx);
            let _ = session_done_tx.send(());
        })
        .context("failed to spawn detection session thread")?;

    // Start the landmark source (runs on dedicated thread)
    let source = ReplaySource::new(config.source.clone(), config.realtime, Arc::new(SystemClock));
    source
        .start(observation_tx)
        .context("failed to start landmark source")?;
    info!("landmark source started");

    // Create IPC server
    let server = Server::new(
        &config.socket_path,
        config.hold_threshold,
        Controls {
            paused,
            shutdown: shutdown.clone(),
            event_tx: event_tx.clone(),
        },
    )?;

    // Subscribe to gesture events for the IPC status snapshot
    let mut ipc_event_rx = event_tx.subscribe();
    let server_for_events = &server;

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        // The session ends when the recording runs out
        _ = session_done_rx => {
            info!("detection session exited");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Keep the IPC status in sync with the pipeline
        _ = async {
            loop {
                match ipc_event_rx.recv().await {
                    Ok(event) => {
                        info!(%event, "gesture event");
                        server_for_events.record_event(&event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "gesture event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        } => {
            info!("gesture event handler exited");
        }

        // Wait for shutdown signal
        result = shutdown.wait() => {
            match result {
                Ok(()) => info!("shutdown signal received"),
                Err(e) => error!(?e, "failed to wait for shutdown signal"),
            }
        }
    }

    // Cleanup
    info!("shutting down...");

    if source.is_running() {
        debug!("landmark source still running, stopping");
    }
    source.stop();
    server.shutdown().await;

    info!("gesture-deck-daemon stopped");

    Ok(())
}
