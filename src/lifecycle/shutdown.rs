//! Signal handling for graceful shutdown

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::debug;

/// Resolves on SIGTERM, SIGINT, or an explicit request (e.g. over IPC)
#[derive(Clone)]
pub struct ShutdownSignal {
    requested: Arc<Notify>,
}

impl ShutdownSignal {
    /// Create a new shutdown signal handler
    pub fn new() -> Self {
        Self {
            requested: Arc::new(Notify::new()),
        }
    }

    /// Ask every waiter to shut down
    pub fn trigger(&self) {
        debug!("shutdown requested");
        // Stores a permit if nobody is waiting yet
        self.requested.notify_one();
    }

    /// Wait for a shutdown signal
    pub async fn wait(&self) -> Result<()> {
        let mut sigterm =
            signal(SignalKind::terminate()).context("failed to register SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("failed to register SIGINT handler")?;

        tokio::select! {
            _ = sigterm.recv() => {
                debug!("received SIGTERM");
            }
            _ = sigint.recv() => {
                debug!("received SIGINT");
            }
            _ = self.requested.notified() => {
                debug!("received shutdown request");
            }
        }

        Ok(())
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
