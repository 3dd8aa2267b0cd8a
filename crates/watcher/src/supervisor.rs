//! Liveness supervision of the pipeline's long-lived units.

use std::time::Duration;

use anyhow::anyhow;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Watches a set of named task handles and fails the moment one finishes.
///
/// There is no restart policy: a dead unit means the whole process is torn
/// down with a failure status and an external process manager is expected
/// to start a fresh instance.
pub struct Supervisor {
    units: Vec<Unit>,
    poll_interval: Duration,
}

struct Unit {
    name: String,
    handle: JoinHandle<()>,
}

impl Supervisor {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            units: Vec::new(),
            poll_interval,
        }
    }

    /// Add a unit to the liveness contract.
    pub fn track(&mut self, name: impl Into<String>, handle: JoinHandle<()>) {
        self.units.push(Unit {
            name: name.into(),
            handle,
        });
    }

    /// Poll unit liveness forever. Never returns success: the only exits
    /// are a dead unit or a shutdown signal, both fatal to the process.
    pub async fn run(self) -> anyhow::Error {
        info!(
            units = self.units.len(),
            interval = ?self.poll_interval,
            "supervisor watching pipeline units"
        );

        let mut ticker = tokio::time::interval(self.poll_interval);
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        let failure = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(dead) = self.units.iter().find(|u| u.handle.is_finished()) {
                        error!(unit = %dead.name, "pipeline unit terminated");
                        break anyhow!("pipeline unit {} terminated", dead.name);
                    }
                }
                _ = &mut shutdown => {
                    break anyhow!("shutdown signal received");
                }
            }
        };

        // Tear everything down; the process is exiting either way.
        for unit in &self.units {
            unit.handle.abort();
        }
        failure
    }
}

/// Wait for SIGINT or SIGTERM (Unix) or Ctrl+C (cross-platform fallback).
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to register SIGINT");
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to register SIGTERM");
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl_c");
    }
}
