//! Polling scheduler
//!
//! Runs [`Reconciler::reconcile_once`] back to back with a fixed pause of one
//! TTL between the end of a cycle and the start of the next. No jitter, no
//! catch-up for slow cycles.

use crate::error::Result;
use crate::reconciler::Reconciler;
use std::future::Future;
use std::time::Duration;
use tracing::info;

/// Drives a [`Reconciler`] on a fixed interval
pub struct Scheduler {
    reconciler: Reconciler,
    interval: Duration,
    cycles: u64,
}

impl Scheduler {
    /// Create a scheduler that sleeps for the reconciler's configured TTL
    pub fn new(reconciler: Reconciler) -> Self {
        let interval = reconciler.config().ttl;
        Self {
            reconciler,
            interval,
            cycles: 0,
        }
    }

    /// Number of completed cycles
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run until a fatal error
    ///
    /// Only returns with the error that stopped the loop.
    pub async fn run(&mut self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run until `shutdown` completes or a fatal error occurs
    ///
    /// `shutdown` is only observed between cycles; a cycle in progress always
    /// runs to completion.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error)`: Fatal error from the reconciler
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let result = self.reconciler.reconcile_once().await?;
            self.cycles += 1;

            info!(
                "Cycle {} done: ip {}, {} zone(s) checked, {} host(s) updated, {} zone(s) failed",
                self.cycles,
                result.ip,
                result.zones_processed,
                result.hosts_updated,
                result.failed_zones.len()
            );
            if result.hosts_skipped > 0 {
                info!("{} host(s) left unchanged by dry-run", result.hosts_skipped);
            }
            info!("Sleeping for {:?}", self.interval);

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = &mut shutdown => {
                    info!("Shutdown signal received after {} cycle(s)", self.cycles);
                    return Ok(());
                }
            }
        }
    }
}
