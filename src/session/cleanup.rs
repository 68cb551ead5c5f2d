//! Background expiry sweep for the history store
//!
//! Expired entries are already invisible to reads; the sweep only reclaims
//! the memory or disk space they occupy.

use crate::session::store::KvStore;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{debug, error, info};

/// Sweep interval (1 hour)
pub const SWEEP_INTERVAL_SECS: u64 = 60 * 60;

/// Runs one sweep, logging instead of failing.
pub async fn sweep_once(store: &dyn KvStore) -> usize {
    match store.purge_expired().await {
        Ok(0) => {
            debug!(backend = store.backend_name(), "No expired entries");
            0
        }
        Ok(removed) => {
            info!(
                backend = store.backend_name(),
                removed = removed,
                "Purged expired history entries"
            );
            removed
        }
        Err(e) => {
            error!(backend = store.backend_name(), error = %e, "Expiry sweep failed");
            0
        }
    }
}

/// Spawns the periodic sweep.
///
/// Returns the task handle and a sender; sending on (or dropping) the sender
/// stops the task.
pub fn start_sweep_task(
    store: Arc<dyn KvStore>,
    every: Duration,
) -> (JoinHandle<()>, mpsc::Sender<()>) {
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

    let handle = tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately; skip it so startup does no I/O
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    sweep_once(store.as_ref()).await;
                }
                _ = shutdown_rx.recv() => {
                    info!("Sweep task received shutdown signal, stopping...");
                    break;
                }
            }
        }
    });

    (handle, shutdown_tx)
}
