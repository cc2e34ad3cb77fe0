//! # Expiry Sweeper
//!
//! Background task that releases expired cart locks and restores pet
//! availability on a fixed cadence.
//!
//! ## Sweep Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                                                                     │
//! │   periodic task (every 60s) ──┐                                     │
//! │                               ├──► release_expired_locks()          │
//! │   every cart read ────────────┘      (idempotent)                   │
//! │                                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Runs as a single task: a sweep still in progress delays the next tick
//! rather than overlapping it, so two sweeps never run concurrently.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::pool::Database;
use crate::service::cart::CartService;
use crate::service::ServiceResult;

/// Default sweep cadence.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Releases expired locks, either on demand or on a schedule.
#[derive(Debug, Clone)]
pub struct ExpirySweeper {
    cart: CartService,
}

impl ExpirySweeper {
    /// Creates a sweeper over the given database.
    pub fn new(db: Database) -> Self {
        ExpirySweeper {
            cart: CartService::new(db),
        }
    }

    /// Runs one sweep. Idempotent; returns the number of locks released.
    pub async fn sweep(&self) -> ServiceResult<u64> {
        self.cart.release_expired_locks().await
    }

    /// Spawns the periodic background task and returns a shutdown handle.
    pub fn spawn(self, period: Duration) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Expiry sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        match self.sweep().await {
                            Ok(0) => {}
                            Ok(released) => info!(released, "Expired cart locks swept"),
                            Err(err) => warn!(error = %err, "Expiry sweep failed"),
                        }
                    }
                }
            }
        });

        SweeperHandle { shutdown_tx, task }
    }
}

/// Handle for controlling a spawned sweeper.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Triggers graceful shutdown and waits for the task to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.task.await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{backdate_lock, seed_pet, test_db};
    use pawmart_core::PetStatus;

    #[tokio::test]
    async fn test_sweep_on_demand() {
        let db = test_db().await;
        let pet = seed_pet(&db, "Biscuit", 250_000).await;
        let cart = CartService::new(db.clone());
        let sweeper = ExpirySweeper::new(db.clone());

        let lock = cart.acquire_lock(&pet.id, None, "sess-1").await.unwrap();
        backdate_lock(&db, &lock.id, 20).await;

        assert_eq!(sweeper.sweep().await.unwrap(), 1);
        assert_eq!(sweeper.sweep().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_spawned_sweeper_releases_expired_locks() {
        let db = test_db().await;
        let pet = seed_pet(&db, "Biscuit", 250_000).await;
        let cart = CartService::new(db.clone());

        let lock = cart.acquire_lock(&pet.id, None, "sess-1").await.unwrap();
        backdate_lock(&db, &lock.id, 20).await;

        let handle = ExpirySweeper::new(db.clone()).spawn(Duration::from_millis(20));

        // Give the task a few ticks.
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.shutdown().await;

        let pet = db.pets().get_by_id(&pet.id).await.unwrap().unwrap();
        assert_eq!(pet.status, PetStatus::Available);
        assert_eq!(db.cart_locks().count_live(chrono::Utc::now()).await.unwrap(), 0);
    }
}
