//! Background eviction of idle client records.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::clock::Clock;
use super::window::WindowStore;

/// Periodically drops records for clients with no request inside the window.
///
/// Without this, every address that ever connected keeps an (empty) entry in
/// the store for the life of the process.
pub struct IdleSweeper {
    store: Arc<WindowStore>,
    clock: Arc<dyn Clock>,
    every: Duration,
}

impl IdleSweeper {
    pub fn new(store: Arc<WindowStore>, clock: Arc<dyn Clock>, every: Duration) -> Self {
        Self { store, clock, every }
    }

    /// Run one eviction pass, returning the number of records dropped.
    pub fn sweep(&self) -> usize {
        self.store.evict_idle(self.clock.now())
    }

    /// Spawn the sweep loop on the current runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(interval = ?self.every, "Idle client sweeper started");

            loop {
                ticker.tick().await;
                let evicted = self.sweep();
                debug!(
                    evicted = evicted,
                    tracked = self.store.identity_count(),
                    "Idle sweep complete"
                );
            }
        })
    }
}
