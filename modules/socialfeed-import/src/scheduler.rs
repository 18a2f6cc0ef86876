// Periodic import. Each tick runs a full import across all providers and
// only logs the outcome; a failed run never stops the loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::import::ImportService;

pub struct ImportScheduler {
    service: Arc<ImportService>,
    every: Duration,
}

impl ImportScheduler {
    /// `every` is clamped to at least one second.
    pub fn new(service: Arc<ImportService>, every: Duration) -> Self {
        Self {
            service,
            every: every.max(Duration::from_secs(1)),
        }
    }

    /// Run one import and log its result.
    pub async fn tick(&self) -> Option<usize> {
        let started = std::time::Instant::now();
        match self.service.import_posts(None).await {
            Ok(count) => {
                info!(
                    count,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Scheduled social media import complete"
                );
                Some(count)
            }
            Err(e) => {
                error!(error = %e, "Scheduled social media import failed");
                None
            }
        }
    }

    /// Run on a fixed interval until `shutdown` flips to true. The first run
    /// starts immediately; overlapping runs are never started.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(every_secs = self.every.as_secs(), "Starting social media import schedule");

        let mut interval = tokio::time::interval(self.every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Social media import schedule stopped");
                        return;
                    }
                }
            }
        }
    }
}
