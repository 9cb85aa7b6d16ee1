use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::{DedupCache, SaveOutcome};

pub const DEFAULT_PERSIST_INTERVAL_SECS: u64 = 60;

/// Periodically flushes the cache to disk until cancelled.
struct CachePersister {
    cache: Arc<DedupCache>,
    path: PathBuf,
    period: Duration,
}

impl CachePersister {
    async fn run(self, cancel: CancellationToken) {
        info!(
            path = %self.path.display(),
            period_secs = self.period.as_secs(),
            "Cache persister started"
        );

        let mut timer = interval(self.period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        timer.tick().await; // Skip the first immediate tick

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = timer.tick() => self.flush().await,
            }
        }

        self.flush().await;
        info!("Cache persister stopped");
    }

    async fn flush(&self) {
        let cache = self.cache.clone();
        let path = self.path.clone();

        // File I/O must not stall the runtime workers the monitors run on.
        match tokio::task::spawn_blocking(move || cache.save(&path)).await {
            Ok(Ok(SaveOutcome::Written)) => debug!("Cache flushed"),
            Ok(Ok(SaveOutcome::Skipped)) => {}
            Ok(Err(e)) => error!(error = %e, "Failed to persist cache"),
            Err(e) => error!(error = %e, "Cache persist task panicked"),
        }
    }
}

/// Spawn the cache persister as a tokio task
pub fn spawn_cache_persister(
    cache: Arc<DedupCache>,
    path: PathBuf,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let persister = CachePersister {
        cache,
        path,
        period,
    };

    tokio::spawn(async move {
        persister.run(cancel).await;
    })
}
