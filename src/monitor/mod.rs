//! Per-target polling loop.
//!
//! Each [`TargetMonitor`] runs one cycle immediately and then one per
//! interval tick until cancelled. A cycle fetches the listing, hands every
//! unseen post to the dispatcher and marks it processed whether or not the
//! delivery went through, so a failed webhook never causes a redelivery.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::app::FetchError;
use crate::cache::DedupCache;
use crate::domain::Target;
use crate::fetcher::FetchClient;
use crate::notifier::{Delivery, NotificationDispatcher};

/// Outcome of a single fetch-and-process cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub new: usize,
    pub dispatched: usize,
    pub failed: usize,
}

pub struct TargetMonitor {
    target: Target,
    fetch_client: Arc<FetchClient>,
    cache: Arc<DedupCache>,
    dispatcher: NotificationDispatcher,
    ignore_cache: bool,
}

impl TargetMonitor {
    pub fn new(
        target: Target,
        fetch_client: Arc<FetchClient>,
        cache: Arc<DedupCache>,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            target,
            fetch_client,
            cache,
            dispatcher,
            ignore_cache: false,
        }
    }

    /// Treat every fetched post as unseen.
    pub fn ignore_cache(mut self, ignore: bool) -> Self {
        self.ignore_cache = ignore;
        self
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Fetch once and process the result. With `dispatch` off, unseen posts
    /// are only recorded in the cache.
    pub async fn process_cycle(&self, dispatch: bool) -> Result<CycleReport, FetchError> {
        let posts = match self.fetch_client.fetch(&self.target).await {
            Ok(posts) => posts,
            Err(e) => {
                error!(target_name = %self.target.name, error = %e, "Failed to fetch listing");
                return Err(e);
            }
        };

        let mut report = CycleReport {
            fetched: posts.len(),
            ..CycleReport::default()
        };

        for post in &posts {
            if !self.ignore_cache && self.cache.is_processed(&post.permalink) {
                continue;
            }
            report.new += 1;

            if dispatch {
                match self.dispatcher.dispatch(post, &self.target).await {
                    Ok(Delivery::Sent) => report.dispatched += 1,
                    Ok(Delivery::Muted) => {}
                    Err(_) => report.failed += 1,
                }
            } else {
                debug!(target_name = %self.target.name, permalink = %post.permalink, "Seeding cache");
            }

            self.cache.mark_processed(&post.permalink);
        }

        Ok(report)
    }

    async fn run_cycle(&self, dispatch: bool) {
        if let Ok(report) = self.process_cycle(dispatch).await {
            info!(
                target_name = %self.target.name,
                fetched = report.fetched,
                new = report.new,
                dispatched = report.dispatched,
                failed = report.failed,
                "Cycle complete"
            );
        }
    }

    /// Poll until `cancel` fires. `send_initial` decides whether the first
    /// cycle delivers or only seeds the cache.
    pub async fn run(self, send_initial: bool, cancel: CancellationToken) {
        info!(
            target_name = %self.target.name,
            subreddit = %self.target.subreddit,
            sorting = %self.target.sorting,
            interval_secs = self.target.interval().as_secs(),
            send_initial,
            "Monitor started"
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                info!(target_name = %self.target.name, "Monitor stopped");
                return;
            }
            _ = self.run_cycle(send_initial) => {}
        }

        let mut timer = interval(self.target.interval());
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        timer.tick().await; // Skip the first immediate tick

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = timer.tick() => {}
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.run_cycle(true) => {}
            }
        }

        info!(target_name = %self.target.name, "Monitor stopped");
    }
}

/// Spawn a monitor as a tokio task
pub fn spawn_monitor(
    monitor: TargetMonitor,
    send_initial: bool,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        monitor.run(send_initial, cancel).await;
    })
}
