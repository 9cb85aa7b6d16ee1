//! Supervisor for the monitor tasks.
//!
//! Startup makes the cache usable and, in elevated context, obtains the
//! first token; failing either is fatal. Afterwards one task per target and
//! the cache persister run until a shutdown signal arrives.

use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::app::{AppContext, Result};
use crate::cache::{spawn_cache_persister, CacheStatus};
use crate::monitor::spawn_monitor;

pub struct Daemon {
    ctx: Arc<AppContext>,
}

impl Daemon {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    /// Make the cache usable and obtain the first token.
    ///
    /// Returns whether the first cycle should deliver.
    pub async fn prepare(&self) -> Result<bool> {
        let cache = self.ctx.cache.clone();
        let path = self.ctx.cache_path.clone();

        match tokio::task::spawn_blocking(move || cache.ensure_usable(&path)).await?? {
            CacheStatus::Loaded { entries } => {
                info!(path = %self.ctx.cache_path.display(), entries, "Cache loaded");
            }
            CacheStatus::Recovered { archived_to } => {
                warn!(
                    path = %self.ctx.cache_path.display(),
                    archived = archived_to.is_some(),
                    "Cache was unreadable and has been recreated"
                );
            }
        }

        if let Some(broker) = &self.ctx.broker {
            broker.token().await?;
        }

        let send_initial = self.ctx.send_initial();
        info!(
            context = %self.ctx.fetch_client.context(),
            send_initial,
            "Startup complete"
        );
        Ok(send_initial)
    }

    /// Run until `cancel` fires, then wait for every task to finish.
    pub async fn run_until(&self, cancel: CancellationToken) -> Result<()> {
        self.ctx.config.log_startup();
        let send_initial = self.prepare().await?;

        let mut handles = Vec::new();
        for monitor in self.ctx.monitors() {
            handles.push(spawn_monitor(monitor, send_initial, cancel.child_token()));
        }
        info!(targets = handles.len(), "Monitors started");

        handles.push(spawn_cache_persister(
            self.ctx.cache.clone(),
            self.ctx.cache_path.clone(),
            self.ctx.config.persist_interval(),
            cancel.child_token(),
        ));

        cancel.cancelled().await;
        info!("Shutting down");

        for result in join_all(handles).await {
            if let Err(e) = result {
                error!(error = %e, "Task ended abnormally");
            }
        }

        info!("Shutdown complete");
        Ok(())
    }

    /// Run until SIGINT or SIGTERM.
    pub async fn run(&self) -> Result<()> {
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            trigger.cancel();
        });

        self.run_until(cancel).await
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {},
                    _ = sigint.recv() => {},
                }
            }
            _ => {
                warn!("Failed to install signal handlers, falling back to ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
