use std::path::PathBuf;
use std::sync::Arc;

use reqwest::Client;

use crate::app::error::Result;
use crate::auth::{CredentialExchange, OAuthExchange, TokenBroker};
use crate::cache::DedupCache;
use crate::config::Config;
use crate::fetcher::http_fetcher::{build_client, HttpFetcher};
use crate::fetcher::{FetchClient, Fetcher};
use crate::monitor::TargetMonitor;
use crate::notifier::NotificationDispatcher;

/// Everything the monitors share for the lifetime of the process.
pub struct AppContext {
    pub config: Config,
    pub http: Client,
    pub cache: Arc<DedupCache>,
    pub cache_path: PathBuf,
    pub broker: Option<Arc<TokenBroker>>,
    pub fetch_client: Arc<FetchClient>,
}

impl AppContext {
    pub fn new(config: Config, cache_path: Option<PathBuf>) -> Result<Self> {
        let http = build_client()?;
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(http.clone()));
        let exchange: Arc<dyn CredentialExchange> =
            Arc::new(OAuthExchange::new(http.clone(), &config.user_agent));

        Ok(Self::with_parts(config, cache_path, http, fetcher, exchange))
    }

    /// Assemble a context from explicit collaborators.
    pub fn with_parts(
        config: Config,
        cache_path: Option<PathBuf>,
        http: Client,
        fetcher: Arc<dyn Fetcher>,
        exchange: Arc<dyn CredentialExchange>,
    ) -> Self {
        let cache_path = cache_path.unwrap_or_else(|| config.cache.path.clone());

        let broker = config
            .credentials()
            .map(|credentials| Arc::new(TokenBroker::new(exchange, credentials)));

        let fetch_client = Arc::new(match &broker {
            Some(broker) => FetchClient::elevated(fetcher, broker.clone(), &config.user_agent),
            None => FetchClient::standard(fetcher, &config.user_agent),
        });

        Self {
            config,
            http,
            cache: Arc::new(DedupCache::new()),
            cache_path,
            broker,
            fetch_client,
        }
    }

    /// One monitor per configured target.
    pub fn monitors(&self) -> Vec<TargetMonitor> {
        let flags = &self.config.developer_flags;

        self.config
            .targets()
            .into_iter()
            .map(|target| {
                let dispatcher =
                    NotificationDispatcher::for_target(self.http.clone(), &target, flags.notify_mute());
                TargetMonitor::new(
                    target,
                    self.fetch_client.clone(),
                    self.cache.clone(),
                    dispatcher,
                )
                .ignore_cache(flags.ignore_cache())
            })
            .collect()
    }

    /// Whether the first cycle of every monitor should deliver.
    ///
    /// Only a non-empty cache touched within `stale_after` is trusted to
    /// separate posts missed while down from an old backlog.
    pub fn send_initial(&self) -> bool {
        self.config.developer_flags.force_send_initial()
            || self.cache.is_fresh(self.config.stale_after())
    }
}
