use std::sync::Arc;

use tracing::{debug, error, warn};
use url::Url;

use crate::app::FetchError;
use crate::auth::TokenBroker;
use crate::domain::{AccessContext, Post, Target};
use crate::fetcher::listing::parse_listing;
use crate::fetcher::{FetchResult, Fetcher, ListingRequest};

const PUBLIC_BASE: &str = "https://www.reddit.com";
const OAUTH_BASE: &str = "https://oauth.reddit.com";

/// Retrieves the unpinned posts of one target, retrying transient failures
/// and refreshing the bearer token on 401 when running elevated.
pub struct FetchClient {
    fetcher: Arc<dyn Fetcher>,
    broker: Option<Arc<TokenBroker>>,
    user_agent: String,
}

impl FetchClient {
    pub fn standard(fetcher: Arc<dyn Fetcher>, user_agent: impl Into<String>) -> Self {
        Self {
            fetcher,
            broker: None,
            user_agent: user_agent.into(),
        }
    }

    pub fn elevated(
        fetcher: Arc<dyn Fetcher>,
        broker: Arc<TokenBroker>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            broker: Some(broker),
            user_agent: user_agent.into(),
        }
    }

    pub fn context(&self) -> AccessContext {
        if self.broker.is_some() {
            AccessContext::Elevated
        } else {
            AccessContext::Standard
        }
    }

    pub fn listing_url(&self, target: &Target) -> Result<Url, FetchError> {
        let raw = match self.context() {
            AccessContext::Standard => format!(
                "{}/r/{}/{}.json",
                PUBLIC_BASE, target.subreddit, target.sorting
            ),
            AccessContext::Elevated => {
                format!("{}/r/{}/{}", OAUTH_BASE, target.subreddit, target.sorting)
            }
        };

        let mut url = Url::parse(&raw)?;
        url.query_pairs_mut()
            .append_pair("limit", &target.limit.to_string());
        Ok(url)
    }

    pub async fn fetch(&self, target: &Target) -> Result<Vec<Post>, FetchError> {
        let url = self.listing_url(target)?;
        let attempts = target.attempts();

        let mut token = match &self.broker {
            Some(broker) => Some(broker.token().await?),
            None => None,
        };
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            debug!(target_name = %target.name, attempt, url = %url, "Fetching listing");

            let request = ListingRequest {
                url: url.as_str(),
                bearer: token.as_deref(),
                user_agent: &self.user_agent,
            };

            match self.fetcher.fetch(&request).await {
                Ok(FetchResult::Content { body }) => {
                    let posts = parse_listing(&body)?;
                    debug!(target_name = %target.name, count = posts.len(), "Listing fetched");
                    return Ok(posts);
                }
                Ok(FetchResult::Unauthorized) => {
                    let Some(broker) = &self.broker else {
                        error!(target_name = %target.name, status = 401, "Unauthorized without credentials");
                        return Err(FetchError::Unauthorized);
                    };

                    warn!(target_name = %target.name, attempt, status = 401, "Token rejected, refreshing");
                    let rejected = token.take().unwrap_or_default();
                    token = Some(broker.refresh_if_due(&rejected).await?);
                    last_error = "401 Unauthorized".to_string();
                }
                Ok(FetchResult::Status { status, body }) => {
                    error!(target_name = %target.name, attempt, status, "Listing request failed");
                    return Err(FetchError::Status { status, body });
                }
                Err(e) if e.is_transient() => {
                    warn!(
                        target_name = %target.name,
                        attempt,
                        attempts,
                        error = %e,
                        "Transient fetch failure"
                    );
                    last_error = e.to_string();
                    if attempt < attempts {
                        tokio::time::sleep(target.retry_interval()).await;
                    }
                }
                Err(e) => {
                    error!(target_name = %target.name, attempt, error = %e, "Fetch failed");
                    return Err(e);
                }
            }
        }

        Err(FetchError::Exhausted {
            attempts,
            last: last_error,
        })
    }
}
