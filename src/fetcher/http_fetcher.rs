use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode};
use tracing::warn;

use crate::app::FetchError;
use crate::fetcher::{FetchResult, Fetcher, ListingRequest};

/// Upper bound for a single request, listing or webhook.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The HTTP client shared by listing fetches, token exchanges and webhooks.
pub fn build_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .gzip(true)
        .brotli(true)
        .build()
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &ListingRequest<'_>) -> Result<FetchResult, FetchError> {
        let mut headers = HeaderMap::new();

        match HeaderValue::from_str(request.user_agent) {
            Ok(value) => {
                headers.insert(USER_AGENT, value);
            }
            Err(e) => warn!(error = %e, "Invalid user agent, sending request without one"),
        }

        let mut builder = self.client.get(request.url).headers(headers);
        if let Some(token) = request.bearer {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Ok(FetchResult::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Ok(FetchResult::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await?.to_vec();
        Ok(FetchResult::Content { body })
    }
}
