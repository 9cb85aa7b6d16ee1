pub mod client;
pub mod http_fetcher;
pub mod listing;

pub use client::FetchClient;
pub use http_fetcher::HttpFetcher;

use async_trait::async_trait;

use crate::app::FetchError;

/// One GET against a listing endpoint.
#[derive(Debug, Clone)]
pub struct ListingRequest<'a> {
    pub url: &'a str,
    pub bearer: Option<&'a str>,
    pub user_agent: &'a str,
}

#[derive(Debug)]
pub enum FetchResult {
    /// 2xx with the raw listing body
    Content { body: Vec<u8> },
    /// HTTP 401
    Unauthorized,
    /// Any other non-success status
    Status { status: u16, body: String },
}

/// Network-level failures are returned as `Err`; every HTTP response,
/// successful or not, is an `Ok(FetchResult)`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &ListingRequest<'_>) -> Result<FetchResult, FetchError>;
}
