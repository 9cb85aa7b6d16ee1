//! Bearer credentials for the OAuth listing API.
//!
//! [`TokenBroker`] owns the current token and the time of the last refresh.
//! A burst of 401s from several targets collapses into a single upstream
//! exchange: refreshes are serialized behind one lock and never happen more
//! often than the configured window.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::app::AuthError;

pub const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
pub const DEFAULT_REFRESH_WINDOW: Duration = Duration::from_secs(60);

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"********")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Trades client credentials for a bearer token.
#[async_trait]
pub trait CredentialExchange: Send + Sync {
    async fn exchange(&self, credentials: &Credentials) -> Result<String, AuthError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

/// Password-grant exchange against the Reddit token endpoint.
pub struct OAuthExchange {
    client: Client,
    token_url: String,
    user_agent: String,
}

impl OAuthExchange {
    pub fn new(client: Client, user_agent: impl Into<String>) -> Self {
        Self::with_token_url(client, user_agent, TOKEN_URL)
    }

    pub fn with_token_url(
        client: Client,
        user_agent: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            user_agent: user_agent.into(),
        }
    }
}

#[async_trait]
impl CredentialExchange for OAuthExchange {
    async fn exchange(&self, credentials: &Credentials) -> Result<String, AuthError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "password")
            .append_pair("username", &credentials.username)
            .append_pair("password", &credentials.password)
            .finish();

        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(AuthError::Status {
                status: response.status().as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        parse_token_response(&bytes)
    }
}

fn parse_token_response(body: &[u8]) -> Result<String, AuthError> {
    let parsed: TokenResponse = serde_json::from_slice(body)?;
    if let Some(error) = parsed.error {
        return Err(AuthError::Rejected(error));
    }
    match parsed.access_token {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::MissingToken),
    }
}

struct BrokerState {
    token: Option<String>,
    last_refresh: Option<Instant>,
}

pub struct TokenBroker {
    exchange: Arc<dyn CredentialExchange>,
    credentials: Credentials,
    refresh_window: Duration,
    state: Mutex<BrokerState>,
}

impl TokenBroker {
    pub fn new(exchange: Arc<dyn CredentialExchange>, credentials: Credentials) -> Self {
        Self::with_refresh_window(exchange, credentials, DEFAULT_REFRESH_WINDOW)
    }

    pub fn with_refresh_window(
        exchange: Arc<dyn CredentialExchange>,
        credentials: Credentials,
        refresh_window: Duration,
    ) -> Self {
        Self {
            exchange,
            credentials,
            refresh_window,
            state: Mutex::new(BrokerState {
                token: None,
                last_refresh: None,
            }),
        }
    }

    /// Perform one credential exchange without touching the held token.
    pub async fn obtain(&self) -> Result<String, AuthError> {
        self.exchange.exchange(&self.credentials).await
    }

    /// The current token, obtaining one first if none is held yet.
    pub async fn token(&self) -> Result<String, AuthError> {
        let mut state = self.state.lock().await;
        if let Some(token) = &state.token {
            return Ok(token.clone());
        }

        let token = self.obtain().await?;
        state.token = Some(token.clone());
        state.last_refresh = Some(Instant::now());
        info!("Obtained access token");
        Ok(token)
    }

    /// Replace `rejected` with a fresh token, at most once per window.
    ///
    /// If another caller already swapped the token out, that token is returned
    /// without contacting the endpoint. Inside the window the caller sleeps
    /// out the remainder while holding the lock, so every waiter ends up with
    /// the same refreshed token.
    pub async fn refresh_if_due(&self, rejected: &str) -> Result<String, AuthError> {
        let mut state = self.state.lock().await;

        if let Some(current) = &state.token {
            if current != rejected {
                debug!("Token already refreshed by another task");
                return Ok(current.clone());
            }
        }

        if let Some(last) = state.last_refresh {
            let elapsed = last.elapsed();
            if elapsed < self.refresh_window {
                let wait = self.refresh_window - elapsed;
                warn!(wait_secs = wait.as_secs_f64(), "Token refresh rate limited, waiting");
                tokio::time::sleep(wait).await;
            }
        }

        // A failed attempt still opens a new window.
        state.last_refresh = Some(Instant::now());
        let token = self.obtain().await?;
        state.token = Some(token.clone());
        info!("Refreshed access token");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{credentials, FakeExchange};
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_parse_token_response() {
        let token = parse_token_response(br#"{"access_token":"abc","token_type":"bearer"}"#);
        assert_eq!(token.unwrap(), "abc");
    }

    #[test]
    fn test_parse_token_response_missing_token() {
        let err = parse_token_response(br#"{"token_type":"bearer"}"#).unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));
    }

    #[test]
    fn test_parse_token_response_error_field() {
        let err = parse_token_response(br#"{"error":"invalid_grant"}"#).unwrap_err();
        assert!(matches!(err, AuthError::Rejected(ref e) if e == "invalid_grant"));
    }

    #[test]
    fn test_parse_token_response_malformed() {
        let err = parse_token_response(b"<html>").unwrap_err();
        assert!(matches!(err, AuthError::Malformed(_)));
    }

    #[test]
    fn test_credentials_debug_hides_secrets() {
        let shown = format!("{:?}", credentials());
        assert!(!shown.contains("hunter2"));
        assert!(!shown.contains("s3cret"));
    }

    #[tokio::test]
    async fn test_token_is_obtained_lazily_once() {
        let exchange = Arc::new(FakeExchange::new());
        let broker = TokenBroker::new(exchange.clone(), credentials());
        assert_eq!(exchange.calls(), 0);

        assert_eq!(assert_ok!(broker.token().await), "token-1");
        assert_eq!(assert_ok!(broker.token().await), "token-1");
        assert_eq!(exchange.calls(), 1);
    }

    #[tokio::test]
    async fn test_obtain_failure_surfaces() {
        let exchange = Arc::new(FakeExchange::failing());
        let broker = TokenBroker::new(exchange, credentials());
        assert_err!(broker.token().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_waits_out_window() {
        let exchange = Arc::new(FakeExchange::new());
        let broker = TokenBroker::new(exchange.clone(), credentials());
        let first = broker.token().await.unwrap();

        let start = Instant::now();
        let second = broker.refresh_if_due(&first).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert_eq!(second, "token-2");
        assert_eq!(exchange.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_outside_window_is_immediate() {
        let exchange = Arc::new(FakeExchange::new());
        let broker = TokenBroker::new(exchange.clone(), credentials());
        let first = broker.token().await.unwrap();

        tokio::time::sleep(Duration::from_secs(120)).await;
        let start = Instant::now();
        broker.refresh_if_due(&first).await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_refreshes_collapse() {
        let exchange = Arc::new(FakeExchange::new());
        let broker = Arc::new(TokenBroker::new(exchange.clone(), credentials()));
        let stale = broker.token().await.unwrap();
        assert_eq!(exchange.calls(), 1);

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let broker = broker.clone();
                let stale = stale.clone();
                tokio::spawn(async move { broker.refresh_if_due(&stale).await })
            })
            .collect();

        let tokens: Vec<String> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap().unwrap())
            .collect();

        // One initial exchange plus exactly one refresh.
        assert_eq!(exchange.calls(), 2);
        assert!(tokens.iter().all(|t| t == "token-2"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refreshes_stay_one_per_window() {
        let exchange = Arc::new(FakeExchange::new());
        let broker = Arc::new(TokenBroker::new(exchange.clone(), credentials()));
        let stale = broker.token().await.unwrap();
        exchange.set_failing(true);

        let start = Instant::now();
        let handles: Vec<_> = (0..5)
            .map(|_| {
                let broker = broker.clone();
                let stale = stale.clone();
                tokio::spawn(async move { broker.refresh_if_due(&stale).await })
            })
            .collect();

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(exchange.calls(), 2);

        for result in futures::future::join_all(handles).await {
            assert_err!(result.unwrap());
        }
        assert_eq!(exchange.calls(), 6);
        assert!(start.elapsed() >= Duration::from_secs(240));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_failure_keeps_old_token() {
        let exchange = Arc::new(FakeExchange::new());
        let broker = TokenBroker::new(exchange.clone(), credentials());
        let first = broker.token().await.unwrap();

        exchange.set_failing(true);
        assert_err!(broker.refresh_if_due(&first).await);
        assert_eq!(broker.token().await.unwrap(), first);
    }
}
