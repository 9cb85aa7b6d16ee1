use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum XenigoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Failures reading, writing or recovering the dedup cache file.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to read/write cache file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cache file at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to encode cache: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Token endpoint returned status {status}")]
    Status { status: u16 },

    #[error("Token endpoint rejected credentials: {0}")]
    Rejected(String),

    #[error("Token response is missing access_token")]
    MissingToken,

    #[error("Malformed token response: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Received non-success status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unauthorized and no credentials are configured")]
    Unauthorized,

    #[error("Token refresh failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Failed to decode listing: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid listing URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Gave up after {attempts} attempts, last error: {last}")]
    Exhausted { attempts: u32, last: String },
}

impl FetchError {
    /// Whether another attempt may succeed (network-level failures only).
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            FetchError::Connection(_) => true,
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Failed to send webhook: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{backend} webhook returned {status}, expected {expected}")]
    UnexpectedStatus {
        backend: &'static str,
        status: u16,
        expected: u16,
    },

    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, XenigoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_errors_are_transient() {
        assert!(FetchError::Connection("refused".into()).is_transient());
    }

    #[test]
    fn test_status_errors_are_not_transient() {
        let err = FetchError::Status {
            status: 404,
            body: "not found".into(),
        };
        assert!(!err.is_transient());
        assert!(!FetchError::Unauthorized.is_transient());
        assert!(!FetchError::Exhausted {
            attempts: 3,
            last: "x".into()
        }
        .is_transient());
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = NotifyError::UnexpectedStatus {
            backend: "discord",
            status: 400,
            expected: 204,
        };
        assert_eq!(err.to_string(), "discord webhook returned 400, expected 204");

        let wrapped: XenigoError = FetchError::Status {
            status: 403,
            body: "forbidden".into(),
        }
        .into();
        assert!(wrapped.to_string().contains("403"));
    }
}
