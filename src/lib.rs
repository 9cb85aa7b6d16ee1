//! # xenigo
//!
//! Watches subreddits and forwards new posts to Discord or Slack webhooks.
//!
//! ## Architecture
//!
//! One long-lived task per configured target, all sharing a dedup cache and
//! (in elevated mode) a token broker:
//!
//! ```text
//! FetchClient → TargetMonitor → DedupCache
//!                      ↓
//!          NotificationDispatcher → webhook
//! ```
//!
//! A background persister flushes the cache to disk so posts are not
//! announced twice across restarts.
//!
//! ## Quick Start
//!
//! ```bash
//! # Write a commented config.toml
//! xenigo init
//!
//! # Validate it
//! xenigo check
//!
//! # Start monitoring
//! xenigo run
//! ```
//!
//! ## Modules
//!
//! - [`app`]: Application context and error types
//! - [`auth`]: OAuth token exchange and rate-limited refresh
//! - [`cache`]: Bounded dedup cache and its persister
//! - [`cli`]: Command-line interface definitions
//! - [`config`]: TOML configuration
//! - [`daemon`]: Startup and task supervision
//! - [`domain`]: Core domain models (Target, Post)
//! - [`fetcher`]: Listing retrieval with retries
//! - [`monitor`]: Per-target polling loop
//! - [`notifier`]: Webhook backends

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// HTTP client, cache, token broker, fetch client.
pub mod app;

/// Bearer tokens for the OAuth API.
pub mod auth;

/// Dedup cache of already-seen permalinks.
///
/// - [`DedupCache`](cache::DedupCache): FIFO-bounded set with JSON persistence
/// - [`spawn_cache_persister`](cache::spawn_cache_persister): periodic flush task
pub mod cache;

/// Command-line interface using clap.
///
/// - `run` - Start monitoring
/// - `check` - Validate the configuration
/// - `init` - Write a default configuration
pub mod cli;

/// Configuration loading and validation.
///
/// Looks for `config.toml` in the working directory, `config/`, `data/`,
/// then `~/.config/xenigo/`.
pub mod config;

/// Starts the monitors and the persister and stops them on SIGINT/SIGTERM.
pub mod daemon;

/// Core domain models.
///
/// - [`Target`](domain::Target): One subreddit/webhook pairing
/// - [`Post`](domain::Post): A listing entry keyed by permalink
pub mod domain;

/// Listing retrieval.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for a single HTTP request
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
/// - [`FetchClient`](fetcher::FetchClient): Retries, token refresh, pinned-post filtering
pub mod fetcher;

/// The per-target polling loop.
pub mod monitor;

/// Notification backends.
///
/// - [`NotificationDispatcher`](notifier::NotificationDispatcher): Formats posts and picks the backend
/// - [`DiscordSender`](notifier::DiscordSender) and [`SlackSender`](notifier::SlackSender)
pub mod notifier;

#[cfg(test)]
mod test_support;
