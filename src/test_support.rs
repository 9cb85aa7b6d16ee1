//! Shared fixtures and in-memory fakes for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::app::{AuthError, FetchError, NotifyError};
use crate::auth::{CredentialExchange, Credentials};
use crate::domain::{FormatFlags, OutputType, Sorting, Target};
use crate::fetcher::{FetchResult, Fetcher, ListingRequest};
use crate::notifier::{NotificationMessage, NotificationSender};

pub fn target(name: &str) -> Target {
    Target {
        name: name.to_string(),
        subreddit: name.to_string(),
        sorting: Sorting::New,
        output: OutputType::Discord,
        webhook_url: "https://discord.test/hook".to_string(),
        format: FormatFlags::default(),
        interval_secs: 30,
        limit: 2,
        retry_count: 3,
        retry_interval_secs: 2,
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        client_id: "client".to_string(),
        client_secret: "s3cret".to_string(),
        username: "bot".to_string(),
        password: "hunter2".to_string(),
    }
}

/// A listing body with one child per `(permalink, pinned)` pair.
pub fn listing_json(posts: &[(&str, bool)]) -> String {
    let children: Vec<_> = posts
        .iter()
        .map(|(permalink, pinned)| {
            json!({
                "kind": "t3",
                "data": {
                    "title": format!("Post {}", permalink),
                    "url": format!("https://example.com{}", permalink),
                    "author": "tester",
                    "permalink": permalink,
                    "selftext": "",
                    "stickied": pinned,
                }
            })
        })
        .collect();

    json!({ "kind": "Listing", "data": { "children": children } }).to_string()
}

/// Hands out `token-1`, `token-2`, … and counts exchanges.
pub struct FakeExchange {
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl FakeExchange {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let exchange = Self::new();
        exchange.set_failing(true);
        exchange
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialExchange for FakeExchange {
    async fn exchange(&self, _credentials: &Credentials) -> Result<String, AuthError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuthError::Status { status: 401 });
        }
        Ok(format!("token-{}", n))
    }
}

#[derive(Debug, Clone)]
pub enum Scripted {
    Body(String),
    Unauthorized,
    Status(u16),
    ConnectionError,
}

impl Scripted {
    pub fn listing(posts: &[(&str, bool)]) -> Self {
        Scripted::Body(listing_json(posts))
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub bearer: Option<String>,
    pub user_agent: String,
}

/// Replays scripted responses in order; the last one repeats forever.
pub struct FakeFetcher {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeFetcher {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self) -> Scripted {
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap_or(Scripted::ConnectionError)
        }
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, request: &ListingRequest<'_>) -> Result<FetchResult, FetchError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            url: request.url.to_string(),
            bearer: request.bearer.map(str::to_string),
            user_agent: request.user_agent.to_string(),
        });

        match self.next() {
            Scripted::Body(body) => Ok(FetchResult::Content {
                body: body.into_bytes(),
            }),
            Scripted::Unauthorized => Ok(FetchResult::Unauthorized),
            Scripted::Status(status) => Ok(FetchResult::Status {
                status,
                body: String::new(),
            }),
            Scripted::ConnectionError => Err(FetchError::Connection("connection refused".into())),
        }
    }
}

/// Records every message it is asked to deliver.
pub struct RecordingSender {
    sent: Mutex<Vec<NotificationMessage>>,
    failing: AtomicBool,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let sender = Self::new();
        sender.failing.store(true, Ordering::SeqCst);
        sender
    }

    pub fn sent(&self) -> Vec<NotificationMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationSender for RecordingSender {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, message: &NotificationMessage) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(message.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::UnexpectedStatus {
                backend: "recording",
                status: 500,
                expected: 204,
            });
        }
        Ok(())
    }
}
