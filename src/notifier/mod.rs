//! Delivery of new posts to chat webhooks.

pub mod discord;
pub mod slack;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::app::NotifyError;
use crate::domain::{OutputType, Post, Target};

pub use discord::DiscordSender;
pub use slack::SlackSender;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageField {
    pub name: String,
    pub value: String,
}

/// Backend-neutral notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    pub title: String,
    pub description: String,
    pub url: Option<String>,
    pub author: Option<String>,
    pub fields: Vec<MessageField>,
}

impl NotificationMessage {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            url: None,
            author: None,
            fields: Vec::new(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(MessageField {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}

/// A webhook backend able to deliver one message.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, message: &NotificationMessage) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Muted,
}

/// Formats posts for one target and hands them to its backend.
/// No retries: a failed delivery is reported once and dropped.
pub struct NotificationDispatcher {
    sender: Arc<dyn NotificationSender>,
    muted: bool,
}

impl NotificationDispatcher {
    pub fn new(sender: Arc<dyn NotificationSender>, muted: bool) -> Self {
        Self { sender, muted }
    }

    /// Pick the backend configured for `target`.
    pub fn for_target(client: Client, target: &Target, muted: bool) -> Self {
        let sender: Arc<dyn NotificationSender> = match target.output {
            OutputType::Discord => Arc::new(DiscordSender::new(client, &target.webhook_url)),
            OutputType::Slack => Arc::new(SlackSender::new(client, &target.webhook_url)),
        };
        Self::new(sender, muted)
    }

    pub fn backend(&self) -> &'static str {
        self.sender.name()
    }

    pub async fn dispatch(&self, post: &Post, target: &Target) -> Result<Delivery, NotifyError> {
        if self.muted {
            info!(target_name = %target.name, permalink = %post.permalink, "Notifications muted, skipping");
            return Ok(Delivery::Muted);
        }

        let message = build_message(post, target);
        match self.sender.send(&message).await {
            Ok(()) => {
                debug!(
                    target_name = %target.name,
                    backend = self.sender.name(),
                    permalink = %post.permalink,
                    "Notification sent"
                );
                Ok(Delivery::Sent)
            }
            Err(e) => {
                warn!(
                    target_name = %target.name,
                    backend = self.sender.name(),
                    permalink = %post.permalink,
                    error = %e,
                    "Notification failed"
                );
                Err(e)
            }
        }
    }
}

/// Render a post according to the target's format flags.
pub fn build_message(post: &Post, target: &Target) -> NotificationMessage {
    let format = &target.format;
    let mut message = NotificationMessage::new(&post.title, &post.body);

    if format.url && !post.url.is_empty() {
        message = message.with_url(&post.url);
    }
    if format.author && !post.author.is_empty() {
        message = message.with_author(&post.author);
    }
    if format.subreddit {
        message = message.with_field("Subreddit", &target.subreddit);
    }
    if format.discussion_url {
        if let Some(link) = post.discussion_url() {
            message = message.with_field("Discussion URL", link);
        }
    }

    message
}
