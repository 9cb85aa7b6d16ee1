use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::app::NotifyError;
use crate::notifier::{NotificationMessage, NotificationSender};

#[derive(Debug, Serialize)]
struct WebhookBody<'a> {
    embeds: Vec<Embed<'a>>,
}

#[derive(Debug, Serialize)]
struct Embed<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<EmbedAuthor<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<EmbedField<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedAuthor<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct EmbedField<'a> {
    name: &'a str,
    value: &'a str,
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

fn payload(message: &NotificationMessage) -> Result<String, NotifyError> {
    let body = WebhookBody {
        embeds: vec![Embed {
            title: &message.title,
            description: non_empty(&message.description),
            url: message.url.as_deref(),
            author: message.author.as_deref().map(|name| EmbedAuthor { name }),
            fields: message
                .fields
                .iter()
                .map(|f| EmbedField {
                    name: &f.name,
                    value: &f.value,
                })
                .collect(),
        }],
    };
    Ok(serde_json::to_string(&body)?)
}

/// Discord incoming webhook; answers 204 on success.
pub struct DiscordSender {
    client: Client,
    webhook_url: String,
}

impl DiscordSender {
    pub fn new(client: Client, webhook_url: impl Into<String>) -> Self {
        Self {
            client,
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl NotificationSender for DiscordSender {
    fn name(&self) -> &'static str {
        "discord"
    }

    async fn send(&self, message: &NotificationMessage) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload(message)?)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::NO_CONTENT {
            return Err(NotifyError::UnexpectedStatus {
                backend: self.name(),
                status: status.as_u16(),
                expected: StatusCode::NO_CONTENT.as_u16(),
            });
        }
        Ok(())
    }
}
