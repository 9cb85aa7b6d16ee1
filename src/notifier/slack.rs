use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::app::NotifyError;
use crate::notifier::{NotificationMessage, NotificationSender};

#[derive(Debug, Serialize)]
struct WebhookBody<'a> {
    attachments: Vec<Attachment<'a>>,
}

#[derive(Debug, Serialize)]
struct Attachment<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    title_link: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    author_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<AttachmentField<'a>>,
}

#[derive(Debug, Serialize)]
struct AttachmentField<'a> {
    title: &'a str,
    value: &'a str,
}

fn payload(message: &NotificationMessage) -> Result<String, NotifyError> {
    let body = WebhookBody {
        attachments: vec![Attachment {
            title: &message.title,
            title_link: message.url.as_deref(),
            author_name: message.author.as_deref(),
            text: (!message.description.is_empty()).then_some(message.description.as_str()),
            fields: message
                .fields
                .iter()
                .map(|f| AttachmentField {
                    title: &f.name,
                    value: &f.value,
                })
                .collect(),
        }],
    };
    Ok(serde_json::to_string(&body)?)
}

/// Slack incoming webhook; answers 200 on success.
pub struct SlackSender {
    client: Client,
    webhook_url: String,
}

impl SlackSender {
    pub fn new(client: Client, webhook_url: impl Into<String>) -> Self {
        Self {
            client,
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl NotificationSender for SlackSender {
    fn name(&self) -> &'static str {
        "slack"
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
        if status != StatusCode::OK {
            return Err(NotifyError::UnexpectedStatus {
                backend: self.name(),
                status: status.as_u16(),
                expected: StatusCode::OK.as_u16(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_payload_shape() {
        let message = NotificationMessage::new("Hello", "body")
            .with_url("https://example.com")
            .with_author("ferris")
            .with_field("Discussion URL", "https://www.reddit.com/r/rust/1");

        let value: Value = serde_json::from_str(&payload(&message).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "attachments": [{
                    "title": "Hello",
                    "title_link": "https://example.com",
                    "author_name": "ferris",
                    "text": "body",
                    "fields": [{ "title": "Discussion URL", "value": "https://www.reddit.com/r/rust/1" }]
                }]
            })
        );
    }
}
