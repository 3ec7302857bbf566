//! Transactional email API client.
//!
//! Speaks the Resend-style `POST /emails` JSON API. Network failures, 429 and
//! 5xx responses are retried with exponential backoff; other 4xx responses
//! fail immediately. Without an API key the client logs and drops messages.

use anyhow::{Context, Result};
use backoff::{future::retry, ExponentialBackoffBuilder};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::Settings;

#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub text: Option<String>,
    pub reply_to: Option<String>,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Sent { id: Option<String> },
    /// Delivery is disabled (no API key configured)
    Skipped,
}

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("email provider rejected the message ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("email provider unavailable: {0}")]
    Unavailable(String),
}

impl EmailError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable(_) => true,
            Self::Rejected { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
        }
    }
}

#[derive(Serialize)]
struct Payload<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<PayloadAttachment<'a>>,
}

#[derive(Serialize)]
struct PayloadAttachment<'a> {
    filename: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct SendResponse {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Deserialize)]
struct ProviderError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Clone)]
pub struct EmailClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    from: String,
    retry_window: Duration,
}

impl EmailClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        from: &str,
        timeout_seconds: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        if api_key.is_none() {
            warn!("EMAIL_API_KEY not set - outgoing email is disabled");
        }

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            from: from.to_string(),
            retry_window: Duration::from_secs(30),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            &settings.email_api_url,
            settings.email_api_key.clone(),
            &settings.email_from,
            settings.email_timeout_seconds,
        )
    }

    /// Upper bound on the time spent retrying a single message
    pub fn with_retry_window(mut self, window: Duration) -> Self {
        self.retry_window = window;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    #[instrument(skip(self, message), fields(subject = %message.subject, recipients = message.to.len()))]
    pub async fn send(&self, message: &EmailMessage) -> Result<SendOutcome, EmailError> {
        let Some(api_key) = self.api_key.as_deref() else {
            info!("Email delivery disabled, message dropped");
            return Ok(SendOutcome::Skipped);
        };

        let payload = Payload {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            html: &message.html,
            text: message.text.as_deref(),
            reply_to: message.reply_to.as_deref(),
            attachments: message
                .attachments
                .iter()
                .map(|a| PayloadAttachment {
                    filename: &a.filename,
                    content: STANDARD.encode(&a.content),
                })
                .collect(),
        };

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(250))
            .with_max_interval(Duration::from_secs(5))
            .with_max_elapsed_time(Some(self.retry_window))
            .build();

        let payload = &payload;
        let id = retry(policy, || async move {
            self.send_once(api_key, payload).await.map_err(|e| {
                if e.is_transient() {
                    warn!(error = %e, "Email send failed, retrying");
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        })
        .await?;

        info!(email_id = ?id, "Email sent");
        Ok(SendOutcome::Sent { id })
    }

    async fn send_once(
        &self,
        api_key: &str,
        payload: &Payload<'_>,
    ) -> Result<Option<String>, EmailError> {
        let url = format!("{}/emails", self.base_url);
        debug!(url = %url, "Email provider request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| EmailError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            // The id is informational; an unexpected body still means delivered.
            let body = response.json::<SendResponse>().await.ok();
            return Ok(body.and_then(|b| b.id));
        }

        let message = response
            .json::<ProviderError>()
            .await
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| status.to_string());

        Err(EmailError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message() -> EmailMessage {
        EmailMessage {
            to: vec!["client@example.com".to_string()],
            subject: "Your quotation".to_string(),
            html: "<p>Hello</p>".to_string(),
            text: None,
            reply_to: Some("owner@example.com".to_string()),
            attachments: vec![Attachment {
                filename: "Q-2024-0001.pdf".to_string(),
                content: b"%PDF".to_vec(),
            }],
        }
    }

    fn client(server: &MockServer) -> EmailClient {
        EmailClient::new(
            &server.uri(),
            Some("re_test".to_string()),
            "Studio <noreply@studio.test>",
            5,
        )
        .unwrap()
        .with_retry_window(Duration::from_secs(3))
    }

    #[tokio::test]
    async fn sends_payload_with_base64_attachment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("authorization", "Bearer re_test"))
            .and(body_partial_json(serde_json::json!({
                "from": "Studio <noreply@studio.test>",
                "to": ["client@example.com"],
                "reply_to": "owner@example.com",
                "attachments": [{"filename": "Q-2024-0001.pdf", "content": "JVBERg=="}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "em_1"})))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client(&server).send(&message()).await.unwrap();
        assert_eq!(
            outcome,
            SendOutcome::Sent {
                id: Some("em_1".to_string())
            }
        );
    }

    #[tokio::test]
    async fn retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "em_2"})))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client(&server).send(&message()).await.unwrap();
        assert_eq!(
            outcome,
            SendOutcome::Sent {
                id: Some("em_2".to_string())
            }
        );
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(serde_json::json!({"message": "Invalid `to` field"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).send(&message()).await.unwrap_err();
        match err {
            EmailError::Rejected { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "Invalid `to` field");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn disabled_client_skips() {
        let client = EmailClient::new("http://127.0.0.1:9", None, "a@b.test", 1).unwrap();
        assert!(!client.is_enabled());
        assert_eq!(client.send(&message()).await.unwrap(), SendOutcome::Skipped);
    }
}
