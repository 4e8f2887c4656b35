//! WhatsApp Cloud API client: send a text message via `POST /{version}/{phone_id}/messages`.

use crate::channels::sender::{OutboundSender, SendReceipt};
use crate::config::Settings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Shown when the platform's error body has no `error.message`.
pub const NO_DETAILS: &str = "no details";

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("whatsapp request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("whatsapp api error: {status} ({message})")]
    Api {
        status: reqwest::StatusCode,
        /// Platform's `error.message`, or [`NO_DETAILS`] (followed by the read error
        /// when the response body could not be read).
        message: String,
    },
}

impl SendError {
    /// The platform's own explanation, when the failure came from an HTTP response.
    pub fn platform_message(&self) -> Option<&str> {
        match self {
            SendError::Api { message, .. } => Some(message),
            SendError::Transport(_) => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct TextBody<'a> {
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct SendTextRequest<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    typ: &'static str,
    text: TextBody<'a>,
}

#[derive(Debug, Deserialize)]
struct SendTextResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Extract `error.message` from an error body, or [`NO_DETAILS`].
fn platform_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|r| r.error.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| NO_DETAILS.to_string())
}

/// Outbound dispatcher for the WhatsApp Business Cloud API.
#[derive(Clone)]
pub struct WhatsAppClient {
    url: String,
    token: String,
    client: reqwest::Client,
}

impl WhatsAppClient {
    pub fn new(settings: &Settings) -> Result<Self, SendError> {
        let client = reqwest::Client::builder()
            .timeout(settings.send_timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(settings.send_timeout))
            .build()?;
        Ok(Self {
            url: settings.messages_url(),
            token: settings.api_token.clone(),
            client,
        })
    }

    /// Send one text message. Exactly one request; no retries.
    pub async fn send_text(&self, to: &str, text: &str) -> Result<SendReceipt, SendError> {
        let body = SendTextRequest {
            messaging_product: "whatsapp",
            to,
            typ: "text",
            text: TextBody { body: text },
        };
        log::info!("whatsapp: sending text to {}", to);
        let res = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                log::warn!("whatsapp send to {} failed: {}", to, e);
                SendError::from(e)
            })?;
        let status = res.status();
        let body = match res.text().await {
            Ok(b) => b,
            Err(e) if !status.is_success() => {
                let message = format!("{}; reading response body failed: {}", NO_DETAILS, e);
                log::warn!("whatsapp send to {} rejected: {} {}", to, status, message);
                return Err(SendError::Api { status, message });
            }
            Err(e) => {
                log::warn!("whatsapp send to {} accepted but body unreadable: {}", to, e);
                String::new()
            }
        };
        if !status.is_success() {
            let message = platform_error_message(&body);
            log::warn!("whatsapp send to {} rejected: {} {}", to, status, message);
            return Err(SendError::Api { status, message });
        }
        let message_id = serde_json::from_str::<SendTextResponse>(&body)
            .ok()
            .and_then(|r| r.messages.into_iter().next())
            .map(|m| m.id);
        Ok(SendReceipt {
            recipient: to.to_string(),
            message_id,
        })
    }
}

#[async_trait]
impl OutboundSender for WhatsAppClient {
    async fn send_text(&self, to: &str, text: &str) -> Result<SendReceipt, SendError> {
        WhatsAppClient::send_text(self, to, text).await
    }
}
