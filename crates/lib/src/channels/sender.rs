//! Outbound sender seam: the console sends through this trait, so it can run against
//! the real Cloud API client or a stand-in.

use crate::channels::whatsapp::SendError;
use async_trait::async_trait;

/// Confirmation of an accepted send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    pub recipient: String,
    /// Platform message id from the response, when present.
    pub message_id: Option<String>,
}

#[async_trait]
pub trait OutboundSender: Send + Sync {
    /// Send a text message to `to`. One attempt; failures are returned, never retried.
    async fn send_text(&self, to: &str, text: &str) -> Result<SendReceipt, SendError>;
}
