//! WhatsApp channel: inbound webhook events and the outbound Cloud API client.
//!
//! The receiver turns webhook envelopes into [`InboundMessage`] / [`StatusUpdate`] values;
//! the console sends replies through an [`OutboundSender`].

mod events;
mod sender;
mod whatsapp;

pub use events::{
    extract_events, DeliveryStatus, InboundMessage, MessageKind, StatusUpdate, WebhookEvents,
    NO_TEXT_PLACEHOLDER, UNKNOWN_PARTY,
};
pub use sender::{OutboundSender, SendReceipt};
pub use whatsapp::{SendError, WhatsAppClient, NO_DETAILS};
