//! Inbound events from the WhatsApp webhook: messages and delivery-status updates.
//!
//! Both are built once by the receiver from the webhook envelope and never mutated afterwards.

use serde_json::Value;

/// Body used when a message carries no text (non-text type, or missing `text.body`).
pub const NO_TEXT_PLACEHOLDER: &str = "(no text content)";

/// Identifier used when the platform omits `from` / `recipient_id`.
pub const UNKNOWN_PARTY: &str = "unknown";

/// Message type tag. Only text is interpreted; everything else keeps the platform's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Other(String),
}

impl MessageKind {
    fn from_type(typ: Option<&str>) -> Self {
        match typ {
            Some("text") => MessageKind::Text,
            Some(other) => MessageKind::Other(other.to_string()),
            None => MessageKind::Other(UNKNOWN_PARTY.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Other(s) => s,
        }
    }
}

/// A message received from a WhatsApp user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub from: String,
    /// Profile name from the envelope's `contacts`, when present.
    pub sender_name: Option<String>,
    pub kind: MessageKind,
    pub body: String,
    /// Epoch seconds.
    pub timestamp: i64,
    /// Platform message id (`wamid...`).
    pub id: Option<String>,
}

/// Delivery status reported for a message we sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    Read,
    Failed,
    Unknown,
}

impl DeliveryStatus {
    /// Case-insensitive parse of the platform's `status` string.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "sent" => DeliveryStatus::Sent,
            "delivered" => DeliveryStatus::Delivered,
            "read" => DeliveryStatus::Read,
            "failed" => DeliveryStatus::Failed,
            _ => DeliveryStatus::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "Sent",
            DeliveryStatus::Delivered => "Delivered",
            DeliveryStatus::Read => "Read",
            DeliveryStatus::Failed => "Failed",
            DeliveryStatus::Unknown => "Unknown",
        }
    }
}

/// A status update for an outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub recipient: String,
    pub status: DeliveryStatus,
    /// Epoch seconds.
    pub timestamp: i64,
    /// Id of the message this status refers to.
    pub message_id: Option<String>,
}

/// Events extracted from one webhook POST, in payload order.
#[derive(Debug, Default)]
pub struct WebhookEvents {
    pub messages: Vec<InboundMessage>,
    pub statuses: Vec<StatusUpdate>,
}

/// Platform timestamps are decimal strings; numbers are accepted too. Anything else is None.
fn parse_timestamp(v: Option<&Value>) -> Option<i64> {
    match v? {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

fn str_field<'a>(v: &'a Value, key: &str) -> Option<&'a str> {
    v.get(key).and_then(Value::as_str)
}

/// `entry[0].changes[0].value`, if the envelope has that shape.
fn envelope_value(payload: &Value) -> Option<&Value> {
    payload
        .get("entry")?
        .as_array()?
        .first()?
        .get("changes")?
        .as_array()?
        .first()?
        .get("value")
        .filter(|v| v.is_object())
}

/// Profile name for `wa_id` from the value's `contacts` list.
fn contact_name(value: &Value, wa_id: &str) -> Option<String> {
    value
        .get("contacts")?
        .as_array()?
        .iter()
        .find(|c| str_field(c, "wa_id") == Some(wa_id))
        .and_then(|c| c.get("profile"))
        .and_then(|p| str_field(p, "name"))
        .map(str::to_string)
}

fn parse_message(value: &Value, raw: &Value, received_at: i64) -> InboundMessage {
    let from = str_field(raw, "from").unwrap_or(UNKNOWN_PARTY).to_string();
    let kind = MessageKind::from_type(str_field(raw, "type"));
    let body = match kind {
        MessageKind::Text => raw
            .get("text")
            .and_then(|t| str_field(t, "body"))
            .unwrap_or(NO_TEXT_PLACEHOLDER)
            .to_string(),
        MessageKind::Other(_) => NO_TEXT_PLACEHOLDER.to_string(),
    };
    InboundMessage {
        sender_name: contact_name(value, &from),
        from,
        kind,
        body,
        timestamp: parse_timestamp(raw.get("timestamp")).unwrap_or(received_at),
        id: str_field(raw, "id").map(str::to_string),
    }
}

fn parse_status(raw: &Value, received_at: i64) -> StatusUpdate {
    StatusUpdate {
        recipient: str_field(raw, "recipient_id")
            .unwrap_or(UNKNOWN_PARTY)
            .to_string(),
        status: str_field(raw, "status")
            .map(DeliveryStatus::parse)
            .unwrap_or(DeliveryStatus::Unknown),
        timestamp: parse_timestamp(raw.get("timestamp")).unwrap_or(received_at),
        message_id: str_field(raw, "id").map(str::to_string),
    }
}

/// Extract messages and statuses from a webhook payload.
///
/// Any part of the envelope that is missing or has the wrong shape yields nothing for
/// that part; this never fails. `received_at` (epoch seconds) replaces absent timestamps.
pub fn extract_events(payload: &Value, received_at: i64) -> WebhookEvents {
    let mut events = WebhookEvents::default();
    let Some(value) = envelope_value(payload) else {
        return events;
    };
    if let Some(list) = value.get("messages").and_then(Value::as_array) {
        events.messages = list
            .iter()
            .filter(|m| m.is_object())
            .map(|m| parse_message(value, m, received_at))
            .collect();
    }
    if let Some(list) = value.get("statuses").and_then(Value::as_array) {
        events.statuses = list
            .iter()
            .filter(|s| s.is_object())
            .map(|s| parse_status(s, received_at))
            .collect();
    }
    events
}
