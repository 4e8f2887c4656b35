//! Console rendering of drained events.

use crate::channels::{DeliveryStatus, InboundMessage, MessageKind, StatusUpdate};
use chrono::{DateTime, Local};

const RULE: &str = "---------------------------------";

/// Local time `%Y-%m-%d %H:%M:%S` for epoch seconds; out-of-range values show the current time.
pub fn format_timestamp(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|t| t.with_timezone(&Local))
        .unwrap_or_else(Local::now)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

fn status_icon(status: DeliveryStatus) -> &'static str {
    match status {
        DeliveryStatus::Sent => "📤",
        DeliveryStatus::Delivered => "📥",
        DeliveryStatus::Read => "👀",
        DeliveryStatus::Failed => "❌",
        DeliveryStatus::Unknown => "❓",
    }
}

pub fn format_message(m: &InboundMessage) -> String {
    let from = match &m.sender_name {
        Some(name) => format!("{} ({})", m.from, name),
        None => m.from.clone(),
    };
    let mut out = String::from("\n--- 📩 New message ---\n");
    out.push_str(&format!("  From: {}\n", from));
    out.push_str(&format!("  Message: {}\n", m.body));
    if let MessageKind::Other(kind) = &m.kind {
        out.push_str(&format!("  Type: {}\n", kind));
    }
    out.push_str(&format!("  Time: {}\n", format_timestamp(m.timestamp)));
    out.push_str(RULE);
    out
}

pub fn format_status(s: &StatusUpdate) -> String {
    format!(
        "\n--- {} Status update ---\n  [{}] To: {}\n  Status: {}\n{}",
        status_icon(s.status),
        format_timestamp(s.timestamp),
        s.recipient,
        s.status.label(),
        RULE
    )
}
