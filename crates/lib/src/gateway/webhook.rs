//! `/api/webhook` handlers: verification handshake (GET) and event ingestion (POST).

use crate::channels::extract_events;
use crate::gateway::server::GatewayState;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

pub const VERIFY_MISMATCH_BODY: &str = "Verification token mismatch";
pub const ACK_BODY: &str = "OK";

/// Largest webhook body read; anything bigger is acknowledged and dropped.
pub const MAX_WEBHOOK_BODY: usize = 2 * 1024 * 1024;

/// Query parameters of the platform's subscription handshake.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// True when the handshake should succeed: mode is "subscribe" and the token matches.
pub fn verification_accepted(query: &VerifyQuery, expected_token: &str) -> bool {
    query.mode.as_deref() == Some("subscribe")
        && query.verify_token.as_deref() == Some(expected_token)
}

/// GET /api/webhook: echo `hub.challenge` when the token matches, else 403.
pub async fn verify_webhook(
    State(state): State<GatewayState>,
    Query(query): Query<VerifyQuery>,
) -> (StatusCode, String) {
    if verification_accepted(&query, &state.settings.verify_token) {
        log::info!("webhook verified");
        (StatusCode::OK, query.challenge.unwrap_or_default())
    } else {
        log::warn!(
            "webhook verification failed (mode: {:?})",
            query.mode.as_deref().unwrap_or("")
        );
        (StatusCode::FORBIDDEN, VERIFY_MISMATCH_BODY.to_string())
    }
}

/// POST /api/webhook: buffer messages and statuses, always answer 200 "OK".
///
/// Bodies that are over the size limit, not JSON, or not shaped like an envelope are
/// logged and still acknowledged; the platform must never see a failure from this route.
pub async fn receive_webhook(
    State(state): State<GatewayState>,
    body: Result<Bytes, BytesRejection>,
) -> (StatusCode, &'static str) {
    let body = match body {
        Ok(b) => b,
        Err(e) => {
            log::warn!("webhook body could not be read: {}", e);
            return (StatusCode::OK, ACK_BODY);
        }
    };
    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("webhook body is not JSON ({} bytes): {}", body.len(), e);
            return (StatusCode::OK, ACK_BODY);
        }
    };
    let received_at = chrono::Utc::now().timestamp();
    let events = extract_events(&payload, received_at);
    log::debug!(
        "webhook: {} message(s), {} status update(s)",
        events.messages.len(),
        events.statuses.len()
    );
    for m in events.messages {
        state.store.append_message(m);
    }
    for s in events.statuses {
        state.store.append_status(s);
    }
    (StatusCode::OK, ACK_BODY)
}
