//! Integration test: serve the webhook on a free loopback port and drive it over HTTP.
//! Each test gets its own store; server tasks are left running when the test ends.

use lib::config::Settings;
use lib::gateway::{
    self, GatewayState, ACK_BODY, MAX_WEBHOOK_BODY, VERIFY_MISMATCH_BODY, WEBHOOK_PATH,
};
use lib::store::EventStore;
use reqwest::StatusCode;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn test_settings(port: u16) -> Settings {
    Settings {
        api_token: "token".to_string(),
        phone_id: "phone".to_string(),
        verify_token: "verify-me".to_string(),
        api_base_url: "http://127.0.0.1:9".to_string(),
        api_version: "v19.0".to_string(),
        send_timeout: Duration::from_secs(5),
        bind: "127.0.0.1".to_string(),
        port,
        test_recipient: None,
    }
}

/// Start a server; returns the webhook URL and the store it appends to.
async fn start_server() -> (String, Arc<EventStore>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind free port");
    let port = listener.local_addr().expect("local_addr").port();
    let store = Arc::new(EventStore::new());
    let state = GatewayState {
        settings: Arc::new(test_settings(port)),
        store: store.clone(),
    };
    tokio::spawn(async move {
        let _ = gateway::serve(listener, state, std::future::pending()).await;
    });
    (format!("http://127.0.0.1:{}{}", port, WEBHOOK_PATH), store)
}

fn text_message_payload(from: &str, body: &str) -> serde_json::Value {
    json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "WABA_ID",
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "contacts": [{ "wa_id": from, "profile": { "name": "Test User" } }],
                    "messages": [{
                        "from": from,
                        "id": "wamid.HBg",
                        "timestamp": "1700000000",
                        "type": "text",
                        "text": { "body": body }
                    }]
                }
            }]
        }]
    })
}

#[tokio::test]
async fn handshake_echoes_challenge_for_matching_token() {
    let (url, _store) = start_server().await;
    let resp = reqwest::Client::new()
        .get(&url)
        .query(&[
            ("hub.mode", "subscribe"),
            ("hub.verify_token", "verify-me"),
            ("hub.challenge", "abc123"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "abc123");
}

#[tokio::test]
async fn handshake_rejects_wrong_token_or_mode() {
    let (url, _store) = start_server().await;
    let client = reqwest::Client::new();
    for (mode, token) in [("subscribe", "nope"), ("unsubscribe", "verify-me")] {
        let resp = client
            .get(&url)
            .query(&[
                ("hub.mode", mode),
                ("hub.verify_token", token),
                ("hub.challenge", "abc123"),
            ])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(resp.text().await.unwrap(), VERIFY_MISMATCH_BODY);
    }

    let resp = client.get(&url).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn text_message_is_buffered() {
    let (url, store) = start_server().await;
    let resp = reqwest::Client::new()
        .post(&url)
        .json(&text_message_payload("123", "hi"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), ACK_BODY);

    assert_eq!(store.pending(), (1, 0));
    let drained = store.drain_messages();
    assert_eq!(drained.len(), 1);
    assert_eq!(drained[0].from, "123");
    assert_eq!(drained[0].body, "hi");
    assert_eq!(drained[0].timestamp, 1_700_000_000);
    assert_eq!(drained[0].sender_name.as_deref(), Some("Test User"));
}

#[tokio::test]
async fn status_updates_are_buffered_in_order() {
    let (url, store) = start_server().await;
    let payload = json!({
        "entry": [{ "changes": [{ "value": { "statuses": [
            { "id": "wamid.1", "recipient_id": "55", "status": "sent", "timestamp": "1700000001" },
            { "id": "wamid.1", "recipient_id": "55", "status": "delivered", "timestamp": "1700000002" }
        ] } }] }]
    });
    let resp = reqwest::Client::new().post(&url).json(&payload).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let statuses = store.drain_statuses();
    let labels: Vec<_> = statuses.iter().map(|s| s.status.label()).collect();
    assert_eq!(labels, vec!["Sent", "Delivered"]);
    assert!(store.drain_messages().is_empty());
}

#[tokio::test]
async fn malformed_bodies_are_acknowledged_and_ignored() {
    let (url, store) = start_server().await;
    let client = reqwest::Client::new();
    for body in ["", "{not json", "[]", "{}", r#"{"entry":[{"changes":"x"}]}"#] {
        let resp = client
            .post(&url)
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "body {:?}", body);
        assert_eq!(resp.text().await.unwrap(), ACK_BODY);
    }
    assert_eq!(store.pending(), (0, 0));
}

#[tokio::test]
async fn oversized_body_is_acknowledged_and_dropped() {
    let (url, store) = start_server().await;
    let padding = "x".repeat(3 * 1024 * 1024);
    let body = format!(r#"{{"pad":"{}"}}"#, padding);
    assert!(body.len() > MAX_WEBHOOK_BODY);

    let resp = reqwest::Client::new()
        .post(&url)
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), ACK_BODY);
    assert_eq!(store.pending(), (0, 0));
}

#[tokio::test]
async fn concurrent_posts_are_all_buffered() {
    let (url, store) = start_server().await;
    let client = reqwest::Client::new();
    let mut tasks = Vec::new();
    for i in 0..20 {
        let client = client.clone();
        let url = url.clone();
        tasks.push(tokio::spawn(async move {
            client
                .post(&url)
                .json(&text_message_payload(&i.to_string(), "x"))
                .send()
                .await
                .unwrap()
                .status()
        }));
    }
    for t in tasks {
        assert_eq!(t.await.unwrap(), StatusCode::OK);
    }
    let mut senders: Vec<u32> = store
        .drain_messages()
        .iter()
        .map(|m| m.from.parse().unwrap())
        .collect();
    senders.sort_unstable();
    assert_eq!(senders, (0..20).collect::<Vec<_>>());
}

#[tokio::test]
async fn health_reports_pending_counts() {
    let (url, store) = start_server().await;
    let client = reqwest::Client::new();
    client
        .post(&url)
        .json(&text_message_payload("1", "a"))
        .send()
        .await
        .unwrap();
    let base = url.trim_end_matches(WEBHOOK_PATH);
    let json: serde_json::Value = client
        .get(format!("{}/", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json.get("runtime").and_then(|v| v.as_str()), Some("running"));
    assert_eq!(json.get("pendingMessages").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(json.get("pendingStatuses").and_then(|v| v.as_u64()), Some(0));
    assert_eq!(store.pending(), (1, 0));
}
