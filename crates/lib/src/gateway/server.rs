//! Webhook HTTP server: routes, shared state, and the serve loop.

use crate::config::Settings;
use crate::gateway::webhook::{receive_webhook, verify_webhook, MAX_WEBHOOK_BODY};
use crate::store::EventStore;
use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, State},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

pub const WEBHOOK_PATH: &str = "/api/webhook";

/// Shared state for request handlers (settings and the event store).
#[derive(Clone)]
pub struct GatewayState {
    pub settings: Arc<Settings>,
    pub store: Arc<EventStore>,
}

/// Build the router: health probe plus the webhook route.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route(WEBHOOK_PATH, get(verify_webhook).post(receive_webhook))
        .layer(DefaultBodyLimit::max(MAX_WEBHOOK_BODY))
        .with_state(state)
}

/// Bind `settings.bind:settings.port`.
pub async fn bind_listener(settings: &Settings) -> Result<TcpListener> {
    let addr = settings.listen_addr();
    TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {}", addr))
}

/// Serve the webhook on an already-bound listener until `shutdown` completes.
pub async fn serve<F>(listener: TcpListener, state: GatewayState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("reading listener address")?;
    log::info!("webhook listening on http://{}{}", addr, WEBHOOK_PATH);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("webhook server exited")?;
    log::info!("webhook server stopped");
    Ok(())
}

/// Bind and serve until SIGINT / SIGTERM.
pub async fn run_gateway(settings: Arc<Settings>, store: Arc<EventStore>) -> Result<()> {
    let listener = bind_listener(&settings).await?;
    serve(listener, GatewayState { settings, store }, shutdown_signal()).await
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received");
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    let (messages, statuses) = state.store.pending();
    Json(json!({
        "runtime": "running",
        "port": state.settings.port,
        "pendingMessages": messages,
        "pendingStatuses": statuses,
    }))
}
