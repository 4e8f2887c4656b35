//! Gateway: the HTTP side of the relay.
//!
//! One port serves the platform's webhook (`/api/webhook`, GET handshake and POST
//! ingestion) and a health probe at `/`. Handlers only append to the event store.

mod server;
mod webhook;

pub use server::{
    bind_listener, router, run_gateway, serve, shutdown_signal, GatewayState, WEBHOOK_PATH,
};
pub use webhook::{
    verification_accepted, VerifyQuery, ACK_BODY, MAX_WEBHOOK_BODY, VERIFY_MISMATCH_BODY,
};
