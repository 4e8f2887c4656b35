//! wa-relay core library: event store, WhatsApp webhook gateway, outbound client,
//! and operator console used by the `wa-relay` CLI.

pub mod channels;
pub mod config;
pub mod console;
pub mod display;
pub mod gateway;
pub mod init;
pub mod store;
