//! Webhook gateway for SlackPort
//!
//! Serves the Slack webhook routes, forwards normalized messages onto the
//! inbound bus and proxies token-protected file downloads.

mod handler;
mod proxy;
mod server;

pub use handler::router;
pub use server::{Gateway, GatewayBuilder, GatewayState, ServerHandle};
