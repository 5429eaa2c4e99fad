//! Slack wire format
//!
//! Translation between the canonical message envelope and Slack's Events
//! API / Block Kit payloads.

pub mod blocks;
pub mod format;
pub mod inbound;
pub mod payload;
pub mod sanitize;
pub mod signature;

pub use blocks::{Block, Button, TextObject};
pub use format::{body, WireBody};
pub use inbound::{normalize, Inbound, InboundMeta};
pub use payload::SlackPayload;
pub use sanitize::sanitize;
pub use signature::{AuthOutcome, SlackSignature};

/// Platform name stamped on canonical senders and auth lookups
pub const PLATFORM: &str = "slack";
