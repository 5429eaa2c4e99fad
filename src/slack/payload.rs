//! Slack webhook payload wire types
//!
//! Only the fields the normalizer reads are modelled. Everything is
//! optional so a partially populated callback still decodes.

use serde::Deserialize;
use serde_json::Value;

/// Top-level webhook payload, keyed by its `type` field
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackPayload {
    /// Interactive component callback
    BlockActions(BlockActionsPayload),
    /// Events API endpoint ownership check
    UrlVerification {
        #[serde(default)]
        challenge: String,
    },
    /// Events API event wrapper
    EventCallback { event: SlackEvent },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockActionsPayload {
    #[serde(default)]
    pub trigger_id: Option<String>,
    #[serde(default)]
    pub user: IdRef,
    #[serde(default)]
    pub channel: IdRef,
    #[serde(default)]
    pub message: Option<ActionSourceMessage>,
    #[serde(default)]
    pub actions: Vec<BlockAction>,
}

/// `{ "id": ... }` reference to a user or channel
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdRef {
    #[serde(default)]
    pub id: String,
}

/// The message that carried the clicked element
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionSourceMessage {
    #[serde(default)]
    pub bot_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockAction {
    #[serde(default)]
    pub action_id: Option<String>,
    #[serde(default)]
    pub action_ts: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

/// Inner event of an `event_callback`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackEvent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub client_msg_id: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub text: Value,
    #[serde(default)]
    pub files: Vec<SlackFile>,
}

impl SlackEvent {
    /// Posted by a bot (including this app)
    pub fn is_bot_message(&self) -> bool {
        self.subtype.as_deref() == Some("bot_message") || self.bot_id.is_some()
    }

    pub fn is_file_share(&self) -> bool {
        self.subtype.as_deref() == Some("file_share")
    }
}

/// File descriptor of a `file_share` message
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackFile {
    #[serde(default)]
    pub url_private_download: Option<String>,
    #[serde(default)]
    pub mimetype: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Whole seconds of a Slack `ts` (`"1600000000.000200"` → `1600000000`).
pub fn parse_ts(ts: &str) -> Option<i64> {
    ts.split('.').next()?.trim().parse().ok()
}
