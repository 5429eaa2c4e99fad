//! Outbound formatter
//!
//! Renders a canonical message into a `chat.postMessage` request body.

use super::blocks::{self, Block};
use crate::message::{Message, MessageType};
use serde::Serialize;
use serde_json::{Map, Value};

/// `details` flag asking for a Slack date token in front of the text
pub const TIME_PREFIX_FLAG: &str = "timePrefix";

/// Rendered `chat.postMessage` body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireBody {
    pub channel: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mrkdwn: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<Block>>,

    /// Caller-supplied top-level fields (`as_user`, `username`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WireBody {
    fn new(channel: &str, text: Option<String>) -> Self {
        Self {
            channel: channel.to_string(),
            mrkdwn: None,
            text,
            blocks: None,
            extra: Map::new(),
        }
    }

    /// Add a top-level field to the body
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Render a canonical message; `None` means there is nothing to send.
pub fn body(msg: &Message) -> Option<WireBody> {
    let Some(channel) = msg.receiver.channel() else {
        tracing::warn!(kind = %msg.kind, "Outbound message has no destination conversation");
        return None;
    };

    let text = msg.text_or_empty();

    let body = match msg.kind {
        MessageType::Text => {
            let text = msg.text.as_deref().map(|text| match msg.timestamp {
                Some(ts) if msg.detail_flag(TIME_PREFIX_FLAG) => match date_token(ts) {
                    Some(token) => format!("{}\n{}", token, text),
                    None => text.to_string(),
                },
                _ => text.to_string(),
            });
            WireBody {
                mrkdwn: Some(true),
                ..WireBody::new(channel, text)
            }
        }
        MessageType::Location => {
            let mut rendered = blocks::location(&msg.attachments);
            rendered.push(Block::plain_section(text));
            WireBody {
                blocks: Some(rendered),
                ..WireBody::new(channel, msg.text.clone())
            }
        }
        MessageType::Image => {
            let mut rendered = blocks::image(&msg.attachments);
            rendered.push(Block::plain_section(text));
            WireBody {
                blocks: Some(rendered),
                ..WireBody::new(channel, msg.text.clone())
            }
        }
        MessageType::Quick => WireBody {
            blocks: Some(vec![
                Block::plain_section(text),
                Block::actions(blocks::button(&msg.attachments)),
            ]),
            ..WireBody::new(channel, msg.text.clone())
        },
        MessageType::Action | MessageType::Other => return None,
    };

    Some(body)
}

/// Slack `<!date^...>` token; the fallback is the en-US rendering in UTC.
fn date_token(ts: i64) -> Option<String> {
    let at = chrono::DateTime::from_timestamp(ts, 0)?;
    Some(format!(
        "<!date^{}^{{date_short_pretty}} {{time}}|{}>",
        ts,
        at.format("%-m/%-d/%Y, %-I:%M:%S %p")
    ))
}
