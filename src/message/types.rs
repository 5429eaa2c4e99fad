//! Canonical message types
//!
//! The platform-agnostic envelope exchanged with the message bus. All types
//! use camelCase JSON serialization.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Message kind tag. Tags this adapter does not know deserialize to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    Image,
    Location,
    Quick,
    Action,
    #[serde(other)]
    Other,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Image => write!(f, "image"),
            Self::Location => write!(f, "location"),
            Self::Quick => write!(f, "quick"),
            Self::Action => write!(f, "action"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Originator of a message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sender {
    pub id: String,
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// Destination of a message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receiver {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

impl Receiver {
    /// Destination channel: `conversationId`, else `id`.
    pub fn channel(&self) -> Option<&str> {
        self.conversation_id.as_deref().or(self.id.as_deref())
    }
}

/// Canonical message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    /// UNIX timestamp in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Sender>,

    #[serde(default)]
    pub receiver: Receiver,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,

    /// Raw platform payload the message was built from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<Value>,
}

impl Message {
    /// Create an empty message of the given kind
    pub fn new(kind: MessageType) -> Self {
        Self {
            kind,
            message_id: None,
            timestamp: None,
            sender: None,
            receiver: Receiver::default(),
            text: None,
            attachments: Vec::new(),
            details: None,
            request: None,
        }
    }

    /// Address the message to a conversation
    pub fn to(mut self, conversation_id: impl Into<String>) -> Self {
        self.receiver.conversation_id = Some(conversation_id.into());
        self
    }

    /// Set the message text
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the message attachments
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    /// Set the UNIX timestamp (seconds)
    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Set a single `details` entry
    pub fn with_detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.details
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    /// Whether a `details` entry is present and truthy
    pub fn detail_flag(&self, key: &str) -> bool {
        self.details
            .as_ref()
            .and_then(|d| d.get(key))
            .map(is_truthy)
            .unwrap_or(false)
    }

    /// Message text, empty when absent
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// A message attachment: a bare link/label string or a typed object.
///
/// Anything else is kept as `Malformed` so one bad entry never fails the
/// whole message; classifiers skip it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attachment {
    Link(String),
    Object(AttachmentObject),
    Malformed(Value),
}

/// Typed attachment object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
}

impl Attachment {
    /// Attachment pointing at a downloadable file
    pub fn file(url: impl Into<String>, content_type: Option<String>, filename: Option<String>) -> Self {
        Self::Object(AttachmentObject {
            url: Some(url.into()),
            content_type,
            filename,
            ..Default::default()
        })
    }

    /// Normalized view used by the classifiers; `None` for malformed entries.
    pub fn view(&self) -> Option<AttachmentView<'_>> {
        match self {
            Self::Link(s) => Some(AttachmentView {
                bare: true,
                content_type: None,
                url: Some(s),
                title: Some(s),
                thumbnail: None,
                value: ViewValue::Text(s),
                action: None,
                details: None,
            }),
            Self::Object(obj) => Some(AttachmentView {
                bare: false,
                content_type: obj.content_type.as_deref(),
                url: obj.url.as_deref(),
                title: obj.title.as_deref(),
                thumbnail: obj.thumbnail.as_deref(),
                value: match &obj.value {
                    None | Some(Value::Null) => ViewValue::Absent,
                    Some(Value::String(s)) => ViewValue::Text(s),
                    Some(Value::Object(m)) => ViewValue::Object(m),
                    Some(other) => ViewValue::Other(other),
                },
                action: obj.action.as_deref(),
                details: obj.details.as_ref(),
            }),
            Self::Malformed(_) => None,
        }
    }
}

/// Borrowed, shape-independent view of an attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttachmentView<'a> {
    /// Built from a bare string
    pub bare: bool,
    pub content_type: Option<&'a str>,
    pub url: Option<&'a str>,
    pub title: Option<&'a str>,
    pub thumbnail: Option<&'a str>,
    pub value: ViewValue<'a>,
    pub action: Option<&'a str>,
    pub details: Option<&'a Map<String, Value>>,
}

/// Attachment `value` field by shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewValue<'a> {
    Absent,
    Text(&'a str),
    Object(&'a Map<String, Value>),
    Other(&'a Value),
}
