//! Block Kit model and attachment classifiers
//!
//! Each classifier filters a heterogeneous attachment list down to the
//! members eligible for one block class, then projects them into Block Kit
//! fragments. Eligibility depends only on the content type (or on being a
//! bare string), never on which fields happen to be present.

use crate::message::{ActionValue, Attachment, AttachmentView, ViewValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Content types rendered as image blocks
pub const IMAGE_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/gif"];

/// Content type marking a quick-reply button
pub const BUTTON_CONTENT_TYPE: &str = "application/x.button";

/// Content type marking a location card
pub const LOCATION_CONTENT_TYPE: &str = "application/x.location";

/// Prefix of generated button action ids
pub const DEFAULT_ACTION_PREFIX: &str = "imBack";

/// A Block Kit layout block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        text: TextObject,
    },
    Image {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt_text: Option<String>,
    },
    Actions {
        elements: Vec<Element>,
    },
}

impl Block {
    /// Section block with plain (non-markdown) text
    pub fn plain_section(text: impl Into<String>) -> Self {
        Self::Section {
            text: TextObject::PlainText { text: text.into() },
        }
    }

    /// Actions block holding the given buttons
    pub fn actions(buttons: Vec<Button>) -> Self {
        Self::Actions {
            elements: buttons.into_iter().map(Element::Button).collect(),
        }
    }
}

/// Block Kit text object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    PlainText { text: String },
    Mrkdwn { text: String },
}

/// Interactive element inside an actions block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Button(Button),
}

/// Button element; `value` is an encoded [`ActionValue`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Button {
    pub text: TextObject,
    pub action_id: String,
    pub value: String,
}

/// Bare strings and `image/jpeg|png|gif` objects
pub fn is_image(view: &AttachmentView<'_>) -> bool {
    view.bare
        || view
            .content_type
            .is_some_and(|ct| IMAGE_CONTENT_TYPES.contains(&ct))
}

/// Bare strings and `application/x.button` objects
pub fn is_button(view: &AttachmentView<'_>) -> bool {
    view.bare || view.content_type == Some(BUTTON_CONTENT_TYPE)
}

/// `application/x.location` objects that carry `details`
pub fn is_location(view: &AttachmentView<'_>) -> bool {
    view.content_type == Some(LOCATION_CONTENT_TYPE) && view.details.is_some()
}

/// Image blocks for every image-eligible attachment
pub fn image(attachments: &[Attachment]) -> Vec<Block> {
    attachments
        .iter()
        .filter_map(Attachment::view)
        .filter(|view| is_image(view))
        .map(|view| Block::Image {
            image_url: view.url.map(str::to_string),
            alt_text: view.title.map(str::to_string),
        })
        .collect()
}

/// Buttons for every button-eligible attachment.
///
/// Generated action ids are `imBack-<i>` where `i` counts eligible
/// attachments only, so the same list always yields the same ids.
pub fn button(attachments: &[Attachment]) -> Vec<Button> {
    attachments
        .iter()
        .filter_map(Attachment::view)
        .filter(|view| is_button(view))
        .enumerate()
        .map(|(index, view)| project_button(index, &view))
        .collect()
}

fn project_button(index: usize, view: &AttachmentView<'_>) -> Button {
    let default_action = || format!("{}-{}", DEFAULT_ACTION_PREFIX, index);

    if view.bare {
        let label = view.title.unwrap_or_default();
        return Button {
            text: TextObject::PlainText {
                text: label.to_string(),
            },
            action_id: default_action(),
            value: ActionValue::text(label).encode(),
        };
    }

    let label = view
        .title
        .filter(|t| !t.is_empty())
        .or(match view.value {
            ViewValue::Text(text) => Some(text),
            _ => None,
        })
        .unwrap_or_default();

    let action_id = view
        .action
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .unwrap_or_else(default_action);

    let value = match view.value {
        ViewValue::Object(map) => ActionValue::Structured(map.clone()),
        ViewValue::Text(text) => ActionValue::text(text),
        ViewValue::Other(other) => {
            let mut map = Map::new();
            map.insert("text".to_string(), other.clone());
            ActionValue::Structured(map)
        }
        ViewValue::Absent => ActionValue::text(label),
    };

    Button {
        text: TextObject::PlainText {
            text: label.to_string(),
        },
        action_id,
        value: value.encode(),
    }
}

/// Two blocks per eligible location: a thumbnail image, then a markdown
/// section with the title and the address linked to the location url.
pub fn location(attachments: &[Attachment]) -> Vec<Block> {
    attachments
        .iter()
        .filter_map(Attachment::view)
        .filter(|view| is_location(view))
        .flat_map(|view| {
            let address = view
                .details
                .and_then(|d| d.get("address"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            [
                Block::Image {
                    image_url: view.thumbnail.map(str::to_string),
                    alt_text: Some(address.to_string()),
                },
                Block::Section {
                    text: TextObject::Mrkdwn {
                        text: format!(
                            "*{}*\n<{}|{}>",
                            view.title.unwrap_or_default(),
                            view.url.unwrap_or_default(),
                            address
                        ),
                    },
                },
            ]
        })
        .collect()
}
