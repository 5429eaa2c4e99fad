//! Inbound normalizer
//!
//! Turns a raw Slack webhook payload into a canonical message, a
//! verification challenge, or nothing at all.

use super::payload::{parse_ts, BlockActionsPayload, SlackEvent, SlackPayload};
use super::sanitize::sanitize_value;
use super::PLATFORM;
use crate::message::{ActionValue, Attachment, Message, MessageType, Receiver, Sender};
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

/// Request-scoped inputs of the normalizer
#[derive(Debug, Clone)]
pub struct InboundMeta {
    /// Bus context resolved for the app/client pair
    pub context_id: Option<String>,
    /// This webhook's own attachment proxy endpoint
    pub attachment_endpoint: Url,
}

/// Normalizer outcome
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Forward to the message bus
    Message(Box<Message>),
    /// Reply immediately with the challenge; do not forward
    Challenge(String),
    /// Nothing to forward
    Ignored,
}

impl Inbound {
    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored)
    }
}

/// Normalize a decoded webhook payload
pub fn normalize(payload: &Value, meta: &InboundMeta) -> Inbound {
    let parsed = match SlackPayload::deserialize(payload) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!("Ignoring undecodable Slack payload: {}", e);
            return Inbound::Ignored;
        }
    };

    match parsed {
        SlackPayload::BlockActions(actions) => block_action(actions, payload, meta),
        SlackPayload::UrlVerification { challenge } => Inbound::Challenge(challenge),
        SlackPayload::EventCallback { event } if event.kind == "message" => {
            if event.is_bot_message() {
                return Inbound::Ignored;
            }
            message_event(event, payload, meta)
        }
        SlackPayload::EventCallback { event } => {
            tracing::debug!(kind = %event.kind, "Ignoring unhandled Slack event");
            Inbound::Ignored
        }
        SlackPayload::Other => Inbound::Ignored,
    }
}

fn block_action(payload: BlockActionsPayload, raw: &Value, meta: &InboundMeta) -> Inbound {
    let Some(found) = payload
        .actions
        .iter()
        .find(|a| a.action_id.as_deref().is_some_and(|id| !id.is_empty()))
    else {
        return Inbound::Ignored;
    };
    let action_id = found.action_id.as_deref().unwrap_or_default();

    let mut details = found
        .value
        .as_deref()
        .map(|v| ActionValue::decode(v).into_details())
        .unwrap_or_default();
    details.insert("users".to_string(), json!([payload.user.id.clone()]));
    if let Some(bot_id) = payload.message.and_then(|m| m.bot_id) {
        details.insert("bot".to_string(), Value::String(bot_id));
    }

    let channel_id = payload.channel.id;
    let message = Message {
        message_id: payload.trigger_id,
        timestamp: found.action_ts.as_deref().and_then(parse_ts),
        sender: Some(Sender {
            id: payload.user.id,
            platform: PLATFORM.to_string(),
            context_id: meta.context_id.clone(),
            conversation_id: Some(channel_id.clone()),
        }),
        receiver: Receiver {
            id: Some(channel_id),
            conversation_id: None,
        },
        text: action_id.split('-').next().map(str::to_string),
        details: Some(details),
        request: Some(raw.clone()),
        ..Message::new(MessageType::Action)
    };

    Inbound::Message(Box::new(message))
}

fn message_event(event: SlackEvent, raw: &Value, meta: &InboundMeta) -> Inbound {
    let attachments = if event.is_file_share() {
        event
            .files
            .iter()
            .filter_map(|file| {
                let download = file.url_private_download.as_deref()?;
                let mut proxied = meta.attachment_endpoint.clone();
                proxied.query_pairs_mut().append_pair("url", download);
                Some(Attachment::file(
                    proxied.to_string(),
                    file.mimetype.clone(),
                    file.name.clone(),
                ))
            })
            .collect()
    } else {
        Vec::new()
    };

    let text = match sanitize_value(event.text) {
        Value::String(text) => Some(text),
        _ => None,
    };

    let channel_id = event.channel.unwrap_or_default();
    let message = Message {
        message_id: event.client_msg_id,
        timestamp: event.ts.as_deref().and_then(parse_ts),
        sender: Some(Sender {
            id: event.user.unwrap_or_default(),
            platform: PLATFORM.to_string(),
            context_id: meta.context_id.clone(),
            conversation_id: Some(channel_id.clone()),
        }),
        receiver: Receiver {
            id: Some(channel_id),
            conversation_id: None,
        },
        text,
        attachments,
        request: Some(raw.clone()),
        ..Message::new(MessageType::Text)
    };

    Inbound::Message(Box::new(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slack::blocks::button;

    fn meta() -> InboundMeta {
        InboundMeta {
            context_id: Some("ctx-1".to_string()),
            attachment_endpoint: Url::parse("https://hooks.example.com/slack/A1/C1/attachment")
                .unwrap(),
        }
    }

    fn expect_message(inbound: Inbound) -> Message {
        match inbound {
            Inbound::Message(message) => *message,
            other => panic!("expected message, got {:?}", other),
        }
    }

    fn block_actions(actions: Value) -> Value {
        json!({
            "type": "block_actions",
            "trigger_id": "trig-1",
            "user": {"id": "U1"},
            "channel": {"id": "D1"},
            "message": {"bot_id": "B9"},
            "actions": actions
        })
    }

    #[test]
    fn test_block_action_message() {
        let payload = block_actions(json!([
            {"type": "button", "action_ts": "1600000001.000200"},
            {"action_id": "imBack-1", "action_ts": "1600000002.123456", "value": "{\"text\":\"No\"}"}
        ]));

        let msg = expect_message(normalize(&payload, &meta()));
        assert_eq!(msg.kind, MessageType::Action);
        assert_eq!(msg.message_id.as_deref(), Some("trig-1"));
        assert_eq!(msg.timestamp, Some(1_600_000_002));
        assert_eq!(msg.text.as_deref(), Some("imBack"));

        let sender = msg.sender.as_ref().unwrap();
        assert_eq!(sender.id, "U1");
        assert_eq!(sender.platform, "slack");
        assert_eq!(sender.context_id.as_deref(), Some("ctx-1"));
        assert_eq!(sender.conversation_id.as_deref(), Some("D1"));
        assert_eq!(msg.receiver.id.as_deref(), Some("D1"));

        assert_eq!(
            Value::Object(msg.details.unwrap()),
            json!({"text": "No", "users": ["U1"], "bot": "B9"})
        );
        assert_eq!(msg.request, Some(payload));
    }

    #[test]
    fn test_block_action_without_action_id_is_ignored() {
        let payload = block_actions(json!([{"action_id": ""}, {"value": "x"}]));
        assert!(normalize(&payload, &meta()).is_ignored());

        let payload = block_actions(json!([]));
        assert!(normalize(&payload, &meta()).is_ignored());
    }

    #[test]
    fn test_block_action_malformed_value() {
        let payload = block_actions(json!([
            {"action_id": "menu", "action_ts": "1600000000.1", "value": "{oops"}
        ]));
        let msg = expect_message(normalize(&payload, &meta()));
        let details = msg.details.unwrap();
        assert_eq!(details.get("value"), Some(&json!("{oops")));
        assert_eq!(msg.text.as_deref(), Some("menu"));
    }

    #[test]
    fn test_button_roundtrip_through_action() {
        let list: Vec<Attachment> = serde_json::from_value(json!([
            "Yes",
            {"contentType": "application/x.button", "title": "Book", "action": "book-now",
             "value": {"intent": "book", "slots": {"seats": 2}}}
        ]))
        .unwrap();

        for rendered in button(&list) {
            let payload = block_actions(json!([{
                "action_id": rendered.action_id,
                "action_ts": "1600000000.1",
                "value": rendered.value
            }]));
            let msg = expect_message(normalize(&payload, &meta()));
            let mut details = msg.details.unwrap();
            details.remove("users");
            details.remove("bot");
            assert_eq!(ActionValue::Structured(details), ActionValue::decode(&rendered.value));
        }
    }

    #[test]
    fn test_url_verification() {
        let payload = json!({"type": "url_verification", "challenge": "abc"});
        assert_eq!(
            normalize(&payload, &meta()),
            Inbound::Challenge("abc".to_string())
        );
    }

    #[test]
    fn test_message_event() {
        let payload = json!({
            "type": "event_callback",
            "event": {
                "type": "message",
                "client_msg_id": "cm-1",
                "ts": "1600000003.000100",
                "user": "U2",
                "channel": "C2",
                "text": "mail <mailto:a@x.io|a@x.io>"
            }
        });

        let msg = expect_message(normalize(&payload, &meta()));
        assert_eq!(msg.kind, MessageType::Text);
        assert_eq!(msg.message_id.as_deref(), Some("cm-1"));
        assert_eq!(msg.timestamp, Some(1_600_000_003));
        assert_eq!(msg.text.as_deref(), Some("mail a@x.io"));
        assert_eq!(msg.sender.as_ref().unwrap().id, "U2");
        assert_eq!(msg.receiver.id.as_deref(), Some("C2"));
        assert!(msg.attachments.is_empty());
    }

    #[test]
    fn test_bot_message_is_ignored() {
        let payload = json!({
            "type": "event_callback",
            "event": {"type": "message", "subtype": "bot_message", "user": "U2",
                      "channel": "C2", "text": "hi", "ts": "1.0"}
        });
        assert!(normalize(&payload, &meta()).is_ignored());

        let payload = json!({
            "type": "event_callback",
            "event": {"type": "message", "bot_id": "B1", "channel": "C2", "text": "hi"}
        });
        assert!(normalize(&payload, &meta()).is_ignored());
    }

    #[test]
    fn test_file_share_is_proxied() {
        let payload = json!({
            "type": "event_callback",
            "event": {
                "type": "message",
                "subtype": "file_share",
                "user": "U2",
                "channel": "C2",
                "ts": "1600000004.0",
                "text": "",
                "files": [
                    {"url_private_download": "https://files.slack.com/a b.png?x=1",
                     "mimetype": "image/png", "name": "a b.png"},
                    {"mimetype": "text/plain", "name": "no-download.txt"}
                ]
            }
        });

        let msg = expect_message(normalize(&payload, &meta()));
        assert_eq!(msg.attachments.len(), 1);
        let Attachment::Object(file) = &msg.attachments[0] else {
            panic!("expected object attachment");
        };
        assert_eq!(file.content_type.as_deref(), Some("image/png"));
        assert_eq!(file.filename.as_deref(), Some("a b.png"));

        let url = Url::parse(file.url.as_deref().unwrap()).unwrap();
        assert_eq!(url.path(), "/slack/A1/C1/attachment");
        let original: Vec<_> = url.query_pairs().filter(|(k, _)| k == "url").collect();
        assert_eq!(original.len(), 1);
        assert_eq!(original[0].1, "https://files.slack.com/a b.png?x=1");
    }

    #[test]
    fn test_other_events_ignored() {
        let payload = json!({"type": "event_callback", "event": {"type": "reaction_added"}});
        assert!(normalize(&payload, &meta()).is_ignored());

        let payload = json!({"type": "view_closed"});
        assert!(normalize(&payload, &meta()).is_ignored());

        assert!(normalize(&json!("not an object"), &meta()).is_ignored());
    }
}
