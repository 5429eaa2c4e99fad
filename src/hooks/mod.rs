//! Hook adapter
//!
//! Binds the Slack translation layer onto the named bus hooks. Inbound
//! hooks are prefixed with the configured `hook`, outbound send hooks with
//! the configured `namespace`.

use crate::auth::{bearer, AuthContext, AuthKey, TokenScope};
use crate::config::SlackConfig;
use crate::error::Result;
use crate::message::Message;
use crate::slack::{self, Inbound, InboundMeta};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;

/// `chat.postMessage` Web API method
pub const POST_MESSAGE: &str = "chat.postMessage";
/// `conversations.create` Web API method
pub const CREATE_CONVERSATION: &str = "conversations.create";

/// Hook points served by the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    IdentityRequestReceive,
    MessageRequestReceive,
    ServerResponseSend,
    MessageResponseSend,
    MessageSendRequestSend,
    MessageSendResponseReceive,
    ConversationCreateRequestSend,
    ConversationCreateResponseReceive,
}

impl Hook {
    pub const ALL: [Hook; 8] = [
        Hook::IdentityRequestReceive,
        Hook::MessageRequestReceive,
        Hook::ServerResponseSend,
        Hook::MessageResponseSend,
        Hook::MessageSendRequestSend,
        Hook::MessageSendResponseReceive,
        Hook::ConversationCreateRequestSend,
        Hook::ConversationCreateResponseReceive,
    ];

    /// Name without prefix
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::IdentityRequestReceive => "identity.request.receive",
            Self::MessageRequestReceive => "message.request.receive",
            Self::ServerResponseSend => "server.response.send",
            Self::MessageResponseSend => "message.response.send",
            Self::MessageSendRequestSend => "message.send.request.send",
            Self::MessageSendResponseReceive => "message.send.response.receive",
            Self::ConversationCreateRequestSend => "conversation.create.request.send",
            Self::ConversationCreateResponseReceive => "conversation.create.response.receive",
        }
    }

    /// Served under the webhook `hook` prefix rather than the `namespace`
    pub fn is_inbound(&self) -> bool {
        matches!(
            self,
            Self::IdentityRequestReceive
                | Self::MessageRequestReceive
                | Self::ServerResponseSend
                | Self::MessageResponseSend
        )
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// An outbound Slack Web API call, ready for the HTTP client
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireRequest {
    /// Web API method, relative to the API base URL
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

impl WireRequest {
    fn authorized(url: &str, token: &str, body: Value) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Authorization".to_string(), bearer(token));
        Self {
            url: url.to_string(),
            headers,
            body,
        }
    }
}

/// Bus request to open a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationCreate {
    pub name: String,
    #[serde(default)]
    pub users: Vec<String>,
}

/// Slack hook handlers
#[derive(Debug, Clone)]
pub struct SlackHooks {
    hook: String,
    namespace: String,
    bot_platforms: Vec<String>,
}

impl SlackHooks {
    pub fn new(config: &SlackConfig) -> Self {
        Self {
            hook: config.hook.clone(),
            namespace: config.namespace.clone(),
            bot_platforms: config.bot_platforms.clone(),
        }
    }

    /// Fully prefixed hook name
    pub fn name(&self, hook: Hook) -> String {
        let prefix = if hook.is_inbound() {
            &self.hook
        } else {
            &self.namespace
        };
        format!("{}.{}", prefix, hook.suffix())
    }

    /// All fully prefixed hook names
    pub fn names(&self) -> Vec<String> {
        Hook::ALL.iter().map(|h| self.name(*h)).collect()
    }

    /// `{hook}.identity.request.receive`
    pub fn identity_request_receive(&self, app_id: &str, client_id: &str) -> AuthKey {
        AuthKey::new(slack::PLATFORM, app_id, client_id)
    }

    /// `{hook}.message.request.receive`
    pub fn message_request_receive(&self, payload: &Value, meta: &InboundMeta) -> Inbound {
        slack::normalize(payload, meta)
    }

    /// `{hook}.server.response.send`
    pub fn server_response_send(&self, inbound: &Inbound) -> Option<Value> {
        match inbound {
            Inbound::Challenge(challenge) => Some(json!({ "challenge": challenge })),
            _ => None,
        }
    }

    /// `{hook}.message.response.send`: reply as the bot user
    pub fn message_response_send(
        &self,
        msg: Option<&Message>,
        auth: &AuthContext,
    ) -> Result<Option<WireRequest>> {
        let Some(msg) = msg else {
            return Ok(None);
        };
        let token = auth.token(TokenScope::Bot)?;
        let Some(body) = slack::body(msg) else {
            return Ok(None);
        };

        let body = body.with_field("as_user", Value::Bool(true));
        Ok(Some(WireRequest::authorized(
            POST_MESSAGE,
            &token,
            serde_json::to_value(body)?,
        )))
    }

    /// `{namespace}.message.send.request.send`: relay a message from
    /// another platform, labelled with its origin
    pub fn message_send_request_send(
        &self,
        msg: &Message,
        auth: &AuthContext,
    ) -> Result<Option<WireRequest>> {
        let token = auth.token(TokenScope::App)?;
        let Some(body) = slack::body(msg) else {
            return Ok(None);
        };

        let platform = msg
            .sender
            .as_ref()
            .map(|s| s.platform.as_str())
            .unwrap_or("unknown");
        let (username, icon) = if self.is_bot_platform(platform) {
            ("bot".to_string(), ":computer:")
        } else {
            (format!("{} user", platform), ":adult:")
        };

        let body = body
            .with_field("username", Value::String(username))
            .with_field("icon_emoji", Value::String(icon.to_string()));
        Ok(Some(WireRequest::authorized(
            POST_MESSAGE,
            &token,
            serde_json::to_value(body)?,
        )))
    }

    /// `{namespace}.message.send.response.receive`
    pub fn message_send_response_receive(&self, response: &Value) -> Option<Value> {
        tracing::debug!(response = %response, "Slack message send response");
        None
    }

    /// `{namespace}.conversation.create.request.send`
    pub fn conversation_create_request_send(
        &self,
        req: &ConversationCreate,
        auth: &AuthContext,
    ) -> Result<WireRequest> {
        let token = auth.token(TokenScope::App)?;
        Ok(WireRequest::authorized(
            CREATE_CONVERSATION,
            &token,
            json!({
                "name": req.name,
                "user_ids": req.users.join(","),
            }),
        ))
    }

    /// `{namespace}.conversation.create.response.receive`: the created channel
    pub fn conversation_create_response_receive(&self, response: &Value) -> Option<Value> {
        response.get("channel").cloned()
    }

    fn is_bot_platform(&self, platform: &str) -> bool {
        self.bot_platforms.iter().any(|p| p == platform)
    }
}
