//! Slack Web API client

use crate::auth::AuthContext;
use crate::error::{Error, Result};
use crate::hooks::{ConversationCreate, SlackHooks, WireRequest};
use crate::message::Message;
use serde_json::Value;

/// Sends rendered hook requests to the Slack Web API
#[derive(Debug, Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    api_base: String,
}

impl SlackClient {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_base)
    }

    pub fn with_client(http: reqwest::Client, api_base: impl Into<String>) -> Self {
        let mut api_base = api_base.into();
        if !api_base.ends_with('/') {
            api_base.push('/');
        }
        Self { http, api_base }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// POST a wire request and return the decoded response body.
    ///
    /// Slack reports method failures as `{"ok": false, "error": ...}` with a
    /// 200 status; those surface as [`Error::Platform`].
    pub async fn send(&self, req: &WireRequest) -> Result<Value> {
        let url = format!("{}{}", self.api_base, req.url);
        let mut builder = self.http.post(&url).json(&req.body);
        for (name, value) in &req.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::Platform(format!("{} returned {} with an undecodable body: {}", req.url, status, e)))?;

        if body.get("ok").and_then(Value::as_bool) == Some(false) {
            let error = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error");
            return Err(Error::Platform(format!("{} failed: {}", req.url, error)));
        }

        tracing::debug!(method = %req.url, %status, "Slack API call succeeded");
        Ok(body)
    }

    /// Relay a bus message into Slack. `Ok(None)` when there is nothing to send.
    pub async fn post_message(
        &self,
        hooks: &SlackHooks,
        msg: &Message,
        auth: &AuthContext,
    ) -> Result<Option<Value>> {
        let Some(req) = hooks.message_send_request_send(msg, auth)? else {
            return Ok(None);
        };
        let response = self.send(&req).await?;
        Ok(hooks.message_send_response_receive(&response))
    }

    /// Reply to an inbound message as the bot user
    pub async fn reply(
        &self,
        hooks: &SlackHooks,
        msg: &Message,
        auth: &AuthContext,
    ) -> Result<Option<Value>> {
        let Some(req) = hooks.message_response_send(Some(msg), auth)? else {
            return Ok(None);
        };
        self.send(&req).await.map(Some)
    }

    /// Create a conversation and return Slack's `channel` object
    pub async fn create_conversation(
        &self,
        hooks: &SlackHooks,
        req: &ConversationCreate,
        auth: &AuthContext,
    ) -> Result<Option<Value>> {
        let wire = hooks.conversation_create_request_send(req, auth)?;
        let response = self.send(&wire).await?;
        Ok(hooks.conversation_create_response_receive(&response))
    }
}
