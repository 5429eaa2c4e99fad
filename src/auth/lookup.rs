//! Auth context lookup
//!
//! The webhook identifies itself by `{platform, app_id, client_id}`; a
//! lookup exchanges that key for the bus context id and the JSON auth
//! record holding the scoped tokens.

use super::token::{resolve_token, TokenScope};
use crate::config::AuthConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Identity of an inbound webhook
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthKey {
    pub platform: String,
    pub app_id: String,
    pub client_id: String,
}

impl AuthKey {
    pub fn new(
        platform: impl Into<String>,
        app_id: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            platform: platform.into(),
            app_id: app_id.into(),
            client_id: client_id.into(),
        }
    }
}

/// Resolved auth context of an app/client pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthContext {
    #[serde(default)]
    pub context_id: Option<String>,
    /// JSON-encoded token record keyed by scope
    pub access_token: String,
}

impl AuthContext {
    /// Token for `scope`; resolved per call, never cached
    pub fn token(&self, scope: TokenScope) -> Result<String> {
        resolve_token(&self.access_token, scope)
    }
}

/// Source of auth contexts
#[async_trait]
pub trait AuthLookup: Send + Sync {
    async fn fetch(&self, key: &AuthKey) -> Result<AuthContext>;
}

/// In-process lookup over a fixed set of records
#[derive(Debug, Clone, Default)]
pub struct StaticAuthLookup {
    contexts: HashMap<AuthKey, AuthContext>,
}

impl StaticAuthLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `[[auth.clients]]`, reading tokens from the named env vars.
    ///
    /// A missing env var drops that scope from the record; requests that
    /// need it then fail at token resolution.
    pub fn from_config(config: &AuthConfig, platform: &str) -> Self {
        let mut lookup = Self::new();
        for client in &config.clients {
            let mut record = Map::new();
            for (scope, credential_ref) in [
                (TokenScope::Bot, client.bot_token_ref.as_deref()),
                (TokenScope::App, client.app_token_ref.as_deref()),
            ] {
                let Some(credential_ref) = credential_ref else {
                    continue;
                };
                match resolve_credential(credential_ref) {
                    Ok(token) => {
                        record.insert(scope.as_str().to_string(), Value::String(token));
                    }
                    Err(e) => tracing::warn!(
                        app_id = %client.app_id,
                        client_id = %client.client_id,
                        "{}",
                        e
                    ),
                }
            }

            lookup.insert(
                AuthKey::new(platform, &client.app_id, &client.client_id),
                AuthContext {
                    context_id: client.context_id.clone(),
                    access_token: Value::Object(record).to_string(),
                },
            );
        }
        lookup
    }

    pub fn insert(&mut self, key: AuthKey, context: AuthContext) {
        self.contexts.insert(key, context);
    }

    pub fn with(mut self, key: AuthKey, context: AuthContext) -> Self {
        self.insert(key, context);
        self
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

#[async_trait]
impl AuthLookup for StaticAuthLookup {
    async fn fetch(&self, key: &AuthKey) -> Result<AuthContext> {
        self.contexts.get(key).cloned().ok_or_else(|| {
            Error::Auth(format!(
                "no auth record for {}/{}/{}",
                key.platform, key.app_id, key.client_id
            ))
        })
    }
}

/// Resolve credential from environment variable
fn resolve_credential(credential_ref: &str) -> Result<String> {
    std::env::var(credential_ref).map_err(|_| {
        Error::Config(format!(
            "Failed to resolve Slack credential from env var: {}",
            credential_ref
        ))
    })
}
