//! SlackPort configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main SlackPort configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlackPortConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Slack adapter configuration
    #[serde(default)]
    pub slack: SlackConfig,

    /// Static auth records
    #[serde(default)]
    pub auth: AuthConfig,
}

impl SlackPortConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Render as pretty TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Externally reachable base URL (e.g. `https://hooks.example.com`).
    /// When unset, attachment links are built from the request `Host` header.
    #[serde(default)]
    pub public_url: Option<String>,

    /// Allowed CORS origins (empty = any)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8085,
            public_url: None,
            cors_origins: Vec::new(),
        }
    }
}

/// Slack adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Route prefix; webhooks arrive at `{path_prefix}/{appId}/{clientId}`
    pub path_prefix: String,

    /// Hook prefix for inbound webhook hooks
    pub hook: String,

    /// Namespace prefix for outbound send hooks
    pub namespace: String,

    /// Slack Web API base URL
    pub api_base: String,

    /// Env var holding the signing secret; verification is off when unset
    #[serde(default)]
    pub signing_secret_ref: Option<String>,

    /// Sender platforms whose messages are posted as the bot persona
    pub bot_platforms: Vec<String>,

    /// Capacity of the inbound message bus channel
    pub bus_capacity: usize,

    /// Hosts the attachment proxy may fetch from with the bot token
    /// (empty = any)
    #[serde(default = "default_attachment_hosts")]
    pub attachment_hosts: Vec<String>,
}

fn default_attachment_hosts() -> Vec<String> {
    vec!["files.slack.com".to_string()]
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            path_prefix: "/slack".to_string(),
            hook: "slackIn".to_string(),
            namespace: "slack".to_string(),
            api_base: "https://slack.com/api/".to_string(),
            signing_secret_ref: None,
            bot_platforms: vec!["dialogflow".to_string()],
            bus_capacity: 1000,
            attachment_hosts: default_attachment_hosts(),
        }
    }
}

/// Static auth records served by the built-in auth lookup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub clients: Vec<AuthClientConfig>,
}

/// Tokens of one app/client pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthClientConfig {
    pub app_id: String,
    pub client_id: String,

    /// Bus context id stamped on inbound senders
    #[serde(default)]
    pub context_id: Option<String>,

    /// Env var holding the `bot` scope token (xoxb-...)
    #[serde(default)]
    pub bot_token_ref: Option<String>,

    /// Env var holding the `app` scope token
    #[serde(default)]
    pub app_token_ref: Option<String>,
}
