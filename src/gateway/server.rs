//! Gateway server implementation

use super::handler;
use crate::auth::{AuthContext, AuthKey, AuthLookup, StaticAuthLookup};
use crate::client::SlackClient;
use crate::config::SlackPortConfig;
use crate::error::{Error, Result};
use crate::hooks::SlackHooks;
use crate::message::Message;
use crate::slack::{SlackSignature, PLATFORM};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;

/// Gateway server state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayState {
    /// Not started
    Stopped,
    /// Starting up
    Starting,
    /// Running
    Running,
    /// Shutting down
    ShuttingDown,
}

/// SlackPort webhook gateway
pub struct Gateway {
    config: SlackPortConfig,
    state: Arc<RwLock<GatewayState>>,
    hooks: SlackHooks,
    auth: Arc<dyn AuthLookup>,
    signature: Option<SlackSignature>,
    http: reqwest::Client,
    client: SlackClient,
    bus_tx: mpsc::Sender<Message>,
    bus_rx: Mutex<Option<mpsc::Receiver<Message>>>,
}

impl Gateway {
    /// Create a new gateway with the given configuration
    pub fn new(config: SlackPortConfig, auth: Arc<dyn AuthLookup>) -> Result<Self> {
        let signature = match &config.slack.signing_secret_ref {
            Some(secret_ref) => Some(SlackSignature::new(resolve_secret(secret_ref)?)),
            None => None,
        };
        Ok(Self::with_signature(config, auth, signature))
    }

    fn with_signature(
        config: SlackPortConfig,
        auth: Arc<dyn AuthLookup>,
        signature: Option<SlackSignature>,
    ) -> Self {
        let (bus_tx, bus_rx) = mpsc::channel(config.slack.bus_capacity.max(1));
        let http = reqwest::Client::new();
        let client = SlackClient::with_client(http.clone(), config.slack.api_base.clone());

        Self {
            hooks: SlackHooks::new(&config.slack),
            config,
            state: Arc::new(RwLock::new(GatewayState::Stopped)),
            auth,
            signature,
            http,
            client,
            bus_tx,
            bus_rx: Mutex::new(Some(bus_rx)),
        }
    }

    /// Get current state
    pub async fn state(&self) -> GatewayState {
        *self.state.read().await
    }

    /// Bind the listener, register all routes and start serving.
    pub async fn start(self: &Arc<Self>) -> Result<ServerHandle> {
        let mut state = self.state.write().await;
        if *state != GatewayState::Stopped {
            return Err(Error::Gateway("Gateway already running".to_string()));
        }
        *state = GatewayState::Starting;
        drop(state);

        let bind = (self.config.server.host.as_str(), self.config.server.port);
        let listener = match tokio::net::TcpListener::bind(bind).await {
            Ok(listener) => listener,
            Err(e) => {
                *self.state.write().await = GatewayState::Stopped;
                return Err(Error::Gateway(format!(
                    "Failed to bind {}:{}: {}",
                    bind.0, bind.1, e
                )));
            }
        };
        let local_addr = listener.local_addr()?;

        let router = handler::router(self.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        *self.state.write().await = GatewayState::Running;
        tracing::info!(
            %local_addr,
            prefix = %self.config.slack.path_prefix,
            signed = self.signature.is_some(),
            "SlackPort gateway started"
        );

        Ok(ServerHandle {
            local_addr,
            shutdown_tx,
            task,
            state: self.state.clone(),
        })
    }

    /// Take the receiving end of the inbound message bus.
    ///
    /// Only the first call returns `Some`.
    pub async fn take_bus(&self) -> Option<mpsc::Receiver<Message>> {
        self.bus_rx.lock().await.take()
    }

    /// Look up the auth context of an app/client pair
    pub async fn auth_context(&self, key: &AuthKey) -> Result<AuthContext> {
        self.auth.fetch(key).await
    }

    /// Relay a bus message into Slack on behalf of `app_id`/`client_id`
    pub async fn send(&self, app_id: &str, client_id: &str, msg: &Message) -> Result<Option<Value>> {
        let key = self.hooks.identity_request_receive(app_id, client_id);
        let auth = self.auth.fetch(&key).await?;
        self.client.post_message(&self.hooks, msg, &auth).await
    }

    /// Get configuration
    pub fn config(&self) -> &SlackPortConfig {
        &self.config
    }

    pub fn hooks(&self) -> &SlackHooks {
        &self.hooks
    }

    pub fn client(&self) -> &SlackClient {
        &self.client
    }

    pub(crate) fn signature(&self) -> Option<&SlackSignature> {
        self.signature.as_ref()
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn bus(&self) -> &mpsc::Sender<Message> {
        &self.bus_tx
    }
}

/// Handle to a running gateway listener
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
    state: Arc<RwLock<GatewayState>>,
}

impl ServerHandle {
    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for in-flight requests
    pub async fn shutdown(self) -> Result<()> {
        *self.state.write().await = GatewayState::ShuttingDown;
        tracing::info!("Stopping SlackPort gateway");

        let _ = self.shutdown_tx.send(());
        let served = self
            .task
            .await
            .map_err(|e| Error::Gateway(format!("Server task failed: {}", e)));

        *self.state.write().await = GatewayState::Stopped;
        tracing::info!("SlackPort gateway stopped");
        served??;
        Ok(())
    }
}

/// Builder for Gateway
pub struct GatewayBuilder {
    config: SlackPortConfig,
    auth: Option<Arc<dyn AuthLookup>>,
    signing_secret: Option<String>,
}

impl GatewayBuilder {
    /// Create a new builder with default config
    pub fn new() -> Self {
        Self {
            config: SlackPortConfig::default(),
            auth: None,
            signing_secret: None,
        }
    }

    /// Set the configuration
    pub fn config(mut self, config: SlackPortConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the gateway host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    /// Set the gateway port
    pub fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    /// Use a custom auth lookup instead of `[[auth.clients]]`
    pub fn auth_lookup(mut self, auth: Arc<dyn AuthLookup>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Verify webhooks with this secret instead of `signing_secret_ref`
    pub fn signing_secret(mut self, secret: impl Into<String>) -> Self {
        self.signing_secret = Some(secret.into());
        self
    }

    /// Build the gateway
    pub fn build(self) -> Result<Gateway> {
        let auth = match self.auth {
            Some(auth) => auth,
            None => Arc::new(StaticAuthLookup::from_config(&self.config.auth, PLATFORM)),
        };
        match self.signing_secret {
            Some(secret) => Ok(Gateway::with_signature(
                self.config,
                auth,
                Some(SlackSignature::new(secret)),
            )),
            None => Gateway::new(self.config, auth),
        }
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the signing secret from its environment variable
fn resolve_secret(secret_ref: &str) -> Result<String> {
    std::env::var(secret_ref).map_err(|_| {
        Error::Config(format!(
            "Failed to resolve Slack signing secret from env var: {}",
            secret_ref
        ))
    })
}
