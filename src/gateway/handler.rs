//! Webhook HTTP handlers
//!
//! | Route                                       | Description                 |
//! |---------------------------------------------|-----------------------------|
//! | `GET  /health`                              | Health probe                |
//! | `POST {prefix}/:app_id/:client_id`          | Events API callbacks (JSON) |
//! | `POST {prefix}/:app_id/:client_id/:action`  | Interactive callbacks (form)|
//! | `GET  {prefix}/:app_id/:client_id/attachment` | File download proxy       |

use super::proxy;
use super::server::Gateway;
use crate::slack::{AuthOutcome, Inbound, InboundMeta};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use url::Url;

/// Build the gateway router
pub fn router(gateway: Arc<Gateway>) -> Router {
    let prefix = gateway.config().slack.path_prefix.trim_end_matches('/').to_string();
    let cors = build_cors(&gateway.config().server.cors_origins);

    Router::new()
        .route("/health", get(health_check))
        .route(&format!("{}/:app_id/:client_id", prefix), post(webhook))
        .route(
            &format!("{}/:app_id/:client_id/attachment", prefix),
            get(proxy::attachment),
        )
        .route(
            &format!("{}/:app_id/:client_id/:action", prefix),
            post(webhook_action),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(gateway)
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Events API callback
async fn webhook(
    State(gateway): State<Arc<Gateway>>,
    Path((app_id, client_id)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle_webhook(&gateway, &app_id, &client_id, None, &headers, &body).await
}

/// Interactive component callback
async fn webhook_action(
    State(gateway): State<Arc<Gateway>>,
    Path((app_id, client_id, action)): Path<(String, String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle_webhook(&gateway, &app_id, &client_id, Some(&action), &headers, &body).await
}

async fn handle_webhook(
    gateway: &Gateway,
    app_id: &str,
    client_id: &str,
    action: Option<&str>,
    headers: &HeaderMap,
    body: &[u8],
) -> Response {
    if let Some(signature) = gateway.signature() {
        let outcome = signature.verify_request(
            &lowercase_headers(headers),
            body,
            chrono::Utc::now().timestamp(),
        );
        if let AuthOutcome::Rejected { reason } = outcome {
            tracing::warn!(%app_id, %client_id, %reason, "Rejected unsigned Slack webhook");
            return error_response(StatusCode::UNAUTHORIZED, "INVALID_SIGNATURE", &reason);
        }
    }

    let payload = match decode_payload(headers, body) {
        Ok(payload) => payload,
        Err(message) => {
            return error_response(StatusCode::BAD_REQUEST, "MALFORMED_PAYLOAD", &message);
        }
    };

    let hooks = gateway.hooks();
    let key = hooks.identity_request_receive(app_id, client_id);
    let auth = match gateway.auth_context(&key).await {
        Ok(auth) => auth,
        Err(e) => {
            tracing::warn!(%app_id, %client_id, "Slack webhook identity rejected: {}", e);
            return error_response(StatusCode::UNAUTHORIZED, "AUTH_FAILED", &e.to_string());
        }
    };

    let attachment_endpoint = match attachment_endpoint(gateway, headers, app_id, client_id) {
        Ok(url) => url,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, "BAD_REQUEST", &e.to_string());
        }
    };
    let meta = InboundMeta {
        context_id: auth.context_id,
        attachment_endpoint,
    };

    let inbound = hooks.message_request_receive(&payload, &meta);
    if let Some(reply) = hooks.server_response_send(&inbound) {
        return (StatusCode::OK, Json(reply)).into_response();
    }

    match inbound {
        Inbound::Message(message) => {
            tracing::debug!(
                %app_id,
                %client_id,
                action = action.unwrap_or_default(),
                kind = %message.kind,
                "Forwarding Slack message"
            );
            // Never wait on a full bus: Slack retries slow webhooks.
            match gateway.bus().try_send(*message) {
                Ok(()) => (StatusCode::OK, Json(json!({}))).into_response(),
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(%app_id, %client_id, "Inbound message bus is full");
                    error_response(
                        StatusCode::SERVICE_UNAVAILABLE,
                        "BUS_FULL",
                        "message bus is full",
                    )
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::error!(%app_id, %client_id, "Inbound message bus closed");
                    error_response(
                        StatusCode::SERVICE_UNAVAILABLE,
                        "BUS_CLOSED",
                        "message bus is not accepting messages",
                    )
                }
            }
        }
        Inbound::Challenge(_) | Inbound::Ignored => (StatusCode::OK, Json(json!({}))).into_response(),
    }
}

/// Decode a webhook body: interactive callbacks arrive form-encoded with
/// the JSON in a `payload` field, Events API callbacks as plain JSON.
fn decode_payload(headers: &HeaderMap, body: &[u8]) -> std::result::Result<Value, String> {
    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

    if is_form {
        let payload = url::form_urlencoded::parse(body)
            .find(|(key, _)| key == "payload")
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| "form body has no payload field".to_string())?;
        serde_json::from_str(&payload).map_err(|e| format!("invalid payload JSON: {}", e))
    } else {
        serde_json::from_slice(body).map_err(|e| format!("invalid JSON body: {}", e))
    }
}

/// `{origin}{prefix}/{app_id}/{client_id}/attachment` for this webhook.
fn attachment_endpoint(
    gateway: &Gateway,
    headers: &HeaderMap,
    app_id: &str,
    client_id: &str,
) -> crate::error::Result<Url> {
    let config = gateway.config();
    let origin = match &config.server.public_url {
        Some(public_url) => public_url.trim_end_matches('/').to_string(),
        None => {
            let scheme = header_str(headers, "x-forwarded-proto").unwrap_or("http");
            let host = header_str(headers, header::HOST.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}:{}", config.server.host, config.server.port));
            format!("{}://{}", scheme, host)
        }
    };

    let mut url = Url::parse(&origin)?;
    let prefix = config.slack.path_prefix.trim_matches('/');
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .extend(prefix.split('/').filter(|s| !s.is_empty()))
        .extend([app_id, client_id, "attachment"]);
    Ok(url)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn lowercase_headers(headers: &HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect()
}

pub(super) fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({"error": {"code": code, "message": message}})),
    )
        .into_response()
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let parsed: Vec<_> = origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthContext, AuthKey, StaticAuthLookup};
    use crate::config::SlackPortConfig;
    use crate::gateway::GatewayBuilder;
    use crate::message::{Attachment, Message, MessageType};
    use crate::slack::SlackSignature;
    use axum::body::Body;
    use axum::http::Request;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    fn lookup() -> StaticAuthLookup {
        StaticAuthLookup::new().with(
            AuthKey::new("slack", "A1", "C1"),
            AuthContext {
                context_id: Some("ctx-1".to_string()),
                access_token: r#"{"bot":"xoxb-1","app":"xoxa-2"}"#.to_string(),
            },
        )
    }

    async fn app_with(builder: GatewayBuilder) -> (Router, mpsc::Receiver<Message>) {
        let gateway = Arc::new(builder.auth_lookup(Arc::new(lookup())).build().unwrap());
        let bus = gateway.take_bus().await.unwrap();
        (router(gateway), bus)
    }

    async fn app() -> (Router, mpsc::Receiver<Message>) {
        app_with(GatewayBuilder::new()).await
    }

    fn json_post(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("host", "hooks.example.com")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let (app, _bus) = app().await;
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_url_verification_replies_immediately() {
        let (app, mut bus) = app().await;
        let response = app
            .oneshot(json_post(
                "/slack/A1/C1",
                &json!({"type": "url_verification", "challenge": "abc"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"challenge": "abc"}));
        assert!(bus.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_message_event_forwarded() {
        let (app, mut bus) = app().await;
        let payload = json!({
            "type": "event_callback",
            "event": {
                "type": "message",
                "subtype": "file_share",
                "client_msg_id": "cm-1",
                "ts": "1600000000.000100",
                "user": "U1",
                "channel": "D1",
                "text": "see <mailto:a@x.io|a@x.io>",
                "files": [{"url_private_download": "https://files.slack.com/f.png",
                           "mimetype": "image/png", "name": "f.png"}]
            }
        });

        let response = app.oneshot(json_post("/slack/A1/C1", &payload)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({}));

        let message = bus.try_recv().unwrap();
        assert_eq!(message.kind, MessageType::Text);
        assert_eq!(message.text.as_deref(), Some("see a@x.io"));
        assert_eq!(
            message.sender.as_ref().and_then(|s| s.context_id.as_deref()),
            Some("ctx-1")
        );

        let Attachment::Object(file) = &message.attachments[0] else {
            panic!("expected object attachment");
        };
        assert_eq!(
            file.url.as_deref(),
            Some("http://hooks.example.com/slack/A1/C1/attachment?url=https%3A%2F%2Ffiles.slack.com%2Ff.png")
        );
    }

    #[tokio::test]
    async fn test_public_url_used_for_attachments() {
        let mut config = SlackPortConfig::default();
        config.server.public_url = Some("https://public.example.com/base/".to_string());
        let (app, mut bus) = app_with(GatewayBuilder::new().config(config)).await;
        let payload = json!({
            "type": "event_callback",
            "event": {"type": "message", "subtype": "file_share", "user": "U1", "channel": "D1",
                      "ts": "1.0", "text": "",
                      "files": [{"url_private_download": "https://files.slack.com/f", "name": "f"}]}
        });

        app.oneshot(json_post("/slack/A1/C1", &payload)).await.unwrap();
        let message = bus.try_recv().unwrap();
        let Attachment::Object(file) = &message.attachments[0] else {
            panic!("expected object attachment");
        };
        assert!(file
            .url
            .as_deref()
            .unwrap()
            .starts_with("https://public.example.com/base/slack/A1/C1/attachment?url="));
    }

    #[tokio::test]
    async fn test_form_encoded_action() {
        let (app, mut bus) = app().await;
        let payload = json!({
            "type": "block_actions",
            "trigger_id": "t-1",
            "user": {"id": "U1"},
            "channel": {"id": "D1"},
            "message": {"bot_id": "B1"},
            "actions": [{"action_id": "imBack-0", "action_ts": "1600000000.5",
                         "value": "{\"text\":\"Yes\"}"}]
        });
        let form: String = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("payload", &payload.to_string())
            .finish();

        let request = Request::builder()
            .method("POST")
            .uri("/slack/A1/C1/interactive")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let message = bus.try_recv().unwrap();
        assert_eq!(message.kind, MessageType::Action);
        assert_eq!(message.text.as_deref(), Some("imBack"));
        assert_eq!(message.details.as_ref().unwrap()["text"], "Yes");
    }

    #[tokio::test]
    async fn test_bot_message_not_forwarded() {
        let (app, mut bus) = app().await;
        let payload = json!({
            "type": "event_callback",
            "event": {"type": "message", "subtype": "bot_message", "channel": "D1", "text": "x"}
        });
        let response = app.oneshot(json_post("/slack/A1/C1", &payload)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(bus.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_client_rejected() {
        let (app, _bus) = app().await;
        let response = app
            .oneshot(json_post("/slack/A1/nope", &json!({"type": "url_verification"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"]["code"], "AUTH_FAILED");
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let (app, _bus) = app().await;
        let request = Request::builder()
            .method("POST")
            .uri("/slack/A1/C1")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let request = Request::builder()
            .method("POST")
            .uri("/slack/A1/C1/interactive")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from("other=1"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_signature_enforced() {
        let (app, _bus) = app_with(GatewayBuilder::new().signing_secret("shh")).await;
        let body = json!({"type": "url_verification", "challenge": "abc"}).to_string();

        let response = app
            .clone()
            .oneshot(json_post("/slack/A1/C1", &serde_json::from_str(&body).unwrap()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"]["code"], "INVALID_SIGNATURE");

        let ts = chrono::Utc::now().timestamp().to_string();
        let signed = Request::builder()
            .method("POST")
            .uri("/slack/A1/C1")
            .header("content-type", "application/json")
            .header("x-slack-request-timestamp", &ts)
            .header("x-slack-signature", SlackSignature::new("shh").sign(&ts, body.as_bytes()))
            .body(Body::from(body))
            .unwrap();
        let response = app.oneshot(signed).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"challenge": "abc"}));
    }

    #[tokio::test]
    async fn test_full_bus_answers_without_waiting() {
        let mut config = SlackPortConfig::default();
        config.slack.bus_capacity = 1;
        let gateway = GatewayBuilder::new()
            .config(config)
            .auth_lookup(Arc::new(lookup()))
            .build()
            .unwrap();
        // The bus is never taken, so nothing drains it.
        let app = router(Arc::new(gateway));
        let payload = json!({
            "type": "event_callback",
            "event": {"type": "message", "user": "U1", "channel": "D1", "ts": "1.0", "text": "hi"}
        });

        let first = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            app.clone().oneshot(json_post("/slack/A1/C1", &payload)),
        )
        .await
        .expect("first webhook answered")
        .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            app.oneshot(json_post("/slack/A1/C1", &payload)),
        )
        .await
        .expect("second webhook answered")
        .unwrap();
        assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(second).await["error"]["code"], "BUS_FULL");
    }

    #[tokio::test]
    async fn test_custom_prefix() {
        let mut config = SlackPortConfig::default();
        config.slack.path_prefix = "/hooks/slack/".to_string();
        let (app, _bus) = app_with(GatewayBuilder::new().config(config)).await;

        let response = app
            .oneshot(json_post(
                "/hooks/slack/A1/C1",
                &json!({"type": "url_verification", "challenge": "abc"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
