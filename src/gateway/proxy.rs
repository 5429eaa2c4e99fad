//! Attachment proxy
//!
//! Slack file downloads need the bot token, which bus consumers never see.
//! Inbound file shares therefore point at this endpoint, which fetches the
//! original URL with the bot token and streams the body back.
//!
//! Only hosts listed in `slack.attachment_hosts` are fetched; an empty list
//! proxies any URL.

use super::handler::error_response;
use super::server::Gateway;
use crate::auth::{bearer, TokenScope};
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

/// Response headers copied from the upstream download
static FORWARDED_HEADERS: [HeaderName; 3] = [
    header::CONTENT_TYPE,
    header::CONTENT_LENGTH,
    header::CONTENT_DISPOSITION,
];

#[derive(Debug, Deserialize)]
pub(super) struct AttachmentQuery {
    #[serde(default)]
    url: Option<String>,
}

/// `GET {prefix}/:app_id/:client_id/attachment?url=<download url>`
pub(super) async fn attachment(
    State(gateway): State<Arc<Gateway>>,
    Path((app_id, client_id)): Path<(String, String)>,
    Query(query): Query<AttachmentQuery>,
) -> Response {
    let Some(target) = query.url.filter(|u| !u.is_empty()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let target = match Url::parse(&target) {
        Ok(url) => url,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, "INVALID_URL", &e.to_string());
        }
    };
    if !host_allowed(&gateway.config().slack.attachment_hosts, &target) {
        tracing::warn!(%app_id, %client_id, url = %target, "Attachment host not allowed");
        return error_response(
            StatusCode::FORBIDDEN,
            "HOST_NOT_ALLOWED",
            "attachment host is not allowed",
        );
    }

    let key = gateway.hooks().identity_request_receive(&app_id, &client_id);
    let token = match gateway
        .auth_context(&key)
        .await
        .and_then(|auth| auth.token(TokenScope::Bot))
    {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(%app_id, %client_id, "Attachment auth failed: {}", e);
            return error_response(StatusCode::BAD_GATEWAY, "AUTH_FAILED", &e.to_string());
        }
    };

    let upstream = match gateway
        .http()
        .get(target.clone())
        .header("authorization", bearer(&token))
        .send()
        .await
    {
        Ok(upstream) => upstream,
        Err(e) => {
            tracing::error!(url = %target, "Attachment download failed: {}", e);
            return error_response(StatusCode::BAD_GATEWAY, "UPSTREAM_FAILED", &e.to_string());
        }
    };

    let status =
        StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let forwarded: Vec<(HeaderName, HeaderValue)> = FORWARDED_HEADERS
        .iter()
        .filter_map(|name| {
            let value = upstream.headers().get(name.as_str())?.to_str().ok()?;
            Some((name.clone(), HeaderValue::from_str(value).ok()?))
        })
        .collect();

    tracing::debug!(url = %target, %status, "Streaming attachment");

    let stream = upstream
        .bytes_stream()
        .inspect_err(move |e| tracing::warn!(url = %target, "Attachment stream interrupted: {}", e));
    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = status;
    response.headers_mut().extend(forwarded);
    response
}

fn host_allowed(allowed: &[String], url: &Url) -> bool {
    if allowed.is_empty() {
        return true;
    }
    url.host_str()
        .is_some_and(|host| allowed.iter().any(|a| a.eq_ignore_ascii_case(host)))
}
