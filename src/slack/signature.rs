//! Slack request signature verification
//!
//! Slack signs every webhook with `v0=HMAC-SHA256(signing_secret,
//! "v0:{timestamp}:{body}")`, sent in `x-slack-signature` alongside
//! `x-slack-request-timestamp`.

use std::collections::HashMap;

/// Maximum allowed age of a request timestamp (seconds)
pub const MAX_TIMESTAMP_AGE: i64 = 300;

/// Outcome of a signature check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Request is authenticated
    Authenticated,
    /// Request failed authentication
    Rejected {
        /// Human-readable reason for rejection
        reason: String,
    },
}

/// Slack webhook signature verifier
pub struct SlackSignature {
    signing_secret: String,
}

impl SlackSignature {
    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
        }
    }

    /// Verify an inbound webhook.
    ///
    /// - `headers`: HTTP headers (lowercase keys).
    /// - `body`: Raw request body bytes.
    /// - `timestamp_now`: Current Unix timestamp (seconds) for replay protection.
    pub fn verify_request(
        &self,
        headers: &HashMap<String, String>,
        body: &[u8],
        timestamp_now: i64,
    ) -> AuthOutcome {
        let timestamp = match headers.get("x-slack-request-timestamp") {
            Some(ts) => ts,
            None => return AuthOutcome::Rejected { reason: "missing x-slack-request-timestamp".into() },
        };
        let signature = match headers.get("x-slack-signature") {
            Some(sig) => sig,
            None => return AuthOutcome::Rejected { reason: "missing x-slack-signature".into() },
        };

        // Replay protection
        let ts: i64 = match timestamp.parse() {
            Ok(v) => v,
            Err(_) => return AuthOutcome::Rejected { reason: "invalid timestamp format".into() },
        };
        if (timestamp_now - ts).abs() > MAX_TIMESTAMP_AGE {
            return AuthOutcome::Rejected { reason: "request timestamp too old".into() };
        }

        let Some(provided) = signature.strip_prefix("v0=").and_then(hex_decode) else {
            return AuthOutcome::Rejected { reason: "malformed signature".into() };
        };

        let key = ring::hmac::Key::new(ring::hmac::HMAC_SHA256, self.signing_secret.as_bytes());
        match ring::hmac::verify(&key, &base_string(timestamp, body), &provided) {
            Ok(()) => AuthOutcome::Authenticated,
            Err(_) => AuthOutcome::Rejected { reason: "invalid signature".into() },
        }
    }

    /// Compute the `x-slack-signature` value for a body
    pub fn sign(&self, timestamp: &str, body: &[u8]) -> String {
        let key = ring::hmac::Key::new(ring::hmac::HMAC_SHA256, self.signing_secret.as_bytes());
        let mac = ring::hmac::sign(&key, &base_string(timestamp, body));
        format!("v0={}", hex_encode(mac.as_ref()))
    }
}

fn base_string(timestamp: &str, body: &[u8]) -> Vec<u8> {
    let mut base = format!("v0:{}:", timestamp).into_bytes();
    base.extend_from_slice(body);
    base
}

fn hex_encode(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}

fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect()
}
