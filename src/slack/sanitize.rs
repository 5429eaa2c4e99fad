//! Slack link markup sanitizing

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;

/// `<mailto:ADDR|LABEL>` as Slack renders auto-linked email addresses
static MAILTO_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<mailto:([^>]+?)\|[^>]*?>").expect("valid mailto regex"));

/// Replace every `<mailto:ADDR|LABEL>` with the bare `ADDR`.
pub fn sanitize(text: &str) -> Cow<'_, str> {
    MAILTO_REGEX.replace_all(text, "$1")
}

/// Sanitize a JSON string; any other JSON value is returned unchanged.
pub fn sanitize_value(value: Value) -> Value {
    match value {
        Value::String(text) => {
            let clean = match sanitize(&text) {
                Cow::Owned(clean) => Some(clean),
                Cow::Borrowed(_) => None,
            };
            Value::String(clean.unwrap_or(text))
        }
        other => other,
    }
}
