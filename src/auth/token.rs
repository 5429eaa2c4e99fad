//! Scoped bearer token resolution

use crate::error::{Error, Result};
use serde_json::Value;
use std::fmt;

/// Token scope inside an auth record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenScope {
    /// Bot user token, used for replies and file downloads
    Bot,
    /// App token, used for relayed sends and conversation management
    App,
}

impl TokenScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bot => "bot",
            Self::App => "app",
        }
    }
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extract the token for `scope` from a JSON auth record such as
/// `{"bot":"xoxb-...","app":"xoxa-..."}`.
pub fn resolve_token(record: &str, scope: TokenScope) -> Result<String> {
    let parsed: Value = serde_json::from_str(record)
        .map_err(|e| Error::TokenResolution(format!("auth record is not valid JSON: {}", e)))?;

    parsed
        .get(scope.as_str())
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            Error::TokenResolution(format!("auth record has no '{}' token", scope))
        })
}

/// `Authorization` header value for a bearer token
pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = r#"{"bot":"xoxb-1","app":"xoxa-2"}"#;

    #[test]
    fn test_resolve_each_scope() {
        assert_eq!(resolve_token(RECORD, TokenScope::Bot).unwrap(), "xoxb-1");
        assert_eq!(resolve_token(RECORD, TokenScope::App).unwrap(), "xoxa-2");
    }

    #[test]
    fn test_missing_scope() {
        let err = resolve_token(r#"{"bot":"xoxb-1"}"#, TokenScope::App).unwrap_err();
        assert!(matches!(err, Error::TokenResolution(msg) if msg.contains("'app'")));
    }

    #[test]
    fn test_non_string_scope() {
        assert!(resolve_token(r#"{"bot":42}"#, TokenScope::Bot).is_err());
        assert!(resolve_token(r#"{"bot":null}"#, TokenScope::Bot).is_err());
    }

    #[test]
    fn test_invalid_record() {
        for record in ["", "not json", "[\"bot\"]", "\"xoxb-1\""] {
            assert!(matches!(
                resolve_token(record, TokenScope::Bot),
                Err(Error::TokenResolution(_))
            ));
        }
    }

    #[test]
    fn test_bearer() {
        assert_eq!(bearer("xoxb-1"), "Bearer xoxb-1");
        assert_eq!(TokenScope::Bot.to_string(), "bot");
    }
}
