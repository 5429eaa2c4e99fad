//! Action value envelope
//!
//! Interactive buttons carry their payload as a JSON string in the Slack
//! `value` field. Whatever is encoded on send decodes back to the same
//! structure when the `block_actions` callback arrives. Decoding never
//! fails: anything that is not a JSON object is kept verbatim as `Raw`.

use serde_json::{Map, Value};

/// Key under which a raw (non-object) value lands in message details
pub const RAW_VALUE_KEY: &str = "value";

#[derive(Debug, Clone, PartialEq)]
pub enum ActionValue {
    /// A JSON object payload
    Structured(Map<String, Value>),
    /// A value string that did not decode to a JSON object
    Raw(String),
}

impl ActionValue {
    /// The `{text: ...}` payload used by quick-reply buttons
    pub fn text(text: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert("text".to_string(), Value::String(text.into()));
        Self::Structured(map)
    }

    /// Encode into the string carried by the button `value` field
    pub fn encode(&self) -> String {
        match self {
            Self::Structured(map) => Value::Object(map.clone()).to_string(),
            Self::Raw(raw) => raw.clone(),
        }
    }

    /// Decode a button `value` field
    pub fn decode(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Self::Structured(map),
            _ => Self::Raw(raw.to_string()),
        }
    }

    /// Convert into a details map; raw strings land under [`RAW_VALUE_KEY`].
    pub fn into_details(self) -> Map<String, Value> {
        match self {
            Self::Structured(map) => map,
            Self::Raw(raw) => {
                let mut map = Map::new();
                map.insert(RAW_VALUE_KEY.to_string(), Value::String(raw));
                map
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_roundtrip() {
        let value = ActionValue::text("Yes");
        assert_eq!(value.encode(), r#"{"text":"Yes"}"#);
        assert_eq!(ActionValue::decode(&value.encode()), value);
    }

    #[test]
    fn test_structured_roundtrip() {
        let map = json!({"intent": "book", "slots": {"date": "2020-01-01", "seats": 2}});
        let value = ActionValue::Structured(map.as_object().unwrap().clone());
        assert_eq!(ActionValue::decode(&value.encode()), value);
    }

    #[test]
    fn test_malformed_json_falls_back_to_raw() {
        assert_eq!(
            ActionValue::decode("{not json"),
            ActionValue::Raw("{not json".to_string())
        );
    }

    #[test]
    fn test_non_object_json_is_raw() {
        assert_eq!(ActionValue::decode("42"), ActionValue::Raw("42".to_string()));
        assert_eq!(
            ActionValue::decode(r#""quoted""#),
            ActionValue::Raw(r#""quoted""#.to_string())
        );
    }

    #[test]
    fn test_into_details() {
        let details = ActionValue::decode("plain").into_details();
        assert_eq!(details.get("value"), Some(&json!("plain")));

        let details = ActionValue::decode(r#"{"text":"Yes"}"#).into_details();
        assert_eq!(details.get("text"), Some(&json!("Yes")));
    }
}
