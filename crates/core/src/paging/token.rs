use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Error produced when an incoming resumption token cannot be read.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token is not valid URL-safe base64.
    #[error("token is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    /// The decoded payload is not valid JSON.
    #[error("token payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Opaque resumption token handed to API clients between result pages.
///
/// The wrapped value is whatever the paginated backend needs to pick up
/// where it left off (a last-evaluated key, an offset, ...). Clients must
/// treat the serialized form as opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NextToken {
    value: Value,
}

impl NextToken {
    /// Wraps a resumption state value.
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Borrows the wrapped resumption state.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Unwraps the resumption state.
    pub fn into_value(self) -> Value {
        self.value
    }

    /// A token around null, `false`, zero, an empty string, array or object
    /// carries no resumption state.
    pub fn is_empty(&self) -> bool {
        match &self.value {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Number(n) => {
                n.as_i64() == Some(0) || n.as_u64() == Some(0) || n.as_f64() == Some(0.0)
            }
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
        }
    }

    /// Encodes the token for transport: URL-safe unpadded base64 over
    /// compact JSON.
    pub fn serialize(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.value.to_string())
    }

    /// Decodes a token previously produced by [`NextToken::serialize`].
    pub fn deserialize(raw: &str) -> Result<Self, TokenError> {
        let bytes = URL_SAFE_NO_PAD.decode(raw)?;
        Ok(Self {
            value: serde_json::from_slice(&bytes)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_objects_and_numbers() {
        let token = NextToken::new(json!({"key": "value"}));
        let back = NextToken::deserialize(&token.serialize()).unwrap();
        assert_eq!(back.value(), &json!({"key": "value"}));

        let token = NextToken::new(5);
        let back = NextToken::deserialize(&token.serialize()).unwrap();
        assert_eq!(back.value(), &json!(5));
    }

    #[test]
    fn emptiness_follows_the_wrapped_value() {
        assert!(!NextToken::new(json!({"key": "value"})).is_empty());
        assert!(!NextToken::new(5).is_empty());
        assert!(NextToken::new(json!({})).is_empty());
        assert!(NextToken::new(Value::Null).is_empty());
        assert!(NextToken::new(0).is_empty());
        assert!(NextToken::new("").is_empty());
    }

    #[test]
    fn serializes_transparently_inside_api_payloads() {
        let token = NextToken::new(json!({"key": "value"}));
        let body = serde_json::to_string(&json!({"next_token": token})).unwrap();
        assert_eq!(body, r#"{"next_token":{"key":"value"}}"#);
    }

    #[test]
    fn rejects_garbage_tokens() {
        assert!(matches!(
            NextToken::deserialize("!!not-base64!!"),
            Err(TokenError::Decode(_))
        ));
        let raw = URL_SAFE_NO_PAD.encode("not json at all");
        assert!(matches!(
            NextToken::deserialize(&raw),
            Err(TokenError::Json(_))
        ));
    }
}
