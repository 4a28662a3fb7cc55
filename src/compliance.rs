//! Tolerance for identity-provider payloads that arrive double-encoded.
//!
//! The provider sometimes returns its token and user-info bodies as a JSON
//! string whose contents are themselves JSON. Everything coming back from the
//! provider goes through [`normalize`] once, at the adapter boundary, so the
//! rest of the crate only sees a structured value or an opaque raw string.

use serde_json::Value as JsonValue;

/// A provider response body, before or after normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderPayload {
    /// Opaque text; no fields can be read from it.
    Raw(String),
    /// Parsed JSON (object, array or scalar).
    Structured(JsonValue),
}

impl ProviderPayload {
    /// Classifies a response body: valid JSON becomes `Structured`, anything else `Raw`.
    #[must_use]
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<JsonValue>(body) {
            Ok(value) => Self::Structured(value),
            Err(_) => Self::Raw(body.to_owned()),
        }
    }

    /// Object view of the payload, if there is one.
    #[must_use]
    pub fn as_object(&self) -> Option<&serde_json::Map<String, JsonValue>> {
        match self {
            Self::Structured(JsonValue::Object(map)) => Some(map),
            _ => None,
        }
    }

    /// Looks up a top-level field. `Raw` payloads never have fields.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&JsonValue> {
        self.as_object().and_then(|map| map.get(key))
    }
}

/// Resolves a possibly double-encoded payload. Never fails.
///
/// - structured non-string values pass through unchanged;
/// - a string (raw, or a JSON string value) is parsed as JSON;
/// - text that does not parse is returned unchanged as `Raw`.
#[must_use]
pub fn normalize(payload: ProviderPayload) -> ProviderPayload {
    let text = match payload {
        ProviderPayload::Structured(JsonValue::String(text)) | ProviderPayload::Raw(text) => text,
        structured => return structured,
    };

    match serde_json::from_str::<JsonValue>(&text) {
        Ok(value) => ProviderPayload::Structured(value),
        Err(_) => ProviderPayload::Raw(text),
    }
}

/// Convenience for response bodies: classify, then normalize.
#[must_use]
pub fn normalize_body(body: &str) -> ProviderPayload {
    normalize(ProviderPayload::from_body(body))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn json_encoded_string_becomes_structured() {
        let raw = ProviderPayload::Raw(r#"{"user":{"email":"a@b.com"}}"#.into());
        assert_eq!(
            normalize(raw),
            ProviderPayload::Structured(json!({"user": {"email": "a@b.com"}}))
        );
    }

    #[test]
    fn json_string_value_is_unwrapped() {
        let inner = r#"{"access_token":"t"}"#;
        let wrapped = ProviderPayload::Structured(JsonValue::String(inner.into()));
        assert_eq!(
            normalize(wrapped),
            ProviderPayload::Structured(json!({"access_token": "t"}))
        );
    }

    #[test]
    fn non_json_string_is_unchanged() {
        let raw = ProviderPayload::Raw("<html>bad gateway</html>".into());
        assert_eq!(normalize(raw.clone()), raw);
    }

    #[test]
    fn structured_input_is_unchanged() {
        let value = ProviderPayload::Structured(json!({"user": {"first_name": "A"}}));
        assert_eq!(normalize(value.clone()), value);
    }

    #[test]
    fn double_encoded_body_is_resolved() {
        let body = serde_json::to_string(r#"{"user":{"email":"x@y.z"}}"#).unwrap();
        let payload = normalize_body(&body);
        assert_eq!(
            payload.field("user"),
            Some(&json!({"email": "x@y.z"}))
        );
    }

    #[test]
    fn raw_payload_has_no_fields() {
        let payload = normalize_body("not json at all");
        assert!(payload.as_object().is_none());
        assert!(payload.field("user").is_none());
    }

    #[test]
    fn empty_string_degrades_to_raw() {
        assert_eq!(
            normalize(ProviderPayload::Raw(String::new())),
            ProviderPayload::Raw(String::new())
        );
    }
}
