use std::convert::Infallible;

use axum::{
    async_trait,
    body::Bytes,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::ApiError;
use crate::locale::Locale;

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl<T> ApiResponse<T> {
    /// Create a success response with data
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            warning: None,
            details: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Partial success: the main effect happened, a follow-up step did not
    pub fn with_warning(mut self, warning: impl Into<String>, details: Option<Value>) -> Self {
        self.warning = Some(warning.into());
        self.details = details;
        self
    }
}

/// Display locale of the caller, from `Accept-Language` (Japanese by default)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLocale(pub Locale);

#[async_trait]
impl<S> FromRequestParts<S> for RequestLocale
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let locale = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .map(Locale::from_accept_language)
            .unwrap_or_default();
        Ok(RequestLocale(locale))
    }
}

/// Query carrying the subject id of the user being looked up
#[derive(Debug, Default, Deserialize)]
pub struct UserIdQuery {
    pub user_id: Option<String>,
}

impl UserIdQuery {
    pub fn require(&self, locale: Locale) -> Result<&str, ApiError> {
        self.user_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                ApiError::validation("user_id_required", locale.messages().user_id_required)
            })
    }
}

/// Parse a JSON body. `Ok(None)` for an empty body, a JSON `null` or `{}`.
pub fn read_json<T: DeserializeOwned>(body: &Bytes, locale: Locale) -> Result<Option<T>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let value: Value = serde_json::from_slice(body).map_err(|e| {
        debug!("Rejecting malformed JSON body: {}", e);
        ApiError::validation("invalid_request", locale.messages().empty_body)
    })?;
    match &value {
        Value::Null => return Ok(None),
        Value::Object(map) if map.is_empty() => return Ok(None),
        _ => {}
    }

    serde_json::from_value(value).map(Some).map_err(|e| {
        debug!("Rejecting JSON body with unexpected shape: {}", e);
        ApiError::validation("invalid_request", locale.messages().missing_fields)
    })
}

/// Trimmed, non-empty string field
pub fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Body {
        name: Option<String>,
    }

    #[test]
    fn empty_bodies_read_as_none() {
        for raw in ["", "  ", "null", "{}"] {
            let parsed: Option<Body> = read_json(&Bytes::from(raw), Locale::En).unwrap();
            assert!(parsed.is_none(), "{raw:?}");
        }
        let parsed: Option<Body> = read_json(&Bytes::from(r#"{"name":"a"}"#), Locale::En).unwrap();
        assert_eq!(parsed.unwrap().name.as_deref(), Some("a"));
    }

    #[test]
    fn malformed_json_is_a_validation_error() {
        let err = read_json::<Body>(&Bytes::from("{"), Locale::Ja).unwrap_err();
        assert_eq!(err.code(), "invalid_request");
    }

    #[test]
    fn envelope_skips_absent_fields() {
        let body = serde_json::to_value(ApiResponse::success(1).with_message("ok")).unwrap();
        assert_eq!(body, serde_json::json!({"success": true, "data": 1, "message": "ok"}));
    }
}
