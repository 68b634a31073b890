// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for the HTTP surface.
//!
//! External errors never reach a caller as-is: handlers map them onto one of
//! these kinds with a localised message, keeping the upstream detail under
//! `details` for diagnostics.

use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

use crate::db::DbError;
use crate::locale::Locale;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or malformed input
    #[error("{code}: {message}")]
    Validation { code: &'static str, message: String },

    /// Credentials rejected, account conflicts, or provider misconfiguration
    #[error("{code}: {message}")]
    UpstreamAuth {
        status: StatusCode,
        code: &'static str,
        message: String,
        details: Option<Value>,
    },

    /// Database or storage failure
    #[error("{code}: {message}")]
    UpstreamData {
        code: &'static str,
        message: String,
        details: Option<Value>,
    },

    #[error("{code}: {message}")]
    NotFound { code: &'static str, message: String },

    /// A required environment variable is absent
    #[error("{code}: {message}")]
    Misconfigured { code: &'static str, message: String },

    #[error("internal error: {message}")]
    Internal {
        message: String,
        details: Option<Value>,
    },
}

impl ApiError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn upstream_auth(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self::UpstreamAuth {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            message: message.into(),
        }
    }

    pub fn misconfigured(code: &'static str, message: impl Into<String>) -> Self {
        Self::Misconfigured {
            code,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            details: None,
        }
    }

    /// Wrap a database/storage failure under a stable code.
    pub fn database(code: &'static str, message: impl Into<String>, err: &DbError) -> Self {
        Self::UpstreamData {
            code,
            message: message.into(),
            details: Some(err.to_details()),
        }
    }

    pub fn with_details(mut self, value: Value) -> Self {
        match &mut self {
            Self::UpstreamAuth { details, .. }
            | Self::UpstreamData { details, .. }
            | Self::Internal { details, .. } => *details = Some(value),
            _ => {}
        }
        self
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::UpstreamAuth { status, .. } => *status,
            Self::UpstreamData { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Misconfigured { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code sent to the client.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { code, .. }
            | Self::UpstreamAuth { code, .. }
            | Self::UpstreamData { code, .. }
            | Self::NotFound { code, .. }
            | Self::Misconfigured { code, .. } => *code,
            Self::Internal { .. } => "internal_error",
        }
    }

    fn parts(self) -> (String, Option<Value>) {
        match self {
            Self::Validation { message, .. }
            | Self::NotFound { message, .. }
            | Self::Misconfigured { message, .. } => (message, None),
            Self::UpstreamAuth {
                message, details, ..
            }
            | Self::UpstreamData {
                message, details, ..
            }
            | Self::Internal { message, details } => (message, details),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        if status.is_server_error() {
            error!("Request failed with {}: {}", status, self);
        }

        let (message, details) = self.parts();
        let mut body = json!({
            "success": false,
            "error": code,
            "message": message,
        });
        if let Some(details) = details {
            body["details"] = details;
        }

        (status, Json(body)).into_response()
    }
}

/// Response for a handler that panicked. The request's locale is gone by
/// then, so the message is in the default locale.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };

    ApiError::internal(Locale::default().messages().internal_error)
        .with_details(json!({ "panic": detail }))
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;
    use tower_http::catch_panic::CatchPanicLayer;

    #[test]
    fn status_follows_kind() {
        assert_eq!(
            ApiError::validation("empty_body", "x").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::upstream_auth(StatusCode::CONFLICT, "user_exists", "x").status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::not_found("user_not_found", "x").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::internal("boom").code(), "internal_error");
    }

    #[test]
    fn details_only_attach_to_upstream_kinds() {
        let err = ApiError::validation("missing_fields", "x").with_details(json!({"a": 1}));
        assert!(matches!(err, ApiError::Validation { .. }));

        let err = ApiError::internal("boom").with_details(json!({"a": 1}));
        let (_, details) = err.parts();
        assert_eq!(details, Some(json!({"a": 1})));
    }

    #[tokio::test]
    async fn panicking_handler_becomes_internal_error() {
        async fn explode() -> &'static str {
            panic!("profile cache poisoned")
        }
        let router = Router::new()
            .route("/boom", get(explode))
            .layer(CatchPanicLayer::custom(panic_response));

        let response = router
            .oneshot(Request::get("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "internal_error");
        assert_eq!(body["message"], Locale::Ja.messages().internal_error);
        assert_eq!(body["details"]["panic"], "profile cache poisoned");
    }
}
