// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

use crate::locale::{fill, Locale};

/// Upstream answer to a token that is neither a JWT nor a JWE.
const MALFORMED_TOKEN_MARKER: &str = "invalid number of segments";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("no access token available")]
    NoToken,

    #[error("cannot reach {base_url}: {reason}")]
    Unreachable { base_url: String, reason: String },

    #[error("request timed out")]
    Timeout,

    #[error("upstream returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn from_reqwest(err: reqwest::Error, base_url: &str) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ClientError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ClientError::Unreachable {
                base_url: base_url.to_string(),
                reason: err.to_string(),
            }
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message for the person using the app
    pub fn user_message(&self, locale: Locale) -> String {
        let messages = locale.messages();
        match self {
            ClientError::NoToken => messages.no_token.to_string(),
            ClientError::Unreachable { base_url, .. } => {
                fill(messages.backend_unreachable, &[("base_url", base_url.as_str())])
            }
            ClientError::Timeout => messages.request_timed_out.to_string(),
            ClientError::Status { status: 401, message } => {
                if message.contains(MALFORMED_TOKEN_MARKER) {
                    messages.token_malformed.to_string()
                } else {
                    fill(messages.auth_failed, &[("detail", message.as_str())])
                }
            }
            ClientError::Status { status: 404, .. } => messages.endpoint_not_found.to_string(),
            ClientError::Status { status, message } => fill(
                messages.status_error,
                &[("status", status.to_string().as_str()), ("message", message.as_str())],
            ),
            ClientError::Decode(detail) => fill(
                messages.status_error,
                &[("status", "200"), ("message", detail.as_str())],
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16, message: &str) -> ClientError {
        ClientError::Status {
            status,
            message: message.to_string(),
        }
    }

    #[test]
    fn unreachable_backend_names_the_url() {
        let err = ClientError::Unreachable {
            base_url: "http://localhost:8080".into(),
            reason: "connection refused".into(),
        };
        assert_eq!(
            err.user_message(Locale::En),
            "Cannot reach the backend server.\nCheck that http://localhost:8080 is running."
        );
    }

    #[test]
    fn unauthorized_distinguishes_malformed_tokens() {
        let malformed = status(401, "token has invalid number of segments");
        assert!(malformed
            .user_message(Locale::En)
            .contains("AUTH0_AUDIENCE"));

        let expired = status(401, "token expired");
        assert_eq!(
            expired.user_message(Locale::En),
            "Authentication failed (token expired). Please log in again."
        );
    }

    #[test]
    fn other_statuses() {
        assert_eq!(
            status(404, "Not Found").user_message(Locale::Ja),
            Locale::Ja.messages().endpoint_not_found
        );
        assert_eq!(
            status(503, "down").user_message(Locale::En),
            "An error occurred (503): down"
        );
        assert_eq!(status(503, "down").status(), Some(503));
        assert_eq!(ClientError::NoToken.status(), None);
    }
}
