// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

//! Connectivity checks for the chat feature: server reachability, token
//! shape and validity, chat listing, and the per-chat websocket.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Error as WsError;
use tracing::{error, info, warn};

use super::chat::CHATS_PATH;
use super::{ApiClient, ClientError};
use crate::config::BackendConfig;
use crate::locale::{fill, Locale};

pub const USERS_ME_PATH: &str = "/api/v1/users/me";
pub const WEBSOCKET_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFormat {
    Jwt,
    Jwe,
    Invalid { segments: usize },
}

/// Classify a bearer token by its dot-separated segment count.
pub fn token_format(token: &str) -> TokenFormat {
    match token.split('.').count() {
        3 => TokenFormat::Jwt,
        5 => TokenFormat::Jwe,
        segments => TokenFormat::Invalid { segments },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeOutcome {
    pub success: bool,
    pub message: String,
}

impl ProbeOutcome {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationStep {
    pub name: String,
    pub success: bool,
    pub message: String,
}

pub struct VerificationClient {
    api: Arc<ApiClient>,
    backend: BackendConfig,
    locale: Locale,
}

impl VerificationClient {
    pub fn new(api: Arc<ApiClient>, backend: BackendConfig, locale: Locale) -> Self {
        Self { api, backend, locale }
    }

    /// Whether the upstream accepts `token`. The chat list is tried first; a
    /// 401 there falls back to the current-user endpoint.
    pub async fn verify_token(&self, token: &str) -> bool {
        info!("Token format check: {:?}", token_format(token));

        let chats_error = match self.api.execute(self.api.get(CHATS_PATH, token)).await {
            Ok(_) => return true,
            Err(e) => e,
        };

        if chats_error.status() != Some(401) {
            warn!("Token verification endpoint may not exist: {}", chats_error);
            return false;
        }

        warn!("Token verification via {} failed with 401, trying {}", CHATS_PATH, USERS_ME_PATH);
        match self.api.send::<Value>(self.api.get(USERS_ME_PATH, token)).await {
            Ok(user) => !user.is_null(),
            Err(user_error) => {
                error!(
                    "Token verification failed on both endpoints: chats={}, users/me={}",
                    chats_error, user_error
                );
                false
            }
        }
    }

    /// Up when the root answers at all with success or 404.
    pub async fn check_server(&self) -> bool {
        match self.api.execute(self.api.get_anonymous("/")).await {
            Ok(_) => true,
            Err(e) => e.status() == Some(404),
        }
    }

    pub async fn check_chats_endpoint(&self) -> ProbeOutcome {
        let messages = self.locale.messages();
        let token = match self.api.token().await {
            Ok(token) => token,
            Err(e) => return ProbeOutcome::failed(e.user_message(self.locale)),
        };

        let format = token_format(&token);
        if let TokenFormat::Invalid { segments } = format {
            return ProbeOutcome::failed(fill(
                messages.token_format_invalid,
                &[("segments", segments.to_string().as_str())],
            ));
        }
        if format == TokenFormat::Jwe {
            warn!("Received a JWE access token; the backend may expect a JWT");
        }

        match self.api.send::<Value>(self.api.get(CHATS_PATH, &token)).await {
            Ok(body) => {
                let count = body.as_array().map_or(0, Vec::len);
                ProbeOutcome::ok(fill(messages.chats_fetched, &[("count", count.to_string().as_str())]))
            }
            Err(e) => {
                let detail = match &e {
                    ClientError::Status { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                let mut message = fill(messages.chats_fetch_failed_detail, &[("detail", detail.as_str())]);
                if format == TokenFormat::Jwe {
                    message.push_str(messages.jwe_hint);
                }
                ProbeOutcome::failed(message)
            }
        }
    }

    /// `ws(s)://<host>/ws/chat/<chat_id>?token=<token>`
    pub fn websocket_url(&self, chat_id: i64, token: &str) -> Option<Url> {
        let scheme = if self.backend.ws_secure { "wss" } else { "ws" };
        let mut url = Url::parse(&format!(
            "{}://{}/ws/chat/{}",
            scheme, self.backend.ws_host, chat_id
        ))
        .ok()?;
        url.query_pairs_mut().append_pair("token", token);
        Some(url)
    }

    /// Open and cleanly close the chat's websocket within
    /// [`WEBSOCKET_PROBE_TIMEOUT`].
    pub async fn test_websocket_connection(&self, chat_id: i64) -> ProbeOutcome {
        let messages = self.locale.messages();
        let token = match self.api.token().await {
            Ok(token) => token,
            Err(e) => return ProbeOutcome::failed(e.user_message(self.locale)),
        };
        let Some(url) = self.websocket_url(chat_id, &token) else {
            return ProbeOutcome::failed(fill(
                messages.ws_error,
                &[("detail", self.backend.ws_host.as_str())],
            ));
        };

        match timeout(WEBSOCKET_PROBE_TIMEOUT, tokio_tungstenite::connect_async(url.as_str())).await {
            Err(_) => ProbeOutcome::failed(messages.ws_timeout),
            Ok(Ok((mut socket, _))) => {
                let frame = CloseFrame {
                    code: CloseCode::Normal,
                    reason: "Test completed".into(),
                };
                if let Err(e) = socket.close(Some(frame)).await {
                    warn!("WebSocket probe close failed: {}", e);
                }
                ProbeOutcome::ok(messages.ws_connected)
            }
            Ok(Err(WsError::Http(response))) => {
                let status = response.status();
                ProbeOutcome::failed(fill(
                    messages.ws_closed,
                    &[
                        ("code", status.as_str()),
                        ("reason", status.canonical_reason().unwrap_or(messages.unknown_error)),
                    ],
                ))
            }
            Ok(Err(e)) => ProbeOutcome::failed(fill(messages.ws_error, &[("detail", e.to_string().as_str())])),
        }
    }

    /// Every check in order; the websocket check only runs for a chat id.
    pub async fn run_full_verification(&self, chat_id: Option<i64>) -> Vec<VerificationStep> {
        let messages = self.locale.messages();
        let mut steps = Vec::new();

        info!("1. Checking server reachability");
        let server_running = self.check_server().await;
        steps.push(VerificationStep {
            name: messages.check_server.to_string(),
            success: server_running,
            message: if server_running {
                messages.server_running
            } else {
                messages.server_unreachable
            }
            .to_string(),
        });

        info!("2. Checking access token");
        let chats = self.check_chats_endpoint().await;
        match self.api.token().await {
            Ok(token) => {
                let valid = chats.success || self.verify_token(&token).await;
                steps.push(VerificationStep {
                    name: messages.check_token.to_string(),
                    success: valid,
                    message: if valid { messages.token_valid } else { messages.token_invalid }.to_string(),
                });
            }
            Err(e) => steps.push(VerificationStep {
                name: messages.check_token_fetch.to_string(),
                success: false,
                message: e.user_message(self.locale),
            }),
        }

        info!("3. Checking chat list");
        steps.push(VerificationStep {
            name: messages.check_chats.to_string(),
            success: chats.success,
            message: chats.message,
        });

        if let Some(chat_id) = chat_id {
            info!("4. Checking websocket for chat {}", chat_id);
            let ws = self.test_websocket_connection(chat_id).await;
            steps.push(VerificationStep {
                name: messages.check_websocket.to_string(),
                success: ws.success,
                message: ws.message,
            });
        }

        steps
    }
}
