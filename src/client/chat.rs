// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, error};

use super::{ApiClient, ClientError};
use crate::models::Chat;

pub const CHATS_PATH: &str = "/api/v1/chats";
pub const CHAT_LIST_TIMEOUT: Duration = Duration::from_secs(10);

/// A chat row ready for the chat list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatWithPartner {
    pub id: i64,
    pub user1_id: String,
    pub user2_id: String,
    pub created_at: String,
    pub ai_suggested_theme: Option<String>,
    pub meeting_interest_score: Option<i64>,
    pub partner_id: String,
    pub partner_name: Option<String>,
    pub last_message: String,
    /// `M/D` of the last message
    pub last_message_time: Option<String>,
}

impl ChatWithPartner {
    /// `None` for chats without a message yet; those are not listed.
    pub fn from_chat(chat: Chat, current_user_id: Option<&str>) -> Option<Self> {
        let last = chat.last_message.as_ref()?;
        let content = last.content.clone()?;
        let last_message_time = last.sent_at.as_deref().and_then(month_day);
        let partner_id = chat.partner_of(current_user_id).to_string();

        Some(Self {
            partner_id,
            partner_name: chat.other_user.and_then(|u| u.username),
            last_message: content,
            last_message_time,
            id: chat.id,
            user1_id: chat.user1_id,
            user2_id: chat.user2_id,
            created_at: chat.created_at,
            ai_suggested_theme: chat.ai_suggested_theme,
            meeting_interest_score: chat.meeting_interest_score,
        })
    }
}

/// `M/D` label for a timestamp, in the timestamp's own offset. Timestamps
/// without an offset are taken as-is.
pub fn month_day(timestamp: &str) -> Option<String> {
    let date = match DateTime::parse_from_rfc3339(timestamp) {
        Ok(dt) => dt.date_naive(),
        Err(_) => NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()?
            .date(),
    };
    Some(format!("{}/{}", date.month(), date.day()))
}

pub struct ChatListClient {
    api: Arc<ApiClient>,
}

impl ChatListClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Chats of the signed-in user that have at least one message.
    pub async fn fetch_chats(&self) -> Result<Vec<ChatWithPartner>, ClientError> {
        let result = self.load().await;
        if let Err(e) = &result {
            error!("Failed to fetch chats: {}", e);
        }
        result
    }

    async fn load(&self) -> Result<Vec<ChatWithPartner>, ClientError> {
        let token = self.api.token().await?;
        debug!("Fetching chats from: {}", self.api.url(CHATS_PATH));

        let chats: Option<Vec<Chat>> = self
            .api
            .send(self.api.get(CHATS_PATH, &token).timeout(CHAT_LIST_TIMEOUT))
            .await?;

        let current_user = self.api.current_user_id();
        Ok(chats
            .unwrap_or_default()
            .into_iter()
            .filter_map(|chat| ChatWithPartner::from_chat(chat, current_user.as_deref()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::Locale;
    use crate::test_support::{backend_config, closed_port_host, spawn_upstream, StaticToken};
    use axum::{http::StatusCode, routing::get, Json, Router};
    use serde_json::json;

    fn client(base: &str, token: Option<&str>) -> ChatListClient {
        let api = ApiClient::new(
            &backend_config(base, "unused"),
            StaticToken::new(token, Some("auth0|me")),
        )
        .unwrap();
        ChatListClient::new(Arc::new(api))
    }

    #[test]
    fn month_day_labels() {
        assert_eq!(month_day("2024-05-03T10:00:00Z").as_deref(), Some("5/3"));
        assert_eq!(month_day("2024-12-31T23:30:00+09:00").as_deref(), Some("12/31"));
        assert_eq!(month_day("2024-01-09T08:00:00.123456").as_deref(), Some("1/9"));
        assert_eq!(month_day("yesterday"), None);
    }

    #[tokio::test]
    async fn lists_only_chats_with_messages() {
        let router = Router::new().route(
            CHATS_PATH,
            get(|| async {
                Json(json!([
                    {
                        "id": 1,
                        "user1_id": "auth0|me",
                        "user2_id": "auth0|kanako",
                        "created_at": "2024-05-01T00:00:00Z",
                        "other_user": { "id": "auth0|kanako", "username": "kanako" },
                        "last_message": { "id": 7, "content": "hello", "sent_at": "2024-05-03T10:00:00Z" }
                    },
                    {
                        "id": 2,
                        "user1_id": "auth0|tom",
                        "user2_id": "auth0|me",
                        "created_at": "2024-05-02T00:00:00Z"
                    }
                ]))
            }),
        );
        let base = spawn_upstream(router);

        let chats = client(&base, Some("t")).fetch_chats().await.unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].partner_id, "auth0|kanako");
        assert_eq!(chats[0].partner_name.as_deref(), Some("kanako"));
        assert_eq!(chats[0].last_message, "hello");
        assert_eq!(chats[0].last_message_time.as_deref(), Some("5/3"));
    }

    #[tokio::test]
    async fn partner_is_user1_when_current_user_is_user2() {
        let router = Router::new().route(
            CHATS_PATH,
            get(|| async {
                Json(json!([{
                    "id": 3,
                    "user1_id": "auth0|tom",
                    "user2_id": "auth0|me",
                    "created_at": "2024-05-02T00:00:00Z",
                    "last_message": { "id": 1, "content": "hi" }
                }]))
            }),
        );
        let base = spawn_upstream(router);

        let chats = client(&base, Some("t")).fetch_chats().await.unwrap();
        assert_eq!(chats[0].partner_id, "auth0|tom");
        assert_eq!(chats[0].last_message_time, None);
    }

    #[tokio::test]
    async fn failures_are_classified() {
        let err = client("http://unused", None).fetch_chats().await.unwrap_err();
        assert!(matches!(err, ClientError::NoToken));

        let base = format!("http://{}", closed_port_host());
        let err = client(&base, Some("t")).fetch_chats().await.unwrap_err();
        assert!(err.user_message(Locale::En).contains(&base));

        let router = Router::new().route(
            CHATS_PATH,
            get(|| async { (StatusCode::NOT_FOUND, "no such route") }),
        );
        let base = spawn_upstream(router);
        let err = client(&base, Some("t")).fetch_chats().await.unwrap_err();
        assert_eq!(
            err.user_message(Locale::En),
            Locale::En.messages().endpoint_not_found
        );
    }
}
