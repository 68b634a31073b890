// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

/// Chat as returned by the upstream chat API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub user1_id: String,
    pub user2_id: String,
    pub created_at: String,
    #[serde(default)]
    pub ai_suggested_theme: Option<String>,
    #[serde(default)]
    pub meeting_interest_score: Option<i64>,
    #[serde(default)]
    pub other_user: Option<ChatUser>,
    #[serde(default)]
    pub last_message: Option<LastMessage>,
}

impl Chat {
    /// The participant that is not `user_id`
    pub fn partner_of(&self, user_id: Option<&str>) -> &str {
        if user_id == Some(self.user1_id.as_str()) {
            &self.user2_id
        } else {
            &self.user1_id
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatUser {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastMessage {
    pub id: i64,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub sent_at: Option<String>,
}

/// One participant's 1-5 "meeting interest" rating for a chat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatInterest {
    pub chat_id: i64,
    pub user_id: String,
    pub interest: i64,
    #[serde(default)]
    pub updated_at: Option<String>,
}
