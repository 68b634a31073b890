// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

//! Per-participant "meeting interest" ratings and the chat-level aggregate.
//!
//! Every write re-reads all ratings of the chat and stores their rounded mean
//! on `chats.meeting_interest_score`. The read-modify-write is not atomic:
//! with two participants the last recompute wins, which is already derived
//! from the final ratings.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::db::{eq, DbError, Row, TableStore};
use crate::models::ChatInterest;

pub const CHAT_INTEREST_TABLE: &str = "chat_interest";
pub const CHATS_TABLE: &str = "chats";

/// Rating reported for a participant who has not rated yet
pub const DEFAULT_INTEREST: i64 = 3;
pub const MIN_INTEREST: i64 = 1;
pub const MAX_INTEREST: i64 = 5;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterestError {
    #[error("interest must be an integer from 1 to 5")]
    OutOfRange,

    #[error("chat_id must be numeric")]
    InvalidChatId,
}

/// Accept only JSON integers (or integral floats) in [1, 5].
pub fn validate_interest(value: &Value) -> Result<i64, InterestError> {
    let interest = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        _ => None,
    };
    interest
        .filter(|i| (MIN_INTEREST..=MAX_INTEREST).contains(i))
        .ok_or(InterestError::OutOfRange)
}

/// Chat ids arrive as numbers or numeric strings.
pub fn parse_chat_id(value: &Value) -> Result<i64, InterestError> {
    let chat_id = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    chat_id.ok_or(InterestError::InvalidChatId)
}

/// Arithmetic mean rounded half up; `None` for no ratings.
pub fn rounded_mean(ratings: &[i64]) -> Option<i64> {
    if ratings.is_empty() {
        return None;
    }
    let sum: i64 = ratings.iter().sum();
    Some((sum as f64 / ratings.len() as f64).round() as i64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterestView {
    pub chat_id: i64,
    pub user_id: String,
    pub interest: i64,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SavedInterest {
    pub row: Option<Row>,
    /// New aggregate, `None` if the recompute did not complete
    pub score: Option<i64>,
}

#[derive(Clone)]
pub struct InterestService {
    tables: Arc<dyn TableStore>,
}

impl InterestService {
    pub fn new(tables: Arc<dyn TableStore>) -> Self {
        Self { tables }
    }

    /// The caller's rating, or the default when there is none yet.
    pub async fn fetch(&self, chat_id: i64, user_id: &str) -> Result<InterestView, DbError> {
        let result = self
            .tables
            .select_single(
                CHAT_INTEREST_TABLE,
                "*",
                &[eq("chat_id", chat_id), eq("user_id", user_id)],
            )
            .await;

        match result {
            Ok(row) => {
                let stored: ChatInterest = serde_json::from_value(Value::Object(row))
                    .map_err(|e| DbError::Decode(e.to_string()))?;
                Ok(InterestView {
                    chat_id: stored.chat_id,
                    user_id: stored.user_id,
                    interest: stored.interest,
                    updated_at: stored.updated_at,
                })
            }
            Err(err) if err.is_no_rows() => Ok(InterestView {
                chat_id,
                user_id: user_id.to_string(),
                interest: DEFAULT_INTEREST,
                updated_at: None,
            }),
            Err(err) => Err(err),
        }
    }

    /// Store the rating, then refresh the chat's aggregate. Only the rating
    /// write can fail the call.
    pub async fn save(
        &self,
        chat_id: i64,
        user_id: &str,
        interest: i64,
        now: DateTime<Utc>,
    ) -> Result<SavedInterest, DbError> {
        let mut row = Row::new();
        row.insert("chat_id".into(), json!(chat_id));
        row.insert("user_id".into(), json!(user_id));
        row.insert("interest".into(), json!(interest));
        row.insert("updated_at".into(), json!(now.to_rfc3339()));

        let saved = self
            .tables
            .upsert(CHAT_INTEREST_TABLE, row, "chat_id,user_id")
            .await?;
        debug!("Saved interest {} for chat {} by {}", interest, chat_id, user_id);

        let score = match self.recompute_score(chat_id).await {
            Ok(score) => score,
            Err(e) => {
                error!("Failed to update meeting_interest_score for chat {}: {}", chat_id, e);
                None
            }
        };

        Ok(SavedInterest {
            row: saved.into_iter().next(),
            score,
        })
    }

    pub async fn recompute_score(&self, chat_id: i64) -> Result<Option<i64>, DbError> {
        let rows = self
            .tables
            .select(CHAT_INTEREST_TABLE, "interest", &[eq("chat_id", chat_id)])
            .await?;
        let ratings: Vec<i64> = rows
            .iter()
            .filter_map(|row| row.get("interest").and_then(Value::as_i64))
            .collect();

        let Some(score) = rounded_mean(&ratings) else {
            return Ok(None);
        };

        let mut patch = Row::new();
        patch.insert("meeting_interest_score".into(), json!(score));
        self.tables
            .update(CHATS_TABLE, patch, &[eq("id", chat_id)])
            .await?;
        info!("meeting_interest_score for chat {} is now {}", chat_id, score);
        Ok(Some(score))
    }
}
