// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

//! Reads and writes of `users` and `profiles`.
//!
//! Profile writes tolerate schema drift: when the database rejects a column
//! it does not know, that column is dropped from the row and the write is
//! retried, up to [`MAX_UPSERT_ATTEMPTS`] times.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::{eq, DbError, Row, TableStore};
use crate::models::{Profile, User};

pub const MAX_UPSERT_ATTEMPTS: usize = 5;

pub const USERS_TABLE: &str = "users";
pub const PROFILES_TABLE: &str = "profiles";

#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome {
    /// Stored representation returned by the database
    pub row: Option<Row>,
    /// Columns removed because the table does not have them
    pub dropped_columns: Vec<String>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProfileStoreError {
    #[error("failed to save user row: {0}")]
    User(DbError),

    #[error("failed to save profile row: {0}")]
    Profile(DbError),

    #[error("profile write still rejected after {attempts} attempts (dropped {dropped:?}): {last}")]
    DriftExhausted {
        attempts: usize,
        dropped: Vec<String>,
        last: DbError,
    },
}

/// Upsert `row` into `table`, shrinking it by one column per unknown-column
/// error. The `conflict_key` column is never dropped.
pub async fn resilient_upsert(
    tables: &dyn TableStore,
    table: &str,
    mut row: Row,
    conflict_key: &str,
) -> Result<UpsertOutcome, ProfileStoreError> {
    let mut dropped_columns = Vec::new();
    let mut last_error = None;

    for attempt in 1..=MAX_UPSERT_ATTEMPTS {
        match tables.upsert(table, row.clone(), conflict_key).await {
            Ok(rows) => {
                if !dropped_columns.is_empty() {
                    warn!(
                        "Saved {} after dropping columns missing from the schema: {:?}",
                        table, dropped_columns
                    );
                }
                return Ok(UpsertOutcome {
                    row: rows.into_iter().next(),
                    dropped_columns,
                });
            }
            Err(err) => {
                let column = err
                    .unknown_column()
                    .filter(|column| column != conflict_key && row.contains_key(column));
                let Some(column) = column else {
                    return Err(ProfileStoreError::Profile(err));
                };

                debug!(
                    "Attempt {} on {} rejected column {}; retrying without it",
                    attempt, table, column
                );
                row.remove(&column);
                dropped_columns.push(column);
                last_error = Some(err);
            }
        }
    }

    let last = last_error.unwrap_or(DbError::NoRows);
    warn!(
        "Giving up on {} after {} attempts; dropped {:?}",
        table, MAX_UPSERT_ATTEMPTS, dropped_columns
    );
    Err(ProfileStoreError::DriftExhausted {
        attempts: MAX_UPSERT_ATTEMPTS,
        dropped: dropped_columns,
        last,
    })
}

#[derive(Clone)]
pub struct ProfileStore {
    tables: Arc<dyn TableStore>,
}

impl ProfileStore {
    pub fn new(tables: Arc<dyn TableStore>) -> Self {
        Self { tables }
    }

    /// The user row, `None` when there is none
    pub async fn user(&self, user_id: &str) -> Result<Option<User>, DbError> {
        match self
            .tables
            .select_single(USERS_TABLE, "id,email,username", &[eq("id", user_id)])
            .await
        {
            Ok(row) => serde_json::from_value(Value::Object(row))
                .map(Some)
                .map_err(|e| DbError::Decode(e.to_string())),
            Err(err) if err.is_no_rows() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Stored username, `None` when the user row is absent or has none
    pub async fn username(&self, user_id: &str) -> Result<Option<String>, DbError> {
        let user = self.user(user_id).await?;
        Ok(user
            .and_then(|u| u.username)
            .filter(|name| !name.trim().is_empty()))
    }

    pub async fn profile(&self, user_id: &str) -> Result<Option<Profile>, DbError> {
        match self
            .tables
            .select_single(PROFILES_TABLE, "*", &[eq("user_id", user_id)])
            .await
        {
            Ok(row) => serde_json::from_value(Value::Object(row))
                .map(Some)
                .map_err(|e| DbError::Decode(e.to_string())),
            Err(err) if err.is_no_rows() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Upsert the owning user row, then the profile row.
    pub async fn save(&self, user: &User, profile_row: Row) -> Result<UpsertOutcome, ProfileStoreError> {
        self.tables
            .upsert(USERS_TABLE, user.to_row(), "id")
            .await
            .map_err(ProfileStoreError::User)?;

        let outcome = resilient_upsert(self.tables.as_ref(), PROFILES_TABLE, profile_row, "user_id").await?;
        info!("Saved profile for {}", user.id);
        Ok(outcome)
    }

    /// Record a newly signed-up account. An existing row is fine.
    pub async fn register_user(&self, user: &User) -> Result<(), DbError> {
        match self.tables.insert(USERS_TABLE, user.to_row()).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_unique_violation() => {
                debug!("User row for {} already exists", user.id);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    pub async fn set_avatar_url(&self, user_id: &str, url: &str) -> Result<(), DbError> {
        let mut patch = Row::new();
        patch.insert("avatar_url".into(), Value::String(url.to_string()));
        self.tables
            .update(PROFILES_TABLE, patch, &[eq("user_id", user_id)])
            .await?;
        Ok(())
    }
}
