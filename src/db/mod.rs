// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

//! Managed database and object storage access.
//!
//! Tables and storage are reached through the hosted service's REST API. The
//! handlers only see the [`TableStore`] and [`ObjectStorage`] traits so the
//! HTTP client can be swapped out in tests.

mod supabase;

pub use supabase::SupabaseClient;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::DatabaseConfig;

/// A table row as exchanged with the REST API.
pub type Row = Map<String, Value>;

/// PostgREST code for "`.single()` matched zero rows".
pub const NO_ROWS_CODE: &str = "PGRST116";
/// PostgREST code for a column missing from its schema cache.
pub const UNKNOWN_COLUMN_CODE: &str = "PGRST204";
/// Postgres `undefined_column`.
pub const UNDEFINED_COLUMN_CODE: &str = "42703";
/// Postgres `unique_violation`.
pub const UNIQUE_VIOLATION_CODE: &str = "23505";

static SCHEMA_CACHE_COLUMN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Could not find the '([^']+)' column").expect("schema cache pattern is valid")
});
static UNDEFINED_COLUMN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"column "?([A-Za-z0-9_]+)"? (?:of relation "[^"]+" )?does not exist"#)
        .expect("undefined column pattern is valid")
});

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DbError {
    #[error("no rows returned")]
    NoRows,

    #[error("expected a single row, got {0}")]
    MultipleRows(usize),

    #[error("{message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
        details: Option<String>,
        hint: Option<String>,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl DbError {
    pub fn api(status: u16, code: Option<&str>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            code: code.map(str::to_string),
            message: message.into(),
            details: None,
            hint: None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::NoRows => Some(NO_ROWS_CODE),
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn is_no_rows(&self) -> bool {
        self.code() == Some(NO_ROWS_CODE)
    }

    pub fn is_unique_violation(&self) -> bool {
        self.code() == Some(UNIQUE_VIOLATION_CODE)
    }

    /// Name of the column the database rejected as unknown, if that is what
    /// this error says.
    pub fn unknown_column(&self) -> Option<String> {
        let Self::Api { code, message, .. } = self else {
            return None;
        };

        let pattern = match code.as_deref() {
            Some(UNKNOWN_COLUMN_CODE) => &*SCHEMA_CACHE_COLUMN,
            Some(UNDEFINED_COLUMN_CODE) => &*UNDEFINED_COLUMN,
            _ => return None,
        };

        pattern
            .captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// JSON form kept under `details` in error responses.
    pub fn to_details(&self) -> Value {
        match self {
            Self::Api {
                status,
                code,
                message,
                details,
                hint,
            } => json!({
                "status": status,
                "code": code,
                "message": message,
                "details": details,
                "hint": hint,
            }),
            other => json!({
                "code": other.code(),
                "message": other.to_string(),
            }),
        }
    }
}

/// Equality filter, the only filter shape the handlers need.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

pub fn eq(column: &str, value: impl ToString) -> Filter {
    Filter {
        column: column.to_string(),
        value: value.to_string(),
    }
}

#[async_trait]
pub trait TableStore: Send + Sync {
    async fn select(&self, table: &str, columns: &str, filters: &[Filter]) -> Result<Vec<Row>, DbError>;

    /// Insert or merge `row`, resolving conflicts on the comma-separated
    /// `on_conflict` columns. Returns the stored representation.
    async fn upsert(&self, table: &str, row: Row, on_conflict: &str) -> Result<Vec<Row>, DbError>;

    async fn insert(&self, table: &str, row: Row) -> Result<Vec<Row>, DbError>;

    async fn update(&self, table: &str, patch: Row, filters: &[Filter]) -> Result<Vec<Row>, DbError>;

    /// Exactly one row, or [`DbError::NoRows`] / [`DbError::MultipleRows`].
    async fn select_single(&self, table: &str, columns: &str, filters: &[Filter]) -> Result<Row, DbError> {
        let mut rows = self.select(table, columns, filters).await?;
        match rows.len() {
            0 => Err(DbError::NoRows),
            1 => Ok(rows.remove(0)),
            n => Err(DbError::MultipleRows(n)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    pub name: String,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Objects directly under `prefix` in `bucket`.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<StoredObject>, DbError>;

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), DbError>;

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
        upsert: bool,
    ) -> Result<(), DbError>;

    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// Handles to the managed database's table and storage APIs
#[derive(Clone)]
pub struct Database {
    pub tables: Arc<dyn TableStore>,
    pub storage: Arc<dyn ObjectStorage>,
}

impl Database {
    /// Create the REST client for the hosted database
    pub fn connect(config: &DatabaseConfig) -> Result<Self> {
        let client = Arc::new(SupabaseClient::new(&config.url, &config.service_key)?);
        info!("Database client ready for {}", config.url);
        Ok(Self {
            tables: client.clone(),
            storage: client,
        })
    }

    pub fn from_parts(tables: Arc<dyn TableStore>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { tables, storage }
    }
}

/// Initialize the database client, or `None` when it is not configured
pub fn init_database(config: Option<&DatabaseConfig>) -> Result<Option<Database>> {
    match config {
        Some(config) => Database::connect(config).map(Some),
        None => {
            warn!("Supabase env vars not set: SUPABASE_URL or SUPABASE_SERVICE_ROLE_KEY");
            Ok(None)
        }
    }
}
