// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::{json, Value};

use crate::api::routes::{ApiResponse, RequestLocale, UserIdQuery};
use crate::api::AppState;
use crate::error::ApiError;
use crate::services::ProfileStore;

/// Username for a subject id; null when unknown or when no database is set up
pub async fn get_username(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let user_id = query.require(locale)?;

    let username = match &state.database {
        Some(db) => ProfileStore::new(db.tables.clone())
            .username(user_id)
            .await
            .map_err(|e| {
                ApiError::database("username_fetch_failed", locale.messages().database_error, &e)
            })?,
        None => None,
    };

    Ok(Json(ApiResponse::success(json!({ "username": username }))))
}
