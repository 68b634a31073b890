// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use axum::{
    body::Bytes,
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::routes::{present, read_json, ApiResponse, RequestLocale};
use crate::api::AppState;
use crate::error::ApiError;
use crate::services::interest::{parse_chat_id, validate_interest};
use crate::services::{InterestService, InterestView};

#[derive(Debug, Default, Deserialize)]
pub struct InterestQuery {
    pub chat_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InterestBody {
    pub chat_id: Option<Value>,
    pub user_id: Option<Value>,
    pub interest: Option<Value>,
}

/// Non-empty scalar as text
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The caller's rating for a chat (3 when they have not rated)
pub async fn get_interest(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
    Query(query): Query<InterestQuery>,
) -> Result<Json<ApiResponse<InterestView>>, ApiError> {
    let messages = locale.messages();
    let (Some(chat_id), Some(user_id)) = (present(&query.chat_id), present(&query.user_id)) else {
        return Err(ApiError::validation(
            "missing_parameters",
            messages.interest_missing_get,
        ));
    };
    let chat_id = parse_chat_id(&Value::String(chat_id.to_string()))
        .map_err(|_| ApiError::validation("invalid_chat_id", messages.invalid_chat_id))?;

    let db = state.database(locale)?;
    let view = InterestService::new(db.tables.clone())
        .fetch(chat_id, user_id)
        .await
        .map_err(|e| ApiError::database("database_error", messages.interest_fetch_failed, &e))?;

    Ok(Json(ApiResponse::success(view)))
}

/// Store the caller's rating and refresh the chat's aggregate score
pub async fn save_interest(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
    body: Bytes,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let messages = locale.messages();
    let body: InterestBody = read_json(&body, locale)?.ok_or_else(|| {
        ApiError::validation("invalid_request", messages.empty_body)
    })?;

    let (Some(chat_id), Some(user_id), Some(interest)) = (
        body.chat_id.as_ref().filter(|v| scalar_text(v).is_some()),
        body.user_id.as_ref().and_then(scalar_text),
        body.interest.as_ref().filter(|v| !v.is_null()),
    ) else {
        return Err(ApiError::validation(
            "missing_parameters",
            messages.interest_missing_post,
        ));
    };

    let interest = validate_interest(interest)
        .map_err(|_| ApiError::validation("invalid_interest", messages.invalid_interest))?;
    let chat_id = parse_chat_id(chat_id)
        .map_err(|_| ApiError::validation("invalid_chat_id", messages.invalid_chat_id))?;

    let db = state.database(locale)?;
    let saved = InterestService::new(db.tables.clone())
        .save(chat_id, &user_id, interest, Utc::now())
        .await
        .map_err(|e| ApiError::database("database_error", messages.interest_save_failed, &e))?;

    Ok(Json(
        ApiResponse::success(json!({
            "interest": saved.row,
            "meeting_interest_score": saved.score,
        }))
        .with_message(messages.interest_saved),
    ))
}
