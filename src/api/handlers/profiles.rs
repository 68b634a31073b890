// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use axum::{
    body::Bytes,
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::api::routes::{present, read_json, ApiResponse, RequestLocale, UserIdQuery};
use crate::api::AppState;
use crate::error::ApiError;
use crate::locale::Locale;
use crate::models::{Profile, ProfileInput, ProfileView, User};
use crate::services::{ProfileStore, ProfileStoreError};

fn store(state: &AppState, locale: Locale) -> Result<ProfileStore, ApiError> {
    Ok(ProfileStore::new(state.database(locale)?.tables.clone()))
}

/// Get a user's profile by subject id
pub async fn get_profile(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<ApiResponse<ProfileView>>, ApiError> {
    let messages = locale.messages();
    let user_id = query.require(locale)?;
    let store = store(&state, locale)?;

    let user = store
        .user(user_id)
        .await
        .map_err(|e| ApiError::database("user_fetch_failed", messages.database_error, &e))?
        .ok_or_else(|| ApiError::not_found("user_not_found", messages.user_not_found))?;

    let profile = store
        .profile(user_id)
        .await
        .map_err(|e| ApiError::database("profile_fetch_failed", messages.database_error, &e))?;

    Ok(Json(ApiResponse::success(ProfileView::new(
        user.username,
        profile.as_ref(),
    ))))
}

/// Save a profile, creating the user row if needed
pub async fn save_profile(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
    body: Bytes,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let messages = locale.messages();
    let input: ProfileInput = read_json(&body, locale)?
        .ok_or_else(|| ApiError::validation("empty_body", messages.empty_body))?;
    let user_id = present(&input.user_id)
        .ok_or_else(|| ApiError::validation("missing_fields", messages.missing_fields))?
        .to_string();
    let store = store(&state, locale)?;

    let user = User::new(user_id.clone(), input.email.clone(), input.username.clone());
    let row = input.profile_row(&user_id, Utc::now());
    debug!("Saving profile for {} with columns {:?}", user_id, row.keys().collect::<Vec<_>>());

    let outcome = store.save(&user, row).await.map_err(|err| match err {
        ProfileStoreError::User(e) => {
            ApiError::database("user_save_failed", messages.database_error, &e)
        }
        ProfileStoreError::Profile(e) => {
            ApiError::database("profile_save_failed", messages.database_error, &e)
        }
        ProfileStoreError::DriftExhausted { attempts, dropped, last } => {
            ApiError::database("schema_drift_exhausted", messages.schema_drift_exhausted, &last)
                .with_details(json!({
                    "attempts": attempts,
                    "dropped_columns": dropped,
                    "last_error": last.to_details(),
                }))
        }
    })?;

    let response = ApiResponse::success(json!({ "profile": outcome.row }))
        .with_message(messages.profile_saved);
    if outcome.dropped_columns.is_empty() {
        Ok(Json(response))
    } else {
        Ok(Json(response.with_warning(
            "columns_dropped",
            Some(json!({ "dropped_columns": outcome.dropped_columns })),
        )))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileCheck {
    pub has_profile: bool,
    pub has_complete_profile: bool,
    pub profile: Option<Profile>,
}

/// Whether a user has saved a profile, and whether it has any content
pub async fn check_profile(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
    Query(query): Query<UserIdQuery>,
) -> Result<Json<ApiResponse<ProfileCheck>>, ApiError> {
    let user_id = query.require(locale)?;

    let Some(db) = &state.database else {
        debug!("Database not configured; reporting no profile for {}", user_id);
        return Ok(Json(ApiResponse::success(ProfileCheck {
            has_profile: false,
            has_complete_profile: false,
            profile: None,
        })));
    };

    let profile = ProfileStore::new(db.tables.clone())
        .profile(user_id)
        .await
        .map_err(|e| {
            ApiError::database("profile_check_failed", locale.messages().database_error, &e)
        })?;

    Ok(Json(ApiResponse::success(ProfileCheck {
        has_profile: profile.is_some(),
        has_complete_profile: profile.as_ref().map_or(false, Profile::is_complete),
        profile,
    })))
}
