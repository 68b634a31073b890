// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Multipart, State},
    http::{header, Request},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::api::routes::{present, read_json, ApiResponse, RequestLocale};
use crate::api::AppState;
use crate::error::ApiError;
use crate::locale::Locale;
use crate::services::{replace_avatar, AvatarError, AvatarImage};

/// Legacy JSON upload body
#[derive(Debug, Default, Deserialize)]
struct DataUrlUpload {
    user_id: Option<String>,
    #[serde(rename = "dataUrl")]
    data_url: Option<String>,
    filename: Option<String>,
}

fn unreadable_body(locale: Locale) -> ApiError {
    ApiError::validation("invalid_request", locale.messages().empty_body)
}

fn missing_fields(locale: Locale) -> ApiError {
    ApiError::validation("missing_fields", locale.messages().missing_fields)
}

async fn read_multipart(
    request: Request<Body>,
    state: &AppState,
    locale: Locale,
) -> Result<(String, AvatarImage), ApiError> {
    let mut multipart = Multipart::from_request(request, state).await.map_err(|e| {
        debug!("Rejected multipart body: {}", e);
        unreadable_body(locale)
    })?;

    let mut user_id = None;
    let mut image = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("Failed to read multipart field: {}", e);
        unreadable_body(locale)
    })? {
        if field.file_name().is_some() || field.name() == Some("file") {
            let filename = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(|e| {
                warn!("Failed to read uploaded file: {}", e);
                unreadable_body(locale)
            })?;
            image = Some(AvatarImage {
                bytes: bytes.to_vec(),
                filename,
                content_type,
            });
        } else if field.name() == Some("user_id") {
            let value = field.text().await.map_err(|_| unreadable_body(locale))?;
            user_id = Some(value);
        }
    }

    match (present(&user_id), image) {
        (Some(user_id), Some(image)) => Ok((user_id.to_string(), image)),
        _ => Err(missing_fields(locale)),
    }
}

async fn read_data_url(
    request: Request<Body>,
    state: &AppState,
    locale: Locale,
) -> Result<(String, AvatarImage), ApiError> {
    let body = Bytes::from_request(request, state).await.map_err(|e| {
        debug!("Rejected upload body: {}", e);
        unreadable_body(locale)
    })?;
    let upload: DataUrlUpload = read_json(&body, locale)?
        .ok_or_else(|| ApiError::validation("empty_body", locale.messages().empty_body))?;

    let (Some(user_id), Some(data_url)) = (present(&upload.user_id), present(&upload.data_url)) else {
        return Err(missing_fields(locale));
    };
    let image = AvatarImage::from_data_url(data_url, upload.filename.clone()).map_err(|_| {
        ApiError::validation("invalid_dataurl", locale.messages().invalid_dataurl)
    })?;
    Ok((user_id.to_string(), image))
}

/// Replace the caller's avatar. Accepts `multipart/form-data` with a file part
/// and a `user_id` field, or JSON carrying a base64 data URL.
pub async fn upload_avatar(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
    request: Request<Body>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let messages = locale.messages();
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map_or(false, |value| value.starts_with("multipart/form-data"));

    let (user_id, image) = if is_multipart {
        read_multipart(request, &state, locale).await?
    } else {
        read_data_url(request, &state, locale).await?
    };

    let db = state.database(locale)?;
    let outcome = replace_avatar(db, &user_id, image, Utc::now().timestamp_millis())
        .await
        .map_err(|err| match err {
            AvatarError::Upload(e) => {
                ApiError::database("storage_upload_failed", messages.storage_upload_failed, &e)
            }
            AvatarError::InvalidDataUrl => {
                ApiError::validation("invalid_dataurl", messages.invalid_dataurl)
            }
        })?;

    let response = ApiResponse::success(json!({
        "url": outcome.public_url,
        "path": outcome.path,
    }));

    Ok(Json(match outcome.profile_update_error {
        Some(e) => response
            .with_message(messages.profile_update_failed)
            .with_warning("profile_update_failed", Some(e.to_details())),
        None => response.with_message(messages.avatar_uploaded),
    }))
}
