// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use axum::{body::Bytes, extract::State, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::api::routes::{present, read_json, ApiResponse, RequestLocale};
use crate::api::AppState;
use crate::error::ApiError;
use crate::services::translate::{detect_language, opposite_language};
use crate::services::Translation;

#[derive(Debug, Default, Deserialize)]
pub struct TranslateRequest {
    pub text: Option<String>,
    pub source_lang: Option<String>,
    pub target_lang: Option<String>,
}

/// Translate between Japanese and English. The source language is detected
/// from the text unless given; the target defaults to the other language.
pub async fn translate(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
    body: Bytes,
) -> Result<Json<ApiResponse<Translation>>, ApiError> {
    let messages = locale.messages();
    let request: TranslateRequest = read_json(&body, locale)?.unwrap_or_default();
    let text = present(&request.text)
        .ok_or_else(|| ApiError::validation("text_required", messages.text_required))?;

    let source = present(&request.source_lang)
        .map(str::to_string)
        .unwrap_or_else(|| detect_language(text).to_string());
    let target = present(&request.target_lang)
        .map(str::to_string)
        .unwrap_or_else(|| opposite_language(&source).to_string());
    debug!("Translate request {} -> {}", source, target);

    let translation = state
        .translator
        .translate(text, &source, &target)
        .await
        .map_err(|e| {
            ApiError::UpstreamData {
                code: "translation_failed",
                message: messages.translation_failed.to_string(),
                details: Some(json!({ "message": e.to_string() })),
            }
        })?;

    Ok(Json(ApiResponse::success(translation)))
}
