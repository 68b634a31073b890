// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

//! Japanese/English translation through the MyMemory public API.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

static JAPANESE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\u{3040}-\u{309F}\u{30A0}-\u{30FF}\u{4E00}-\u{9FAF}]")
        .expect("japanese range pattern is valid")
});

/// `ja` if the text contains kana or kanji, `en` otherwise
pub fn detect_language(text: &str) -> &'static str {
    if JAPANESE.is_match(text) {
        "ja"
    } else {
        "en"
    }
}

/// The other language of the ja/en pair
pub fn opposite_language(lang: &str) -> &'static str {
    if lang == "ja" {
        "en"
    } else {
        "ja"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub translated_text: String,
    pub source_lang: String,
    pub target_lang: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslateError {
    #[error("translation API unreachable: {0}")]
    Transport(String),

    #[error("Translation failed: {0}")]
    Status(String),
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<Translation, TranslateError>;
}

pub struct MyMemoryTranslator {
    http: Client,
    api_url: String,
}

#[derive(Deserialize)]
struct MyMemoryResponse {
    #[serde(rename = "responseStatus", default)]
    response_status: Value,
    #[serde(rename = "responseData", default)]
    response_data: Option<ResponseData>,
}

#[derive(Deserialize)]
struct ResponseData {
    #[serde(rename = "translatedText", default)]
    translated_text: Option<String>,
}

impl MyMemoryResponse {
    /// The API reports the status as a number or as a numeric string.
    fn status(&self) -> Option<u16> {
        match &self.response_status {
            Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl MyMemoryTranslator {
    pub fn new(api_url: &str) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Translator for MyMemoryTranslator {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<Translation, TranslateError> {
        let langpair = format!("{}|{}", source, target);
        debug!(
            "Translating {} chars ({})",
            text.chars().count(),
            langpair
        );

        let response = self
            .http
            .get(format!("{}/get", self.api_url))
            .query(&[("q", text), ("langpair", langpair.as_str())])
            .send()
            .await
            .map_err(|e| TranslateError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            error!("Translation API HTTP error: {}", response.status());
            return Err(TranslateError::Status(response.status().to_string()));
        }

        let body: MyMemoryResponse = response
            .json()
            .await
            .map_err(|e| TranslateError::Transport(e.to_string()))?;

        let translated = body
            .response_data
            .as_ref()
            .and_then(|d| d.translated_text.clone())
            .filter(|t| !t.is_empty());

        match (body.status(), translated) {
            (Some(200), Some(translated_text)) => Ok(Translation {
                translated_text,
                source_lang: source.to_string(),
                target_lang: target.to_string(),
            }),
            (status, _) => {
                let status = status
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "Unknown error".to_string());
                error!("Translation API returned an unusable response: {}", status);
                Err(TranslateError::Status(status))
            }
        }
    }
}
