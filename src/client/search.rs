// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use super::{ApiClient, ClientError};
use crate::models::InterestItem;

pub const SEARCH_PATH: &str = "/api/v1/search/users";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchUserResult {
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub residence: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub interests: Vec<InterestItem>,
    #[serde(default)]
    pub native_language: Option<String>,
    #[serde(default)]
    pub spoken_languages: Vec<String>,
    #[serde(default)]
    pub learning_languages: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub keyword: Option<String>,
    pub languages: Vec<String>,
    pub countries: Vec<String>,
}

impl SearchParams {
    /// Query string pairs; lists are comma-joined and empty values omitted.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(keyword) = self.keyword.as_deref().filter(|k| !k.is_empty()) {
            pairs.push(("keyword", keyword.to_string()));
        }
        if !self.languages.is_empty() {
            pairs.push(("language", self.languages.join(",")));
        }
        if !self.countries.is_empty() {
            pairs.push(("country", self.countries.join(",")));
        }
        pairs
    }
}

pub struct SearchClient {
    api: Arc<ApiClient>,
}

impl SearchClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn search_users(&self, params: &SearchParams) -> Result<Vec<SearchUserResult>, ClientError> {
        let token = self.api.token().await?;
        let request = self
            .api
            .get(SEARCH_PATH, &token)
            .query(&params.query_pairs());
        self.finish(request).await
    }

    pub async fn search_users_post(&self, params: &SearchParams) -> Result<Vec<SearchUserResult>, ClientError> {
        let token = self.api.token().await?;
        let request = self.api.post(SEARCH_PATH, &token).json(&json!({
            "keyword": params.keyword.clone().unwrap_or_default(),
            "languages": params.languages,
            "countries": params.countries,
        }));
        self.finish(request).await
    }

    async fn finish(&self, request: reqwest::RequestBuilder) -> Result<Vec<SearchUserResult>, ClientError> {
        match self.api.send::<Option<Vec<SearchUserResult>>>(request).await {
            Ok(results) => Ok(results.unwrap_or_default()),
            Err(e) => {
                error!("Search error: {}", e);
                Err(e)
            }
        }
    }
}
