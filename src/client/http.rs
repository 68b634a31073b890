// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::ClientError;
use crate::config::BackendConfig;
use crate::identity::TokenSource;

/// Bearer-authenticated JSON client for the upstream chat/search API.
pub struct ApiClient {
    http: Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl ApiClient {
    pub fn new(config: &BackendConfig, tokens: Arc<dyn TokenSource>) -> Result<Self> {
        let http = Client::builder()
            .build()
            .context("Failed to build HTTP client for the upstream API")?;
        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Current access token, or [`ClientError::NoToken`]
    pub async fn token(&self) -> Result<String, ClientError> {
        self.tokens.access_token().await.ok_or(ClientError::NoToken)
    }

    pub fn current_user_id(&self) -> Option<String> {
        self.tokens.current_user_id()
    }

    pub fn get(&self, path: &str, token: &str) -> RequestBuilder {
        self.http.get(self.url(path)).bearer_auth(token)
    }

    pub fn post(&self, path: &str, token: &str) -> RequestBuilder {
        self.http.post(self.url(path)).bearer_auth(token)
    }

    /// Unauthenticated GET, used for reachability probes
    pub fn get_anonymous(&self, path: &str) -> RequestBuilder {
        self.http.get(self.url(path))
    }

    /// Send `request` and decode a successful JSON answer.
    pub async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = self.execute(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Send `request`, turning non-2xx answers into [`ClientError::Status`].
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(e, &self.base_url))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!("Upstream answered {} with body {:?}", status, body);
        Err(ClientError::Status {
            status: status.as_u16(),
            message: error_detail(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string()),
        })
    }
}

/// Best human-readable detail in an error body: its `error` or `message`
/// field when JSON, the raw text otherwise.
fn error_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(json) => ["error", "message", "detail"]
            .iter()
            .find_map(|key| json.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .or_else(|| Some(body.to_string())),
        Err(_) => Some(body.to_string()),
    }
}
