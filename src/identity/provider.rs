// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

//! Server-side calls to the identity provider's authentication API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::config::IdentityConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignupResult {
    #[serde(default, rename = "_id", alias = "user_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
}

impl SignupResult {
    /// Subject identifier (`auth0|<id>`) the new account will log in as
    pub fn subject(&self) -> Option<String> {
        self.id.as_ref().map(|id| {
            if id.contains('|') {
                id.clone()
            } else {
                format!("auth0|{}", id)
            }
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("identity provider rejected the request ({status}): {description}")]
    Rejected {
        status: u16,
        error: Option<String>,
        description: String,
    },

    #[error("identity provider unreachable: {0}")]
    Transport(String),

    #[error("identity provider is not configured")]
    NotConfigured,
}

impl ProviderError {
    pub fn is_invalid_grant(&self) -> bool {
        matches!(self, Self::Rejected { error: Some(e), .. } if e == "invalid_grant")
    }

    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Rejected { error, .. } => error.as_deref(),
            _ => None,
        }
    }

    pub fn description(&self) -> String {
        match self {
            Self::Rejected { description, .. } => description.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    error_description: Option<String>,
    code: Option<String>,
    description: Option<String>,
    message: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resource-owner password grant
    async fn password_grant(&self, username: &str, password: &str) -> Result<TokenSet, ProviderError>;

    /// Database-connection signup
    async fn signup(&self, request: &SignupRequest) -> Result<SignupResult, ProviderError>;
}

/// Auth0 authentication API client
pub struct Auth0Client {
    http: Client,
    base_url: String,
    config: IdentityConfig,
}

impl Auth0Client {
    pub fn new(config: IdentityConfig) -> Self {
        let base_url = format!("https://{}", config.domain);
        Self::with_base_url(config, &base_url)
    }

    /// Client for a tenant served somewhere other than `https://<domain>`
    pub fn with_base_url(config: IdentityConfig, base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post<T>(&self, path: &str, body: serde_json::Value) -> Result<T, ProviderError>
    where
        T: for<'de> Deserialize<'de>,
    {
        if !self.config.is_configured() {
            return Err(ProviderError::NotConfigured);
        }

        let response = self
            .http
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ProviderError::Transport(e.to_string()));
        }

        let text = response.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
        let error = body.error.or(body.code);
        let description = body
            .error_description
            .or(body.description)
            .or(body.message)
            .or_else(|| error.clone())
            .unwrap_or(text);

        debug!("Identity provider {} returned {}: {}", path, status, description);
        Err(ProviderError::Rejected {
            status: status.as_u16(),
            error,
            description,
        })
    }
}

#[async_trait]
impl IdentityProvider for Auth0Client {
    async fn password_grant(&self, username: &str, password: &str) -> Result<TokenSet, ProviderError> {
        let body = json!({
            "client_id": self.config.client_id,
            "client_secret": self.config.client_secret,
            "audience": self.config.audience_or_default(),
            "grant_type": "password",
            "username": username,
            "password": password,
            "connection": self.config.connection,
            "scope": "openid profile email",
        });

        self.post("oauth/token", body).await
    }

    async fn signup(&self, request: &SignupRequest) -> Result<SignupResult, ProviderError> {
        let mut body = json!({
            "client_id": self.config.client_id,
            "email": request.email,
            "password": request.password,
            "connection": self.config.connection,
            "user_metadata": {},
        });
        if let Some(username) = &request.username {
            body["username"] = json!(username);
        }

        self.post("dbconnections/signup", body).await
    }
}
