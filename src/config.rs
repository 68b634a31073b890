// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub identity: IdentityConfig,
    pub database: Option<DatabaseConfig>,
    pub backend: BackendConfig,
    pub translation: TranslationConfig,
    pub signup: SignupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    pub max_upload_bytes: usize,
}

/// Identity provider (Auth0 tenant) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub domain: String,
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: String,
    pub audience: Option<String>,
    pub connection: String,
}

impl IdentityConfig {
    pub fn is_configured(&self) -> bool {
        !self.domain.is_empty() && !self.client_id.is_empty()
    }

    /// Configured audience, or the tenant's management API when unset
    pub fn audience_or_default(&self) -> String {
        self.audience
            .clone()
            .unwrap_or_else(|| format!("https://{}/api/v2/", self.domain))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(skip_serializing)]
    pub service_key: String,
}

/// Upstream chat/search API consumed by the client module
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub api_base_url: String,
    pub ws_host: String,
    pub ws_secure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    pub api_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupConfig {
    /// Required email suffix, including the `@`
    pub email_suffix: String,
    pub min_password_length: usize,
}

impl Config {
    /// Load configuration from the process environment (and `.env`)
    pub fn init() -> Result<Self> {
        // Load .env file if present
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database = match (var("SUPABASE_URL"), var("SUPABASE_SERVICE_ROLE_KEY")) {
            (Some(url), Some(service_key)) => Some(DatabaseConfig { url, service_key }),
            _ => None,
        };

        let identity = IdentityConfig {
            domain: var("AUTH0_DOMAIN").unwrap_or_default(),
            client_id: var("AUTH0_CLIENT_ID").unwrap_or_default(),
            client_secret: var("AUTH0_CLIENT_SECRET").unwrap_or_default(),
            audience: var("AUTH0_AUDIENCE"),
            connection: var("AUTH0_CONNECTION")
                .unwrap_or_else(|| "Username-Password-Authentication".to_string()),
        };
        if !identity.is_configured() {
            warn!("AUTH0_DOMAIN or AUTH0_CLIENT_ID not set; login and signup will fail");
        }

        let email_domain = var("SIGNUP_EMAIL_DOMAIN").unwrap_or_else(|| "ed.ritsumei.ac.jp".to_string());

        let config = Config {
            server: ServerConfig {
                host: var("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
                port: parse_or(&var, "SERVER_PORT", 3000)?,
                enable_cors: parse_or(&var, "ENABLE_CORS", true)?,
                max_upload_bytes: parse_or(&var, "MAX_UPLOAD_BYTES", 5 * 1024 * 1024)?,
            },
            identity,
            database,
            backend: BackendConfig {
                api_base_url: var("API_BASE_URL")
                    .unwrap_or_else(|| "http://localhost:8080".to_string())
                    .trim_end_matches('/')
                    .to_string(),
                ws_host: var("WS_HOST").unwrap_or_else(|| "localhost:8080".to_string()),
                ws_secure: parse_or(&var, "WS_SECURE", false)?,
            },
            translation: TranslationConfig {
                api_url: var("TRANSLATE_API_URL")
                    .unwrap_or_else(|| "https://api.mymemory.translated.net".to_string()),
            },
            signup: SignupConfig {
                email_suffix: format!("@{}", email_domain.trim_start_matches('@')),
                min_password_length: parse_or(&var, "MIN_PASSWORD_LENGTH", 8)?,
            },
        };

        info!(
            "Configuration loaded (database configured: {})",
            config.database.is_some()
        );
        Ok(config)
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{} must be a valid value, got {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.server.port, 3000);
        assert!(config.database.is_none());
        assert_eq!(config.signup.email_suffix, "@ed.ritsumei.ac.jp");
        assert_eq!(config.identity.connection, "Username-Password-Authentication");
    }

    #[test]
    fn database_needs_both_variables() {
        let config = config_from(&[("SUPABASE_URL", "https://x.supabase.co")]).unwrap();
        assert!(config.database.is_none());

        let config = config_from(&[
            ("SUPABASE_URL", "https://x.supabase.co"),
            ("SUPABASE_SERVICE_ROLE_KEY", "secret"),
        ])
        .unwrap();
        assert_eq!(config.database.unwrap().url, "https://x.supabase.co");
    }

    #[test]
    fn audience_defaults_to_management_api() {
        let config = config_from(&[("AUTH0_DOMAIN", "tenant.auth0.com")]).unwrap();
        assert_eq!(
            config.identity.audience_or_default(),
            "https://tenant.auth0.com/api/v2/"
        );
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(config_from(&[("SERVER_PORT", "eighty")]).is_err());
    }
}
