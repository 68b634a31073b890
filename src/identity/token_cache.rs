// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

//! Direct inspection of the identity SDK's token cache in local storage.
//!
//! The SDK writes one entry per audience/scope under
//! `@@auth0spajs@@::<client id>::<audience>::<scope>` and the decoded user
//! under `@@auth0spajs@@::<client id>::@@user@@`.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::local_store::LocalStore;

pub const CACHE_KEY_PREFIX: &str = "@@auth0spajs@@";
const USER_KEY_SUFFIX: &str = "@@user@@";

/// Claims of the signed-in user as the identity SDK exposes them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityUser {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: Option<IdentityUser>,
}

impl CachedToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && self.expires_at > now
    }
}

pub trait TokenCache: Send + Sync {
    /// Freshest cached token, expired or not
    fn cached_token(&self) -> Option<CachedToken>;
}

/// Reads the SDK's cache entries for one client id from a [`LocalStore`].
pub struct StorageTokenCache {
    store: Arc<dyn LocalStore>,
    client_id: String,
}

#[derive(Deserialize)]
struct CacheEntry {
    body: CacheBody,
    #[serde(rename = "expiresAt")]
    expires_at: i64,
}

#[derive(Deserialize)]
struct CacheBody {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default, rename = "decodedToken")]
    decoded_token: Option<DecodedToken>,
}

#[derive(Deserialize)]
struct DecodedToken {
    #[serde(default)]
    user: Option<IdentityUser>,
}

impl StorageTokenCache {
    pub fn new(store: Arc<dyn LocalStore>, client_id: impl Into<String>) -> Self {
        Self {
            store,
            client_id: client_id.into(),
        }
    }

    fn key_prefix(&self) -> String {
        format!("{}::{}::", CACHE_KEY_PREFIX, self.client_id)
    }

    fn cached_user(&self) -> Option<IdentityUser> {
        let key = format!("{}{}", self.key_prefix(), USER_KEY_SUFFIX);
        let raw = self.store.get(&key)?;
        let value: Value = serde_json::from_str(&raw).ok()?;
        let user = value.get("decodedToken")?.get("user")?.clone();
        serde_json::from_value(user).ok()
    }
}

impl TokenCache for StorageTokenCache {
    fn cached_token(&self) -> Option<CachedToken> {
        let prefix = self.key_prefix();
        let fallback_user = self.cached_user();

        self.store
            .keys()
            .into_iter()
            .filter(|key| key.starts_with(&prefix) && !key.ends_with(USER_KEY_SUFFIX))
            .filter_map(|key| {
                let raw = self.store.get(&key)?;
                match serde_json::from_str::<CacheEntry>(&raw) {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        debug!("Ignoring unreadable token cache entry {}: {}", key, e);
                        None
                    }
                }
            })
            .filter_map(|entry| {
                let access_token = entry.body.access_token?;
                let expires_at = Utc.timestamp_opt(entry.expires_at, 0).single()?;
                let user = entry
                    .body
                    .decoded_token
                    .and_then(|d| d.user)
                    .or_else(|| fallback_user.clone());
                Some(CachedToken {
                    access_token,
                    expires_at,
                    user,
                })
            })
            .max_by_key(|token| token.expires_at)
    }
}
