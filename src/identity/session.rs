// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

//! Client-side identity session.
//!
//! Wraps the identity SDK's reactive state in a single [`AuthSnapshot`]
//! channel. Outside a browser there is no SDK and the session reports "not
//! authenticated, not loading". Inside one, the adapter never waits longer
//! than its settle timeout for the SDK to finish loading.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, warn};

use super::token_cache::{IdentityUser, TokenCache};
use super::TokenSource;

/// How long the SDK gets to settle its loading flag before the session stops
/// reporting "loading" on its own.
pub const DEFAULT_SETTLE_TIMEOUT: Duration = Duration::from_secs(3);

/// State published by the identity SDK
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProviderState {
    pub user: Option<IdentityUser>,
    pub is_authenticated: bool,
    pub is_loading: bool,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthClientError {
    #[error("login required")]
    LoginRequired,
    #[error("identity SDK error: {0}")]
    Sdk(String),
}

/// The browser identity SDK
#[async_trait]
pub trait AuthClient: Send + Sync {
    fn state(&self) -> watch::Receiver<ProviderState>;

    async fn login_with_redirect(&self, target_url: Option<String>) -> Result<(), AuthClientError>;

    async fn logout(&self, return_to: Option<String>) -> Result<(), AuthClientError>;

    async fn access_token_silently(&self) -> Result<String, AuthClientError>;
}

/// What consumers observe
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuthSnapshot {
    pub user: Option<IdentityUser>,
    pub is_authenticated: bool,
    pub is_loading: bool,
}

/// Combines the SDK's own state with the cached-token signal.
///
/// Precedence: a settled SDK state is authoritative. While the SDK is still
/// loading, a non-expired cached token counts as authenticated. Otherwise the
/// session is loading until the SDK settles or the timeout forces it.
pub struct AuthStateResolver {
    cache: Option<Arc<dyn TokenCache>>,
}

impl AuthStateResolver {
    pub fn new(cache: Option<Arc<dyn TokenCache>>) -> Self {
        Self { cache }
    }

    pub fn resolve(&self, sdk: Option<&ProviderState>, force_settled: bool, now: DateTime<Utc>) -> AuthSnapshot {
        let Some(sdk) = sdk else {
            return AuthSnapshot::default();
        };

        if !sdk.is_loading {
            return AuthSnapshot {
                user: sdk.user.clone(),
                is_authenticated: sdk.is_authenticated,
                is_loading: false,
            };
        }

        if let Some(cached) = self
            .cache
            .as_ref()
            .and_then(|c| c.cached_token())
            .filter(|t| t.is_valid_at(now))
        {
            return AuthSnapshot {
                user: cached.user,
                is_authenticated: true,
                is_loading: false,
            };
        }

        AuthSnapshot {
            user: None,
            is_authenticated: false,
            is_loading: !force_settled,
        }
    }
}

pub struct IdentitySession {
    client: Option<Arc<dyn AuthClient>>,
    snapshot: watch::Receiver<AuthSnapshot>,
    // keeps the channel open when no watcher task owns the sender
    _publisher: Option<watch::Sender<AuthSnapshot>>,
    watcher: Option<JoinHandle<()>>,
}

impl IdentitySession {
    /// Session for a context without an identity SDK (server pre-render)
    pub fn prerender() -> Self {
        let (tx, rx) = watch::channel(AuthSnapshot::default());
        Self {
            client: None,
            snapshot: rx,
            _publisher: Some(tx),
            watcher: None,
        }
    }

    /// Session backed by a browser SDK client. Must be called inside a tokio
    /// runtime; the settle watcher runs until the session is dropped.
    pub fn attach(
        client: Arc<dyn AuthClient>,
        cache: Option<Arc<dyn TokenCache>>,
        settle_timeout: Duration,
    ) -> Self {
        let resolver = AuthStateResolver::new(cache);
        let provider = client.state();
        let current = provider.borrow().clone();
        let initial = resolver.resolve(Some(&current), false, Utc::now());
        let (tx, rx) = watch::channel(initial);

        let watcher = tokio::spawn(follow_provider(provider, resolver, tx, settle_timeout));

        Self {
            client: Some(client),
            snapshot: rx,
            _publisher: None,
            watcher: Some(watcher),
        }
    }

    pub fn is_prerender(&self) -> bool {
        self.client.is_none()
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn user(&self) -> Option<IdentityUser> {
        self.snapshot.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot.borrow().is_authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.snapshot.borrow().is_loading
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.snapshot.clone()
    }

    /// Resolves once loading is over (immediately in pre-render).
    pub async fn wait_settled(&self) -> AuthSnapshot {
        let mut rx = self.snapshot.clone();
        if rx.wait_for(|s| !s.is_loading).await.is_err() {
            debug!("Session watcher stopped before settling");
        }
        let snapshot = rx.borrow().clone();
        snapshot
    }

    pub async fn login(&self, target_url: Option<String>) {
        let Some(client) = &self.client else {
            warn!("Identity SDK is not available. Make sure you are on the client side.");
            return;
        };
        if let Err(e) = client.login_with_redirect(target_url).await {
            error!("Login redirect failed: {}", e);
        }
    }

    pub async fn logout(&self, return_to: Option<String>) {
        let Some(client) = &self.client else {
            warn!("Identity SDK is not available. Make sure you are on the client side.");
            return;
        };
        if let Err(e) = client.logout(return_to).await {
            error!("Logout failed: {}", e);
        }
    }

    /// Access token for API calls; `None` on any failure.
    pub async fn access_token(&self) -> Option<String> {
        let client = self.client.as_ref()?;
        match client.access_token_silently().await {
            Ok(token) if !token.is_empty() => Some(token),
            Ok(_) => None,
            Err(e) => {
                error!("Error getting access token: {}", e);
                None
            }
        }
    }
}

impl Drop for IdentitySession {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

#[async_trait]
impl TokenSource for IdentitySession {
    async fn access_token(&self) -> Option<String> {
        IdentitySession::access_token(self).await
    }

    fn current_user_id(&self) -> Option<String> {
        self.user().map(|u| u.sub)
    }
}

async fn follow_provider(
    mut provider: watch::Receiver<ProviderState>,
    resolver: AuthStateResolver,
    publisher: watch::Sender<AuthSnapshot>,
    settle_timeout: Duration,
) {
    let deadline = Instant::now() + settle_timeout;
    let mut forced = false;
    let mut closed = false;

    loop {
        let state = provider.borrow_and_update().clone();
        let next = resolver.resolve(Some(&state), forced, Utc::now());
        publisher.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next.clone();
                true
            }
        });

        if closed {
            break;
        }

        if next.is_loading {
            tokio::select! {
                changed = provider.changed() => {
                    if changed.is_err() {
                        debug!("Identity SDK state channel closed while loading");
                        forced = true;
                        closed = true;
                    }
                }
                _ = sleep_until(deadline) => {
                    warn!(
                        "Identity SDK did not settle within {:?}; treating session as loaded",
                        settle_timeout
                    );
                    forced = true;
                }
            }
        } else if provider.changed().await.is_err() {
            break;
        }
    }
}
