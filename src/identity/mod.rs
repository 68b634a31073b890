// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

pub mod provider;
pub mod session;
pub mod token_cache;

pub use provider::{
    Auth0Client, IdentityProvider, ProviderError, SignupRequest, SignupResult, TokenSet,
};
pub use session::{
    AuthClient, AuthClientError, AuthSnapshot, AuthStateResolver, IdentitySession, ProviderState,
    DEFAULT_SETTLE_TIMEOUT,
};
pub use token_cache::{CachedToken, IdentityUser, StorageTokenCache, TokenCache};

use async_trait::async_trait;

/// Supplies bearer tokens to the API clients
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// `None` when no token can be obtained; callers treat that as signed out.
    async fn access_token(&self) -> Option<String>;

    fn current_user_id(&self) -> Option<String>;
}
