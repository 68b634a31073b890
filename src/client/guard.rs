// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

//! Navigation guard for pages that need a signed-in user.

use std::sync::Arc;

use reqwest::Url;
use tracing::debug;

use crate::identity::{AuthSnapshot, IdentitySession};

/// Entry page unauthenticated visitors are sent to
pub const ENTRY_PATH: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Identity state still loading; no decision yet
    Pending,
    Denied { redirect_to: String },
    Allowed,
}

/// Decide one navigation from a session snapshot.
pub fn decide(snapshot: &AuthSnapshot, full_path: &str) -> GuardDecision {
    if snapshot.is_loading {
        GuardDecision::Pending
    } else if snapshot.is_authenticated {
        GuardDecision::Allowed
    } else {
        GuardDecision::Denied {
            redirect_to: login_redirect(full_path),
        }
    }
}

/// `/?redirect=<full_path>`, URL-encoded
pub fn login_redirect(full_path: &str) -> String {
    let Ok(mut url) = Url::parse("http://localhost").and_then(|base| base.join(ENTRY_PATH)) else {
        return ENTRY_PATH.to_string();
    };
    url.query_pairs_mut().append_pair("redirect", full_path);
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

pub struct RouteGuard {
    session: Arc<IdentitySession>,
}

impl RouteGuard {
    pub fn new(session: Arc<IdentitySession>) -> Self {
        Self { session }
    }

    /// Evaluate a navigation against the current state. Without an identity
    /// SDK (pre-render) the guard stays out of the way.
    pub fn check(&self, full_path: &str) -> GuardDecision {
        if self.session.is_prerender() {
            return GuardDecision::Pending;
        }
        decide(&self.session.snapshot(), full_path)
    }

    /// Wait for loading to finish, then evaluate.
    pub async fn resolve(&self, full_path: &str) -> GuardDecision {
        if self.session.is_prerender() {
            return GuardDecision::Pending;
        }
        let snapshot = self.session.wait_settled().await;
        let decision = decide(&snapshot, full_path);
        debug!("Route guard for {}: {:?}", full_path, decision);
        decision
    }
}
