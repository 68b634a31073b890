// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

//! Consumers of the upstream chat/search API, as the front end uses it.

pub mod chat;
pub mod error;
pub mod guard;
pub mod http;
pub mod search;
pub mod verification;

pub use chat::{ChatListClient, ChatWithPartner};
pub use error::ClientError;
pub use guard::{GuardDecision, RouteGuard};
pub use http::ApiClient;
pub use search::{SearchClient, SearchParams, SearchUserResult};
pub use verification::{ProbeOutcome, TokenFormat, VerificationClient, VerificationStep};
