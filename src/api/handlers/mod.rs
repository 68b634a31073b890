// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

pub mod auth;
pub mod chat_interest;
pub mod health;
pub mod profiles;
pub mod translate;
pub mod upload;
pub mod users;
