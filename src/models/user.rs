// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::Row;

/// Longest username the identity provider's database connection accepts
pub const MAX_USERNAME_CHARS: usize = 15;

/// Account row keyed by the identity provider's subject id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub username: Option<String>,
}

impl User {
    /// Build a user row, deriving the username from the email's local part
    /// when none is given.
    pub fn new(id: impl Into<String>, email: Option<String>, username: Option<String>) -> Self {
        let username = username
            .filter(|u| !u.trim().is_empty())
            .or_else(|| email.as_deref().map(default_username));
        Self {
            id: id.into(),
            email,
            username,
        }
    }

    /// Columns to write; absent fields are left out so an upsert does not
    /// null out what is already stored.
    pub fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), Value::String(self.id.clone()));
        if let Some(email) = &self.email {
            row.insert("email".into(), Value::String(email.clone()));
        }
        if let Some(username) = &self.username {
            row.insert("username".into(), Value::String(username.clone()));
        }
        row
    }
}

/// Part of an email address before the `@` (the whole string if there is none)
pub fn local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

/// Username registered for an email at signup: the local part, cut to
/// [`MAX_USERNAME_CHARS`].
pub fn default_username(email: &str) -> String {
    local_part(email).chars().take(MAX_USERNAME_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_defaults_to_local_part() {
        let user = User::new("auth0|1", Some("is0707ip@ed.ritsumei.ac.jp".into()), None);
        assert_eq!(user.username.as_deref(), Some("is0707ip"));
    }

    #[test]
    fn derived_username_is_truncated() {
        let user = User::new("auth0|1", Some("averyveryverylongname@x.com".into()), None);
        assert_eq!(user.username.as_deref(), Some("averyveryverylo"));
        assert_eq!(default_username("短い名前@x.com"), "短い名前");
        assert_eq!(default_username("no-at-sign"), "no-at-sign");
    }

    #[test]
    fn row_omits_missing_fields() {
        let row = User::new("auth0|1", None, None).to_row();
        assert_eq!(row.len(), 1);
        assert_eq!(row["id"], "auth0|1");
    }
}
