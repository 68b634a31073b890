// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::db::Row;
use crate::labels::{language_code, normalize_country_code};

/// Native language written when a save omits it
pub const DEFAULT_NATIVE_LANGUAGE: &str = "ja";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestItem {
    pub id: i64,
    pub name: String,
}

/// Stored profile row. Deserialization is lenient: blank codes are dropped
/// from the language lists and malformed interest entries are skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub native_language: Option<String>,
    #[serde(default, deserialize_with = "lenient_codes")]
    pub spoken_languages: Vec<String>,
    #[serde(default, deserialize_with = "lenient_codes")]
    pub learning_languages: Vec<String>,
    #[serde(default)]
    pub residence: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default, deserialize_with = "lenient_interests")]
    pub interests: Vec<InterestItem>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Profile {
    /// Whether the user has filled in anything beyond the defaults
    pub fn is_complete(&self) -> bool {
        self.major.is_some()
            || self.gender.is_some()
            || self.residence.is_some()
            || self.comment.is_some()
            || !self.spoken_languages.is_empty()
            || !self.learning_languages.is_empty()
    }
}

fn lenient_codes<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Option<String>>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .filter(|code| !code.trim().is_empty())
        .collect())
}

fn lenient_interests<'de, D>(deserializer: D) -> Result<Vec<InterestItem>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(match raw {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}

/// Profile as served to the front end: stored codes, blank strings as null
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileView {
    pub username: Option<String>,
    pub major: Option<String>,
    pub gender: Option<String>,
    pub native_language: Option<String>,
    pub spoken_languages: Vec<String>,
    pub learning_languages: Vec<String>,
    pub residence: Option<String>,
    pub comment: Option<String>,
    pub interests: Vec<InterestItem>,
    pub avatar_url: Option<String>,
}

impl ProfileView {
    /// `profile` is `None` for a user who has never saved one.
    pub fn new(username: Option<String>, profile: Option<&Profile>) -> Self {
        let username = non_empty(&username);
        match profile {
            Some(p) => Self {
                username,
                major: non_empty(&p.major),
                gender: non_empty(&p.gender),
                native_language: non_empty(&p.native_language),
                spoken_languages: p.spoken_languages.clone(),
                learning_languages: p.learning_languages.clone(),
                residence: non_empty(&p.residence),
                comment: non_empty(&p.comment),
                interests: p.interests.clone(),
                avatar_url: non_empty(&p.avatar_url),
            },
            None => Self {
                username,
                major: None,
                gender: None,
                native_language: None,
                spoken_languages: Vec::new(),
                learning_languages: Vec::new(),
                residence: None,
                comment: None,
                interests: Vec::new(),
                avatar_url: None,
            },
        }
    }
}

/// Body of a profile save
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileInput {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub major: Option<String>,
    pub gender: Option<String>,
    pub native_language: Option<String>,
    pub spoken_languages: Option<Vec<String>>,
    pub learning_languages: Option<Vec<String>>,
    pub residence: Option<String>,
    pub comment: Option<String>,
    pub interests: Option<Vec<InterestItem>>,
}

/// Canonical codes, blanks dropped, first occurrence kept.
fn language_set(values: &[String]) -> Vec<String> {
    let mut codes: Vec<String> = Vec::new();
    for value in values {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let code = language_code(value)
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string());
        if !codes.contains(&code) {
            codes.push(code);
        }
    }
    codes
}

impl ProfileInput {
    /// Row for the `profiles` table. Only fields present in the input are
    /// written, except `native_language`, which falls back to
    /// [`DEFAULT_NATIVE_LANGUAGE`].
    pub fn profile_row(&self, user_id: &str, now: DateTime<Utc>) -> Row {
        let mut row = Row::new();
        row.insert("user_id".into(), Value::String(user_id.to_string()));

        let mut put_text = |column: &str, value: &Option<String>| {
            if let Some(v) = value {
                let v = v.trim();
                let stored = if v.is_empty() {
                    Value::Null
                } else {
                    Value::String(v.to_string())
                };
                row.insert(column.to_string(), stored);
            }
        };
        put_text("major", &self.major);
        put_text("gender", &self.gender);
        put_text("comment", &self.comment);

        let native = non_empty(&self.native_language)
            .map(|lang| language_code(&lang).map(str::to_string).unwrap_or(lang))
            .unwrap_or_else(|| DEFAULT_NATIVE_LANGUAGE.to_string());
        row.insert("native_language".into(), Value::String(native));

        if let Some(residence) = &self.residence {
            let residence = residence.trim();
            let stored = if residence.is_empty() {
                Value::Null
            } else {
                Value::String(
                    normalize_country_code(Some(residence)).unwrap_or_else(|| residence.to_string()),
                )
            };
            row.insert("residence".into(), stored);
        }

        if let Some(spoken) = &self.spoken_languages {
            row.insert("spoken_languages".into(), Value::from(language_set(spoken)));
        }
        if let Some(learning) = &self.learning_languages {
            row.insert("learning_languages".into(), Value::from(language_set(learning)));
        }
        if let Some(interests) = &self.interests {
            row.insert(
                "interests".into(),
                serde_json::to_value(interests).unwrap_or(Value::Array(Vec::new())),
            );
        }

        row.insert("updated_at".into(), Value::String(now.to_rfc3339()));
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lenient_row_parsing() {
        let profile: Profile = serde_json::from_value(json!({
            "user_id": "auth0|1",
            "spoken_languages": ["en", null, ""],
            "learning_languages": null,
            "interests": [{"id": 1, "name": "music"}, {"bogus": true}],
        }))
        .unwrap();

        assert_eq!(profile.spoken_languages, vec!["en".to_string()]);
        assert!(profile.learning_languages.is_empty());
        assert_eq!(profile.interests.len(), 1);
        assert!(profile.is_complete());
    }

    #[test]
    fn empty_profile_is_incomplete() {
        let profile = Profile {
            user_id: "auth0|1".into(),
            native_language: Some("ja".into()),
            ..Default::default()
        };
        assert!(!profile.is_complete());
    }

    #[test]
    fn view_blanks_become_null() {
        let profile = Profile {
            user_id: "u".into(),
            major: Some("".into()),
            gender: Some("female".into()),
            ..Default::default()
        };
        let view = ProfileView::new(Some("kanako".into()), Some(&profile));
        assert_eq!(view.major, None);
        assert_eq!(view.gender.as_deref(), Some("female"));

        let view = ProfileView::new(Some("kanako".into()), None);
        assert!(view.interests.is_empty());
        assert_eq!(view.native_language, None);
    }

    #[test]
    fn row_defaults_native_language_and_normalizes() {
        let input = ProfileInput {
            residence: Some("日本".into()),
            spoken_languages: Some(vec!["英語".into(), "en".into(), " ".into(), "zh".into()]),
            ..Default::default()
        };
        let row = input.profile_row("auth0|1", Utc::now());

        assert_eq!(row["native_language"], "ja");
        assert_eq!(row["residence"], "JP");
        assert_eq!(row["spoken_languages"], json!(["en", "zh"]));
        assert!(!row.contains_key("major"));
        assert!(!row.contains_key("interests"));
    }
}
