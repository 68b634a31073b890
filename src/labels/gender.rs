// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use once_cell::sync::Lazy;
use regex::Regex;

use crate::locale::Locale;

const GENDERS: &[(&str, &str, &str)] = &[
    ("male", "男性", "Male"),
    ("female", "女性", "Female"),
    ("other", "その他", "Other"),
];

static GENDER_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(male|female|other)\b").expect("gender pattern is valid"));

/// Display label for a stored gender value such as `male`, `"male（男性）"`
/// or an already-translated label. Unmapped input comes back unchanged.
pub fn gender_label(gender: Option<&str>, locale: Locale) -> String {
    let Some(raw) = gender.map(str::trim).filter(|s| !s.is_empty()) else {
        return String::new();
    };

    let label_of = |entry: &(&str, &str, &str)| match locale {
        Locale::Ja => entry.1.to_string(),
        Locale::En => entry.2.to_string(),
    };

    if let Some(entry) = GENDERS.iter().find(|(_, ja, en)| *ja == raw || *en == raw) {
        return label_of(entry);
    }

    let lower = raw.to_lowercase();
    GENDER_CODE
        .captures(&lower)
        .and_then(|caps| caps.get(1))
        .and_then(|m| GENDERS.iter().find(|(code, _, _)| *code == m.as_str()))
        .map(label_of)
        .unwrap_or_else(|| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_codes_and_decorated_values() {
        assert_eq!(gender_label(Some("female"), Locale::Ja), "女性");
        assert_eq!(gender_label(Some("Male"), Locale::En), "Male");
        assert_eq!(gender_label(Some("男性(male)"), Locale::En), "Male");
        assert_eq!(gender_label(Some("その他"), Locale::En), "Other");
    }

    #[test]
    fn unmapped_passes_through() {
        assert_eq!(gender_label(Some("nonbinary"), Locale::Ja), "nonbinary");
        assert_eq!(gender_label(None, Locale::Ja), "");
    }
}
