// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

//! Language codes and their display labels.
//!
//! Rows should hold bare codes, but hand-edited data also contains forms like
//! `"ja:日本語"` or `"日本語(ja)"`, so the lookup tolerates both.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::locale::Locale;

/// `(code, japanese label, english label)`
const LANGUAGES: &[(&str, &str, &str)] = &[
    ("ja", "日本語", "Japanese"),
    ("zh", "中国語", "Chinese"),
    ("ko", "韓国語", "Korean"),
    ("vi", "ベトナム語", "Vietnamese"),
    ("id", "インドネシア語", "Indonesian"),
    ("th", "タイ語", "Thai"),
    ("hi", "ヒンディー語", "Hindi"),
    ("bn", "ベンガル語", "Bengali"),
    ("pa", "パンジャブ語", "Punjabi"),
    ("en", "英語", "English"),
    ("fr", "フランス語", "French"),
    ("de", "ドイツ語", "German"),
    ("es", "スペイン語", "Spanish"),
    ("pt", "ポルトガル語", "Portuguese"),
    ("ru", "ロシア語", "Russian"),
    ("ar", "アラビア語", "Arabic"),
];

static SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[:：\-–—|/／]\s*").expect("separator pattern is valid"));
static EMBEDDED_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([a-z]{2})\b").expect("embedded code pattern is valid"));

fn lookup(code: &str) -> Option<&'static (&'static str, &'static str, &'static str)> {
    LANGUAGES.iter().find(|(c, _, _)| *c == code)
}

fn pick(entry: &(&'static str, &'static str, &'static str), locale: Locale) -> String {
    match locale {
        Locale::Ja => entry.1.to_string(),
        Locale::En => entry.2.to_string(),
    }
}

/// Extract the language code from a stored value, if one can be found.
pub fn language_code(lang: &str) -> Option<&'static str> {
    let raw = lang.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(entry) = LANGUAGES.iter().find(|(_, ja, en)| *ja == raw || *en == raw) {
        return Some(entry.0);
    }

    let lower = raw.to_lowercase();
    if let Some(entry) = lookup(&lower) {
        return Some(entry.0);
    }

    let head = SEPARATOR.split(raw).next().unwrap_or_default().trim().to_lowercase();
    if let Some(entry) = lookup(&head) {
        return Some(entry.0);
    }

    EMBEDDED_CODE
        .captures(&lower)
        .and_then(|caps| caps.get(1))
        .and_then(|m| lookup(m.as_str()))
        .map(|entry| entry.0)
}

/// Display label for a language value. Unmapped input comes back trimmed but
/// otherwise unchanged; `None` and blank input give an empty string.
pub fn language_label(lang: Option<&str>, locale: Locale) -> String {
    let Some(raw) = lang.map(str::trim).filter(|s| !s.is_empty()) else {
        return String::new();
    };

    match language_code(raw).and_then(lookup) {
        Some(entry) => pick(entry, locale),
        None => raw.to_string(),
    }
}

/// Labels for a list of language values, dropping blanks.
pub fn language_labels<S: AsRef<str>>(langs: &[S], locale: Locale) -> Vec<String> {
    langs
        .iter()
        .map(|lang| language_label(Some(lang.as_ref()), locale))
        .filter(|label| !label.is_empty())
        .collect()
}
