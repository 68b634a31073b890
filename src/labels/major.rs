// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

use crate::locale::Locale;

/// `(code, japanese label, english label)`. `economics` and `engineering` are
/// retired codes that still appear on older profiles.
const MAJORS: &[(&str, &str, &str)] = &[
    ("business", "経営学部", "College of Business Administration"),
    ("economics", "経営学部", "College of Business Administration"),
    ("production_science", "政策科学部", "College of Policy Science"),
    ("information_science", "情報理工学部", "College of Information Science and Engineering"),
    ("engineering", "情報理工学部", "College of Information Science and Engineering"),
    ("film_studies", "映像学部", "College of Image Arts and Sciences"),
    ("psychology", "総合心理学部", "College of Comprehensive Psychology"),
    ("global_liberal_arts", "グローバル教養学部", "College of Global Liberal Arts"),
];

/// Display label for a major code. Labels in either locale are accepted as
/// input; anything unmapped comes back unchanged.
pub fn major_label(major: Option<&str>, locale: Locale) -> String {
    let Some(raw) = major.map(str::trim).filter(|s| !s.is_empty()) else {
        return String::new();
    };

    MAJORS
        .iter()
        .find(|(code, ja, en)| *code == raw || *ja == raw || *en == raw)
        .map(|(_, ja, en)| match locale {
            Locale::Ja => ja.to_string(),
            Locale::En => en.to_string(),
        })
        .unwrap_or_else(|| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_codes_share_labels() {
        assert_eq!(major_label(Some("economics"), Locale::Ja), "経営学部");
        assert_eq!(
            major_label(Some("engineering"), Locale::En),
            major_label(Some("information_science"), Locale::En)
        );
    }

    #[test]
    fn label_input_is_translated() {
        assert_eq!(major_label(Some("映像学部"), Locale::En), "College of Image Arts and Sciences");
        assert_eq!(major_label(Some("astrology"), Locale::En), "astrology");
    }
}
