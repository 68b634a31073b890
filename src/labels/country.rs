// Copyright (c) MySocial Team
// SPDX-License-Identifier: Apache-2.0

//! Country codes (ISO 3166-1 alpha-2), flag-icon codes and display names.
//!
//! Profiles store the upper-case alpha-2 code; older rows may still carry a
//! Japanese country name, which [`normalize_country_code`] converts.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use tracing::warn;

use crate::locale::Locale;

/// `(code, japanese name, english name)` for every country with a flag icon.
const COUNTRIES: &[(&str, &str, &str)] = &[
    // East Asia
    ("CN", "中国", "China"),
    ("KR", "韓国", "South Korea"),
    ("TW", "台湾", "Taiwan"),
    ("MN", "モンゴル", "Mongolia"),
    ("JP", "日本", "Japan"),
    ("HK", "香港", "Hong Kong"),
    // Southeast Asia
    ("ID", "インドネシア", "Indonesia"),
    ("VN", "ベトナム", "Vietnam"),
    ("MY", "マレーシア", "Malaysia"),
    ("MM", "ミャンマー", "Myanmar"),
    ("KH", "カンボジア", "Cambodia"),
    ("SG", "シンガポール", "Singapore"),
    ("LA", "ラオス", "Laos"),
    ("TH", "タイ", "Thailand"),
    ("PH", "フィリピン", "Philippines"),
    ("BN", "ブルネイ", "Brunei"),
    // South Asia
    ("IN", "インド", "India"),
    ("BD", "バングラディシュ", "Bangladesh"),
    ("PK", "パキスタン", "Pakistan"),
    ("NP", "ネパール", "Nepal"),
    ("LK", "スリランカ", "Sri Lanka"),
    ("MV", "モルディブ", "Maldives"),
    // Central Asia
    ("KG", "キルギス", "Kyrgyzstan"),
    ("UZ", "ウズベキスタン", "Uzbekistan"),
    ("TJ", "タジキスタン", "Tajikistan"),
    ("KZ", "カザフスタン", "Kazakhstan"),
    ("AF", "アフガニスタン", "Afghanistan"),
    // West Asia / Middle East
    ("TR", "トルコ", "Turkey"),
    ("IL", "イスラエル", "Israel"),
    ("OM", "オマーン", "Oman"),
    // Oceania
    ("AU", "オーストラリア", "Australia"),
    ("NZ", "ニュージーランド", "New Zealand"),
    // North America
    ("US", "アメリカ", "United States"),
    ("CA", "カナダ", "Canada"),
    // Central / South America
    ("MX", "メキシコ", "Mexico"),
    ("GT", "グアテマラ", "Guatemala"),
    ("PE", "ペルー", "Peru"),
    ("BR", "ブラジル", "Brazil"),
    ("CL", "チリ", "Chile"),
    ("CO", "コロンビア", "Colombia"),
    ("AR", "アルゼンチン", "Argentina"),
    // Europe
    ("GB", "イギリス", "United Kingdom"),
    ("FR", "フランス", "France"),
    ("DE", "ドイツ", "Germany"),
    ("IT", "イタリア", "Italy"),
    ("ES", "スペイン", "Spain"),
    ("CH", "スイス", "Switzerland"),
    ("UA", "ウクライナ", "Ukraine"),
    ("RU", "ロシア", "Russia"),
    ("LT", "リトアニア", "Lithuania"),
    ("SE", "スウェーデン", "Sweden"),
    ("NO", "ノルウェー", "Norway"),
    ("HU", "ハンガリー", "Hungary"),
    ("AT", "オーストリア", "Austria"),
    ("NL", "オランダ", "Netherlands"),
    ("BE", "ベルギー", "Belgium"),
    ("PL", "ポーランド", "Poland"),
    ("DK", "デンマーク", "Denmark"),
    ("FI", "フィンランド", "Finland"),
    // Africa
    ("EG", "エジプト", "Egypt"),
    ("GH", "ガーナ", "Ghana"),
    ("NG", "ナイジェリア", "Nigeria"),
    ("ET", "エチオピア", "Ethiopia"),
    ("BF", "ブルキナファソ", "Burkina Faso"),
    ("UG", "ウガンダ", "Uganda"),
    ("NA", "ナミビア", "Namibia"),
    ("MA", "モロッコ", "Morocco"),
    ("GA", "ガボン", "Gabon"),
    ("ZA", "南アフリカ", "South Africa"),
];

/// Long-form Japanese names seen in legacy rows.
const JAPANESE_ALIASES: &[(&str, &str)] = &[
    ("アメリカ合衆国", "US"),
    ("大韓民国", "KR"),
    ("中華人民共和国", "CN"),
    ("英国", "GB"),
    ("フランス共和国", "FR"),
];

struct CountryNames {
    ja: &'static str,
    en: &'static str,
}

static BY_CODE: Lazy<HashMap<&'static str, CountryNames>> = Lazy::new(|| {
    COUNTRIES
        .iter()
        .map(|&(code, ja, en)| (code, CountryNames { ja, en }))
        .collect()
});

static BY_NAME: Lazy<HashMap<String, &'static str>> = Lazy::new(|| {
    let mut names = HashMap::new();
    for (code, ja, en) in COUNTRIES {
        names.insert(ja.to_string(), *code);
        names.insert(en.to_lowercase(), *code);
    }
    for (alias, code) in JAPANESE_ALIASES {
        names.insert(alias.to_string(), *code);
    }
    names
});

fn is_alpha2(s: &str) -> bool {
    s.len() == 2 && s.chars().all(|c| c.is_ascii_alphabetic())
}

/// Flag-icon code (lower-case alpha-2) for a stored country code.
///
/// Lower-case two-letter input is assumed to already be a flag code. Unknown
/// codes give an empty string so callers can hide the icon.
pub fn flag_code_from_country_code(country_code: Option<&str>) -> String {
    let Some(code) = country_code.map(str::trim).filter(|c| !c.is_empty()) else {
        return String::new();
    };

    if is_alpha2(code) && code.chars().all(|c| c.is_ascii_lowercase()) {
        return code.to_string();
    }

    let upper = code.to_uppercase();
    if BY_CODE.contains_key(upper.as_str()) {
        upper.to_lowercase()
    } else {
        String::new()
    }
}

/// Flag-icon code for either a code or a (legacy) country name.
pub fn flag_code(country: Option<&str>) -> String {
    let Some(country) = country.map(str::trim).filter(|c| !c.is_empty()) else {
        return String::new();
    };

    if is_alpha2(country) {
        return flag_code_from_country_code(Some(country));
    }

    match normalize_country_code(Some(country)) {
        Some(code) => flag_code_from_country_code(Some(&code)),
        None => {
            warn!("Unknown country: {}", country);
            String::new()
        }
    }
}

/// Canonical upper-case alpha-2 code for a stored residence value.
///
/// Country names (Japanese, including legacy long forms, or English) are
/// looked up first because some Japanese names are two characters long. Any
/// two ASCII letters are then taken as a code regardless of case, so a flag
/// code normalises back to its country code.
pub fn normalize_country_code(country: Option<&str>) -> Option<String> {
    let country = country.map(str::trim).filter(|c| !c.is_empty())?;

    if let Some(code) = BY_NAME
        .get(country)
        .or_else(|| BY_NAME.get(&country.to_lowercase()))
    {
        return Some(code.to_string());
    }

    if is_alpha2(country) {
        return Some(country.to_ascii_uppercase());
    }

    warn!("Cannot normalize country: {}", country);
    None
}

/// Display name for a country code. Unmapped input comes back unchanged.
pub fn country_name(country_code: Option<&str>, locale: Locale) -> String {
    let Some(code) = country_code.map(str::trim).filter(|c| !c.is_empty()) else {
        return String::new();
    };

    match BY_CODE.get(code.to_uppercase().as_str()) {
        Some(names) => match locale {
            Locale::Ja => names.ja.to_string(),
            Locale::En => names.en.to_string(),
        },
        None => {
            warn!("Unknown country code: {}", code);
            code.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_code_round_trips_through_normalize() {
        for &(code, _, _) in COUNTRIES {
            let flag = flag_code_from_country_code(Some(code));
            assert_eq!(flag, code.to_lowercase());
            assert_eq!(normalize_country_code(Some(&flag)).as_deref(), Some(code));
        }
    }

    #[test]
    fn unknown_upper_case_code_has_no_flag() {
        assert_eq!(flag_code_from_country_code(Some("XX")), "");
        assert_eq!(flag_code_from_country_code(None), "");
    }

    #[test]
    fn legacy_names_normalize() {
        assert_eq!(normalize_country_code(Some("日本")).as_deref(), Some("JP"));
        assert_eq!(normalize_country_code(Some("アメリカ合衆国")).as_deref(), Some("US"));
        assert_eq!(normalize_country_code(Some("south korea")).as_deref(), Some("KR"));
        // two-character Japanese name must not be mistaken for a code
        assert_eq!(normalize_country_code(Some("タイ")).as_deref(), Some("TH"));
        assert_eq!(normalize_country_code(Some("Atlantis")), None);
    }

    #[test]
    fn flag_code_accepts_names() {
        assert_eq!(flag_code(Some("ドイツ")), "de");
        assert_eq!(flag_code(Some("FR")), "fr");
        assert_eq!(flag_code(Some("somewhere")), "");
    }

    #[test]
    fn country_name_is_total() {
        assert_eq!(country_name(Some("jp"), Locale::Ja), "日本");
        assert_eq!(country_name(Some("JP"), Locale::En), "Japan");
        assert_eq!(country_name(Some("ZZ"), Locale::En), "ZZ");
        assert_eq!(country_name(None, Locale::Ja), "");
    }
}
