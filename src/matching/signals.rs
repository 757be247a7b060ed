//! Product signal extraction for the weighted scorer.
//!
//! Signals are generic rules rather than per-product-line tables: model
//! codes, unit-bearing numbers, bare big numbers, years, and name+number
//! pairs. Two titles describing the same product agree on these; two
//! titles describing neighbors in a lineup disagree.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::normalize::resources::MODEL_CODE_BLACKLIST;
use crate::normalize::{clean_product_name, split_kr_en_boundary};

static MIXED_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9\-_]{2,}$").expect("mixed code regex")
});
static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").expect("year signal regex"));
static BIG_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{3,6}\b").expect("big number regex"));
static CHIP_SET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)M\s*(\d+)").expect("chip set regex"));
static SCREEN_SIZE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b(1[0-7])(?:\s*인치|\s*inch|\s*")?"#).expect("screen size regex")
});
static UNIT_NUMBER_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"(?i)\b\d{1,3}(?:\.\d+)?\s*(?:인치|inch|"|형)\b"#,
        r"(?i)\b\d{1,4}(?:\.\d+)?\s*(?:GB|TB|MB|KB)\b",
        r"(?i)\b\d{1,4}(?:\.\d+)?\s*(?:Hz|kHz|MHz|GHz)\b",
        r"\b\d{1,4}(?:\.\d+)?\s*(?:W|w)\b",
        r"(?i)\b\d{1,4}(?:\.\d+)?\s*(?:cm|mm)\b",
        r"(?i)\b\d{1,4}(?:\.\d+)?\s*(?:kg|g)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("unit number regex"))
    .collect()
});
static NAMED_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Za-z가-힣]{2,}(?:\s+[A-Za-z가-힣]{2,})?)\s*(\d{1,2})\b")
        .expect("named number regex")
});
static SPACES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("spaces regex"));

const NAMED_NUMBER_STOPWORDS: [&str; 10] = [
    "win", "windows", "홈", "home", "pro", "프로", "정품", "리퍼", "새제품", "중고",
];

/// Signals extracted from one title.
#[derive(Debug, Default, Clone)]
pub struct ProductSignals {
    pub years: HashSet<u32>,
    pub model_codes: HashSet<String>,
    pub unit_numbers: HashSet<String>,
    pub big_numbers: HashSet<String>,
    pub named_numbers: HashMap<String, HashSet<String>>,
}

/// Model-code candidates: mixed alphanumeric tokens of length ≥ 3 carrying
/// at least one digit and one letter, excluding OS/spec vocabulary.
#[must_use]
pub fn extract_model_codes(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let normalized = split_kr_en_boundary(&clean_product_name(text));
    let mut seen = HashSet::new();
    let mut codes = Vec::new();
    for token in normalized.split_whitespace() {
        if MODEL_CODE_BLACKLIST.contains(&token) {
            continue;
        }
        let has_digit = token.chars().any(|c| c.is_ascii_digit());
        let has_alpha = token.chars().any(|c| c.is_ascii_alphabetic());
        if has_digit && has_alpha && MIXED_CODE_RE.is_match(token) && seen.insert(token.to_string())
        {
            codes.push(token.to_string());
        }
    }
    codes
}

/// Extract all matching signals from a title.
#[must_use]
pub fn extract_product_signals(text: &str) -> ProductSignals {
    if text.is_empty() {
        return ProductSignals::default();
    }
    let normalized = split_kr_en_boundary(&clean_product_name(text));

    let years = YEAR_RE
        .captures_iter(&normalized)
        .filter_map(|c| c[1].parse().ok())
        .collect();

    let model_codes = extract_model_codes(&normalized).into_iter().collect();

    let mut unit_numbers = HashSet::new();
    for re in UNIT_NUMBER_RES.iter() {
        for m in re.find_iter(&normalized) {
            unit_numbers.insert(SPACES_RE.replace_all(m.as_str(), "").to_lowercase());
        }
    }

    let big_numbers = BIG_NUMBER_RE
        .find_iter(&normalized)
        .map(|m| m.as_str().to_string())
        .collect();

    let mut named_numbers: HashMap<String, HashSet<String>> = HashMap::new();
    for cap in NAMED_NUMBER_RE.captures_iter(&normalized) {
        let key = SPACES_RE.replace_all(cap[1].trim(), " ").to_lowercase();
        if key.is_empty() || NAMED_NUMBER_STOPWORDS.contains(&key.as_str()) {
            continue;
        }
        named_numbers
            .entry(key)
            .or_default()
            .insert(cap[2].to_string());
    }

    ProductSignals {
        years,
        model_codes,
        unit_numbers,
        big_numbers,
        named_numbers,
    }
}

/// Chip generation tokens (`M\d+`), as bare numbers.
#[must_use]
pub fn extract_chip_set(text: &str) -> HashSet<String> {
    CHIP_SET_RE
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect()
}

/// Screen-size tokens (10–17, optional unit suffix).
#[must_use]
pub fn extract_screen_sizes(text: &str) -> HashSet<String> {
    SCREEN_SIZE_RE
        .captures_iter(&text.to_lowercase())
        .map(|c| c[1].to_string())
        .collect()
}
