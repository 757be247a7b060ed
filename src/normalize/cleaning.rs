//! Low-level text cleaning for scraped product titles.
//!
//! Titles arrive from shopping pages with promotional brackets, UI button
//! text, and Hangul/Latin runs glued together. These helpers are pure and
//! shared by the normalizer, the match scorer, and the parsers.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static CHIP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)M\s*(\d+)").expect("chip regex is valid"));
static BRACKET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(.*?)\]").expect("bracket regex is valid"));
static PAREN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((.*?)\)").expect("paren regex is valid"));
static SPECIAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s\-]").expect("special-char regex is valid"));
static SPACES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("spaces regex is valid"));
static KR_THEN_LATIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([가-힣])([A-Za-z0-9])").expect("kr-latin regex is valid"));
static LATIN_THEN_KR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z0-9])([가-힣])").expect("latin-kr regex is valid"));
static UI_NOISE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bVS\s*검색.*$",
        r"\b검색\s*도움말\b",
        r"(?i)\bVS\s*검색하기\b",
        r"추천상품과\s*스펙비교하세요\.?",
        r"\b닫기\b",
        r"스펙\s*비교",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("ui-noise regex is valid"))
    .collect()
});
static SKU_BRACKET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\(\[].*?[\)\]]").expect("sku bracket regex is valid"));
static WORD_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s가-힣]").expect("word-token regex is valid"));

const TOKEN_STOPWORDS: [&str; 5] = ["vs검색하기", "vs검색", "검색하기", "검색", "도움말"];

/// Chip tokens (`M1`..`M9`) found in a string, uppercased, order-preserving.
#[must_use]
pub fn extract_chips(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut chips = Vec::new();
    for cap in CHIP_RE.captures_iter(text) {
        let chip = format!("M{}", &cap[1]);
        if seen.insert(chip.clone()) {
            chips.push(chip);
        }
    }
    chips
}

fn replace_brackets_preserving_chips(re: &Regex, text: &str) -> String {
    re.replace_all(text, |caps: &regex::Captures| {
        let inner = caps.get(1).map_or("", |m| m.as_str());
        let chips = extract_chips(inner);
        if chips.is_empty() {
            " ".to_string()
        } else {
            format!(" {} ", chips.join(" "))
        }
    })
    .into_owned()
}

/// Strip bracketed promo/option content, re-emitting chip tokens (`[M4]`)
/// found inside before deletion.
///
/// Must run before separator truncation: a separator nested inside a
/// bracket would otherwise cut the title mid-bracket, leaving an unclosed
/// `(`/`[` that the paired patterns here can no longer match.
#[must_use]
pub fn strip_brackets(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let out = replace_brackets_preserving_chips(&BRACKET_RE, text);
    replace_brackets_preserving_chips(&PAREN_RE, &out)
}

/// Strip bracketed content and special characters.
///
/// Bracketed content is usually noise, but chip tokens inside it (`[M4]`)
/// identify the product line and are re-emitted before deletion.
#[must_use]
pub fn clean_product_name(product_name: &str) -> String {
    if product_name.is_empty() {
        return String::new();
    }
    let cleaned = strip_brackets(product_name);
    let cleaned = SPECIAL_RE.replace_all(&cleaned, "");
    let cleaned = SPACES_RE.replace_all(&cleaned, " ");
    cleaned.trim().to_string()
}

/// Insert a space at every Hangul/Latin boundary.
///
/// `스페이스블랙M4` → `스페이스블랙 M4`, `이어폰C` → `이어폰 C`.
#[must_use]
pub fn split_kr_en_boundary(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let out = KR_THEN_LATIN_RE.replace_all(text, "$1 $2");
    let out = LATIN_THEN_KR_RE.replace_all(&out, "$1 $2");
    let out = SPACES_RE.replace_all(&out, " ");
    out.trim().to_string()
}

/// Remove extension-UI phrases appended by the source page.
#[must_use]
pub fn strip_ui_noise(text: &str) -> String {
    let mut out = text.to_string();
    for re in UI_NOISE_RES.iter() {
        out = re.replace_all(&out, " ").into_owned();
    }
    out
}

/// Clean a product title for display and storage: drop bracketed SKU codes,
/// UI text, and excess whitespace.
#[must_use]
pub fn clean_display_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let cleaned = SKU_BRACKET_RE.replace_all(text, " ");
    let cleaned = strip_ui_noise(&cleaned);
    SPACES_RE.replace_all(&cleaned, " ").trim().to_string()
}

/// Lowercased keyword tokens for set-based matching.
#[must_use]
pub fn tokenize_keywords(text: &str) -> HashSet<String> {
    if text.is_empty() {
        return HashSet::new();
    }
    let cleaned = split_kr_en_boundary(&clean_product_name(text));
    let rough = WORD_TOKEN_RE.replace_all(&cleaned, " ");
    rough
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|t| !t.is_empty() && !TOKEN_STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Collapse runs of whitespace into single spaces.
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    SPACES_RE.replace_all(text, " ").trim().to_string()
}
