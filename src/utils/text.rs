//! Text helpers shared by the parsers.

use once_cell::sync::Lazy;
use regex::Regex;

static DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d").expect("digit regex is valid"));

/// Extract a positive integer price from display text like `1,299,000원`.
///
/// Returns 0 when the text carries no digits or the digits overflow, so a
/// caller can treat any non-positive value as a parse failure.
#[must_use]
pub fn extract_price_from_text(text: &str) -> u32 {
    let digits: String = DIGITS_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .collect();
    if digits.is_empty() {
        return 0;
    }
    digits.parse::<u32>().unwrap_or(0)
}
