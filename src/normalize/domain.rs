//! Score-based product domain detection.
//!
//! The detected domain gates how aggressive normalization is allowed to be:
//! colors and spec tokens are noise on a laptop title but load-bearing on
//! `신라면 블랙`.

use once_cell::sync::Lazy;
use regex::Regex;

use super::resources::{COSMETICS_SIGNALS, FOOD_SIGNALS, IT_SIGNALS, NON_IT_STRONG};

/// Product domain for normalization policy purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Electronics,
    Food,
    Cosmetics,
    General,
}

static UNIT_SPEC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b\d+\s*(gb|tb|mb|khz|mhz|ghz|hz)\b").expect("unit spec regex"));
static CHIP_SIGNAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(m\s*\d+)\b").expect("chip signal regex"));
static GPU_SIGNAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(rtx\s*\d+|gtx\s*\d+)\b").expect("gpu signal regex"));

/// Threshold at which electronics signals win over strong non-IT signals.
const ELECTRONICS_THRESHOLD: i32 = 2;

fn electronics_score(lowered: &str) -> i32 {
    let mut score = 0;
    if NON_IT_STRONG.iter().any(|w| lowered.contains(w)) {
        score -= 3;
    }
    if IT_SIGNALS.iter().any(|w| lowered.contains(w)) {
        score += 2;
    }
    if UNIT_SPEC_RE.is_match(lowered) {
        score += 2;
    }
    if CHIP_SIGNAL_RE.is_match(lowered) {
        score += 2;
    }
    if GPU_SIGNAL_RE.is_match(lowered) {
        score += 2;
    }
    score
}

/// Detect the domain of a raw product title.
///
/// Detection runs on the raw title (before separator truncation) because
/// option strings after the separators often carry the decisive spec
/// signals (`... · 256GB · WIN11`).
#[must_use]
pub fn detect_domain(raw: &str) -> Domain {
    if raw.is_empty() {
        return Domain::General;
    }
    let lowered = raw.to_lowercase();

    if electronics_score(&lowered) >= ELECTRONICS_THRESHOLD {
        return Domain::Electronics;
    }
    if FOOD_SIGNALS.iter().any(|w| lowered.contains(w)) {
        return Domain::Food;
    }
    if COSMETICS_SIGNALS.iter().any(|w| lowered.contains(w)) {
        return Domain::Cosmetics;
    }
    Domain::General
}
