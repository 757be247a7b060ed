//! Weighted match scoring between a query and a candidate title.
//!
//! Used by the fast path to rank parsed search results and by the slow path
//! to rank DOM links and re-verify detail pages. Pure function, no state.

use std::collections::HashSet;

use tracing::debug;

use crate::normalize::resources::{ACCESSORY_KEYWORDS, MAIN_PRODUCT_HINTS, VARIANT_TOKENS};
use crate::normalize::tokenize_keywords;

use super::signals::{extract_chip_set, extract_product_signals, extract_screen_sizes};
use super::similarity::fuzzy_score;

const VARIANT_PENALTY: f64 = 45.0;
const MODEL_CODE_DISJOINT: f64 = -40.0;
const MODEL_CODE_OVERLAP: f64 = 10.0;
const MODEL_CODE_MISSING: f64 = -18.0;
const UNIT_DISJOINT: f64 = -22.0;
const UNIT_OVERLAP: f64 = 6.0;
const BIG_NUMBER_DISJOINT: f64 = -15.0;
const BIG_NUMBER_OVERLAP: f64 = 3.0;
const NAMED_NUMBER_MISMATCH: f64 = -28.0;
const NAMED_NUMBER_MATCH: f64 = 8.0;
const YEAR_MISMATCH: f64 = -6.0;
const YEAR_MATCH: f64 = 2.0;
const CHIP_MATCH_BONUS: f64 = 5.0;
const SCREEN_MATCH_BONUS: f64 = 8.0;

/// A candidate is an accessory trap when its title carries accessory tokens
/// the query does not share, while the query names a main product. Matching
/// a case when the user wants the device is the worst failure mode this
/// scorer guards against.
#[must_use]
pub fn is_accessory_trap(query: &str, candidate: &str) -> bool {
    if query.is_empty() || candidate.is_empty() {
        return false;
    }

    let q_tokens = tokenize_keywords(query);
    let c_tokens = tokenize_keywords(candidate);

    let suspicious: HashSet<&str> = c_tokens
        .iter()
        .map(String::as_str)
        .filter(|t| ACCESSORY_KEYWORDS.contains(t))
        .collect();
    if suspicious.is_empty() {
        return false;
    }
    if suspicious.iter().any(|t| q_tokens.contains(*t)) {
        return false;
    }
    q_tokens
        .iter()
        .any(|t| MAIN_PRODUCT_HINTS.contains(&t.as_str()))
}

fn variant_tokens(text: &str) -> HashSet<&'static str> {
    let tokens: HashSet<String> = text
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();
    VARIANT_TOKENS
        .iter()
        .copied()
        .filter(|v| tokens.contains(*v))
        .collect()
}

/// Score a candidate title against a query, in [0, 100].
#[must_use]
pub fn weighted_match_score(query: &str, candidate: &str) -> f64 {
    if query.is_empty() || candidate.is_empty() {
        return 0.0;
    }

    if is_accessory_trap(query, candidate) {
        debug!(query, candidate, "accessory trap, disqualified");
        return 0.0;
    }

    let mut score = fuzzy_score(query, candidate);

    // Variant lines (Pro vs Air vs Max...) are different products even when
    // every other token matches.
    let q_variants = variant_tokens(query);
    let c_variants = variant_tokens(candidate);
    if !q_variants.is_empty() && !c_variants.is_empty() && q_variants != c_variants {
        debug!(?q_variants, ?c_variants, "variant mismatch");
        score -= VARIANT_PENALTY;
    }

    // Chip generations are hard disqualifiers: an M3 is never an M4.
    let q_chips = extract_chip_set(query);
    let c_chips = extract_chip_set(candidate);
    if !q_chips.is_empty() && !c_chips.is_empty() {
        if q_chips != c_chips {
            debug!(?q_chips, ?c_chips, "chip mismatch, disqualified");
            return 0.0;
        }
        score += CHIP_MATCH_BONUS;
    }

    // So are screen sizes: an 11-inch and a 13-inch are different products.
    let q_screens = extract_screen_sizes(query);
    let c_screens = extract_screen_sizes(candidate);
    if !q_screens.is_empty() && !c_screens.is_empty() {
        if q_screens != c_screens {
            debug!(?q_screens, ?c_screens, "screen size mismatch, disqualified");
            return 0.0;
        }
        score += SCREEN_MATCH_BONUS;
    }

    let q = extract_product_signals(query);
    let c = extract_product_signals(candidate);

    if !q.model_codes.is_empty() && !c.model_codes.is_empty() {
        if q.model_codes.is_disjoint(&c.model_codes) {
            score += MODEL_CODE_DISJOINT;
        } else {
            score += MODEL_CODE_OVERLAP;
        }
    } else if !q.model_codes.is_empty() && c.model_codes.is_empty() {
        score += MODEL_CODE_MISSING;
    }

    if !q.unit_numbers.is_empty() && !c.unit_numbers.is_empty() {
        if q.unit_numbers.is_disjoint(&c.unit_numbers) {
            score += UNIT_DISJOINT;
        } else {
            score += UNIT_OVERLAP;
        }
    }

    if !q.big_numbers.is_empty() {
        if q.big_numbers.is_disjoint(&c.big_numbers) {
            score += BIG_NUMBER_DISJOINT;
        } else {
            score += BIG_NUMBER_OVERLAP;
        }
    }

    let mut named_mismatch = false;
    let mut named_match = false;
    for (key, q_nums) in &q.named_numbers {
        if let Some(c_nums) = c.named_numbers.get(key) {
            if q_nums.is_disjoint(c_nums) {
                named_mismatch = true;
            } else {
                named_match = true;
            }
        }
    }
    if named_mismatch {
        score += NAMED_NUMBER_MISMATCH;
    } else if named_match {
        score += NAMED_NUMBER_MATCH;
    }

    if !q.years.is_empty() && !c.years.is_empty() {
        if q.years.is_disjoint(&c.years) {
            score += YEAR_MISMATCH;
        } else {
            score += YEAR_MATCH;
        }
    }

    score.clamp(0.0, 100.0)
}
