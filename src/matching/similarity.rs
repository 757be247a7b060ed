//! Base string similarity for product titles.
//!
//! The primary scorer runs a weighted-ratio style composite over `strsim`
//! metrics, floored by a token-set Jaccard maxed with a no-space bigram
//! Jaccard. Character metrics collapse on mixed-script pairs (Korean query
//! against a Latin catalog title); the token measure keeps shared model
//! tokens scoring when they do.

use std::collections::HashSet;

/// Lowercase and keep only word characters and spaces, collapsing runs.
fn process(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = true;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    out.trim_end().to_string()
}

/// Similarity score in [0, 100] between a query and a candidate title.
#[must_use]
pub fn fuzzy_score(query: &str, candidate: &str) -> f64 {
    if query.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    let a = process(query);
    let b = process(candidate);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 100.0;
    }
    let dice = strsim::sorensen_dice(&a, &b);
    let jaro = strsim::jaro_winkler(&a, &b);
    // Jaro-Winkler saturates high on short strings; weight the bigram
    // measure to keep orderings sharp on reordered product titles.
    let composite = (dice.max(jaro * 0.9) * 100.0).clamp(0.0, 100.0);
    // Floor with the token/bigram measure so mixed-script pairs sharing
    // model tokens do not collapse to zero.
    composite.max(jaccard_score(query, candidate))
}

fn bigrams(text: &str) -> HashSet<(char, char)> {
    let chars: Vec<char> = text.chars().collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}

fn jaccard<T: std::hash::Hash + Eq>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// Fallback similarity: token-set Jaccard maxed with no-space bigram
/// Jaccard, in [0, 100].
#[must_use]
pub fn jaccard_score(query: &str, candidate: &str) -> f64 {
    if query.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    let a = process(query);
    let b = process(candidate);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 100.0;
    }

    let tokens_a: HashSet<&str> = a.split_whitespace().collect();
    let tokens_b: HashSet<&str> = b.split_whitespace().collect();
    let token_sim = jaccard(&tokens_a, &tokens_b);

    let joined_a: String = a.split_whitespace().collect();
    let joined_b: String = b.split_whitespace().collect();
    let bigram_sim = jaccard(&bigrams(&joined_a), &bigrams(&joined_b));

    token_sim.max(bigram_sim) * 100.0
}
