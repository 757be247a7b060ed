//! Search candidate generation and auxiliary extractors.
//!
//! The upstream search engine fails in predictable ways (year tokens,
//! over-specified titles), so each query is expanded into a small ordered
//! list of fallback candidates, tried in order by the executors.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use super::cleaning::{clean_product_name, collapse_whitespace, split_kr_en_boundary};
use super::normalizer::QueryNormalizer;
use super::resources::{default_category_patterns, default_synonyms};
use super::rules::HardMappings;

static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(19|20)\d{2}\b").expect("year regex"));
static CHIP_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)M\s*\d+").expect("chip token regex"));
static CAPACITY_IN_MODEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\d+(\.\d+)?[GgTt][Bb]\s*").expect("model capacity regex"));

const MAX_CANDIDATES: usize = 8;

/// The engine's query front end: one normalization strategy plus candidate
/// generation and the extractors the failure recorder needs.
pub struct Normalizer {
    strategy: Box<dyn QueryNormalizer>,
    synonyms: Vec<(String, Vec<String>)>,
    categories: Vec<(String, Regex)>,
}

impl Normalizer {
    #[must_use]
    pub fn new(strategy: Box<dyn QueryNormalizer>) -> Self {
        let categories = default_category_patterns()
            .into_iter()
            .filter_map(|(name, pattern)| Regex::new(&pattern).ok().map(|re| (name, re)))
            .collect();
        Self {
            strategy,
            synonyms: default_synonyms(),
            categories,
        }
    }

    /// Normalize a raw title into the cache key / primary search term.
    #[must_use]
    pub fn normalize(&self, raw: &str) -> String {
        self.strategy.normalize(raw)
    }

    /// Ordered fallback candidates, 1–8 entries, case-insensitively deduped.
    ///
    /// Priority: year-stripped form, full normalized form, brand+model,
    /// brand+model+chip, model only, brand only, synonym substitutions.
    #[must_use]
    pub fn candidates(&self, raw: &str) -> Vec<String> {
        let normalized = self.normalize(raw);
        let mut out: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        let push = |cand: String, out: &mut Vec<String>, seen: &mut HashSet<String>| {
            let cand = collapse_whitespace(&cand);
            if cand.is_empty() || out.len() >= MAX_CANDIDATES {
                return;
            }
            if seen.insert(cand.to_lowercase()) {
                out.push(cand);
            }
        };

        // The upstream search engine chokes on year tokens, so the
        // year-stripped form goes first.
        let no_year = collapse_whitespace(&YEAR_RE.replace_all(&normalized, " "));
        if !no_year.is_empty() && !no_year.eq_ignore_ascii_case(&normalized) {
            push(no_year, &mut out, &mut seen);
        }

        push(normalized.clone(), &mut out, &mut seen);

        let (brand, model) = self.extract_brand_and_model(raw);
        if !brand.is_empty() && !model.is_empty() {
            let model_cleaned =
                collapse_whitespace(&CAPACITY_IN_MODEL_RE.replace_all(&model, " "));
            push(format!("{brand} {model_cleaned}"), &mut out, &mut seen);

            if let Some(chip) = CHIP_TOKEN_RE.find(raw) {
                push(
                    format!("{brand} {model_cleaned} {}", chip.as_str()),
                    &mut out,
                    &mut seen,
                );
            }
        }

        if !model.is_empty() {
            let model_only: Vec<&str> = model.split_whitespace().take(3).collect();
            push(model_only.join(" "), &mut out, &mut seen);
        }

        if !brand.is_empty() {
            push(brand.clone(), &mut out, &mut seen);
        }

        let raw_lower = raw.to_lowercase();
        for (kr, en_terms) in &self.synonyms {
            if raw.contains(kr.as_str()) || raw_lower.contains(&kr.to_lowercase()) {
                for en in en_terms {
                    push(en.clone(), &mut out, &mut seen);
                }
            }
        }

        if out.is_empty() {
            let fallback = clean_product_name(raw);
            if !fallback.is_empty() {
                out.push(fallback);
            }
        }
        out
    }

    /// Brand and model by positional extraction: first token is the brand,
    /// a year token after it is skipped, the next up-to-three tokens are the
    /// model.
    #[must_use]
    pub fn extract_brand_and_model(&self, raw: &str) -> (String, String) {
        let normalized = split_kr_en_boundary(&clean_product_name(raw));
        let tokens: Vec<&str> = normalized.split_whitespace().collect();
        let Some(brand) = tokens.first() else {
            return (String::new(), String::new());
        };

        let mut start = 1;
        if tokens.len() > 1 && YEAR_RE.is_match(tokens[1]) {
            start = 2;
        }
        let model = tokens
            .iter()
            .skip(start)
            .take(3)
            .copied()
            .collect::<Vec<_>>()
            .join(" ");

        ((*brand).to_string(), model)
    }

    /// Detected category for failure records; first pattern wins.
    #[must_use]
    pub fn detect_category(&self, raw: &str) -> Option<String> {
        self.categories
            .iter()
            .find(|(_, re)| re.is_match(raw))
            .map(|(name, _)| name.clone())
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(super::normalizer::select_strategy(HardMappings::default()))
    }
}
