//! Tag rules, tag policies, and hard mappings for the rule-based normalizer.
//!
//! A tag rule marks the text with a feature label (keyword or regex match);
//! a tag policy decides, per detected domain, whether the tagged pattern is
//! kept or rewritten. Hard mappings short-circuit the whole pipeline for
//! titles known to normalize badly.

use std::collections::{HashMap, HashSet};

use anyhow::Context;
use regex::Regex;

use super::cleaning::{clean_product_name, collapse_whitespace, split_kr_en_boundary};
use super::domain::Domain;
use super::resources::{COLORS, HARD_MAPPING_SKIP, default_hard_mappings};

/// How a tag rule recognizes its feature.
#[derive(Debug, Clone)]
pub enum TagMatcher {
    /// Case-insensitive keyword containment.
    AnyOf(Vec<String>),
    /// Regex pattern (uncompiled; compiled by `RuleSet::compile`).
    Pattern(String),
}

/// What to do with a tagged pattern.
#[derive(Debug, Clone)]
pub enum TagAction {
    Keep,
    /// Rewrite occurrences of `pattern` with `with` (capture groups allowed).
    Replace { pattern: String, with: String },
}

/// Declarative rule: matcher emits `tag`, policy decides the action, with
/// domain-scoped overrides consulted first.
#[derive(Debug, Clone)]
pub struct TagRuleSpec {
    pub tag: String,
    pub matcher: TagMatcher,
    pub action: TagAction,
    pub overrides: Vec<(Domain, TagAction)>,
}

impl TagRuleSpec {
    fn regex(tag: &str, pattern: &str, action: TagAction) -> Self {
        Self {
            tag: tag.to_string(),
            matcher: TagMatcher::Pattern(pattern.to_string()),
            action,
            overrides: Vec::new(),
        }
    }

    fn electronics_only(tag: &str, pattern: &str, with: &str) -> Self {
        Self {
            tag: tag.to_string(),
            matcher: TagMatcher::Pattern(pattern.to_string()),
            action: TagAction::Keep,
            overrides: vec![(
                Domain::Electronics,
                TagAction::Replace {
                    pattern: pattern.to_string(),
                    with: with.to_string(),
                },
            )],
        }
    }
}

/// The built-in rule table, in application order.
#[must_use]
pub fn default_tag_rules() -> Vec<TagRuleSpec> {
    let color_pattern = format!(r"\b({})\b", COLORS.join("|"));
    vec![
        // Generation markers keep their number: `2세대` → `2`.
        TagRuleSpec::regex(
            "has-generation",
            r"(?i)\b(\d+)\s*세대\b",
            TagAction::Replace {
                pattern: r"(?i)\b(\d+)\s*세대\b".to_string(),
                with: "$1".to_string(),
            },
        ),
        TagRuleSpec::regex(
            "has-bare-generation",
            r"\b세대\b",
            TagAction::Replace {
                pattern: r"\b세대\b".to_string(),
                with: " ".to_string(),
            },
        ),
        // Port type is normalized to the reserved `C` token on electronics.
        TagRuleSpec::electronics_only(
            "has-usb-c",
            r"(?i)\b(USB\s*-?\s*C|Type\s*-?\s*C|C\s*타입)\b",
            " C ",
        ),
        TagRuleSpec::electronics_only("has-capacity", r"(?i)\b\d+\s*(GB|TB|MB|KB)\b", " "),
        TagRuleSpec::electronics_only("has-memory-type", r"(?i)\b(DDR\d+|LPDDR\d+|GDDR\d+)\b", " "),
        TagRuleSpec::electronics_only("has-storage-type", r"(?i)\b(SSD|HDD|NVME)\b", " "),
        TagRuleSpec::electronics_only(
            "has-os",
            r"(?i)\b(WIN(?:DOWS)?\s*\d+|Windows|HOME|PRO)\b",
            " ",
        ),
        TagRuleSpec::electronics_only("has-cpu-family", r"(?i)\b(인텔|라이젠|AMD)\s+\d+", " "),
        TagRuleSpec::electronics_only("has-series-word", r"\b시리즈\b", " "),
        TagRuleSpec::electronics_only("has-gpu-family", r"\b지포스\s+", " "),
        TagRuleSpec::electronics_only("has-spec-term", r"(?i)\b(코어|GHZ|MHZ|IPS|VA|FIPS)\b", " "),
        TagRuleSpec::electronics_only(
            "has-audio-spec",
            r"\b(액티브|노이즈|캔슬링|무선|유선|블루투스|입체음향|돌비)\b",
            " ",
        ),
        TagRuleSpec::electronics_only("has-port", r"(?i)\b(HDMI|DP|Thunderbolt|3\.5mm|이어폰)\b", " "),
        // Condition words are noise in every domain.
        TagRuleSpec::regex(
            "has-condition",
            r"\b(정품|리퍼|새제품|중고|리뉴얼)\b",
            TagAction::Replace {
                pattern: r"\b(정품|리퍼|새제품|중고|리뉴얼)\b".to_string(),
                with: " ".to_string(),
            },
        ),
        TagRuleSpec::electronics_only("has-bundle", r"\b(패키지|세트|구성|포함|별도|추가)\b", " "),
        TagRuleSpec::electronics_only(
            "has-accessory-term",
            r"\b(케이스|필름|커버|보호|가방|파우치|포우치|스킨|스티커|도킹|거치대)\b",
            " ",
        ),
        TagRuleSpec {
            tag: "has-color".to_string(),
            matcher: TagMatcher::Pattern(color_pattern.clone()),
            action: TagAction::Keep,
            overrides: vec![(
                Domain::Electronics,
                TagAction::Replace {
                    pattern: color_pattern,
                    with: " ".to_string(),
                },
            )],
        },
        TagRuleSpec::electronics_only(
            "has-count-spec",
            r"(?i)\b\d{1,2}\s*(코어|core|스레드|thread|와트)\b",
            " ",
        ),
    ]
}

enum CompiledMatcher {
    AnyOf(Vec<String>),
    Pattern(Regex),
}

enum CompiledAction {
    Keep,
    Replace { pattern: Regex, with: String },
}

struct CompiledRule {
    tag: String,
    matcher: CompiledMatcher,
    action: CompiledAction,
    overrides: HashMap<Domain, CompiledAction>,
}

/// Compiled rule set; construction fails on any invalid pattern, which the
/// normalizer selection turns into a fallback to the legacy heuristic.
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn compile(specs: Vec<TagRuleSpec>) -> anyhow::Result<Self> {
        let mut rules = Vec::with_capacity(specs.len());
        for spec in specs {
            let matcher = match spec.matcher {
                TagMatcher::AnyOf(words) => {
                    CompiledMatcher::AnyOf(words.iter().map(|w| w.to_lowercase()).collect())
                }
                TagMatcher::Pattern(p) => CompiledMatcher::Pattern(
                    Regex::new(&p).with_context(|| format!("tag rule {}: bad matcher", spec.tag))?,
                ),
            };
            let action = Self::compile_action(&spec.tag, spec.action)?;
            let mut overrides = HashMap::new();
            for (domain, over) in spec.overrides {
                overrides.insert(domain, Self::compile_action(&spec.tag, over)?);
            }
            rules.push(CompiledRule {
                tag: spec.tag,
                matcher,
                action,
                overrides,
            });
        }
        Ok(Self { rules })
    }

    fn compile_action(tag: &str, action: TagAction) -> anyhow::Result<CompiledAction> {
        Ok(match action {
            TagAction::Keep => CompiledAction::Keep,
            TagAction::Replace { pattern, with } => CompiledAction::Replace {
                pattern: Regex::new(&pattern)
                    .with_context(|| format!("tag rule {tag}: bad replace pattern"))?,
                with,
            },
        })
    }

    /// Run the tag rules against `text`, returning the emitted tags.
    #[must_use]
    pub fn emit_tags(&self, text: &str) -> HashSet<String> {
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .filter(|rule| match &rule.matcher {
                CompiledMatcher::AnyOf(words) => words.iter().any(|w| lowered.contains(w)),
                CompiledMatcher::Pattern(re) => re.is_match(text),
            })
            .map(|rule| rule.tag.clone())
            .collect()
    }

    /// Apply the policies for `tags` under `domain`, in rule order.
    #[must_use]
    pub fn apply_policies(&self, text: &str, tags: &HashSet<String>, domain: Domain) -> String {
        let mut out = text.to_string();
        for rule in &self.rules {
            if !tags.contains(&rule.tag) {
                continue;
            }
            let action = rule.overrides.get(&domain).unwrap_or(&rule.action);
            if let CompiledAction::Replace { pattern, with } = action {
                out = pattern.replace_all(&out, with.as_str()).into_owned();
            }
        }
        out
    }
}

/// Hard mappings keyed on the canonical lowercase form, consulted before
/// domain classification.
pub struct HardMappings {
    /// (canonical key, replacement), longest key first.
    entries: Vec<(String, String)>,
}

impl HardMappings {
    #[must_use]
    pub fn new(raw: HashMap<String, String>) -> Self {
        let mut entries: Vec<(String, String)> = raw
            .into_iter()
            .filter(|(k, v)| !k.is_empty() && !v.is_empty())
            .map(|(k, v)| (canonical_key(&k), v))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Self { entries }
    }

    /// Look up a replacement for `text`: exact canonical match first, then
    /// substring containment (longest key wins). Accessory queries never
    /// map — a case for a device must not be rewritten into the device.
    #[must_use]
    pub fn apply(&self, text: &str) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let key = canonical_key(text);
        if key.is_empty() {
            return None;
        }
        if HARD_MAPPING_SKIP.iter().any(|w| key.contains(w)) {
            return None;
        }
        if let Some((_, replacement)) = self.entries.iter().find(|(k, _)| *k == key) {
            return Some(replacement.clone());
        }
        self.entries
            .iter()
            .find(|(k, _)| key.contains(k.as_str()))
            .map(|(_, replacement)| replacement.clone())
    }
}

impl Default for HardMappings {
    fn default() -> Self {
        Self::new(default_hard_mappings())
    }
}

/// Canonical lookup key: cleaned, boundary-split, lowercased, one space.
#[must_use]
pub fn canonical_key(text: &str) -> String {
    collapse_whitespace(&split_kr_en_boundary(&clean_product_name(text))).to_lowercase()
}
