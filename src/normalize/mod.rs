//! Query normalization: raw shopping-site titles to catalog-friendly
//! queries, fallback candidate lists, and the auxiliary extractors used by
//! failure records.

pub mod candidates;
pub mod cleaning;
pub mod domain;
pub mod normalizer;
pub mod resources;
pub mod rules;

pub use candidates::Normalizer;
pub use cleaning::{
    clean_display_text, clean_product_name, collapse_whitespace, extract_chips,
    split_kr_en_boundary, strip_brackets, strip_ui_noise, tokenize_keywords,
};
pub use domain::{Domain, detect_domain};
pub use normalizer::{LegacyNormalizer, QueryNormalizer, RuleBasedNormalizer, select_strategy};
pub use rules::{HardMappings, RuleSet, TagAction, TagMatcher, TagRuleSpec, default_tag_rules};
