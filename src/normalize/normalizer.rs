//! Query normalization strategies.
//!
//! Two implementations sit behind one trait: the rule-based strategy driven
//! by the tag/policy tables, and the legacy inline heuristic kept as a
//! fallback so that a bad rule table can never take the engine offline.
//! Selection happens once at construction.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use super::cleaning::{
    clean_product_name, collapse_whitespace, split_kr_en_boundary, strip_brackets, strip_ui_noise,
};
use super::domain::{Domain, detect_domain};
use super::resources::COLORS;
use super::rules::{HardMappings, RuleSet, default_tag_rules};

const SEPARATORS: [char; 3] = ['·', '•', '|'];

static COLOR_BOUNDARY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"({})([가-힣])", COLORS.join("|"))).expect("color boundary regex")
});
/// Stand-alone capital letters are SKU residue, except `C` which encodes
/// the port type after USB-C normalization.
static SINGLE_LETTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-BD-Z])\s+").expect("single letter regex"));

/// Normalization strategy: raw title in, catalog-friendly query out.
///
/// Implementations must be deterministic and idempotent on already-normalized
/// input.
pub trait QueryNormalizer: Send + Sync {
    fn normalize(&self, raw: &str) -> String;
}

/// Truncate at the first option separator; shopping sites put option strings
/// after `·`/`•`/`|`.
fn truncate_at_separator(text: &str) -> &str {
    for sep in SEPARATORS {
        if let Some(idx) = text.find(sep) {
            return text[..idx].trim_end();
        }
    }
    text
}

fn insert_boundaries(text: &str) -> String {
    let out = split_kr_en_boundary(text);
    COLOR_BOUNDARY_RE.replace_all(&out, "$1 $2").into_owned()
}

fn strip_single_letters(text: &str) -> String {
    SINGLE_LETTER_RE.replace_all(text, " ").into_owned()
}

/// Rule-based normalizer: tag emission + domain-scoped policies over the
/// resource tables, with hard-mapping overrides.
pub struct RuleBasedNormalizer {
    rules: RuleSet,
    hard_mappings: HardMappings,
}

impl RuleBasedNormalizer {
    pub fn new(hard_mappings: HardMappings) -> anyhow::Result<Self> {
        Ok(Self {
            rules: RuleSet::compile(default_tag_rules())?,
            hard_mappings,
        })
    }

    pub fn with_rules(rules: RuleSet, hard_mappings: HardMappings) -> Self {
        Self {
            rules,
            hard_mappings,
        }
    }
}

impl QueryNormalizer for RuleBasedNormalizer {
    fn normalize(&self, raw: &str) -> String {
        if raw.trim().is_empty() {
            return String::new();
        }

        // Brackets go before truncation: a separator nested inside one
        // would otherwise cut the title mid-bracket and strand its content.
        let stripped = strip_brackets(&strip_ui_noise(raw));
        let truncated = truncate_at_separator(&stripped);
        let cleaned = clean_product_name(truncated);
        let mut working = insert_boundaries(&cleaned);

        // Hard mapping replaces the working string wholesale and re-enters
        // boundary insertion; domain detection then runs on the replacement.
        let domain = match self.hard_mappings.apply(&working) {
            Some(mapped) => {
                debug!(from = %working, to = %mapped, "hard mapping applied");
                let domain = detect_domain(&mapped);
                working = insert_boundaries(&clean_product_name(&mapped));
                domain
            }
            // Detection uses the raw title: option strings after the
            // separators often carry the decisive spec signals.
            None => detect_domain(raw),
        };

        let tags = self.rules.emit_tags(&working);
        let working = self.rules.apply_policies(&working, &tags, domain);
        let working = strip_single_letters(&working);
        collapse_whitespace(&working)
    }
}

/// Legacy inline heuristic, the pre-rule-table behavior. Selected when the
/// rule table fails to compile.
pub struct LegacyNormalizer;

static CAPACITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b\d+\s*(GB|TB|MB|KB)\b").expect("capacity regex"));
static MEMORY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(DDR\d+|LPDDR\d+|GDDR\d+)\b").expect("memory regex"));
static STORAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(SSD|HDD|NVME)\b").expect("storage regex"));
static OS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(WIN(?:DOWS)?\s*\d+|Windows|HOME|PRO)\b").expect("os regex")
});
static GENERATION_NUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+)\s*세대\b").expect("generation regex"));
static GENERATION_BARE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b세대\b").expect("bare generation regex"));
static CPU_FAMILY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(인텔|라이젠|AMD)\s+\d+").expect("cpu family regex"));
static SERIES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b시리즈\b").expect("series regex"));
static SPEC_TERM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(코어|GHZ|MHZ|IPS|VA|FIPS)\b").expect("spec term regex"));
static GEFORCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b지포스\s+").expect("geforce regex"));
static AUDIO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(액티브|노이즈|캔슬링|무선|유선|블루투스|입체음향|돌비)\b").expect("audio regex")
});
static USB_C_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(USB\s*-?\s*C|Type\s*-?\s*C|C\s*타입)\b").expect("usb-c regex")
});
static PORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(HDMI|DP|Thunderbolt|3\.5mm|이어폰)\b").expect("port regex"));
static CONDITION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(정품|리퍼|새제품|중고|리뉴얼)\b").expect("condition regex"));
static BUNDLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(패키지|세트|구성|포함|별도|추가)\b").expect("bundle regex"));
static ACCESSORY_TERM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(케이스|필름|커버|보호|가방|파우치|포우치|스킨|스티커|도킹|거치대)\b")
        .expect("accessory term regex")
});
static COLOR_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"\b({})\b", COLORS.join("|"))).expect("color word regex"));
static COUNT_SPEC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b\d{1,2}\s*(코어|core|스레드|thread|와트)\b").expect("count spec regex")
});

impl QueryNormalizer for LegacyNormalizer {
    fn normalize(&self, raw: &str) -> String {
        if raw.trim().is_empty() {
            return String::new();
        }

        let stripped = strip_brackets(&strip_ui_noise(raw));
        let is_it = detect_domain(raw) == Domain::Electronics;
        let truncated = truncate_at_separator(&stripped);
        let cleaned = clean_product_name(truncated);
        let mut text = insert_boundaries(&cleaned);

        if is_it {
            text = CAPACITY_RE.replace_all(&text, " ").into_owned();
            text = MEMORY_RE.replace_all(&text, " ").into_owned();
            text = STORAGE_RE.replace_all(&text, " ").into_owned();
            text = OS_RE.replace_all(&text, " ").into_owned();
        }

        text = GENERATION_NUM_RE.replace_all(&text, "$1").into_owned();
        text = GENERATION_BARE_RE.replace_all(&text, " ").into_owned();

        if is_it {
            text = CPU_FAMILY_RE.replace_all(&text, " ").into_owned();
            text = SERIES_RE.replace_all(&text, " ").into_owned();
            text = SPEC_TERM_RE.replace_all(&text, " ").into_owned();
            text = GEFORCE_RE.replace_all(&text, " ").into_owned();
            text = AUDIO_RE.replace_all(&text, " ").into_owned();
            text = USB_C_RE.replace_all(&text, " C ").into_owned();
            text = PORT_RE.replace_all(&text, " ").into_owned();
        }

        text = CONDITION_RE.replace_all(&text, " ").into_owned();

        if is_it {
            text = BUNDLE_RE.replace_all(&text, " ").into_owned();
            text = ACCESSORY_TERM_RE.replace_all(&text, " ").into_owned();
            text = COLOR_WORD_RE.replace_all(&text, " ").into_owned();
        }

        text = strip_single_letters(&text);
        text = COUNT_SPEC_RE.replace_all(&text, " ").into_owned();

        collapse_whitespace(&text)
    }
}

/// Build the preferred strategy, falling back to the legacy heuristic when
/// the rule table does not compile.
#[must_use]
pub fn select_strategy(hard_mappings: HardMappings) -> Box<dyn QueryNormalizer> {
    match RuleBasedNormalizer::new(hard_mappings) {
        Ok(normalizer) => Box::new(normalizer),
        Err(err) => {
            warn!(error = %format!("{err:#}"), "rule-based normalizer unavailable, using legacy heuristic");
            Box::new(LegacyNormalizer)
        }
    }
}
