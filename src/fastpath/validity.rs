//! Content validity heuristics for fetched HTML.
//!
//! A 200 response can still be a challenge page, an empty shell, or an
//! anti-bot interstitial. Policy: positive fingerprints win, clearly small
//! pages and known block phrases lose, very large pages are trusted, and
//! everything else is treated as invalid (conservative).

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

/// Block/challenge phrases, matched against the lowercased page.
pub const BLOCK_KEYWORDS: &[&str] = &[
    "access denied",
    "captcha",
    "캡차",
    "cloudflare challenge",
    "just a moment",
    "verify you are human",
    "접속이 차단되었습니다",
];

const NO_RESULTS_KEYWORDS: &[&str] = &[
    "검색 결과가 없습니다",
    "검색결과가 없습니다",
    "검색 결과가 없",
    "검색결과가 없",
    "결과가 없습니다",
];

static PROD_ITEM_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".prod_item").expect("prod_item selector"));
static PCODE_LINK_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*="pcode="]"#).expect("pcode link selector"));
static LOW_PRICE_AREA_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#lowPriceCompanyArea").expect("low price area selector"));
static PROD_TIT_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".prod_tit").expect("prod_tit selector"));

/// Whether the page carries search-result structure (product items or
/// pcode-bearing links).
#[must_use]
pub fn has_search_fingerprint(html: &str) -> bool {
    let document = Html::parse_document(html);
    document.select(&PROD_ITEM_SEL).next().is_some()
        || document.select(&PCODE_LINK_SEL).next().is_some()
}

/// Whether the page carries product-detail structure.
#[must_use]
pub fn has_product_fingerprint(html: &str) -> bool {
    let document = Html::parse_document(html);
    document.select(&LOW_PRICE_AREA_SEL).next().is_some()
        || document.select(&PROD_TIT_SEL).next().is_some()
}

/// Whether the page is the upstream's explicit empty-search marker.
#[must_use]
pub fn is_no_results_html(html: &str) -> bool {
    if html.is_empty() {
        return false;
    }
    NO_RESULTS_KEYWORDS.iter().any(|k| html.contains(k))
}

/// The first block phrase present, if any.
#[must_use]
pub fn blocked_keyword(html: &str) -> Option<&'static str> {
    if html.is_empty() {
        return None;
    }
    let lowered = html.to_lowercase();
    BLOCK_KEYWORDS.iter().find(|k| lowered.contains(*k)).copied()
}

/// Conservative validity check applied to every fetched page.
#[must_use]
pub fn is_probably_invalid_html(html: &str, min_length: usize, trust_large_size: usize) -> bool {
    if html.is_empty() {
        return true;
    }
    if html.len() < min_length {
        return true;
    }
    if has_search_fingerprint(html) || has_product_fingerprint(html) {
        return false;
    }
    if blocked_keyword(html).is_some() {
        return true;
    }
    if html.len() > trust_large_size {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad(html: &str, len: usize) -> String {
        let mut out = html.to_string();
        out.push_str("<!--");
        while out.len() < len {
            out.push('x');
        }
        out.push_str("-->");
        out
    }

    #[test]
    fn empty_and_short_pages_are_invalid() {
        assert!(is_probably_invalid_html("", 5000, 50_000));
        assert!(is_probably_invalid_html("<html>tiny</html>", 5000, 50_000));
    }

    #[test]
    fn fingerprint_short_circuits_to_valid() {
        let html = pad(r#"<div class="prod_item"><a href="/info/?pcode=1">x</a></div>"#, 6000);
        assert!(!is_probably_invalid_html(&html, 5000, 50_000));
        assert!(has_search_fingerprint(&html));
    }

    #[test]
    fn product_fingerprint_detects_detail_pages() {
        let html = r#"<div id="lowPriceCompanyArea"></div>"#;
        assert!(has_product_fingerprint(html));
        assert!(has_product_fingerprint(r#"<h3 class="prod_tit">맥북</h3>"#));
        assert!(!has_product_fingerprint("<div>nothing</div>"));
    }

    #[test]
    fn block_keywords_invalidate_midsize_pages() {
        let html = pad("<html><body>Just a MOMENT please</body></html>", 6000);
        assert!(is_probably_invalid_html(&html, 5000, 50_000));
        assert_eq!(blocked_keyword(&html), Some("just a moment"));
    }

    #[test]
    fn large_pages_without_fingerprints_are_trusted() {
        let html = pad("<html><body>big page</body></html>", 60_000);
        assert!(!is_probably_invalid_html(&html, 5000, 50_000));
    }

    #[test]
    fn midsize_pages_without_fingerprints_are_suspect() {
        let html = pad("<html><body>plain</body></html>", 10_000);
        assert!(is_probably_invalid_html(&html, 5000, 50_000));
    }

    #[test]
    fn no_results_marker_is_detected() {
        assert!(is_no_results_html("<p>검색 결과가 없습니다</p>"));
        assert!(!is_no_results_html("<p>검색 결과 120건</p>"));
        assert!(!is_no_results_html(""));
    }
}
