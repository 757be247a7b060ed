//! URL helpers for the upstream catalog.
//!
//! The upstream identifies products by a numeric `pcode` carried in link
//! hrefs, and emits a mix of protocol-relative, root-relative, and absolute
//! URLs in its mall-offer markup. Everything the engine stores or returns
//! is normalized to an absolute https URL.

use once_cell::sync::Lazy;
use regex::Regex;

static PRODUCT_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:pcode|prod_id)=(\d+)").expect("product id regex is valid")
});

/// Extract the upstream product id (`pcode`) from an href, if present.
#[must_use]
pub fn extract_product_id(href: &str) -> Option<String> {
    PRODUCT_ID_RE
        .captures(href)
        .map(|c| c[1].to_string())
}

/// Normalize an href from upstream markup into an absolute URL.
///
/// `//host/path` becomes `https://host/path` and `/path` is resolved against
/// `base`. Already-absolute URLs pass through unchanged; anything else is
/// returned as-is (the caller validates).
#[must_use]
pub fn normalize_href(href: &str, base: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }
    if href.starts_with("//") {
        return format!("https:{href}");
    }
    if href.starts_with('/') {
        return format!("{}{}", base.trim_end_matches('/'), href);
    }
    href.to_string()
}

/// Check whether a URL is a usable absolute http(s) URL.
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }
    match url::Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some(),
        Err(_) => false,
    }
}

/// Build the upstream search URL for a query.
///
/// Template: `{base}?query={urlenc}&originalQuery={urlenc}`.
#[must_use]
pub fn build_search_url(base: &str, query: &str) -> String {
    let encoded = urlencoding::encode(query);
    format!("{base}?query={encoded}&originalQuery={encoded}")
}

/// Build the upstream product-detail URL for a product id.
///
/// Template: `{base}?pcode={digits}&keyword={urlenc}`.
#[must_use]
pub fn build_detail_url(base: &str, product_id: &str, keyword: &str) -> String {
    format!(
        "{base}?pcode={product_id}&keyword={}",
        urlencoding::encode(keyword)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_pcode_and_prod_id() {
        assert_eq!(
            extract_product_id("/info/?pcode=12345&cate=112758"),
            Some("12345".to_string())
        );
        assert_eq!(
            extract_product_id("https://prod.example.com/list?prod_id=777"),
            Some("777".to_string())
        );
        assert_eq!(extract_product_id("/info/?code=12345"), None);
        assert_eq!(extract_product_id(""), None);
    }

    #[test]
    fn normalizes_relative_hrefs() {
        assert_eq!(
            normalize_href("//prod.example.com/info/?pcode=1", "https://search.example.com"),
            "https://prod.example.com/info/?pcode=1"
        );
        assert_eq!(
            normalize_href("/info/?pcode=1", "https://prod.example.com"),
            "https://prod.example.com/info/?pcode=1"
        );
        assert_eq!(
            normalize_href("https://a.example.com/x", "https://b.example.com"),
            "https://a.example.com/x"
        );
        assert_eq!(normalize_href("  ", "https://b.example.com"), "");
    }

    #[test]
    fn validates_urls() {
        assert!(is_valid_url("https://prod.example.com/info/?pcode=1"));
        assert!(is_valid_url("http://example.com"));
        assert!(!is_valid_url("javascript:void(0)"));
        assert!(!is_valid_url("/info/?pcode=1"));
        assert!(!is_valid_url(""));
    }

    #[test]
    fn builds_search_and_detail_urls() {
        let search = build_search_url("https://search.example.com/dsearch.php", "맥북 에어 M4");
        assert!(search.starts_with("https://search.example.com/dsearch.php?query="));
        assert!(search.contains("&originalQuery="));

        let detail = build_detail_url("https://prod.example.com/info/", "222", "맥북");
        assert!(detail.contains("pcode=222"));
        assert!(detail.contains("keyword="));
    }
}
