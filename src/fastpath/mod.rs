//! HTTP fast path: fetch, validate, parse, rank.

pub mod executor;
pub mod http;
pub mod parsing;
pub mod validity;

pub use executor::{FastPath, HttpFastPath};
pub use http::SharedHttpClient;
pub use parsing::{
    ParsedProduct, ScoredProductId, is_accessory_brand_product, parse_product_lowest_price,
    parse_search_product_ids,
};
pub use validity::{
    BLOCK_KEYWORDS, blocked_keyword, has_product_fingerprint, has_search_fingerprint,
    is_no_results_html, is_probably_invalid_html,
};
