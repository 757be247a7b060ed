//! Shared utilities for URL and text handling.

pub mod text;
pub mod url;

pub use text::extract_price_from_text;
pub use url::{build_detail_url, build_search_url, extract_product_id, is_valid_url, normalize_href};
