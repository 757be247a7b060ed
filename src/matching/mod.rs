//! Weighted matching between queries and catalog titles.

pub mod score;
pub mod signals;
pub mod similarity;

pub use score::{is_accessory_trap, weighted_match_score};
pub use signals::{
    ProductSignals, extract_chip_set, extract_model_codes, extract_product_signals,
    extract_screen_sizes,
};
pub use similarity::{fuzzy_score, jaccard_score};
