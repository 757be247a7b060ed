//! Standardized search result types.
//!
//! Every execution path (cache, HTTP fast path, browser slow path) resolves
//! to the same `SearchResult` shape so callers never branch on which backend
//! produced the answer.

use serde::{Deserialize, Serialize};

use super::budget::BudgetReport;

/// Where a successful result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Cache,
    FastPath,
    SlowPath,
}

/// Terminal status of one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    CacheHit,
    FastPathSuccess,
    SlowPathSuccess,
    Timeout,
    ParseError,
    Blocked,
    NoResults,
    BudgetExhausted,
}

/// One mall offer from the upstream's price-comparison list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MallOffer {
    /// 1-based position in the upstream list (1 = lowest).
    pub rank: u32,
    pub mall: String,
    pub price: u32,
    pub free_shipping: bool,
    pub delivery: String,
    /// Absolute purchase link.
    pub link: String,
}

/// A successful price finding produced by an executor, before the
/// orchestrator wraps it into a `SearchResult`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceFinding {
    pub product_url: String,
    pub price: u32,
    pub product_name: Option<String>,
    pub mall: Option<String>,
    pub free_shipping: Option<bool>,
    /// Upstream product id (pcode).
    pub product_id: Option<String>,
    /// Up to three ranked mall offers.
    pub top_prices: Vec<MallOffer>,
}

/// The unified outcome of `SearchOrchestrator::search`.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub status: SearchStatus,
    pub product_url: Option<String>,
    pub price: Option<u32>,
    pub product_name: Option<String>,
    pub query: String,
    pub source: Option<Source>,
    pub elapsed_ms: u128,
    pub product_id: Option<String>,
    pub top_prices: Vec<MallOffer>,
    pub error_message: Option<String>,
    pub budget_report: Option<BudgetReport>,
}

impl SearchResult {
    /// True iff the search produced a usable price.
    ///
    /// Holds exactly when `status` is one of the three success statuses,
    /// which in turn holds exactly when `price > 0` and the product URL is
    /// non-empty (enforced by the constructors below).
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(
            self.status,
            SearchStatus::CacheHit | SearchStatus::FastPathSuccess | SearchStatus::SlowPathSuccess
        )
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        !self.is_success()
    }

    fn success(
        status: SearchStatus,
        source: Source,
        finding: PriceFinding,
        query: &str,
        elapsed_ms: u128,
    ) -> Self {
        Self {
            status,
            product_url: Some(finding.product_url),
            price: Some(finding.price),
            product_name: finding.product_name,
            query: query.to_string(),
            source: Some(source),
            elapsed_ms,
            product_id: finding.product_id,
            top_prices: finding.top_prices,
            error_message: None,
            budget_report: None,
        }
    }

    fn failure(status: SearchStatus, query: &str, elapsed_ms: u128, message: String) -> Self {
        Self {
            status,
            product_url: None,
            price: None,
            product_name: None,
            query: query.to_string(),
            source: None,
            elapsed_ms,
            product_id: None,
            top_prices: Vec::new(),
            error_message: Some(message),
            budget_report: None,
        }
    }

    #[must_use]
    pub fn from_cache(finding: PriceFinding, query: &str, elapsed_ms: u128) -> Self {
        Self::success(SearchStatus::CacheHit, Source::Cache, finding, query, elapsed_ms)
    }

    #[must_use]
    pub fn from_fastpath(finding: PriceFinding, query: &str, elapsed_ms: u128) -> Self {
        Self::success(
            SearchStatus::FastPathSuccess,
            Source::FastPath,
            finding,
            query,
            elapsed_ms,
        )
    }

    #[must_use]
    pub fn from_slowpath(finding: PriceFinding, query: &str, elapsed_ms: u128) -> Self {
        Self::success(
            SearchStatus::SlowPathSuccess,
            Source::SlowPath,
            finding,
            query,
            elapsed_ms,
        )
    }

    #[must_use]
    pub fn timeout(query: &str, elapsed_ms: u128, report: BudgetReport) -> Self {
        let mut result = Self::failure(
            SearchStatus::Timeout,
            query,
            elapsed_ms,
            "Search timeout exceeded".to_string(),
        );
        result.budget_report = Some(report);
        result
    }

    #[must_use]
    pub fn parse_error(query: &str, elapsed_ms: u128, error: String) -> Self {
        Self::failure(SearchStatus::ParseError, query, elapsed_ms, error)
    }

    #[must_use]
    pub fn blocked(query: &str, elapsed_ms: u128) -> Self {
        Self::failure(
            SearchStatus::Blocked,
            query,
            elapsed_ms,
            "Request blocked (bot detection)".to_string(),
        )
    }

    #[must_use]
    pub fn no_results(query: &str, elapsed_ms: u128) -> Self {
        Self::failure(
            SearchStatus::NoResults,
            query,
            elapsed_ms,
            "No products found".to_string(),
        )
    }

    #[must_use]
    pub fn budget_exhausted(query: &str, elapsed_ms: u128, report: BudgetReport) -> Self {
        let mut result = Self::failure(
            SearchStatus::BudgetExhausted,
            query,
            elapsed_ms,
            "Budget exhausted before completion".to_string(),
        );
        result.budget_report = Some(report);
        result
    }
}
