//! Error taxonomy for the search pipeline.
//!
//! The orchestrator is the only boundary where these become statuses; the
//! executors either return a value or raise one of the typed variants below.

use thiserror::Error;

/// Errors the HTTP fast path can raise.
#[derive(Debug, Error)]
pub enum FastPathError {
    /// The upstream confirmed an empty search (explicit marker on the page).
    /// This is terminal for the query, not a transport failure.
    #[error("no results confirmed by upstream")]
    NoResults,

    /// A product id was located but its detail page could not be recovered.
    /// The id is propagated so the slow path can skip its search phase.
    #[error("product {product_id} detail fetch failed: {reason}")]
    ProductFetchFailed { product_id: String, reason: String },

    #[error("fast path timed out")]
    Timeout,

    /// The upstream returned a known anti-bot interstitial.
    #[error("blocked by upstream: {0}")]
    Blocked(String),

    #[error("fast path parse error: {0}")]
    Parse(String),
}

impl FastPathError {
    /// Whether this failure counts against the circuit breaker.
    ///
    /// A confirmed empty catalog is a healthy upstream response.
    #[must_use]
    pub fn counts_as_breaker_failure(&self) -> bool {
        !matches!(self, FastPathError::NoResults)
    }
}

/// Errors the browser slow path can raise.
#[derive(Debug, Error)]
pub enum SlowPathError {
    /// No matching product. `reason` distinguishes honest misses ("search"),
    /// concurrency saturation ("busy"), the disabled backend ("disabled"),
    /// discontinued products ("discontinued"), and detail-page mismatches
    /// ("mismatch").
    #[error("product not found ({reason})")]
    NotFound { reason: String },

    #[error("slow path timed out")]
    Timeout,

    #[error("blocked by upstream: {0}")]
    Blocked(String),

    #[error("slow path parse error: {0}")]
    Parse(String),

    /// Browser launch or CDP transport failure. Fatal for the slow path
    /// only; the orchestrator maps it to a parse-class status.
    #[error("browser error: {0}")]
    Browser(String),
}

impl SlowPathError {
    #[must_use]
    pub fn not_found(reason: &str) -> Self {
        SlowPathError::NotFound {
            reason: reason.to_string(),
        }
    }
}

impl From<anyhow::Error> for SlowPathError {
    fn from(err: anyhow::Error) -> Self {
        SlowPathError::Browser(format!("{err:#}"))
    }
}
