//! Failure recording sink.
//!
//! Failed searches are recorded for offline learning (query rewrites, new
//! hard mappings). The engine only writes; persistence and the analytics on
//! top are external. Recording must never fail in a way the search path can
//! observe.

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

/// Everything the offline analyzer needs about one failed search.
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub original_query: String,
    pub normalized_query: String,
    /// Candidates in the order they were tried.
    pub candidates: Vec<String>,
    pub error_message: String,
    pub detected_category: Option<String>,
    pub detected_brand: Option<String>,
    pub detected_model: Option<String>,
    pub attempted_count: u32,
}

/// Write-only failure sink. Implementations swallow their own errors.
#[async_trait]
pub trait FailureRecorder: Send + Sync {
    async fn record_failure(&self, record: FailureRecord);
}

/// Default recorder: structured log line, picked up by log shipping.
pub struct LogRecorder;

#[async_trait]
impl FailureRecorder for LogRecorder {
    async fn record_failure(&self, record: FailureRecord) {
        info!(
            original = %record.original_query,
            normalized = %record.normalized_query,
            candidates = record.candidates.len(),
            error = %record.error_message,
            category = record.detected_category.as_deref().unwrap_or("-"),
            "search failure recorded"
        );
    }
}
