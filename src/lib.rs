//! pricescout: budgeted price search against an upstream comparison catalog.
//!
//! One call to [`SearchOrchestrator::search`] runs the full pipeline —
//! cache lookup, HTTP fast path, headless-browser slow path — under a hard
//! wall-clock budget, and always returns a [`SearchResult`] rather than an
//! error.

pub mod cache;
pub mod config;
pub mod engine;
pub mod fastpath;
pub mod matching;
pub mod normalize;
pub mod recorder;
pub mod slowpath;
pub mod utils;

use std::sync::Arc;

pub use cache::{CacheAdapter, CacheBackend, CacheEntry, MemoryBackend};
pub use config::{EngineConfig, FastPathConfig, SlowPathBackend, SlowPathConfig};
pub use engine::{
    BreakerConfig, BreakerMetrics, BudgetConfig, BudgetManager, BudgetReport, CircuitBreaker,
    FastPathError, MallOffer, PriceFinding, SearchOrchestrator, SearchResult, SearchStatus,
    SlowPathError, Source, Stage,
};
pub use fastpath::{FastPath, HttpFastPath};
pub use normalize::Normalizer;
pub use recorder::{FailureRecord, FailureRecorder, LogRecorder};
pub use slowpath::{ChromiumSlowPath, DisabledSlowPath, SharedBrowser, SlowPath};

/// Wire a ready-to-use orchestrator from a configuration: in-memory cache,
/// shared HTTP fast path, and the configured slow-path backend.
///
/// Deployments with their own cache backend or failure sink construct
/// [`SearchOrchestrator`] directly instead.
pub fn build_engine(config: EngineConfig) -> anyhow::Result<SearchOrchestrator> {
    let cache = Arc::new(CacheAdapter::new(Arc::new(MemoryBackend::new())));
    let fastpath: Arc<dyn FastPath> = Arc::new(HttpFastPath::new(config.fastpath.clone()));
    let slowpath: Arc<dyn SlowPath> = match config.slowpath.backend {
        SlowPathBackend::Chromium => Arc::new(ChromiumSlowPath::new(
            config.slowpath.clone(),
            config.fastpath.search_base.clone(),
            config.fastpath.product_base.clone(),
        )),
        SlowPathBackend::Disabled => Arc::new(DisabledSlowPath),
    };

    let breaker = Arc::new(CircuitBreaker::new(config.breaker.clone()));
    SearchOrchestrator::new(
        config,
        Arc::new(Normalizer::default()),
        cache,
        fastpath,
        slowpath,
        breaker,
        Arc::new(LogRecorder),
    )
}
