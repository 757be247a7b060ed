//! Orchestrator pipeline scenarios with stub executors.
//!
//! These exercise stage sequencing, fallback policy, breaker gating, cache
//! write-back, and budget accounting without any network or browser.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use pricescout::cache::{CacheAdapter, CacheEntry, MemoryBackend};
use pricescout::config::EngineConfig;
use pricescout::engine::{
    BreakerConfig, BudgetConfig, CircuitBreaker, FastPathError, PriceFinding, SearchOrchestrator,
    SearchStatus, SlowPathError, Source,
};
use pricescout::fastpath::FastPath;
use pricescout::normalize::Normalizer;
use pricescout::recorder::LogRecorder;
use pricescout::slowpath::SlowPath;

fn finding(pcode: &str, price: u32) -> PriceFinding {
    PriceFinding {
        product_url: format!("https://prod.example.com/info/?pcode={pcode}"),
        price,
        product_name: Some("테스트 상품".to_string()),
        mall: Some("테스트몰".to_string()),
        free_shipping: Some(true),
        product_id: Some(pcode.to_string()),
        top_prices: Vec::new(),
    }
}

type FastPathReply = Result<Option<PriceFinding>, &'static str>;

/// Scripted fast path: replays a fixed reply, counting invocations and
/// optionally sleeping first.
struct StubFastPath {
    reply: FastPathReply,
    delay: Duration,
    calls: AtomicUsize,
}

impl StubFastPath {
    fn new(reply: FastPathReply) -> Self {
        Self {
            reply,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    fn with_delay(reply: FastPathReply, delay: Duration) -> Self {
        Self {
            reply,
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn error_for(tag: &str) -> FastPathError {
        match tag {
            "no_results" => FastPathError::NoResults,
            "timeout" => FastPathError::Timeout,
            "blocked" => FastPathError::Blocked("captcha".to_string()),
            "fetch_failed" => FastPathError::ProductFetchFailed {
                product_id: "777".to_string(),
                reason: "detail blocked".to_string(),
            },
            _ => FastPathError::Parse("bad html".to_string()),
        }
    }
}

#[async_trait]
impl FastPath for StubFastPath {
    async fn execute(
        &self,
        _query: &str,
        _candidates: &[String],
        _timeout: Duration,
    ) -> Result<Option<PriceFinding>, FastPathError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.reply {
            Ok(value) => Ok(value.clone()),
            Err(tag) => Err(Self::error_for(tag)),
        }
    }
}

type SlowPathReply = Result<PriceFinding, &'static str>;

struct StubSlowPath {
    reply: SlowPathReply,
    calls: AtomicUsize,
    last_hint: parking_lot::Mutex<Option<String>>,
}

impl StubSlowPath {
    fn new(reply: SlowPathReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_hint: parking_lot::Mutex::new(None),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn error_for(tag: &str) -> SlowPathError {
        match tag {
            "not_found" => SlowPathError::NotFound {
                reason: "search".to_string(),
            },
            "disabled" => SlowPathError::NotFound {
                reason: "disabled".to_string(),
            },
            "timeout" => SlowPathError::Timeout,
            "blocked" => SlowPathError::Blocked("captcha".to_string()),
            _ => SlowPathError::Parse("selector missing".to_string()),
        }
    }
}

#[async_trait]
impl SlowPath for StubSlowPath {
    async fn execute(
        &self,
        _query: &str,
        _candidates: &[String],
        _timeout: Duration,
        product_id_hint: Option<&str>,
    ) -> Result<PriceFinding, SlowPathError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_hint.lock() = product_id_hint.map(str::to_string);
        match &self.reply {
            Ok(value) => Ok(value.clone()),
            Err(tag) => Err(Self::error_for(tag)),
        }
    }
}

struct Harness {
    orchestrator: SearchOrchestrator,
    cache: Arc<CacheAdapter>,
    fastpath: Arc<StubFastPath>,
    slowpath: Arc<StubSlowPath>,
    breaker: Arc<CircuitBreaker>,
    normalizer: Arc<Normalizer>,
}

fn harness(config: EngineConfig, fastpath: StubFastPath, slowpath: StubSlowPath) -> Harness {
    let cache = Arc::new(CacheAdapter::new(Arc::new(MemoryBackend::new())));
    let fastpath = Arc::new(fastpath);
    let slowpath = Arc::new(slowpath);
    let breaker = Arc::new(CircuitBreaker::new(config.breaker.clone()));
    let normalizer = Arc::new(Normalizer::default());

    let orchestrator = SearchOrchestrator::new(
        config,
        Arc::clone(&normalizer),
        Arc::clone(&cache),
        Arc::clone(&fastpath) as Arc<dyn FastPath>,
        Arc::clone(&slowpath) as Arc<dyn SlowPath>,
        Arc::clone(&breaker),
        Arc::new(LogRecorder),
    )
    .expect("valid config");

    Harness {
        orchestrator,
        cache,
        fastpath,
        slowpath,
        breaker,
        normalizer,
    }
}

fn default_harness(fastpath: StubFastPath, slowpath: StubSlowPath) -> Harness {
    harness(EngineConfig::default(), fastpath, slowpath)
}

#[tokio::test]
async fn scenario_cache_hit_returns_without_executors() {
    let h = default_harness(
        StubFastPath::new(Err("parse")),
        StubSlowPath::new(Err("not_found")),
    );

    let key = h.normalizer.normalize("신라면");
    h.cache
        .set(
            &key,
            &CacheEntry {
                product_url: "https://prod.example.com/info/?pcode=111".to_string(),
                price: 2986,
                product_name: None,
                mall: None,
                free_shipping: None,
            },
            Duration::from_secs(60),
        )
        .await;

    let result = h.orchestrator.search("신라면").await;
    assert_eq!(result.status, SearchStatus::CacheHit);
    assert_eq!(result.price, Some(2986));
    assert_eq!(result.source, Some(Source::Cache));
    assert!(result.elapsed_ms < 300, "elapsed {}ms", result.elapsed_ms);
    assert_eq!(h.fastpath.calls(), 0);
    assert_eq!(h.slowpath.calls(), 0);
}

#[tokio::test]
async fn scenario_fastpath_success_then_cache_hit() {
    let h = default_harness(
        StubFastPath::new(Ok(Some(finding("222", 1_299_000)))),
        StubSlowPath::new(Err("not_found")),
    );

    let first = h.orchestrator.search("Apple 2024 맥북 에어 13 M4").await;
    assert_eq!(first.status, SearchStatus::FastPathSuccess);
    assert_eq!(first.price, Some(1_299_000));
    assert_eq!(first.source, Some(Source::FastPath));
    assert!(first.is_success());

    // Two calls in quick succession: the second must come from cache.
    let second = h.orchestrator.search("Apple 2024 맥북 에어 13 M4").await;
    assert_eq!(second.status, SearchStatus::CacheHit);
    assert_eq!(second.price, Some(1_299_000));
    assert_eq!(h.fastpath.calls(), 1);
}

#[tokio::test]
async fn fastpath_empty_result_falls_through_to_slowpath() {
    let h = default_harness(
        StubFastPath::new(Ok(None)),
        StubSlowPath::new(Ok(finding("333", 89_000))),
    );

    let result = h.orchestrator.search("맥북 에어 M4").await;
    assert_eq!(result.status, SearchStatus::SlowPathSuccess);
    assert_eq!(result.source, Some(Source::SlowPath));
    assert_eq!(h.fastpath.calls(), 1);
    assert_eq!(h.slowpath.calls(), 1);
}

#[tokio::test]
async fn scenario_no_results_is_negative_cached() {
    let h = default_harness(
        StubFastPath::new(Err("no_results")),
        StubSlowPath::new(Err("not_found")),
    );

    let first = h.orchestrator.search("존재하지않는상품xyz").await;
    assert_eq!(first.status, SearchStatus::NoResults);
    assert_eq!(h.fastpath.calls(), 1);
    // Confirmed empty search is terminal; the browser is not consulted.
    assert_eq!(h.slowpath.calls(), 0);

    // Within the negative TTL the second call never reaches an executor.
    let second = h.orchestrator.search("존재하지않는상품xyz").await;
    assert_eq!(second.status, SearchStatus::NoResults);
    assert_eq!(h.fastpath.calls(), 1);
    assert_eq!(h.slowpath.calls(), 0);
}

#[tokio::test]
async fn no_results_does_not_count_against_the_breaker() {
    let h = default_harness(
        StubFastPath::new(Err("no_results")),
        StubSlowPath::new(Err("not_found")),
    );
    h.orchestrator.search("존재하지않는상품").await;
    assert_eq!(h.breaker.metrics().fastpath_misses, 0);
}

#[tokio::test]
async fn scenario_breaker_opens_and_skips_fastpath() {
    let mut config = EngineConfig::default();
    config.breaker = BreakerConfig {
        fail_threshold: 3,
        open_duration: Duration::from_secs(60),
    };
    let h = harness(
        config,
        StubFastPath::new(Err("timeout")),
        StubSlowPath::new(Ok(finding("444", 10_000))),
    );

    for i in 0..3 {
        let result = h.orchestrator.search(&format!("상품{i}")).await;
        assert_eq!(result.status, SearchStatus::SlowPathSuccess);
    }
    assert_eq!(h.fastpath.calls(), 3);
    assert!(h.breaker.is_open());

    // Fourth search: stage 2 is skipped entirely.
    let result = h.orchestrator.search("상품4").await;
    assert_eq!(result.status, SearchStatus::SlowPathSuccess);
    assert_eq!(h.fastpath.calls(), 3);
}

#[tokio::test]
async fn scenario_budget_exhaustion_skips_slowpath() {
    let mut config = EngineConfig::default();
    config.budget = BudgetConfig {
        total: Duration::from_millis(1000),
        cache_timeout: Duration::from_millis(100),
        fastpath_timeout: Duration::from_millis(400),
        slowpath_timeout: Duration::from_millis(500),
        min_remaining: Duration::from_millis(100),
    };
    // The fast path overruns its 400ms allocation (the orchestrator grants
    // a grace window) and leaves less than the slow path needs.
    let h = harness(
        config,
        StubFastPath::with_delay(Err("parse"), Duration::from_millis(600)),
        StubSlowPath::new(Ok(finding("555", 10_000))),
    );

    let result = h.orchestrator.search("뭐든지").await;
    assert_eq!(result.status, SearchStatus::BudgetExhausted);
    assert_eq!(h.slowpath.calls(), 0);
    let report = result.budget_report.expect("exhaustion carries report");
    assert!(report.checkpoints.contains_key("fastpath_failed"));
}

#[tokio::test]
async fn slowpath_error_mapping_covers_the_taxonomy() {
    for (tag, expected) in [
        ("not_found", SearchStatus::NoResults),
        ("disabled", SearchStatus::NoResults),
        ("timeout", SearchStatus::Timeout),
        ("blocked", SearchStatus::Blocked),
        ("parse", SearchStatus::ParseError),
    ] {
        let h = default_harness(StubFastPath::new(Ok(None)), StubSlowPath::new(Err(tag)));
        let result = h.orchestrator.search("맥북 에어").await;
        assert_eq!(result.status, expected, "for slow path error {tag}");
        assert!(result.is_error());
    }
}

#[tokio::test]
async fn timeout_results_carry_a_budget_report() {
    let h = default_harness(StubFastPath::new(Ok(None)), StubSlowPath::new(Err("timeout")));
    let result = h.orchestrator.search("맥북 에어").await;
    assert_eq!(result.status, SearchStatus::Timeout);
    let report = result.budget_report.expect("timeout carries report");
    assert!(report.checkpoints.contains_key("cache_miss"));
    assert!(report.checkpoints.contains_key("slowpath_failed"));
}

#[tokio::test]
async fn pcode_hint_flows_from_fastpath_to_slowpath() {
    let h = default_harness(
        StubFastPath::new(Err("fetch_failed")),
        StubSlowPath::new(Ok(finding("777", 55_000))),
    );

    let result = h.orchestrator.search("맥북 에어 M4").await;
    assert_eq!(result.status, SearchStatus::SlowPathSuccess);
    assert_eq!(h.slowpath.last_hint.lock().as_deref(), Some("777"));
}

#[tokio::test]
async fn empty_and_unnormalizable_queries_never_reach_executors() {
    let h = default_harness(
        StubFastPath::new(Ok(Some(finding("1", 1)))),
        StubSlowPath::new(Err("not_found")),
    );

    for query in ["", "   ", "[]()"] {
        let result = h.orchestrator.search(query).await;
        assert_eq!(result.status, SearchStatus::NoResults, "for query {query:?}");
    }
    assert_eq!(h.fastpath.calls(), 0);
    assert_eq!(h.slowpath.calls(), 0);
}

#[tokio::test]
async fn invalid_fastpath_findings_are_rejected_and_fall_through() {
    let bogus = PriceFinding {
        product_url: "not-a-url".to_string(),
        price: 1000,
        product_name: None,
        mall: None,
        free_shipping: None,
        product_id: None,
        top_prices: Vec::new(),
    };
    let h = default_harness(
        StubFastPath::new(Ok(Some(bogus))),
        StubSlowPath::new(Ok(finding("888", 42_000))),
    );

    let result = h.orchestrator.search("맥북 에어").await;
    assert_eq!(result.status, SearchStatus::SlowPathSuccess);
    assert_eq!(h.breaker.metrics().fastpath_misses, 1);
}

#[tokio::test]
async fn successful_searches_respect_the_total_budget() {
    let h = default_harness(
        StubFastPath::new(Ok(Some(finding("222", 1_299_000)))),
        StubSlowPath::new(Err("not_found")),
    );
    let result = h.orchestrator.search("맥북 에어 M4").await;
    let total_ms = EngineConfig::default().budget.total.as_millis();
    assert!(result.elapsed_ms <= total_ms + 500, "elapsed {}ms", result.elapsed_ms);
}

#[tokio::test]
async fn slowpath_metrics_are_recorded_on_the_breaker() {
    let h = default_harness(StubFastPath::new(Ok(None)), StubSlowPath::new(Ok(finding("9", 900))));
    h.orchestrator.search("맥북 에어").await;
    let metrics = h.breaker.metrics();
    assert_eq!(metrics.slowpath_hits, 1);
    assert_eq!(metrics.fastpath_misses, 1);
}
