//! Search orchestrator: cache → fast path → slow path under one budget.
//!
//! This is the only boundary where executor errors become statuses. Stages
//! run strictly in order within one search; the breaker, cache, and
//! recorder are shared across searches.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::{CacheAdapter, CacheEntry};
use crate::config::EngineConfig;
use crate::fastpath::FastPath;
use crate::normalize::Normalizer;
use crate::recorder::{FailureRecord, FailureRecorder};
use crate::slowpath::SlowPath;
use crate::utils::is_valid_url;

use super::breaker::CircuitBreaker;
use super::budget::{BudgetManager, Stage};
use super::error::{FastPathError, SlowPathError};
use super::result::{PriceFinding, SearchResult};
use super::strategy::ExecutionStrategy;

/// Grace added to the fast path's stage allocation before the orchestrator
/// tears it down. The executor manages its own per-request deadlines; the
/// grace lets an in-flight request finish instead of being cancelled at the
/// stage boundary, at the cost of eating into the slow path's budget.
const FASTPATH_GRACE: std::time::Duration = std::time::Duration::from_secs(2);

/// Pipeline controller. One instance per process; stateless across
/// invocations except for the shared dependencies it holds.
pub struct SearchOrchestrator {
    config: EngineConfig,
    normalizer: Arc<Normalizer>,
    cache: Arc<CacheAdapter>,
    fastpath: Arc<dyn FastPath>,
    slowpath: Arc<dyn SlowPath>,
    breaker: Arc<CircuitBreaker>,
    recorder: Arc<dyn FailureRecorder>,
    strategy: ExecutionStrategy,
}

impl SearchOrchestrator {
    pub fn new(
        config: EngineConfig,
        normalizer: Arc<Normalizer>,
        cache: Arc<CacheAdapter>,
        fastpath: Arc<dyn FastPath>,
        slowpath: Arc<dyn SlowPath>,
        breaker: Arc<CircuitBreaker>,
        recorder: Arc<dyn FailureRecorder>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            normalizer,
            cache,
            fastpath,
            slowpath,
            breaker,
            recorder,
            strategy: ExecutionStrategy,
        })
    }

    /// The shared circuit breaker (for monitoring surfaces).
    #[must_use]
    pub fn breaker(&self) -> Arc<CircuitBreaker> {
        Arc::clone(&self.breaker)
    }

    /// Run the full pipeline for one query.
    pub async fn search(&self, query: &str) -> SearchResult {
        let mut budget = BudgetManager::new(self.config.budget.clone());
        budget.start();

        if query.trim().is_empty() {
            return SearchResult::no_results(query, budget.elapsed().as_millis());
        }

        let normalized = self.normalizer.normalize(query);
        if normalized.is_empty() {
            debug!(query, "query normalized to empty, skipping executors");
            return SearchResult::no_results(query, budget.elapsed().as_millis());
        }
        let candidates = self.normalizer.candidates(query);
        info!(query, normalized = %normalized, candidates = candidates.len(), "search started");

        // Stage 1 — cache.
        if let Some(result) = self.try_cache(query, &normalized, &mut budget).await {
            return result;
        }

        // Stage 2 — HTTP fast path.
        let mut product_id_hint: Option<String> = None;
        if self.breaker.is_open() {
            info!("circuit breaker open, skipping fast path");
        } else if budget.can_execute(Stage::FastPath) {
            match self
                .try_fastpath(query, &normalized, &candidates, &mut budget)
                .await
            {
                FastPathOutcome::Done(result) => return result,
                FastPathOutcome::Fallback { pcode } => product_id_hint = pcode,
            }
        } else {
            warn!(
                remaining_s = budget.remaining().as_secs_f64(),
                "fast path skipped, insufficient budget"
            );
        }

        // Stage 3 — browser slow path.
        self.try_slowpath(query, &normalized, &candidates, product_id_hint, &mut budget)
            .await
    }

    async fn try_cache(
        &self,
        query: &str,
        normalized: &str,
        budget: &mut BudgetManager,
    ) -> Option<SearchResult> {
        let timeout = budget.timeout_for(Stage::Cache);
        if let Some(entry) = self.cache.get(normalized, timeout).await {
            budget.checkpoint("cache_hit");
            info!(query, price = entry.price, "cache hit");
            return Some(SearchResult::from_cache(
                PriceFinding {
                    product_url: entry.product_url,
                    price: entry.price,
                    product_name: entry.product_name,
                    mall: entry.mall,
                    free_shipping: entry.free_shipping,
                    product_id: None,
                    top_prices: Vec::new(),
                },
                query,
                budget.elapsed().as_millis(),
            ));
        }

        if let Some(message) = self.cache.get_negative(normalized).await {
            budget.checkpoint("negative_cache_hit");
            info!(query, message = %message, "negative cache hit, suppressing crawl");
            return Some(SearchResult::no_results(query, budget.elapsed().as_millis()));
        }

        budget.checkpoint("cache_miss");
        None
    }

    async fn try_fastpath(
        &self,
        query: &str,
        normalized: &str,
        candidates: &[String],
        budget: &mut BudgetManager,
    ) -> FastPathOutcome {
        let timeout = budget.timeout_for(Stage::FastPath);
        debug!(timeout_s = timeout.as_secs_f64(), "fast path executing");

        let outcome = tokio::time::timeout(
            timeout + FASTPATH_GRACE,
            self.fastpath.execute(normalized, candidates, timeout),
        )
        .await;

        match outcome {
            Ok(Ok(Some(finding))) => {
                if !validate_finding(&finding) {
                    warn!(url = %finding.product_url, price = finding.price, "fast path returned invalid finding");
                    budget.checkpoint("fastpath_failed");
                    self.breaker.record_failure();
                    return FastPathOutcome::Fallback { pcode: None };
                }
                budget.checkpoint("fastpath_success");
                self.breaker.record_success();
                self.write_back(normalized, &finding).await;
                info!(query, price = finding.price, elapsed_s = budget.elapsed().as_secs_f64(), "fast path success");
                FastPathOutcome::Done(SearchResult::from_fastpath(
                    finding,
                    query,
                    budget.elapsed().as_millis(),
                ))
            }
            Ok(Ok(None)) => {
                debug!(query, "fast path came up empty");
                budget.checkpoint("fastpath_failed");
                self.breaker.record_failure();
                FastPathOutcome::Fallback { pcode: None }
            }
            Ok(Err(FastPathError::NoResults)) => {
                // Confirmed empty catalog: terminal, negative-cached, and
                // not a breaker failure.
                budget.checkpoint("fastpath_no_results");
                info!(query, "upstream confirmed no results");
                self.cache
                    .set_negative(normalized, "No products found", self.config.cache_ttl_negative)
                    .await;
                let result = SearchResult::no_results(query, budget.elapsed().as_millis());
                self.record_failure(query, normalized, candidates, "No products found")
                    .await;
                FastPathOutcome::Done(result)
            }
            Ok(Err(error)) => {
                budget.checkpoint("fastpath_failed");
                if error.counts_as_breaker_failure() {
                    self.breaker.record_failure();
                }
                warn!(query, error = %error, "fast path failed");

                let pcode = match &error {
                    FastPathError::ProductFetchFailed { product_id, .. } => {
                        Some(product_id.clone())
                    }
                    _ => None,
                };
                if self.strategy.should_fallback_to_slowpath(&error) {
                    FastPathOutcome::Fallback { pcode }
                } else {
                    let result = SearchResult::no_results(query, budget.elapsed().as_millis());
                    FastPathOutcome::Done(result)
                }
            }
            Err(_elapsed) => {
                budget.checkpoint("fastpath_failed");
                self.breaker.record_failure();
                warn!(
                    query,
                    remaining_s = budget.remaining().as_secs_f64(),
                    "fast path stage timeout"
                );
                FastPathOutcome::Fallback { pcode: None }
            }
        }
    }

    async fn try_slowpath(
        &self,
        query: &str,
        normalized: &str,
        candidates: &[String],
        product_id_hint: Option<String>,
        budget: &mut BudgetManager,
    ) -> SearchResult {
        if !budget.can_execute(Stage::SlowPath) {
            warn!(
                query,
                remaining_s = budget.remaining().as_secs_f64(),
                "slow path skipped, budget exhausted"
            );
            let result = SearchResult::budget_exhausted(
                query,
                budget.elapsed().as_millis(),
                budget.report(),
            );
            self.record_failure(query, normalized, candidates, "Budget exhausted")
                .await;
            return result;
        }

        let timeout = budget.timeout_for(Stage::SlowPath);
        debug!(timeout_s = timeout.as_secs_f64(), hint = ?product_id_hint, "slow path executing");

        let outcome = tokio::time::timeout(
            timeout,
            self.slowpath
                .execute(normalized, candidates, timeout, product_id_hint.as_deref()),
        )
        .await;

        match outcome {
            Ok(Ok(finding)) => {
                if !validate_finding(&finding) {
                    warn!(url = %finding.product_url, price = finding.price, "slow path returned invalid finding");
                    budget.checkpoint("slowpath_failed");
                    self.breaker.record_slowpath_failure();
                    return SearchResult::parse_error(
                        query,
                        budget.elapsed().as_millis(),
                        "slow path returned invalid result".to_string(),
                    );
                }
                budget.checkpoint("slowpath_success");
                self.breaker.record_slowpath_hit();
                self.write_back(normalized, &finding).await;
                info!(query, price = finding.price, elapsed_s = budget.elapsed().as_secs_f64(), "slow path success");
                SearchResult::from_slowpath(finding, query, budget.elapsed().as_millis())
            }
            Ok(Err(SlowPathError::NotFound { reason })) => {
                budget.checkpoint("slowpath_failed");
                self.breaker.record_slowpath_failure();
                info!(query, reason = %reason, "slow path found nothing");
                self.cache
                    .set_negative(normalized, "No products found", self.config.cache_ttl_negative)
                    .await;
                self.record_failure(query, normalized, candidates, "No products found")
                    .await;
                SearchResult::no_results(query, budget.elapsed().as_millis())
            }
            Ok(Err(SlowPathError::Timeout)) => {
                budget.checkpoint("slowpath_failed");
                self.breaker.record_slowpath_failure();
                self.record_failure(query, normalized, candidates, "Search timeout exceeded")
                    .await;
                SearchResult::timeout(query, budget.elapsed().as_millis(), budget.report())
            }
            Ok(Err(SlowPathError::Blocked(keyword))) => {
                budget.checkpoint("slowpath_failed");
                self.breaker.record_slowpath_failure();
                warn!(query, keyword = %keyword, "slow path blocked");
                self.record_failure(query, normalized, candidates, "Request blocked")
                    .await;
                SearchResult::blocked(query, budget.elapsed().as_millis())
            }
            Ok(Err(error @ (SlowPathError::Parse(_) | SlowPathError::Browser(_)))) => {
                budget.checkpoint("slowpath_failed");
                self.breaker.record_slowpath_failure();
                let message = error.to_string();
                warn!(query, error = %message, "slow path parse-class failure");
                self.record_failure(query, normalized, candidates, &message).await;
                SearchResult::parse_error(query, budget.elapsed().as_millis(), message)
            }
            Err(_elapsed) => {
                budget.checkpoint("slowpath_failed");
                self.breaker.record_slowpath_failure();
                warn!(query, "slow path stage timeout");
                self.record_failure(query, normalized, candidates, "Search timeout exceeded")
                    .await;
                SearchResult::timeout(query, budget.elapsed().as_millis(), budget.report())
            }
        }
    }

    /// Best-effort cache write-back; never writes invalid entries, never
    /// propagates failures.
    async fn write_back(&self, normalized: &str, finding: &PriceFinding) {
        if finding.price == 0 || finding.product_url.is_empty() {
            return;
        }
        self.cache
            .set(
                normalized,
                &CacheEntry {
                    product_url: finding.product_url.clone(),
                    price: finding.price,
                    product_name: finding.product_name.clone(),
                    mall: finding.mall.clone(),
                    free_shipping: finding.free_shipping,
                },
                self.config.cache_ttl_positive,
            )
            .await;
    }

    async fn record_failure(
        &self,
        query: &str,
        normalized: &str,
        candidates: &[String],
        message: &str,
    ) {
        let (brand, model) = self.normalizer.extract_brand_and_model(query);
        self.recorder
            .record_failure(FailureRecord {
                original_query: query.to_string(),
                normalized_query: normalized.to_string(),
                candidates: candidates.to_vec(),
                error_message: message.to_string(),
                detected_category: self.normalizer.detect_category(query),
                detected_brand: (!brand.is_empty()).then_some(brand),
                detected_model: (!model.is_empty()).then_some(model),
                attempted_count: candidates.len() as u32,
            })
            .await;
    }
}

enum FastPathOutcome {
    /// Terminal: return this result.
    Done(SearchResult),
    /// Continue to the slow path, optionally carrying a located pcode.
    Fallback { pcode: Option<String> },
}

fn validate_finding(finding: &PriceFinding) -> bool {
    finding.price > 0 && is_valid_url(&finding.product_url)
}
