//! Browser slow path executor.
//!
//! The JavaScript-rendered route for queries the HTTP fast path could not
//! resolve. Page lifetimes are bounded by a process-wide semaphore, every
//! page closes on every exit path, and the whole run respects the stage
//! deadline handed down by the orchestrator.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::SlowPathConfig;
use crate::engine::error::SlowPathError;
use crate::engine::result::PriceFinding;
use crate::fastpath::parsing::parse_product_lowest_price;
use crate::matching::weighted_match_score;
use crate::utils::{build_detail_url, build_search_url, extract_product_id};

use super::browser::SharedBrowser;
use super::page::{close_page, configure_page, toggle_shipping_included, wait_for_selector};

/// Accept a link outright at or above this score.
const SCORE_ACCEPT: f64 = 30.0;
/// Below `SCORE_ACCEPT` but at or above this, accept as low-confidence.
const SCORE_FLOOR: f64 = 10.0;
/// Reject detail pages whose title scores below this against the query
/// (defense against silent redirects to a different product).
const DETAIL_VERIFY_THRESHOLD: f64 = 45.0;
/// Minimum budget worth starting the detail phase with.
const DETAIL_MIN_REMAINING: Duration = Duration::from_secs(2);
const SEARCH_RESULT_SELECTOR: &str = r#".prod_item, a[href*="pcode="]"#;
const PRICE_AREA_SELECTOR: &str = "#lowPriceCompanyArea";
const LINK_LIMIT: usize = 12;

/// Slow path seam consumed by the orchestrator.
#[async_trait]
pub trait SlowPath: Send + Sync {
    /// Run a browser search. `product_id_hint` carries a pcode the fast
    /// path located but could not fetch; when present the search phase is
    /// skipped entirely.
    async fn execute(
        &self,
        query: &str,
        candidates: &[String],
        timeout: Duration,
        product_id_hint: Option<&str>,
    ) -> Result<PriceFinding, SlowPathError>;
}

/// Drop-in slow path for deployments without browser memory headroom.
/// Imposes no runtime cost; the orchestrator treats the result like an
/// honest no-results.
pub struct DisabledSlowPath;

#[async_trait]
impl SlowPath for DisabledSlowPath {
    async fn execute(
        &self,
        query: &str,
        _candidates: &[String],
        timeout: Duration,
        _product_id_hint: Option<&str>,
    ) -> Result<PriceFinding, SlowPathError> {
        info!(query, timeout_s = timeout.as_secs_f64(), "slow path disabled, skipping");
        Err(SlowPathError::not_found("disabled"))
    }
}

/// Pick the best-scoring link under the two-tier threshold policy.
///
/// Returns the winning index and whether the acceptance was low-confidence.
#[must_use]
pub fn choose_best_link(scores: &[f64]) -> Option<(usize, bool)> {
    let (best_idx, best_score) = scores
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))?;
    if *best_score >= SCORE_ACCEPT {
        Some((best_idx, false))
    } else if *best_score >= SCORE_FLOOR {
        Some((best_idx, true))
    } else {
        None
    }
}

/// Chromium-backed slow path.
pub struct ChromiumSlowPath {
    config: SlowPathConfig,
    search_base: String,
    product_base: String,
    browser: Arc<SharedBrowser>,
    semaphore: Arc<Semaphore>,
}

impl ChromiumSlowPath {
    #[must_use]
    pub fn new(config: SlowPathConfig, search_base: String, product_base: String) -> Self {
        let browser = Arc::new(SharedBrowser::new(&config.user_agent));
        let semaphore = Arc::new(Semaphore::new(config.browser_concurrency));
        Self {
            config,
            search_base,
            product_base,
            browser,
            semaphore,
        }
    }

    /// The shared browser, for process-exit shutdown hooks.
    #[must_use]
    pub fn browser(&self) -> Arc<SharedBrowser> {
        Arc::clone(&self.browser)
    }

    async fn acquire_slot(
        &self,
        wait: Duration,
    ) -> Result<tokio::sync::OwnedSemaphorePermit, SlowPathError> {
        match tokio::time::timeout(wait, Arc::clone(&self.semaphore).acquire_owned()).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_)) => Err(SlowPathError::not_found("busy")),
            Err(_) => {
                warn!(?wait, "browser semaphore acquire timed out");
                Err(SlowPathError::not_found("busy"))
            }
        }
    }

    async fn rate_limit(&self, deadline: Instant) {
        let jitter = {
            let mut rng = rand::rng();
            let secs = rng.random_range(
                self.config.rate_limit_min.as_secs_f64()..=self.config.rate_limit_max.as_secs_f64(),
            );
            Duration::from_secs_f64(secs)
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        let delay = jitter.min(remaining / 2);
        debug!(delay_s = delay.as_secs_f64(), "rate limit delay");
        tokio::time::sleep(delay).await;
    }

    /// Search phase: navigate candidates until one renders results, then
    /// score the rendered links against the candidate that succeeded.
    async fn search_product_id(
        &self,
        candidates: &[String],
        deadline: Instant,
    ) -> Result<String, SlowPathError> {
        let page = self.browser.new_page().await?;
        configure_page(&page).await.map_err(SlowPathError::from)?;

        let result = self.search_on_page(&page, candidates, deadline).await;
        close_page(page).await;
        result
    }

    async fn search_on_page(
        &self,
        page: &chromiumoxide::page::Page,
        candidates: &[String],
        deadline: Instant,
    ) -> Result<String, SlowPathError> {
        let mut used_candidate: Option<&str> = None;

        for (idx, candidate) in candidates.iter().enumerate() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining < Duration::from_millis(500) {
                break;
            }
            let url = build_search_url(&self.search_base, candidate);
            debug!(attempt = idx + 1, candidate = %candidate, "slow path search navigation");

            let goto = tokio::time::timeout(remaining, page.goto(url.clone())).await;
            match goto {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => {
                    debug!(error = %err, "navigation failed");
                    continue;
                }
                Err(_) => return Err(SlowPathError::Timeout),
            }

            let wait = remaining.min(deadline.saturating_duration_since(Instant::now()));
            if wait_for_selector(page, SEARCH_RESULT_SELECTOR, wait).await.is_some() {
                used_candidate = Some(candidate);
                break;
            }
        }

        let Some(used_candidate) = used_candidate else {
            return Err(SlowPathError::not_found("search"));
        };

        let mut links = page
            .find_elements(r#".prod_item .prod_name a[href*="pcode="]"#)
            .await
            .unwrap_or_default();
        if links.is_empty() {
            links = page
                .find_elements(r#"a[href*="pcode="]"#)
                .await
                .unwrap_or_default();
        }
        if links.is_empty() {
            return Err(SlowPathError::not_found("search"));
        }
        links.truncate(LINK_LIMIT);

        let mut scores = Vec::with_capacity(links.len());
        let mut hrefs = Vec::with_capacity(links.len());
        for link in &links {
            let text = match link.inner_text().await {
                Ok(Some(text)) if !text.trim().is_empty() => text,
                _ => link
                    .attribute("title")
                    .await
                    .ok()
                    .flatten()
                    .unwrap_or_default(),
            };
            let href = link.attribute("href").await.ok().flatten().unwrap_or_default();
            scores.push(weighted_match_score(used_candidate, &text));
            hrefs.push(href);
        }

        let Some((best_idx, low_confidence)) = choose_best_link(&scores) else {
            warn!(candidate = %used_candidate, "no link matched with sufficient score");
            return Err(SlowPathError::not_found("search"));
        };
        if low_confidence {
            info!(score = scores[best_idx], "accepting low-confidence match");
        }

        extract_product_id(&hrefs[best_idx]).ok_or_else(|| SlowPathError::not_found("search"))
    }

    /// Detail phase: render the product page, verify the title still
    /// matches the query, and parse the mall-price block from the rendered
    /// DOM.
    async fn fetch_detail(
        &self,
        query: &str,
        product_id: &str,
        deadline: Instant,
    ) -> Result<PriceFinding, SlowPathError> {
        let page = self.browser.new_page().await?;
        configure_page(&page).await.map_err(SlowPathError::from)?;

        let result = self.detail_on_page(&page, query, product_id, deadline).await;
        close_page(page).await;
        result
    }

    async fn detail_on_page(
        &self,
        page: &chromiumoxide::page::Page,
        query: &str,
        product_id: &str,
        deadline: Instant,
    ) -> Result<PriceFinding, SlowPathError> {
        let url = build_detail_url(&self.product_base, product_id, query);
        let remaining = deadline.saturating_duration_since(Instant::now());

        match tokio::time::timeout(remaining, page.goto(url.clone())).await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => return Err(SlowPathError::Browser(err.to_string())),
            Err(_) => return Err(SlowPathError::Timeout),
        }

        let wait = Duration::from_secs(5).min(deadline.saturating_duration_since(Instant::now()));
        let price_area = wait_for_selector(page, PRICE_AREA_SELECTOR, wait).await;

        let html = match page.content().await {
            Ok(html) => html,
            Err(err) => return Err(SlowPathError::Browser(err.to_string())),
        };

        if price_area.is_none() {
            // Discontinued products and report pages drop the price area.
            if html.contains("discontinued")
                || html.contains("no_result")
                || html.contains("lowest_report")
            {
                info!(product_id, "product discontinued or redirected");
                return Err(SlowPathError::not_found("discontinued"));
            }
        }

        toggle_shipping_included(page).await;
        // Re-read after the toggle so offer rows reflect delivered prices.
        let html = page.content().await.unwrap_or(html);

        let Some(parsed) = parse_product_lowest_price(&html, query, &url, &self.product_base)
        else {
            return Err(SlowPathError::not_found("no-price"));
        };

        // Final defense against silent redirects: the rendered title must
        // still describe the queried product.
        let score = weighted_match_score(query, &parsed.product_name);
        if score < DETAIL_VERIFY_THRESHOLD {
            warn!(
                query,
                page_title = %parsed.product_name,
                score,
                "detail page mismatch, rejecting"
            );
            return Err(SlowPathError::not_found("mismatch"));
        }

        Ok(PriceFinding {
            product_url: url,
            price: parsed.lowest_price,
            product_name: Some(parsed.product_name),
            mall: parsed.mall,
            free_shipping: parsed.free_shipping,
            product_id: Some(product_id.to_string()),
            top_prices: parsed.top_prices,
        })
    }
}

#[async_trait]
impl SlowPath for ChromiumSlowPath {
    async fn execute(
        &self,
        query: &str,
        candidates: &[String],
        timeout: Duration,
        product_id_hint: Option<&str>,
    ) -> Result<PriceFinding, SlowPathError> {
        if timeout.is_zero() {
            return Err(SlowPathError::Timeout);
        }
        let deadline = Instant::now() + timeout;

        let product_id = match product_id_hint {
            Some(hint) => {
                debug!(pcode = hint, "skipping search phase, using fast path hint");
                hint.to_string()
            }
            None => {
                let stage_remaining = deadline.saturating_duration_since(Instant::now());
                let permit = self
                    .acquire_slot(stage_remaining + self.config.semaphore_cushion)
                    .await?;
                // Search gets half the stage, mirroring the fast path's
                // phase split.
                let search_deadline = Instant::now() + stage_remaining / 2;
                let found = self.search_product_id(candidates, search_deadline).await;
                drop(permit);
                found?
            }
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining < DETAIL_MIN_REMAINING {
            info!(remaining_s = remaining.as_secs_f64(), "not enough budget for detail phase");
            return Err(SlowPathError::not_found("budget"));
        }

        self.rate_limit(deadline).await;

        let remaining = deadline.saturating_duration_since(Instant::now());
        let permit = self
            .acquire_slot(remaining + self.config.semaphore_cushion)
            .await?;
        let result = self.fetch_detail(query, &product_id, deadline).await;
        drop(permit);
        result
    }
}
