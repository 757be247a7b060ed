//! HTTP fast path executor.
//!
//! Two phases under one deadline: search listings get 60% of the stage
//! budget, product-detail fetches get the remainder. Every fetch is capped
//! per-request, every page passes the validity heuristic, and candidate
//! ranking is scored against the candidate that produced the page.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::FastPathConfig;
use crate::engine::error::FastPathError;
use crate::engine::result::PriceFinding;
use crate::utils::{build_detail_url, build_search_url};

use super::http::SharedHttpClient;
use super::parsing::{
    ScoredProductId, is_accessory_brand_product, parse_product_lowest_price,
    parse_search_product_ids,
};
use super::validity::{blocked_keyword, is_no_results_html, is_probably_invalid_html};

/// Share of the stage budget reserved for the search phase.
const SEARCH_BUDGET_SHARE: f64 = 0.6;
/// Minimum useful search-phase allowance.
const SEARCH_BUDGET_FLOOR: Duration = Duration::from_millis(500);
/// Minimum allowance kept back for the detail phase.
const DETAIL_BUDGET_FLOOR: Duration = Duration::from_millis(300);
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);
const LISTING_RANK_WIDTH: usize = 12;

/// Fast path seam consumed by the orchestrator.
#[async_trait]
pub trait FastPath: Send + Sync {
    /// Attempt an HTTP search. `Ok(None)` means the path came up empty
    /// without confirming anything (caller falls through to the slow path).
    async fn execute(
        &self,
        query: &str,
        candidates: &[String],
        timeout: Duration,
    ) -> Result<Option<PriceFinding>, FastPathError>;
}

enum Fetched {
    Html(String),
    Invalid,
    Blocked(&'static str),
}

/// reqwest-backed fast path.
pub struct HttpFastPath {
    config: FastPathConfig,
    http: SharedHttpClient,
}

impl HttpFastPath {
    #[must_use]
    pub fn new(config: FastPathConfig) -> Self {
        let http = SharedHttpClient::new(&config.user_agent, &config.referer);
        Self { config, http }
    }

    async fn fetch_html(&self, url: &str, timeout: Duration) -> Fetched {
        if timeout < Duration::from_millis(50) {
            return Fetched::Invalid;
        }
        let Some((status, body)) = self.http.get_text(url, timeout).await else {
            return Fetched::Invalid;
        };
        if status != 200 {
            info!(url = %url, status, "non-200 response");
            return Fetched::Invalid;
        }
        if is_probably_invalid_html(
            &body,
            self.config.min_html_length,
            self.config.trust_large_html_size,
        ) {
            // Fingerprinted pages never land here, so a block phrase on an
            // invalid page is a real interstitial.
            if let Some(keyword) = blocked_keyword(&body) {
                return Fetched::Blocked(keyword);
            }
            info!(url = %url, len = body.len(), "invalid html");
            return Fetched::Invalid;
        }
        Fetched::Html(body)
    }

    /// HEAD-probe the search host so hard network failures skip the whole
    /// phase instead of burning the search budget candidate by candidate.
    async fn probe_host(&self, timeout: Duration) -> bool {
        match self.http.head_status(&self.config.search_base, timeout).await {
            Some(status) => (200..400).contains(&status) || status == 405,
            None => false,
        }
    }

    async fn search_phase(
        &self,
        candidates: &[String],
        search_deadline: Instant,
    ) -> Result<Vec<ScoredProductId>, FastPathError> {
        let mut collected: Vec<ScoredProductId> = Vec::new();

        for (idx, candidate) in candidates.iter().take(self.config.max_candidates).enumerate() {
            let remaining = search_deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!("search budget exhausted");
                break;
            }
            let per_request = self.config.request_timeout.min(remaining);
            let url = build_search_url(&self.config.search_base, candidate);

            match self.fetch_html(&url, per_request).await {
                Fetched::Html(html) => {
                    if is_no_results_html(&html) {
                        info!(candidate = %candidate, attempt = idx + 1, "no-results marker");
                        return Err(FastPathError::NoResults);
                    }
                    let ids = parse_search_product_ids(&html, candidate, LISTING_RANK_WIDTH);
                    if !ids.is_empty() {
                        debug!(
                            candidate = %candidate,
                            attempt = idx + 1,
                            found = ids.len(),
                            "listing parsed"
                        );
                        collected = ids;
                        break;
                    }
                }
                Fetched::Blocked(keyword) => {
                    return Err(FastPathError::Blocked(keyword.to_string()));
                }
                Fetched::Invalid => continue,
            }
        }

        Ok(collected)
    }
}

#[async_trait]
impl FastPath for HttpFastPath {
    async fn execute(
        &self,
        query: &str,
        candidates: &[String],
        timeout: Duration,
    ) -> Result<Option<PriceFinding>, FastPathError> {
        if timeout.is_zero() || candidates.is_empty() {
            return Ok(None);
        }
        let deadline = Instant::now() + timeout;

        let search_budget = Duration::from_secs_f64(timeout.as_secs_f64() * SEARCH_BUDGET_SHARE)
            .max(SEARCH_BUDGET_FLOOR)
            .min(timeout.saturating_sub(DETAIL_BUDGET_FLOOR));
        let search_deadline = Instant::now() + search_budget;

        if !self.probe_host(PROBE_TIMEOUT.min(timeout)).await {
            info!("search host probe failed, skipping fast path");
            return Ok(None);
        }

        let scored = self.search_phase(candidates, search_deadline).await?;
        if scored.is_empty() {
            debug!("no product ids from any candidate");
            return Ok(None);
        }

        // Detail phase over the top ids, deduped, while total budget lasts.
        let mut tried: HashSet<String> = HashSet::new();
        let mut last_reason = String::from("detail fetch failed");

        for scored_id in scored.iter().take(self.config.max_product_fetches) {
            if !tried.insert(scored_id.product_id.clone()) {
                continue;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!("total budget exhausted before detail fetch");
                break;
            }
            let per_request = self.config.product_timeout.min(remaining);
            let url = build_detail_url(&self.config.product_base, &scored_id.product_id, query);

            let html = match self.fetch_html(&url, per_request).await {
                Fetched::Html(html) => html,
                Fetched::Blocked(keyword) => {
                    last_reason = format!("blocked: {keyword}");
                    continue;
                }
                Fetched::Invalid => {
                    last_reason = "invalid detail page".to_string();
                    continue;
                }
            };

            let Some(parsed) =
                parse_product_lowest_price(&html, query, &url, &self.config.product_base)
            else {
                last_reason = "price block parse failed".to_string();
                continue;
            };

            if is_accessory_brand_product(&parsed.product_name, query) {
                debug!(product = %parsed.product_name, "accessory brand filtered");
                last_reason = "accessory brand filtered".to_string();
                continue;
            }

            info!(
                pcode = %scored_id.product_id,
                price = parsed.lowest_price,
                mall = parsed.mall.as_deref().unwrap_or("-"),
                "fast path success"
            );
            return Ok(Some(PriceFinding {
                product_url: url,
                price: parsed.lowest_price,
                product_name: Some(parsed.product_name),
                mall: parsed.mall,
                free_shipping: parsed.free_shipping,
                product_id: Some(scored_id.product_id.clone()),
                top_prices: parsed.top_prices,
            }));
        }

        // A candidate was located but no detail page was recoverable; hand
        // the best id to the slow path so it can go straight to detail.
        Err(FastPathError::ProductFetchFailed {
            product_id: scored[0].product_id.clone(),
            reason: last_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad(html: &str, len: usize) -> String {
        let mut out = html.to_string();
        out.push_str("<!--");
        while out.len() < len {
            out.push('x');
        }
        out.push_str("-->");
        out
    }

    fn search_page() -> String {
        pad(
            r#"<div class="prod_item"><p class="prod_name">
                <a href="/info/?pcode=222">Apple MacBook Air M4 13</a>
            </p></div>"#,
            6000,
        )
    }

    fn detail_page() -> String {
        pad(
            r#"<h3 class="prod_tit">Apple MacBook Air M4 13</h3>
            <div id="lowPriceCompanyArea"><div class="box__mall-price"><ul class="list__mall-price">
                <li class="list-item">
                    <div class="box__logo"><img alt="테스트몰"></div>
                    <div class="sell-price"><span class="text__num">1,299,000</span></div>
                    <div class="box__delivery">무료배송</div>
                    <a class="link__full-cover" href="//mall.example.com/go/1"></a>
                </li>
            </ul></div></div>"#,
            6000,
        )
    }

    fn config_for(server: &mockito::Server) -> FastPathConfig {
        FastPathConfig {
            search_base: format!("{}/dsearch.php", server.url()),
            product_base: format!("{}/info/", server.url()),
            ..FastPathConfig::default()
        }
    }

    #[tokio::test]
    async fn search_and_detail_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let _probe = server.mock("HEAD", "/dsearch.php").with_status(405).create_async().await;
        let _search = server
            .mock("GET", mockito::Matcher::Regex(r"^/dsearch\.php\?query=.*".to_string()))
            .with_status(200)
            .with_body(search_page())
            .create_async()
            .await;
        let _detail = server
            .mock("GET", mockito::Matcher::Regex(r"^/info/\?pcode=222.*".to_string()))
            .with_status(200)
            .with_body(detail_page())
            .create_async()
            .await;

        let fastpath = HttpFastPath::new(config_for(&server));
        let finding = fastpath
            .execute(
                "맥북 에어 M4",
                &["맥북 에어 M4".to_string()],
                Duration::from_secs(4),
            )
            .await
            .expect("fast path runs")
            .expect("finding present");

        assert_eq!(finding.price, 1_299_000);
        assert_eq!(finding.product_id.as_deref(), Some("222"));
        assert!(finding.product_url.contains("pcode=222"));
        assert_eq!(finding.mall.as_deref(), Some("테스트몰"));
    }

    #[tokio::test]
    async fn no_results_marker_raises_no_results() {
        let mut server = mockito::Server::new_async().await;
        let _probe = server.mock("HEAD", "/dsearch.php").with_status(200).create_async().await;
        // Real no-results pages carry full site chrome, so they pass the
        // validity heuristic on size alone.
        let _search = server
            .mock("GET", mockito::Matcher::Regex(r"^/dsearch\.php.*".to_string()))
            .with_status(200)
            .with_body(pad("<p>검색 결과가 없습니다</p>", 60_000))
            .create_async()
            .await;

        let fastpath = HttpFastPath::new(config_for(&server));
        let result = fastpath
            .execute(
                "존재하지않는상품xyz",
                &["존재하지않는상품xyz".to_string()],
                Duration::from_secs(4),
            )
            .await;
        assert!(matches!(result, Err(FastPathError::NoResults)));
    }

    #[tokio::test]
    async fn blocked_page_raises_blocked() {
        let mut server = mockito::Server::new_async().await;
        let _probe = server.mock("HEAD", "/dsearch.php").with_status(200).create_async().await;
        let _search = server
            .mock("GET", mockito::Matcher::Regex(r"^/dsearch\.php.*".to_string()))
            .with_status(200)
            .with_body(pad("<p>Verify you are human</p>", 6000))
            .create_async()
            .await;

        let fastpath = HttpFastPath::new(config_for(&server));
        let result = fastpath
            .execute("맥북", &["맥북".to_string()], Duration::from_secs(4))
            .await;
        assert!(matches!(result, Err(FastPathError::Blocked(_))));
    }

    #[tokio::test]
    async fn failed_detail_propagates_pcode_hint() {
        let mut server = mockito::Server::new_async().await;
        let _probe = server.mock("HEAD", "/dsearch.php").with_status(200).create_async().await;
        let _search = server
            .mock("GET", mockito::Matcher::Regex(r"^/dsearch\.php.*".to_string()))
            .with_status(200)
            .with_body(search_page())
            .create_async()
            .await;
        let _detail = server
            .mock("GET", mockito::Matcher::Regex(r"^/info/.*".to_string()))
            .with_status(500)
            .create_async()
            .await;

        let fastpath = HttpFastPath::new(config_for(&server));
        let result = fastpath
            .execute("맥북 에어 M4", &["맥북 에어 M4".to_string()], Duration::from_secs(4))
            .await;
        match result {
            Err(FastPathError::ProductFetchFailed { product_id, .. }) => {
                assert_eq!(product_id, "222");
            }
            other => panic!("expected ProductFetchFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_host_comes_up_empty() {
        let config = FastPathConfig {
            search_base: "http://127.0.0.1:1/dsearch.php".to_string(),
            product_base: "http://127.0.0.1:1/info/".to_string(),
            ..FastPathConfig::default()
        };
        let fastpath = HttpFastPath::new(config);
        let result = fastpath
            .execute("맥북", &["맥북".to_string()], Duration::from_secs(1))
            .await
            .expect("no error");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn invalid_listing_falls_through_to_none() {
        let mut server = mockito::Server::new_async().await;
        let _probe = server.mock("HEAD", "/dsearch.php").with_status(200).create_async().await;
        let _search = server
            .mock("GET", mockito::Matcher::Regex(r"^/dsearch\.php.*".to_string()))
            .with_status(200)
            .with_body("<html>tiny</html>")
            .create_async()
            .await;

        let fastpath = HttpFastPath::new(config_for(&server));
        let result = fastpath
            .execute("맥북", &["맥북".to_string()], Duration::from_secs(2))
            .await
            .expect("no error");
        assert!(result.is_none());
    }
}
