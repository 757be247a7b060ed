//! End-to-end pipeline tests: real orchestrator, real HTTP fast path over a
//! mock upstream, disabled slow path, in-memory cache.

use std::sync::Arc;

use pricescout::cache::{CacheAdapter, MemoryBackend};
use pricescout::config::EngineConfig;
use pricescout::engine::{CircuitBreaker, SearchOrchestrator, SearchStatus, Source};
use pricescout::fastpath::{FastPath, HttpFastPath};
use pricescout::normalize::Normalizer;
use pricescout::recorder::LogRecorder;
use pricescout::slowpath::{DisabledSlowPath, SlowPath};

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

fn engine_for(server: &mockito::Server) -> SearchOrchestrator {
    let mut config = EngineConfig::default();
    config.fastpath.search_base = format!("{}/dsearch.php", server.url());
    config.fastpath.product_base = format!("{}/info/", server.url());

    let breaker = Arc::new(CircuitBreaker::new(config.breaker.clone()));
    SearchOrchestrator::new(
        config.clone(),
        Arc::new(Normalizer::default()),
        Arc::new(CacheAdapter::new(Arc::new(MemoryBackend::new()))),
        Arc::new(HttpFastPath::new(config.fastpath.clone())) as Arc<dyn FastPath>,
        Arc::new(DisabledSlowPath) as Arc<dyn SlowPath>,
        breaker,
        Arc::new(LogRecorder),
    )
    .expect("valid config")
}

#[tokio::test]
async fn fastpath_success_end_to_end() {
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

    let engine = engine_for(&server);
    let result = engine.search("Apple 2024 맥북 에어 13 M4").await;

    assert_eq!(result.status, SearchStatus::FastPathSuccess);
    assert_eq!(result.price, Some(1_299_000));
    assert_eq!(result.source, Some(Source::FastPath));
    let url = result.product_url.expect("product url present");
    assert!(url.starts_with("http"));
    assert!(url.contains("pcode=222"));

    // Immediately afterwards the same query is a cache hit.
    let cached = engine.search("Apple 2024 맥북 에어 13 M4").await;
    assert_eq!(cached.status, SearchStatus::CacheHit);
    assert_eq!(cached.price, Some(1_299_000));
    assert_eq!(cached.source, Some(Source::Cache));
}

#[tokio::test]
async fn no_results_fetches_once_then_serves_negative_cache() {
    let mut server = mockito::Server::new_async().await;
    let _probe = server.mock("HEAD", "/dsearch.php").with_status(200).create_async().await;
    // Every candidate fetch in the first search hits this mock; the second
    // search must add zero fetches.
    let search = server
        .mock("GET", mockito::Matcher::Regex(r"^/dsearch\.php.*".to_string()))
        .with_status(200)
        .with_body(pad("<p>검색 결과가 없습니다</p>", 60_000))
        .expect(1)
        .create_async()
        .await;

    let engine = engine_for(&server);

    let first = engine.search("존재하지않는상품xyz").await;
    assert_eq!(first.status, SearchStatus::NoResults);

    let second = engine.search("존재하지않는상품xyz").await;
    assert_eq!(second.status, SearchStatus::NoResults);

    search.assert_async().await;
}

#[tokio::test]
async fn chip_mismatch_candidate_falls_through_to_slowpath() {
    let mut server = mockito::Server::new_async().await;
    let _probe = server.mock("HEAD", "/dsearch.php").with_status(200).create_async().await;
    // The only listing is an M3 machine; an M4 query must not accept it.
    let _search = server
        .mock("GET", mockito::Matcher::Regex(r"^/dsearch\.php.*".to_string()))
        .with_status(200)
        .with_body(pad(
            r#"<div class="prod_item"><p class="prod_name">
                <a href="/info/?pcode=999">Apple MacBook Air M3 13</a>
            </p></div>"#,
            6000,
        ))
        .create_async()
        .await;

    let engine = engine_for(&server);
    let result = engine.search("맥북 에어 M4").await;

    // The disabled slow path reports not-found, so the pipeline ends in
    // no_results — crucially without a fast path success on the M3 unit.
    assert_eq!(result.status, SearchStatus::NoResults);
}

#[tokio::test]
async fn blocked_upstream_maps_to_blocked_or_falls_back() {
    let mut server = mockito::Server::new_async().await;
    let _probe = server.mock("HEAD", "/dsearch.php").with_status(200).create_async().await;
    let _search = server
        .mock("GET", mockito::Matcher::Regex(r"^/dsearch\.php.*".to_string()))
        .with_status(200)
        .with_body(pad("<p>verify you are human</p>", 6000))
        .create_async()
        .await;

    let engine = engine_for(&server);
    let result = engine.search("맥북 에어").await;
    // Blocked fast path falls back to the (disabled) slow path, which
    // reports not-found.
    assert_eq!(result.status, SearchStatus::NoResults);
    assert!(engine.breaker().metrics().fastpath_misses >= 1);
}

#[tokio::test]
async fn elapsed_stays_within_total_budget() {
    let mut server = mockito::Server::new_async().await;
    let _probe = server.mock("HEAD", "/dsearch.php").with_status(200).create_async().await;
    let _search = server
        .mock("GET", mockito::Matcher::Regex(r"^/dsearch\.php.*".to_string()))
        .with_status(404)
        .create_async()
        .await;

    let engine = engine_for(&server);
    let result = engine.search("아무 상품").await;
    assert!(result.is_error());
    let budget_ms = EngineConfig::default().budget.total.as_millis();
    assert!(
        result.elapsed_ms <= budget_ms + 1000,
        "elapsed {}ms exceeds budget",
        result.elapsed_ms
    );
}
