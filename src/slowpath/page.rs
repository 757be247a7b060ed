//! Per-page setup and wait helpers.
//!
//! Every slow-path page blocks non-essential resources (images, fonts,
//! stylesheets, media) through the CDP network domain; rendering chrome the
//! user never sees would otherwise dominate the stage budget.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chromiumoxide_cdp::cdp::browser_protocol::network::{EnableParams, SetBlockedUrLsParams};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use tracing::debug;

/// URL patterns aborted on every slow-path page.
const BLOCKED_PATTERNS: &[&str] = &[
    "*.png", "*.jpg", "*.jpeg", "*.gif", "*.webp", "*.svg", "*.ico",
    "*.woff", "*.woff2", "*.ttf", "*.otf", "*.css", "*.mp4", "*.webm", "*.mp3",
];

/// How often selector polling re-queries the DOM.
const POLL_INTERVAL: Duration = Duration::from_millis(120);

/// Configure a fresh page for crawling: block heavy resources.
pub async fn configure_page(page: &Page) -> Result<()> {
    page.execute(EnableParams::default())
        .await
        .context("enable network domain")?;
    page.execute(SetBlockedUrLsParams::new(
        BLOCKED_PATTERNS.iter().map(|p| (*p).to_string()).collect::<Vec<_>>(),
    ))
    .await
    .context("set blocked url patterns")?;
    Ok(())
}

/// Poll for a selector until it appears or `timeout` elapses.
pub async fn wait_for_selector(page: &Page, selector: &str, timeout: Duration) -> Option<Element> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(element) = page.find_element(selector).await {
            return Some(element);
        }
        if Instant::now() + POLL_INTERVAL > deadline {
            debug!(selector, ?timeout, "selector wait timed out");
            return None;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Close a page, swallowing errors; pages are per-search and the browser
/// outlives them.
pub async fn close_page(page: Page) {
    if let Err(err) = page.close().await {
        debug!(error = %err, "page close failed");
    }
}

/// Toggle the "include shipping" checkbox when present so mall offers
/// compare on delivered price. Best-effort.
pub async fn toggle_shipping_included(page: &Page) {
    const SCRIPT: &str = r#"
        (() => {
            const toggle = document.querySelector('#add_delivery');
            if (!toggle || toggle.checked) { return false; }
            const label = document.querySelector('label[for="add_delivery"]');
            (label || toggle).click();
            return true;
        })()
    "#;
    match page.evaluate(SCRIPT).await {
        Ok(result) => {
            if result.value().and_then(serde_json::Value::as_bool) == Some(true) {
                debug!("shipping toggle clicked");
                tokio::time::sleep(Duration::from_millis(400)).await;
            }
        }
        Err(err) => debug!(error = %err, "shipping toggle skipped"),
    }
}
