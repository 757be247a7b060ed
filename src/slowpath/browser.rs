//! Shared headless browser lifecycle.
//!
//! One Chromium instance per process, launched lazily under a lock and
//! reused across requests. The CDP event handler runs in a tracked task
//! that MUST be aborted when the browser goes away, otherwise it outlives
//! the process's interest in it. Individual searches never close the
//! browser; shutdown happens once at process exit.

use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct BrowserHandle {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

/// Lazily-initialized shared browser.
pub struct SharedBrowser {
    user_agent: String,
    inner: Mutex<Option<BrowserHandle>>,
}

fn launch_args() -> Vec<&'static str> {
    vec![
        "--disable-dev-shm-usage",
        "--disable-gpu",
        "--disable-background-networking",
        "--disable-background-timer-throttling",
        "--disable-renderer-backgrounding",
        "--disable-default-apps",
        "--disable-extensions",
        "--disable-blink-features=AutomationControlled",
        "--no-first-run",
        "--no-default-browser-check",
        "--no-sandbox",
        "--disable-setuid-sandbox",
        "--mute-audio",
        "--hide-scrollbars",
    ]
}

impl SharedBrowser {
    #[must_use]
    pub fn new(user_agent: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            inner: Mutex::new(None),
        }
    }

    async fn launch(&self) -> Result<BrowserHandle> {
        info!("launching shared browser");
        let mut builder = BrowserConfig::builder()
            .arg(format!("--user-agent={}", self.user_agent));
        for arg in launch_args() {
            builder = builder.arg(arg);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("browser launch failed")?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "browser handler event error");
                }
            }
            debug!("browser handler task finished");
        });

        Ok(BrowserHandle {
            browser,
            handler_task,
        })
    }

    /// Open a fresh page on the shared browser, relaunching it if the old
    /// instance died. Page creation is cheap; the lock is held only long
    /// enough to hand one out.
    pub async fn new_page(&self) -> Result<Page> {
        let mut guard = self.inner.lock().await;

        if let Some(handle) = guard.as_ref() {
            match handle.browser.version().await {
                Ok(_) => {
                    let page = handle
                        .browser
                        .new_page("about:blank")
                        .await
                        .context("new page on live browser")?;
                    return Ok(page);
                }
                Err(err) => {
                    warn!(error = %err, "shared browser failed health check, relaunching");
                    if let Some(dead) = guard.take() {
                        dead.handler_task.abort();
                    }
                }
            }
        }

        let handle = self.launch().await?;
        let page = handle
            .browser
            .new_page("about:blank")
            .await
            .context("new page on fresh browser")?;
        *guard = Some(handle);
        Ok(page)
    }

    /// Close the browser and stop its handler task. Idempotent.
    pub async fn shutdown(&self) {
        let mut guard = self.inner.lock().await;
        if let Some(mut handle) = guard.take() {
            info!("shutting down shared browser");
            if let Err(err) = handle.browser.close().await {
                warn!(error = %err, "browser close failed");
            }
            let _ = handle.browser.wait().await;
            handle.handler_task.abort();
        }
    }
}
