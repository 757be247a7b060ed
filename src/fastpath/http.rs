//! Process-wide shared HTTP client.
//!
//! Building a fresh client per request would pay TLS and pool setup on the
//! hot path, so one pool is lazily initialized and reused for the process
//! lifetime. The client impersonates a desktop browser fingerprint via its
//! default headers; transport failures surface as `None`, never as panics.

use std::time::Duration;

use once_cell::sync::OnceCell;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER, USER_AGENT};
use tracing::{debug, info};

/// Shared HTTP client with browser impersonation headers.
pub struct SharedHttpClient {
    user_agent: String,
    referer: String,
    client: OnceCell<Client>,
}

impl SharedHttpClient {
    #[must_use]
    pub fn new(user_agent: &str, referer: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            referer: referer.to_string(),
            client: OnceCell::new(),
        }
    }

    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, value);
        }
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7"),
        );
        if let Ok(value) = HeaderValue::from_str(&self.referer) {
            headers.insert(REFERER, value);
        }
        headers
    }

    fn client(&self) -> &Client {
        self.client.get_or_init(|| {
            debug!("initializing shared http client");
            Client::builder()
                .default_headers(self.default_headers())
                .redirect(reqwest::redirect::Policy::limited(5))
                .pool_max_idle_per_host(8)
                .build()
                .unwrap_or_default()
        })
    }

    /// GET a URL as text. Returns `(status, body)` or `None` on any
    /// transport failure or timeout.
    pub async fn get_text(&self, url: &str, timeout: Duration) -> Option<(u16, String)> {
        let response = match self.client().get(url).timeout(timeout).send().await {
            Ok(response) => response,
            Err(err) => {
                info!(url = %url, error = %err, "http get failed");
                return None;
            }
        };
        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => Some((status, body)),
            Err(err) => {
                info!(url = %url, error = %err, "http body read failed");
                None
            }
        }
    }

    /// HEAD a URL, returning its status or `None` on transport failure.
    pub async fn head_status(&self, url: &str, timeout: Duration) -> Option<u16> {
        match self.client().head(url).timeout(timeout).send().await {
            Ok(response) => Some(response.status().as_u16()),
            Err(err) => {
                info!(url = %url, error = %err, "http head failed");
                None
            }
        }
    }
}
