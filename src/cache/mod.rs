//! Cache backend seam and the adapter the orchestrator talks to.
//!
//! The adapter owns validation and shape tolerance; backends only move
//! opaque payloads with a TTL. Backend failures and timeouts are never
//! surfaced to the pipeline — a broken cache degrades to a miss.

pub mod memory;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use memory::MemoryBackend;

/// A cached price for one normalized query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Legacy writers stored this under `url`; both shapes read, only
    /// `product_url` is ever written.
    #[serde(alias = "url")]
    pub product_url: String,
    pub price: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mall: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_shipping: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NegativeMarker {
    message: String,
}

/// Key-value store carrying string payloads with per-entry TTL.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> anyhow::Result<()>;
    async fn delete(&self, key: &str) -> anyhow::Result<bool>;
}

const POSITIVE_PREFIX: &str = "price:";
const NEGATIVE_PREFIX: &str = "price:neg:";

/// Adapter between the orchestrator and any `CacheBackend`.
pub struct CacheAdapter {
    backend: Arc<dyn CacheBackend>,
}

impl CacheAdapter {
    #[must_use]
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Positive lookup. Expired, malformed, or partially-initialized entries
    /// read as a miss; so do backend errors and lookups slower than
    /// `timeout`.
    pub async fn get(&self, key: &str, timeout: Duration) -> Option<CacheEntry> {
        if key.is_empty() {
            return None;
        }
        let positive_key = format!("{POSITIVE_PREFIX}{key}");
        let lookup = self.backend.get(&positive_key);
        let payload = match tokio::time::timeout(timeout, lookup).await {
            Ok(Ok(Some(payload))) => payload,
            Ok(Ok(None)) => return None,
            Ok(Err(err)) => {
                warn!(key, error = %format!("{err:#}"), "cache get failed, treating as miss");
                return None;
            }
            Err(_) => {
                warn!(key, ?timeout, "cache get timed out, treating as miss");
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&payload) {
            Ok(entry) if !entry.product_url.is_empty() && entry.price > 0 => Some(entry),
            Ok(entry) => {
                warn!(key, url = %entry.product_url, price = entry.price, "invalid cache entry, treating as miss");
                None
            }
            Err(err) => {
                warn!(key, error = %err, "cache entry deserialization failed");
                None
            }
        }
    }

    /// Write-through. Invalid entries are dropped and backend errors logged;
    /// neither is propagated.
    pub async fn set(&self, key: &str, entry: &CacheEntry, ttl: Duration) {
        if key.is_empty() || entry.product_url.is_empty() || entry.price == 0 {
            warn!(key, "refusing to cache invalid entry");
            return;
        }
        let payload = match serde_json::to_string(entry) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(key, error = %err, "cache entry serialization failed");
                return;
            }
        };
        if let Err(err) = self
            .backend
            .set(&format!("{POSITIVE_PREFIX}{key}"), payload, ttl)
            .await
        {
            warn!(key, error = %format!("{err:#}"), "cache set failed");
        } else {
            debug!(key, price = entry.price, "result cached");
        }
    }

    /// Short-lived negative marker suppressing repeated failed crawls.
    pub async fn get_negative(&self, key: &str) -> Option<String> {
        let payload = self
            .backend
            .get(&format!("{NEGATIVE_PREFIX}{key}"))
            .await
            .ok()??;
        serde_json::from_str::<NegativeMarker>(&payload)
            .ok()
            .map(|marker| marker.message)
            .filter(|m| !m.is_empty())
    }

    pub async fn set_negative(&self, key: &str, message: &str, ttl: Duration) {
        let marker = NegativeMarker {
            message: message.to_string(),
        };
        let Ok(payload) = serde_json::to_string(&marker) else {
            return;
        };
        if let Err(err) = self
            .backend
            .set(&format!("{NEGATIVE_PREFIX}{key}"), payload, ttl)
            .await
        {
            warn!(key, error = %format!("{err:#}"), "negative cache set failed");
        }
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.backend
            .delete(&format!("{POSITIVE_PREFIX}{key}"))
            .await
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> CacheAdapter {
        CacheAdapter::new(Arc::new(MemoryBackend::new()))
    }

    fn entry(price: u32) -> CacheEntry {
        CacheEntry {
            product_url: "https://prod.example.com/info/?pcode=111".to_string(),
            price,
            product_name: Some("신라면".to_string()),
            mall: None,
            free_shipping: Some(true),
        }
    }

    #[tokio::test]
    async fn round_trip_preserves_url_and_price() {
        let adapter = adapter();
        let original = entry(2986);
        adapter.set("신라면", &original, Duration::from_secs(60)).await;
        let loaded = adapter
            .get("신라면", Duration::from_millis(100))
            .await
            .expect("entry present");
        assert_eq!(loaded, original);
    }

    #[tokio::test]
    async fn legacy_url_key_reads_as_product_url() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .set(
                "price:legacy",
                r#"{"url":"https://prod.example.com/info/?pcode=9","price":1000}"#.to_string(),
                Duration::from_secs(60),
            )
            .await
            .expect("backend set");
        let adapter = CacheAdapter::new(backend);
        let loaded = adapter
            .get("legacy", Duration::from_millis(100))
            .await
            .expect("legacy entry readable");
        assert_eq!(loaded.product_url, "https://prod.example.com/info/?pcode=9");
    }

    #[tokio::test]
    async fn writes_emit_product_url_only() {
        let backend = Arc::new(MemoryBackend::new());
        let adapter = CacheAdapter::new(Arc::clone(&backend) as Arc<dyn CacheBackend>);
        adapter.set("k", &entry(500), Duration::from_secs(60)).await;
        let raw = backend
            .get("price:k")
            .await
            .expect("backend get")
            .expect("payload present");
        assert!(raw.contains("product_url"));
        assert!(!raw.contains("\"url\""));
    }

    #[tokio::test]
    async fn invalid_entries_read_as_miss() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .set(
                "price:broken",
                r#"{"product_url":"","price":1000}"#.to_string(),
                Duration::from_secs(60),
            )
            .await
            .expect("backend set");
        backend
            .set(
                "price:zero",
                r#"{"product_url":"https://x.example.com","price":0}"#.to_string(),
                Duration::from_secs(60),
            )
            .await
            .expect("backend set");
        let adapter = CacheAdapter::new(backend);
        assert!(adapter.get("broken", Duration::from_millis(100)).await.is_none());
        assert!(adapter.get("zero", Duration::from_millis(100)).await.is_none());
        assert!(adapter.get("absent", Duration::from_millis(100)).await.is_none());
    }

    #[tokio::test]
    async fn refuses_to_write_invalid_entries() {
        let adapter = adapter();
        adapter.set("bad", &entry(0), Duration::from_secs(60)).await;
        assert!(adapter.get("bad", Duration::from_millis(100)).await.is_none());
    }

    #[tokio::test]
    async fn negative_markers_round_trip_and_expire() {
        let adapter = adapter();
        adapter
            .set_negative("없는상품", "No products found", Duration::from_millis(50))
            .await;
        assert_eq!(
            adapter.get_negative("없는상품").await.as_deref(),
            Some("No products found")
        );
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(adapter.get_negative("없는상품").await.is_none());
    }

    #[tokio::test]
    async fn positive_and_negative_keys_do_not_collide() {
        let adapter = adapter();
        adapter.set("q", &entry(100), Duration::from_secs(60)).await;
        assert!(adapter.get_negative("q").await.is_none());
    }

    #[tokio::test]
    async fn delete_removes_the_entry() {
        let adapter = adapter();
        adapter.set("q", &entry(100), Duration::from_secs(60)).await;
        assert!(adapter.delete("q").await);
        assert!(adapter.get("q", Duration::from_millis(100)).await.is_none());
        assert!(!adapter.delete("q").await);
    }
}
