//! In-process cache backend on moka.
//!
//! Each entry carries its own TTL (positive entries live hours, negative
//! markers live seconds), so expiration is per-entry rather than
//! cache-wide.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;

use super::CacheBackend;

#[derive(Debug, Clone)]
struct StoredValue {
    payload: String,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, StoredValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Memory-backed `CacheBackend` with per-entry TTL.
pub struct MemoryBackend {
    cache: Cache<String, StoredValue>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    #[must_use]
    pub fn with_capacity(max_entries: u64) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_entries)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.cache.get(key).await.map(|v| v.payload))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> anyhow::Result<()> {
        self.cache
            .insert(
                key.to_string(),
                StoredValue {
                    payload: value,
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<bool> {
        let existed = self.cache.get(key).await.is_some();
        self.cache.invalidate(key).await;
        Ok(existed)
    }
}
