//! Two-tier cache store: a shared, external, optional primary (Redis) and
//! an in-process secondary that the primary degrades to when unreachable.

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use crate::model::{CacheBackend, CacheRecord};

/// `get`/`put` over the two tiers. `primary` is `None` when `REDIS_URL` was
/// absent at startup; liveness of a configured primary is tracked
/// independently so a transient outage demotes individual operations
/// without tearing the whole store down.
pub struct CacheStore {
    primary: Option<RedisStore>,
    secondary: MemoryStore,
}

impl CacheStore {
    pub fn new(primary: Option<RedisStore>) -> Self {
        CacheStore {
            primary,
            secondary: MemoryStore::new(),
        }
    }

    /// Non-blocking-ish liveness probe used by the engine to decide what
    /// `backend` label to report before a refresh even starts.
    pub async fn backend(&self) -> CacheBackend {
        match &self.primary {
            Some(store) if store.is_live().await => CacheBackend::Shared,
            _ => CacheBackend::Memory,
        }
    }

    /// Try primary first; mirror a primary hit into secondary. Fall back to
    /// secondary on primary failure or absence.
    pub async fn get(&self, key: &str) -> Option<CacheRecord> {
        if let Some(primary) = &self.primary {
            match primary.get(key).await {
                Ok(Some(record)) => {
                    self.secondary.put(key, record.clone()).await;
                    return Some(record);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(key, error = %e, "redis_read_failed");
                }
            }
        }
        self.secondary.get(key).await
    }

    /// Always writes secondary. Writes primary too when live; a primary
    /// write failure is logged but never propagated — the secondary write
    /// already succeeded and that's enough to serve subsequent reads.
    pub async fn put(&self, key: &str, record: CacheRecord) {
        self.secondary.put(key, record.clone()).await;
        if let Some(primary) = &self.primary {
            let ttl = (record.stale_until - record.cached_at)
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);
            if let Err(e) = primary.put(key, &record, ttl).await {
                tracing::warn!(key, error = %e, "redis_write_failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Snapshot;
    use chrono::Utc;

    fn sample_record() -> CacheRecord {
        let snapshot = Snapshot::new(vec![], 10, 0);
        CacheRecord::new(snapshot, Utc::now(), chrono::Duration::seconds(1), chrono::Duration::seconds(1))
    }

    #[tokio::test]
    async fn memory_only_round_trip() {
        let store = CacheStore::new(None);
        assert!(store.get("k").await.is_none());
        store.put("k", sample_record()).await;
        assert!(store.get("k").await.is_some());
        assert_eq!(store.backend().await, CacheBackend::Memory);
    }
}
