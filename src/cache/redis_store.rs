//! Shared primary cache store backed by Redis. Strictly additive: every
//! operation degrades to an error the caller logs and falls back from,
//! never a panic, and the rest of the crate runs fully without one
//! configured at all.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::model::CacheRecord;

pub struct RedisStore {
    manager: ConnectionManager,
    live: AtomicBool,
}

impl RedisStore {
    /// Connects at startup; returns `None` (degrading the whole `CacheStore`
    /// to memory-only forever, per the specification) if the URL is absent
    /// or the initial connection fails.
    pub async fn connect(url: &str) -> Option<Self> {
        let client = match redis::Client::open(url) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "redis_connect_failed");
                return None;
            }
        };
        match ConnectionManager::new(client).await {
            Ok(manager) => {
                tracing::info!("redis_connected");
                Some(RedisStore {
                    manager,
                    live: AtomicBool::new(true),
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "redis_connect_failed");
                None
            }
        }
    }

    /// Cheap liveness probe. `ConnectionManager` reconnects in the
    /// background on its own, so this never holds a lock across a
    /// reconnect attempt; it just reports the last-known state and lets a
    /// `get`/`put` call update it.
    pub async fn is_live(&self) -> bool {
        self.live.load(Ordering::Relaxed)
    }

    pub async fn get(&self, key: &str) -> Result<Option<CacheRecord>, String> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| self.mark_failure(e))?;
        self.live.store(true, Ordering::Relaxed);
        match raw {
            Some(blob) => serde_json::from_str(&blob)
                .map(Some)
                .map_err(|e| format!("cache record could not be deserialized: {e}")),
            None => Ok(None),
        }
    }

    pub async fn put(&self, key: &str, record: &CacheRecord, ttl: Duration) -> Result<(), String> {
        let blob =
            serde_json::to_string(record).map_err(|e| format!("cache record could not be serialized: {e}"))?;
        let mut conn = self.manager.clone();
        let ttl_secs = ttl.as_secs().max(1);
        let _: () = conn
            .set_ex(key, blob, ttl_secs)
            .await
            .map_err(|e| self.mark_failure(e))?;
        self.live.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn mark_failure(&self, e: redis::RedisError) -> String {
        self.live.store(false, Ordering::Relaxed);
        e.to_string()
    }
}
