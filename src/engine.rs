//! `SnapshotEngine`: the sole authority over the cache key for a given
//! snapshot kind. Owns the freshness state machine, single-flight
//! coalescing, and the background pre-warmer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tokio::task::{JoinHandle, JoinSet};
use uuid::Uuid;

use crate::cache::CacheStore;
use crate::catalog::{BodyId, BodyKind, Catalog};
use crate::errors::EphemerisError;
use crate::model::{CacheBackend, CacheRecord, CacheState, Snapshot, SnapshotResult};
use crate::observability;
use crate::provider::EphemerisProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    Miss,
    ManualRefresh,
    StaleRevalidate,
    BackgroundPrewarm,
}

impl RefreshReason {
    fn as_str(self) -> &'static str {
        match self {
            RefreshReason::Miss => "miss",
            RefreshReason::ManualRefresh => "manual-refresh",
            RefreshReason::StaleRevalidate => "stale-revalidate",
            RefreshReason::BackgroundPrewarm => "background-prewarm",
        }
    }
}

fn kind_label(kind: BodyKind) -> &'static str {
    match kind {
        BodyKind::Planet => "planets",
        BodyKind::Probe => "probes",
    }
}

type RefreshOutcome = Result<CacheRecord, Arc<EphemerisError>>;

struct Inflight {
    notify: Notify,
    result: StdMutex<Option<RefreshOutcome>>,
}

#[derive(Default, Clone, Copy)]
pub struct ReadOptions<'a> {
    pub force_refresh: bool,
    pub correlation_id: Option<&'a str>,
}

pub struct SnapshotEngine {
    catalog: Catalog,
    provider: Arc<dyn EphemerisProvider>,
    store: Arc<CacheStore>,
    ttl: chrono::Duration,
    stale_window: chrono::Duration,
    inflight: StdMutex<HashMap<BodyKind, Arc<Inflight>>>,
    prewarm_handle: StdMutex<Option<JoinHandle<()>>>,
}

impl SnapshotEngine {
    pub fn new(
        provider: Arc<dyn EphemerisProvider>,
        store: Arc<CacheStore>,
        ttl: Duration,
        stale_window: Duration,
    ) -> Arc<Self> {
        Arc::new(SnapshotEngine {
            catalog: Catalog::new(),
            provider,
            store,
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::milliseconds(120_000)),
            stale_window: chrono::Duration::from_std(stale_window)
                .unwrap_or(chrono::Duration::milliseconds(60_000)),
            inflight: StdMutex::new(HashMap::new()),
            prewarm_handle: StdMutex::new(None),
        })
    }

    pub async fn get_planets_snapshot(
        self: &Arc<Self>,
        opts: ReadOptions<'_>,
    ) -> Result<SnapshotResult, Arc<EphemerisError>> {
        self.get_snapshot(BodyKind::Planet, opts).await
    }

    pub async fn get_probes_snapshot(
        self: &Arc<Self>,
        opts: ReadOptions<'_>,
    ) -> Result<SnapshotResult, Arc<EphemerisError>> {
        self.get_snapshot(BodyKind::Probe, opts).await
    }

    pub async fn get_snapshot(
        self: &Arc<Self>,
        kind: BodyKind,
        opts: ReadOptions<'_>,
    ) -> Result<SnapshotResult, Arc<EphemerisError>> {
        let correlation_id = opts
            .correlation_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let now = Utc::now();

        if opts.force_refresh {
            let inflight = self.spawn_or_join_refresh(kind, RefreshReason::ManualRefresh, correlation_id.clone());
            let prior = self.store.get(kind.cache_key()).await;
            return self
                .await_inflight(kind, inflight, CacheState::Miss, correlation_id, now, prior)
                .await;
        }

        let cached = self.store.get(kind.cache_key()).await;
        if let Some(record) = &cached {
            let age = now.signed_duration_since(record.cached_at);
            if age < self.ttl {
                let backend = self.store.backend().await;
                observability::record_cache_hit(backend, "fresh", age.num_milliseconds().max(0) as u64);
                return Ok(self.decorate(record.clone(), CacheState::Hit, backend, correlation_id, now, false, None));
            }
            if age < self.ttl + self.stale_window {
                let backend = self.store.backend().await;
                observability::record_cache_hit(backend, "stale", age.num_milliseconds().max(0) as u64);
                if !self.has_inflight(kind) {
                    self.spawn_or_join_refresh(kind, RefreshReason::StaleRevalidate, correlation_id.clone());
                }
                return Ok(self.decorate(record.clone(), CacheState::Stale, backend, correlation_id, now, true, None));
            }
        }

        let inflight = self.spawn_or_join_refresh(kind, RefreshReason::Miss, correlation_id.clone());
        self.await_inflight(kind, inflight, CacheState::Miss, correlation_id, now, cached)
            .await
    }

    fn has_inflight(&self, kind: BodyKind) -> bool {
        self.inflight.lock().unwrap().contains_key(&kind)
    }

    /// Installs (or joins) the single in-progress refresh for `kind`. Only
    /// one task is ever spawned per kind at a time; the task clears its own
    /// map entry on every exit path, including a panic, via `InflightGuard`.
    fn spawn_or_join_refresh(
        self: &Arc<Self>,
        kind: BodyKind,
        reason: RefreshReason,
        correlation_id: String,
    ) -> Arc<Inflight> {
        let mut map = self.inflight.lock().unwrap();
        if let Some(existing) = map.get(&kind) {
            return existing.clone();
        }
        let inflight = Arc::new(Inflight {
            notify: Notify::new(),
            result: StdMutex::new(None),
        });
        map.insert(kind, inflight.clone());
        drop(map);

        let engine = self.clone();
        let task_inflight = inflight.clone();
        let guard_correlation_id = correlation_id.clone();
        tokio::spawn(async move {
            let guard = InflightGuard {
                engine: engine.clone(),
                kind,
                inflight: task_inflight.clone(),
                correlation_id: guard_correlation_id,
            };
            let outcome = engine.do_refresh(kind, reason, &correlation_id).await;
            *task_inflight.result.lock().unwrap() = Some(outcome);
            drop(guard);
        });

        inflight
    }

    async fn await_inflight(
        self: &Arc<Self>,
        kind: BodyKind,
        inflight: Arc<Inflight>,
        success_state: CacheState,
        correlation_id: String,
        now: DateTime<Utc>,
        prior: Option<CacheRecord>,
    ) -> Result<SnapshotResult, Arc<EphemerisError>> {
        loop {
            let notified = inflight.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(outcome) = inflight.result.lock().unwrap().clone() {
                return match outcome {
                    Ok(record) => {
                        let backend = self.store.backend().await;
                        Ok(self.decorate(record, success_state, backend, correlation_id, now, false, None))
                    }
                    Err(e) => {
                        if let Some(prior_record) = prior {
                            let backend = self.store.backend().await;
                            observability::ephemeris_snapshot_frozen(kind_label(kind), &e.reason());
                            Ok(self.decorate(
                                prior_record,
                                CacheState::Frozen,
                                backend,
                                correlation_id,
                                now,
                                true,
                                Some(e.reason()),
                            ))
                        } else {
                            Err(e)
                        }
                    }
                };
            }

            notified.await;
        }
    }

    async fn do_refresh(
        self: &Arc<Self>,
        kind: BodyKind,
        reason: RefreshReason,
        correlation_id: &str,
    ) -> RefreshOutcome {
        let start = Instant::now();
        let bodies = self.catalog.list(kind);

        let mut set: JoinSet<(BodyId, Result<crate::model::StateVector, EphemerisError>)> =
            JoinSet::new();
        for &body in bodies {
            let provider = self.provider.clone();
            let correlation_id = correlation_id.to_string();
            set.spawn(async move {
                let result = provider.fetch(body, &correlation_id).await;
                (body, result)
            });
        }

        let mut results: HashMap<BodyId, Result<crate::model::StateVector, EphemerisError>> =
            HashMap::with_capacity(bodies.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((body, result)) => {
                    results.insert(body, result);
                }
                Err(join_err) => {
                    tracing::warn!(error = %join_err, "horizons_fetch_error");
                }
            }
        }

        let mut vectors = Vec::with_capacity(bodies.len());
        let mut failures = Vec::new();
        for &body in bodies {
            match results.remove(&body) {
                Some(Ok(sv)) => vectors.push(sv),
                Some(Err(e)) => failures.push((body.internal_name().to_string(), Box::new(e))),
                None => failures.push((
                    body.internal_name().to_string(),
                    Box::new(EphemerisError::UpstreamUnavailable {
                        body: body.internal_name().to_string(),
                        detail: "fetch task did not complete".to_string(),
                        status: None,
                        elapsed: start.elapsed(),
                        correlation_id: correlation_id.to_string(),
                    }),
                )),
            }
        }

        if !failures.is_empty() {
            let err = EphemerisError::UpstreamPartialFailure {
                attempted: bodies.len(),
                failures,
            };
            observability::ephemeris_refresh_failed(kind_label(kind), reason.as_str(), &err.reason());
            return Err(Arc::new(err));
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        let snapshot = Snapshot::new(vectors, elapsed_ms, bodies.len());
        let now = Utc::now();
        let record = CacheRecord::new(snapshot, now, self.ttl, self.stale_window);

        self.store.put(kind.cache_key(), record.clone()).await;
        let backend = self.store.backend().await;
        observability::record_cache_miss(backend, reason.as_str());
        observability::ephemeris_refresh(kind_label(kind), reason.as_str(), bodies.len(), elapsed_ms);

        Ok(record)
    }

    /// Pure — never mutates the stored record, so two decorations of the
    /// same record with different correlation ids differ only in metadata.
    fn decorate(
        &self,
        record: CacheRecord,
        state: CacheState,
        backend: CacheBackend,
        correlation_id: String,
        now: DateTime<Utc>,
        cache_stale: bool,
        freeze_reason: Option<String>,
    ) -> SnapshotResult {
        let age_reference = if state == CacheState::Miss { record.cached_at } else { now };
        let age_ms = record.age_ms(age_reference) as u64;
        let expires_in_ms = if state == CacheState::Frozen {
            0
        } else {
            let ttl_ms = self.ttl.num_milliseconds().max(0) as u64;
            ttl_ms.saturating_sub(age_ms)
        };

        SnapshotResult {
            snapshot: record.snapshot,
            cache_state: state,
            cache_backend: backend,
            cache_age_ms: age_ms,
            cache_expires_in_ms: expires_in_ms,
            cache_stale,
            frozen_snapshot: state == CacheState::Frozen,
            freeze_reason,
            request_id: correlation_id,
            generated_at: now,
        }
    }

    /// Starts the background pre-warmer. A no-op if `interval` handling at
    /// the call site already filtered out a disabled (`None`) interval.
    /// The ticker is owned by this engine and aborted in `shutdown`, so it
    /// can never keep the process alive past intent.
    pub fn start_prewarmer(self: &Arc<Self>, interval: Duration) {
        let engine = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately; consume it
            loop {
                ticker.tick().await;
                for kind in [BodyKind::Planet, BodyKind::Probe] {
                    if !engine.has_inflight(kind) {
                        let correlation_id = format!("prewarm-{}", Uuid::new_v4());
                        engine.spawn_or_join_refresh(kind, RefreshReason::BackgroundPrewarm, correlation_id);
                    }
                }
            }
        });
        *self.prewarm_handle.lock().unwrap() = Some(handle);
    }

    /// Configured TTL in milliseconds, surfaced for the `X-Horizons-TTL`
    /// response header.
    pub fn ttl_ms(&self) -> u64 {
        self.ttl.num_milliseconds().max(0) as u64
    }

    /// Aborts the pre-warmer ticker. Must be called before process exit;
    /// the specification leaves the ticker's shutdown discipline an open
    /// question, resolved here by tying its lifetime explicitly to this
    /// call rather than letting it detach.
    pub fn shutdown(&self) {
        if let Some(handle) = self.prewarm_handle.lock().unwrap().take() {
            handle.abort();
        }
    }
}

struct InflightGuard {
    engine: Arc<SnapshotEngine>,
    kind: BodyKind,
    inflight: Arc<Inflight>,
    correlation_id: String,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        // If the refresh task panicked before ever writing a result, every
        // waiter parked on `notified().await` would otherwise block forever
        // — the entry is about to disappear from the map and nothing else
        // will ever wake them. Fail them instead.
        let mut slot = self.inflight.result.lock().unwrap();
        if slot.is_none() {
            *slot = Some(Err(Arc::new(EphemerisError::UpstreamUnavailable {
                body: kind_label(self.kind).to_string(),
                detail: "refresh task ended without producing a result".to_string(),
                status: None,
                elapsed: Duration::from_millis(0),
                correlation_id: self.correlation_id.clone(),
            })));
        }
        drop(slot);

        if let Ok(mut map) = self.engine.inflight.lock() {
            map.remove(&self.kind);
        }
        self.inflight.notify.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use crate::model::StateVector;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: Arc<AtomicUsize>,
        fail: Arc<std::sync::atomic::AtomicBool>,
    }

    #[async_trait]
    impl EphemerisProvider for CountingProvider {
        async fn fetch(&self, body: BodyId, correlation_id: &str) -> Result<StateVector, EphemerisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(EphemerisError::UpstreamUnavailable {
                    body: body.internal_name().to_string(),
                    detail: "simulated".to_string(),
                    status: Some(503),
                    elapsed: Duration::from_millis(1),
                    correlation_id: correlation_id.to_string(),
                });
            }
            StateVector::new(body, 1.0, 0.0, 0.0, None, "J2000-ECLIPTIC", "test", Utc::now())
                .map_err(|e| EphemerisError::UpstreamMalformed {
                    body: body.internal_name().to_string(),
                    detail: e,
                    snippet: String::new(),
                    elapsed: Duration::from_millis(1),
                    correlation_id: correlation_id.to_string(),
                })
        }
    }

    fn make_engine(provider: Arc<dyn EphemerisProvider>) -> Arc<SnapshotEngine> {
        SnapshotEngine::new(
            provider,
            Arc::new(CacheStore::new(None)),
            Duration::from_millis(100),
            Duration::from_millis(100),
        )
    }

    #[tokio::test]
    async fn cold_miss_then_warm_hit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Arc::new(CountingProvider {
            calls: calls.clone(),
            fail: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        });
        let engine = make_engine(provider);

        let first = engine.get_planets_snapshot(ReadOptions::default()).await.unwrap();
        assert_eq!(first.cache_state, CacheState::Miss);
        assert_eq!(first.cache_age_ms, 0);

        let second = engine.get_planets_snapshot(ReadOptions::default()).await.unwrap();
        assert_eq!(second.cache_state, CacheState::Hit);
        assert_eq!(calls.load(Ordering::SeqCst), 9);
    }

    #[tokio::test]
    async fn single_flight_coalesces_concurrent_misses() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Arc::new(CountingProvider {
            calls: calls.clone(),
            fail: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        });
        let engine = make_engine(provider);

        let mut handles = Vec::new();
        for _ in 0..10 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine.get_planets_snapshot(ReadOptions::default()).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 9);
    }

    #[tokio::test]
    async fn frozen_fallback_after_prior_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fail = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let provider = Arc::new(CountingProvider {
            calls: calls.clone(),
            fail: fail.clone(),
        });
        let engine = make_engine(provider);

        let warm = engine.get_planets_snapshot(ReadOptions::default()).await.unwrap();
        assert_eq!(warm.cache_state, CacheState::Miss);

        fail.store(true, Ordering::SeqCst);
        let forced = engine
            .get_planets_snapshot(ReadOptions {
                force_refresh: true,
                correlation_id: None,
            })
            .await
            .unwrap();
        assert_eq!(forced.cache_state, CacheState::Frozen);
        assert!(forced.frozen_snapshot);
        assert!(forced.freeze_reason.is_some());
    }

    #[tokio::test]
    async fn stale_hit_serves_immediately_and_revalidates_in_background() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Arc::new(CountingProvider {
            calls: calls.clone(),
            fail: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        });
        let engine = SnapshotEngine::new(
            provider,
            Arc::new(CacheStore::new(None)),
            Duration::from_millis(20),
            Duration::from_millis(200),
        );

        let first = engine.get_planets_snapshot(ReadOptions::default()).await.unwrap();
        assert_eq!(first.cache_state, CacheState::Miss);
        assert_eq!(calls.load(Ordering::SeqCst), 9);

        // Past TTL, still inside the stale window.
        tokio::time::sleep(Duration::from_millis(40)).await;

        let stale = engine.get_planets_snapshot(ReadOptions::default()).await.unwrap();
        assert_eq!(stale.cache_state, CacheState::Stale);
        assert!(stale.cache_stale);
        // Served from the existing record, not the revalidate spawned alongside it.
        assert_eq!(calls.load(Ordering::SeqCst), 9);

        // Let the background revalidate finish, then confirm it actually ran once.
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 18);
    }

    #[tokio::test]
    async fn true_miss_with_no_prior_record_propagates_error() {
        let fail = Arc::new(std::sync::atomic::AtomicBool::new(true));
        let provider = Arc::new(CountingProvider {
            calls: Arc::new(AtomicUsize::new(0)),
            fail,
        });
        let engine = make_engine(provider);
        let result = engine.get_planets_snapshot(ReadOptions::default()).await;
        assert!(result.is_err());
    }
}
