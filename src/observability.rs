//! Named structured events and metric sinks.
//!
//! Event emission goes through `tracing`; the event name is always the
//! literal message argument so tests can assert on it directly rather than
//! parsing human-readable text, per the specification's requirement that
//! tests assert event names, not translated strings. Metrics go through the
//! `metrics` facade so the exposition format stays opaque to the rest of
//! the crate — `/metrics` just renders whatever the installed recorder
//! produces.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::model::CacheBackend;

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Installs the global Prometheus recorder. Call once at startup, before
/// any `metrics::` macro fires.
pub fn install_metrics_recorder() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            PrometheusBuilder::new()
                .set_buckets(&[50.0, 100.0, 200.0, 400.0, 800.0, 1200.0, 2000.0, 4000.0, 8000.0])
                .expect("static bucket list is valid")
                .install_recorder()
                .expect("prometheus recorder installs exactly once")
        })
        .clone()
}

pub fn backend_label(backend: CacheBackend) -> &'static str {
    match backend {
        CacheBackend::Memory => "memory",
        CacheBackend::Shared => "shared",
    }
}

pub fn record_cache_hit(backend: CacheBackend, state: &'static str, age_ms: u64) {
    let backend = backend_label(backend);
    metrics::counter!("cache_hits_total", "backend" => backend, "state" => state).increment(1);
    metrics::gauge!("cache_age_ms", "backend" => backend).set(age_ms as f64);
}

pub fn record_cache_miss(backend: CacheBackend, reason: &'static str) {
    metrics::counter!("cache_misses_total", "backend" => backend_label(backend), "reason" => reason)
        .increment(1);
}

/// `horizons_fetch` / `horizons_fetch_error` are emitted directly at the
/// provider call site (see `provider::horizons`) since they carry
/// per-fetch fields the engine doesn't have. The remaining named events
/// below belong to the engine and cache layers.
pub fn ephemeris_refresh(kind: &str, reason: &str, bodies: usize, duration_ms: u64) {
    tracing::info!(kind, reason, bodies, duration_ms, "ephemeris_refresh");
}

pub fn ephemeris_refresh_failed(kind: &str, reason: &str, error: &str) {
    tracing::warn!(kind, reason, error, "ephemeris_refresh_failed");
}

pub fn ephemeris_snapshot_frozen(kind: &str, freeze_reason: &str) {
    tracing::warn!(kind, freeze_reason, "ephemeris_snapshot_frozen");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_label_matches_spec_vocabulary() {
        assert_eq!(backend_label(CacheBackend::Memory), "memory");
        assert_eq!(backend_label(CacheBackend::Shared), "shared");
    }
}
