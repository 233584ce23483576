//! HTTP facade: one `axum::Router`, one handler per route in the
//! specification's external-interfaces table.

mod dto;
mod handlers;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::engine::SnapshotEngine;

pub struct AppState {
    pub engine: Arc<SnapshotEngine>,
    pub metrics_handle: PrometheusHandle,
}

pub fn build_router(engine: Arc<SnapshotEngine>, metrics_handle: PrometheusHandle) -> Router {
    let state = Arc::new(AppState {
        engine,
        metrics_handle,
    });

    Router::new()
        .route("/api/ephemeris/planets", get(handlers::get_planets))
        .route("/api/ephemeris/planets/state-vectors", get(handlers::get_planets))
        .route("/api/voyagers", get(handlers::get_voyagers))
        .route("/metrics", get(handlers::metrics))
        .route("/", get(handlers::health))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
