//! End-to-end HTTP contract tests against a mocked Horizons upstream.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use heliocache::cache::CacheStore;
use heliocache::engine::SnapshotEngine;
use heliocache::http::build_router;
use heliocache::observability::install_metrics_recorder;
use heliocache::provider::HorizonsProvider;
use serde_json::Value;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EARTH_VECTOR: &str = r#"{"result": {"vectors": [{"X":"1.0","Y":"0.0","Z":"0.0","VX":"0.0","VY":"0.0172","VZ":"0.0"}]}}"#;

async fn test_app(mock_url: &str, ttl: Duration, stale: Duration) -> (axum::Router, Arc<SnapshotEngine>) {
    let provider = Arc::new(HorizonsProvider::with_base_url(format!("{mock_url}/api/horizons.api")));
    let store = Arc::new(CacheStore::new(None));
    let engine = SnapshotEngine::new(provider, store, ttl, stale);
    let router = build_router(engine.clone(), install_metrics_recorder());
    (router, engine)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn cold_miss_then_warm_hit() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/horizons.api"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EARTH_VECTOR))
        .mount(&mock)
        .await;

    let (app, _engine) = test_app(&mock.uri(), Duration::from_secs(60), Duration::from_secs(60)).await;

    let first = app
        .clone()
        .oneshot(Request::get("/api/ephemeris/planets").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers().get("x-horizons-cache").unwrap(), "MISS");
    let json = body_json(first).await;
    let earth = json["bodies"]
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["name"] == "Earth")
        .unwrap();
    assert_eq!(earth["x_au"], 1.0);

    let second = app
        .clone()
        .oneshot(Request::get("/api/ephemeris/planets").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(second.headers().get("x-horizons-cache").unwrap(), "HIT");
}

#[tokio::test]
async fn forced_refresh_always_reports_miss() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/horizons.api"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EARTH_VECTOR))
        .mount(&mock)
        .await;

    let (app, _engine) = test_app(&mock.uri(), Duration::from_secs(60), Duration::from_secs(60)).await;

    let _ = app
        .clone()
        .oneshot(Request::get("/api/ephemeris/planets").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let forced = app
        .clone()
        .oneshot(
            Request::get("/api/ephemeris/planets")
                .header("x-refresh-cache", "1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(forced.headers().get("x-horizons-cache").unwrap(), "MISS");
}

#[tokio::test]
async fn frozen_fallback_when_upstream_fails_after_prior_success() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/horizons.api"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EARTH_VECTOR))
        .up_to_n_times(9)
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/horizons.api"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock)
        .await;

    let (app, _engine) = test_app(&mock.uri(), Duration::from_millis(10), Duration::from_millis(10)).await;

    let _ = app
        .clone()
        .oneshot(Request::get("/api/ephemeris/planets").body(Body::empty()).unwrap())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(40)).await;

    let frozen = app
        .clone()
        .oneshot(Request::get("/api/ephemeris/planets").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(frozen.status(), StatusCode::OK);
    assert_eq!(frozen.headers().get("x-horizons-cache").unwrap(), "FROZEN");
    assert_eq!(frozen.headers().get("x-horizons-frozen").unwrap(), "1");
    let json = body_json(frozen).await;
    assert!(json["metadata"]["freezeReason"].as_str().unwrap().len() > 0);
}

#[tokio::test]
async fn stale_revalidate_serves_prior_snapshot_and_reports_stale() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/horizons.api"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EARTH_VECTOR))
        .mount(&mock)
        .await;

    let (app, _engine) = test_app(&mock.uri(), Duration::from_millis(20), Duration::from_millis(200)).await;

    let _ = app
        .clone()
        .oneshot(Request::get("/api/ephemeris/planets").body(Body::empty()).unwrap())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(40)).await;

    let stale = app
        .clone()
        .oneshot(Request::get("/api/ephemeris/planets").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(stale.status(), StatusCode::OK);
    assert_eq!(stale.headers().get("x-horizons-cache").unwrap(), "STALE");
    assert_eq!(stale.headers().get("x-horizons-cache-stale").unwrap(), "1");
}

#[tokio::test]
async fn voyagers_route_enriches_with_earth_relative_values() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/horizons.api"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EARTH_VECTOR))
        .mount(&mock)
        .await;

    let (app, _engine) = test_app(&mock.uri(), Duration::from_secs(60), Duration::from_secs(60)).await;

    let response = app
        .clone()
        .oneshot(Request::get("/api/voyagers").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let voyagers = json["voyagers"].as_array().unwrap();
    assert_eq!(voyagers.len(), 2);
    assert!(voyagers[0]["distanceFromEarth"]["au"].as_f64().unwrap() >= 0.0);
    assert!(voyagers[0]["lightTime"]["oneWayMinutes"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn health_and_metrics_routes_respond() {
    let mock = MockServer::start().await;
    let (app, _engine) = test_app(&mock.uri(), Duration::from_secs(60), Duration::from_secs(60)).await;

    let health = app
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    let metrics = app
        .clone()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(metrics.status(), StatusCode::OK);
}
