//! Route handlers. Each snapshot route follows the same four steps: derive
//! a correlation id, parse the forced-refresh signal, call the engine, and
//! decorate the response with cache-state headers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::catalog::BodyId;
use crate::derived;
use crate::engine::ReadOptions;
use crate::errors::EphemerisError;
use crate::model::{CacheState, SnapshotResult, StateVector};

use super::dto::{
    DistanceTriple, ErrorBody, PlanetBody, PlanetsResponse, ProbesMetadata, ProbesResponse,
    SnapshotMetadata, SpeedTriple, Trajectory, Vector3, VoyagerBody,
};
use super::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct RefreshParams {
    #[serde(default)]
    pub refresh: Option<String>,
}

fn correlation_id_from(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .or_else(|| headers.get("x-correlation-id"))
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn truthy(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "True")
}

fn force_refresh_from(headers: &HeaderMap, params: &RefreshParams) -> bool {
    if let Some(refresh) = &params.refresh {
        return truthy(refresh);
    }
    headers
        .get("x-refresh-cache")
        .and_then(|v| v.to_str().ok())
        .map(truthy)
        .unwrap_or(false)
}

fn header(name: &'static str, value: impl std::fmt::Display) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static(name),
        HeaderValue::from_str(&value.to_string()).unwrap_or_else(|_| HeaderValue::from_static("")),
    )
}

fn cache_state_str(state: CacheState) -> &'static str {
    match state {
        CacheState::Hit => "HIT",
        CacheState::Miss => "MISS",
        CacheState::Stale => "STALE",
        CacheState::Frozen => "FROZEN",
    }
}

fn cache_backend_str(backend: crate::model::CacheBackend) -> &'static str {
    match backend {
        crate::model::CacheBackend::Memory => "memory",
        crate::model::CacheBackend::Shared => "shared",
    }
}

fn snapshot_headers(result: &SnapshotResult, ttl_ms: u64) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let is_stale_family = matches!(result.cache_state, CacheState::Stale | CacheState::Frozen);
    let pairs = [
        header("x-horizons-cache", cache_state_str(result.cache_state)),
        header("x-horizons-cache-backend", cache_backend_str(result.cache_backend)),
        header("x-horizons-cache-age", result.cache_age_ms),
        header("x-horizons-ttl", ttl_ms),
        header("x-horizons-cache-stale", if is_stale_family { 1 } else { 0 }),
        header("x-horizons-frozen", if result.frozen_snapshot { 1 } else { 0 }),
        header("x-horizons-latency", result.snapshot.response_time_ms),
        header("x-request-id", &result.request_id),
    ];
    for (name, value) in pairs {
        headers.insert(name, value);
    }
    headers
}

fn error_response(correlation_id: &str, err: &EphemerisError) -> Response {
    tracing::warn!(correlation_id, error = %err.reason(), "snapshot_fetch_failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: err.reason(),
            request_id: correlation_id.to_string(),
        }),
    )
        .into_response()
}

fn planet_body(sv: &StateVector) -> PlanetBody {
    PlanetBody {
        name: sv.body.display_name().to_string(),
        x_au: sv.x,
        y_au: sv.y,
        z_au: sv.z,
        vx: sv.velocity.map(|v| v.vx),
        vy: sv.velocity.map(|v| v.vy),
        vz: sv.velocity.map(|v| v.vz),
        velocity_unit: "AU/day",
    }
}

fn planets_response(result: SnapshotResult, ttl_ms: u64) -> Response {
    let headers = snapshot_headers(&result, ttl_ms);
    let body = PlanetsResponse {
        timestamp: result.snapshot.timestamp,
        metadata: SnapshotMetadata {
            source: "horizons",
            reference_frame: result.snapshot.reference_frame.clone(),
            distance_unit: result.snapshot.distance_unit,
            velocity_unit: result.snapshot.velocity_unit,
            response_time_ms: result.snapshot.response_time_ms,
            cache_status: result.cache_state,
            cache_backend: result.cache_backend,
            cache_age_ms: result.cache_age_ms,
            cache_expires_in_ms: result.cache_expires_in_ms,
            cache_stale: result.cache_stale,
            generated_at: result.generated_at,
            frozen_snapshot: result.frozen_snapshot.then_some(true),
            freeze_reason: result.freeze_reason.clone(),
            request_id: Some(result.request_id.clone()),
        },
        bodies: result.snapshot.bodies.iter().map(planet_body).collect(),
    };
    (StatusCode::OK, headers, Json(body)).into_response()
}

pub async fn get_planets(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<RefreshParams>,
) -> Response {
    let correlation_id = correlation_id_from(&headers);
    let force_refresh = force_refresh_from(&headers, &params);
    let opts = ReadOptions {
        force_refresh,
        correlation_id: Some(&correlation_id),
    };
    match state.engine.get_planets_snapshot(opts).await {
        Ok(result) => planets_response(result, state.engine.ttl_ms()),
        Err(e) => error_response(&correlation_id, &e),
    }
}

fn distance_triple(au: f64) -> DistanceTriple {
    DistanceTriple {
        au,
        km: derived::au_to_km(au),
        miles: derived::au_to_miles(au),
    }
}

fn vector3_au(x: f64, y: f64, z: f64) -> Vector3 {
    Vector3 { x, y, z }
}

fn vector3_km(x: f64, y: f64, z: f64) -> Vector3 {
    Vector3 {
        x: derived::au_to_km(x),
        y: derived::au_to_km(y),
        z: derived::au_to_km(z),
    }
}

fn vector3_miles(x: f64, y: f64, z: f64) -> Vector3 {
    Vector3 {
        x: derived::au_to_miles(x),
        y: derived::au_to_miles(y),
        z: derived::au_to_miles(z),
    }
}

fn voyager_body(sv: &StateVector, earth: Option<&StateVector>) -> VoyagerBody {
    let distance_from_sun_au = derived::magnitude(sv.x, sv.y, sv.z).unwrap_or(0.0);
    let distance_from_earth_au = earth
        .and_then(|e| derived::delta_magnitude((sv.x, sv.y, sv.z), (e.x, e.y, e.z)))
        .unwrap_or(distance_from_sun_au);

    let speed = sv.velocity.and_then(|v| derived::magnitude(v.vx, v.vy, v.vz)).map(|au_per_day| {
        SpeedTriple {
            au_per_day,
            km_per_s: derived::speed_au_per_day_to_km_per_s(au_per_day),
            miles_per_s: derived::km_to_miles(derived::speed_au_per_day_to_km_per_s(au_per_day)),
        }
    });

    let position_ecliptic = derived::ecliptic(sv.x, sv.y, sv.z);
    let velocity_direction = sv.velocity.and_then(|v| derived::ecliptic(v.vx, v.vy, v.vz));

    VoyagerBody {
        id: sv.body.internal_name().to_string(),
        name: sv.body.display_name().to_string(),
        horizons_id: sv.body.provider_id().to_string(),
        position_au: vector3_au(sv.x, sv.y, sv.z),
        position_km: vector3_km(sv.x, sv.y, sv.z),
        position_miles: vector3_miles(sv.x, sv.y, sv.z),
        velocity_au_per_day: sv.velocity.map(|v| vector3_au(v.vx, v.vy, v.vz)),
        velocity_km_per_s: sv.velocity.map(|v| vector3_km(v.vx, v.vy, v.vz)),
        velocity_miles_per_s: sv.velocity.map(|v| vector3_miles(v.vx, v.vy, v.vz)),
        distance_from_sun: distance_triple(distance_from_sun_au),
        distance_from_earth: distance_triple(distance_from_earth_au),
        speed,
        light_time: derived::light_time(derived::au_to_km(distance_from_earth_au)),
        trajectory: Trajectory {
            ecliptic_lat_deg: position_ecliptic.map(|e| e.lat_deg).unwrap_or(0.0),
            ecliptic_lon_deg: position_ecliptic.map(|e| e.lon_deg).unwrap_or(0.0),
            velocity_azimuth_deg: velocity_direction.map(|e| e.lon_deg),
            velocity_lat_deg: velocity_direction.map(|e| e.lat_deg),
        },
        timestamp: sv.timestamp,
        reference_frame: sv.reference_frame.clone(),
        source: sv.source.clone(),
        velocity_unit: "AU/day",
    }
}

pub async fn get_voyagers(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<RefreshParams>,
) -> Response {
    let correlation_id = correlation_id_from(&headers);
    let force_refresh = force_refresh_from(&headers, &params);

    let probes = match state
        .engine
        .get_probes_snapshot(ReadOptions {
            force_refresh,
            correlation_id: Some(&correlation_id),
        })
        .await
    {
        Ok(result) => result,
        Err(e) => return error_response(&correlation_id, &e),
    };

    let planets = match state
        .engine
        .get_planets_snapshot(ReadOptions {
            force_refresh: false,
            correlation_id: Some(&correlation_id),
        })
        .await
    {
        Ok(result) => result,
        Err(e) => return error_response(&correlation_id, &e),
    };
    let earth = planets.snapshot.bodies.iter().find(|b| b.body == BodyId::Earth);

    let headers_out = snapshot_headers(&probes, state.engine.ttl_ms());
    let body = ProbesResponse {
        timestamp: probes.snapshot.timestamp,
        request_id: probes.request_id.clone(),
        metadata: ProbesMetadata::default(),
        voyagers: probes.snapshot.bodies.iter().map(|sv| voyager_body(sv, earth)).collect(),
    };
    (StatusCode::OK, headers_out, Json(body)).into_response()
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    let body = state.metrics_handle.render();
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response()
}

pub async fn health() -> &'static str {
    "ephemeris-cache: ok\n"
}
