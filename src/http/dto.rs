//! Wire-format response bodies. Field names and casing here are the public
//! contract; they are deliberately decoupled from the internal `model`
//! types so an internal rename never silently breaks a client.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::derived::LightTime;
use crate::model::{CacheBackend, CacheState};

#[derive(Debug, Serialize)]
pub struct PlanetsResponse {
    pub timestamp: DateTime<Utc>,
    pub metadata: SnapshotMetadata,
    pub bodies: Vec<PlanetBody>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub source: &'static str,
    pub reference_frame: String,
    pub distance_unit: &'static str,
    pub velocity_unit: &'static str,
    pub response_time_ms: u64,
    pub cache_status: CacheState,
    pub cache_backend: CacheBackend,
    pub cache_age_ms: u64,
    pub cache_expires_in_ms: u64,
    pub cache_stale: bool,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frozen_snapshot: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeze_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlanetBody {
    pub name: String,
    pub x_au: f64,
    pub y_au: f64,
    pub z_au: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vx: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vz: Option<f64>,
    #[serde(rename = "velocityUnit")]
    pub velocity_unit: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbesResponse {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub metadata: ProbesMetadata,
    pub voyagers: Vec<VoyagerBody>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbesMetadata {
    pub source: &'static str,
    pub unit_distance_base: &'static str,
    pub unit_velocity_base: &'static str,
    pub unit_distance_converted: [&'static str; 2],
    pub unit_velocity_converted: [&'static str; 2],
}

impl Default for ProbesMetadata {
    fn default() -> Self {
        ProbesMetadata {
            source: "horizons",
            unit_distance_base: "AU",
            unit_velocity_base: "AU/day",
            unit_distance_converted: ["km", "miles"],
            unit_velocity_converted: ["km/s", "miles/s"],
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistanceTriple {
    pub au: f64,
    pub km: f64,
    pub miles: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedTriple {
    pub au_per_day: f64,
    pub km_per_s: f64,
    pub miles_per_s: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trajectory {
    pub ecliptic_lat_deg: f64,
    pub ecliptic_lon_deg: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity_azimuth_deg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity_lat_deg: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoyagerBody {
    pub id: String,
    pub name: String,
    pub horizons_id: String,
    pub position_au: Vector3,
    pub position_km: Vector3,
    pub position_miles: Vector3,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity_au_per_day: Option<Vector3>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity_km_per_s: Option<Vector3>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity_miles_per_s: Option<Vector3>,
    pub distance_from_sun: DistanceTriple,
    pub distance_from_earth: DistanceTriple,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<SpeedTriple>,
    pub light_time: LightTime,
    pub trajectory: Trajectory,
    pub timestamp: DateTime<Utc>,
    pub reference_frame: String,
    pub source: String,
    #[serde(rename = "velocityUnit")]
    pub velocity_unit: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub request_id: String,
}
