//! Core data model: `StateVector`, `Snapshot`, `CacheRecord`, `SnapshotResult`.
//!
//! Optionality is always modeled with `Option<T>`, never with sentinel NaN
//! values — the only place a raw float stands in for "missing" is at the
//! upstream wire boundary inside `provider::horizons`, and it is converted
//! to `Option` immediately after parsing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::BodyId;

/// One body's velocity, present only when all three components are finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
}

/// Position and (optionally) velocity of one body at one instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateVector {
    pub body: BodyId,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub velocity: Option<Velocity>,
    /// Reference frame tag, canonically `"J2000-ECLIPTIC"`.
    pub reference_frame: String,
    /// Where this vector came from, e.g. `"horizons"`.
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

impl StateVector {
    /// Construct a state vector, rejecting non-finite position components
    /// and enforcing the velocity all-or-nothing invariant at the boundary
    /// rather than downstream.
    pub fn new(
        body: BodyId,
        x: f64,
        y: f64,
        z: f64,
        velocity: Option<Velocity>,
        reference_frame: impl Into<String>,
        source: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, String> {
        if !x.is_finite() || !y.is_finite() || !z.is_finite() {
            return Err(format!(
                "non-finite position for {}: ({x}, {y}, {z})",
                body.internal_name()
            ));
        }
        if let Some(v) = velocity {
            if !v.vx.is_finite() || !v.vy.is_finite() || !v.vz.is_finite() {
                return Err(format!(
                    "non-finite velocity for {}: ({}, {}, {})",
                    body.internal_name(),
                    v.vx,
                    v.vy,
                    v.vz
                ));
            }
        }
        Ok(StateVector {
            body,
            x,
            y,
            z,
            velocity,
            reference_frame: reference_frame.into(),
            source: source.into(),
            timestamp,
        })
    }
}

/// A coherent set of state vectors produced by one fan-out cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub bodies: Vec<StateVector>,
    pub reference_frame: String,
    pub distance_unit: &'static str,
    pub velocity_unit: &'static str,
    pub response_time_ms: u64,
    pub timestamp: DateTime<Utc>,
    /// True when `bodies` does not contain every catalog entry for this
    /// kind. A partial snapshot may still be cached but must never be
    /// served as `HIT`.
    pub partial: bool,
}

impl Snapshot {
    /// `timestamp` is the first body's timestamp, or `now` if there are no
    /// bodies — preserved per the specification's explicit "first body
    /// wins" decision; do not change this without a product decision.
    pub fn new(bodies: Vec<StateVector>, response_time_ms: u64, expected_len: usize) -> Self {
        let timestamp = bodies.first().map(|b| b.timestamp).unwrap_or_else(Utc::now);
        Snapshot {
            partial: bodies.len() < expected_len,
            bodies,
            reference_frame: "J2000-ECLIPTIC".to_string(),
            distance_unit: "AU",
            velocity_unit: "AU/day",
            response_time_ms,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheState {
    Hit,
    Miss,
    Stale,
    Frozen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    Memory,
    Shared,
}

/// Exclusively owned by `CacheStore`; the engine reads copies and never
/// mutates one in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    pub snapshot: Snapshot,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub stale_until: DateTime<Utc>,
}

impl CacheRecord {
    pub fn new(snapshot: Snapshot, cached_at: DateTime<Utc>, ttl: chrono::Duration, stale_window: chrono::Duration) -> Self {
        CacheRecord {
            snapshot,
            cached_at,
            expires_at: cached_at + ttl,
            stale_until: cached_at + ttl + stale_window,
        }
    }

    pub fn age_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.cached_at).num_milliseconds().max(0)
    }
}

/// Value returned by `SnapshotEngine` to the HTTP facade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotResult {
    pub snapshot: Snapshot,
    pub cache_state: CacheState,
    pub cache_backend: CacheBackend,
    pub cache_age_ms: u64,
    pub cache_expires_in_ms: u64,
    pub cache_stale: bool,
    pub frozen_snapshot: bool,
    pub freeze_reason: Option<String>,
    pub request_id: String,
    pub generated_at: DateTime<Utc>,
}
