//! Read-optimized aggregation of heliocentric state vectors for a fixed
//! catalog of solar-system bodies, fronting a slow, rate-limited JPL
//! Horizons-shaped upstream with a stale-while-revalidate cache.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod derived;
pub mod engine;
pub mod errors;
pub mod http;
pub mod model;
pub mod observability;
pub mod provider;

pub use catalog::{BodyId, BodyKind, Catalog};
pub use config::Config;
pub use engine::SnapshotEngine;
pub use errors::EphemerisError;
pub use model::{CacheBackend, CacheState, Snapshot, SnapshotResult, StateVector};
