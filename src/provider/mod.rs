//! `EphemerisProvider`: single-body fetch + parse of the upstream response
//! into a normalized `StateVector`.

mod horizons;

pub use horizons::HorizonsProvider;

use async_trait::async_trait;

use crate::catalog::BodyId;
use crate::errors::EphemerisError;
use crate::model::StateVector;

/// Narrow seam between the engine and whatever upstream ephemeris service is
/// actually configured. `HorizonsProvider` is the only implementation today;
/// the trait exists so tests can substitute a canned provider without
/// standing up a mock HTTP server for every unit test.
#[async_trait]
pub trait EphemerisProvider: Send + Sync {
    async fn fetch(
        &self,
        body: BodyId,
        correlation_id: &str,
    ) -> Result<StateVector, EphemerisError>;
}
