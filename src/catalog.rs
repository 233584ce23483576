//! Static registry of the bodies this service serves.
//!
//! The catalog is fixed at compile time: nine planets plus two deep-space
//! probes, each mapped to the identifier JPL Horizons expects in its
//! `COMMAND` parameter and to a human-readable display label. Nothing here
//! does I/O and nothing here can fail.

use serde::{Deserialize, Serialize};

/// One of the eleven bodies this service tracks.
///
/// A closed enum rather than an interned string: the catalog never grows at
/// runtime, so every caller can match on it exhaustively and the compiler
/// catches typos that a string key would let through silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyId {
    Mercury,
    Venus,
    Earth,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
    Pluto,
    Voyager1,
    Voyager2,
}

impl BodyId {
    /// Internal name as used in wire formats and cache keys.
    pub fn internal_name(self) -> &'static str {
        match self {
            BodyId::Mercury => "mercury",
            BodyId::Venus => "venus",
            BodyId::Earth => "earth",
            BodyId::Mars => "mars",
            BodyId::Jupiter => "jupiter",
            BodyId::Saturn => "saturn",
            BodyId::Uranus => "uranus",
            BodyId::Neptune => "neptune",
            BodyId::Pluto => "pluto",
            BodyId::Voyager1 => "voyager1",
            BodyId::Voyager2 => "voyager2",
        }
    }

    /// Human-readable label for display in API responses.
    pub fn display_name(self) -> &'static str {
        match self {
            BodyId::Mercury => "Mercury",
            BodyId::Venus => "Venus",
            BodyId::Earth => "Earth",
            BodyId::Mars => "Mars",
            BodyId::Jupiter => "Jupiter",
            BodyId::Saturn => "Saturn",
            BodyId::Uranus => "Uranus",
            BodyId::Neptune => "Neptune",
            BodyId::Pluto => "Pluto",
            BodyId::Voyager1 => "Voyager 1",
            BodyId::Voyager2 => "Voyager 2",
        }
    }

    /// Opaque provider identifier passed to `EphemerisProvider::fetch` as the
    /// upstream `COMMAND` value. JPL Horizons major-body IDs for the planets
    /// (barycenters) and the NAIF IDs for the two probes.
    pub fn provider_id(self) -> &'static str {
        match self {
            BodyId::Mercury => "199",
            BodyId::Venus => "299",
            BodyId::Earth => "399",
            BodyId::Mars => "499",
            BodyId::Jupiter => "599",
            BodyId::Saturn => "699",
            BodyId::Uranus => "799",
            BodyId::Neptune => "899",
            BodyId::Pluto => "999",
            BodyId::Voyager1 => "-31",
            BodyId::Voyager2 => "-32",
        }
    }

    pub fn kind(self) -> BodyKind {
        match self {
            BodyId::Voyager1 | BodyId::Voyager2 => BodyKind::Probe,
            _ => BodyKind::Planet,
        }
    }
}

/// The two catalog partitions exposed by the public API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    Planet,
    Probe,
}

impl BodyKind {
    /// Stable cache-key suffix for a snapshot kind, e.g. `ephemeris:planets:v1`.
    pub fn cache_key(self) -> &'static str {
        match self {
            BodyKind::Planet => "ephemeris:planets:v1",
            BodyKind::Probe => "ephemeris:probes:v1",
        }
    }
}

const PLANETS: [BodyId; 9] = [
    BodyId::Mercury,
    BodyId::Venus,
    BodyId::Earth,
    BodyId::Mars,
    BodyId::Jupiter,
    BodyId::Saturn,
    BodyId::Uranus,
    BodyId::Neptune,
    BodyId::Pluto,
];

const PROBES: [BodyId; 2] = [BodyId::Voyager1, BodyId::Voyager2];

/// Read-only accessor over the fixed catalog. Stateless; exists mainly to
/// give the rest of the codebase a single named seam to depend on, the way
/// callers elsewhere in this codebase depend on a narrow provider trait
/// rather than reaching for module-level constants directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct Catalog;

impl Catalog {
    pub fn new() -> Self {
        Catalog
    }

    /// Bodies of one kind, in the stable order used to build a `Snapshot`.
    pub fn list(&self, kind: BodyKind) -> &'static [BodyId] {
        match kind {
            BodyKind::Planet => &PLANETS,
            BodyKind::Probe => &PROBES,
        }
    }
}
