//! JPL-Horizons-shaped upstream integration.
//!
//! Two response shapes are observed in the wild and both must be accepted:
//! a structured `result.vectors` JSON array, and an embedded free-form text
//! block delimited by `$$SOE`/`$$EOE` sentinels (the shape the teacher
//! crate's own `utils::horizons` module was written against). This module
//! tries the structured shape first and falls back to the tolerant text
//! scanner, matching the "tagged variant, try each in order" design note in
//! the specification.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::OnceCell;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;

use crate::catalog::BodyId;
use crate::errors::{bounded_snippet, EphemerisError};
use crate::model::{StateVector, Velocity};

use super::EphemerisProvider;

const HORIZONS_URL: &str = "https://ssd.jpl.nasa.gov/api/horizons.api";
const KM_PER_AU: f64 = 149_597_870.7;
const SECONDS_PER_DAY: f64 = 86_400.0;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HorizonsProvider {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HorizonsProvider {
    pub fn new() -> Self {
        Self::with_base_url(HORIZONS_URL.to_string())
    }

    /// Allows tests to point the provider at a `wiremock` server instead of
    /// the real upstream.
    pub fn with_base_url(base_url: String) -> Self {
        HorizonsProvider {
            client: Client::new(),
            base_url,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for HorizonsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EphemerisProvider for HorizonsProvider {
    async fn fetch(
        &self,
        body: BodyId,
        correlation_id: &str,
    ) -> Result<StateVector, EphemerisError> {
        let start = Instant::now();
        let now = Utc::now();
        let stop = now + chrono::Duration::hours(1);

        let request = self
            .client
            .get(&self.base_url)
            .timeout(self.timeout)
            .header("X-Correlation-Id", correlation_id)
            .query(&[
                ("format", "json"),
                ("COMMAND", body.provider_id()),
                ("EPHEM_TYPE", "VECTORS"),
                ("CENTER", "@0"),
                ("REF_PLANE", "ECLIPTIC"),
                ("REF_SYSTEM", "J2000"),
                ("OUT_UNITS", "AU-D"),
                ("VEC_TABLE", "2"),
                ("STEP_SIZE", "1d"),
                ("START_TIME", &now.format("%Y-%m-%d %H:%M").to_string()),
                ("STOP_TIME", &stop.format("%Y-%m-%d %H:%M").to_string()),
            ]);

        let response = request.send().await.map_err(|e| EphemerisError::UpstreamUnavailable {
            body: body.internal_name().to_string(),
            detail: e.to_string(),
            status: e.status().map(|s| s.as_u16()),
            elapsed: start.elapsed(),
            correlation_id: correlation_id.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(EphemerisError::UpstreamUnavailable {
                body: body.internal_name().to_string(),
                detail: format!("HTTP {status}"),
                status: Some(status.as_u16()),
                elapsed: start.elapsed(),
                correlation_id: correlation_id.to_string(),
            });
        }

        let text = response.text().await.map_err(|e| EphemerisError::UpstreamUnavailable {
            body: body.internal_name().to_string(),
            detail: format!("failed to read response body: {e}"),
            status: None,
            elapsed: start.elapsed(),
            correlation_id: correlation_id.to_string(),
        })?;

        let elapsed = start.elapsed();
        let parsed = parse_response(&text, body, correlation_id, elapsed)?;

        tracing::info!(
            body = body.internal_name(),
            latency_ms = elapsed.as_millis() as u64,
            correlation_id,
            "horizons_fetch"
        );
        metrics::histogram!("fetch_duration_ms").record(elapsed.as_millis() as f64);

        Ok(parsed)
    }
}

/// Either observed upstream response shape, tried in order.
fn parse_response(
    body_text: &str,
    body: BodyId,
    correlation_id: &str,
    elapsed: Duration,
) -> Result<StateVector, EphemerisError> {
    let malformed = |detail: String| EphemerisError::UpstreamMalformed {
        body: body.internal_name().to_string(),
        detail,
        snippet: bounded_snippet(body_text),
        elapsed,
        correlation_id: correlation_id.to_string(),
    };

    let parsed = parse_structured(body_text)
        .transpose()
        .or_else(|| parse_embedded_text(body_text).transpose())
        .transpose()
        .map_err(|detail: String| {
            let e = malformed(detail);
            tracing::warn!(body = body.internal_name(), correlation_id, "horizons_fetch_error");
            e
        })?;

    let Some((x, y, z, velocity)) = parsed else {
        let e = malformed("neither structured nor embedded-text shape recognized, or $$SOE/$$EOE markers missing".to_string());
        tracing::warn!(body = body.internal_name(), correlation_id, "horizons_fetch_error");
        return Err(e);
    };

    StateVector::new(body, x, y, z, velocity, "J2000-ECLIPTIC", "horizons", Utc::now())
        .map_err(malformed)
}

#[derive(Debug, Deserialize)]
struct StructuredResponse {
    result: StructuredResult,
}

#[derive(Debug, Deserialize)]
struct StructuredResult {
    #[serde(default)]
    vectors: Vec<StructuredVector>,
}

#[derive(Debug, Deserialize)]
struct StructuredVector {
    #[serde(rename = "X")]
    x: String,
    #[serde(rename = "Y")]
    y: String,
    #[serde(rename = "Z")]
    z: String,
    #[serde(rename = "VX")]
    vx: Option<String>,
    #[serde(rename = "VY")]
    vy: Option<String>,
    #[serde(rename = "VZ")]
    vz: Option<String>,
}

type ParsedVector = (f64, f64, f64, Option<Velocity>);

/// Try the structured `result.vectors` shape. Returns `Ok(None)` when the
/// body isn't that shape at all (so the embedded-text scanner gets a turn),
/// and `Err` only once we've committed to this shape and it's broken.
fn parse_structured(body_text: &str) -> Result<Option<ParsedVector>, String> {
    let parsed: StructuredResponse = match serde_json::from_str(body_text) {
        Ok(p) => p,
        Err(_) => return Ok(None),
    };
    let Some(first) = parsed.result.vectors.into_iter().next() else {
        return Ok(None);
    };

    let x: f64 = first
        .x
        .trim()
        .parse()
        .map_err(|_| format!("invalid X field: '{}'", first.x))?;
    let y: f64 = first
        .y
        .trim()
        .parse()
        .map_err(|_| format!("invalid Y field: '{}'", first.y))?;
    let z: f64 = first
        .z
        .trim()
        .parse()
        .map_err(|_| format!("invalid Z field: '{}'", first.z))?;
    if !x.is_finite() || !y.is_finite() || !z.is_finite() {
        return Err(format!("non-finite position ({x}, {y}, {z})"));
    }

    let velocity = parse_optional_velocity_strs(
        first.vx.as_deref(),
        first.vy.as_deref(),
        first.vz.as_deref(),
    )?;

    Ok(Some((x, y, z, velocity)))
}

fn parse_optional_velocity_strs(
    vx: Option<&str>,
    vy: Option<&str>,
    vz: Option<&str>,
) -> Result<Option<Velocity>, String> {
    match (vx, vy, vz) {
        (None, None, None) => Ok(None),
        (Some(vx), Some(vy), Some(vz)) => {
            let vx: f64 = vx.trim().parse().map_err(|_| format!("invalid VX field: '{vx}'"))?;
            let vy: f64 = vy.trim().parse().map_err(|_| format!("invalid VY field: '{vy}'"))?;
            let vz: f64 = vz.trim().parse().map_err(|_| format!("invalid VZ field: '{vz}'"))?;
            if !vx.is_finite() || !vy.is_finite() || !vz.is_finite() {
                return Err(format!("non-finite velocity ({vx}, {vy}, {vz})"));
            }
            Ok(Some(Velocity { vx, vy, vz }))
        }
        _ => Err("velocity components present but not all three of VX/VY/VZ".to_string()),
    }
}

/// Tolerant numeric pattern: optional sign, digits, optional fraction,
/// optional exponent — matches the mantissa/exponent form JPL Horizons'
/// plain-text CSV/vectors output uses.
static NUMBER_RE_STR: &str = r"[-+]?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?";

fn field_regex(field: &str) -> Regex {
    Regex::new(&format!(r"(?m)\b{field}\s*=\s*({NUMBER_RE_STR})")).expect("valid field regex")
}

fn units_are_km(text: &str) -> bool {
    static UNITS_RE: OnceCell<Regex> = OnceCell::new();
    UNITS_RE
        .get_or_init(|| Regex::new(r"(?i)output units:\s*([a-z0-9/\-]+)").unwrap())
        .captures(text)
        .map(|c| c[1].to_uppercase().contains("KM"))
        .unwrap_or(false)
}

/// Try the embedded free-form text shape: a block between `$$SOE` and
/// `$$EOE`, scanned for the first `X = <num>`, `Y = <num>`, `Z = <num>` and
/// optional `VX`/`VY`/`VZ` fields. Returns `Ok(None)` when the sentinel
/// markers aren't present at all.
fn parse_embedded_text(body_text: &str) -> Result<Option<ParsedVector>, String> {
    let start = match body_text.find("$$SOE") {
        Some(i) => i + "$$SOE".len(),
        None => return Ok(None),
    };
    let end = match body_text[start..].find("$$EOE") {
        Some(i) => start + i,
        None => return Err("found $$SOE but no matching $$EOE".to_string()),
    };
    let region = &body_text[start..end];

    let x = field_regex("X")
        .captures(region)
        .ok_or_else(|| "X field not found in embedded-text region".to_string())?[1]
        .parse::<f64>()
        .map_err(|_| "X field not numeric".to_string())?;
    let y = field_regex("Y")
        .captures(region)
        .ok_or_else(|| "Y field not found in embedded-text region".to_string())?[1]
        .parse::<f64>()
        .map_err(|_| "Y field not numeric".to_string())?;
    let z = field_regex("Z")
        .captures(region)
        .ok_or_else(|| "Z field not found in embedded-text region".to_string())?[1]
        .parse::<f64>()
        .map_err(|_| "Z field not numeric".to_string())?;

    if !x.is_finite() || !y.is_finite() || !z.is_finite() {
        return Err(format!("non-finite position ({x}, {y}, {z})"));
    }

    let vx = field_regex("VX").captures(region).map(|c| c[1].parse::<f64>());
    let vy = field_regex("VY").captures(region).map(|c| c[1].parse::<f64>());
    let vz = field_regex("VZ").captures(region).map(|c| c[1].parse::<f64>());

    let velocity = match (vx, vy, vz) {
        (None, None, None) => None,
        (Some(Ok(vx)), Some(Ok(vy)), Some(Ok(vz))) => {
            if !vx.is_finite() || !vy.is_finite() || !vz.is_finite() {
                return Err(format!("non-finite velocity ({vx}, {vy}, {vz})"));
            }
            Some(Velocity { vx, vy, vz })
        }
        _ => return Err("velocity components present but not all three parsed".to_string()),
    };

    let (x, y, z, velocity) = if units_are_km(body_text) {
        convert_km_to_au(x, y, z, velocity)
    } else {
        (x, y, z, velocity)
    };

    Ok(Some((x, y, z, velocity)))
}

fn convert_km_to_au(x: f64, y: f64, z: f64, velocity: Option<Velocity>) -> ParsedVector {
    let to_au = |v: f64| v / KM_PER_AU;
    let velocity = velocity.map(|v| Velocity {
        vx: v.vx / KM_PER_AU * SECONDS_PER_DAY,
        vy: v.vy / KM_PER_AU * SECONDS_PER_DAY,
        vz: v.vz / KM_PER_AU * SECONDS_PER_DAY,
    });
    (to_au(x), to_au(y), to_au(z), velocity)
}
