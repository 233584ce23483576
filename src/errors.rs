//! Error taxonomy shared by the provider, cache, and engine layers.
//!
//! Each variant matches one row of the error-handling table in the
//! specification; the fields are the structured context a caller needs to
//! decide recovery (status, a bounded body snippet, elapsed time, the
//! correlation id) rather than a single opaque string.

use std::time::Duration;

use thiserror::Error;

/// Upstream response body is truncated to this many bytes before being
/// captured in an error, so a misbehaving upstream can't balloon our logs.
pub const SNIPPET_MAX_BYTES: usize = 512;

pub fn bounded_snippet(body: &str) -> String {
    if body.len() <= SNIPPET_MAX_BYTES {
        body.to_string()
    } else {
        let mut end = SNIPPET_MAX_BYTES;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &body[..end])
    }
}

#[derive(Debug, Error)]
pub enum EphemerisError {
    #[error("upstream unavailable for {body}: {detail} (correlation_id={correlation_id})")]
    UpstreamUnavailable {
        body: String,
        detail: String,
        status: Option<u16>,
        elapsed: Duration,
        correlation_id: String,
    },

    #[error("upstream response for {body} malformed: {detail} (correlation_id={correlation_id})")]
    UpstreamMalformed {
        body: String,
        detail: String,
        snippet: String,
        elapsed: Duration,
        correlation_id: String,
    },

    #[error("partial fan-out failure: {} of {attempted} bodies failed", failures.len())]
    UpstreamPartialFailure {
        attempted: usize,
        failures: Vec<(String, Box<EphemerisError>)>,
    },

    #[error("shared cache store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("cache record could not be deserialized: {0}")]
    SerializationError(String),
}

impl EphemerisError {
    /// Human-readable message suitable for the `freezeReason` field and the
    /// JSON error envelope's `error` field. Never includes the correlation
    /// id (that is carried alongside it, not embedded in it).
    pub fn reason(&self) -> String {
        match self {
            EphemerisError::UpstreamUnavailable { body, detail, .. } => {
                format!("upstream unavailable for {body}: {detail}")
            }
            EphemerisError::UpstreamMalformed { body, detail, .. } => {
                format!("upstream response for {body} malformed: {detail}")
            }
            EphemerisError::UpstreamPartialFailure {
                attempted,
                failures,
            } => format!(
                "{} of {attempted} bodies failed: {}",
                failures.len(),
                failures
                    .iter()
                    .map(|(b, e)| format!("{b} ({e})"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            EphemerisError::StoreUnavailable(detail) => {
                format!("shared cache store unavailable: {detail}")
            }
            EphemerisError::SerializationError(detail) => {
                format!("cache record could not be deserialized: {detail}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_passes_through_short_bodies() {
        assert_eq!(bounded_snippet("short"), "short");
    }

    #[test]
    fn snippet_truncates_long_bodies() {
        let long = "x".repeat(SNIPPET_MAX_BYTES + 100);
        let snippet = bounded_snippet(&long);
        assert!(snippet.ends_with('…'));
        assert!(snippet.len() <= SNIPPET_MAX_BYTES + '…'.len_utf8());
    }
}
