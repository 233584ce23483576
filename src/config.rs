//! Process configuration, loaded once at startup from the environment
//! (optionally seeded from a `.env` file via `dotenvy`, matching the
//! teacher crate's configuration style).

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub cache_ttl: Duration,
    pub cache_stale_window: Duration,
    /// `None` disables the background pre-warmer.
    pub prewarm_interval: Option<Duration>,
    pub redis_url: Option<String>,
}

impl Config {
    /// Loads `.env` if present (ignoring a missing file, matching the
    /// teacher's `dotenvy::dotenv().ok()` usage) and then reads environment
    /// variables, falling back to the documented defaults on anything
    /// missing or unparseable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let port = env_u16("PORT", 3000);
        let ttl_ms = env_u64("CACHE_TTL_MS", 120_000);
        let stale_ms = env_u64("CACHE_STALE_MS", ttl_ms / 2);
        let warm_ms = env_u64("CACHE_WARM_INTERVAL_MS", (ttl_ms as f64 * 0.8).max(30_000.0) as u64);
        let redis_url = std::env::var("REDIS_URL").ok().filter(|s| !s.is_empty());

        Config {
            port,
            cache_ttl: Duration::from_millis(ttl_ms),
            cache_stale_window: Duration::from_millis(stale_ms),
            prewarm_interval: if warm_ms == 0 {
                None
            } else {
                Some(Duration::from_millis(warm_ms))
            },
            redis_url,
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_window_defaults_to_half_ttl() {
        std::env::remove_var("CACHE_TTL_MS");
        std::env::remove_var("CACHE_STALE_MS");
        std::env::remove_var("CACHE_WARM_INTERVAL_MS");
        std::env::remove_var("REDIS_URL");
        std::env::remove_var("PORT");
        let cfg = Config::from_env();
        assert_eq!(cfg.cache_ttl, Duration::from_millis(120_000));
        assert_eq!(cfg.cache_stale_window, Duration::from_millis(60_000));
        assert_eq!(cfg.prewarm_interval, Some(Duration::from_millis(96_000)));
        assert!(cfg.redis_url.is_none());
    }

    #[test]
    fn zero_warm_interval_disables_prewarmer() {
        std::env::set_var("CACHE_WARM_INTERVAL_MS", "0");
        let cfg = Config::from_env();
        assert!(cfg.prewarm_interval.is_none());
        std::env::remove_var("CACHE_WARM_INTERVAL_MS");
    }
}
