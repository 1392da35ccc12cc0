//! # Configuration cache
//!
//! Process-local, time-bounded memoization of the last fetched
//! configuration. The cache holds a single entry, lives for the lifetime of
//! the hosting container, and auto-disables when the backend already caches
//! externally (the hosted extension endpoint).

use super::model::Configuration;
use crate::ChaosOptions;
use crate::telemetry::{self, Action};
use serde_json::json;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const DEFAULT_TTL: Duration = Duration::from_secs(60);

struct CacheEntry {
    configuration: Configuration,
    fetched_at: Instant,
}

pub(crate) struct ConfigCache {
    entry: Mutex<Option<CacheEntry>>,
}

impl ConfigCache {
    const fn new() -> Self {
        Self {
            entry: Mutex::new(None),
        }
    }

    /// Returns the cached configuration when it is younger than `ttl`.
    /// A zero TTL disables caching entirely.
    pub(crate) fn get_fresh(&self, ttl: Duration) -> Option<Configuration> {
        if ttl.is_zero() {
            return None;
        }
        let guard = self.entry.lock().ok()?;
        guard
            .as_ref()
            .filter(|entry| entry.fetched_at.elapsed() < ttl)
            .map(|entry| entry.configuration.clone())
    }

    pub(crate) fn store(&self, configuration: Configuration) {
        if let Ok(mut guard) = self.entry.lock() {
            *guard = Some(CacheEntry {
                configuration,
                fetched_at: Instant::now(),
            });
        }
    }

    pub(crate) fn clear(&self) {
        if let Ok(mut guard) = self.entry.lock() {
            *guard = None;
        }
    }
}

pub(crate) static CONFIG_CACHE: ConfigCache = ConfigCache::new();

/// TTL policy: an explicit parseable value wins, the hosted backend defaults
/// to no caching, everything else defaults to 60 seconds.
pub(crate) fn effective_ttl(options: &ChaosOptions, hosted: bool) -> Duration {
    let fallback = if hosted { Duration::ZERO } else { DEFAULT_TTL };
    let Some(raw) = options.cache_ttl.as_deref() else {
        return fallback;
    };
    match raw.trim().parse::<f64>() {
        Ok(seconds) if seconds.is_finite() && seconds >= 0.0 => {
            if hosted && seconds > 0.0 {
                telemetry::warn(
                    Action::Config,
                    json!({
                        "message": "hosted backend already caches externally; \
                         a positive TTL adds a second caching layer",
                        "ttl_seconds": seconds,
                    }),
                );
            }
            Duration::from_secs_f64(seconds)
        }
        _ => {
            telemetry::warn(
                Action::Config,
                json!({"message": "unparseable cache TTL, using default", "value": raw}),
            );
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options_with_ttl(ttl: Option<&str>) -> ChaosOptions {
        ChaosOptions {
            cache_ttl: ttl.map(str::to_string),
            ..ChaosOptions::unset()
        }
    }

    #[test]
    fn test_zero_ttl_disables_caching() {
        let cache = ConfigCache::new();
        cache.store(Configuration::default());
        assert!(cache.get_fresh(Duration::ZERO).is_none());
        assert!(cache.get_fresh(Duration::from_secs(60)).is_some());
    }

    #[test]
    fn test_stale_entry_is_a_miss() {
        let cache = ConfigCache::new();
        cache.store(Configuration::default());
        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get_fresh(Duration::from_millis(5)).is_none());
        assert!(cache.get_fresh(Duration::from_secs(5)).is_some());
    }

    #[test]
    fn test_clear_evicts() {
        let cache = ConfigCache::new();
        cache.store(Configuration::default());
        cache.clear();
        assert!(cache.get_fresh(Duration::from_secs(60)).is_none());
    }

    #[test]
    fn test_explicit_ttl_wins() {
        assert_eq!(
            effective_ttl(&options_with_ttl(Some("300")), false),
            Duration::from_secs(300)
        );
        assert_eq!(
            effective_ttl(&options_with_ttl(Some("0")), false),
            Duration::ZERO
        );
        assert_eq!(
            effective_ttl(&options_with_ttl(Some("5")), true),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_defaults_by_backend() {
        assert_eq!(effective_ttl(&options_with_ttl(None), true), Duration::ZERO);
        assert_eq!(
            effective_ttl(&options_with_ttl(None), false),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn test_unparseable_ttl_falls_back() {
        assert_eq!(
            effective_ttl(&options_with_ttl(Some("soon")), false),
            Duration::from_secs(60)
        );
        assert_eq!(
            effective_ttl(&options_with_ttl(Some("-3")), true),
            Duration::ZERO
        );
    }
}
