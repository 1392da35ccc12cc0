//! # Configuration pipeline
//!
//! Fetch, parse, validate, and cache the failure configuration. The loader
//! never fails the invocation: any transport or parse problem is logged and
//! mapped to the empty configuration.

mod cache;
mod fetcher;
pub mod model;
pub mod parser;
pub mod redos;

pub use fetcher::{AppConfigFetcher, ConfigFetcher, ParameterStoreFetcher};

use crate::ChaosOptions;
use crate::telemetry::{self, Action};
use model::Configuration;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static COLD_START_LOGGED: AtomicBool = AtomicBool::new(false);

/// Loads the typed configuration from the selected backend through the
/// process-local cache.
pub struct ConfigLoader {
    fetcher: Arc<dyn ConfigFetcher>,
    ttl: Duration,
}

impl ConfigLoader {
    /// Selects the backend from the ambient options: hosted first, then
    /// parameter store. `None` when neither backend is configured.
    pub fn from_options(options: &ChaosOptions) -> Option<Self> {
        if let (Some(application), Some(environment), Some(profile)) = (
            options.appconfig_application.as_deref(),
            options.appconfig_environment.as_deref(),
            options.appconfig_profile.as_deref(),
        ) {
            return Some(Self {
                fetcher: Arc::new(AppConfigFetcher::new(
                    application,
                    environment,
                    profile,
                    options.appconfig_port,
                )),
                ttl: cache::effective_ttl(options, true),
            });
        }
        if let Some(parameter) = options.ssm_parameter.as_deref() {
            return Some(Self {
                fetcher: Arc::new(ParameterStoreFetcher::new(parameter)),
                ttl: cache::effective_ttl(options, false),
            });
        }
        None
    }

    /// Builds a loader around a caller-supplied fetcher, keeping the
    /// non-hosted TTL policy.
    pub fn with_fetcher(fetcher: Arc<dyn ConfigFetcher>, options: &ChaosOptions) -> Self {
        Self {
            fetcher,
            ttl: cache::effective_ttl(options, false),
        }
    }

    /// Returns the typed configuration, empty on any loader failure.
    pub async fn get_config(&self) -> Configuration {
        if let Some(configuration) = cache::CONFIG_CACHE.get_fresh(self.ttl) {
            return configuration;
        }

        let raw = match self.fetcher.fetch().await {
            Ok(raw) => raw,
            Err(e) => {
                telemetry::error(
                    Action::Error,
                    json!({
                        "message": "configuration fetch failed",
                        "backend": self.fetcher.backend_id(),
                        "cause": e.to_string(),
                    }),
                );
                return Configuration::default();
            }
        };

        let document: Value = match serde_json::from_str(&raw) {
            Ok(document) => document,
            Err(e) => {
                telemetry::error(
                    Action::Error,
                    json!({
                        "message": "configuration is not valid JSON",
                        "backend": self.fetcher.backend_id(),
                        "cause": e.to_string(),
                    }),
                );
                return Configuration::default();
            }
        };

        let configuration = parser::parse_flags(&document);
        cache::CONFIG_CACHE.store(configuration.clone());

        if !COLD_START_LOGGED.swap(true, Ordering::Relaxed) {
            telemetry::info(
                Action::Config,
                json!({
                    "backend": self.fetcher.backend_id(),
                    "ttl_seconds": self.ttl.as_secs_f64(),
                    "enabled_modes": configuration.enabled_modes(),
                }),
            );
        }

        configuration
    }
}

/// Drops the cached configuration so the next invocation fetches fresh.
pub fn clear_cache() {
    cache::CONFIG_CACHE.clear();
}
