#![allow(dead_code)]

use async_trait::async_trait;
use lambda_chaos::{ChaosOptions, ConfigFetcher, RollSource, WrapOptions};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fetcher returning a fixed document, standing in for a real backend.
pub struct StaticFetcher(pub String);

#[async_trait]
impl ConfigFetcher for StaticFetcher {
    fn backend_id(&self) -> &str {
        "static"
    }

    async fn fetch(&self) -> anyhow::Result<String> {
        Ok(self.0.clone())
    }
}

/// Fetcher counting how often the loader actually reaches the backend.
pub struct CountingFetcher {
    document: String,
    calls: AtomicUsize,
}

impl CountingFetcher {
    pub fn new(document: &str) -> Self {
        Self {
            document: document.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigFetcher for CountingFetcher {
    fn backend_id(&self) -> &str {
        "counting"
    }

    async fn fetch(&self) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.document.clone())
    }
}

/// Deterministic roll source.
#[derive(Debug)]
pub struct FixedRolls(pub f64);

impl RollSource for FixedRolls {
    fn roll(&self) -> f64 {
        self.0
    }
}

/// Wrap options around a static configuration document, a fixed roll, and
/// caching disabled so every invocation sees a fresh fetch.
pub fn static_options(document: &str, roll: f64) -> WrapOptions {
    WrapOptions {
        config_provider: Some(Arc::new(StaticFetcher(document.to_string()))),
        dry_run: false,
        roll_source: Some(Arc::new(FixedRolls(roll))),
        chaos: ChaosOptions {
            cache_ttl: Some("0".to_string()),
            ..ChaosOptions::unset()
        },
    }
}
