use crate::config::model::{FailureFlag, FailurePayload};
use crate::telemetry::{self, Action};
use rand::Rng;
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;

/// Sleeps a uniformly drawn number of milliseconds in `[min, max]` and
/// returns the chosen delay.
pub async fn inject(flag: &FailureFlag) -> u64 {
    let FailurePayload::Latency {
        min_latency_ms,
        max_latency_ms,
    } = &flag.payload
    else {
        return 0;
    };
    let (min, max) = (*min_latency_ms, *max_latency_ms);
    let delay_ms = if min >= max {
        min
    } else {
        rand::rng().random_range(min..=max)
    };
    telemetry::info(Action::Inject, json!({"mode": "latency", "delay_ms": delay_ms}));
    sleep(Duration::from_millis(delay_ms)).await;
    delay_ms
}
