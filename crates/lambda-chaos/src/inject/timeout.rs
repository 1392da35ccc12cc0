use crate::config::model::{FailureFlag, FailurePayload};
use crate::context::InvocationContext;
use crate::telemetry::{self, Action};
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;

/// Sleeps toward the invocation deadline, leaving `timeout_buffer_ms` of
/// margin. Intended to trip the platform timeout; the routine itself never
/// errors.
pub async fn inject(flag: &FailureFlag, context: &InvocationContext) -> u64 {
    let FailurePayload::Timeout { timeout_buffer_ms } = &flag.payload else {
        return 0;
    };
    let remaining_ms = context.remaining_time_ms();
    let delay_ms = remaining_ms.saturating_sub(*timeout_buffer_ms);
    telemetry::info(
        Action::Inject,
        json!({"mode": "timeout", "delay_ms": delay_ms, "remaining_ms": remaining_ms}),
    );
    sleep(Duration::from_millis(delay_ms)).await;
    delay_ms
}
