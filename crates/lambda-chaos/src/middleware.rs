//! # Middleware adapter
//!
//! Exposes the injection pipeline as before/after/onError hooks for
//! middleware-style frameworks. `before` may short-circuit the handler by
//! setting the response; `after` applies post-handler corruption; `on_error`
//! runs the cleanup path.

use crate::config::model::FailureMode;
use crate::context::InvocationContext;
use crate::error::ChaosError;
use crate::orchestrator::{Pipeline, PreOutcome, WrapOptions};
use crate::resolve::resolve_failures;
use crate::telemetry::{self, Action};
use serde_json::{Value, json};
use std::fmt;

/// Mutable view of one invocation as it moves through the hooks.
#[derive(Debug)]
pub struct MiddlewareRequest {
    pub event: Value,
    pub context: InvocationContext,
    /// Set by `before` on short-circuit, or by the framework after the
    /// handler ran.
    pub response: Option<Value>,
    /// True when `response` was substituted by the pre-phase. Later entries
    /// must not run against a short-circuited response, so `after` leaves it
    /// untouched.
    pub short_circuited: bool,
}

impl MiddlewareRequest {
    pub fn new(event: Value, context: InvocationContext) -> Self {
        Self {
            event,
            context,
            response: None,
            short_circuited: false,
        }
    }
}

pub struct ChaosMiddleware {
    pipeline: Pipeline,
}

impl ChaosMiddleware {
    pub fn new(options: WrapOptions) -> Self {
        Self {
            pipeline: Pipeline::new(options),
        }
    }

    /// Pre-handler hook. When this sets `request.response`, the framework
    /// must skip the handler and jump to `after`.
    pub async fn before(&self, request: &mut MiddlewareRequest) -> Result<(), ChaosError> {
        if self.pipeline.kill_switch_engaged() {
            return Ok(());
        }
        let configuration = self.pipeline.load_configuration().await;
        let plan = resolve_failures(&configuration);
        match self
            .pipeline
            .run_pre_phase(&plan, &request.event, &request.context)
            .await?
        {
            PreOutcome::Continue => Ok(()),
            PreOutcome::ShortCircuit(response) => {
                request.response = Some(response);
                request.short_circuited = true;
                Ok(())
            }
        }
    }

    /// Post-handler hook: applies corruption to the response in place. A
    /// short-circuited response passes through unchanged, exactly as in the
    /// direct wrapper.
    pub async fn after(&self, request: &mut MiddlewareRequest) -> Result<(), ChaosError> {
        if self.pipeline.kill_switch_engaged() || request.short_circuited {
            return Ok(());
        }
        let Some(response) = request.response.take() else {
            return Ok(());
        };
        let configuration = self.pipeline.load_configuration().await;
        let plan = resolve_failures(&configuration);
        if plan.iter().any(|entry| entry.mode == FailureMode::Corruption) {
            request.response =
                Some(self.pipeline.apply_post_phase(&plan, &request.event, response));
        } else {
            request.response = Some(response);
        }
        Ok(())
    }

    /// Error hook: logs and clears leftover side effects. The framework
    /// re-raises the original error.
    pub async fn on_error(&self, error: &ChaosError) {
        telemetry::error(
            Action::Error,
            json!({
                "message": "invocation failed",
                "cause": error.to_string(),
                "injected": error.is_injected(),
            }),
        );
        self.pipeline.cleanup_after_error().await;
    }
}

impl fmt::Debug for ChaosMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChaosMiddleware")
            .field("dry_run", &self.pipeline.dry_run())
            .finish()
    }
}
