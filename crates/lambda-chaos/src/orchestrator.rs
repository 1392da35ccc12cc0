//! # Invocation orchestrator
//!
//! Drives the two injection phases around the user handler: resolve the
//! plan, clean up side effects left by a prior invocation, run the
//! pre-handler loop (with its statuscode/exception short-circuit paths),
//! call the handler, and apply post-handler corruption. The error path runs
//! cleanup and re-raises.

use crate::ChaosOptions;
use crate::config::model::{Configuration, FailureMode, FailurePayload, ResolvedFailure};
use crate::config::{ConfigFetcher, ConfigLoader};
use crate::context::InvocationContext;
use crate::error::ChaosError;
use crate::handler::Handler;
use crate::inject::{corruption, denylist, diskspace, exception, latency, statuscode, timeout};
use crate::matcher;
use crate::resolve::resolve_failures;
use crate::telemetry::{self, Action};
use rand::Rng;
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Per-flag probability roll in `[0, 100)`. Replaceable for deterministic
/// tests, like the configuration fetcher.
pub trait RollSource: Send + Sync {
    fn roll(&self) -> f64;
}

/// Default roll source backed by the thread-local PRNG.
#[derive(Debug, Default)]
pub struct RandomRolls;

impl RollSource for RandomRolls {
    fn roll(&self) -> f64 {
        rand::rng().random_range(0.0..100.0)
    }
}

/// Options for [`wrap`].
#[derive(Default)]
pub struct WrapOptions {
    /// Overrides the ambient configuration loader.
    pub config_provider: Option<Arc<dyn ConfigFetcher>>,
    /// Log would-be injections without performing them.
    pub dry_run: bool,
    /// Overrides the probability roll source.
    pub roll_source: Option<Arc<dyn RollSource>>,
    /// Ambient configuration; `Default` reads the environment.
    pub chaos: ChaosOptions,
}

impl fmt::Debug for WrapOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapOptions")
            .field("config_provider", &self.config_provider.is_some())
            .field("dry_run", &self.dry_run)
            .field("roll_source", &self.roll_source.is_some())
            .field("chaos", &self.chaos)
            .finish()
    }
}

pub(crate) enum PreOutcome {
    Continue,
    ShortCircuit(Value),
}

enum Gate {
    Fire,
    Skip,
    DryRun,
}

/// The injection pipeline, shared by the direct wrapper and the middleware
/// adapter.
pub(crate) struct Pipeline {
    options: WrapOptions,
}

impl Pipeline {
    pub(crate) fn new(options: WrapOptions) -> Self {
        Self { options }
    }

    pub(crate) fn kill_switch_engaged(&self) -> bool {
        self.options.chaos.kill_switch_engaged()
    }

    pub(crate) fn dry_run(&self) -> bool {
        self.options.dry_run
    }

    pub(crate) async fn load_configuration(&self) -> Configuration {
        if let Some(fetcher) = &self.options.config_provider {
            return ConfigLoader::with_fetcher(fetcher.clone(), &self.options.chaos)
                .get_config()
                .await;
        }
        match ConfigLoader::from_options(&self.options.chaos) {
            Some(loader) => loader.get_config().await,
            None => Configuration::default(),
        }
    }

    fn roll(&self) -> f64 {
        match &self.options.roll_source {
            Some(source) => source.roll(),
            None => RandomRolls.roll(),
        }
    }

    fn gate(&self, entry: &ResolvedFailure, event: &Value) -> Gate {
        if !entry.flag.conditions.is_empty() && !matcher::matches(event, &entry.flag.conditions) {
            debug!("{} skipped: match conditions not satisfied", entry.mode);
            return Gate::Skip;
        }
        let roll = self.roll();
        if roll >= entry.percentage as f64 {
            debug!(
                "{} skipped: roll {roll:.1} >= percentage {}",
                entry.mode, entry.percentage
            );
            return Gate::Skip;
        }
        if self.options.dry_run {
            telemetry::info(
                Action::Dryrun,
                json!({
                    "mode": entry.mode.as_str(),
                    "percentage": entry.percentage,
                    "roll": roll,
                }),
            );
            return Gate::DryRun;
        }
        Gate::Fire
    }

    /// Pre-cleanup plus the pre-handler loop. Side effects from a prior
    /// invocation are cleared unconditionally so they never leak into an
    /// invocation whose own roll does not fire.
    pub(crate) async fn run_pre_phase(
        &self,
        plan: &[ResolvedFailure],
        event: &Value,
        context: &InvocationContext,
    ) -> Result<PreOutcome, ChaosError> {
        denylist::clear();
        diskspace::clear().await;

        for entry in plan {
            if entry.mode == FailureMode::Corruption {
                continue;
            }
            match self.gate(entry, event) {
                Gate::Skip | Gate::DryRun => continue,
                Gate::Fire => {}
            }
            match entry.mode {
                FailureMode::Latency => {
                    latency::inject(&entry.flag).await;
                }
                FailureMode::Timeout => {
                    timeout::inject(&entry.flag, context).await;
                }
                FailureMode::DiskSpace => {
                    diskspace::fill(&entry.flag).await;
                }
                FailureMode::Denylist => {
                    if let FailurePayload::Denylist { deny_list } = &entry.flag.payload {
                        denylist::install(deny_list);
                    }
                }
                FailureMode::StatusCode => {
                    return Ok(PreOutcome::ShortCircuit(statuscode::respond(&entry.flag)));
                }
                FailureMode::Exception => {
                    return Err(exception::raise(&entry.flag));
                }
                FailureMode::Corruption => {}
            }
        }
        Ok(PreOutcome::Continue)
    }

    /// The post-handler loop: at most one corruption entry by construction.
    pub(crate) fn apply_post_phase(
        &self,
        plan: &[ResolvedFailure],
        event: &Value,
        result: Value,
    ) -> Value {
        for entry in plan.iter().filter(|e| e.mode == FailureMode::Corruption) {
            if let Gate::Fire = self.gate(entry, event) {
                return corruption::apply(&entry.flag, result);
            }
        }
        result
    }

    pub(crate) async fn cleanup_after_error(&self) {
        denylist::clear();
        diskspace::clear().await;
    }
}

/// A handler wrapped with the failure pipeline.
pub struct ChaosWrapper<H> {
    handler: H,
    pipeline: Pipeline,
}

impl<H: Handler> ChaosWrapper<H> {
    /// Runs one invocation through the pipeline.
    #[instrument(skip_all)]
    pub async fn invoke(
        &self,
        event: Value,
        context: InvocationContext,
    ) -> Result<Value, ChaosError> {
        if self.pipeline.kill_switch_engaged() {
            debug!("kill switch engaged, invoking handler unchanged");
            return self
                .handler
                .invoke(event, context)
                .await
                .map_err(ChaosError::Handler);
        }

        let outcome = self.run(event, context).await;
        if let Err(e) = &outcome {
            telemetry::error(
                Action::Error,
                json!({
                    "message": "invocation failed",
                    "cause": e.to_string(),
                    "injected": e.is_injected(),
                }),
            );
            self.pipeline.cleanup_after_error().await;
        }
        outcome
    }

    async fn run(&self, event: Value, context: InvocationContext) -> Result<Value, ChaosError> {
        let configuration = self.pipeline.load_configuration().await;
        let plan = resolve_failures(&configuration);

        match self.pipeline.run_pre_phase(&plan, &event, &context).await? {
            PreOutcome::ShortCircuit(response) => return Ok(response),
            PreOutcome::Continue => {}
        }

        let result = self
            .handler
            .invoke(event.clone(), context)
            .await
            .map_err(ChaosError::Handler)?;

        Ok(self.pipeline.apply_post_phase(&plan, &event, result))
    }
}

impl<H> fmt::Debug for ChaosWrapper<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChaosWrapper").finish_non_exhaustive()
    }
}

/// Wraps a handler with the failure pipeline.
pub fn wrap<H: Handler>(handler: H, options: WrapOptions) -> ChaosWrapper<H> {
    ChaosWrapper {
        handler,
        pipeline: Pipeline::new(options),
    }
}
