//! # lambda-chaos
//!
//! Controlled, configurable failure injection for serverless function
//! invocations. Attach the wrapper to a handler, describe the active
//! failures in a declarative configuration, and every invocation is
//! observed or perturbed accordingly.
//!
//! ## Core Features
//!
//! - **Failure modes**
//!     - **latency:** sleep a uniformly drawn delay before the handler runs.
//!     - **timeout:** sleep toward the invocation deadline to trip the
//!       platform timeout.
//!     - **exception:** fail the invocation with a configured message.
//!     - **statuscode:** return a substituted HTTP response without calling
//!       the handler.
//!     - **diskspace:** fill `/tmp` with a zero-filled file of configured
//!       size.
//!     - **denylist:** make name resolution fail for matching hostnames.
//!     - **corruption:** corrupt the response body after the handler ran.
//!
//! - **Configuration backends**
//!     - A hosted configuration extension reachable over local HTTP, or a
//!       parameter-store entry holding the JSON document. Results are cached
//!       per container with a configurable TTL.
//!
//! - **Gating**
//!     - Each flag carries a probability percentage and an optional list of
//!       match conditions over the invocation event (`eq`, `exists`,
//!       `startsWith`, `regex`). Deny patterns and match regexes are screened
//!       against catastrophic backtracking before use.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lambda_chaos::{FnHandler, InvocationContext, WrapOptions, wrap};
//! use serde_json::{Value, json};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let handler = FnHandler(|_event: Value, _context: InvocationContext| async move {
//!         Ok::<Value, lambda_chaos::BoxError>(json!({"statusCode": 200, "body": "hello"}))
//!     });
//!
//!     let wrapped = wrap(handler, WrapOptions::default());
//!     let context = InvocationContext::with_remaining(Duration::from_secs(30));
//!     let result = wrapped.invoke(json!({"httpMethod": "GET"}), context).await;
//!     println!("{result:?}");
//! }
//! ```
//!
//! For middleware-style frameworks, [`ChaosMiddleware`] exposes the same
//! pipeline as `before` / `after` / `on_error` hooks.
//!
//! ## Configuration Options
//!
//! All options are read from the environment; constructor values take
//! priority when [`ChaosOptions`] is built by hand.
//!
//! | Env Variable | Meaning | Default |
//! |--------------------------------|----------------------------------------------|---------|
//! | CHAOS_SSM_PARAMETER            | parameter-store backend: parameter name      | unset   |
//! | CHAOS_APPCONFIG_APPLICATION    | hosted backend: application                  | unset   |
//! | CHAOS_APPCONFIG_ENVIRONMENT    | hosted backend: environment                  | unset   |
//! | CHAOS_APPCONFIG_PROFILE        | hosted backend: configuration profile        | unset   |
//! | CHAOS_APPCONFIG_PORT           | hosted backend: local extension port         | 2772    |
//! | CHAOS_CONFIG_TTL               | cache TTL in seconds, `0` disables caching   | 60 (hosted: 0) |
//! | CHAOS_INJECTION_DISABLED       | literal `true` disables all injection        | unset   |
//!
//! The hosted backend wins when both are configured; with neither, the
//! configuration is empty and every invocation passes through unchanged.

pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod inject;
pub mod matcher;
pub mod middleware;
pub mod orchestrator;
pub mod resolve;
mod telemetry;

pub use config::model::{
    CANONICAL_ORDER, Configuration, FailureFlag, FailureMode, FailurePayload, MatchCondition,
    MatchOperator, ResolvedFailure,
};
pub use config::parser::{FieldError, parse_flags, validate_flag_value};
pub use config::{AppConfigFetcher, ConfigFetcher, ConfigLoader, ParameterStoreFetcher, clear_cache};
pub use context::InvocationContext;
pub use error::{BoxError, ChaosError};
pub use handler::{FnHandler, Handler};
pub use inject::denylist::{ChaosDnsResolver, HostNotFound, ResolveError};
pub use middleware::{ChaosMiddleware, MiddlewareRequest};
pub use orchestrator::{ChaosWrapper, RandomRolls, RollSource, WrapOptions, wrap};

pub const ENV_SSM_PARAMETER: &str = "CHAOS_SSM_PARAMETER";
pub const ENV_APPCONFIG_APPLICATION: &str = "CHAOS_APPCONFIG_APPLICATION";
pub const ENV_APPCONFIG_ENVIRONMENT: &str = "CHAOS_APPCONFIG_ENVIRONMENT";
pub const ENV_APPCONFIG_PROFILE: &str = "CHAOS_APPCONFIG_PROFILE";
pub const ENV_APPCONFIG_PORT: &str = "CHAOS_APPCONFIG_PORT";
pub const ENV_CACHE_TTL: &str = "CHAOS_CONFIG_TTL";
pub const ENV_KILL_SWITCH: &str = "CHAOS_INJECTION_DISABLED";

pub const DEFAULT_APPCONFIG_PORT: u16 = 2772;

/// Ambient configuration identifying the backend, the cache policy, and the
/// kill switch.
#[derive(Debug, Clone)]
pub struct ChaosOptions {
    /// Parameter-store backend: the parameter holding the JSON document.
    pub ssm_parameter: Option<String>,
    /// Hosted backend: application, environment, and profile. All three are
    /// required for the backend to be selected.
    pub appconfig_application: Option<String>,
    pub appconfig_environment: Option<String>,
    pub appconfig_profile: Option<String>,
    /// Port of the local hosted-configuration extension.
    pub appconfig_port: u16,
    /// Raw cache TTL setting in seconds; kept unparsed so an invalid value
    /// can warn and fall back.
    pub cache_ttl: Option<String>,
    /// Programmatic kill switch: when true, every invocation passes through
    /// unchanged. The ambient variable is not snapshotted here; it is
    /// re-read on every invocation by [`ChaosOptions::kill_switch_engaged`].
    pub disabled: bool,
}

impl Default for ChaosOptions {
    fn default() -> Self {
        Self {
            ssm_parameter: std::env::var(ENV_SSM_PARAMETER).ok(),
            appconfig_application: std::env::var(ENV_APPCONFIG_APPLICATION).ok(),
            appconfig_environment: std::env::var(ENV_APPCONFIG_ENVIRONMENT).ok(),
            appconfig_profile: std::env::var(ENV_APPCONFIG_PROFILE).ok(),
            appconfig_port: std::env::var(ENV_APPCONFIG_PORT)
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(DEFAULT_APPCONFIG_PORT),
            cache_ttl: std::env::var(ENV_CACHE_TTL).ok(),
            disabled: false,
        }
    }
}

impl ChaosOptions {
    /// Options with no backend, no TTL override, and injection enabled.
    /// Nothing is read from the environment.
    pub fn unset() -> Self {
        Self {
            ssm_parameter: None,
            appconfig_application: None,
            appconfig_environment: None,
            appconfig_profile: None,
            appconfig_port: DEFAULT_APPCONFIG_PORT,
            cache_ttl: None,
            disabled: false,
        }
    }

    /// The kill switch is re-read on every invocation so a live function can
    /// be defused without a cold start.
    pub fn kill_switch_engaged(&self) -> bool {
        self.disabled
            || std::env::var(ENV_KILL_SWITCH)
                .map(|value| value == "true")
                .unwrap_or(false)
    }
}
