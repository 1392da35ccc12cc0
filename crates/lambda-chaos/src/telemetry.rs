//! # Structured log records
//!
//! Every record is one JSON object with a fixed envelope (`source`, `level`,
//! `action`) and a mode-specific payload, emitted as a tracing event at the
//! corresponding level. Under a line-oriented subscriber this yields one
//! JSON line per record.

use serde_json::{Map, Value};

pub(crate) const LOG_SOURCE: &str = "lambda-chaos";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    Config,
    Inject,
    Block,
    Dryrun,
    Error,
    Clear,
}

impl Action {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Action::Config => "config",
            Action::Inject => "inject",
            Action::Block => "block",
            Action::Dryrun => "dryrun",
            Action::Error => "error",
            Action::Clear => "clear",
        }
    }
}

pub(crate) fn info(action: Action, payload: Value) {
    tracing::info!(target: "lambda_chaos", "{}", render("info", action, payload));
}

pub(crate) fn warn(action: Action, payload: Value) {
    tracing::warn!(target: "lambda_chaos", "{}", render("warn", action, payload));
}

pub(crate) fn error(action: Action, payload: Value) {
    tracing::error!(target: "lambda_chaos", "{}", render("error", action, payload));
}

fn render(level: &'static str, action: Action, payload: Value) -> String {
    let mut record = Map::new();
    record.insert("source".to_string(), Value::String(LOG_SOURCE.to_string()));
    record.insert("level".to_string(), Value::String(level.to_string()));
    record.insert(
        "action".to_string(),
        Value::String(action.as_str().to_string()),
    );
    if let Value::Object(fields) = payload {
        record.extend(fields);
    }
    Value::Object(record).to_string()
}
