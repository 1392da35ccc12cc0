use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Default latency window applied when the configuration omits the bounds.
pub const DEFAULT_MIN_LATENCY_MS: u64 = 100;
pub const DEFAULT_MAX_LATENCY_MS: u64 = 400;
/// Default margin left before the invocation deadline by the timeout mode.
pub const DEFAULT_TIMEOUT_BUFFER_MS: u64 = 500;
pub const DEFAULT_STATUS_CODE: u16 = 500;
pub const DEFAULT_DISK_SPACE_MB: u64 = 100;
pub const DEFAULT_PERCENTAGE: i64 = 100;

/// The closed set of failure modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureMode {
    Latency,
    Timeout,
    DiskSpace,
    Denylist,
    StatusCode,
    Exception,
    Corruption,
}

/// Fixed execution order. Non-terminating perturbations run first so they
/// stay observable when a later terminator short-circuits the handler;
/// statuscode precedes exception; corruption dispatches in the post-phase.
pub const CANONICAL_ORDER: [FailureMode; 7] = [
    FailureMode::Latency,
    FailureMode::Timeout,
    FailureMode::DiskSpace,
    FailureMode::Denylist,
    FailureMode::StatusCode,
    FailureMode::Exception,
    FailureMode::Corruption,
];

impl FailureMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureMode::Latency => "latency",
            FailureMode::Timeout => "timeout",
            FailureMode::DiskSpace => "diskspace",
            FailureMode::Denylist => "denylist",
            FailureMode::StatusCode => "statuscode",
            FailureMode::Exception => "exception",
            FailureMode::Corruption => "corruption",
        }
    }

    /// Resolves a configuration key to a mode; unknown keys map to `None`.
    pub fn from_key(key: &str) -> Option<FailureMode> {
        match key {
            "latency" => Some(FailureMode::Latency),
            "timeout" => Some(FailureMode::Timeout),
            "diskspace" => Some(FailureMode::DiskSpace),
            "denylist" => Some(FailureMode::Denylist),
            "statuscode" => Some(FailureMode::StatusCode),
            "exception" => Some(FailureMode::Exception),
            "corruption" => Some(FailureMode::Corruption),
            _ => None,
        }
    }
}

impl fmt::Display for FailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchOperator {
    #[default]
    Eq,
    Exists,
    StartsWith,
    Regex,
}

impl MatchOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchOperator::Eq => "eq",
            MatchOperator::Exists => "exists",
            MatchOperator::StartsWith => "startsWith",
            MatchOperator::Regex => "regex",
        }
    }

    pub fn from_key(key: &str) -> Option<MatchOperator> {
        match key {
            "eq" => Some(MatchOperator::Eq),
            "exists" => Some(MatchOperator::Exists),
            "startsWith" => Some(MatchOperator::StartsWith),
            "regex" => Some(MatchOperator::Regex),
            _ => None,
        }
    }
}

/// One predicate over the invocation event.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCondition {
    /// Dotted path into the event document.
    pub path: String,
    pub operator: MatchOperator,
    /// Comparison operand; not required for `exists`.
    pub value: Option<String>,
}

/// Mode-specific flag payload. Each variant carries only the fields relevant
/// to its mode.
#[derive(Debug, Clone, PartialEq)]
pub enum FailurePayload {
    Latency {
        min_latency_ms: u64,
        max_latency_ms: u64,
    },
    Timeout {
        timeout_buffer_ms: u64,
    },
    Exception {
        exception_msg: Option<String>,
    },
    StatusCode {
        status_code: u16,
    },
    DiskSpace {
        disk_space_mb: u64,
    },
    Denylist {
        deny_list: Vec<String>,
    },
    Corruption {
        body: Option<String>,
    },
}

impl FailurePayload {
    pub fn mode(&self) -> FailureMode {
        match self {
            FailurePayload::Latency { .. } => FailureMode::Latency,
            FailurePayload::Timeout { .. } => FailureMode::Timeout,
            FailurePayload::Exception { .. } => FailureMode::Exception,
            FailurePayload::StatusCode { .. } => FailureMode::StatusCode,
            FailurePayload::DiskSpace { .. } => FailureMode::DiskSpace,
            FailurePayload::Denylist { .. } => FailureMode::Denylist,
            FailurePayload::Corruption { .. } => FailureMode::Corruption,
        }
    }
}

/// One validated flag: the common gate fields plus the mode payload.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureFlag {
    pub enabled: bool,
    pub percentage: i64,
    pub conditions: Vec<MatchCondition>,
    pub payload: FailurePayload,
}

impl FailureFlag {
    pub fn mode(&self) -> FailureMode {
        self.payload.mode()
    }

    fn to_wire(&self) -> Value {
        let mut fields = Map::new();
        fields.insert("enabled".to_string(), Value::Bool(self.enabled));
        fields.insert("percentage".to_string(), Value::from(self.percentage));
        match &self.payload {
            FailurePayload::Latency {
                min_latency_ms,
                max_latency_ms,
            } => {
                fields.insert("min_latency".to_string(), Value::from(*min_latency_ms));
                fields.insert("max_latency".to_string(), Value::from(*max_latency_ms));
            }
            FailurePayload::Timeout { timeout_buffer_ms } => {
                fields.insert(
                    "timeout_buffer_ms".to_string(),
                    Value::from(*timeout_buffer_ms),
                );
            }
            FailurePayload::Exception { exception_msg } => {
                if let Some(message) = exception_msg {
                    fields.insert(
                        "exception_msg".to_string(),
                        Value::String(message.clone()),
                    );
                }
            }
            FailurePayload::StatusCode { status_code } => {
                fields.insert("status_code".to_string(), Value::from(*status_code));
            }
            FailurePayload::DiskSpace { disk_space_mb } => {
                fields.insert("disk_space".to_string(), Value::from(*disk_space_mb));
            }
            FailurePayload::Denylist { deny_list } => {
                fields.insert(
                    "deny_list".to_string(),
                    Value::Array(
                        deny_list
                            .iter()
                            .map(|p| Value::String(p.clone()))
                            .collect(),
                    ),
                );
            }
            FailurePayload::Corruption { body } => {
                if let Some(body) = body {
                    fields.insert("body".to_string(), Value::String(body.clone()));
                }
            }
        }
        if !self.conditions.is_empty() {
            fields.insert(
                "match".to_string(),
                Value::Array(self.conditions.iter().map(MatchCondition::to_wire).collect()),
            );
        }
        Value::Object(fields)
    }
}

impl Serialize for FailureFlag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

impl MatchCondition {
    fn to_wire(&self) -> Value {
        let mut fields = Map::new();
        fields.insert("path".to_string(), Value::String(self.path.clone()));
        fields.insert(
            "operator".to_string(),
            Value::String(self.operator.as_str().to_string()),
        );
        if let Some(value) = &self.value {
            fields.insert("value".to_string(), Value::String(value.clone()));
        }
        Value::Object(fields)
    }
}

/// The typed configuration: at most one flag per mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Configuration {
    flags: HashMap<FailureMode, FailureFlag>,
}

impl Configuration {
    pub fn insert(&mut self, flag: FailureFlag) {
        self.flags.insert(flag.mode(), flag);
    }

    pub fn get(&self, mode: FailureMode) -> Option<&FailureFlag> {
        self.flags.get(&mode)
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Names of the enabled modes, in canonical order.
    pub fn enabled_modes(&self) -> Vec<&'static str> {
        CANONICAL_ORDER
            .iter()
            .filter(|mode| self.flags.get(mode).is_some_and(|f| f.enabled))
            .map(|mode| mode.as_str())
            .collect()
    }
}

impl Serialize for Configuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.flags.len()))?;
        for mode in CANONICAL_ORDER {
            if let Some(flag) = self.flags.get(&mode) {
                map.serialize_entry(mode.as_str(), flag)?;
            }
        }
        map.end()
    }
}

/// One entry of the resolved execution plan.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFailure {
    pub mode: FailureMode,
    /// Clamped to [0, 100].
    pub percentage: u8,
    pub flag: FailureFlag,
}
