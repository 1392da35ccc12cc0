use super::model::{
    Configuration, DEFAULT_DISK_SPACE_MB, DEFAULT_MAX_LATENCY_MS, DEFAULT_MIN_LATENCY_MS,
    DEFAULT_PERCENTAGE, DEFAULT_STATUS_CODE, DEFAULT_TIMEOUT_BUFFER_MS, FailureFlag, FailureMode,
    FailurePayload, MatchCondition, MatchOperator,
};
use super::redos;
use crate::telemetry::{self, Action};
use serde_json::{Value, json};

/// A field-level validation failure.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    pub value: Value,
}

impl FieldError {
    fn new(field: impl Into<String>, message: impl Into<String>, value: &Value) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: value.clone(),
        }
    }
}

/// Validates one raw flag value against the rules for its mode. Returns the
/// complete list of field errors; an empty list means the flag is admissible.
pub fn validate_flag_value(mode: FailureMode, raw: &Value) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let Some(obj) = raw.as_object() else {
        return vec![FieldError::new("$", "flag value must be an object", raw)];
    };

    match obj.get("enabled") {
        Some(Value::Bool(_)) => {}
        Some(other) => errors.push(FieldError::new("enabled", "must be a boolean", other)),
        None => errors.push(FieldError::new("enabled", "is required", &Value::Null)),
    }

    if let Some(value) = obj.get("percentage")
        && !int_in_range(value, 0, 100)
    {
        errors.push(FieldError::new(
            "percentage",
            "must be an integer between 0 and 100",
            value,
        ));
    }

    if let Some(value) = obj.get("match") {
        validate_match(value, &mut errors);
    }

    match mode {
        FailureMode::Latency => {
            let min = optional_u64(obj.get("min_latency"), "min_latency", &mut errors);
            let max = optional_u64(obj.get("max_latency"), "max_latency", &mut errors);
            let effective_min = min.flatten().unwrap_or(DEFAULT_MIN_LATENCY_MS);
            let effective_max = max.flatten().unwrap_or(DEFAULT_MAX_LATENCY_MS);
            if min.is_some() && max.is_some() && effective_min > effective_max {
                errors.push(FieldError::new(
                    "min_latency",
                    "must not exceed max_latency",
                    obj.get("min_latency").unwrap_or(&Value::Null),
                ));
            }
        }
        FailureMode::Timeout => {
            optional_u64(obj.get("timeout_buffer_ms"), "timeout_buffer_ms", &mut errors);
        }
        FailureMode::Exception => {
            if let Some(value) = obj.get("exception_msg")
                && !value.is_string()
            {
                errors.push(FieldError::new("exception_msg", "must be a string", value));
            }
        }
        FailureMode::StatusCode => {
            if let Some(value) = obj.get("status_code")
                && !int_in_range(value, 100, 599)
            {
                errors.push(FieldError::new(
                    "status_code",
                    "must be an integer between 100 and 599",
                    value,
                ));
            }
        }
        FailureMode::DiskSpace => {
            if let Some(value) = obj.get("disk_space")
                && !int_in_range(value, 1, 10240)
            {
                errors.push(FieldError::new(
                    "disk_space",
                    "must be an integer between 1 and 10240 (MB)",
                    value,
                ));
            }
        }
        FailureMode::Denylist => {
            if let Some(value) = obj.get("deny_list") {
                validate_deny_list(value, &mut errors);
            }
        }
        FailureMode::Corruption => {
            if let Some(value) = obj.get("body")
                && !value.is_string()
            {
                errors.push(FieldError::new("body", "must be a string", value));
            }
        }
    }

    errors
}

fn validate_match(value: &Value, errors: &mut Vec<FieldError>) {
    let Some(list) = value.as_array() else {
        errors.push(FieldError::new("match", "must be a list", value));
        return;
    };
    for (idx, entry) in list.iter().enumerate() {
        let field = format!("match[{idx}]");
        let Some(obj) = entry.as_object() else {
            errors.push(FieldError::new(field, "must be an object", entry));
            continue;
        };
        if !obj.get("path").is_some_and(Value::is_string) {
            errors.push(FieldError::new(
                format!("{field}.path"),
                "must be a string",
                obj.get("path").unwrap_or(&Value::Null),
            ));
        }
        let operator = match obj.get("operator") {
            None => Some(MatchOperator::default()),
            Some(Value::String(name)) => {
                let parsed = MatchOperator::from_key(name);
                if parsed.is_none() {
                    errors.push(FieldError::new(
                        format!("{field}.operator"),
                        "must be one of eq, exists, startsWith, regex",
                        obj.get("operator").unwrap_or(&Value::Null),
                    ));
                }
                parsed
            }
            Some(other) => {
                errors.push(FieldError::new(
                    format!("{field}.operator"),
                    "must be a string",
                    other,
                ));
                None
            }
        };
        match obj.get("value") {
            Some(Value::String(pattern)) => {
                if operator == Some(MatchOperator::Regex)
                    && let Err(e) = redos::validate_pattern(pattern)
                {
                    errors.push(FieldError::new(
                        format!("{field}.value"),
                        e.to_string(),
                        obj.get("value").unwrap_or(&Value::Null),
                    ));
                }
            }
            Some(other) => {
                errors.push(FieldError::new(
                    format!("{field}.value"),
                    "must be a string",
                    other,
                ));
            }
            None => {
                if operator.is_some_and(|op| op != MatchOperator::Exists) {
                    errors.push(FieldError::new(
                        format!("{field}.value"),
                        "is required unless operator is exists",
                        &Value::Null,
                    ));
                }
            }
        }
    }
}

fn validate_deny_list(value: &Value, errors: &mut Vec<FieldError>) {
    let Some(list) = value.as_array() else {
        errors.push(FieldError::new("deny_list", "must be a list", value));
        return;
    };
    for (idx, entry) in list.iter().enumerate() {
        let field = format!("deny_list[{idx}]");
        match entry.as_str() {
            Some(pattern) => {
                if let Err(e) = redos::validate_pattern(pattern) {
                    errors.push(FieldError::new(field, e.to_string(), entry));
                }
            }
            None => errors.push(FieldError::new(field, "must be a string", entry)),
        }
    }
}

/// Converts the raw configuration document into the typed map. Unknown keys
/// are ignored; a flag with any validation error is dropped entirely.
pub fn parse_flags(raw: &Value) -> Configuration {
    let mut configuration = Configuration::default();
    let Some(obj) = raw.as_object() else {
        telemetry::warn(
            Action::Config,
            json!({"message": "configuration document is not an object"}),
        );
        return configuration;
    };

    if obj.contains_key("isEnabled") || obj.contains_key("failureMode") {
        telemetry::warn(
            Action::Config,
            json!({
                "message": "legacy configuration format detected; \
                 see the migration section of the README for the current layout"
            }),
        );
        return configuration;
    }

    for (key, value) in obj {
        let Some(mode) = FailureMode::from_key(key) else {
            continue;
        };
        if !value.is_object() {
            telemetry::warn(
                Action::Config,
                json!({"mode": mode.as_str(), "message": "ignoring non-object flag value"}),
            );
            continue;
        }
        let errors = validate_flag_value(mode, value);
        if !errors.is_empty() {
            for error in &errors {
                telemetry::warn(
                    Action::Config,
                    json!({
                        "mode": mode.as_str(),
                        "field": error.field,
                        "message": error.message,
                        "value": error.value,
                    }),
                );
            }
            telemetry::warn(
                Action::Config,
                json!({
                    "mode": mode.as_str(),
                    "message": format!("dropping flag with {} validation error(s)", errors.len()),
                }),
            );
            continue;
        }
        configuration.insert(build_flag(mode, value));
    }

    configuration
}

// Assumes `raw` already validated for `mode`.
fn build_flag(mode: FailureMode, raw: &Value) -> FailureFlag {
    let obj = raw.as_object().cloned().unwrap_or_default();
    let enabled = obj.get("enabled").and_then(Value::as_bool).unwrap_or(false);
    let percentage = obj
        .get("percentage")
        .and_then(Value::as_i64)
        .unwrap_or(DEFAULT_PERCENTAGE);
    let conditions = obj
        .get("match")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(build_condition).collect())
        .unwrap_or_default();

    let payload = match mode {
        FailureMode::Latency => FailurePayload::Latency {
            min_latency_ms: u64_or(&obj, "min_latency", DEFAULT_MIN_LATENCY_MS),
            max_latency_ms: u64_or(&obj, "max_latency", DEFAULT_MAX_LATENCY_MS),
        },
        FailureMode::Timeout => FailurePayload::Timeout {
            timeout_buffer_ms: u64_or(&obj, "timeout_buffer_ms", DEFAULT_TIMEOUT_BUFFER_MS),
        },
        FailureMode::Exception => FailurePayload::Exception {
            exception_msg: obj
                .get("exception_msg")
                .and_then(Value::as_str)
                .map(str::to_string),
        },
        FailureMode::StatusCode => FailurePayload::StatusCode {
            status_code: obj
                .get("status_code")
                .and_then(Value::as_u64)
                .map(|code| code as u16)
                .unwrap_or(DEFAULT_STATUS_CODE),
        },
        FailureMode::DiskSpace => FailurePayload::DiskSpace {
            disk_space_mb: u64_or(&obj, "disk_space", DEFAULT_DISK_SPACE_MB),
        },
        FailureMode::Denylist => FailurePayload::Denylist {
            deny_list: obj
                .get("deny_list")
                .and_then(Value::as_array)
                .map(|list| {
                    list.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        },
        FailureMode::Corruption => FailurePayload::Corruption {
            body: obj.get("body").and_then(Value::as_str).map(str::to_string),
        },
    };

    FailureFlag {
        enabled,
        percentage,
        conditions,
        payload,
    }
}

fn build_condition(entry: &Value) -> Option<MatchCondition> {
    let obj = entry.as_object()?;
    Some(MatchCondition {
        path: obj.get("path")?.as_str()?.to_string(),
        operator: obj
            .get("operator")
            .and_then(Value::as_str)
            .and_then(MatchOperator::from_key)
            .unwrap_or_default(),
        value: obj.get("value").and_then(Value::as_str).map(str::to_string),
    })
}

fn int_in_range(value: &Value, min: i64, max: i64) -> bool {
    value.as_i64().is_some_and(|n| n >= min && n <= max)
}

// Some(None) = present but invalid, already reported; None = absent.
fn optional_u64(
    value: Option<&Value>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<Option<u64>> {
    let value = value?;
    match value.as_u64() {
        Some(n) => Some(Some(n)),
        None => {
            errors.push(FieldError::new(
                field,
                "must be a non-negative integer",
                value,
            ));
            Some(None)
        }
    }
}

fn u64_or(obj: &serde_json::Map<String, Value>, field: &str, default: u64) -> u64 {
    obj.get(field).and_then(Value::as_u64).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_latency_flag() {
        let raw = json!({"enabled": true, "percentage": 50, "min_latency": 10, "max_latency": 20});
        assert!(validate_flag_value(FailureMode::Latency, &raw).is_empty());
        let config = parse_flags(&json!({"latency": raw}));
        let flag = config.get(FailureMode::Latency).unwrap();
        assert_eq!(flag.percentage, 50);
        assert_eq!(
            flag.payload,
            FailurePayload::Latency {
                min_latency_ms: 10,
                max_latency_ms: 20
            }
        );
    }

    #[test]
    fn test_enabled_is_required() {
        let errors = validate_flag_value(FailureMode::Exception, &json!({"exception_msg": "x"}));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "enabled");
    }

    #[test]
    fn test_invalid_flag_is_dropped() {
        let config = parse_flags(&json!({
            "exception": {"enabled": true, "percentage": 150},
            "latency": {"enabled": true, "min_latency": 5, "max_latency": 6},
        }));
        assert!(config.get(FailureMode::Exception).is_none());
        assert!(config.get(FailureMode::Latency).is_some());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let config = parse_flags(&json!({
            "latency": {"enabled": true},
            "meteorstrike": {"enabled": true},
        }));
        assert_eq!(config.len(), 1);
    }

    #[test]
    fn test_non_object_flag_skipped() {
        let config = parse_flags(&json!({"latency": "yes"}));
        assert!(config.is_empty());
    }

    #[test]
    fn test_legacy_document_returns_empty() {
        let config = parse_flags(&json!({
            "isEnabled": true,
            "failureMode": "latency",
            "rate": 1,
        }));
        assert!(config.is_empty());
    }

    #[test]
    fn test_min_latency_must_not_exceed_max() {
        let raw = json!({"enabled": true, "min_latency": 100, "max_latency": 10});
        let errors = validate_flag_value(FailureMode::Latency, &raw);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "min_latency");
    }

    #[test]
    fn test_disk_space_bounds() {
        let ok = json!({"enabled": true, "disk_space": 10240});
        assert!(validate_flag_value(FailureMode::DiskSpace, &ok).is_empty());
        let too_big = json!({"enabled": true, "disk_space": 10241});
        assert_eq!(validate_flag_value(FailureMode::DiskSpace, &too_big).len(), 1);
    }

    #[test]
    fn test_status_code_bounds() {
        let ok = json!({"enabled": true, "status_code": 599});
        assert!(validate_flag_value(FailureMode::StatusCode, &ok).is_empty());
        let bad = json!({"enabled": true, "status_code": 600});
        assert_eq!(validate_flag_value(FailureMode::StatusCode, &bad).len(), 1);
        let not_int = json!({"enabled": true, "status_code": "teapot"});
        assert_eq!(validate_flag_value(FailureMode::StatusCode, &not_int).len(), 1);
    }

    #[test]
    fn test_deny_list_pattern_screening() {
        let raw = json!({"enabled": true, "deny_list": [r"s3\..*\.amazonaws\.com", r"(a+)+"]});
        let errors = validate_flag_value(FailureMode::Denylist, &raw);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "deny_list[1]");
    }

    #[test]
    fn test_match_validation() {
        let raw = json!({"enabled": true, "match": [
            {"path": "httpMethod", "value": "GET"},
            {"path": "headers.host", "operator": "exists"},
            {"path": "body", "operator": "regex", "value": "(b+)+"},
            {"path": "stage", "operator": "near"},
        ]});
        let errors = validate_flag_value(FailureMode::Latency, &raw);
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"match[2].value"));
        assert!(fields.contains(&"match[3].operator"));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_match_must_be_list() {
        let raw = json!({"enabled": true, "match": {"path": "x"}});
        let errors = validate_flag_value(FailureMode::Latency, &raw);
        assert_eq!(errors[0].field, "match");
    }

    #[test]
    fn test_round_trip() {
        let document = json!({
            "latency": {"enabled": true, "percentage": 25, "min_latency": 1, "max_latency": 2},
            "exception": {"enabled": false, "exception_msg": "boom"},
            "denylist": {"enabled": true, "deny_list": [r"s3\..*"]},
            "corruption": {"enabled": true, "body": "X", "match": [
                {"path": "httpMethod", "operator": "eq", "value": "GET"},
            ]},
        });
        let parsed = parse_flags(&document);
        assert_eq!(parsed.len(), 4);
        let serialized = serde_json::to_value(&parsed).unwrap();
        let reparsed = parse_flags(&serialized);
        assert_eq!(parsed, reparsed);
    }
}
