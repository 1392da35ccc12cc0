use crate::config::model::{FailureFlag, FailurePayload};
use crate::telemetry::{self, Action};
use rand::Rng;
use serde_json::{Map, Value, json};

const REPLACEMENT: &str = "\u{FFFD}\u{FFFD}\u{FFFD}";

// The handler result, split by whether it carries a body to corrupt.
enum ResponseShape {
    HasBody { rest: Map<String, Value>, body: Value },
    NoBody(Value),
}

fn classify(result: Value) -> ResponseShape {
    match result {
        Value::Object(mut map) => match map.remove("body") {
            Some(body) => ResponseShape::HasBody { rest: map, body },
            None => ResponseShape::NoBody(Value::Object(map)),
        },
        other => ResponseShape::NoBody(other),
    }
}

/// Applies the post-handler corruption: substitutes the configured body, or
/// mangles the original one when no substitute is configured.
pub fn apply(flag: &FailureFlag, result: Value) -> Value {
    let FailurePayload::Corruption { body } = &flag.payload else {
        return result;
    };
    match body {
        Some(replacement) => substitute(replacement, result),
        None => mangle(result),
    }
}

fn substitute(replacement: &str, result: Value) -> Value {
    match classify(result) {
        ResponseShape::HasBody { mut rest, .. } => {
            telemetry::info(
                Action::Inject,
                json!({"mode": "corruption", "kind": "substitute"}),
            );
            rest.insert("body".to_string(), Value::String(replacement.to_string()));
            Value::Object(rest)
        }
        ResponseShape::NoBody(_) => {
            telemetry::warn(
                Action::Inject,
                json!({
                    "mode": "corruption",
                    "message": "result has no body field, substituting a synthetic body",
                }),
            );
            json!({"body": replacement})
        }
    }
}

fn mangle(result: Value) -> Value {
    match classify(result) {
        ResponseShape::HasBody { mut rest, body } => match body {
            Value::String(body) => {
                telemetry::info(
                    Action::Inject,
                    json!({"mode": "corruption", "kind": "mangle"}),
                );
                rest.insert("body".to_string(), Value::String(mangle_string(&body)));
                Value::Object(rest)
            }
            other => {
                telemetry::warn(
                    Action::Inject,
                    json!({
                        "mode": "corruption",
                        "message": "cannot mangle a non-string body, returning unchanged",
                    }),
                );
                rest.insert("body".to_string(), other);
                Value::Object(rest)
            }
        },
        ResponseShape::NoBody(value) => {
            telemetry::warn(
                Action::Inject,
                json!({
                    "mode": "corruption",
                    "message": "cannot mangle a result without a body field, returning unchanged",
                }),
            );
            value
        }
    }
}

// Truncate at a random point between 30% and 80% of the character length
// and append three replacement characters.
fn mangle_string(body: &str) -> String {
    let chars: Vec<char> = body.chars().collect();
    if chars.is_empty() {
        return REPLACEMENT.to_string();
    }
    let low = chars.len() * 30 / 100;
    let high = chars.len() * 80 / 100;
    let cut = if low >= high {
        low
    } else {
        rand::rng().random_range(low..=high)
    };
    let mut out: String = chars[..cut].iter().collect();
    out.push_str(REPLACEMENT);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corruption_flag(body: Option<&str>) -> FailureFlag {
        FailureFlag {
            enabled: true,
            percentage: 100,
            conditions: Vec::new(),
            payload: FailurePayload::Corruption {
                body: body.map(str::to_string),
            },
        }
    }

    #[test]
    fn test_substitute_replaces_body_only() {
        let result = json!({"statusCode": 200, "body": "orig", "headers": {"x": "y"}});
        let corrupted = apply(&corruption_flag(Some("X")), result);
        assert_eq!(corrupted["body"], "X");
        assert_eq!(corrupted["statusCode"], 200);
        assert_eq!(corrupted["headers"]["x"], "y");
    }

    #[test]
    fn test_substitute_without_body_field_synthesizes_one() {
        let corrupted = apply(&corruption_flag(Some("X")), json!({"statusCode": 200}));
        assert_eq!(corrupted, json!({"body": "X"}));
    }

    #[test]
    fn test_mangle_truncates_and_appends_markers() {
        let body = "a".repeat(100);
        let corrupted = apply(
            &corruption_flag(None),
            json!({"statusCode": 200, "body": body}),
        );
        let mangled = corrupted["body"].as_str().unwrap();
        assert!(mangled.ends_with(REPLACEMENT));
        let kept = mangled.chars().count() - 3;
        assert!((30..=80).contains(&kept));
        assert_eq!(corrupted["statusCode"], 200);
    }

    #[test]
    fn test_mangle_non_object_returns_input() {
        let corrupted = apply(&corruption_flag(None), json!("just a string"));
        assert_eq!(corrupted, json!("just a string"));
    }

    #[test]
    fn test_mangle_non_string_body_returns_input() {
        let result = json!({"statusCode": 200, "body": {"nested": true}});
        let corrupted = apply(&corruption_flag(None), result.clone());
        assert_eq!(corrupted, result);
    }
}
