//! Dotted-path predicate evaluation over the invocation event.

use crate::config::model::{MatchCondition, MatchOperator};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

static PATTERN_CACHE: Lazy<RwLock<HashMap<String, Regex>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// True when every condition holds against the event. An empty list matches.
/// A missing path segment, a non-object intermediate, or an internal error
/// all count as not-matched for that condition.
pub fn matches(event: &Value, conditions: &[MatchCondition]) -> bool {
    conditions
        .iter()
        .all(|condition| condition_holds(event, condition))
}

fn condition_holds(event: &Value, condition: &MatchCondition) -> bool {
    let Some(value) = lookup_path(event, &condition.path) else {
        return false;
    };
    match condition.operator {
        MatchOperator::Exists => !value.is_null(),
        MatchOperator::Eq => {
            !value.is_null()
                && condition.value.as_deref() == Some(string_form(value).as_str())
        }
        MatchOperator::StartsWith => condition
            .value
            .as_deref()
            .is_some_and(|prefix| string_form(value).starts_with(prefix)),
        MatchOperator::Regex => {
            let Some(pattern) = condition.value.as_deref() else {
                return false;
            };
            cached_regex(pattern).is_some_and(|re| re.is_match(&string_form(value)))
        }
    }
}

fn lookup_path<'a>(event: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = event;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn string_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn cached_regex(pattern: &str) -> Option<Regex> {
    if let Ok(cache) = PATTERN_CACHE.read()
        && let Some(re) = cache.get(pattern)
    {
        return Some(re.clone());
    }
    match Regex::new(pattern) {
        Ok(re) => {
            if let Ok(mut cache) = PATTERN_CACHE.write() {
                cache.insert(pattern.to_string(), re.clone());
            }
            Some(re)
        }
        Err(e) => {
            debug!("invalid match pattern {pattern}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn condition(path: &str, operator: MatchOperator, value: Option<&str>) -> MatchCondition {
        MatchCondition {
            path: path.to_string(),
            operator,
            value: value.map(str::to_string),
        }
    }

    fn event() -> Value {
        json!({
            "httpMethod": "POST",
            "requestContext": {"stage": "prod", "retries": 0},
            "headers": {"host": "api.example.com"},
            "nullable": null,
        })
    }

    #[test]
    fn test_empty_conditions_match() {
        assert!(matches(&event(), &[]));
    }

    #[test]
    fn test_eq() {
        assert!(matches(
            &event(),
            &[condition("httpMethod", MatchOperator::Eq, Some("POST"))]
        ));
        // Case-sensitive.
        assert!(!matches(
            &event(),
            &[condition("httpMethod", MatchOperator::Eq, Some("post"))]
        ));
        // Numbers compare through their string form.
        assert!(matches(
            &event(),
            &[condition(
                "requestContext.retries",
                MatchOperator::Eq,
                Some("0")
            )]
        ));
    }

    #[test]
    fn test_exists() {
        assert!(matches(
            &event(),
            &[condition("headers.host", MatchOperator::Exists, None)]
        ));
        // Falsy non-null values pass.
        assert!(matches(
            &event(),
            &[condition("requestContext.retries", MatchOperator::Exists, None)]
        ));
        // Present-but-null does not.
        assert!(!matches(
            &event(),
            &[condition("nullable", MatchOperator::Exists, None)]
        ));
    }

    #[test]
    fn test_starts_with() {
        assert!(matches(
            &event(),
            &[condition("headers.host", MatchOperator::StartsWith, Some("api."))]
        ));
        assert!(!matches(
            &event(),
            &[condition("headers.host", MatchOperator::StartsWith, Some("www."))]
        ));
    }

    #[test]
    fn test_regex() {
        assert!(matches(
            &event(),
            &[condition("httpMethod", MatchOperator::Regex, Some("^(GET|POST)$"))]
        ));
        // Invalid pattern counts as not-matched, never raises.
        assert!(!matches(
            &event(),
            &[condition("httpMethod", MatchOperator::Regex, Some("(unclosed"))]
        ));
    }

    #[test]
    fn test_missing_path_fails_soft() {
        assert!(!matches(
            &event(),
            &[condition("requestContext.missing", MatchOperator::Exists, None)]
        ));
        // Non-object intermediate.
        assert!(!matches(
            &event(),
            &[condition("httpMethod.inner", MatchOperator::Exists, None)]
        ));
    }

    #[test]
    fn test_conjunction() {
        let conditions = [
            condition("httpMethod", MatchOperator::Eq, Some("POST")),
            condition("requestContext.stage", MatchOperator::Eq, Some("prod")),
        ];
        assert!(matches(&event(), &conditions));

        let failing = [
            condition("httpMethod", MatchOperator::Eq, Some("POST")),
            condition("requestContext.stage", MatchOperator::Eq, Some("dev")),
        ];
        assert!(!matches(&event(), &failing));
    }
}
