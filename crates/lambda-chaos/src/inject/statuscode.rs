use crate::config::model::{DEFAULT_STATUS_CODE, FailureFlag, FailurePayload};
use crate::telemetry::{self, Action};
use serde_json::{Value, json};

/// Builds the substituted HTTP response for the statuscode mode. The
/// orchestrator returns it without calling the handler.
pub fn respond(flag: &FailureFlag) -> Value {
    let status_code = match &flag.payload {
        FailurePayload::StatusCode { status_code } => *status_code,
        _ => DEFAULT_STATUS_CODE,
    };
    telemetry::info(
        Action::Inject,
        json!({"mode": "statuscode", "status_code": status_code}),
    );
    json!({
        "statusCode": status_code,
        "headers": {"Content-Type": "application/json"},
        "body": json!({"message": format!("injected status code {status_code}")}).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statuscode_flag(status_code: u16) -> FailureFlag {
        FailureFlag {
            enabled: true,
            percentage: 100,
            conditions: Vec::new(),
            payload: FailurePayload::StatusCode { status_code },
        }
    }

    #[test]
    fn test_response_shape() {
        let response = respond(&statuscode_flag(418));
        assert_eq!(response["statusCode"], 418);
        assert_eq!(response["headers"]["Content-Type"], "application/json");
        let body: Value =
            serde_json::from_str(response["body"].as_str().unwrap()).unwrap();
        assert_eq!(body["message"], "injected status code 418");
    }
}
