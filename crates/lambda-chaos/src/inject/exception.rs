use crate::config::model::{FailureFlag, FailurePayload};
use crate::error::ChaosError;
use crate::telemetry::{self, Action};
use serde_json::json;

pub const DEFAULT_MESSAGE: &str = "Injected exception";

/// Builds the intentional failure carried by the exception mode.
pub fn raise(flag: &FailureFlag) -> ChaosError {
    let message = match &flag.payload {
        FailurePayload::Exception {
            exception_msg: Some(message),
        } => message.clone(),
        _ => DEFAULT_MESSAGE.to_string(),
    };
    telemetry::info(Action::Inject, json!({"mode": "exception", "message": message}));
    ChaosError::Injected(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exception_flag(message: Option<&str>) -> FailureFlag {
        FailureFlag {
            enabled: true,
            percentage: 100,
            conditions: Vec::new(),
            payload: FailurePayload::Exception {
                exception_msg: message.map(str::to_string),
            },
        }
    }

    #[test]
    fn test_configured_message() {
        let error = raise(&exception_flag(Some("Boom")));
        assert_eq!(error.to_string(), "Boom");
        assert!(error.is_injected());
    }

    #[test]
    fn test_default_message() {
        let error = raise(&exception_flag(None));
        assert_eq!(error.to_string(), DEFAULT_MESSAGE);
    }
}
