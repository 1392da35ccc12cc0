use crate::config::model::{CANONICAL_ORDER, Configuration, ResolvedFailure};

/// Filters the configuration to enabled flags and emits the execution plan
/// in canonical order, with percentages clamped to [0, 100].
pub fn resolve_failures(configuration: &Configuration) -> Vec<ResolvedFailure> {
    CANONICAL_ORDER
        .iter()
        .filter_map(|mode| {
            configuration
                .get(*mode)
                .filter(|flag| flag.enabled)
                .map(|flag| ResolvedFailure {
                    mode: *mode,
                    percentage: flag.percentage.clamp(0, 100) as u8,
                    flag: flag.clone(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{FailureFlag, FailureMode, FailurePayload};

    fn flag(payload: FailurePayload, enabled: bool, percentage: i64) -> FailureFlag {
        FailureFlag {
            enabled,
            percentage,
            conditions: Vec::new(),
            payload,
        }
    }

    #[test]
    fn test_canonical_order_is_independent_of_insertion_order() {
        let mut configuration = Configuration::default();
        configuration.insert(flag(
            FailurePayload::Corruption { body: None },
            true,
            100,
        ));
        configuration.insert(flag(
            FailurePayload::Exception {
                exception_msg: None,
            },
            true,
            100,
        ));
        configuration.insert(flag(FailurePayload::StatusCode { status_code: 503 }, true, 100));
        configuration.insert(flag(
            FailurePayload::Latency {
                min_latency_ms: 1,
                max_latency_ms: 2,
            },
            true,
            100,
        ));

        let plan = resolve_failures(&configuration);
        let modes: Vec<FailureMode> = plan.iter().map(|entry| entry.mode).collect();
        assert_eq!(
            modes,
            vec![
                FailureMode::Latency,
                FailureMode::StatusCode,
                FailureMode::Exception,
                FailureMode::Corruption,
            ]
        );
    }

    #[test]
    fn test_disabled_flags_are_filtered() {
        let mut configuration = Configuration::default();
        configuration.insert(flag(
            FailurePayload::Timeout {
                timeout_buffer_ms: 100,
            },
            false,
            100,
        ));
        assert!(resolve_failures(&configuration).is_empty());
    }

    #[test]
    fn test_percentage_is_clamped() {
        let mut configuration = Configuration::default();
        configuration.insert(flag(
            FailurePayload::Exception {
                exception_msg: None,
            },
            true,
            250,
        ));
        configuration.insert(flag(
            FailurePayload::Latency {
                min_latency_ms: 0,
                max_latency_ms: 0,
            },
            true,
            -10,
        ));

        let plan = resolve_failures(&configuration);
        assert_eq!(plan[0].percentage, 0);
        assert_eq!(plan[1].percentage, 100);
    }
}
