use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Pattern whose parameters apply to any topic without a better match.
pub const FALLBACK_PATTERN: &str = "agi.*";

/// Topics with built-in scoring parameters.
pub const DEFAULT_TOPICS: [&str; 5] = [
    "agi.jobs",
    "agi.results",
    "agi.validation",
    "agi.control",
    "agi.telemetry",
];

/// Scoring parameters for one topic.
///
/// A `mesh_message_deliveries_threshold` of `0` means "derive from the
/// expected message rate", see [`TopicScoreParams::effective_delivery_threshold`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicScoreParams {
    pub topic_weight: f64,
    /// Expected messages per second on the topic.
    pub expected_message_rate: f64,
    pub invalid_message_deliveries_weight: f64,
    pub invalid_message_deliveries_decay: f64,
    pub time_in_mesh_weight: f64,
    pub time_in_mesh_quantum_ms: u64,
    pub time_in_mesh_cap: f64,
    pub first_message_deliveries_weight: f64,
    pub first_message_deliveries_decay: f64,
    pub first_message_deliveries_cap: f64,
    pub mesh_message_deliveries_weight: f64,
    pub mesh_message_deliveries_decay: f64,
    pub mesh_message_deliveries_cap: f64,
    pub mesh_message_deliveries_threshold: f64,
    pub mesh_message_deliveries_window_ms: u64,
    pub mesh_message_deliveries_activation_ms: u64,
    pub mesh_failure_penalty_weight: f64,
    pub mesh_failure_penalty_decay: f64,
}

impl TopicScoreParams {
    const fn base(topic_weight: f64, expected_message_rate: f64, invalid_weight: f64) -> Self {
        Self {
            topic_weight,
            expected_message_rate,
            invalid_message_deliveries_weight: invalid_weight,
            invalid_message_deliveries_decay: 0.3,
            time_in_mesh_weight: 0.0324,
            time_in_mesh_quantum_ms: 12_000,
            time_in_mesh_cap: 300.0,
            first_message_deliveries_weight: 1.0,
            first_message_deliveries_decay: 0.9,
            first_message_deliveries_cap: 100.0,
            mesh_message_deliveries_weight: -1.0,
            mesh_message_deliveries_decay: 0.97,
            mesh_message_deliveries_cap: 100.0,
            mesh_message_deliveries_threshold: 0.0,
            mesh_message_deliveries_window_ms: 2_000,
            mesh_message_deliveries_activation_ms: 60_000,
            mesh_failure_penalty_weight: -1.0,
            mesh_failure_penalty_decay: 0.97,
        }
    }

    /// Configured threshold, or `expected_message_rate × window` when unset,
    /// never above the delivery cap.
    pub fn effective_delivery_threshold(&self) -> f64 {
        let threshold = if self.mesh_message_deliveries_threshold > 0.0 {
            self.mesh_message_deliveries_threshold
        } else {
            self.expected_message_rate * self.mesh_message_deliveries_window_ms as f64 / 1000.0
        };
        threshold.min(self.mesh_message_deliveries_cap).max(0.0)
    }
}

/// Built-in parameters: the five named topics plus the [`FALLBACK_PATTERN`] entry.
pub fn default_topic_params() -> BTreeMap<&'static str, TopicScoreParams> {
    BTreeMap::from([
        ("agi.jobs", TopicScoreParams::base(0.5, 5.0, -20.0)),
        ("agi.results", TopicScoreParams::base(0.5, 5.0, -20.0)),
        ("agi.validation", TopicScoreParams::base(0.8, 10.0, -40.0)),
        ("agi.control", TopicScoreParams::base(1.0, 1.0, -50.0)),
        ("agi.telemetry", TopicScoreParams::base(0.1, 20.0, -5.0)),
        (FALLBACK_PATTERN, builtin_fallback()),
    ])
}

pub(crate) fn builtin_fallback() -> TopicScoreParams {
    TopicScoreParams::base(0.2, 1.0, -10.0)
}

/// Partial [`TopicScoreParams`]; set fields replace the base value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopicScoreOverride {
    pub topic_weight: Option<f64>,
    pub expected_message_rate: Option<f64>,
    pub invalid_message_deliveries_weight: Option<f64>,
    pub invalid_message_deliveries_decay: Option<f64>,
    pub time_in_mesh_weight: Option<f64>,
    pub time_in_mesh_quantum_ms: Option<u64>,
    pub time_in_mesh_cap: Option<f64>,
    pub first_message_deliveries_weight: Option<f64>,
    pub first_message_deliveries_decay: Option<f64>,
    pub first_message_deliveries_cap: Option<f64>,
    pub mesh_message_deliveries_weight: Option<f64>,
    pub mesh_message_deliveries_decay: Option<f64>,
    pub mesh_message_deliveries_cap: Option<f64>,
    pub mesh_message_deliveries_threshold: Option<f64>,
    pub mesh_message_deliveries_window_ms: Option<u64>,
    pub mesh_message_deliveries_activation_ms: Option<u64>,
    pub mesh_failure_penalty_weight: Option<f64>,
    pub mesh_failure_penalty_decay: Option<f64>,
}

impl TopicScoreOverride {
    /// Combine two partial layers; fields set on `self` win.
    pub fn layer_over(&self, base: &TopicScoreOverride) -> TopicScoreOverride {
        macro_rules! pick {
            ($($field:ident),+ $(,)?) => {
                TopicScoreOverride {
                    $($field: self.$field.or(base.$field),)+
                }
            };
        }
        pick!(
            topic_weight,
            expected_message_rate,
            invalid_message_deliveries_weight,
            invalid_message_deliveries_decay,
            time_in_mesh_weight,
            time_in_mesh_quantum_ms,
            time_in_mesh_cap,
            first_message_deliveries_weight,
            first_message_deliveries_decay,
            first_message_deliveries_cap,
            mesh_message_deliveries_weight,
            mesh_message_deliveries_decay,
            mesh_message_deliveries_cap,
            mesh_message_deliveries_threshold,
            mesh_message_deliveries_window_ms,
            mesh_message_deliveries_activation_ms,
            mesh_failure_penalty_weight,
            mesh_failure_penalty_decay,
        )
    }

    pub fn merge_onto(&self, base: &TopicScoreParams) -> TopicScoreParams {
        macro_rules! pick {
            ($($field:ident),+ $(,)?) => {
                TopicScoreParams {
                    $($field: self.$field.unwrap_or(base.$field),)+
                }
            };
        }
        pick!(
            topic_weight,
            expected_message_rate,
            invalid_message_deliveries_weight,
            invalid_message_deliveries_decay,
            time_in_mesh_weight,
            time_in_mesh_quantum_ms,
            time_in_mesh_cap,
            first_message_deliveries_weight,
            first_message_deliveries_decay,
            first_message_deliveries_cap,
            mesh_message_deliveries_weight,
            mesh_message_deliveries_decay,
            mesh_message_deliveries_cap,
            mesh_message_deliveries_threshold,
            mesh_message_deliveries_window_ms,
            mesh_message_deliveries_activation_ms,
            mesh_failure_penalty_weight,
            mesh_failure_penalty_decay,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_named_topics_and_fallback() {
        let defaults = default_topic_params();
        for topic in DEFAULT_TOPICS {
            assert!(defaults.contains_key(topic), "{topic}");
        }
        assert_eq!(defaults[FALLBACK_PATTERN], builtin_fallback());
        assert_eq!(defaults.len(), 6);
    }

    #[test]
    fn test_override_replaces_only_set_fields() {
        let base = default_topic_params()["agi.jobs"];
        let merged = TopicScoreOverride {
            topic_weight: Some(2.0),
            mesh_message_deliveries_threshold: Some(3.0),
            ..Default::default()
        }
        .merge_onto(&base);

        assert_eq!(merged.topic_weight, 2.0);
        assert_eq!(merged.mesh_message_deliveries_threshold, 3.0);
        assert_eq!(merged.expected_message_rate, base.expected_message_rate);
        assert_eq!(
            merged.invalid_message_deliveries_weight,
            base.invalid_message_deliveries_weight
        );
    }

    #[test]
    fn test_delivery_threshold_synthesis() {
        let params = default_topic_params()["agi.validation"];
        // 10 msg/s over a 2 s window.
        assert_eq!(params.effective_delivery_threshold(), 20.0);

        let capped = TopicScoreParams {
            expected_message_rate: 1_000.0,
            ..params
        };
        assert_eq!(
            capped.effective_delivery_threshold(),
            capped.mesh_message_deliveries_cap
        );

        let explicit = TopicScoreParams {
            mesh_message_deliveries_threshold: 4.0,
            ..params
        };
        assert_eq!(explicit.effective_delivery_threshold(), 4.0);
    }
}
