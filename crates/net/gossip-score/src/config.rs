use std::collections::BTreeMap;

use agi_net_config::PubsubSettings;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::bucket::ScoreThresholds;
use crate::glob::{compile_glob, is_glob};
use crate::params::GlobalScoreParams;
use crate::topics::{
    FALLBACK_PATTERN, TopicScoreOverride, TopicScoreParams, builtin_fallback,
    default_topic_params,
};

/// Partial thresholds; set fields replace the defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThresholdOverrides {
    pub gossip: Option<f64>,
    pub publish: Option<f64>,
    pub graylist: Option<f64>,
    pub disconnect: Option<f64>,
}

/// Inputs for [`build_peer_score_config`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PeerScoreOptions {
    /// Topic overrides. Keys containing `*` or `?` are glob patterns.
    pub topics: BTreeMap<String, TopicScoreOverride>,
    pub thresholds: ThresholdOverrides,
    pub global: GlobalScoreParams,
    pub accept_px_threshold: f64,
    pub opportunistic_graft_threshold: f64,
    pub decay_interval_ms: u64,
    pub decay_to_zero: f64,
    pub retain_score_ms: u64,
    pub opportunistic_graft_ticks: u64,
    pub direct_connect_ticks: u64,
}

impl Default for PeerScoreOptions {
    fn default() -> Self {
        Self::from_settings(&PubsubSettings::default())
    }
}

impl PeerScoreOptions {
    /// Options carrying the configured thresholds and decay settings, with no topic overrides.
    pub fn from_settings(settings: &PubsubSettings) -> Self {
        Self {
            topics: BTreeMap::new(),
            thresholds: ThresholdOverrides {
                gossip: Some(settings.gossip_threshold),
                publish: Some(settings.publish_threshold),
                graylist: Some(settings.graylist_threshold),
                disconnect: Some(settings.disconnect_threshold),
            },
            global: GlobalScoreParams::default(),
            accept_px_threshold: settings.accept_px_threshold,
            opportunistic_graft_threshold: settings.opportunistic_graft_threshold,
            decay_interval_ms: settings.decay_interval_ms,
            decay_to_zero: settings.decay_to_zero,
            retain_score_ms: settings.retain_score_ms,
            opportunistic_graft_ticks: settings.opportunistic_graft_ticks,
            direct_connect_ticks: settings.direct_connect_ticks,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>, params: TopicScoreOverride) -> Self {
        self.topics.insert(topic.into(), params);
        self
    }
}

#[derive(Debug, Clone)]
struct TopicPattern {
    pattern: String,
    regex: Regex,
    params: TopicScoreParams,
}

/// Exact-topic layer. Built-in topics carry a complete parameter set;
/// topics only named by an override stay sparse and are laid over the
/// best matching pattern when resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ExactLayer {
    Complete(TopicScoreParams),
    Sparse(TopicScoreOverride),
}

/// Resolved peer-score configuration with pre-compiled topic patterns.
#[derive(Debug, Clone)]
pub struct PeerScoreConfig {
    topics: BTreeMap<String, ExactLayer>,
    /// Ordered most specific first: longest pattern, then lexicographic.
    patterns: Vec<TopicPattern>,
    fallback: TopicScoreParams,
    pub thresholds: ScoreThresholds,
    pub global: GlobalScoreParams,
    pub decay_interval_ms: u64,
    pub decay_to_zero: f64,
    pub retain_score_ms: u64,
    pub opportunistic_graft_ticks: u64,
    pub direct_connect_ticks: u64,
}

impl Default for PeerScoreConfig {
    fn default() -> Self {
        build_peer_score_config(&PeerScoreOptions::default())
    }
}

impl PeerScoreConfig {
    /// Exact topics with their resolved parameters.
    pub fn topics(&self) -> impl Iterator<Item = (&str, TopicScoreParams)> {
        self.topics
            .keys()
            .map(|topic| (topic.as_str(), self.resolve(topic)))
    }

    /// Pattern strings, most specific first.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.pattern.as_str())
    }

    pub fn fallback(&self) -> &TopicScoreParams {
        &self.fallback
    }

    /// Parameters for `topic`, layered field by field: the fallback, then the
    /// most specific matching pattern, then the exact entry.
    ///
    /// Specificity is the length of the pattern string, not the size of the
    /// set it matches.
    pub fn resolve(&self, topic: &str) -> TopicScoreParams {
        let matched = self
            .patterns
            .iter()
            .find(|p| p.regex.is_match(topic))
            .map_or(self.fallback, |p| p.params);
        match self.topics.get(topic) {
            Some(ExactLayer::Complete(params)) => *params,
            Some(ExactLayer::Sparse(overrides)) => overrides.merge_onto(&matched),
            None => matched,
        }
    }
}

/// Merge overrides onto the built-in topic parameters and thresholds.
///
/// Exact overrides merge onto that topic's default entry; overrides for
/// topics without one stay sparse and layer over the matching pattern at
/// resolve time. Pattern overrides merge onto the default pattern entry or
/// the fallback. Patterns that fail to compile are skipped with a warning.
pub fn build_peer_score_config(options: &PeerScoreOptions) -> PeerScoreConfig {
    let mut topics = BTreeMap::new();
    let mut patterns = BTreeMap::new();
    for (name, params) in default_topic_params() {
        if is_glob(name) {
            patterns.insert(name.to_owned(), params);
        } else {
            topics.insert(name.to_owned(), ExactLayer::Complete(params));
        }
    }

    let fallback_base = patterns
        .get(FALLBACK_PATTERN)
        .copied()
        .unwrap_or_else(builtin_fallback);

    for (name, overrides) in &options.topics {
        if is_glob(name) {
            let base = patterns.get(name).copied().unwrap_or(fallback_base);
            patterns.insert(name.clone(), overrides.merge_onto(&base));
            continue;
        }
        let layer = match topics.get(name) {
            Some(ExactLayer::Complete(base)) => ExactLayer::Complete(overrides.merge_onto(base)),
            Some(ExactLayer::Sparse(earlier)) => ExactLayer::Sparse(overrides.layer_over(earlier)),
            None => ExactLayer::Sparse(*overrides),
        };
        topics.insert(name.clone(), layer);
    }

    let fallback = patterns
        .get(FALLBACK_PATTERN)
        .copied()
        .unwrap_or(fallback_base);

    let mut compiled: Vec<TopicPattern> = patterns
        .into_iter()
        .filter_map(|(pattern, params)| match compile_glob(&pattern) {
            Ok(regex) => Some(TopicPattern {
                pattern,
                regex,
                params,
            }),
            Err(err) => {
                warn!(%pattern, %err, "Skipping topic pattern that does not compile");
                None
            }
        })
        .collect();
    compiled.sort_by(|a, b| {
        b.pattern
            .len()
            .cmp(&a.pattern.len())
            .then_with(|| a.pattern.cmp(&b.pattern))
    });

    let defaults = ScoreThresholds::default();
    let t = &options.thresholds;
    let thresholds = ScoreThresholds {
        gossip: t.gossip.unwrap_or(defaults.gossip),
        publish: t.publish.unwrap_or(defaults.publish),
        graylist: t.graylist.unwrap_or(defaults.graylist),
        disconnect: t.disconnect.unwrap_or(defaults.disconnect),
        accept_px: options.accept_px_threshold,
        opportunistic_graft: options.opportunistic_graft_threshold,
    };

    PeerScoreConfig {
        topics,
        patterns: compiled,
        fallback,
        thresholds,
        global: options.global,
        decay_interval_ms: options.decay_interval_ms,
        decay_to_zero: options.decay_to_zero,
        retain_score_ms: options.retain_score_ms,
        opportunistic_graft_ticks: options.opportunistic_graft_ticks,
        direct_connect_ticks: options.direct_connect_ticks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weight(w: f64) -> TopicScoreOverride {
        TopicScoreOverride {
            topic_weight: Some(w),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_resolve() {
        let config = PeerScoreConfig::default();
        let defaults = default_topic_params();
        assert_eq!(config.resolve("agi.control"), defaults["agi.control"]);
        assert_eq!(config.resolve("agi.unlisted"), defaults[FALLBACK_PATTERN]);
        assert_eq!(config.resolve("other.topic"), *config.fallback());
        assert_eq!(config.thresholds, ScoreThresholds::default());
    }

    #[test]
    fn test_exact_overrides_wildcard() {
        let options = PeerScoreOptions::default()
            .with_topic("agi.jobs.*", weight(0.3))
            .with_topic("agi.jobs.gpu", weight(0.9));
        let config = build_peer_score_config(&options);

        assert_eq!(config.resolve("agi.jobs.gpu").topic_weight, 0.9);
        assert_eq!(config.resolve("agi.jobs.cpu").topic_weight, 0.3);
    }

    #[test]
    fn test_exact_layers_over_matching_pattern() {
        let options = PeerScoreOptions::default()
            .with_topic(
                "agi.jobs.*",
                TopicScoreOverride {
                    expected_message_rate: Some(42.0),
                    ..Default::default()
                },
            )
            .with_topic("agi.jobs.gpu", weight(0.9));
        let config = build_peer_score_config(&options);
        let fallback = *config.fallback();

        let gpu = config.resolve("agi.jobs.gpu");
        assert_eq!(gpu.topic_weight, 0.9);
        assert_eq!(gpu.expected_message_rate, 42.0);
        assert_eq!(
            gpu.invalid_message_deliveries_weight,
            fallback.invalid_message_deliveries_weight
        );

        let projected: BTreeMap<&str, TopicScoreParams> = config.topics().collect();
        assert_eq!(projected["agi.jobs.gpu"], gpu);
    }

    #[test]
    fn test_longer_pattern_wins() {
        let options = PeerScoreOptions::default()
            .with_topic("agi.*.gpu", weight(0.4))
            .with_topic("agi.jobs.*", weight(0.7))
            .with_topic("agi.j*", weight(0.1));
        let config = build_peer_score_config(&options);

        assert_eq!(config.resolve("agi.jobs.gpu").topic_weight, 0.7);
        assert_eq!(config.resolve("agi.x.gpu").topic_weight, 0.4);
        assert_eq!(config.resolve("agi.jx").topic_weight, 0.1);
        assert_eq!(
            config.patterns().collect::<Vec<_>>(),
            vec!["agi.jobs.*", "agi.*.gpu", "agi.j*", "agi.*"]
        );
    }

    #[test]
    fn test_equal_length_patterns_tie_break_lexicographically() {
        let options = PeerScoreOptions::default()
            .with_topic("agi.w?rk", weight(0.6))
            .with_topic("agi.?ork", weight(0.3));
        let config = build_peer_score_config(&options);
        assert_eq!(config.resolve("agi.work").topic_weight, 0.3);
    }

    #[test]
    fn test_overrides_merge_onto_base() {
        let options = PeerScoreOptions::default()
            .with_topic("agi.validation", weight(2.0))
            .with_topic("custom.topic", weight(3.0));
        let config = build_peer_score_config(&options);
        let defaults = default_topic_params();

        let validation = config.resolve("agi.validation");
        assert_eq!(validation.topic_weight, 2.0);
        assert_eq!(
            validation.expected_message_rate,
            defaults["agi.validation"].expected_message_rate
        );

        let custom = config.resolve("custom.topic");
        assert_eq!(custom.topic_weight, 3.0);
        assert_eq!(
            custom.invalid_message_deliveries_weight,
            defaults[FALLBACK_PATTERN].invalid_message_deliveries_weight
        );
    }

    #[test]
    fn test_fallback_override() {
        let options = PeerScoreOptions::default().with_topic(FALLBACK_PATTERN, weight(0.05));
        let config = build_peer_score_config(&options);
        assert_eq!(config.fallback().topic_weight, 0.05);
        assert_eq!(config.resolve("unrelated").topic_weight, 0.05);
    }

    #[test]
    fn test_threshold_overrides() {
        let options = PeerScoreOptions {
            thresholds: ThresholdOverrides {
                gossip: Some(-1.0),
                ..Default::default()
            },
            ..PeerScoreOptions::default()
        };
        let config = build_peer_score_config(&options);
        assert_eq!(config.thresholds.gossip, -1.0);
        assert_eq!(config.thresholds.disconnect, -9.0);
    }
}
