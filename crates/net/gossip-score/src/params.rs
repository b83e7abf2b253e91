use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use libp2p::gossipsub;
use serde::{Deserialize, Serialize};

use crate::bucket::ScoreThresholds;
use crate::config::PeerScoreConfig;
use crate::topics::TopicScoreParams;

/// Peer-level (not per-topic) scoring knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalScoreParams {
    pub topic_score_cap: f64,
    pub app_specific_weight: f64,
    pub behaviour_penalty_weight: f64,
    pub behaviour_penalty_threshold: f64,
    pub behaviour_penalty_decay: f64,
    pub ip_colocation_factor_weight: f64,
    pub ip_colocation_factor_threshold: f64,
}

impl Default for GlobalScoreParams {
    fn default() -> Self {
        Self {
            topic_score_cap: 50.0,
            app_specific_weight: 1.0,
            behaviour_penalty_weight: -10.0,
            behaviour_penalty_threshold: 6.0,
            behaviour_penalty_decay: 0.9,
            ip_colocation_factor_weight: -10.0,
            ip_colocation_factor_threshold: 3.0,
        }
    }
}

/// Numeric score parameters in the shape a GossipSub v1.1 router takes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GossipsubScoreParams {
    /// Per-topic parameters with delivery thresholds already derived.
    pub topics: BTreeMap<String, TopicScoreParams>,
    #[serde(flatten)]
    pub global: GlobalScoreParams,
    pub decay_interval_ms: u64,
    pub decay_to_zero: f64,
    pub retain_score_ms: u64,
    pub thresholds: ScoreThresholds,
}

fn project(params: TopicScoreParams) -> TopicScoreParams {
    TopicScoreParams {
        mesh_message_deliveries_threshold: params.effective_delivery_threshold(),
        ..params
    }
}

impl GossipsubScoreParams {
    /// Add `topic` with parameters resolved through the config's patterns.
    pub fn with_topic(mut self, topic: impl Into<String>, config: &PeerScoreConfig) -> Self {
        let topic = topic.into();
        let params = project(config.resolve(&topic));
        self.topics.insert(topic, params);
        self
    }

    pub fn to_libp2p_params(&self) -> gossipsub::PeerScoreParams {
        let topics: HashMap<gossipsub::TopicHash, gossipsub::TopicScoreParams> = self
            .topics
            .iter()
            .map(|(topic, p)| {
                (
                    gossipsub::TopicHash::from_raw(topic.clone()),
                    gossipsub::TopicScoreParams {
                        topic_weight: p.topic_weight,
                        time_in_mesh_weight: p.time_in_mesh_weight,
                        time_in_mesh_quantum: Duration::from_millis(p.time_in_mesh_quantum_ms),
                        time_in_mesh_cap: p.time_in_mesh_cap,
                        first_message_deliveries_weight: p.first_message_deliveries_weight,
                        first_message_deliveries_decay: p.first_message_deliveries_decay,
                        first_message_deliveries_cap: p.first_message_deliveries_cap,
                        mesh_message_deliveries_weight: p.mesh_message_deliveries_weight,
                        mesh_message_deliveries_decay: p.mesh_message_deliveries_decay,
                        mesh_message_deliveries_cap: p.mesh_message_deliveries_cap,
                        mesh_message_deliveries_threshold: p.mesh_message_deliveries_threshold,
                        mesh_message_deliveries_window: Duration::from_millis(
                            p.mesh_message_deliveries_window_ms,
                        ),
                        mesh_message_deliveries_activation: Duration::from_millis(
                            p.mesh_message_deliveries_activation_ms,
                        ),
                        mesh_failure_penalty_weight: p.mesh_failure_penalty_weight,
                        mesh_failure_penalty_decay: p.mesh_failure_penalty_decay,
                        invalid_message_deliveries_weight: p.invalid_message_deliveries_weight,
                        invalid_message_deliveries_decay: p.invalid_message_deliveries_decay,
                        ..Default::default()
                    },
                )
            })
            .collect();

        let g = &self.global;
        gossipsub::PeerScoreParams {
            topics,
            topic_score_cap: g.topic_score_cap,
            app_specific_weight: g.app_specific_weight,
            ip_colocation_factor_weight: g.ip_colocation_factor_weight,
            ip_colocation_factor_threshold: g.ip_colocation_factor_threshold,
            behaviour_penalty_weight: g.behaviour_penalty_weight,
            behaviour_penalty_threshold: g.behaviour_penalty_threshold,
            behaviour_penalty_decay: g.behaviour_penalty_decay,
            decay_interval: Duration::from_millis(self.decay_interval_ms),
            decay_to_zero: self.decay_to_zero,
            retain_score: Duration::from_millis(self.retain_score_ms),
            ..Default::default()
        }
    }

    pub fn to_libp2p_thresholds(&self) -> gossipsub::PeerScoreThresholds {
        gossipsub::PeerScoreThresholds {
            gossip_threshold: self.thresholds.gossip,
            publish_threshold: self.thresholds.publish,
            graylist_threshold: self.thresholds.graylist,
            accept_px_threshold: self.thresholds.accept_px,
            opportunistic_graft_threshold: self.thresholds.opportunistic_graft,
            ..Default::default()
        }
    }
}

/// Project every exact topic of `config` into router parameters.
///
/// Pattern-matched topics are added on demand with
/// [`GossipsubScoreParams::with_topic`].
pub fn build_gossipsub_score_params(config: &PeerScoreConfig) -> GossipsubScoreParams {
    GossipsubScoreParams {
        topics: config
            .topics()
            .map(|(topic, params)| (topic.to_owned(), project(params)))
            .collect(),
        global: config.global,
        decay_interval_ms: config.decay_interval_ms,
        decay_to_zero: config.decay_to_zero,
        retain_score_ms: config.retain_score_ms,
        thresholds: config.thresholds,
    }
}
