use agi_net_config::PubsubSettings;
use serde::Serialize;
use tracing::warn;

use crate::config::PeerScoreConfig;
use crate::inspector::ScoreInspectFn;
use crate::params::{GossipsubScoreParams, build_gossipsub_score_params};

/// Mesh degree parameters (`D`, `Dlo`, `Dhi`, `Dout`, `Dlazy`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshParams {
    pub d: usize,
    pub d_lo: usize,
    pub d_hi: usize,
    pub d_out: usize,
    pub d_lazy: usize,
}

impl MeshParams {
    /// Enforce `d_lo <= d <= d_hi`, `d_out < d_lo` and `d_out <= d / 2`.
    fn normalised(self) -> Self {
        let d_lo = self.d_lo.min(self.d);
        let d_hi = self.d_hi.max(self.d);
        let d_out = self.d_out.min(d_lo.saturating_sub(1)).min(self.d / 2);
        Self {
            d_lo,
            d_hi,
            d_out,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GossipParams {
    pub fanout_ttl_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub gossip_factor: f64,
    pub gossip_retransmission: usize,
    pub opportunistic_graft_peers: usize,
    pub opportunistic_graft_ticks: u64,
    pub opportunistic_graft_threshold: f64,
}

/// Everything the gossip router needs, assembled from settings and score config.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GossipsubRoutingConfig {
    pub mesh: MeshParams,
    pub gossip: GossipParams,
    pub flood_publish: bool,
    pub peer_exchange: bool,
    pub allow_publish_to_zero_peers: bool,
    pub direct_connect_ticks: u64,
    pub score_params: GossipsubScoreParams,
    #[serde(skip)]
    pub score_inspector: Option<ScoreInspectFn>,
}

impl std::fmt::Debug for GossipsubRoutingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GossipsubRoutingConfig")
            .field("mesh", &self.mesh)
            .field("gossip", &self.gossip)
            .field("flood_publish", &self.flood_publish)
            .field("peer_exchange", &self.peer_exchange)
            .field("allow_publish_to_zero_peers", &self.allow_publish_to_zero_peers)
            .field("direct_connect_ticks", &self.direct_connect_ticks)
            .field("score_params", &self.score_params)
            .field("score_inspector", &self.score_inspector.is_some())
            .finish()
    }
}

pub fn build_gossipsub_routing_config(
    settings: &PubsubSettings,
    score: &PeerScoreConfig,
    inspector: Option<ScoreInspectFn>,
) -> GossipsubRoutingConfig {
    let configured = MeshParams {
        d: settings.d,
        d_lo: settings.d_low,
        d_hi: settings.d_high,
        d_out: settings.d_out,
        d_lazy: settings.d_lazy,
    };
    let mesh = configured.normalised();
    if mesh != configured {
        warn!(?configured, normalised = ?mesh, "Adjusted inconsistent gossip mesh parameters");
    }

    GossipsubRoutingConfig {
        mesh,
        gossip: GossipParams {
            fanout_ttl_ms: settings.fanout_ttl_ms,
            heartbeat_interval_ms: settings.heartbeat_interval_ms,
            gossip_factor: settings.gossip_factor,
            gossip_retransmission: settings.gossip_retransmission,
            opportunistic_graft_peers: settings.opportunistic_graft_peers,
            opportunistic_graft_ticks: score.opportunistic_graft_ticks,
            opportunistic_graft_threshold: score.thresholds.opportunistic_graft,
        },
        flood_publish: settings.flood_publish,
        peer_exchange: settings.peer_exchange,
        allow_publish_to_zero_peers: settings.allow_publish_to_zero_peers,
        direct_connect_ticks: score.direct_connect_ticks,
        score_params: build_gossipsub_score_params(score),
        score_inspector: inspector,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::config::{PeerScoreOptions, build_peer_score_config};
    use crate::snapshot::RawScoreSnapshot;

    fn score_config(settings: &PubsubSettings) -> PeerScoreConfig {
        build_peer_score_config(&PeerScoreOptions::from_settings(settings))
    }

    #[test]
    fn test_defaults_pass_through() {
        let settings = PubsubSettings::default();
        let config = build_gossipsub_routing_config(&settings, &score_config(&settings), None);

        assert_eq!(
            config.mesh,
            MeshParams {
                d: 8,
                d_lo: 6,
                d_hi: 12,
                d_out: 2,
                d_lazy: 8
            }
        );
        assert_eq!(config.gossip.heartbeat_interval_ms, 700);
        assert_eq!(config.gossip.opportunistic_graft_ticks, 60);
        assert!(config.flood_publish);
        assert!(!config.allow_publish_to_zero_peers);
        assert_eq!(config.direct_connect_ticks, 300);
        assert!(config.score_inspector.is_none());
    }

    #[test]
    fn test_mesh_is_normalised() {
        let settings = PubsubSettings {
            d: 4,
            d_low: 6,
            d_high: 3,
            d_out: 5,
            ..Default::default()
        };
        let config = build_gossipsub_routing_config(&settings, &score_config(&settings), None);
        assert_eq!(config.mesh.d_lo, 4);
        assert_eq!(config.mesh.d_hi, 4);
        assert_eq!(config.mesh.d_out, 2);
    }

    #[test]
    fn test_inspector_is_carried_but_not_serialised() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let inspector: ScoreInspectFn = Arc::new(move |_snapshot: RawScoreSnapshot| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        let settings = PubsubSettings::default();
        let config =
            build_gossipsub_routing_config(&settings, &score_config(&settings), Some(inspector));
        let callback = config.score_inspector.clone().unwrap();
        callback(RawScoreSnapshot::default());
        assert_eq!(calls.load(Ordering::Relaxed), 1);

        let json = serde_json::to_value(&config).unwrap();
        assert!(json.get("scoreInspector").is_none());
        assert_eq!(json["mesh"]["dLo"], 6);
        assert!(format!("{config:?}").contains("score_inspector: true"));
    }
}
