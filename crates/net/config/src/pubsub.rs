//! GossipSub mesh, gossip and scoring settings.

use serde::{Deserialize, Serialize};

use crate::parse::ConfigReader;
use crate::source::ConfigSource;

pub const PUBSUB_D: &str = "PUBSUB_D";
pub const PUBSUB_D_LOW: &str = "PUBSUB_D_LOW";
pub const PUBSUB_D_HIGH: &str = "PUBSUB_D_HIGH";
pub const PUBSUB_D_OUT: &str = "PUBSUB_D_OUT";
pub const PUBSUB_D_LAZY: &str = "PUBSUB_D_LAZY";
pub const PUBSUB_GOSSIP_FACTOR: &str = "PUBSUB_GOSSIP_FACTOR";
pub const PUBSUB_GOSSIP_RETRANSMISSION: &str = "PUBSUB_GOSSIP_RETRANSMISSION";
pub const PUBSUB_GOSSIP_FANOUT_TTL_MS: &str = "PUBSUB_GOSSIP_FANOUT_TTL_MS";
pub const PUBSUB_GOSSIP_HEARTBEAT_MS: &str = "PUBSUB_GOSSIP_HEARTBEAT_MS";
pub const PUBSUB_OPPORTUNISTIC_GRAFT_PEERS: &str = "PUBSUB_OPPORTUNISTIC_GRAFT_PEERS";
pub const PUBSUB_OPPORTUNISTIC_GRAFT_TICKS: &str = "PUBSUB_OPPORTUNISTIC_GRAFT_TICKS";
pub const PUBSUB_OPPORTUNISTIC_GRAFT_THRESHOLD: &str = "PUBSUB_OPPORTUNISTIC_GRAFT_THRESHOLD";
pub const PUBSUB_GOSSIP_THRESHOLD: &str = "PUBSUB_GOSSIP_THRESHOLD";
pub const PUBSUB_PUBLISH_THRESHOLD: &str = "PUBSUB_PUBLISH_THRESHOLD";
pub const PUBSUB_GRAYLIST_THRESHOLD: &str = "PUBSUB_GRAYLIST_THRESHOLD";
pub const PUBSUB_DISCONNECT_THRESHOLD: &str = "PUBSUB_DISCONNECT_THRESHOLD";
pub const PUBSUB_ACCEPT_PX_THRESHOLD: &str = "PUBSUB_ACCEPT_PX_THRESHOLD";
pub const PUBSUB_FLOOD_PUBLISH: &str = "PUBSUB_FLOOD_PUBLISH";
pub const PUBSUB_PEER_EXCHANGE: &str = "PUBSUB_PEER_EXCHANGE";
pub const PUBSUB_ALLOW_PUBLISH_TO_ZERO_PEERS: &str = "PUBSUB_ALLOW_PUBLISH_TO_ZERO_PEERS";
pub const PUBSUB_DECAY_INTERVAL_MS: &str = "PUBSUB_DECAY_INTERVAL_MS";
pub const PUBSUB_DECAY_TO_ZERO: &str = "PUBSUB_DECAY_TO_ZERO";
pub const PUBSUB_RETAIN_SCORE_MS: &str = "PUBSUB_RETAIN_SCORE_MS";
pub const PUBSUB_DIRECT_CONNECT_TICKS: &str = "PUBSUB_DIRECT_CONNECT_TICKS";
pub const PUBSUB_SCORE_RETENTION_MINUTES: &str = "PUBSUB_SCORE_RETENTION_MINUTES";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PubsubSettings {
    pub d: usize,
    pub d_low: usize,
    pub d_high: usize,
    pub d_out: usize,
    pub d_lazy: usize,
    pub gossip_factor: f64,
    pub gossip_retransmission: usize,
    pub fanout_ttl_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub opportunistic_graft_peers: usize,
    pub opportunistic_graft_ticks: u64,
    pub opportunistic_graft_threshold: f64,
    pub gossip_threshold: f64,
    pub publish_threshold: f64,
    pub graylist_threshold: f64,
    pub disconnect_threshold: f64,
    pub accept_px_threshold: f64,
    pub flood_publish: bool,
    pub peer_exchange: bool,
    pub allow_publish_to_zero_peers: bool,
    pub decay_interval_ms: u64,
    pub decay_to_zero: f64,
    pub retain_score_ms: u64,
    pub direct_connect_ticks: u64,
    pub score_retention_minutes: u64,
}

impl Default for PubsubSettings {
    fn default() -> Self {
        Self {
            d: 8,
            d_low: 6,
            d_high: 12,
            d_out: 2,
            d_lazy: 8,
            gossip_factor: 0.25,
            gossip_retransmission: 3,
            fanout_ttl_ms: 60_000,
            heartbeat_interval_ms: 700,
            opportunistic_graft_peers: 2,
            opportunistic_graft_ticks: 60,
            opportunistic_graft_threshold: 1.0,
            gossip_threshold: -2.0,
            publish_threshold: -4.0,
            graylist_threshold: -6.0,
            disconnect_threshold: -9.0,
            accept_px_threshold: 10.0,
            flood_publish: true,
            peer_exchange: true,
            allow_publish_to_zero_peers: false,
            decay_interval_ms: 1_000,
            decay_to_zero: 0.01,
            retain_score_ms: 3_600_000,
            direct_connect_ticks: 300,
            score_retention_minutes: 15,
        }
    }
}

impl PubsubSettings {
    pub fn from_source<S: ConfigSource + ?Sized>(source: &S) -> Self {
        let r = ConfigReader::new(source);
        let d = Self::default();
        Self {
            d: r.usize(PUBSUB_D, d.d),
            d_low: r.usize(PUBSUB_D_LOW, d.d_low),
            d_high: r.usize(PUBSUB_D_HIGH, d.d_high),
            d_out: r.usize(PUBSUB_D_OUT, d.d_out),
            d_lazy: r.usize(PUBSUB_D_LAZY, d.d_lazy),
            gossip_factor: r.f64(PUBSUB_GOSSIP_FACTOR, d.gossip_factor),
            gossip_retransmission: r.usize(PUBSUB_GOSSIP_RETRANSMISSION, d.gossip_retransmission),
            fanout_ttl_ms: r.u64(PUBSUB_GOSSIP_FANOUT_TTL_MS, d.fanout_ttl_ms),
            heartbeat_interval_ms: r.u64(PUBSUB_GOSSIP_HEARTBEAT_MS, d.heartbeat_interval_ms),
            opportunistic_graft_peers: r
                .usize(PUBSUB_OPPORTUNISTIC_GRAFT_PEERS, d.opportunistic_graft_peers),
            opportunistic_graft_ticks: r
                .u64(PUBSUB_OPPORTUNISTIC_GRAFT_TICKS, d.opportunistic_graft_ticks),
            opportunistic_graft_threshold: r.f64(
                PUBSUB_OPPORTUNISTIC_GRAFT_THRESHOLD,
                d.opportunistic_graft_threshold,
            ),
            gossip_threshold: r.f64(PUBSUB_GOSSIP_THRESHOLD, d.gossip_threshold),
            publish_threshold: r.f64(PUBSUB_PUBLISH_THRESHOLD, d.publish_threshold),
            graylist_threshold: r.f64(PUBSUB_GRAYLIST_THRESHOLD, d.graylist_threshold),
            disconnect_threshold: r.f64(PUBSUB_DISCONNECT_THRESHOLD, d.disconnect_threshold),
            accept_px_threshold: r.f64(PUBSUB_ACCEPT_PX_THRESHOLD, d.accept_px_threshold),
            flood_publish: r.bool(PUBSUB_FLOOD_PUBLISH, d.flood_publish),
            peer_exchange: r.bool(PUBSUB_PEER_EXCHANGE, d.peer_exchange),
            allow_publish_to_zero_peers: r.bool(
                PUBSUB_ALLOW_PUBLISH_TO_ZERO_PEERS,
                d.allow_publish_to_zero_peers,
            ),
            decay_interval_ms: r.u64(PUBSUB_DECAY_INTERVAL_MS, d.decay_interval_ms),
            decay_to_zero: r.f64(PUBSUB_DECAY_TO_ZERO, d.decay_to_zero),
            retain_score_ms: r.u64(PUBSUB_RETAIN_SCORE_MS, d.retain_score_ms),
            direct_connect_ticks: r.u64(PUBSUB_DIRECT_CONNECT_TICKS, d.direct_connect_ticks),
            score_retention_minutes: r
                .u64(PUBSUB_SCORE_RETENTION_MINUTES, d.score_retention_minutes),
        }
    }
}
