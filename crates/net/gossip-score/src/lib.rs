//! Peer scoring for the GossipSub overlay.
//!
//! - [`PeerScoreConfig`] holds per-topic scoring parameters, resolved by
//!   exact topic, then the most specific glob pattern, then the `agi.*`
//!   fallback.
//! - [`build_gossipsub_score_params`] and [`build_gossipsub_routing_config`]
//!   project that config into what the gossip engine consumes.
//! - [`PeerScoreRegistry`] normalises score snapshots reported by the engine,
//!   keeps a sliding window of them and summarises them for dashboards.

mod bucket;
mod config;
mod glob;
mod inspector;
mod params;
mod registry;
mod routing;
mod snapshot;
mod topics;

pub use bucket::{ScoreBucket, ScoreThresholds, bucket_peer};
pub use config::{PeerScoreConfig, PeerScoreOptions, ThresholdOverrides, build_peer_score_config};
pub use inspector::{PeerScoreInspector, ScoreInspectFn};
pub use params::{GlobalScoreParams, GossipsubScoreParams, build_gossipsub_score_params};
pub use registry::{
    PeerScoreRegistry, PeerScoreSummary, RegistryConfig, ScoredPeer, SummaryOptions,
};
pub use routing::{GossipParams, GossipsubRoutingConfig, MeshParams, build_gossipsub_routing_config};
pub use snapshot::{PeerScoreEntry, PeerScoreSnapshot, RawPeer, RawPeerScore, RawScoreSnapshot};
pub use topics::{
    DEFAULT_TOPICS, FALLBACK_PATTERN, TopicScoreOverride, TopicScoreParams, default_topic_params,
};
