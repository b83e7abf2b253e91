use agi_metrics::names;
use serde::{Deserialize, Serialize};
use tracing::{Span, warn};

use crate::error::ResourceError;
use crate::limits::WatermarkConfig;

/// A live connection as seen by the trimmer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerConnection {
    pub peer_id: String,
    pub score: f64,
    pub connected_at_ms: u64,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub whitelisted: bool,
}

impl PeerConnection {
    fn is_protected(&self) -> bool {
        self.pinned || self.whitelisted
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrimOutcome {
    /// Surviving connections, including pinned and grace-protected ones.
    pub kept: Vec<PeerConnection>,
    /// Evicted connections, worst first.
    pub trimmed: Vec<PeerConnection>,
    /// Peers spared only because they connected within the grace period.
    pub grace_protected: Vec<String>,
}

/// Watermark-based eviction of the live connection set.
#[derive(Debug)]
pub struct ConnectionManager {
    config: WatermarkConfig,
    span: Span,
}

impl ConnectionManager {
    pub fn new(config: WatermarkConfig) -> Result<Self, ResourceError> {
        config.validate()?;
        Ok(Self {
            config,
            span: tracing::info_span!("connection_manager"),
        })
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &WatermarkConfig {
        &self.config
    }

    /// Decide which connections to close so the set shrinks towards low water.
    ///
    /// Nothing is trimmed until the set exceeds high water. Pinned and
    /// whitelisted peers and peers inside the grace period are never trimmed;
    /// the rest are evicted lowest score first, oldest first among equal scores.
    pub fn trim(&self, peers: Vec<PeerConnection>, now_ms: u64) -> TrimOutcome {
        if peers.len() as u64 <= self.config.high_water {
            return TrimOutcome {
                kept: peers,
                ..Default::default()
            };
        }

        let grace_start = now_ms.saturating_sub(self.config.grace_period_secs.saturating_mul(1000));
        let mut pinned = Vec::new();
        let mut grace = Vec::new();
        let mut candidates = Vec::new();
        for peer in peers {
            if peer.is_protected() {
                pinned.push(peer);
            } else if peer.connected_at_ms >= grace_start {
                grace.push(peer);
            } else {
                candidates.push(peer);
            }
        }

        candidates.sort_by(|a, b| {
            a.score
                .total_cmp(&b.score)
                .then_with(|| a.connected_at_ms.cmp(&b.connected_at_ms))
        });

        let protected = (pinned.len() + grace.len()) as u64;
        let target = usize::try_from(self.config.low_water.saturating_sub(protected))
            .unwrap_or(usize::MAX);
        let excess = candidates.len().saturating_sub(target);
        let survivors = candidates.split_off(excess);
        let trimmed = candidates;

        let grace_protected: Vec<String> = grace.iter().map(|p| p.peer_id.clone()).collect();
        let mut kept = pinned;
        kept.extend(grace);
        kept.extend(survivors);

        if !trimmed.is_empty() {
            metrics::counter!(names::CONNMGR_TRIM_RUNS_TOTAL).increment(1);
            metrics::counter!(names::CONNMGR_TRIMMED_TOTAL, "reason" => "watermark")
                .increment(trimmed.len() as u64);
            warn!(
                parent: &self.span,
                trimmed = ?trimmed.iter().map(|p| p.peer_id.as_str()).collect::<Vec<_>>(),
                kept = ?kept.iter().map(|p| p.peer_id.as_str()).collect::<Vec<_>>(),
                grace_protected = ?grace_protected,
                "Trimmed connections above high water"
            );
        }

        TrimOutcome {
            kept,
            trimmed,
            grace_protected,
        }
    }
}
