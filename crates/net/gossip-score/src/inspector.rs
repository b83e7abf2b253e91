use std::sync::Arc;

use tracing::{Span, debug};
use web_time::{SystemTime, UNIX_EPOCH};

use crate::registry::PeerScoreRegistry;
use crate::snapshot::{PeerScoreSnapshot, RawScoreSnapshot};

/// Callback the gossip engine invokes with each raw score dump.
pub type ScoreInspectFn = Arc<dyn Fn(RawScoreSnapshot) + Send + Sync>;

/// Feeds engine score dumps into a [`PeerScoreRegistry`].
#[derive(Debug, Clone)]
pub struct PeerScoreInspector {
    registry: Arc<PeerScoreRegistry>,
    span: Span,
}

impl PeerScoreInspector {
    pub fn new(registry: Arc<PeerScoreRegistry>) -> Self {
        Self {
            registry,
            span: tracing::info_span!("peer_score_inspector"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn registry(&self) -> &Arc<PeerScoreRegistry> {
        &self.registry
    }

    pub fn inspect(&self, raw: RawScoreSnapshot) -> Arc<PeerScoreSnapshot> {
        self.inspect_at(raw, now_ms())
    }

    pub fn inspect_at(&self, raw: RawScoreSnapshot, now_ms: u64) -> Arc<PeerScoreSnapshot> {
        let snapshot = self.registry.record(raw, now_ms);
        let best = snapshot.peers.iter().max_by(|a, b| a.score.total_cmp(&b.score));
        let worst = snapshot.peers.iter().min_by(|a, b| a.score.total_cmp(&b.score));
        debug!(
            parent: &self.span,
            peers = snapshot.peers.len(),
            best_peer = best.map(|p| p.id.as_str()),
            best_score = best.map(|p| p.score),
            worst_peer = worst.map(|p| p.id.as_str()),
            worst_score = worst.map(|p| p.score),
            "Inspected peer scores"
        );
        snapshot
    }

    pub fn into_callback(self) -> ScoreInspectFn {
        Arc::new(move |raw| {
            self.inspect(raw);
        })
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::RawPeerScore;
    use std::collections::BTreeMap;

    #[test]
    fn test_callback_records_into_registry() {
        let registry = Arc::new(PeerScoreRegistry::default());
        let callback = PeerScoreInspector::new(registry.clone()).into_callback();

        let mut peer_scores = BTreeMap::new();
        peer_scores.insert("a".to_string(), RawPeerScore::Score(2.5));
        peer_scores.insert("b".to_string(), RawPeerScore::Score(-1.0));
        callback(RawScoreSnapshot::PeerScores {
            timestamp: None,
            peer_scores,
        });

        let latest = registry.latest().unwrap();
        assert_eq!(latest.peers.len(), 2);
        assert!(latest.timestamp > 0);
    }

    #[test]
    fn test_inspect_at_uses_reported_timestamp() {
        let inspector = PeerScoreInspector::new(Arc::new(PeerScoreRegistry::default()));
        let snapshot = inspector.inspect_at(
            RawScoreSnapshot::PeerList {
                timestamp: Some(42.0),
                peers: Vec::new(),
            },
            1_000,
        );
        assert_eq!(snapshot.timestamp, 42);
        assert_eq!(inspector.registry().history().len(), 1);
    }
}
