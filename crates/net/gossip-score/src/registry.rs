use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;

use agi_metrics::names;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tokio::sync::broadcast;
use tracing::{Span, debug};

use crate::bucket::{ScoreBucket, ScoreThresholds, bucket_peer};
use crate::snapshot::{PeerScoreSnapshot, RawScoreSnapshot};

const DEFAULT_CHANNEL_CAPACITY: usize = 64;
const DEFAULT_MAX_SNAPSHOTS: usize = 1024;
const OTHER_TOPIC_LABEL: &str = "other";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryConfig {
    pub retention_minutes: u64,
    pub thresholds: ScoreThresholds,
    /// Topics reported individually in metrics; the rest are summed under `other`.
    pub metric_topics: BTreeSet<String>,
    pub channel_capacity: usize,
    /// Hard cap on retained snapshots, applied after the age cutoff.
    pub max_snapshots: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            retention_minutes: 15,
            thresholds: ScoreThresholds::default(),
            metric_topics: BTreeSet::new(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_snapshots: DEFAULT_MAX_SNAPSHOTS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryOptions {
    /// Maximum peers in each top list.
    pub limit: usize,
    /// Bucket with these instead of the registry's thresholds.
    pub thresholds: Option<ScoreThresholds>,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            thresholds: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredPeer {
    pub id: String,
    pub score: f64,
    pub bucket: ScoreBucket,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerScoreSummary {
    /// Timestamp of the latest snapshot, if any.
    pub timestamp: Option<u64>,
    pub peer_count: usize,
    pub snapshots_retained: usize,
    /// Highest scores first.
    pub top_positive: Vec<ScoredPeer>,
    /// Lowest scores first.
    pub top_negative: Vec<ScoredPeer>,
    /// Every bucket, including empty ones.
    pub buckets: BTreeMap<ScoreBucket, usize>,
}

/// Sliding window of normalised peer score snapshots.
///
/// Each recorded snapshot is broadcast to subscribers; dropping a receiver
/// unsubscribes it.
#[derive(Debug)]
pub struct PeerScoreRegistry {
    config: RegistryConfig,
    history: RwLock<VecDeque<Arc<PeerScoreSnapshot>>>,
    tx: broadcast::Sender<Arc<PeerScoreSnapshot>>,
    span: Span,
}

impl Default for PeerScoreRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl PeerScoreRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        let (tx, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            config,
            history: RwLock::new(VecDeque::new()),
            tx,
            span: tracing::info_span!("peer_score_registry"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Normalise and store `raw`, evicting snapshots older than the retention window.
    pub fn record(&self, raw: RawScoreSnapshot, now_ms: u64) -> Arc<PeerScoreSnapshot> {
        let snapshot = Arc::new(raw.normalize(now_ms));
        let cutoff = now_ms.saturating_sub(self.config.retention_minutes.saturating_mul(60_000));

        let retained = {
            let mut history = self.history.write();
            history.push_back(snapshot.clone());
            // Timestamps are caller supplied and need not be monotonic. The
            // newest snapshot always stays, whatever its timestamp.
            history.retain(|s| Arc::ptr_eq(s, &snapshot) || s.timestamp >= cutoff);
            let excess = history.len().saturating_sub(self.config.max_snapshots.max(1));
            history.drain(..excess);
            history.len()
        };

        self.report(&snapshot);
        let _ = self.tx.send(snapshot.clone());
        debug!(
            parent: &self.span,
            peers = snapshot.peers.len(),
            retained,
            "Recorded peer score snapshot"
        );
        snapshot
    }

    pub fn latest(&self) -> Option<Arc<PeerScoreSnapshot>> {
        self.history.read().back().cloned()
    }

    /// Retained snapshots, oldest first.
    pub fn history(&self) -> Vec<Arc<PeerScoreSnapshot>> {
        self.history.read().iter().cloned().collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PeerScoreSnapshot>> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Top peers and a bucket histogram over the latest snapshot.
    pub fn summarize(&self, options: SummaryOptions) -> PeerScoreSummary {
        let thresholds = options.thresholds.unwrap_or(self.config.thresholds);
        let (latest, retained) = {
            let history = self.history.read();
            (history.back().cloned(), history.len())
        };

        let mut buckets: BTreeMap<ScoreBucket, usize> =
            ScoreBucket::iter().map(|bucket| (bucket, 0)).collect();
        let Some(latest) = latest else {
            return PeerScoreSummary {
                timestamp: None,
                peer_count: 0,
                snapshots_retained: retained,
                top_positive: Vec::new(),
                top_negative: Vec::new(),
                buckets,
            };
        };

        let mut scored: Vec<ScoredPeer> = latest
            .peers
            .iter()
            .map(|peer| ScoredPeer {
                id: peer.id.clone(),
                score: peer.score,
                bucket: bucket_peer(peer.score, &thresholds),
            })
            .collect();
        for peer in &scored {
            *buckets.entry(peer.bucket).or_insert(0) += 1;
        }

        scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        let top_positive: Vec<ScoredPeer> = scored
            .iter()
            .filter(|p| p.score > 0.0)
            .take(options.limit)
            .cloned()
            .collect();
        let top_negative: Vec<ScoredPeer> = scored
            .iter()
            .rev()
            .filter(|p| p.score < 0.0)
            .take(options.limit)
            .cloned()
            .collect();

        PeerScoreSummary {
            timestamp: Some(latest.timestamp),
            peer_count: scored.len(),
            snapshots_retained: retained,
            top_positive,
            top_negative,
            buckets,
        }
    }

    fn report(&self, snapshot: &PeerScoreSnapshot) {
        metrics::counter!(names::GOSSIP_SCORE_SNAPSHOTS_TOTAL).increment(1);

        let mut buckets: BTreeMap<ScoreBucket, usize> =
            ScoreBucket::iter().map(|bucket| (bucket, 0)).collect();
        let mut contributions: BTreeMap<&str, f64> = BTreeMap::new();
        for peer in &snapshot.peers {
            *buckets
                .entry(bucket_peer(peer.score, &self.config.thresholds))
                .or_insert(0) += 1;
            for (topic, value) in &peer.topics {
                let label = if self.config.metric_topics.contains(topic) {
                    topic.as_str()
                } else {
                    OTHER_TOPIC_LABEL
                };
                *contributions.entry(label).or_insert(0.0) += value;
            }
        }

        for (bucket, count) in buckets {
            metrics::gauge!(names::GOSSIP_PEER_SCORE_BUCKET, "bucket" => bucket.as_str())
                .set(count as f64);
        }
        for (topic, value) in contributions {
            metrics::gauge!(names::GOSSIP_TOPIC_SCORE_CONTRIBUTION, "topic" => topic.to_owned())
                .set(value);
        }
    }
}
