//! Peer score snapshot shapes.
//!
//! Score reporters disagree on layout: some send a list of peers, some a map
//! keyed by peer id, some a `peerScores` map whose values are either bare
//! numbers or detailed objects. [`RawScoreSnapshot`] accepts all three and
//! [`RawScoreSnapshot::normalize`] collapses them into [`PeerScoreSnapshot`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A peer entry as reported, before normalisation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawPeer {
    #[serde(alias = "peerId")]
    pub id: Option<String>,
    pub score: Option<f64>,
    pub topics: BTreeMap<String, f64>,
    pub app_specific: Option<f64>,
    pub behaviour_penalty: Option<f64>,
    pub ip_colocation_factor: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPeerScore {
    Score(f64),
    Detailed(RawPeer),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawScoreSnapshot {
    PeerList {
        timestamp: Option<f64>,
        peers: Vec<RawPeer>,
    },
    PeerMap {
        timestamp: Option<f64>,
        peers: BTreeMap<String, RawPeer>,
    },
    PeerScores {
        timestamp: Option<f64>,
        #[serde(rename = "peerScores")]
        peer_scores: BTreeMap<String, RawPeerScore>,
    },
}

impl Default for RawScoreSnapshot {
    fn default() -> Self {
        Self::PeerList {
            timestamp: None,
            peers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerScoreEntry {
    pub id: String,
    pub score: f64,
    pub topics: BTreeMap<String, f64>,
    pub app_specific: f64,
    pub behaviour_penalty: f64,
    pub ip_colocation_factor: f64,
}

/// Canonical snapshot. `timestamp` is milliseconds since the Unix epoch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerScoreSnapshot {
    pub timestamp: u64,
    pub peers: Vec<PeerScoreEntry>,
}

fn finite(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn timestamp_or(raw: Option<f64>, now_ms: u64) -> u64 {
    match raw {
        Some(ts) if ts.is_finite() && ts >= 0.0 => ts as u64,
        _ => now_ms,
    }
}

fn entry(id: String, raw: RawPeer) -> PeerScoreEntry {
    PeerScoreEntry {
        id,
        score: finite(raw.score),
        topics: raw
            .topics
            .into_iter()
            .map(|(topic, value)| (topic, finite(Some(value))))
            .collect(),
        app_specific: finite(raw.app_specific),
        behaviour_penalty: finite(raw.behaviour_penalty),
        ip_colocation_factor: finite(raw.ip_colocation_factor),
    }
}

/// Map forms key peers by id; an explicit non-empty `id` field wins.
fn keyed_entry(key: String, mut raw: RawPeer) -> PeerScoreEntry {
    let id = raw.id.take().filter(|id| !id.is_empty()).unwrap_or(key);
    entry(id, raw)
}

impl RawScoreSnapshot {
    /// Collapse into the canonical shape. Entries without an id are dropped,
    /// non-finite numbers become zero and a missing timestamp becomes `now_ms`.
    pub fn normalize(self, now_ms: u64) -> PeerScoreSnapshot {
        match self {
            Self::PeerList { timestamp, peers } => PeerScoreSnapshot {
                timestamp: timestamp_or(timestamp, now_ms),
                peers: peers
                    .into_iter()
                    .filter_map(|mut raw| {
                        let id = raw.id.take().filter(|id| !id.is_empty())?;
                        Some(entry(id, raw))
                    })
                    .collect(),
            },
            Self::PeerMap { timestamp, peers } => PeerScoreSnapshot {
                timestamp: timestamp_or(timestamp, now_ms),
                peers: peers
                    .into_iter()
                    .map(|(key, raw)| keyed_entry(key, raw))
                    .collect(),
            },
            Self::PeerScores {
                timestamp,
                peer_scores,
            } => PeerScoreSnapshot {
                timestamp: timestamp_or(timestamp, now_ms),
                peers: peer_scores
                    .into_iter()
                    .map(|(key, value)| match value {
                        RawPeerScore::Score(score) => keyed_entry(
                            key,
                            RawPeer {
                                score: Some(score),
                                ..Default::default()
                            },
                        ),
                        RawPeerScore::Detailed(raw) => keyed_entry(key, raw),
                    })
                    .collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn parse(json: &str) -> RawScoreSnapshot {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_peer_list_shape() {
        let raw = parse(
            r#"{"timestamp": 1700, "peers": [
                {"id": "a", "score": 1.5, "topics": {"agi.jobs": 0.5}, "appSpecific": 1},
                {"peerId": "b", "score": -3},
                {"score": 9}
            ]}"#,
        );
        assert_matches!(raw, RawScoreSnapshot::PeerList { .. });

        let snapshot = raw.normalize(99);
        assert_eq!(snapshot.timestamp, 1700);
        assert_eq!(snapshot.peers.len(), 2);
        assert_eq!(snapshot.peers[0].id, "a");
        assert_eq!(snapshot.peers[0].topics["agi.jobs"], 0.5);
        assert_eq!(snapshot.peers[0].app_specific, 1.0);
        assert_eq!(snapshot.peers[1].id, "b");
        assert_eq!(snapshot.peers[1].behaviour_penalty, 0.0);
    }

    #[test]
    fn test_peer_map_shape() {
        let raw = parse(r#"{"peers": {"a": {"score": 2}, "b": {"score": -1, "ipColocationFactor": 4}}}"#);
        assert_matches!(raw, RawScoreSnapshot::PeerMap { .. });

        let snapshot = raw.normalize(42);
        assert_eq!(snapshot.timestamp, 42);
        assert_eq!(snapshot.peers[1].id, "b");
        assert_eq!(snapshot.peers[1].ip_colocation_factor, 4.0);
    }

    #[test]
    fn test_peer_scores_shape() {
        let raw = parse(r#"{"peerScores": {"a": 3.5, "b": {"score": -7, "behaviourPenalty": 2}}}"#);
        assert_matches!(raw, RawScoreSnapshot::PeerScores { .. });

        let snapshot = raw.normalize(1);
        assert_eq!(snapshot.peers.len(), 2);
        assert_eq!(snapshot.peers[0].score, 3.5);
        assert_eq!(snapshot.peers[1].score, -7.0);
        assert_eq!(snapshot.peers[1].behaviour_penalty, 2.0);
    }

    #[test]
    fn test_non_finite_values_become_zero() {
        let raw = RawScoreSnapshot::PeerList {
            timestamp: Some(f64::NAN),
            peers: vec![RawPeer {
                id: Some("a".into()),
                score: Some(f64::INFINITY),
                topics: BTreeMap::from([("t".to_string(), f64::NAN)]),
                ..Default::default()
            }],
        };
        let snapshot = raw.normalize(5);
        assert_eq!(snapshot.timestamp, 5);
        assert_eq!(snapshot.peers[0].score, 0.0);
        assert_eq!(snapshot.peers[0].topics["t"], 0.0);
    }
}
