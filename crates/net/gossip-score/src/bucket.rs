use agi_net_config::PubsubSettings;
use serde::{Deserialize, Serialize};

/// Score at or above which a peer counts as positive.
const POSITIVE_SCORE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreThresholds {
    pub gossip: f64,
    pub publish: f64,
    pub graylist: f64,
    pub disconnect: f64,
    pub accept_px: f64,
    pub opportunistic_graft: f64,
}

impl Default for ScoreThresholds {
    fn default() -> Self {
        Self {
            gossip: -2.0,
            publish: -4.0,
            graylist: -6.0,
            disconnect: -9.0,
            accept_px: 10.0,
            opportunistic_graft: 1.0,
        }
    }
}

impl ScoreThresholds {
    pub fn from_settings(settings: &PubsubSettings) -> Self {
        Self {
            gossip: settings.gossip_threshold,
            publish: settings.publish_threshold,
            graylist: settings.graylist_threshold,
            disconnect: settings.disconnect_threshold,
            accept_px: settings.accept_px_threshold,
            opportunistic_graft: settings.opportunistic_graft_threshold,
        }
    }
}

/// Severity classification of a peer score.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::IntoStaticStr,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScoreBucket {
    Disconnect,
    Graylist,
    PublishBlock,
    GossipSuppressed,
    Neutral,
    Positive,
}

impl ScoreBucket {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Classify `score`, most severe bucket first.
pub fn bucket_peer(score: f64, thresholds: &ScoreThresholds) -> ScoreBucket {
    if score <= thresholds.disconnect {
        ScoreBucket::Disconnect
    } else if score <= thresholds.graylist {
        ScoreBucket::Graylist
    } else if score <= thresholds.publish {
        ScoreBucket::PublishBlock
    } else if score <= thresholds.gossip {
        ScoreBucket::GossipSuppressed
    } else if score >= POSITIVE_SCORE {
        ScoreBucket::Positive
    } else {
        ScoreBucket::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_peer() {
        let t = ScoreThresholds::default();
        assert_eq!(bucket_peer(-10.0, &t), ScoreBucket::Disconnect);
        assert_eq!(bucket_peer(-9.0, &t), ScoreBucket::Disconnect);
        assert_eq!(bucket_peer(-6.0, &t), ScoreBucket::Graylist);
        assert_eq!(bucket_peer(-5.0, &t), ScoreBucket::PublishBlock);
        assert_eq!(bucket_peer(-2.0, &t), ScoreBucket::GossipSuppressed);
        assert_eq!(bucket_peer(0.0, &t), ScoreBucket::Neutral);
        assert_eq!(bucket_peer(0.49, &t), ScoreBucket::Neutral);
        assert_eq!(bucket_peer(0.6, &t), ScoreBucket::Positive);
    }

    #[test]
    fn test_bucket_labels() {
        assert_eq!(ScoreBucket::PublishBlock.as_str(), "publish_block");
        assert_eq!(
            serde_json::to_value(ScoreBucket::GossipSuppressed).unwrap(),
            "gossip_suppressed"
        );
    }

    #[test]
    fn test_thresholds_from_settings() {
        let t = ScoreThresholds::from_settings(&PubsubSettings::default());
        assert_eq!(t, ScoreThresholds::default());
    }
}
