//! Bounded label values.

use serde::{Deserialize, Serialize};

/// Connection direction relative to the local node.
///
/// Serialises as `inbound`/`outbound` in JSON and labels metrics as `in`/`out`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    /// Metric label value.
    pub const fn as_label(&self) -> &'static str {
        match self {
            Self::Inbound => "in",
            Self::Outbound => "out",
        }
    }

    pub const fn is_outbound(&self) -> bool {
        matches!(self, Self::Outbound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_direction_labels_are_bounded() {
        let labels: Vec<_> = Direction::iter().map(|d| d.as_label()).collect();
        assert_eq!(labels, vec!["in", "out"]);
    }

    #[test]
    fn test_direction_serde() {
        assert_eq!(
            serde_json::to_string(&Direction::Outbound).unwrap(),
            "\"outbound\""
        );
        let parsed: Direction = serde_json::from_str("\"inbound\"").unwrap();
        assert_eq!(parsed, Direction::Inbound);
    }
}
