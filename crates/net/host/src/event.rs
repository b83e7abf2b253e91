use agi_metrics::Direction;

/// Dial and connection lifecycle event reported by the network host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    DialStart {
        peer: String,
        address: Option<String>,
    },
    DialSuccess {
        peer: String,
        address: Option<String>,
    },
    DialFailure {
        peer: String,
        address: Option<String>,
        error: Option<String>,
    },
    ConnectionOpen {
        peer: String,
        address: Option<String>,
        direction: Direction,
    },
    ConnectionClose {
        peer: String,
        address: Option<String>,
        direction: Direction,
    },
}

impl TransportEvent {
    pub fn peer(&self) -> &str {
        match self {
            Self::DialStart { peer, .. }
            | Self::DialSuccess { peer, .. }
            | Self::DialFailure { peer, .. }
            | Self::ConnectionOpen { peer, .. }
            | Self::ConnectionClose { peer, .. } => peer,
        }
    }

    pub fn address(&self) -> Option<&str> {
        match self {
            Self::DialStart { address, .. }
            | Self::DialSuccess { address, .. }
            | Self::DialFailure { address, .. }
            | Self::ConnectionOpen { address, .. }
            | Self::ConnectionClose { address, .. } => address.as_deref(),
        }
    }

    /// Dial events are always outbound.
    pub fn direction(&self) -> Direction {
        match self {
            Self::ConnectionOpen { direction, .. } | Self::ConnectionClose { direction, .. } => {
                *direction
            }
            _ => Direction::Outbound,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DialStart { .. } => "dial:start",
            Self::DialSuccess { .. } => "dial:success",
            Self::DialFailure { .. } => "dial:failure",
            Self::ConnectionOpen { .. } => "connection:open",
            Self::ConnectionClose { .. } => "connection:close",
        }
    }
}
