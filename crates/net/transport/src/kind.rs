use serde::{Deserialize, Serialize};

/// Transport family of a multiaddr, used as a bounded metric label.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::IntoStaticStr,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransportKind {
    Quic,
    Tcp,
    Relay,
    Unknown,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) const RELAY_MARKER: &str = "/p2p-circuit";

pub(crate) fn has_quic_marker(addr: &str) -> bool {
    addr.contains("/quic") || addr.contains("/udp/")
}

pub(crate) fn has_tcp_marker(addr: &str) -> bool {
    addr.contains("/tcp/")
}

/// Classify a multiaddr string by substring markers.
///
/// Circuit-relay addresses are checked first: a relayed address also carries
/// the relay's own transport, and should be labelled as relayed.
pub fn classify_transport(addr: &str) -> TransportKind {
    let addr = addr.to_ascii_lowercase();
    if addr.contains(RELAY_MARKER) {
        TransportKind::Relay
    } else if has_quic_marker(&addr) {
        TransportKind::Quic
    } else if has_tcp_marker(&addr) {
        TransportKind::Tcp
    } else {
        TransportKind::Unknown
    }
}
