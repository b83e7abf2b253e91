//! Listen and announce address settings.

use serde::{Deserialize, Serialize};

use crate::parse::ConfigReader;
use crate::source::ConfigSource;

pub const P2P_LISTEN_PORT: &str = "P2P_LISTEN_PORT";
pub const P2P_PUBLIC_ADDRS: &str = "P2P_PUBLIC_ADDRS";
pub const P2P_RELAY_ADDRS: &str = "P2P_RELAY_ADDRS";
pub const P2P_LAN_ADDRS: &str = "P2P_LAN_ADDRS";

const DEFAULT_P2P_PORT: u16 = 4001;

/// Announce candidates, grouped by reachability scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostSettings {
    pub listen_port: u16,
    pub public_addrs: Vec<String>,
    pub relay_addrs: Vec<String>,
    pub lan_addrs: Vec<String>,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            listen_port: DEFAULT_P2P_PORT,
            public_addrs: Vec::new(),
            relay_addrs: Vec::new(),
            lan_addrs: Vec::new(),
        }
    }
}

impl HostSettings {
    pub fn from_source<S: ConfigSource + ?Sized>(source: &S) -> Self {
        let r = ConfigReader::new(source);
        Self {
            listen_port: r.u16(P2P_LISTEN_PORT, DEFAULT_P2P_PORT),
            public_addrs: r.list(P2P_PUBLIC_ADDRS),
            relay_addrs: r.list(P2P_RELAY_ADDRS),
            lan_addrs: r.list(P2P_LAN_ADDRS),
        }
    }
}
