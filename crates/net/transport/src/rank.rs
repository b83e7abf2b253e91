use std::collections::HashSet;

use crate::kind::{has_quic_marker, has_tcp_marker};
use crate::plan::{TransportPlan, TransportPreference};

/// Trim, drop empty entries and remove duplicates, keeping first occurrence order.
pub fn dedup_addrs<I, S>(addrs: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    addrs
        .into_iter()
        .filter_map(|addr| {
            let addr = addr.as_ref().trim();
            (!addr.is_empty() && seen.insert(addr.to_owned())).then(|| addr.to_owned())
        })
        .collect()
}

fn score(addr: &str, preference: TransportPreference) -> f64 {
    let addr = addr.to_ascii_lowercase();
    let quic = has_quic_marker(&addr);
    let tcp = has_tcp_marker(&addr);
    match preference {
        TransportPreference::PreferQuic => match (quic, tcp) {
            (true, false) => 0.0,
            (true, true) => 0.5,
            (false, true) => 1.0,
            (false, false) => 2.0,
        },
        TransportPreference::QuicOnly => {
            if quic {
                0.0
            } else {
                1.0
            }
        }
        TransportPreference::TcpOnly => {
            if tcp {
                0.0
            } else {
                1.0
            }
        }
    }
}

/// Order dialable addresses by the plan's transport preference.
///
/// Addresses are deduplicated first. Lower score dials first; equal scores
/// are ordered lexicographically so the result is deterministic.
pub fn rank_dialable_multiaddrs<I, S>(addrs: I, plan: &TransportPlan) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let preference = plan.preference();
    let mut scored: Vec<(f64, String)> = dedup_addrs(addrs)
        .into_iter()
        .map(|addr| (score(&addr, preference), addr))
        .collect();
    scored.sort_by(|(sa, a), (sb, b)| sa.total_cmp(sb).then_with(|| a.cmp(b)));
    scored.into_iter().map(|(_, addr)| addr).collect()
}
