use crate::rank::dedup_addrs;
use crate::reachability::Reachability;

/// Addresses the host could announce, grouped by scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnnounceCandidates<'a> {
    pub public: &'a [String],
    pub relay: &'a [String],
    pub lan: &'a [String],
}

/// Pick the addresses to announce for the given reachability.
///
/// Unknown reachability announces the most conservative addresses first.
pub fn select_announceable_addrs(
    reachability: Reachability,
    candidates: AnnounceCandidates<'_>,
) -> Vec<String> {
    let AnnounceCandidates { public, relay, lan } = candidates;
    let groups: [&[String]; 3] = match reachability {
        Reachability::Public => [public, relay, &[]],
        Reachability::Private => [relay, lan, &[]],
        Reachability::Unknown => [lan, relay, public],
    };
    dedup_addrs(groups.into_iter().flatten())
}
