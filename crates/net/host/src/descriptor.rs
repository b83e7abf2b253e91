use std::sync::Arc;

use agi_net_dialer::{DialerPolicy, DialerPolicyConfig};
use agi_net_gossip_score::{GossipsubRoutingConfig, MeshParams, PeerScoreRegistry};
use agi_net_resources::{ConnectionManager, GlobalLimits, ResourceManager, WatermarkConfig};
use agi_net_transport::{
    AutonatPlan, Reachability, ReachabilityTracker, RelayPlan, TransportPlan, TransportPreference,
    TransportToggles, rank_dialable_multiaddrs,
};
use serde::Serialize;

use crate::event::TransportEvent;
use crate::tracer::TransportTracer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NatSettings {
    pub hole_punching: bool,
    pub autonat: AutonatPlan,
}

/// What the host uses to order, pace and instrument its dials.
#[derive(Debug, Clone)]
pub struct DialerHandle {
    plan: TransportPlan,
    policy: Arc<DialerPolicy>,
    tracer: Arc<TransportTracer>,
}

impl DialerHandle {
    pub(crate) fn new(plan: TransportPlan, policy: Arc<DialerPolicy>, tracer: Arc<TransportTracer>) -> Self {
        Self {
            plan,
            policy,
            tracer,
        }
    }

    pub fn preference(&self) -> TransportPreference {
        self.plan.preference()
    }

    pub fn policy(&self) -> &Arc<DialerPolicy> {
        &self.policy
    }

    pub fn tracer(&self) -> &Arc<TransportTracer> {
        &self.tracer
    }

    /// Deduplicate and order `addrs` by the plan's transport preference.
    pub fn rank<I, S>(&self, addrs: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        rank_dialable_multiaddrs(addrs, &self.plan)
    }

    pub fn trace(&self, event: &TransportEvent) {
        self.tracer.trace(event);
    }
}

/// Everything the network host needs, assembled once at startup.
#[derive(Debug, Clone)]
pub struct HostDescriptor {
    pub plan: TransportPlan,
    pub listen_addrs: Vec<String>,
    /// Filtered by the reachability observed at assembly time.
    pub announce_addrs: Vec<String>,
    pub reachability: Reachability,
    pub dialer: DialerHandle,
    pub nat: NatSettings,
    pub relay: RelayPlan,
    pub resource_manager: Arc<ResourceManager>,
    pub connection_manager: Arc<ConnectionManager>,
    pub reachability_tracker: Arc<ReachabilityTracker>,
    pub peer_scores: Arc<PeerScoreRegistry>,
    pub gossipsub: GossipsubRoutingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostSummary {
    pub transports: TransportToggles,
    pub listen_addrs: Vec<String>,
    pub announce_addrs: Vec<String>,
    pub reachability: Reachability,
    pub nat: NatSettings,
    pub relay: RelayPlan,
    pub dialer: DialerPolicyConfig,
    pub limits: GlobalLimits,
    pub watermarks: WatermarkConfig,
    pub mesh: MeshParams,
    pub scored_topics: Vec<String>,
}

impl HostDescriptor {
    pub fn summary(&self) -> HostSummary {
        let limits = self.resource_manager.limits();
        HostSummary {
            transports: *self.plan.transports(),
            listen_addrs: self.listen_addrs.clone(),
            announce_addrs: self.announce_addrs.clone(),
            reachability: self.reachability,
            nat: self.nat,
            relay: self.relay,
            dialer: *self.dialer.policy.config(),
            limits: limits.global,
            watermarks: limits.connection_manager,
            mesh: self.gossipsub.mesh,
            scored_topics: self.gossipsub.score_params.topics.keys().cloned().collect(),
        }
    }
}
