use std::sync::Arc;

use agi_net_config::NetworkConfig;
use agi_net_dialer::{DialerPolicy, DialerPolicyConfig};
use agi_net_gossip_score::{
    DEFAULT_TOPICS, PeerScoreInspector, PeerScoreOptions, PeerScoreRegistry, RegistryConfig,
    build_gossipsub_routing_config, build_peer_score_config,
};
use agi_net_resources::{ConnectionManager, ResourceManager};
use agi_net_transport::{
    AnnounceCandidates, ReachabilityTracker, TransportPlan, select_announceable_addrs,
};
use tracing::info;

use crate::descriptor::{DialerHandle, HostDescriptor, NatSettings};
use crate::error::HostConfigError;
use crate::tracer::{TracerOptions, TransportTracer};

#[derive(Debug, Clone, Default)]
pub struct HostConfigInputs {
    pub config: NetworkConfig,
    /// Shared tracker; a fresh one starting at `unknown` is created when absent.
    pub reachability: Option<Arc<ReachabilityTracker>>,
    pub tracer: TracerOptions,
}

/// Compose every control-plane component into one [`HostDescriptor`].
///
/// Fails when no transport is enabled or the connection watermarks are invalid.
pub fn build_host_config(inputs: HostConfigInputs) -> Result<HostDescriptor, HostConfigError> {
    let HostConfigInputs {
        config,
        reachability,
        tracer,
    } = inputs;

    let plan = TransportPlan::build(&config.transport)?;
    let dialer_config = DialerPolicyConfig::from_settings(&config.dialer);
    let resource_manager =
        ResourceManager::from_settings(&config.resources)?.with_dialer_config(dialer_config);
    let connection_manager = ConnectionManager::new(resource_manager.limits().connection_manager)?;

    let reachability_tracker = reachability.unwrap_or_default();
    let reachability = reachability_tracker.state();
    let announce_addrs = select_announceable_addrs(
        reachability,
        AnnounceCandidates {
            public: &config.host.public_addrs,
            relay: &config.host.relay_addrs,
            lan: &config.host.lan_addrs,
        },
    );
    let listen_addrs = plan.listen_addrs(config.host.listen_port);

    let score_config = build_peer_score_config(&PeerScoreOptions::from_settings(&config.pubsub));
    let peer_scores = Arc::new(PeerScoreRegistry::new(RegistryConfig {
        retention_minutes: config.pubsub.score_retention_minutes,
        thresholds: score_config.thresholds,
        metric_topics: DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect(),
        ..Default::default()
    }));
    let inspector = PeerScoreInspector::new(peer_scores.clone()).into_callback();
    let gossipsub = build_gossipsub_routing_config(&config.pubsub, &score_config, Some(inspector));

    let dialer = DialerHandle::new(
        plan,
        Arc::new(DialerPolicy::new(dialer_config)),
        Arc::new(TransportTracer::new(tracer)),
    );

    info!(
        preference = plan.preference().as_str(),
        quic = plan.quic_enabled(),
        tcp = plan.tcp_enabled(),
        reachability = reachability.as_str(),
        listen = listen_addrs.len(),
        announce = announce_addrs.len(),
        "Assembled network host config"
    );

    Ok(HostDescriptor {
        plan,
        listen_addrs,
        announce_addrs,
        reachability,
        dialer,
        nat: NatSettings {
            hole_punching: plan.hole_punching(),
            autonat: *plan.autonat(),
        },
        relay: *plan.relay(),
        resource_manager: Arc::new(resource_manager),
        connection_manager: Arc::new(connection_manager),
        reachability_tracker,
        peer_scores,
        gossipsub,
    })
}
