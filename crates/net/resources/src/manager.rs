use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::net::IpAddr;

use agi_metrics::{Direction, names};
use agi_net_config::ResourceSettings;
use agi_net_dialer::{ConnectionCounts, DialerPolicy, DialerPolicyConfig};
use parking_lot::Mutex;
use tracing::{Span, debug, info, warn};
use web_time::Instant;

use crate::error::ResourceError;
use crate::limits::ResourceLimits;
use crate::pressure::{PRESSURE_WARN_INTERVAL, PressureMonitor, PressureResource, ratio};
use crate::request::{
    Admission, ConnectionRequest, DenialReason, OTHER_PROTOCOL, StreamRequest, UNKNOWN_PROTOCOL,
};
use crate::snapshot::{
    BanList, DenialStats, DirectionStats, LimitsView, ProtocolTraffic, ProtocolUsage,
    ResourceMetrics, ResourceUsage, Utilization,
};

fn count<K, Q>(map: &HashMap<K, u64>, key: &Q) -> u64
where
    K: Borrow<Q> + Eq + Hash,
    Q: ?Sized + Eq + Hash,
{
    map.get(key).copied().unwrap_or(0)
}

fn increment<K: Eq + Hash>(map: &mut HashMap<K, u64>, key: K) {
    *map.entry(key).or_insert(0) += 1;
}

/// Decrement and prune the entry at zero. Returns false if there was nothing to decrement.
fn decrement<K, Q>(map: &mut HashMap<K, u64>, key: &Q) -> bool
where
    K: Borrow<Q> + Eq + Hash,
    Q: ?Sized + Eq + Hash,
{
    let Some(value) = map.get_mut(key) else {
        return false;
    };
    *value = value.saturating_sub(1);
    if *value == 0 {
        map.remove(key);
    }
    true
}

/// A utilisation sample: resource, scope label, used, limit.
type Reading = (PressureResource, String, u64, u64);

#[derive(Debug)]
struct Inner {
    limits: ResourceLimits,
    connections: u64,
    streams: u64,
    inbound: u64,
    outbound: u64,
    protocol_connections: HashMap<String, u64>,
    protocol_streams: HashMap<String, u64>,
    peer_streams: HashMap<String, u64>,
    ip_connections: HashMap<IpAddr, u64>,
    asn_connections: HashMap<u32, u64>,
    denials_total: u64,
    denials: BTreeMap<DenialReason, u64>,
    traffic: BTreeMap<String, ProtocolTraffic>,
    pressure: PressureMonitor,
}

impl Inner {
    fn check_bans(
        &self,
        peer_id: &str,
        ip: Option<IpAddr>,
        asn: Option<u32>,
    ) -> Result<(), DenialReason> {
        let bans = &self.limits.ip_limiter;
        if ip.is_some_and(|ip| bans.banned_ips.contains(&ip)) {
            return Err(DenialReason::BannedIp);
        }
        if bans.banned_peers.contains(peer_id) {
            return Err(DenialReason::BannedPeer);
        }
        if asn.is_some_and(|asn| bans.banned_asns.contains(&asn)) {
            return Err(DenialReason::BannedAsn);
        }
        Ok(())
    }

    fn check_connection(&self, req: &ConnectionRequest<'_>) -> Result<(), DenialReason> {
        self.check_bans(req.peer_id, req.ip, req.asn)?;

        if self.connections >= self.limits.global.max_connections {
            return Err(DenialReason::GlobalConnectionCap);
        }
        let limiter = &self.limits.ip_limiter;
        if let (Some(ip), Some(max)) = (req.ip, limiter.max_conns_per_ip) {
            if count(&self.ip_connections, &ip) >= max {
                return Err(DenialReason::PerIpCap);
            }
        }
        if let (Some(asn), Some(max)) = (req.asn, limiter.max_conns_per_asn) {
            if count(&self.asn_connections, &asn) >= max {
                return Err(DenialReason::PerAsnCap);
            }
        }
        let protocol = req.protocol();
        if let Some(max) = self.protocol_limit(protocol, |l| l.max_connections) {
            if count(&self.protocol_connections, protocol) >= max {
                return Err(DenialReason::ProtocolConnectionCap);
            }
        }
        Ok(())
    }

    fn check_stream(&self, req: &StreamRequest<'_>) -> Result<(), DenialReason> {
        self.check_bans(req.peer_id, req.ip, req.asn)?;

        if self.streams >= self.limits.global.max_streams {
            return Err(DenialReason::GlobalStreamCap);
        }
        let protocol = req.protocol();
        if let Some(max) = self.protocol_limit(protocol, |l| l.max_streams) {
            if count(&self.protocol_streams, protocol) >= max {
                return Err(DenialReason::ProtocolStreamCap);
            }
        }
        if let Some(max) = self.peer_stream_limit(req.peer_id) {
            if count(&self.peer_streams, req.peer_id) >= max {
                return Err(DenialReason::PeerStreamCap);
            }
        }
        Ok(())
    }

    fn protocol_limit(
        &self,
        protocol: &str,
        field: impl Fn(&agi_net_config::ScopeLimits) -> Option<u64>,
    ) -> Option<u64> {
        self.limits.per_protocol.get(protocol).and_then(field)
    }

    fn peer_stream_limit(&self, peer_id: &str) -> Option<u64> {
        self.limits
            .per_peer
            .get(peer_id)
            .and_then(|limits| limits.max_streams)
    }

    fn admit_connection(&mut self, req: &ConnectionRequest<'_>) {
        self.connections += 1;
        match req.direction {
            Direction::Inbound => self.inbound += 1,
            Direction::Outbound => self.outbound += 1,
        }
        increment(&mut self.protocol_connections, req.protocol().to_owned());
        if let Some(ip) = req.ip {
            increment(&mut self.ip_connections, ip);
        }
        if let Some(asn) = req.asn {
            increment(&mut self.asn_connections, asn);
        }
    }

    fn admit_stream(&mut self, req: &StreamRequest<'_>) {
        self.streams += 1;
        increment(&mut self.protocol_streams, req.protocol().to_owned());
        if self.peer_stream_limit(req.peer_id).is_some() {
            increment(&mut self.peer_streams, req.peer_id.to_owned());
        }
    }

    fn record_denial(&mut self, reason: DenialReason) {
        self.denials_total += 1;
        *self.denials.entry(reason).or_insert(0) += 1;
    }

    fn connection_readings(&self, req: &ConnectionRequest<'_>) -> Vec<Reading> {
        let limiter = &self.limits.ip_limiter;
        let protocol = req.protocol();
        let mut readings = vec![(
            PressureResource::Connections,
            String::from("global"),
            self.connections,
            self.limits.global.max_connections,
        )];
        if let (Some(ip), Some(max)) = (req.ip, limiter.max_conns_per_ip) {
            readings.push((
                PressureResource::Ip,
                ip.to_string(),
                count(&self.ip_connections, &ip),
                max,
            ));
        }
        if let (Some(asn), Some(max)) = (req.asn, limiter.max_conns_per_asn) {
            readings.push((
                PressureResource::Asn,
                format!("AS{asn}"),
                count(&self.asn_connections, &asn),
                max,
            ));
        }
        if let Some(max) = self.protocol_limit(protocol, |l| l.max_connections) {
            readings.push((
                PressureResource::ProtocolConnections,
                protocol.to_owned(),
                count(&self.protocol_connections, protocol),
                max,
            ));
        }
        readings
    }

    fn stream_readings(&self, req: &StreamRequest<'_>) -> Vec<Reading> {
        let protocol = req.protocol();
        let mut readings = vec![(
            PressureResource::Streams,
            String::from("global"),
            self.streams,
            self.limits.global.max_streams,
        )];
        if let Some(max) = self.protocol_limit(protocol, |l| l.max_streams) {
            readings.push((
                PressureResource::ProtocolStreams,
                protocol.to_owned(),
                count(&self.protocol_streams, protocol),
                max,
            ));
        }
        if let Some(max) = self.peer_stream_limit(req.peer_id) {
            readings.push((
                PressureResource::PeerStreams,
                req.peer_id.to_owned(),
                count(&self.peer_streams, req.peer_id),
                max,
            ));
        }
        readings
    }

    fn ban_list(&self) -> BanList {
        let bans = &self.limits.ip_limiter;
        let mut peers: Vec<String> = bans.banned_peers.iter().cloned().collect();
        let mut ips: Vec<IpAddr> = bans.banned_ips.iter().copied().collect();
        let mut asns: Vec<u32> = bans.banned_asns.iter().copied().collect();
        peers.sort();
        ips.sort();
        asns.sort_unstable();
        BanList {
            peers,
            ips: ips.iter().map(ToString::to_string).collect(),
            asns,
        }
    }
}

/// Admission control for connections and streams.
///
/// All state sits behind one mutex that is held for the whole
/// check-then-increment sequence of an admission call, so concurrent callers
/// can never both take the last slot. Every check runs before any counter is
/// touched.
#[derive(Debug)]
pub struct ResourceManager {
    inner: Mutex<Inner>,
    dialer: Option<DialerPolicyConfig>,
    span: Span,
}

impl ResourceManager {
    pub fn new(limits: ResourceLimits) -> Self {
        let manager = Self {
            inner: Mutex::new(Inner {
                limits,
                connections: 0,
                streams: 0,
                inbound: 0,
                outbound: 0,
                protocol_connections: HashMap::new(),
                protocol_streams: HashMap::new(),
                peer_streams: HashMap::new(),
                ip_connections: HashMap::new(),
                asn_connections: HashMap::new(),
                denials_total: 0,
                denials: BTreeMap::new(),
                traffic: BTreeMap::new(),
                pressure: PressureMonitor::new(PRESSURE_WARN_INTERVAL),
            }),
            dialer: None,
            span: tracing::info_span!("resource_manager"),
        };
        manager.report_bans(&manager.inner.lock());
        manager
    }

    pub fn from_settings(settings: &ResourceSettings) -> Result<Self, ResourceError> {
        Ok(Self::new(ResourceLimits::from_settings(settings)?))
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Attach the dialer config used for the outbound plan in [`Self::metrics`].
    pub fn with_dialer_config(mut self, config: DialerPolicyConfig) -> Self {
        self.dialer = Some(config);
        self
    }

    pub fn limits(&self) -> ResourceLimits {
        self.inner.lock().limits.clone()
    }

    pub fn current_connections(&self) -> u64 {
        self.inner.lock().connections
    }

    pub fn current_streams(&self) -> u64 {
        self.inner.lock().streams
    }

    pub fn request_connection(&self, req: ConnectionRequest<'_>) -> Admission {
        let mut inner = self.inner.lock();
        if let Err(reason) = inner.check_connection(&req) {
            inner.record_denial(reason);
            drop(inner);
            self.report_denial(reason, req.peer_id, req.ip, req.protocol());
            return Admission::deny(reason);
        }

        inner.admit_connection(&req);
        metrics::gauge!(names::NRM_CONNECTIONS).set(inner.connections as f64);
        let readings = inner.connection_readings(&req);
        self.report_pressure(&mut inner, readings);
        Admission::accept()
    }

    /// Release an admitted connection. Returns false when no connection was
    /// accounted under the request's protocol.
    pub fn close_connection(&self, req: ConnectionRequest<'_>) -> bool {
        let mut inner = self.inner.lock();
        if !decrement(&mut inner.protocol_connections, req.protocol()) {
            debug!(parent: &self.span, peer = %req.peer_id, protocol = %req.protocol(), "Close for untracked connection ignored");
            return false;
        }
        inner.connections = inner.connections.saturating_sub(1);
        match req.direction {
            Direction::Inbound => inner.inbound = inner.inbound.saturating_sub(1),
            Direction::Outbound => inner.outbound = inner.outbound.saturating_sub(1),
        }
        if let Some(ip) = req.ip {
            decrement(&mut inner.ip_connections, &ip);
        }
        if let Some(asn) = req.asn {
            decrement(&mut inner.asn_connections, &asn);
        }
        metrics::gauge!(names::NRM_CONNECTIONS).set(inner.connections as f64);
        true
    }

    pub fn request_stream(&self, req: StreamRequest<'_>) -> Admission {
        let mut inner = self.inner.lock();
        if let Err(reason) = inner.check_stream(&req) {
            inner.record_denial(reason);
            drop(inner);
            self.report_denial(reason, req.peer_id, req.ip, req.protocol());
            return Admission::deny(reason);
        }

        inner.admit_stream(&req);
        metrics::gauge!(names::NRM_STREAMS).set(inner.streams as f64);
        let readings = inner.stream_readings(&req);
        self.report_pressure(&mut inner, readings);
        Admission::accept()
    }

    /// Release an admitted stream. Returns false when no stream was accounted
    /// under the request's protocol.
    pub fn close_stream(&self, req: StreamRequest<'_>) -> bool {
        let mut inner = self.inner.lock();
        if !decrement(&mut inner.protocol_streams, req.protocol()) {
            debug!(parent: &self.span, peer = %req.peer_id, protocol = %req.protocol(), "Close for untracked stream ignored");
            return false;
        }
        inner.streams = inner.streams.saturating_sub(1);
        decrement(&mut inner.peer_streams, req.peer_id);
        metrics::gauge!(names::NRM_STREAMS).set(inner.streams as f64);
        true
    }

    pub fn ban_ip(&self, ip: IpAddr) -> bool {
        self.mutate_bans("ip", &ip, |bans| bans.banned_ips.insert(ip))
    }

    pub fn unban_ip(&self, ip: IpAddr) -> bool {
        self.mutate_bans("ip", &ip, |bans| bans.banned_ips.remove(&ip))
    }

    pub fn ban_peer(&self, peer_id: &str) -> bool {
        self.mutate_bans("peer", peer_id, |bans| {
            bans.banned_peers.insert(peer_id.to_owned())
        })
    }

    pub fn unban_peer(&self, peer_id: &str) -> bool {
        self.mutate_bans("peer", peer_id, |bans| bans.banned_peers.remove(peer_id))
    }

    pub fn ban_asn(&self, asn: u32) -> bool {
        self.mutate_bans("asn", &asn, |bans| bans.banned_asns.insert(asn))
    }

    pub fn unban_asn(&self, asn: u32) -> bool {
        self.mutate_bans("asn", &asn, |bans| bans.banned_asns.remove(&asn))
    }

    pub fn is_banned_ip(&self, ip: IpAddr) -> bool {
        self.inner.lock().limits.ip_limiter.banned_ips.contains(&ip)
    }

    pub fn is_banned_peer(&self, peer_id: &str) -> bool {
        self.inner
            .lock()
            .limits
            .ip_limiter
            .banned_peers
            .contains(peer_id)
    }

    pub fn is_banned_asn(&self, asn: u32) -> bool {
        self.inner.lock().limits.ip_limiter.banned_asns.contains(&asn)
    }

    pub fn banned(&self) -> BanList {
        self.inner.lock().ban_list()
    }

    /// Point-in-time usage, limits, denials and direction stats.
    /// Account `bytes` of traffic, one message, on `protocol` in `direction`.
    ///
    /// The protocol label is the protocol itself only when it has a configured
    /// per-protocol limit; missing protocols map to `unknown` and anything else
    /// to `other`, so the label set stays bounded by configuration.
    pub fn record_protocol_traffic(&self, protocol: Option<&str>, direction: Direction, bytes: u64) {
        let mut inner = self.inner.lock();
        let label = match protocol {
            None => UNKNOWN_PROTOCOL.to_string(),
            Some(p) if inner.limits.per_protocol.contains_key(p) => p.to_string(),
            Some(_) => OTHER_PROTOCOL.to_string(),
        };

        metrics::counter!(
            names::PROTOCOL_BYTES_TOTAL,
            "protocol" => label.clone(),
            "direction" => direction.as_label()
        )
        .increment(bytes);
        metrics::counter!(
            names::PROTOCOL_MESSAGES_TOTAL,
            "protocol" => label.clone(),
            "direction" => direction.as_label()
        )
        .increment(1);

        let traffic = inner.traffic.entry(label).or_default();
        match direction {
            Direction::Inbound => {
                traffic.bytes_in = traffic.bytes_in.saturating_add(bytes);
                traffic.messages_in += 1;
            }
            Direction::Outbound => {
                traffic.bytes_out = traffic.bytes_out.saturating_add(bytes);
                traffic.messages_out += 1;
            }
        }
    }

    pub fn metrics(&self) -> ResourceMetrics {
        let inner = self.inner.lock();
        let limits = &inner.limits;

        let mut per_protocol: BTreeMap<String, ProtocolUsage> = BTreeMap::new();
        for (protocol, &connections) in &inner.protocol_connections {
            per_protocol.entry(protocol.clone()).or_default().connections = connections;
        }
        for (protocol, &streams) in &inner.protocol_streams {
            per_protocol.entry(protocol.clone()).or_default().streams = streams;
        }

        let busiest = |max: Option<u64>, busiest: Option<u64>| match max {
            Some(max) => ratio(busiest.unwrap_or(0), max),
            None => 0.0,
        };
        let utilization = Utilization {
            connections: ratio(inner.connections, limits.global.max_connections),
            streams: ratio(inner.streams, limits.global.max_streams),
            ip: busiest(
                limits.ip_limiter.max_conns_per_ip,
                inner.ip_connections.values().copied().max(),
            ),
            asn: busiest(
                limits.ip_limiter.max_conns_per_asn,
                inner.asn_connections.values().copied().max(),
            ),
        };

        let total = inner.inbound + inner.outbound;
        let plan = self.dialer.map(|config| {
            DialerPolicy::new(config)
                .with_span(self.span.clone())
                .compute_outbound_plan(ConnectionCounts {
                    outbound: inner.outbound,
                    inbound: inner.inbound,
                    dialable: limits.global.max_connections.saturating_sub(inner.connections),
                })
        });
        let direction = DirectionStats {
            inbound: inner.inbound,
            outbound: inner.outbound,
            ratio: if total == 0 {
                1.0
            } else {
                inner.outbound as f64 / total as f64
            },
            target_ratio: self.dialer.map(|config| config.outbound.target_ratio),
            plan,
        };

        ResourceMetrics {
            usage: ResourceUsage {
                connections: inner.connections,
                streams: inner.streams,
                per_protocol,
                per_peer_streams: inner
                    .peer_streams
                    .iter()
                    .map(|(peer, &n)| (peer.clone(), n))
                    .collect(),
                traffic: inner.traffic.clone(),
            },
            limits: LimitsView {
                global: limits.global,
                max_conns_per_ip: limits.ip_limiter.max_conns_per_ip,
                max_conns_per_asn: limits.ip_limiter.max_conns_per_asn,
                per_protocol: limits.per_protocol.clone(),
                per_peer: limits.per_peer.clone(),
            },
            per_ip: inner
                .ip_connections
                .iter()
                .map(|(ip, &n)| (ip.to_string(), n))
                .collect(),
            per_asn: inner
                .asn_connections
                .iter()
                .map(|(&asn, &n)| (asn, n))
                .collect(),
            denials: DenialStats {
                total: inner.denials_total,
                by_reason: inner.denials.clone(),
            },
            utilization,
            direction,
            bans: inner.ban_list(),
        }
    }

    fn mutate_bans<T: std::fmt::Display + ?Sized>(
        &self,
        kind: &'static str,
        target: &T,
        mutate: impl FnOnce(&mut crate::limits::IpLimiterConfig) -> bool,
    ) -> bool {
        let mut inner = self.inner.lock();
        let changed = mutate(&mut inner.limits.ip_limiter);
        if changed {
            info!(parent: &self.span, kind, target = %target, "Ban list updated");
            self.report_bans(&inner);
        }
        changed
    }

    fn report_bans(&self, inner: &Inner) {
        let bans = &inner.limits.ip_limiter;
        metrics::gauge!(names::NRM_BANS, "kind" => "peer").set(bans.banned_peers.len() as f64);
        metrics::gauge!(names::NRM_BANS, "kind" => "ip").set(bans.banned_ips.len() as f64);
        metrics::gauge!(names::NRM_BANS, "kind" => "asn").set(bans.banned_asns.len() as f64);
    }

    fn report_denial(
        &self,
        reason: DenialReason,
        peer_id: &str,
        ip: Option<IpAddr>,
        protocol: &str,
    ) {
        metrics::counter!(names::NRM_DENIALS_TOTAL, "reason" => reason.as_str()).increment(1);
        debug!(
            parent: &self.span,
            peer = %peer_id,
            ip = ?ip,
            protocol = %protocol,
            reason = %reason.as_str(),
            "Admission denied"
        );
    }

    fn report_pressure(&self, inner: &mut Inner, readings: Vec<Reading>) {
        let now = Instant::now();
        for (resource, scope, used, limit) in readings {
            let utilisation = ratio(used, limit);
            if matches!(
                resource,
                PressureResource::Connections | PressureResource::Streams
            ) {
                metrics::gauge!(names::NRM_PRESSURE_RATIO, "resource" => resource.as_str())
                    .set(utilisation);
            }
            if inner.pressure.should_warn(resource, utilisation, now) {
                warn!(
                    parent: &self.span,
                    resource = %resource.as_str(),
                    scope = %scope,
                    used,
                    limit,
                    utilisation,
                    "Resource pressure high"
                );
            }
        }
    }
}
