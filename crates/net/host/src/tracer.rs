//! Transport lifecycle instrumentation.
//!
//! [`TransportTracer`] turns dial and connection events into counters, a
//! dial latency histogram, structured log lines and, when enabled, one
//! `transport.dial` span per dial. Instrumentation never fails the caller.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use agi_metrics::{Direction, names};
use agi_net_transport::{TransportKind, classify_transport};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{Span, debug, field, info, warn};
use web_time::Instant;

use crate::event::TransportEvent;

/// Dials that never report an outcome are evicted past this many.
const MAX_IN_FLIGHT: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TracerOptions {
    /// Open a `transport.dial` span per dial.
    pub spans: bool,
}

impl Default for TracerOptions {
    fn default() -> Self {
        Self { spans: true }
    }
}

type DialKey = (String, Option<String>);

#[derive(Debug)]
struct InFlight {
    started: Instant,
    span: Option<Span>,
}

#[derive(Debug)]
pub struct TransportTracer {
    options: TracerOptions,
    in_flight: parking_lot::Mutex<HashMap<DialKey, InFlight>>,
    span: Span,
}

impl Default for TransportTracer {
    fn default() -> Self {
        Self::new(TracerOptions::default())
    }
}

fn transport_of(address: Option<&str>) -> TransportKind {
    address.map_or(TransportKind::Unknown, classify_transport)
}

impl TransportTracer {
    pub fn new(options: TracerOptions) -> Self {
        Self {
            options,
            in_flight: parking_lot::Mutex::new(HashMap::new()),
            span: tracing::info_span!("transport_tracer"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn options(&self) -> TracerOptions {
        self.options
    }

    /// Dials started but not yet resolved.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Record one lifecycle event.
    ///
    /// Returns the dial latency when the event resolves a tracked dial.
    pub fn trace(&self, event: &TransportEvent) -> Option<Duration> {
        let address = event.address();
        let transport = transport_of(address);
        let direction = event.direction();

        match event {
            TransportEvent::DialStart { peer, .. } => {
                self.dial_started(peer, address, transport);
                metrics::counter!(
                    names::DIAL_ATTEMPTS_TOTAL,
                    "transport" => transport.as_str(),
                    "direction" => direction.as_label()
                )
                .increment(1);
                debug!(parent: &self.span, %peer, %transport, address, "Dial started");
                None
            }
            TransportEvent::DialSuccess { peer, .. } => {
                metrics::counter!(
                    names::DIAL_SUCCESSES_TOTAL,
                    "transport" => transport.as_str(),
                    "direction" => direction.as_label()
                )
                .increment(1);
                let latency = self.dial_finished(peer, address, transport, true);
                info!(
                    parent: &self.span,
                    %peer,
                    %transport,
                    address,
                    latency_ms = latency.map(|l| l.as_millis() as u64),
                    "Dial succeeded"
                );
                latency
            }
            TransportEvent::DialFailure { peer, error, .. } => {
                metrics::counter!(
                    names::DIAL_FAILURES_TOTAL,
                    "transport" => transport.as_str(),
                    "direction" => direction.as_label()
                )
                .increment(1);
                let latency = self.dial_finished(peer, address, transport, false);
                warn!(
                    parent: &self.span,
                    %peer,
                    %transport,
                    address,
                    error = error.as_deref(),
                    latency_ms = latency.map(|l| l.as_millis() as u64),
                    "Dial failed"
                );
                latency
            }
            TransportEvent::ConnectionOpen { peer, .. } => {
                if direction == Direction::Inbound {
                    metrics::counter!(
                        names::INBOUND_CONNECTIONS_TOTAL,
                        "transport" => transport.as_str()
                    )
                    .increment(1);
                }
                debug!(
                    parent: &self.span,
                    %peer,
                    %transport,
                    address,
                    direction = direction.as_label(),
                    "Connection opened"
                );
                None
            }
            TransportEvent::ConnectionClose { peer, .. } => {
                debug!(
                    parent: &self.span,
                    %peer,
                    %transport,
                    address,
                    direction = direction.as_label(),
                    "Connection closed"
                );
                None
            }
        }
    }

    fn dial_started(&self, peer: &str, address: Option<&str>, transport: TransportKind) {
        let span = self.options.spans.then(|| {
            tracing::info_span!(
                parent: &self.span,
                "transport.dial",
                peer,
                transport = transport.as_str(),
                address = address.unwrap_or_default(),
                success = field::Empty,
                latency_ms = field::Empty,
            )
        });

        let mut in_flight = self.in_flight.lock();
        if in_flight.len() >= MAX_IN_FLIGHT {
            let oldest = in_flight
                .iter()
                .min_by_key(|(_, dial)| dial.started)
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                in_flight.remove(&key);
            }
        }
        in_flight.insert(
            (peer.to_owned(), address.map(str::to_owned)),
            InFlight {
                started: Instant::now(),
                span,
            },
        );
    }

    /// Resolve the matching dial. Falls back to any dial to the same peer,
    /// since hosts often report the outcome with a different address than the start.
    fn dial_finished(
        &self,
        peer: &str,
        address: Option<&str>,
        transport: TransportKind,
        success: bool,
    ) -> Option<Duration> {
        let dial = {
            let mut in_flight = self.in_flight.lock();
            let key = (peer.to_owned(), address.map(str::to_owned));
            match in_flight.remove(&key) {
                Some(dial) => Some(dial),
                None => {
                    let fallback = in_flight.keys().find(|(p, _)| p == peer).cloned();
                    fallback.and_then(|key| in_flight.remove(&key))
                }
            }
        }?;

        let latency = dial.started.elapsed();
        metrics::histogram!(
            names::CONNECTION_LATENCY_SECONDS,
            "transport" => transport.as_str(),
            "outcome" => if success { "success" } else { "failure" }
        )
        .record(latency.as_secs_f64());
        if let Some(span) = dial.span {
            span.record("success", success);
            span.record("latency_ms", latency.as_millis() as u64);
        }
        Some(latency)
    }

    /// Trace every event from `events` on a background task until the
    /// sender closes or the binding is dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind_to(self: &Arc<Self>, mut events: broadcast::Receiver<TransportEvent>) -> TracerBinding {
        let tracer = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        tracer.trace(&event);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(parent: &tracer.span, skipped, "Transport tracer lagged behind host events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        TracerBinding { handle }
    }
}

/// Subscription created by [`TransportTracer::bind_to`]. Dropping it unbinds.
#[derive(Debug)]
pub struct TracerBinding {
    handle: JoinHandle<()>,
}

impl TracerBinding {
    pub fn is_bound(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn unbind(self) {}
}

impl Drop for TracerBinding {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
