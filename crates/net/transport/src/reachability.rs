//! Probe-driven reachability tracking.
//!
//! AutoNAT style probes report whether the node was dialable from outside.
//! The tracker requires a run of agreeing probes before flipping an
//! established state, so a single flaky probe cannot make the host
//! re-announce its addresses.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{Span, debug, info};

pub const DEFAULT_CONFIDENCE_THRESHOLD: u32 = 3;

/// Whether the node is dialable from the public internet.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Reachability {
    Public,
    Private,
    #[default]
    Unknown,
}

impl Reachability {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// Result of a single reachability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reachable,
    Unreachable,
    Inconclusive,
}

impl ProbeOutcome {
    fn verdict(self) -> Option<Reachability> {
        match self {
            Self::Reachable => Some(Reachability::Public),
            Self::Unreachable => Some(Reachability::Private),
            Self::Inconclusive => None,
        }
    }
}

#[derive(Debug)]
struct State {
    derived: Reachability,
    override_state: Option<Reachability>,
    /// Candidate state disagreeing with `derived`, and how many probes in a row voted for it.
    pending: Option<(Reachability, u32)>,
    inconclusive_streak: u32,
}

impl State {
    fn effective(&self) -> Reachability {
        self.override_state.unwrap_or(self.derived)
    }
}

/// Tracks the node's reachability from probe results.
#[derive(Debug)]
pub struct ReachabilityTracker {
    threshold: u32,
    state: Mutex<State>,
    tx: watch::Sender<Reachability>,
    span: Span,
}

impl Default for ReachabilityTracker {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

impl ReachabilityTracker {
    /// `threshold` is clamped to at least 1.
    pub fn new(threshold: u32) -> Self {
        let (tx, _) = watch::channel(Reachability::Unknown);
        Self {
            threshold: threshold.max(1),
            state: Mutex::new(State {
                derived: Reachability::Unknown,
                override_state: None,
                pending: None,
                inconclusive_streak: 0,
            }),
            tx,
            span: tracing::info_span!("reachability"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Reported state: the override when set, otherwise the probe-derived state.
    pub fn state(&self) -> Reachability {
        self.state.lock().effective()
    }

    /// State derived from probes alone, ignoring any override.
    pub fn derived_state(&self) -> Reachability {
        self.state.lock().derived
    }

    pub fn override_state(&self) -> Option<Reachability> {
        self.state.lock().override_state
    }

    /// Pin the reported state, or clear the pin with `None`.
    pub fn set_override(&self, state: Option<Reachability>) {
        let mut guard = self.state.lock();
        guard.override_state = state;
        info!(parent: &self.span, override_state = ?state, derived = %guard.derived.as_str(), "Reachability override updated");
        self.publish(guard.effective());
    }

    pub fn record_probe(&self, outcome: ProbeOutcome) -> Reachability {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        match outcome.verdict() {
            None => {
                state.pending = None;
                state.inconclusive_streak = state.inconclusive_streak.saturating_add(1);
                if state.inconclusive_streak >= self.threshold
                    && state.derived != Reachability::Unknown
                {
                    debug!(parent: &self.span, from = %state.derived.as_str(), "Reachability reset after inconclusive probes");
                    state.derived = Reachability::Unknown;
                }
            }
            Some(verdict) => {
                state.inconclusive_streak = 0;
                if verdict == state.derived {
                    state.pending = None;
                } else if state.derived == Reachability::Unknown {
                    debug!(parent: &self.span, to = %verdict.as_str(), "Reachability established");
                    state.derived = verdict;
                    state.pending = None;
                } else {
                    let streak = match state.pending {
                        Some((candidate, n)) if candidate == verdict => n.saturating_add(1),
                        _ => 1,
                    };
                    if streak >= self.threshold {
                        debug!(
                            parent: &self.span,
                            from = %state.derived.as_str(),
                            to = %verdict.as_str(),
                            probes = streak,
                            "Reachability changed"
                        );
                        state.derived = verdict;
                        state.pending = None;
                    } else {
                        state.pending = Some((verdict, streak));
                    }
                }
            }
        }

        let effective = state.effective();
        self.publish(effective);
        effective
    }

    /// Receiver observing the reported state. Dropping it unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<Reachability> {
        self.tx.subscribe()
    }

    fn publish(&self, next: Reachability) {
        self.tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
    use tracing_subscriber::registry::LookupSpan;

    use super::*;

    /// Records the name of the span each event is emitted under.
    #[derive(Clone, Default)]
    struct EventParents(Arc<Mutex<Vec<String>>>);

    impl<S> Layer<S> for EventParents
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
            let name = ctx.event_span(event).map(|span| span.name().to_string());
            self.0.lock().push(name.unwrap_or_default());
        }
    }

    #[test]
    fn test_first_decisive_probe_flips_from_unknown() {
        let tracker = ReachabilityTracker::default();
        assert_eq!(tracker.state(), Reachability::Unknown);
        assert_eq!(
            tracker.record_probe(ProbeOutcome::Reachable),
            Reachability::Public
        );
    }

    #[test]
    fn test_flip_requires_agreeing_streak() {
        let tracker = ReachabilityTracker::new(3);
        tracker.record_probe(ProbeOutcome::Reachable);

        tracker.record_probe(ProbeOutcome::Unreachable);
        tracker.record_probe(ProbeOutcome::Unreachable);
        assert_eq!(tracker.state(), Reachability::Public);

        // A disagreeing probe resets the streak.
        tracker.record_probe(ProbeOutcome::Reachable);
        tracker.record_probe(ProbeOutcome::Unreachable);
        tracker.record_probe(ProbeOutcome::Unreachable);
        assert_eq!(tracker.state(), Reachability::Public);

        tracker.record_probe(ProbeOutcome::Unreachable);
        assert_eq!(tracker.state(), Reachability::Private);
    }

    #[test]
    fn test_inconclusive_probes_return_to_unknown() {
        let tracker = ReachabilityTracker::new(2);
        tracker.record_probe(ProbeOutcome::Unreachable);
        tracker.record_probe(ProbeOutcome::Inconclusive);
        assert_eq!(tracker.state(), Reachability::Private);
        tracker.record_probe(ProbeOutcome::Inconclusive);
        assert_eq!(tracker.state(), Reachability::Unknown);
    }

    #[test]
    fn test_override_pins_reported_state() {
        let tracker = ReachabilityTracker::default();
        tracker.set_override(Some(Reachability::Private));
        tracker.record_probe(ProbeOutcome::Reachable);
        assert_eq!(tracker.state(), Reachability::Private);
        assert_eq!(tracker.derived_state(), Reachability::Public);

        tracker.set_override(None);
        assert_eq!(tracker.state(), Reachability::Public);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let tracker = ReachabilityTracker::default();
        let mut rx = tracker.subscribe();
        assert_eq!(*rx.borrow(), Reachability::Unknown);

        tracker.record_probe(ProbeOutcome::Reachable);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Reachability::Public);

        // Re-confirming the same state does not notify.
        tracker.record_probe(ProbeOutcome::Reachable);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_events_nest_under_injected_span() {
        let parents = EventParents::default();
        let subscriber = tracing_subscriber::registry().with(parents.clone());

        tracing::subscriber::with_default(subscriber, || {
            let tracker =
                ReachabilityTracker::new(1).with_span(tracing::info_span!("node_reachability"));
            tracker.record_probe(ProbeOutcome::Reachable);
            tracker.record_probe(ProbeOutcome::Unreachable);
            tracker.set_override(Some(Reachability::Public));
            assert_eq!(tracker.state(), Reachability::Public);
        });

        let parents = parents.0.lock();
        assert_eq!(parents.len(), 3);
        assert!(parents.iter().all(|name| name == "node_reachability"));
    }
}
