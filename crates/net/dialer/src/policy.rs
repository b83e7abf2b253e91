use std::collections::HashMap;

use agi_metrics::names;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{Span, debug, trace};

use crate::config::DialerPolicyConfig;
use crate::outbound::{ConnectionCounts, OutboundPlan};

/// Whether a peer may be dialed again, and after how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "kebab-case")]
pub enum RetryDecision {
    /// Wait `delay_ms` before the next dial, even when it is zero.
    Retry {
        #[serde(rename = "delayMs")]
        delay_ms: u64,
    },
    /// Attempt ceiling reached.
    Exhausted,
}

impl RetryDecision {
    pub fn should_retry(&self) -> bool {
        matches!(self, Self::Retry { .. })
    }
}

#[derive(Debug, Default)]
struct DialState {
    last_attempts: HashMap<String, u64>,
    last_dial_at: u64,
}

/// Backoff scheduling and outbound ratio planning.
///
/// State is guarded by a single mutex, so one policy can be shared by every
/// dial task.
#[derive(Debug)]
pub struct DialerPolicy {
    config: DialerPolicyConfig,
    state: Mutex<DialState>,
    span: Span,
}

impl DialerPolicy {
    pub fn new(config: DialerPolicyConfig) -> Self {
        Self {
            config,
            state: Mutex::new(DialState::default()),
            span: tracing::info_span!("dialer_policy"),
        }
    }

    /// Route this policy's log events under `span`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &DialerPolicyConfig {
        &self.config
    }

    /// Backoff before attempt number `attempt` (1-based; 0 is treated as 1).
    pub fn next_backoff(&self, attempt: u32) -> u64 {
        let backoff = &self.config.backoff;
        let exponent = attempt.max(1) - 1;
        backoff
            .factor
            .checked_pow(exponent)
            .and_then(|multiplier| backoff.initial_ms.checked_mul(multiplier))
            .map_or(backoff.max_ms, |delay| delay.min(backoff.max_ms))
    }

    pub fn should_retry(&self, peer_id: &str, attempt: u32, now_ms: u64) -> RetryDecision {
        if attempt > self.config.max_retries {
            debug!(parent: &self.span, peer = %peer_id, attempt, max_retries = self.config.max_retries, "Dial retries exhausted");
            return RetryDecision::Exhausted;
        }

        let backoff = self.next_backoff(attempt);
        let delay_ms = match self.state.lock().last_attempts.get(peer_id) {
            Some(&last) => backoff.saturating_sub(now_ms.saturating_sub(last)),
            None => 0,
        };
        trace!(parent: &self.span, peer = %peer_id, attempt, delay_ms, "Dial retry scheduled");
        RetryDecision::Retry { delay_ms }
    }

    pub fn record_attempt(&self, peer_id: &str, now_ms: u64) {
        let mut state = self.state.lock();
        state.last_attempts.insert(peer_id.to_owned(), now_ms);
        state.last_dial_at = state.last_dial_at.max(now_ms);
    }

    pub fn last_attempt(&self, peer_id: &str) -> Option<u64> {
        self.state.lock().last_attempts.get(peer_id).copied()
    }

    /// Most recent dial time across all peers. Never moves backwards.
    pub fn last_dial_at(&self) -> u64 {
        self.state.lock().last_dial_at
    }

    /// Drop per-peer state, typically once a connection is established.
    pub fn forget(&self, peer_id: &str) -> bool {
        self.state.lock().last_attempts.remove(peer_id).is_some()
    }

    pub fn tracked_peers(&self) -> usize {
        self.state.lock().last_attempts.len()
    }

    pub fn compute_outbound_plan(&self, counts: ConnectionCounts) -> OutboundPlan {
        let plan = OutboundPlan::compute(&self.config.outbound, counts);
        metrics::gauge!(names::DIALER_OUTBOUND_RATIO).set(plan.ratio);
        if plan.should_dial {
            debug!(
                parent: &self.span,
                ratio = plan.ratio,
                lower_bound = plan.lower_bound,
                deficit = plan.deficit,
                dials = plan.plan_dial_count,
                "Outbound ratio below target"
            );
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::config::{BackoffConfig, OutboundConfig};

    fn policy(initial_ms: u64, max_ms: u64, max_retries: u32) -> DialerPolicy {
        DialerPolicy::new(DialerPolicyConfig {
            max_retries,
            backoff: BackoffConfig {
                initial_ms,
                max_ms,
                factor: 2,
            },
            ..Default::default()
        })
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = policy(100, 1_000, 5);
        assert_eq!(policy.next_backoff(0), 100);
        assert_eq!(policy.next_backoff(1), 100);
        assert_eq!(policy.next_backoff(2), 200);
        assert_eq!(policy.next_backoff(4), 800);
        assert_eq!(policy.next_backoff(6), 1_000);
    }

    #[test]
    fn test_backoff_saturates_on_huge_attempts() {
        let policy = policy(1_000, 60_000, u32::MAX);
        assert_eq!(policy.next_backoff(200), 60_000);
        assert_eq!(policy.next_backoff(u32::MAX), 60_000);
    }

    #[test]
    fn test_should_retry_accounts_for_elapsed_time() {
        let policy = policy(100, 1_000, 3);

        assert_matches!(
            policy.should_retry("peer-a", 2, 5_000),
            RetryDecision::Retry { delay_ms: 0 }
        );

        policy.record_attempt("peer-a", 5_000);
        assert_matches!(
            policy.should_retry("peer-a", 2, 5_050),
            RetryDecision::Retry { delay_ms: 150 }
        );
        assert_matches!(
            policy.should_retry("peer-a", 2, 9_000),
            RetryDecision::Retry { delay_ms: 0 }
        );
        assert_eq!(policy.should_retry("peer-a", 4, 9_000), RetryDecision::Exhausted);
        assert!(policy.should_retry("peer-a", 3, 9_000).should_retry());
    }

    #[test]
    fn test_clock_going_backwards_waits_full_backoff() {
        let policy = policy(100, 1_000, 3);
        policy.record_attempt("peer-a", 5_000);
        assert_matches!(
            policy.should_retry("peer-a", 1, 4_000),
            RetryDecision::Retry { delay_ms: 100 }
        );
    }

    #[test]
    fn test_record_attempt_watermark_is_monotonic() {
        let policy = policy(100, 1_000, 3);
        policy.record_attempt("peer-a", 2_000);
        policy.record_attempt("peer-b", 1_000);
        assert_eq!(policy.last_dial_at(), 2_000);
        assert_eq!(policy.last_attempt("peer-b"), Some(1_000));

        assert!(policy.forget("peer-a"));
        assert!(!policy.forget("peer-a"));
        assert_eq!(policy.tracked_peers(), 1);
        assert_eq!(policy.last_dial_at(), 2_000);
    }

    #[test]
    fn test_outbound_plan_below_target() {
        let policy = DialerPolicy::new(DialerPolicyConfig {
            outbound: OutboundConfig {
                target_ratio: 0.6,
                tolerance: 0.1,
                min_connections: 8,
                reconcile_interval_ms: 30_000,
            },
            ..Default::default()
        });
        let plan = policy.compute_outbound_plan(ConnectionCounts {
            outbound: 20,
            inbound: 40,
            dialable: 50,
        });

        assert_eq!(plan.total, 60);
        assert!((plan.ratio - 1.0 / 3.0).abs() < 1e-9);
        assert!((plan.lower_bound - 0.5).abs() < 1e-9);
        assert!((plan.upper_bound - 0.7).abs() < 1e-9);
        assert!(plan.should_dial);
        assert!(plan.desired_outbound >= 36);
        assert_eq!(plan.deficit, plan.desired_outbound - 20);
    }

    #[test]
    fn test_outbound_plan_without_connections_is_satisfied() {
        let policy = DialerPolicy::new(DialerPolicyConfig::default());
        let plan = policy.compute_outbound_plan(ConnectionCounts::default());
        assert_eq!(plan.ratio, 1.0);
        assert!(!plan.should_dial);
        // The minimum still produces a deficit to fill opportunistically.
        assert_eq!(plan.desired_outbound, 8);
        assert_eq!(plan.deficit, 8);
    }

    #[test]
    fn test_plan_dial_count_ignores_dialable() {
        let policy = DialerPolicy::new(DialerPolicyConfig::default());
        for dialable in [0, 3, 1_000] {
            let plan = policy.compute_outbound_plan(ConnectionCounts {
                outbound: 2,
                inbound: 30,
                dialable,
            });
            assert_eq!(plan.plan_dial_count, plan.deficit);
        }
    }

    #[test]
    fn test_upper_bound_is_clamped() {
        let policy = DialerPolicy::new(DialerPolicyConfig {
            outbound: OutboundConfig {
                target_ratio: 0.95,
                tolerance: 0.1,
                min_connections: 0,
                reconcile_interval_ms: 1_000,
            },
            ..Default::default()
        });
        let plan = policy.compute_outbound_plan(ConnectionCounts {
            outbound: 10,
            inbound: 0,
            dialable: 0,
        });
        assert_eq!(plan.upper_bound, 1.0);
        assert!(!plan.should_dial);
    }

    #[test]
    fn test_retry_decision_json() {
        let json = serde_json::to_value(RetryDecision::Retry { delay_ms: 10 }).unwrap();
        assert_eq!(json["decision"], "retry");
        assert_eq!(json["delayMs"], 10);
    }
}
