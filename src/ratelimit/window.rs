//! Sliding-window request log.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::backend::RateLimiterBackend;
use super::identity::ClientIdentity;

/// The limit applied to every client identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Requests admitted within one window
    pub max_requests: u64,
    /// Length of the trailing window
    pub window: Duration,
}

impl RateLimitPolicy {
    /// Create a policy. Both values must be non-zero; configuration
    /// validation enforces this before a store is built.
    pub fn new(max_requests: u64, window: Duration) -> Self {
        debug_assert!(max_requests > 0, "max_requests must be positive");
        debug_assert!(!window.is_zero(), "window must be positive");
        Self {
            max_requests,
            window,
        }
    }

    /// The window rounded up to whole seconds, as reported in `Retry-After`.
    pub fn window_secs(&self) -> u64 {
        let secs = self.window.as_secs();
        if self.window.subsec_nanos() > 0 {
            secs.saturating_add(1)
        } else {
            secs
        }
    }
}

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Requests left in the current window after this one
    pub remaining: u64,
    /// When a full window will have elapsed from this check
    pub reset_at: Duration,
    /// The policy the decision was computed against
    pub policy: RateLimitPolicy,
}

impl RateLimitDecision {
    /// `reset_at` truncated to whole epoch seconds.
    pub fn reset_at_secs(&self) -> u64 {
        self.reset_at.as_secs()
    }
}

/// Timestamps of admitted requests for one identity, in arrival order.
#[derive(Debug, Default)]
struct WindowRecord {
    timestamps: VecDeque<Duration>,
}

impl WindowRecord {
    /// Drop every timestamp at least `window` old. A timestamp exactly
    /// `window` old is expired.
    fn prune(&mut self, now: Duration, window: Duration) {
        self.timestamps.retain(|&t| now.saturating_sub(t) < window);
    }

    fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether any timestamp is still inside the window at `now`.
    ///
    /// The wall clock can step backwards, so the record is not assumed to be
    /// sorted.
    fn is_active(&self, now: Duration, window: Duration) -> bool {
        self.timestamps
            .iter()
            .any(|&t| now.saturating_sub(t) < window)
    }
}

/// In-process sliding-window rate limiter keyed by client identity.
///
/// All records live behind a single mutex held across the whole
/// prune-check-record sequence, so two concurrent requests from the same
/// client can never both claim the last slot.
pub struct WindowStore {
    policy: RateLimitPolicy,
    records: Mutex<HashMap<ClientIdentity, WindowRecord>>,
}

impl WindowStore {
    /// Create an empty store enforcing `policy`.
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// Decide whether `identity` may make a request at `now`, recording it
    /// if admitted. Rejected requests leave no trace in the record.
    pub fn check_and_record(&self, identity: &ClientIdentity, now: Duration) -> RateLimitDecision {
        let policy = self.policy;
        let reset_at = now.saturating_add(policy.window);

        let mut records = self.records.lock();
        let record = records.entry(identity.clone()).or_default();
        record.prune(now, policy.window);

        let used = record.len() as u64;
        trace!(identity = %identity, used = used, "Checking window");

        if used >= policy.max_requests {
            debug!(
                identity = %identity,
                limit = policy.max_requests,
                "Rate limit exceeded"
            );
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at,
                policy,
            };
        }

        record.timestamps.push_back(now);

        RateLimitDecision {
            allowed: true,
            remaining: policy.max_requests - used - 1,
            reset_at,
            policy,
        }
    }

    /// Number of requests from `identity` still inside the window at `now`.
    pub fn in_window(&self, identity: &ClientIdentity, now: Duration) -> usize {
        let records = self.records.lock();
        records.get(identity).map_or(0, |record| {
            record
                .timestamps
                .iter()
                .filter(|&&t| now.saturating_sub(t) < self.policy.window)
                .count()
        })
    }

    /// Remove every record with no request inside the window at `now`.
    ///
    /// Returns the number of identities evicted.
    pub fn evict_idle(&self, now: Duration) -> usize {
        let window = self.policy.window;
        let mut records = self.records.lock();
        let before = records.len();

        records.retain(|_, record| record.is_active(now, window));

        let evicted = before - records.len();
        if evicted > 0 {
            debug!(evicted = evicted, remaining = records.len(), "Evicted idle clients");
        }
        evicted
    }

    /// Number of identities currently holding a record.
    pub fn identity_count(&self) -> usize {
        self.records.lock().len()
    }

    /// Drop all records.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl RateLimiterBackend for WindowStore {
    fn check_and_record(&self, identity: &ClientIdentity, now: Duration) -> RateLimitDecision {
        WindowStore::check_and_record(self, identity, now)
    }

    fn policy(&self) -> RateLimitPolicy {
        self.policy
    }
}
