//! Rate limiter trait for abstracting the admission store.

use std::time::Duration;

use super::identity::ClientIdentity;
use super::window::{RateLimitDecision, RateLimitPolicy};

/// Trait for rate limiter implementations.
///
/// The admission middleware only talks to this trait, so an alternative
/// store can be swapped in without touching the HTTP layer. Implementations
/// must make `check_and_record` atomic per identity and must not block on
/// I/O.
pub trait RateLimiterBackend: Send + Sync {
    /// Decide whether `identity` may make a request at `now`, recording it
    /// if admitted.
    fn check_and_record(&self, identity: &ClientIdentity, now: Duration) -> RateLimitDecision;

    /// The limit this backend enforces.
    fn policy(&self) -> RateLimitPolicy;
}
