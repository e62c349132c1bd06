//! Rate limiting logic and state management.

mod backend;
mod clock;
mod identity;
mod sweeper;
mod window;

pub use backend::RateLimiterBackend;
#[cfg(test)]
pub use clock::ManualClock;
pub use clock::{Clock, SystemClock};
pub use identity::ClientIdentity;
pub use sweeper::IdleSweeper;
pub use window::{RateLimitDecision, RateLimitPolicy, WindowStore};
