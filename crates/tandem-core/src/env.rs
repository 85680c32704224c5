//! Environment abstraction for deterministic testing.
//!
//! The `Environment` trait decouples session logic from the system clock.
//! Production code uses the tokio-backed implementation in `tandem-client`;
//! the simulation harness provides a manually advanced virtual clock so that
//! every timestamp in a test run is reproducible.
//!
//! # Invariants
//!
//! - Monotonicity: `env.now()` must never go backwards
//! - Isolation: Implementations must not share global state

use std::{fmt, time::Duration};

/// Abstract environment providing time and async sleeping.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Point in time produced by [`Environment::now`].
    type Instant: Copy + Ord + fmt::Debug + Send + Sync + 'static;

    /// Returns the current time.
    ///
    /// # Invariants
    ///
    /// - Monotonicity: Subsequent calls must return times >= previous calls.
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code awaits this. The state machines are synchronous and
    /// never suspend.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}
