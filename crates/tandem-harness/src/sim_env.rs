//! Virtual clock environment.
//!
//! `SimEnv` never reads the system clock. Time only moves when a test calls
//! [`SimEnv::advance`] or awaits [`Environment::sleep`], so every timestamp in
//! a run is reproducible. Clones share the same clock.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tandem_core::Environment;

/// Point on the virtual timeline, in milliseconds since the clock started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimInstant(u64);

impl SimInstant {
    /// Milliseconds since the clock started.
    pub fn as_millis(self) -> u64 {
        self.0
    }

    /// Time elapsed since `earlier`, saturating at zero.
    pub fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

/// Simulation environment with a shared virtual clock.
#[derive(Debug, Clone, Default)]
pub struct SimEnv {
    clock: Arc<AtomicU64>,
}

impl SimEnv {
    /// Clock starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let millis = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.clock.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        SimInstant(self.clock.load(Ordering::SeqCst))
    }

    /// Advances the virtual clock, then yields to the runtime timer (virtual
    /// under turmoil).
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        self.advance(duration);
        tokio::time::sleep(duration)
    }
}
