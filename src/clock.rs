// Clock abstraction so the readiness polling loop can be tested without
// real sleeps
use std::time::{Duration, Instant};

/// Trait for abstracting time operations to enable testing
pub trait Clock: Send + Sync {
    /// Get the current instant
    fn now(&self) -> Instant;

    /// Sleep for the given duration
    fn sleep(&self, duration: Duration);
}

/// System clock implementation using real time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
