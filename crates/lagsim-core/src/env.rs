//! Environment abstraction for deterministic emulation.
//!
//! The `Environment` trait decouples the scheduler from system resources
//! (time and randomness). This enables:
//!
//! - Deterministic Simulation: a virtual clock and seeded RNG make every loss
//!   and reorder decision replayable.
//!
//! - Production Runtime: the host loop's monotonic clock and OS entropy drive
//!   the same scheduler without code changes.
//!
//! # Invariants
//!
//! - Monotonicity: `env.now()` must never go backwards
//! - Determinism: Given the same seed, `random_bytes()` produces the same
//!   sequence
//! - Isolation: Implementations must not share global state

use std::{
    fmt::Debug,
    ops::{Add, Sub},
    time::Duration,
};

/// A point on the environment's clock.
///
/// Blanket-implemented for every type with the required arithmetic, so both
/// `std::time::Instant` and virtual simulation instants qualify.
pub trait Timestamp:
    Copy + Ord + Debug + Add<Duration, Output = Self> + Sub<Output = Duration>
{
}

impl<T> Timestamp for T where
    T: Copy + Ord + Debug + Add<Duration, Output = T> + Sub<Output = Duration>
{
}

/// Abstract environment providing time and randomness.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// 1. Time monotonicity: `now()` never goes backwards
/// 2. Replayability: simulation implementations derive `random_bytes()` from
///    a seed that is logged or otherwise recoverable
/// 3. Minimal panics: Methods are infallible
pub trait Environment: Clone {
    /// Clock type produced by [`Environment::now`].
    type Instant: Timestamp;

    /// Returns the current time.
    ///
    /// # Invariants
    ///
    /// - Monotonicity: This method MUST return values that never decrease
    ///   within a single execution context.
    fn now(&self) -> Self::Instant;

    /// Fills the provided buffer with random bytes.
    ///
    /// Given the same RNG seed, this produces the same sequence of bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Generates a uniform `f64` in `[0, 1)`.
    ///
    /// Uses the top 53 bits of one `random_u64()` so every representable
    /// value is equally likely and `1.0` is never returned.
    #[allow(clippy::cast_precision_loss)]
    fn random_unit(&self) -> f64 {
        (self.random_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}
