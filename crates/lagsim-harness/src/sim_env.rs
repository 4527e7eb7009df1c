//! Deterministic environment: virtual clock plus seeded RNG.

use std::{
    ops::{Add, Sub},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use lagsim_core::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Seed used by [`SimEnv::new`].
pub const DEFAULT_SEED: u64 = 0x5eed;

/// Virtual time since the start of a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimInstant(pub Duration);

impl SimInstant {
    /// Start of the simulation.
    pub const ZERO: Self = Self(Duration::ZERO);

    /// Instant `millis` milliseconds after the start.
    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }
}

impl Add<Duration> for SimInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self {
        Self(self.0.saturating_add(rhs))
    }
}

impl Sub for SimInstant {
    type Output = Duration;

    fn sub(self, other: Self) -> Duration {
        self.0.saturating_sub(other.0)
    }
}

struct SimState {
    now: Duration,
    rng: ChaCha8Rng,
    draws: u64,
}

/// Simulation environment shared by every clone.
///
/// Time only moves when [`SimEnv::advance`] is called. Every call to
/// `random_bytes` counts as one draw, which lets tests assert that a
/// disabled impairment never touches the random stream.
#[derive(Clone)]
pub struct SimEnv {
    seed: u64,
    state: Arc<Mutex<SimState>>,
}

impl SimEnv {
    /// Environment seeded with [`DEFAULT_SEED`].
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    /// Environment whose draws are fully determined by `seed`.
    pub fn with_seed(seed: u64) -> Self {
        tracing::debug!("SimEnv seed: {}", seed);
        let rng = ChaCha8Rng::seed_from_u64(seed);
        let state = SimState { now: Duration::ZERO, rng, draws: 0 };
        Self { seed, state: Arc::new(Mutex::new(state)) }
    }

    /// Seed this environment was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Move the virtual clock forward.
    pub fn advance(&self, by: Duration) {
        let mut state = self.lock();
        state.now = state.now.saturating_add(by);
    }

    /// Move the virtual clock to `instant` if it lies in the future.
    pub fn advance_to(&self, instant: SimInstant) {
        let mut state = self.lock();
        state.now = state.now.max(instant.0);
    }

    /// Random draws consumed so far.
    pub fn draws(&self) -> u64 {
        self.lock().draws
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // State stays consistent even if a test panicked mid-update.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        SimInstant(self.lock().now)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        let mut state = self.lock();
        state.draws += 1;
        state.rng.fill_bytes(buffer);
    }
}
