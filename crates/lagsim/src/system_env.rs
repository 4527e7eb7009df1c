//! Production Environment implementation using system time and RNG.
//!
//! `SystemEnv` reads the monotonic clock and draws from OS entropy. When a
//! seed is given the draws come from a ChaCha stream instead, so a run's
//! loss and reorder pattern can be replayed against real time.
//!
//! If OS entropy is unavailable the draws continue from a ChaCha stream
//! seeded at first failure. Zeroed draws would read as 0.0 and turn every
//! configured loss or reorder probability into a certainty.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use lagsim_core::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Production environment using system time and OS randomness.
#[derive(Clone, Default)]
pub struct SystemEnv {
    seeded: Option<Arc<Mutex<ChaCha8Rng>>>,
    fallback: Arc<Mutex<Option<ChaCha8Rng>>>,
}

impl SystemEnv {
    /// Environment drawing from `getrandom`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment drawing from a ChaCha stream seeded with `seed`.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        tracing::info!("Using seeded RNG: {}", seed);
        Self {
            seeded: Some(Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed)))),
            fallback: Arc::default(),
        }
    }

    /// Whether draws are replayable.
    pub fn is_seeded(&self) -> bool {
        self.seeded.is_some()
    }

    fn fill_from_fallback(&self, buffer: &mut [u8]) {
        let mut fallback = self.fallback.lock().unwrap_or_else(PoisonError::into_inner);
        fallback
            .get_or_insert_with(|| {
                let seed = fallback_seed();
                tracing::warn!("Drawing from ChaCha stream seeded with {}", seed);
                ChaCha8Rng::seed_from_u64(seed)
            })
            .fill_bytes(buffer);
    }
}

#[allow(clippy::cast_possible_truncation)]
fn fallback_seed() -> u64 {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_nanos());
    (nanos as u64) ^ ((nanos >> 64) as u64) ^ u64::from(std::process::id())
}

impl Environment for SystemEnv {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        if let Some(rng) = &self.seeded {
            rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
            return;
        }

        if let Err(e) = getrandom::fill(buffer) {
            tracing::error!("getrandom failed: {}", e);
            self.fill_from_fallback(buffer);
        }
    }
}
