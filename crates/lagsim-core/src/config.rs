//! Impairment configuration.
//!
//! One struct drives the whole scheduler. It can be swapped at runtime; a
//! replacement is validated first and packets already queued keep their
//! release times.
//!
//! # Invariants
//!
//! - Probabilities lie within `[0, 1]` (NaN is rejected)
//! - Each latency is at most [`MAX_LATENCY`], so `now + latency` cannot
//!   overflow the host clock
//! - The statistics window is longer than zero

use std::time::Duration;

use crate::error::ConfigError;

/// Upper bound for `base_latency` and `extra_reliable_latency`.
pub const MAX_LATENCY: Duration = Duration::from_secs(60 * 60);

/// Configuration for the impairment scheduler.
///
/// Defaults keep the simulation switched on but otherwise leave the link
/// untouched: no latency, no loss, no reordering.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpairmentConfig {
    /// When `false`, submissions bypass the delay queues and reach the
    /// underlying transport immediately.
    pub enabled: bool,

    /// Latency added to every packet on every channel.
    pub base_latency: Duration,

    /// Probability `[0.0, 1.0]` that a packet suffers a loss event.
    pub loss_probability: f64,

    /// Latency added on top of `base_latency` when a reliable packet is
    /// "lost". Models loss detection plus the resend round trip.
    pub extra_reliable_latency: Duration,

    /// Probability `[0.0, 1.0]` that an unreliable packet overtakes the one
    /// queued before it.
    pub reorder_probability: f64,

    /// Whether sent/received counters are collected.
    pub statistics_enabled: bool,

    /// Length of one statistics window.
    pub statistics_window: Duration,

    /// Log a warning when a single delay queue grows past this many packets.
    /// Queues are never capped.
    pub queue_depth_warning: Option<usize>,
}

impl Default for ImpairmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_latency: Duration::ZERO,
            loss_probability: 0.0,
            extra_reliable_latency: Duration::from_millis(20),
            reorder_probability: 0.0,
            statistics_enabled: true,
            statistics_window: Duration::from_secs(1),
            queue_depth_warning: Some(10_000),
        }
    }
}

impl ImpairmentConfig {
    /// Perfect link: no impairments. Useful as a baseline.
    pub fn perfect() -> Self {
        Self::default()
    }

    /// Typical poor mobile link: 150 ms latency, 5 % loss, 2 % reordering.
    pub fn degraded() -> Self {
        Self {
            base_latency: Duration::from_millis(150),
            loss_probability: 0.05,
            extra_reliable_latency: Duration::from_millis(300),
            reorder_probability: 0.02,
            ..Self::default()
        }
    }

    /// Check every field for a value the scheduler cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability("loss_probability", self.loss_probability)?;
        check_probability("reorder_probability", self.reorder_probability)?;
        check_latency("base_latency", self.base_latency)?;
        check_latency("extra_reliable_latency", self.extra_reliable_latency)?;

        if self.statistics_window.is_zero() {
            return Err(ConfigError::EmptyStatisticsWindow);
        }

        Ok(())
    }
}

fn check_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ProbabilityOutOfRange { field, value })
    }
}

fn check_latency(field: &'static str, value: Duration) -> Result<(), ConfigError> {
    if value <= MAX_LATENCY {
        Ok(())
    } else {
        Err(ConfigError::LatencyTooLarge { field, value, max: MAX_LATENCY })
    }
}
