//! Configuration error types.
//!
//! Submitting and draining packets cannot fail; a simulated loss is an
//! outcome, not an error. Only configuration is validated.

use std::time::Duration;

use thiserror::Error;

/// Rejected impairment configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// A probability was NaN, infinite, or outside `[0, 1]`.
    #[error("{field} must be within [0, 1], got {value}")]
    ProbabilityOutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A latency exceeded the supported maximum.
    #[error("{field} must be at most {max:?}, got {value:?}")]
    LatencyTooLarge {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: Duration,
        /// Largest accepted value.
        max: Duration,
    },

    /// The statistics window has zero length.
    #[error("statistics window must be longer than zero")]
    EmptyStatisticsWindow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ConfigError::ProbabilityOutOfRange { field: "loss_probability", value: 1.5 };
        assert_eq!(err.to_string(), "loss_probability must be within [0, 1], got 1.5");

        let err = ConfigError::LatencyTooLarge {
            field: "base_latency",
            value: Duration::from_secs(7200),
            max: Duration::from_secs(3600),
        };
        assert_eq!(err.to_string(), "base_latency must be at most 3600s, got 7200s");
    }
}
