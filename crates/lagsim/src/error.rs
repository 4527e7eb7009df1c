//! Driver error types.

use lagsim_core::ConfigError;

/// Errors that stop the loopback driver from starting.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The impairment configuration was rejected.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Traffic settings the driver cannot honour.
    #[error("invalid traffic settings: {0}")]
    Traffic(&'static str),
}
