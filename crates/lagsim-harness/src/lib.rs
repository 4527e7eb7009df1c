//! Deterministic simulation harness for lagsim testing.
//!
//! Provides a virtual-clock, seeded-RNG implementation of the `Environment`
//! trait, a `Transport` that records everything handed to it, and a
//! scripted `Scenario` runner with oracle checks.
//!
//! # Why Deterministic Simulation?
//!
//! Loss and reorder decisions are random draws, and release times depend on
//! the clock. With a fixed seed and a clock that only moves when told to,
//! every run of a scenario makes the same decisions, so a failing property
//! test can be replayed exactly.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use lagsim_core::ImpairmentConfig;
//! use lagsim_harness::Scenario;
//!
//! let config =
//!     ImpairmentConfig { base_latency: Duration::from_millis(100), ..Default::default() };
//!
//! let world = Scenario::new()
//!     .with_config(config)
//!     .send_to_server(0, b"hello")
//!     .tick()
//!     .advance(Duration::from_millis(100))
//!     .tick()
//!     .run()
//!     .unwrap();
//!
//! assert_eq!(world.deliveries().len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod recording;
pub mod scenario;
pub mod sim_env;

pub use recording::{Delivery, RecordingTransport};
pub use scenario::{Oracle, Scenario, ScenarioError, SimTransport, Step, World};
pub use sim_env::{DEFAULT_SEED, SimEnv, SimInstant};
