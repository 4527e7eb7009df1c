//! Loopback host for the lagsim emulator.
//!
//! This crate wires the Sans-IO core to a real clock and a process-local
//! transport so impairment settings can be tried without a network:
//! - Tokio for the tick loop
//! - System time and OS randomness, or a seeded stream for replays
//!
//! ## Architecture
//!
//! ```text
//! lagsim
//!   ├─ SystemEnv          (production Environment impl)
//!   ├─ LoopbackTransport  (in-process server/client link)
//!   └─ Driver             (traffic generator + statistics reporting)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod driver;
mod error;
mod loopback;
mod system_env;

pub use driver::{Driver, TickSummary, TrafficConfig, tick_period};
pub use error::DriverError;
pub use loopback::{Inbound, LoopbackTransport};
pub use system_env::SystemEnv;
