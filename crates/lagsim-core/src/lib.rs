//! Sans-IO core of the lagsim network-condition emulator.
//!
//! The emulator sits between an application's packet sends and a real
//! transport. Outgoing packets are delayed, dropped, or reordered according
//! to an [`ImpairmentConfig`], then released to the transport on the host's
//! tick.
//!
//! ## Architecture
//!
//! ```text
//! lagsim-core
//!   ├─ Environment       (clock + randomness, supplied by the host)
//!   ├─ ImpairmentPolicy  (loss / reorder rolls)
//!   ├─ DelayQueue        (one per direction × channel class)
//!   ├─ Scheduler         (submit + time-gated drain)
//!   ├─ Statistics        (windowed sent/received counters)
//!   └─ LatencyTransport  (facade over a real Transport)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let mut transport = LatencyTransport::new(udp, env, ImpairmentConfig::degraded())?;
//!
//! // Application sends go through the emulator.
//! transport.send_to_server(channel, &payload);
//!
//! // Once per tick: release due packets, then let the real transport flush.
//! transport.iterate_outgoing(Direction::ClientToServer);
//! transport.update();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod channel;
pub mod config;
pub mod env;
pub mod error;
pub mod facade;
pub mod packet;
pub mod policy;
pub mod queue;
pub mod scheduler;
pub mod statistics;
pub mod transport;

#[cfg(test)]
mod testing;

pub use channel::{
    ChannelClass, ChannelId, DEFAULT_RELIABLE_CHANNEL, Destination, Direction, PeerId, Role,
};
pub use config::{ImpairmentConfig, MAX_LATENCY};
pub use env::{Environment, Timestamp};
pub use error::ConfigError;
pub use facade::LatencyTransport;
pub use packet::Packet;
pub use policy::{ImpairmentPolicy, Verdict};
pub use queue::DelayQueue;
pub use scheduler::{Scheduler, Submission};
pub use statistics::{RoleStats, Statistics, StatisticsReport, format_bytes};
pub use transport::Transport;
