//! Tick-driven traffic generator over the emulated loopback link.
//!
//! Each tick the driver sends a burst from the client to the server and
//! from the server to every peer, alternating reliable and unreliable
//! channels, then releases due packets, reads the inboxes and advances the
//! statistics window.
//!
//! Payloads start with a big-endian sequence number so the receiving side
//! can spot packets that arrive behind a later one on the same flow.

use std::{collections::BTreeMap, time::Duration};

use lagsim_core::{
    ChannelId, Direction, Environment, ImpairmentConfig, LatencyTransport, PeerId, Role,
    Statistics, Transport,
};

use crate::{
    error::DriverError,
    loopback::{Inbound, LoopbackTransport},
};

/// Bytes reserved at the front of each payload for the sequence number.
const SEQUENCE_LEN: usize = 8;

/// Shape of the generated traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficConfig {
    /// Packets each sender emits per tick.
    pub packets_per_tick: usize,
    /// Payload length, including the sequence number.
    pub payload_size: usize,
    /// Number of connected clients the server sends to.
    pub peers: u64,
    /// Channel used for unreliable sends.
    pub unreliable_channel: ChannelId,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self { packets_per_tick: 4, payload_size: 64, peers: 1, unreliable_channel: 1 }
    }
}

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Packets handed to the emulator.
    pub sent: usize,
    /// Packets that reached an inbox.
    pub delivered: usize,
    /// Unreliable packets that arrived behind a later one.
    pub out_of_order: usize,
    /// Reliable packets that arrived behind a later one.
    pub reliable_violations: usize,
    /// Whether a statistics window was published.
    pub published: bool,
}

/// Interval between host ticks at `tick_hz` ticks per second.
///
/// Rejects rates whose period rounds down to zero.
pub fn tick_period(tick_hz: u32) -> Result<Duration, DriverError> {
    Duration::from_secs(1)
        .checked_div(tick_hz)
        .filter(|period| !period.is_zero())
        .ok_or(DriverError::Traffic("tick rate must be between 1 and 1e9 per second"))
}

/// Receiving end of one flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Receiver {
    Server,
    Client(PeerId),
}

/// Loopback traffic driver.
pub struct Driver<E: Environment> {
    transport: LatencyTransport<LoopbackTransport, E>,
    traffic: TrafficConfig,
    next_sequence: u64,
    highest_seen: BTreeMap<(Receiver, ChannelId), u64>,
}

impl<E: Environment> Driver<E> {
    /// Build a driver with its own emulator.
    pub fn new(
        env: E,
        config: ImpairmentConfig,
        traffic: TrafficConfig,
    ) -> Result<Self, DriverError> {
        if traffic.payload_size < SEQUENCE_LEN {
            return Err(DriverError::Traffic("payload size must hold an 8 byte sequence"));
        }

        let transport = LatencyTransport::new(LoopbackTransport::new(), env, config)?;
        if traffic.unreliable_channel == transport.default_reliable_channel() {
            return Err(DriverError::Traffic("unreliable channel collides with reliable"));
        }

        Ok(Self { transport, traffic, next_sequence: 0, highest_seen: BTreeMap::new() })
    }

    /// Emulator under the driver.
    pub fn transport(&self) -> &LatencyTransport<LoopbackTransport, E> {
        &self.transport
    }

    /// Mutable emulator, e.g. to change the configuration mid-run.
    pub fn transport_mut(&mut self) -> &mut LatencyTransport<LoopbackTransport, E> {
        &mut self.transport
    }

    /// Statistics collector, if enabled.
    pub fn statistics(&self) -> Option<&Statistics> {
        self.transport.statistics()
    }

    /// Run one host tick.
    pub fn tick(&mut self) -> TickSummary {
        let mut summary = TickSummary { sent: self.send_burst(), ..TickSummary::default() };

        for direction in Direction::ALL {
            self.transport.iterate_outgoing(direction);
        }

        let inbound = self.transport.inner_mut().recv_server();
        self.receive(Receiver::Server, inbound, &mut summary);
        for peer in 1..=self.traffic.peers {
            let inbound = self.transport.inner_mut().recv_client(PeerId(peer));
            self.receive(Receiver::Client(PeerId(peer)), inbound, &mut summary);
        }

        summary.published = self.transport.update();
        if summary.published {
            self.log_window();
        }

        summary
    }

    /// Discard pending packets and stop the transport.
    ///
    /// Returns how many packets never reached their receiver.
    pub fn shutdown(&mut self) -> usize {
        let pending = self.transport.pending_packets();
        self.transport.shutdown();
        tracing::info!("Driver stopped with {} undelivered packets", pending);
        pending
    }

    fn send_burst(&mut self) -> usize {
        let reliable = self.transport.default_reliable_channel();
        let mut sent = 0;

        for i in 0..self.traffic.packets_per_tick {
            let channel_id = if i % 2 == 0 { reliable } else { self.traffic.unreliable_channel };

            let payload = self.next_payload();
            self.transport.send_to_server(channel_id, &payload);
            sent += 1;

            for peer in 1..=self.traffic.peers {
                let payload = self.next_payload();
                self.transport.send_to_client(channel_id, &payload, PeerId(peer));
                sent += 1;
            }
        }

        sent
    }

    fn next_payload(&mut self) -> Vec<u8> {
        let mut payload = vec![0u8; self.traffic.payload_size];
        payload[..SEQUENCE_LEN].copy_from_slice(&self.next_sequence.to_be_bytes());
        self.next_sequence += 1;
        payload
    }

    fn receive(&mut self, receiver: Receiver, inbound: Vec<Inbound>, summary: &mut TickSummary) {
        let role = match receiver {
            Receiver::Server => Role::Server,
            Receiver::Client(_) => Role::Client,
        };
        let reliable = self.transport.default_reliable_channel();

        for packet in inbound {
            self.transport.observe_received(role, packet.payload.len());
            summary.delivered += 1;

            let Some(sequence) = read_sequence(&packet.payload) else {
                continue;
            };

            let highest = self.highest_seen.entry((receiver, packet.channel_id)).or_insert(0);
            if sequence < *highest {
                if packet.channel_id == reliable {
                    tracing::error!(
                        "Reliable packet {} arrived after {} at {:?}",
                        sequence,
                        highest,
                        receiver
                    );
                    summary.reliable_violations += 1;
                } else {
                    summary.out_of_order += 1;
                }
            } else {
                *highest = sequence;
            }
        }
    }

    fn log_window(&self) {
        let Some(stats) = self.transport.statistics() else {
            return;
        };

        for role in [Role::Client, Role::Server] {
            tracing::info!("{} statistics\n{}", role, stats.report(role));
        }
    }
}

fn read_sequence(payload: &[u8]) -> Option<u64> {
    let bytes = payload.get(..SEQUENCE_LEN)?;
    Some(u64::from_be_bytes(bytes.try_into().ok()?))
}
