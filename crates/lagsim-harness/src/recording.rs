//! Transport that records what the emulator hands it.

use bytes::Bytes;
use lagsim_core::{ChannelId, Destination, Direction, PeerId, Transport};

/// One packet as it reached the real transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Where the packet was sent.
    pub destination: Destination,
    /// Channel it was sent on.
    pub channel_id: ChannelId,
    /// Payload bytes.
    pub payload: Bytes,
    /// Number of flushes for the packet's direction before it arrived.
    pub flushes_before: usize,
}

/// In-memory [`Transport`] that keeps every delivery and flush.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    deliveries: Vec<Delivery>,
    flushes: [usize; 2],
    reliable_channel: ChannelId,
    shut_down: bool,
}

impl RecordingTransport {
    /// Recorder using the default reliable channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorder that reports `channel` as its reliable channel.
    pub fn with_reliable_channel(channel: ChannelId) -> Self {
        Self { reliable_channel: channel, ..Self::default() }
    }

    /// Every delivery in arrival order.
    pub fn deliveries(&self) -> &[Delivery] {
        &self.deliveries
    }

    /// Deliveries travelling in `direction`.
    pub fn deliveries_to(&self, direction: Direction) -> impl Iterator<Item = &Delivery> {
        self.deliveries.iter().filter(move |d| d.destination.direction() == direction)
    }

    /// Payloads of every delivery, in arrival order.
    pub fn payloads(&self) -> Vec<Bytes> {
        self.deliveries.iter().map(|d| d.payload.clone()).collect()
    }

    /// Flush calls for `direction`.
    pub fn flushes(&self, direction: Direction) -> usize {
        self.flushes[flush_slot(direction)]
    }

    /// Whether `shutdown` was called.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Forget recorded deliveries, keeping flush counts.
    pub fn take_deliveries(&mut self) -> Vec<Delivery> {
        std::mem::take(&mut self.deliveries)
    }

    fn record(&mut self, destination: Destination, channel_id: ChannelId, payload: &[u8]) {
        let flushes_before = self.flushes[flush_slot(destination.direction())];
        self.deliveries.push(Delivery {
            destination,
            channel_id,
            payload: Bytes::copy_from_slice(payload),
            flushes_before,
        });
    }
}

const fn flush_slot(direction: Direction) -> usize {
    match direction {
        Direction::ClientToServer => 0,
        Direction::ServerToClient => 1,
    }
}

impl Transport for RecordingTransport {
    fn send_to_server(&mut self, channel_id: ChannelId, payload: &[u8]) {
        self.record(Destination::Server, channel_id, payload);
    }

    fn send_to_client(&mut self, channel_id: ChannelId, payload: &[u8], peer: PeerId) {
        self.record(Destination::Client(peer), channel_id, payload);
    }

    fn iterate_outgoing(&mut self, direction: Direction) {
        self.flushes[flush_slot(direction)] += 1;
    }

    fn default_reliable_channel(&self) -> ChannelId {
        self.reliable_channel
    }

    fn shutdown(&mut self) {
        self.shut_down = true;
    }
}
