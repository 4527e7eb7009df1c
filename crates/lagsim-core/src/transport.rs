//! Contract of the real transport underneath the emulator.

use crate::channel::{ChannelId, DEFAULT_RELIABLE_CHANNEL, Direction, PeerId};

/// The subset of a packet transport the emulator drives.
///
/// Everything else a transport does (connection lifecycle, addressing, MTU)
/// stays on the concrete type and is reached through
/// [`crate::LatencyTransport::inner`].
pub trait Transport {
    /// Deliver one packet to the server.
    fn send_to_server(&mut self, channel_id: ChannelId, payload: &[u8]);

    /// Deliver one packet to a connected client.
    fn send_to_client(&mut self, channel_id: ChannelId, payload: &[u8], peer: PeerId);

    /// Perform the actual outgoing I/O for `direction`.
    ///
    /// Called once per tick after every due packet has been handed over.
    fn iterate_outgoing(&mut self, direction: Direction);

    /// Channel the transport guarantees ordered, lossless delivery on.
    fn default_reliable_channel(&self) -> ChannelId {
        DEFAULT_RELIABLE_CHANNEL
    }

    /// Stop the transport.
    fn shutdown(&mut self) {}
}
