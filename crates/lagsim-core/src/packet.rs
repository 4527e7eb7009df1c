//! Pending packet held by a delay queue.

use bytes::Bytes;

use crate::channel::{ChannelClass, ChannelId, Destination};

/// One outgoing packet waiting for its release time.
///
/// The payload is an independent copy of the caller's buffer, so the caller
/// may reuse that buffer as soon as the submission returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet<I> {
    /// Channel the packet was submitted on; forwarded unchanged.
    pub channel_id: ChannelId,
    /// Class derived from `channel_id` at submission.
    pub class: ChannelClass,
    /// Server, or the client the server is sending to.
    pub destination: Destination,
    /// Owned payload bytes.
    pub payload: Bytes,
    /// Earliest instant at which the packet may be forwarded.
    pub release_at: I,
}

impl<I: Copy + Ord> Packet<I> {
    /// Copy `payload` into a new packet.
    pub fn new(
        channel_id: ChannelId,
        class: ChannelClass,
        destination: Destination,
        payload: &[u8],
        release_at: I,
    ) -> Self {
        let payload = Bytes::copy_from_slice(payload);
        Self { channel_id, class, destination, payload, release_at }
    }

    /// Whether the packet may be forwarded at `now`.
    pub fn is_due(&self, now: I) -> bool {
        self.release_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::PeerId;

    #[test]
    fn payload_is_copied() {
        let mut buffer = vec![1u8, 2, 3];
        let packet = Packet::new(1, ChannelClass::Unreliable, Destination::Server, &buffer, 10u64);

        buffer.fill(0);

        assert_eq!(&packet.payload[..], &[1, 2, 3]);
    }

    #[test]
    fn due_at_and_after_release() {
        let packet =
            Packet::new(0, ChannelClass::Reliable, Destination::Client(PeerId(4)), b"x", 10u64);

        assert!(!packet.is_due(9));
        assert!(packet.is_due(10));
        assert!(packet.is_due(11));
    }
}
