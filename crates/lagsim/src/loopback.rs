//! In-process transport connecting one server to any number of clients.
//!
//! Sends are staged per direction and only become visible to the receiver
//! when that direction is flushed, mirroring a socket's outgoing buffer.

use std::collections::{BTreeMap, VecDeque};

use bytes::Bytes;
use lagsim_core::{ChannelId, Direction, PeerId, Transport};

/// Packet waiting in a receiver's inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    /// Channel it arrived on.
    pub channel_id: ChannelId,
    /// Payload bytes.
    pub payload: Bytes,
}

/// Loopback [`Transport`].
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    to_server: Vec<Inbound>,
    to_clients: Vec<(PeerId, Inbound)>,
    server_inbox: VecDeque<Inbound>,
    client_inboxes: BTreeMap<PeerId, VecDeque<Inbound>>,
    shut_down: bool,
}

impl LoopbackTransport {
    /// Empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything flushed to the server so far.
    pub fn recv_server(&mut self) -> Vec<Inbound> {
        self.server_inbox.drain(..).collect()
    }

    /// Take everything flushed to `peer` so far.
    pub fn recv_client(&mut self, peer: PeerId) -> Vec<Inbound> {
        self.client_inboxes
            .get_mut(&peer)
            .map(|inbox| inbox.drain(..).collect())
            .unwrap_or_default()
    }

    /// Clients that have ever been sent a packet.
    pub fn peers(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.client_inboxes.keys().copied()
    }

    /// Packets sent but not yet flushed in `direction`.
    pub fn staged(&self, direction: Direction) -> usize {
        match direction {
            Direction::ClientToServer => self.to_server.len(),
            Direction::ServerToClient => self.to_clients.len(),
        }
    }

    /// Whether `shutdown` was called.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}

impl Transport for LoopbackTransport {
    fn send_to_server(&mut self, channel_id: ChannelId, payload: &[u8]) {
        if self.shut_down {
            return;
        }
        self.to_server.push(Inbound { channel_id, payload: Bytes::copy_from_slice(payload) });
    }

    fn send_to_client(&mut self, channel_id: ChannelId, payload: &[u8], peer: PeerId) {
        if self.shut_down {
            return;
        }
        let inbound = Inbound { channel_id, payload: Bytes::copy_from_slice(payload) };
        self.to_clients.push((peer, inbound));
    }

    fn iterate_outgoing(&mut self, direction: Direction) {
        match direction {
            Direction::ClientToServer => self.server_inbox.extend(self.to_server.drain(..)),
            Direction::ServerToClient => {
                for (peer, inbound) in self.to_clients.drain(..) {
                    self.client_inboxes.entry(peer).or_default().push_back(inbound);
                }
            },
        }
    }

    fn shutdown(&mut self) {
        self.to_server.clear();
        self.to_clients.clear();
        self.shut_down = true;
        tracing::debug!("Loopback transport shut down");
    }
}
