//! Channel, direction, and endpoint identifiers.

use std::fmt;

/// Raw channel id as seen by the underlying transport.
pub type ChannelId = u8;

/// Channel id the transport treats as reliable unless it says otherwise.
pub const DEFAULT_RELIABLE_CHANNEL: ChannelId = 0;

/// Delivery guarantee of a channel, which selects the impairment rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelClass {
    /// Ordered, never lost. Loss shows up as extra latency.
    Reliable,
    /// May be dropped or overtaken by a later packet.
    Unreliable,
}

impl ChannelClass {
    /// Both classes, in drain order.
    pub const ALL: [Self; 2] = [Self::Reliable, Self::Unreliable];

    /// Classify `channel_id` against the transport's reliable channel.
    ///
    /// Every id other than the reliable one is unreliable.
    pub fn classify(channel_id: ChannelId, reliable: ChannelId) -> Self {
        if channel_id == reliable { Self::Reliable } else { Self::Unreliable }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Reliable => 0,
            Self::Unreliable => 1,
        }
    }
}

/// Which way a packet travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Local client sending to the server.
    ClientToServer,
    /// Local server sending to one of its clients.
    ServerToClient,
}

impl Direction {
    /// Both directions.
    pub const ALL: [Self; 2] = [Self::ClientToServer, Self::ServerToClient];

    /// Role whose outgoing traffic travels in this direction.
    pub const fn sender(self) -> Role {
        match self {
            Self::ClientToServer => Role::Client,
            Self::ServerToClient => Role::Server,
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::ClientToServer => 0,
            Self::ServerToClient => 1,
        }
    }
}

/// Where an outgoing packet is headed.
///
/// Client to server traffic carries no peer; the server addresses each of
/// its clients by [`PeerId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// The server this client is connected to.
    Server,
    /// One client connected to the local server.
    Client(PeerId),
}

impl Destination {
    /// Direction a packet to this destination travels.
    pub const fn direction(self) -> Direction {
        match self {
            Self::Server => Direction::ClientToServer,
            Self::Client(_) => Direction::ServerToClient,
        }
    }
}

/// Local role a statistic is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The local client.
    Client,
    /// The local server.
    Server,
}

impl Role {
    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Client => 0,
            Self::Server => 1,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => f.write_str("client"),
            Self::Server => f.write_str("server"),
        }
    }
}

/// Opaque identifier of a remote client connected to the local server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}
