//! Transport facade.
//!
//! `LatencyTransport` wraps a real [`Transport`] and routes every outgoing
//! send through the [`Scheduler`]. Drained packets go to the inner
//! transport's matching send method, followed by its own flush step. Inbound
//! traffic is only observed for statistics.

use crate::{
    channel::{ChannelClass, ChannelId, Destination, Direction, PeerId, Role},
    config::ImpairmentConfig,
    env::Environment,
    error::ConfigError,
    scheduler::{Scheduler, Submission},
    statistics::Statistics,
    transport::Transport,
};

/// Network-condition emulator in front of a real transport.
///
/// Implements [`Transport`] itself, so it can be dropped in wherever the
/// wrapped transport was used.
pub struct LatencyTransport<T, E: Environment> {
    /// The real transport.
    inner: T,

    /// Clock and randomness.
    env: E,

    /// Delay queues and policy.
    scheduler: Scheduler<E>,
}

impl<T: Transport, E: Environment> LatencyTransport<T, E> {
    /// Wrap `inner`, classifying channels by its reliable channel id.
    pub fn new(inner: T, env: E, config: ImpairmentConfig) -> Result<Self, ConfigError> {
        let scheduler = Scheduler::new(env.clone(), config, inner.default_reliable_channel())?;
        Ok(Self { inner, env, scheduler })
    }

    /// The wrapped transport, for everything the emulator passes through.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Mutable access to the wrapped transport.
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Active configuration.
    pub fn config(&self) -> &ImpairmentConfig {
        self.scheduler.config()
    }

    /// Replace the configuration at runtime. Queued packets are kept.
    pub fn set_config(&mut self, config: ImpairmentConfig) -> Result<(), ConfigError> {
        self.scheduler.set_config(config)
    }

    /// The scheduler, for queue inspection.
    pub fn scheduler(&self) -> &Scheduler<E> {
        &self.scheduler
    }

    /// Statistics collector, if enabled.
    pub fn statistics(&self) -> Option<&Statistics> {
        self.scheduler.statistics()
    }

    /// Packets pending in one queue.
    pub fn queue_depth(&self, direction: Direction, class: ChannelClass) -> usize {
        self.scheduler.queue_depth(direction, class)
    }

    /// Packets pending across all queues.
    pub fn pending_packets(&self) -> usize {
        self.scheduler.pending_packets()
    }

    /// Record a packet the inner transport delivered to `role`.
    ///
    /// The payload itself is never inspected or modified.
    pub fn observe_received(&mut self, role: Role, len: usize) {
        self.scheduler.record_received(role, len);
    }

    /// Per-frame update: advances the statistics window.
    ///
    /// Returns `true` when a new window was published.
    pub fn update(&mut self) -> bool {
        let published = self.scheduler.tick_statistics(self.env.now());

        if published && let Some(stats) = self.scheduler.statistics() {
            for role in [Role::Client, Role::Server] {
                let last = stats.last_window(role);
                tracing::debug!(
                    "{} window: sent {} packets ({}), received {} packets ({})",
                    role,
                    last.sent_packets,
                    last.sent_bytes_display(),
                    last.received_packets,
                    last.received_bytes_display()
                );
            }
        }

        published
    }

    fn submit(&mut self, destination: Destination, channel_id: ChannelId, payload: &[u8]) {
        let now = self.env.now();
        if self.scheduler.submit(now, destination, channel_id, payload) == Submission::Bypassed {
            forward(&mut self.inner, destination, channel_id, payload);
        }
    }
}

impl<T: Transport, E: Environment> Transport for LatencyTransport<T, E> {
    fn send_to_server(&mut self, channel_id: ChannelId, payload: &[u8]) {
        self.submit(Destination::Server, channel_id, payload);
    }

    fn send_to_client(&mut self, channel_id: ChannelId, payload: &[u8], peer: PeerId) {
        self.submit(Destination::Client(peer), channel_id, payload);
    }

    /// Forward every due packet for `direction`, then let the inner
    /// transport flush.
    fn iterate_outgoing(&mut self, direction: Direction) {
        let now = self.env.now();
        for packet in self.scheduler.drain(now, direction) {
            forward(&mut self.inner, packet.destination, packet.channel_id, &packet.payload);
        }
        self.inner.iterate_outgoing(direction);
    }

    fn default_reliable_channel(&self) -> ChannelId {
        self.inner.default_reliable_channel()
    }

    /// Discard pending packets without delivery, then stop the inner
    /// transport.
    fn shutdown(&mut self) {
        self.scheduler.shutdown();
        self.inner.shutdown();
    }
}

fn forward<T: Transport>(
    inner: &mut T,
    destination: Destination,
    channel_id: ChannelId,
    payload: &[u8],
) {
    match destination {
        Destination::Server => inner.send_to_server(channel_id, payload),
        Destination::Client(peer) => inner.send_to_client(channel_id, payload, peer),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::ScriptedEnv;

    #[derive(Default)]
    struct Log {
        events: Vec<String>,
        shut_down: bool,
    }

    impl Transport for Log {
        fn send_to_server(&mut self, channel_id: ChannelId, payload: &[u8]) {
            self.events.push(format!("server ch{channel_id} {payload:?}"));
        }

        fn send_to_client(&mut self, channel_id: ChannelId, payload: &[u8], peer: PeerId) {
            self.events.push(format!("{peer} ch{channel_id} {payload:?}"));
        }

        fn iterate_outgoing(&mut self, direction: Direction) {
            self.events.push(format!("flush {direction:?}"));
        }

        fn shutdown(&mut self) {
            self.shut_down = true;
        }
    }

    fn transport(config: ImpairmentConfig) -> (LatencyTransport<Log, ScriptedEnv>, ScriptedEnv) {
        let env = ScriptedEnv::new();
        let transport = LatencyTransport::new(Log::default(), env.clone(), config)
            .expect("valid config");
        (transport, env)
    }

    #[test]
    fn forwards_due_packets_then_flushes() {
        let (mut transport, env) = transport(ImpairmentConfig {
            base_latency: Duration::from_millis(50),
            ..Default::default()
        });

        transport.send_to_client(1, &[7], PeerId(2));
        transport.iterate_outgoing(Direction::ServerToClient);
        assert_eq!(transport.inner().events, vec!["flush ServerToClient"]);

        env.advance(Duration::from_millis(50));
        transport.iterate_outgoing(Direction::ServerToClient);
        assert_eq!(
            transport.inner().events,
            vec!["flush ServerToClient", "peer-2 ch1 [7]", "flush ServerToClient"]
        );
    }

    #[test]
    fn disabled_sends_immediately() {
        let (mut transport, _env) =
            transport(ImpairmentConfig { enabled: false, ..Default::default() });

        transport.send_to_server(0, &[1, 2]);

        assert_eq!(transport.inner().events, vec!["server ch0 [1, 2]"]);
        assert_eq!(transport.pending_packets(), 0);
    }

    #[test]
    fn shutdown_discards_and_stops_inner() {
        let (mut transport, env) = transport(ImpairmentConfig {
            base_latency: Duration::from_millis(10),
            ..Default::default()
        });
        transport.send_to_server(0, &[1]);

        transport.shutdown();
        env.advance(Duration::from_secs(1));
        transport.iterate_outgoing(Direction::ClientToServer);

        assert!(transport.inner().shut_down);
        assert_eq!(transport.inner().events, vec!["flush ClientToServer"]);
    }

    #[test]
    fn update_publishes_received_counts() {
        let (mut transport, env) = transport(ImpairmentConfig::default());

        assert!(!transport.update());
        transport.observe_received(Role::Server, 64);
        env.advance(Duration::from_secs(1));
        assert!(transport.update());

        let stats = transport.statistics().expect("statistics enabled");
        assert_eq!(stats.last_window(Role::Server).received_packets, 1);
        assert_eq!(stats.last_window(Role::Server).received_bytes, 64);
    }
}
