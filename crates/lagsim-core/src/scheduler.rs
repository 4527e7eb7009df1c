//! Impairment scheduler.
//!
//! Owns the four delay queues (direction × channel class) and decides, on
//! every submission, whether a packet is dropped, how long it is held, and
//! where it enters its queue. Draining releases due packets in queue order.
//!
//! ## Design
//!
//! - Sans-IO: the scheduler never touches a transport. `submit` reports what
//!   it did and `drain` returns the packets the caller must forward.
//! - Time is sampled by the caller and passed in, so one tick sees one
//!   `now` for every queue.
//! - Reliable and unreliable queues drain independently; a stalled head in
//!   one never holds back the other.

use crate::{
    channel::{ChannelClass, ChannelId, Destination, Direction, Role},
    config::ImpairmentConfig,
    env::Environment,
    error::ConfigError,
    packet::Packet,
    policy::{ImpairmentPolicy, Verdict},
    queue::DelayQueue,
    statistics::Statistics,
};

/// Outcome of [`Scheduler::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission<I> {
    /// The packet is held until `release_at`.
    Queued {
        /// Earliest instant the packet will be forwarded.
        release_at: I,
        /// The packet overtook the previously queued packet.
        reordered: bool,
        /// A reliable packet lost its roll and carries the resend latency.
        retransmitted: bool,
    },
    /// Simulated unreliable loss. Not an error.
    Dropped,
    /// Simulation is disabled; the caller forwards the packet directly.
    Bypassed,
}

/// Per-direction, per-class delay queues plus the policy that feeds them.
pub struct Scheduler<E: Environment> {
    /// Randomness for loss and reorder rolls.
    env: E,

    /// Active configuration.
    config: ImpairmentConfig,

    /// Loss/reorder parameters derived from `config`.
    policy: ImpairmentPolicy,

    /// Channel id classified as reliable.
    reliable_channel: ChannelId,

    /// Indexed by `[direction][class]`.
    queues: [[DelayQueue<E::Instant>; 2]; 2],

    /// Depth warning already logged for a queue.
    depth_warned: [[bool; 2]; 2],

    /// Windowed counters; `None` while statistics are disabled.
    statistics: Option<Statistics>,

    /// Instant of the previous statistics tick.
    last_tick: Option<E::Instant>,
}

impl<E: Environment> Scheduler<E> {
    /// Create a scheduler classifying `reliable_channel` as reliable.
    ///
    /// A statistics collector is created when `config.statistics_enabled`.
    pub fn new(
        env: E,
        config: ImpairmentConfig,
        reliable_channel: ChannelId,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let statistics =
            config.statistics_enabled.then(|| Statistics::new(config.statistics_window));

        Ok(Self {
            env,
            policy: ImpairmentPolicy::new(&config),
            config,
            reliable_channel,
            queues: Default::default(),
            depth_warned: [[false; 2]; 2],
            statistics,
            last_tick: None,
        })
    }

    /// Replace the statistics collector, e.g. with one shared by a test.
    ///
    /// Passing `None` disables counting regardless of the configuration.
    pub fn with_statistics(mut self, statistics: Option<Statistics>) -> Self {
        self.statistics = statistics;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &ImpairmentConfig {
        &self.config
    }

    /// Swap in a new configuration without touching queued packets.
    ///
    /// Packets already queued keep their release times. Turning statistics
    /// off discards the collector; turning them on starts a fresh one.
    pub fn set_config(&mut self, config: ImpairmentConfig) -> Result<(), ConfigError> {
        config.validate()?;

        match (&mut self.statistics, config.statistics_enabled) {
            (Some(stats), true) => stats.set_window(config.statistics_window),
            (None, true) => self.statistics = Some(Statistics::new(config.statistics_window)),
            (_, false) => self.statistics = None,
        }

        tracing::info!(
            "Impairment config updated: enabled={} latency={:?} loss={} extra_reliable={:?} \
             reorder={}",
            config.enabled,
            config.base_latency,
            config.loss_probability,
            config.extra_reliable_latency,
            config.reorder_probability
        );

        self.policy = ImpairmentPolicy::new(&config);
        self.config = config;
        Ok(())
    }

    /// Submit one outgoing packet at `now`.
    ///
    /// The payload is copied before this returns. The sender's statistics
    /// count the packet whatever the outcome.
    pub fn submit(
        &mut self,
        now: E::Instant,
        destination: Destination,
        channel_id: ChannelId,
        payload: &[u8],
    ) -> Submission<E::Instant> {
        let direction = destination.direction();

        if let Some(stats) = self.statistics.as_mut() {
            stats.record_sent(direction.sender(), payload.len());
        }

        if !self.config.enabled {
            return Submission::Bypassed;
        }

        let class = ChannelClass::classify(channel_id, self.reliable_channel);

        let (latency, retransmitted) = match self.policy.judge(class, &self.env) {
            Verdict::Deliver { latency, retransmitted } => (latency, retransmitted),
            Verdict::Discard => {
                tracing::debug!(
                    "Simulated loss: {:?} channel {} ({} bytes)",
                    direction,
                    channel_id,
                    payload.len()
                );
                return Submission::Dropped;
            },
        };

        // `validate` caps both latencies at `MAX_LATENCY`.
        let release_at = now + latency;
        let packet = Packet::new(channel_id, class, destination, payload, release_at);

        let queue = &mut self.queues[direction.index()][class.index()];
        let reordered = self.policy.reorders(class, queue.len(), &self.env);
        if reordered {
            tracing::debug!("Simulated reorder: {:?} channel {}", direction, channel_id);
            queue.insert_before_last(packet);
        } else {
            queue.push(packet);
        }

        tracing::trace!(
            "Queued {:?} {:?} packet on channel {} until {:?}",
            direction,
            class,
            channel_id,
            release_at
        );

        self.check_depth(direction, class);

        Submission::Queued { release_at, reordered, retransmitted }
    }

    /// Pop every due packet for `direction`, reliable queue first.
    ///
    /// Each queue stops at its first packet that is not yet due.
    pub fn drain(&mut self, now: E::Instant, direction: Direction) -> Vec<Packet<E::Instant>> {
        let mut due = Vec::new();

        for class in ChannelClass::ALL {
            let queue = &mut self.queues[direction.index()][class.index()];
            while let Some(packet) = queue.pop_due(now) {
                due.push(packet);
            }
            self.rearm_depth_warning(direction, class);
        }

        if !due.is_empty() {
            tracing::trace!("Released {} packets {:?}", due.len(), direction);
        }

        due
    }

    /// Advance the statistics window to `now`.
    ///
    /// The first call only records the baseline. Returns `true` when a
    /// window was published.
    pub fn tick_statistics(&mut self, now: E::Instant) -> bool {
        let elapsed = self.last_tick.map(|last| now - last);
        self.last_tick = Some(now);

        match (self.statistics.as_mut(), elapsed) {
            (Some(stats), Some(elapsed)) => stats.advance(elapsed),
            _ => false,
        }
    }

    /// Count an inbound packet delivered to `role`.
    pub fn record_received(&mut self, role: Role, len: usize) {
        if let Some(stats) = self.statistics.as_mut() {
            stats.record_received(role, len);
        }
    }

    /// Statistics collector, if enabled.
    pub fn statistics(&self) -> Option<&Statistics> {
        self.statistics.as_ref()
    }

    /// Packets pending in one queue.
    pub fn queue_depth(&self, direction: Direction, class: ChannelClass) -> usize {
        self.queues[direction.index()][class.index()].len()
    }

    /// Packets pending across all queues.
    pub fn pending_packets(&self) -> usize {
        self.queues.iter().flatten().map(DelayQueue::len).sum()
    }

    /// Earliest head release time among `direction`'s queues.
    ///
    /// Hosts that sleep between ticks can wake at this instant.
    pub fn next_release(&self, direction: Direction) -> Option<E::Instant> {
        self.queues[direction.index()].iter().filter_map(DelayQueue::next_release).min()
    }

    /// Discard every pending packet without delivering it and reset the
    /// statistics. Returns how many packets were discarded.
    pub fn shutdown(&mut self) -> usize {
        let discarded: usize = self.queues.iter_mut().flatten().map(DelayQueue::clear).sum();
        self.depth_warned = [[false; 2]; 2];
        self.last_tick = None;

        if let Some(stats) = self.statistics.as_mut() {
            stats.reset();
        }

        tracing::info!("Scheduler shut down, discarded {} pending packets", discarded);
        discarded
    }

    fn check_depth(&mut self, direction: Direction, class: ChannelClass) {
        let Some(limit) = self.config.queue_depth_warning else {
            return;
        };

        let depth = self.queues[direction.index()][class.index()].len();
        let warned = &mut self.depth_warned[direction.index()][class.index()];
        if depth > limit && !*warned {
            *warned = true;
            tracing::warn!(
                "{:?} {:?} delay queue holds {} packets (warning threshold {})",
                direction,
                class,
                depth,
                limit
            );
        }
    }

    fn rearm_depth_warning(&mut self, direction: Direction, class: ChannelClass) {
        let depth = self.queues[direction.index()][class.index()].len();
        let warned = &mut self.depth_warned[direction.index()][class.index()];
        if *warned && self.config.queue_depth_warning.is_none_or(|limit| depth <= limit) {
            *warned = false;
        }
    }
}
