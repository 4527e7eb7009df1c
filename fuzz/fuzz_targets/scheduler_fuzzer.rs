//! Fuzz target for [`Scheduler`] submit/drain sequences
//!
//! # Strategy
//!
//! - Event sequences: Arbitrary interleavings of sends in both directions,
//!   clock advances, drains, config swaps and shutdowns
//! - Random stream: Loss and reorder draws come from fuzzer-provided bytes,
//!   so rare roll patterns are reachable directly
//! - Latencies: Full `u64` millisecond range, so configurations on both
//!   sides of `MAX_LATENCY` are tried
//!
//! # Invariants
//!
//! - A drained packet is never released before its due time
//! - Reliable packets drain in submission order per direction
//! - Queue depths only change by submit, drain or shutdown
//! - NEVER panic on any configuration `validate()` accepts

#![no_main]

use std::{cell::RefCell, collections::VecDeque, rc::Rc, time::Duration};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use lagsim_core::{
    ChannelClass, Destination, Direction, Environment, ImpairmentConfig, PeerId, Scheduler,
    Submission,
};

/// Clock plus a byte stream supplied by the fuzzer.
#[derive(Clone, Default)]
struct FuzzEnv {
    now: Rc<RefCell<Duration>>,
    entropy: Rc<RefCell<VecDeque<u8>>>,
}

impl Environment for FuzzEnv {
    type Instant = Duration;

    fn now(&self) -> Duration {
        *self.now.borrow()
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        let mut entropy = self.entropy.borrow_mut();
        for byte in buffer {
            *byte = entropy.pop_front().unwrap_or(0);
        }
    }
}

#[derive(Debug, Clone, Arbitrary)]
struct FuzzConfig {
    enabled: bool,
    latency_ms: u64,
    loss_permille: u16,
    extra_reliable_ms: u64,
    reorder_permille: u16,
}

impl FuzzConfig {
    fn build(&self) -> ImpairmentConfig {
        ImpairmentConfig {
            enabled: self.enabled,
            base_latency: Duration::from_millis(self.latency_ms),
            loss_probability: f64::from(self.loss_permille % 1001) / 1000.0,
            extra_reliable_latency: Duration::from_millis(self.extra_reliable_ms),
            reorder_probability: f64::from(self.reorder_permille % 1001) / 1000.0,
            ..ImpairmentConfig::default()
        }
    }
}

#[derive(Debug, Clone, Arbitrary)]
enum SchedulerEvent {
    SendToServer { channel_id: u8, len: u8 },
    SendToClient { channel_id: u8, peer: u8, len: u8 },
    Advance { millis: u16 },
    Drain { to_server: bool },
    Reconfigure(FuzzConfig),
    Shutdown,
}

#[derive(Debug, Clone, Arbitrary)]
struct FuzzInput {
    config: FuzzConfig,
    entropy: Vec<u8>,
    events: Vec<SchedulerEvent>,
}

fn direction(to_server: bool) -> Direction {
    if to_server {
        Direction::ClientToServer
    } else {
        Direction::ServerToClient
    }
}

fuzz_target!(|input: FuzzInput| {
    let env = FuzzEnv::default();
    env.entropy.borrow_mut().extend(input.entropy.iter().copied());

    let Ok(mut scheduler) = Scheduler::new(env.clone(), input.config.build(), 0) else {
        return;
    };

    // Sequence numbers of queued reliable packets, per direction.
    let mut reliable_pending: [VecDeque<u64>; 2] = Default::default();
    let mut next_sequence = 0u64;

    for event in input.events {
        let (destination, channel_id, len) = match event {
            SchedulerEvent::SendToServer { channel_id, len } => {
                (Destination::Server, channel_id, len)
            },
            SchedulerEvent::SendToClient { channel_id, peer, len } => {
                (Destination::Client(PeerId(peer.into())), channel_id, len)
            },
            SchedulerEvent::Advance { millis } => {
                *env.now.borrow_mut() += Duration::from_millis(millis.into());
                continue;
            },
            SchedulerEvent::Drain { to_server } => {
                let dir = direction(to_server);
                let now = env.now();
                for packet in scheduler.drain(now, dir) {
                    assert!(packet.release_at <= now, "packet released early");
                    if packet.class == ChannelClass::Reliable {
                        let expected = reliable_pending[dir_slot(dir)].pop_front();
                        let actual = sequence_of(&packet.payload);
                        assert_eq!(expected, actual, "reliable order violated");
                    }
                }
                continue;
            },
            SchedulerEvent::Reconfigure(config) => {
                let _ = scheduler.set_config(config.build());
                continue;
            },
            SchedulerEvent::Shutdown => {
                scheduler.shutdown();
                assert_eq!(scheduler.pending_packets(), 0);
                reliable_pending = Default::default();
                continue;
            },
        };

        let mut payload = next_sequence.to_be_bytes().to_vec();
        payload.resize(8 + usize::from(len), 0);
        next_sequence += 1;

        let dir = destination.direction();
        let depth_before = scheduler.queue_depth(dir, ChannelClass::Reliable)
            + scheduler.queue_depth(dir, ChannelClass::Unreliable);

        let outcome = scheduler.submit(env.now(), destination, channel_id, &payload);

        let depth_after = scheduler.queue_depth(dir, ChannelClass::Reliable)
            + scheduler.queue_depth(dir, ChannelClass::Unreliable);

        match outcome {
            Submission::Queued { release_at, .. } => {
                assert!(release_at >= env.now());
                assert_eq!(depth_after, depth_before + 1);
                if channel_id == 0 {
                    reliable_pending[dir_slot(dir)].push_back(next_sequence - 1);
                }
            },
            Submission::Dropped | Submission::Bypassed => {
                assert_ne!(
                    (outcome, channel_id),
                    (Submission::Dropped, 0),
                    "reliable packet dropped"
                );
                assert_eq!(depth_after, depth_before);
            },
        }
    }
});

fn dir_slot(direction: Direction) -> usize {
    match direction {
        Direction::ClientToServer => 0,
        Direction::ServerToClient => 1,
    }
}

fn sequence_of(payload: &[u8]) -> Option<u64> {
    let bytes: [u8; 8] = payload.get(..8)?.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}
