//! Property-based tests for the impairment scheduler.
//!
//! Each property drives a bare `Scheduler` with a seeded `SimEnv` and checks
//! one delivery guarantee over arbitrary submission sequences.

use std::time::Duration;

use lagsim_core::{
    ChannelClass, Destination, Direction, Environment, ImpairmentConfig, PeerId, Scheduler,
    Submission,
};
use lagsim_harness::{SimEnv, SimInstant};
use proptest::prelude::*;

const RELIABLE: u8 = 0;
const UNRELIABLE: u8 = 1;

fn scheduler(env: &SimEnv, config: ImpairmentConfig) -> Scheduler<SimEnv> {
    Scheduler::new(env.clone(), config, RELIABLE).expect("valid config")
}

/// Submit one packet per gap (advancing the clock by the gap first) and
/// return each outcome in submission order.
fn submit_all(
    env: &SimEnv,
    sched: &mut Scheduler<SimEnv>,
    destination: Destination,
    channel_id: u8,
    gaps_ms: &[u64],
) -> Vec<Submission<SimInstant>> {
    gaps_ms
        .iter()
        .enumerate()
        .map(|(seq, gap)| {
            env.advance(Duration::from_millis(*gap));
            let payload = u32::try_from(seq).expect("small sequence").to_be_bytes();
            sched.submit(env.now(), destination, channel_id, &payload)
        })
        .collect()
}

fn drained_sequence(
    sched: &mut Scheduler<SimEnv>,
    now: SimInstant,
    direction: Direction,
) -> Vec<u32> {
    sched
        .drain(now, direction)
        .iter()
        .map(|p| u32::from_be_bytes([p.payload[0], p.payload[1], p.payload[2], p.payload[3]]))
        .collect()
}

fn far_future(env: &SimEnv) -> SimInstant {
    env.now() + Duration::from_secs(3600)
}

proptest! {
    /// Reliable delivery order equals submission order, whatever the loss
    /// and reorder settings.
    #[test]
    fn prop_reliable_preserves_order(
        seed in any::<u64>(),
        gaps_ms in prop::collection::vec(0u64..50, 1..64),
        latency_ms in 0u64..200,
        loss in 0.0f64..=1.0,
        reorder in 0.0f64..=1.0,
    ) {
        let env = SimEnv::with_seed(seed);
        let mut sched = scheduler(&env, ImpairmentConfig {
            base_latency: Duration::from_millis(latency_ms),
            loss_probability: loss,
            reorder_probability: reorder,
            ..ImpairmentConfig::default()
        });

        submit_all(&env, &mut sched, Destination::Server, RELIABLE, &gaps_ms);
        let drained = drained_sequence(&mut sched, far_future(&env), Direction::ClientToServer);

        let expected: Vec<u32> = (0..gaps_ms.len() as u32).collect();
        prop_assert_eq!(drained, expected);
    }

    /// With both probabilities at zero the random source is never touched
    /// and every packet is held for exactly the base latency.
    #[test]
    fn prop_no_impairment_is_pure_delay(
        seed in any::<u64>(),
        gaps_ms in prop::collection::vec(0u64..50, 1..64),
        latency_ms in 0u64..200,
        unreliable in any::<bool>(),
    ) {
        let env = SimEnv::with_seed(seed);
        let latency = Duration::from_millis(latency_ms);
        let mut sched = scheduler(&env, ImpairmentConfig {
            base_latency: latency,
            ..ImpairmentConfig::default()
        });
        let channel_id = if unreliable { UNRELIABLE } else { RELIABLE };

        let mut submitted_at = Vec::new();
        for (seq, gap) in gaps_ms.iter().enumerate() {
            env.advance(Duration::from_millis(*gap));
            submitted_at.push(env.now());
            let payload = u32::try_from(seq).expect("small sequence").to_be_bytes();
            let destination = Destination::Client(PeerId(1));
            let outcome = sched.submit(env.now(), destination, channel_id, &payload);
            let expected = Submission::Queued {
                release_at: env.now() + latency,
                reordered: false,
                retransmitted: false,
            };
            prop_assert_eq!(outcome, expected);
        }

        let drained = sched.drain(far_future(&env), Direction::ServerToClient);
        prop_assert_eq!(env.draws(), 0);
        prop_assert_eq!(drained.len(), gaps_ms.len());
        for (packet, at) in drained.iter().zip(&submitted_at) {
            prop_assert_eq!(packet.release_at - *at, latency);
        }
    }

    /// A reliable submission always grows its queue by exactly one.
    #[test]
    fn prop_reliable_never_drops(
        seed in any::<u64>(),
        count in 1usize..128,
        loss in 0.0f64..=1.0,
    ) {
        let env = SimEnv::with_seed(seed);
        let mut sched = scheduler(&env, ImpairmentConfig {
            base_latency: Duration::from_secs(1),
            loss_probability: loss,
            ..ImpairmentConfig::default()
        });

        for expected_depth in 1..=count {
            let outcome = sched.submit(env.now(), Destination::Server, RELIABLE, b"r");
            let queued = matches!(outcome, Submission::Queued { .. });
            prop_assert!(queued);
            prop_assert_eq!(
                sched.queue_depth(Direction::ClientToServer, ChannelClass::Reliable),
                expected_depth
            );
        }
    }

    /// Certain loss on an unreliable channel delivers nothing.
    #[test]
    fn prop_certain_unreliable_loss_delivers_nothing(
        seed in any::<u64>(),
        gaps_ms in prop::collection::vec(0u64..50, 1..64),
        reorder in 0.0f64..=1.0,
    ) {
        let env = SimEnv::with_seed(seed);
        let mut sched = scheduler(&env, ImpairmentConfig {
            loss_probability: 1.0,
            reorder_probability: reorder,
            ..ImpairmentConfig::default()
        });

        let outcomes = submit_all(&env, &mut sched, Destination::Server, UNRELIABLE, &gaps_ms);

        prop_assert!(outcomes.iter().all(|o| *o == Submission::Dropped));
        prop_assert!(sched.drain(far_future(&env), Direction::ClientToServer).is_empty());
        prop_assert_eq!(sched.pending_packets(), 0);
    }

    /// A packet is released on the first drain at or after its release
    /// time and never before.
    #[test]
    fn prop_drain_is_time_gated(
        latency_ms in 0u64..500,
        mut drain_at_ms in prop::collection::vec(0u64..1000, 1..32),
    ) {
        drain_at_ms.sort_unstable();
        let env = SimEnv::new();
        let mut sched = scheduler(&env, ImpairmentConfig {
            base_latency: Duration::from_millis(latency_ms),
            ..ImpairmentConfig::default()
        });

        sched.submit(SimInstant::ZERO, Destination::Server, UNRELIABLE, b"x");

        let mut released_at = None;
        for at in drain_at_ms {
            let drained = sched.drain(SimInstant::from_millis(at), Direction::ClientToServer);
            match released_at {
                None if at >= latency_ms => {
                    prop_assert_eq!(drained.len(), 1);
                    released_at = Some(at);
                },
                _ => prop_assert!(drained.is_empty()),
            }
        }
    }
}

#[test]
fn prop_same_seed_same_decisions() {
    proptest!(|(
        seed in any::<u64>(),
        gaps_ms in prop::collection::vec(0u64..20, 1..64),
    )| {
        let config = ImpairmentConfig {
            base_latency: Duration::from_millis(40),
            loss_probability: 0.3,
            reorder_probability: 0.3,
            ..ImpairmentConfig::default()
        };

        let mut runs = Vec::new();
        for _ in 0..2 {
            let env = SimEnv::with_seed(seed);
            let mut sched = scheduler(&env, config.clone());
            let outcomes = submit_all(&env, &mut sched, Destination::Server, UNRELIABLE, &gaps_ms);
            let drained = drained_sequence(&mut sched, far_future(&env), Direction::ClientToServer);
            runs.push((outcomes, drained));
        }

        // PROPERTY: Determinism - same seed produces same decisions
        prop_assert_eq!(&runs[0], &runs[1]);
    });
}
