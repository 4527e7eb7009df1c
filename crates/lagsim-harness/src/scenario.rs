//! Scripted scenarios with oracle checks.
//!
//! A scenario is a list of steps (sends, clock advances, ticks) replayed
//! against a [`LatencyTransport`] over a [`RecordingTransport`] with a
//! seeded [`SimEnv`]. Oracles run once the steps are done and inspect the
//! final world.

use std::time::Duration;

use lagsim_core::{
    ChannelId, ConfigError, Direction, ImpairmentConfig, LatencyTransport, PeerId, Transport,
};

use crate::{
    recording::{Delivery, RecordingTransport},
    sim_env::{DEFAULT_SEED, SimEnv},
};

/// Emulator under test.
pub type SimTransport = LatencyTransport<RecordingTransport, SimEnv>;

/// One scripted action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Client sends `payload` to the server.
    SendToServer {
        /// Channel to send on.
        channel_id: ChannelId,
        /// Payload bytes.
        payload: Vec<u8>,
    },
    /// Server sends `payload` to `peer`.
    SendToClient {
        /// Channel to send on.
        channel_id: ChannelId,
        /// Receiving client.
        peer: PeerId,
        /// Payload bytes.
        payload: Vec<u8>,
    },
    /// Move the virtual clock forward.
    Advance(Duration),
    /// One host tick: drain and flush both directions, then update
    /// statistics.
    Tick,
}

/// Check run against the final world.
pub type Oracle = Box<dyn Fn(&World) -> Result<(), String>>;

/// Why a scenario failed.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// The configuration was rejected.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// An oracle rejected the final state.
    #[error("oracle failed: {0}")]
    Oracle(String),
}

/// Final state of a scenario run.
pub struct World {
    env: SimEnv,
    transport: SimTransport,
}

impl World {
    /// Environment the run used.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Emulator after the last step.
    pub fn transport(&self) -> &SimTransport {
        &self.transport
    }

    /// Mutable emulator, for follow-up steps after the run.
    pub fn transport_mut(&mut self) -> &mut SimTransport {
        &mut self.transport
    }

    /// Packets the real transport received.
    pub fn deliveries(&self) -> &[Delivery] {
        self.transport.inner().deliveries()
    }
}

/// Builder for a scripted run.
pub struct Scenario {
    seed: u64,
    config: ImpairmentConfig,
    steps: Vec<Step>,
    oracles: Vec<Oracle>,
}

impl Scenario {
    /// Empty scenario with the default configuration and seed.
    pub fn new() -> Self {
        Self {
            seed: DEFAULT_SEED,
            config: ImpairmentConfig::default(),
            steps: Vec::new(),
            oracles: Vec::new(),
        }
    }

    /// Use `config` for the emulator.
    #[must_use]
    pub fn with_config(mut self, config: ImpairmentConfig) -> Self {
        self.config = config;
        self
    }

    /// Seed the environment's RNG.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Append a step.
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append a client to server send.
    #[must_use]
    pub fn send_to_server(self, channel_id: ChannelId, payload: &[u8]) -> Self {
        self.step(Step::SendToServer { channel_id, payload: payload.to_vec() })
    }

    /// Append a server to client send.
    #[must_use]
    pub fn send_to_client(self, channel_id: ChannelId, peer: PeerId, payload: &[u8]) -> Self {
        self.step(Step::SendToClient { channel_id, peer, payload: payload.to_vec() })
    }

    /// Append a clock advance.
    #[must_use]
    pub fn advance(self, by: Duration) -> Self {
        self.step(Step::Advance(by))
    }

    /// Append a host tick.
    #[must_use]
    pub fn tick(self) -> Self {
        self.step(Step::Tick)
    }

    /// Append an oracle.
    #[must_use]
    pub fn oracle(mut self, oracle: Oracle) -> Self {
        self.oracles.push(oracle);
        self
    }

    /// Replay every step, then run the oracles in order.
    pub fn run(self) -> Result<World, ScenarioError> {
        let env = SimEnv::with_seed(self.seed);
        let transport = LatencyTransport::new(RecordingTransport::new(), env.clone(), self.config)?;
        let mut world = World { env, transport };

        for step in self.steps {
            apply(&mut world, step);
        }

        for oracle in &self.oracles {
            oracle(&world).map_err(ScenarioError::Oracle)?;
        }

        Ok(world)
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new()
    }
}

fn apply(world: &mut World, step: Step) {
    match step {
        Step::SendToServer { channel_id, payload } => {
            world.transport.send_to_server(channel_id, &payload);
        },
        Step::SendToClient { channel_id, peer, payload } => {
            world.transport.send_to_client(channel_id, &payload, peer);
        },
        Step::Advance(by) => world.env.advance(by),
        Step::Tick => {
            for direction in Direction::ALL {
                world.transport.iterate_outgoing(direction);
            }
            world.transport.update();
        },
    }
}
