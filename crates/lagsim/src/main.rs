//! lagsim loopback driver binary.
//!
//! # Usage
//!
//! ```bash
//! # 150 ms latency, 5% loss, 2% reordering for ten seconds
//! lagsim --latency-ms 150 --loss 0.05 --reorder 0.02 --duration-secs 10
//!
//! # Replay the same loss pattern
//! lagsim --loss 0.1 --seed 1234
//! ```

use std::time::Duration;

use clap::Parser;
use lagsim::{Driver, SystemEnv, TickSummary, TrafficConfig, tick_period};
use lagsim_core::ImpairmentConfig;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Network condition emulator over a loopback link
#[derive(Parser, Debug)]
#[command(name = "lagsim")]
#[command(about = "Emulate latency, loss and reordering on a loopback link")]
#[command(version)]
struct Args {
    /// Latency added to every packet, in milliseconds
    #[arg(long, default_value = "0")]
    latency_ms: u64,

    /// Loss probability in [0, 1]
    #[arg(long, default_value = "0.0")]
    loss: f64,

    /// Extra latency for a lost reliable packet, in milliseconds
    #[arg(long, default_value = "20")]
    extra_reliable_latency_ms: u64,

    /// Reorder probability in [0, 1]
    #[arg(long, default_value = "0.0")]
    reorder: f64,

    /// Forward packets without impairment
    #[arg(long)]
    no_simulation: bool,

    /// Disable statistics collection
    #[arg(long)]
    no_statistics: bool,

    /// Statistics window, in milliseconds
    #[arg(long, default_value = "1000")]
    stats_window_ms: u64,

    /// Host ticks per second
    #[arg(long, default_value = "60")]
    tick_hz: u32,

    /// Stop after this many seconds (runs until Ctrl-C when omitted)
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Packets each side sends per tick
    #[arg(long, default_value = "4")]
    packets_per_tick: usize,

    /// Payload size in bytes
    #[arg(long, default_value = "64")]
    payload_size: usize,

    /// Number of clients the server sends to
    #[arg(long, default_value = "1")]
    peers: u64,

    /// Seed for replayable loss and reorder decisions
    #[arg(long)]
    seed: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn impairment(&self) -> ImpairmentConfig {
        ImpairmentConfig {
            enabled: !self.no_simulation,
            base_latency: Duration::from_millis(self.latency_ms),
            loss_probability: self.loss,
            extra_reliable_latency: Duration::from_millis(self.extra_reliable_latency_ms),
            reorder_probability: self.reorder,
            statistics_enabled: !self.no_statistics,
            statistics_window: Duration::from_millis(self.stats_window_ms),
            ..ImpairmentConfig::default()
        }
    }

    fn traffic(&self) -> TrafficConfig {
        TrafficConfig {
            packets_per_tick: self.packets_per_tick,
            payload_size: self.payload_size,
            peers: self.peers,
            ..TrafficConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let period = tick_period(args.tick_hz)?;

    let env = args.seed.map_or_else(SystemEnv::new, SystemEnv::seeded);
    let config = args.impairment();

    tracing::info!("lagsim starting");
    tracing::info!(
        "Impairment: enabled={} latency={:?} loss={} extra_reliable={:?} reorder={}",
        config.enabled,
        config.base_latency,
        config.loss_probability,
        config.extra_reliable_latency,
        config.reorder_probability
    );

    let mut driver = Driver::new(env, config, args.traffic())?;

    let mut interval = tokio::time::interval(period);
    let started = tokio::time::Instant::now();
    let deadline = args.duration_secs.map(|secs| started + Duration::from_secs(secs));

    let mut totals = TickSummary::default();
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let summary = driver.tick();
                totals.sent += summary.sent;
                totals.delivered += summary.delivered;
                totals.out_of_order += summary.out_of_order;
                totals.reliable_violations += summary.reliable_violations;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }

        if deadline.is_some_and(|deadline| tokio::time::Instant::now() >= deadline) {
            break;
        }
    }

    driver.shutdown();
    tracing::info!(
        "Sent {} packets, delivered {}, {} out of order",
        totals.sent,
        totals.delivered,
        totals.out_of_order
    );

    if totals.reliable_violations > 0 {
        tracing::error!("{} reliable packets arrived out of order", totals.reliable_violations);
    }

    Ok(())
}
