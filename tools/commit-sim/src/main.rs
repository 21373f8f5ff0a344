//! commit-sim: run one transaction through a commit strategy against a
//! simulated channel and print the outcome as JSON.
//!
//! ```text
//! commit-sim --orgs 2 --peers-per-org 2 --strategy NETWORK_SCOPE_ANYFORTX \
//!     --peer peer0.org1=invalid --peer peer1.org2=unreachable
//! ```

mod scenario;

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use commit_telemetry::{init_logging, TelemetryConfig};
use scenario::{build_channel, parse_override, plan_peers, PeerBehaviour, Simulation};
use shared_types::{MspId, PeerId, TransactionId};
use tx_commit_events::{CommitEventServiceConfig, EventHandlerOptions, EventStrategy};

/// commit-sim: Commit-Watch strategy simulator
#[derive(Parser, Debug)]
#[command(name = "commit-sim")]
#[command(about = "Drive a commit event strategy against a simulated channel")]
struct Args {
    /// Number of organizations on the channel
    #[arg(long, default_value = "2")]
    orgs: usize,

    /// Event-emitting peers per organization
    #[arg(long, default_value = "2")]
    peers_per_org: usize,

    /// MSP identity of the submitting client
    #[arg(long, default_value = "Org1MSP")]
    msp_id: String,

    /// Strategy preset name
    #[arg(short, long, default_value_t = EventStrategy::default().name().to_string())]
    strategy: String,

    /// Commit timeout in milliseconds
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,

    /// Per-peer behaviour, PEER=valid|invalid|silent|disconnect|unreachable
    #[arg(short, long = "peer", value_parser = parse_override)]
    peers: Vec<(PeerId, PeerBehaviour)>,

    /// Upper bound for simulated peer latency in milliseconds
    #[arg(long, default_value = "200")]
    max_latency_ms: u64,

    /// RNG seed for reproducible latencies
    #[arg(long)]
    seed: Option<u64>,

    /// Transaction ID to submit
    #[arg(long, default_value = "sim-tx-0001")]
    tx_id: String,

    /// Log filter, overrides COMMIT_LOG_LEVEL
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,

    /// Print Prometheus metrics after the run
    #[cfg(feature = "metrics")]
    #[arg(long)]
    print_metrics: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut telemetry = TelemetryConfig::from_env();
    if let Some(level) = &args.log_level {
        telemetry = telemetry.with_log_level(level.as_str());
    }
    if args.json_logs {
        telemetry = telemetry.with_json_logs(true);
    }
    init_logging(&telemetry)?;

    let channel = build_channel("simchannel", args.orgs, args.peers_per_org)
        .context("building simulated channel")?;
    let overrides: HashMap<PeerId, PeerBehaviour> = args.peers.iter().cloned().collect();
    for peer in overrides.keys() {
        if !channel.peers().iter().any(|p| &p.id == peer) {
            anyhow::bail!("peer '{}' is not on the simulated channel", peer);
        }
    }

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let plans = plan_peers(
        &channel,
        &overrides,
        Duration::from_millis(args.max_latency_ms),
        &mut rng,
    );

    let msp_id: MspId = args.msp_id.parse()?;
    let simulation = Simulation::new(channel, CommitEventServiceConfig::new(msp_id), plans);
    let tx_id: TransactionId = args.tx_id.parse()?;
    let options = EventHandlerOptions::new(args.timeout_ms)?;

    let outcome = simulation.run(tx_id, &args.strategy, options).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    #[cfg(feature = "metrics")]
    if args.print_metrics {
        print!("{}", commit_telemetry::encode_metrics()?);
    }

    if !outcome.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
