//! Run a single consensus simulation from the command line and print the
//! termination summary.

use std::path::PathBuf;

use clap::Parser;
use simplex_consensus::config::SimulationConfig;
use simplex_consensus::driver::{Driver, Termination};
use simplex_consensus::node::Node;
use simplex_consensus::transport::Transport;
use tracing::info;

#[derive(Parser)]
#[command(name = "run_simulation", about = "Simulate a quorum consensus run")]
struct Cli {
    /// Path to a TOML config file. Missing fields, or a missing file, fall back to defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    node_count: Option<u64>,

    #[arg(long)]
    generate_blocks: Option<u64>,

    #[arg(long)]
    rng_seed: Option<u64>,

    #[arg(long)]
    lost_messages_percentage: Option<f64>,
}

#[cfg(feature = "prometheus")]
fn install_prometheus_recorder() {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .install()
        .expect("failed to install the Prometheus recorder/exporter");
}

#[cfg(not(feature = "prometheus"))]
fn install_prometheus_recorder() {}

fn main() {
    tracing_subscriber::fmt::init();
    install_prometheus_recorder();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => SimulationConfig::load(path).unwrap_or_else(|err| {
            eprintln!("failed to load {}: {err}, falling back to defaults", path.display());
            SimulationConfig::default()
        }),
        None => SimulationConfig::default(),
    };
    if let Some(node_count) = cli.node_count {
        config.node_count = node_count;
    }
    if let Some(generate_blocks) = cli.generate_blocks {
        config.generate_blocks = generate_blocks;
    }
    if let Some(rng_seed) = cli.rng_seed {
        config.rng_seed = rng_seed;
    }
    if let Some(lost_messages_percentage) = cli.lost_messages_percentage {
        config.lost_messages_percentage = lost_messages_percentage;
    }

    simplex_consensus::metrics::describe();

    let timings = config.node_timings();
    let nodes: Vec<Node> = (0..config.node_count)
        .map(|node_id| {
            Node::new(node_id, config.node_count, Vec::new(), timings, 0)
                .expect("empty starting chain is always valid")
        })
        .collect();
    let transport = Transport::new(
        config.node_count,
        config.max_distance,
        config.lost_messages_percentage,
        config.delay_multiplier,
        config.rng_seed,
    );

    let mut driver = Driver::new(nodes, transport, config.generate_blocks, config.max_loop_iterations);
    let termination = driver.run();

    let confirmed = driver.nodes().iter().filter(|n| n.chain.len() as u64 >= config.generate_blocks).count();
    match termination {
        Termination::QuorumReached { tick } => {
            info!(tick, "simulation finished");
            println!(
                "slot {} confirmed by {}/{} nodes after {} ticks",
                config.generate_blocks.saturating_sub(1),
                confirmed,
                config.node_count,
                tick
            );
        }
        Termination::IterationLimit { tick } => {
            info!(tick, "simulation hit the iteration limit without quorum");
            println!(
                "iteration limit reached: slot {} confirmed by {}/{} nodes after {} ticks",
                config.generate_blocks.saturating_sub(1),
                confirmed,
                config.node_count,
                tick
            );
        }
    }
}
