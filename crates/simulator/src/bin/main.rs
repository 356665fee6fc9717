//! Network Data Publisher Simulator CLI
//!
//! Runs a deterministic multi-node simulation and prints how quickly each
//! published entry converges to its desired number of copies.

use clap::Parser;
use netdata_simulator::{ScenarioConfig, Simulator};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "netdata-sim")]
#[command(about = "Convergence simulator for the Network Data publisher")]
#[command(version)]
struct Cli {
    /// Scenario file (TOML). Without one, every node publishes an on-mesh
    /// prefix, an external route and an anycast DNS/SRP service.
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Number of nodes (overrides the scenario)
    #[arg(long)]
    nodes: Option<u32>,

    /// Random seed (overrides the scenario)
    #[arg(long)]
    seed: Option<u64>,

    /// Simulated duration, e.g. "30s", "5m" (overrides the scenario)
    #[arg(short, long)]
    duration: Option<humantime::Duration>,

    /// Desired copies of each prefix (overrides the scenario)
    #[arg(long)]
    desired: Option<usize>,

    /// Fail node 0 at this simulated time, e.g. "20s"
    #[arg(long)]
    fail_at: Option<humantime::Duration>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut scenario = match &cli.scenario {
        Some(path) => ScenarioConfig::from_file(path)?,
        None => ScenarioConfig::builtin()?,
    };
    if let Some(nodes) = cli.nodes {
        scenario = scenario.with_nodes(nodes);
    }
    if let Some(seed) = cli.seed {
        scenario = scenario.with_seed(seed);
    }
    if let Some(duration) = cli.duration {
        scenario = scenario.with_duration(*duration);
    }
    if let Some(desired) = cli.desired {
        scenario = scenario.with_desired_prefixes(desired);
    }
    if let Some(at) = cli.fail_at {
        scenario = scenario.with_failure(0, *at);
    }

    let report = Simulator::new(scenario)?.run()?;
    report.print();

    if !report.all_converged() {
        std::process::exit(1);
    }
    Ok(())
}
