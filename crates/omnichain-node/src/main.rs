//! # Omnichain Node
//!
//! Loads the configuration, installs telemetry, builds the network and runs
//! one scenario, printing its report as JSON.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (file, then `UO_*` environment, then flags)
//! 2. Install tracing and register metrics
//! 3. Build hub, branches, gas pools and the scenario token
//! 4. Run the scenario with the relayer in the background
//! 5. Print the report, and the Prometheus text when asked

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use omnichain_node::{NodeConfig, NodeRuntime, ScenarioKind};
use uo_telemetry::{gather_metrics, init_telemetry};

/// Ulysses-Omnichain node: simulated hub-and-spoke bridging
#[derive(Parser, Debug)]
#[command(name = "omnichain-node")]
#[command(about = "Runs bridge and Ulysses pool scenarios over an in-process network")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scenario to run; defaults to `[scenario].name`
    #[arg(short, long, value_enum)]
    scenario: Option<ScenarioKind>,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,

    /// Print Prometheus metrics after the report
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => NodeConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => NodeConfig::default(),
    };
    config.telemetry = config.telemetry.with_env();
    if args.json_logs {
        config.telemetry.json_logs = true;
    }
    init_telemetry(&config.telemetry).context("installing telemetry")?;

    let kind = match args.scenario {
        Some(kind) => kind,
        None => config
            .scenario
            .name
            .parse()
            .context("reading [scenario].name")?,
    };

    info!("===========================================");
    info!("  Ulysses-Omnichain Node v{}", omnichain_node::VERSION);
    info!("  Network: {}", config.telemetry.network);
    info!("===========================================");

    let runtime = NodeRuntime::new(config).context("building the network")?;
    let report = runtime.run(kind).await.context("running the scenario")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("encoding the report")?
    );
    if args.metrics {
        print!("{}", gather_metrics().context("gathering metrics")?);
    }
    if !report.passed {
        bail!("scenario {} failed: {:?}", kind, report.failures());
    }
    Ok(())
}
