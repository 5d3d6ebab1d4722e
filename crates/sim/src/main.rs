//! fleet-sim: drives an elastic fleet with a random workload.
//!
//! Each step draws one task size in 2..=101, submits it, advances one
//! tick, samples utilization and periodically rebalances, recalculates
//! thresholds and restores reserve nodes.

mod driver;

use clap::Parser;
use tracing::{info, warn};

use elastic_core::config::load_dotenv;
use elastic_core::BalancerConfig;

use crate::driver::Driver;

// ── CLI ─────────────────────────────────────────────────────────────

/// Fleet simulator for the adaptive load balancer.
#[derive(Parser, Debug)]
#[command(name = "fleet-sim", version, about)]
struct Cli {
    /// Path to balancer TOML config file.
    #[arg(long, env = "ELASTIC_CONFIG", default_value = "config/balancer.toml")]
    config: String,

    /// Number of tasks to submit.
    #[arg(long, default_value_t = 1000)]
    tasks: usize,

    /// Seed for the workload generator.
    #[arg(long, env = "ELASTIC_SEED", default_value_t = 0)]
    seed: u64,

    /// Print the final report as JSON.
    #[arg(long)]
    json: bool,
}

// ── Entrypoint ──────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Fall back to defaults plus ELASTIC_* overrides if the file is missing
    let config = match BalancerConfig::from_file(&cli.config) {
        Ok(cfg) => {
            info!(path = %cli.config, "loaded balancer config");
            cfg
        }
        Err(e) => {
            warn!(
                error = %e,
                path = %cli.config,
                "failed to load config, using defaults"
            );
            BalancerConfig::from_env()?
        }
    };
    config.log_summary();

    info!(tasks = cli.tasks, seed = cli.seed, "starting simulation");
    let report = Driver::new(config, cli.seed)?.run(cli.tasks)?;

    let c = report.counters;
    info!(
        lost = c.tasks_lost,
        loss_ratio = c.loss_ratio(),
        migrations = c.migrations,
        power_ons = report.power_ons,
        "run summary"
    );

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
