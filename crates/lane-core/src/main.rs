//! Corridor lane-formation driver
//!
//! Runs one simulation from `lane.toml` (or defaults) with command-line
//! overrides and emits the run report.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::info;

use lane_core::{Config, RunReport, Simulation};

/// Command line arguments for the simulation
#[derive(Parser, Debug)]
#[command(name = "lane_sim")]
#[command(about = "Lane formation in a bidirectional pedestrian corridor")]
struct Args {
    /// TOML configuration file (defaults to lane.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Number of steps to simulate
    #[arg(long)]
    iterations: Option<u64>,

    /// Rows across the corridor
    #[arg(long)]
    rows: Option<usize>,

    /// Columns along the walking axis
    #[arg(long)]
    columns: Option<usize>,

    /// Number of agents
    #[arg(long)]
    agents: Option<usize>,

    /// Probability of preferring a straight-ahead move
    #[arg(long)]
    soberness: Option<f64>,

    /// Do not record lattice snapshots
    #[arg(long)]
    no_snapshots: bool,

    /// Write the run report as JSON to this path
    #[arg(long)]
    output: Option<PathBuf>,
}

impl Args {
    /// Loads the configuration named by `--config`, or `lane.toml`, with the
    /// command-line overrides applied and validated.
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => Config::load_or_default(),
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, config: &mut Config) {
        if let Some(seed) = self.seed {
            config.run.seed = seed;
        }
        if let Some(iterations) = self.iterations {
            config.run.iterations = iterations;
        }
        if let Some(rows) = self.rows {
            config.corridor.rows = rows;
        }
        if let Some(columns) = self.columns {
            config.corridor.columns = columns;
        }
        if let Some(agents) = self.agents {
            config.corridor.agents = agents;
        }
        if let Some(soberness) = self.soberness {
            config.dynamics.soberness = soberness;
        }
        if self.no_snapshots {
            config.run.record_snapshots = false;
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

/// Runs one seeded simulation described by `config`.
fn simulate(config: &Config) -> Result<RunReport> {
    info!(
        seed = config.run.seed,
        iterations = config.run.iterations,
        "starting corridor simulation"
    );

    let mut rng = SmallRng::seed_from_u64(config.run.seed);
    let mut simulation = Simulation::populated(
        config.corridor.rows,
        config.corridor.columns,
        config.corridor.agents,
        config.options(),
        &mut rng,
    )?;
    let mut report = simulation.run(config.run.iterations, &mut rng)?;
    report.parameters.seed = Some(config.run.seed);
    Ok(report)
}

fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    fs::write(path, report.to_json_pretty()?)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    info!("Wrote report to {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = args.load_config()?;
    let report = simulate(&config)?;

    match &args.output {
        Some(path) => write_report(&report, path)?,
        None => {
            let window = (report.steps.len() / 10).max(1);
            println!("run:         {}", report.run_id);
            println!("phi_0:       {:.3}", report.phi_0);
            if let Some(last) = report.steps.last() {
                println!("final phi~:  {:.3}", last.phi_reduced);
            }
            if let Some(mean) = report.mean_phi_reduced(window) {
                println!("mean phi~ (last {} steps): {:.3}", window, mean);
            }
            println!("total moves: {}", report.total_moves());
        }
    }

    Ok(())
}
