//! main.rs — sonar array simulator entry point
//!
//! Two commands:
//!   1. run:   place objects, synthesize quantized detections, match and
//!             resolve them, print the accuracy report
//!   2. times: arrival times for one manually placed target
//!
//! Logging goes through `tracing`; `RUST_LOG` overrides the default filter.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use sonar_sim::config::FullConfig;
use sonar_sim::matcher::MatchStrategy;
use sonar_sim::report::RunSummary;
use sonar_sim::scenarios::ScenarioConfig;
use sonar_sim::simulation::{query_target, run_simulation};
use sonar_types::Vec3;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "sonar-sim", about = "Four-receiver sonar array simulator")]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,
    /// Log the solver stage table for every attempted quadruple
    #[arg(long, global = true)]
    trace: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the detection accuracy simulation
    Run {
        /// Replace the configured scenario with N random objects
        #[arg(long)]
        objects: Option<usize>,
        /// Seed for random placement
        #[arg(long)]
        seed: Option<u64>,
        /// Override the configured search strategy
        #[arg(long, value_enum)]
        strategy: Option<MatchStrategy>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compute arrival times for a manual target
    Times {
        #[arg(long, allow_negative_numbers = true)]
        x: f64,
        #[arg(long, allow_negative_numbers = true)]
        y: f64,
        #[arg(long, allow_negative_numbers = true)]
        z: f64,
    },
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.trace { "sonar_sim=debug" } else { "sonar_sim=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut cfg = FullConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    match args.command {
        Command::Run { objects, seed, strategy, json } => {
            apply_overrides(&mut cfg, objects, seed, strategy);
            info!(
                "🔊 Sonar sim: array ({}, {}, {}) m @ {} Hz, strategy {:?}",
                cfg.array.lateral_a_m,
                cfg.array.lateral_b_m,
                cfg.array.vertical_m,
                cfg.array.sample_rate_hz,
                cfg.matcher.strategy
            );

            let run = run_simulation(&cfg, args.trace).context("simulation failed")?;
            let summary = RunSummary::new(&run.geometry, &run.report, &run.objects);
            if json {
                println!("{}", summary.to_json().context("serializing report")?);
            } else {
                print!("{summary}");
            }
        }
        Command::Times { x, y, z } => {
            let target = query_target(Vec3::new(x, y, z), &cfg, args.trace).context("target query failed")?;
            print!("{target}");
        }
    }

    Ok(())
}

fn apply_overrides(
    cfg: &mut FullConfig,
    objects: Option<usize>,
    seed: Option<u64>,
    strategy: Option<MatchStrategy>,
) {
    if let Some(count) = objects {
        cfg.scenario = ScenarioConfig::random(count, seed);
    } else if let (Some(s), ScenarioConfig::Random { seed: slot, .. }) = (seed, &mut cfg.scenario) {
        *slot = Some(s);
    }
    if let Some(strategy) = strategy {
        cfg.matcher.strategy = strategy;
    }
}
