//! ETS Simulator CLI
//!
//! Runs emissions-trading scenarios and Monte Carlo batches and writes
//! snapshot sequences or percentile summaries as JSON or CSV.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ets_simulator_core_rs::monte_carlo::{run_monte_carlo, MonteCarloConfig};
use ets_simulator_core_rs::orchestrator::{
    compare_scenarios, run_with, snapshots_to_csv, SimulationConfig,
};
use ets_simulator_core_rs::scenario::{preset_names, RosterSource, StochasticParams};
use ets_simulator_core_rs::Scenario;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ets-sim")]
#[command(about = "Cap-and-trade emissions market simulator")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scenario through its horizon
    Run {
        /// Preset name or path to a scenario JSON file
        #[arg(short, long, default_value = "Strict-ETS")]
        scenario: String,

        /// RNG seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Roster config or facility inventory JSON file (defaults to the standard roster)
        #[arg(long)]
        roster: Option<PathBuf>,

        /// Override the horizon start year
        #[arg(long)]
        start: Option<u32>,

        /// Override the horizon end year
        #[arg(long)]
        end: Option<u32>,

        #[arg(short, long, value_enum, default_value = "json")]
        format: Format,

        /// Include the event log in JSON output
        #[arg(long)]
        events: bool,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run repeated stochastic repetitions and report percentile bands
    MonteCarlo {
        /// Preset name or path to a scenario JSON file
        #[arg(short, long, default_value = "Strict-ETS")]
        scenario: String,

        #[arg(short = 'n', long, default_value = "100")]
        repetitions: usize,

        /// Top-level seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Roster config or facility inventory JSON file (defaults to the standard roster)
        #[arg(long)]
        roster: Option<PathBuf>,

        /// Disable all stochastic inputs
        #[arg(long)]
        deterministic: bool,

        /// Run repetitions on one thread
        #[arg(long)]
        sequential: bool,

        /// Tolerated share of failed repetitions
        #[arg(long, default_value = "0.1")]
        max_failure_fraction: f64,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run several scenarios on the same roster and seed
    Compare {
        /// Preset names or scenario JSON files
        #[arg(num_args = 1.., default_values_t = preset_names())]
        scenarios: Vec<String>,

        #[arg(long, default_value = "42")]
        seed: u64,

        /// Roster config or facility inventory JSON file (defaults to the standard roster)
        #[arg(long)]
        roster: Option<PathBuf>,
    },

    /// List scenario presets
    Presets {
        /// Print full preset definitions as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            seed,
            roster,
            start,
            end,
            format,
            events,
            output,
        } => {
            let mut scenario = load_scenario(&scenario)?;
            if start.is_some() || end.is_some() {
                let start = start.unwrap_or(scenario.horizon.start_year);
                let end = end.unwrap_or(scenario.horizon.end_year);
                scenario = scenario.with_horizon(start, end);
            }
            let population = load_roster(roster.as_deref())?
                .build()
                .context("invalid roster")?;

            let run = run_with(SimulationConfig {
                scenario,
                population,
                rng_seed: seed,
                stochastic: StochasticParams::default(),
            })?;

            let text = match format {
                Format::Csv => snapshots_to_csv(&run.snapshots),
                Format::Json if events => serde_json::to_string_pretty(&serde_json::json!({
                    "run": &run,
                    "events": &run.events,
                }))?,
                Format::Json => serde_json::to_string_pretty(&run)?,
            };
            write_output(output.as_deref(), &text)?;
        }

        Commands::MonteCarlo {
            scenario,
            repetitions,
            seed,
            roster,
            deterministic,
            sequential,
            max_failure_fraction,
            output,
        } => {
            let scenario = load_scenario(&scenario)?;
            let population = load_roster(roster.as_deref())?
                .build()
                .context("invalid roster")?;
            let config = MonteCarloConfig {
                repetitions,
                seed,
                stochastic: if deterministic {
                    StochasticParams::none()
                } else {
                    StochasticParams::monte_carlo()
                },
                max_failure_fraction,
                parallel: !sequential,
            };

            let summary = run_monte_carlo(&scenario, &population, &config)?;
            info!(
                successful = summary.successful,
                failed = summary.failures.len(),
                "batch summary ready"
            );
            write_output(output.as_deref(), &serde_json::to_string_pretty(&summary)?)?;
        }

        Commands::Compare {
            scenarios,
            seed,
            roster,
        } => {
            let scenarios = scenarios
                .iter()
                .map(|s| load_scenario(s))
                .collect::<Result<Vec<_>>>()?;
            let population = load_roster(roster.as_deref())?
                .build()
                .context("invalid roster")?;

            let summaries = compare_scenarios(&scenarios, &population, seed)?;
            println!(
                "{:<16} {:>12} {:>12} {:>10} {:>10} {:>8} {:>8}",
                "scenario", "emissions0", "emissionsN", "change", "price", "clean", "closed"
            );
            for s in &summaries {
                println!(
                    "{:<16} {:>12.2} {:>12.2} {:>9.1}% {:>10.2} {:>8} {:>8}",
                    s.scenario,
                    s.initial_emissions,
                    s.final_emissions,
                    s.emissions_change * 100.0,
                    s.final_price,
                    s.converted_facilities,
                    s.closed_facilities
                );
            }
        }

        Commands::Presets { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&Scenario::presets())?);
            } else {
                for name in preset_names() {
                    println!("{}", name);
                }
            }
        }
    }

    Ok(())
}

/// Resolve a preset name, or read a scenario JSON file when `spec` is a path.
fn load_scenario(spec: &str) -> Result<Scenario> {
    let path = Path::new(spec);
    if path.extension().is_some_and(|ext| ext == "json") {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario file {}", path.display()))?;
        let scenario: Scenario = serde_json::from_str(&text)
            .with_context(|| format!("parsing scenario file {}", path.display()))?;
        return Ok(scenario);
    }
    Ok(Scenario::preset(spec)?)
}

/// Read a roster file: a facility inventory or a generator configuration.
fn load_roster(path: Option<&Path>) -> Result<RosterSource> {
    match path {
        None => Ok(RosterSource::default()),
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading roster file {}", path.display()))?;
            RosterSource::from_json(&text)
                .with_context(|| format!("parsing roster file {}", path.display()))
        }
    }
}

fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "output written");
        }
        None => println!("{}", text),
    }
    Ok(())
}
