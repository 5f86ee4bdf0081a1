//! Headless survival runner.
//!
//! Runs scenarios without graphics and writes JSON lines to stdout.
//! Designed for balance testing, CI and determinism checks.
//!
//! # Usage
//!
//! ```bash
//! # Run the built-in clearing scenario
//! cargo run -p survival_headless
//!
//! # Run a scenario file
//! cargo run -p survival_headless -- run --scenario scenarios/meadow.ron
//!
//! # Run a batch of seeds
//! cargo run -p survival_headless -- batch --scenario scenarios/meadow.ron --count 200
//!
//! # Verify determinism
//! cargo run -p survival_headless -- verify --seed 42 --runs 5
//! ```
//!
//! Logs go to stderr; stdout is reserved for the JSON lines.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use survival_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    protocol::Output,
    runner::{RunOptions, ScenarioRunner},
    scenario::{Scenario, ScenarioError},
};

/// Name accepted in place of a file path for the built-in scenario.
const BUILTIN_SCENARIO: &str = "clearing";

#[derive(Parser)]
#[command(name = "survival_headless")]
#[command(about = "Headless survival runner for balance testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single scenario
    Run {
        /// Scenario file, or "clearing"
        #[arg(short, long, default_value = BUILTIN_SCENARIO)]
        scenario: String,

        /// Seed override
        #[arg(long)]
        seed: Option<u64>,

        /// Tick count override
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Only write the ready and summary lines
        #[arg(long)]
        summary_only: bool,
    },

    /// Run a batch of seeds for balance testing
    Batch {
        /// Scenario file, or "clearing"
        #[arg(short, long, default_value = BUILTIN_SCENARIO)]
        scenario: String,

        /// Number of runs
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel runs (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Tick count override
        #[arg(short, long)]
        ticks: Option<u64>,
    },

    /// Verify determinism by running the same seed multiple times
    Verify {
        /// Scenario file, or "clearing"
        #[arg(short, long, default_value = BUILTIN_SCENARIO)]
        scenario: String,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },

    /// Check that a scenario file parses and refers to known presets
    Validate {
        /// Scenario file
        #[arg(short, long)]
        scenario: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    let result = match cli.command {
        Some(Commands::Run {
            scenario,
            seed,
            ticks,
            summary_only,
        }) => cmd_run(
            &scenario,
            RunOptions {
                seed,
                ticks,
                summary_only,
            },
        ),
        Some(Commands::Batch {
            scenario,
            count,
            parallel,
            output,
            seed,
            ticks,
        }) => cmd_batch(scenario, count, parallel, output, seed, ticks),
        Some(Commands::Verify {
            scenario,
            seed,
            runs,
        }) => cmd_verify(&scenario, seed, runs),
        Some(Commands::Validate { scenario }) => cmd_validate(&scenario),
        None => cmd_run(BUILTIN_SCENARIO, RunOptions::default()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            tracing::error!(%message, "Command failed");
            ExitCode::FAILURE
        }
    }
}

/// Resolve a scenario argument to the built-in scenario or a RON file.
fn load_scenario(name: &str) -> Result<Scenario, ScenarioError> {
    if name == BUILTIN_SCENARIO {
        Ok(Scenario::clearing())
    } else {
        Scenario::load(name)
    }
}

/// Run a single scenario, streaming JSON lines to stdout
fn cmd_run(scenario: &str, options: RunOptions) -> Result<(), String> {
    let scenario = match load_scenario(scenario) {
        Ok(scenario) => scenario,
        Err(e) => {
            print!("{}", Output::error(e.to_string()).to_json_line());
            return Err(e.to_string());
        }
    };

    ScenarioRunner::new(&scenario, options)
        .run_to_stdout()
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Run a batch of seeds and save the results
fn cmd_batch(
    scenario: String,
    count: u32,
    parallel: u32,
    output: PathBuf,
    seed: u64,
    ticks: Option<u64>,
) -> Result<(), String> {
    let loaded = load_scenario(&scenario).map_err(|e| e.to_string())?;

    std::fs::create_dir_all(&output).map_err(|e| {
        format!(
            "Cannot create output directory '{}': {e}",
            output.display()
        )
    })?;

    let config = BatchConfig {
        scenario,
        run_count: count,
        parallel_runs: parallel,
        output_dir: output.clone(),
        seed_start: seed,
        ticks,
    };
    let results = run_batch(&loaded, config);

    let results_path = output.join("batch_results.json");
    results
        .save(&results_path)
        .map_err(|e| format!("Failed to save results: {e}"))?;

    // Print summary
    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Runs: {}", results.runs.len());
    if !results.errors.is_empty() {
        eprintln!("Runs FAILED: {}", results.errors.len());
    }
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!("Survival rate: {:.1}%", summary.survival_rate * 100.0);
    eprintln!("Avg kills: {:.2}", summary.avg_kills);
    eprintln!("Avg damage taken: {:.1}", summary.avg_damage_taken);
    if let Some(tick) = summary.avg_first_death_tick {
        eprintln!("Avg first death tick: {tick:.0}");
    }
    for (item, avg) in &summary.avg_items_gained {
        eprintln!("  {item}: {avg:.2}");
    }

    for error in results.errors.iter().take(10) {
        eprintln!(
            "  Run {} (seed {}): {}",
            error.run_index, error.seed, error.message
        );
    }
    if results.errors.len() > 10 {
        eprintln!("  ... and {} more failures", results.errors.len() - 10);
    }

    eprintln!("\nResults saved to: {}", results_path.display());
    Ok(())
}

/// Verify determinism by running the same seed multiple times
fn cmd_verify(scenario: &str, seed: u64, runs: u32) -> Result<(), String> {
    tracing::info!(scenario, seed, runs, "Verifying determinism");

    let loaded = load_scenario(scenario).map_err(|e| e.to_string())?;
    if verify_determinism(&loaded, seed, runs)? {
        eprintln!("PASS: All {runs} runs produced identical results");
        Ok(())
    } else {
        Err("Non-determinism detected".to_string())
    }
}

/// Validate a scenario file without running it
fn cmd_validate(path: &Path) -> Result<(), String> {
    let scenario = Scenario::load(path).map_err(|e| e.to_string())?;
    scenario.validate().map_err(|e| e.to_string())?;
    eprintln!(
        "OK: '{}' ({} enemies, {} resources, {} ticks)",
        scenario.name,
        scenario.enemies.len(),
        scenario.resources.len(),
        scenario.ticks
    );
    Ok(())
}
