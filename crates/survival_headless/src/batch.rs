//! Batch runner for balance testing.
//!
//! Runs one scenario under many seeds in parallel using rayon and
//! aggregates the run metrics.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::metrics::{BatchSummary, RunMetrics};
use crate::runner::{RunOptions, ScenarioRunner};
use crate::scenario::Scenario;

/// Configuration for a batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario label (file path or built-in name)
    pub scenario: String,
    /// Number of runs
    pub run_count: u32,
    /// Maximum parallel runs (0 = use rayon default)
    pub parallel_runs: u32,
    /// Output directory for results
    pub output_dir: PathBuf,
    /// Starting seed; run `i` uses `seed_start + i`
    pub seed_start: u64,
    /// Tick count override
    pub ticks: Option<u64>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: "clearing".to_string(),
            run_count: 100,
            parallel_runs: 0,
            output_dir: PathBuf::from("results"),
            seed_start: 0,
            ticks: None,
        }
    }
}

impl BatchConfig {
    /// Create config for a specific scenario
    #[must_use]
    pub fn new(scenario: &str, run_count: u32) -> Self {
        Self {
            scenario: scenario.to_string(),
            run_count,
            ..Default::default()
        }
    }

    /// Set output directory
    #[must_use]
    pub fn with_output(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Set seed start
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set tick count
    #[must_use]
    pub fn with_ticks(mut self, ticks: u64) -> Self {
        self.ticks = Some(ticks);
        self
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual run metrics, in seed order
    pub runs: Vec<RunMetrics>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Error during batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Run index
    pub run_index: u32,
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

fn run_single(scenario: &Scenario, seed: u64, ticks: Option<u64>) -> Result<RunMetrics, String> {
    let options = RunOptions {
        seed: Some(seed),
        ticks,
        summary_only: true,
    };
    ScenarioRunner::new(scenario, options)
        .run()
        .map_err(|err| err.to_string())
}

/// Run a batch of seeded runs of `scenario`
pub fn run_batch(scenario: &Scenario, config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    let completed = AtomicU32::new(0);

    info!(
        runs = config.run_count,
        scenario = %config.scenario,
        "Starting batch run"
    );

    // Configure thread pool if specified
    if config.parallel_runs > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_runs as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let results: Vec<Result<RunMetrics, BatchError>> = (0..config.run_count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            match run_single(scenario, seed, config.ticks) {
                Ok(metrics) => {
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if done % 10 == 0 {
                        debug!(done, total = config.run_count, "Batch progress");
                    }
                    Ok(metrics)
                }
                Err(message) => {
                    warn!(run = i, seed, %message, "Run failed");
                    Err(BatchError {
                        run_index: i,
                        seed,
                        message,
                    })
                }
            }
        })
        .collect();

    let (runs, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let runs: Vec<RunMetrics> = runs.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_runs(&runs);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        runs = runs.len(),
        errors = errors.len(),
        duration_seconds,
        survival_rate = summary.survival_rate,
        "Batch complete"
    );

    BatchResults {
        config,
        runs,
        summary,
        duration_seconds,
        errors,
    }
}

/// Run the same seed `runs` times and check every final state matches.
pub fn verify_determinism(scenario: &Scenario, seed: u64, runs: u32) -> Result<bool, String> {
    let results = (0..runs.max(1))
        .map(|_| run_single(scenario, seed, None))
        .collect::<Result<Vec<_>, _>>()?;

    let first = &results[0];
    Ok(results.iter().all(|run| run == first))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    use crate::scenario::EnemyPlacement;

    fn short_night() -> Scenario {
        Scenario {
            name: "Short Night".to_string(),
            enemies: vec![EnemyPlacement::new("wild_boar", DVec3::new(6.0, 0.4, 0.0))],
            nights: vec![(10, 150)],
            ticks: 160,
            ..Scenario::default()
        }
    }

    #[test]
    fn test_batch_config_default() {
        let config = BatchConfig::default();
        assert_eq!(config.run_count, 100);
        assert_eq!(config.scenario, "clearing");
    }

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new("custom_scenario", 500)
            .with_output(PathBuf::from("/tmp/results"))
            .with_seed(12345)
            .with_ticks(50);

        assert_eq!(config.scenario, "custom_scenario");
        assert_eq!(config.run_count, 500);
        assert_eq!(config.seed_start, 12345);
        assert_eq!(config.ticks, Some(50));
    }

    #[test]
    fn test_run_batch_small() {
        let results = run_batch(&short_night(), BatchConfig::new("short_night", 6).with_seed(40));

        assert_eq!(results.runs.len(), 6);
        assert!(results.errors.is_empty());
        assert_eq!(results.summary.total_runs, 6);
        let seeds: Vec<u64> = results.runs.iter().map(|run| run.seed).collect();
        assert_eq!(seeds, vec![40, 41, 42, 43, 44, 45]);
    }

    #[test]
    fn test_invalid_scenario_reports_errors() {
        let broken = Scenario {
            enemies: vec![EnemyPlacement::new("dragon", DVec3::ZERO)],
            ..Scenario::default()
        };
        let results = run_batch(&broken, BatchConfig::new("broken", 3));

        assert!(results.runs.is_empty());
        assert_eq!(results.errors.len(), 3);
        assert!(results.errors[0].message.contains("dragon"));
    }

    #[test]
    fn test_verify_determinism() {
        assert_eq!(verify_determinism(&short_night(), 12345, 3), Ok(true));
    }

    #[test]
    fn test_batch_results_save_load() {
        let results = run_batch(&short_night(), BatchConfig::new("short_night", 3).with_ticks(40));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("results.json");

        results.save(&path).unwrap();
        assert!(path.exists());

        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.runs, results.runs);
        assert_eq!(loaded.config, results.config);
        assert!(loaded.runs.iter().all(|run| run.ticks == 40));
    }
}
