//! Headless survival runner for balance testing and CI verification.
//!
//! Loads a [`Scenario`] from RON, drives the simulation through its
//! scripted input and reports what happened:
//!
//! - **Balance testing**: Run one scenario under many seeds in parallel
//! - **CI verification**: Check that identical seeds produce identical worlds
//!
//! # Protocol
//!
//! Output uses JSON lines (one JSON object per line):
//!
//! - **stdout**: Ready, tick, night and summary lines (JSON)
//! - **stderr**: Logs (human-readable)
//!
//! See the [`protocol`] module for the line format.
//!
//! # Example
//!
//! ```bash
//! cargo run -p survival_headless -- run --scenario scenarios/meadow.ron
//! cargo run -p survival_headless -- batch --count 500 --output results/
//! ```

pub mod batch;
pub mod metrics;
pub mod protocol;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults};
pub use metrics::{BatchSummary, RunMetrics};
pub use protocol::Output;
pub use runner::{RunOptions, ScenarioRunner};
pub use scenario::{Scenario, ScenarioError};
