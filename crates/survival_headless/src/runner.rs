//! Scenario runner.
//!
//! Drives a [`Simulation`] through a scenario's script, handles night
//! windows and respawns, and reports every tick's events to a sink.

use std::io::{self, Write};

use survival_core::events::GameEvent;
use survival_core::inventory::Backpack;
use survival_core::simulation::{FrameInput, Simulation};

use crate::metrics::RunMetrics;
use crate::protocol::Output;
use crate::scenario::{Scenario, ScenarioError};

/// Headless runner configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Overrides the scenario's seed.
    pub seed: Option<u64>,
    /// Overrides the scenario's tick count.
    pub ticks: Option<u64>,
    /// Write only the ready and summary lines.
    pub summary_only: bool,
}

/// Runs one scenario to completion.
pub struct ScenarioRunner<'a> {
    scenario: &'a Scenario,
    options: RunOptions,
}

impl<'a> ScenarioRunner<'a> {
    /// Create a runner for `scenario`.
    #[must_use]
    pub fn new(scenario: &'a Scenario, options: RunOptions) -> Self {
        Self { scenario, options }
    }

    /// Seed the run will use.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.options.seed.unwrap_or(self.scenario.config.seed)
    }

    /// Ticks the run will simulate.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.options.ticks.unwrap_or(self.scenario.ticks)
    }

    /// Build the starting world with the effective seed.
    pub fn build(&self) -> Result<Simulation<Backpack>, ScenarioError> {
        let mut scenario = self.scenario.clone();
        scenario.config.seed = self.seed();
        scenario.build()
    }

    /// Run without producing output lines.
    pub fn run(&self) -> Result<RunMetrics, ScenarioError> {
        self.run_with(|_| {})
    }

    /// Run, writing JSON lines to `out`.
    pub fn run_to<W: Write>(&self, out: &mut W) -> Result<RunMetrics, ScenarioError> {
        let mut io_error = None;
        let mut emit = |line: Output| {
            if io_error.is_none() {
                if let Err(err) = out.write_all(line.to_json_line().as_bytes()) {
                    io_error = Some(err);
                }
            }
        };

        emit(Output::ready(&self.scenario.name, self.seed()));
        let summary_only = self.options.summary_only;
        let metrics = self.run_with(|line| {
            if !summary_only {
                emit(line);
            }
        })?;
        emit(Output::Summary(metrics.clone()));

        match io_error {
            Some(err) => Err(err.into()),
            None => {
                out.flush()?;
                Ok(metrics)
            }
        }
    }

    /// Run to stdout.
    pub fn run_to_stdout(&self) -> Result<RunMetrics, ScenarioError> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        self.run_to(&mut lock)
    }

    /// Run, handing every tick and night line to `sink`.
    pub fn run_with<F>(&self, mut sink: F) -> Result<RunMetrics, ScenarioError>
    where
        F: FnMut(Output),
    {
        let mut sim = self.build()?;
        let dt = self.scenario.dt();
        let ticks = self.ticks();
        let mut metrics = RunMetrics::new(&self.scenario.name, self.seed());
        let mut frames = self.scenario.frames();
        let idle = FrameInput::default();
        let mut night = false;
        let mut dead_since: Option<u64> = None;

        tracing::info!(
            scenario = %self.scenario.name,
            seed = self.seed(),
            ticks,
            "Run started"
        );

        for tick in 1..=ticks {
            let is_night = self.scenario.is_night(tick);
            if is_night != night {
                night = is_night;
                let enemies = if night {
                    sim.spawn_night_wave().len()
                } else {
                    sim.despawn_night_wave()
                };
                sink(Output::Night {
                    tick,
                    started: night,
                    enemies,
                });
            }

            if let (Some(delay), Some(since)) = (self.scenario.respawn_after, dead_since) {
                if tick - since >= delay {
                    sim.respawn_player();
                    dead_since = None;
                }
            }

            let input = frames.next().unwrap_or(&idle);
            // Respawn events queued above drain with this tick's events.
            let events = sim.tick(dt, input);
            if events.contains(&GameEvent::PlayerDied) {
                dead_since = Some(tick);
            }

            if !events.is_empty() {
                metrics.record(tick, &events);
                sink(Output::Tick { tick, events });
            }
        }

        metrics.finalize(ticks, sim.state_hash());
        tracing::info!(
            scenario = %self.scenario.name,
            kills = metrics.total_kills(),
            deaths = metrics.player_deaths,
            state_hash = metrics.final_state_hash,
            "Run finished"
        );
        Ok(metrics)
    }
}
