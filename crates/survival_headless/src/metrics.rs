//! Run metrics collected from the event stream.
//!
//! [`RunMetrics`] folds the events of one scenario run into counters;
//! [`BatchSummary`] aggregates many runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use survival_core::events::GameEvent;

/// Complete metrics for a single run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Scenario name.
    pub scenario: String,
    /// World seed.
    pub seed: u64,
    /// Ticks simulated.
    pub ticks: u64,
    /// Final simulation state hash (for determinism validation).
    pub final_state_hash: u64,

    // === Combat ===
    /// Successful hits on enemies.
    pub hits: u32,
    /// Total damage dealt to enemies.
    pub damage_dealt: f64,
    /// Enemies killed, by display name.
    pub kills: BTreeMap<String, u32>,
    /// Total damage the player took.
    pub damage_taken: f64,
    /// Times the player died.
    pub player_deaths: u32,
    /// Tick of the first player death.
    pub first_death_tick: Option<u64>,

    // === Gathering ===
    /// Harvest swings that landed.
    pub harvest_swings: u32,
    /// Resource nodes depleted.
    pub nodes_depleted: u32,
    /// Items gained from nodes and kills.
    pub items_gained: BTreeMap<String, u32>,
    /// Tools that broke.
    pub tools_broken: u32,

    // === Building ===
    /// Buildings placed, by type.
    pub buildings_placed: BTreeMap<String, u32>,
    /// Buildings removed.
    pub buildings_removed: u32,
    /// Interactions used.
    pub interactions: u32,
}

impl RunMetrics {
    /// Create empty metrics for a run.
    #[must_use]
    pub fn new(scenario: impl Into<String>, seed: u64) -> Self {
        Self {
            scenario: scenario.into(),
            seed,
            ..Default::default()
        }
    }

    /// Fold one tick's events in.
    pub fn record(&mut self, tick: u64, events: &[GameEvent]) {
        for event in events {
            match event {
                GameEvent::DamageDealt {
                    damage,
                    killed,
                    target_name,
                    ..
                } => {
                    self.hits += 1;
                    self.damage_dealt += damage;
                    if *killed {
                        *self.kills.entry(target_name.clone()).or_default() += 1;
                    }
                }
                GameEvent::ResourceHarvested {
                    destroyed, rewards, ..
                } => {
                    self.harvest_swings += 1;
                    if *destroyed {
                        self.nodes_depleted += 1;
                    }
                    for (item, count) in rewards.iter().flatten() {
                        *self.items_gained.entry(item.to_string()).or_default() += count;
                    }
                }
                GameEvent::EnemyDied { drops, .. } => {
                    for (item, count) in drops {
                        *self.items_gained.entry(item.to_string()).or_default() += count;
                    }
                }
                GameEvent::ToolBroken { .. } => self.tools_broken += 1,
                GameEvent::BuildingPlaced { building } => {
                    *self
                        .buildings_placed
                        .entry(building.building_type.to_string())
                        .or_default() += 1;
                }
                GameEvent::BuildingRemoved { .. } => self.buildings_removed += 1,
                GameEvent::PlayerDamaged { damage, .. } => self.damage_taken += damage,
                GameEvent::PlayerDied => {
                    self.player_deaths += 1;
                    self.first_death_tick.get_or_insert(tick);
                }
                GameEvent::InteractionTriggered { .. } => self.interactions += 1,
                GameEvent::BuildModeChanged { .. } | GameEvent::PlayerRespawned { .. } => {}
            }
        }
    }

    /// Total enemies killed.
    #[must_use]
    pub fn total_kills(&self) -> u32 {
        self.kills.values().sum()
    }

    /// Finish the run.
    pub fn finalize(&mut self, ticks: u64, final_state_hash: u64) {
        self.ticks = ticks;
        self.final_state_hash = final_state_hash;
    }
}

/// Summary statistics across multiple runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total runs.
    pub total_runs: u32,
    /// Runs in which the player never died.
    pub survived: u32,
    /// Survival rate in `[0, 1]`.
    pub survival_rate: f64,
    /// Average kills per run.
    pub avg_kills: f64,
    /// Average damage taken per run.
    pub avg_damage_taken: f64,
    /// Average tick of the first death, over runs with a death.
    pub avg_first_death_tick: Option<f64>,
    /// Average items gained per run, by item.
    pub avg_items_gained: BTreeMap<String, f64>,
    /// Distinct final state hashes.
    pub distinct_hashes: usize,
}

impl BatchSummary {
    /// Calculate summary from a list of run metrics.
    #[must_use]
    pub fn from_runs(runs: &[RunMetrics]) -> Self {
        if runs.is_empty() {
            return Self::default();
        }

        let count = runs.len() as f64;
        let survived = runs.iter().filter(|run| run.player_deaths == 0).count() as u32;

        let death_ticks: Vec<u64> = runs.iter().filter_map(|run| run.first_death_tick).collect();
        let avg_first_death_tick = (!death_ticks.is_empty())
            .then(|| death_ticks.iter().sum::<u64>() as f64 / death_ticks.len() as f64);

        let mut items: BTreeMap<String, u32> = BTreeMap::new();
        for run in runs {
            for (item, gained) in &run.items_gained {
                *items.entry(item.clone()).or_default() += gained;
            }
        }

        let mut hashes: Vec<u64> = runs.iter().map(|run| run.final_state_hash).collect();
        hashes.sort_unstable();
        hashes.dedup();

        Self {
            total_runs: runs.len() as u32,
            survived,
            survival_rate: f64::from(survived) / count,
            avg_kills: runs.iter().map(|run| f64::from(run.total_kills())).sum::<f64>() / count,
            avg_damage_taken: runs.iter().map(|run| run.damage_taken).sum::<f64>() / count,
            avg_first_death_tick,
            avg_items_gained: items
                .into_iter()
                .map(|(item, total)| (item, f64::from(total) / count))
                .collect(),
            distinct_hashes: hashes.len(),
        }
    }
}
