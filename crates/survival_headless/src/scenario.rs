//! Scenario loading and configuration.
//!
//! Scenarios define a starting world for headless runs: configuration,
//! terrain, what stands where, what the player carries and a scripted
//! sequence of frame inputs.

use std::collections::BTreeMap;
use std::path::Path;

use glam::DVec3;
use serde::{Deserialize, Serialize};
use survival_core::components::ItemId;
use survival_core::config::SimConfig;
use survival_core::data::{EnemyArchetype, ResourceArchetype};
use survival_core::error::GameError;
use survival_core::inventory::Backpack;
use survival_core::simulation::{FrameInput, Simulation};
use survival_core::spatial::{HeightSource, TerrainProfile};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Parsed, but refers to unknown data or breaks a config rule.
    #[error("Invalid scenario: {0}")]
    Invalid(#[from] GameError),
}

/// Default simulation rate for scenarios, in ticks per second.
pub const DEFAULT_TICK_RATE: f64 = 20.0;

fn default_repeat() -> u32 {
    1
}

/// A complete scenario configuration.
///
/// # Example RON
///
/// ```ron
/// Scenario(
///     name: "Clearing",
///     ticks: 200,
///     enemies: [(preset: "wild_boar", position: (6.0, 0.4, 0.0))],
///     resources: [(preset: "tree", position: (0.0, 0.0, 3.0))],
///     script: [(repeat: 40, input: (forward: Some((0.0, 0.0, 1.0)), primary: true))],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Simulation settings, including the seed.
    pub config: SimConfig,
    /// Ground shape.
    pub terrain: TerrainProfile,
    /// Player spawn `(x, z)`; height comes from the terrain.
    pub player_spawn: Option<(f64, f64)>,
    /// Enemies present at start.
    pub enemies: Vec<EnemyPlacement>,
    /// Resource nodes present at start.
    pub resources: Vec<ResourcePlacement>,
    /// Starting inventory.
    pub inventory: Backpack,
    /// Ticks to run; frames past the end of the script are idle.
    pub ticks: u64,
    /// Ticks per second.
    pub tick_rate: f64,
    /// Night windows as `(start_tick, end_tick)`.
    pub nights: Vec<(u64, u64)>,
    /// Ticks after death before the player respawns; `None` keeps them dead.
    pub respawn_after: Option<u64>,
    /// Scripted input.
    pub script: Vec<ScriptStep>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "Empty Meadow".to_string(),
            description: "Flat ground, nothing around".to_string(),
            config: SimConfig::default(),
            terrain: TerrainProfile::default(),
            player_spawn: None,
            enemies: Vec::new(),
            resources: Vec::new(),
            inventory: Backpack::default(),
            ticks: 600,
            tick_rate: DEFAULT_TICK_RATE,
            nights: Vec::new(),
            respawn_after: None,
            script: Vec::new(),
        }
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// Standard practice clearing: a dummy, two trees, a rock and a boar.
    #[must_use]
    pub fn clearing() -> Self {
        let swing_at = |forward: DVec3, repeat: u32| ScriptStep {
            repeat,
            input: FrameInput {
                forward: Some(forward),
                primary: true,
                ..FrameInput::default()
            },
        };

        Self {
            name: "Clearing".to_string(),
            description: "Chop, mine and fight around the spawn point".to_string(),
            enemies: vec![
                EnemyPlacement::new("training_dummy", DVec3::new(2.0, 1.0, 0.0)),
                EnemyPlacement::new("wild_boar", DVec3::new(14.0, 0.4, -6.0)),
            ],
            resources: vec![
                ResourcePlacement::new("tree", DVec3::new(0.0, 0.0, 2.0)),
                ResourcePlacement::new("tree", DVec3::new(-2.0, 0.0, 0.0)),
                ResourcePlacement::new("rock", DVec3::new(0.0, 0.6, -2.0)),
            ],
            inventory: Backpack::new()
                .holding("stone_axe", Some(60))
                .with_item("wood", 10)
                .with_item("stone", 5),
            ticks: 800,
            respawn_after: Some(100),
            script: vec![
                swing_at(DVec3::X, 200),
                swing_at(DVec3::Z, 200),
                swing_at(DVec3::NEG_X, 200),
            ],
            ..Self::default()
        }
    }

    /// Seconds per tick.
    #[must_use]
    pub fn dt(&self) -> f64 {
        1.0 / self.tick_rate
    }

    /// Check everything a run would trip over, without building the world.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        self.config.validate()?;
        if self.tick_rate.is_nan() || self.tick_rate <= 0.0 {
            return Err(GameError::InvalidConfig(format!(
                "tick_rate must be positive, got {}",
                self.tick_rate
            ))
            .into());
        }
        for placement in &self.enemies {
            placement.archetype()?;
        }
        for placement in &self.resources {
            placement.archetype()?;
        }
        if let Some(&(start, end)) = self.nights.iter().find(|(start, end)| end <= start) {
            return Err(GameError::InvalidConfig(format!(
                "night window ({start}, {end}) ends before it starts"
            ))
            .into());
        }
        Ok(())
    }

    /// Build the starting world.
    pub fn build(&self) -> Result<Simulation<Backpack>, ScenarioError> {
        self.validate()?;

        let mut sim = Simulation::new(
            self.config.clone(),
            self.terrain.clone(),
            self.inventory.clone(),
        )?;
        if let Some((x, z)) = self.player_spawn {
            let spawn = DVec3::new(x, self.terrain.height_at(x, z), z);
            sim = sim.with_player_spawn(spawn);
        }

        for placement in &self.enemies {
            sim.spawn_enemy(&placement.archetype()?, placement.position);
        }
        for placement in &self.resources {
            sim.spawn_resource(&placement.archetype()?, placement.position);
        }

        tracing::debug!(
            scenario = %self.name,
            enemies = self.enemies.len(),
            resources = self.resources.len(),
            "Scenario world built"
        );
        Ok(sim)
    }

    /// The scripted frames, expanded, in order.
    pub fn frames(&self) -> impl Iterator<Item = &FrameInput> {
        self.script
            .iter()
            .flat_map(|step| std::iter::repeat(&step.input).take(step.repeat as usize))
    }

    /// Whether `tick` falls inside a night window.
    #[must_use]
    pub fn is_night(&self, tick: u64) -> bool {
        self.nights
            .iter()
            .any(|&(start, end)| tick >= start && tick < end)
    }
}

/// Placement of an enemy at scenario start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyPlacement {
    /// Built-in archetype key.
    pub preset: String,
    /// Spawn position.
    pub position: DVec3,
    /// HP override.
    #[serde(default)]
    pub max_hp: Option<f64>,
}

impl EnemyPlacement {
    /// Create a new enemy placement.
    #[must_use]
    pub fn new(preset: impl Into<String>, position: DVec3) -> Self {
        Self {
            preset: preset.into(),
            position,
            max_hp: None,
        }
    }

    /// Resolved archetype with overrides applied.
    pub fn archetype(&self) -> Result<EnemyArchetype, GameError> {
        let mut archetype = EnemyArchetype::preset(&self.preset)?;
        if let Some(max_hp) = self.max_hp {
            archetype.max_hp = max_hp;
        }
        Ok(archetype)
    }
}

/// Placement of a resource node at scenario start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcePlacement {
    /// Built-in archetype key.
    pub preset: String,
    /// Node position.
    pub position: DVec3,
    /// HP override.
    #[serde(default)]
    pub max_hp: Option<f64>,
    /// Reward table override.
    #[serde(default)]
    pub rewards: Option<BTreeMap<ItemId, u32>>,
}

impl ResourcePlacement {
    /// Create a new resource placement.
    #[must_use]
    pub fn new(preset: impl Into<String>, position: DVec3) -> Self {
        Self {
            preset: preset.into(),
            position,
            max_hp: None,
            rewards: None,
        }
    }

    /// Resolved archetype with overrides applied.
    pub fn archetype(&self) -> Result<ResourceArchetype, GameError> {
        let mut archetype = ResourceArchetype::preset(&self.preset)?;
        if let Some(max_hp) = self.max_hp {
            archetype = archetype.with_hp(max_hp);
        }
        if let Some(rewards) = &self.rewards {
            archetype = archetype.with_rewards(rewards.clone());
        }
        Ok(archetype)
    }
}

/// One scripted input held for `repeat` ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    /// How many ticks the input is held.
    #[serde(default = "default_repeat")]
    pub repeat: u32,
    /// The input.
    pub input: FrameInput,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scenario() {
        let scenario = Scenario::default();
        assert!(scenario.enemies.is_empty());
        assert_eq!(scenario.dt(), 0.05);
        assert!(scenario.validate().is_ok());
    }

    #[test]
    fn test_clearing_scenario_builds() {
        let scenario = Scenario::clearing();
        let sim = scenario.build().unwrap();
        assert_eq!(sim.entities().len(), 5);
        assert_eq!(scenario.frames().count(), 600);
    }

    #[test]
    fn test_parse_from_ron() {
        let ron = r#"
            Scenario(
                name: "Test",
                ticks: 50,
                terrain: Plane(base: 0.0, slope_x: 0.1, slope_z: 0.0),
                player_spawn: Some((1.0, 2.0)),
                enemies: [(preset: "wolf", position: (8.0, 0.45, 0.0), max_hp: Some(10.0))],
                resources: [(preset: "tree", position: (0.0, 0.0, 3.0))],
                inventory: (items: {"wood": 5}, hand: Some((item: "stone_axe", durability: Some(3)))),
                script: [(repeat: 5, input: (primary: true))],
                nights: [(10, 20)],
            )
        "#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.name, "Test");
        assert_eq!(scenario.tick_rate, DEFAULT_TICK_RATE);
        assert_eq!(scenario.enemies[0].archetype().unwrap().max_hp, 10.0);
        assert_eq!(scenario.frames().count(), 5);
        assert!(scenario.is_night(10));
        assert!(!scenario.is_night(20));

        let sim = scenario.build().unwrap();
        assert!((sim.player().position.y - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_preset_is_invalid() {
        let scenario = Scenario {
            enemies: vec![EnemyPlacement::new("dragon", DVec3::ZERO)],
            ..Scenario::default()
        };
        assert!(matches!(
            scenario.build(),
            Err(ScenarioError::Invalid(GameError::UnknownEnemy(_)))
        ));
    }

    #[test]
    fn test_bad_night_window_is_invalid() {
        let scenario = Scenario {
            nights: vec![(30, 10)],
            ..Scenario::default()
        };
        assert!(matches!(
            scenario.validate(),
            Err(ScenarioError::Invalid(GameError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_bundled_meadow_scenario_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../scenarios/meadow.ron");
        let scenario = Scenario::load(path).unwrap();
        assert_eq!(scenario.name, "Meadow");
        assert!(scenario.is_night(1200));

        let sim = scenario.build().unwrap();
        assert_eq!(sim.entities().len(), 4);
        assert_eq!(scenario.frames().count(), 1603);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grove.ron");
        std::fs::write(
            &path,
            r#"(name: "Grove", resources: [(preset: "rock", position: (1.0, 0.6, 0.0), max_hp: Some(5.0))])"#,
        )
        .unwrap();

        let scenario = Scenario::load(&path).unwrap();
        assert_eq!(scenario.name, "Grove");
        assert_eq!(scenario.resources[0].archetype().unwrap().max_hp, 5.0);

        std::fs::write(&path, "(name: ").unwrap();
        assert!(matches!(
            Scenario::load(&path),
            Err(ScenarioError::ParseError(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Scenario::load("does/not/exist.ron"),
            Err(ScenarioError::FileNotFound(_))
        ));
    }
}
