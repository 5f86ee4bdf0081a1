//! Enemy archetype definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::ItemId;
use crate::error::{GameError, Result};

/// Behaviour tuning of an AI-driven enemy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiProfile {
    /// Player distance that starts a chase.
    pub detection_range: f64,
    /// Distance at which the enemy can strike.
    pub attack_range: f64,
    /// Player distance beyond which a chase is abandoned.
    pub chase_range: f64,
    /// Chase speed in units per second.
    pub move_speed: f64,
    /// Patrol speed in units per second.
    pub patrol_speed: f64,
    /// Radius around the spawn point used for patrol points.
    pub patrol_radius: f64,
    /// Raw damage of one strike.
    pub attack_damage: f64,
    /// Seconds between strikes.
    pub attack_cooldown: f64,
}

/// Data-driven enemy definition.
///
/// # Example RON
///
/// ```ron
/// EnemyArchetype(
///     name: "Wild Boar",
///     max_hp: 50.0,
///     defense: 2.0,
///     half_extents: (0.5, 0.4, 0.7),
///     drops: {"raw_meat": 2, "leather": 1},
///     ai: Some((
///         detection_range: 10.0,
///         attack_range: 1.5,
///         chase_range: 20.0,
///         move_speed: 3.0,
///         patrol_speed: 1.5,
///         patrol_radius: 15.0,
///         attack_damage: 10.0,
///         attack_cooldown: 1.5,
///     )),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyArchetype {
    /// Display name.
    pub name: String,
    /// Maximum hit points.
    pub max_hp: f64,
    /// Flat damage reduction.
    #[serde(default)]
    pub defense: f64,
    /// Collision half extents.
    #[serde(default = "default_half_extents")]
    pub half_extents: glam::DVec3,
    /// Items added to the player's inventory on death.
    #[serde(default)]
    pub drops: BTreeMap<ItemId, u32>,
    /// AI tuning; `None` for stationary targets.
    #[serde(default)]
    pub ai: Option<AiProfile>,
}

fn default_half_extents() -> glam::DVec3 {
    glam::DVec3::new(0.5, 0.5, 0.5)
}

fn drops(entries: &[(&str, u32)]) -> BTreeMap<ItemId, u32> {
    entries
        .iter()
        .map(|(item, count)| (ItemId::from(*item), *count))
        .collect()
}

impl EnemyArchetype {
    /// Stationary practice target.
    #[must_use]
    pub fn training_dummy() -> Self {
        Self {
            name: "Training Dummy".to_string(),
            max_hp: 100.0,
            defense: 0.0,
            half_extents: glam::DVec3::new(0.4, 1.0, 0.4),
            drops: drops(&[("wood", 2), ("stone", 1)]),
            ai: None,
        }
    }

    /// Daytime wildlife.
    #[must_use]
    pub fn wild_boar() -> Self {
        Self {
            name: "Wild Boar".to_string(),
            max_hp: 50.0,
            defense: 2.0,
            half_extents: glam::DVec3::new(0.5, 0.4, 0.7),
            drops: drops(&[("raw_meat", 2), ("leather", 1)]),
            ai: Some(AiProfile {
                detection_range: 10.0,
                attack_range: 1.5,
                chase_range: 20.0,
                move_speed: 3.0,
                patrol_speed: 1.5,
                patrol_radius: 15.0,
                attack_damage: 10.0,
                attack_cooldown: 1.5,
            }),
        }
    }

    /// Night creature.
    #[must_use]
    pub fn wanderer() -> Self {
        Self {
            name: "Wanderer".to_string(),
            max_hp: 45.0,
            defense: 3.0,
            half_extents: glam::DVec3::new(0.4, 0.9, 0.4),
            drops: drops(&[("fiber", 3), ("stone", 2)]),
            ai: Some(AiProfile {
                detection_range: 15.0,
                attack_range: 1.8,
                chase_range: 25.0,
                move_speed: 4.0,
                patrol_speed: 2.0,
                patrol_radius: 25.0,
                attack_damage: 15.0,
                attack_cooldown: 1.2,
            }),
        }
    }

    /// Fast night hunter.
    #[must_use]
    pub fn wolf() -> Self {
        Self {
            name: "Wolf".to_string(),
            max_hp: 40.0,
            defense: 1.0,
            half_extents: glam::DVec3::new(0.35, 0.45, 0.7),
            drops: drops(&[("raw_meat", 1), ("leather", 2)]),
            ai: Some(AiProfile {
                detection_range: 12.0,
                attack_range: 1.5,
                chase_range: 30.0,
                move_speed: 5.0,
                patrol_speed: 2.5,
                patrol_radius: 20.0,
                attack_damage: 12.0,
                attack_cooldown: 1.0,
            }),
        }
    }

    /// Built-in archetype by key (`training_dummy`, `wild_boar`,
    /// `wanderer`, `wolf`).
    pub fn preset(key: &str) -> Result<Self> {
        match key {
            "training_dummy" => Ok(Self::training_dummy()),
            "wild_boar" => Ok(Self::wild_boar()),
            "wanderer" => Ok(Self::wanderer()),
            "wolf" => Ok(Self::wolf()),
            other => Err(GameError::UnknownEnemy(other.to_string())),
        }
    }

    /// Parse an archetype from RON.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        ron::from_str(ron).map_err(|err| GameError::parse("enemy archetype", &err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let boar = EnemyArchetype::preset("wild_boar").unwrap();
        assert_eq!(boar.max_hp, 50.0);
        assert_eq!(boar.ai.as_ref().unwrap().detection_range, 10.0);

        let dummy = EnemyArchetype::preset("training_dummy").unwrap();
        assert!(dummy.ai.is_none());

        assert!(matches!(
            EnemyArchetype::preset("dragon"),
            Err(GameError::UnknownEnemy(_))
        ));
    }

    #[test]
    fn test_archetype_from_ron() {
        let ron = r#"(
            name: "Rat",
            max_hp: 8.0,
            drops: {"raw_meat": 1},
        )"#;
        let rat = EnemyArchetype::from_ron_str(ron).unwrap();
        assert_eq!(rat.defense, 0.0);
        assert_eq!(rat.half_extents, glam::DVec3::new(0.5, 0.5, 0.5));
        assert!(rat.ai.is_none());
    }
}
