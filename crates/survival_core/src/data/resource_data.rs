//! Harvestable resource node definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::ItemId;
use crate::error::{GameError, Result};

/// Data-driven resource node definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceArchetype {
    /// Display name.
    pub name: String,
    /// Resource category used for tool gather damage (`"wood"`, `"stone"`).
    pub resource_type: String,
    /// Hit points to deplete before the node breaks.
    pub max_hp: f64,
    /// Items paid out when the node breaks.
    pub rewards: BTreeMap<ItemId, u32>,
    /// Collision half extents.
    pub half_extents: glam::DVec3,
}

impl ResourceArchetype {
    /// A choppable tree.
    #[must_use]
    pub fn tree() -> Self {
        Self {
            name: "Tree".to_string(),
            resource_type: "wood".to_string(),
            max_hp: 100.0,
            rewards: BTreeMap::from([(ItemId::from("wood"), 4)]),
            half_extents: glam::DVec3::new(0.4, 3.0, 0.4),
        }
    }

    /// A mineable rock.
    #[must_use]
    pub fn rock() -> Self {
        Self {
            name: "Rock".to_string(),
            resource_type: "stone".to_string(),
            max_hp: 120.0,
            rewards: BTreeMap::from([(ItemId::from("stone"), 2)]),
            half_extents: glam::DVec3::new(0.8, 0.6, 0.8),
        }
    }

    /// Override hit points.
    #[must_use]
    pub fn with_hp(mut self, max_hp: f64) -> Self {
        self.max_hp = max_hp;
        self
    }

    /// Override the reward table.
    #[must_use]
    pub fn with_rewards(mut self, rewards: BTreeMap<ItemId, u32>) -> Self {
        self.rewards = rewards;
        self
    }

    /// Built-in archetype by key (`tree`, `rock`).
    pub fn preset(key: &str) -> Result<Self> {
        match key {
            "tree" => Ok(Self::tree()),
            "rock" => Ok(Self::rock()),
            other => Err(GameError::UnknownResource(other.to_string())),
        }
    }
}
