//! Outbound notifications for UI and audio collaborators.
//!
//! Events are queued in the order they happen and handed out exactly once
//! by [`EventQueue::drain`].

use std::collections::{BTreeMap, VecDeque};

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::buildings::PlacedBuilding;
use crate::components::{EntityId, ItemId};
use crate::data::BuildingTypeId;
use crate::interaction::InteractionEffect;

/// A notification published by the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    /// The player's attack damaged a target.
    DamageDealt {
        /// Damaged entity.
        target: EntityId,
        /// HP removed.
        damage: f64,
        /// Target position at impact.
        position: DVec3,
        /// Whether the hit killed the target.
        killed: bool,
        /// Target display name.
        target_name: String,
    },
    /// A harvest swing landed on a resource node.
    ResourceHarvested {
        /// Harvested node.
        target: EntityId,
        /// HP removed.
        damage: f64,
        /// Whether the node broke.
        destroyed: bool,
        /// Items paid out, only when destroyed.
        rewards: Option<BTreeMap<ItemId, u32>>,
        /// Node HP after the swing.
        remaining_hp: f64,
        /// Node max HP.
        max_hp: f64,
        /// Whether the tool broke on this swing.
        tool_broken: bool,
        /// Tool durability left, if a tool was used.
        tool_remaining: Option<u32>,
    },
    /// The held tool ran out of durability.
    ToolBroken {
        /// Broken item.
        item_id: ItemId,
    },
    /// An enemy died.
    EnemyDied {
        /// Dead enemy.
        enemy_id: EntityId,
        /// Items dropped into the player's inventory.
        drops: BTreeMap<ItemId, u32>,
        /// Where it died.
        position: DVec3,
    },
    /// A building was placed.
    BuildingPlaced {
        /// The new building.
        building: PlacedBuilding,
    },
    /// A building was removed.
    BuildingRemoved {
        /// The removed building.
        building: PlacedBuilding,
    },
    /// Build mode was entered, changed or left.
    BuildModeChanged {
        /// Whether build mode is now active.
        is_building: bool,
        /// Selected building type while active.
        building_id: Option<BuildingTypeId>,
    },
    /// An enemy hit the player.
    PlayerDamaged {
        /// HP removed.
        damage: f64,
        /// Player HP afterwards.
        current_hp: f64,
        /// Player max HP.
        max_hp: f64,
        /// Attacking entity.
        source: EntityId,
    },
    /// The player's HP reached zero.
    PlayerDied,
    /// The player came back at the spawn point.
    PlayerRespawned {
        /// HP after respawning.
        current_hp: f64,
    },
    /// The player used an interactable.
    InteractionTriggered {
        /// Interactable entity.
        target: EntityId,
        /// What the interaction asks the UI to do.
        effect: InteractionEffect,
    },
}

/// FIFO queue of pending [`GameEvent`]s.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: VecDeque<GameEvent>,
}

impl EventQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&mut self, event: GameEvent) {
        self.events.push_back(event);
    }

    /// Take every pending event, oldest first.
    pub fn drain(&mut self) -> Vec<GameEvent> {
        self.events.drain(..).collect()
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
