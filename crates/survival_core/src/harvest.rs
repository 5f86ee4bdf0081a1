//! Resource gathering.
//!
//! Harvesting is single-target and gated by its own cooldown, independent
//! of combat. Breaking a node removes it from the world and pays out its
//! reward table in the same call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{Cooldown, EntityId, ItemId};
use crate::world::EntityStorage;

/// Result of [`HarvestResolver::attempt_harvest`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HarvestOutcome {
    /// The swing landed on a resource node.
    pub hit: bool,
    /// Rejected because the previous swing has not recovered.
    pub on_cooldown: bool,
    /// HP removed.
    pub damage: f64,
    /// The node broke and was removed.
    pub destroyed: bool,
    /// Node HP after the swing.
    pub remaining_hp: f64,
    /// Node max HP.
    pub max_hp: f64,
    /// Paid out only when `destroyed`.
    pub rewards: Option<BTreeMap<ItemId, u32>>,
}

/// Applies gather damage to resource nodes.
#[derive(Debug, Clone, Default)]
pub struct HarvestResolver {
    cooldown: Cooldown,
    cooldown_duration: f64,
}

impl HarvestResolver {
    /// Create a resolver with a fixed swing interval.
    #[must_use]
    pub fn new(cooldown_duration: f64) -> Self {
        Self {
            cooldown: Cooldown::new(),
            cooldown_duration,
        }
    }

    /// Advance the harvest cooldown.
    pub fn tick(&mut self, dt: f64) {
        self.cooldown.tick(dt);
    }

    /// Whether a new swing would be accepted.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.cooldown.ready()
    }

    /// The harvest cooldown.
    #[must_use]
    pub fn cooldown(&self) -> &Cooldown {
        &self.cooldown
    }

    /// Swing at `target` for `damage`.
    ///
    /// An accepted swing consumes the cooldown even when the target turns
    /// out not to be harvestable.
    pub fn attempt_harvest(
        &mut self,
        target: EntityId,
        damage: f64,
        entities: &mut EntityStorage,
    ) -> HarvestOutcome {
        if !self.cooldown.ready() {
            return HarvestOutcome {
                on_cooldown: true,
                ..HarvestOutcome::default()
            };
        }
        self.cooldown.consume(self.cooldown_duration);

        let Some(node) = entities.get_mut(target).filter(|entity| entity.is_harvestable())
        else {
            tracing::warn!(entity = target, "Harvest target is not a resource node");
            return HarvestOutcome::default();
        };

        let outcome = node.apply_damage(damage);
        let remaining_hp = node.health.current_hp();
        let max_hp = node.health.max_hp();

        let rewards = if outcome.died {
            entities
                .remove(target)
                .and_then(|node| node.as_resource().map(|resource| resource.rewards.clone()))
        } else {
            None
        };

        if rewards.is_some() {
            tracing::info!(entity = target, "Resource node depleted");
        } else {
            tracing::debug!(entity = target, remaining_hp, "Resource node damaged");
        }

        HarvestOutcome {
            hit: true,
            on_cooldown: false,
            damage: outcome.actual_damage,
            destroyed: outcome.died,
            remaining_hp,
            max_hp,
            rewards,
        }
    }
}
