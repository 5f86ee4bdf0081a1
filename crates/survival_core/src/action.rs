//! Primary action arbitration.
//!
//! Decides each tick which single action the primary button would perform.
//! Categories are checked in a fixed order: building, combat, harvest,
//! otherwise idle.

use std::fmt;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::config::SimConfig;
use crate::math::Ray;
use crate::spatial::SpatialQuery;
use crate::world::EntityStorage;

/// What the primary action resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ActionCategory {
    /// Place the previewed building.
    Building,
    /// Swing at an enemy.
    Combat,
    /// Gather from a resource node.
    Harvest,
    /// Nothing to do.
    #[default]
    Idle,
}

impl fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Building => "building",
            Self::Combat => "combat",
            Self::Harvest => "harvest",
            Self::Idle => "idle",
        };
        f.write_str(name)
    }
}

/// Player state the arbiter reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionContext {
    /// Player position; engagement distances are measured from here.
    pub actor: DVec3,
    /// View ray.
    pub view: Ray,
    /// Build mode is active.
    pub building: bool,
    /// Player is alive.
    pub alive: bool,
}

/// Per-tick action classifier.
#[derive(Debug, Clone, Default)]
pub struct ActionArbiter {
    current: ActionCategory,
    target: Option<EntityId>,
}

impl ActionArbiter {
    /// Idle arbiter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-classify for this tick.
    pub fn classify(
        &mut self,
        ctx: &ActionContext,
        spatial: &dyn SpatialQuery,
        entities: &EntityStorage,
        config: &SimConfig,
    ) -> ActionCategory {
        let (category, target) = Self::evaluate(ctx, spatial, entities, config);
        if category != self.current {
            tracing::debug!(from = %self.current, to = %category, "Action category changed");
        }
        self.current = category;
        self.target = target;
        category
    }

    fn evaluate(
        ctx: &ActionContext,
        spatial: &dyn SpatialQuery,
        entities: &EntityStorage,
        config: &SimConfig,
    ) -> (ActionCategory, Option<EntityId>) {
        if !ctx.alive {
            return (ActionCategory::Idle, None);
        }
        if ctx.building {
            return (ActionCategory::Building, None);
        }

        let probe = |filter: &dyn Fn(EntityId) -> bool, reach: f64| {
            spatial
                .probe(&ctx.view, config.view_probe_distance, filter)
                .filter(|hit| ctx.actor.distance(hit.point) <= reach)
                .map(|hit| hit.id)
        };

        if let Some(id) = probe(
            &|id| entities.is_attackable(id),
            config.combat_engagement_distance,
        ) {
            return (ActionCategory::Combat, Some(id));
        }
        if let Some(id) = probe(
            &|id| entities.is_harvestable(id),
            config.harvest_engagement_distance,
        ) {
            return (ActionCategory::Harvest, Some(id));
        }
        (ActionCategory::Idle, None)
    }

    /// Latest classification.
    #[must_use]
    pub fn current(&self) -> ActionCategory {
        self.current
    }

    /// Entity behind the latest combat or harvest classification.
    #[must_use]
    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Category to execute, if any.
    #[must_use]
    pub fn dispatch(&self, ui_blocked: bool) -> Option<ActionCategory> {
        if ui_blocked || self.current == ActionCategory::Idle {
            None
        } else {
            Some(self.current)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildings::BuildingRegistry;
    use crate::data::{EnemyArchetype, ResourceArchetype};
    use crate::spatial::{SpatialIndex, TerrainProfile};
    use crate::world::Entity;

    fn context() -> ActionContext {
        ActionContext {
            actor: DVec3::ZERO,
            view: Ray::new(DVec3::new(0.0, 1.0, 0.0), DVec3::X),
            building: false,
            alive: true,
        }
    }

    fn classify(ctx: &ActionContext, entities: &EntityStorage) -> ActionCategory {
        let terrain = TerrainProfile::default();
        let index = SpatialIndex::build(entities, &BuildingRegistry::new(), &terrain);
        ActionArbiter::new().classify(ctx, &index, entities, &SimConfig::default())
    }

    #[test]
    fn test_building_beats_combat() {
        let mut entities = EntityStorage::new();
        entities.insert(Entity::enemy(&EnemyArchetype::training_dummy(), DVec3::new(2.0, 1.0, 0.0)));

        let ctx = ActionContext {
            building: true,
            ..context()
        };
        assert_eq!(classify(&ctx, &entities), ActionCategory::Building);
        assert_eq!(classify(&context(), &entities), ActionCategory::Combat);
    }

    #[test]
    fn test_combat_beats_harvest() {
        let mut entities = EntityStorage::new();
        entities.insert(Entity::resource(&ResourceArchetype::tree(), DVec3::new(2.5, 0.0, 0.0)));
        assert_eq!(classify(&context(), &entities), ActionCategory::Harvest);

        entities.insert(Entity::enemy(&EnemyArchetype::training_dummy(), DVec3::new(2.0, 1.0, 0.0)));
        assert_eq!(classify(&context(), &entities), ActionCategory::Combat);
    }

    #[test]
    fn test_engagement_distance_is_from_actor() {
        let mut entities = EntityStorage::new();
        // Front faces at x = 3.6, beyond combat (3.0) and harvest (3.5) reach.
        entities.insert(Entity::enemy(&EnemyArchetype::training_dummy(), DVec3::new(4.0, 1.0, 0.0)));
        entities.insert(Entity::resource(&ResourceArchetype::tree(), DVec3::new(4.0, 0.0, 0.0)));
        assert_eq!(classify(&context(), &entities), ActionCategory::Idle);
    }

    #[test]
    fn test_dead_player_is_idle() {
        let mut entities = EntityStorage::new();
        entities.insert(Entity::enemy(&EnemyArchetype::training_dummy(), DVec3::new(2.0, 1.0, 0.0)));
        let ctx = ActionContext {
            alive: false,
            building: true,
            ..context()
        };
        assert_eq!(classify(&ctx, &entities), ActionCategory::Idle);
    }

    #[test]
    fn test_dispatch_gates() {
        let mut arbiter = ActionArbiter::new();
        assert_eq!(arbiter.dispatch(false), None);

        arbiter.current = ActionCategory::Harvest;
        assert_eq!(arbiter.dispatch(false), Some(ActionCategory::Harvest));
        assert_eq!(arbiter.dispatch(true), None);
    }
}
