//! Entity table for everything the player can fight or harvest.
//!
//! Gameplay data is keyed by an opaque [`EntityId`]; nothing in here knows
//! about render handles. Placed buildings draw ids from the same allocator
//! but live in the building registry.

use std::collections::{BTreeMap, HashMap};

use glam::DVec3;

use crate::components::{DamageOutcome, Damageable, EntityId, ItemId};
use crate::data::{EnemyArchetype, ResourceArchetype};
use crate::enemy_ai::EnemyAi;
use crate::math::{horizontal, Aabb};

// ============================================================================
// Entity variants
// ============================================================================

/// Hostile creature data.
#[derive(Debug, Clone)]
pub struct EnemyState {
    /// State machine, absent for stationary targets.
    pub ai: Option<EnemyAi>,
    /// Items handed to the player on death.
    pub drops: BTreeMap<ItemId, u32>,
    /// Spawned by a night wave and removed at dawn.
    pub night_spawn: bool,
}

/// Harvestable node data.
#[derive(Debug, Clone)]
pub struct ResourceState {
    /// Resource category (`"wood"`, `"stone"`).
    pub resource_type: String,
    /// Items paid out when the node breaks.
    pub rewards: BTreeMap<ItemId, u32>,
}

/// What kind of thing an entity is.
#[derive(Debug, Clone)]
pub enum EntityKind {
    /// An enemy the player can attack.
    Enemy(EnemyState),
    /// A resource node the player can harvest.
    Resource(ResourceState),
}

/// A world entity.
#[derive(Debug, Clone)]
pub struct Entity {
    /// Assigned by [`EntityStorage::insert`].
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Center position.
    pub position: DVec3,
    /// Collision half extents around `position`.
    pub half_extents: DVec3,
    /// Hit points.
    pub health: Damageable,
    /// Variant data.
    pub kind: EntityKind,
}

impl Entity {
    /// Build an enemy from an archetype.
    #[must_use]
    pub fn enemy(archetype: &EnemyArchetype, position: DVec3) -> Self {
        Self {
            id: 0,
            name: archetype.name.clone(),
            position,
            half_extents: archetype.half_extents,
            health: Damageable::new(archetype.max_hp, archetype.defense),
            kind: EntityKind::Enemy(EnemyState {
                ai: archetype
                    .ai
                    .clone()
                    .map(|profile| EnemyAi::new(profile, position)),
                drops: archetype.drops.clone(),
                night_spawn: false,
            }),
        }
    }

    /// Build a resource node from an archetype.
    #[must_use]
    pub fn resource(archetype: &ResourceArchetype, position: DVec3) -> Self {
        Self {
            id: 0,
            name: archetype.name.clone(),
            position,
            half_extents: archetype.half_extents,
            health: Damageable::new(archetype.max_hp, 0.0),
            kind: EntityKind::Resource(ResourceState {
                resource_type: archetype.resource_type.clone(),
                rewards: archetype.rewards.clone(),
            }),
        }
    }

    /// Collision bounds.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(self.position, self.half_extents)
    }

    /// Living enemy.
    #[must_use]
    pub fn is_attackable(&self) -> bool {
        matches!(self.kind, EntityKind::Enemy(_)) && self.health.is_alive()
    }

    /// Resource node that has not broken yet.
    #[must_use]
    pub fn is_harvestable(&self) -> bool {
        matches!(self.kind, EntityKind::Resource(_)) && self.health.is_alive()
    }

    /// Enemy data, if this is an enemy.
    #[must_use]
    pub fn as_enemy(&self) -> Option<&EnemyState> {
        match &self.kind {
            EntityKind::Enemy(enemy) => Some(enemy),
            EntityKind::Resource(_) => None,
        }
    }

    /// Mutable enemy data, if this is an enemy.
    pub fn as_enemy_mut(&mut self) -> Option<&mut EnemyState> {
        match &mut self.kind {
            EntityKind::Enemy(enemy) => Some(enemy),
            EntityKind::Resource(_) => None,
        }
    }

    /// Resource data, if this is a resource node.
    #[must_use]
    pub fn as_resource(&self) -> Option<&ResourceState> {
        match &self.kind {
            EntityKind::Resource(resource) => Some(resource),
            EntityKind::Enemy(_) => None,
        }
    }

    /// Route damage into this entity's [`Damageable`].
    pub fn apply_damage(&mut self, amount: f64) -> DamageOutcome {
        self.health.apply_damage(amount)
    }

    /// Push the entity horizontally. Only living enemies move.
    pub fn nudge(&mut self, offset: DVec3) {
        if self.is_attackable() {
            self.position += horizontal(offset);
        }
    }
}

// ============================================================================
// Entity Storage
// ============================================================================

/// Storage for all entities in the world.
///
/// Uses a `HashMap` for O(1) entity lookup by ID, with deterministic
/// iteration via sorted keys when processing systems.
#[derive(Debug, Clone, Default)]
pub struct EntityStorage {
    /// Map of entity ID to entity data.
    entities: HashMap<EntityId, Entity>,
    /// Next entity ID to assign.
    next_id: EntityId,
}

impl EntityStorage {
    /// Create empty entity storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            next_id: 1,
        }
    }

    /// Reserve a fresh id without inserting anything.
    pub fn allocate_id(&mut self) -> EntityId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        id
    }

    /// Insert a new entity and return its ID.
    pub fn insert(&mut self, mut entity: Entity) -> EntityId {
        let id = self.allocate_id();
        entity.id = id;
        self.entities.insert(id, entity);
        id
    }

    /// Remove an entity by ID.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Get an entity by ID.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to an entity by ID.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Check if an entity exists.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Get the number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Get sorted entity IDs for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over all entities (not in deterministic order).
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &Entity)> {
        self.entities.iter()
    }

    /// Whether `id` is a living enemy.
    #[must_use]
    pub fn is_attackable(&self, id: EntityId) -> bool {
        self.get(id).is_some_and(Entity::is_attackable)
    }

    /// Whether `id` is an unbroken resource node.
    #[must_use]
    pub fn is_harvestable(&self, id: EntityId) -> bool {
        self.get(id).is_some_and(Entity::is_harvestable)
    }
}
