//! World tick orchestration.
//!
//! [`Simulation`] owns the world and runs one frame at a time. Each tick
//! commits at most one primary action, chosen by the [`ActionArbiter`], and
//! at most one context interaction.
//!
//! # Tick order
//!
//! 1. Apply the player's pose
//! 2. Advance combat and harvest cooldowns
//! 3. Build-mode commands and the placement preview
//! 4. Enemy AI, in ascending entity id order
//! 5. Action classification and interaction target
//! 6. Primary action (place / attack / harvest)
//! 7. Context interaction
//! 8. Drain events
//!
//! # Determinism
//!
//! The only randomness comes from a `ChaCha8Rng` seeded by
//! [`SimConfig::seed`], and entities are always visited in sorted id order,
//! so the same seed and inputs replay to the same state on one machine.
//!
//! # Example
//!
//! ```
//! use glam::DVec3;
//! use survival_core::prelude::*;
//!
//! let mut sim = Simulation::new(SimConfig::default(), TerrainProfile::default(), Backpack::new())
//!     .unwrap();
//! sim.spawn_enemy(&EnemyArchetype::training_dummy(), DVec3::new(1.0, 1.0, 0.0));
//!
//! let events = sim.tick(0.016, &FrameInput {
//!     forward: Some(DVec3::X),
//!     primary: true,
//!     ..FrameInput::default()
//! });
//! assert!(matches!(events[0], GameEvent::DamageDealt { .. }));
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use glam::DVec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::action::{ActionArbiter, ActionCategory, ActionContext};
use crate::buildings::{BuildingSystem, PlacementReceipt};
use crate::combat::{Attacker, CombatResolver};
use crate::components::{Damageable, EntityId, ItemId};
use crate::config::SimConfig;
use crate::data::{AttackProfileCatalog, BuildingCatalog, BuildingTypeId, EnemyArchetype, ResourceArchetype};
use crate::enemy_ai::AiState;
use crate::error::Result;
use crate::events::{EventQueue, GameEvent};
use crate::harvest::HarvestResolver;
use crate::interaction::{BuildingInteraction, InteractionArbiter, InteractionPriority};
use crate::inventory::{DurabilityResult, Inventory};
use crate::math::{horizontal, horizontal_distance, Ray, DEGENERATE_LENGTH_SQUARED};
use crate::spatial::{HeightSource, SpatialIndex, SpatialQuery, TerrainProfile};
use crate::world::{EnemyState, Entity, EntityKind, EntityStorage};

/// Player max HP.
pub const PLAYER_MAX_HP: f64 = 100.0;

/// Damage the player adds to every weapon.
pub const PLAYER_BASE_ATTACK: f64 = 5.0;

/// Eye height above the player's position.
pub const PLAYER_EYE_HEIGHT: f64 = 1.6;

/// How far ahead the building ghost sits without an explicit aim point.
pub const BUILD_PREVIEW_DISTANCE: f64 = 3.0;

/// Enemies per night wave, inclusive.
pub const NIGHT_WAVE_SIZE: (u32, u32) = (3, 5);

/// Night wave spawn ring around the player, in meters.
pub const NIGHT_WAVE_RADIUS: (f64, f64) = (15.0, 30.0);

/// Chance that a night-wave enemy is a wanderer rather than a wolf.
pub const NIGHT_WAVE_WANDERER_CHANCE: f64 = 0.6;

// ============================================================================
// Player and Input
// ============================================================================

/// The player, held outside the entity table.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    /// Feet position.
    pub position: DVec3,
    /// Unit view direction.
    pub forward: DVec3,
    /// Eye height above `position`.
    pub eye_height: f64,
    /// Hit points.
    pub health: Damageable,
    /// Added to every weapon's damage.
    pub base_attack: f64,
    /// Where respawns happen.
    pub spawn_point: DVec3,
}

impl PlayerState {
    /// Fresh player standing at `spawn_point`, facing +Z.
    #[must_use]
    pub fn new(spawn_point: DVec3) -> Self {
        Self {
            position: spawn_point,
            forward: DVec3::Z,
            eye_height: PLAYER_EYE_HEIGHT,
            health: Damageable::new(PLAYER_MAX_HP, 0.0),
            base_attack: PLAYER_BASE_ATTACK,
            spawn_point,
        }
    }

    /// Whether the player is alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health.is_alive()
    }

    /// Eye position.
    #[must_use]
    pub fn eye_position(&self) -> DVec3 {
        self.position + DVec3::new(0.0, self.eye_height, 0.0)
    }

    /// Ray from the eyes along the view direction.
    #[must_use]
    pub fn view_ray(&self) -> Ray {
        Ray::new(self.eye_position(), self.forward)
    }
}

/// A build-mode request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildCommand {
    /// Enter build mode paying with the recipe.
    Enter(BuildingTypeId),
    /// Enter build mode paying with a held building item.
    EnterFromItem {
        /// Building to place.
        building: BuildingTypeId,
        /// Item consumed per placement.
        item: ItemId,
    },
    /// Leave build mode.
    Exit,
    /// Turn the ghost by 90 degrees.
    Rotate,
    /// Tear down a placed building.
    Remove(EntityId),
}

/// Debounced input for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameInput {
    /// New player position.
    pub position: Option<DVec3>,
    /// New view direction.
    pub forward: Option<DVec3>,
    /// Primary action pressed.
    pub primary: bool,
    /// Interact pressed.
    pub interact: bool,
    /// A UI panel has input focus.
    pub ui_blocked: bool,
    /// Build-mode requests, applied in order.
    pub build: Vec<BuildCommand>,
    /// Ground point under the crosshair for the building ghost.
    pub aim_point: Option<DVec3>,
}

// ============================================================================
// Simulation
// ============================================================================

/// The survival world.
#[derive(Debug)]
pub struct Simulation<I: Inventory> {
    config: SimConfig,
    attack_profiles: AttackProfileCatalog,
    building_catalog: BuildingCatalog,
    terrain: TerrainProfile,
    entities: EntityStorage,
    buildings: BuildingSystem,
    player: PlayerState,
    combat: CombatResolver,
    harvest: HarvestResolver,
    actions: ActionArbiter,
    interactions: InteractionArbiter,
    inventory: I,
    rng: ChaCha8Rng,
    events: EventQueue,
    tick: u64,
    elapsed: f64,
}

impl<I: Inventory> Simulation<I> {
    /// Create a world with the built-in catalogs and the player on the
    /// ground at the origin.
    pub fn new(config: SimConfig, terrain: TerrainProfile, inventory: I) -> Result<Self> {
        config.validate()?;
        let spawn = DVec3::new(0.0, terrain.height_at(0.0, 0.0), 0.0);
        tracing::debug!(seed = config.seed, "Creating simulation");

        Ok(Self {
            attack_profiles: AttackProfileCatalog::with_defaults(),
            building_catalog: BuildingCatalog::with_defaults(),
            terrain,
            entities: EntityStorage::new(),
            buildings: BuildingSystem::new(config.placement),
            player: PlayerState::new(spawn),
            combat: CombatResolver::new(config.knockback_scale),
            harvest: HarvestResolver::new(config.harvest_cooldown),
            actions: ActionArbiter::new(),
            interactions: InteractionArbiter::new(),
            inventory,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            events: EventQueue::new(),
            tick: 0,
            elapsed: 0.0,
            config,
        })
    }

    /// Replace the item attack/gather catalog.
    #[must_use]
    pub fn with_attack_profiles(mut self, catalog: AttackProfileCatalog) -> Self {
        self.attack_profiles = catalog;
        self
    }

    /// Replace the building catalog.
    #[must_use]
    pub fn with_building_catalog(mut self, catalog: BuildingCatalog) -> Self {
        self.building_catalog = catalog;
        self
    }

    /// Move the player's spawn point and put the player there.
    #[must_use]
    pub fn with_player_spawn(mut self, spawn_point: DVec3) -> Self {
        self.player = PlayerState::new(spawn_point);
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Configuration.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Ticks run so far.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Seconds simulated so far.
    #[must_use]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// The player.
    #[must_use]
    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    /// Enemies and resource nodes.
    #[must_use]
    pub fn entities(&self) -> &EntityStorage {
        &self.entities
    }

    /// Build mode and placed buildings.
    #[must_use]
    pub fn buildings(&self) -> &BuildingSystem {
        &self.buildings
    }

    /// Ground shape.
    #[must_use]
    pub fn terrain(&self) -> &TerrainProfile {
        &self.terrain
    }

    /// The player's inventory.
    #[must_use]
    pub fn inventory(&self) -> &I {
        &self.inventory
    }

    /// Mutable access to the player's inventory.
    pub fn inventory_mut(&mut self) -> &mut I {
        &mut self.inventory
    }

    /// Action chosen by the latest classification.
    #[must_use]
    pub fn current_action(&self) -> ActionCategory {
        self.actions.current()
    }

    /// Context interactions.
    #[must_use]
    pub fn interactions(&self) -> &InteractionArbiter {
        &self.interactions
    }

    /// Combat cooldown and resolver.
    #[must_use]
    pub fn combat(&self) -> &CombatResolver {
        &self.combat
    }

    // ------------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------------

    /// Advance the world by `dt` seconds and return everything that happened.
    pub fn tick(&mut self, dt: f64, input: &FrameInput) -> Vec<GameEvent> {
        debug_assert!(dt >= 0.0, "negative tick duration {dt}");
        let dt = dt.max(0.0);

        self.apply_pose(input);
        self.combat.tick(dt);
        self.harvest.tick(dt);

        if self.player.is_alive() {
            for command in &input.build {
                self.apply_build_command(command);
            }
            self.refresh_preview(input.aim_point);
            self.run_enemy_ai(dt);
        }

        {
            let index = SpatialIndex::build(&self.entities, self.buildings.registry(), &self.terrain);
            let view = self.player.view_ray();
            let ctx = ActionContext {
                actor: self.player.position,
                view,
                building: self.buildings.is_active(),
                alive: self.player.is_alive(),
            };
            self.actions.classify(&ctx, &index, &self.entities, &self.config);
            self.interactions.update(
                self.player.position,
                &view,
                &index,
                self.config.interaction_range,
                self.config.view_probe_distance,
            );
        }

        if input.primary {
            match self.actions.dispatch(input.ui_blocked) {
                Some(ActionCategory::Building) => {
                    self.place_building();
                }
                Some(ActionCategory::Combat) => self.perform_attack(),
                Some(ActionCategory::Harvest) => self.perform_harvest(),
                Some(ActionCategory::Idle) | None => {}
            }
        }

        if input.interact && self.player.is_alive() {
            if let Some((target, effect)) = self.interactions.execute_interaction(input.ui_blocked) {
                self.events.push(GameEvent::InteractionTriggered { target, effect });
            }
        }

        self.tick += 1;
        self.elapsed += dt;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::trace!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        self.events.drain()
    }

    fn apply_pose(&mut self, input: &FrameInput) {
        if let Some(position) = input.position {
            self.player.position = position;
        }
        if let Some(forward) = input.forward {
            if forward.length_squared() > DEGENERATE_LENGTH_SQUARED {
                self.player.forward = forward.normalize();
            }
        }
    }

    fn apply_build_command(&mut self, command: &BuildCommand) {
        match command {
            BuildCommand::Enter(building) => {
                if let Err(err) = self.enter_build_mode(building) {
                    tracing::warn!(tick = self.tick, ?command, %err, "Build command rejected");
                }
            }
            BuildCommand::EnterFromItem { building, item } => {
                if let Err(err) = self.enter_build_mode_from_item(building, item.clone()) {
                    tracing::warn!(tick = self.tick, ?command, %err, "Build command rejected");
                }
            }
            BuildCommand::Exit => self.exit_build_mode(),
            BuildCommand::Rotate => {
                self.buildings.rotate();
            }
            BuildCommand::Remove(id) => {
                let receipt = self.remove_building(*id);
                if !receipt.success {
                    tracing::debug!(id, message = %receipt.message, "Building removal refused");
                }
            }
        }
    }

    fn refresh_preview(&mut self, aim_point: Option<DVec3>) {
        if !self.buildings.is_active() {
            return;
        }
        let aim = aim_point.unwrap_or_else(|| {
            self.player.position
                + horizontal(self.player.forward).normalize_or_zero() * BUILD_PREVIEW_DISTANCE
        });
        self.buildings
            .update_preview(aim, &self.building_catalog, &self.terrain);
    }

    fn run_enemy_ai(&mut self, dt: f64) {
        let player = self.player.position;
        for id in self.entities.sorted_ids() {
            if !self.player.is_alive() {
                break;
            }
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            if !entity.health.is_alive() {
                continue;
            }
            let Entity {
                position,
                kind: EntityKind::Enemy(EnemyState { ai: Some(ai), .. }),
                ..
            } = entity
            else {
                continue;
            };

            let tick = ai.update(dt, position, player, &self.config, &mut self.rng);
            if let Some((from, to)) = tick.transition {
                tracing::debug!(tick = self.tick, enemy = id, %from, %to, "Enemy AI transition");
            }
            if let Some(damage) = tick.strike {
                self.strike_player(damage, id);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Player Actions
    // ------------------------------------------------------------------------

    fn perform_attack(&mut self) {
        let hand = self.inventory.current_hand_item();
        let profile = self.attack_profiles.get(hand.as_ref());
        let attacker = Attacker {
            position: self.player.position,
            forward: self.player.forward,
            eye_position: self.player.eye_position(),
            attack_bonus: self.player.base_attack,
        };

        let index = SpatialIndex::build(&self.entities, self.buildings.registry(), &self.terrain);
        let outcome = self
            .combat
            .attempt(&attacker, profile, &index, &mut self.entities);
        if !outcome.hit {
            tracing::debug!(reason = ?outcome.reason, "Attack missed");
            return;
        }

        for hit in &outcome.targets {
            self.events.push(GameEvent::DamageDealt {
                target: hit.target,
                damage: hit.damage,
                position: hit.position,
                killed: hit.died,
                target_name: hit.name.clone(),
            });
            if hit.died {
                self.handle_enemy_death(hit.target);
            }
        }

        if let Some(item) = hand {
            let durability = self.inventory.consume_hand_durability(1);
            if durability.broken {
                self.tool_broke(item);
            }
        }
    }

    fn handle_enemy_death(&mut self, id: EntityId) {
        let Some(entity) = self.entities.remove(id) else {
            return;
        };
        let drops = entity
            .as_enemy()
            .map(|enemy| enemy.drops.clone())
            .unwrap_or_default();
        for (item, &count) in &drops {
            if !self.inventory.add(item, count) {
                tracing::warn!(item = %item, count, "Drop did not fit in inventory");
            }
        }
        tracing::info!(enemy = id, name = %entity.name, "Enemy died");
        self.events.push(GameEvent::EnemyDied {
            enemy_id: id,
            drops,
            position: entity.position,
        });
    }

    fn perform_harvest(&mut self) {
        let view = self.player.view_ray();
        let actor = self.player.position;
        let target = {
            let index = SpatialIndex::build(&self.entities, self.buildings.registry(), &self.terrain);
            let entities = &self.entities;
            index
                .probe(&view, self.config.view_probe_distance, &|id| {
                    entities.is_harvestable(id)
                })
                .filter(|hit| actor.distance(hit.point) <= self.config.harvest_engagement_distance)
                .map(|hit| hit.id)
        };
        let Some(target) = target else {
            tracing::debug!("Harvest found no node in reach");
            return;
        };
        let Some(resource_type) = self
            .entities
            .get(target)
            .and_then(Entity::as_resource)
            .map(|resource| resource.resource_type.clone())
        else {
            return;
        };

        let hand = self.inventory.current_hand_item();
        let damage = self.attack_profiles.gather_damage(hand.as_ref(), &resource_type);
        let outcome = self.harvest.attempt_harvest(target, damage, &mut self.entities);
        if !outcome.hit {
            return;
        }

        if let Some(rewards) = &outcome.rewards {
            for (item, &count) in rewards {
                if !self.inventory.add(item, count) {
                    tracing::warn!(item = %item, count, "Reward did not fit in inventory");
                }
            }
        }

        let durability = if hand.is_some() {
            self.inventory.consume_hand_durability(1)
        } else {
            DurabilityResult::default()
        };

        self.events.push(GameEvent::ResourceHarvested {
            target,
            damage: outcome.damage,
            destroyed: outcome.destroyed,
            rewards: outcome.rewards,
            remaining_hp: outcome.remaining_hp,
            max_hp: outcome.max_hp,
            tool_broken: durability.broken,
            tool_remaining: durability.remaining,
        });
        if durability.broken {
            if let Some(item) = hand {
                self.tool_broke(item);
            }
        }
    }

    fn tool_broke(&mut self, item: ItemId) {
        tracing::info!(item = %item, "Tool broke");
        self.events.push(GameEvent::ToolBroken { item_id: item });
    }

    // ------------------------------------------------------------------------
    // Building
    // ------------------------------------------------------------------------

    /// Enter build mode paying with recipes.
    pub fn enter_build_mode(&mut self, building: &BuildingTypeId) -> Result<()> {
        self.buildings
            .enter_build_mode(building, &self.building_catalog, &mut self.events)
    }

    /// Enter build mode paying with a held building item.
    pub fn enter_build_mode_from_item(&mut self, building: &BuildingTypeId, item: ItemId) -> Result<()> {
        self.buildings.enter_build_mode_from_item(
            building,
            item,
            &self.building_catalog,
            &mut self.events,
        )
    }

    /// Leave build mode.
    pub fn exit_build_mode(&mut self) {
        self.buildings.exit_build_mode(&mut self.events);
    }

    /// Place the previewed building and register its interaction.
    pub fn place_building(&mut self) -> PlacementReceipt {
        let entities = &mut self.entities;
        let receipt = self.buildings.place(
            || entities.allocate_id(),
            &self.building_catalog,
            &mut self.inventory,
            &self.terrain,
            &mut self.events,
        );

        match &receipt.building {
            Some(building) if receipt.success => {
                if let Some(kind) = building.interactable {
                    let slots = self
                        .building_catalog
                        .get(&building.building_type)
                        .map_or(0, |data| data.storage_slots);
                    self.interactions.register(
                        building.id,
                        InteractionPriority::Building,
                        Box::new(BuildingInteraction::new(building.name.clone(), kind, slots)),
                    );
                }
            }
            _ => tracing::debug!(message = %receipt.message, "Placement refused"),
        }
        receipt
    }

    /// Tear down a building, refunding half its recipe.
    pub fn remove_building(&mut self, id: EntityId) -> PlacementReceipt {
        let receipt = self.buildings.remove(
            id,
            &self.building_catalog,
            &mut self.inventory,
            &mut self.events,
        );
        if receipt.success {
            self.interactions.unregister(id);
        }
        receipt
    }

    // ------------------------------------------------------------------------
    // Player Life Cycle
    // ------------------------------------------------------------------------

    /// Route an enemy strike into the player's health.
    pub fn strike_player(&mut self, damage: f64, source: EntityId) {
        if !self.player.is_alive() {
            return;
        }
        let outcome = self.player.health.apply_damage(damage);
        tracing::debug!(
            source,
            damage = outcome.actual_damage,
            hp = self.player.health.current_hp(),
            "Player hit"
        );
        self.events.push(GameEvent::PlayerDamaged {
            damage: outcome.actual_damage,
            current_hp: self.player.health.current_hp(),
            max_hp: self.player.health.max_hp(),
            source,
        });

        if outcome.died {
            tracing::info!(source, "Player died");
            self.buildings.exit_build_mode(&mut self.events);
            self.events.push(GameEvent::PlayerDied);
        }
    }

    /// Bring the player back at the spawn point.
    pub fn respawn_player(&mut self) {
        self.player
            .health
            .revive(self.config.respawn_health_fraction);
        self.player.position = self.player.spawn_point;
        let current_hp = self.player.health.current_hp();
        tracing::info!(hp = current_hp, "Player respawned");
        self.events.push(GameEvent::PlayerRespawned { current_hp });
    }

    // ------------------------------------------------------------------------
    // Spawning
    // ------------------------------------------------------------------------

    /// Add an enemy centered at `position`.
    pub fn spawn_enemy(&mut self, archetype: &EnemyArchetype, position: DVec3) -> EntityId {
        let id = self.entities.insert(Entity::enemy(archetype, position));
        tracing::debug!(id, name = %archetype.name, "Spawned enemy");
        id
    }

    /// Add a resource node centered at `position`.
    pub fn spawn_resource(&mut self, archetype: &ResourceArchetype, position: DVec3) -> EntityId {
        let id = self.entities.insert(Entity::resource(archetype, position));
        tracing::debug!(id, name = %archetype.name, "Spawned resource node");
        id
    }

    /// Spawn a night wave of wanderers and wolves in a ring around the player.
    pub fn spawn_night_wave(&mut self) -> Vec<EntityId> {
        let count = self.rng.gen_range(NIGHT_WAVE_SIZE.0..=NIGHT_WAVE_SIZE.1);
        let mut spawned = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let archetype = if self.rng.gen_bool(NIGHT_WAVE_WANDERER_CHANCE) {
                EnemyArchetype::wanderer()
            } else {
                EnemyArchetype::wolf()
            };
            let angle = self.rng.gen_range(0.0..std::f64::consts::TAU);
            let distance = self.rng.gen_range(NIGHT_WAVE_RADIUS.0..NIGHT_WAVE_RADIUS.1);
            let x = self.player.position.x + angle.cos() * distance;
            let z = self.player.position.z + angle.sin() * distance;
            let y = self.terrain.height_at(x, z) + archetype.half_extents.y;

            let mut entity = Entity::enemy(&archetype, DVec3::new(x, y, z));
            if let Some(enemy) = entity.as_enemy_mut() {
                enemy.night_spawn = true;
            }
            spawned.push(self.entities.insert(entity));
        }

        tracing::info!(count, "Night wave spawned");
        spawned
    }

    /// Remove every night-wave enemy still alive. Returns how many left.
    pub fn despawn_night_wave(&mut self) -> usize {
        let wave: Vec<EntityId> = self
            .entities
            .sorted_ids()
            .into_iter()
            .filter(|&id| {
                self.entities
                    .get(id)
                    .and_then(Entity::as_enemy)
                    .is_some_and(|enemy| enemy.night_spawn)
            })
            .collect();
        for &id in &wave {
            self.entities.remove(id);
        }
        tracing::info!(count = wave.len(), "Night wave despawned");
        wave.len()
    }

    /// Horizontal distance from the player to an entity.
    #[must_use]
    pub fn distance_to(&self, id: EntityId) -> Option<f64> {
        self.entities
            .get(id)
            .map(|entity| horizontal_distance(self.player.position, entity.position))
    }

    // ------------------------------------------------------------------------
    // Hashing
    // ------------------------------------------------------------------------

    /// Hash of the world state, for comparing replays.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        hash_vec(&mut hasher, self.player.position);
        self.player.health.current_hp().to_bits().hash(&mut hasher);

        let ids = self.entities.sorted_ids();
        ids.len().hash(&mut hasher);
        for id in ids {
            if let Some(entity) = self.entities.get(id) {
                id.hash(&mut hasher);
                hash_vec(&mut hasher, entity.position);
                entity.health.current_hp().to_bits().hash(&mut hasher);
                let state = entity
                    .as_enemy()
                    .and_then(|enemy| enemy.ai.as_ref())
                    .map(|ai| ai.state());
                state.unwrap_or(AiState::Idle).hash(&mut hasher);
            }
        }

        self.buildings.registry().len().hash(&mut hasher);
        for building in self.buildings.registry().iter() {
            building.id.hash(&mut hasher);
            hash_vec(&mut hasher, building.position);
            building.rotation.hash(&mut hasher);
        }

        hasher.finish()
    }
}

fn hash_vec(hasher: &mut DefaultHasher, v: DVec3) {
    v.x.to_bits().hash(hasher);
    v.y.to_bits().hash(hasher);
    v.z.to_bits().hash(hasher);
}
