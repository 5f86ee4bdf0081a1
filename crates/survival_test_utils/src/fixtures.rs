//! Test fixtures and helpers.
//!
//! Pre-built worlds, inventories and a scripted spatial query for
//! consistent testing.

use std::cell::Cell;

use glam::DVec3;
use survival_core::components::EntityId;
use survival_core::config::SimConfig;
use survival_core::data::{EnemyArchetype, ResourceArchetype};
use survival_core::inventory::Backpack;
use survival_core::math::{horizontal_distance, Ray};
use survival_core::simulation::{FrameInput, Simulation};
use survival_core::spatial::{
    HeightSource, ProbeHit, RegionHit, RegionShape, SpatialQuery, TerrainProfile,
};

/// Fixed tick length used by the harnesses, in seconds.
pub const TEST_DT: f64 = 0.05;

// ============================================================================
// Scripted spatial query
// ============================================================================

/// Collider registered with a [`ScriptedSpatial`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptedCollider {
    /// Collider id.
    pub id: EntityId,
    /// Collider center.
    pub position: DVec3,
    /// Sphere radius used by ray probes.
    pub radius: f64,
}

/// A [`SpatialQuery`] over spheres on flat ground.
///
/// Ray probes intersect each collider as a sphere; region queries use the
/// collider center. Every call is counted so tests can assert that a
/// resolver did or did not hit the world.
#[derive(Debug, Default)]
pub struct ScriptedSpatial {
    colliders: Vec<ScriptedCollider>,
    ground: f64,
    calls: Cell<u32>,
}

impl ScriptedSpatial {
    /// Empty world with ground at height 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ground height.
    #[must_use]
    pub fn with_ground(mut self, height: f64) -> Self {
        self.ground = height;
        self
    }

    /// Add a sphere collider.
    #[must_use]
    pub fn with(mut self, id: EntityId, position: DVec3, radius: f64) -> Self {
        self.colliders.push(ScriptedCollider {
            id,
            position,
            radius,
        });
        self
    }

    /// Number of probe or region calls served so far.
    #[must_use]
    pub fn calls(&self) -> u32 {
        self.calls.get()
    }

    fn count(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

impl HeightSource for ScriptedSpatial {
    fn height_at(&self, _x: f64, _z: f64) -> f64 {
        self.ground
    }
}

impl SpatialQuery for ScriptedSpatial {
    fn probe_all(
        &self,
        ray: &Ray,
        max_distance: f64,
        filter: &dyn Fn(EntityId) -> bool,
    ) -> Vec<ProbeHit> {
        self.count();
        let mut hits: Vec<ProbeHit> = self
            .colliders
            .iter()
            .filter(|collider| filter(collider.id))
            .filter_map(|collider| {
                let distance = sphere_entry(ray, collider.position, collider.radius)?;
                (distance <= max_distance).then(|| ProbeHit {
                    id: collider.id,
                    distance,
                    point: ray.at(distance),
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
        hits
    }

    fn query_region(
        &self,
        origin: DVec3,
        shape: RegionShape,
        filter: &dyn Fn(EntityId) -> bool,
    ) -> Vec<RegionHit> {
        self.count();
        let mut hits: Vec<RegionHit> = self
            .colliders
            .iter()
            .filter(|collider| filter(collider.id))
            .filter_map(|collider| {
                let (distance, radius) = match shape {
                    RegionShape::Sphere { radius } => (origin.distance(collider.position), radius),
                    RegionShape::Cylinder { radius } => {
                        (horizontal_distance(origin, collider.position), radius)
                    }
                };
                (distance <= radius).then_some(RegionHit {
                    id: collider.id,
                    distance,
                    position: collider.position,
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
        hits
    }
}

/// Distance along `ray` to where it enters the sphere, if it does.
fn sphere_entry(ray: &Ray, center: DVec3, radius: f64) -> Option<f64> {
    let to_center = center - ray.origin;
    let along = to_center.dot(ray.direction);
    let closest_sq = to_center.length_squared() - along * along;
    let radius_sq = radius * radius;
    if closest_sq > radius_sq {
        return None;
    }
    let half_chord = (radius_sq - closest_sq).sqrt();
    let entry = along - half_chord;
    if entry >= 0.0 {
        Some(entry)
    } else if along + half_chord >= 0.0 {
        Some(0.0)
    } else {
        None
    }
}

// ============================================================================
// Worlds
// ============================================================================

/// Backpack holding a stone axe plus building materials.
#[must_use]
pub fn stocked_backpack() -> Backpack {
    Backpack::new()
        .holding("stone_axe", Some(50))
        .with_item("wood", 40)
        .with_item("stone", 20)
        .with_item("fiber", 10)
}

/// Flat world with the given seed and nothing in it.
///
/// # Panics
///
/// Panics if the default configuration is rejected.
#[must_use]
pub fn empty_world(seed: u64, inventory: Backpack) -> Simulation<Backpack> {
    let config = SimConfig {
        seed,
        ..SimConfig::default()
    };
    Simulation::new(config, TerrainProfile::default(), inventory)
        .expect("default config is valid")
}

/// Flat world with a training dummy, a tree and a rock in front of the
/// player.
///
/// The player stands at the origin facing +X.
#[must_use]
pub fn training_ground() -> Simulation<Backpack> {
    let mut sim = empty_world(1, stocked_backpack());
    sim.spawn_enemy(&EnemyArchetype::training_dummy(), DVec3::new(2.0, 1.0, 0.0));
    sim.spawn_resource(&ResourceArchetype::tree(), DVec3::new(0.0, 0.0, 2.5));
    sim.spawn_resource(&ResourceArchetype::rock(), DVec3::new(0.0, 0.6, -2.5));
    sim
}

/// World with a ring of trees and rocks and a few roaming animals.
///
/// The layout is fixed; `seed` only drives patrol choices and night waves.
#[must_use]
pub fn forest_world(seed: u64) -> Simulation<Backpack> {
    let mut sim = empty_world(seed, stocked_backpack());

    for i in 0..12 {
        let angle = f64::from(i) * std::f64::consts::TAU / 12.0;
        let radius = 8.0 + f64::from(i % 3) * 4.0;
        let position = DVec3::new(angle.cos() * radius, 0.0, angle.sin() * radius);
        if i % 4 == 0 {
            sim.spawn_resource(&ResourceArchetype::rock(), position + DVec3::Y * 0.6);
        } else {
            sim.spawn_resource(&ResourceArchetype::tree(), position);
        }
    }

    sim.spawn_enemy(&EnemyArchetype::wild_boar(), DVec3::new(18.0, 0.4, 4.0));
    sim.spawn_enemy(&EnemyArchetype::wolf(), DVec3::new(-16.0, 0.45, -10.0));
    sim.spawn_enemy(&EnemyArchetype::wanderer(), DVec3::new(5.0, 0.9, 22.0));
    sim
}

/// Input that stands the player at `position` facing `forward`.
#[must_use]
pub fn pose(position: DVec3, forward: DVec3) -> FrameInput {
    FrameInput {
        position: Some(position),
        forward: Some(forward),
        ..FrameInput::default()
    }
}

/// [`pose`] with the primary action pressed.
#[must_use]
pub fn swing(position: DVec3, forward: DVec3) -> FrameInput {
    FrameInput {
        primary: true,
        ..pose(position, forward)
    }
}
