//! Player melee and ranged attack resolution.
//!
//! An attack runs in three steps:
//! 1. Gate on the combat cooldown.
//! 2. Enumerate targets with the profile's detection shape.
//! 3. Knock each target back, then damage it.
//!
//! The resolver knows nothing about inventories or event publication;
//! the simulation handles durability, drops and notifications.

use std::fmt;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::components::{Cooldown, EntityId};
use crate::data::{AttackProfile, DetectShape};
use crate::math::{angle_between, horizontal, horizontal_direction, Ray, DEGENERATE_LENGTH_SQUARED};
use crate::spatial::{RegionShape, SpatialQuery};
use crate::world::EntityStorage;

/// Tolerance added to the sector half angle so targets exactly on the
/// boundary survive float rounding in `acos`.
pub const ANGLE_EPSILON: f64 = 1e-9;

/// Where the attack comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attacker {
    /// Feet position; origin of sector and circle attacks.
    pub position: DVec3,
    /// Facing direction.
    pub forward: DVec3,
    /// Eye position; origin of ray attacks.
    pub eye_position: DVec3,
    /// Added to the profile's base damage.
    pub attack_bonus: f64,
}

impl Attacker {
    /// Attacker whose eyes are at its position and with no bonus damage.
    #[must_use]
    pub fn at(position: DVec3, forward: DVec3) -> Self {
        Self {
            position,
            forward,
            eye_position: position,
            attack_bonus: 0.0,
        }
    }
}

/// Why an attack did not hit anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackMiss {
    /// The previous swing has not recovered yet.
    Cooldown,
    /// The swing went out but found nothing.
    NoTarget,
}

impl fmt::Display for AttackMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cooldown => f.write_str("attack on cooldown"),
            Self::NoTarget => f.write_str("no target in reach"),
        }
    }
}

/// One damaged target.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetHit {
    /// Damaged entity.
    pub target: EntityId,
    /// Entity name, for notifications.
    pub name: String,
    /// HP actually removed.
    pub damage: f64,
    /// Whether the hit killed it.
    pub died: bool,
    /// Position after knockback.
    pub position: DVec3,
}

/// Result of [`CombatResolver::attempt`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttackOutcome {
    /// At least one target was damaged.
    pub hit: bool,
    /// Set when `hit` is false.
    pub reason: Option<AttackMiss>,
    /// Per-target results, nearest first.
    pub targets: Vec<TargetHit>,
}

impl AttackOutcome {
    fn missed(reason: AttackMiss) -> Self {
        Self {
            hit: false,
            reason: Some(reason),
            targets: Vec::new(),
        }
    }
}

/// A target found by detection, before damage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectedTarget {
    /// Candidate entity.
    pub id: EntityId,
    /// Distance as measured by the detection shape.
    pub distance: f64,
    /// Raw damage this target will receive.
    pub damage: f64,
}

/// Damage of the `index`-th (0-based) target pierced by a ray.
///
/// `floor(base * (1 - decay)^index)`, with `decay` clamped to `[0, 1]`.
#[must_use]
pub fn penetration_damage(base: f64, decay: f64, index: u32) -> f64 {
    let keep = 1.0 - decay.clamp(0.0, 1.0);
    let exponent = i32::try_from(index).unwrap_or(i32::MAX);
    (base * keep.powi(exponent)).floor()
}

/// Whether `to_target` lies inside a horizontal cone around `forward`.
///
/// The boundary is inclusive. A target on top of the attacker counts as
/// inside.
#[must_use]
pub fn within_sector(forward: DVec3, to_target: DVec3, angle_degrees: f64) -> bool {
    let to_target = horizontal(to_target);
    if to_target.length_squared() < DEGENERATE_LENGTH_SQUARED {
        return true;
    }
    let half_angle = (angle_degrees * 0.5).to_radians();
    angle_between(horizontal(forward), to_target)
        .is_some_and(|angle| angle <= half_angle + ANGLE_EPSILON)
}

// ============================================================================
// Combat Resolver
// ============================================================================

/// Resolves the player's attacks.
#[derive(Debug, Clone, Default)]
pub struct CombatResolver {
    cooldown: Cooldown,
    knockback_scale: f64,
}

impl CombatResolver {
    /// Create a resolver; `knockback_scale` converts profile knockback into
    /// displacement.
    #[must_use]
    pub fn new(knockback_scale: f64) -> Self {
        Self {
            cooldown: Cooldown::new(),
            knockback_scale,
        }
    }

    /// Advance the combat cooldown.
    pub fn tick(&mut self, dt: f64) {
        self.cooldown.tick(dt);
    }

    /// Whether a new swing would be accepted.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.cooldown.ready()
    }

    /// The combat cooldown.
    #[must_use]
    pub fn cooldown(&self) -> &Cooldown {
        &self.cooldown
    }

    /// Enumerate targets for `profile` without touching anything.
    ///
    /// Results are nearest first. Equal distances keep the spatial query's
    /// order.
    pub fn detect_targets(
        &self,
        attacker: &Attacker,
        profile: &AttackProfile,
        spatial: &dyn SpatialQuery,
        filter: &dyn Fn(EntityId) -> bool,
    ) -> Vec<DetectedTarget> {
        let base = profile.base_damage + attacker.attack_bonus;

        match profile.detect_shape {
            DetectShape::Sector => {
                let mut hits: Vec<_> = spatial
                    .query_region(
                        attacker.position,
                        RegionShape::Cylinder {
                            radius: profile.range,
                        },
                        filter,
                    )
                    .into_iter()
                    .filter(|hit| {
                        within_sector(
                            attacker.forward,
                            hit.position - attacker.position,
                            profile.angle,
                        )
                    })
                    .map(|hit| (hit.id, hit.distance))
                    .collect();
                hits.sort_by(|a, b| a.1.total_cmp(&b.1));
                truncate(&mut hits, profile.max_targets);
                flat_damage(hits, base)
            }
            DetectShape::Circle => {
                let mut hits: Vec<_> = spatial
                    .query_region(
                        attacker.position,
                        RegionShape::Sphere {
                            radius: profile.range,
                        },
                        filter,
                    )
                    .into_iter()
                    .map(|hit| (hit.id, hit.distance))
                    .collect();
                hits.sort_by(|a, b| a.1.total_cmp(&b.1));
                truncate(&mut hits, profile.max_targets);
                flat_damage(hits, base)
            }
            DetectShape::Ray => {
                let ray = Ray::new(attacker.eye_position, attacker.forward);
                let mut hits = spatial.probe_all(&ray, profile.range, filter);
                hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
                if profile.penetration > 0 {
                    hits.truncate(profile.penetration as usize);
                }
                hits.into_iter()
                    .zip(0_u32..)
                    .map(|(hit, index)| DetectedTarget {
                        id: hit.id,
                        distance: hit.distance,
                        damage: penetration_damage(base, profile.penetration_decay, index),
                    })
                    .collect()
            }
        }
    }

    /// Swing once.
    ///
    /// The cooldown is consumed as soon as the swing is accepted, so a swing
    /// that finds nothing still has to recover.
    pub fn attempt(
        &mut self,
        attacker: &Attacker,
        profile: &AttackProfile,
        spatial: &dyn SpatialQuery,
        entities: &mut EntityStorage,
    ) -> AttackOutcome {
        if !self.cooldown.ready() {
            return AttackOutcome::missed(AttackMiss::Cooldown);
        }

        let targets = {
            let attackable = |id: EntityId| entities.is_attackable(id);
            self.detect_targets(attacker, profile, spatial, &attackable)
        };
        self.cooldown.consume(profile.cooldown);

        let mut hits = Vec::with_capacity(targets.len());
        for detected in targets {
            let Some(entity) = entities.get_mut(detected.id) else {
                continue;
            };

            if profile.knockback > 0.0 {
                let direction = horizontal_direction(attacker.position, entity.position)
                    .unwrap_or_else(|| horizontal(attacker.forward).normalize_or_zero());
                entity.nudge(direction * profile.knockback * self.knockback_scale);
            }

            let outcome = entity.apply_damage(detected.damage);
            hits.push(TargetHit {
                target: detected.id,
                name: entity.name.clone(),
                damage: outcome.actual_damage,
                died: outcome.died,
                position: entity.position,
            });
        }

        tracing::debug!(
            shape = ?profile.detect_shape,
            targets = hits.len(),
            "Attack resolved"
        );

        if hits.is_empty() {
            AttackOutcome::missed(AttackMiss::NoTarget)
        } else {
            AttackOutcome {
                hit: true,
                reason: None,
                targets: hits,
            }
        }
    }
}

fn truncate(hits: &mut Vec<(EntityId, f64)>, max_targets: u32) {
    if max_targets > 0 {
        hits.truncate(max_targets as usize);
    }
}

fn flat_damage(hits: Vec<(EntityId, f64)>, base: f64) -> Vec<DetectedTarget> {
    let damage = base.floor();
    hits.into_iter()
        .map(|(id, distance)| DetectedTarget {
            id,
            distance,
            damage,
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildings::BuildingRegistry;
    use crate::data::{AttackProfileCatalog, EnemyArchetype};
    use crate::spatial::{SpatialIndex, TerrainProfile};
    use crate::world::Entity;

    fn dummy_at(storage: &mut EntityStorage, x: f64, z: f64) -> EntityId {
        storage.insert(Entity::enemy(
            &EnemyArchetype::training_dummy(),
            DVec3::new(x, 0.0, z),
        ))
    }

    fn swing(
        resolver: &mut CombatResolver,
        attacker: &Attacker,
        profile: &AttackProfile,
        storage: &mut EntityStorage,
    ) -> AttackOutcome {
        let terrain = TerrainProfile::default();
        let index = SpatialIndex::build(storage, &BuildingRegistry::new(), &terrain);
        resolver.attempt(attacker, profile, &index, storage)
    }

    fn facing_x() -> Attacker {
        Attacker::at(DVec3::ZERO, DVec3::X)
    }

    // ------------------------------------------------------------------------
    // Sector Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_sector_boundary_is_inclusive() {
        // 45 degrees off forward, exactly half of a 90 degree cone.
        assert!(within_sector(DVec3::X, DVec3::new(1.0, 0.0, 1.0), 90.0));
        assert!(within_sector(DVec3::X, DVec3::new(1.0, 0.0, -1.0), 90.0));
    }

    #[test]
    fn test_sector_excludes_just_outside() {
        let outside = DVec3::new(46.0_f64.to_radians().cos(), 0.0, 46.0_f64.to_radians().sin());
        assert!(!within_sector(DVec3::X, outside, 90.0));
    }

    #[test]
    fn test_sector_ignores_height() {
        assert!(within_sector(DVec3::X, DVec3::new(1.0, 30.0, 0.0), 10.0));
    }

    #[test]
    fn test_sector_coincident_target_counts() {
        assert!(within_sector(DVec3::X, DVec3::ZERO, 10.0));
    }

    #[test]
    fn test_sector_hits_boundary_target() {
        let mut storage = EntityStorage::new();
        let target = dummy_at(&mut storage, 1.0, 1.0);
        let profile = AttackProfile::sector(2.0, 90.0, 0.5, 1);
        let mut resolver = CombatResolver::new(0.5);

        let outcome = swing(&mut resolver, &facing_x(), &profile, &mut storage);
        assert!(outcome.hit);
        assert_eq!(outcome.targets[0].target, target);
    }

    #[test]
    fn test_sector_misses_behind_and_out_of_range() {
        let mut storage = EntityStorage::new();
        dummy_at(&mut storage, -1.0, 0.0);
        dummy_at(&mut storage, 5.0, 0.0);
        let profile = AttackProfile::bare_hand();
        let mut resolver = CombatResolver::new(0.5);

        let outcome = swing(&mut resolver, &facing_x(), &profile, &mut storage);
        assert!(!outcome.hit);
        assert_eq!(outcome.reason, Some(AttackMiss::NoTarget));
    }

    #[test]
    fn test_sector_truncates_to_nearest() {
        let mut storage = EntityStorage::new();
        let far = dummy_at(&mut storage, 2.2, 0.0);
        let near = dummy_at(&mut storage, 0.8, 0.0);
        let mid = dummy_at(&mut storage, 1.5, 0.1);
        dummy_at(&mut storage, 2.4, 0.2);
        let catalog = AttackProfileCatalog::with_defaults();
        let sword = catalog.get(Some(&"stone_sword".into())).clone();
        let mut resolver = CombatResolver::new(0.0);

        let outcome = swing(&mut resolver, &facing_x(), &sword, &mut storage);
        let ids: Vec<_> = outcome.targets.iter().map(|hit| hit.target).collect();
        assert_eq!(ids, vec![near, mid, far]);
    }

    #[test]
    fn test_unlimited_targets() {
        let mut storage = EntityStorage::new();
        for i in 0..6 {
            dummy_at(&mut storage, 1.0 + f64::from(i) * 0.1, 0.0);
        }
        let profile = AttackProfile::sector(3.0, 90.0, 0.5, 0);
        let mut resolver = CombatResolver::new(0.0);

        let outcome = swing(&mut resolver, &facing_x(), &profile, &mut storage);
        assert_eq!(outcome.targets.len(), 6);
    }

    // ------------------------------------------------------------------------
    // Ray Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_penetration_damage_formula() {
        assert_eq!(penetration_damage(15.0, 0.3, 0), 15.0);
        assert_eq!(penetration_damage(15.0, 0.3, 1), 10.0);
        assert_eq!(penetration_damage(15.0, 0.3, 2), 7.0);
        assert_eq!(penetration_damage(20.0, 0.0, 5), 20.0);
        assert_eq!(penetration_damage(20.0, 1.0, 1), 0.0);
    }

    #[test]
    fn test_ray_pierces_with_decay() {
        let mut storage = EntityStorage::new();
        let first = dummy_at(&mut storage, 1.0, 0.0);
        let second = dummy_at(&mut storage, 2.0, 0.0);
        let third = dummy_at(&mut storage, 3.0, 0.0);
        let spear = AttackProfile::ray(3.5, 0.8, 2, 0.3).with_damage(15.0);
        let mut resolver = CombatResolver::new(0.0);

        let outcome = swing(&mut resolver, &facing_x(), &spear, &mut storage);
        assert_eq!(outcome.targets.len(), 2);
        assert_eq!(outcome.targets[0].target, first);
        assert_eq!(outcome.targets[0].damage, 15.0);
        assert_eq!(outcome.targets[1].target, second);
        assert_eq!(outcome.targets[1].damage, 10.0);
        assert_eq!(storage.get(third).unwrap().health.current_hp(), 100.0);
    }

    #[test]
    fn test_ray_zero_penetration_pierces_everything() {
        let mut storage = EntityStorage::new();
        let line: Vec<_> = (1..=3)
            .map(|x| dummy_at(&mut storage, f64::from(x), 0.0))
            .collect();
        let lance = AttackProfile::ray(5.0, 0.8, 0, 0.0).with_damage(10.0);
        let mut resolver = CombatResolver::new(0.0);

        let outcome = swing(&mut resolver, &facing_x(), &lance, &mut storage);
        let hit: Vec<_> = outcome.targets.iter().map(|t| t.target).collect();
        assert_eq!(hit, line);
        assert!(outcome.targets.iter().all(|t| t.damage == 10.0));
    }

    #[test]
    fn test_ray_penetration_defaults_to_unlimited() {
        let profile: AttackProfile =
            ron::from_str("(detect_shape: Ray, range: 4.0, cooldown: 0.5)").unwrap();
        assert_eq!(profile.penetration, 0);
    }

    #[test]
    fn test_ray_uses_eye_height() {
        let mut storage = EntityStorage::new();
        // Dummy spans y in [-1, 1]; eyes above it miss.
        dummy_at(&mut storage, 1.5, 0.0);
        let spear = AttackProfile::ray(3.5, 0.8, 2, 0.3);
        let mut resolver = CombatResolver::new(0.0);
        let attacker = Attacker {
            eye_position: DVec3::new(0.0, 2.0, 0.0),
            ..facing_x()
        };

        let outcome = swing(&mut resolver, &attacker, &spear, &mut storage);
        assert!(!outcome.hit);
    }

    // ------------------------------------------------------------------------
    // Circle Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_circle_hits_all_around() {
        let mut storage = EntityStorage::new();
        dummy_at(&mut storage, -1.0, 0.0);
        dummy_at(&mut storage, 0.0, 1.0);
        dummy_at(&mut storage, 4.0, 0.0);
        let profile = AttackProfile::circle(2.0, 1.0, 0);
        let mut resolver = CombatResolver::new(0.0);

        let outcome = swing(&mut resolver, &facing_x(), &profile, &mut storage);
        assert_eq!(outcome.targets.len(), 2);
    }

    // ------------------------------------------------------------------------
    // Cooldown, Damage and Knockback Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_second_swing_within_cooldown_is_rejected() {
        let mut storage = EntityStorage::new();
        let target = dummy_at(&mut storage, 1.0, 0.0);
        let profile = AttackProfile::bare_hand();
        let mut resolver = CombatResolver::new(0.0);

        assert!(swing(&mut resolver, &facing_x(), &profile, &mut storage).hit);
        resolver.tick(profile.cooldown - 0.01);

        let second = swing(&mut resolver, &facing_x(), &profile, &mut storage);
        assert!(!second.hit);
        assert_eq!(second.reason, Some(AttackMiss::Cooldown));
        assert_eq!(storage.get(target).unwrap().health.current_hp(), 95.0);

        resolver.tick(0.01);
        assert!(swing(&mut resolver, &facing_x(), &profile, &mut storage).hit);
    }

    #[test]
    fn test_whiff_consumes_cooldown() {
        let mut storage = EntityStorage::new();
        let profile = AttackProfile::bare_hand();
        let mut resolver = CombatResolver::new(0.0);

        let outcome = swing(&mut resolver, &facing_x(), &profile, &mut storage);
        assert_eq!(outcome.reason, Some(AttackMiss::NoTarget));
        assert!(!resolver.ready());
    }

    #[test]
    fn test_attack_bonus_and_defense() {
        let mut storage = EntityStorage::new();
        let boar = storage.insert(Entity::enemy(&EnemyArchetype::wild_boar(), DVec3::X));
        let profile = AttackProfile::bare_hand();
        let mut resolver = CombatResolver::new(0.0);
        let attacker = Attacker {
            attack_bonus: 5.0,
            ..facing_x()
        };

        let outcome = swing(&mut resolver, &attacker, &profile, &mut storage);
        // (5 + 5) - 2 defense
        assert_eq!(outcome.targets[0].damage, 8.0);
        assert_eq!(storage.get(boar).unwrap().health.current_hp(), 42.0);
    }

    #[test]
    fn test_knockback_pushes_away_horizontally() {
        let mut storage = EntityStorage::new();
        let target = dummy_at(&mut storage, 1.0, 0.0);
        let profile = AttackProfile::bare_hand().with_knockback(2.0);
        let mut resolver = CombatResolver::new(0.5);
        let attacker = Attacker::at(DVec3::new(0.0, 3.0, 0.0), DVec3::X);

        let outcome = swing(&mut resolver, &attacker, &profile, &mut storage);
        let position = storage.get(target).unwrap().position;
        assert_eq!(position, DVec3::new(2.0, 0.0, 0.0));
        assert_eq!(outcome.targets[0].position, position);
    }

    #[test]
    fn test_killing_blow_reports_death() {
        let mut storage = EntityStorage::new();
        let target = dummy_at(&mut storage, 1.0, 0.0);
        let profile = AttackProfile::bare_hand().with_damage(500.0);
        let mut resolver = CombatResolver::new(0.0);

        let outcome = swing(&mut resolver, &facing_x(), &profile, &mut storage);
        assert!(outcome.targets[0].died);
        assert_eq!(outcome.targets[0].damage, 500.0);
        assert!(!storage.is_attackable(target));
    }

    #[test]
    fn test_resources_are_not_attack_targets() {
        use crate::data::ResourceArchetype;

        let mut storage = EntityStorage::new();
        storage.insert(Entity::resource(&ResourceArchetype::tree(), DVec3::X));
        let mut resolver = CombatResolver::new(0.0);

        let outcome = swing(&mut resolver, &facing_x(), &AttackProfile::bare_hand(), &mut storage);
        assert!(!outcome.hit);
    }

    #[test]
    fn test_detection_is_deterministic() {
        let mut storage = EntityStorage::new();
        for i in 0..10 {
            dummy_at(&mut storage, 1.0 + f64::from(i % 3) * 0.3, f64::from(i) * 0.1 - 0.5);
        }
        let terrain = TerrainProfile::default();
        let index = SpatialIndex::build(&storage, &BuildingRegistry::new(), &terrain);
        let resolver = CombatResolver::new(0.0);
        let profile = AttackProfile::sector(3.0, 120.0, 0.5, 4);
        let filter = |id: EntityId| storage.is_attackable(id);

        let first = resolver.detect_targets(&facing_x(), &profile, &index, &filter);
        let second = resolver.detect_targets(&facing_x(), &profile, &index, &filter);
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
    }
}
