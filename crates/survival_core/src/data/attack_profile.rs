//! Per-item attack and gather parameters.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::components::ItemId;
use crate::error::{GameError, Result};

/// Gather damage dealt with no tool in hand.
pub const BARE_HAND_GATHER_DAMAGE: f64 = 1.0;

/// Geometric test used to enumerate attack targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DetectShape {
    /// Horizontal cone in front of the attacker.
    #[default]
    Sector,
    /// Finite ray from the eyes, optionally piercing several targets.
    Ray,
    /// Sphere around the attacker.
    Circle,
}

/// Static attack parameters of a held item.
///
/// `angle` only matters for [`DetectShape::Sector`], `penetration` and
/// `penetration_decay` only for [`DetectShape::Ray`].
///
/// # Example RON
///
/// ```ron
/// AttackProfile(
///     detect_shape: Ray,
///     range: 3.5,
///     cooldown: 0.8,
///     penetration: 2,
///     penetration_decay: 0.3,
///     knockback: 3.0,
///     base_damage: 15.0,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackProfile {
    /// Target detection shape.
    #[serde(default)]
    pub detect_shape: DetectShape,
    /// Reach in world units.
    pub range: f64,
    /// Full cone angle in degrees.
    #[serde(default)]
    pub angle: f64,
    /// Seconds between swings.
    pub cooldown: f64,
    /// Maximum targets per swing, 0 for unlimited.
    #[serde(default)]
    pub max_targets: u32,
    /// Targets a ray may pass through, 0 for unlimited.
    #[serde(default)]
    pub penetration: u32,
    /// Fraction of damage lost per successive ray hit.
    #[serde(default)]
    pub penetration_decay: f64,
    /// Push strength applied to each target.
    #[serde(default)]
    pub knockback: f64,
    /// Damage dealt by the item itself.
    #[serde(default)]
    pub base_damage: f64,
}

impl AttackProfile {
    /// Fallback profile used when nothing (or a non-weapon) is held.
    #[must_use]
    pub fn bare_hand() -> Self {
        Self {
            detect_shape: DetectShape::Sector,
            range: 1.5,
            angle: 90.0,
            cooldown: 0.8,
            max_targets: 1,
            penetration: 0,
            penetration_decay: 0.0,
            knockback: 0.5,
            base_damage: 5.0,
        }
    }

    /// Sector profile.
    #[must_use]
    pub fn sector(range: f64, angle: f64, cooldown: f64, max_targets: u32) -> Self {
        Self {
            detect_shape: DetectShape::Sector,
            range,
            angle,
            cooldown,
            max_targets,
            ..Self::bare_hand()
        }
    }

    /// Piercing ray profile.
    #[must_use]
    pub fn ray(range: f64, cooldown: f64, penetration: u32, penetration_decay: f64) -> Self {
        Self {
            detect_shape: DetectShape::Ray,
            range,
            angle: 0.0,
            cooldown,
            max_targets: 0,
            penetration,
            penetration_decay,
            ..Self::bare_hand()
        }
    }

    /// Sphere profile.
    #[must_use]
    pub fn circle(range: f64, cooldown: f64, max_targets: u32) -> Self {
        Self {
            detect_shape: DetectShape::Circle,
            range,
            angle: 0.0,
            cooldown,
            max_targets,
            ..Self::bare_hand()
        }
    }

    /// Set knockback strength.
    #[must_use]
    pub fn with_knockback(mut self, knockback: f64) -> Self {
        self.knockback = knockback;
        self
    }

    /// Set base damage.
    #[must_use]
    pub fn with_damage(mut self, base_damage: f64) -> Self {
        self.base_damage = base_damage;
        self
    }
}

/// Catalog entry for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemProfile {
    /// Attack parameters, if the item can be swung.
    #[serde(default)]
    pub attack: Option<AttackProfile>,
    /// Gather damage keyed by resource type (`"wood"`, `"stone"`).
    #[serde(default)]
    pub gather_damage: BTreeMap<String, f64>,
    /// Gather damage against resource types missing from `gather_damage`.
    #[serde(default)]
    pub default_gather_damage: Option<f64>,
}

/// Read-only lookup from held item to attack/gather parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackProfileCatalog {
    #[serde(default = "AttackProfile::bare_hand")]
    bare_hand: AttackProfile,
    items: HashMap<ItemId, ItemProfile>,
}

impl Default for AttackProfileCatalog {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl AttackProfileCatalog {
    /// Catalog with only the bare-hand fallback.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            bare_hand: AttackProfile::bare_hand(),
            items: HashMap::new(),
        }
    }

    /// Catalog of the standard hand tools and weapons.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut catalog = Self::empty();

        catalog.insert(
            "stone_axe",
            ItemProfile {
                attack: Some(
                    AttackProfile::sector(2.0, 90.0, 0.7, 2)
                        .with_knockback(2.0)
                        .with_damage(8.0),
                ),
                gather_damage: gather(&[("wood", 15.0), ("stone", 5.0)]),
                default_gather_damage: Some(8.0),
            },
        );
        catalog.insert(
            "wood_pickaxe",
            ItemProfile {
                attack: Some(
                    AttackProfile::sector(1.8, 60.0, 0.8, 1)
                        .with_knockback(1.0)
                        .with_damage(3.0),
                ),
                gather_damage: gather(&[("wood", 5.0), ("stone", 12.0)]),
                default_gather_damage: Some(6.0),
            },
        );
        catalog.insert(
            "stone_pickaxe",
            ItemProfile {
                attack: Some(
                    AttackProfile::sector(1.8, 60.0, 0.75, 1)
                        .with_knockback(1.5)
                        .with_damage(5.0),
                ),
                gather_damage: gather(&[("wood", 6.0), ("stone", 20.0)]),
                default_gather_damage: Some(10.0),
            },
        );
        catalog.insert(
            "wooden_sword",
            ItemProfile {
                attack: Some(
                    AttackProfile::sector(2.5, 120.0, 0.5, 3)
                        .with_knockback(1.5)
                        .with_damage(10.0),
                ),
                gather_damage: BTreeMap::new(),
                default_gather_damage: None,
            },
        );
        catalog.insert(
            "stone_sword",
            ItemProfile {
                attack: Some(
                    AttackProfile::sector(2.5, 120.0, 0.55, 3)
                        .with_knockback(2.0)
                        .with_damage(20.0),
                ),
                gather_damage: BTreeMap::new(),
                default_gather_damage: None,
            },
        );
        catalog.insert(
            "wooden_spear",
            ItemProfile {
                attack: Some(
                    AttackProfile::ray(3.5, 0.8, 2, 0.3)
                        .with_knockback(3.0)
                        .with_damage(15.0),
                ),
                gather_damage: BTreeMap::new(),
                default_gather_damage: None,
            },
        );

        catalog
    }

    /// Parse a catalog from RON.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        ron::from_str(ron).map_err(|err| GameError::parse("attack profile catalog", &err))
    }

    /// Add or replace an item entry.
    pub fn insert(&mut self, item: impl Into<ItemId>, profile: ItemProfile) {
        self.items.insert(item.into(), profile);
    }

    /// Whether the catalog knows the item.
    #[must_use]
    pub fn contains(&self, item: &ItemId) -> bool {
        self.items.contains_key(item)
    }

    /// The bare-hand fallback profile.
    #[must_use]
    pub fn bare_hand(&self) -> &AttackProfile {
        &self.bare_hand
    }

    /// Attack profile for the held item, falling back to bare hands.
    #[must_use]
    pub fn get(&self, item: Option<&ItemId>) -> &AttackProfile {
        item.and_then(|id| self.items.get(id))
            .and_then(|entry| entry.attack.as_ref())
            .unwrap_or(&self.bare_hand)
    }

    /// Gather damage of the held item against a resource type.
    #[must_use]
    pub fn gather_damage(&self, item: Option<&ItemId>, resource_type: &str) -> f64 {
        let Some(entry) = item.and_then(|id| self.items.get(id)) else {
            return BARE_HAND_GATHER_DAMAGE;
        };
        entry
            .gather_damage
            .get(resource_type)
            .copied()
            .or(entry.default_gather_damage)
            .unwrap_or(BARE_HAND_GATHER_DAMAGE)
    }
}

fn gather(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
    entries
        .iter()
        .map(|(kind, damage)| ((*kind).to_string(), *damage))
        .collect()
}
