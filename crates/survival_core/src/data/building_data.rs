//! Building data structures for data-driven building definitions.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::components::ItemId;
use crate::error::{GameError, Result};

/// Identifier of a building type (e.g. `"campfire"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingTypeId(String);

impl BuildingTypeId {
    /// Create a building type id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw string id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BuildingTypeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for BuildingTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a placed building does when the player interacts with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractableKind {
    /// Opens a storage container.
    Storage,
    /// Opens the cooking menu.
    Cooking,
    /// Lets the player sleep.
    Sleep,
    /// Opens the crafting bench.
    Crafting,
}

impl InteractableKind {
    /// Verb shown in the interaction prompt.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Storage => "Open",
            Self::Cooking => "Cook at",
            Self::Sleep => "Sleep in",
            Self::Crafting => "Craft at",
        }
    }
}

/// Building size in world units before rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    /// Extent along X at rotation 0.
    pub width: f64,
    /// Extent along Y.
    pub height: f64,
    /// Extent along Z at rotation 0.
    pub depth: f64,
}

impl Footprint {
    /// Create a footprint.
    #[must_use]
    pub fn new(width: f64, height: f64, depth: f64) -> Self {
        debug_assert!(
            width > 0.0 && height > 0.0 && depth > 0.0,
            "footprint dimensions must be positive: {width}x{height}x{depth}"
        );
        Self {
            width,
            height,
            depth,
        }
    }
}

/// Data-driven building definition.
///
/// # Example RON
///
/// ```ron
/// BuildingData(
///     id: "campfire",
///     name: "Campfire",
///     footprint: (width: 1.0, height: 0.5, depth: 1.0),
///     recipe: {"wood": 5, "stone": 3},
///     interactable: Some(Cooking),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingData {
    /// Unique identifier.
    pub id: BuildingTypeId,
    /// Display name.
    pub name: String,
    /// Size before rotation.
    pub footprint: Footprint,
    /// Materials consumed on placement.
    #[serde(default)]
    pub recipe: BTreeMap<ItemId, u32>,
    /// Interaction offered once placed.
    #[serde(default)]
    pub interactable: Option<InteractableKind>,
    /// Slot count for storage buildings.
    #[serde(default)]
    pub storage_slots: u32,
    /// Contact damage for traps.
    #[serde(default)]
    pub trap_damage: f64,
}

impl BuildingData {
    fn new(id: &str, name: &str, footprint: Footprint, recipe: &[(&str, u32)]) -> Self {
        Self {
            id: BuildingTypeId::from(id),
            name: name.to_string(),
            footprint,
            recipe: recipe
                .iter()
                .map(|(item, count)| (ItemId::from(*item), *count))
                .collect(),
            interactable: None,
            storage_slots: 0,
            trap_damage: 0.0,
        }
    }

    fn interactable(mut self, kind: InteractableKind) -> Self {
        self.interactable = Some(kind);
        self
    }
}

/// All known building types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingCatalog {
    buildings: HashMap<BuildingTypeId, BuildingData>,
}

impl Default for BuildingCatalog {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl BuildingCatalog {
    /// Build a catalog from a list of definitions.
    #[must_use]
    pub fn from_definitions(definitions: Vec<BuildingData>) -> Self {
        Self {
            buildings: definitions
                .into_iter()
                .map(|data| (data.id.clone(), data))
                .collect(),
        }
    }

    /// The standard survival structures.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut chest = BuildingData::new(
            "chest",
            "Chest",
            Footprint::new(1.0, 0.8, 0.6),
            &[("wood", 12)],
        )
        .interactable(InteractableKind::Storage);
        chest.storage_slots = 30;

        let mut spike_trap = BuildingData::new(
            "spike_trap",
            "Spike Trap",
            Footprint::new(1.0, 0.3, 1.0),
            &[("wood", 5), ("stone", 3)],
        );
        spike_trap.trap_damage = 15.0;

        Self::from_definitions(vec![
            BuildingData::new(
                "wooden_floor",
                "Wooden Floor",
                Footprint::new(2.0, 0.2, 2.0),
                &[("wood", 3)],
            ),
            BuildingData::new(
                "wooden_wall",
                "Wooden Wall",
                Footprint::new(2.0, 3.0, 0.2),
                &[("wood", 5)],
            ),
            BuildingData::new(
                "wooden_door",
                "Wooden Door",
                Footprint::new(1.0, 2.5, 0.2),
                &[("wood", 8)],
            ),
            BuildingData::new(
                "wooden_fence",
                "Wooden Fence",
                Footprint::new(2.0, 1.5, 0.15),
                &[("wood", 3)],
            ),
            BuildingData::new(
                "workbench",
                "Workbench",
                Footprint::new(1.5, 1.0, 1.0),
                &[("wood", 10), ("stone", 5)],
            )
            .interactable(InteractableKind::Crafting),
            BuildingData::new(
                "campfire",
                "Campfire",
                Footprint::new(1.0, 0.5, 1.0),
                &[("wood", 5), ("stone", 3)],
            )
            .interactable(InteractableKind::Cooking),
            chest,
            BuildingData::new(
                "bed",
                "Bed",
                Footprint::new(1.0, 0.6, 2.0),
                &[("wood", 15), ("fiber", 20)],
            )
            .interactable(InteractableKind::Sleep),
            spike_trap,
        ])
    }

    /// Parse a list of building definitions from RON.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let definitions: Vec<BuildingData> =
            ron::from_str(ron).map_err(|err| GameError::parse("building catalog", &err))?;
        Ok(Self::from_definitions(definitions))
    }

    /// Look up a building type.
    #[must_use]
    pub fn get(&self, id: &BuildingTypeId) -> Option<&BuildingData> {
        self.buildings.get(id)
    }

    /// Look up a building type, failing on unknown ids.
    pub fn require(&self, id: &BuildingTypeId) -> Result<&BuildingData> {
        self.get(id)
            .ok_or_else(|| GameError::UnknownBuilding(id.to_string()))
    }

    /// Number of building types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_contents() {
        let catalog = BuildingCatalog::with_defaults();
        assert_eq!(catalog.len(), 9);

        let campfire = catalog.get(&BuildingTypeId::from("campfire")).unwrap();
        assert_eq!(campfire.interactable, Some(InteractableKind::Cooking));
        assert_eq!(campfire.recipe.get(&ItemId::from("wood")), Some(&5));
        assert_eq!(campfire.recipe.get(&ItemId::from("stone")), Some(&3));

        let chest = catalog.get(&BuildingTypeId::from("chest")).unwrap();
        assert_eq!(chest.storage_slots, 30);
    }

    #[test]
    fn test_require_unknown_building() {
        let catalog = BuildingCatalog::with_defaults();
        let err = catalog
            .require(&BuildingTypeId::from("castle"))
            .unwrap_err();
        assert!(matches!(err, GameError::UnknownBuilding(id) if id == "castle"));
    }

    #[test]
    fn test_catalog_from_ron() {
        let ron = r#"[
            (
                id: "hut",
                name: "Hut",
                footprint: (width: 3.0, height: 2.5, depth: 3.0),
                recipe: {"wood": 20},
                interactable: Some(Sleep),
            ),
        ]"#;
        let catalog = BuildingCatalog::from_ron_str(ron).unwrap();
        let hut = catalog.get(&BuildingTypeId::from("hut")).unwrap();
        assert_eq!(hut.footprint.width, 3.0);
        assert_eq!(hut.interactable, Some(InteractableKind::Sleep));
        assert_eq!(hut.storage_slots, 0);
    }
}
