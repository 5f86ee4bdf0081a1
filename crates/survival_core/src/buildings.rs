//! Building placement and removal.
//!
//! Handles build mode, placement validation against terrain slope,
//! existing buildings and world bounds, and the place/remove transactions
//! with their material costs and refunds.

use std::fmt;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::components::{EntityId, ItemId};
use crate::config::PlacementRules;
use crate::data::{BuildingCatalog, BuildingData, BuildingTypeId, Footprint, InteractableKind};
use crate::error::Result;
use crate::events::{EventQueue, GameEvent};
use crate::inventory::Inventory;
use crate::math::Aabb;
use crate::spatial::HeightSource;

// ============================================================================
// Rotation
// ============================================================================

/// Building yaw in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    /// 0 degrees.
    #[default]
    Deg0,
    /// 90 degrees.
    Deg90,
    /// 180 degrees.
    Deg180,
    /// 270 degrees.
    Deg270,
}

impl Rotation {
    /// Angle in degrees.
    #[must_use]
    pub const fn degrees(self) -> u32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Rotation from a multiple of 90 degrees.
    #[must_use]
    pub const fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees % 360 {
            0 => Some(Self::Deg0),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    /// Next quarter turn, wrapping at 360.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Deg0 => Self::Deg90,
            Self::Deg90 => Self::Deg180,
            Self::Deg180 => Self::Deg270,
            Self::Deg270 => Self::Deg0,
        }
    }

    /// Whether width and depth trade places.
    #[must_use]
    pub const fn swaps_axes(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// Half extents on X and Z after rotation.
#[must_use]
pub fn rotated_half_extents(footprint: &Footprint, rotation: Rotation) -> (f64, f64) {
    let (width, depth) = if rotation.swaps_axes() {
        (footprint.depth, footprint.width)
    } else {
        (footprint.width, footprint.depth)
    };
    (width * 0.5, depth * 0.5)
}

// ============================================================================
// Placed Buildings
// ============================================================================

/// A building standing in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedBuilding {
    /// World id.
    pub id: EntityId,
    /// Building type.
    pub building_type: BuildingTypeId,
    /// Display name.
    pub name: String,
    /// Size before rotation.
    pub footprint: Footprint,
    /// Center on the ground; `y` is the placement height.
    pub position: DVec3,
    /// Yaw.
    pub rotation: Rotation,
    /// Interaction offered, if any.
    pub interactable: Option<InteractableKind>,
}

impl PlacedBuilding {
    /// Half extents on X and Z.
    #[must_use]
    pub fn half_extents_xz(&self) -> (f64, f64) {
        rotated_half_extents(&self.footprint, self.rotation)
    }

    /// Collision bounds, standing on `position.y`.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        let (hw, hd) = self.half_extents_xz();
        let half_height = self.footprint.height * 0.5;
        Aabb::from_center(
            self.position + DVec3::new(0.0, half_height, 0.0),
            DVec3::new(hw, half_height, hd),
        )
    }
}

/// Every placed building.
#[derive(Debug, Clone, Default)]
pub struct BuildingRegistry {
    buildings: Vec<PlacedBuilding>,
}

impl BuildingRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a building.
    pub fn insert(&mut self, building: PlacedBuilding) {
        self.buildings.push(building);
    }

    /// Unregister a building.
    pub fn remove(&mut self, id: EntityId) -> Option<PlacedBuilding> {
        let index = self.buildings.iter().position(|b| b.id == id)?;
        Some(self.buildings.remove(index))
    }

    /// Look up a building.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&PlacedBuilding> {
        self.buildings.iter().find(|b| b.id == id)
    }

    /// Whether `id` is a placed building.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Iterate in placement order.
    pub fn iter(&self) -> impl Iterator<Item = &PlacedBuilding> {
        self.buildings.iter()
    }

    /// Number of buildings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    /// Whether nothing is built.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }
}

// ============================================================================
// Placement Validation
// ============================================================================

/// A footprint under validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementCandidate {
    /// Center; only x and z are used.
    pub position: DVec3,
    /// Yaw.
    pub rotation: Rotation,
    /// Size before rotation.
    pub footprint: Footprint,
}

impl PlacementCandidate {
    /// The four ground corners as `(x, z)`.
    #[must_use]
    pub fn corners(&self) -> [(f64, f64); 4] {
        let (hw, hd) = rotated_half_extents(&self.footprint, self.rotation);
        let (x, z) = (self.position.x, self.position.z);
        [
            (x - hw, z - hd),
            (x + hw, z - hd),
            (x - hw, z + hd),
            (x + hw, z + hd),
        ]
    }

    /// Strict XZ overlap; touching edges do not count.
    #[must_use]
    pub fn overlaps(&self, building: &PlacedBuilding) -> bool {
        let (hw, hd) = rotated_half_extents(&self.footprint, self.rotation);
        let (other_hw, other_hd) = building.half_extents_xz();
        (self.position.x - building.position.x).abs() < hw + other_hw
            && (self.position.z - building.position.z).abs() < hd + other_hd
    }
}

/// Why a placement was refused.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlacementRejection {
    /// Ground under the corners is too uneven.
    TooSteep {
        /// Measured corner height spread.
        height_diff: f64,
    },
    /// Footprint intersects an existing building.
    Overlap {
        /// The building in the way.
        building: EntityId,
    },
    /// Center lies outside the buildable area.
    OutOfBounds,
}

impl fmt::Display for PlacementRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooSteep { height_diff } => {
                write!(f, "terrain too steep (height difference {height_diff:.2})")
            }
            Self::Overlap { building } => write!(f, "overlaps building {building}"),
            Self::OutOfBounds => f.write_str("outside the buildable area"),
        }
    }
}

/// Why the placement cost could not be paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentRejection {
    /// The building item being placed from the hand ran out.
    NoHeldItem {
        /// Item that was expected in the inventory.
        item: ItemId,
    },
    /// A recipe input is short.
    InsufficientMaterials {
        /// First missing input.
        item: ItemId,
        /// Amount the recipe asks for.
        needed: u32,
    },
    /// The inventory refused a consume it had reported as covered.
    ConsumeFailed {
        /// Input that could not be taken.
        item: ItemId,
        /// Amount asked for.
        count: u32,
    },
}

impl fmt::Display for PaymentRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoHeldItem { item } => write!(f, "no {item} left to place"),
            Self::InsufficientMaterials { item, needed } => {
                write!(f, "insufficient materials: need {needed} {item}")
            }
            Self::ConsumeFailed { item, count } => write!(f, "failed to consume {count} {item}"),
        }
    }
}

/// Result of validating a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacementValidation {
    /// Whether the candidate can be built.
    pub can_place: bool,
    /// Height the building would stand on (highest corner).
    pub placement_y: f64,
    /// First failed check.
    pub reason: Option<PlacementRejection>,
}

impl PlacementValidation {
    fn rejected(placement_y: f64, reason: PlacementRejection) -> Self {
        Self {
            can_place: false,
            placement_y,
            reason: Some(reason),
        }
    }
}

/// Check slope, then overlap, then bounds; stop at the first failure.
#[must_use]
pub fn validate_placement(
    candidate: &PlacementCandidate,
    rules: &PlacementRules,
    registry: &BuildingRegistry,
    heights: &dyn HeightSource,
) -> PlacementValidation {
    let (mut min_height, mut max_height) = (f64::INFINITY, f64::NEG_INFINITY);
    for (x, z) in candidate.corners() {
        let height = heights.height_at(x, z);
        min_height = min_height.min(height);
        max_height = max_height.max(height);
    }

    let height_diff = max_height - min_height;
    if height_diff > rules.max_slope {
        return PlacementValidation::rejected(
            max_height,
            PlacementRejection::TooSteep { height_diff },
        );
    }

    if let Some(blocking) = registry.iter().find(|b| candidate.overlaps(b)) {
        return PlacementValidation::rejected(
            max_height,
            PlacementRejection::Overlap {
                building: blocking.id,
            },
        );
    }

    let bound = rules.world_half_extent;
    if candidate.position.x.abs() > bound || candidate.position.z.abs() > bound {
        return PlacementValidation::rejected(max_height, PlacementRejection::OutOfBounds);
    }

    PlacementValidation {
        can_place: true,
        placement_y: max_height,
        reason: None,
    }
}

// ============================================================================
// Build Mode
// ============================================================================

/// Who pays for a placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CostSource {
    /// Consume the building's recipe inputs.
    Recipe,
    /// Consume one unit of a pre-crafted building item.
    HeldItem(ItemId),
}

/// Ghost building following the player's aim.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementPreview {
    /// Candidate under the aim point.
    pub candidate: PlacementCandidate,
    /// Its validation result.
    pub validation: PlacementValidation,
}

/// Active build mode state.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildMode {
    /// Selected building type.
    pub building_type: BuildingTypeId,
    /// Current yaw.
    pub rotation: Rotation,
    /// Who pays.
    pub cost_source: CostSource,
    /// Latest preview, once an aim point is known.
    pub preview: Option<PlacementPreview>,
}

/// Result of a place or remove transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementReceipt {
    /// Whether the transaction happened.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
    /// The building placed or removed.
    pub building: Option<PlacedBuilding>,
}

impl PlacementReceipt {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            building: None,
        }
    }
}

// ============================================================================
// Building System
// ============================================================================

/// Build mode plus the placed-building registry.
#[derive(Debug, Clone, Default)]
pub struct BuildingSystem {
    rules: PlacementRules,
    registry: BuildingRegistry,
    mode: Option<BuildMode>,
}

impl BuildingSystem {
    /// Create with the given placement rules.
    #[must_use]
    pub fn new(rules: PlacementRules) -> Self {
        Self {
            rules,
            registry: BuildingRegistry::new(),
            mode: None,
        }
    }

    /// Placement rules.
    #[must_use]
    pub fn rules(&self) -> &PlacementRules {
        &self.rules
    }

    /// Placed buildings.
    #[must_use]
    pub fn registry(&self) -> &BuildingRegistry {
        &self.registry
    }

    /// Whether build mode is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.mode.is_some()
    }

    /// Active build mode state.
    #[must_use]
    pub fn mode(&self) -> Option<&BuildMode> {
        self.mode.as_ref()
    }

    /// Enter build mode paying with the recipe.
    pub fn enter_build_mode(
        &mut self,
        building_type: &BuildingTypeId,
        catalog: &BuildingCatalog,
        events: &mut EventQueue,
    ) -> Result<()> {
        self.enter(building_type, CostSource::Recipe, catalog, events)
    }

    /// Enter build mode paying with a pre-crafted building item.
    pub fn enter_build_mode_from_item(
        &mut self,
        building_type: &BuildingTypeId,
        item: ItemId,
        catalog: &BuildingCatalog,
        events: &mut EventQueue,
    ) -> Result<()> {
        self.enter(building_type, CostSource::HeldItem(item), catalog, events)
    }

    fn enter(
        &mut self,
        building_type: &BuildingTypeId,
        cost_source: CostSource,
        catalog: &BuildingCatalog,
        events: &mut EventQueue,
    ) -> Result<()> {
        if let Err(err) = catalog.require(building_type) {
            tracing::warn!(building = %building_type, "Refusing build mode for unknown building");
            return Err(err);
        }

        self.mode = Some(BuildMode {
            building_type: building_type.clone(),
            rotation: Rotation::Deg0,
            cost_source,
            preview: None,
        });
        tracing::debug!(building = %building_type, "Entered build mode");
        events.push(GameEvent::BuildModeChanged {
            is_building: true,
            building_id: Some(building_type.clone()),
        });
        Ok(())
    }

    /// Leave build mode. Does nothing when not building.
    pub fn exit_build_mode(&mut self, events: &mut EventQueue) {
        if self.mode.take().is_some() {
            tracing::debug!("Exited build mode");
            events.push(GameEvent::BuildModeChanged {
                is_building: false,
                building_id: None,
            });
        }
    }

    /// Turn the ghost by 90 degrees.
    pub fn rotate(&mut self) -> Option<Rotation> {
        let mode = self.mode.as_mut()?;
        mode.rotation = mode.rotation.next();
        if let Some(preview) = mode.preview.as_mut() {
            preview.candidate.rotation = mode.rotation;
        }
        Some(mode.rotation)
    }

    /// Validate an arbitrary candidate against the current registry.
    #[must_use]
    pub fn validate(
        &self,
        position: DVec3,
        footprint: Footprint,
        rotation: Rotation,
        heights: &dyn HeightSource,
    ) -> PlacementValidation {
        let candidate = PlacementCandidate {
            position,
            rotation,
            footprint,
        };
        validate_placement(&candidate, &self.rules, &self.registry, heights)
    }

    /// Move the ghost to `aim` and revalidate it.
    pub fn update_preview(
        &mut self,
        aim: DVec3,
        catalog: &BuildingCatalog,
        heights: &dyn HeightSource,
    ) -> Option<PlacementPreview> {
        let mode = self.mode.as_ref()?;
        let data = catalog.get(&mode.building_type)?;
        let candidate = PlacementCandidate {
            position: aim,
            rotation: mode.rotation,
            footprint: data.footprint,
        };
        let validation = validate_placement(&candidate, &self.rules, &self.registry, heights);
        let preview = PlacementPreview {
            candidate,
            validation,
        };
        if let Some(mode) = self.mode.as_mut() {
            mode.preview = Some(preview);
        }
        Some(preview)
    }

    /// Place the previewed building.
    ///
    /// Re-validates, pays, then registers. Nothing changes unless every
    /// step succeeds.
    pub fn place(
        &mut self,
        next_id: impl FnOnce() -> EntityId,
        catalog: &BuildingCatalog,
        inventory: &mut dyn Inventory,
        heights: &dyn HeightSource,
        events: &mut EventQueue,
    ) -> PlacementReceipt {
        let Some(mode) = self.mode.as_ref() else {
            return PlacementReceipt::failed("not in build mode");
        };
        let Some(preview) = mode.preview else {
            return PlacementReceipt::failed("no placement position");
        };
        let Some(data) = catalog.get(&mode.building_type) else {
            tracing::warn!(building = %mode.building_type, "Build mode references unknown building");
            return PlacementReceipt::failed("unknown building type");
        };

        let candidate = PlacementCandidate {
            rotation: mode.rotation,
            ..preview.candidate
        };
        let validation = validate_placement(&candidate, &self.rules, &self.registry, heights);
        if let Some(reason) = validation.reason {
            return PlacementReceipt::failed(format!("cannot place {}: {reason}", data.name));
        }

        let cost_source = mode.cost_source.clone();
        if let Err(reason) = pay(&cost_source, data, inventory) {
            tracing::debug!(building = %data.id, %reason, "Placement cost not paid");
            return PlacementReceipt::failed(reason.to_string());
        }

        let building = PlacedBuilding {
            id: next_id(),
            building_type: data.id.clone(),
            name: data.name.clone(),
            footprint: data.footprint,
            position: DVec3::new(
                candidate.position.x,
                validation.placement_y,
                candidate.position.z,
            ),
            rotation: candidate.rotation,
            interactable: data.interactable,
        };
        self.registry.insert(building.clone());

        tracing::info!(
            id = building.id,
            building = %building.building_type,
            x = building.position.x,
            z = building.position.z,
            "Building placed"
        );
        events.push(GameEvent::BuildingPlaced {
            building: building.clone(),
        });

        if let CostSource::HeldItem(item) = &cost_source {
            if !inventory.has_item(item, 1) {
                self.exit_build_mode(events);
            }
        }

        PlacementReceipt {
            success: true,
            message: format!("placed {}", building.name),
            building: Some(building),
        }
    }

    /// Remove a building and refund half (rounded down) of each recipe input.
    pub fn remove(
        &mut self,
        id: EntityId,
        catalog: &BuildingCatalog,
        inventory: &mut dyn Inventory,
        events: &mut EventQueue,
    ) -> PlacementReceipt {
        let Some(building) = self.registry.remove(id) else {
            return PlacementReceipt::failed(format!("building {id} not found"));
        };

        match catalog.get(&building.building_type) {
            Some(data) => {
                for (item, count) in &data.recipe {
                    let refund = count / 2;
                    if refund > 0 && !inventory.add(item, refund) {
                        tracing::warn!(item = %item, refund, "Refund did not fit in inventory");
                    }
                }
            }
            None => {
                tracing::warn!(building = %building.building_type, "No recipe to refund");
            }
        }

        tracing::info!(id, building = %building.building_type, "Building removed");
        events.push(GameEvent::BuildingRemoved {
            building: building.clone(),
        });

        PlacementReceipt {
            success: true,
            message: format!("removed {}", building.name),
            building: Some(building),
        }
    }
}

/// Deduct the placement cost, leaving the inventory untouched on failure.
fn pay(
    cost_source: &CostSource,
    data: &BuildingData,
    inventory: &mut dyn Inventory,
) -> std::result::Result<(), PaymentRejection> {
    match cost_source {
        CostSource::HeldItem(item) => {
            if inventory.consume(item, 1) {
                Ok(())
            } else {
                Err(PaymentRejection::NoHeldItem { item: item.clone() })
            }
        }
        CostSource::Recipe => {
            if let Some((item, count)) = data
                .recipe
                .iter()
                .find(|(item, count)| !inventory.has_item(item, **count))
            {
                return Err(PaymentRejection::InsufficientMaterials {
                    item: item.clone(),
                    needed: *count,
                });
            }

            let mut paid: Vec<(&ItemId, u32)> = Vec::with_capacity(data.recipe.len());
            for (item, &count) in &data.recipe {
                if !inventory.consume(item, count) {
                    for (refund_item, refund_count) in paid {
                        inventory.add(refund_item, refund_count);
                    }
                    return Err(PaymentRejection::ConsumeFailed {
                        item: item.clone(),
                        count,
                    });
                }
                paid.push((item, count));
            }
            Ok(())
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::Backpack;
    use crate::spatial::TerrainProfile;

    fn flat() -> TerrainProfile {
        TerrainProfile::Flat(0.0)
    }

    fn floor_footprint() -> Footprint {
        Footprint::new(2.0, 0.2, 2.0)
    }

    fn candidate(x: f64, z: f64) -> PlacementCandidate {
        PlacementCandidate {
            position: DVec3::new(x, 0.0, z),
            rotation: Rotation::Deg0,
            footprint: floor_footprint(),
        }
    }

    fn placed(id: EntityId, x: f64, z: f64) -> PlacedBuilding {
        PlacedBuilding {
            id,
            building_type: BuildingTypeId::from("wooden_floor"),
            name: "Wooden Floor".to_string(),
            footprint: floor_footprint(),
            position: DVec3::new(x, 0.0, z),
            rotation: Rotation::Deg0,
            interactable: None,
        }
    }

    fn id_counter(start: EntityId) -> impl FnMut() -> EntityId {
        let mut next = start;
        move || {
            let id = next;
            next += 1;
            id
        }
    }

    // ------------------------------------------------------------------------
    // Rotation Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_rotation_wraps() {
        assert_eq!(Rotation::Deg270.next(), Rotation::Deg0);
        assert_eq!(Rotation::from_degrees(450), Some(Rotation::Deg90));
        assert_eq!(Rotation::from_degrees(45), None);
    }

    #[test]
    fn test_rotation_swaps_width_and_depth() {
        let wall = Footprint::new(2.0, 3.0, 0.2);
        assert_eq!(rotated_half_extents(&wall, Rotation::Deg0), (1.0, 0.1));
        assert_eq!(rotated_half_extents(&wall, Rotation::Deg90), (0.1, 1.0));
        assert_eq!(rotated_half_extents(&wall, Rotation::Deg180), (1.0, 0.1));
        assert_eq!(rotated_half_extents(&wall, Rotation::Deg270), (0.1, 1.0));
    }

    // ------------------------------------------------------------------------
    // Validation Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_flat_ground_is_valid() {
        let terrain = TerrainProfile::Flat(3.0);
        let result = validate_placement(
            &candidate(0.0, 0.0),
            &PlacementRules::default(),
            &BuildingRegistry::new(),
            &terrain,
        );
        assert!(result.can_place);
        assert_eq!(result.placement_y, 3.0);
        assert!(result.reason.is_none());
    }

    #[test]
    fn test_slope_exactly_at_threshold_is_accepted() {
        let step = |x: f64, _z: f64| if x > 0.0 { 1.0 } else { 0.0 };
        let result = validate_placement(
            &candidate(0.0, 0.0),
            &PlacementRules::default(),
            &BuildingRegistry::new(),
            &step,
        );
        assert!(result.can_place);
        assert_eq!(result.placement_y, 1.0);
    }

    #[test]
    fn test_slope_above_threshold_is_rejected() {
        let step = |x: f64, _z: f64| if x > 0.0 { 1.0 + 1e-9 } else { 0.0 };
        let result = validate_placement(
            &candidate(0.0, 0.0),
            &PlacementRules::default(),
            &BuildingRegistry::new(),
            &step,
        );
        assert!(!result.can_place);
        assert!(matches!(
            result.reason,
            Some(PlacementRejection::TooSteep { .. })
        ));
    }

    #[test]
    fn test_rotation_changes_sampled_corners() {
        // Ground rises along x; a thin wall only spans 0.2 in x once rotated.
        let ramp = TerrainProfile::Plane {
            base: 0.0,
            slope_x: 0.75,
            slope_z: 0.0,
        };
        let wall = Footprint::new(2.0, 3.0, 0.2);
        let rules = PlacementRules::default();
        let registry = BuildingRegistry::new();

        let straight = PlacementCandidate {
            position: DVec3::ZERO,
            rotation: Rotation::Deg0,
            footprint: wall,
        };
        let turned = PlacementCandidate {
            rotation: Rotation::Deg90,
            ..straight
        };

        assert!(!validate_placement(&straight, &rules, &registry, &ramp).can_place);
        assert!(validate_placement(&turned, &rules, &registry, &ramp).can_place);
    }

    #[test]
    fn test_overlap_is_rejected() {
        let mut registry = BuildingRegistry::new();
        registry.insert(placed(7, 0.0, 0.0));

        let result = validate_placement(
            &candidate(1.5, 0.0),
            &PlacementRules::default(),
            &registry,
            &flat(),
        );
        assert_eq!(
            result.reason,
            Some(PlacementRejection::Overlap { building: 7 })
        );
    }

    #[test]
    fn test_touching_edges_do_not_overlap() {
        let mut registry = BuildingRegistry::new();
        registry.insert(placed(7, 0.0, 0.0));

        let result = validate_placement(
            &candidate(2.0, 0.0),
            &PlacementRules::default(),
            &registry,
            &flat(),
        );
        assert!(result.can_place);
    }

    #[test]
    fn test_out_of_bounds_is_rejected() {
        let result = validate_placement(
            &candidate(95.5, 0.0),
            &PlacementRules::default(),
            &BuildingRegistry::new(),
            &flat(),
        );
        assert_eq!(result.reason, Some(PlacementRejection::OutOfBounds));

        let edge = validate_placement(
            &candidate(0.0, -95.0),
            &PlacementRules::default(),
            &BuildingRegistry::new(),
            &flat(),
        );
        assert!(edge.can_place);
    }

    #[test]
    fn test_checks_run_in_order() {
        // Steep, overlapping and out of bounds at once: slope wins.
        let mut registry = BuildingRegistry::new();
        registry.insert(placed(1, 100.0, 0.0));
        let steep = |x: f64, _z: f64| x * 10.0;
        let result = validate_placement(
            &candidate(100.0, 0.0),
            &PlacementRules::default(),
            &registry,
            &steep,
        );
        assert!(matches!(
            result.reason,
            Some(PlacementRejection::TooSteep { .. })
        ));

        // Overlapping and out of bounds: overlap wins.
        let result = validate_placement(
            &candidate(100.0, 0.0),
            &PlacementRules::default(),
            &registry,
            &flat(),
        );
        assert!(matches!(
            result.reason,
            Some(PlacementRejection::Overlap { .. })
        ));
    }

    #[test]
    fn test_rejection_messages_are_distinct() {
        let messages = [
            PlacementRejection::TooSteep { height_diff: 2.0 }.to_string(),
            PlacementRejection::Overlap { building: 3 }.to_string(),
            PlacementRejection::OutOfBounds.to_string(),
        ];
        assert_ne!(messages[0], messages[1]);
        assert_ne!(messages[1], messages[2]);
        assert_ne!(messages[0], messages[2]);
    }

    // ------------------------------------------------------------------------
    // Build Mode Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_enter_unknown_building_fails() {
        let mut system = BuildingSystem::new(PlacementRules::default());
        let mut events = EventQueue::new();
        let result = system.enter_build_mode(
            &BuildingTypeId::from("castle"),
            &BuildingCatalog::with_defaults(),
            &mut events,
        );
        assert!(result.is_err());
        assert!(!system.is_active());
        assert!(events.is_empty());
    }

    #[test]
    fn test_enter_and_exit_emit_mode_changes() {
        let mut system = BuildingSystem::new(PlacementRules::default());
        let mut events = EventQueue::new();
        let campfire = BuildingTypeId::from("campfire");
        system
            .enter_build_mode(&campfire, &BuildingCatalog::with_defaults(), &mut events)
            .unwrap();
        system.exit_build_mode(&mut events);
        system.exit_build_mode(&mut events);

        let events = events.drain();
        assert_eq!(
            events,
            vec![
                GameEvent::BuildModeChanged {
                    is_building: true,
                    building_id: Some(campfire),
                },
                GameEvent::BuildModeChanged {
                    is_building: false,
                    building_id: None,
                },
            ]
        );
    }

    #[test]
    fn test_place_pays_recipe_and_registers() {
        let catalog = BuildingCatalog::with_defaults();
        let mut system = BuildingSystem::new(PlacementRules::default());
        let mut events = EventQueue::new();
        let mut pack = Backpack::new().with_item("wood", 6).with_item("stone", 3);
        let terrain = TerrainProfile::Flat(1.5);

        system
            .enter_build_mode(&BuildingTypeId::from("campfire"), &catalog, &mut events)
            .unwrap();
        system.update_preview(DVec3::new(4.0, 0.0, 4.0), &catalog, &terrain);
        let receipt = system.place(id_counter(100), &catalog, &mut pack, &terrain, &mut events);

        assert!(receipt.success, "{}", receipt.message);
        let building = receipt.building.unwrap();
        assert_eq!(building.id, 100);
        assert_eq!(building.position, DVec3::new(4.0, 1.5, 4.0));
        assert_eq!(building.interactable, Some(InteractableKind::Cooking));
        assert_eq!(pack.count(&ItemId::from("wood")), 1);
        assert_eq!(pack.count(&ItemId::from("stone")), 0);
        assert_eq!(system.registry().len(), 1);
        assert!(system.is_active());
    }

    #[test]
    fn test_place_without_materials_changes_nothing() {
        let catalog = BuildingCatalog::with_defaults();
        let mut system = BuildingSystem::new(PlacementRules::default());
        let mut events = EventQueue::new();
        let mut pack = Backpack::new().with_item("wood", 10).with_item("stone", 2);

        system
            .enter_build_mode(&BuildingTypeId::from("workbench"), &catalog, &mut events)
            .unwrap();
        system.update_preview(DVec3::ZERO, &catalog, &flat());
        events.drain();

        let receipt = system.place(id_counter(1), &catalog, &mut pack, &flat(), &mut events);
        assert!(!receipt.success);
        assert!(receipt.message.contains("insufficient"));
        assert_eq!(pack.count(&ItemId::from("wood")), 10);
        assert_eq!(pack.count(&ItemId::from("stone")), 2);
        assert!(system.registry().is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn test_payment_rejection_names_the_short_input() {
        let catalog = BuildingCatalog::with_defaults();
        let workbench = catalog.get(&BuildingTypeId::from("workbench")).unwrap();
        let mut pack = Backpack::new().with_item("wood", 10).with_item("stone", 2);

        let err = pay(&CostSource::Recipe, workbench, &mut pack).unwrap_err();
        assert!(matches!(
            &err,
            PaymentRejection::InsufficientMaterials { item, needed }
                if item == &ItemId::from("stone") && *needed > 2
        ));
        assert!(err.to_string().starts_with("insufficient materials"));
        assert_eq!(pack.count(&ItemId::from("wood")), 10);

        let floor = catalog.get(&BuildingTypeId::from("wooden_floor")).unwrap();
        let held = CostSource::HeldItem(ItemId::from("wooden_floor"));
        assert_eq!(
            pay(&held, floor, &mut pack),
            Err(PaymentRejection::NoHeldItem {
                item: ItemId::from("wooden_floor")
            })
        );
    }

    #[test]
    fn test_place_revalidates_against_new_buildings() {
        let catalog = BuildingCatalog::with_defaults();
        let mut system = BuildingSystem::new(PlacementRules::default());
        let mut events = EventQueue::new();
        let mut pack = Backpack::new().with_item("wood", 30);
        let floor = BuildingTypeId::from("wooden_floor");

        system.enter_build_mode(&floor, &catalog, &mut events).unwrap();
        system.update_preview(DVec3::ZERO, &catalog, &flat());
        let mut ids = id_counter(1);
        assert!(system.place(&mut ids, &catalog, &mut pack, &flat(), &mut events).success);

        // Same spot again without moving the ghost.
        let receipt = system.place(&mut ids, &catalog, &mut pack, &flat(), &mut events);
        assert!(!receipt.success);
        assert!(receipt.message.contains("overlaps"));
        assert_eq!(pack.count(&ItemId::from("wood")), 27);
    }

    #[test]
    fn test_held_item_placement_exits_when_stack_runs_out() {
        let catalog = BuildingCatalog::with_defaults();
        let mut system = BuildingSystem::new(PlacementRules::default());
        let mut events = EventQueue::new();
        let mut pack = Backpack::new().with_item("chest", 1);

        system
            .enter_build_mode_from_item(
                &BuildingTypeId::from("chest"),
                ItemId::from("chest"),
                &catalog,
                &mut events,
            )
            .unwrap();
        system.update_preview(DVec3::new(3.0, 0.0, 0.0), &catalog, &flat());
        let receipt = system.place(id_counter(1), &catalog, &mut pack, &flat(), &mut events);

        assert!(receipt.success);
        assert!(!system.is_active());
        assert_eq!(pack.count(&ItemId::from("chest")), 0);
        let last = events.drain().pop().unwrap();
        assert_eq!(
            last,
            GameEvent::BuildModeChanged {
                is_building: false,
                building_id: None,
            }
        );
    }

    #[test]
    fn test_remove_refunds_half_rounded_down() {
        let catalog = BuildingCatalog::with_defaults();
        let mut system = BuildingSystem::new(PlacementRules::default());
        let mut events = EventQueue::new();
        let mut pack = Backpack::new().with_item("wood", 5).with_item("stone", 3);

        system
            .enter_build_mode(&BuildingTypeId::from("campfire"), &catalog, &mut events)
            .unwrap();
        system.update_preview(DVec3::ZERO, &catalog, &flat());
        let placed = system
            .place(id_counter(9), &catalog, &mut pack, &flat(), &mut events)
            .building
            .unwrap();

        let receipt = system.remove(placed.id, &catalog, &mut pack, &mut events);
        assert!(receipt.success);
        // wood 5 -> 2, stone 3 -> 1
        assert_eq!(pack.count(&ItemId::from("wood")), 2);
        assert_eq!(pack.count(&ItemId::from("stone")), 1);
        assert!(system.registry().is_empty());
        assert!(matches!(
            events.drain().last(),
            Some(GameEvent::BuildingRemoved { .. })
        ));
    }

    #[test]
    fn test_remove_missing_building_fails() {
        let mut system = BuildingSystem::new(PlacementRules::default());
        let mut events = EventQueue::new();
        let mut pack = Backpack::new();
        let receipt = system.remove(
            42,
            &BuildingCatalog::with_defaults(),
            &mut pack,
            &mut events,
        );
        assert!(!receipt.success);
        assert!(receipt.message.contains("not found"));
        assert!(events.is_empty());
    }

    #[test]
    fn test_rotate_updates_preview() {
        let catalog = BuildingCatalog::with_defaults();
        let mut system = BuildingSystem::new(PlacementRules::default());
        let mut events = EventQueue::new();
        assert!(system.rotate().is_none());

        system
            .enter_build_mode(&BuildingTypeId::from("wooden_wall"), &catalog, &mut events)
            .unwrap();
        system.update_preview(DVec3::ZERO, &catalog, &flat());
        assert_eq!(system.rotate(), Some(Rotation::Deg90));
        let preview = system.mode().unwrap().preview.unwrap();
        assert_eq!(preview.candidate.rotation, Rotation::Deg90);
    }

    #[test]
    fn test_placement_validation_determinism() {
        let mut registry = BuildingRegistry::new();
        for i in 0..5 {
            registry.insert(placed(i, i as f64 * 3.0, 0.0));
        }
        let terrain = TerrainProfile::Plane {
            base: 0.0,
            slope_x: 0.1,
            slope_z: 0.3,
        };
        let rules = PlacementRules::default();

        for x in -5..20 {
            for z in -5..5 {
                let c = candidate(f64::from(x), f64::from(z));
                let first = validate_placement(&c, &rules, &registry, &terrain);
                let second = validate_placement(&c, &rules, &registry, &terrain);
                assert_eq!(first, second, "Determinism failed at ({x}, {z})");
            }
        }
    }
}
