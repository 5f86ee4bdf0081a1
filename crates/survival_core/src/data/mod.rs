//! Data structures for items, buildings, enemies and resource nodes.
//!
//! Everything here is plain data that can be deserialized from RON and
//! ships with built-in defaults.
//!
//! **Note:** This module contains no IO - it only defines data types.
//! File loading is handled by `survival_headless`.

mod attack_profile;
mod building_data;
mod enemy_data;
mod resource_data;

pub use attack_profile::{
    AttackProfile, AttackProfileCatalog, DetectShape, ItemProfile, BARE_HAND_GATHER_DAMAGE,
};
pub use building_data::{
    BuildingCatalog, BuildingData, BuildingTypeId, Footprint, InteractableKind,
};
pub use enemy_data::{AiProfile, EnemyArchetype};
pub use resource_data::ResourceArchetype;
