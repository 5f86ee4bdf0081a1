//! # Survival Core
//!
//! Action arbitration, combat/harvest resolution and enemy behavior for a
//! single-player survival world.
//!
//! This crate contains **only** gameplay logic:
//! - No rendering
//! - No file IO
//! - No system randomness (a seeded `ChaCha8Rng` lives in the simulation)
//!
//! Physics, terrain, inventory slots and UI are reached through small
//! collaborator traits ([`spatial::SpatialQuery`], [`spatial::HeightSource`],
//! [`inventory::Inventory`]) and the outbound [`events::EventQueue`].
//!
//! ## Crate Structure
//!
//! - [`simulation`] - World tick orchestration
//! - [`action`] - Which action the primary button performs this tick
//! - [`combat`] - Shape-based target detection and damage
//! - [`harvest`] - Resource gathering
//! - [`buildings`] - Build mode, placement validation, place/remove
//! - [`interaction`] - Context ("press E") interactions
//! - [`enemy_ai`] - Patrol/idle/chase/attack state machine
//! - [`world`] - Entity table
//! - [`data`] - Item, building, enemy and resource definitions

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod action;
pub mod buildings;
pub mod combat;
pub mod components;
pub mod config;
pub mod data;
pub mod enemy_ai;
pub mod error;
pub mod events;
pub mod harvest;
pub mod interaction;
pub mod inventory;
pub mod math;
pub mod simulation;
pub mod spatial;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::action::{ActionArbiter, ActionCategory, ActionContext};
    pub use crate::buildings::{
        BuildingRegistry, BuildingSystem, CostSource, PaymentRejection, PlacedBuilding,
        PlacementCandidate, PlacementReceipt, PlacementRejection, PlacementValidation, Rotation,
    };
    pub use crate::combat::{AttackMiss, AttackOutcome, Attacker, CombatResolver, TargetHit};
    pub use crate::components::*;
    pub use crate::config::{PlacementRules, SimConfig};
    pub use crate::data::{
        AiProfile, AttackProfile, AttackProfileCatalog, BuildingCatalog, BuildingData,
        BuildingTypeId, DetectShape, EnemyArchetype, Footprint, InteractableKind, ItemProfile,
        ResourceArchetype,
    };
    pub use crate::enemy_ai::{AiState, AiTick, EnemyAi};
    pub use crate::error::{GameError, Result};
    pub use crate::events::{EventQueue, GameEvent};
    pub use crate::harvest::{HarvestOutcome, HarvestResolver};
    pub use crate::interaction::{
        BuildingInteraction, Interaction, InteractionArbiter, InteractionEffect,
        InteractionPriority,
    };
    pub use crate::inventory::{Backpack, DurabilityResult, HeldTool, Inventory};
    pub use crate::math::{Aabb, Ray};
    pub use crate::simulation::{BuildCommand, FrameInput, PlayerState, Simulation};
    pub use crate::spatial::{
        HeightGrid, HeightSource, ProbeHit, RegionHit, RegionShape, SpatialIndex, SpatialQuery,
        TerrainProfile,
    };
    pub use crate::world::{Entity, EntityKind, EntityStorage};
}
