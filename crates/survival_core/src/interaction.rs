//! Context interactions ("press E").
//!
//! Interactables register under their entity id with a priority tag. Each
//! tick the arbiter probes along the view ray and keeps the nearest usable
//! target in reach; executing the interaction returns the effect for the
//! caller to act on.

use std::collections::BTreeMap;
use std::fmt;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::data::InteractableKind;
use crate::math::Ray;
use crate::spatial::SpatialQuery;

/// Priority tag of an interactable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InteractionPriority {
    /// Trees, rocks.
    Resource = 10,
    /// Creatures.
    Enemy = 50,
    /// Beds, chests, campfires.
    Building = 100,
}

impl InteractionPriority {
    /// Numeric weight.
    #[must_use]
    pub const fn value(self) -> u32 {
        self as u32
    }
}

/// What an interaction asks the outside world to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractionEffect {
    /// Open a container.
    OpenStorage {
        /// Slot count.
        slots: u32,
    },
    /// Open the cooking menu.
    Cook,
    /// Sleep through the night.
    Sleep,
    /// Open the crafting menu.
    Craft,
    /// Anything else, by name.
    Custom(String),
}

/// Something the player can interact with.
pub trait Interaction: fmt::Debug {
    /// Whether the interaction is currently offered.
    fn can_interact(&self) -> bool {
        true
    }

    /// Prompt text, e.g. `"[E] Open Chest"`.
    fn prompt(&self) -> String;

    /// Perform the interaction.
    fn interact(&mut self) -> InteractionEffect;
}

/// Interaction offered by a placed building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildingInteraction {
    name: String,
    kind: InteractableKind,
    storage_slots: u32,
}

impl BuildingInteraction {
    /// Create for a building called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: InteractableKind, storage_slots: u32) -> Self {
        Self {
            name: name.into(),
            kind,
            storage_slots,
        }
    }
}

impl Interaction for BuildingInteraction {
    fn prompt(&self) -> String {
        format!("[E] {} {}", self.kind.verb(), self.name)
    }

    fn interact(&mut self) -> InteractionEffect {
        match self.kind {
            InteractableKind::Storage => InteractionEffect::OpenStorage {
                slots: self.storage_slots,
            },
            InteractableKind::Cooking => InteractionEffect::Cook,
            InteractableKind::Sleep => InteractionEffect::Sleep,
            InteractableKind::Crafting => InteractionEffect::Craft,
        }
    }
}

#[derive(Debug)]
struct Registration {
    priority: InteractionPriority,
    handler: Box<dyn Interaction>,
}

/// Picks the interaction target under the player's view.
#[derive(Debug, Default)]
pub struct InteractionArbiter {
    registered: BTreeMap<EntityId, Registration>,
    current: Option<EntityId>,
}

impl InteractionArbiter {
    /// Empty arbiter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for entity `id`, replacing any previous one.
    pub fn register(
        &mut self,
        id: EntityId,
        priority: InteractionPriority,
        handler: Box<dyn Interaction>,
    ) {
        tracing::debug!(entity = id, prompt = %handler.prompt(), "Registered interactable");
        self.registered.insert(id, Registration { priority, handler });
    }

    /// Forget entity `id`.
    pub fn unregister(&mut self, id: EntityId) {
        if self.registered.remove(&id).is_some() {
            tracing::debug!(entity = id, "Unregistered interactable");
        }
        if self.current == Some(id) {
            self.current = None;
        }
    }

    /// Whether `id` is registered.
    #[must_use]
    pub fn is_registered(&self, id: EntityId) -> bool {
        self.registered.contains_key(&id)
    }

    /// Number of registered interactables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registered.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    /// Re-pick the target along `view`.
    ///
    /// Reach is measured from `actor` to the hit point, not along the ray.
    pub fn update(
        &mut self,
        actor: DVec3,
        view: &Ray,
        spatial: &dyn SpatialQuery,
        range: f64,
        probe_distance: f64,
    ) -> Option<EntityId> {
        let hits = spatial.probe_all(view, probe_distance, &|id| {
            self.registered.contains_key(&id)
        });

        let mut best: Option<(EntityId, f64)> = None;
        for hit in hits {
            let reach = actor.distance(hit.point);
            if reach > range {
                continue;
            }
            let usable = self
                .registered
                .get(&hit.id)
                .is_some_and(|registration| registration.handler.can_interact());
            if usable && best.map_or(true, |(_, nearest)| reach < nearest) {
                best = Some((hit.id, reach));
            }
        }

        self.current = best.map(|(id, _)| id);
        self.current
    }

    /// Current target.
    #[must_use]
    pub fn current_target(&self) -> Option<EntityId> {
        self.current
    }

    /// Priority tag of the current target.
    #[must_use]
    pub fn current_priority(&self) -> Option<InteractionPriority> {
        self.current
            .and_then(|id| self.registered.get(&id))
            .map(|registration| registration.priority)
    }

    /// Prompt of the current target.
    #[must_use]
    pub fn current_prompt(&self) -> Option<String> {
        self.current
            .and_then(|id| self.registered.get(&id))
            .map(|registration| registration.handler.prompt())
    }

    /// Interact with the current target unless the UI has focus.
    pub fn execute_interaction(&mut self, ui_blocked: bool) -> Option<(EntityId, InteractionEffect)> {
        if ui_blocked {
            return None;
        }
        let id = self.current?;
        let registration = self.registered.get_mut(&id)?;
        if !registration.handler.can_interact() {
            return None;
        }
        let effect = registration.handler.interact();
        tracing::debug!(entity = id, ?effect, "Interaction executed");
        Some((id, effect))
    }
}
