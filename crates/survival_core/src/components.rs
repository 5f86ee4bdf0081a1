//! Shared gameplay components.
//!
//! These are plain value types owned by whichever entity they are attached
//! to. Every resolver mutates them through the narrow operations defined
//! here rather than poking at fields.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier for world entities and placed buildings.
pub type EntityId = u64;

/// Identifier of an inventory item (e.g. `"stone_axe"`, `"wood"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Create an item id.
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

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Damageable
// ============================================================================

/// Result of a single [`Damageable::apply_damage`] call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageOutcome {
    /// HP actually removed.
    pub actual_damage: f64,
    /// Whether the target is dead after this call.
    pub died: bool,
}

/// Hit points of anything that can be hurt or destroyed.
///
/// `alive` flips to `false` exactly once, when `current_hp` reaches zero,
/// and only [`Damageable::revive`] brings it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Damageable {
    current_hp: f64,
    max_hp: f64,
    defense: f64,
    alive: bool,
}

impl Damageable {
    /// Create at full health.
    #[must_use]
    pub fn new(max_hp: f64, defense: f64) -> Self {
        debug_assert!(max_hp > 0.0, "max_hp must be positive, got {max_hp}");
        let max_hp = max_hp.max(1.0);
        Self {
            current_hp: max_hp,
            max_hp,
            defense: defense.max(0.0),
            alive: true,
        }
    }

    /// Current hit points.
    #[must_use]
    pub const fn current_hp(&self) -> f64 {
        self.current_hp
    }

    /// Maximum hit points.
    #[must_use]
    pub const fn max_hp(&self) -> f64 {
        self.max_hp
    }

    /// Flat damage reduction.
    #[must_use]
    pub const fn defense(&self) -> f64 {
        self.defense
    }

    /// Whether the owner is still alive.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    /// Health as a fraction in `[0, 1]`.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        self.current_hp / self.max_hp
    }

    /// Apply raw damage.
    ///
    /// Defense is subtracted first and the result floored at 1 for any
    /// positive amount. Non-positive amounts do nothing. Calling this on a
    /// dead target is a no-op reporting `died = true`.
    pub fn apply_damage(&mut self, amount: f64) -> DamageOutcome {
        if !self.alive {
            return DamageOutcome {
                actual_damage: 0.0,
                died: true,
            };
        }
        if amount.is_nan() || amount <= 0.0 {
            return DamageOutcome {
                actual_damage: 0.0,
                died: false,
            };
        }

        let actual = (amount - self.defense).max(1.0);
        self.current_hp = (self.current_hp - actual).max(0.0);

        if self.current_hp <= 0.0 {
            self.alive = false;
        }

        DamageOutcome {
            actual_damage: actual,
            died: !self.alive,
        }
    }

    /// Bring the owner back at `fraction` of max HP.
    pub fn revive(&mut self, fraction: f64) {
        debug_assert!(
            fraction > 0.0 && fraction <= 1.0,
            "revive fraction out of range: {fraction}"
        );
        let fraction = fraction.clamp(f64::MIN_POSITIVE, 1.0);
        self.current_hp = (self.max_hp * fraction).max(1.0).min(self.max_hp);
        self.alive = true;
    }
}

// ============================================================================
// Cooldown
// ============================================================================

/// Leftover wait below which a cooldown counts as elapsed.
///
/// Absorbs rounding from summing frame deltas.
pub const COOLDOWN_EPSILON: f64 = 1e-9;

/// Time gate between repeated actions.
///
/// Shared by player combat, player harvesting and enemy attacks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cooldown {
    remaining: f64,
    duration: f64,
}

impl Cooldown {
    /// A cooldown that is ready immediately.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            remaining: 0.0,
            duration: 0.0,
        }
    }

    /// Advance by `dt` seconds.
    pub fn tick(&mut self, dt: f64) {
        if self.remaining > 0.0 && dt > 0.0 {
            self.remaining = (self.remaining - dt).max(0.0);
            if self.remaining < COOLDOWN_EPSILON {
                self.remaining = 0.0;
            }
        }
    }

    /// Whether the gated action may run.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.remaining <= 0.0
    }

    /// Start a new wait of `duration` seconds.
    pub fn consume(&mut self, duration: f64) {
        let duration = duration.max(0.0);
        self.remaining = duration;
        self.duration = duration;
    }

    /// Seconds left before the action is ready again.
    #[must_use]
    pub const fn remaining(&self) -> f64 {
        self.remaining
    }

    /// Recovery progress in `[0, 1]`, 1 meaning ready.
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (1.0 - self.remaining / self.duration).clamp(0.0, 1.0)
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
