//! Tunable simulation constants.
//!
//! Engagement distances and the attack hysteresis band are deliberately
//! kept out of [`crate::data::AttackProfile`]: they belong to the arbiters
//! and the AI, not to the held item.

use serde::{Deserialize, Serialize};

use crate::enemy_ai::MOVE_DEAD_ZONE;
use crate::error::{GameError, Result};

/// Rules applied when validating building placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementRules {
    /// Largest allowed height spread across the footprint corners.
    pub max_slope: f64,
    /// Placement centers beyond this |x| or |z| are rejected.
    pub world_half_extent: f64,
}

impl Default for PlacementRules {
    fn default() -> Self {
        Self {
            max_slope: 1.0,
            world_half_extent: 95.0,
        }
    }
}

/// Top-level simulation configuration.
///
/// # Example RON
///
/// ```ron
/// SimConfig(
///     combat_engagement_distance: 3.0,
///     attack_hysteresis: 1.2,
///     seed: 7,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Max actor-to-hit distance for the combat action.
    pub combat_engagement_distance: f64,
    /// Max actor-to-hit distance for the harvest action.
    pub harvest_engagement_distance: f64,
    /// Max actor-to-hit distance for context interactions.
    pub interaction_range: f64,
    /// Length of the forward view probe.
    pub view_probe_distance: f64,
    /// Multiplier on attack range before an attacking enemy resumes chase.
    pub attack_hysteresis: f64,
    /// Seconds between harvest swings.
    pub harvest_cooldown: f64,
    /// Knockback strength to displacement conversion.
    pub knockback_scale: f64,
    /// Distance at which a patrol point counts as reached.
    pub patrol_arrival_distance: f64,
    /// Shortest idle pause after reaching a patrol point.
    pub idle_time_min: f64,
    /// Longest idle pause after reaching a patrol point.
    pub idle_time_max: f64,
    /// Fraction of max HP restored on respawn.
    pub respawn_health_fraction: f64,
    /// Building placement rules.
    pub placement: PlacementRules,
    /// Seed for patrol points, idle timers and night waves.
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            combat_engagement_distance: 3.0,
            harvest_engagement_distance: 3.5,
            interaction_range: 3.5,
            view_probe_distance: 10.0,
            attack_hysteresis: 1.2,
            harvest_cooldown: 0.4,
            knockback_scale: 0.5,
            patrol_arrival_distance: 0.5,
            idle_time_min: 2.0,
            idle_time_max: 5.0,
            respawn_health_fraction: 0.5,
            placement: PlacementRules::default(),
            seed: 0,
        }
    }
}

impl SimConfig {
    /// Parse and validate a config from RON.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self =
            ron::from_str(ron).map_err(|err| GameError::parse("simulation config", &err))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would break simulation invariants.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("combat_engagement_distance", self.combat_engagement_distance),
            ("harvest_engagement_distance", self.harvest_engagement_distance),
            ("interaction_range", self.interaction_range),
            ("view_probe_distance", self.view_probe_distance),
            ("patrol_arrival_distance", self.patrol_arrival_distance),
            ("world_half_extent", self.placement.world_half_extent),
        ];
        for (name, value) in positive {
            if value.is_nan() || value <= 0.0 {
                return Err(GameError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if self.patrol_arrival_distance < MOVE_DEAD_ZONE {
            return Err(GameError::InvalidConfig(format!(
                "patrol_arrival_distance must be at least {MOVE_DEAD_ZONE}, got {}",
                self.patrol_arrival_distance
            )));
        }
        if self.attack_hysteresis < 1.0 {
            return Err(GameError::InvalidConfig(format!(
                "attack_hysteresis must be at least 1.0, got {}",
                self.attack_hysteresis
            )));
        }
        if self.harvest_cooldown < 0.0 || self.placement.max_slope < 0.0 {
            return Err(GameError::InvalidConfig(
                "harvest_cooldown and max_slope must not be negative".to_string(),
            ));
        }
        if self.idle_time_min < 0.0 || self.idle_time_max < self.idle_time_min {
            return Err(GameError::InvalidConfig(format!(
                "idle time range [{}, {}) is invalid",
                self.idle_time_min, self.idle_time_max
            )));
        }
        if self.respawn_health_fraction <= 0.0 || self.respawn_health_fraction > 1.0 {
            return Err(GameError::InvalidConfig(format!(
                "respawn_health_fraction must be in (0, 1], got {}",
                self.respawn_health_fraction
            )));
        }
        Ok(())
    }
}
