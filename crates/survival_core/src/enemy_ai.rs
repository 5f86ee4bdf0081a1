//! Enemy behavior state machine.
//!
//! Each AI-driven enemy cycles through patrol, idle, chase and attack. All
//! distances are measured on the ground plane, so height differences never
//! keep an enemy from noticing or reaching the player.

use std::fmt;

use glam::DVec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::Cooldown;
use crate::config::SimConfig;
use crate::data::AiProfile;
use crate::math::{horizontal_distance, step_towards};

/// Movement is skipped when closer than this to the destination.
pub const MOVE_DEAD_ZONE: f64 = 0.1;

/// Behavior state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AiState {
    /// Wandering between random points around the spawn point.
    #[default]
    Patrol,
    /// Resting after reaching a patrol point.
    Idle,
    /// Running at the player.
    Chase,
    /// In striking distance of the player.
    Attack,
}

impl fmt::Display for AiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Patrol => "patrol",
            Self::Idle => "idle",
            Self::Chase => "chase",
            Self::Attack => "attack",
        };
        f.write_str(name)
    }
}

/// What happened during one [`EnemyAi::update`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AiTick {
    /// `(from, to)` when the state changed.
    pub transition: Option<(AiState, AiState)>,
    /// Raw damage of a strike landed this tick.
    pub strike: Option<f64>,
}

/// Per-enemy brain.
#[derive(Debug, Clone, PartialEq)]
pub struct EnemyAi {
    profile: AiProfile,
    state: AiState,
    idle_timer: f64,
    attack_cooldown: Cooldown,
    patrol_target: Option<DVec3>,
    chasing_player: bool,
    spawn_point: DVec3,
}

impl EnemyAi {
    /// Start patrolling around `spawn_point`.
    #[must_use]
    pub fn new(profile: AiProfile, spawn_point: DVec3) -> Self {
        Self {
            profile,
            state: AiState::Patrol,
            idle_timer: 0.0,
            attack_cooldown: Cooldown::new(),
            patrol_target: None,
            chasing_player: false,
            spawn_point,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> AiState {
        self.state
    }

    /// Tuning values.
    #[must_use]
    pub const fn profile(&self) -> &AiProfile {
        &self.profile
    }

    /// Whether the player is the bound chase target.
    #[must_use]
    pub const fn is_chasing_player(&self) -> bool {
        self.chasing_player
    }

    /// Current patrol destination.
    #[must_use]
    pub const fn patrol_target(&self) -> Option<DVec3> {
        self.patrol_target
    }

    /// Center of the patrol area.
    #[must_use]
    pub const fn spawn_point(&self) -> DVec3 {
        self.spawn_point
    }

    /// Strike cooldown.
    #[must_use]
    pub const fn attack_cooldown(&self) -> &Cooldown {
        &self.attack_cooldown
    }

    /// Advance the brain by `dt`, moving `position` and reporting strikes.
    ///
    /// At most one state change happens per call.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        dt: f64,
        position: &mut DVec3,
        player: DVec3,
        config: &SimConfig,
        rng: &mut R,
    ) -> AiTick {
        self.attack_cooldown.tick(dt);
        let distance = horizontal_distance(*position, player);

        match self.state {
            AiState::Patrol | AiState::Idle if distance <= self.profile.detection_range => {
                self.chasing_player = true;
                self.transition(AiState::Chase)
            }
            AiState::Patrol => self.patrol(dt, position, config, rng),
            AiState::Idle => {
                self.idle_timer -= dt;
                if self.idle_timer <= 0.0 {
                    self.idle_timer = 0.0;
                    self.transition(AiState::Patrol)
                } else {
                    AiTick::default()
                }
            }
            AiState::Chase => {
                if distance > self.profile.chase_range {
                    self.chasing_player = false;
                    self.patrol_target = None;
                    self.transition(AiState::Patrol)
                } else if distance <= self.profile.attack_range {
                    self.transition(AiState::Attack)
                } else {
                    *position = step_towards(
                        *position,
                        player,
                        self.profile.move_speed * dt,
                        MOVE_DEAD_ZONE,
                    );
                    AiTick::default()
                }
            }
            AiState::Attack => {
                if distance > self.profile.attack_range * config.attack_hysteresis {
                    self.transition(AiState::Chase)
                } else if self.attack_cooldown.ready() {
                    self.attack_cooldown.consume(self.profile.attack_cooldown);
                    AiTick {
                        transition: None,
                        strike: Some(self.profile.attack_damage),
                    }
                } else {
                    AiTick::default()
                }
            }
        }
    }

    fn patrol<R: Rng + ?Sized>(
        &mut self,
        dt: f64,
        position: &mut DVec3,
        config: &SimConfig,
        rng: &mut R,
    ) -> AiTick {
        let target = match self.patrol_target {
            Some(target) => target,
            None => {
                let target = self.pick_patrol_point(rng);
                self.patrol_target = Some(target);
                target
            }
        };

        *position = step_towards(
            *position,
            target,
            self.profile.patrol_speed * dt,
            MOVE_DEAD_ZONE,
        );

        if horizontal_distance(*position, target) < config.patrol_arrival_distance {
            self.patrol_target = None;
            self.idle_timer = sample_range(rng, config.idle_time_min, config.idle_time_max);
            return self.transition(AiState::Idle);
        }
        AiTick::default()
    }

    fn pick_patrol_point<R: Rng + ?Sized>(&self, rng: &mut R) -> DVec3 {
        let angle = rng.gen_range(0.0..std::f64::consts::TAU);
        let radius = sample_range(rng, 0.0, self.profile.patrol_radius);
        DVec3::new(
            self.spawn_point.x + angle.cos() * radius,
            self.spawn_point.y,
            self.spawn_point.z + angle.sin() * radius,
        )
    }

    fn transition(&mut self, to: AiState) -> AiTick {
        let from = self.state;
        self.state = to;
        tracing::debug!(%from, %to, "Enemy state change");
        AiTick {
            transition: Some((from, to)),
            strike: None,
        }
    }
}

/// Uniform sample in `[low, high)`, or `low` for an empty range.
fn sample_range<R: Rng + ?Sized>(rng: &mut R, low: f64, high: f64) -> f64 {
    if high > low {
        rng.gen_range(low..high)
    } else {
        low
    }
}
