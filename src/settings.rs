//! Match tuning
//!
//! Every gameplay constant lives here so balance can be tweaked from a JSON
//! file without touching the state machine.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{MIN_ACTIONS_PER_TURN, STARTING_HEALTH};
use crate::error::DuelError;

/// Tuning for a single duel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuelSettings {
    // === Viewport ===
    /// Viewport width in world units
    pub viewport_width: f32,
    /// Viewport height in world units
    pub viewport_height: f32,

    // === Terrain ===
    /// Lowest ground elevation, as a fraction of viewport height
    pub terrain_floor_fraction: f32,
    /// Elevation range above the floor, as a fraction of viewport height
    pub terrain_amplitude_fraction: f32,

    // === Turns ===
    /// Health every character starts with
    pub starting_health: i32,
    /// Action budget per turn (jump, shot, impact resolution)
    pub actions_per_turn: u32,

    // === Ballistics ===
    /// Divisor turning jump power into force (coarse control, tiny bodies)
    pub jump_scale: f32,
    /// Divisor turning shot power into force (tuned separately from jumps)
    pub shot_scale: f32,
    /// Projectile spawn height above the shooter
    pub projectile_lift: f32,

    // === Quiescence ===
    /// Grace period after an impulse during which nothing may sleep (ms)
    pub settle_grace_ms: f32,
    /// Speed below which a body counts as asleep (units/ms)
    pub sleep_velocity_threshold: f32,
    /// Flight time after which a projectile is forcibly fizzled (ms)
    pub projectile_timeout_ms: f32,
    /// Distance beyond the viewport sides/bottom that still counts as in play
    pub orphan_margin: f32,

    // === Impact ===
    /// Splash radius of a lethal impact
    pub explosion_radius: f32,
    /// Damage per unit of distance inside the splash radius
    pub damage_factor: f32,

    // === Bodies ===
    pub character_radius: f32,
    pub character_mass: f32,
    pub character_friction: f32,
    pub character_restitution: f32,
    pub projectile_radius: f32,
    pub projectile_mass: f32,
    pub projectile_friction: f32,
    pub projectile_restitution: f32,
}

impl Default for DuelSettings {
    fn default() -> Self {
        Self {
            viewport_width: 1280.0,
            viewport_height: 720.0,

            terrain_floor_fraction: 0.15,
            terrain_amplitude_fraction: 0.23,

            starting_health: STARTING_HEALTH,
            actions_per_turn: MIN_ACTIONS_PER_TURN,

            jump_scale: 130_000_000.0,
            shot_scale: 8_000.0,
            projectile_lift: 60.0,

            settle_grace_ms: 500.0,
            sleep_velocity_threshold: 0.001,
            projectile_timeout_ms: 10_000.0,
            orphan_margin: 500.0,

            explosion_radius: 100.0,
            damage_factor: 0.5,

            character_radius: 5.0,
            character_mass: 0.000_01,
            character_friction: 0.8,
            character_restitution: 0.0,
            projectile_radius: 4.0,
            projectile_mass: 0.1,
            projectile_friction: 0.1,
            projectile_restitution: 0.5,
        }
    }
}

impl DuelSettings {
    /// Lowest terrain elevation in world units
    pub fn terrain_floor(&self) -> f32 {
        self.viewport_height * self.terrain_floor_fraction
    }

    /// Terrain elevation range in world units
    pub fn terrain_amplitude(&self) -> f32 {
        self.viewport_height * self.terrain_amplitude_fraction
    }

    /// Reject values that would break the state machine or the physics setup
    pub fn validate(&self) -> Result<(), DuelError> {
        if let Some((name, _)) = self.float_fields().into_iter().find(|(_, v)| !v.is_finite()) {
            return Err(DuelError::invalid_config(format!("{name} must be finite")));
        }
        if !(self.viewport_width > 0.0 && self.viewport_height > 0.0) {
            return Err(DuelError::invalid_config("viewport must have a positive size"));
        }
        if self.actions_per_turn < MIN_ACTIONS_PER_TURN {
            return Err(DuelError::invalid_config(format!(
                "actions_per_turn must be at least {MIN_ACTIONS_PER_TURN} (jump, shot, impact), got {}",
                self.actions_per_turn
            )));
        }
        if !(self.jump_scale > 0.0 && self.shot_scale > 0.0) {
            return Err(DuelError::invalid_config("ballistic scales must be positive"));
        }
        if self.starting_health <= 0 {
            return Err(DuelError::invalid_config("starting_health must be positive"));
        }
        if self.explosion_radius < 0.0 || self.damage_factor < 0.0 {
            return Err(DuelError::invalid_config(
                "explosion radius and damage factor must not be negative",
            ));
        }
        if self.settle_grace_ms < 0.0 || self.projectile_timeout_ms <= 0.0 {
            return Err(DuelError::invalid_config("timers must not be negative"));
        }
        // Nothing could ever fall asleep, so no turn would open
        if self.sleep_velocity_threshold <= 0.0 {
            return Err(DuelError::invalid_config("sleep_velocity_threshold must be positive"));
        }
        if self.orphan_margin < 0.0 {
            return Err(DuelError::invalid_config("orphan_margin must not be negative"));
        }
        if self.character_mass <= 0.0 || self.projectile_mass <= 0.0 {
            return Err(DuelError::invalid_config("body masses must be positive"));
        }
        Ok(())
    }

    fn float_fields(&self) -> [(&'static str, f32); 21] {
        [
            ("viewport_width", self.viewport_width),
            ("viewport_height", self.viewport_height),
            ("terrain_floor_fraction", self.terrain_floor_fraction),
            ("terrain_amplitude_fraction", self.terrain_amplitude_fraction),
            ("jump_scale", self.jump_scale),
            ("shot_scale", self.shot_scale),
            ("projectile_lift", self.projectile_lift),
            ("settle_grace_ms", self.settle_grace_ms),
            ("sleep_velocity_threshold", self.sleep_velocity_threshold),
            ("projectile_timeout_ms", self.projectile_timeout_ms),
            ("orphan_margin", self.orphan_margin),
            ("explosion_radius", self.explosion_radius),
            ("damage_factor", self.damage_factor),
            ("character_radius", self.character_radius),
            ("character_mass", self.character_mass),
            ("character_friction", self.character_friction),
            ("character_restitution", self.character_restitution),
            ("projectile_radius", self.projectile_radius),
            ("projectile_mass", self.projectile_mass),
            ("projectile_friction", self.projectile_friction),
            ("projectile_restitution", self.projectile_restitution),
        ]
    }

    /// Parse settings from JSON; missing fields fall back to defaults
    pub fn from_json(json: &str) -> Result<Self, DuelError> {
        let settings: Self =
            serde_json::from_str(json).map_err(|e| DuelError::invalid_config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, DuelError> {
        serde_json::to_string_pretty(self).map_err(|e| DuelError::invalid_config(e.to_string()))
    }

    /// Load settings from a JSON file, falling back to defaults when the file
    /// is missing or invalid
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    log::warn!("Invalid settings at {:?}: {}, using defaults", path, e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("No settings at {:?}, using defaults", path);
                Self::default()
            }
        }
    }
}
