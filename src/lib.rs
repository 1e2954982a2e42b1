//! Maggots - a turn-based artillery duel
//!
//! Core modules:
//! - `sim`: Turn state machine, ballistics, splash damage, quiescence, terrain
//! - `physics`: Contract for the physics collaborator plus a small reference world
//! - `settings`: Data-driven tuning (serde)
//! - `error`: Error taxonomy shared by the core

pub mod error;
pub mod physics;
pub mod settings;
pub mod sim;

pub use error::DuelError;
pub use settings::DuelSettings;

use glam::Vec2;

/// Simulation constants
pub mod consts {
    /// Fixed simulation timestep in milliseconds (120 Hz)
    pub const SIM_DT_MS: f32 = 1000.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Distance the terrain skirt and the world ceiling extend past the screen
    pub const OFFSCREEN_EXTENT: f32 = 10_000.0;

    /// Starting health for every character
    pub const STARTING_HEALTH: i32 = 100;
    /// Actions per turn: jump, shot, impact resolution
    pub const MIN_ACTIONS_PER_TURN: u32 = 3;
}

/// Unit vector for an angle given in degrees (screen convention, y down)
#[inline]
pub fn direction_from_degrees(angle_deg: f32) -> Vec2 {
    let radians = angle_deg.to_radians();
    Vec2::new(radians.cos(), radians.sin())
}

/// Angle in degrees of a vector (screen convention, y down)
#[inline]
pub fn degrees_from_direction(dir: Vec2) -> f32 {
    dir.y.atan2(dir.x).to_degrees()
}
