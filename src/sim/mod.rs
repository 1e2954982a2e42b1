//! Duel simulation
//!
//! All gameplay logic lives here. Motion is delegated to a
//! [`PhysicsWorld`](crate::physics::PhysicsWorld); everything else is
//! deterministic for a given seed and input sequence:
//! - Fixed timestep only
//! - Seeded RNG only
//! - No rendering or platform dependencies

pub mod activity;
pub mod aim;
pub mod autopilot;
pub mod ballistics;
pub mod duel;
pub mod impact;
pub mod state;
pub mod terrain;

pub use activity::ActivityTracker;
pub use aim::{AimPurpose, AimSession, DragEvent, InputCapture, SessionId};
pub use autopilot::{Autopilot, AutopilotParams};
pub use ballistics::{impulse, power_from_drag};
pub use duel::{BodyRole, CharacterView, Duel, FrameView};
pub use impact::{ImpactKind, ImpactReport, splash_damage};
pub use state::{
    ActionState, AimPreview, AimVector, Character, CharacterId, Explosion, MatchPhase, Projectile, Roster, Turn,
};
pub use terrain::{TerrainBody, TerrainParams, TerrainSegment, generate_terrain};
