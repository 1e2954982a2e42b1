//! Error taxonomy for the duel core

use thiserror::Error;

use crate::physics::BodyId;

/// Errors raised by the duel core.
///
/// Recoverable variants (`InvalidAimInput`, `ProjectileOrphaned`,
/// `MatchAlreadyEnded`) are handled inside the state machine; the setup
/// variants abort match construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DuelError {
    /// Malformed drag gesture (NaN distance, non-finite angle, ...)
    #[error("invalid aim input: {reason}")]
    InvalidAimInput { reason: String },
    /// An action was requested while no turn is active
    #[error("no active turn")]
    NoActiveTurn,
    /// A projectile outlived its flight budget without a qualifying collision
    #[error("projectile orphaned after {age_ms:.0} ms")]
    ProjectileOrphaned { age_ms: f32 },
    /// Turn advancement requested after the match finished
    #[error("match already ended")]
    MatchAlreadyEnded,
    /// Terrain or body geometry the physics collaborator cannot represent
    #[error("invalid geometry: {reason}")]
    InvalidGeometry { reason: String },
    /// Tuning values that would stall or break the state machine
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
    /// The physics collaborator does not know this body
    #[error("unknown body {0:?}")]
    UnknownBody(BodyId),
}

impl DuelError {
    pub fn invalid_aim(reason: impl Into<String>) -> Self {
        Self::InvalidAimInput {
            reason: reason.into(),
        }
    }

    pub fn invalid_geometry(reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            reason: reason.into(),
        }
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether the state machine can carry on after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidAimInput { .. } | Self::ProjectileOrphaned { .. } | Self::MatchAlreadyEnded
        )
    }
}
