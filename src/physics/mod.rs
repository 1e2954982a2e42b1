//! Physics collaborator contract
//!
//! The duel core never integrates motion itself. It creates bodies, applies
//! impulses, toggles static/dynamic treatment and reads positions and speeds
//! through [`PhysicsWorld`]; collisions come back as [`CollisionPair`]s from
//! each step. [`SimpleWorld`] is a small reference implementation used by the
//! demo binary and the tests.

pub mod collision;
pub mod simple;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::DuelError;
use crate::sim::terrain::TerrainBody;

pub use collision::{CollisionResult, circle_segment_collision, resolve_contact};
pub use simple::{SimpleWorld, WorldParams};

/// Opaque physics body identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u32);

impl BodyId {
    /// Reserved identifier for the world boundary (edge collision)
    pub const BOUNDARY: BodyId = BodyId(0);

    #[inline]
    pub fn is_boundary(self) -> bool {
        self == Self::BOUNDARY
    }
}

/// Whether a body is integrated or held in place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Treatment {
    Dynamic,
    Static,
}

/// Description of a circular body to create
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub position: Vec2,
    pub radius: f32,
    pub mass: f32,
    pub restitution: f32,
    pub friction: f32,
    pub treatment: Treatment,
}

impl BodyDesc {
    pub fn circle(position: Vec2, radius: f32) -> Self {
        Self {
            position,
            radius,
            mass: 1.0,
            restitution: 1.0,
            friction: 0.8,
            treatment: Treatment::Dynamic,
        }
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_treatment(mut self, treatment: Treatment) -> Self {
        self.treatment = treatment;
        self
    }

    /// Geometry check shared by world implementations
    pub fn validate(&self) -> Result<(), DuelError> {
        if !self.position.is_finite() {
            return Err(DuelError::invalid_geometry("body position is not finite"));
        }
        if !(self.radius > 0.0 && self.radius.is_finite()) {
            return Err(DuelError::invalid_geometry(format!(
                "circle radius must be positive, got {}",
                self.radius
            )));
        }
        if !(self.mass > 0.0 && self.mass.is_finite()) {
            return Err(DuelError::invalid_geometry(format!(
                "body mass must be positive, got {}",
                self.mass
            )));
        }
        Ok(())
    }
}

/// Two bodies that touched during a step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionPair {
    pub a: BodyId,
    pub b: BodyId,
    /// Contact point in world space
    pub point: Vec2,
}

impl CollisionPair {
    pub fn new(a: BodyId, b: BodyId, point: Vec2) -> Self {
        Self { a, b, point }
    }

    pub fn involves(&self, id: BodyId) -> bool {
        self.a == id || self.b == id
    }

    /// The participant that is not `id`
    pub fn other(&self, id: BodyId) -> Option<BodyId> {
        if self.a == id {
            Some(self.b)
        } else if self.b == id {
            Some(self.a)
        } else {
            None
        }
    }
}

/// What the duel core needs from a physics engine
pub trait PhysicsWorld {
    /// Create a circular body
    fn add_body(&mut self, desc: BodyDesc) -> Result<BodyId, DuelError>;

    /// Create the static compound terrain body
    fn add_terrain(&mut self, terrain: &TerrainBody) -> Result<BodyId, DuelError>;

    fn remove_body(&mut self, id: BodyId);

    /// Apply a one-shot impulse to a body (ignored for unknown bodies)
    fn apply_impulse(&mut self, id: BodyId, impulse: Vec2);

    fn set_treatment(&mut self, id: BodyId, treatment: Treatment);

    /// Wake every sleeping body
    fn wake_all(&mut self);

    fn position(&self, id: BodyId) -> Option<Vec2>;

    /// Current speed, used by the asleep predicate
    fn speed(&self, id: BodyId) -> Option<f32>;

    /// Advance the simulation and report every pair that touched
    fn step(&mut self, dt_ms: f32) -> Vec<CollisionPair>;
}
