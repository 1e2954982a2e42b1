//! Quiescence tracking
//!
//! A turn only moves on once everything that can move has stopped. Bodies are
//! "asleep" below a speed threshold, and sleeping is suppressed for a grace
//! period after every impulse so a freshly launched body is not judged at
//! rest before it has picked up speed.

use crate::physics::{BodyId, PhysicsWorld};
use crate::settings::DuelSettings;

/// The active-object set plus the can-sleep grace flag
#[derive(Debug, Clone)]
pub struct ActivityTracker {
    active: Vec<BodyId>,
    can_sleep: bool,
    grace_remaining_ms: f32,
    grace_ms: f32,
    threshold: f32,
}

impl ActivityTracker {
    pub fn new(grace_ms: f32, threshold: f32) -> Self {
        Self {
            active: Vec::new(),
            can_sleep: true,
            grace_remaining_ms: 0.0,
            grace_ms,
            threshold,
        }
    }

    pub fn from_settings(settings: &DuelSettings) -> Self {
        Self::new(settings.settle_grace_ms, settings.sleep_velocity_threshold)
    }

    /// Start monitoring a body (no duplicates)
    pub fn add(&mut self, body: BodyId) {
        if !self.active.contains(&body) {
            self.active.push(body);
        }
    }

    pub fn remove(&mut self, body: BodyId) {
        self.active.retain(|b| *b != body);
    }

    pub fn active(&self) -> &[BodyId] {
        &self.active
    }

    pub fn can_sleep(&self) -> bool {
        self.can_sleep
    }

    /// Forbid sleeping and restart the grace timer
    pub fn suppress(&mut self) {
        self.can_sleep = false;
        self.grace_remaining_ms = self.grace_ms;
    }

    /// Count the grace timer down
    pub fn advance(&mut self, dt_ms: f32) {
        if self.can_sleep {
            return;
        }
        self.grace_remaining_ms -= dt_ms;
        if self.grace_remaining_ms <= 0.0 {
            self.grace_remaining_ms = 0.0;
            self.can_sleep = true;
        }
    }

    /// Asleep predicate for one body; unknown bodies count as asleep
    pub fn is_asleep<W: PhysicsWorld + ?Sized>(&self, world: &W, body: BodyId) -> bool {
        world.speed(body).is_none_or(|speed| speed < self.threshold)
    }

    /// True once sleeping is allowed and every active body is asleep
    pub fn is_quiescent<W: PhysicsWorld + ?Sized>(&self, world: &W) -> bool {
        self.can_sleep && self.active.iter().all(|body| self.is_asleep(world, *body))
    }
}
