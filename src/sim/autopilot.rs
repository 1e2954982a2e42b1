//! Computer player for demo matches
//!
//! Produces the drag gestures a human would: a short random hop, then a 45°
//! lob at the nearest opponent with a little aim error so matches do not
//! repeat the same shot forever.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::aim::{AimPurpose, DragEvent};
use super::ballistics::{MAX_POWER, POWER_SCALE};
use super::duel::Duel;
use crate::degrees_from_direction;
use crate::physics::PhysicsWorld;

/// Autopilot tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutopilotParams {
    /// Gravity of the world being played (units/ms², +y down)
    pub gravity: f32,
    /// Step length the impulse is integrated over (ms)
    pub dt_ms: f32,
    /// Strongest hop
    pub max_hop_power: f32,
    /// Relative launch speed error, uniformly in ±jitter
    pub jitter: f32,
}

impl Default for AutopilotParams {
    fn default() -> Self {
        Self {
            gravity: 0.0004,
            dt_ms: crate::consts::SIM_DT_MS,
            max_hop_power: 15.0,
            jitter: 0.08,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Autopilot {
    rng: Pcg32,
    params: AutopilotParams,
}

impl Autopilot {
    pub fn new(seed: u64, params: AutopilotParams) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            params,
        }
    }

    /// Gesture for whatever the duel is waiting on, if anything
    pub fn plan<W: PhysicsWorld + ?Sized>(&mut self, duel: &Duel, world: &W) -> Option<Vec<DragEvent>> {
        let session = duel.input().session()?;
        let actor = duel.acting_body()?;
        let from = world.position(actor)?;

        let (angle, power) = match session.purpose {
            AimPurpose::Jump => self.hop(),
            AimPurpose::Shot => self.lob(duel, world, from)?,
        };

        let distance = power / POWER_SCALE * duel.settings().viewport_height;
        log::debug!("Autopilot {:?}: angle {:.1} power {:.1}", session.purpose, angle, power);
        Some(vec![
            DragEvent::Start { center: from },
            DragEvent::Move { distance, angle },
            DragEvent::End { distance, angle },
        ])
    }

    /// Mostly upward hop; dragging down launches up
    fn hop(&mut self) -> (f32, f32) {
        let angle = 90.0 + self.rng.random_range(-30.0..30.0);
        let power = self.rng.random_range(0.0..=self.params.max_hop_power);
        (angle, power)
    }

    /// 45° lob at the nearest opponent
    fn lob<W: PhysicsWorld + ?Sized>(&mut self, duel: &Duel, world: &W, from: Vec2) -> Option<(f32, f32)> {
        let actor = duel.turn()?.player;
        let target = duel
            .roster()
            .alive()
            .filter(|id| *id != actor)
            .filter_map(|id| duel.roster().get(id))
            .filter_map(|c| world.position(c.body))
            .min_by(|a, b| {
                a.distance(from)
                    .partial_cmp(&b.distance(from))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })?;

        let settings = duel.settings();
        let spawn = from - Vec2::new(0.0, settings.projectile_lift);
        let dx = target.x - spawn.x;
        let dy = target.y - spawn.y;

        // Launch at 45° above horizontal toward the target (screen y is down)
        let launch = Vec2::new(dx.signum() * std::f32::consts::FRAC_1_SQRT_2, -std::f32::consts::FRAC_1_SQRT_2);
        let angle = degrees_from_direction(-launch);

        // Range equation for a 45° launch with a height difference
        let denom = dy + dx.abs();
        let power = if denom > 0.0 {
            let speed = (self.params.gravity * dx * dx / denom).sqrt();
            let speed = speed * (1.0 + self.rng.random_range(-self.params.jitter..=self.params.jitter));
            // One-step force: speed = (power / k) / mass * dt
            speed * settings.shot_scale * settings.projectile_mass / self.params.dt_ms
        } else {
            MAX_POWER
        };

        Some((angle, power.clamp(0.0, MAX_POWER)))
    }
}
