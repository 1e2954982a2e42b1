//! Aim vector to impulse conversion for jumps and shots
//!
//! Both actions use the same impulse formula with independent divisors:
//! characters are tiny and need very coarse control, projectiles are heavier
//! and launched hard.

use glam::Vec2;

use super::state::{AimVector, Projectile};
use crate::error::DuelError;
use crate::physics::{BodyDesc, BodyId, PhysicsWorld, Treatment};
use crate::settings::DuelSettings;

/// Drags longer than this fraction of the viewport height give full power
pub const MAX_DRAG_FRACTION: f32 = 0.5;
/// Maps the clamped drag fraction onto [0, 100]
pub const POWER_SCALE: f32 = 200.0;
pub const MAX_POWER: f32 = MAX_DRAG_FRACTION * POWER_SCALE;

/// Normalise a drag length into power
pub fn power_from_drag(distance: f32, viewport_height: f32) -> Result<f32, DuelError> {
    if !(viewport_height > 0.0 && viewport_height.is_finite()) {
        return Err(DuelError::invalid_aim(format!(
            "viewport height must be positive, got {viewport_height}"
        )));
    }
    if !distance.is_finite() || distance < 0.0 {
        return Err(DuelError::invalid_aim(format!(
            "drag distance must be finite and non-negative, got {distance}"
        )));
    }
    Ok((distance / viewport_height).min(MAX_DRAG_FRACTION) * POWER_SCALE)
}

/// Reject aims that would put NaN into the physics world
pub fn validate_aim(aim: &AimVector) -> Result<(), DuelError> {
    if !aim.angle_deg.is_finite() {
        return Err(DuelError::invalid_aim(format!("angle {} is not finite", aim.angle_deg)));
    }
    if !(0.0..=MAX_POWER).contains(&aim.power) {
        return Err(DuelError::invalid_aim(format!(
            "power {} outside [0, {MAX_POWER}]",
            aim.power
        )));
    }
    Ok(())
}

/// Launch impulse: the body flies opposite to the drag
///
/// `(-power * cos(angle) / k, -power * sin(angle) / k)`
#[inline]
pub fn impulse(aim: &AimVector, k: f32) -> Vec2 {
    -aim.direction() * (aim.power / k)
}

/// Apply a jump to the actor, freezing every other character
pub fn launch_jump<W: PhysicsWorld + ?Sized>(
    world: &mut W,
    actor: BodyId,
    characters: &[BodyId],
    aim: &AimVector,
    k_jump: f32,
) -> Result<Vec2, DuelError> {
    validate_aim(aim)?;
    if world.position(actor).is_none() {
        return Err(DuelError::UnknownBody(actor));
    }

    for body in characters.iter().filter(|b| **b != actor) {
        world.set_treatment(*body, Treatment::Static);
    }
    world.set_treatment(actor, Treatment::Dynamic);
    world.wake_all();

    let force = impulse(aim, k_jump);
    world.apply_impulse(actor, force);
    log::debug!(
        "Jump {:?}: angle {:.1} power {:.1} -> {:?}",
        actor,
        aim.angle_deg,
        aim.power,
        force
    );
    Ok(force)
}

/// Where a shot spawns and how hard it is pushed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotLaunch {
    pub spawn: Vec2,
    pub impulse: Vec2,
}

/// Spawn point above the shooter, nudged back along the launch direction
pub fn plan_shot(shooter: Vec2, aim: &AimVector, k_shot: f32, lift: f32) -> ShotLaunch {
    let step = aim.direction() * (aim.power / k_shot);
    ShotLaunch {
        spawn: shooter + Vec2::new(-step.x, -lift - step.y),
        impulse: impulse(aim, k_shot),
    }
}

/// Spawn the projectile and launch it, freezing every character
pub fn fire_projectile<W: PhysicsWorld + ?Sized>(
    world: &mut W,
    shooter: BodyId,
    characters: &[BodyId],
    aim: &AimVector,
    settings: &DuelSettings,
) -> Result<Projectile, DuelError> {
    validate_aim(aim)?;
    let origin = world.position(shooter).ok_or(DuelError::UnknownBody(shooter))?;

    for body in characters {
        world.set_treatment(*body, Treatment::Static);
    }

    let launch = plan_shot(origin, aim, settings.shot_scale, settings.projectile_lift);
    let body = world.add_body(
        BodyDesc::circle(launch.spawn, settings.projectile_radius)
            .with_mass(settings.projectile_mass)
            .with_restitution(settings.projectile_restitution)
            .with_friction(settings.projectile_friction),
    )?;
    world.wake_all();
    world.apply_impulse(body, launch.impulse);

    log::debug!(
        "Fire from {:?}: angle {:.1} power {:.1}, projectile {:?} at {:?}",
        shooter,
        aim.angle_deg,
        aim.power,
        body,
        launch.spawn
    );
    Ok(Projectile::new(body, launch.spawn))
}
