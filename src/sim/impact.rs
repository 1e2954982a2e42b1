//! Impact and splash damage
//!
//! A projectile touching anything but the world boundary explodes; touching
//! the boundary it fizzles with a zero-size explosion. Damage falls off
//! linearly with distance from the impact point and nobody is immune,
//! including the shooter.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::{CharacterId, Explosion, Roster};
use crate::physics::{BodyId, PhysicsWorld};
use crate::settings::DuelSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactKind {
    /// Hit terrain or a character
    Lethal,
    /// Hit the world boundary, or was given up on
    Fizzle,
}

impl ImpactKind {
    /// Classify by the other participant of the collision
    pub fn from_contact(other: BodyId) -> Self {
        if other.is_boundary() {
            ImpactKind::Fizzle
        } else {
            ImpactKind::Lethal
        }
    }

    /// (max radius, damage factor)
    pub fn splash(self, settings: &DuelSettings) -> (f32, f32) {
        match self {
            ImpactKind::Lethal => (settings.explosion_radius, settings.damage_factor),
            ImpactKind::Fizzle => (0.0, 0.0),
        }
    }
}

/// Damage dealt to one character
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageEntry {
    pub character: CharacterId,
    pub distance: f32,
    pub amount: f32,
    pub health_after: i32,
}

/// Outcome of one impact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactReport {
    pub position: Vec2,
    pub kind: ImpactKind,
    pub explosion: Explosion,
    pub damage: Vec<DamageEntry>,
    pub deaths: Vec<CharacterId>,
}

/// Linear falloff: `(radius - distance) * factor` inside the radius, else 0
#[inline]
pub fn splash_damage(distance: f32, radius: f32, factor: f32) -> f32 {
    if distance < radius {
        (radius - distance) * factor
    } else {
        0.0
    }
}

/// Apply splash damage to every alive character and retire the dead
///
/// Deaths are applied in the same pass, so a character killed here is
/// already out of the alive list when the caller decides whether the match
/// is over.
pub fn apply_splash<W: PhysicsWorld + ?Sized>(
    world: &W,
    roster: &mut Roster,
    position: Vec2,
    kind: ImpactKind,
    settings: &DuelSettings,
) -> ImpactReport {
    let (max_radius, factor) = kind.splash(settings);
    let explosion = Explosion::new(position, max_radius);

    let mut damage = Vec::new();
    let mut deaths = Vec::new();

    let targets: Vec<CharacterId> = roster.alive().collect();
    for id in targets {
        let Some(character) = roster.get_mut(id) else {
            continue;
        };
        let Some(at) = world.position(character.body) else {
            continue;
        };
        let distance = position.distance(at);
        let amount = splash_damage(distance, max_radius, factor);
        if amount <= 0.0 {
            continue;
        }

        character.take_damage(amount);
        log::info!(
            "{} takes {:.1} damage at distance {:.1}, health now {}",
            character.name,
            amount,
            distance,
            character.health
        );
        damage.push(DamageEntry {
            character: id,
            distance,
            amount,
            health_after: character.health,
        });

        if character.is_dead() {
            log::info!("{} died", character.name);
            if roster.kill(id) {
                deaths.push(id);
            }
        }
    }

    ImpactReport {
        position,
        kind,
        explosion,
        damage,
        deaths,
    }
}
