//! Duel state and core simulation types
//!
//! Domain data lives here and references physics bodies by [`BodyId`]; no
//! game data is ever attached to the physics side.

use std::collections::VecDeque;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::physics::BodyId;

/// Stable character identifier (index into the roster's storage)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CharacterId(pub u32);

/// A player-controlled character
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    /// Physics body; position is owned by the physics collaborator
    pub body: BodyId,
    /// Not floored at zero, so overkill shows as negative health
    pub health: i32,
}

impl Character {
    pub fn new(id: CharacterId, name: impl Into<String>, body: BodyId, health: i32) -> Self {
        Self {
            id,
            name: name.into(),
            body,
            health,
        }
    }

    /// Subtract damage, rounding the result to the nearest integer with
    /// halves going up
    ///
    /// Non-positive and NaN amounts are ignored. Returns the health actually
    /// lost.
    pub fn take_damage(&mut self, amount: f32) -> i32 {
        if !(amount > 0.0) {
            return 0;
        }
        let rounded = (self.health as f32 - amount + 0.5).floor();
        let next = if rounded.is_finite() {
            (rounded as i32).min(self.health)
        } else {
            i32::MIN
        };
        let lost = self.health.saturating_sub(next);
        self.health = next;
        lost
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        self.health <= 0
    }
}

/// Ordered alive list (front acts) plus the dead list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    characters: Vec<Character>,
    alive: VecDeque<CharacterId>,
    dead: Vec<CharacterId>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a character at the back of the alive list
    pub fn push(&mut self, name: impl Into<String>, body: BodyId, health: i32) -> CharacterId {
        let id = CharacterId(self.characters.len() as u32);
        self.characters.push(Character::new(id, name, body, health));
        self.alive.push_back(id);
        id
    }

    pub fn get(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        self.characters.get_mut(id.0 as usize)
    }

    pub fn by_body(&self, body: BodyId) -> Option<&Character> {
        self.characters.iter().find(|c| c.body == body)
    }

    /// Every character ever created, in creation order
    pub fn all(&self) -> &[Character] {
        &self.characters
    }

    pub fn alive(&self) -> impl Iterator<Item = CharacterId> + '_ {
        self.alive.iter().copied()
    }

    pub fn dead(&self) -> &[CharacterId] {
        &self.dead
    }

    pub fn alive_count(&self) -> usize {
        self.alive.len()
    }

    pub fn is_alive(&self, id: CharacterId) -> bool {
        self.alive.contains(&id)
    }

    /// The acting character
    pub fn front(&self) -> Option<CharacterId> {
        self.alive.front().copied()
    }

    /// Move the front character to the back
    pub fn rotate(&mut self) {
        self.alive.rotate_left(1.min(self.alive.len()));
    }

    /// Move a character from alive to dead; false if it was not alive
    pub fn kill(&mut self, id: CharacterId) -> bool {
        match self.alive.iter().position(|c| *c == id) {
            Some(index) => {
                self.alive.remove(index);
                self.dead.push(id);
                true
            }
            None => false,
        }
    }
}

/// Per-turn action phase, strictly ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionState {
    AimingJump,
    Jumping,
    AimingShot,
    Firing,
}

impl ActionState {
    /// Instruction shown to the acting player
    pub fn prompt(self) -> Option<&'static str> {
        match self {
            ActionState::AimingJump => Some("Aim a jump by dragging in the opposite direction"),
            ActionState::AimingShot => Some("Aim a shot by dragging in the opposite direction"),
            ActionState::Jumping | ActionState::Firing => None,
        }
    }
}

/// The single active turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub player: CharacterId,
    pub state: ActionState,
    pub actions_remaining: u32,
}

impl Turn {
    pub fn new(player: CharacterId, actions: u32) -> Self {
        Self {
            player,
            state: ActionState::AimingJump,
            actions_remaining: actions,
        }
    }

    /// Spend one action (never below zero)
    pub fn spend(&mut self) {
        self.actions_remaining = self.actions_remaining.saturating_sub(1);
    }
}

/// Top-level match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchPhase {
    /// World settling before the opening turn
    Settling,
    InTurn,
    /// Fewer than two characters alive
    Ended,
}

/// Angle (degrees) and power [0, 100] from a completed drag
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AimVector {
    pub angle_deg: f32,
    pub power: f32,
}

impl AimVector {
    pub fn new(angle_deg: f32, power: f32) -> Self {
        Self { angle_deg, power }
    }

    /// Unit direction of the drag
    #[inline]
    pub fn direction(&self) -> Vec2 {
        crate::direction_from_degrees(self.angle_deg)
    }
}

/// Aim arrow state while a drag is in progress
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AimPreview {
    pub start: Vec2,
    pub angle_deg: f32,
    pub power: f32,
}

/// The live projectile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub body: BodyId,
    pub age_ms: f32,
    pub last_position: Vec2,
}

impl Projectile {
    pub fn new(body: BodyId, position: Vec2) -> Self {
        Self {
            body,
            age_ms: 0.0,
            last_position: position,
        }
    }
}

/// Growth per animation frame, as a fraction of the current radius
pub const EXPLOSION_GROWTH: f32 = 0.3;

/// Expanding explosion ring (visual only; damage is applied at creation)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Explosion {
    pub position: Vec2,
    pub radius: f32,
    pub max_radius: f32,
}

impl Explosion {
    pub fn new(position: Vec2, max_radius: f32) -> Self {
        Self {
            position,
            radius: 1.0f32.min(max_radius),
            max_radius,
        }
    }

    pub fn grow(&mut self) {
        self.radius += self.radius * EXPLOSION_GROWTH;
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.radius >= self.max_radius
    }
}
