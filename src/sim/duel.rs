//! The duel session and its turn state machine
//!
//! [`Duel`] owns every piece of match state. The host drives it with two
//! calls: [`Duel::handle_drag`] for input between steps and [`Duel::step`]
//! once per fixed timestep. Each turn walks
//! `AimingJump -> Jumping -> AimingShot -> Firing` and ends when the
//! projectile's impact is resolved.

use std::collections::HashMap;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::activity::ActivityTracker;
use super::aim::{AimPurpose, CompletedAim, DragEvent, InputCapture};
use super::ballistics::{fire_projectile, launch_jump, validate_aim};
use super::impact::{ImpactKind, ImpactReport, apply_splash};
use super::state::{
    ActionState, AimPreview, AimVector, CharacterId, Explosion, MatchPhase, Projectile, Roster, Turn,
};
use super::terrain::{TerrainBody, TerrainParams, generate_terrain};
use crate::consts::OFFSCREEN_EXTENT;
use crate::error::DuelError;
use crate::physics::{BodyDesc, BodyId, CollisionPair, PhysicsWorld};
use crate::settings::DuelSettings;

/// Starting positions as fractions of the viewport
const SPAWN_FRACTIONS: [(&str, f32, f32); 2] = [("player1", 0.1, 0.3), ("player2", 0.9, 0.3)];

/// What a physics body means to the duel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyRole {
    Character(CharacterId),
    Projectile,
    Terrain,
}

/// Per-character render data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterView {
    pub name: String,
    pub position: Option<Vec2>,
    pub health: i32,
    pub alive: bool,
    pub acting: bool,
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameView {
    pub phase: MatchPhase,
    pub characters: Vec<CharacterView>,
    pub projectile: Option<Vec2>,
    pub aim: Option<AimPreview>,
    pub explosions: Vec<Explosion>,
    pub prompt: Option<String>,
    pub actions_remaining: Option<u32>,
    pub winner: Option<String>,
    pub banner: Option<String>,
}

/// A two-player artillery duel
#[derive(Debug, Clone)]
pub struct Duel {
    settings: DuelSettings,
    seed: u64,
    terrain: TerrainBody,
    roster: Roster,
    phase: MatchPhase,
    turn: Option<Turn>,
    turn_number: u32,
    tracker: ActivityTracker,
    projectile: Option<Projectile>,
    explosions: Vec<Explosion>,
    input: InputCapture,
    roles: HashMap<BodyId, BodyRole>,
    elapsed_ms: f32,
}

impl Duel {
    /// Build the world: terrain, two characters, and the settling phase
    pub fn new<W: PhysicsWorld + ?Sized>(settings: DuelSettings, world: &mut W, seed: u64) -> Result<Self, DuelError> {
        settings.validate()?;

        let mut rng = Pcg32::seed_from_u64(seed);
        let terrain = generate_terrain(&mut rng, &TerrainParams::from_settings(&settings))?;
        let terrain_body = world.add_terrain(&terrain)?;

        let mut roles = HashMap::new();
        roles.insert(terrain_body, BodyRole::Terrain);

        let mut roster = Roster::new();
        let mut tracker = ActivityTracker::from_settings(&settings);
        for (name, fx, fy) in SPAWN_FRACTIONS {
            let position = Vec2::new(settings.viewport_width * fx, settings.viewport_height * fy);
            let body = world.add_body(
                BodyDesc::circle(position, settings.character_radius)
                    .with_mass(settings.character_mass)
                    .with_friction(settings.character_friction)
                    .with_restitution(settings.character_restitution),
            )?;
            let id = roster.push(name, body, settings.starting_health);
            roles.insert(body, BodyRole::Character(id));
            tracker.add(body);
        }
        // Characters spawn in mid-air; give them time to start falling
        tracker.suppress();

        log::info!(
            "Duel created (seed {}): {}x{} viewport, {} characters",
            seed,
            settings.viewport_width,
            settings.viewport_height,
            roster.alive_count()
        );

        Ok(Self {
            settings,
            seed,
            terrain,
            roster,
            phase: MatchPhase::Settling,
            turn: None,
            turn_number: 0,
            tracker,
            projectile: None,
            explosions: Vec::new(),
            input: InputCapture::new(),
            roles,
            elapsed_ms: 0.0,
        })
    }

    pub fn settings(&self) -> &DuelSettings {
        &self.settings
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn terrain(&self) -> &TerrainBody {
        &self.terrain
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn turn(&self) -> Option<&Turn> {
        self.turn.as_ref()
    }

    pub fn turn_number(&self) -> u32 {
        self.turn_number
    }

    pub fn projectile(&self) -> Option<&Projectile> {
        self.projectile.as_ref()
    }

    pub fn explosions(&self) -> &[Explosion] {
        &self.explosions
    }

    pub fn input(&self) -> &InputCapture {
        &self.input
    }

    pub fn elapsed_ms(&self) -> f32 {
        self.elapsed_ms
    }

    pub fn role_of(&self, body: BodyId) -> Option<BodyRole> {
        self.roles.get(&body).copied()
    }

    /// The acting character's body
    pub fn acting_body(&self) -> Option<BodyId> {
        let turn = self.turn.as_ref()?;
        self.roster.get(turn.player).map(|c| c.body)
    }

    /// The last character standing, once the match is over
    pub fn winner(&self) -> Option<CharacterId> {
        if self.phase == MatchPhase::Ended && self.roster.alive_count() == 1 {
            self.roster.front()
        } else {
            None
        }
    }

    /// Feed one drag event from the input collaborator
    ///
    /// A completed drag closes its session before the jump or shot runs.
    pub fn handle_drag<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W, event: DragEvent) -> Result<(), DuelError> {
        let completed = match self.input.handle(event, self.settings.viewport_height) {
            Ok(Some(completed)) => completed,
            Ok(None) => return Ok(()),
            Err(e) => {
                log::debug!("Ignoring drag: {}", e);
                return Err(e);
            }
        };
        self.commit(world, completed)
    }

    fn commit<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W, completed: CompletedAim) -> Result<(), DuelError> {
        let result = match completed.session.purpose {
            AimPurpose::Jump => self.jump(world, completed.aim),
            AimPurpose::Shot => self.fire(world, completed.aim),
        };
        if let Err(e) = &result {
            if e.is_recoverable() {
                // Give the player another go at the same aim
                self.input.open(completed.session.purpose);
            }
        }
        result
    }

    fn active_turn(&self) -> Result<Turn, DuelError> {
        self.turn.ok_or_else(|| {
            log::error!("Action requested with no active turn ({:?})", self.phase);
            DuelError::NoActiveTurn
        })
    }

    fn character_bodies(&self) -> Vec<BodyId> {
        self.roster.all().iter().map(|c| c.body).collect()
    }

    /// Launch the acting character (`AimingJump -> Jumping`)
    pub fn jump<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W, aim: AimVector) -> Result<(), DuelError> {
        let turn = self.active_turn()?;
        if turn.state != ActionState::AimingJump {
            return Err(DuelError::invalid_aim(format!("cannot jump while {:?}", turn.state)));
        }
        validate_aim(&aim)?;
        let actor = self.acting_body().ok_or(DuelError::NoActiveTurn)?;

        self.input.close();
        launch_jump(world, actor, &self.character_bodies(), &aim, self.settings.jump_scale)?;
        self.tracker.suppress();

        if let Some(turn) = self.turn.as_mut() {
            turn.state = ActionState::Jumping;
            turn.spend();
            log::debug!("Turn {}: jumping, {} actions left", self.turn_number, turn.actions_remaining);
        }
        Ok(())
    }

    /// Fire the projectile (`AimingShot -> Firing`)
    pub fn fire<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W, aim: AimVector) -> Result<(), DuelError> {
        let turn = self.active_turn()?;
        if turn.state != ActionState::AimingShot {
            return Err(DuelError::invalid_aim(format!("cannot fire while {:?}", turn.state)));
        }
        validate_aim(&aim)?;
        let shooter = self.acting_body().ok_or(DuelError::NoActiveTurn)?;

        self.input.close();
        let projectile = fire_projectile(world, shooter, &self.character_bodies(), &aim, &self.settings)?;
        self.roles.insert(projectile.body, BodyRole::Projectile);
        self.tracker.add(projectile.body);
        self.tracker.suppress();
        self.projectile = Some(projectile);

        if let Some(turn) = self.turn.as_mut() {
            turn.state = ActionState::Firing;
            turn.spend();
            log::debug!("Turn {}: firing, {} actions left", self.turn_number, turn.actions_remaining);
        }
        Ok(())
    }

    /// Advance one fixed timestep
    ///
    /// Steps the physics collaborator, dispatches collisions, applies the
    /// orphan fallback and moves the state machine on quiescence. Returns
    /// the impact resolved during this step, if any.
    pub fn step<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W, dt_ms: f32) -> Option<ImpactReport> {
        let pairs = world.step(dt_ms);
        self.tracker.advance(dt_ms);
        self.elapsed_ms += dt_ms;

        if self.phase == MatchPhase::Ended {
            return None;
        }

        let mut report = self.dispatch(world, &pairs);

        if report.is_none() {
            report = self.check_orphan(world, dt_ms);
        }

        if self.tracker.is_quiescent(world) {
            self.on_quiescent();
        }

        report
    }

    /// Route collision pairs by body role; only the live projectile reacts
    fn dispatch<W: PhysicsWorld + ?Sized>(
        &mut self,
        world: &mut W,
        pairs: &[CollisionPair],
    ) -> Option<ImpactReport> {
        for pair in pairs {
            let (projectile, other) = match (self.role_of(pair.a), self.role_of(pair.b)) {
                (Some(BodyRole::Projectile), _) => (pair.a, pair.b),
                (_, Some(BodyRole::Projectile)) => (pair.b, pair.a),
                _ => continue,
            };
            if self.projectile.map(|p| p.body) != Some(projectile) {
                continue;
            }

            let kind = ImpactKind::from_contact(other);
            let position = world.position(projectile).unwrap_or(pair.point);
            log::debug!("Projectile hit {:?} ({:?}) at {:?}", other, self.role_of(other), position);
            return Some(self.resolve_impact(world, position, kind));
        }
        None
    }

    /// Age the projectile and give up on it once it is lost
    fn check_orphan<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W, dt_ms: f32) -> Option<ImpactReport> {
        let projectile = self.projectile.as_mut()?;
        projectile.age_ms += dt_ms;
        if let Some(position) = world.position(projectile.body) {
            projectile.last_position = position;
        }
        let projectile = *projectile;

        let timed_out = projectile.age_ms > self.settings.projectile_timeout_ms;
        if !timed_out && self.in_play(projectile.last_position) {
            return None;
        }

        let err = DuelError::ProjectileOrphaned {
            age_ms: projectile.age_ms,
        };
        log::warn!("{} at {:?}, fizzling", err, projectile.last_position);
        Some(self.resolve_impact(world, projectile.last_position, ImpactKind::Fizzle))
    }

    /// Viewport expanded by the orphan margin; the ceiling sits with the world boundary
    fn in_play(&self, position: Vec2) -> bool {
        let margin = self.settings.orphan_margin;
        position.is_finite()
            && position.x >= -margin
            && position.x <= self.settings.viewport_width + margin
            && position.y <= self.settings.viewport_height + margin
            && position.y >= -OFFSCREEN_EXTENT - margin
    }

    /// Splash damage, projectile removal, budget and turn advance
    pub fn resolve_impact<W: PhysicsWorld + ?Sized>(
        &mut self,
        world: &mut W,
        position: Vec2,
        kind: ImpactKind,
    ) -> ImpactReport {
        let report = apply_splash(world, &mut self.roster, position, kind, &self.settings);
        self.explosions.push(report.explosion);

        if let Some(projectile) = self.projectile.take() {
            world.remove_body(projectile.body);
            self.tracker.remove(projectile.body);
            self.roles.remove(&projectile.body);
        }
        if let Some(turn) = self.turn.as_mut() {
            turn.spend();
        }

        log::info!(
            "Impact ({:?}) at ({:.0}, {:.0}): {} hit, {} killed",
            report.kind,
            position.x,
            position.y,
            report.damage.len(),
            report.deaths.len()
        );

        match self.advance_turn() {
            Ok(()) | Err(DuelError::MatchAlreadyEnded) => {}
            Err(e) => log::error!("Turn advance failed: {}", e),
        }
        report
    }

    fn on_quiescent(&mut self) {
        match (self.phase, self.turn) {
            (MatchPhase::Settling, _) => {
                // The last character in the roster opens the match
                self.roster.rotate();
                self.open_turn();
            }
            (MatchPhase::InTurn, Some(turn)) if turn.state == ActionState::Jumping && turn.actions_remaining > 0 => {
                if let Some(turn) = self.turn.as_mut() {
                    turn.state = ActionState::AimingShot;
                }
                self.input.open(AimPurpose::Shot);
                log::debug!("Turn {}: aiming shot", self.turn_number);
            }
            (MatchPhase::InTurn, Some(turn)) if turn.actions_remaining == 0 && self.projectile.is_none() => {
                // Budget spent without a pending impact
                if let Err(e) = self.advance_turn() {
                    log::debug!("{}", e);
                }
            }
            _ => {}
        }
    }

    /// Pass the turn to the next alive character
    ///
    /// The acting character moves to the back of the roster unless it has
    /// already died and left the front.
    pub fn advance_turn(&mut self) -> Result<(), DuelError> {
        if self.phase == MatchPhase::Ended {
            return Err(DuelError::MatchAlreadyEnded);
        }
        if self.roster.alive_count() < 2 {
            self.end_match();
            return Err(DuelError::MatchAlreadyEnded);
        }
        if let Some(turn) = self.turn {
            if self.roster.front() == Some(turn.player) {
                self.roster.rotate();
            }
        }
        self.open_turn();
        Ok(())
    }

    /// Give the front character a fresh turn
    fn open_turn(&mut self) {
        let Some(player) = self.roster.front() else {
            self.end_match();
            return;
        };
        self.turn = Some(Turn::new(player, self.settings.actions_per_turn));
        self.turn_number += 1;
        self.phase = MatchPhase::InTurn;
        self.input.open(AimPurpose::Jump);

        let name = self.roster.get(player).map(|c| c.name.as_str()).unwrap_or("?");
        log::info!("Turn {}: {} to play", self.turn_number, name);
    }

    fn end_match(&mut self) {
        self.phase = MatchPhase::Ended;
        self.turn = None;
        self.input.close();
        match self.roster.front().and_then(|id| self.roster.get(id)) {
            Some(winner) => log::info!("Match over after {} turns: {} wins", self.turn_number, winner.name),
            None => log::info!("Match over after {} turns: no survivors", self.turn_number),
        }
    }

    /// Grow explosions and drop finished ones (once per rendered frame)
    pub fn animate_explosions(&mut self) {
        self.explosions.retain(|e| !e.is_finished());
        for explosion in &mut self.explosions {
            explosion.grow();
        }
    }

    /// Snapshot for the renderer and UI overlay
    pub fn frame_view<W: PhysicsWorld + ?Sized>(&self, world: &W) -> FrameView {
        let acting = self.turn.map(|t| t.player);
        let characters = self
            .roster
            .all()
            .iter()
            .map(|c| CharacterView {
                name: c.name.clone(),
                position: world.position(c.body),
                health: c.health,
                alive: self.roster.is_alive(c.id),
                acting: acting == Some(c.id),
            })
            .collect();

        let winner = self.winner().and_then(|id| self.roster.get(id)).map(|c| c.name.clone());
        let banner = winner.as_ref().map(|name| format!("> {name} player == \"champion\""));

        FrameView {
            phase: self.phase,
            characters,
            projectile: self.projectile.and_then(|p| world.position(p.body)),
            aim: self.input.preview().copied(),
            explosions: self.explosions.clone(),
            prompt: self.turn.and_then(|t| t.state.prompt()).map(str::to_owned),
            actions_remaining: self.turn.map(|t| t.actions_remaining),
            winner,
            banner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::collision::closest_point_on_segment;
    use crate::physics::{SimpleWorld, Treatment, WorldParams};
    use crate::sim::aim::SessionId;
    use proptest::prelude::*;

    /// Physics double: positions are set by the test, collisions are injected
    #[derive(Default)]
    struct ScriptedWorld {
        next_id: u32,
        positions: HashMap<BodyId, Vec2>,
        speeds: HashMap<BodyId, f32>,
        treatments: HashMap<BodyId, Treatment>,
        impulses: Vec<(BodyId, Vec2)>,
        pending: Vec<CollisionPair>,
        removed: Vec<BodyId>,
    }

    impl ScriptedWorld {
        fn new() -> Self {
            Self {
                next_id: 1,
                ..Default::default()
            }
        }

        fn inject(&mut self, a: BodyId, b: BodyId) {
            let point = self.positions.get(&a).copied().unwrap_or(Vec2::ZERO);
            self.pending.push(CollisionPair::new(a, b, point));
        }
    }

    impl PhysicsWorld for ScriptedWorld {
        fn add_body(&mut self, desc: BodyDesc) -> Result<BodyId, DuelError> {
            desc.validate()?;
            let id = BodyId(self.next_id);
            self.next_id += 1;
            self.positions.insert(id, desc.position);
            self.treatments.insert(id, desc.treatment);
            Ok(id)
        }

        fn add_terrain(&mut self, _terrain: &TerrainBody) -> Result<BodyId, DuelError> {
            let id = BodyId(self.next_id);
            self.next_id += 1;
            Ok(id)
        }

        fn remove_body(&mut self, id: BodyId) {
            self.positions.remove(&id);
            self.removed.push(id);
        }

        fn apply_impulse(&mut self, id: BodyId, impulse: Vec2) {
            self.impulses.push((id, impulse));
        }

        fn set_treatment(&mut self, id: BodyId, treatment: Treatment) {
            self.treatments.insert(id, treatment);
        }

        fn wake_all(&mut self) {}

        fn position(&self, id: BodyId) -> Option<Vec2> {
            self.positions.get(&id).copied()
        }

        fn speed(&self, id: BodyId) -> Option<f32> {
            self.positions
                .contains_key(&id)
                .then(|| self.speeds.get(&id).copied().unwrap_or(0.0))
        }

        fn step(&mut self, _dt_ms: f32) -> Vec<CollisionPair> {
            std::mem::take(&mut self.pending)
        }
    }

    const DT: f32 = 100.0;

    fn new_duel(world: &mut ScriptedWorld) -> Duel {
        Duel::new(DuelSettings::default(), world, 42).unwrap()
    }

    /// Step until the grace period lapses and the machine reacts
    fn settle(duel: &mut Duel, world: &mut ScriptedWorld) {
        for _ in 0..6 {
            duel.step(world, DT);
        }
    }

    fn end_drag(distance: f32, angle: f32) -> DragEvent {
        DragEvent::End { distance, angle }
    }

    /// Play the acting character up to a live projectile
    fn jump_and_fire(duel: &mut Duel, world: &mut ScriptedWorld) -> BodyId {
        duel.handle_drag(world, end_drag(10.0, 90.0)).unwrap();
        settle(duel, world);
        duel.handle_drag(world, end_drag(200.0, 135.0)).unwrap();
        duel.projectile().unwrap().body
    }

    fn body_of(duel: &Duel, id: CharacterId) -> BodyId {
        duel.roster().get(id).unwrap().body
    }

    #[test]
    fn test_setup_creates_two_characters() {
        let mut world = ScriptedWorld::new();
        let duel = new_duel(&mut world);
        assert_eq!(duel.phase(), MatchPhase::Settling);
        assert!(duel.turn().is_none());
        assert_eq!(duel.roster().alive_count(), 2);

        let a = duel.roster().all()[0].clone();
        let b = duel.roster().all()[1].clone();
        assert_eq!(a.name, "player1");
        assert_eq!(a.health, 100);
        let pa = world.position(a.body).unwrap();
        let pb = world.position(b.body).unwrap();
        assert!((pa - Vec2::new(128.0, 216.0)).length() < 1e-3);
        assert!((pb - Vec2::new(1152.0, 216.0)).length() < 1e-3);
        assert_eq!(duel.role_of(a.body), Some(BodyRole::Character(a.id)));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut world = ScriptedWorld::new();
        let settings = DuelSettings {
            actions_per_turn: 2,
            ..Default::default()
        };
        let err = Duel::new(settings, &mut world, 1).unwrap_err();
        assert!(matches!(err, DuelError::InvalidConfig { .. }));
    }

    #[test]
    fn test_opening_turn_after_settling() {
        let mut world = ScriptedWorld::new();
        let mut duel = new_duel(&mut world);

        // Grace period still running
        duel.step(&mut world, DT);
        assert_eq!(duel.phase(), MatchPhase::Settling);

        settle(&mut duel, &mut world);
        let turn = *duel.turn().unwrap();
        assert_eq!(turn.player, CharacterId(1));
        assert_eq!(duel.roster().get(turn.player).unwrap().name, "player2");
        assert_eq!(turn.state, ActionState::AimingJump);
        assert_eq!(turn.actions_remaining, 3);
        assert_eq!(duel.input().session().map(|s| s.purpose), Some(AimPurpose::Jump));
    }

    #[test]
    fn test_moving_character_delays_first_turn() {
        let mut world = ScriptedWorld::new();
        let mut duel = new_duel(&mut world);
        let a = body_of(&duel, CharacterId(0));
        world.speeds.insert(a, 0.5);
        settle(&mut duel, &mut world);
        assert_eq!(duel.phase(), MatchPhase::Settling);

        world.speeds.insert(a, 0.0005);
        duel.step(&mut world, DT);
        assert_eq!(duel.phase(), MatchPhase::InTurn);
    }

    #[test]
    fn test_jump_then_shot_sequence() {
        let mut world = ScriptedWorld::new();
        let mut duel = new_duel(&mut world);
        settle(&mut duel, &mut world);
        let a = body_of(&duel, CharacterId(1));
        let b = body_of(&duel, CharacterId(0));

        duel.handle_drag(&mut world, end_drag(72.0, 90.0)).unwrap();
        let turn = *duel.turn().unwrap();
        assert_eq!(turn.state, ActionState::Jumping);
        assert_eq!(turn.actions_remaining, 2);
        assert!(!duel.input().is_open());
        assert_eq!(world.treatments[&b], Treatment::Static);
        assert_eq!(world.treatments[&a], Treatment::Dynamic);
        assert_eq!(world.impulses.len(), 1);
        let (body, force) = world.impulses[0];
        assert_eq!(body, a);
        assert!((force.y + 20.0 / 130_000_000.0).abs() < 1e-12);

        settle(&mut duel, &mut world);
        assert_eq!(duel.turn().unwrap().state, ActionState::AimingShot);
        assert_eq!(duel.input().session().map(|s| s.purpose), Some(AimPurpose::Shot));

        duel.handle_drag(&mut world, end_drag(200.0, 135.0)).unwrap();
        let turn = *duel.turn().unwrap();
        assert_eq!(turn.state, ActionState::Firing);
        assert_eq!(turn.actions_remaining, 1);
        let projectile = duel.projectile().unwrap().body;
        assert_eq!(duel.role_of(projectile), Some(BodyRole::Projectile));
        assert_eq!(world.treatments[&a], Treatment::Static);
    }

    #[test]
    fn test_single_gesture_launches_once() {
        let mut world = ScriptedWorld::new();
        let mut duel = new_duel(&mut world);
        settle(&mut duel, &mut world);

        duel.handle_drag(&mut world, end_drag(72.0, 90.0)).unwrap();
        duel.handle_drag(&mut world, end_drag(72.0, 90.0)).unwrap();
        assert_eq!(world.impulses.len(), 1);
        assert_eq!(duel.turn().unwrap().actions_remaining, 2);
    }

    #[test]
    fn test_invalid_drag_keeps_session() {
        let mut world = ScriptedWorld::new();
        let mut duel = new_duel(&mut world);
        settle(&mut duel, &mut world);
        let session: Option<SessionId> = duel.input().session().map(|s| s.id);

        let err = duel.handle_drag(&mut world, end_drag(f32::NAN, 0.0)).unwrap_err();
        assert!(matches!(err, DuelError::InvalidAimInput { .. }));
        assert_eq!(duel.input().session().map(|s| s.id), session);
        assert_eq!(duel.turn().unwrap().state, ActionState::AimingJump);
        assert!(world.impulses.is_empty());
    }

    #[test]
    fn test_drag_during_settling_ignored() {
        let mut world = ScriptedWorld::new();
        let mut duel = new_duel(&mut world);
        assert_eq!(duel.handle_drag(&mut world, end_drag(72.0, 90.0)), Ok(()));
        assert!(world.impulses.is_empty());
    }

    #[test]
    fn test_direct_action_without_turn() {
        let mut world = ScriptedWorld::new();
        let mut duel = new_duel(&mut world);
        let err = duel.jump(&mut world, AimVector::new(90.0, 10.0)).unwrap_err();
        assert_eq!(err, DuelError::NoActiveTurn);
        let err = duel.fire(&mut world, AimVector::new(90.0, 10.0)).unwrap_err();
        assert_eq!(err, DuelError::NoActiveTurn);
    }

    #[test]
    fn test_fire_out_of_order_rejected() {
        let mut world = ScriptedWorld::new();
        let mut duel = new_duel(&mut world);
        settle(&mut duel, &mut world);
        let err = duel.fire(&mut world, AimVector::new(90.0, 10.0)).unwrap_err();
        assert!(matches!(err, DuelError::InvalidAimInput { .. }));
        assert!(duel.projectile().is_none());
    }

    #[test]
    fn test_lethal_hit_damages_and_passes_turn() {
        let mut world = ScriptedWorld::new();
        let mut duel = new_duel(&mut world);
        settle(&mut duel, &mut world);
        let a_body = body_of(&duel, CharacterId(0));

        let projectile = jump_and_fire(&mut duel, &mut world);
        let a_pos = world.position(a_body).unwrap();
        world.positions.insert(projectile, a_pos + Vec2::new(0.0, 50.0));
        let terrain = BodyId(1);
        world.inject(projectile, terrain);

        let report = duel.step(&mut world, DT).unwrap();
        assert_eq!(report.kind, ImpactKind::Lethal);
        assert_eq!(duel.roster().get(CharacterId(0)).unwrap().health, 75);
        assert_eq!(duel.roster().get(CharacterId(1)).unwrap().health, 100);

        assert!(duel.projectile().is_none());
        assert!(world.removed.contains(&projectile));
        assert_eq!(duel.role_of(projectile), None);

        let turn = *duel.turn().unwrap();
        assert_eq!(turn.player, CharacterId(0));
        assert_eq!(turn.state, ActionState::AimingJump);
        assert_eq!(turn.actions_remaining, 3);
        assert_eq!(duel.explosions().len(), 1);
        assert_eq!(duel.explosions()[0].max_radius, 100.0);
    }

    #[test]
    fn test_boundary_hit_fizzles() {
        let mut world = ScriptedWorld::new();
        let mut duel = new_duel(&mut world);
        settle(&mut duel, &mut world);
        let a_body = body_of(&duel, CharacterId(0));

        let projectile = jump_and_fire(&mut duel, &mut world);
        // Right next to A, but it is the boundary that was touched
        world
            .positions
            .insert(projectile, world.position(a_body).unwrap() + Vec2::new(3.0, 0.0));
        world.inject(BodyId::BOUNDARY, projectile);

        let report = duel.step(&mut world, DT).unwrap();
        assert_eq!(report.kind, ImpactKind::Fizzle);
        assert!(report.damage.is_empty());
        assert_eq!(report.explosion.radius, 0.0);
        assert_eq!(duel.roster().get(CharacterId(0)).unwrap().health, 100);
        assert_eq!(duel.turn().unwrap().player, CharacterId(0));

        // Zero-size explosion is gone after one frame
        duel.animate_explosions();
        assert!(duel.explosions().is_empty());
    }

    #[test]
    fn test_kill_ends_match() {
        let mut world = ScriptedWorld::new();
        let mut duel = new_duel(&mut world);
        settle(&mut duel, &mut world);
        let a_body = body_of(&duel, CharacterId(0));
        duel.roster.get_mut(CharacterId(0)).unwrap().health = 20;

        let projectile = jump_and_fire(&mut duel, &mut world);
        world
            .positions
            .insert(projectile, world.position(a_body).unwrap() + Vec2::new(50.0, 0.0));
        world.inject(projectile, BodyId(1));

        let report = duel.step(&mut world, DT).unwrap();
        assert_eq!(report.deaths, vec![CharacterId(0)]);
        assert_eq!(duel.roster().get(CharacterId(0)).unwrap().health, -5);
        assert_eq!(duel.roster().dead(), &[CharacterId(0)]);
        assert_eq!(duel.roster().alive_count(), 1);
        assert_eq!(duel.phase(), MatchPhase::Ended);
        assert!(duel.turn().is_none());
        assert!(!duel.input().is_open());
        assert_eq!(duel.winner(), Some(CharacterId(1)));
        assert_eq!(duel.advance_turn(), Err(DuelError::MatchAlreadyEnded));

        // Nothing restarts afterwards
        settle(&mut duel, &mut world);
        assert!(duel.turn().is_none());

        let view = duel.frame_view(&world);
        assert_eq!(view.winner.as_deref(), Some("player2"));
        assert_eq!(view.banner.as_deref(), Some("> player2 player == \"champion\""));
    }

    #[test]
    fn test_shooter_killed_by_own_shot() {
        let mut world = ScriptedWorld::new();
        let mut duel = new_duel(&mut world);
        settle(&mut duel, &mut world);
        let shooter = body_of(&duel, CharacterId(1));
        duel.roster.get_mut(CharacterId(1)).unwrap().health = 5;

        let projectile = jump_and_fire(&mut duel, &mut world);
        world.positions.insert(projectile, world.position(shooter).unwrap());
        world.inject(projectile, shooter);

        duel.step(&mut world, DT);
        assert_eq!(duel.phase(), MatchPhase::Ended);
        assert_eq!(duel.winner(), Some(CharacterId(0)));
    }

    #[test]
    fn test_orphan_timeout_fizzles() {
        let mut world = ScriptedWorld::new();
        let mut duel = new_duel(&mut world);
        settle(&mut duel, &mut world);
        let projectile = jump_and_fire(&mut duel, &mut world);
        world.speeds.insert(projectile, 1.0);

        let mut report = None;
        for _ in 0..101 {
            if let Some(r) = duel.step(&mut world, DT) {
                report = Some(r);
                break;
            }
        }
        let report = report.unwrap();
        assert_eq!(report.kind, ImpactKind::Fizzle);
        assert!(duel.projectile().is_none());
        assert_eq!(duel.turn().unwrap().player, CharacterId(0));
    }

    #[test]
    fn test_orphan_out_of_region() {
        let mut world = ScriptedWorld::new();
        let mut duel = new_duel(&mut world);
        settle(&mut duel, &mut world);
        let projectile = jump_and_fire(&mut duel, &mut world);
        world.positions.insert(projectile, Vec2::new(-2_000.0, 300.0));

        let report = duel.step(&mut world, DT).unwrap();
        assert_eq!(report.kind, ImpactKind::Fizzle);
        assert_eq!(report.position, Vec2::new(-2_000.0, 300.0));
        assert_eq!(duel.turn().unwrap().player, CharacterId(0));
    }

    #[test]
    fn test_character_terrain_contact_ignored() {
        let mut world = ScriptedWorld::new();
        let mut duel = new_duel(&mut world);
        settle(&mut duel, &mut world);
        let actor = body_of(&duel, CharacterId(1));
        world.inject(actor, BodyId(1));
        assert!(duel.step(&mut world, DT).is_none());
        assert_eq!(duel.turn().unwrap().player, CharacterId(1));
    }

    #[test]
    fn test_frame_view_prompts() {
        let mut world = ScriptedWorld::new();
        let mut duel = new_duel(&mut world);
        let view = duel.frame_view(&world);
        assert_eq!(view.phase, MatchPhase::Settling);
        assert!(view.prompt.is_none());

        settle(&mut duel, &mut world);
        duel.handle_drag(&mut world, DragEvent::Start { center: Vec2::new(300.0, 300.0) })
            .unwrap();
        duel.handle_drag(&mut world, DragEvent::Move { distance: 36.0, angle: 45.0 })
            .unwrap();
        let view = duel.frame_view(&world);
        assert_eq!(
            view.prompt.as_deref(),
            Some("Aim a jump by dragging in the opposite direction")
        );
        assert!(!view.characters[0].acting);
        assert!(view.characters[1].acting);
        let aim = view.aim.unwrap();
        assert_eq!(aim.start, Vec2::new(300.0, 300.0));
        assert!((aim.power - 10.0).abs() < 1e-4);

        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("player1"));
    }

    #[test]
    fn test_explosion_animation() {
        let mut world = ScriptedWorld::new();
        let mut duel = new_duel(&mut world);
        settle(&mut duel, &mut world);
        let projectile = jump_and_fire(&mut duel, &mut world);
        world.inject(projectile, BodyId(1));
        duel.step(&mut world, DT);
        assert_eq!(duel.explosions()[0].radius, 1.0);

        duel.animate_explosions();
        assert!((duel.explosions()[0].radius - 1.3).abs() < 1e-5);
        for _ in 0..18 {
            duel.animate_explosions();
        }
        assert!(duel.explosions().is_empty());
    }

    #[test]
    fn test_full_match_on_reference_world() {
        let settings = DuelSettings::default();
        let mut world = SimpleWorld::new(WorldParams::for_viewport(
            settings.viewport_width,
            settings.viewport_height,
        ));
        let mut duel = Duel::new(settings, &mut world, 9).unwrap();

        // Characters fall onto the terrain before the first turn opens
        let mut steps = 0;
        while duel.phase() == MatchPhase::Settling && steps < 5_000 {
            duel.step(&mut world, crate::consts::SIM_DT_MS);
            steps += 1;
        }
        assert_eq!(duel.phase(), MatchPhase::InTurn);
        assert_eq!(duel.turn().unwrap().player, CharacterId(1));
        let a_body = body_of(&duel, CharacterId(1));
        let a_pos = world.position(a_body).unwrap();
        let clearance = duel
            .terrain()
            .world_segments()
            .map(|(p, q)| a_pos.distance(closest_point_on_segment(a_pos, p, q)))
            .fold(f32::MAX, f32::min);
        assert!((clearance - 5.0).abs() < 1.0, "{a_pos:?} rests {clearance} from the ground");

        // Zero-power hop, then a shot straight up that comes back down nearby
        duel.handle_drag(&mut world, end_drag(0.0, 0.0)).unwrap();
        let mut steps = 0;
        while duel.turn().map(|t| t.state) == Some(ActionState::Jumping) && steps < 5_000 {
            duel.step(&mut world, crate::consts::SIM_DT_MS);
            steps += 1;
        }
        assert_eq!(duel.turn().unwrap().state, ActionState::AimingShot);

        duel.handle_drag(&mut world, end_drag(100.0, 90.0)).unwrap();
        let mut report = None;
        for _ in 0..5_000 {
            if let Some(r) = duel.step(&mut world, crate::consts::SIM_DT_MS) {
                report = Some(r);
                break;
            }
        }
        let report = report.unwrap();
        assert_eq!(report.kind, ImpactKind::Lethal);
        assert!(duel.roster().get(CharacterId(1)).unwrap().health < 100);
        assert_eq!(duel.turn().unwrap().player, CharacterId(0));
    }

    proptest! {
        #[test]
        fn prop_round_robin(turns in 1usize..12) {
            let mut world = ScriptedWorld::new();
            let mut duel = new_duel(&mut world);
            settle(&mut duel, &mut world);

            let mut order = Vec::new();
            for _ in 0..turns {
                order.push(duel.turn().unwrap().player);
                let projectile = jump_and_fire(&mut duel, &mut world);
                world.inject(projectile, BodyId::BOUNDARY);
                duel.step(&mut world, DT);
            }

            for (i, player) in order.iter().enumerate() {
                // player2 opens, then the two alternate
                prop_assert_eq!(*player, CharacterId(((i + 1) % 2) as u32));
            }
            prop_assert_eq!(duel.turn_number() as usize, turns + 1);
        }
    }
}
