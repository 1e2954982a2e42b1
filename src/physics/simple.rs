//! Reference physics world
//!
//! Just enough rigid-body behaviour to drive a duel headlessly: circles under
//! constant gravity, static terrain segments, an axis-aligned world boundary,
//! restitution and friction. Time is in milliseconds.

use glam::Vec2;

use super::collision::{
    circle_bounds_collision, circle_circle_collision, circle_segment_collision, resolve_contact,
};
use super::{BodyDesc, BodyId, CollisionPair, PhysicsWorld, Treatment};
use crate::consts::OFFSCREEN_EXTENT;
use crate::error::DuelError;
use crate::sim::terrain::TerrainBody;

/// Global parameters for [`SimpleWorld`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldParams {
    /// Constant acceleration (units/ms², +y is down)
    pub gravity: Vec2,
    pub bounds_min: Vec2,
    pub bounds_max: Vec2,
    pub boundary_restitution: f32,
    pub boundary_friction: f32,
    pub terrain_restitution: f32,
    pub terrain_friction: f32,
}

impl WorldParams {
    /// Boundary matching the viewport, with the ceiling raised far above the
    /// screen so shots can arc out of view
    pub fn for_viewport(width: f32, height: f32) -> Self {
        Self {
            gravity: Vec2::new(0.0, 0.0004),
            bounds_min: Vec2::new(0.0, -OFFSCREEN_EXTENT),
            bounds_max: Vec2::new(width, height + OFFSCREEN_EXTENT),
            boundary_restitution: 0.99,
            boundary_friction: 0.8,
            terrain_restitution: 1.0,
            terrain_friction: 0.8,
        }
    }
}

#[derive(Debug, Clone)]
struct Body {
    id: BodyId,
    pos: Vec2,
    vel: Vec2,
    /// Force applied since the last step, already divided by mass
    pending_accel: Vec2,
    radius: f32,
    mass: f32,
    restitution: f32,
    friction: f32,
    treatment: Treatment,
}

#[derive(Debug, Clone, Copy)]
struct StaticSegment {
    owner: BodyId,
    a: Vec2,
    b: Vec2,
}

/// Minimal world implementing [`PhysicsWorld`]
#[derive(Debug, Clone)]
pub struct SimpleWorld {
    params: WorldParams,
    bodies: Vec<Body>,
    segments: Vec<StaticSegment>,
    next_id: u32,
}

impl SimpleWorld {
    pub fn new(params: WorldParams) -> Self {
        Self {
            params,
            bodies: Vec::new(),
            segments: Vec::new(),
            // 0 is the boundary
            next_id: 1,
        }
    }

    pub fn params(&self) -> &WorldParams {
        &self.params
    }

    fn allocate_id(&mut self) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        id
    }

    fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.iter_mut().find(|b| b.id == id)
    }

    pub fn velocity(&self, id: BodyId) -> Option<Vec2> {
        self.bodies.iter().find(|b| b.id == id).map(|b| b.vel)
    }

    /// Teleport a body (test and setup helper)
    pub fn set_position(&mut self, id: BodyId, position: Vec2) {
        if let Some(body) = self.body_mut(id) {
            body.pos = position;
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

fn record(pairs: &mut Vec<CollisionPair>, a: BodyId, b: BodyId, point: Vec2) {
    let seen = pairs
        .iter()
        .any(|p| (p.a == a && p.b == b) || (p.a == b && p.b == a));
    if !seen {
        pairs.push(CollisionPair::new(a, b, point));
    }
}

impl PhysicsWorld for SimpleWorld {
    fn add_body(&mut self, desc: BodyDesc) -> Result<BodyId, DuelError> {
        desc.validate()?;
        let id = self.allocate_id();
        self.bodies.push(Body {
            id,
            pos: desc.position,
            vel: Vec2::ZERO,
            pending_accel: Vec2::ZERO,
            radius: desc.radius,
            mass: desc.mass,
            restitution: desc.restitution,
            friction: desc.friction,
            treatment: desc.treatment,
        });
        Ok(id)
    }

    fn add_terrain(&mut self, terrain: &TerrainBody) -> Result<BodyId, DuelError> {
        if terrain.segments.len() < 3 {
            return Err(DuelError::invalid_geometry(format!(
                "terrain needs a closed outline, got {} segments",
                terrain.segments.len()
            )));
        }
        let edges: Vec<(Vec2, Vec2)> = terrain.world_segments().collect();
        if edges.iter().any(|(a, b)| !a.is_finite() || !b.is_finite()) {
            return Err(DuelError::invalid_geometry("terrain segment is not finite"));
        }
        let owner = self.allocate_id();
        self.segments
            .extend(edges.into_iter().map(|(a, b)| StaticSegment { owner, a, b }));
        Ok(owner)
    }

    fn remove_body(&mut self, id: BodyId) {
        self.bodies.retain(|b| b.id != id);
        self.segments.retain(|s| s.owner != id);
    }

    fn apply_impulse(&mut self, id: BodyId, impulse: Vec2) {
        if let Some(body) = self.body_mut(id) {
            body.pending_accel += impulse / body.mass;
        }
    }

    fn set_treatment(&mut self, id: BodyId, treatment: Treatment) {
        if let Some(body) = self.body_mut(id) {
            body.treatment = treatment;
            if treatment == Treatment::Static {
                body.vel = Vec2::ZERO;
                body.pending_accel = Vec2::ZERO;
            }
        }
    }

    fn wake_all(&mut self) {
        // Nothing sleeps here; the duel's activity tracker owns sleep decisions
    }

    fn position(&self, id: BodyId) -> Option<Vec2> {
        self.bodies.iter().find(|b| b.id == id).map(|b| b.pos)
    }

    fn speed(&self, id: BodyId) -> Option<f32> {
        self.velocity(id).map(|v| v.length())
    }

    fn step(&mut self, dt_ms: f32) -> Vec<CollisionPair> {
        let mut pairs = Vec::new();
        let params = self.params;

        // Snapshot circles so each body can test against the others
        let circles: Vec<(BodyId, Vec2, f32)> =
            self.bodies.iter().map(|b| (b.id, b.pos, b.radius)).collect();

        for body in &mut self.bodies {
            if body.treatment == Treatment::Static {
                continue;
            }

            body.vel += (params.gravity + body.pending_accel) * dt_ms;
            body.pending_accel = Vec2::ZERO;

            // Substep so fast, small bodies cannot skip through thin segments
            let move_dist = body.vel.length() * dt_ms;
            let step_size = body.radius * 0.5;
            let num_steps = ((move_dist / step_size).ceil() as usize).clamp(1, 20);
            let step_dt = dt_ms / num_steps as f32;

            for _ in 0..num_steps {
                body.pos += body.vel * step_dt;

                for seg in &self.segments {
                    let hit = circle_segment_collision(body.pos, body.radius, seg.a, seg.b);
                    if hit.hit {
                        body.pos += hit.normal * hit.penetration;
                        body.vel = resolve_contact(
                            body.vel,
                            hit.normal,
                            body.restitution * params.terrain_restitution,
                            (body.friction + params.terrain_friction) / 2.0,
                        );
                        record(&mut pairs, body.id, seg.owner, hit.point);
                    }
                }

                for &(other_id, other_pos, other_radius) in &circles {
                    if other_id == body.id {
                        continue;
                    }
                    let hit = circle_circle_collision(body.pos, body.radius, other_pos, other_radius);
                    if hit.hit {
                        body.pos += hit.normal * hit.penetration;
                        body.vel = resolve_contact(body.vel, hit.normal, body.restitution, body.friction);
                        record(&mut pairs, body.id, other_id, hit.point);
                    }
                }

                let edge = circle_bounds_collision(body.pos, body.radius, params.bounds_min, params.bounds_max);
                if edge.hit {
                    body.pos += edge.normal * edge.penetration;
                    body.vel = resolve_contact(
                        body.vel,
                        edge.normal,
                        params.boundary_restitution,
                        params.boundary_friction,
                    );
                    record(&mut pairs, body.id, BodyId::BOUNDARY, edge.point);
                }
            }
        }

        pairs
    }
}
