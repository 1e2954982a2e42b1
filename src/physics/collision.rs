//! Collision detection and response for circles against segments, circles
//! and the world boundary
//!
//! Terrain is a chain of zero-height segments, so every contact the reference
//! world needs reduces to "closest point on a primitive to a circle centre".

use glam::Vec2;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Collision point (if hit)
    pub point: Vec2,
    /// Surface normal at collision (pointing toward the circle centre)
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Closest point to `p` on the segment `a`-`b`
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let seg = b - a;
    let len_sq = seg.length_squared();
    if len_sq < 0.0001 {
        return a; // Degenerate segment
    }
    let t = ((p - a).dot(seg) / len_sq).clamp(0.0, 1.0);
    a + seg * t
}

/// Check collision between a circle and a line segment
pub fn circle_segment_collision(center: Vec2, radius: f32, a: Vec2, b: Vec2) -> CollisionResult {
    let closest = closest_point_on_segment(center, a, b);
    let offset = center - closest;
    let dist = offset.length();

    if dist >= radius {
        return CollisionResult::miss();
    }

    let mut normal = offset.normalize_or_zero();
    if normal.length_squared() < 0.5 {
        // Centre sits on the segment - push out along the segment's left-hand
        // perpendicular (up for a left-to-right ground edge in screen space)
        let seg = b - a;
        normal = Vec2::new(seg.y, -seg.x).normalize_or_zero();
    }

    CollisionResult {
        hit: true,
        point: closest,
        normal,
        penetration: radius - dist,
    }
}

/// Check collision between two circles, normal pointing toward the first
pub fn circle_circle_collision(
    center: Vec2,
    radius: f32,
    other_center: Vec2,
    other_radius: f32,
) -> CollisionResult {
    let offset = center - other_center;
    let dist = offset.length();
    let reach = radius + other_radius;

    if dist >= reach {
        return CollisionResult::miss();
    }

    let normal = if dist > 0.0001 { offset / dist } else { Vec2::NEG_Y };
    CollisionResult {
        hit: true,
        point: other_center + normal * other_radius,
        normal,
        penetration: reach - dist,
    }
}

/// Check a circle against the inside of an axis-aligned box
///
/// Returns the deepest violated side only; corners resolve over two steps.
pub fn circle_bounds_collision(center: Vec2, radius: f32, min: Vec2, max: Vec2) -> CollisionResult {
    let candidates = [
        (min.x - (center.x - radius), Vec2::X, Vec2::new(min.x, center.y)),
        ((center.x + radius) - max.x, Vec2::NEG_X, Vec2::new(max.x, center.y)),
        (min.y - (center.y - radius), Vec2::Y, Vec2::new(center.x, min.y)),
        ((center.y + radius) - max.y, Vec2::NEG_Y, Vec2::new(center.x, max.y)),
    ];

    candidates
        .into_iter()
        .filter(|(penetration, _, _)| *penetration > 0.0)
        .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(penetration, normal, point)| CollisionResult {
            hit: true,
            point,
            normal,
            penetration,
        })
        .unwrap_or_else(CollisionResult::miss)
}

/// Contact response with restitution and Coulomb-ish friction
///
/// Only removes the approaching normal component; a body already separating
/// keeps its velocity.
pub fn resolve_contact(velocity: Vec2, normal: Vec2, restitution: f32, friction: f32) -> Vec2 {
    let vn = velocity.dot(normal);
    if vn >= 0.0 {
        return velocity;
    }
    let normal_part = normal * vn;
    let tangent_part = velocity - normal_part;
    tangent_part * (1.0 - friction).clamp(0.0, 1.0) - normal_part * restitution
}
