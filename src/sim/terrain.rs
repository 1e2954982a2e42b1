//! Procedural terrain
//!
//! A random ground profile squashed to the viewport, closed with an
//! oversized skirt and broken into straight segments, because the collision
//! layer cannot represent concave polygons.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::consts::OFFSCREEN_EXTENT;
use crate::error::DuelError;

/// Minimum number of ground control points
pub const MIN_POINTS: usize = 10;
/// Random spread added to the point count (rounded, so 10 and 30 are half as likely)
pub const POINT_SPREAD: f64 = 20.0;
/// Minimum horizontal gap between control points before squashing
pub const MIN_GAP: f32 = 10.0;
/// Random spread added to each gap
pub const GAP_SPREAD: f32 = 100.0;

/// Inputs to the terrain generator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainParams {
    /// Lowest ground elevation above the viewport bottom
    pub floor: f32,
    /// Elevation range above the floor
    pub amplitude: f32,
    pub viewport_width: f32,
    pub viewport_height: f32,
}

impl TerrainParams {
    pub fn from_settings(settings: &crate::DuelSettings) -> Self {
        Self {
            floor: settings.terrain_floor(),
            amplitude: settings.terrain_amplitude(),
            viewport_width: settings.viewport_width,
            viewport_height: settings.viewport_height,
        }
    }
}

/// A zero-height rectangle bridging two outline vertices (body-local)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainSegment {
    pub center: Vec2,
    pub length: f32,
    /// Rotation in radians
    pub angle: f32,
}

impl TerrainSegment {
    fn bridging(from: Vec2, to: Vec2) -> Self {
        let delta = to - from;
        Self {
            center: (from + to) / 2.0,
            length: delta.length(),
            angle: delta.y.atan2(delta.x),
        }
    }

    /// Segment end points once the body is placed at `origin`
    pub fn endpoints(&self, origin: Vec2) -> (Vec2, Vec2) {
        let half = Vec2::new(self.angle.cos(), self.angle.sin()) * (self.length / 2.0);
        let center = origin + self.center;
        (center - half, center + half)
    }
}

/// The static compound terrain body
///
/// Vertices and segment centres are relative to `origin`, which sits at
/// (2 * viewport width, 0.75 * viewport height). Add `origin` back (or use
/// the `world_*` helpers) before treating them as screen positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainBody {
    pub origin: Vec2,
    /// Ground elevations above the viewport bottom, one per control point
    pub elevations: Vec<f32>,
    /// Horizontal squash applied to the control points
    pub squash: f32,
    /// Closed outline: ground control points followed by the four skirt corners
    pub vertices: Vec<Vec2>,
    /// One segment per outline edge, wrapping last to first
    pub segments: Vec<TerrainSegment>,
}

impl TerrainBody {
    /// Number of ground control points (outline minus skirt corners)
    pub fn ground_len(&self) -> usize {
        self.elevations.len()
    }

    /// Ground control points in world space
    pub fn world_ground(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.vertices[..self.ground_len()]
            .iter()
            .map(move |v| *v + self.origin)
    }

    /// Full outline in world space
    pub fn world_vertices(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.vertices.iter().map(move |v| *v + self.origin)
    }

    /// Segment end points in world space
    pub fn world_segments(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        self.segments.iter().map(move |s| s.endpoints(self.origin))
    }

    /// Ground surface y at world x, interpolated between control points
    pub fn ground_y_at(&self, x: f32) -> Option<f32> {
        let ground: Vec<Vec2> = self.world_ground().collect();
        ground.windows(2).find_map(|pair| {
            let (a, b) = (pair[0], pair[1]);
            if x >= a.x && x <= b.x {
                let t = if b.x > a.x { (x - a.x) / (b.x - a.x) } else { 0.0 };
                Some(a.y + (b.y - a.y) * t)
            } else {
                None
            }
        })
    }
}

/// Generate a terrain body
pub fn generate_terrain<R: Rng>(rng: &mut R, params: &TerrainParams) -> Result<TerrainBody, DuelError> {
    let TerrainParams {
        floor,
        amplitude,
        viewport_width: width,
        viewport_height: height,
    } = *params;

    if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
        return Err(DuelError::invalid_geometry(format!(
            "viewport must be positive and finite, got {width}x{height}"
        )));
    }
    if !(floor.is_finite() && amplitude.is_finite() && amplitude >= 0.0) {
        return Err(DuelError::invalid_geometry(format!(
            "terrain band must be finite with non-negative amplitude, got floor {floor} amplitude {amplitude}"
        )));
    }

    let count = (MIN_POINTS as f64 + rng.random::<f64>() * POINT_SPREAD).round() as usize;

    let elevations: Vec<f32> = (0..count)
        .map(|_| floor + rng.random::<f32>() * amplitude)
        .collect();

    let mut xs: Vec<f32> = Vec::with_capacity(count);
    for i in 0..count {
        let gap = MIN_GAP + rng.random::<f32>() * GAP_SPREAD;
        let x = if i > 0 { xs[i - 1] + gap } else { gap };
        xs.push(x);
    }

    // Squash so the last point lands at twice the viewport width; the
    // exaggerated peaks this produces are part of the look
    let last_x = xs[count - 1];
    let squash = width / (last_x / 2.0);

    let origin = Vec2::new(width * 2.0, height * 0.75);
    let mut world: Vec<Vec2> = xs
        .iter()
        .zip(&elevations)
        .map(|(x, elevation)| Vec2::new(x * squash, height - elevation))
        .collect();

    let first_y = world[0].y;
    let last_y = world[count - 1].y;
    world.push(Vec2::new(width + OFFSCREEN_EXTENT, last_y));
    world.push(Vec2::new(width + OFFSCREEN_EXTENT, height));
    world.push(Vec2::new(-OFFSCREEN_EXTENT, height));
    world.push(Vec2::new(-OFFSCREEN_EXTENT, first_y));

    if world.iter().any(|v| !v.is_finite()) {
        return Err(DuelError::invalid_geometry("terrain outline has non-finite vertices"));
    }

    let vertices: Vec<Vec2> = world.iter().map(|v| *v - origin).collect();
    let segments: Vec<TerrainSegment> = vertices
        .iter()
        .enumerate()
        .map(|(i, v)| TerrainSegment::bridging(*v, vertices[(i + 1) % vertices.len()]))
        .collect();

    log::info!(
        "Generated terrain: {} control points, squash {:.3}, {} segments",
        count,
        squash,
        segments.len()
    );

    Ok(TerrainBody {
        origin,
        elevations,
        squash,
        vertices,
        segments,
    })
}
