//! Collider shape support functions for collision detection.
//!
//! All queries work in shape-local space. Callers rotate directions into the
//! body frame and transform the returned points back out.

use glam::DVec2;

use crate::ecs::components::physics::ColliderShape;
use crate::error::{PhysicsError, Result};
use crate::physics::geometry::Aabb;

impl ColliderShape {
    pub fn circle(radius: f64) -> Result<Self> {
        if radius > 0.0 && radius.is_finite() {
            Ok(ColliderShape::Circle { radius })
        } else {
            Err(PhysicsError::InvalidRadius(radius))
        }
    }

    /// Local bounding box of the shape rotated by `angle`.
    pub fn aabb(&self, angle: f64) -> Aabb {
        match self {
            ColliderShape::Point => Aabb::default(),
            ColliderShape::Circle { radius } => Aabb::new(DVec2::ZERO, DVec2::splat(*radius)),
            ColliderShape::ConvexPolygon(polygon) => {
                let (sin, cos) = angle.sin_cos();
                let mut min = DVec2::splat(f64::INFINITY);
                let mut max = DVec2::splat(f64::NEG_INFINITY);
                for v in polygon.vertices() {
                    let w = DVec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos);
                    min = min.min(w);
                    max = max.max(w);
                }
                Aabb::from_min_max(min, max)
            }
        }
    }

    /// Largest half-extent of the unrotated bounding box.
    #[inline]
    pub fn bounding_radius(&self) -> f64 {
        self.aabb(0.0).max_half_extent()
    }

    /// Smallest half-extent of the unrotated bounding box. Core margins
    /// never grow past it.
    #[inline]
    pub fn core_dimension(&self) -> f64 {
        let half = self.aabb(0.0).half_extents;
        half.x.min(half.y)
    }

    /// GJK support function. Returns the farthest point of the hull along `dir`.
    pub fn farthest_hull_point(&self, dir: DVec2) -> DVec2 {
        match self {
            ColliderShape::Point => DVec2::ZERO,
            ColliderShape::Circle { radius } => dir.normalize_or_zero() * *radius,
            ColliderShape::ConvexPolygon(polygon) => polygon.farthest_vertex(dir).1,
        }
    }

    /// Farthest point along `dir` of the hull shrunk inward by `margin`.
    pub fn farthest_core_point(&self, dir: DVec2, margin: f64) -> DVec2 {
        match self {
            ColliderShape::Point => DVec2::ZERO,
            ColliderShape::Circle { radius } => dir.normalize_or_zero() * (*radius - margin),
            ColliderShape::ConvexPolygon(polygon) => {
                let verts = polygon.vertices();
                let len = verts.len();
                let (i, v) = polygon.farthest_vertex(dir);
                let prev = verts[(i + len - 1) % len];
                let next = verts[(i + 1) % len];

                // Inward edge normals: left of the edge for counter-clockwise
                // hulls, right of it otherwise.
                let inward = |e: DVec2| {
                    let n = e.perp().normalize_or_zero();
                    if polygon.area() >= 0.0 {
                        n
                    } else {
                        -n
                    }
                };
                let n0 = inward(v - prev);
                let n1 = inward(next - v);
                let denom = 1.0 + n0.dot(n1);
                if denom.abs() < 1e-12 {
                    // Segment ends have no interior to shrink into.
                    return v;
                }
                v + (n0 + n1) * (margin / denom)
            }
        }
    }

    /// Moment of inertia about the center for a unit mass.
    pub fn unit_moment_of_inertia(&self) -> f64 {
        match self {
            ColliderShape::Point => 0.0,
            ColliderShape::Circle { radius } => radius * radius * 0.5,
            ColliderShape::ConvexPolygon(polygon) => polygon.unit_moment_of_inertia(),
        }
    }
}
