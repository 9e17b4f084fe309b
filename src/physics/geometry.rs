//! Bounding boxes and convex polygon utilities.

use glam::DVec2;

use crate::error::{PhysicsError, Result};

/// Axis-aligned bounding box stored as a center and half-extents.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Aabb {
    pub center: DVec2,
    /// Always non-negative.
    pub half_extents: DVec2,
}

impl Aabb {
    pub fn new(center: DVec2, half_extents: DVec2) -> Self {
        Self {
            center,
            half_extents: half_extents.abs(),
        }
    }

    /// Box of the given width and height centered on the origin.
    pub fn from_size(width: f64, height: f64) -> Self {
        Self::new(DVec2::ZERO, DVec2::new(width, height) * 0.5)
    }

    pub fn from_min_max(min: DVec2, max: DVec2) -> Self {
        Self::new((min + max) * 0.5, (max - min) * 0.5)
    }

    /// Smallest box containing both points, in any order.
    pub fn from_points(a: DVec2, b: DVec2) -> Self {
        Self::from_min_max(a.min(b), a.max(b))
    }

    #[inline]
    pub fn min(&self) -> DVec2 {
        self.center - self.half_extents
    }

    #[inline]
    pub fn max(&self) -> DVec2 {
        self.center + self.half_extents
    }

    pub fn translated(&self, offset: DVec2) -> Self {
        Self {
            center: self.center + offset,
            half_extents: self.half_extents,
        }
    }

    /// Closed-interval overlap test on both axes.
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        let d = (self.center - other.center).abs();
        let reach = self.half_extents + other.half_extents;
        d.x <= reach.x && d.y <= reach.y
    }

    #[inline]
    pub fn contains(&self, point: DVec2) -> bool {
        let d = (point - self.center).abs();
        d.x <= self.half_extents.x && d.y <= self.half_extents.y
    }

    /// Largest half-extent. Used as the shape's bounding radius by dormancy
    /// and as the core-shrink scale by the narrow phase.
    #[inline]
    pub fn max_half_extent(&self) -> f64 {
        self.half_extents.x.max(self.half_extents.y)
    }
}

/// A convex hull centered on its own centroid.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexPolygon {
    vertices: Vec<DVec2>,
    area: f64,
    unit_inertia: f64,
}

impl ConvexPolygon {
    /// Build a polygon from hull vertices in either winding order.
    ///
    /// The vertices are translated so that the centroid sits at the origin.
    /// Two vertices describe a segment; anything with fewer distinct points,
    /// a concave outline, or a zero area with three or more vertices is
    /// rejected.
    pub fn new(hull: &[DVec2]) -> Result<Self> {
        let distinct = hull
            .iter()
            .enumerate()
            .filter(|(i, v)| !hull[..*i].contains(*v))
            .count();
        if hull.len() < 2 || distinct < 2 {
            return Err(PhysicsError::DegeneratePolygon {
                vertices: hull.len(),
            });
        }
        if !is_polygon_convex(hull) {
            return Err(PhysicsError::NonConvexPolygon);
        }
        if hull.len() > 2 && polygon_area(hull).abs() <= f64::EPSILON {
            return Err(PhysicsError::DegeneratePolygon {
                vertices: hull.len(),
            });
        }

        let centroid = polygon_centroid(hull);
        let vertices: Vec<DVec2> = hull.iter().map(|v| *v - centroid).collect();
        let area = polygon_area(&vertices);
        let unit_inertia = polygon_moment_of_inertia(&vertices);

        Ok(Self {
            vertices,
            area,
            unit_inertia,
        })
    }

    /// Axis-aligned rectangle of the given size.
    pub fn rectangle(width: f64, height: f64) -> Result<Self> {
        let hw = width * 0.5;
        let hh = height * 0.5;
        Self::new(&[
            DVec2::new(-hw, -hh),
            DVec2::new(hw, -hh),
            DVec2::new(hw, hh),
            DVec2::new(-hw, hh),
        ])
    }

    pub fn vertices(&self) -> &[DVec2] {
        &self.vertices
    }

    /// Signed area, positive for counter-clockwise winding.
    pub fn area(&self) -> f64 {
        self.area
    }

    /// Moment of inertia about the centroid for a unit mass.
    pub fn unit_moment_of_inertia(&self) -> f64 {
        self.unit_inertia
    }

    /// Index and position of the vertex farthest along `dir`.
    ///
    /// Ties keep the earliest vertex.
    pub fn farthest_vertex(&self, dir: DVec2) -> (usize, DVec2) {
        let mut best = 0;
        let mut best_dot = self.vertices[0].dot(dir);
        for (i, v) in self.vertices.iter().enumerate().skip(1) {
            let d = v.dot(dir);
            if d > best_dot {
                best_dot = d;
                best = i;
            }
        }
        (best, self.vertices[best])
    }

    /// Whether a point in polygon-local space lies inside or on the hull.
    pub fn contains_point(&self, point: DVec2) -> bool {
        is_point_in_polygon(point, &self.vertices)
    }
}

/// True when every turn along the outline has the same orientation and the
/// outline winds exactly once. Collinear runs are tolerated.
pub fn is_polygon_convex(hull: &[DVec2]) -> bool {
    if hull.is_empty() {
        return false;
    }
    if hull.len() < 3 {
        return true;
    }

    let n = hull.len();
    let mut orientation = 0.0f64;
    let mut total_turn = 0.0f64;
    for i in 0..n {
        let prev = hull[(i + n - 1) % n];
        let cur = hull[i];
        let next = hull[(i + 1) % n];
        let e0 = cur - prev;
        let e1 = next - cur;
        let cross = e0.perp_dot(e1);

        if cross != 0.0 {
            if orientation == 0.0 {
                orientation = cross.signum();
            } else if cross.signum() != orientation {
                return false;
            }
        }
        total_turn += cross.atan2(e0.dot(e1));
    }

    // A star outline turns consistently but winds more than once.
    total_turn.abs() < 2.0 * std::f64::consts::PI + 1e-6
}

/// Signed shoelace area, positive for counter-clockwise outlines.
pub fn polygon_area(hull: &[DVec2]) -> f64 {
    if hull.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    let mut prev = hull[hull.len() - 1];
    for &next in hull {
        sum += prev.perp_dot(next);
        prev = next;
    }
    sum * 0.5
}

pub fn polygon_centroid(hull: &[DVec2]) -> DVec2 {
    match hull.len() {
        0 => DVec2::ZERO,
        1 => hull[0],
        2 => (hull[0] + hull[1]) * 0.5,
        _ => {
            let area = polygon_area(hull);
            if area == 0.0 {
                let sum: DVec2 = hull.iter().copied().sum();
                return sum / hull.len() as f64;
            }
            let mut acc = DVec2::ZERO;
            let mut prev = hull[hull.len() - 1];
            for &next in hull {
                acc += (prev + next) * prev.perp_dot(next);
                prev = next;
            }
            acc / (6.0 * area)
        }
    }
}

/// Moment of inertia of a uniform polygon of unit mass about the origin.
///
/// Points have none; a segment uses `L² / 12`.
pub fn polygon_moment_of_inertia(hull: &[DVec2]) -> f64 {
    match hull.len() {
        0 | 1 => 0.0,
        2 => hull[1].distance_squared(hull[0]) / 12.0,
        n => {
            let mut num = 0.0;
            let mut denom = 0.0;
            for i in 0..n {
                let a = hull[i];
                let b = hull[(i + 1) % n];
                let cross = a.perp_dot(b).abs();
                num += cross * (a.length_squared() + a.dot(b) + b.length_squared());
                denom += cross;
            }
            if denom == 0.0 {
                0.0
            } else {
                num / (6.0 * denom)
            }
        }
    }
}

/// Parameter of the point on segment `a..b` closest to `pt`, clamped to
/// `[0, 1]`. A zero-length segment yields 0.
pub fn closest_segment_parameter(pt: DVec2, a: DVec2, b: DVec2) -> f64 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq == 0.0 {
        return 0.0;
    }
    ((pt - a).dot(ab) / len_sq).clamp(0.0, 1.0)
}

pub fn nearest_point_on_segment(pt: DVec2, a: DVec2, b: DVec2) -> DVec2 {
    a + (b - a) * closest_segment_parameter(pt, a, b)
}

pub fn is_point_in_polygon(pt: DVec2, hull: &[DVec2]) -> bool {
    match hull.len() {
        0 => false,
        1 => pt == hull[0],
        2 => nearest_point_on_segment(pt, hull[0], hull[1]).distance_squared(pt) <= 1e-12,
        n => {
            let mut side = 0.0f64;
            for i in 0..n {
                let a = hull[i];
                let b = hull[(i + 1) % n];
                let cross = (b - a).perp_dot(pt - a);
                if cross == 0.0 {
                    continue;
                }
                if side == 0.0 {
                    side = cross.signum();
                } else if cross.signum() != side {
                    return false;
                }
            }
            true
        }
    }
}
