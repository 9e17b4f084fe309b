//! Narrowphase collision detection: closed-form circle test and GJK with
//! shrinking-core contact reconstruction.

use glam::DVec2;
use tracing::{trace, warn};

use crate::ecs::components::physics::{Collider, ColliderShape, RigidBody, SleepInfo};
use crate::ecs::components::transform::{BodyState, Transform2D};

use super::contact::{CandidatePair, Contact, ContactInfo};
use super::geometry::closest_segment_parameter;

/// GJK gives up after this many support queries.
pub const GJK_MAX_ITERATIONS: u32 = 100;
/// Distance mode stops once a new support point improves by less than this.
pub const GJK_ACCURACY: f64 = 1e-4;
/// Core margins grow by this fraction of the smaller shape dimension.
const CORE_MARGIN_STEP: f64 = 1e-2;

/// A point of the Minkowski difference together with the two surface points
/// it was built from.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SupportPoint {
    /// Farthest point of A along the query direction.
    pub a: DVec2,
    /// Farthest point of B against the query direction.
    pub b: DVec2,
    /// `a - b`.
    pub pt: DVec2,
}

#[derive(Debug, Clone, Default)]
pub struct GjkResult {
    pub overlap: bool,
    pub simplex: Vec<SupportPoint>,
    /// Separation distance. Only meaningful in distance mode without overlap.
    pub distance: f64,
    pub iterations: u32,
    pub max_iterations_reached: bool,
    /// Closest point on A, in world space.
    pub closest_a: DVec2,
    /// Closest point on B, in world space.
    pub closest_b: DVec2,
}

/// Minkowski difference support function for two posed shapes.
///
/// With `use_core` set, each shape is replaced by its core: the hull shrunk
/// inward by the shape's margin.
#[derive(Debug, Clone)]
pub struct MinkowskiSupport<'a> {
    shape_a: &'a ColliderShape,
    transform_a: Transform2D,
    shape_b: &'a ColliderShape,
    transform_b: Transform2D,
    pub use_core: bool,
    pub margin_a: f64,
    pub margin_b: f64,
}

impl<'a> MinkowskiSupport<'a> {
    pub fn new(
        shape_a: &'a ColliderShape,
        transform_a: Transform2D,
        shape_b: &'a ColliderShape,
        transform_b: Transform2D,
    ) -> Self {
        Self {
            shape_a,
            transform_a,
            shape_b,
            transform_b,
            use_core: false,
            margin_a: 0.0,
            margin_b: 0.0,
        }
    }

    pub fn support(&self, dir: DVec2) -> SupportPoint {
        let local_a = self.transform_a.rotate_inv(dir);
        let local_b = self.transform_b.rotate_inv(-dir);
        let (a, b) = if self.use_core {
            (
                self.shape_a.farthest_core_point(local_a, self.margin_a),
                self.shape_b.farthest_core_point(local_b, self.margin_b),
            )
        } else {
            (
                self.shape_a.farthest_hull_point(local_a),
                self.shape_b.farthest_hull_point(local_b),
            )
        };
        let a = self.transform_a.transform_point(a);
        let b = self.transform_b.transform_point(b);
        SupportPoint { a, b, pt: a - b }
    }
}

/// Direction toward the origin from segment `a..b`.
///
/// Returns `None` when the origin lies on the segment.
fn next_search_dir(a: DVec2, b: DVec2) -> Option<DVec2> {
    if b.length_squared() - a.dot(b) < 0.0 {
        return Some(-b);
    }
    if a.length_squared() - a.dot(b) < 0.0 {
        return Some(-a);
    }
    let d = b - a;
    if d.length_squared() <= f64::EPSILON * f64::EPSILON {
        return Some(-a);
    }
    let side = a.perp_dot(d);
    if side > 0.0 {
        Some(d.perp())
    } else if side < 0.0 {
        Some(-d.perp())
    } else {
        None
    }
}

/// Closest points on A and B from the edge the distance search stopped on.
fn closest_points(simplex: &[SupportPoint]) -> (DVec2, DVec2) {
    let last = simplex[simplex.len() - 2];
    let prev = simplex[simplex.len() - 3];
    let t = closest_segment_parameter(DVec2::ZERO, last.pt, prev.pt);
    (last.a.lerp(prev.a, t), last.b.lerp(prev.b, t))
}

/// Gilbert-Johnson-Keerthi overlap and distance query over a support
/// function.
///
/// `seed` is the first search direction (`+x` when zero). With
/// `overlap_only` the search stops as soon as a separating direction is
/// found; otherwise it continues to measure the separation distance and the
/// closest points.
pub fn gjk<F>(mut support: F, seed: DVec2, overlap_only: bool) -> GjkResult
where
    F: FnMut(DVec2) -> SupportPoint,
{
    let mut result = GjkResult {
        simplex: Vec::with_capacity(3),
        ..Default::default()
    };
    let mut dir = if seed == DVec2::ZERO { DVec2::X } else { seed };

    let first = support(dir);
    result.simplex.push(first);
    if first.pt == DVec2::ZERO {
        result.overlap = true;
        return result;
    }
    let mut last = first.pt;
    dir = -dir;

    let mut no_overlap = false;
    let mut measured = false;

    loop {
        result.iterations += 1;
        if result.iterations >= GJK_MAX_ITERATIONS {
            result.max_iterations_reached = true;
            result.distance = 0.0;
            return result;
        }

        let lastlast = last;
        let point = support(dir);
        result.simplex.push(point);
        last = point.pt;

        if last == DVec2::ZERO {
            result.overlap = true;
            break;
        }

        // The new point did not pass the origin, so the difference cannot
        // contain it.
        if !no_overlap && last.dot(dir) <= 0.0 {
            if overlap_only {
                break;
            }
            no_overlap = true;
        }

        if result.simplex.len() == 2 {
            match next_search_dir(last, lastlast) {
                Some(next) => dir = next,
                None => {
                    result.overlap = true;
                    break;
                }
            }
        } else if no_overlap {
            dir = dir.normalize_or_zero();
            let d1 = lastlast.dot(dir);
            let d2 = last.dot(dir);
            if (d1 - d2).abs() < GJK_ACCURACY {
                result.distance = -d1;
                measured = true;
                break;
            }

            // Keep the two points nearest the origin; `last` is one of them.
            if lastlast.length_squared() < result.simplex[0].pt.length_squared() {
                result.simplex.remove(0);
            } else {
                result.simplex.remove(1);
            }
            match next_search_dir(result.simplex[1].pt, result.simplex[0].pt) {
                Some(next) => dir = next,
                None => {
                    result.overlap = true;
                    break;
                }
            }
        } else {
            // Triangle [c, b, a] with `a` the newest point.
            let a = last;
            let ab = lastlast - a;
            let ac = result.simplex[0].pt - a;
            let ao = -a;
            let orient = ab.perp_dot(ac);

            if ab.perp_dot(ao) * orient < 0.0 {
                // Origin lies beyond AB: drop C.
                result.simplex.remove(0);
                dir = if orient > 0.0 { -ab.perp() } else { ab.perp() };
            } else if ac.perp_dot(ao) * orient > 0.0 {
                // Origin lies beyond AC: drop B.
                result.simplex.remove(1);
                dir = if orient > 0.0 { ac.perp() } else { -ac.perp() };
            } else {
                result.overlap = true;
                break;
            }
        }
    }

    if measured {
        let (a, b) = closest_points(&result.simplex);
        result.closest_a = a;
        result.closest_b = b;
    }
    result
}

/// Closed-form circle-circle test. Touching circles count as a contact.
pub fn circle_circle(
    center_a: DVec2,
    radius_a: f64,
    center_b: DVec2,
    radius_b: f64,
) -> Option<ContactInfo> {
    let mut d = center_b - center_a;
    let overlap = d.length() - (radius_a + radius_b);
    if d == DVec2::ZERO {
        d = DVec2::X;
    }
    if overlap > 0.0 {
        return None;
    }
    let normal = d.normalize();
    Some(ContactInfo {
        normal,
        mtv: normal * -overlap,
        point: normal * radius_a,
        depth: -overlap,
    })
}

/// General convex test.
///
/// After a hull overlap is confirmed, both shapes are shrunk to cores by
/// growing margins until the cores separate; the core distance and margins
/// then give the depth and the normal. Shapes whose cores still overlap at
/// full margin are pushed apart along the line between their centers.
pub fn convex_convex(
    shape_a: &ColliderShape,
    transform_a: Transform2D,
    shape_b: &ColliderShape,
    transform_b: Transform2D,
) -> Option<ContactInfo> {
    let mut support = MinkowskiSupport::new(shape_a, transform_a, shape_b, transform_b);
    let seed = transform_a.translation - transform_b.translation;

    let mut result = gjk(|d| support.support(d), seed, true);
    if !result.overlap {
        return None;
    }

    let dim_a = shape_a.core_dimension();
    let dim_b = shape_b.core_dimension();
    let non_zero = |d: f64| if d > 0.0 { d } else { 1.0 };
    let inc = CORE_MARGIN_STEP * non_zero(dim_a).min(non_zero(dim_b));

    support.use_core = true;
    while (result.overlap || result.distance == 0.0)
        && (support.margin_a < dim_a || support.margin_b < dim_b)
    {
        if support.margin_a < dim_a {
            support.margin_a = (support.margin_a + inc).min(dim_a);
        }
        if support.margin_b < dim_b {
            support.margin_b = (support.margin_b + inc).min(dim_b);
        }
        result = gjk(|d| support.support(d), seed, false);
    }

    if result.max_iterations_reached {
        trace!(
            margin_a = support.margin_a,
            margin_b = support.margin_b,
            "core distance did not converge, dropping contact"
        );
        return None;
    }
    if result.overlap {
        trace!(
            margin_a = support.margin_a,
            margin_b = support.margin_b,
            "cores never separated, using center line"
        );
        return center_line_contact(&support);
    }

    let depth = support.margin_a + support.margin_b - result.distance;
    if depth <= 0.0 {
        return None;
    }
    let normal = (result.closest_b - result.closest_a).normalize_or_zero();
    if normal == DVec2::ZERO {
        return center_line_contact(&support);
    }

    Some(ContactInfo {
        normal,
        mtv: normal * depth,
        point: result.closest_a + normal * support.margin_a - transform_a.translation,
        depth,
    })
}

/// Contact along the line between the two centers (`+x` when they coincide),
/// for shapes whose cores still overlap at full margin.
///
/// The depth is the overlap of the two hulls projected on that line.
fn center_line_contact(support: &MinkowskiSupport) -> Option<ContactInfo> {
    let normal = (support.transform_b.translation - support.transform_a.translation)
        .try_normalize()
        .unwrap_or(DVec2::X);
    let hull = MinkowskiSupport {
        use_core: false,
        ..support.clone()
    };
    let extreme = hull.support(normal);
    let depth = extreme.pt.dot(normal);
    if depth <= 0.0 {
        return None;
    }
    Some(ContactInfo {
        normal,
        mtv: normal * depth,
        point: extreme.a - support.transform_a.translation,
        depth,
    })
}

/// Detect collision between two shapes, dispatching to the closed form where possible.
pub fn detect_collision(
    shape_a: &ColliderShape,
    transform_a: Transform2D,
    shape_b: &ColliderShape,
    transform_b: Transform2D,
) -> Option<ContactInfo> {
    match (shape_a, shape_b) {
        (ColliderShape::Circle { radius: ra }, ColliderShape::Circle { radius: rb }) => {
            circle_circle(transform_a.translation, *ra, transform_b.translation, *rb)
        }
        _ => convex_convex(shape_a, transform_a, shape_b, transform_b),
    }
}

/// Whether a candidate pair can produce a useful contact.
///
/// Pairs without a dynamic body are inert. Pairs whose dynamic bodies are
/// all asleep are skipped too; the contact will be found again once
/// something wakes them.
fn pair_is_active(
    rb_a: &RigidBody,
    sleep_a: Option<&SleepInfo>,
    rb_b: &RigidBody,
    sleep_b: Option<&SleepInfo>,
) -> bool {
    let awake_dynamic =
        |rb: &RigidBody, sleep: Option<&SleepInfo>| rb.is_dynamic() && !sleep.is_some_and(|s| s.is_sleeping());
    (rb_a.is_dynamic() || rb_b.is_dynamic())
        && (awake_dynamic(rb_a, sleep_a) || awake_dynamic(rb_b, sleep_b))
}

/// Run the narrow phase over one candidate pair.
pub fn detect_pair(world: &hecs::World, pair: &CandidatePair) -> Option<Contact> {
    let mut query_a = world
        .query_one::<(&RigidBody, &Collider, &BodyState, Option<&SleepInfo>)>(pair.entity_a)
        .ok()?;
    let mut query_b = world
        .query_one::<(&RigidBody, &Collider, &BodyState, Option<&SleepInfo>)>(pair.entity_b)
        .ok()?;
    let (rb_a, collider_a, state_a, sleep_a) = query_a.get()?;
    let (rb_b, collider_b, state_b, sleep_b) = query_b.get()?;

    if !pair_is_active(rb_a, sleep_a, rb_b, sleep_b) {
        return None;
    }

    detect_collision(
        &collider_a.shape,
        state_a.transform(),
        &collider_b.shape,
        state_b.transform(),
    )
    .map(|info| Contact::new(pair.entity_a, pair.entity_b, info))
}

/// Filter candidates into contacts, preserving candidate order.
pub fn detect_contacts(world: &hecs::World, candidates: &[CandidatePair], contacts: &mut Vec<Contact>) {
    contacts.clear();
    for pair in candidates {
        if let Some(contact) = detect_pair(world, pair) {
            if !contact.depth.is_finite() {
                warn!(?pair, "non-finite contact depth, skipping");
                continue;
            }
            contacts.push(contact);
        }
    }
}
