use glam::Vec2;

use crate::api::NarrowphaseApi;
use crate::types::*;

/// Below this, lengths and penetrations count as zero.
const EPS: f32 = 1e-6;

/// Narrowphase primitive tests.
pub struct Narrowphase;

impl NarrowphaseApi for Narrowphase {
    fn circle_circle(c0: Vec2, r0: f32, c1: Vec2, r1: f32) -> Option<Contact> {
        if !valid_radius(r0) || !valid_radius(r1) || !c0.is_finite() || !c1.is_finite() {
            return None;
        }
        let delta = c1 - c0;
        let dist2 = delta.length_squared();
        let rsum = r0 + r1;
        if dist2 >= rsum * rsum {
            return None;
        }
        let dist = dist2.sqrt();
        // Coincident centers have no preferred direction; pick +Y
        let normal = if dist > EPS { delta / dist } else { Vec2::Y };
        let depth = rsum - dist;
        if depth <= EPS {
            return None;
        }
        Some(Contact {
            normal,
            minimum_translation_vector: -normal * depth,
            first_contains_second: dist + r1 <= r0,
            second_contains_first: dist + r0 <= r1,
        })
    }

    fn circle_segment(c: Vec2, r: f32, a: Vec2, b: Vec2) -> Option<Contact> {
        if !valid_radius(r) || !c.is_finite() || !valid_segment(a, b) {
            return None;
        }
        let closest = closest_point_on_segment(a, b, c);
        let delta = closest - c;
        let dist2 = delta.length_squared();
        if dist2 >= r * r {
            return None;
        }
        let dist = dist2.sqrt();
        let normal = if dist > EPS {
            delta / dist
        } else {
            // Center lies on the segment: push out along the segment's perpendicular
            (b - a).perp().normalize()
        };
        let depth = r - dist;
        if depth <= EPS {
            return None;
        }
        let r2 = r * r;
        Some(Contact {
            normal,
            minimum_translation_vector: -normal * depth,
            first_contains_second: (a - c).length_squared() <= r2 && (b - c).length_squared() <= r2,
            second_contains_first: false,
        })
    }

    fn circle_polygon(c: Vec2, r: f32, polygon: &[Vec2]) -> Option<Contact> {
        if !valid_radius(r) || !c.is_finite() || !valid_polygon(polygon) {
            return None;
        }
        let mut axes = edge_normals(polygon);
        // The axis toward the nearest vertex catches corner contacts
        let nearest = polygon
            .iter()
            .copied()
            .min_by(|p, q| (*p - c).length_squared().total_cmp(&(*q - c).length_squared()))?;
        let to_vertex = nearest - c;
        if to_vertex.length_squared() > EPS * EPS {
            axes.push(to_vertex.normalize());
        }

        let mut best: Option<(f32, Vec2)> = None;
        for axis in axes {
            let (pmin, pmax) = project(polygon, axis);
            let center = c.dot(axis);
            let overlap = (center + r - pmin).min(pmax - (center - r));
            if overlap <= EPS {
                return None;
            }
            if best.is_none_or(|(d, _)| overlap < d) {
                best = Some((overlap, axis));
            }
        }
        let (depth, axis) = best?;
        let normal = orient(axis, centroid(polygon) - c);

        let r2 = r * r;
        let circle_contains = polygon.iter().all(|v| (*v - c).length_squared() <= r2);
        let polygon_contains = Self::point_in_polygon(c, polygon)
            && polygon
                .iter()
                .zip(polygon.iter().cycle().skip(1))
                .all(|(a, b)| (closest_point_on_segment(*a, *b, c) - c).length_squared() >= r2);
        Some(Contact {
            normal,
            minimum_translation_vector: -normal * depth,
            first_contains_second: circle_contains,
            second_contains_first: polygon_contains,
        })
    }

    fn polygon_polygon(p: &[Vec2], q: &[Vec2]) -> Option<Contact> {
        if !valid_shape(p) || !valid_shape(q) {
            return None;
        }
        let mut axes = separating_axes(p);
        axes.extend(separating_axes(q));

        let mut best: Option<(f32, Vec2)> = None;
        for axis in axes {
            let (pmin, pmax) = project(p, axis);
            let (qmin, qmax) = project(q, axis);
            let overlap = (pmax - qmin).min(qmax - pmin);
            if overlap <= EPS {
                return None;
            }
            if best.is_none_or(|(d, _)| overlap < d) {
                best = Some((overlap, axis));
            }
        }
        let (depth, axis) = best?;
        let normal = orient(axis, centroid(q) - centroid(p));
        Some(Contact {
            normal,
            minimum_translation_vector: -normal * depth,
            first_contains_second: p.len() >= 3 && q.iter().all(|v| Self::point_in_polygon(*v, p)),
            second_contains_first: q.len() >= 3 && p.iter().all(|v| Self::point_in_polygon(*v, q)),
        })
    }

    fn ray_circle(origin: Vec2, dir: Vec2, center: Vec2, r: f32) -> Option<RayHit> {
        // Solve ||origin + t*dir - center||^2 = r^2 for t >= 0
        let m = origin - center;
        let a = dir.length_squared();
        if a == 0.0 || !valid_radius(r) {
            return None;
        }
        let b = 2.0 * m.dot(dir);
        let c = m.length_squared() - r * r;
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return None;
        }
        let sqrt_disc = disc.sqrt();
        let t0 = (-b - sqrt_disc) / (2.0 * a);
        let t1 = (-b + sqrt_disc) / (2.0 * a);
        let t = if t0 >= 0.0 { t0 } else { t1 };
        if t < 0.0 {
            return None;
        }
        // Origin inside the circle: immediate hit with no meaningful normal
        if c <= 0.0 {
            return Some(RayHit { toi: 0.0, normal: Vec2::ZERO, contact: origin });
        }
        let contact = origin + dir * t;
        let n = contact - center;
        let len = n.length();
        let normal = if len > 0.0 { n / len } else { Vec2::ZERO };
        Some(RayHit { toi: t, normal, contact })
    }

    fn ray_segment(origin: Vec2, dir: Vec2, a: Vec2, b: Vec2) -> Option<RayHit> {
        if dir.length_squared() == 0.0 || !valid_segment(a, b) {
            return None;
        }
        let edge = b - a;
        let denom = dir.perp_dot(edge);
        if denom.abs() < EPS {
            // Parallel (collinear rays are treated as misses)
            return None;
        }
        let delta = a - origin;
        let t = delta.perp_dot(edge) / denom;
        let u = delta.perp_dot(dir) / denom;
        if t < 0.0 || !(0.0..=1.0).contains(&u) {
            return None;
        }
        let mut normal = edge.perp().normalize();
        if normal.dot(dir) > 0.0 {
            normal = -normal;
        }
        Some(RayHit { toi: t, normal, contact: origin + dir * t })
    }

    fn ray_polygon(origin: Vec2, dir: Vec2, polygon: &[Vec2]) -> Option<RayHit> {
        if !valid_polygon(polygon) || dir.length_squared() == 0.0 {
            return None;
        }
        if Self::point_in_polygon(origin, polygon) {
            return Some(RayHit { toi: 0.0, normal: Vec2::ZERO, contact: origin });
        }
        polygon
            .iter()
            .zip(polygon.iter().cycle().skip(1))
            .filter_map(|(a, b)| Self::ray_segment(origin, dir, *a, *b))
            .min_by(|h0, h1| h0.toi.total_cmp(&h1.toi))
    }

    fn point_in_circle(p: Vec2, c: Vec2, r: f32) -> bool {
        (p - c).length_squared() <= r * r
    }

    fn point_in_polygon(p: Vec2, polygon: &[Vec2]) -> bool {
        if !valid_polygon(polygon) {
            return false;
        }
        // Convex: inside iff the point is on the same side of every edge (either winding)
        let mut sign = 0.0f32;
        for (a, b) in polygon.iter().zip(polygon.iter().cycle().skip(1)) {
            let cross = (*b - *a).perp_dot(p - *a);
            if cross.abs() <= EPS {
                continue;
            }
            if sign == 0.0 {
                sign = cross.signum();
            } else if cross.signum() != sign {
                return false;
            }
        }
        true
    }
}

fn valid_radius(r: f32) -> bool {
    r.is_finite() && r > 0.0
}

fn valid_segment(a: Vec2, b: Vec2) -> bool {
    a.is_finite() && b.is_finite() && (b - a).length_squared() > EPS * EPS
}

fn valid_polygon(points: &[Vec2]) -> bool {
    points.len() >= 3 && points.iter().all(|p| p.is_finite()) && signed_area(points).abs() > EPS
}

/// Shoelace area, positive for counter-clockwise winding.
fn signed_area(points: &[Vec2]) -> f32 {
    let sum: f32 = points.iter().zip(points.iter().cycle().skip(1)).map(|(a, b)| a.perp_dot(*b)).sum();
    0.5 * sum
}

/// A polygon or a two-point segment.
fn valid_shape(points: &[Vec2]) -> bool {
    match points.len() {
        2 => valid_segment(points[0], points[1]),
        _ => valid_polygon(points),
    }
}

/// Closest point to `p` on segment `a..b`.
pub(crate) fn closest_point_on_segment(a: Vec2, b: Vec2, p: Vec2) -> Vec2 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= EPS * EPS {
        return a;
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    a + ab * t
}

fn project(points: &[Vec2], axis: Vec2) -> (f32, f32) {
    points.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), p| {
        let d = p.dot(axis);
        (lo.min(d), hi.max(d))
    })
}

fn centroid(points: &[Vec2]) -> Vec2 {
    points.iter().copied().sum::<Vec2>() / points.len() as f32
}

fn edge_normals(polygon: &[Vec2]) -> Vec<Vec2> {
    polygon
        .iter()
        .zip(polygon.iter().cycle().skip(1))
        .filter_map(|(a, b)| (*b - *a).perp().try_normalize())
        .collect()
}

/// Edge normals, plus the direction for segments so collinear segments separate.
fn separating_axes(points: &[Vec2]) -> Vec<Vec2> {
    if points.len() == 2 {
        let dir = (points[1] - points[0]).normalize();
        vec![dir.perp(), dir]
    } else {
        edge_normals(points)
    }
}

/// Flip `axis` so it points along `toward` (ties keep the axis).
fn orient(axis: Vec2, toward: Vec2) -> Vec2 {
    if axis.dot(toward) < 0.0 { -axis } else { axis }
}
