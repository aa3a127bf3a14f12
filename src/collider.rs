use glam::Vec2;

use crate::api::NarrowphaseApi;
use crate::narrowphase::Narrowphase;
use crate::types::*;

/// Collider geometry in body-local space.
#[derive(Clone, Debug, PartialEq)]
pub enum ColliderShape {
    /// Circle around `offset` (relative to the body origin).
    Circle { radius: f32, offset: Vec2 },
    /// Segment between two local points.
    Line { start: Vec2, end: Vec2 },
    /// Convex polygon, either winding.
    Polygon { vertices: Vec<Vec2> },
}

/// Collider geometry after the owning body's transform has been applied.
#[derive(Clone, Debug, PartialEq)]
enum WorldShape {
    Circle { center: Vec2, radius: f32 },
    Line { points: [Vec2; 2] },
    Polygon { points: Vec<Vec2> },
}

/// A shape attached to a physics body.
///
/// World geometry and bounds are cached and only change through
/// [`Collider::initialize`] and [`Collider::reset`].
#[derive(Clone, Debug)]
pub struct Collider {
    shape: ColliderShape,
    /// `Layers::NONE` means "use the owning body's layers".
    layers: Layers,
    id: Option<ColliderId>,
    world: Option<WorldShape>,
    bounds: BoundingArea,
}

impl Collider {
    pub fn new(shape: ColliderShape) -> Self {
        Self { shape, layers: Layers::NONE, id: None, world: None, bounds: BoundingArea::empty() }
    }

    pub fn circle(radius: f32) -> Self {
        Self::new(ColliderShape::Circle { radius, offset: Vec2::ZERO })
    }

    pub fn circle_at(radius: f32, offset: Vec2) -> Self {
        Self::new(ColliderShape::Circle { radius, offset })
    }

    pub fn line(start: Vec2, end: Vec2) -> Self {
        Self::new(ColliderShape::Line { start, end })
    }

    pub fn polygon(vertices: Vec<Vec2>) -> Self {
        Self::new(ColliderShape::Polygon { vertices })
    }

    /// Axis-aligned rectangle of `size` centered on the body origin.
    pub fn rectangle(size: Vec2) -> Self {
        let h = size * 0.5;
        Self::polygon(vec![
            Vec2::new(-h.x, -h.y),
            Vec2::new(h.x, -h.y),
            Vec2::new(h.x, h.y),
            Vec2::new(-h.x, h.y),
        ])
    }

    pub fn with_layers(mut self, layers: Layers) -> Self {
        self.layers = layers;
        self
    }

    pub fn shape(&self) -> &ColliderShape {
        &self.shape
    }

    /// Layer override; `Layers::NONE` when the body's layers apply.
    pub fn layers(&self) -> Layers {
        self.layers
    }

    pub fn set_layers(&mut self, layers: Layers) {
        self.layers = layers;
    }

    /// Layers used for filtering, given the owning body's layers.
    pub fn effective_layers(&self, body_layers: Layers) -> Layers {
        if self.layers.is_empty() { body_layers } else { self.layers }
    }

    /// Identity assigned by `initialize`.
    pub fn id(&self) -> Option<ColliderId> {
        self.id
    }

    pub fn body(&self) -> Option<BodyId> {
        self.id.map(|id| id.body)
    }

    /// World-space bounds as of the last `initialize`/`reset`. Empty before that.
    pub fn bounding_area(&self) -> BoundingArea {
        self.bounds
    }

    /// Bind the collider to its owner and compute world geometry.
    pub fn initialize(&mut self, id: ColliderId, transform: &Transform) {
        self.id = Some(id);
        self.reset(transform);
    }

    /// Recompute the cached geometry after the owner's transform changed.
    pub fn reset(&mut self, transform: &Transform) {
        let world = match &self.shape {
            ColliderShape::Circle { radius, offset } => WorldShape::Circle {
                center: transform.transform_point(*offset),
                radius: *radius * transform.radial_scale(),
            },
            ColliderShape::Line { start, end } => WorldShape::Line {
                points: [transform.transform_point(*start), transform.transform_point(*end)],
            },
            ColliderShape::Polygon { vertices } => WorldShape::Polygon {
                points: vertices.iter().map(|v| transform.transform_point(*v)).collect(),
            },
        };
        self.bounds = match &world {
            WorldShape::Circle { center, radius } if radius.is_finite() && *radius > 0.0 => {
                BoundingArea::new(*center - Vec2::splat(*radius), *center + Vec2::splat(*radius))
            }
            WorldShape::Circle { .. } => BoundingArea::empty(),
            WorldShape::Line { points } => BoundingArea::from_points(points),
            WorldShape::Polygon { points } => BoundingArea::from_points(points),
        };
        self.world = Some(world);
    }

    /// Exact intersection test against `other`.
    ///
    /// Returns the collision as seen from this collider, or `None` when the
    /// shapes are apart, degenerate, or either collider is uninitialized.
    pub fn collides_with(&self, other: &Collider) -> Option<CollisionEventArgs> {
        let (first, second) = (self.id?, other.id?);
        if !self.bounds.overlaps(&other.bounds) {
            return None;
        }
        let contact = match (self.world.as_ref()?, other.world.as_ref()?) {
            (WorldShape::Circle { center: c0, radius: r0 }, WorldShape::Circle { center: c1, radius: r1 }) => {
                Narrowphase::circle_circle(*c0, *r0, *c1, *r1)
            }
            (WorldShape::Circle { center, radius }, WorldShape::Line { points }) => {
                Narrowphase::circle_segment(*center, *radius, points[0], points[1])
            }
            (WorldShape::Line { points }, WorldShape::Circle { center, radius }) => {
                Narrowphase::circle_segment(*center, *radius, points[0], points[1]).map(Contact::mirrored)
            }
            (WorldShape::Circle { center, radius }, WorldShape::Polygon { points }) => {
                Narrowphase::circle_polygon(*center, *radius, points)
            }
            (WorldShape::Polygon { points }, WorldShape::Circle { center, radius }) => {
                Narrowphase::circle_polygon(*center, *radius, points).map(Contact::mirrored)
            }
            (a, b) => Narrowphase::polygon_polygon(a.points()?, b.points()?),
        }?;
        Some(CollisionEventArgs::from_contact(first, second, contact))
    }

    /// Ray test against the cached world geometry.
    pub fn raycast(&self, origin: Vec2, direction: Vec2) -> Option<RayHit> {
        match self.world.as_ref()? {
            WorldShape::Circle { center, radius } => Narrowphase::ray_circle(origin, direction, *center, *radius),
            WorldShape::Line { points } => Narrowphase::ray_segment(origin, direction, points[0], points[1]),
            WorldShape::Polygon { points } => Narrowphase::ray_polygon(origin, direction, points),
        }
    }

    /// World-space endpoints of a line collider.
    pub fn world_line(&self) -> Option<(Vec2, Vec2)> {
        match self.world.as_ref()? {
            WorldShape::Line { points } => Some((points[0], points[1])),
            _ => None,
        }
    }
}

impl WorldShape {
    fn points(&self) -> Option<&[Vec2]> {
        match self {
            WorldShape::Line { points } => Some(points.as_slice()),
            WorldShape::Polygon { points } => Some(points.as_slice()),
            WorldShape::Circle { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placed(mut c: Collider, body: u32, pos: Vec2) -> Collider {
        c.initialize(ColliderId::new(BodyId(body), 0), &Transform::from_position(pos));
        c
    }

    #[test]
    fn test_uninitialized_collider_is_inert() {
        let a = Collider::circle(1.0);
        let b = placed(Collider::circle(1.0), 2, Vec2::ZERO);
        assert!(a.bounding_area().is_empty());
        assert!(a.collides_with(&b).is_none());
        assert!(b.collides_with(&a).is_none());
    }

    #[test]
    fn test_bounds_follow_transform() {
        let mut c = placed(Collider::circle(0.5), 1, Vec2::new(2.0, 3.0));
        assert_eq!(c.bounding_area(), BoundingArea::new(Vec2::new(1.5, 2.5), Vec2::new(2.5, 3.5)));
        c.reset(&Transform { position: Vec2::ZERO, rotation: 0.0, scale: Vec2::splat(2.0) });
        assert_eq!(c.bounding_area(), BoundingArea::new(Vec2::splat(-1.0), Vec2::splat(1.0)));
    }

    #[test]
    fn test_rotated_line_bounds() {
        let mut c = Collider::line(Vec2::ZERO, Vec2::new(2.0, 0.0));
        c.initialize(
            ColliderId::new(BodyId(1), 0),
            &Transform { position: Vec2::ZERO, rotation: std::f32::consts::FRAC_PI_2, scale: Vec2::ONE },
        );
        let area = c.bounding_area();
        assert!((area.maximum.y - 2.0).abs() < 1e-5);
        assert!(area.maximum.x.abs() < 1e-5);
    }

    #[test]
    fn test_circle_vs_line_both_directions() {
        let ball = placed(Collider::circle(0.5), 1, Vec2::new(0.0, 0.4));
        let floor = placed(Collider::line(Vec2::new(-3.0, 0.0), Vec2::new(3.0, 0.0)), 2, Vec2::ZERO);
        let hit = ball.collides_with(&floor).unwrap();
        assert_eq!(hit.first_collider.body, BodyId(1));
        assert!((hit.normal - Vec2::NEG_Y).length() < 1e-5);
        let back = floor.collides_with(&ball).unwrap();
        assert_eq!(back.first_collider.body, BodyId(2));
        assert!((back.normal - Vec2::Y).length() < 1e-5);
        assert!((back.minimum_translation_vector + hit.minimum_translation_vector).length() < 1e-5);
    }

    #[test]
    fn test_rectangle_vs_circle_mirrors_circle_vs_rectangle() {
        let rect = placed(Collider::rectangle(Vec2::splat(2.0)), 1, Vec2::ZERO);
        let ball = placed(Collider::circle(1.0), 2, Vec2::new(1.8, 0.0));
        let hit = rect.collides_with(&ball).unwrap();
        assert!((hit.normal - Vec2::X).length() < 1e-5);
        assert!((hit.minimum_translation_vector - Vec2::new(-0.2, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_line_vs_line_cross() {
        let a = placed(Collider::line(Vec2::new(-1.0, 0.0), Vec2::new(1.0, 0.0)), 1, Vec2::ZERO);
        let b = placed(Collider::line(Vec2::new(0.0, -1.0), Vec2::new(0.0, 1.0)), 2, Vec2::ZERO);
        assert!(a.collides_with(&b).is_some());
        let c = placed(Collider::line(Vec2::new(0.0, -1.0), Vec2::new(0.0, 1.0)), 3, Vec2::new(5.0, 0.0));
        assert!(a.collides_with(&c).is_none());
    }

    #[test]
    fn test_zero_radius_never_collides() {
        let a = placed(Collider::circle(0.0), 1, Vec2::ZERO);
        let b = placed(Collider::circle(1.0), 2, Vec2::ZERO);
        assert!(a.bounding_area().is_empty());
        assert!(a.collides_with(&b).is_none());
    }

    #[test]
    fn test_effective_layers() {
        let c = Collider::circle(1.0);
        assert_eq!(c.effective_layers(Layers::layer(2)), Layers::layer(2));
        let c = c.with_layers(Layers::layer(5));
        assert_eq!(c.effective_layers(Layers::layer(2)), Layers::layer(5));
    }
}
