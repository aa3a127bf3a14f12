use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Identifier of a registered physics body.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyId(pub u32);

impl BodyId {
    /// Placeholder carried by bodies that have not been registered yet.
    pub const UNASSIGNED: BodyId = BodyId(u32::MAX);
}

/// A collider is identified by its owning body and its slot in that body's collider list.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColliderId {
    pub body: BodyId,
    pub index: u32,
}

impl ColliderId {
    pub fn new(body: BodyId, index: u32) -> Self {
        Self { body, index }
    }
}

/// Unordered pair of bodies. `BodyPair::new(a, b) == BodyPair::new(b, a)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BodyPair(BodyId, BodyId);

impl BodyPair {
    pub fn new(a: BodyId, b: BodyId) -> Self {
        if a <= b { Self(a, b) } else { Self(b, a) }
    }

    pub fn contains(self, id: BodyId) -> bool {
        self.0 == id || self.1 == id
    }
}

/// Bitset of collision layers (16 layers).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Layers(pub u16);

impl Layers {
    pub const NONE: Layers = Layers(0);
    pub const DEFAULT: Layers = Layers(1);
    pub const ALL: Layers = Layers(u16::MAX);
    pub const COUNT: usize = 16;

    /// Single layer `n` (0-based). Out-of-range indices yield `NONE`.
    pub fn layer(n: usize) -> Layers {
        if n < Self::COUNT { Layers(1 << n) } else { Layers::NONE }
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn intersects(self, other: Layers) -> bool {
        (self.0 & other.0) != 0
    }

    /// Iterate over the indices of the set bits.
    pub fn indices(self) -> impl Iterator<Item = usize> {
        (0..Self::COUNT).filter(move |i| self.0 & (1 << i) != 0)
    }
}

impl std::ops::BitOr for Layers {
    type Output = Layers;
    fn bitor(self, rhs: Layers) -> Layers {
        Layers(self.0 | rhs.0)
    }
}

/// Project-wide layer collision matrix.
///
/// Row `i` holds the layers layer `i` may collide with. The matrix is kept
/// symmetric by [`LayerSettings::set_should_collide`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSettings {
    matrix: [u16; Layers::COUNT],
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self { matrix: [u16::MAX; Layers::COUNT] }
    }
}

impl LayerSettings {
    /// A matrix where no layer collides with any other.
    pub fn none() -> Self {
        Self { matrix: [0; Layers::COUNT] }
    }

    /// True if any layer in `a` may collide with any layer in `b`.
    pub fn should_collide(&self, a: Layers, b: Layers) -> bool {
        if a.is_empty() || b.is_empty() {
            return false;
        }
        a.indices().any(|i| (self.matrix[i] & b.0) != 0)
    }

    /// Allow or forbid collisions between every layer of `a` and every layer of `b`.
    pub fn set_should_collide(&mut self, a: Layers, b: Layers, collide: bool) {
        for i in a.indices() {
            for j in b.indices() {
                if collide {
                    self.matrix[i] |= 1 << j;
                    self.matrix[j] |= 1 << i;
                } else {
                    self.matrix[i] &= !(1 << j);
                    self.matrix[j] &= !(1 << i);
                }
            }
        }
    }
}

/// Axis-aligned world-space bounds.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingArea {
    pub minimum: Vec2,
    pub maximum: Vec2,
}

impl Default for BoundingArea {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoundingArea {
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Self { minimum: a.min(b), maximum: a.max(b) }
    }

    /// Bounds that overlap nothing; `combine` with it is the identity.
    pub fn empty() -> Self {
        Self { minimum: Vec2::splat(f32::INFINITY), maximum: Vec2::splat(f32::NEG_INFINITY) }
    }

    pub fn from_points(points: &[Vec2]) -> Self {
        points.iter().fold(Self::empty(), |acc, p| Self {
            minimum: acc.minimum.min(*p),
            maximum: acc.maximum.max(*p),
        })
    }

    pub fn is_empty(&self) -> bool {
        !(self.minimum.x <= self.maximum.x && self.minimum.y <= self.maximum.y)
    }

    /// Inclusive overlap test. Empty areas overlap nothing.
    pub fn overlaps(&self, other: &BoundingArea) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.minimum.x <= other.maximum.x
            && self.maximum.x >= other.minimum.x
            && self.minimum.y <= other.maximum.y
            && self.maximum.y >= other.minimum.y
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.minimum.x && p.x <= self.maximum.x && p.y >= self.minimum.y && p.y <= self.maximum.y
    }

    pub fn combine(&self, other: &BoundingArea) -> BoundingArea {
        BoundingArea {
            minimum: self.minimum.min(other.minimum),
            maximum: self.maximum.max(other.maximum),
        }
    }

    pub fn size(&self) -> Vec2 {
        if self.is_empty() { Vec2::ZERO } else { self.maximum - self.minimum }
    }
}

/// World transform of a body.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec2,
    /// Rotation in radians, counter-clockwise.
    pub rotation: f32,
    pub scale: Vec2,
}

impl Default for Transform {
    fn default() -> Self {
        Self { position: Vec2::ZERO, rotation: 0.0, scale: Vec2::ONE }
    }
}

impl Transform {
    pub fn from_position(position: Vec2) -> Self {
        Self { position, ..Default::default() }
    }

    /// Map a body-local point to world space (scale, then rotate, then translate).
    pub fn transform_point(&self, local: Vec2) -> Vec2 {
        self.position + Vec2::from_angle(self.rotation).rotate(local * self.scale)
    }

    /// Factor applied to radial sizes (circle radii) under non-uniform scale.
    pub fn radial_scale(&self) -> f32 {
        self.scale.x.abs().max(self.scale.y.abs())
    }
}

/// Surface response parameters of a body.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhysicsMaterial {
    /// Fraction of the approaching normal speed returned after impact, `[0, 1]`.
    pub bounce: f32,
    /// Fraction of tangential speed removed on ground contact, `[0, 1]`.
    pub friction: f32,
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        Self { bounce: 0.0, friction: 0.5 }
    }
}

impl PhysicsMaterial {
    pub fn new(bounce: f32, friction: f32) -> Self {
        Self { bounce: bounce.clamp(0.0, 1.0), friction: friction.clamp(0.0, 1.0) }
    }

    /// Material seen by a contact between two bodies.
    pub fn combine(self, other: PhysicsMaterial) -> PhysicsMaterial {
        PhysicsMaterial {
            bounce: 0.5 * (self.bounce + other.bounce),
            friction: 0.5 * (self.friction + other.friction),
        }
    }
}

/// Narrow-phase contact result between a first and a second shape.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Contact {
    /// Unit normal pointing from the first shape toward the second.
    pub normal: Vec2,
    /// Displacement that, applied to the first shape, separates the two.
    pub minimum_translation_vector: Vec2,
    pub first_contains_second: bool,
    pub second_contains_first: bool,
}

impl Contact {
    /// The same contact seen from the second shape.
    pub fn mirrored(self) -> Contact {
        Contact {
            normal: -self.normal,
            minimum_translation_vector: -self.minimum_translation_vector,
            first_contains_second: self.second_contains_first,
            second_contains_first: self.first_contains_second,
        }
    }
}

/// One detected collision, as delivered to a body.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CollisionEventArgs {
    pub first_collider: ColliderId,
    pub second_collider: ColliderId,
    /// Unit normal pointing from the first collider toward the second.
    pub normal: Vec2,
    /// Displacement that, applied to the first collider, separates the two.
    pub minimum_translation_vector: Vec2,
    pub first_contains_second: bool,
    pub second_contains_first: bool,
}

impl CollisionEventArgs {
    pub fn from_contact(first: ColliderId, second: ColliderId, contact: Contact) -> Self {
        Self {
            first_collider: first,
            second_collider: second,
            normal: contact.normal,
            minimum_translation_vector: contact.minimum_translation_vector,
            first_contains_second: contact.first_contains_second,
            second_contains_first: contact.second_contains_first,
        }
    }

    /// The event as the second collider's body sees it.
    pub fn mirrored(&self) -> CollisionEventArgs {
        CollisionEventArgs {
            first_collider: self.second_collider,
            second_collider: self.first_collider,
            normal: -self.normal,
            minimum_translation_vector: -self.minimum_translation_vector,
            first_contains_second: self.second_contains_first,
            second_contains_first: self.first_contains_second,
        }
    }

    pub fn first_body(&self) -> BodyId {
        self.first_collider.body
    }

    pub fn second_body(&self) -> BodyId {
        self.second_collider.body
    }
}

/// Ray intersection against a single shape.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayHit {
    /// Distance along the ray (in units of the direction vector's length).
    pub toi: f32,
    /// Surface normal at the hit, facing the ray origin.
    pub normal: Vec2,
    pub contact: Vec2,
}

/// Closest ray hit in a physics system.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RaycastHit {
    pub collider: ColliderId,
    pub distance: f32,
    pub normal: Vec2,
    pub contact: Vec2,
}

/// Counters for the last completed fixed update.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct TickStats {
    pub bodies_stepped: usize,
    /// Candidates returned by the collider tree (before any filtering).
    pub candidates: usize,
    pub layer_rejections: usize,
    pub narrowphase_tests: usize,
    pub hits: usize,
    pub resolutions: usize,
    /// Wall-clock duration of the tick, only measured when timing is enabled.
    pub tick_ms: f64,
}

/// Broad-phase occupancy numbers, for debugging and perf runs.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct TreeStats {
    pub colliders: usize,
    pub cells: usize,
    /// Sum of per-cell entry counts; exceeds `colliders` when entries span cells.
    pub cell_entries: usize,
}
