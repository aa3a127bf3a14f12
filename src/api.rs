use glam::{IVec2, Vec2};

use crate::body::PhysicsBody;
use crate::config::PhysicsSettings;
use crate::types::*;

/// Public API contract for the fixed-timestep physics system.
pub trait PhysicsSystemApi {
    /// Construct a new system with the given settings.
    fn new(settings: PhysicsSettings) -> Self
    where
        Self: Sized;

    // --- Registry ----------------------------------------------------------

    /// Register a body, build its colliders and index them. Returns its id,
    /// or `BodyId::UNASSIGNED` once the id space is exhausted.
    fn add_body(&mut self, body: PhysicsBody) -> BodyId;

    /// Unregister a body and drop its colliders from the index.
    fn remove_body(&mut self, id: BodyId) -> Option<PhysicsBody>;

    /// Look up a registered body.
    fn body(&self, id: BodyId) -> Option<&PhysicsBody>;

    // --- Simulation --------------------------------------------------------

    /// Advance the simulation by one fixed tick.
    fn fixed_update(&mut self, time_step: f32);

    /// Take the collision notifications delivered to `id` during the most
    /// recent tick. Inboxes are cleared when the next tick starts, so events
    /// not drained between ticks are dropped.
    fn drain_collisions(&mut self, id: BodyId) -> Vec<CollisionEventArgs>;

    // --- Queries -----------------------------------------------------------

    /// Colliders whose bounds may overlap `area` (broad phase only).
    fn retrieve_potential_collisions(&self, area: &BoundingArea) -> Vec<ColliderId>;

    /// Closest collider hit by the ray, among colliders on `layers`.
    fn raycast(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        layers: Layers,
    ) -> Option<RaycastHit>;
}

/// Exact shape-vs-shape and ray tests.
///
/// Every contact test reports the normal from the first shape toward the
/// second and the translation that moves the first shape out of the second.
/// Degenerate input yields `None`.
pub trait NarrowphaseApi {
    // Overlaps --------------------------------------------------------------

    fn circle_circle(c0: Vec2, r0: f32, c1: Vec2, r1: f32) -> Option<Contact>;
    fn circle_segment(c: Vec2, r: f32, a: Vec2, b: Vec2) -> Option<Contact>;
    fn circle_polygon(c: Vec2, r: f32, polygon: &[Vec2]) -> Option<Contact>;
    /// Convex polygons; a two-point slice is treated as a line segment.
    fn polygon_polygon(p: &[Vec2], q: &[Vec2]) -> Option<Contact>;

    // Rays ------------------------------------------------------------------

    fn ray_circle(origin: Vec2, dir: Vec2, center: Vec2, r: f32) -> Option<RayHit>;
    fn ray_segment(origin: Vec2, dir: Vec2, a: Vec2, b: Vec2) -> Option<RayHit>;
    fn ray_polygon(origin: Vec2, dir: Vec2, polygon: &[Vec2]) -> Option<RayHit>;

    // Points ----------------------------------------------------------------

    fn point_in_circle(p: Vec2, c: Vec2, r: f32) -> bool;
    fn point_in_polygon(p: Vec2, polygon: &[Vec2]) -> bool;
}

/// Strategy that turns a confirmed collision into a physical response.
///
/// Exactly one resolver is active on a physics system. Resolvers mutate the
/// bodies' transforms and velocities only; notifications are the caller's job.
pub trait CollisionResolver: Send {
    /// Capture the tunables this resolver depends on.
    fn initialize(&mut self, settings: &PhysicsSettings);

    /// Respond to `collision`. `first` owns `collision.first_collider`.
    fn resolve_collision(
        &mut self,
        collision: &CollisionEventArgs,
        first: &mut PhysicsBody,
        second: &mut PhysicsBody,
        time_step: f32,
    );
}

/// Grid of tiles a tileable body derives its colliders from.
pub trait TileSource: Send {
    fn has_active_tile_at(&self, tile: IVec2) -> bool;

    /// Lowest active tile coordinate (inclusive). Meaningless when empty.
    fn minimum_tile(&self) -> IVec2;

    /// Highest active tile coordinate (inclusive). Meaningless when empty.
    fn maximum_tile(&self) -> IVec2;

    /// Body-local position of the lower-left corner of `tile`.
    fn tile_position(&self, tile: IVec2) -> Vec2;

    /// Activate or clear a tile. Returns true if the tile set changed.
    fn set_tile(&mut self, tile: IVec2, active: bool) -> bool;

    fn is_empty(&self) -> bool {
        let (min, max) = (self.minimum_tile(), self.maximum_tile());
        min.x > max.x || min.y > max.y
    }

    /// Visit every active tile, row by row from the lowest `y`, each row by
    /// ascending `x`. The default scans the whole bounding rectangle; sparse
    /// sources should override it.
    fn for_each_active_tile(&self, f: &mut dyn FnMut(IVec2)) {
        if self.is_empty() {
            return;
        }
        let (min, max) = (self.minimum_tile(), self.maximum_tile());
        for y in min.y..=max.y {
            for x in min.x..=max.x {
                let tile = IVec2::new(x, y);
                if self.has_active_tile_at(tile) {
                    f(tile);
                }
            }
        }
    }
}
