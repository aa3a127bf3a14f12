use std::fmt;

use glam::Vec2;

use crate::api::TileSource;
use crate::collider::Collider;
use crate::tiles::{EdgeLayers, build_tile_colliders};
use crate::types::*;

/// Where a tileable body takes its colliders from.
pub struct TileableConfig {
    pub source: Option<Box<dyn TileSource>>,
    pub edge_layers: EdgeLayers,
}

impl fmt::Debug for TileableConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileableConfig")
            .field("has_source", &self.source.is_some())
            .field("edge_layers", &self.edge_layers)
            .finish()
    }
}

/// Collider capability of a body.
#[derive(Debug)]
pub enum BodyKind {
    /// Exactly one collider.
    Simple(Collider),
    /// Line colliders derived from a tile grid's boundary.
    Tileable(TileableConfig),
}

/// Motion capability. Bodies without it never move on their own.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Dynamics {
    pub velocity: Vec2,
    /// Gravity-affected.
    pub is_kinematic: bool,
}

/// A participant in the physics simulation.
#[derive(Debug)]
pub struct PhysicsBody {
    id: BodyId,
    transform: Transform,
    layers: Layers,
    is_trigger: bool,
    material: PhysicsMaterial,
    kind: BodyKind,
    dynamics: Option<Dynamics>,
    colliders: Vec<Collider>,
    collisions: Vec<CollisionEventArgs>,
}

impl PhysicsBody {
    fn with_kind(kind: BodyKind) -> Self {
        Self {
            id: BodyId::UNASSIGNED,
            transform: Transform::default(),
            layers: Layers::DEFAULT,
            is_trigger: false,
            material: PhysicsMaterial::default(),
            kind,
            dynamics: None,
            colliders: Vec::new(),
            collisions: Vec::new(),
        }
    }

    /// Static body with a single collider.
    pub fn simple(collider: Collider) -> Self {
        Self::with_kind(BodyKind::Simple(collider))
    }

    /// Static body outlining the active tiles of `source`.
    pub fn tileable(source: impl TileSource + 'static, edge_layers: EdgeLayers) -> Self {
        Self::with_kind(BodyKind::Tileable(TileableConfig { source: Some(Box::new(source)), edge_layers }))
    }

    /// Tileable body with nothing to derive colliders from yet.
    pub fn tileable_without_source(edge_layers: EdgeLayers) -> Self {
        Self::with_kind(BodyKind::Tileable(TileableConfig { source: None, edge_layers }))
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.transform.position = position;
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Make the body dynamic, starting at `velocity`.
    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.dynamics.get_or_insert_with(Dynamics::default).velocity = velocity;
        self
    }

    /// Make the body dynamic and gravity-affected.
    pub fn kinematic(mut self) -> Self {
        self.dynamics.get_or_insert_with(Dynamics::default).is_kinematic = true;
        self
    }

    pub fn as_trigger(mut self) -> Self {
        self.is_trigger = true;
        self
    }

    pub fn with_layers(mut self, layers: Layers) -> Self {
        self.layers = layers;
        self
    }

    pub fn with_material(mut self, material: PhysicsMaterial) -> Self {
        self.material = material;
        self
    }

    // Capabilities ---------------------------------------------------------

    pub fn has_collider(&self) -> bool {
        !self.colliders.is_empty()
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamics.is_some()
    }

    pub fn is_kinematic(&self) -> bool {
        self.dynamics.is_some_and(|d| d.is_kinematic)
    }

    pub fn is_tileable(&self) -> bool {
        matches!(self.kind, BodyKind::Tileable(_))
    }

    pub fn is_trigger(&self) -> bool {
        self.is_trigger
    }

    // State -----------------------------------------------------------------

    pub fn id(&self) -> BodyId {
        self.id
    }

    pub fn kind(&self) -> &BodyKind {
        &self.kind
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn position(&self) -> Vec2 {
        self.transform.position
    }

    pub fn layers(&self) -> Layers {
        self.layers
    }

    pub fn material(&self) -> PhysicsMaterial {
        self.material
    }

    pub fn dynamics(&self) -> Option<&Dynamics> {
        self.dynamics.as_ref()
    }

    /// Zero for bodies without dynamics.
    pub fn velocity(&self) -> Vec2 {
        self.dynamics.map_or(Vec2::ZERO, |d| d.velocity)
    }

    /// Returns false (and changes nothing) if the body is not dynamic.
    pub fn set_velocity(&mut self, velocity: Vec2) -> bool {
        match self.dynamics.as_mut() {
            Some(d) => {
                d.velocity = velocity;
                true
            }
            None => false,
        }
    }

    /// Current colliders, in `ColliderId::index` order.
    pub fn get_colliders(&self) -> &[Collider] {
        &self.colliders
    }

    pub fn collider(&self, index: u32) -> Option<&Collider> {
        self.colliders.get(index as usize)
    }

    /// Union of all collider bounds.
    pub fn bounding_area(&self) -> BoundingArea {
        self.colliders.iter().fold(BoundingArea::empty(), |acc, c| acc.combine(&c.bounding_area()))
    }

    /// Index entries for the collider tree.
    pub fn collider_entries(&self) -> Vec<(ColliderId, BoundingArea)> {
        self.colliders.iter().filter_map(|c| Some((c.id()?, c.bounding_area()))).collect()
    }

    pub fn tile_source(&self) -> Option<&dyn TileSource> {
        match &self.kind {
            BodyKind::Tileable(config) => config.source.as_deref(),
            BodyKind::Simple(_) => None,
        }
    }

    pub fn tile_source_mut(&mut self) -> Option<&mut (dyn TileSource + 'static)> {
        match &mut self.kind {
            BodyKind::Tileable(config) => config.source.as_deref_mut(),
            BodyKind::Simple(_) => None,
        }
    }

    // Mutation --------------------------------------------------------------

    /// Bind to `id` and build colliders from the body's kind.
    pub fn initialize(&mut self, id: BodyId) {
        self.id = id;
        self.rebuild_colliders();
    }

    /// Regenerate the collider list from scratch.
    ///
    /// Tileable bodies re-derive their edges from the tile source; no
    /// previous segment survives.
    pub fn rebuild_colliders(&mut self) {
        let mut colliders = match &self.kind {
            BodyKind::Simple(collider) => vec![collider.clone()],
            BodyKind::Tileable(config) => match config.source.as_deref() {
                Some(source) => {
                    let built = build_tile_colliders(source, &config.edge_layers);
                    log::debug!("body {:?}: rebuilt {} tile colliders", self.id, built.len());
                    built
                }
                None => {
                    log::warn!("tileable body {:?} has no tile source; it has no colliders", self.id);
                    Vec::new()
                }
            },
        };
        for (index, collider) in colliders.iter_mut().enumerate() {
            collider.initialize(ColliderId::new(self.id, index as u32), &self.transform);
        }
        self.colliders = colliders;
    }

    /// Recompute cached collider geometry after a transform change.
    pub fn refresh_colliders(&mut self) {
        for collider in &mut self.colliders {
            collider.reset(&self.transform);
        }
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.refresh_colliders();
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.transform.position = position;
        self.refresh_colliders();
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.set_position(self.transform.position + delta);
    }

    /// Swap the collider of a simple body. Returns false for tileable bodies.
    pub fn set_collider(&mut self, collider: Collider) -> bool {
        match &mut self.kind {
            BodyKind::Simple(current) => *current = collider,
            BodyKind::Tileable(_) => return false,
        }
        self.rebuild_colliders();
        true
    }

    /// Attach or replace the tile source. Returns false for simple bodies.
    pub fn set_tile_source(&mut self, source: Box<dyn TileSource>) -> bool {
        match &mut self.kind {
            BodyKind::Tileable(config) => config.source = Some(source),
            BodyKind::Simple(_) => return false,
        }
        self.rebuild_colliders();
        true
    }

    // Collision inbox -------------------------------------------------------

    pub fn notify_collision_occurred(&mut self, collision: CollisionEventArgs) {
        self.collisions.push(collision);
    }

    /// Notifications received since the last drain, oldest first.
    pub fn collisions(&self) -> &[CollisionEventArgs] {
        &self.collisions
    }

    /// Take the pending notifications. A physics system clears every inbox
    /// at the start of each tick, so only the latest tick's events remain.
    pub fn drain_collisions(&mut self) -> Vec<CollisionEventArgs> {
        std::mem::take(&mut self.collisions)
    }

    pub(crate) fn clear_collisions(&mut self) {
        self.collisions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::{TileGrid, TileMap};
    use glam::IVec2;

    #[test]
    fn test_simple_body_capabilities() {
        let mut body = PhysicsBody::simple(Collider::circle(0.5)).with_velocity(Vec2::X).kinematic();
        assert!(!body.has_collider());
        body.initialize(BodyId(4));
        assert!(body.has_collider());
        assert!(body.is_dynamic());
        assert!(body.is_kinematic());
        assert!(!body.is_tileable());
        assert_eq!(body.get_colliders()[0].id(), Some(ColliderId::new(BodyId(4), 0)));
    }

    #[test]
    fn test_static_body_rejects_velocity() {
        let mut body = PhysicsBody::simple(Collider::circle(0.5));
        assert!(!body.set_velocity(Vec2::ONE));
        assert_eq!(body.velocity(), Vec2::ZERO);
    }

    #[test]
    fn test_translate_refreshes_bounds() {
        let mut body = PhysicsBody::simple(Collider::circle(1.0));
        body.initialize(BodyId(0));
        body.translate(Vec2::new(3.0, 0.0));
        assert_eq!(body.bounding_area(), BoundingArea::new(Vec2::new(2.0, -1.0), Vec2::new(4.0, 1.0)));
    }

    #[test]
    fn test_tileable_without_source_has_no_colliders() {
        let mut body = PhysicsBody::tileable_without_source(EdgeLayers::default());
        body.initialize(BodyId(1));
        assert!(body.is_tileable());
        assert!(!body.has_collider());
        assert!(body.bounding_area().is_empty());
    }

    #[test]
    fn test_tileable_rebuild_after_tile_change() {
        let map = TileMap::from_rows(TileGrid::default(), &["###"]);
        let mut body = PhysicsBody::tileable(map, EdgeLayers::default()).with_position(Vec2::new(10.0, 0.0));
        body.initialize(BodyId(2));
        assert_eq!(body.get_colliders().len(), 4);
        assert_eq!(body.bounding_area(), BoundingArea::new(Vec2::new(10.0, 0.0), Vec2::new(13.0, 1.0)));

        // Knock out the middle tile: two separate 1x1 blocks
        assert!(body.tile_source_mut().unwrap().set_tile(IVec2::new(1, 0), false));
        body.rebuild_colliders();
        assert_eq!(body.get_colliders().len(), 8);
        for (i, c) in body.get_colliders().iter().enumerate() {
            assert_eq!(c.id(), Some(ColliderId::new(BodyId(2), i as u32)));
        }
    }

    #[test]
    fn test_set_collider_only_for_simple_bodies() {
        let mut simple = PhysicsBody::simple(Collider::circle(1.0));
        simple.initialize(BodyId(0));
        assert!(simple.set_collider(Collider::rectangle(Vec2::splat(4.0))));
        assert_eq!(simple.bounding_area().size(), Vec2::splat(4.0));

        let mut tiles = PhysicsBody::tileable_without_source(EdgeLayers::default());
        assert!(!tiles.set_collider(Collider::circle(1.0)));
    }

    #[test]
    fn test_inbox_drains() {
        let mut body = PhysicsBody::simple(Collider::circle(1.0));
        let ev = CollisionEventArgs {
            first_collider: ColliderId::new(BodyId(0), 0),
            second_collider: ColliderId::new(BodyId(1), 0),
            normal: Vec2::X,
            minimum_translation_vector: Vec2::new(-0.1, 0.0),
            first_contains_second: false,
            second_contains_first: false,
        };
        body.notify_collision_occurred(ev);
        assert_eq!(body.collisions().len(), 1);
        assert_eq!(body.drain_collisions(), vec![ev]);
        assert!(body.collisions().is_empty());
    }
}
