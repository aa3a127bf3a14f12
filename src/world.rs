use glam::{IVec2, Vec2};

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Instant;

use crate::api::{CollisionResolver, PhysicsSystemApi, TileSource};
use crate::body::PhysicsBody;
use crate::broadphase::ColliderTree;
use crate::collider::Collider;
use crate::config::PhysicsSettings;
use crate::error::ConfigError;
use crate::types::*;

/// Fixed-timestep physics system.
///
/// Owns every registered body (in registration order), the collider tree
/// indexing their colliders, and the active collision resolver.
pub struct PhysicsSystem {
    settings: PhysicsSettings,
    bodies: Vec<PhysicsBody>,
    index_of: HashMap<BodyId, usize>,
    next_id: u32,
    tree: ColliderTree,
    resolver: Box<dyn CollisionResolver>,
    last_stats: TickStats,
}

/// Two distinct bodies borrowed mutably at once.
fn pair_mut(bodies: &mut [PhysicsBody], a: usize, b: usize) -> (&mut PhysicsBody, &mut PhysicsBody) {
    debug_assert_ne!(a, b);
    if a < b {
        let (lo, hi) = bodies.split_at_mut(b);
        (&mut lo[a], &mut hi[0])
    } else {
        let (lo, hi) = bodies.split_at_mut(a);
        (&mut hi[0], &mut lo[b])
    }
}

fn sync_tree(tree: &mut ColliderTree, body: &PhysicsBody) {
    tree.sync_body(body.id(), &body.collider_entries());
}

impl PhysicsSystemApi for PhysicsSystem {
    fn new(settings: PhysicsSettings) -> Self {
        let settings = match settings.validate() {
            Ok(()) => settings,
            Err(e) => {
                log::warn!("{}; falling back to default physics settings", e);
                PhysicsSettings::default()
            }
        };
        let resolver = settings.collision_resolver.build(&settings);
        Self {
            tree: ColliderTree::new(settings.cell_size),
            settings,
            bodies: Vec::new(),
            index_of: HashMap::new(),
            next_id: 0,
            resolver,
            last_stats: TickStats::default(),
        }
    }

    fn add_body(&mut self, mut body: PhysicsBody) -> BodyId {
        if self.next_id == BodyId::UNASSIGNED.0 {
            log::error!("body ids exhausted; registration refused");
            return BodyId::UNASSIGNED;
        }
        let id = BodyId(self.next_id);
        self.next_id += 1;
        body.initialize(id);
        sync_tree(&mut self.tree, &body);
        log::debug!(
            "registered body {:?} ({} colliders, dynamic: {}, trigger: {})",
            id,
            body.get_colliders().len(),
            body.is_dynamic(),
            body.is_trigger()
        );
        self.index_of.insert(id, self.bodies.len());
        self.bodies.push(body);
        id
    }

    fn remove_body(&mut self, id: BodyId) -> Option<PhysicsBody> {
        let idx = self.index_of.remove(&id)?;
        self.tree.remove_body(id);
        let body = self.bodies.remove(idx);
        for (i, b) in self.bodies.iter().enumerate().skip(idx) {
            self.index_of.insert(b.id(), i);
        }
        log::debug!("removed body {:?}", id);
        Some(body)
    }

    fn body(&self, id: BodyId) -> Option<&PhysicsBody> {
        self.index_of.get(&id).map(|&i| &self.bodies[i])
    }

    fn fixed_update(&mut self, time_step: f32) {
        let t_all = if self.settings.enable_timing { Some(Instant::now()) } else { None };
        let mut stats = TickStats::default();
        let mut handled: HashSet<BodyPair> = HashSet::new();
        let gravity = self.settings.gravity;
        for body in &mut self.bodies {
            body.clear_collisions();
        }

        for i in 0..self.bodies.len() {
            {
                let body = &mut self.bodies[i];
                if !body.has_collider() || !body.is_dynamic() {
                    continue;
                }
                let velocity = body.velocity();
                body.translate(velocity * time_step);
                if body.is_kinematic() {
                    body.set_velocity(velocity + gravity * time_step);
                }
                sync_tree(&mut self.tree, body);
            }
            stats.bodies_stepped += 1;
            let body_id = self.bodies[i].id();

            for c in 0..self.bodies[i].get_colliders().len() as u32 {
                let Some(collider) = self.bodies[i].collider(c) else { break };
                let Some(collider_id) = collider.id() else { continue };
                let candidates = self.tree.retrieve_potential_collisions(&collider.bounding_area());
                stats.candidates += candidates.len();

                for candidate in candidates {
                    if candidate == collider_id || candidate.body == body_id {
                        continue;
                    }
                    let Some(&j) = self.index_of.get(&candidate.body) else {
                        // Index and registry disagree; nothing to collide with
                        continue;
                    };
                    let pair = BodyPair::new(body_id, candidate.body);
                    if handled.contains(&pair) {
                        continue;
                    }
                    let (body, other) = (&self.bodies[i], &self.bodies[j]);
                    let (Some(collider), Some(other_collider)) = (body.collider(c), other.collider(candidate.index))
                    else {
                        continue;
                    };
                    let layers = collider.effective_layers(body.layers());
                    let other_layers = other_collider.effective_layers(other.layers());
                    if !self.settings.layers.should_collide(layers, other_layers) {
                        stats.layer_rejections += 1;
                        continue;
                    }
                    stats.narrowphase_tests += 1;
                    let Some(collision) = collider.collides_with(other_collider) else { continue };
                    stats.hits += 1;

                    let (body, other) = pair_mut(&mut self.bodies, i, j);
                    if !body.is_trigger() && !other.is_trigger() {
                        self.resolver.resolve_collision(&collision, body, other, time_step);
                        stats.resolutions += 1;
                        // Resolvers only move dynamic bodies
                        for moved in [&*body, &*other] {
                            if moved.is_dynamic() {
                                sync_tree(&mut self.tree, moved);
                            }
                        }
                    }
                    body.notify_collision_occurred(collision);
                    other.notify_collision_occurred(collision.mirrored());
                    handled.insert(pair);
                }
            }
        }

        if let Some(t_all) = t_all {
            stats.tick_ms = t_all.elapsed().as_secs_f64() * 1000.0;
        }
        log::trace!("fixed update: {:?}", stats);
        self.last_stats = stats;
    }

    fn drain_collisions(&mut self, id: BodyId) -> Vec<CollisionEventArgs> {
        match self.index_of.get(&id) {
            Some(&i) => self.bodies[i].drain_collisions(),
            None => Vec::new(),
        }
    }

    fn retrieve_potential_collisions(&self, area: &BoundingArea) -> Vec<ColliderId> {
        self.tree.retrieve_potential_collisions(area)
    }

    fn raycast(&self, origin: Vec2, direction: Vec2, max_distance: f32, layers: Layers) -> Option<RaycastHit> {
        let direction = direction.try_normalize()?;
        let mut best: Option<RaycastHit> = None;
        for id in self.tree.ray_candidates(origin, direction, max_distance) {
            let Some((body, collider)) = self.lookup(id) else { continue };
            if !layers.intersects(collider.effective_layers(body.layers())) {
                continue;
            }
            let Some(hit) = collider.raycast(origin, direction) else { continue };
            if hit.toi < 0.0 || hit.toi > max_distance {
                continue;
            }
            match &best {
                Some(b) if hit.toi >= b.distance => {}
                _ => {
                    best = Some(RaycastHit { collider: id, distance: hit.toi, normal: hit.normal, contact: hit.contact })
                }
            }
        }
        best
    }
}

impl PhysicsSystem {
    /// Build a system from a RON settings file.
    pub fn from_settings_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = PhysicsSettings::load(path)?;
        Ok(<Self as PhysicsSystemApi>::new(settings))
    }

    pub fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }

    /// Replace the settings. Invalid settings are rejected and the current ones kept.
    ///
    /// The resolver is rebuilt when the configured kind changes and the
    /// collider tree is rebuilt when the cell size changes.
    pub fn set_settings(&mut self, settings: PhysicsSettings) -> Result<(), ConfigError> {
        settings.validate()?;
        let previous = std::mem::replace(&mut self.settings, settings);
        if previous.collision_resolver != self.settings.collision_resolver {
            log::info!(
                "collision resolver changed from {:?} to {:?}",
                previous.collision_resolver,
                self.settings.collision_resolver
            );
            self.resolver = self.settings.collision_resolver.build(&self.settings);
        } else {
            self.resolver.initialize(&self.settings);
        }
        if previous.cell_size != self.settings.cell_size {
            self.tree = ColliderTree::new(self.settings.cell_size);
            for body in &self.bodies {
                sync_tree(&mut self.tree, body);
            }
        }
        Ok(())
    }

    /// Install a custom resolver. It is initialized with the current settings.
    pub fn set_collision_resolver(&mut self, mut resolver: Box<dyn CollisionResolver>) {
        resolver.initialize(&self.settings);
        self.resolver = resolver;
        log::info!("custom collision resolver installed");
    }

    /// Registered bodies in registration order.
    pub fn bodies(&self) -> impl Iterator<Item = &PhysicsBody> {
        self.bodies.iter()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Counters from the last `fixed_update`.
    pub fn last_stats(&self) -> TickStats {
        self.last_stats
    }

    pub fn tree_stats(&self) -> TreeStats {
        self.tree.stats()
    }

    /// Body and collider behind a collider id.
    pub fn lookup(&self, id: ColliderId) -> Option<(&PhysicsBody, &Collider)> {
        let body = self.body(id.body)?;
        Some((body, body.collider(id.index)?))
    }

    /// Colliders on any of `layers` whose bounds overlap `area`.
    pub fn query_area(&self, area: &BoundingArea, layers: Layers) -> Vec<ColliderId> {
        self.tree
            .retrieve_potential_collisions(area)
            .into_iter()
            .filter(|id| {
                self.lookup(*id)
                    .is_some_and(|(body, collider)| layers.intersects(collider.effective_layers(body.layers())))
            })
            .collect()
    }

    /// Apply `f` to a registered body and re-index its colliders.
    fn with_body<R>(&mut self, id: BodyId, f: impl FnOnce(&mut PhysicsBody) -> R) -> Option<R> {
        let &i = self.index_of.get(&id)?;
        let body = &mut self.bodies[i];
        let out = f(body);
        sync_tree(&mut self.tree, body);
        Some(out)
    }

    pub fn set_transform(&mut self, id: BodyId, transform: Transform) -> bool {
        self.with_body(id, |b| b.set_transform(transform)).is_some()
    }

    pub fn set_position(&mut self, id: BodyId, position: Vec2) -> bool {
        self.with_body(id, |b| b.set_position(position)).is_some()
    }

    /// False for unknown or non-dynamic bodies.
    pub fn set_velocity(&mut self, id: BodyId, velocity: Vec2) -> bool {
        match self.index_of.get(&id) {
            Some(&i) => self.bodies[i].set_velocity(velocity),
            None => false,
        }
    }

    /// Replace the collider of a simple body.
    pub fn set_collider(&mut self, id: BodyId, collider: Collider) -> bool {
        self.with_body(id, |b| b.set_collider(collider)).unwrap_or(false)
    }

    /// Attach a tile source to a tileable body and build its colliders.
    pub fn set_tile_source(&mut self, id: BodyId, source: Box<dyn TileSource>) -> bool {
        self.with_body(id, |b| b.set_tile_source(source)).unwrap_or(false)
    }

    /// Change one tile of a tileable body. Colliders are rebuilt when the tile set changed.
    pub fn set_tile(&mut self, id: BodyId, tile: IVec2, active: bool) -> bool {
        self.with_body(id, |b| {
            let changed = b.tile_source_mut().is_some_and(|source| source.set_tile(tile, active));
            if changed {
                b.rebuild_colliders();
            }
            changed
        })
        .unwrap_or(false)
    }

    /// Rebuild a tileable body's colliders after its tile source changed externally.
    pub fn notify_tiles_changed(&mut self, id: BodyId) -> bool {
        self.with_body(id, |b| {
            if b.is_tileable() {
                b.rebuild_colliders();
            }
            b.is_tileable()
        })
        .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::{EdgeLayers, TileGrid, TileMap};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DT: f32 = 1.0 / 60.0;

    fn system() -> PhysicsSystem {
        PhysicsSystem::new(PhysicsSettings { cell_size: 1.0, ..Default::default() })
    }

    fn floor() -> PhysicsBody {
        PhysicsBody::simple(Collider::line(Vec2::new(-5.0, 0.0), Vec2::new(5.0, 0.0)))
    }

    /// Counts calls and leaves the bodies alone.
    struct CountingResolver(Arc<AtomicUsize>);

    impl CollisionResolver for CountingResolver {
        fn initialize(&mut self, _settings: &PhysicsSettings) {}

        fn resolve_collision(
            &mut self,
            _collision: &CollisionEventArgs,
            _first: &mut PhysicsBody,
            _second: &mut PhysicsBody,
            _time_step: f32,
        ) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counting(sys: &mut PhysicsSystem) -> Arc<AtomicUsize> {
        let calls = Arc::new(AtomicUsize::new(0));
        sys.set_collision_resolver(Box::new(CountingResolver(calls.clone())));
        calls
    }

    #[test]
    fn test_register_and_remove() {
        let mut sys = system();
        let a = sys.add_body(PhysicsBody::simple(Collider::circle(0.5)));
        let b = sys.add_body(floor());
        let c = sys.add_body(PhysicsBody::simple(Collider::circle(0.5)).with_position(Vec2::new(3.0, 3.0)));
        assert_ne!(a, b);
        assert_eq!(sys.tree_stats().colliders, 3);
        assert!(sys.remove_body(b).is_some());
        assert!(sys.remove_body(b).is_none());
        assert_eq!(sys.tree_stats().colliders, 2);
        assert_eq!(sys.body(c).map(|body| body.id()), Some(c));
        let order: Vec<BodyId> = sys.bodies().map(|body| body.id()).collect();
        assert_eq!(order, vec![a, c]);
    }

    #[test]
    fn test_ball_comes_to_rest_on_floor() {
        let mut sys = system();
        let floor = sys.add_body(floor());
        let ball = sys.add_body(
            PhysicsBody::simple(Collider::circle(0.5)).with_position(Vec2::new(0.0, 2.0)).with_velocity(Vec2::ZERO).kinematic(),
        );
        let mut hits = Vec::new();
        let mut seen_by_floor = Vec::new();
        for _ in 0..240 {
            sys.fixed_update(DT);
            hits.extend(sys.drain_collisions(ball));
            seen_by_floor.extend(sys.drain_collisions(floor));
        }
        let body = sys.body(ball).unwrap();
        assert!((body.position().y - 0.5).abs() < 0.02, "ball at {}", body.position());
        assert!(body.velocity().length() < 0.2);
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|h| h.second_body() == floor && h.normal.y < -0.99));
        assert!(sys.drain_collisions(ball).is_empty());
        assert_eq!(seen_by_floor.len(), hits.len());
        assert_eq!(seen_by_floor[0], hits[0].mirrored());
    }

    #[test]
    fn test_undrained_inboxes_keep_only_latest_tick() {
        let mut sys = system();
        let floor = sys.add_body(floor());
        let ball = sys.add_body(
            PhysicsBody::simple(Collider::circle(0.5)).with_position(Vec2::new(0.0, 0.45)).with_velocity(Vec2::ZERO).kinematic(),
        );
        let mut ticks_with_hits = 0;
        for _ in 0..100 {
            sys.fixed_update(DT);
            ticks_with_hits += sys.last_stats().hits.min(1);
            assert!(sys.body(ball).unwrap().collisions().len() <= 1);
            assert!(sys.body(floor).unwrap().collisions().len() <= 1);
        }
        assert!(ticks_with_hits > 25);
        // A quiet tick empties them
        sys.set_position(ball, Vec2::new(0.0, 10.0));
        sys.set_velocity(ball, Vec2::ZERO);
        sys.set_settings(PhysicsSettings { gravity: Vec2::ZERO, ..Default::default() }).unwrap();
        sys.fixed_update(DT);
        assert!(sys.drain_collisions(ball).is_empty());
        assert!(sys.drain_collisions(floor).is_empty());
    }

    #[test]
    fn test_resolution_leaves_static_index_in_place() {
        let mut sys = system();
        let calls = counting(&mut sys);
        let block = sys.add_body(PhysicsBody::tileable(
            TileMap::from_rows(TileGrid::default(), &["########"]),
            EdgeLayers::default(),
        ));
        let colliders = sys.body(block).unwrap().get_colliders().len();
        let ball = sys.add_body(
            PhysicsBody::simple(Collider::circle(0.5)).with_position(Vec2::new(2.0, 1.3)).with_velocity(Vec2::ZERO),
        );
        sys.fixed_update(DT);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(sys.tree_stats().colliders, colliders + 1);
        let top = BoundingArea::new(Vec2::new(0.0, 0.9), Vec2::new(8.0, 1.1));
        let found = sys.retrieve_potential_collisions(&top);
        assert!(found.iter().any(|id| id.body == block));
        assert!(found.contains(&ColliderId::new(ball, 0)));
    }

    #[test]
    fn test_huge_line_collider_is_queryable() {
        let mut sys = system();
        let wall = sys.add_body(PhysicsBody::simple(Collider::line(Vec2::new(-1e10, 0.0), Vec2::new(1e10, 0.0))));
        let area = BoundingArea::new(Vec2::splat(-1e10), Vec2::splat(1e10));
        assert_eq!(sys.retrieve_potential_collisions(&area), vec![ColliderId::new(wall, 0)]);
        assert_eq!(sys.query_area(&area, Layers::ALL), vec![ColliderId::new(wall, 0)]);
    }

    #[test]
    fn test_add_body_refuses_when_ids_run_out() {
        let mut sys = system();
        sys.next_id = u32::MAX - 1;
        let last = sys.add_body(PhysicsBody::simple(Collider::circle(0.5)));
        assert_eq!(last, BodyId(u32::MAX - 1));
        let refused = sys.add_body(PhysicsBody::simple(Collider::circle(0.5)).with_position(Vec2::new(3.0, 0.0)));
        assert_eq!(refused, BodyId::UNASSIGNED);
        assert_eq!(sys.body_count(), 1);
        assert!(sys.body(BodyId::UNASSIGNED).is_none());
        assert_eq!(sys.tree_stats().colliders, 1);
    }

    #[test]
    fn test_pair_resolved_once_with_two_overlapping_colliders() {
        let mut sys = system();
        let calls = counting(&mut sys);
        let block = sys.add_body(PhysicsBody::tileable(
            TileMap::from_rows(TileGrid::default(), &["#"]),
            EdgeLayers::default(),
        ));
        // Overlaps both the top and the right edge near the corner
        let ball = sys.add_body(
            PhysicsBody::simple(Collider::circle(0.5)).with_position(Vec2::new(1.1, 1.1)).with_velocity(Vec2::ZERO),
        );
        sys.fixed_update(DT);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(sys.last_stats().hits, 1);
        assert_eq!(sys.drain_collisions(ball).len(), 1);
        assert_eq!(sys.drain_collisions(block).len(), 1);
    }

    #[test]
    fn test_two_dynamic_bodies_resolved_once() {
        let mut sys = system();
        let calls = counting(&mut sys);
        let a = sys.add_body(PhysicsBody::simple(Collider::circle(0.5)).with_velocity(Vec2::ZERO));
        let b = sys.add_body(
            PhysicsBody::simple(Collider::circle(0.5)).with_position(Vec2::new(0.8, 0.0)).with_velocity(Vec2::ZERO),
        );
        sys.fixed_update(DT);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(sys.last_stats().bodies_stepped, 2);
        let seen_by_a = sys.drain_collisions(a);
        let seen_by_b = sys.drain_collisions(b);
        assert_eq!(seen_by_a.len(), 1);
        assert_eq!(seen_by_b, vec![seen_by_a[0].mirrored()]);

        // A new tick starts with a fresh ledger
        sys.fixed_update(DT);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_trigger_is_notified_but_not_resolved() {
        let mut sys = system();
        let trigger = sys.add_body(PhysicsBody::simple(Collider::circle(0.5)).with_velocity(Vec2::X).as_trigger());
        let wall = sys.add_body(PhysicsBody::simple(Collider::circle(0.5)).with_position(Vec2::new(0.6, 0.0)));
        sys.fixed_update(DT);
        let t = sys.body(trigger).unwrap();
        assert_eq!(t.velocity(), Vec2::X);
        assert!((t.position().x - DT).abs() < 1e-6);
        assert_eq!(sys.body(wall).unwrap().position(), Vec2::new(0.6, 0.0));
        assert_eq!(sys.last_stats().resolutions, 0);
        let ev = sys.drain_collisions(trigger);
        assert_eq!(ev.len(), 1);
        assert_eq!(sys.drain_collisions(wall), vec![ev[0].mirrored()]);
    }

    #[test]
    fn test_layer_incompatible_pair_skips_narrowphase() {
        let mut settings = PhysicsSettings { cell_size: 1.0, ..Default::default() };
        settings.layers.set_should_collide(Layers::layer(1), Layers::layer(2), false);
        let mut sys = PhysicsSystem::new(settings);
        let a = sys.add_body(
            PhysicsBody::simple(Collider::circle(0.5)).with_velocity(Vec2::ZERO).with_layers(Layers::layer(1)),
        );
        let b = sys.add_body(
            PhysicsBody::simple(Collider::circle(0.5)).with_position(Vec2::new(0.5, 0.0)).with_layers(Layers::layer(2)),
        );
        sys.fixed_update(DT);
        let stats = sys.last_stats();
        assert_eq!(stats.narrowphase_tests, 0);
        assert_eq!(stats.layer_rejections, 1);
        assert!(sys.drain_collisions(a).is_empty());
        assert!(sys.drain_collisions(b).is_empty());
    }

    #[test]
    fn test_collider_layer_override_wins() {
        let mut settings = PhysicsSettings { cell_size: 1.0, ..Default::default() };
        settings.layers.set_should_collide(Layers::layer(1), Layers::layer(2), false);
        let mut sys = PhysicsSystem::new(settings);
        let a = sys.add_body(
            PhysicsBody::simple(Collider::circle(0.5).with_layers(Layers::layer(3)))
                .with_velocity(Vec2::ZERO)
                .with_layers(Layers::layer(1)),
        );
        sys.add_body(
            PhysicsBody::simple(Collider::circle(0.5)).with_position(Vec2::new(0.5, 0.0)).with_layers(Layers::layer(2)),
        );
        sys.fixed_update(DT);
        assert_eq!(sys.last_stats().narrowphase_tests, 1);
        assert_eq!(sys.drain_collisions(a).len(), 1);
    }

    #[test]
    fn test_static_bodies_are_not_stepped() {
        let mut sys = system();
        sys.add_body(PhysicsBody::simple(Collider::circle(0.5)));
        sys.add_body(PhysicsBody::simple(Collider::circle(0.5)).with_position(Vec2::new(0.5, 0.0)));
        sys.fixed_update(DT);
        assert_eq!(sys.last_stats(), TickStats::default());
    }

    #[test]
    fn test_tile_edit_rebuilds_index() {
        let mut sys = system();
        let map = TileMap::from_fn(TileGrid::default(), IVec2::ZERO, IVec2::new(4, 9), |t| (t.x + t.y) % 2 == 0);
        let board = sys.add_body(PhysicsBody::tileable(map, EdgeLayers::default()));
        assert_eq!(sys.body(board).unwrap().get_colliders().len(), 100);
        assert_eq!(sys.tree_stats().colliders, 100);

        // Fill the board: one solid block
        for y in 0..10 {
            for x in 0..5 {
                sys.set_tile(board, IVec2::new(x, y), true);
            }
        }
        assert_eq!(sys.body(board).unwrap().get_colliders().len(), 4);
        assert_eq!(sys.tree_stats().colliders, 4);
        assert!(!sys.set_tile(board, IVec2::new(0, 0), true));
        assert!(!sys.notify_tiles_changed(BodyId(999)));
    }

    #[test]
    fn test_tileable_source_attached_later() {
        let mut sys = system();
        let body = sys.add_body(PhysicsBody::tileable_without_source(EdgeLayers::default()));
        assert!(!sys.body(body).unwrap().has_collider());
        assert!(sys.set_tile_source(body, Box::new(TileMap::from_rows(TileGrid::default(), &["##"]))));
        assert_eq!(sys.tree_stats().colliders, 4);
    }

    #[test]
    fn test_set_position_moves_index_entry() {
        let mut sys = system();
        let ball = sys.add_body(PhysicsBody::simple(Collider::circle(0.5)));
        assert!(sys.set_position(ball, Vec2::new(20.0, 0.0)));
        let near_origin = BoundingArea::new(Vec2::splat(-1.0), Vec2::splat(1.0));
        assert!(sys.retrieve_potential_collisions(&near_origin).is_empty());
        let near_new = BoundingArea::new(Vec2::new(19.0, -1.0), Vec2::new(21.0, 1.0));
        assert_eq!(sys.retrieve_potential_collisions(&near_new), vec![ColliderId::new(ball, 0)]);
        assert!(!sys.set_position(BodyId(42), Vec2::ZERO));
        assert!(!sys.set_velocity(ball, Vec2::ONE));
    }

    #[test]
    fn test_set_collider_reindexes() {
        let mut sys = system();
        let body = sys.add_body(PhysicsBody::simple(Collider::circle(0.5)));
        assert!(sys.set_collider(body, Collider::rectangle(Vec2::new(10.0, 1.0))));
        let far = BoundingArea::new(Vec2::new(4.0, 0.0), Vec2::new(4.5, 0.2));
        assert_eq!(sys.retrieve_potential_collisions(&far), vec![ColliderId::new(body, 0)]);
    }

    #[test]
    fn test_raycast_hits_closest_on_layer() {
        let mut sys = system();
        let ground = sys.add_body(floor());
        let ledge = sys.add_body(
            PhysicsBody::simple(Collider::rectangle(Vec2::new(2.0, 0.5)))
                .with_position(Vec2::new(0.0, 2.0))
                .with_layers(Layers::layer(4)),
        );
        let hit = sys.raycast(Vec2::new(0.0, 5.0), Vec2::new(0.0, -3.0), 100.0, Layers::ALL).unwrap();
        assert_eq!(hit.collider.body, ledge);
        assert!((hit.distance - 2.75).abs() < 1e-4);
        assert!((hit.normal - Vec2::Y).length() < 1e-4);

        let hit = sys.raycast(Vec2::new(0.0, 5.0), Vec2::NEG_Y, 100.0, Layers::DEFAULT).unwrap();
        assert_eq!(hit.collider.body, ground);
        assert!((hit.distance - 5.0).abs() < 1e-4);
        assert!(sys.raycast(Vec2::new(0.0, 5.0), Vec2::NEG_Y, 4.0, Layers::DEFAULT).is_none());
        assert!(sys.raycast(Vec2::new(0.0, 5.0), Vec2::ZERO, 100.0, Layers::ALL).is_none());
    }

    #[test]
    fn test_query_area_filters_layers() {
        let mut sys = system();
        let a = sys.add_body(PhysicsBody::simple(Collider::circle(0.5)));
        sys.add_body(PhysicsBody::simple(Collider::circle(0.5)).with_layers(Layers::layer(6)));
        let area = BoundingArea::new(Vec2::splat(-1.0), Vec2::splat(1.0));
        assert_eq!(sys.retrieve_potential_collisions(&area).len(), 2);
        assert_eq!(sys.query_area(&area, Layers::DEFAULT), vec![ColliderId::new(a, 0)]);
    }

    #[test]
    fn test_settings_changes() {
        let mut sys = system();
        let ball = sys.add_body(PhysicsBody::simple(Collider::circle(0.5)));
        let bad = PhysicsSettings { time_step: 0.0, ..Default::default() };
        assert!(sys.set_settings(bad).is_err());
        assert_eq!(sys.settings().cell_size, 1.0);

        let next = PhysicsSettings {
            cell_size: 8.0,
            collision_resolver: crate::resolver::ResolverKind::Separating,
            ..Default::default()
        };
        sys.set_settings(next).unwrap();
        assert_eq!(sys.tree_stats().colliders, 1);
        let area = BoundingArea::new(Vec2::splat(-0.1), Vec2::splat(0.1));
        assert_eq!(sys.retrieve_potential_collisions(&area), vec![ColliderId::new(ball, 0)]);
    }

    #[test]
    fn test_invalid_settings_fall_back_to_defaults() {
        let sys = PhysicsSystem::new(PhysicsSettings { cell_size: -1.0, ..Default::default() });
        assert_eq!(sys.settings(), &PhysicsSettings::default());
    }

    #[test]
    fn test_from_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("physics.ron");
        std::fs::write(&path, "(gravity: (0.0, 0.0), enable_timing: true)").unwrap();
        let mut sys = PhysicsSystem::from_settings_file(&path).unwrap();
        assert_eq!(sys.settings().gravity, Vec2::ZERO);
        let ball = sys.add_body(PhysicsBody::simple(Collider::circle(0.5)).with_velocity(Vec2::ZERO).kinematic());
        sys.fixed_update(DT);
        assert_eq!(sys.body(ball).unwrap().velocity(), Vec2::ZERO);
        assert!(sys.last_stats().tick_ms >= 0.0);
        assert!(PhysicsSystem::from_settings_file(dir.path().join("missing.ron")).is_err());
    }
}
