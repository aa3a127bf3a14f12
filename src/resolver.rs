//! Collision response strategies.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::api::CollisionResolver;
use crate::body::PhysicsBody;
use crate::config::PhysicsSettings;
use crate::types::*;

/// Resolver selected by configuration.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolverKind {
    #[default]
    Default,
    Separating,
}

impl ResolverKind {
    /// Instantiate and initialize the selected resolver.
    pub fn build(self, settings: &PhysicsSettings) -> Box<dyn CollisionResolver> {
        let mut resolver: Box<dyn CollisionResolver> = match self {
            ResolverKind::Default => Box::new(DefaultCollisionResolver::default()),
            ResolverKind::Separating => Box::new(SeparatingCollisionResolver),
        };
        resolver.initialize(settings);
        resolver
    }
}

/// Share of the positional correction each body takes.
fn correction_shares(first: &PhysicsBody, second: &PhysicsBody) -> (f32, f32) {
    match (first.is_dynamic(), second.is_dynamic()) {
        (true, true) => (0.5, 0.5),
        (true, false) => (1.0, 0.0),
        (false, true) => (0.0, 1.0),
        (false, false) => (0.0, 0.0),
    }
}

/// Split `velocity` into its component along `normal` and the remainder.
fn decompose(velocity: Vec2, normal: Vec2) -> (Vec2, Vec2) {
    let along = normal * velocity.dot(normal);
    (along, velocity - along)
}

/// Positional correction, bounce and ground friction.
#[derive(Clone, Debug)]
pub struct DefaultCollisionResolver {
    /// Unit vector opposite to gravity; `None` in zero gravity.
    up: Option<Vec2>,
    groundedness: f32,
    stickiness: f32,
    minimum_post_bounce_magnitude: f32,
    minimum_post_friction_magnitude: f32,
}

impl Default for DefaultCollisionResolver {
    fn default() -> Self {
        let mut resolver = Self {
            up: None,
            groundedness: 0.0,
            stickiness: 0.0,
            minimum_post_bounce_magnitude: 0.0,
            minimum_post_friction_magnitude: 0.0,
        };
        resolver.initialize(&PhysicsSettings::default());
        resolver
    }
}

impl DefaultCollisionResolver {
    /// Whether a surface facing along `surface_normal` counts as ground.
    pub fn is_ground(&self, surface_normal: Vec2) -> bool {
        self.up.is_some_and(|up| 1.0 - up.dot(surface_normal) <= self.groundedness)
    }

    /// Velocity of a body after touching a surface.
    ///
    /// `into_surface` is the unit normal pointing from the body into what it hit.
    fn respond(&self, velocity: Vec2, into_surface: Vec2, material: PhysicsMaterial, grounded: bool) -> Vec2 {
        let (mut normal, mut tangent) = decompose(velocity, into_surface);
        if velocity.dot(into_surface) > 0.0 {
            normal = -normal * material.bounce;
            if normal.length() < self.minimum_post_bounce_magnitude {
                normal = Vec2::ZERO;
            }
        }
        if grounded {
            tangent *= 1.0 - material.friction;
            if tangent.length() < self.minimum_post_friction_magnitude {
                tangent = Vec2::ZERO;
            }
        }
        normal + tangent
    }
}

impl CollisionResolver for DefaultCollisionResolver {
    fn initialize(&mut self, settings: &PhysicsSettings) {
        self.up = (-settings.gravity).try_normalize();
        self.groundedness = settings.groundedness;
        self.stickiness = settings.stickiness.clamp(0.0, 1.0);
        self.minimum_post_bounce_magnitude = settings.minimum_post_bounce_magnitude;
        self.minimum_post_friction_magnitude = settings.minimum_post_friction_magnitude;
    }

    fn resolve_collision(
        &mut self,
        collision: &CollisionEventArgs,
        first: &mut PhysicsBody,
        second: &mut PhysicsBody,
        _time_step: f32,
    ) {
        let (first_share, second_share) = correction_shares(first, second);
        let material = first.material().combine(second.material());
        let n = collision.normal;
        let mtv = collision.minimum_translation_vector;

        if first.is_dynamic() {
            // First rests on the surface of second, which faces back along -n
            let grounded = self.is_ground(-n);
            let hold = if grounded { 1.0 - self.stickiness } else { 1.0 };
            first.translate(mtv * first_share * hold);
            let velocity = self.respond(first.velocity(), n, material, grounded);
            first.set_velocity(velocity);
        }
        if second.is_dynamic() {
            let grounded = self.is_ground(n);
            let hold = if grounded { 1.0 - self.stickiness } else { 1.0 };
            second.translate(-mtv * second_share * hold);
            let velocity = self.respond(second.velocity(), -n, material, grounded);
            second.set_velocity(velocity);
        }
    }
}

/// Push bodies apart and cancel their approaching normal speed. No bounce, no friction.
#[derive(Copy, Clone, Debug, Default)]
pub struct SeparatingCollisionResolver;

impl CollisionResolver for SeparatingCollisionResolver {
    fn initialize(&mut self, _settings: &PhysicsSettings) {}

    fn resolve_collision(
        &mut self,
        collision: &CollisionEventArgs,
        first: &mut PhysicsBody,
        second: &mut PhysicsBody,
        _time_step: f32,
    ) {
        let (first_share, second_share) = correction_shares(first, second);
        let n = collision.normal;
        let mtv = collision.minimum_translation_vector;
        for (body, offset, into_surface) in [(first, mtv * first_share, n), (second, -mtv * second_share, -n)] {
            if !body.is_dynamic() {
                continue;
            }
            body.translate(offset);
            let velocity = body.velocity();
            if velocity.dot(into_surface) > 0.0 {
                let (_, tangent) = decompose(velocity, into_surface);
                body.set_velocity(tangent);
            }
        }
    }
}
