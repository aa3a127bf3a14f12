//! clink: 2D physics core (tile colliders, broad phase, fixed-step resolution)

pub mod types;
pub mod api;
pub mod error;
pub mod config;
pub mod collider;
pub mod narrowphase;
pub mod tiles;
pub mod body;
pub mod broadphase;
pub mod resolver;
pub mod world;

pub use crate::types::*;
pub use crate::api::*;
pub use crate::body::{BodyKind, Dynamics, PhysicsBody, TileableConfig};
pub use crate::broadphase::ColliderTree;
pub use crate::collider::{Collider, ColliderShape};
pub use crate::config::PhysicsSettings;
pub use crate::error::ConfigError;
pub use crate::resolver::{DefaultCollisionResolver, ResolverKind, SeparatingCollisionResolver};
pub use crate::tiles::{CardinalDirections, EdgeLayers, TileGrid, TileLineSegment, TileMap};
pub use crate::world::PhysicsSystem;
