//! Blockfall - Simulation Core
//!
//! The real-time simulation core of a first-person voxel sandbox: player
//! movement against a block grid, block targeting, per-creature AI, and
//! combat resolution. Uses `bevy_ecs` for the entity-component-system
//! architecture; the host engine drives it through [`SimWorld`].

pub mod api;
pub mod components;
pub mod config;
pub mod physics;
pub mod raycast;
pub mod rng;
pub mod systems;
pub mod voxel;
pub mod world;

pub use api::{Interaction, SimWorld};
pub use components::*;
pub use config::{DeltaTime, SimConfig, SimTime};
pub use physics::PlayerState;
pub use raycast::{cast_ray, RayHit};
pub use rng::{ConstRng, GameRng, RandomSource, SimRng};
pub use systems::*;
pub use voxel::{Block, BlockDamage, Material, VoxelIndex};
pub use world::{
    CreatureSnapshot, Effect, EffectQueue, IdCounter, PlayerSnapshot, ProjectileSnapshot, Snapshot,
};
