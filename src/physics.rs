//! Player collision resolution and fixed-step integration.
//!
//! The player is an AABB swept against the voxel index one axis at a time,
//! in X, Z, Y order: tentatively displace the axis, test for overlap, and on
//! overlap revert the displacement and zero that velocity component. Axis
//! separation avoids corner tunneling at normal speeds and keeps each test
//! O(bbox volume in blocks). A reverted downward Y-move snaps the feet to
//! the supporting block top so resting height is exact.
//!
//! The integrator clamps the frame delta and drains an accumulator in fixed
//! steps, so per-tick displacement (and jump height) is identical at any
//! render rate.

use crate::components::Vec3;
use crate::config::SimConfig;
use crate::voxel::VoxelIndex;
use bevy_ecs::prelude::*;

/// Shaved off the top face so standing under an overhang does not falsely
/// register a ceiling hit.
const CEILING_EPS: f32 = 0.02;

/// Tolerance when deciding whether a block top can support the feet.
const SNAP_EPS: f32 = 1e-3;

/// Player movement state owned by this core. HP/hunger/inventory belong to
/// the player-state collaborator.
#[derive(Resource, Debug, Clone, Copy)]
pub struct PlayerState {
    /// Feet center.
    pub position: Vec3,
    pub velocity: Vec3,
    pub grounded: bool,
    /// Normalized view direction, set by the host each frame.
    pub view: Vec3,
    /// Respawn point applied atomically at the start of the next physics
    /// tick.
    pub pending_respawn: Option<Vec3>,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            grounded: false,
            view: Vec3::new(0.0, 0.0, -1.0),
            pending_respawn: None,
        }
    }
}

/// Player AABB at a feet position.
pub fn player_aabb(pos: Vec3, config: &SimConfig) -> (Vec3, Vec3) {
    let h = config.player_half_extent;
    (
        Vec3::new(pos.x - h, pos.y, pos.z - h),
        Vec3::new(pos.x + h, pos.y + config.player_height, pos.z + h),
    )
}

fn overlaps(index: &VoxelIndex, pos: Vec3, config: &SimConfig) -> bool {
    let (min, mut max) = player_aabb(pos, config);
    max.y -= CEILING_EPS;
    index.solid_in_aabb(min, max)
}

/// One collision-resolve step: gravity, then axis-separated sweep.
pub fn resolve(
    position: Vec3,
    velocity: Vec3,
    dt: f32,
    index: &VoxelIndex,
    config: &SimConfig,
) -> (Vec3, Vec3, bool) {
    let mut pos = position;
    let mut vel = velocity;
    let mut grounded = false;

    if dt <= 0.0 {
        return (pos, vel, grounded);
    }

    vel.y -= config.gravity * dt;

    // X axis.
    let dx = vel.x * dt;
    if dx != 0.0 {
        let candidate = Vec3::new(pos.x + dx, pos.y, pos.z);
        if overlaps(index, candidate, config) {
            vel.x = 0.0;
        } else {
            pos = candidate;
        }
    }

    // Z axis.
    let dz = vel.z * dt;
    if dz != 0.0 {
        let candidate = Vec3::new(pos.x, pos.y, pos.z + dz);
        if overlaps(index, candidate, config) {
            vel.z = 0.0;
        } else {
            pos = candidate;
        }
    }

    // Y axis.
    let dy = vel.y * dt;
    if dy != 0.0 {
        let candidate = Vec3::new(pos.x, pos.y + dy, pos.z);
        if overlaps(index, candidate, config) {
            if dy < 0.0 {
                // Landing: rest exactly on the supporting block top.
                let (cmin, cmax) = player_aabb(candidate, config);
                let under = Vec3::new(cmax.x, pos.y + SNAP_EPS, cmax.z);
                if let Some(top) = index.highest_solid_top(cmin, under) {
                    if top <= pos.y + SNAP_EPS {
                        pos.y = top;
                    }
                }
                grounded = true;
            }
            vel.y = 0.0;
        } else {
            pos = candidate;
        }
    }

    // Absolute floor so nothing falls through unloaded regions.
    if pos.y < config.world_floor_y {
        pos.y = config.world_floor_y;
        vel.y = 0.0;
        grounded = true;
    }

    (pos, vel, grounded)
}

/// Clamp the frame delta, accumulate it, and drain fixed-size resolve steps.
/// A pending respawn is applied atomically before any stepping.
pub fn integrate(
    player: &mut PlayerState,
    accumulator: &mut f32,
    frame_dt: f32,
    index: &VoxelIndex,
    config: &SimConfig,
) {
    if let Some(point) = player.pending_respawn.take() {
        player.position = point;
        player.velocity = Vec3::ZERO;
        player.grounded = false;
        *accumulator = 0.0;
    }

    let dt = frame_dt.clamp(0.0, config.max_frame_delta);
    *accumulator += dt;

    while *accumulator >= config.fixed_timestep {
        let (pos, vel, grounded) = resolve(
            player.position,
            player.velocity,
            config.fixed_timestep,
            index,
            config,
        );
        player.position = pos;
        player.velocity = vel;
        player.grounded = grounded;
        *accumulator -= config.fixed_timestep;
    }
}
