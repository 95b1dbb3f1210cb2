//! Voxel ray march for block targeting.
//!
//! Marches the ray in small fixed steps, rounding each sample to the nearest
//! grid cell and probing the index. The entered face is inferred by comparing
//! the previous sample's cell to the hit cell per axis. This is a sampling
//! approximation, not an exact line-voxel traversal; the step size stays well
//! below one block so thin walls are not skipped.
//!
//! Block targeting only — creature hit-detection uses the cone+range test in
//! the combat module.

use crate::components::Vec3;
use crate::voxel::{Block, VoxelIndex};

/// March step in world units; must stay below the one-block feature size.
const STEP: f32 = 0.1;

/// Result of a successful cast.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    pub block: Block,
    /// Unit normal of the entered face, `None` when the origin started
    /// inside the block.
    pub face: Option<[i32; 3]>,
    pub distance: f32,
}

/// Cast a ray and return the first solid block, its entered face, and the
/// distance to the sample that hit it. Returns `None` for a degenerate
/// direction or when nothing solid lies within `max_distance`.
pub fn cast_ray(
    origin: Vec3,
    direction: Vec3,
    index: &VoxelIndex,
    max_distance: f32,
) -> Option<RayHit> {
    let dir = direction.normalized();
    if dir == Vec3::ZERO || !origin.is_finite() {
        return None;
    }

    let start_cell = VoxelIndex::cell_of(origin);
    if index.is_solid(start_cell) {
        let block = *index.block_at(start_cell)?;
        return Some(RayHit {
            block,
            face: None,
            distance: 0.0,
        });
    }

    let mut prev_cell = start_cell;
    let mut travelled = STEP;
    while travelled <= max_distance {
        let sample = origin + dir * travelled;
        let cell = VoxelIndex::cell_of(sample);
        if index.is_solid(cell) {
            let block = *index.block_at(cell)?;
            return Some(RayHit {
                block,
                face: entered_face(prev_cell, cell, dir),
                distance: travelled,
            });
        }
        prev_cell = cell;
        travelled += STEP;
    }
    None
}

/// The axis whose rounded coordinate changed across the step boundary. When
/// the step crossed more than one axis, the dominant ray axis among them
/// wins.
fn entered_face(prev: (i32, i32, i32), hit: (i32, i32, i32), dir: Vec3) -> Option<[i32; 3]> {
    let deltas = [
        (prev.0 - hit.0, dir.x.abs(), 0usize),
        (prev.1 - hit.1, dir.y.abs(), 1usize),
        (prev.2 - hit.2, dir.z.abs(), 2usize),
    ];
    deltas
        .iter()
        .filter(|(d, _, _)| *d != 0)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(d, _, axis)| {
            let mut normal = [0i32; 3];
            normal[*axis] = d.signum();
            normal
        })
}
