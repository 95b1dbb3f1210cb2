//! Voxel spatial index.
//!
//! Hash map from integer grid coordinate to block record, giving O(1)
//! occupancy queries for collision, raycasting, and ground-snapping. The
//! index is always derived from the authoritative block collection owned by
//! the world collaborator: it is rebuilt on `set_blocks` and only mutated
//! through mining/placement operations that also surface effects.
//!
//! A block at integer coordinate `c` occupies the unit cube
//! `[c - 0.5, c + 0.5]` on each axis.

use crate::components::Vec3;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Overlap tests treat exact face contact as non-colliding.
const CONTACT_EPS: f32 = 1e-4;

/// Block material. Water and Cloud are the non-solid exceptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Material {
    Grass,
    Dirt,
    Stone,
    Sand,
    Wood,
    Leaves,
    Ore,
    Water,
    Cloud,
}

impl Material {
    pub fn is_solid(&self) -> bool {
        !matches!(self, Material::Water | Material::Cloud)
    }

    pub fn is_liquid(&self) -> bool {
        matches!(self, Material::Water)
    }

    /// Mining hit points, `None` for single-hit materials.
    pub fn durability(&self) -> Option<f32> {
        match self {
            Material::Stone => Some(30.0),
            Material::Ore => Some(50.0),
            Material::Wood => Some(20.0),
            _ => None,
        }
    }
}

/// A single block record. Plain serializable data so the save/load
/// collaborator can snapshot it directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: u64,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub material: Material,
    pub color: [f32; 3],
    /// Remaining mining hit points; `None` breaks in one hit.
    pub hit_points: Option<f32>,
}

impl Block {
    pub fn new(id: u64, x: i32, y: i32, z: i32, material: Material) -> Self {
        Self {
            id,
            x,
            y,
            z,
            material,
            color: [1.0, 1.0, 1.0],
            hit_points: material.durability(),
        }
    }

    pub fn cell(&self) -> (i32, i32, i32) {
        (self.x, self.y, self.z)
    }
}

/// Outcome of applying mining damage to a cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlockDamage {
    /// No block at the cell (stale cursor); treated as a miss.
    Absent,
    /// Partial damage persisted on the record.
    Damaged { id: u64, remaining: f32 },
    /// Block destroyed and removed from the index.
    Destroyed(Block),
}

/// Spatial index over the block collection.
#[derive(Resource, Debug, Default)]
pub struct VoxelIndex {
    map: HashMap<(i32, i32, i32), Block>,
}

impl VoxelIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grid cell containing a continuous position.
    #[inline]
    pub fn cell_of(p: Vec3) -> (i32, i32, i32) {
        (
            p.x.round() as i32,
            p.y.round() as i32,
            p.z.round() as i32,
        )
    }

    /// Rebuild from the authoritative block collection. Must be called
    /// whenever the world collaborator mutates it.
    pub fn rebuild(&mut self, blocks: &[Block]) {
        self.map.clear();
        for block in blocks {
            self.map.insert(block.cell(), *block);
        }
    }

    pub fn insert(&mut self, block: Block) {
        self.map.insert(block.cell(), block);
    }

    pub fn remove(&mut self, cell: (i32, i32, i32)) -> Option<Block> {
        self.map.remove(&cell)
    }

    pub fn block_at(&self, cell: (i32, i32, i32)) -> Option<&Block> {
        self.map.get(&cell)
    }

    #[inline]
    pub fn is_solid(&self, cell: (i32, i32, i32)) -> bool {
        self.map
            .get(&cell)
            .map(|b| b.material.is_solid())
            .unwrap_or(false)
    }

    #[inline]
    pub fn is_liquid(&self, cell: (i32, i32, i32)) -> bool {
        self.map
            .get(&cell)
            .map(|b| b.material.is_liquid())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Inclusive cell range strictly overlapped by `[lo, hi]` on one axis.
    /// Exact face contact does not count as overlap.
    #[inline]
    fn cell_range(lo: f32, hi: f32) -> (i32, i32) {
        (
            (lo - 0.5 + CONTACT_EPS).ceil() as i32,
            (hi + 0.5 - CONTACT_EPS).floor() as i32,
        )
    }

    /// Whether any solid block overlaps the AABB `[min, max]`.
    pub fn solid_in_aabb(&self, min: Vec3, max: Vec3) -> bool {
        let (x0, x1) = Self::cell_range(min.x, max.x);
        let (y0, y1) = Self::cell_range(min.y, max.y);
        let (z0, z1) = Self::cell_range(min.z, max.z);
        for y in y0..=y1 {
            for z in z0..=z1 {
                for x in x0..=x1 {
                    if self.is_solid((x, y, z)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Top surface of the highest solid block overlapping the AABB, if any.
    pub fn highest_solid_top(&self, min: Vec3, max: Vec3) -> Option<f32> {
        let (x0, x1) = Self::cell_range(min.x, max.x);
        let (y0, y1) = Self::cell_range(min.y, max.y);
        let (z0, z1) = Self::cell_range(min.z, max.z);
        let mut top: Option<f32> = None;
        for y in y0..=y1 {
            for z in z0..=z1 {
                for x in x0..=x1 {
                    if self.is_solid((x, y, z)) {
                        let surface = y as f32 + 0.5;
                        top = Some(top.map_or(surface, |t: f32| t.max(surface)));
                    }
                }
            }
        }
        top
    }

    /// Scan a column downward from `from_y` for the first solid cell.
    pub fn surface_y(&self, x: i32, z: i32, from_y: i32, floor_y: i32) -> Option<i32> {
        let mut y = from_y;
        while y >= floor_y {
            if self.is_solid((x, y, z)) {
                return Some(y);
            }
            y -= 1;
        }
        None
    }

    /// Apply mining damage to a cell. Partial damage persists on the stored
    /// record so multi-hit breaking accumulates.
    pub fn damage_block(&mut self, cell: (i32, i32, i32), amount: f32) -> BlockDamage {
        let Some(block) = self.map.get_mut(&cell) else {
            return BlockDamage::Absent;
        };
        match block.hit_points {
            None => {
                let broken = *block;
                self.map.remove(&cell);
                BlockDamage::Destroyed(broken)
            }
            Some(hp) => {
                let remaining = hp - amount;
                if remaining <= 0.0 {
                    let broken = *block;
                    self.map.remove(&cell);
                    BlockDamage::Destroyed(broken)
                } else {
                    block.hit_points = Some(remaining);
                    BlockDamage::Damaged {
                        id: block.id,
                        remaining,
                    }
                }
            }
        }
    }

    /// Liquid-tagged cells adjacent (horizontally) to the given cell.
    pub fn adjacent_liquid(&self, cell: (i32, i32, i32)) -> Vec<(i32, i32, i32)> {
        const OFFSETS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
        OFFSETS
            .iter()
            .map(|(dx, dz)| (cell.0 + dx, cell.1, cell.2 + dz))
            .filter(|c| self.is_liquid(*c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_floor(index: &mut VoxelIndex, y: i32, half: i32) {
        let mut id = 0;
        for x in -half..=half {
            for z in -half..=half {
                index.insert(Block::new(id, x, y, z, Material::Grass));
                id += 1;
            }
        }
    }

    #[test]
    fn test_rebuild_and_occupancy() {
        let blocks = vec![
            Block::new(1, 0, 0, 0, Material::Stone),
            Block::new(2, 1, 0, 0, Material::Water),
        ];
        let mut index = VoxelIndex::new();
        index.rebuild(&blocks);
        assert_eq!(index.len(), 2);
        assert!(index.is_solid((0, 0, 0)));
        assert!(!index.is_solid((1, 0, 0))); // liquid
        assert!(index.is_liquid((1, 0, 0)));
        assert!(!index.is_solid((5, 5, 5)));

        index.rebuild(&[]);
        assert!(index.is_empty());
    }

    #[test]
    fn test_cell_of_rounds_to_nearest() {
        assert_eq!(VoxelIndex::cell_of(Vec3::new(0.4, -0.4, 1.6)), (0, 0, 2));
        assert_eq!(VoxelIndex::cell_of(Vec3::new(-1.6, 0.0, 0.0)), (-2, 0, 0));
    }

    #[test]
    fn test_aabb_overlap_excludes_face_contact() {
        let mut index = VoxelIndex::new();
        index.insert(Block::new(1, 0, 0, 0, Material::Stone));

        // Box resting exactly on the top face does not overlap.
        let min = Vec3::new(-0.2, 0.5, -0.2);
        let max = Vec3::new(0.2, 2.0, 0.2);
        assert!(!index.solid_in_aabb(min, max));

        // Sunk slightly into the block does.
        let min = Vec3::new(-0.2, 0.4, -0.2);
        assert!(index.solid_in_aabb(min, max));
    }

    #[test]
    fn test_highest_solid_top() {
        let mut index = VoxelIndex::new();
        index.insert(Block::new(1, 0, 0, 0, Material::Stone));
        index.insert(Block::new(2, 0, 2, 0, Material::Stone));
        let top = index.highest_solid_top(Vec3::new(-0.3, -1.0, -0.3), Vec3::new(0.3, 3.0, 0.3));
        assert_eq!(top, Some(2.5));
    }

    #[test]
    fn test_surface_scan() {
        let mut index = VoxelIndex::new();
        flat_floor(&mut index, -2, 4);
        assert_eq!(index.surface_y(0, 0, 10, -40), Some(-2));
        assert_eq!(index.surface_y(100, 100, 10, -40), None);
    }

    #[test]
    fn test_block_damage_accumulates() {
        let mut index = VoxelIndex::new();
        index.insert(Block::new(7, 0, 0, 0, Material::Stone)); // 30 hp

        match index.damage_block((0, 0, 0), 10.0) {
            BlockDamage::Damaged { id, remaining } => {
                assert_eq!(id, 7);
                assert_eq!(remaining, 20.0);
            }
            other => panic!("expected Damaged, got {:?}", other),
        }
        // Partial damage persisted on the record.
        assert_eq!(index.block_at((0, 0, 0)).unwrap().hit_points, Some(20.0));

        index.damage_block((0, 0, 0), 10.0);
        match index.damage_block((0, 0, 0), 10.0) {
            BlockDamage::Destroyed(b) => assert_eq!(b.id, 7),
            other => panic!("expected Destroyed, got {:?}", other),
        }
        assert!(index.block_at((0, 0, 0)).is_none());
        assert_eq!(index.damage_block((0, 0, 0), 10.0), BlockDamage::Absent);
    }

    #[test]
    fn test_single_hit_material() {
        let mut index = VoxelIndex::new();
        index.insert(Block::new(3, 0, 0, 0, Material::Dirt));
        match index.damage_block((0, 0, 0), 1.0) {
            BlockDamage::Destroyed(broken) => {
                // The destroyed record compares equal to the inserted one.
                assert_eq!(broken, Block::new(3, 0, 0, 0, Material::Dirt));
            }
            other => panic!("expected Destroyed, got {:?}", other),
        }
    }

    #[test]
    fn test_adjacent_liquid() {
        let mut index = VoxelIndex::new();
        index.insert(Block::new(1, 1, 0, 0, Material::Water));
        index.insert(Block::new(2, -1, 0, 0, Material::Stone));
        let cells = index.adjacent_liquid((0, 0, 0));
        assert_eq!(cells, vec![(1, 0, 0)]);
    }
}
