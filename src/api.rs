//! Host-facing simulation API.
//!
//! `SimWorld` owns the ECS world and two schedules: a per-frame schedule for
//! projectile flight and a throttled AI schedule for behavior dispatch and
//! enemy attacks. The host calls `advance_physics` and `advance_world` each
//! render frame, routes player input through `interact`, and reads results
//! back through `snapshot`, which also drains the effect queue.

use crate::components::*;
use crate::config::{DeltaTime, SimConfig, SimTime};
use crate::physics::{self, PlayerState};
use crate::raycast::cast_ray;
use crate::rng::{RandomSource, SimRng};
use crate::systems::behavior::{behavior_apply_system, behavior_gather_system, PendingDecisions};
use crate::systems::combat::{
    self, enemy_attack_system, player_fire_bow, player_melee_attack, AttackQueue, Loadout,
};
use crate::systems::projectile::projectile_system;
use crate::voxel::{Block, BlockDamage, VoxelIndex};
use crate::world::{Effect, EffectQueue, IdCounter, PlayerSnapshot, Snapshot};
use bevy_ecs::prelude::*;

/// Block interaction reach in world units.
const REACH: f32 = 8.0;

/// A player interaction routed from the host's input layer.
#[derive(Debug, Clone, Copy)]
pub enum Interaction {
    /// Swing at the block under the targeting ray.
    Mine { origin: Vec3, direction: Vec3 },
    /// Place a block into an empty cell.
    Place { block: Block },
    /// Melee swing along the facing direction.
    Attack { facing: Vec3 },
    /// Fire the bow (auto-targeted).
    Fire,
}

/// The simulation core. Owns all entity and player state; the host owns
/// rendering, input, inventory, and progression.
pub struct SimWorld {
    world: World,
    frame_schedule: Schedule,
    ai_schedule: Schedule,
    tick: u64,
    time: f32,
    physics_accumulator: f32,
    last_dispatch: f32,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWorld {
    pub fn new() -> Self {
        Self::with_config(SimConfig::default())
    }

    pub fn with_config(config: SimConfig) -> Self {
        let mut world = World::new();
        world.insert_resource(config);
        world.insert_resource(SimTime::default());
        world.insert_resource(DeltaTime::default());
        world.insert_resource(VoxelIndex::new());
        world.insert_resource(PlayerState::default());
        world.insert_resource(Loadout::default());
        world.insert_resource(SimRng::default());
        world.insert_resource(EffectQueue::default());
        world.insert_resource(AttackQueue::default());
        world.insert_resource(PendingDecisions::default());
        world.insert_resource(IdCounter::default());

        let mut frame_schedule = Schedule::default();
        frame_schedule.add_systems(projectile_system);

        let mut ai_schedule = Schedule::default();
        ai_schedule.add_systems(
            (
                behavior_gather_system,
                behavior_apply_system,
                enemy_attack_system,
            )
                .chain(),
        );

        Self {
            world,
            frame_schedule,
            ai_schedule,
            tick: 0,
            time: 0.0,
            physics_accumulator: 0.0,
            last_dispatch: 0.0,
        }
    }

    /// Replace the random source; tests use this to pin rolls.
    pub fn set_random_source(&mut self, source: impl RandomSource) {
        self.world.insert_resource(SimRng::new(source));
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn current_time(&self) -> f32 {
        self.time
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    // ------------------------------------------------------------------
    // World state
    // ------------------------------------------------------------------

    /// Rebuild the spatial index from the host's authoritative block
    /// collection.
    pub fn set_blocks(&mut self, blocks: &[Block]) {
        self.world.resource_mut::<VoxelIndex>().rebuild(blocks);
        log::debug!("voxel index rebuilt with {} blocks", blocks.len());
    }

    pub fn block_count(&self) -> usize {
        self.world.resource::<VoxelIndex>().len()
    }

    pub fn spawn_creature(&mut self, kind: CreatureKind, position: Vec3) -> u32 {
        let id = self.world.resource_mut::<IdCounter>().alloc_creature();
        self.world.spawn(CreatureBundle::new(id, kind, position));
        id
    }

    pub fn despawn_creature(&mut self, id: u32) -> bool {
        let mut query = self.world.query::<(Entity, &CreatureId)>();
        let found = query
            .iter(&self.world)
            .find(|(_, cid)| cid.0 == id)
            .map(|(entity, _)| entity);
        match found {
            Some(entity) => {
                self.world.despawn(entity);
                true
            }
            None => false,
        }
    }

    pub fn creature_count(&mut self) -> usize {
        let mut query = self.world.query::<&CreatureId>();
        query.iter(&self.world).count()
    }

    /// Search for a spawnable surface point within `radius` of `center`:
    /// bounded random probes, each dropped onto the first solid column top.
    pub fn find_spawn_point(&mut self, center: Vec3, radius: f32) -> Option<Vec3> {
        let config = self.world.resource::<SimConfig>().clone();
        let mut result = None;
        self.world.resource_scope(|world, mut rng: Mut<SimRng>| {
            let index = world.resource::<VoxelIndex>();
            for _ in 0..config.spawn_attempts {
                let x = center.x + rng.0.range(-radius, radius);
                let z = center.z + rng.0.range(-radius, radius);
                let cell = VoxelIndex::cell_of(Vec3::new(x, center.y, z));
                let from_y = cell.1 + 16;
                if let Some(surface) =
                    index.surface_y(cell.0, cell.2, from_y, config.world_floor_y as i32)
                {
                    result = Some(Vec3::new(x, surface as f32 + 0.5, z));
                    break;
                }
            }
        });
        if result.is_none() {
            log::debug!("no spawn point found near ({:.1}, {:.1})", center.x, center.z);
        }
        result
    }

    // ------------------------------------------------------------------
    // Player state
    // ------------------------------------------------------------------

    pub fn player(&self) -> PlayerSnapshot {
        PlayerSnapshot::from(self.world.resource::<PlayerState>())
    }

    /// Set the normalized view direction. Degenerate vectors are ignored.
    pub fn set_view(&mut self, direction: Vec3) {
        let dir = direction.normalized();
        if dir != Vec3::ZERO && dir.is_finite() {
            self.world.resource_mut::<PlayerState>().view = dir;
        }
    }

    /// Set the player's horizontal movement intent; Y is preserved for
    /// gravity and jumps.
    pub fn set_move_velocity(&mut self, x: f32, z: f32) {
        let mut player = self.world.resource_mut::<PlayerState>();
        player.velocity.x = x;
        player.velocity.z = z;
    }

    /// Jump if grounded.
    pub fn jump(&mut self, speed: f32) {
        let mut player = self.world.resource_mut::<PlayerState>();
        if player.grounded {
            player.velocity.y = speed;
            player.grounded = false;
        }
    }

    pub fn set_loadout(&mut self, loadout: Loadout) {
        self.world.insert_resource(loadout);
    }

    pub fn loadout(&self) -> Loadout {
        *self.world.resource::<Loadout>()
    }

    /// Queue a respawn above the given surface point, applied atomically at
    /// the start of the next physics tick.
    pub fn request_respawn(&mut self, surface_point: Vec3) {
        let offset = self.world.resource::<SimConfig>().respawn_offset;
        let mut player = self.world.resource_mut::<PlayerState>();
        player.pending_respawn = Some(surface_point + Vec3::new(0.0, offset, 0.0));
    }

    // ------------------------------------------------------------------
    // Advancing
    // ------------------------------------------------------------------

    /// Advance player physics by one render frame. Runs the fixed-step
    /// integrator against the voxel index and returns the resulting
    /// movement state.
    pub fn advance_physics(&mut self, frame_dt: f32) -> PlayerSnapshot {
        let config = self.world.resource::<SimConfig>().clone();
        let mut accumulator = self.physics_accumulator;
        self.world
            .resource_scope(|world, mut player: Mut<PlayerState>| {
                let index = world.resource::<VoxelIndex>();
                physics::integrate(&mut player, &mut accumulator, frame_dt, index, &config);
            });
        self.physics_accumulator = accumulator;
        self.player()
    }

    /// Advance creatures and projectiles by one render frame. The frame
    /// delta is clamped like the physics path, so a hitch never produces one
    /// giant projectile move. Projectiles integrate every call; the AI
    /// dispatch pass runs only when the dispatch interval has elapsed,
    /// scaled by the actual elapsed window.
    pub fn advance_world(&mut self, frame_dt: f32) {
        let config = self.world.resource::<SimConfig>().clone();
        let dt = frame_dt.clamp(0.0, config.max_frame_delta);
        self.time += dt;
        self.world.resource_mut::<SimTime>().0 = self.time;
        self.world.resource_mut::<DeltaTime>().0 = dt;
        self.frame_schedule.run(&mut self.world);

        let interval = config.dispatch_interval;
        let window = self.time - self.last_dispatch;
        if window >= interval {
            self.world.resource_mut::<DeltaTime>().0 = window;
            self.ai_schedule.run(&mut self.world);
            self.last_dispatch = self.time;
        }

        combat::resolve_deaths(&mut self.world);
        self.tick += 1;
    }

    // ------------------------------------------------------------------
    // Interactions
    // ------------------------------------------------------------------

    /// Route one player interaction. Returns whether it had an effect;
    /// invalid targets and insufficient resources are quiet no-ops.
    pub fn interact(&mut self, action: Interaction) -> bool {
        match action {
            Interaction::Mine { origin, direction } => self.mine(origin, direction),
            Interaction::Place { block } => self.place(block),
            Interaction::Attack { facing } => {
                let origin = self.world.resource::<PlayerState>().position;
                player_melee_attack(&mut self.world, origin, facing)
            }
            Interaction::Fire => player_fire_bow(&mut self.world),
        }
    }

    fn mine(&mut self, origin: Vec3, direction: Vec3) -> bool {
        let weapon = self.world.resource::<Loadout>().weapon;
        // Pickaxes chew through durable materials; anything else chips.
        let amount = if weapon == WeaponKind::Pickaxe { 15.0 } else { 5.0 };

        let cell = {
            let index = self.world.resource::<VoxelIndex>();
            match cast_ray(origin, direction, index, REACH) {
                Some(hit) => hit.block.cell(),
                None => return false,
            }
        };
        let outcome = self
            .world
            .resource_mut::<VoxelIndex>()
            .damage_block(cell, amount);

        let mut effects = self.world.resource_mut::<EffectQueue>();
        match outcome {
            BlockDamage::Absent => false,
            BlockDamage::Damaged { id, remaining } => {
                effects.push(Effect::BlockDamaged { id, remaining });
                effects.push(Effect::Sound {
                    name: "mine_hit".to_string(),
                    x: origin.x,
                    y: origin.y,
                    z: origin.z,
                });
                true
            }
            BlockDamage::Destroyed(block) => {
                effects.push(Effect::BlockBroken {
                    id: block.id,
                    x: block.x,
                    y: block.y,
                    z: block.z,
                    material: block.material,
                });
                effects.push(Effect::QuestProgress {
                    key: format!("{:?}", block.material),
                    amount: 1,
                });
                effects.push(Effect::Sound {
                    name: "block_break".to_string(),
                    x: block.x as f32,
                    y: block.y as f32,
                    z: block.z as f32,
                });
                true
            }
        }
    }

    fn place(&mut self, block: Block) -> bool {
        let config = self.world.resource::<SimConfig>().clone();
        let player = *self.world.resource::<PlayerState>();
        {
            let index = self.world.resource::<VoxelIndex>();
            if index.block_at(block.cell()).is_some() {
                return false;
            }
        }
        // Refuse placement intersecting the player's AABB.
        let center = Vec3::new(block.x as f32, block.y as f32, block.z as f32);
        let (pmin, pmax) = physics::player_aabb(player.position, &config);
        let intersects = block.material.is_solid()
            && center.x + 0.5 > pmin.x
            && center.x - 0.5 < pmax.x
            && center.y + 0.5 > pmin.y
            && center.y - 0.5 < pmax.y
            && center.z + 0.5 > pmin.z
            && center.z - 0.5 < pmax.z;
        if intersects {
            return false;
        }

        self.world.resource_mut::<VoxelIndex>().insert(block);
        self.world.resource_mut::<EffectQueue>().push(Effect::BlockPlaced {
            id: block.id,
            x: block.x,
            y: block.y,
            z: block.z,
        });
        true
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Snapshot the world for the host. Drains the effect queue: each
    /// effect is surfaced exactly once.
    pub fn snapshot(&mut self) -> Snapshot {
        let mut snapshot = Snapshot::from_world(&mut self.world, self.tick, self.time);
        snapshot.effects = self.world.resource_mut::<EffectQueue>().drain();
        snapshot
    }

    pub fn snapshot_json(&mut self) -> Result<String, serde_json::Error> {
        self.snapshot().to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ConstRng;
    use crate::voxel::Material;

    fn flat_ground() -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut id = 0;
        for x in -16..=16 {
            for z in -16..=16 {
                blocks.push(Block::new(id, x, -1, z, Material::Grass));
                id += 1;
            }
        }
        blocks
    }

    fn sim_on_ground() -> SimWorld {
        let mut sim = SimWorld::new();
        sim.set_blocks(&flat_ground());
        sim
    }

    #[test]
    fn test_player_settles_on_ground() {
        let mut sim = sim_on_ground();
        sim.world_mut().resource_mut::<PlayerState>().position = Vec3::new(0.0, 3.0, 0.0);
        for _ in 0..120 {
            sim.advance_physics(1.0 / 60.0);
        }
        let player = sim.player();
        assert_eq!(player.y, -0.5);
        assert!(player.grounded);
    }

    #[test]
    fn test_respawn_is_atomic_within_one_tick() {
        let mut sim = sim_on_ground();
        sim.world_mut().resource_mut::<PlayerState>().position = Vec3::new(50.0, -30.0, 50.0);
        sim.request_respawn(Vec3::new(0.0, -0.5, 0.0));
        let player = sim.advance_physics(1.0 / 60.0);
        // Position and velocity both reset before any stepping.
        assert!((player.x).abs() < 1e-4);
        assert!(player.y > -1.0);
    }

    #[test]
    fn test_dispatch_throttled_by_interval() {
        let mut sim = sim_on_ground();
        let id = sim.spawn_creature(CreatureKind::Zombie, Vec3::new(10.0, -0.5, 0.0));
        assert_eq!(id, 1);

        // Two 10ms frames: under the 50ms interval, no dispatch yet.
        sim.advance_world(0.01);
        sim.advance_world(0.01);
        let snap = sim.snapshot();
        assert!(!snap.creatures[0].moving);

        // Crossing the interval runs one dispatch scaled to the window.
        sim.advance_world(0.04);
        let snap = sim.snapshot();
        assert!(snap.creatures[0].moving);
        let moved = 10.0 - snap.creatures[0].x;
        let expected = CreatureKind::Zombie.chase_speed() * 0.06;
        assert!((moved - expected).abs() < 1e-3);
    }

    #[test]
    fn test_world_frame_delta_clamped() {
        let mut sim = sim_on_ground();
        let max = sim.world().resource::<SimConfig>().max_frame_delta;
        // A 10 second hitch only advances the clock by the clamp.
        sim.advance_world(10.0);
        assert!((sim.current_time() - max).abs() < 1e-6);
    }

    #[test]
    fn test_dead_creature_gone_within_tick() {
        let mut sim = sim_on_ground();
        sim.set_random_source(ConstRng(0.6));
        let id = sim.spawn_creature(CreatureKind::Cow, Vec3::new(0.0, -0.5, -2.0));
        {
            let world = sim.world_mut();
            let mut query = world.query::<(&CreatureId, &mut Health)>();
            for (cid, mut hp) in query.iter_mut(world) {
                if cid.0 == id {
                    hp.current = 1.0;
                }
            }
        }
        assert!(sim.interact(Interaction::Attack {
            facing: Vec3::new(0.0, 0.0, -1.0),
        }));
        let snap = sim.snapshot();
        assert!(snap.creatures.is_empty());
        assert!(snap
            .effects
            .iter()
            .any(|e| matches!(e, Effect::CreatureKilled { id: k, .. } if *k == id)));
    }

    #[test]
    fn test_mining_damages_then_breaks() {
        let mut sim = SimWorld::new();
        sim.set_blocks(&[Block::new(7, 0, 0, -3, Material::Stone)]);
        let origin = Vec3::ZERO;
        let dir = Vec3::new(0.0, 0.0, -1.0);

        assert!(sim.interact(Interaction::Mine { origin, direction: dir }));
        let snap = sim.snapshot();
        assert!(snap
            .effects
            .iter()
            .any(|e| matches!(e, Effect::BlockDamaged { id: 7, remaining } if *remaining == 25.0)));

        // 5 damage per swing, 25 hp left.
        for _ in 0..5 {
            sim.interact(Interaction::Mine { origin, direction: dir });
        }
        let snap = sim.snapshot();
        assert!(snap
            .effects
            .iter()
            .any(|e| matches!(e, Effect::BlockBroken { id: 7, .. })));
        assert_eq!(sim.block_count(), 0);
        // Stale cursor after the break: quiet no-op.
        assert!(!sim.interact(Interaction::Mine { origin, direction: dir }));
    }

    #[test]
    fn test_place_rejects_occupied_and_player_cells() {
        let mut sim = sim_on_ground();
        sim.world_mut().resource_mut::<PlayerState>().position = Vec3::new(0.0, -0.5, 0.0);

        // Occupied cell.
        assert!(!sim.interact(Interaction::Place {
            block: Block::new(900, 0, -1, 0, Material::Stone),
        }));
        // Inside the player's AABB.
        assert!(!sim.interact(Interaction::Place {
            block: Block::new(901, 0, 0, 0, Material::Stone),
        }));
        // Clear cell.
        assert!(sim.interact(Interaction::Place {
            block: Block::new(902, 3, 0, 3, Material::Stone),
        }));
        let snap = sim.snapshot();
        assert!(snap
            .effects
            .iter()
            .any(|e| matches!(e, Effect::BlockPlaced { id: 902, .. })));
    }

    #[test]
    fn test_effects_drain_exactly_once() {
        let mut sim = sim_on_ground();
        sim.interact(Interaction::Place {
            block: Block::new(902, 3, 2, 3, Material::Stone),
        });
        let first = sim.snapshot();
        assert!(!first.effects.is_empty());
        let second = sim.snapshot();
        assert!(second.effects.is_empty());
    }

    #[test]
    fn test_find_spawn_point_on_surface() {
        let mut sim = sim_on_ground();
        let point = sim.find_spawn_point(Vec3::new(0.0, 0.0, 0.0), 8.0);
        let p = point.expect("flat ground should yield a spawn point");
        assert_eq!(p.y, -0.5);
        assert!(p.x.abs() <= 8.0 && p.z.abs() <= 8.0);
    }

    #[test]
    fn test_find_spawn_point_over_void() {
        let mut sim = SimWorld::new();
        assert!(sim.find_spawn_point(Vec3::ZERO, 8.0).is_none());
    }

    #[test]
    fn test_despawn_creature_by_id() {
        let mut sim = sim_on_ground();
        let id = sim.spawn_creature(CreatureKind::Pig, Vec3::new(2.0, -0.5, 2.0));
        assert_eq!(sim.creature_count(), 1);
        assert!(sim.despawn_creature(id));
        assert_eq!(sim.creature_count(), 0);
        assert!(!sim.despawn_creature(id));
    }

    #[test]
    fn test_sorcerer_summons_allies_into_world() {
        let mut sim = sim_on_ground();
        sim.set_random_source(ConstRng(0.5));
        sim.spawn_creature(CreatureKind::Sorcerer, Vec3::new(0.0, -0.5, -10.0));
        sim.advance_world(0.06); // one dispatch
        let snap = sim.snapshot();
        assert!(snap
            .effects
            .iter()
            .any(|e| matches!(e, Effect::Summoned { .. })));
        assert!(snap.creatures.len() > 1);
        assert!(snap.creatures.iter().any(|c| c.kind == "Zombie"));
    }
}
