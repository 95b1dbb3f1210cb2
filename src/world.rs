//! Snapshot types and the deferred-effect queue.
//!
//! `Snapshot` is the serializable view of the simulation state handed to the
//! host each frame. Effects are fire-and-forget notifications for the
//! presentation, inventory, and progression collaborators; they are
//! collected mid-tick and drained exactly once per snapshot, never awaited.

use crate::components::*;
use crate::physics::PlayerState;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Snapshot of a single creature's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatureSnapshot {
    pub id: u32,
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub yaw: f32,
    pub hp: f32,
    pub hp_max: f32,
    pub hostile: bool,
    pub moving: bool,
}

/// Snapshot of an in-flight projectile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
    pub color: [f32; 3],
}

/// Snapshot of the player's movement state.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub vx: f32,
    pub vy: f32,
    pub vz: f32,
    pub grounded: bool,
}

impl From<&PlayerState> for PlayerSnapshot {
    fn from(p: &PlayerState) -> Self {
        Self {
            x: p.position.x,
            y: p.position.y,
            z: p.position.z,
            vx: p.velocity.x,
            vy: p.velocity.y,
            vz: p.velocity.z,
            grounded: p.grounded,
        }
    }
}

/// Deferred side effects produced during a tick, applied/consumed by the
/// external collaborators after iteration completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// Presentation cue; never awaited.
    Sound { name: String, x: f32, y: f32, z: f32 },
    /// HUD notification text.
    Notification { text: String },
    /// A creature died this pass.
    CreatureKilled { id: u32, kind: CreatureKind },
    /// Progression: XP keyed by enemy kind.
    XpGained { kind: CreatureKind, amount: u32 },
    /// Progression: currency drop.
    GoldGained { amount: u32 },
    /// Progression: quest progress keyed by kind/resource.
    QuestProgress { key: String, amount: u32 },
    /// Inventory: item dropped at a position for pickup.
    ItemDrop { item: ItemKind, x: f32, y: f32, z: f32 },
    /// Inventory: one arrow consumed by a bow shot.
    ArrowConsumed,
    /// Player-state collaborator: damage that passed mitigation.
    PlayerHit { amount: f32 },
    /// Caster summon resolved into allied spawns.
    Summoned { caster: u32, count: u32 },
    /// World collaborator: partial mining damage persisted on a block.
    BlockDamaged { id: u64, remaining: f32 },
    /// World collaborator: block destroyed and removed from the index.
    BlockBroken { id: u64, x: i32, y: i32, z: i32, material: crate::voxel::Material },
    /// World collaborator: block placed into the index.
    BlockPlaced { id: u64, x: i32, y: i32, z: i32 },
}

/// Monotonic id allocator for creatures and projectiles spawned inside the
/// core (summons, bolts, arrows) and through the spawn API.
#[derive(Resource, Debug, Default)]
pub struct IdCounter {
    next_creature: u32,
    next_projectile: u32,
}

impl IdCounter {
    pub fn alloc_creature(&mut self) -> u32 {
        self.next_creature += 1;
        self.next_creature
    }

    pub fn alloc_projectile(&mut self) -> u32 {
        self.next_projectile += 1;
        self.next_projectile
    }
}

/// Resource collecting effects mid-tick; drained on snapshot.
#[derive(Resource, Debug, Default)]
pub struct EffectQueue {
    events: Vec<Effect>,
}

impl EffectQueue {
    pub fn push(&mut self, effect: Effect) {
        self.events.push(effect);
    }

    pub fn drain(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Effect> {
        self.events.iter()
    }
}

/// Complete simulation state snapshot for the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current simulation tick.
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub time: f32,
    pub player: PlayerSnapshot,
    pub creatures: Vec<CreatureSnapshot>,
    pub projectiles: Vec<ProjectileSnapshot>,
    /// Effects produced since the previous snapshot.
    pub effects: Vec<Effect>,
}

impl Snapshot {
    /// Build a snapshot from the ECS world. Does not drain effects; the
    /// caller decides when the queue empties.
    pub fn from_world(world: &mut World, tick: u64, time: f32) -> Self {
        let player = world
            .get_resource::<PlayerState>()
            .map(PlayerSnapshot::from)
            .unwrap_or_default();

        let mut creatures = Vec::new();
        let mut creature_query = world.query::<(
            &CreatureId,
            &CreatureKind,
            &Position,
            &Yaw,
            &Health,
            &Moving,
        )>();
        for (id, kind, pos, yaw, health, moving) in creature_query.iter(world) {
            creatures.push(CreatureSnapshot {
                id: id.0,
                kind: kind.name().to_string(),
                x: pos.0.x,
                y: pos.0.y,
                z: pos.0.z,
                yaw: yaw.0,
                hp: health.current,
                hp_max: health.max,
                hostile: kind.is_hostile(),
                moving: moving.0,
            });
        }

        let mut projectiles = Vec::new();
        let mut projectile_query =
            world.query_filtered::<(&ProjectileId, &Position, &Velocity, &ProjectileInfo), With<Projectile>>();
        for (id, pos, vel, info) in projectile_query.iter(world) {
            projectiles.push(ProjectileSnapshot {
                id: id.0,
                x: pos.0.x,
                y: pos.0.y,
                z: pos.0.z,
                vx: vel.0.x,
                vy: vel.0.y,
                vz: vel.0.z,
                color: info.color,
            });
        }

        Self {
            tick,
            time,
            player,
            creatures,
            projectiles,
            effects: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_from_world() {
        let mut world = World::new();
        world.insert_resource(PlayerState::default());
        world.spawn(CreatureBundle::new(
            3,
            CreatureKind::Zombie,
            Vec3::new(1.0, 0.0, -2.0),
        ));
        world.spawn(ProjectileBundle::new(
            9,
            Owner::Player,
            15.0,
            [1.0, 1.0, 0.2],
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, -30.0),
            0.0,
        ));

        let snapshot = Snapshot::from_world(&mut world, 5, 0.25);
        assert_eq!(snapshot.tick, 5);
        assert_eq!(snapshot.creatures.len(), 1);
        assert_eq!(snapshot.creatures[0].id, 3);
        assert_eq!(snapshot.creatures[0].kind, "Zombie");
        assert!(snapshot.creatures[0].hostile);
        assert_eq!(snapshot.projectiles.len(), 1);
        assert_eq!(snapshot.projectiles[0].vz, -30.0);
    }

    #[test]
    fn test_snapshot_json_roundtrip() {
        let mut world = World::new();
        world.insert_resource(PlayerState::default());
        world.spawn(CreatureBundle::new(
            1,
            CreatureKind::Sorcerer,
            Vec3::new(0.0, 0.0, -8.0),
        ));
        let snapshot = Snapshot::from_world(&mut world, 1, 0.05);
        let json = snapshot.to_json().unwrap();
        let restored = Snapshot::from_json(&json).unwrap();
        assert_eq!(restored.tick, 1);
        assert_eq!(restored.creatures[0].kind, "Sorcerer");
    }

    #[test]
    fn test_effect_queue_drains_once() {
        let mut queue = EffectQueue::default();
        queue.push(Effect::ArrowConsumed);
        queue.push(Effect::GoldGained { amount: 2 });
        assert_eq!(queue.len(), 2);
        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert!(queue.is_empty());
        assert!(queue.drain().is_empty());
    }
}
