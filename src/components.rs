//! ECS components for the Blockfall simulation.
//!
//! Components are pure data containers attached to entities.
//! All game logic lives in systems that query these components.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

// ============================================================================
// MATH
// ============================================================================

/// 3D vector (x = east/west, y = up/down, z = north/south).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn normalized(&self) -> Self {
        let len = self.length();
        if len < 1e-4 {
            Self::ZERO
        } else {
            Self::new(self.x / len, self.y / len, self.z / len)
        }
    }

    pub fn dot(&self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn distance_to(&self, other: Vec3) -> f32 {
        (*self - other).length()
    }

    /// Horizontal (XZ-plane) distance, ignoring height.
    pub fn distance_xz(&self, other: Vec3) -> f32 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl std::ops::AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Vec3) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// World position of a creature or projectile.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Position(pub Vec3);

/// Velocity, only meaningful for projectiles (creatures steer directly).
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Velocity(pub Vec3);

/// Facing angle around the vertical axis, radians.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Yaw(pub f32);

// ============================================================================
// IDENTITY COMPONENTS
// ============================================================================

/// Stable identifier for a creature, assigned by the spawner.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CreatureId(pub u32);

/// Stable identifier for a projectile.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ProjectileId(pub u32);

/// Creature type tag, assigned once at spawn time. All per-kind stats are
/// looked up on this tag; behavior routing never inspects display names.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreatureKind {
    Zombie,
    Skeleton,
    Spider,
    Giant,
    Sorcerer,
    Cow,
    Pig,
    Sheep,
    Fish,
}

impl CreatureKind {
    pub fn is_hostile(&self) -> bool {
        matches!(
            self,
            CreatureKind::Zombie
                | CreatureKind::Skeleton
                | CreatureKind::Spider
                | CreatureKind::Giant
                | CreatureKind::Sorcerer
        )
    }

    pub fn is_aquatic(&self) -> bool {
        matches!(self, CreatureKind::Fish)
    }

    /// Chase speed in units per second. Giants are slower but hit harder.
    pub fn chase_speed(&self) -> f32 {
        match self {
            CreatureKind::Zombie => 2.0,
            CreatureKind::Skeleton => 2.2,
            CreatureKind::Spider => 2.6,
            CreatureKind::Giant => 1.2,
            CreatureKind::Sorcerer => 1.6,
            _ => 0.0,
        }
    }

    /// Base melee damage dealt to the player per attack.
    pub fn melee_damage(&self) -> f32 {
        match self {
            CreatureKind::Zombie => 8.0,
            CreatureKind::Skeleton => 6.0,
            CreatureKind::Spider => 5.0,
            CreatureKind::Giant => 20.0,
            CreatureKind::Sorcerer => 4.0,
            _ => 0.0,
        }
    }

    /// Seconds between melee attacks.
    pub fn attack_cooldown(&self) -> f32 {
        match self {
            CreatureKind::Giant => 3.0,
            CreatureKind::Spider => 1.0,
            CreatureKind::Skeleton => 1.2,
            _ => 1.5,
        }
    }

    pub fn max_health(&self) -> f32 {
        match self {
            CreatureKind::Zombie => 20.0,
            CreatureKind::Skeleton => 16.0,
            CreatureKind::Spider => 12.0,
            CreatureKind::Giant => 80.0,
            CreatureKind::Sorcerer => 30.0,
            CreatureKind::Cow | CreatureKind::Pig | CreatureKind::Sheep => 10.0,
            CreatureKind::Fish => 4.0,
        }
    }

    pub fn xp_reward(&self) -> u32 {
        match self {
            CreatureKind::Zombie => 10,
            CreatureKind::Skeleton => 12,
            CreatureKind::Spider => 8,
            CreatureKind::Giant => 50,
            CreatureKind::Sorcerer => 30,
            CreatureKind::Cow | CreatureKind::Pig | CreatureKind::Sheep => 2,
            CreatureKind::Fish => 1,
        }
    }

    /// The common material this kind drops on death, rolled independently
    /// of the rare and currency drops.
    pub fn material_drop(&self) -> ItemKind {
        match self {
            CreatureKind::Zombie | CreatureKind::Giant => ItemKind::Flesh,
            CreatureKind::Skeleton => ItemKind::Bone,
            CreatureKind::Spider => ItemKind::Silk,
            CreatureKind::Sorcerer => ItemKind::Dust,
            CreatureKind::Cow | CreatureKind::Pig => ItemKind::Meat,
            CreatureKind::Sheep => ItemKind::Wool,
            CreatureKind::Fish => ItemKind::Fish,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CreatureKind::Zombie => "Zombie",
            CreatureKind::Skeleton => "Skeleton",
            CreatureKind::Spider => "Spider",
            CreatureKind::Giant => "Giant",
            CreatureKind::Sorcerer => "Sorcerer",
            CreatureKind::Cow => "Cow",
            CreatureKind::Pig => "Pig",
            CreatureKind::Sheep => "Sheep",
            CreatureKind::Fish => "Fish",
        }
    }
}

// ============================================================================
// COMBAT COMPONENTS
// ============================================================================

/// Health of a creature.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    pub fn damage(&mut self, amount: f32) {
        self.current = (self.current - amount).clamp(0.0, self.max);
    }

    pub fn fraction(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            (self.current / self.max).clamp(0.0, 1.0)
        }
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(20.0)
    }
}

/// Monotonic wall-clock timestamps for cooldown windows, compared against
/// the current simulation time.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CombatTimers {
    /// Time of the last attack (melee or cast).
    pub last_attack: f32,
    /// Time of the last damage taken; drives the flee window.
    pub last_damaged: f32,
}

impl Default for CombatTimers {
    fn default() -> Self {
        Self {
            last_attack: f32::NEG_INFINITY,
            last_damaged: f32::NEG_INFINITY,
        }
    }
}

// ============================================================================
// BEHAVIOR COMPONENTS
// ============================================================================

/// Transient destination for idle movement. `None` or an active target;
/// cleared and reassigned once the creature is within an epsilon radius.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WanderTarget(pub Option<Vec3>);

/// One-shot summon latch for caster creatures.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct HasSummoned(pub bool);

/// Whether the creature moved this dispatch tick (for presentation).
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Moving(pub bool);

// ============================================================================
// PROJECTILE COMPONENTS
// ============================================================================

/// Who launched a projectile. Player arrows never hit the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    Player,
    Creature(u32),
}

/// Marker for projectile entities.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Projectile;

/// Static projectile data set at launch.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProjectileInfo {
    pub owner: Owner,
    pub damage: f32,
    pub color: [f32; 3],
    /// Simulation time the projectile was launched, for the age cap.
    pub spawned_at: f32,
}

// ============================================================================
// ITEMS & EQUIPMENT
// ============================================================================

/// Droppable item kinds surfaced to the inventory collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Flesh,
    Bone,
    Silk,
    Wool,
    Meat,
    Fish,
    Dust,
    /// Rare bonus drop, shared across all kinds.
    Gem,
}

/// Active held item, supplied by the inventory collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WeaponKind {
    #[default]
    Fist,
    Sword,
    Axe,
    Pickaxe,
    Bow,
}

impl WeaponKind {
    pub fn is_bladed(&self) -> bool {
        matches!(self, WeaponKind::Sword | WeaponKind::Axe)
    }

    /// Tiered base melee damage: bladed weapons vs. everything else.
    pub fn base_melee_damage(&self) -> f32 {
        if self.is_bladed() {
            25.0
        } else {
            10.0
        }
    }
}

/// Shield quality, tiering the block chance against incoming attacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShieldTier {
    #[default]
    None,
    Wood,
    Iron,
}

impl ShieldTier {
    pub fn block_chance(&self) -> f32 {
        match self {
            ShieldTier::None => 0.0,
            ShieldTier::Wood => 0.25,
            ShieldTier::Iron => 0.4,
        }
    }

    pub fn mitigation_bonus(&self) -> f32 {
        match self {
            ShieldTier::None => 0.0,
            ShieldTier::Wood => 0.1,
            ShieldTier::Iron => 0.2,
        }
    }
}

// ============================================================================
// BUNDLE HELPERS
// ============================================================================

/// Bundle for spawning a complete creature entity.
#[derive(Bundle)]
pub struct CreatureBundle {
    pub id: CreatureId,
    pub kind: CreatureKind,
    pub position: Position,
    pub yaw: Yaw,
    pub health: Health,
    pub timers: CombatTimers,
    pub wander: WanderTarget,
    pub summoned: HasSummoned,
    pub moving: Moving,
}

impl CreatureBundle {
    pub fn new(id: u32, kind: CreatureKind, position: Vec3) -> Self {
        Self {
            id: CreatureId(id),
            kind,
            position: Position(position),
            yaw: Yaw(0.0),
            health: Health::new(kind.max_health()),
            timers: CombatTimers::default(),
            wander: WanderTarget(None),
            summoned: HasSummoned(false),
            moving: Moving(false),
        }
    }
}

/// Bundle for spawning an in-flight projectile.
#[derive(Bundle)]
pub struct ProjectileBundle {
    pub id: ProjectileId,
    pub marker: Projectile,
    pub info: ProjectileInfo,
    pub position: Position,
    pub velocity: Velocity,
}

impl ProjectileBundle {
    pub fn new(
        id: u32,
        owner: Owner,
        damage: f32,
        color: [f32; 3],
        position: Vec3,
        velocity: Vec3,
        now: f32,
    ) -> Self {
        Self {
            id: ProjectileId(id),
            marker: Projectile,
            info: ProjectileInfo {
                owner,
                damage,
                color,
                spawned_at: now,
            },
            position: Position(position),
            velocity: Velocity(velocity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_clamps_to_range() {
        let mut hp = Health::new(10.0);
        hp.damage(4.0);
        assert_eq!(hp.current, 6.0);
        hp.damage(100.0);
        assert_eq!(hp.current, 0.0);
        assert!(!hp.is_alive());
        hp.damage(-50.0);
        assert_eq!(hp.current, 10.0);
    }

    #[test]
    fn test_kind_tables() {
        assert!(CreatureKind::Zombie.is_hostile());
        assert!(!CreatureKind::Cow.is_hostile());
        assert!(CreatureKind::Fish.is_aquatic());
        // Giants trade speed for damage.
        assert!(CreatureKind::Giant.chase_speed() < CreatureKind::Zombie.chase_speed());
        assert!(CreatureKind::Giant.melee_damage() > CreatureKind::Zombie.melee_damage());
    }

    #[test]
    fn test_weapon_damage_tiers() {
        assert_eq!(WeaponKind::Fist.base_melee_damage(), 10.0);
        assert_eq!(WeaponKind::Pickaxe.base_melee_damage(), 10.0);
        assert_eq!(WeaponKind::Sword.base_melee_damage(), 25.0);
    }

    #[test]
    fn test_vec3_ops() {
        let v = Vec3::new(3.0, 0.0, 4.0);
        assert!((v.length() - 5.0).abs() < 1e-6);
        let n = v.normalized();
        assert!((n.length() - 1.0).abs() < 1e-6);
        assert_eq!(Vec3::ZERO.normalized(), Vec3::ZERO);
        assert!((Vec3::new(0.0, 0.0, -1.0).dot(Vec3::new(0.0, 0.0, -1.0)) - 1.0).abs() < 1e-6);
    }
}
