//! Simulation configuration and clock resources.

use bevy_ecs::prelude::*;

/// Configuration for simulation tuning. Every gameplay constant lives here
/// so tests and the host can pin or override them.
#[derive(Resource, Debug, Clone)]
pub struct SimConfig {
    /// Fixed physics timestep in seconds (1/60 = 60 Hz).
    pub fixed_timestep: f32,
    /// Maximum wall-clock delta accepted per frame before clamping.
    pub max_frame_delta: f32,
    /// Downward acceleration applied to the player each step.
    pub gravity: f32,
    /// Absolute floor; nothing falls below this even over unloaded regions.
    pub world_floor_y: f32,
    /// Player AABB half extent on X/Z.
    pub player_half_extent: f32,
    /// Player AABB height (feet to crown).
    pub player_height: f32,
    /// Vertical offset above the chosen surface point on respawn.
    pub respawn_offset: f32,

    /// Wall-clock interval between AI dispatch passes.
    pub dispatch_interval: f32,
    /// Distance below which an enemy switches from wandering to chasing.
    pub aggro_range: f32,
    /// Distance at which melee enemies stop and attack.
    pub melee_range: f32,
    /// Minimum facing dot product for the melee cone (~25 degrees).
    pub melee_cone_dot: f32,
    /// Seconds a passive creature keeps fleeing after taking damage.
    pub flee_window: f32,
    /// Flee speed, elevated over the wander speed.
    pub flee_speed: f32,
    /// Idle wander speed for land creatures.
    pub wander_speed: f32,
    /// Swim speed for aquatic creatures.
    pub aquatic_speed: f32,
    /// Per-dispatch-tick probability that a passive creature starts a wander.
    pub wander_chance: f32,
    /// Radius within which a wander target counts as reached.
    pub wander_epsilon: f32,

    /// Caster: distance at which the one-time summon triggers.
    pub summon_range: f32,
    /// Caster: maximum spell bolt range.
    pub cast_range: f32,
    /// Caster: fixed cooldown between bolts.
    pub cast_cooldown: f32,
    /// Caster: bolt speed (non-homing, aimed at launch).
    pub spell_speed: f32,
    /// Caster: bolt damage before mitigation.
    pub spell_damage: f32,

    /// Bow auto-target range.
    pub bow_range: f32,
    /// Bow auto-target cone (wide; ~60 degrees).
    pub bow_cone_dot: f32,
    pub arrow_speed: f32,
    pub arrow_damage: f32,

    /// Radius around the player at which a projectile connects.
    pub projectile_hit_radius: f32,
    /// Projectiles farther than this from the player are culled.
    pub projectile_max_range: f32,
    /// Projectiles older than this are culled.
    pub projectile_max_age: f32,

    /// Flat chance an incoming attack (melee or ranged) misses the player
    /// outright.
    pub incoming_miss_chance: f32,
    /// Baseline damage reduction the player always has.
    pub base_defense: f32,
    /// Damage reduction cap across defense + shield + armor.
    pub max_mitigation: f32,
    /// Outward displacement applied to a surviving hostile on melee hit.
    pub knockback_distance: f32,
    /// Impulse applied to the player's velocity when hit in melee.
    pub knockback_impulse: f32,

    /// Chance a death drops the kind's common material.
    pub material_drop_chance: f32,
    /// Chance a death drops the rare bonus item.
    pub rare_drop_chance: f32,
    /// Chance a death drops currency.
    pub currency_drop_chance: f32,
    /// Bounded attempts when searching for a valid spawn point.
    pub spawn_attempts: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 60.0,
            max_frame_delta: 0.1,
            gravity: 24.0,
            world_floor_y: -40.0,
            player_half_extent: 0.4,
            player_height: 1.8,
            respawn_offset: 1.0,

            dispatch_interval: 0.05,
            aggro_range: 20.0,
            melee_range: 5.0,
            melee_cone_dot: 0.9,
            flee_window: 8.0,
            flee_speed: 4.0,
            wander_speed: 1.2,
            aquatic_speed: 0.8,
            wander_chance: 0.02,
            wander_epsilon: 0.5,

            summon_range: 25.0,
            cast_range: 18.0,
            cast_cooldown: 5.0,
            spell_speed: 10.0,
            spell_damage: 12.0,

            bow_range: 15.0,
            bow_cone_dot: 0.5,
            arrow_speed: 30.0,
            arrow_damage: 15.0,

            projectile_hit_radius: 1.2,
            projectile_max_range: 60.0,
            projectile_max_age: 8.0,

            incoming_miss_chance: 0.1,
            base_defense: 0.1,
            max_mitigation: 0.8,
            knockback_distance: 1.5,
            knockback_impulse: 6.0,

            material_drop_chance: 0.8,
            rare_drop_chance: 0.05,
            currency_drop_chance: 0.3,
            spawn_attempts: 20,
        }
    }
}

/// Elapsed simulation time in seconds. Cooldown timestamps are compared
/// against this clock.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct SimTime(pub f32);

/// Delta time for the schedule run currently executing: the frame delta for
/// the per-frame schedule, the elapsed dispatch window for the AI schedule.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct DeltaTime(pub f32);
