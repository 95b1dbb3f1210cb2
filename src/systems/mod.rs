//! Simulation systems, grouped by schedule cadence.
//!
//! `projectile` systems run every frame advance; `behavior` and the enemy
//! attack consumer run on the throttled AI dispatch schedule. Death
//! resolution runs as an exclusive pass after both.

pub mod behavior;
pub mod combat;
pub mod projectile;

pub use behavior::{
    aquatic_step, behavior_apply_system, behavior_gather_system, caster_step, decide,
    hostile_melee_step, passive_step, BehaviorCtx, CreatureView, Decision, PendingDecisions,
};
pub use combat::{
    enemy_attack_system, mitigate_incoming, player_fire_bow, player_melee_attack, resolve_deaths,
    AttackQueue, CombatResults, Loadout, MeleeAttack, ARROW_COLOR, SPELL_COLOR,
};
pub use projectile::projectile_system;
