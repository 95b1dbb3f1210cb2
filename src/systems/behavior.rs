//! Creature behavior dispatch.
//!
//! Runs as a gather/apply pair on the throttled AI schedule. The gather pass
//! snapshots each creature into a [`CreatureView`] and calls a pure strategy
//! function that returns a [`Decision`]; the apply pass writes decisions back
//! and realizes their side intents (melee attacks, spell bolts, summons).
//! Strategies are plain functions of `(view, ctx, rng)` so every branch is
//! unit-testable without a schedule.

use crate::components::*;
use crate::config::{DeltaTime, SimConfig, SimTime};
use crate::physics::PlayerState;
use crate::rng::{RandomSource, SimRng};
use crate::systems::combat::{AttackQueue, MeleeAttack, SPELL_COLOR};
use crate::voxel::VoxelIndex;
use crate::world::{Effect, EffectQueue, IdCounter};
use bevy_ecs::prelude::*;

/// Read-only snapshot of one creature for the decision pass.
#[derive(Debug, Clone, Copy)]
pub struct CreatureView {
    pub entity: Entity,
    pub id: u32,
    pub kind: CreatureKind,
    pub pos: Vec3,
    pub yaw: f32,
    pub last_attack: f32,
    pub last_damaged: f32,
    pub wander: Option<Vec3>,
    pub has_summoned: bool,
}

/// Shared inputs for a dispatch pass.
pub struct BehaviorCtx<'a> {
    /// Player feet position.
    pub player: Vec3,
    /// Current simulation time.
    pub now: f32,
    /// Elapsed dispatch window, used to scale movement.
    pub dt: f32,
    pub config: &'a SimConfig,
    pub index: &'a VoxelIndex,
}

/// Spell bolt launch intent, realized by the apply pass.
#[derive(Debug, Clone, Copy)]
pub struct CastIntent {
    pub origin: Vec3,
    pub velocity: Vec3,
    pub damage: f32,
}

/// Outcome of one creature's decision. Only ever written back through the
/// apply pass so the gather iteration sees a consistent world.
#[derive(Debug, Clone, Copy)]
pub struct Decision {
    pub entity: Entity,
    pub id: u32,
    pub pos: Vec3,
    pub yaw: f32,
    pub moving: bool,
    pub wander: Option<Vec3>,
    pub summoned: bool,
    pub last_attack: f32,
    pub melee: Option<MeleeAttack>,
    pub cast: Option<CastIntent>,
    /// Number of allied creatures to summon around this caster.
    pub summon: Option<u32>,
    pub sound: Option<&'static str>,
}

impl Decision {
    /// Baseline decision that keeps the creature exactly as it is.
    pub fn keep(view: &CreatureView) -> Self {
        Self {
            entity: view.entity,
            id: view.id,
            pos: view.pos,
            yaw: view.yaw,
            moving: false,
            wander: view.wander,
            summoned: view.has_summoned,
            last_attack: view.last_attack,
            melee: None,
            cast: None,
            summon: None,
            sound: None,
        }
    }
}

fn facing_yaw(dir: Vec3) -> f32 {
    dir.x.atan2(dir.z)
}

/// Step toward `target` on the XZ plane at `speed`, stopping at the target.
fn step_toward(pos: Vec3, target: Vec3, speed: f32, dt: f32) -> Vec3 {
    let to = Vec3::new(target.x - pos.x, 0.0, target.z - pos.z);
    let dist = to.length();
    let step = speed * dt;
    if dist <= step {
        Vec3::new(target.x, pos.y, target.z)
    } else {
        pos + to.normalized() * step
    }
}

/// Shared idle wander: occasionally pick a nearby destination, walk toward
/// it, clear it once reached.
fn wander(view: &CreatureView, ctx: &BehaviorCtx, rng: &mut dyn RandomSource) -> Decision {
    let mut d = Decision::keep(view);
    match view.wander {
        Some(target) => {
            if view.pos.distance_xz(target) <= ctx.config.wander_epsilon {
                d.wander = None;
            } else {
                d.pos = step_toward(view.pos, target, ctx.config.wander_speed, ctx.dt);
                d.yaw = facing_yaw(d.pos - view.pos);
                d.moving = true;
            }
        }
        None => {
            if rng.roll() < ctx.config.wander_chance {
                let angle = rng.range(0.0, std::f32::consts::TAU);
                let dist = rng.range(2.0, 6.0);
                d.wander = Some(Vec3::new(
                    view.pos.x + angle.cos() * dist,
                    view.pos.y,
                    view.pos.z + angle.sin() * dist,
                ));
            }
        }
    }
    d
}

/// Passive land creature: flee away from the player for a window after
/// taking damage, otherwise wander.
pub fn passive_step(view: &CreatureView, ctx: &BehaviorCtx, rng: &mut dyn RandomSource) -> Decision {
    if ctx.now - view.last_damaged < ctx.config.flee_window {
        let mut d = Decision::keep(view);
        let away =
            Vec3::new(view.pos.x - ctx.player.x, 0.0, view.pos.z - ctx.player.z).normalized();
        // Jitter the heading so a herd does not flee in lockstep.
        let jitter = rng.range(-0.6, 0.6);
        let (s, c) = jitter.sin_cos();
        let dir = Vec3::new(away.x * c - away.z * s, 0.0, away.x * s + away.z * c);
        d.pos = view.pos + dir * (ctx.config.flee_speed * ctx.dt);
        d.yaw = facing_yaw(dir);
        d.moving = true;
        d.wander = None;
        return d;
    }
    wander(view, ctx, rng)
}

/// Aquatic creature: drift between liquid-tagged cells, never leaving the
/// water body. With no adjacent liquid it stays put.
pub fn aquatic_step(view: &CreatureView, ctx: &BehaviorCtx, rng: &mut dyn RandomSource) -> Decision {
    let mut d = Decision::keep(view);
    let arrived = view
        .wander
        .map_or(true, |t| view.pos.distance_xz(t) <= ctx.config.wander_epsilon);
    if arrived {
        let candidates = ctx.index.adjacent_liquid(VoxelIndex::cell_of(view.pos));
        if candidates.is_empty() {
            d.wander = None;
            return d;
        }
        let pick = candidates[rng.range_u32(0, candidates.len() as u32 - 1) as usize];
        d.wander = Some(Vec3::new(pick.0 as f32, pick.1 as f32, pick.2 as f32));
    }
    if let Some(target) = d.wander {
        d.pos = step_toward(view.pos, target, ctx.config.aquatic_speed, ctx.dt);
        d.yaw = facing_yaw(d.pos - view.pos);
        d.moving = d.pos.distance_xz(view.pos) > 1e-6;
    }
    d
}

/// Hostile melee creature: chase inside the aggro radius with ground
/// snapping, stop and attack inside melee range, otherwise wander.
pub fn hostile_melee_step(
    view: &CreatureView,
    ctx: &BehaviorCtx,
    rng: &mut dyn RandomSource,
) -> Decision {
    let dist = view.pos.distance_to(ctx.player);
    let to_player = Vec3::new(
        ctx.player.x - view.pos.x,
        0.0,
        ctx.player.z - view.pos.z,
    );

    if dist <= ctx.config.melee_range {
        let mut d = Decision::keep(view);
        d.yaw = facing_yaw(to_player);
        if ctx.now - view.last_attack >= view.kind.attack_cooldown() {
            d.last_attack = ctx.now;
            d.melee = Some(MeleeAttack {
                attacker: view.id,
                kind: view.kind,
                origin: view.pos,
            });
            d.sound = Some("growl");
        }
        return d;
    }

    if dist < ctx.config.aggro_range {
        let mut d = Decision::keep(view);
        d.pos = view.pos + to_player.normalized() * (view.kind.chase_speed() * ctx.dt);
        // Follow the terrain column under the new position.
        let cell = VoxelIndex::cell_of(d.pos);
        if let Some(surface) = ctx.index.surface_y(
            cell.0,
            cell.2,
            cell.1 + 2,
            ctx.config.world_floor_y as i32,
        ) {
            d.pos.y = surface as f32 + 0.5;
        }
        d.yaw = facing_yaw(to_player);
        d.moving = true;
        d.wander = None;
        return d;
    }

    wander(view, ctx, rng)
}

/// Caster creature: one-time summon when the player first comes near, then
/// ranged bolts on a fixed cooldown, otherwise wander.
pub fn caster_step(view: &CreatureView, ctx: &BehaviorCtx, rng: &mut dyn RandomSource) -> Decision {
    let dist = view.pos.distance_to(ctx.player);
    let to_player = Vec3::new(
        ctx.player.x - view.pos.x,
        0.0,
        ctx.player.z - view.pos.z,
    );

    if !view.has_summoned && dist <= ctx.config.summon_range {
        let mut d = Decision::keep(view);
        d.summoned = true;
        d.summon = Some(rng.range_u32(1, 3));
        d.yaw = facing_yaw(to_player);
        d.sound = Some("summon");
        return d;
    }

    if dist <= ctx.config.cast_range && ctx.now - view.last_attack >= ctx.config.cast_cooldown {
        let mut d = Decision::keep(view);
        let origin = view.pos + Vec3::new(0.0, 1.0, 0.0);
        let aim = ctx.player + Vec3::new(0.0, 1.0, 0.0);
        d.cast = Some(CastIntent {
            origin,
            velocity: (aim - origin).normalized() * ctx.config.spell_speed,
            damage: ctx.config.spell_damage,
        });
        d.last_attack = ctx.now;
        d.yaw = facing_yaw(to_player);
        d.sound = Some("cast");
        return d;
    }

    wander(view, ctx, rng)
}

/// Route a creature to its strategy by kind tag.
pub fn decide(view: &CreatureView, ctx: &BehaviorCtx, rng: &mut dyn RandomSource) -> Decision {
    if view.kind.is_aquatic() {
        aquatic_step(view, ctx, rng)
    } else if view.kind == CreatureKind::Sorcerer {
        caster_step(view, ctx, rng)
    } else if view.kind.is_hostile() {
        hostile_melee_step(view, ctx, rng)
    } else {
        passive_step(view, ctx, rng)
    }
}

/// Decisions buffered between the gather and apply passes.
#[derive(Resource, Debug, Default)]
pub struct PendingDecisions(pub Vec<Decision>);

/// Gather pass: read-only over creatures, one decision each.
pub fn behavior_gather_system(
    config: Res<SimConfig>,
    time: Res<SimTime>,
    dt: Res<DeltaTime>,
    index: Res<VoxelIndex>,
    player: Res<PlayerState>,
    mut rng: ResMut<SimRng>,
    mut pending: ResMut<PendingDecisions>,
    query: Query<(
        Entity,
        &CreatureId,
        &CreatureKind,
        &Position,
        &Yaw,
        &Health,
        &CombatTimers,
        &WanderTarget,
        &HasSummoned,
    )>,
) {
    pending.0.clear();
    let ctx = BehaviorCtx {
        player: player.position,
        now: time.0,
        dt: dt.0,
        config: &config,
        index: &index,
    };
    for (entity, id, kind, pos, yaw, health, timers, wander, summoned) in query.iter() {
        if !health.is_alive() {
            continue;
        }
        if !pos.0.is_finite() {
            log::warn!("creature {} has non-finite position, skipping", id.0);
            continue;
        }
        let view = CreatureView {
            entity,
            id: id.0,
            kind: *kind,
            pos: pos.0,
            yaw: yaw.0,
            last_attack: timers.last_attack,
            last_damaged: timers.last_damaged,
            wander: wander.0,
            has_summoned: summoned.0,
        };
        let decision = decide(&view, &ctx, rng.0.as_mut());
        pending.0.push(decision);
    }
}

/// Apply pass: write decisions back and realize melee/cast/summon intents.
/// Stale entities (despawned since the gather) are skipped.
pub fn behavior_apply_system(
    mut commands: Commands,
    config: Res<SimConfig>,
    time: Res<SimTime>,
    index: Res<VoxelIndex>,
    mut rng: ResMut<SimRng>,
    mut id_counter: ResMut<IdCounter>,
    mut pending: ResMut<PendingDecisions>,
    mut attacks: ResMut<AttackQueue>,
    mut effects: ResMut<EffectQueue>,
    mut query: Query<(
        &mut Position,
        &mut Yaw,
        &mut Moving,
        &mut WanderTarget,
        &mut HasSummoned,
        &mut CombatTimers,
    )>,
) {
    for decision in pending.0.drain(..) {
        let Ok((mut pos, mut yaw, mut moving, mut wander, mut summoned, mut timers)) =
            query.get_mut(decision.entity)
        else {
            continue;
        };
        pos.0 = decision.pos;
        yaw.0 = decision.yaw;
        moving.0 = decision.moving;
        wander.0 = decision.wander;
        summoned.0 = decision.summoned;
        timers.last_attack = decision.last_attack;

        if let Some(attack) = decision.melee {
            attacks.0.push(attack);
        }

        if let Some(cast) = decision.cast {
            commands.spawn(ProjectileBundle::new(
                id_counter.alloc_projectile(),
                Owner::Creature(decision.id),
                cast.damage,
                SPELL_COLOR,
                cast.origin,
                cast.velocity,
                time.0,
            ));
        }

        if let Some(count) = decision.summon {
            let mut spawned = 0;
            for _ in 0..config.spawn_attempts {
                if spawned >= count {
                    break;
                }
                let angle = rng.0.range(0.0, std::f32::consts::TAU);
                let dist = rng.0.range(2.0, 5.0);
                let x = decision.pos.x + angle.cos() * dist;
                let z = decision.pos.z + angle.sin() * dist;
                let cell = VoxelIndex::cell_of(Vec3::new(x, decision.pos.y, z));
                let Some(surface) = index.surface_y(
                    cell.0,
                    cell.2,
                    cell.1 + 4,
                    config.world_floor_y as i32,
                ) else {
                    continue;
                };
                commands.spawn(CreatureBundle::new(
                    id_counter.alloc_creature(),
                    CreatureKind::Zombie,
                    Vec3::new(x, surface as f32 + 0.5, z),
                ));
                spawned += 1;
            }
            if spawned > 0 {
                effects.push(Effect::Summoned {
                    caster: decision.id,
                    count: spawned,
                });
            } else {
                log::debug!("summon by {} found no valid ground", decision.id);
            }
        }

        if let Some(name) = decision.sound {
            effects.push(Effect::Sound {
                name: name.to_string(),
                x: decision.pos.x,
                y: decision.pos.y,
                z: decision.pos.z,
            });
        }
    }
}
