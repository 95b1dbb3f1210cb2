//! Combat resolution: melee sweeps, bow fire, the incoming damage pipeline,
//! and death resolution.
//!
//! Damage intents are gathered into [`CombatResults`] and applied after
//! iteration, so simultaneous hits against one creature aggregate before the
//! health clamp and the shared collection is never mutated mid-iteration.

use crate::components::*;
use crate::config::{SimConfig, SimTime};
use crate::physics::PlayerState;
use crate::rng::{RandomSource, SimRng};
use crate::world::{Effect, EffectQueue};
use bevy_ecs::prelude::*;
use std::collections::HashMap;

/// Arrow tint for presentation.
pub const ARROW_COLOR: [f32; 3] = [0.9, 0.85, 0.6];
/// Spell bolt tint.
pub const SPELL_COLOR: [f32; 3] = [0.6, 0.2, 0.9];

/// Active equipment supplied by the inventory collaborator.
#[derive(Resource, Debug, Clone, Copy)]
pub struct Loadout {
    pub weapon: WeaponKind,
    pub arrows: u32,
    pub shield: ShieldTier,
    /// Damage reduction contributed by worn armor.
    pub armor_reduction: f32,
    /// Outgoing damage multiplier from buffs/quality.
    pub attack_multiplier: f32,
}

impl Default for Loadout {
    fn default() -> Self {
        Self {
            weapon: WeaponKind::Fist,
            arrows: 0,
            shield: ShieldTier::None,
            armor_reduction: 0.0,
            attack_multiplier: 1.0,
        }
    }
}

/// A melee attack emitted by an enemy's behavior pass, consumed against the
/// player in the same dispatch tick.
#[derive(Debug, Clone, Copy)]
pub struct MeleeAttack {
    pub attacker: u32,
    pub kind: CreatureKind,
    pub origin: Vec3,
}

/// Queue of pending enemy melee attacks.
#[derive(Resource, Debug, Default)]
pub struct AttackQueue(pub Vec<MeleeAttack>);

/// Collected combat intents, applied after the gather pass.
#[derive(Default, Clone)]
pub struct CombatResults {
    pub damage: HashMap<Entity, f32>,
    pub knockback: HashMap<Entity, Vec3>,
}

/// Player melee swing: every creature inside the range/cone qualifies and
/// takes the full damage in one pass. Returns whether anything was hit.
pub fn player_melee_attack(world: &mut World, origin: Vec3, facing: Vec3) -> bool {
    let config = world.resource::<SimConfig>().clone();
    let now = world.resource::<SimTime>().0;
    let loadout = *world.resource::<Loadout>();
    let facing = facing.normalized();
    if facing == Vec3::ZERO {
        return false;
    }

    let damage = loadout.weapon.base_melee_damage() * loadout.attack_multiplier;

    // Gather phase: read-only cone test over the creature collection.
    let mut results = CombatResults::default();
    let mut query = world.query::<(Entity, &Position, &CreatureKind, &Health)>();
    for (entity, pos, kind, health) in query.iter(world) {
        if !health.is_alive() {
            continue;
        }
        if !pos.0.is_finite() {
            log::warn!("skipping creature with non-finite position");
            continue;
        }
        let to_target = pos.0 - origin;
        let dist = to_target.length();
        if dist >= config.melee_range {
            continue;
        }
        if facing.dot(to_target.normalized()) <= config.melee_cone_dot {
            continue;
        }
        results.damage.insert(entity, damage);
        if kind.is_hostile() {
            let outward = Vec3::new(to_target.x, 0.0, to_target.z).normalized();
            results
                .knockback
                .insert(entity, outward * config.knockback_distance);
        }
    }

    let hit = !results.damage.is_empty();

    // Apply phase: aggregate damage, then knockback for survivors only.
    for (entity, dmg) in &results.damage {
        if let Some(mut health) = world.get_mut::<Health>(*entity) {
            health.damage(*dmg);
        }
        if let Some(mut timers) = world.get_mut::<CombatTimers>(*entity) {
            timers.last_damaged = now;
        }
    }
    for (entity, kb) in &results.knockback {
        let alive = world
            .get::<Health>(*entity)
            .map(|h| h.is_alive())
            .unwrap_or(false);
        if alive {
            if let Some(mut pos) = world.get_mut::<Position>(*entity) {
                pos.0 += *kb;
            }
        }
    }

    if hit {
        world.resource_mut::<EffectQueue>().push(Effect::Sound {
            name: "melee_hit".to_string(),
            x: origin.x,
            y: origin.y,
            z: origin.z,
        });
    }

    resolve_deaths(world);
    hit
}

/// Bow shot: auto-target the nearest hostile in the wide forward cone, else
/// fire along the view direction. Consumes one arrow.
pub fn player_fire_bow(world: &mut World) -> bool {
    let config = world.resource::<SimConfig>().clone();
    let now = world.resource::<SimTime>().0;
    let loadout = *world.resource::<Loadout>();
    let player = *world.resource::<PlayerState>();

    if loadout.weapon != WeaponKind::Bow {
        return false;
    }
    if loadout.arrows == 0 {
        world.resource_mut::<EffectQueue>().push(Effect::Notification {
            text: "Out of arrows".to_string(),
        });
        return false;
    }

    let origin = player.position;
    let view = player.view.normalized();

    let mut best: Option<(Vec3, f32)> = None;
    let mut query = world.query::<(&Position, &CreatureKind, &Health)>();
    for (pos, kind, health) in query.iter(world) {
        if !kind.is_hostile() || !health.is_alive() || !pos.0.is_finite() {
            continue;
        }
        let to_target = pos.0 - origin;
        let dist = to_target.length();
        if dist > config.bow_range {
            continue;
        }
        if view.dot(to_target.normalized()) <= config.bow_cone_dot {
            continue;
        }
        if best.map_or(true, |(_, d)| dist < d) {
            best = Some((pos.0, dist));
        }
    }

    let velocity = match best {
        Some((target, _)) => (target - origin).normalized() * config.arrow_speed,
        None => view * config.arrow_speed,
    };

    let id = world.resource_mut::<crate::world::IdCounter>().alloc_projectile();
    world.spawn(ProjectileBundle::new(
        id,
        Owner::Player,
        config.arrow_damage,
        ARROW_COLOR,
        origin,
        velocity,
        now,
    ));

    world.resource_mut::<Loadout>().arrows -= 1;
    let mut effects = world.resource_mut::<EffectQueue>();
    effects.push(Effect::ArrowConsumed);
    effects.push(Effect::Sound {
        name: "bow_release".to_string(),
        x: origin.x,
        y: origin.y,
        z: origin.z,
    });
    true
}

/// Incoming damage pipeline shared by melee and ranged attacks on the
/// player: shield block first, then a flat miss roll, then clamped
/// mitigation. `None` means no damage landed.
pub fn mitigate_incoming(
    raw: f32,
    loadout: &Loadout,
    config: &SimConfig,
    rng: &mut dyn RandomSource,
    effects: &mut EffectQueue,
    at: Vec3,
) -> Option<f32> {
    if rng.roll() < loadout.shield.block_chance() {
        effects.push(Effect::Sound {
            name: "shield_block".to_string(),
            x: at.x,
            y: at.y,
            z: at.z,
        });
        return None;
    }
    if rng.roll() < config.incoming_miss_chance {
        return None;
    }
    let mitigation = (config.base_defense
        + loadout.shield.mitigation_bonus()
        + loadout.armor_reduction)
        .min(config.max_mitigation);
    Some(raw * (1.0 - mitigation))
}

/// Consumes queued enemy melee attacks against the player: the shared
/// block/dodge/mitigation pipeline plus an outward-and-up knockback impulse
/// on the player's velocity.
pub fn enemy_attack_system(
    config: Res<SimConfig>,
    mut queue: ResMut<AttackQueue>,
    mut player: ResMut<PlayerState>,
    loadout: Res<Loadout>,
    mut rng: ResMut<SimRng>,
    mut effects: ResMut<EffectQueue>,
) {
    for attack in queue.0.drain(..) {
        let raw = attack.kind.melee_damage();
        let at = player.position;
        if let Some(amount) =
            mitigate_incoming(raw, &loadout, &config, rng.0.as_mut(), &mut effects, at)
        {
            effects.push(Effect::PlayerHit { amount });
            effects.push(Effect::Sound {
                name: "player_hit".to_string(),
                x: at.x,
                y: at.y,
                z: at.z,
            });
            let outward =
                Vec3::new(at.x - attack.origin.x, 0.0, at.z - attack.origin.z).normalized();
            player.velocity += outward * config.knockback_impulse
                + Vec3::new(0.0, config.knockback_impulse * 0.5, 0.0);
            log::debug!(
                "creature {} hit player for {:.1}",
                attack.attacker,
                amount
            );
        }
    }
}

/// Removes creatures whose hp reached zero this pass and resolves their
/// deaths: independent material/rare/currency rolls, XP and quest-progress
/// effects. Runs at the end of every world advance and every interaction, so
/// dead creatures are gone within one tick.
pub fn resolve_deaths(world: &mut World) {
    let config = world.resource::<SimConfig>().clone();

    let mut dead = Vec::new();
    let mut query = world.query::<(Entity, &CreatureId, &CreatureKind, &Position, &Health)>();
    for (entity, id, kind, pos, health) in query.iter(world) {
        if !health.is_alive() {
            dead.push((entity, id.0, *kind, pos.0));
        }
    }
    if dead.is_empty() {
        return;
    }

    world.resource_scope(|world, mut rng: Mut<SimRng>| {
        let mut effects = world.resource_mut::<EffectQueue>();
        for (_, id, kind, pos) in &dead {
            effects.push(Effect::CreatureKilled {
                id: *id,
                kind: *kind,
            });
            effects.push(Effect::XpGained {
                kind: *kind,
                amount: kind.xp_reward(),
            });
            effects.push(Effect::QuestProgress {
                key: kind.name().to_string(),
                amount: 1,
            });

            // Independent rolls, fixed order: material, rare bonus, currency.
            if rng.0.roll() < config.material_drop_chance {
                effects.push(Effect::ItemDrop {
                    item: kind.material_drop(),
                    x: pos.x,
                    y: pos.y,
                    z: pos.z,
                });
            }
            if rng.0.roll() < config.rare_drop_chance {
                effects.push(Effect::ItemDrop {
                    item: ItemKind::Gem,
                    x: pos.x,
                    y: pos.y,
                    z: pos.z,
                });
            }
            if rng.0.roll() < config.currency_drop_chance {
                let amount = rng.0.range_u32(1, 3);
                effects.push(Effect::GoldGained { amount });
            }
            log::debug!("{} {} removed", kind.name(), id);
        }
    });

    for (entity, _, _, _) in dead {
        world.despawn(entity);
    }
}
