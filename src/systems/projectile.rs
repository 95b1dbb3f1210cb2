//! Projectile flight and hit detection.
//!
//! Runs every frame advance. Projectiles fly straight (no gravity), connect
//! by proximity radius, and are culled in one batch at the end of the pass
//! when out of range, below the world floor, expired, or spent on a hit.
//! Movement is substepped so a single move never exceeds the hit radius; a
//! fast bolt cannot cross the player between samples.

use crate::components::*;
use crate::config::{DeltaTime, SimConfig, SimTime};
use crate::physics::PlayerState;
use crate::rng::SimRng;
use crate::systems::combat::{mitigate_incoming, Loadout};
use crate::world::{Effect, EffectQueue};
use bevy_ecs::prelude::*;

pub fn projectile_system(
    mut commands: Commands,
    config: Res<SimConfig>,
    dt: Res<DeltaTime>,
    time: Res<SimTime>,
    player: Res<PlayerState>,
    loadout: Res<Loadout>,
    mut rng: ResMut<SimRng>,
    mut effects: ResMut<EffectQueue>,
    mut projectiles: Query<(Entity, &ProjectileInfo, &mut Position, &Velocity), With<Projectile>>,
    mut creatures: Query<(&Position, &CreatureKind, &mut Health, &mut CombatTimers), Without<Projectile>>,
) {
    let player_center = player.position + Vec3::new(0.0, config.player_height * 0.5, 0.0);
    let mut expired = Vec::new();

    for (entity, info, mut pos, vel) in projectiles.iter_mut() {
        let travel = vel.0 * dt.0;
        if !travel.is_finite() {
            expired.push(entity);
            continue;
        }
        let steps = (travel.length() / config.projectile_hit_radius)
            .ceil()
            .max(1.0) as u32;
        let step = travel * (1.0 / steps as f32);

        let mut spent = false;
        'march: for _ in 0..steps {
            pos.0 += step;
            let p = pos.0;
            match info.owner {
                Owner::Creature(_) => {
                    if p.distance_to(player_center) <= config.projectile_hit_radius {
                        if let Some(amount) = mitigate_incoming(
                            info.damage,
                            &loadout,
                            &config,
                            rng.0.as_mut(),
                            &mut effects,
                            p,
                        ) {
                            effects.push(Effect::PlayerHit { amount });
                            effects.push(Effect::Sound {
                                name: "bolt_hit".to_string(),
                                x: p.x,
                                y: p.y,
                                z: p.z,
                            });
                        }
                        // Blocked or not, the projectile is spent.
                        spent = true;
                        break 'march;
                    }
                }
                Owner::Player => {
                    for (cpos, _, mut health, mut timers) in creatures.iter_mut() {
                        if !health.is_alive() {
                            continue;
                        }
                        if p.distance_to(cpos.0) <= config.projectile_hit_radius {
                            health.damage(info.damage);
                            timers.last_damaged = time.0;
                            effects.push(Effect::Sound {
                                name: "arrow_hit".to_string(),
                                x: p.x,
                                y: p.y,
                                z: p.z,
                            });
                            spent = true;
                            break 'march;
                        }
                    }
                }
            }
        }

        let p = pos.0;
        if spent
            || !p.is_finite()
            || p.y < config.world_floor_y
            || p.distance_to(player.position) > config.projectile_max_range
            || time.0 - info.spawned_at > config.projectile_max_age
        {
            expired.push(entity);
        }
    }

    for entity in expired {
        commands.entity(entity).despawn();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ConstRng;
    use crate::systems::combat::SPELL_COLOR;

    fn projectile_world(rng: f32) -> (World, Schedule) {
        let mut world = World::new();
        world.insert_resource(SimConfig::default());
        world.insert_resource(SimTime(0.0));
        world.insert_resource(DeltaTime(0.05));
        world.insert_resource(PlayerState::default());
        world.insert_resource(Loadout::default());
        world.insert_resource(SimRng::new(ConstRng(rng)));
        world.insert_resource(EffectQueue::default());
        let mut schedule = Schedule::default();
        schedule.add_systems(projectile_system);
        (world, schedule)
    }

    #[test]
    fn test_projectiles_fly_straight() {
        let (mut world, mut schedule) = projectile_world(0.99);
        let entity = world
            .spawn(ProjectileBundle::new(
                1,
                Owner::Player,
                15.0,
                [1.0; 3],
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(0.0, 0.0, -20.0),
                0.0,
            ))
            .id();
        schedule.run(&mut world);
        let pos = world.get::<Position>(entity).unwrap().0;
        assert_eq!(pos.z, -1.0);
        assert_eq!(pos.y, 1.0); // no gravity on projectiles
    }

    #[test]
    fn test_enemy_bolt_hits_player() {
        let (mut world, mut schedule) = projectile_world(0.99);
        let config = world.resource::<SimConfig>().clone();
        // One step from the player's center.
        world.spawn(ProjectileBundle::new(
            1,
            Owner::Creature(7),
            config.spell_damage,
            SPELL_COLOR,
            Vec3::new(0.0, config.player_height * 0.5, -0.5),
            Vec3::new(0.0, 0.0, 4.0),
            0.0,
        ));
        schedule.run(&mut world);

        let effects = world.resource_mut::<EffectQueue>().drain();
        let expected = config.spell_damage * (1.0 - config.base_defense);
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::PlayerHit { amount } if (*amount - expected).abs() < 1e-4)));
        let mut query = world.query_filtered::<Entity, With<Projectile>>();
        assert_eq!(query.iter(&world).count(), 0);
    }

    #[test]
    fn test_blocked_bolt_is_still_spent() {
        let (mut world, mut schedule) = projectile_world(0.1);
        world.resource_mut::<Loadout>().shield = ShieldTier::Iron; // 0.1 < 0.4 blocks
        world.spawn(ProjectileBundle::new(
            1,
            Owner::Creature(7),
            12.0,
            SPELL_COLOR,
            Vec3::new(0.0, 0.9, -0.5),
            Vec3::new(0.0, 0.0, 4.0),
            0.0,
        ));
        schedule.run(&mut world);
        let effects = world.resource_mut::<EffectQueue>().drain();
        assert!(!effects.iter().any(|e| matches!(e, Effect::PlayerHit { .. })));
        let mut query = world.query_filtered::<Entity, With<Projectile>>();
        assert_eq!(query.iter(&world).count(), 0);
    }

    #[test]
    fn test_player_arrow_damages_creature_not_player() {
        let (mut world, mut schedule) = projectile_world(0.99);
        let creature = world
            .spawn(CreatureBundle::new(
                1,
                CreatureKind::Zombie,
                Vec3::new(0.0, 0.0, -5.0),
            ))
            .id();
        // Arrow launched at the player's own position: owner check keeps it
        // from connecting there.
        world.spawn(ProjectileBundle::new(
            1,
            Owner::Player,
            15.0,
            [1.0; 3],
            Vec3::new(0.0, 0.9, 0.0),
            Vec3::new(0.0, 0.0, -90.0),
            0.0,
        ));
        schedule.run(&mut world);

        let hp = world.get::<Health>(creature).unwrap().current;
        assert_eq!(hp, CreatureKind::Zombie.max_health() - 15.0);
        let effects = world.resource_mut::<EffectQueue>().drain();
        assert!(!effects.iter().any(|e| matches!(e, Effect::PlayerHit { .. })));
    }

    #[test]
    fn test_fast_bolt_cannot_skip_past_player() {
        // One large frame moves the bolt 5 units, from well in front of the
        // player to well behind; substepping still registers the hit.
        let (mut world, mut schedule) = projectile_world(0.99);
        world.insert_resource(DeltaTime(0.5));
        let config = world.resource::<SimConfig>().clone();
        world.spawn(ProjectileBundle::new(
            1,
            Owner::Creature(3),
            config.spell_damage,
            SPELL_COLOR,
            Vec3::new(0.0, config.player_height * 0.5, -2.5),
            Vec3::new(0.0, 0.0, 10.0),
            0.0,
        ));
        schedule.run(&mut world);

        let effects = world.resource_mut::<EffectQueue>().drain();
        assert!(effects.iter().any(|e| matches!(e, Effect::PlayerHit { .. })));
        let mut query = world.query_filtered::<Entity, With<Projectile>>();
        assert_eq!(query.iter(&world).count(), 0);
    }

    #[test]
    fn test_out_of_range_culled_in_batch() {
        let (mut world, mut schedule) = projectile_world(0.99);
        let config = world.resource::<SimConfig>().clone();
        for i in 0..4 {
            world.spawn(ProjectileBundle::new(
                i,
                Owner::Player,
                15.0,
                [1.0; 3],
                Vec3::new(0.0, 1.0, -(config.projectile_max_range + 5.0)),
                Vec3::new(0.0, 0.0, -1.0),
                0.0,
            ));
        }
        schedule.run(&mut world);
        let mut query = world.query_filtered::<Entity, With<Projectile>>();
        assert_eq!(query.iter(&world).count(), 0);
    }

    #[test]
    fn test_expired_by_age() {
        let (mut world, mut schedule) = projectile_world(0.99);
        let config = world.resource::<SimConfig>().clone();
        world.insert_resource(SimTime(config.projectile_max_age + 1.0));
        world.spawn(ProjectileBundle::new(
            1,
            Owner::Player,
            15.0,
            [1.0; 3],
            Vec3::new(0.0, 1.0, -10.0),
            Vec3::new(0.0, 0.0, -1.0),
            0.0,
        ));
        schedule.run(&mut world);
        let mut query = world.query_filtered::<Entity, With<Projectile>>();
        assert_eq!(query.iter(&world).count(), 0);
    }

    #[test]
    fn test_below_floor_culled() {
        let (mut world, mut schedule) = projectile_world(0.99);
        let config = world.resource::<SimConfig>().clone();
        world.spawn(ProjectileBundle::new(
            1,
            Owner::Player,
            15.0,
            [1.0; 3],
            Vec3::new(0.0, config.world_floor_y - 1.0, -10.0),
            Vec3::new(0.0, -1.0, 0.0),
            0.0,
        ));
        schedule.run(&mut world);
        let mut query = world.query_filtered::<Entity, With<Projectile>>();
        assert_eq!(query.iter(&world).count(), 0);
    }
}
