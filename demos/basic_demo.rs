//! Minimal driver: flat ground, a few creatures, and a short simulated
//! session printing snapshots.
//!
//! Run with `cargo run --example basic_demo`.

use blockfall_sim::{
    Block, CreatureKind, Interaction, Loadout, Material, SimWorld, Vec3, WeaponKind,
};

fn main() {
    env_logger::init();

    let mut sim = SimWorld::new();

    // 33x33 grass field at y = -1.
    let mut blocks = Vec::new();
    let mut id = 0;
    for x in -16..=16 {
        for z in -16..=16 {
            blocks.push(Block::new(id, x, -1, z, Material::Grass));
            id += 1;
        }
    }
    sim.set_blocks(&blocks);

    sim.spawn_creature(CreatureKind::Zombie, Vec3::new(10.0, -0.5, 0.0));
    sim.spawn_creature(CreatureKind::Cow, Vec3::new(-6.0, -0.5, 4.0));
    sim.spawn_creature(CreatureKind::Sorcerer, Vec3::new(0.0, -0.5, -14.0));

    sim.set_loadout(Loadout {
        weapon: WeaponKind::Sword,
        ..Default::default()
    });

    // Two simulated seconds at 60 fps.
    let dt = 1.0 / 60.0;
    for frame in 0..120 {
        sim.advance_physics(dt);
        sim.advance_world(dt);

        if frame == 60 {
            // Swing at whatever is in front of the player.
            sim.interact(Interaction::Attack {
                facing: Vec3::new(1.0, 0.0, 0.0),
            });
        }

        if frame % 30 == 29 {
            let snapshot = sim.snapshot();
            println!(
                "t={:.2}s creatures={} projectiles={} effects={}",
                snapshot.time,
                snapshot.creatures.len(),
                snapshot.projectiles.len(),
                snapshot.effects.len()
            );
            for c in &snapshot.creatures {
                println!(
                    "  {} #{} at ({:.1}, {:.1}, {:.1}) hp {:.0}/{:.0}{}",
                    c.kind,
                    c.id,
                    c.x,
                    c.y,
                    c.z,
                    c.hp,
                    c.hp_max,
                    if c.moving { " (moving)" } else { "" }
                );
            }
        }
    }

    match sim.snapshot_json() {
        Ok(json) => println!("final snapshot: {} bytes of JSON", json.len()),
        Err(e) => eprintln!("snapshot failed: {e}"),
    }
}
