use blockfall_sim::{Block, CreatureKind, Material, SimWorld, Vec3};
use criterion::{criterion_group, criterion_main, Criterion};

fn populated_sim(creatures: usize) -> SimWorld {
    let mut sim = SimWorld::new();

    let mut blocks = Vec::new();
    let mut id = 0;
    for x in -32..=32 {
        for z in -32..=32 {
            blocks.push(Block::new(id, x, -1, z, Material::Grass));
            id += 1;
        }
    }
    sim.set_blocks(&blocks);

    let kinds = [
        CreatureKind::Zombie,
        CreatureKind::Skeleton,
        CreatureKind::Cow,
        CreatureKind::Sorcerer,
    ];
    for i in 0..creatures {
        let kind = kinds[i % kinds.len()];
        let angle = i as f32 * 0.7;
        let dist = 5.0 + (i % 20) as f32;
        sim.spawn_creature(
            kind,
            Vec3::new(angle.cos() * dist, -0.5, angle.sin() * dist),
        );
    }
    sim
}

fn bench_advance(c: &mut Criterion) {
    let dt = 1.0 / 60.0;

    c.bench_function("advance_50_creatures", |b| {
        let mut sim = populated_sim(50);
        b.iter(|| {
            sim.advance_physics(dt);
            sim.advance_world(dt);
        });
    });

    c.bench_function("advance_200_creatures", |b| {
        let mut sim = populated_sim(200);
        b.iter(|| {
            sim.advance_physics(dt);
            sim.advance_world(dt);
        });
    });

    c.bench_function("snapshot_200_creatures", |b| {
        let mut sim = populated_sim(200);
        sim.advance_world(dt);
        b.iter(|| sim.snapshot());
    });
}

criterion_group!(benches, bench_advance);
criterion_main!(benches);
