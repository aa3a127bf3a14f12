use clink::*;
use glam::Vec2;
use std::time::Instant;

fn lcg(seed: &mut u32) -> u32 {
    *seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
    *seed
}

fn unit(seed: &mut u32) -> f32 {
    lcg(seed) as f32 / u32::MAX as f32
}

fn main() {
    let mut system = PhysicsSystem::new(PhysicsSettings {
        cell_size: 2.0,
        gravity: Vec2::ZERO,
        enable_timing: true,
        ..Default::default()
    });

    let n = 5_000usize; // number of bodies
    let mut seed = 1u32;
    for i in 0..n {
        let p = Vec2::new(unit(&mut seed) * 200.0 - 100.0, unit(&mut seed) * 200.0 - 100.0);
        let v = Vec2::new(unit(&mut seed) * 4.0 - 2.0, unit(&mut seed) * 4.0 - 2.0);
        let collider = if i % 2 == 0 { Collider::rectangle(Vec2::ONE) } else { Collider::circle(0.5) };
        let mut body = PhysicsBody::simple(collider).with_position(p);
        if i % 4 != 0 {
            body = body.with_velocity(v);
        }
        system.add_body(body);
    }

    let ticks = 60;
    let t0 = Instant::now();
    let mut hits = 0;
    for _ in 0..ticks {
        system.fixed_update(1.0 / 60.0);
        hits += system.last_stats().hits;
    }
    let dt = t0.elapsed();
    let stats = system.last_stats();
    println!(
        "N={} cell_size={} ticks={} total={:?} last_tick={:.3}ms candidates={} tests={} hits/total={}/{} {:?}",
        n,
        system.settings().cell_size,
        ticks,
        dt,
        stats.tick_ms,
        stats.candidates,
        stats.narrowphase_tests,
        stats.hits,
        hits,
        system.tree_stats()
    );
}
