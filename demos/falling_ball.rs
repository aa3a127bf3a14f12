use clink::*;
use glam::{IVec2, Vec2};

fn main() {
    let mut system = PhysicsSystem::new(PhysicsSettings { enable_timing: true, ..Default::default() });

    // A shallow pit: solid ground with a raised lip on the right
    let ground = TileMap::from_rows(TileGrid::default(), &[
        "...........#",
        "############",
    ]);
    let ground = system.add_body(PhysicsBody::tileable(ground, EdgeLayers::default()).with_position(Vec2::new(-6.0, -2.0)));
    let ball = system.add_body(
        PhysicsBody::simple(Collider::circle(0.5))
            .with_position(Vec2::new(-3.0, 3.0))
            .with_velocity(Vec2::new(4.0, 0.0))
            .with_material(PhysicsMaterial::new(0.6, 0.2))
            .kinematic(),
    );
    println!("ground={:?} ({} edge colliders) ball={:?}", ground, system.body(ground).map_or(0, |b| b.get_colliders().len()), ball);

    let dt = system.settings().time_step;
    for tick in 0..180 {
        system.fixed_update(dt);
        for ev in system.drain_collisions(ball) {
            println!(
                "tick {:3}: ball hit {:?} n=({:.2},{:.2}) mtv=({:.3},{:.3})",
                tick, ev.second_collider, ev.normal.x, ev.normal.y, ev.minimum_translation_vector.x, ev.minimum_translation_vector.y
            );
        }
        system.drain_collisions(ground);
        if tick == 90 {
            // Knock out the lip; the ball rolls off the edge
            system.set_tile(ground, IVec2::new(11, 1), false);
        }
    }

    if let Some(body) = system.body(ball) {
        println!("ball at ({:.3},{:.3}) v=({:.3},{:.3})", body.position().x, body.position().y, body.velocity().x, body.velocity().y);
    }
    let stats = system.last_stats();
    println!(
        "last tick: stepped={} candidates={} tests={} hits={} resolved={} {:.3}ms",
        stats.bodies_stepped, stats.candidates, stats.narrowphase_tests, stats.hits, stats.resolutions, stats.tick_ms
    );
    if let Some(hit) = system.raycast(Vec2::new(0.0, 10.0), Vec2::NEG_Y, 50.0, Layers::ALL) {
        println!("ray down from (0,10): {:?} at {:.3}", hit.collider, hit.distance);
    }
}
