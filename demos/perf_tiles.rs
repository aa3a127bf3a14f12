use clink::*;
use glam::{IVec2, Vec2};
use std::time::Instant;

fn main() {
    // 256x256 map with ~1/16 solids in a lattice pattern, plus a solid floor
    let (w, h) = (256, 256);
    let map = TileMap::from_fn(TileGrid::default(), IVec2::ZERO, IVec2::new(w - 1, h - 1), |t| {
        t.y == 0 || (t.x ^ t.y) & 0x3 == 0
    });

    let t0 = Instant::now();
    let raw = tiles::extract_segments(&map, &EdgeLayers::default());
    let t_extract = t0.elapsed();
    let raw_count = raw.len();
    let t1 = Instant::now();
    let merged = tiles::merge_segments(raw);
    let t_merge = t1.elapsed();
    println!(
        "tiles={} raw={} merged={} extract={:?} merge={:?}",
        map.len(),
        raw_count,
        merged.len(),
        t_extract,
        t_merge
    );

    let mut system = PhysicsSystem::new(PhysicsSettings { cell_size: 2.0, ..Default::default() });
    let t2 = Instant::now();
    let board = system.add_body(PhysicsBody::tileable(map, EdgeLayers::default()));
    println!("register: {:?} {:?}", t2.elapsed(), system.tree_stats());

    // Tile edit throughput (each edit rebuilds the body's colliders)
    let n_edits = 64;
    let t3 = Instant::now();
    for i in 0..n_edits {
        system.set_tile(board, IVec2::new(1 + i * 3, 128), i % 2 == 0);
    }
    let dt = t3.elapsed().as_secs_f64();
    println!("tile_edit: edits={} secs={:.3} per_edit={:.3}ms", n_edits, dt, dt * 1000.0 / n_edits as f64);

    // Ray throughput
    let origin = Vec2::new(-10.0, 100.5);
    let dir = Vec2::new(1.0, 0.3).normalize();
    let n_rays = 20_000;
    let t4 = Instant::now();
    let mut acc = 0.0f32;
    for i in 0..n_rays {
        let max_t = 1000.0 + (i % 10) as f32;
        if let Some(hit) = system.raycast(origin, dir, max_t, Layers::ALL) {
            acc += hit.distance;
        }
    }
    let dt = t4.elapsed().as_secs_f64();
    println!("tile_raycast: rays={} secs={:.3} throughput={:.0} rays/s checksum={:.3}", n_rays, dt, n_rays as f64 / dt, acc);
}
