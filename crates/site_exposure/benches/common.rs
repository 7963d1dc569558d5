#![allow(dead_code)]

use std::time::Duration;

use criterion::{Criterion, Throughput};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use site_exposure::geometry::primitives::{cuboid, grid_plane};
use site_exposure::geometry::SceneSnapshot;

pub const SAMPLE_SIZE: usize = 20;
pub const WARM_UP: Duration = Duration::from_secs(1);
pub const MEASUREMENT_TIME: Duration = Duration::from_secs(2);

pub fn default_criterion() -> Criterion {
    Criterion::default()
        .configure_from_args()
        .sample_size(SAMPLE_SIZE)
        .warm_up_time(WARM_UP)
        .measurement_time(MEASUREMENT_TIME)
}

pub fn elements_throughput(elements: usize) -> Throughput {
    Throughput::Elements(elements.max(1) as u64)
}

fn unit(rng: &mut StdRng) -> f32 {
    (rng.next_u32() as f32) / ((u32::MAX as f32) + 1.0)
}

/// A 200 m square site with `divisions`² ground cells and `towers` random blocks.
pub fn city_block(divisions: u32, towers: usize, seed: u64) -> SceneSnapshot {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut scene = SceneSnapshot::new().with_mesh(grid_plane(
        "ground",
        Vec3::ZERO,
        (200.0, 200.0),
        (divisions, divisions),
    ));
    for i in 0..towers {
        let footprint = 8.0 + 12.0 * unit(&mut rng);
        let height = 10.0 + 60.0 * unit(&mut rng);
        let center = Vec3::new(
            -90.0 + 180.0 * unit(&mut rng),
            -90.0 + 180.0 * unit(&mut rng),
            height * 0.5,
        );
        scene = scene.with_occluder(cuboid(
            format!("tower-{i}"),
            center,
            Vec3::new(footprint, footprint, height),
        ));
    }
    scene
}
