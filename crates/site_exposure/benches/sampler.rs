mod common;

use std::hint::black_box;

use chrono::{TimeZone, Utc};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use site_exposure::analysis::runner::{run_analysis, AnalysisConfig, AnalysisRequest};
use site_exposure::analysis::sampler::{DirectionSet, ExposureSampler};
use site_exposure::analysis::AnalysisMode;
use site_exposure::geometry::bvh::Bvh;
use site_exposure::geometry::OccluderSet;
use site_exposure::solar::{SiteLocation, SolarWindow};
use site_exposure::thresholds::ThresholdSet;

const TOWER_COUNTS: [usize; 4] = [0, 16, 64, 256];
const DIVISIONS: [u32; 3] = [16, 32, 64];

fn sampler_sun_hours_benches(c: &mut Criterion) {
    let reference = Utc.with_ymd_and_hms(2024, 3, 21, 12, 0, 0).unwrap();
    let window = SolarWindow::default();
    let suns = window.sun_samples(reference, &SiteLocation::default());
    let directions = DirectionSet::solar(&suns, window.window_hours());

    let mut group = c.benchmark_group("sampler/sun_hours");
    for &towers in &TOWER_COUNTS {
        let scene = common::city_block(32, towers, 0x5EED ^ towers as u64);
        let occluders = OccluderSet::from_meshes(scene.ray_targets());
        let (samples, _) = scene.meshes[0].surface_samples(0).unwrap();
        let sampler = ExposureSampler::new(&occluders, 0.1, 0.2);
        group.throughput(common::elements_throughput(samples.len()));

        group.bench_with_input(BenchmarkId::from_parameter(towers), &towers, |b, _| {
            b.iter(|| {
                let out = sampler.sample(&samples, &directions);
                black_box(out.len());
            });
        });
    }
    group.finish();
}

fn bvh_build_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("geometry/bvh_build");
    for &towers in &TOWER_COUNTS[1..] {
        let scene = common::city_block(64, towers, 0xB0B ^ towers as u64);
        let triangles: Vec<_> = scene
            .ray_targets()
            .flat_map(|m| m.world_triangles().unwrap())
            .collect();
        group.throughput(common::elements_throughput(triangles.len()));

        group.bench_with_input(BenchmarkId::from_parameter(towers), &towers, |b, _| {
            b.iter(|| {
                let bvh = Bvh::build(triangles.clone());
                black_box(bvh.triangle_count());
            });
        });
    }
    group.finish();
}

fn full_pass_benches(c: &mut Criterion) {
    let reference = Utc.with_ymd_and_hms(2024, 6, 21, 12, 0, 0).unwrap();
    let config = AnalysisConfig::default();
    let request = AnalysisRequest::new(AnalysisMode::SunHours, reference)
        .with_thresholds(Some(ThresholdSet::default()));

    let mut group = c.benchmark_group("runner/sun_hours_pass");
    for &divisions in &DIVISIONS {
        let scene = common::city_block(divisions, 64, 0xC17E);
        let vertices = ((divisions + 1) * (divisions + 1)) as usize;
        group.throughput(common::elements_throughput(vertices));

        group.bench_with_input(
            BenchmarkId::from_parameter(divisions),
            &divisions,
            |b, _| {
                b.iter(|| {
                    let outcome = run_analysis(&scene, &request, &config, &mut ()).unwrap();
                    black_box(outcome.samples);
                });
            },
        );
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = common::default_criterion();
    targets = sampler_sun_hours_benches, bvh_build_benches, full_pass_benches
}
criterion_main!(benches);
