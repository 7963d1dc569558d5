use std::time::{Duration, Instant};

use chrono::{TimeDelta, TimeZone, Utc};
use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use site_exposure::prelude::*;
use site_exposure_examples::{
    certification_documents, init_tracing, render_overlays_to_png, unit_random, RenderConfig,
};
use tracing::info;

fn main() -> anyhow::Result<()> {
    init_tracing();
    let start = Utc
        .with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
        .single()
        .ok_or_else(|| anyhow::anyhow!("invalid start date"))?;

    let scene = SceneSnapshot::new()
        .with_mesh(grid_plane("courtyard", Vec3::ZERO, (40.0, 40.0), (40, 40)))
        .with_occluder(cuboid("south-wing", Vec3::new(0.0, -26.0, 9.0), Vec3::new(52.0, 12.0, 18.0)))
        .with_occluder(cuboid("west-wing", Vec3::new(26.0, 0.0, 6.0), Vec3::new(12.0, 40.0, 12.0)));

    let config = AnalysisConfig::default().with_debounce(Duration::from_millis(150));
    let mut orchestrator = Orchestrator::try_new(config, start)?;
    let t0 = Instant::now();
    orchestrator.set_scene(scene.clone(), t0);
    orchestrator.set_regulations(certification_documents(), t0);
    orchestrator.set_mode(AnalysisMode::SunHours, t0);

    let mut passes = 0usize;
    let mut sink = FnSink::new(|event| {
        if let AnalysisEvent::PassFinished { elapsed, .. } = event {
            passes += 1;
            info!("Pass finished in {:?}.", elapsed);
        }
    });

    // A user drags the date slider across half a year in uneven 30-90 ms steps, pauses,
    // drags again, then lets go. Time is simulated; each frame is one `tick`.
    let mut rng = StdRng::seed_from_u64(2024);
    let mut now = t0;
    let mut day = 0i64;
    let mut moves = 0usize;
    for drag in 0..2 {
        for _ in 0..40 {
            now += Duration::from_millis(30 + (unit_random(&mut rng) * 60.0) as u64);
            day += 2;
            moves += 1;
            orchestrator.set_reference_time(start + TimeDelta::days(day), now);
            orchestrator.tick(now, &mut sink);
        }
        info!("Drag {} released at day {}.", drag + 1, day);
        now += Duration::from_millis(400);
        orchestrator.tick(now, &mut sink);
    }
    drop(sink);

    let updates = orchestrator.drain_updates();
    info!(
        "{} slider moves coalesced into {} passes, {} meshes updated.",
        moves,
        passes,
        updates.len()
    );

    let rc = RenderConfig::new((800, 800), Vec2::splat(80.0));
    let overlays = orchestrator.overlays().iter().map(|o| &**o);
    render_overlays_to_png(&scene, overlays, &rc, "date-slider-debounce.png")?;

    orchestrator.set_mode(AnalysisMode::Off, now);
    info!(
        "Analysis off: {} overlays left, {} removals queued.",
        orchestrator.overlays().len(),
        orchestrator.drain_updates().len()
    );

    Ok(())
}
