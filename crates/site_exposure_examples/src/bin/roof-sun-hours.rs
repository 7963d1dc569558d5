use anyhow::Context;
use chrono::{NaiveDate, TimeZone, Utc};
use glam::{Vec2, Vec3};
use site_exposure::prelude::*;
use site_exposure_examples::{
    certification_documents, context_towers, init_tracing, render_overlays_to_png, RenderConfig,
};
use tracing::info;

fn main() -> anyhow::Result<()> {
    init_tracing();
    // Analyzed day, e.g. `roof-sun-hours 2024-12-21`; defaults to the March equinox.
    let day = match std::env::args().nth(1) {
        Some(arg) => NaiveDate::parse_from_str(&arg, "%Y-%m-%d")
            .with_context(|| format!("expected YYYY-MM-DD, got '{arg}'"))?,
        None => NaiveDate::from_ymd_opt(2024, 3, 21).context("invalid default date")?,
    };
    let reference = Utc
        .from_utc_datetime(&day.and_hms_opt(12, 0, 0).context("invalid noon")?);

    // A 60 m roof terrace with a tower on its south-east corner, inside a seeded block.
    let mut scene = SceneSnapshot::new()
        .with_mesh(grid_plane("terrace", Vec3::ZERO, (60.0, 60.0), (60, 60)))
        .with_mesh(cuboid(
            "tower",
            Vec3::new(-18.0, -22.0, 20.0),
            Vec3::new(14.0, 12.0, 40.0),
        ));
    for tower in context_towers(7, 24, Vec2::splat(180.0), 32.0) {
        scene = scene.with_occluder(tower);
    }

    // Threshold context from the certification text.
    let thresholds = resolve_thresholds(&certification_documents());
    if let Some(sun) = thresholds.and_then(|t| t.sun_hours) {
        info!(
            "Sun hours: minimum {:.1} h, target {:.1} h ({:?}).",
            sun.minimum, sun.target, sun.source
        );
    }

    let config = AnalysisConfig::default();
    let request =
        AnalysisRequest::new(AnalysisMode::SunHours, reference).with_thresholds(thresholds);
    let mut events = VecSink::new();
    let outcome = run_analysis(&scene, &request, &config, &mut events)?;

    for mesh in &outcome.meshes {
        let mut bands = [0usize; 3];
        for r in &mesh.results {
            if let Some(band) = r.classification.band() {
                bands[band as usize] += 1;
            }
        }
        info!(
            "{}: {} below minimum, {} meets minimum, {} exceeds target.",
            mesh.mesh_id, bands[0], bands[1], bands[2]
        );
    }

    let overlays: Vec<Overlay> = outcome.meshes.iter().map(|m| m.to_overlay()).collect();
    let rc = RenderConfig::new((900, 900), Vec2::splat(180.0));
    render_overlays_to_png(&scene, &overlays, &rc, "roof-sun-hours.png")?;

    Ok(())
}
