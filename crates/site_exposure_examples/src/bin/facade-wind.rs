use glam::{Affine3A, Quat, Vec2, Vec3};
use site_exposure::prelude::*;
use site_exposure_examples::{init_tracing, render_overlays_to_png, Projection, RenderConfig};
use tracing::info;

fn main() -> anyhow::Result<()> {
    init_tracing();
    // Slab blocks in a row, each turned a little further away from the wind.
    let mut scene = SceneSnapshot::new();
    for i in 0..5 {
        let angle = (i as f32) * std::f32::consts::FRAC_PI_8;
        let transform = Affine3A::from_rotation_translation(
            Quat::from_rotation_z(angle),
            Vec3::new(-48.0 + 24.0 * i as f32, 0.0, 0.0),
        );
        let block = cuboid(format!("block-{i}"), Vec3::new(0.0, 0.0, 15.0), Vec3::new(14.0, 6.0, 30.0))
            .with_transform(transform);
        scene = scene.with_mesh(block);
    }

    // Prevailing wind from the south-west quadrant.
    let config = AnalysisConfig::default().with_wind_from(Vec3::new(0.6, -0.8, 0.0));
    let request = AnalysisRequest::new(AnalysisMode::Wind, chrono::Utc::now());
    let outcome = run_analysis(&scene, &request, &config, &mut ())?;

    for mesh in &outcome.meshes {
        let peak = mesh.results.iter().map(|r| r.raw).fold(0.0f32, f32::max);
        info!("{}: peak wind exposure {:.2}.", mesh.mesh_id, peak);
    }

    let overlays: Vec<Overlay> = outcome.meshes.iter().map(|m| m.to_overlay()).collect();
    let rc = RenderConfig::new((1200, 400), Vec2::new(120.0, 40.0))
        .with_center(Vec2::new(0.0, 16.0))
        .with_projection(Projection::Elevation);
    render_overlays_to_png(&scene, &overlays, &rc, "facade-wind.png")?;

    Ok(())
}
