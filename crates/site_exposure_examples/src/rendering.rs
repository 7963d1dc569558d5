use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use glam::{Vec2, Vec3};
use image::{Rgb, RgbImage};
use site_exposure::analysis::overlay::Overlay;
use site_exposure::geometry::{HostMesh, SceneSnapshot};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs a `fmt` subscriber honoring `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

/// How world space is flattened onto the image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Top-down: image x = world x, image up = world +y. Higher surfaces win.
    Plan,
    /// Looking north from the south: image x = world x, image up = world +z.
    Elevation,
}

impl Projection {
    fn project(self, p: Vec3) -> (Vec2, f32) {
        match self {
            Projection::Plan => (Vec2::new(p.x, p.y), p.z),
            Projection::Elevation => (Vec2::new(p.x, p.z), -p.y),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub size_px: (u32, u32),
    /// Projected-space center of the image.
    pub center: Vec2,
    /// Projected-space extent covered by the image.
    pub extent: Vec2,
    pub projection: Projection,
    pub background: [u8; 3],
    /// Color of meshes without an overlay.
    pub context_color: [u8; 3],
}

impl RenderConfig {
    pub fn new(size_px: (u32, u32), extent: Vec2) -> Self {
        Self {
            size_px,
            center: Vec2::ZERO,
            extent,
            projection: Projection::Plan,
            background: [235, 235, 240],
            context_color: [110, 110, 120],
        }
    }

    pub fn with_center(mut self, center: Vec2) -> Self {
        self.center = center;
        self
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn with_background(mut self, background: [u8; 3]) -> Self {
        self.background = background;
        self
    }

    fn to_pixel(&self, p: Vec2) -> Vec2 {
        let (w, h) = (self.size_px.0 as f32, self.size_px.1 as f32);
        let uv = (p - self.center) / self.extent;
        Vec2::new((uv.x + 0.5) * w, (0.5 - uv.y) * h)
    }
}

struct Canvas {
    image: RgbImage,
    depth: Vec<f32>,
}

impl Canvas {
    fn new(rc: &RenderConfig) -> Self {
        let (w, h) = rc.size_px;
        Self {
            image: RgbImage::from_pixel(w, h, Rgb(rc.background)),
            depth: vec![f32::NEG_INFINITY; (w as usize) * (h as usize)],
        }
    }

    /// Fills a screen-space triangle, interpolating vertex colors, nearest surface wins.
    fn fill(&mut self, pts: [(Vec2, f32); 3], colors: [Vec3; 3]) {
        let (w, h) = self.image.dimensions();
        let [(a, za), (b, zb), (c, zc)] = pts;
        let area = edge(a, b, c);
        if area.abs() < 1e-9 {
            return;
        }
        let min = a.min(b).min(c).floor().max(Vec2::ZERO);
        let max = a.max(b).max(c).ceil().min(Vec2::new(w as f32 - 1.0, h as f32 - 1.0));
        if min.x > max.x || min.y > max.y {
            return;
        }

        for y in min.y as u32..=max.y as u32 {
            for x in min.x as u32..=max.x as u32 {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let (wa, wb, wc) = (edge(b, c, p) / area, edge(c, a, p) / area, edge(a, b, p) / area);
                if wa < 0.0 || wb < 0.0 || wc < 0.0 {
                    continue;
                }
                let z = wa * za + wb * zb + wc * zc;
                let idx = (y as usize) * (w as usize) + x as usize;
                if z <= self.depth[idx] {
                    continue;
                }
                self.depth[idx] = z;
                let rgb = (colors[0] * wa + colors[1] * wb + colors[2] * wc) * 255.0;
                self.image.put_pixel(
                    x,
                    y,
                    Rgb([rgb.x as u8, rgb.y as u8, rgb.z as u8]),
                );
            }
        }
    }
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b - a).perp_dot(p - a)
}

fn triangle_indices(mesh: &HostMesh) -> Vec<[usize; 3]> {
    match &mesh.indices {
        Some(indices) => indices
            .chunks_exact(3)
            .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
            .collect(),
        None => (0..mesh.vertex_count() / 3)
            .map(|t| [3 * t, 3 * t + 1, 3 * t + 2])
            .collect(),
    }
}

fn draw_mesh(canvas: &mut Canvas, rc: &RenderConfig, mesh: &HostMesh, colors: &dyn Fn(usize) -> Vec3) {
    let Some(positions) = &mesh.positions else {
        return;
    };
    for tri in triangle_indices(mesh) {
        let Some(corners) = tri
            .iter()
            .map(|&i| positions.get(i).map(|&p| mesh.transform.transform_point3(p)))
            .collect::<Option<Vec<_>>>()
        else {
            continue;
        };
        let projected = [0, 1, 2].map(|k| {
            let (p, depth) = rc.projection.project(corners[k]);
            (rc.to_pixel(p), depth)
        });
        canvas.fill(projected, tri.map(|i| colors(i)));
    }
}

/// Renders the scene with overlay colors on analyzed meshes and writes a PNG.
pub fn render_overlays_to_png<'a>(
    scene: &SceneSnapshot,
    overlays: impl IntoIterator<Item = &'a Overlay>,
    rc: &RenderConfig,
    path: impl AsRef<Path>,
) -> anyhow::Result<()> {
    let by_owner: HashMap<&str, &Overlay> = overlays
        .into_iter()
        .map(|o| (o.owner.as_str(), o))
        .collect();
    let context = Vec3::from_array(rc.context_color.map(|c| c as f32 / 255.0));

    let mut canvas = Canvas::new(rc);
    for mesh in scene.ray_targets() {
        match by_owner.get(mesh.id.as_str()) {
            Some(overlay) => draw_mesh(&mut canvas, rc, mesh, &|i| {
                overlay
                    .colors
                    .get(i)
                    .map_or(context, |c| Vec3::new(c.r, c.g, c.b))
            }),
            None => draw_mesh(&mut canvas, rc, mesh, &|_| context),
        }
    }

    let path = path.as_ref();
    canvas
        .image
        .save(path)
        .with_context(|| format!("writing {}", path.display()))?;
    info!("Wrote {}.", path.display());
    Ok(())
}
