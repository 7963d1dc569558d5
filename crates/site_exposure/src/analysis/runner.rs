//! High-level runner executing one analysis pass over a scene snapshot.
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use glam::Vec3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analysis::classify::{ComplianceClassifier, Rgba};
use crate::analysis::events::{AnalysisEvent, AnalysisEventKind, EventSink};
use crate::analysis::overlay::{build_color_buffer, Overlay};
use crate::analysis::sampler::{DirectionSet, ExposureSampler};
use crate::analysis::{AnalysisMode, ExposureResult};
use crate::error::{Error, Result};
use crate::geometry::{MeshId, OccluderSet, SceneSnapshot};
use crate::solar::{SiteLocation, SolarWindow};
use crate::thresholds::ThresholdSet;

/// Configuration shared by every analysis pass.
#[non_exhaustive]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Geographic site used for sun positions.
    pub site: SiteLocation,
    /// Local-time window sampled in sun-hours mode.
    pub solar_window: SolarWindow,
    /// Offset along the normal applied to ray origins, in world units.
    pub ray_epsilon: f32,
    /// Hits at or below this distance do not count as occlusion.
    pub hit_tolerance: f32,
    /// Direction the prevailing wind comes from. Normalized before use.
    pub wind_from: Vec3,
    /// Quiet period before the orchestrator recomputes after an input change.
    pub debounce: Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            site: SiteLocation::default(),
            solar_window: SolarWindow::default(),
            ray_epsilon: 0.1,
            hit_tolerance: 0.2,
            wind_from: Vec3::X,
            debounce: Duration::from_millis(150),
        }
    }
}

impl AnalysisConfig {
    /// Creates a new [`AnalysisConfig`] for the given site.
    pub fn new(site: SiteLocation) -> Self {
        Self {
            site,
            ..Default::default()
        }
    }

    /// Sets the site.
    pub fn with_site(mut self, site: SiteLocation) -> Self {
        self.site = site;
        self
    }

    /// Sets the solar sampling window.
    pub fn with_solar_window(mut self, solar_window: SolarWindow) -> Self {
        self.solar_window = solar_window;
        self
    }

    /// Sets the ray origin offset.
    pub fn with_ray_epsilon(mut self, ray_epsilon: f32) -> Self {
        self.ray_epsilon = ray_epsilon;
        self
    }

    /// Sets the self-hit tolerance.
    pub fn with_hit_tolerance(mut self, hit_tolerance: f32) -> Self {
        self.hit_tolerance = hit_tolerance;
        self
    }

    /// Sets the direction the prevailing wind comes from.
    pub fn with_wind_from(mut self, wind_from: Vec3) -> Self {
        self.wind_from = wind_from;
        self
    }

    /// Sets the orchestrator debounce.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Unit wind vector.
    pub fn wind_direction(&self) -> Vec3 {
        self.wind_from.normalize_or_zero()
    }

    /// Validates the configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        let site = &self.site;
        if !site.latitude.is_finite() || !(-90.0..=90.0).contains(&site.latitude) {
            return Err(Error::InvalidConfig(
                "site latitude must be within [-90, 90]".into(),
            ));
        }
        if !site.longitude.is_finite() {
            return Err(Error::InvalidConfig("site longitude must be finite".into()));
        }

        let window = &self.solar_window;
        let in_day = |h: f32| h.is_finite() && (0.0..=24.0).contains(&h);
        if !in_day(window.start_hour) || !in_day(window.end_hour) {
            return Err(Error::InvalidConfig(
                "solar window hours must be within [0, 24]".into(),
            ));
        }
        if window.end_hour <= window.start_hour {
            return Err(Error::InvalidConfig(
                "solar window must end after it starts".into(),
            ));
        }
        if window.samples == 0 {
            return Err(Error::InvalidConfig(
                "solar window needs at least one sample".into(),
            ));
        }

        if !(self.ray_epsilon.is_finite() && self.ray_epsilon > 0.0) {
            return Err(Error::InvalidConfig("ray_epsilon must be > 0".into()));
        }
        if !(self.hit_tolerance.is_finite() && self.hit_tolerance > 0.0) {
            return Err(Error::InvalidConfig("hit_tolerance must be > 0".into()));
        }
        if !self.wind_from.is_finite() || self.wind_from.length_squared() <= f32::EPSILON {
            return Err(Error::InvalidConfig(
                "wind_from must be a finite, non-zero vector".into(),
            ));
        }

        Ok(())
    }
}

/// What one pass analyzes.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub mode: AnalysisMode,
    /// Any instant on the analyzed day; only its site-local date matters.
    pub reference_time: DateTime<Utc>,
    /// Threshold context; `None` colors results as a gradient.
    pub thresholds: Option<ThresholdSet>,
}

impl AnalysisRequest {
    pub fn new(mode: AnalysisMode, reference_time: DateTime<Utc>) -> Self {
        Self {
            mode,
            reference_time,
            thresholds: None,
        }
    }

    pub fn with_thresholds(mut self, thresholds: Option<ThresholdSet>) -> Self {
        self.thresholds = thresholds;
        self
    }
}

/// Results for one analyzed mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshExposure {
    pub mesh_id: MeshId,
    /// Vertices in the mesh's position buffer.
    pub vertex_count: usize,
    /// Vertices without a usable position or normal.
    pub dropped: usize,
    pub results: Vec<ExposureResult>,
    /// One color per vertex; dropped vertices are neutral grey.
    pub colors: Vec<Rgba>,
}

impl MeshExposure {
    pub fn to_overlay(&self) -> Overlay {
        Overlay::new(self.mesh_id.clone(), self.colors.clone())
    }
}

/// Result of one analysis pass.
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisOutcome {
    pub mode: AnalysisMode,
    /// Analyzed meshes in snapshot order.
    pub meshes: Vec<MeshExposure>,
    /// Meshes that could not be analyzed.
    pub skipped: Vec<MeshId>,
    /// Total surface samples evaluated.
    pub samples: usize,
}

impl AnalysisOutcome {
    fn empty(mode: AnalysisMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn mesh(&self, mesh_id: &str) -> Option<&MeshExposure> {
        self.meshes.iter().find(|m| m.mesh_id == mesh_id)
    }
}

/// Validated configuration bound to a runner.
pub struct AnalysisRunner {
    /// Configuration applied to every pass.
    pub config: AnalysisConfig,
}

impl AnalysisRunner {
    pub fn try_new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Runs one pass.
    pub fn run(&self, scene: &SceneSnapshot, request: &AnalysisRequest) -> AnalysisOutcome {
        run_validated(scene, request, &self.config, &mut ())
    }

    pub fn run_with_events(
        &self,
        scene: &SceneSnapshot,
        request: &AnalysisRequest,
        sink: &mut dyn EventSink,
    ) -> AnalysisOutcome {
        run_validated(scene, request, &self.config, sink)
    }
}

/// Samples, classifies, and colors every mesh of `scene`.
///
/// Meshes with unusable buffers are skipped with a warning; the pass itself only fails on
/// an invalid configuration.
pub fn run_analysis(
    scene: &SceneSnapshot,
    request: &AnalysisRequest,
    config: &AnalysisConfig,
    sink: &mut dyn EventSink,
) -> Result<AnalysisOutcome> {
    config.validate()?;
    Ok(run_validated(scene, request, config, sink))
}

pub(crate) fn run_validated(
    scene: &SceneSnapshot,
    request: &AnalysisRequest,
    config: &AnalysisConfig,
    sink: &mut dyn EventSink,
) -> AnalysisOutcome {
    let mode = request.mode;
    if !mode.is_active() {
        return AnalysisOutcome::empty(mode);
    }
    if scene.is_empty() {
        debug!("No meshes in scene; nothing to analyze.");
        return AnalysisOutcome::empty(mode);
    }

    let started = Instant::now();
    let window_hours = config.solar_window.window_hours();
    let directions = match mode {
        AnalysisMode::SunHours => {
            let suns = config
                .solar_window
                .sun_samples(request.reference_time, &config.site);
            DirectionSet::solar(&suns, window_hours)
        }
        AnalysisMode::Daylight => DirectionSet::Zenith,
        AnalysisMode::Wind => DirectionSet::Wind {
            from: config.wind_direction(),
        },
        AnalysisMode::Off => return AnalysisOutcome::empty(mode),
    };
    if mode == AnalysisMode::SunHours && directions.ray_count() == 0 {
        warn!(
            "Sun is below the horizon for the whole window on {}; all sun hours are 0.",
            request.reference_time.date_naive()
        );
        if sink.wants(AnalysisEventKind::Warning) {
            sink.send(AnalysisEvent::Warning {
                context: "solar".into(),
                message: "no valid sun samples in window".into(),
            });
        }
    }

    let occluders = match mode {
        AnalysisMode::Wind => OccluderSet::default(),
        _ => OccluderSet::from_meshes(scene.ray_targets()),
    };
    if sink.wants(AnalysisEventKind::Warning) {
        for id in occluders.skipped() {
            sink.send(AnalysisEvent::Warning {
                context: format!("occluder:{id}"),
                message: "mesh has no usable triangles; not occluding".into(),
            });
        }
    }
    if sink.wants(AnalysisEventKind::PassStarted) {
        sink.send(AnalysisEvent::PassStarted {
            mode,
            mesh_count: scene.meshes.len(),
            occluder_triangles: occluders.triangle_count(),
            has_thresholds: request.thresholds.is_some(),
        });
    }

    let sampler = ExposureSampler::new(&occluders, config.ray_epsilon, config.hit_tolerance);
    let classifier = ComplianceClassifier::new(request.thresholds, window_hours);
    let mut outcome = AnalysisOutcome::empty(mode);

    for (mesh_index, mesh) in scene.meshes.iter().enumerate() {
        let (samples, dropped) = match mesh.surface_samples(mesh_index) {
            Ok(found) => found,
            Err(e) => {
                warn!("Mesh '{}' skipped: {}.", mesh.id, e);
                if sink.wants(AnalysisEventKind::MeshSkipped) {
                    sink.send(AnalysisEvent::MeshSkipped {
                        mesh_id: mesh.id.clone(),
                        reason: e.to_string(),
                    });
                }
                outcome.skipped.push(mesh.id.clone());
                continue;
            }
        };
        if dropped > 0 {
            warn!(
                "Mesh '{}': {} vertices with degenerate position or normal left unsampled.",
                mesh.id, dropped
            );
        }

        let results: Vec<ExposureResult> = sampler
            .sample(&samples, &directions)
            .into_iter()
            .map(|e| ExposureResult {
                sample: e.sample,
                raw: e.raw,
                value: e.value,
                classification: classifier.classify(e.value),
            })
            .collect();
        let vertex_count = mesh.vertex_count();
        let colors = build_color_buffer(vertex_count, &results);

        if sink.wants(AnalysisEventKind::MeshAnalyzed) {
            sink.send(AnalysisEvent::MeshAnalyzed {
                mesh_id: mesh.id.clone(),
                samples: results.len(),
                dropped,
            });
        }
        outcome.samples += results.len();
        outcome.meshes.push(MeshExposure {
            mesh_id: mesh.id.clone(),
            vertex_count,
            dropped,
            results,
            colors,
        });
    }

    let elapsed = started.elapsed();
    info!(
        "Analysis pass {:?}: {} meshes, {} samples, {} occluder triangles in {:?}.",
        mode,
        outcome.meshes.len(),
        outcome.samples,
        occluders.triangle_count(),
        elapsed
    );
    if sink.wants(AnalysisEventKind::PassFinished) {
        sink.send(AnalysisEvent::PassFinished {
            mode,
            meshes: outcome.meshes.len(),
            samples: outcome.samples,
            elapsed,
        });
    }

    outcome
}
