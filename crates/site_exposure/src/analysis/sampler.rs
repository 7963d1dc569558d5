//! Per-sample exposure via occlusion queries.
//!
//! Every surface sample is independent and only reads the shared [`OccluderSet`], so the
//! work fans out across threads when the `parallel` feature is enabled. Output order
//! always matches input order.
use glam::Vec3;

use crate::analysis::{
    DaylightFactor, ExposureValue, Hours, SampleExposure, SampleRef, WindExposure,
    NEUTRAL_EXPOSURE,
};
use crate::geometry::{OccluderSet, SurfaceSample};
use crate::solar::SunSample;

/// Sky visibility of an unobstructed vertical surface.
const SKY_BASE: f32 = 0.2;
/// Extra sky visibility gained by a fully horizontal surface.
const SKY_HORIZONTAL_GAIN: f32 = 0.8;

/// Directions probed for one analysis mode, precomputed once per pass.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectionSet {
    /// Directions toward the sun for the samples above the horizon.
    Sun {
        directions: Vec<Vec3>,
        /// Hours represented by the full sampling window.
        window_hours: f32,
    },
    /// A single straight-up sky probe.
    Zenith,
    /// Unit vector pointing toward where the prevailing wind comes from.
    Wind { from: Vec3 },
}

impl DirectionSet {
    /// Sun directions from `samples`; samples below the horizon are left out.
    pub fn solar(samples: &[SunSample], window_hours: f32) -> Self {
        DirectionSet::Sun {
            directions: samples
                .iter()
                .filter(|s| s.is_valid())
                .map(|s| s.direction)
                .collect(),
            window_hours,
        }
    }

    /// Number of ray directions probed per sample.
    pub fn ray_count(&self) -> usize {
        match self {
            DirectionSet::Sun { directions, .. } => directions.len(),
            DirectionSet::Zenith => 1,
            DirectionSet::Wind { .. } => 0,
        }
    }
}

/// Computes normalized exposure for surface samples against an occluder set.
pub struct ExposureSampler<'a> {
    occluders: &'a OccluderSet,
    /// Offset along the normal applied to ray origins.
    ray_epsilon: f32,
    /// Hits at or below this distance are treated as self-intersections.
    hit_tolerance: f32,
}

impl<'a> ExposureSampler<'a> {
    pub fn new(occluders: &'a OccluderSet, ray_epsilon: f32, hit_tolerance: f32) -> Self {
        Self {
            occluders,
            ray_epsilon,
            hit_tolerance,
        }
    }

    /// Exposure for every sample, in input order.
    pub fn sample(&self, samples: &[SurfaceSample], directions: &DirectionSet) -> Vec<SampleExposure> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            samples
                .par_iter()
                .map(|s| self.sample_one(s, directions))
                .collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            samples
                .iter()
                .map(|s| self.sample_one(s, directions))
                .collect()
        }
    }

    /// Exposure of a single sample.
    pub fn sample_one(&self, sample: &SurfaceSample, directions: &DirectionSet) -> SampleExposure {
        let raw = match directions {
            DirectionSet::Sun { directions, .. } => self.lit_fraction(sample, directions),
            DirectionSet::Zenith => self.sky_view(sample),
            DirectionSet::Wind { from } => (sample.normal.dot(*from) + 1.0) * 0.5,
        };
        let raw = if raw.is_finite() {
            raw.clamp(0.0, 1.0)
        } else {
            NEUTRAL_EXPOSURE
        };

        let value = match directions {
            DirectionSet::Sun { window_hours, .. } => ExposureValue::Hours(Hours(raw * window_hours)),
            DirectionSet::Zenith => ExposureValue::DaylightFactor(DaylightFactor(raw)),
            DirectionSet::Wind { .. } => ExposureValue::Wind(WindExposure(raw)),
        };

        SampleExposure {
            sample: SampleRef {
                mesh_index: sample.mesh_index,
                vertex_index: sample.index,
            },
            raw,
            value,
        }
    }

    /// Fraction of valid sun directions that reach the sample.
    fn lit_fraction(&self, sample: &SurfaceSample, directions: &[Vec3]) -> f32 {
        if directions.is_empty() {
            return 0.0;
        }
        let origin = sample.ray_origin(self.ray_epsilon);
        let lit = directions
            .iter()
            .filter(|&&d| {
                // Facing away from the sun: unlit, no ray needed.
                sample.normal.dot(d) > 0.0
                    && !self.occluders.is_blocked(origin, d, self.hit_tolerance)
            })
            .count();
        lit as f32 / directions.len() as f32
    }

    /// Zenith probe blended with how horizontal the surface is.
    fn sky_view(&self, sample: &SurfaceSample) -> f32 {
        let origin = sample.ray_origin(self.ray_epsilon);
        if self.occluders.is_blocked(origin, Vec3::Z, self.hit_tolerance) {
            0.0
        } else {
            SKY_BASE + SKY_HORIZONTAL_GAIN * sample.normal.dot(Vec3::Z).max(0.0)
        }
    }
}
