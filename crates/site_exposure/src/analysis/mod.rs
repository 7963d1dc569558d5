//! Exposure analysis pipeline: sampling, classification, and overlays.
//!
//! Each metric carries its own value type ([`Hours`], [`DaylightFactor`],
//! [`WindExposure`]) so a value can only ever be compared against thresholds of the
//! same metric.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::thresholds::MetricKind;

pub mod classify;
pub mod events;
pub mod overlay;
pub mod runner;
pub mod sampler;

/// Value substituted for non-finite exposure results.
pub const NEUTRAL_EXPOSURE: f32 = 0.5;

/// What the host wants visualized.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AnalysisMode {
    /// No analysis; all overlays removed.
    #[default]
    Off,
    SunHours,
    Daylight,
    Wind,
}

impl AnalysisMode {
    pub fn is_active(&self) -> bool {
        !matches!(self, AnalysisMode::Off)
    }

    /// Metric measured in this mode.
    pub fn metric(&self) -> Option<MetricKind> {
        match self {
            AnalysisMode::Off => None,
            AnalysisMode::SunHours => Some(MetricKind::SunHours),
            AnalysisMode::Daylight => Some(MetricKind::DaylightFactor),
            AnalysisMode::Wind => Some(MetricKind::WindExposure),
        }
    }
}

/// Hours of direct sun.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Hours(pub f32);

/// Sky-visibility proxy for the daylight factor, as a fraction.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct DaylightFactor(pub f32);

/// Exposure to the prevailing wind in [0, 1].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct WindExposure(pub f32);

/// Metric-scaled exposure of one sample.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExposureValue {
    Hours(Hours),
    DaylightFactor(DaylightFactor),
    Wind(WindExposure),
}

impl ExposureValue {
    pub fn metric(&self) -> MetricKind {
        match self {
            ExposureValue::Hours(_) => MetricKind::SunHours,
            ExposureValue::DaylightFactor(_) => MetricKind::DaylightFactor,
            ExposureValue::Wind(_) => MetricKind::WindExposure,
        }
    }

    /// The number inside, in the metric's own unit.
    pub fn magnitude(&self) -> f32 {
        match *self {
            ExposureValue::Hours(Hours(v)) => v,
            ExposureValue::DaylightFactor(DaylightFactor(v)) => v,
            ExposureValue::Wind(WindExposure(v)) => v,
        }
    }
}

/// Location of a sample: mesh within the snapshot and vertex within the mesh.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleRef {
    pub mesh_index: usize,
    pub vertex_index: usize,
}

/// Sampler output for one surface sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleExposure {
    pub sample: SampleRef,
    /// Normalized exposure in [0, 1].
    pub raw: f32,
    pub value: ExposureValue,
}

/// A classified sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureResult {
    pub sample: SampleRef,
    pub raw: f32,
    pub value: ExposureValue,
    pub classification: classify::Classification,
}
