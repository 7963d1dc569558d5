#![forbid(unsafe_code)]
//! site_exposure: Environmental exposure analysis for building surfaces.
//!
//! Modules:
//! - geometry: host meshes, scene snapshots, surface samples, BVH-backed occluder sets
//! - solar: sun position and local-time sampling windows
//! - thresholds: compliance thresholds inferred from certification requirement text
//! - analysis: exposure sampling, compliance classification, overlays, runner, events
//! - orchestrator: debounced mode-transition state machine owning the overlays
//!
//! For examples and docs, see README and the demos crate.
pub mod analysis;
pub mod error;
pub mod geometry;
pub mod orchestrator;
pub mod solar;
pub mod thresholds;

/// Convenient re-exports for common types. Import with `use site_exposure::prelude::*;`.
pub mod prelude {
    pub use crate::analysis::classify::{
        classify_band, gradient_color, Band, Classification, ComplianceClassifier, Rgba,
    };
    pub use crate::analysis::events::{
        AnalysisEvent, AnalysisEventKind, EventSink, FnSink, MultiSink, VecSink,
    };
    pub use crate::analysis::overlay::{
        build_color_buffer, Overlay, OverlayState, OverlayStore, OverlayUpdate,
    };
    pub use crate::analysis::runner::{
        run_analysis, AnalysisConfig, AnalysisOutcome, AnalysisRequest, AnalysisRunner,
        MeshExposure,
    };
    pub use crate::analysis::sampler::{DirectionSet, ExposureSampler};
    pub use crate::analysis::{
        AnalysisMode, DaylightFactor, ExposureResult, ExposureValue, Hours, SampleExposure,
        SampleRef, WindExposure,
    };
    pub use crate::error::{Error, Result};
    pub use crate::geometry::primitives::{cuboid, grid_plane};
    pub use crate::geometry::{HostMesh, MeshId, OccluderSet, SceneSnapshot, SurfaceSample};
    pub use crate::orchestrator::{
        AnalysisPass, Orchestrator, OrchestratorState, PassOutput, PassStatus,
    };
    pub use crate::solar::{sun_position, SiteLocation, SolarWindow, SunPosition, SunSample};
    pub use crate::thresholds::{
        extract_thresholds, resolve_thresholds, Credit, MetricKind, RegulationDocument,
        Threshold, ThresholdCache, ThresholdSet, ThresholdSource,
    };
}
