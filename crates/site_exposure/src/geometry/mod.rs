//! Scene geometry consumed by the analysis pipeline.
//!
//! Hosts hand over plain vertex buffers wrapped in [`HostMesh`] and grouped into a
//! [`SceneSnapshot`]. From that snapshot a pass derives [`SurfaceSample`]s (what gets
//! measured) and an [`OccluderSet`] (what blocks rays), both discarded when the pass ends.
pub mod bvh;
pub mod mesh;
pub mod occluders;
pub mod primitives;

pub use bvh::{Aabb, Bvh, Ray, Triangle};
pub use mesh::{HostMesh, SceneSnapshot, SurfaceSample};
pub use occluders::OccluderSet;

/// Identity of a host mesh. Overlays are keyed by it.
pub type MeshId = String;
