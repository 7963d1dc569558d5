//! Host mesh buffers, surface samples, and the per-pass scene snapshot.
use glam::{Affine3A, Mat3, Vec3};
use mint::Vector3;
use tracing::warn;

use crate::error::{Error, Result};
use crate::geometry::bvh::Triangle;
use crate::geometry::MeshId;

/// Minimum squared length for a transformed normal to count as usable.
const MIN_NORMAL_LENGTH_SQUARED: f32 = 1e-12;

/// A mesh supplied by the rendering host.
///
/// Buffers are in the mesh's local space; [`HostMesh::transform`] maps them to world space.
/// Buffers are optional because hosts may hand over partially built meshes. Such meshes
/// are skipped by the analysis pass instead of failing it.
#[derive(Debug, Clone)]
pub struct HostMesh {
    /// Host identity of this mesh.
    pub id: MeshId,
    /// Local-space vertex positions.
    pub positions: Option<Vec<Vec3>>,
    /// Local-space vertex normals, parallel to `positions`.
    pub normals: Option<Vec<Vec3>>,
    /// Triangle indices. `None` reads `positions` as a plain triangle list.
    pub indices: Option<Vec<u32>>,
    /// Local-to-world transform.
    pub transform: Affine3A,
}

impl HostMesh {
    /// Creates an empty mesh with an identity transform.
    pub fn new(id: impl Into<MeshId>) -> Self {
        Self {
            id: id.into(),
            positions: None,
            normals: None,
            indices: None,
            transform: Affine3A::IDENTITY,
        }
    }

    /// Sets the vertex positions.
    pub fn with_positions<I, P>(mut self, positions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Vector3<f32>>,
    {
        self.positions = Some(positions.into_iter().map(|p| Vec3::from(p.into())).collect());
        self
    }

    /// Sets the vertex normals.
    pub fn with_normals<I, P>(mut self, normals: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Vector3<f32>>,
    {
        self.normals = Some(normals.into_iter().map(|n| Vec3::from(n.into())).collect());
        self
    }

    /// Sets the triangle indices.
    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    /// Sets the local-to-world transform.
    pub fn with_transform(mut self, transform: Affine3A) -> Self {
        self.transform = transform;
        self
    }

    /// Number of vertices in the position buffer (0 when absent).
    pub fn vertex_count(&self) -> usize {
        self.positions.as_ref().map_or(0, Vec::len)
    }

    /// Checks that the buffers needed for surface sampling are present and consistent.
    pub fn validate_for_sampling(&self) -> Result<()> {
        let Some(positions) = &self.positions else {
            return Err(Error::invalid_mesh(&self.id, "missing position buffer"));
        };
        let Some(normals) = &self.normals else {
            return Err(Error::invalid_mesh(&self.id, "missing normal buffer"));
        };
        if positions.len() != normals.len() {
            return Err(Error::invalid_mesh(
                &self.id,
                format!(
                    "position/normal length mismatch ({} vs {})",
                    positions.len(),
                    normals.len()
                ),
            ));
        }
        Ok(())
    }

    /// Inverse-transpose of the linear part of the transform.
    fn normal_matrix(&self) -> Result<Mat3> {
        let linear = Mat3::from(self.transform.matrix3);
        let det = linear.determinant();
        if !det.is_finite() || det.abs() < f32::EPSILON {
            return Err(Error::invalid_mesh(&self.id, "singular world transform"));
        }
        Ok(linear.inverse().transpose())
    }

    /// Derives world-space surface samples, one per usable vertex.
    ///
    /// Returns the samples and the number of vertices dropped because their position was
    /// non-finite or their normal degenerate. Dropped vertices keep their slot in the
    /// vertex buffer; the sample `index` always refers to the original vertex.
    pub fn surface_samples(&self, mesh_index: usize) -> Result<(Vec<SurfaceSample>, usize)> {
        self.validate_for_sampling()?;
        let normal_matrix = self.normal_matrix()?;
        let (Some(positions), Some(normals)) = (&self.positions, &self.normals) else {
            return Err(Error::invalid_mesh(&self.id, "missing vertex buffers"));
        };

        let mut samples = Vec::with_capacity(positions.len());
        let mut dropped = 0usize;
        for (index, (&p, &n)) in positions.iter().zip(normals).enumerate() {
            let position = self.transform.transform_point3(p);
            let normal = normal_matrix * n;
            if !position.is_finite()
                || !normal.is_finite()
                || normal.length_squared() < MIN_NORMAL_LENGTH_SQUARED
            {
                dropped += 1;
                continue;
            }
            samples.push(SurfaceSample {
                mesh_index,
                index,
                position,
                normal: normal.normalize(),
            });
        }

        Ok((samples, dropped))
    }

    /// World-space triangles of this mesh, for use as ray targets.
    pub fn world_triangles(&self) -> Result<Vec<Triangle>> {
        let Some(positions) = &self.positions else {
            return Err(Error::invalid_mesh(&self.id, "missing position buffer"));
        };
        let world: Vec<Vec3> = positions
            .iter()
            .map(|&p| self.transform.transform_point3(p))
            .collect();

        match &self.indices {
            Some(indices) => {
                if indices.len() % 3 != 0 {
                    warn!(
                        "Mesh '{}' index count {} is not a multiple of 3; ignoring the tail.",
                        self.id,
                        indices.len()
                    );
                }
                let mut triangles = Vec::with_capacity(indices.len() / 3);
                for tri in indices.chunks_exact(3) {
                    let fetch = |i: u32| world.get(i as usize).copied();
                    match (fetch(tri[0]), fetch(tri[1]), fetch(tri[2])) {
                        (Some(a), Some(b), Some(c)) => triangles.push(Triangle::new(a, b, c)),
                        _ => {
                            return Err(Error::invalid_mesh(
                                &self.id,
                                format!("triangle index out of range ({} vertices)", world.len()),
                            ))
                        }
                    }
                }
                Ok(triangles)
            }
            None => {
                if world.len() % 3 != 0 {
                    warn!(
                        "Mesh '{}' vertex count {} is not a multiple of 3; ignoring the tail.",
                        self.id,
                        world.len()
                    );
                }
                Ok(world
                    .chunks_exact(3)
                    .map(|t| Triangle::new(t[0], t[1], t[2]))
                    .collect())
            }
        }
    }
}

/// A measurement point on a host surface.
///
/// `position` is the untouched world-space vertex; the ray origin is nudged along the
/// normal at query time via [`SurfaceSample::ray_origin`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    /// Index of the owning mesh within [`SceneSnapshot::meshes`].
    pub mesh_index: usize,
    /// Vertex index within the owning mesh.
    pub index: usize,
    /// World-space vertex position.
    pub position: Vec3,
    /// World-space unit normal.
    pub normal: Vec3,
}

impl SurfaceSample {
    /// Ray origin offset from the surface to avoid hitting the sample's own face.
    #[inline]
    pub fn ray_origin(&self, epsilon: f32) -> Vec3 {
        self.position + self.normal * epsilon
    }
}

/// Immutable geometry for one analysis pass.
///
/// Replaces traversal of a host-wide scene graph: the host builds a snapshot and hands
/// it to the engine, and nothing the engine derives from it outlives the pass.
#[derive(Debug, Clone, Default)]
pub struct SceneSnapshot {
    /// Meshes that receive overlays. They also occlude (self-shadowing).
    pub meshes: Vec<HostMesh>,
    /// Context geometry used only as ray targets.
    pub occluders: Vec<HostMesh>,
}

impl SceneSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an analyzed mesh.
    pub fn with_mesh(mut self, mesh: HostMesh) -> Self {
        self.meshes.push(mesh);
        self
    }

    /// Add a context occluder.
    pub fn with_occluder(mut self, occluder: HostMesh) -> Self {
        self.occluders.push(occluder);
        self
    }

    /// True when there is nothing to analyze.
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Every mesh that can block a ray: analyzed meshes first, then occluders.
    pub fn ray_targets(&self) -> impl Iterator<Item = &HostMesh> {
        self.meshes.iter().chain(self.occluders.iter())
    }
}
