//! Occluder set: every ray target of a pass behind one acceleration structure.
use glam::Vec3;
use tracing::warn;

use crate::geometry::bvh::{Bvh, Ray};
use crate::geometry::mesh::HostMesh;
use crate::geometry::MeshId;

/// Union of all ray-blocking geometry for one analysis pass.
///
/// Immutable once built; shared read-only by every sample query.
#[derive(Debug, Clone, Default)]
pub struct OccluderSet {
    bvh: Bvh,
    skipped: Vec<MeshId>,
}

impl OccluderSet {
    /// Builds the set from `meshes`. Meshes without a usable position buffer are skipped.
    pub fn from_meshes<'a>(meshes: impl IntoIterator<Item = &'a HostMesh>) -> Self {
        let mut triangles = Vec::new();
        let mut skipped = Vec::new();
        for mesh in meshes {
            match mesh.world_triangles() {
                Ok(tris) => triangles.extend(tris),
                Err(e) => {
                    warn!("Occluder '{}' skipped: {}.", mesh.id, e);
                    skipped.push(mesh.id.clone());
                }
            }
        }
        Self {
            bvh: Bvh::build(triangles),
            skipped,
        }
    }

    /// Number of usable triangles.
    pub fn triangle_count(&self) -> usize {
        self.bvh.triangle_count()
    }

    /// Ids of meshes that could not contribute triangles.
    pub fn skipped(&self) -> &[MeshId] {
        &self.skipped
    }

    /// Nearest hit distance along `direction`, ignoring hits at or below `min_distance`.
    pub fn nearest_hit(&self, origin: Vec3, direction: Vec3, min_distance: f32) -> Option<f32> {
        self.bvh
            .nearest_hit(&Ray::new(origin, direction), min_distance, f32::INFINITY)
    }

    /// Whether anything farther than `tolerance` blocks the ray.
    ///
    /// Hits closer than `tolerance` are the sample's own or adjacent faces and do not count.
    pub fn is_blocked(&self, origin: Vec3, direction: Vec3, tolerance: f32) -> bool {
        self.nearest_hit(origin, direction, tolerance).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::primitives::cuboid;

    #[test]
    fn box_blocks_rays_through_it() {
        let tower = cuboid("tower", Vec3::new(10.0, 0.0, 5.0), Vec3::splat(4.0));
        let set = OccluderSet::from_meshes([&tower]);
        assert_eq!(set.triangle_count(), 12);
        assert!(set.is_blocked(Vec3::new(0.0, 0.0, 5.0), Vec3::X, 0.2));
        assert!(!set.is_blocked(Vec3::new(0.0, 0.0, 5.0), -Vec3::X, 0.2));
    }

    #[test]
    fn hits_inside_tolerance_are_ignored() {
        let slab = cuboid("slab", Vec3::new(0.0, 0.0, 0.15), Vec3::new(4.0, 4.0, 0.1));
        let set = OccluderSet::from_meshes([&slab]);
        // Bottom face at z = 0.1 is within tolerance, top face at z = 0.2 is not.
        let hit = set.nearest_hit(Vec3::ZERO, Vec3::Z, 0.12).expect("top face");
        assert!((hit - 0.2).abs() < 1e-5);
        assert!(!set.is_blocked(Vec3::ZERO, Vec3::Z, 0.25));
    }

    #[test]
    fn meshes_without_positions_are_reported() {
        let set = OccluderSet::from_meshes([&HostMesh::new("ghost")]);
        assert_eq!(set.skipped(), ["ghost".to_string()]);
        assert!(!set.is_blocked(Vec3::ZERO, Vec3::Z, 0.0));
    }
}
