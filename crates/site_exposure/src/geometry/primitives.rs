//! Simple mesh builders for massing studies, demos, and tests.
use glam::Vec3;

use crate::geometry::mesh::HostMesh;
use crate::geometry::MeshId;

/// Axis-aligned, flat-shaded box: 24 vertices (4 per face) with outward face normals.
pub fn cuboid(id: impl Into<MeshId>, center: Vec3, size: Vec3) -> HostMesh {
    let h = size * 0.5;
    // (normal, u axis, v axis) per face; u x v == normal keeps winding counter-clockwise.
    let faces = [
        (Vec3::X, Vec3::Y, Vec3::Z),
        (-Vec3::X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::Z, Vec3::X),
        (-Vec3::Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (-Vec3::Z, Vec3::Y, Vec3::X),
    ];

    let mut positions = Vec::with_capacity(24);
    let mut normals = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in faces {
        let base = positions.len() as u32;
        let c = center + normal * h;
        let du = u * h;
        let dv = v * h;
        positions.extend([c - du - dv, c + du - dv, c + du + dv, c - du + dv]);
        normals.extend([normal; 4]);
        indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    HostMesh::new(id)
        .with_positions(positions)
        .with_normals(normals)
        .with_indices(indices)
}

/// Horizontal, upward-facing plane centered on `center` and split into
/// `divisions.0 x divisions.1` cells.
pub fn grid_plane(
    id: impl Into<MeshId>,
    center: Vec3,
    extent: (f32, f32),
    divisions: (u32, u32),
) -> HostMesh {
    let (nx, ny) = (divisions.0.max(1), divisions.1.max(1));
    let origin = center - Vec3::new(extent.0 * 0.5, extent.1 * 0.5, 0.0);

    let mut positions = Vec::with_capacity(((nx + 1) * (ny + 1)) as usize);
    for j in 0..=ny {
        for i in 0..=nx {
            positions.push(
                origin
                    + Vec3::new(
                        extent.0 * i as f32 / nx as f32,
                        extent.1 * j as f32 / ny as f32,
                        0.0,
                    ),
            );
        }
    }

    let row = nx + 1;
    let mut indices = Vec::with_capacity((nx * ny * 6) as usize);
    for j in 0..ny {
        for i in 0..nx {
            let a = j * row + i;
            let b = a + 1;
            let c = a + row + 1;
            let d = a + row;
            indices.extend([a, b, c, a, c, d]);
        }
    }

    let normals = vec![Vec3::Z; positions.len()];
    HostMesh::new(id)
        .with_positions(positions)
        .with_normals(normals)
        .with_indices(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuboid_faces_wind_outward() {
        let mesh = cuboid("box", Vec3::ZERO, Vec3::new(2.0, 4.0, 6.0));
        let normals = mesh.normals.as_ref().unwrap();
        for (tri, idx) in mesh
            .world_triangles()
            .unwrap()
            .iter()
            .zip(mesh.indices.as_ref().unwrap().chunks_exact(3))
        {
            let geometric = (tri.b - tri.a).cross(tri.c - tri.a).normalize();
            assert!(geometric.dot(normals[idx[0] as usize]) > 0.99);
        }
    }

    #[test]
    fn cuboid_spans_requested_size() {
        let mesh = cuboid("box", Vec3::new(1.0, 1.0, 1.0), Vec3::new(2.0, 4.0, 6.0));
        let positions = mesh.positions.unwrap();
        let min = positions.iter().copied().reduce(Vec3::min).unwrap();
        let max = positions.iter().copied().reduce(Vec3::max).unwrap();
        assert_eq!(min, Vec3::new(0.0, -1.0, -2.0));
        assert_eq!(max, Vec3::new(2.0, 3.0, 4.0));
    }

    #[test]
    fn grid_plane_vertex_and_triangle_counts() {
        let mesh = grid_plane("roof", Vec3::new(0.0, 0.0, 12.0), (10.0, 6.0), (5, 3));
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.world_triangles().unwrap().len(), 30);
        assert!(mesh.positions.unwrap().iter().all(|p| p.z == 12.0));
    }
}
