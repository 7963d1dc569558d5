//! Bounding volume hierarchy over world-space triangles.
//!
//! The tree is built once per analysis pass and queried for every sample and every
//! direction, so nodes live in one flat `Vec` and traversal uses an explicit stack.
//! Splits are median splits along the longest centroid axis.
use glam::Vec3;

/// Triangles per leaf before a node is split.
const MAX_LEAF_TRIANGLES: usize = 4;

/// Determinant threshold below which a ray is treated as parallel to a triangle.
const PARALLEL_EPSILON: f32 = 1e-9;

/// A ray with a unit direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// An inverted box that any `grow` call replaces.
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn grow(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Slab test. Returns the entry distance if the ray meets the box before `t_max`.
    pub fn hit(&self, ray: &Ray, t_max: f32) -> Option<f32> {
        let mut t_near = 0.0f32;
        let mut t_far = t_max;
        for axis in 0..3 {
            let o = ray.origin[axis];
            let d = ray.direction[axis];
            if d.abs() < f32::EPSILON {
                if o < self.min[axis] || o > self.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t0 = (self.min[axis] - o) * inv;
            let mut t1 = (self.max[axis] - o) * inv;
            if inv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_near = t_near.max(t0);
            t_far = t_far.min(t1);
            if t_far < t_near {
                return None;
            }
        }
        Some(t_near)
    }
}

/// A world-space triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
}

impl Triangle {
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }

    pub fn bounds(&self) -> Aabb {
        let mut bb = Aabb::EMPTY;
        bb.grow(self.a);
        bb.grow(self.b);
        bb.grow(self.c);
        bb
    }

    pub fn centroid(&self) -> Vec3 {
        (self.a + self.b + self.c) / 3.0
    }

    /// Finite and with non-zero area.
    pub fn is_degenerate(&self) -> bool {
        let finite = self.a.is_finite() && self.b.is_finite() && self.c.is_finite();
        !finite || (self.b - self.a).cross(self.c - self.a).length_squared() <= f32::EPSILON * f32::EPSILON
    }

    /// Möller–Trumbore intersection, double sided. Returns the hit distance along the ray.
    pub fn intersect(&self, ray: &Ray) -> Option<f32> {
        let e1 = self.b - self.a;
        let e2 = self.c - self.a;
        let p = ray.direction.cross(e2);
        let det = e1.dot(p);
        if det.abs() < PARALLEL_EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = ray.origin - self.a;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(e1);
        let v = ray.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = e2.dot(q) * inv_det;
        (t > 0.0).then_some(t)
    }
}

#[derive(Debug, Clone, Copy)]
struct BvhNode {
    bounds: Aabb,
    /// Leaf: index of the first triangle. Interior: index of the left child.
    first: u32,
    /// Triangle count for leaves, 0 for interior nodes.
    count: u32,
}

impl BvhNode {
    fn is_leaf(&self) -> bool {
        self.count > 0
    }
}

/// Flat bounding volume hierarchy.
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    triangles: Vec<Triangle>,
}

impl Bvh {
    /// Builds a tree over `triangles`. Degenerate triangles are dropped.
    pub fn build(triangles: Vec<Triangle>) -> Self {
        let mut triangles: Vec<Triangle> =
            triangles.into_iter().filter(|t| !t.is_degenerate()).collect();
        if triangles.is_empty() {
            return Self::default();
        }

        let centroids: Vec<Vec3> = triangles.iter().map(Triangle::centroid).collect();
        let mut order: Vec<usize> = (0..triangles.len()).collect();
        let mut nodes = Vec::with_capacity(2 * triangles.len() / MAX_LEAF_TRIANGLES + 1);
        nodes.push(BvhNode {
            bounds: Aabb::EMPTY,
            first: 0,
            count: 0,
        });

        // (node index, start, end) ranges into `order` still to be processed.
        let mut pending = vec![(0usize, 0usize, order.len())];
        while let Some((node_index, start, end)) = pending.pop() {
            let mut bounds = Aabb::EMPTY;
            let mut centroid_bounds = Aabb::EMPTY;
            for &i in &order[start..end] {
                bounds = bounds.union(&triangles[i].bounds());
                centroid_bounds.grow(centroids[i]);
            }
            nodes[node_index].bounds = bounds;

            let count = end - start;
            let extent = centroid_bounds.max - centroid_bounds.min;
            let axis = if extent.x >= extent.y && extent.x >= extent.z {
                0
            } else if extent.y >= extent.z {
                1
            } else {
                2
            };
            if count <= MAX_LEAF_TRIANGLES || extent[axis] <= 0.0 {
                nodes[node_index].first = start as u32;
                nodes[node_index].count = count as u32;
                continue;
            }

            let mid = start + count / 2;
            order[start..end].select_nth_unstable_by(count / 2, |&l, &r| {
                centroids[l][axis].total_cmp(&centroids[r][axis])
            });

            let left = nodes.len();
            let blank = BvhNode {
                bounds: Aabb::EMPTY,
                first: 0,
                count: 0,
            };
            nodes.push(blank);
            nodes.push(blank);
            nodes[node_index].first = left as u32;
            pending.push((left, start, mid));
            pending.push((left + 1, mid, end));
        }

        let mut reordered: Vec<Triangle> = order.iter().map(|&i| triangles[i]).collect();
        std::mem::swap(&mut triangles, &mut reordered);

        Self { nodes, triangles }
    }

    /// Number of triangles kept after dropping degenerate ones.
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Distance to the nearest hit with distance in `(t_min, t_max)`.
    pub fn nearest_hit(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<f32> {
        if self.nodes.is_empty() {
            return None;
        }
        let mut best = t_max;
        let mut found = false;
        let mut stack: Vec<u32> = Vec::with_capacity(64);
        stack.push(0);

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            match node.bounds.hit(ray, best) {
                Some(_) => {}
                None => continue,
            }
            if node.is_leaf() {
                let first = node.first as usize;
                for tri in &self.triangles[first..first + node.count as usize] {
                    if let Some(t) = tri.intersect(ray) {
                        if t > t_min && t < best {
                            best = t;
                            found = true;
                        }
                    }
                }
            } else {
                stack.push(node.first);
                stack.push(node.first + 1);
            }
        }

        found.then_some(best)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn unit_square_at(z: f32) -> Vec<Triangle> {
        let a = Vec3::new(-1.0, -1.0, z);
        let b = Vec3::new(1.0, -1.0, z);
        let c = Vec3::new(1.0, 1.0, z);
        let d = Vec3::new(-1.0, 1.0, z);
        vec![Triangle::new(a, b, c), Triangle::new(a, c, d)]
    }

    fn rand_f32(rng: &mut StdRng) -> f32 {
        (rng.next_u32() as f32) / ((u32::MAX as f32) + 1.0)
    }

    #[test]
    fn triangle_hit_is_double_sided() {
        let tri = unit_square_at(2.0)[0];
        let up = Ray::new(Vec3::new(0.5, -0.5, 0.0), Vec3::Z);
        let down = Ray::new(Vec3::new(0.5, -0.5, 4.0), -Vec3::Z);
        assert!((tri.intersect(&up).unwrap() - 2.0).abs() < 1e-6);
        assert!((tri.intersect(&down).unwrap() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn triangle_behind_origin_is_missed() {
        let tri = unit_square_at(-2.0)[0];
        let ray = Ray::new(Vec3::new(0.5, -0.5, 0.0), Vec3::Z);
        assert!(tri.intersect(&ray).is_none());
    }

    #[test]
    fn aabb_rejects_parallel_ray_outside_slab() {
        let bb = Aabb {
            min: Vec3::splat(-1.0),
            max: Vec3::splat(1.0),
        };
        let ray = Ray::new(Vec3::new(0.0, 5.0, -5.0), Vec3::Z);
        assert!(bb.hit(&ray, f32::INFINITY).is_none());
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        assert_eq!(bb.hit(&ray, f32::INFINITY), Some(4.0));
    }

    #[test]
    fn nearest_hit_picks_closest_layer() {
        let mut tris = unit_square_at(3.0);
        tris.extend(unit_square_at(7.0));
        let bvh = Bvh::build(tris);
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        assert_eq!(bvh.nearest_hit(&ray, 0.0, f32::INFINITY), Some(3.0));
        assert_eq!(bvh.nearest_hit(&ray, 4.0, f32::INFINITY), Some(7.0));
        assert_eq!(bvh.nearest_hit(&ray, 0.0, 2.5), None);
    }

    #[test]
    fn degenerate_triangles_are_dropped() {
        let p = Vec3::ONE;
        let bvh = Bvh::build(vec![
            Triangle::new(p, p, p),
            Triangle::new(Vec3::ZERO, Vec3::X, Vec3::new(f32::NAN, 0.0, 0.0)),
        ]);
        assert!(bvh.is_empty());
        assert_eq!(bvh.nearest_hit(&Ray::new(Vec3::ZERO, Vec3::Z), 0.0, 1.0), None);
    }

    #[test]
    fn matches_brute_force_on_random_soup() {
        let mut rng = StdRng::seed_from_u64(0x5EED);
        let mut tris = Vec::new();
        for _ in 0..300 {
            let base = Vec3::new(
                rand_f32(&mut rng) * 40.0 - 20.0,
                rand_f32(&mut rng) * 40.0 - 20.0,
                rand_f32(&mut rng) * 40.0,
            );
            let e1 = Vec3::new(rand_f32(&mut rng), rand_f32(&mut rng), rand_f32(&mut rng)) * 3.0;
            let e2 = Vec3::new(rand_f32(&mut rng), -rand_f32(&mut rng), rand_f32(&mut rng)) * 3.0;
            tris.push(Triangle::new(base, base + e1, base + e2));
        }
        let bvh = Bvh::build(tris.clone());

        for _ in 0..200 {
            let dir = Vec3::new(
                rand_f32(&mut rng) - 0.5,
                rand_f32(&mut rng) - 0.5,
                rand_f32(&mut rng) + 0.1,
            )
            .normalize();
            let ray = Ray::new(Vec3::new(0.0, 0.0, -1.0), dir);
            let brute = tris
                .iter()
                .filter(|t| !t.is_degenerate())
                .filter_map(|t| t.intersect(&ray))
                .fold(None, |acc: Option<f32>, t| Some(acc.map_or(t, |a| a.min(t))));
            assert_eq!(bvh.nearest_hit(&ray, 0.0, f32::INFINITY), brute);
        }
    }
}
