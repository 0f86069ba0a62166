use crate::geometry::{HitRecord, Triangle};
use crate::math::{Aabb, Ray};
use crate::mesh::TriangleMesh;
use std::time::Instant;

/// Fixed capacity of the iterative traversal stack. A BVH with two-triangle
/// leaves stays far below this for any scene the tracer targets; exceeding
/// it means the hierarchy is malformed and traversal aborts loudly.
pub const TRAVERSAL_STACK_SIZE: usize = 64;

/// One node of the linear BVH. `left_first` is overloaded: for a leaf
/// (`tri_count > 0`) it is the first slot in the triangle-index table, for
/// an interior node it is the left child's index and the right child is
/// always `left_first + 1`.
#[derive(Debug, Clone, Copy)]
pub struct BvhNode {
    pub bounds: Aabb,
    pub left_first: u32,
    pub tri_count: u32,
}

impl BvhNode {
    #[inline(always)]
    pub fn is_leaf(&self) -> bool {
        self.tri_count > 0
    }
}

impl Default for BvhNode {
    fn default() -> Self {
        Self {
            bounds: Aabb::EMPTY,
            left_first: 0,
            tri_count: 0,
        }
    }
}

/// A binary bounding-volume hierarchy over one mesh's triangles, stored as a
/// dense node array with SAH-driven top-down construction.
///
/// Children are allocated in pairs starting at slot 2; the root lives at 0
/// and slot 1 stays unused so sibling pairs share a cache line and a single
/// child index suffices. `tri_idx` is a permutation of `0..N` reordered in
/// place during construction so every leaf's triangles are contiguous.
#[derive(Debug, Clone)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    tris: Vec<Triangle>,
    tri_idx: Vec<u32>,
    nodes_used: u32,
}

impl Bvh {
    /// Builds the hierarchy over the mesh's current world-space triangles.
    pub fn build(mesh: &TriangleMesh) -> Self {
        Self::from_triangles(mesh.bake_triangles())
    }

    pub fn from_triangles(tris: Vec<Triangle>) -> Self {
        let n = tris.len();
        let mut bvh = Self {
            // Root plus reserved slot plus at most 2·(N−1) descendants.
            nodes: vec![BvhNode::default(); (2 * n).max(1)],
            tris,
            tri_idx: (0..n as u32).collect(),
            nodes_used: 2,
        };
        if n == 0 {
            return bvh;
        }

        let start = Instant::now();
        bvh.nodes[0] = BvhNode {
            bounds: Aabb::EMPTY,
            left_first: 0,
            tri_count: n as u32,
        };
        bvh.update_node_bounds(0);
        bvh.subdivide(0);

        log::debug!(
            "built BVH over {} triangles: {} nodes in {:.2?}",
            n,
            bvh.nodes_used,
            start.elapsed()
        );
        bvh
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.tris.len()
    }

    /// Re-bakes the triangle cache after the owning mesh's transform
    /// changed. The index permutation is untouched; follow with
    /// [`refit`](Self::refit).
    pub fn update_triangles(&mut self, mesh: &TriangleMesh) {
        let tris = mesh.bake_triangles();
        assert_eq!(
            tris.len(),
            self.tris.len(),
            "triangle count changed; rebuild the BVH instead of refitting"
        );
        self.tris = tris;
    }

    /// Recomputes all node bounds bottom-up without re-splitting. Sweeping
    /// the node array in reverse visits every child before its parent; slot
    /// 1 is the reserved hole and is skipped.
    pub fn refit(&mut self) {
        if self.tris.is_empty() {
            return;
        }
        for idx in (0..self.nodes_used as usize).rev() {
            if idx == 1 {
                continue;
            }
            if self.nodes[idx].is_leaf() {
                self.update_node_bounds(idx);
            } else {
                let left = self.nodes[idx].left_first as usize;
                let merged = self.nodes[left].bounds.union(&self.nodes[left + 1].bounds);
                self.nodes[idx].bounds = merged;
            }
        }
    }

    fn update_node_bounds(&mut self, node_idx: usize) {
        let node = &self.nodes[node_idx];
        let mut bounds = Aabb::EMPTY;
        let first = node.left_first as usize;
        for &ti in &self.tri_idx[first..first + node.tri_count as usize] {
            let tri = &self.tris[ti as usize];
            bounds.grow(tri.v0);
            bounds.grow(tri.v1);
            bounds.grow(tri.v2);
        }
        self.nodes[node_idx].bounds = bounds;
    }

    /// SAH cost of splitting `node` at `pos` on `axis`: each side's triangle
    /// count weighted by its bounding-box area. Degenerate candidates (an
    /// empty side) cost +∞.
    fn evaluate_sah(&self, node: &BvhNode, axis: usize, pos: f32) -> f32 {
        let mut left_box = Aabb::EMPTY;
        let mut right_box = Aabb::EMPTY;
        let mut left_count = 0u32;
        let mut right_count = 0u32;

        let first = node.left_first as usize;
        for &ti in &self.tri_idx[first..first + node.tri_count as usize] {
            let tri = &self.tris[ti as usize];
            let (bx, count) = if tri.centroid[axis] < pos {
                (&mut left_box, &mut left_count)
            } else {
                (&mut right_box, &mut right_count)
            };
            *count += 1;
            bx.grow(tri.v0);
            bx.grow(tri.v1);
            bx.grow(tri.v2);
        }

        let cost = left_count as f32 * left_box.area() + right_count as f32 * right_box.area();
        if cost > 0.0 {
            cost
        } else {
            f32::INFINITY
        }
    }

    /// Exhaustive SAH sweep: every triangle centroid on every axis is a
    /// candidate split plane. Quadratic per node, which is the accepted
    /// trade-off at this scene scale; binned SAH would replace this sweep.
    fn find_best_split(&self, node: &BvhNode) -> (usize, f32, f32) {
        let mut best_axis = 0;
        let mut best_pos = 0.0;
        let mut best_cost = f32::INFINITY;

        let first = node.left_first as usize;
        for axis in 0..3 {
            for &ti in &self.tri_idx[first..first + node.tri_count as usize] {
                let candidate = self.tris[ti as usize].centroid[axis];
                let cost = self.evaluate_sah(node, axis, candidate);
                if cost < best_cost {
                    best_axis = axis;
                    best_pos = candidate;
                    best_cost = cost;
                }
            }
        }
        (best_axis, best_pos, best_cost)
    }

    fn subdivide(&mut self, node_idx: usize) {
        let node = self.nodes[node_idx];
        if node.tri_count <= 2 {
            return;
        }

        let (axis, split_pos, cost) = self.find_best_split(&node);
        if cost.is_infinite() {
            // Every candidate leaves one side empty (coincident centroids);
            // accept the node as a leaf.
            return;
        }

        // Two-pointer partition of the index range: centroids left of the
        // plane stay in front, everything else swaps to the back.
        let mut i = node.left_first as i64;
        let mut j = i + node.tri_count as i64 - 1;
        while i <= j {
            if self.tris[self.tri_idx[i as usize] as usize].centroid[axis] < split_pos {
                i += 1;
            } else {
                self.tri_idx.swap(i as usize, j as usize);
                j -= 1;
            }
        }

        let left_count = (i - node.left_first as i64) as u32;
        if left_count == 0 || left_count == node.tri_count {
            return;
        }

        let left_child = self.nodes_used;
        self.nodes_used += 2;

        self.nodes[left_child as usize] = BvhNode {
            bounds: Aabb::EMPTY,
            left_first: node.left_first,
            tri_count: left_count,
        };
        self.nodes[left_child as usize + 1] = BvhNode {
            bounds: Aabb::EMPTY,
            left_first: i as u32,
            tri_count: node.tri_count - left_count,
        };
        self.nodes[node_idx].left_first = left_child;
        self.nodes[node_idx].tri_count = 0;

        self.update_node_bounds(left_child as usize);
        self.update_node_bounds(left_child as usize + 1);
        self.subdivide(left_child as usize);
        self.subdivide(left_child as usize + 1);
    }

    // ─── Traversal ──────────────────────────────────────────────────────

    /// Closest intersection along the ray, or `None`.
    pub fn closest_hit(&self, ray: &Ray) -> Option<HitRecord> {
        let mut best = None;
        self.traverse(ray, false, &mut best);
        best
    }

    /// Any-hit query with shadow-pass cull inversion; short-circuits on the
    /// first intersection inside the ray's range.
    pub fn any_hit(&self, ray: &Ray) -> bool {
        let mut scratch = None;
        self.traverse(ray, true, &mut scratch)
    }

    /// Iterative front-to-back traversal over a fixed on-stack node stack.
    ///
    /// Children are visited nearest-first by slab entry distance; the far
    /// child is pushed, not pruned against the current best t. Returns true
    /// only when `shadow_pass` finds an occluder.
    fn traverse(&self, ray: &Ray, shadow_pass: bool, best: &mut Option<HitRecord>) -> bool {
        if self.tris.is_empty() {
            return false;
        }

        let mut stack = [0u32; TRAVERSAL_STACK_SIZE];
        let mut stack_len = 0usize;
        let mut node_idx = 0u32;

        loop {
            let node = &self.nodes[node_idx as usize];
            if node.is_leaf() {
                let first = node.left_first as usize;
                for &ti in &self.tri_idx[first..first + node.tri_count as usize] {
                    if let Some(hit) = self.tris[ti as usize].hit(ray, shadow_pass) {
                        if shadow_pass {
                            return true;
                        }
                        if best.map_or(true, |b: HitRecord| hit.t < b.t) {
                            *best = Some(hit);
                        }
                    }
                }
                if stack_len == 0 {
                    return false;
                }
                stack_len -= 1;
                node_idx = stack[stack_len];
                continue;
            }

            let mut near = node.left_first;
            let mut far = near + 1;
            let mut near_dist = self.nodes[near as usize].bounds.hit_distance(ray);
            let mut far_dist = self.nodes[far as usize].bounds.hit_distance(ray);
            if far_dist < near_dist {
                std::mem::swap(&mut near, &mut far);
                std::mem::swap(&mut near_dist, &mut far_dist);
            }

            if near_dist == f32::INFINITY {
                if stack_len == 0 {
                    return false;
                }
                stack_len -= 1;
                node_idx = stack[stack_len];
                continue;
            }

            node_idx = near;
            if far_dist < f32::INFINITY {
                assert!(
                    stack_len < TRAVERSAL_STACK_SIZE,
                    "BVH traversal stack overflow: hierarchy deeper than {TRAVERSAL_STACK_SIZE}"
                );
                stack[stack_len] = far;
                stack_len += 1;
            }
        }
    }

    // ─── Recursive reference traversal ──────────────────────────────────

    /// Recursive equivalent of [`closest_hit`](Self::closest_hit), kept as
    /// the reference the iterative path is validated against.
    pub fn closest_hit_recursive(&self, ray: &Ray) -> Option<HitRecord> {
        let mut best = None;
        if !self.tris.is_empty() {
            self.traverse_recursive(ray, 0, false, &mut best);
        }
        best
    }

    pub fn any_hit_recursive(&self, ray: &Ray) -> bool {
        let mut scratch = None;
        !self.tris.is_empty() && self.traverse_recursive(ray, 0, true, &mut scratch)
    }

    fn traverse_recursive(
        &self,
        ray: &Ray,
        node_idx: usize,
        shadow_pass: bool,
        best: &mut Option<HitRecord>,
    ) -> bool {
        let node = &self.nodes[node_idx];
        if !node.bounds.hit(ray) {
            return false;
        }

        if node.is_leaf() {
            // Every triangle in the leaf is tested; the nearest wins.
            let first = node.left_first as usize;
            for &ti in &self.tri_idx[first..first + node.tri_count as usize] {
                if let Some(hit) = self.tris[ti as usize].hit(ray, shadow_pass) {
                    if shadow_pass {
                        return true;
                    }
                    if best.map_or(true, |b: HitRecord| hit.t < b.t) {
                        *best = Some(hit);
                    }
                }
            }
            return false;
        }

        let left = node.left_first as usize;
        if self.traverse_recursive(ray, left, shadow_pass, best) {
            return true;
        }
        self.traverse_recursive(ray, left + 1, shadow_pass, best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::CullMode;
    use crate::math::Vec3;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn cube_mesh() -> TriangleMesh {
        let positions = vec![
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(0.5, 0.5, -0.5),
            Vec3::new(-0.5, 0.5, -0.5),
            Vec3::new(-0.5, -0.5, 0.5),
            Vec3::new(0.5, -0.5, 0.5),
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(-0.5, 0.5, 0.5),
        ];
        #[rustfmt::skip]
        let indices = vec![
            0, 1, 5,  0, 5, 4,
            3, 7, 6,  3, 6, 2,
            4, 5, 6,  4, 6, 7,
            1, 0, 3,  1, 3, 2,
            0, 4, 7,  0, 7, 3,
            5, 1, 2,  5, 2, 6,
        ];
        TriangleMesh::new(positions, indices, CullMode::None, 0)
    }

    /// A deterministic soup of triangles scattered through a 10³ volume.
    fn random_soup(count: usize, seed: u64) -> Vec<Triangle> {
        let mut rng = SmallRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                let base = Vec3::new(
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(-5.0..5.0),
                );
                let e1 = Vec3::new(rng.gen_range(0.1..1.0), rng.gen_range(0.1..1.0), 0.0);
                let e2 = Vec3::new(0.0, rng.gen_range(0.1..1.0), rng.gen_range(0.1..1.0));
                Triangle::from_vertices(base, base + e1, base + e2, CullMode::None, 0)
            })
            .collect()
    }

    fn random_ray(rng: &mut SmallRng) -> Ray {
        let origin = Vec3::new(
            rng.gen_range(-8.0..8.0),
            rng.gen_range(-8.0..8.0),
            rng.gen_range(-8.0..8.0),
        );
        let direction = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
        if direction.magnitude_squared() < 1e-6 {
            Ray::new(origin, Vec3::UNIT_Z)
        } else {
            Ray::new(origin, direction.normalized())
        }
    }

    #[test]
    fn index_coverage_is_exact() {
        let bvh = Bvh::from_triangles(random_soup(100, 7));
        let mut seen = vec![0u32; 100];
        for idx in 0..bvh.nodes_used as usize {
            if idx == 1 {
                continue;
            }
            let node = &bvh.nodes[idx];
            if node.is_leaf() {
                let first = node.left_first as usize;
                for &ti in &bvh.tri_idx[first..first + node.tri_count as usize] {
                    seen[ti as usize] += 1;
                }
            }
        }
        assert!(
            seen.iter().all(|&c| c == 1),
            "every triangle index must appear in exactly one leaf"
        );
    }

    #[test]
    fn bounds_contain_children() {
        let bvh = Bvh::from_triangles(random_soup(64, 11));
        for idx in 0..bvh.nodes_used as usize {
            if idx == 1 {
                continue;
            }
            let node = &bvh.nodes[idx];
            if node.is_leaf() {
                let first = node.left_first as usize;
                for &ti in &bvh.tri_idx[first..first + node.tri_count as usize] {
                    let tri = &bvh.tris[ti as usize];
                    for v in [tri.v0, tri.v1, tri.v2] {
                        for axis in 0..3 {
                            assert!(node.bounds.min[axis] <= v[axis] + 1e-5);
                            assert!(v[axis] <= node.bounds.max[axis] + 1e-5);
                        }
                    }
                }
            } else {
                let left = node.left_first as usize;
                let union = bvh.nodes[left].bounds.union(&bvh.nodes[left + 1].bounds);
                assert_eq!(node.bounds, union, "interior bounds must equal child union");
            }
        }
    }

    #[test]
    fn children_are_allocated_in_pairs() {
        let bvh = Bvh::from_triangles(random_soup(64, 3));
        assert_eq!(bvh.nodes_used % 2, 0);
        for idx in 0..bvh.nodes_used as usize {
            if idx == 1 {
                continue;
            }
            let node = &bvh.nodes[idx];
            if !node.is_leaf() {
                // Pair allocation starts at slot 2, so left children sit on
                // even indices.
                assert_eq!(node.left_first % 2, 0);
                assert!(node.left_first >= 2);
            }
        }
    }

    #[test]
    fn leaves_hold_at_most_two_unless_degenerate() {
        let bvh = Bvh::from_triangles(random_soup(128, 23));
        for idx in 0..bvh.nodes_used as usize {
            if idx == 1 {
                continue;
            }
            let node = &bvh.nodes[idx];
            if node.is_leaf() {
                assert!(
                    node.tri_count <= 2,
                    "random centroids should always split down to ≤2"
                );
            }
        }
    }

    #[test]
    fn iterative_and_recursive_traversal_agree() {
        let bvh = Bvh::from_triangles(random_soup(200, 42));
        let mut rng = SmallRng::seed_from_u64(1337);
        let mut hits = 0;
        for _ in 0..500 {
            let ray = random_ray(&mut rng);
            let a = bvh.closest_hit(&ray);
            let b = bvh.closest_hit_recursive(&ray);
            match (a, b) {
                (None, None) => {}
                (Some(x), Some(y)) => {
                    hits += 1;
                    assert!(
                        (x.t - y.t).abs() <= f32::EPSILON * x.t.abs(),
                        "t mismatch: {} vs {}",
                        x.t,
                        y.t
                    );
                    assert_eq!(x.material_index, y.material_index);
                }
                _ => panic!("traversal paths disagree on didHit"),
            }
            assert_eq!(bvh.any_hit(&ray), bvh.any_hit_recursive(&ray));
        }
        assert!(hits > 20, "test rays should actually exercise the tree");
    }

    #[test]
    fn closest_hit_through_cube() {
        let bvh = Bvh::build(&cube_mesh());
        let ray = Ray::new(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        let hit = bvh.closest_hit(&ray).expect("ray into cube top must hit");
        assert!((hit.t - 1.5).abs() < 1e-4, "expected t≈1.5, got {}", hit.t);

        let miss = Ray::new(Vec3::new(5.0, 2.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        assert!(bvh.closest_hit(&miss).is_none());
    }

    #[test]
    fn closest_hit_picks_nearest_of_stacked_triangles() {
        // Two parallel triangles; the nearer one must win regardless of
        // build order.
        let far = Triangle::from_vertices(
            Vec3::new(-1.0, -1.0, 4.0),
            Vec3::new(1.0, -1.0, 4.0),
            Vec3::new(0.0, 1.0, 4.0),
            CullMode::None,
            1,
        );
        let near = Triangle::from_vertices(
            Vec3::new(-1.0, -1.0, 2.0),
            Vec3::new(1.0, -1.0, 2.0),
            Vec3::new(0.0, 1.0, 2.0),
            CullMode::None,
            2,
        );
        for tris in [vec![far, near], vec![near, far]] {
            let bvh = Bvh::from_triangles(tris);
            let ray = Ray::new(Vec3::ZERO, Vec3::UNIT_Z);
            let hit = bvh.closest_hit(&ray).unwrap();
            assert!((hit.t - 2.0).abs() < 1e-4);
            assert_eq!(hit.material_index, 2);
        }
    }

    #[test]
    fn any_hit_respects_range() {
        let bvh = Bvh::build(&cube_mesh());
        let origin = Vec3::new(0.0, 2.0, 0.0);
        let down = Vec3::new(0.0, -1.0, 0.0);
        // Top face at t = 1.5; range contract is squared.
        assert!(bvh.any_hit(&Ray::with_max(origin, down, 1.5 * 1.5 + 0.1)));
        assert!(!bvh.any_hit(&Ray::with_max(origin, down, 1.0)));
    }

    #[test]
    fn single_triangle_stays_root_leaf() {
        let tri = Triangle::from_vertices(
            Vec3::new(-1.0, 0.0, 2.0),
            Vec3::new(1.0, 0.0, 2.0),
            Vec3::new(0.0, 1.0, 2.0),
            CullMode::None,
            0,
        );
        let bvh = Bvh::from_triangles(vec![tri]);
        assert_eq!(bvh.nodes_used, 2);
        assert!(bvh.nodes[0].is_leaf());
        let ray = Ray::new(Vec3::new(0.0, 0.1, 0.0), Vec3::UNIT_Z);
        assert!((bvh.closest_hit(&ray).unwrap().t - 2.0).abs() < 1e-4);
    }

    #[test]
    fn coincident_centroids_fall_back_to_leaf() {
        // Four triangles sharing a centroid: no split plane separates them.
        let tri = Triangle::from_vertices(
            Vec3::new(-1.0, 0.0, 2.0),
            Vec3::new(1.0, 0.0, 2.0),
            Vec3::new(0.0, 1.0, 2.0),
            CullMode::None,
            0,
        );
        let bvh = Bvh::from_triangles(vec![tri; 4]);
        assert_eq!(bvh.nodes_used, 2, "degenerate split must accept a leaf");
        assert_eq!(bvh.nodes[0].tri_count, 4);
        let ray = Ray::new(Vec3::new(0.0, 0.1, 0.0), Vec3::UNIT_Z);
        assert!(bvh.closest_hit(&ray).is_some());
    }

    #[test]
    fn refit_is_idempotent() {
        let mesh = cube_mesh();
        let mut bvh = Bvh::build(&mesh);
        bvh.refit();
        let once: Vec<Aabb> = bvh.nodes[..bvh.nodes_used as usize]
            .iter()
            .map(|n| n.bounds)
            .collect();
        bvh.refit();
        let twice: Vec<Aabb> = bvh.nodes[..bvh.nodes_used as usize]
            .iter()
            .map(|n| n.bounds)
            .collect();
        assert_eq!(once, twice);
    }

    #[test]
    fn refit_tracks_transformed_mesh_without_resplitting() {
        let mut mesh = cube_mesh();
        let mut bvh = Bvh::build(&mesh);
        let topology: Vec<(u32, u32)> = bvh.nodes[..bvh.nodes_used as usize]
            .iter()
            .map(|n| (n.left_first, n.tri_count))
            .collect();

        mesh.set_translation(Vec3::new(0.0, -2.0, 0.0));
        mesh.update_transforms();
        bvh.update_triangles(&mesh);
        bvh.refit();

        let after: Vec<(u32, u32)> = bvh.nodes[..bvh.nodes_used as usize]
            .iter()
            .map(|n| (n.left_first, n.tri_count))
            .collect();
        assert_eq!(topology, after, "refit must preserve topology");

        // Cube top moved from y=0.5 to y=-1.5, so the hit moved from 1.5 to 3.5.
        let ray = Ray::new(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, -1.0, 0.0));
        let hit = bvh.closest_hit(&ray).unwrap();
        assert!((hit.t - 3.5).abs() < 1e-4, "expected t≈3.5, got {}", hit.t);
    }

    #[test]
    fn empty_bvh_never_hits() {
        let bvh = Bvh::from_triangles(Vec::new());
        let ray = Ray::new(Vec3::ZERO, Vec3::UNIT_Z);
        assert!(bvh.closest_hit(&ray).is_none());
        assert!(!bvh.any_hit(&ray));
    }

    #[test]
    fn edge_graze_is_consistent_between_paths() {
        let bvh = Bvh::build(&cube_mesh());
        // Rays aimed exactly along the cube's top edge.
        for x in [-0.5f32, 0.5] {
            let ray = Ray::new(Vec3::new(x, 0.5, -5.0), Vec3::UNIT_Z);
            let a = bvh.closest_hit(&ray).is_some();
            let b = bvh.closest_hit_recursive(&ray).is_some();
            assert_eq!(a, b, "grazing ray must agree between traversal paths");
        }
    }

    #[test]
    fn large_soup_traverses_without_stack_overflow() {
        let bvh = Bvh::from_triangles(random_soup(1024, 99));
        let mut rng = SmallRng::seed_from_u64(5);
        for _ in 0..200 {
            let ray = random_ray(&mut rng);
            // Must not panic on stack overflow.
            let _ = bvh.closest_hit(&ray);
        }
    }
}
