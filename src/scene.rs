use crate::bvh::Bvh;
use crate::geometry::{HitRecord, Plane, Sphere};
use crate::material::Material;
use crate::math::{ColorRGB, Ray, Vec3};
use crate::mesh::TriangleMesh;

// ─── Lights ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    Point,
    Directional,
}

#[derive(Debug, Clone, Copy)]
pub struct Light {
    pub origin: Vec3,
    pub direction: Vec3,
    pub color: ColorRGB,
    pub intensity: f32,
    pub light_type: LightType,
}

impl Light {
    pub fn point(origin: Vec3, intensity: f32, color: ColorRGB) -> Self {
        Self {
            origin,
            direction: Vec3::ZERO,
            color,
            intensity,
            light_type: LightType::Point,
        }
    }

    pub fn directional(direction: Vec3, intensity: f32, color: ColorRGB) -> Self {
        Self {
            origin: Vec3::ZERO,
            direction: direction.normalized(),
            color,
            intensity,
            light_type: LightType::Directional,
        }
    }

    /// Vector from `target` toward the light. For point lights this is
    /// unnormalized so the caller can take its squared magnitude as the
    /// shadow-ray range; directional lights return the reversed unit beam.
    pub fn direction_to(&self, target: Vec3) -> Vec3 {
        match self.light_type {
            LightType::Point => self.origin - target,
            LightType::Directional => -self.direction,
        }
    }

    /// Irradiance arriving at `target`: inverse-square falloff for point
    /// lights, constant for directional ones.
    pub fn radiance(&self, target: Vec3) -> ColorRGB {
        match self.light_type {
            LightType::Point => {
                self.color * (self.intensity / (self.origin - target).magnitude_squared())
            }
            LightType::Directional => self.color * self.intensity,
        }
    }
}

// ─── Scene ──────────────────────────────────────────────────────────────────

/// A triangle mesh paired with the BVH built over its world-space triangles.
#[derive(Debug, Clone)]
pub struct SceneMesh {
    pub mesh: TriangleMesh,
    pub bvh: Bvh,
}

impl SceneMesh {
    pub fn new(mesh: TriangleMesh) -> Self {
        let bvh = Bvh::build(&mesh);
        Self { mesh, bvh }
    }

    /// Propagates a transform change: rebakes the mesh's transformed arrays
    /// and the BVH's triangle cache, then refits bounds. Topology is kept.
    pub fn update_transforms(&mut self) {
        self.mesh.update_transforms();
        self.bvh.update_triangles(&self.mesh);
        self.bvh.refit();
    }
}

/// Everything a frame reads: primitives, meshes with their BVHs, lights,
/// and the material catalog. Immutable during rendering.
#[derive(Default)]
pub struct Scene {
    pub spheres: Vec<Sphere>,
    pub planes: Vec<Plane>,
    pub meshes: Vec<SceneMesh>,
    pub lights: Vec<Light>,
    pub materials: Vec<Material>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a material and returns its catalog index.
    pub fn add_material(&mut self, material: Material) -> u8 {
        let index = self.materials.len();
        assert!(index <= u8::MAX as usize, "material catalog is full");
        self.materials.push(material);
        index as u8
    }

    /// The closest intersection over all primitives and meshes, independent
    /// of iteration order.
    pub fn closest_hit(&self, ray: &Ray) -> Option<HitRecord> {
        let mut best: Option<HitRecord> = None;

        for sphere in &self.spheres {
            keep_nearest(&mut best, sphere.hit(ray));
        }
        for plane in &self.planes {
            keep_nearest(&mut best, plane.hit(ray));
        }
        for scene_mesh in &self.meshes {
            keep_nearest(&mut best, scene_mesh.bvh.closest_hit(ray));
        }
        best
    }

    /// Whether anything blocks the ray inside its range. Runs the any-hit
    /// (shadow) pass: triangle cull modes are inverted and the walk stops at
    /// the first occluder.
    pub fn does_hit(&self, ray: &Ray) -> bool {
        self.spheres.iter().any(|s| s.hit(ray).is_some())
            || self.planes.iter().any(|p| p.hit(ray).is_some())
            || self.meshes.iter().any(|m| m.bvh.any_hit(ray))
    }
}

#[inline]
fn keep_nearest(best: &mut Option<HitRecord>, candidate: Option<HitRecord>) {
    if let Some(hit) = candidate {
        if best.map_or(true, |b| hit.t < b.t) {
            *best = Some(hit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::CullMode;

    fn cube_mesh_at(center: Vec3) -> TriangleMesh {
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
        let mut mesh = TriangleMesh::new(positions, indices, CullMode::None, 0);
        mesh.set_translation(center);
        mesh.update_transforms();
        mesh
    }

    fn test_scene() -> Scene {
        let mut scene = Scene::new();
        let mat = scene.add_material(Material::SolidColor {
            color: ColorRGB::WHITE,
        });
        scene.spheres.push(Sphere::new(Vec3::new(0.0, 0.0, 6.0), 0.3, mat));
        scene
            .planes
            .push(Plane::new(Vec3::new(0.0, 0.0, 20.0), -Vec3::UNIT_Z, mat));
        scene
            .meshes
            .push(SceneMesh::new(cube_mesh_at(Vec3::new(0.0, 0.0, 10.0))));
        scene
    }

    #[test]
    fn closest_hit_is_global_minimum() {
        let scene = test_scene();
        let ray = Ray::new(Vec3::ZERO, Vec3::UNIT_Z);
        // Sphere front at t=5.7, cube front at t=9.5, plane at t=20.
        let hit = scene.closest_hit(&ray).expect("must hit something");
        assert!((hit.t - 5.7).abs() < 1e-4, "expected sphere first, t={}", hit.t);
    }

    #[test]
    fn closest_hit_falls_through_to_farther_objects() {
        let scene = test_scene();
        // Offset ray misses the sphere but pierces the cube.
        let ray = Ray::new(Vec3::new(0.4, 0.0, 0.0), Vec3::UNIT_Z);
        let hit = scene.closest_hit(&ray).unwrap();
        assert!((hit.t - 9.5).abs() < 1e-4, "expected cube front, t={}", hit.t);

        // Far off-axis only the plane remains.
        let ray = Ray::new(Vec3::new(3.0, 3.0, 0.0), Vec3::UNIT_Z);
        let hit = scene.closest_hit(&ray).unwrap();
        assert!((hit.t - 20.0).abs() < 1e-4);
    }

    #[test]
    fn does_hit_matches_closest_hit_within_range() {
        let scene = test_scene();
        let ray = Ray::with_max(Vec3::ZERO, Vec3::UNIT_Z, 6.0 * 6.0);
        assert!(scene.does_hit(&ray));

        // Squared range short of the sphere at t=5.7 (t² ≈ 32.5).
        let short = Ray::with_max(Vec3::ZERO, Vec3::UNIT_Z, 20.0);
        assert!(!scene.does_hit(&short));
    }

    #[test]
    fn shadow_query_is_symmetric_for_uncull_geometry() {
        let mut scene = Scene::new();
        scene
            .meshes
            .push(SceneMesh::new(cube_mesh_at(Vec3::ZERO)));

        let pairs = [
            // Occluded through the cube.
            (Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, -2.0, 0.0), true),
            // Clear path beside the cube.
            (Vec3::new(3.0, 2.0, 0.0), Vec3::new(3.0, -2.0, 0.0), false),
        ];
        for (a, b, expected) in pairs {
            let forward = Ray::with_max(a, (b - a).normalized(), (b - a).magnitude_squared());
            let backward = Ray::with_max(b, (a - b).normalized(), (a - b).magnitude_squared());
            assert_eq!(scene.does_hit(&forward), expected);
            assert_eq!(
                scene.does_hit(&forward),
                scene.does_hit(&backward),
                "shadow query must be symmetric"
            );
        }
    }

    #[test]
    fn point_light_radiance_falls_off_with_square_distance() {
        let light = Light::point(Vec3::ZERO, 100.0, ColorRGB::WHITE);
        let near = light.radiance(Vec3::new(0.0, 0.0, 1.0));
        let far = light.radiance(Vec3::new(0.0, 0.0, 2.0));
        assert!((near.r - 100.0).abs() < 1e-3);
        assert!((far.r - 25.0).abs() < 1e-3);
    }

    #[test]
    fn directional_light_has_constant_radiance() {
        let light = Light::directional(Vec3::new(0.0, -1.0, 0.0), 2.0, ColorRGB::WHITE);
        let a = light.radiance(Vec3::ZERO);
        let b = light.radiance(Vec3::new(100.0, 0.0, 0.0));
        assert_eq!(a, b);
        // Direction to the light opposes the beam.
        assert!((light.direction_to(Vec3::ZERO) - Vec3::UNIT_Y).magnitude() < 1e-5);
    }

    #[test]
    fn mesh_transform_update_moves_hits() {
        let mut scene = Scene::new();
        scene
            .meshes
            .push(SceneMesh::new(cube_mesh_at(Vec3::new(0.0, 0.0, 5.0))));

        let ray = Ray::new(Vec3::ZERO, Vec3::UNIT_Z);
        let before = scene.closest_hit(&ray).unwrap();
        assert!((before.t - 4.5).abs() < 1e-4);

        scene.meshes[0].mesh.set_translation(Vec3::new(0.0, 0.0, 8.0));
        scene.meshes[0].update_transforms();

        let after = scene.closest_hit(&ray).unwrap();
        assert!((after.t - 7.5).abs() < 1e-4, "refit BVH must track the mesh");
    }
}
