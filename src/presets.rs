use crate::camera::Camera;
use crate::geometry::{CullMode, Plane, Sphere, Triangle};
use crate::material::Material;
use crate::math::{ColorRGB, Vec3};
use crate::mesh::{ObjError, TriangleMesh};
use crate::scene::{Light, Scene, SceneMesh};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::path::Path;

/// A complete renderable setup: geometry, lights, materials, and a starting
/// camera. Presets let users render a showcase without authoring a scene.
pub struct SceneDescription {
    pub name: &'static str,
    pub scene: Scene,
    pub camera: Camera,
}

/// Available built-in scene presets.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ScenePreset {
    /// Two rows of rough-to-smooth spheres in a five-plane room with three
    /// point lights — the full material showcase.
    Reference,
    /// Three triangles demonstrating each cull mode side by side.
    Triangles,
    /// A cube mesh in the lit room; rotates when run interactively.
    Mesh,
    /// A procedural triangle soup exercising BVH build and traversal depth.
    Stress,
}

impl ScenePreset {
    pub fn build(self) -> SceneDescription {
        match self {
            ScenePreset::Reference => build_reference(),
            ScenePreset::Triangles => build_triangles(),
            ScenePreset::Mesh => build_mesh(),
            ScenePreset::Stress => build_stress(),
        }
    }
}

// ─── Shared Room ────────────────────────────────────────────────────────────

const GRAY_BLUE: ColorRGB = ColorRGB::new(0.49, 0.57, 0.57);

/// Five matte planes boxing the showcase scenes, plus the standard
/// three-point-light rig.
fn add_room_and_lights(scene: &mut Scene) {
    let wall = scene.add_material(Material::Lambert {
        diffuse_reflectance: 1.0,
        diffuse_color: GRAY_BLUE,
    });

    scene.planes.push(Plane::new(Vec3::ZERO, Vec3::UNIT_Y, wall));
    scene
        .planes
        .push(Plane::new(Vec3::new(0.0, 10.0, 0.0), -Vec3::UNIT_Y, wall));
    scene
        .planes
        .push(Plane::new(Vec3::new(0.0, 0.0, 10.0), -Vec3::UNIT_Z, wall));
    scene
        .planes
        .push(Plane::new(Vec3::new(5.0, 0.0, 0.0), -Vec3::UNIT_X, wall));
    scene
        .planes
        .push(Plane::new(Vec3::new(-5.0, 0.0, 0.0), Vec3::UNIT_X, wall));

    scene.lights.push(Light::point(
        Vec3::new(0.0, 5.0, 5.0),
        50.0,
        ColorRGB::new(1.0, 0.61, 0.45),
    ));
    scene.lights.push(Light::point(
        Vec3::new(-2.5, 5.0, -5.0),
        70.0,
        ColorRGB::new(1.0, 0.8, 0.45),
    ));
    scene.lights.push(Light::point(
        Vec3::new(2.5, 2.5, -5.0),
        50.0,
        ColorRGB::new(0.34, 0.47, 0.68),
    ));
}

fn showcase_camera() -> Camera {
    Camera::new(Vec3::new(0.0, 3.0, -9.0), 45.0)
}

// ─── Presets ────────────────────────────────────────────────────────────────

fn build_reference() -> SceneDescription {
    let mut scene = Scene::new();
    add_room_and_lights(&mut scene);

    // Bottom row: metals, rough to mirror-like. Top row: dielectrics.
    let silver = ColorRGB::new(0.972, 0.960, 0.915);
    let rough_metal = scene.add_material(Material::CookTorrance {
        albedo: silver,
        metalness: 1.0,
        roughness: 1.0,
    });
    let medium_metal = scene.add_material(Material::CookTorrance {
        albedo: silver,
        metalness: 1.0,
        roughness: 0.6,
    });
    let smooth_metal = scene.add_material(Material::CookTorrance {
        albedo: silver,
        metalness: 1.0,
        roughness: 0.1,
    });
    let blue = ColorRGB::new(0.75, 0.75, 1.0);
    let rough_plastic = scene.add_material(Material::CookTorrance {
        albedo: blue,
        metalness: 0.0,
        roughness: 1.0,
    });
    let medium_plastic = scene.add_material(Material::CookTorrance {
        albedo: blue,
        metalness: 0.0,
        roughness: 0.4,
    });
    let smooth_plastic = scene.add_material(Material::CookTorrance {
        albedo: blue,
        metalness: 0.0,
        roughness: 0.1,
    });

    let radius = 0.75;
    let rows = [
        (1.0, [rough_metal, medium_metal, smooth_metal]),
        (3.0, [rough_plastic, medium_plastic, smooth_plastic]),
    ];
    for (y, materials) in rows {
        for (i, material) in materials.into_iter().enumerate() {
            let x = -1.75 + i as f32 * 1.75;
            scene
                .spheres
                .push(Sphere::new(Vec3::new(x, y, 0.0), radius, material));
        }
    }

    SceneDescription {
        name: "Reference",
        scene,
        camera: showcase_camera(),
    }
}

fn build_triangles() -> SceneDescription {
    let mut scene = Scene::new();
    add_room_and_lights(&mut scene);

    let white = scene.add_material(Material::Lambert {
        diffuse_reflectance: 1.0,
        diffuse_color: ColorRGB::WHITE,
    });

    for (i, cull_mode) in [CullMode::FrontFace, CullMode::BackFace, CullMode::None]
        .into_iter()
        .enumerate()
    {
        let mut mesh = TriangleMesh::new(
            vec![
                Vec3::new(-0.75, 1.5, 0.0),
                Vec3::new(-0.75, 0.0, 0.0),
                Vec3::new(0.75, 1.5, 0.0),
            ],
            vec![0, 1, 2],
            cull_mode,
            white,
        );
        mesh.set_translation(Vec3::new(-1.75 + i as f32 * 1.75, 4.5, 0.0));
        mesh.update_transforms();
        scene.meshes.push(SceneMesh::new(mesh));
    }

    SceneDescription {
        name: "Cull Modes",
        scene,
        camera: showcase_camera(),
    }
}

fn build_mesh() -> SceneDescription {
    let mut scene = Scene::new();
    add_room_and_lights(&mut scene);

    let brushed = scene.add_material(Material::CookTorrance {
        albedo: ColorRGB::new(0.95, 0.93, 0.88),
        metalness: 1.0,
        roughness: 0.5,
    });

    let mut cube = cube_mesh(1.5, CullMode::BackFace, brushed);
    cube.set_translation(Vec3::new(0.0, 1.0, 0.0));
    cube.update_transforms();
    scene.meshes.push(SceneMesh::new(cube));

    SceneDescription {
        name: "Cube Mesh",
        scene,
        camera: showcase_camera(),
    }
}

fn build_stress() -> SceneDescription {
    let mut scene = Scene::new();
    let mut rng = SmallRng::seed_from_u64(42);

    let floor = scene.add_material(Material::Lambert {
        diffuse_reflectance: 1.0,
        diffuse_color: ColorRGB::gray(0.5),
    });
    scene.planes.push(Plane::new(Vec3::ZERO, Vec3::UNIT_Y, floor));

    let shard = scene.add_material(Material::CookTorrance {
        albedo: ColorRGB::new(0.8, 0.85, 0.9),
        metalness: 0.0,
        roughness: 0.7,
    });

    // 1500 shards scattered through a slab above the floor; one mesh, one
    // deep BVH.
    let mut mesh = TriangleMesh::new(Vec::new(), Vec::new(), CullMode::None, shard);
    for _ in 0..1500 {
        let base = Vec3::new(
            rng.gen_range(-6.0..6.0),
            rng.gen_range(0.2..4.0),
            rng.gen_range(-6.0..6.0),
        );
        let e1 = Vec3::new(
            rng.gen_range(-0.4..0.4),
            rng.gen_range(-0.4..0.4),
            rng.gen_range(-0.4..0.4),
        );
        let e2 = Vec3::new(
            rng.gen_range(-0.4..0.4),
            rng.gen_range(-0.4..0.4),
            rng.gen_range(-0.4..0.4),
        );
        mesh.append_triangle(&Triangle::from_vertices(
            base,
            base + e1,
            base + e2,
            CullMode::None,
            shard,
        ));
    }
    mesh.update_transforms();
    scene.meshes.push(SceneMesh::new(mesh));

    scene.lights.push(Light::point(
        Vec3::new(0.0, 8.0, -4.0),
        120.0,
        ColorRGB::WHITE,
    ));
    scene.lights.push(Light::directional(
        Vec3::new(0.3, -1.0, 0.2).normalized(),
        0.8,
        ColorRGB::new(0.7, 0.8, 1.0),
    ));

    SceneDescription {
        name: "Stress (1500 triangles)",
        scene,
        camera: Camera::new(Vec3::new(0.0, 3.0, -12.0), 50.0),
    }
}

/// Builds the lit room around a mesh loaded from an OBJ file.
pub fn build_obj_scene(path: impl AsRef<Path>) -> Result<SceneDescription, ObjError> {
    let mut scene = Scene::new();
    add_room_and_lights(&mut scene);

    let white = scene.add_material(Material::Lambert {
        diffuse_reflectance: 1.0,
        diffuse_color: ColorRGB::WHITE,
    });

    let mut mesh = TriangleMesh::from_obj(path, CullMode::BackFace, white)?;
    mesh.set_translation(Vec3::new(0.0, 1.0, 0.0));
    mesh.update_transforms();
    log::info!("loaded OBJ mesh: {} triangles", mesh.triangle_count());
    scene.meshes.push(SceneMesh::new(mesh));

    Ok(SceneDescription {
        name: "OBJ Mesh",
        scene,
        camera: showcase_camera(),
    })
}

/// A cube of the given side length centred at the origin, 12 triangles.
fn cube_mesh(side: f32, cull_mode: CullMode, material_index: u8) -> TriangleMesh {
    let h = side * 0.5;
    let positions = vec![
        Vec3::new(-h, -h, -h),
        Vec3::new(h, -h, -h),
        Vec3::new(h, h, -h),
        Vec3::new(-h, h, -h),
        Vec3::new(-h, -h, h),
        Vec3::new(h, -h, h),
        Vec3::new(h, h, h),
        Vec3::new(-h, h, h),
    ];
    #[rustfmt::skip]
    let indices = vec![
        0, 1, 5,  0, 5, 4, // bottom
        3, 7, 6,  3, 6, 2, // top
        4, 5, 6,  4, 6, 7, // front
        1, 0, 3,  1, 3, 2, // back
        0, 4, 7,  0, 7, 3, // left
        5, 1, 2,  5, 2, 6, // right
    ];
    TriangleMesh::new(positions, indices, cull_mode, material_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Ray;
    use crate::renderer::{render, LightingMode, RenderConfig};

    #[test]
    fn every_preset_builds_consistently() {
        for preset in [
            ScenePreset::Reference,
            ScenePreset::Triangles,
            ScenePreset::Mesh,
            ScenePreset::Stress,
        ] {
            let desc = preset.build();
            assert!(!desc.scene.lights.is_empty(), "{}: no lights", desc.name);
            assert!(!desc.scene.materials.is_empty(), "{}: no materials", desc.name);
            let has_geometry = !desc.scene.spheres.is_empty()
                || !desc.scene.planes.is_empty()
                || !desc.scene.meshes.is_empty();
            assert!(has_geometry, "{}: no geometry", desc.name);

            // Material indices must stay inside the catalog.
            let count = desc.scene.materials.len() as u8;
            for s in &desc.scene.spheres {
                assert!(s.material_index < count);
            }
            for p in &desc.scene.planes {
                assert!(p.material_index < count);
            }
            for m in &desc.scene.meshes {
                assert!(m.mesh.material_index < count);
            }
        }
    }

    #[test]
    fn reference_camera_sees_the_spheres() {
        let desc = ScenePreset::Reference.build();
        let to_sphere = (Vec3::new(0.0, 1.0, 0.0) - desc.camera.origin).normalized();
        let hit = desc
            .scene
            .closest_hit(&Ray::new(desc.camera.origin, to_sphere))
            .expect("aimed ray must hit");
        // The center bottom sphere sits nearer than the back wall.
        assert!(hit.t < 10.0);
    }

    #[test]
    fn presets_render_nonblack_frames() {
        for preset in [ScenePreset::Reference, ScenePreset::Mesh] {
            let mut desc = preset.build();
            let config = RenderConfig {
                width: 16,
                height: 16,
                lighting_mode: LightingMode::Combined,
                shadows_enabled: true,
                threads: 1,
            };
            let (fb, _) = render(&desc.scene, &mut desc.camera, &config);
            assert!(
                fb.pixels.iter().any(|p| p.r + p.g + p.b > 0.0),
                "{}: frame should not be pitch black",
                desc.name
            );
        }
    }

    #[test]
    fn stress_preset_is_deterministic() {
        let a = ScenePreset::Stress.build();
        let b = ScenePreset::Stress.build();
        let mesh_a = &a.scene.meshes[0].mesh;
        let mesh_b = &b.scene.meshes[0].mesh;
        assert_eq!(mesh_a.triangle_count(), mesh_b.triangle_count());
        assert_eq!(mesh_a.positions[0], mesh_b.positions[0]);
    }
}
