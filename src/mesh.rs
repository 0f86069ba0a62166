use crate::geometry::{CullMode, Triangle};
use crate::math::{Matrix, Vec3};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

// ─── Triangle Mesh ──────────────────────────────────────────────────────────

/// An indexed triangle mesh with one normal per face and a rigid transform
/// split into translation, rotation, and scale factors.
///
/// Model-space `positions`/`normals` are authoritative; `transformed_*` are
/// mirror arrays rebuilt by [`update_transforms`](Self::update_transforms)
/// and are what intersection and the BVH consume. Invariants:
/// `transformed_positions.len() == positions.len()`,
/// `transformed_normals.len() == indices.len() / 3`, and every index is a
/// valid position index.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    pub positions: Vec<Vec3>,
    /// One normal per face, parallel to the index triples.
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub cull_mode: CullMode,
    pub material_index: u8,

    translation: Matrix,
    rotation: Matrix,
    scale: Matrix,

    pub transformed_positions: Vec<Vec3>,
    pub transformed_normals: Vec<Vec3>,
}

impl TriangleMesh {
    /// Builds a mesh from positions and index triples, deriving per-face
    /// normals from the winding.
    pub fn new(
        positions: Vec<Vec3>,
        indices: Vec<u32>,
        cull_mode: CullMode,
        material_index: u8,
    ) -> Self {
        let normals = calculate_normals(&positions, &indices);
        Self::with_normals(positions, indices, normals, cull_mode, material_index)
    }

    /// Builds a mesh with precomputed per-face normals.
    pub fn with_normals(
        positions: Vec<Vec3>,
        indices: Vec<u32>,
        normals: Vec<Vec3>,
        cull_mode: CullMode,
        material_index: u8,
    ) -> Self {
        assert!(
            indices.len() % 3 == 0,
            "index count must be a multiple of 3"
        );
        assert_eq!(
            normals.len(),
            indices.len() / 3,
            "one normal per face expected"
        );
        assert!(
            indices.iter().all(|&i| (i as usize) < positions.len()),
            "index out of range of the position buffer"
        );

        let mut mesh = Self {
            positions,
            normals,
            indices,
            cull_mode,
            material_index,
            translation: Matrix::IDENTITY,
            rotation: Matrix::IDENTITY,
            scale: Matrix::IDENTITY,
            transformed_positions: Vec::new(),
            transformed_normals: Vec::new(),
        };
        mesh.update_transforms();
        mesh
    }

    /// Loads a mesh from a Wavefront OBJ file (vertices and triangle faces
    /// only), deriving per-face normals.
    pub fn from_obj(
        path: impl AsRef<Path>,
        cull_mode: CullMode,
        material_index: u8,
    ) -> Result<Self, ObjError> {
        let (positions, indices) = load_obj(path)?;
        Ok(Self::new(positions, indices, cull_mode, material_index))
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.normals.len()
    }

    pub fn set_translation(&mut self, translation: Vec3) {
        self.translation = Matrix::translation(translation);
    }

    pub fn set_rotation_y(&mut self, yaw: f32) {
        self.rotation = Matrix::rotation_y(yaw);
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = Matrix::scaling(scale);
    }

    /// Appends one triangle's vertices, indices, and face normal. Call
    /// [`update_transforms`](Self::update_transforms) once after a batch of
    /// appends.
    pub fn append_triangle(&mut self, triangle: &Triangle) {
        let start = self.positions.len() as u32;
        self.positions.push(triangle.v0);
        self.positions.push(triangle.v1);
        self.positions.push(triangle.v2);
        self.indices.extend([start, start + 1, start + 2]);
        self.normals.push(triangle.normal);
    }

    /// Recomputes the mirror arrays from the composed transform
    /// (scale · rotation · translation). Normals go through the linear part
    /// only; the transform is assumed rigid, so they stay unit length.
    pub fn update_transforms(&mut self) {
        let final_transform = self.scale * self.rotation * self.translation;

        self.transformed_positions.clear();
        self.transformed_positions.extend(
            self.positions
                .iter()
                .map(|&p| final_transform.transform_point(p)),
        );

        self.transformed_normals.clear();
        self.transformed_normals.extend(
            self.normals
                .iter()
                .map(|&n| final_transform.transform_vector(n)),
        );
    }

    /// Bakes the world-space triangle list the BVH caches. Face `i` uses
    /// index triple `3i..3i+3` and normal `i`.
    pub fn bake_triangles(&self) -> Vec<Triangle> {
        debug_assert_eq!(self.transformed_positions.len(), self.positions.len());
        self.indices
            .chunks_exact(3)
            .zip(&self.transformed_normals)
            .map(|(tri, &normal)| {
                Triangle::new(
                    self.transformed_positions[tri[0] as usize],
                    self.transformed_positions[tri[1] as usize],
                    self.transformed_positions[tri[2] as usize],
                    normal,
                    self.cull_mode,
                    self.material_index,
                )
            })
            .collect()
    }
}

/// Per-face normals as the normalized winding cross product. Zero-area faces
/// get a zero normal, which the triangle kernel treats as a miss.
fn calculate_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    indices
        .chunks_exact(3)
        .map(|tri| {
            let v0 = positions[tri[0] as usize];
            let v1 = positions[tri[1] as usize];
            let v2 = positions[tri[2] as usize];
            (v1 - v0).cross(v2 - v0).normalized_or_zero()
        })
        .collect()
}

// ─── OBJ Loader ─────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ObjError {
    #[error("failed to read OBJ file: {0}")]
    Io(#[from] io::Error),
    #[error("malformed `{statement}` statement on line {line}")]
    Malformed { statement: &'static str, line: usize },
}

/// Parses the `v`/`f` subset of Wavefront OBJ: `v x y z` vertices and
/// `f i0 i1 i2` triangle faces with 1-based indices (stored 0-based).
/// Comments and any other statement are skipped line-wise.
pub fn load_obj(path: impl AsRef<Path>) -> Result<(Vec<Vec3>, Vec<u32>), ObjError> {
    let text = fs::read_to_string(path.as_ref())?;

    let mut positions = Vec::new();
    let mut indices = Vec::new();

    for (line_no, raw) in text.lines().enumerate() {
        let line = line_no + 1;
        let mut tokens = raw.split_whitespace();
        match tokens.next() {
            Some("v") => {
                let mut coord = || -> Result<f32, ObjError> {
                    tokens
                        .next()
                        .and_then(|t| t.parse().ok())
                        .ok_or(ObjError::Malformed {
                            statement: "v",
                            line,
                        })
                };
                let x = coord()?;
                let y = coord()?;
                let z = coord()?;
                positions.push(Vec3::new(x, y, z));
            }
            Some("f") => {
                let mut index = || -> Result<u32, ObjError> {
                    tokens
                        .next()
                        .and_then(|t| t.parse::<u32>().ok())
                        .and_then(|i| i.checked_sub(1))
                        .ok_or(ObjError::Malformed {
                            statement: "f",
                            line,
                        })
                };
                let i0 = index()?;
                let i1 = index()?;
                let i2 = index()?;
                indices.extend([i0, i1, i2]);
            }
            // Comments and unrecognized statements are skipped.
            _ => {}
        }
    }

    log::debug!(
        "parsed OBJ: {} vertices, {} faces",
        positions.len(),
        indices.len() / 3
    );
    Ok((positions, indices))
}
