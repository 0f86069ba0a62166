use crate::math::{Aabb, Ray, Vec3};

// ─── Hit Record ─────────────────────────────────────────────────────────────

/// The result of a successful intersection: the hit point, the surface
/// normal there, the ray parameter, and the index into the scene's material
/// catalog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRecord {
    pub point: Vec3,
    pub normal: Vec3,
    pub t: f32,
    pub material_index: u8,
}

/// Winding-based culling for triangles. Shadow rays flip FrontFace and
/// BackFace: a ray leaving a surface toward a light meets the occluder from
/// the side opposite to the one the light sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullMode {
    FrontFace,
    BackFace,
    #[default]
    None,
}

impl CullMode {
    #[inline]
    pub fn flipped(self) -> Self {
        match self {
            CullMode::FrontFace => CullMode::BackFace,
            CullMode::BackFace => CullMode::FrontFace,
            CullMode::None => CullMode::None,
        }
    }
}

/// Rays closer than this to parallel with a triangle's plane are treated as
/// misses.
const PARALLEL_EPSILON: f32 = 1e-2;

/// Plane kernels reject a near-zero denominator before dividing, so a
/// grazing ray can never produce NaN.
const PLANE_EPSILON: f32 = 1e-8;

// ─── Sphere ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    pub origin: Vec3,
    pub radius: f32,
    pub material_index: u8,
}

impl Sphere {
    pub const fn new(origin: Vec3, radius: f32, material_index: u8) -> Self {
        Self {
            origin,
            radius,
            material_index,
        }
    }

    /// Analytic quadratic intersection. Only the near root is considered; a
    /// sphere whose near intersection lies behind `t_min` is a miss.
    pub fn hit(&self, ray: &Ray) -> Option<HitRecord> {
        let oc = ray.origin - self.origin;
        let a = ray.direction.dot(ray.direction);
        let b = 2.0 * ray.direction.dot(oc);
        let c = oc.dot(oc) - self.radius * self.radius;

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }

        let t = (-b - discriminant.sqrt()) / (2.0 * a);
        // A negative near clip is treated as zero rather than admitting
        // hits behind the origin.
        if t < ray.t_min.max(0.0) || t * t > ray.t_max {
            return None;
        }

        let point = ray.at(t);
        Some(HitRecord {
            point,
            normal: (point - self.origin) / self.radius,
            t,
            material_index: self.material_index,
        })
    }
}

// ─── Infinite Plane ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub origin: Vec3,
    pub normal: Vec3,
    pub material_index: u8,
}

impl Plane {
    pub const fn new(origin: Vec3, normal: Vec3, material_index: u8) -> Self {
        Self {
            origin,
            normal,
            material_index,
        }
    }

    pub fn hit(&self, ray: &Ray) -> Option<HitRecord> {
        let denom = ray.direction.dot(self.normal);
        if denom.abs() < PLANE_EPSILON {
            return None;
        }
        let t = (self.origin - ray.origin).dot(self.normal) / denom;
        if t < ray.t_min || t * t > ray.t_max {
            return None;
        }
        Some(HitRecord {
            point: ray.at(t),
            normal: self.normal,
            t,
            material_index: self.material_index,
        })
    }
}

// ─── Triangle ───────────────────────────────────────────────────────────────

/// A triangle baked for intersection: vertices, a unit face normal, and the
/// centroid the BVH builder splits on.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
    pub normal: Vec3,
    pub centroid: Vec3,
    pub cull_mode: CullMode,
    pub material_index: u8,
}

impl Triangle {
    pub fn new(
        v0: Vec3,
        v1: Vec3,
        v2: Vec3,
        normal: Vec3,
        cull_mode: CullMode,
        material_index: u8,
    ) -> Self {
        Self {
            v0,
            v1,
            v2,
            normal: normal.normalized_or_zero(),
            centroid: (v0 + v1 + v2) / 3.0,
            cull_mode,
            material_index,
        }
    }

    /// Builds a triangle whose normal comes from its winding.
    pub fn from_vertices(v0: Vec3, v1: Vec3, v2: Vec3, cull_mode: CullMode, material_index: u8) -> Self {
        let normal = (v1 - v0).cross(v2 - v0);
        Self::new(v0, v1, v2, normal, cull_mode, material_index)
    }

    pub fn aabb(&self) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        bounds.grow(self.v0);
        bounds.grow(self.v1);
        bounds.grow(self.v2);
        bounds
    }

    /// Möller–Trumbore intersection with cull-mode handling.
    ///
    /// `shadow_pass` flips the cull mode (FrontFace ↔ BackFace) so occluders
    /// are tested from the light's side. The reported normal is the stored
    /// face normal, not one recomputed from the barycentrics.
    pub fn hit(&self, ray: &Ray, shadow_pass: bool) -> Option<HitRecord> {
        let e1 = self.v1 - self.v0;
        let e2 = self.v2 - self.v0;
        let p = ray.direction.cross(e2);
        let det = e1.dot(p);
        if det.abs() < PARALLEL_EPSILON {
            return None;
        }
        let is_back_facing = det < 0.0;

        let cull = if shadow_pass {
            self.cull_mode.flipped()
        } else {
            self.cull_mode
        };
        match cull {
            CullMode::FrontFace if !is_back_facing => return None,
            CullMode::BackFace if is_back_facing => return None,
            _ => {}
        }

        let inv_det = 1.0 / det;
        let s = ray.origin - self.v0;
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
        if t < ray.t_min || t * t > ray.t_max {
            return None;
        }

        Some(HitRecord {
            point: ray.at(t),
            normal: self.normal,
            t,
            material_index: self.material_index,
        })
    }
}
