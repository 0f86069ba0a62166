use crate::geometry::HitRecord;
use crate::math::{ColorRGB, Vec3};

/// The individual BRDF terms. Directions follow the shading convention used
/// everywhere in the renderer: `l` points from the surface toward the light,
/// `v` from the surface toward the viewer, both unit length.
pub mod brdf {
    use super::{ColorRGB, Vec3};
    use std::f32::consts::PI;

    /// Lambert diffuse: (cd · kd) / π.
    #[inline]
    pub fn lambert(kd: f32, cd: ColorRGB) -> ColorRGB {
        cd * kd / PI
    }

    /// Lambert diffuse with a per-channel reflectance coefficient.
    #[inline]
    pub fn lambert_color(kd: ColorRGB, cd: ColorRGB) -> ColorRGB {
        cd * kd / PI
    }

    /// Phong specular lobe: ks · max(0, r·v)^exp with r the light direction
    /// mirrored about the normal.
    pub fn phong(ks: f32, exp: f32, l: Vec3, v: Vec3, n: Vec3) -> ColorRGB {
        let reflect = l - 2.0 * n.dot(l) * n;
        let cos_angle = reflect.dot(v).max(0.0);
        ColorRGB::gray(ks * cos_angle.powf(exp))
    }

    /// Schlick's Fresnel approximation; `h` is the unit half vector between
    /// view and light directions, `f0` the base reflectivity.
    pub fn fresnel_schlick(h: Vec3, v: Vec3, f0: ColorRGB) -> ColorRGB {
        let cos_angle = h.dot(v).max(0.0);
        f0 + (ColorRGB::WHITE - f0) * (1.0 - cos_angle).powi(5)
    }

    /// Trowbridge-Reitz GGX normal distribution with α = roughness².
    pub fn normal_distribution_ggx(n: Vec3, h: Vec3, roughness: f32) -> f32 {
        let alpha = roughness * roughness;
        let alpha_sq = alpha * alpha;
        let n_dot_h = n.dot(h);
        let denom = n_dot_h * n_dot_h * (alpha_sq - 1.0) + 1.0;
        alpha_sq / (PI * denom * denom)
    }

    /// Schlick-GGX masking term for direct lighting, k = (roughness+1)²/8.
    pub fn geometry_schlick_ggx(n: Vec3, v: Vec3, roughness: f32) -> f32 {
        let cos_angle = n.dot(v).max(0.0);
        let k = (roughness + 1.0) * (roughness + 1.0) / 8.0;
        cos_angle / (cos_angle * (1.0 - k) + k)
    }

    /// Smith's method: masking for the view and light directions combined.
    pub fn geometry_smith(n: Vec3, v: Vec3, l: Vec3, roughness: f32) -> f32 {
        geometry_schlick_ggx(n, v, roughness) * geometry_schlick_ggx(n, l, roughness)
    }
}

/// Base reflectivity of dielectric surfaces at normal incidence.
const DIELECTRIC_F0: ColorRGB = ColorRGB::gray(0.04);

/// The material catalog entries the scene indexes into. A plain data enum
/// rather than trait objects: materials are shared read-only across render
/// workers by index.
#[derive(Debug, Clone, Copy)]
pub enum Material {
    /// Flat debug color, no lighting response.
    SolidColor { color: ColorRGB },
    Lambert {
        diffuse_reflectance: f32,
        diffuse_color: ColorRGB,
    },
    LambertPhong {
        diffuse_reflectance: f32,
        specular_reflectance: f32,
        phong_exponent: f32,
        diffuse_color: ColorRGB,
    },
    CookTorrance {
        albedo: ColorRGB,
        /// 0 = dielectric, 1 = metal. Metals reflect with their albedo and
        /// have no diffuse term.
        metalness: f32,
        roughness: f32,
    },
}

impl Material {
    /// Evaluates the BRDF for a surface hit lit from `l` and viewed from
    /// `v` (both unit, pointing away from the surface).
    pub fn shade(&self, hit: &HitRecord, l: Vec3, v: Vec3) -> ColorRGB {
        match *self {
            Material::SolidColor { color } => color,
            Material::Lambert {
                diffuse_reflectance,
                diffuse_color,
            } => brdf::lambert(diffuse_reflectance, diffuse_color),
            Material::LambertPhong {
                diffuse_reflectance,
                specular_reflectance,
                phong_exponent,
                diffuse_color,
            } => {
                brdf::lambert(diffuse_reflectance, diffuse_color)
                    + brdf::phong(specular_reflectance, phong_exponent, l, v, hit.normal)
            }
            Material::CookTorrance {
                albedo,
                metalness,
                roughness,
            } => {
                let n = hit.normal;
                let f0 = if metalness == 0.0 { DIELECTRIC_F0 } else { albedo };

                let half = (v + l).normalized_or_zero();
                let fresnel = brdf::fresnel_schlick(half, v, f0);
                let distribution = brdf::normal_distribution_ggx(n, half, roughness);
                let geometry = brdf::geometry_smith(n, v, l, roughness);

                let denom = 4.0 * n.dot(v).max(0.0) * n.dot(l).max(0.0);
                let specular = if denom > 0.0 {
                    fresnel * (distribution * geometry / denom)
                } else {
                    ColorRGB::BLACK
                };

                // Energy left for diffuse; metals have none.
                let kd = if metalness == 0.0 {
                    ColorRGB::WHITE - fresnel
                } else {
                    ColorRGB::BLACK
                };
                brdf::lambert_color(kd, albedo) + specular
            }
        }
    }
}
