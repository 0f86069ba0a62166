use std::fmt;
use std::ops::{Add, AddAssign, Div, Index, Mul, MulAssign, Neg, Sub};

/// A 3-component single-precision vector used for positions, directions, and
/// surface normals throughout the tracer.
///
/// Implements the standard arithmetic operators plus the geometric utilities
/// (dot, cross, component-wise min/max, axis indexing) that the intersection
/// kernels and the BVH builder are written against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const UNIT_X: Self = Self::new(1.0, 0.0, 0.0);
    pub const UNIT_Y: Self = Self::new(0.0, 1.0, 0.0);
    pub const UNIT_Z: Self = Self::new(0.0, 0.0, 1.0);

    #[inline(always)]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline(always)]
    pub const fn splat(v: f32) -> Self {
        Self::new(v, v, v)
    }

    /// Squared Euclidean length — the shadow-ray range contract compares
    /// squared distances, so this is on the hot path.
    #[inline(always)]
    pub fn magnitude_squared(self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    #[inline(always)]
    pub fn magnitude(self) -> f32 {
        self.magnitude_squared().sqrt()
    }

    /// Returns the unit vector. Panics on zero-length vectors in debug mode.
    #[inline(always)]
    pub fn normalized(self) -> Self {
        let len = self.magnitude();
        debug_assert!(len > 1e-12, "Attempted to normalize a zero-length vector");
        self / len
    }

    /// Like [`normalized`](Self::normalized), but degenerate input maps to
    /// zero instead of NaN. Used where geometry may be degenerate (zero-area
    /// faces); a zero normal downgrades the face to a guaranteed miss.
    #[inline]
    pub fn normalized_or_zero(self) -> Self {
        let len_sq = self.magnitude_squared();
        if len_sq > 1e-24 {
            self / len_sq.sqrt()
        } else {
            Self::ZERO
        }
    }

    #[inline(always)]
    pub fn dot(self, rhs: Self) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    #[inline(always)]
    pub fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    /// Specular reflection of `self` about the surface normal `n`:
    /// I - 2·dot(I, N)·N.
    #[inline(always)]
    pub fn reflect(self, normal: Self) -> Self {
        self - normal * 2.0 * self.dot(normal)
    }

    /// Component-wise minimum — AABB growth during BVH construction.
    #[inline(always)]
    pub fn min(self, rhs: Self) -> Self {
        Self::new(self.x.min(rhs.x), self.y.min(rhs.y), self.z.min(rhs.z))
    }

    /// Component-wise maximum.
    #[inline(always)]
    pub fn max(self, rhs: Self) -> Self {
        Self::new(self.x.max(rhs.x), self.y.max(rhs.y), self.z.max(rhs.z))
    }

    /// Per-component reciprocal, precomputed on rays so the slab test can
    /// multiply instead of divide.
    #[inline(always)]
    pub fn recip(self) -> Self {
        Self::new(1.0 / self.x, 1.0 / self.y, 1.0 / self.z)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Add for Vec3 {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    #[inline(always)]
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub for Vec3 {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;
    #[inline(always)]
    fn mul(self, t: f32) -> Self {
        Self::new(self.x * t, self.y * t, self.z * t)
    }
}

impl Mul<Vec3> for f32 {
    type Output = Vec3;
    #[inline(always)]
    fn mul(self, v: Vec3) -> Vec3 {
        v * self
    }
}

impl MulAssign<f32> for Vec3 {
    #[inline(always)]
    fn mul_assign(&mut self, t: f32) {
        self.x *= t;
        self.y *= t;
        self.z *= t;
    }
}

impl Div<f32> for Vec3 {
    type Output = Self;
    #[inline(always)]
    fn div(self, t: f32) -> Self {
        let inv = 1.0 / t;
        Self::new(self.x * inv, self.y * inv, self.z * inv)
    }
}

impl Index<usize> for Vec3 {
    type Output = f32;
    fn index(&self, axis: usize) -> &f32 {
        match axis {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Vec3 axis out of bounds: {axis}"),
        }
    }
}

// ─── Affine Matrix ──────────────────────────────────────────────────────────

/// A 4×4 affine transform stored as three basis rows plus a translation row
/// (the homogeneous column is implicit). Row-vector convention: `a * b`
/// applies `a` first, then `b`, so mesh transforms compose as
/// scale · rotation · translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub x: Vec3,
    pub y: Vec3,
    pub z: Vec3,
    pub t: Vec3,
}

impl Matrix {
    pub const IDENTITY: Self = Self {
        x: Vec3::UNIT_X,
        y: Vec3::UNIT_Y,
        z: Vec3::UNIT_Z,
        t: Vec3::ZERO,
    };

    /// Builds a transform from explicit basis axes and an origin — the
    /// camera-to-world matrix is assembled this way each frame.
    #[inline]
    pub const fn from_axes(x: Vec3, y: Vec3, z: Vec3, t: Vec3) -> Self {
        Self { x, y, z, t }
    }

    #[inline]
    pub const fn translation(t: Vec3) -> Self {
        Self {
            x: Vec3::UNIT_X,
            y: Vec3::UNIT_Y,
            z: Vec3::UNIT_Z,
            t,
        }
    }

    #[inline]
    pub const fn scaling(s: Vec3) -> Self {
        Self {
            x: Vec3::new(s.x, 0.0, 0.0),
            y: Vec3::new(0.0, s.y, 0.0),
            z: Vec3::new(0.0, 0.0, s.z),
            t: Vec3::ZERO,
        }
    }

    pub fn rotation_x(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            x: Vec3::UNIT_X,
            y: Vec3::new(0.0, cos, sin),
            z: Vec3::new(0.0, -sin, cos),
            t: Vec3::ZERO,
        }
    }

    pub fn rotation_y(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            x: Vec3::new(cos, 0.0, -sin),
            y: Vec3::UNIT_Y,
            z: Vec3::new(sin, 0.0, cos),
            t: Vec3::ZERO,
        }
    }

    pub fn rotation_z(angle: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            x: Vec3::new(cos, sin, 0.0),
            y: Vec3::new(-sin, cos, 0.0),
            z: Vec3::UNIT_Z,
            t: Vec3::ZERO,
        }
    }

    /// Pitch-then-yaw rotation; the camera rebuilds its forward axis by
    /// pushing canonical +Z through this.
    pub fn rotation(pitch: f32, yaw: f32) -> Self {
        Self::rotation_x(pitch) * Self::rotation_y(yaw)
    }

    /// Applies the full affine transform, translation included.
    #[inline(always)]
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.x * p.x + self.y * p.y + self.z * p.z + self.t
    }

    /// Applies the linear part only — directions and normals.
    #[inline(always)]
    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        self.x * v.x + self.y * v.y + self.z * v.z
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Matrix {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self {
            x: rhs.transform_vector(self.x),
            y: rhs.transform_vector(self.y),
            z: rhs.transform_vector(self.z),
            t: rhs.transform_point(self.t),
        }
    }
}

// ─── Color ──────────────────────────────────────────────────────────────────

/// Linear RGB radiance. Kept distinct from [`Vec3`] so color math and
/// geometry cannot be mixed by accident.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ColorRGB {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl ColorRGB {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);

    #[inline(always)]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    #[inline(always)]
    pub const fn gray(v: f32) -> Self {
        Self::new(v, v, v)
    }

    /// Rescales the color so no channel exceeds 1 by dividing through by the
    /// largest channel. Channel ratios are preserved; colors already inside
    /// the unit cube are untouched.
    pub fn max_to_one(self) -> Self {
        let max = self.r.max(self.g).max(self.b);
        if max > 1.0 {
            self / max
        } else {
            self
        }
    }

    /// Quantizes to an 8-bit RGB triple for the framebuffer store.
    #[inline]
    pub fn to_rgb8(self) -> (u8, u8, u8) {
        (
            (self.r * 255.0) as u8,
            (self.g * 255.0) as u8,
            (self.b * 255.0) as u8,
        )
    }
}

impl Add for ColorRGB {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b)
    }
}

impl AddAssign for ColorRGB {
    #[inline(always)]
    fn add_assign(&mut self, rhs: Self) {
        self.r += rhs.r;
        self.g += rhs.g;
        self.b += rhs.b;
    }
}

impl Sub for ColorRGB {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.r - rhs.r, self.g - rhs.g, self.b - rhs.b)
    }
}

impl Mul for ColorRGB {
    type Output = Self;
    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        Self::new(self.r * rhs.r, self.g * rhs.g, self.b * rhs.b)
    }
}

impl Mul<f32> for ColorRGB {
    type Output = Self;
    #[inline(always)]
    fn mul(self, t: f32) -> Self {
        Self::new(self.r * t, self.g * t, self.b * t)
    }
}

impl Mul<ColorRGB> for f32 {
    type Output = ColorRGB;
    #[inline(always)]
    fn mul(self, c: ColorRGB) -> ColorRGB {
        c * self
    }
}

impl Div<f32> for ColorRGB {
    type Output = Self;
    #[inline(always)]
    fn div(self, t: f32) -> Self {
        let inv = 1.0 / t;
        Self::new(self.r * inv, self.g * inv, self.b * inv)
    }
}

// ─── Ray ────────────────────────────────────────────────────────────────────

/// Default near clip for all rays; keeps secondary rays from re-hitting the
/// surface they left.
pub const RAY_T_MIN: f32 = 1e-4;

/// A parametric ray R(t) = origin + t · direction with a precomputed
/// per-component reciprocal so the AABB slab test never divides.
///
/// `t_max` is compared against `t²` in every kernel; shadow rays therefore
/// store the *squared* distance to the light in it. See the renderer's
/// shadow-ray construction, which is the other half of that contract.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub reciprocal: Vec3,
    pub t_min: f32,
    pub t_max: f32,
}

impl Ray {
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            reciprocal: direction.recip(),
            t_min: RAY_T_MIN,
            t_max: f32::MAX,
        }
    }

    /// A range-limited ray; shadow rays pass the squared distance to the
    /// light here.
    #[inline]
    pub fn with_max(origin: Vec3, direction: Vec3, t_max: f32) -> Self {
        Self {
            t_max,
            ..Self::new(origin, direction)
        }
    }

    /// Evaluates the ray at parameter t.
    #[inline(always)]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

// ─── Axis-Aligned Bounding Box ──────────────────────────────────────────────

/// An axis-aligned bounding box, the bounding volume of every BVH node.
///
/// The empty box is inverted (min = +∞, max = −∞) so that growing it by any
/// point produces the degenerate box at that point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Expands the box to include `p`.
    #[inline(always)]
    pub fn grow(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// The union of two boxes — interior BVH nodes bound their children this
    /// way during refit.
    #[inline]
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Half the surface area: the sum of the three pairwise extent products.
    /// The SAH only compares ratios, so the factor of two is irrelevant.
    #[inline]
    pub fn area(&self) -> f32 {
        let e = self.max - self.min;
        e.x * e.y + e.y * e.z + e.z * e.x
    }

    /// Boolean slab test using the ray's reciprocal direction.
    #[inline]
    pub fn hit(&self, ray: &Ray) -> bool {
        self.hit_distance(ray) < f32::INFINITY
    }

    /// Slab test returning the entry distance `tmin`, or +∞ on a miss.
    /// Traversal sorts children front-to-back by this value.
    #[inline]
    pub fn hit_distance(&self, ray: &Ray) -> f32 {
        let tx1 = (self.min.x - ray.origin.x) * ray.reciprocal.x;
        let tx2 = (self.max.x - ray.origin.x) * ray.reciprocal.x;
        let mut tmin = tx1.min(tx2);
        let mut tmax = tx1.max(tx2);
        let ty1 = (self.min.y - ray.origin.y) * ray.reciprocal.y;
        let ty2 = (self.max.y - ray.origin.y) * ray.reciprocal.y;
        tmin = tmin.max(ty1.min(ty2));
        tmax = tmax.min(ty1.max(ty2));
        let tz1 = (self.min.z - ray.origin.z) * ray.reciprocal.z;
        let tz2 = (self.max.z - ray.origin.z) * ray.reciprocal.z;
        tmin = tmin.max(tz1.min(tz2));
        tmax = tmax.min(tz1.max(tz2));
        if tmax >= tmin && tmax > 0.0 {
            tmin
        } else {
            f32::INFINITY
        }
    }
}
