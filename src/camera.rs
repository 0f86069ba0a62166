use crate::math::{Matrix, Vec3};

/// A pinhole camera driven by absolute pitch/yaw angles.
///
/// The basis is left-handed with forward pointing into the scene:
/// `right = up_world × forward`, `up = forward × right`. The forward axis
/// itself is canonical +Z pushed through the accumulated pitch-then-yaw
/// rotation, so interactive input only ever mutates `origin`, `total_pitch`
/// and `total_yaw`.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub origin: Vec3,
    /// Vertical field of view in degrees.
    pub fov_angle: f32,

    pub forward: Vec3,
    pub up: Vec3,
    pub right: Vec3,

    pub total_pitch: f32,
    pub total_yaw: f32,

    pub move_speed: f32,
    pub rotate_speed: f32,
}

/// One frame's worth of host input, already collapsed to axis values in
/// [-1, 1] (walk/strafe) and raw rotation deltas. The host maps key and
/// mouse state into this; the camera stays ignorant of the windowing layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct CameraInput {
    /// Forward/backward along the view axis.
    pub walk: f32,
    /// Right/left along the right axis.
    pub strafe: f32,
    pub yaw: f32,
    pub pitch: f32,
}

impl Camera {
    pub fn new(origin: Vec3, fov_angle: f32) -> Self {
        Self {
            origin,
            fov_angle,
            forward: Vec3::UNIT_Z,
            up: Vec3::UNIT_Y,
            right: Vec3::UNIT_X,
            total_pitch: 0.0,
            total_yaw: 0.0,
            move_speed: 3.0,
            rotate_speed: 1.2,
        }
    }

    /// Half-angle tangent used by the NDC mapping.
    #[inline]
    pub fn fov_scale(&self) -> f32 {
        (self.fov_angle.to_radians() * 0.5).tan()
    }

    /// Rebuilds the orthonormal basis from the current forward axis and
    /// returns the camera-to-world transform with the basis as its columns
    /// and the origin as translation.
    pub fn camera_to_world(&mut self) -> Matrix {
        self.right = Vec3::UNIT_Y.cross(self.forward).normalized();
        self.up = self.forward.cross(self.right).normalized();
        Matrix::from_axes(self.right, self.up, self.forward, self.origin)
    }

    /// Integrates one frame of host input. Translation uses the current
    /// basis; rotation accumulates into pitch/yaw and re-derives forward
    /// from canonical +Z.
    pub fn update(&mut self, input: &CameraInput, delta_time: f32) {
        let step = self.move_speed * delta_time;
        self.origin += self.forward * (input.walk * step);
        self.origin += self.right * (input.strafe * step);

        let turn = self.rotate_speed * delta_time;
        self.total_yaw += input.yaw * turn;
        self.total_pitch += input.pitch * turn;

        self.forward = Matrix::rotation(self.total_pitch, self.total_yaw)
            .transform_vector(Vec3::UNIT_Z)
            .normalized();
    }
}
