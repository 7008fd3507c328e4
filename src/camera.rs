use glam::{Mat4, Vec3};

/// A perspective camera for 3D scenes.
///
/// Holds a position, orientation, and projection parameters. Produced each frame by
/// [`PointerLockControls::camera`](crate::PointerLockControls::camera).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Viewport width divided by height.
    pub aspect: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            forward: Vec3::NEG_Z,
            up: Vec3::Y,
            fov: 60f32.to_radians(),
            near: 0.1,
            far: 1000.0,
            aspect: 1.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn looking_at(mut self, target: Vec3) -> Self {
        self.forward = (target - self.position).normalize_or_zero();
        self
    }

    pub fn with_fov(mut self, fov_degrees: f32) -> Self {
        self.fov = fov_degrees.to_radians();
        self
    }

    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }

    /// Compute the right vector from forward and up.
    pub fn right(&self) -> Vec3 {
        self.forward.cross(self.up).normalize_or_zero()
    }

    /// World-to-view matrix (right-handed).
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward, self.up)
    }

    /// View-to-clip matrix with a [0, 1] depth range.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect.max(f32::EPSILON), self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn right_is_perpendicular_to_forward() {
        let camera = Camera::new();
        assert_eq!(camera.right(), Vec3::X);
        assert!(camera.right().dot(camera.forward).abs() < 1e-6);
    }

    #[test]
    fn point_ahead_projects_to_screen_center() {
        let camera = Camera::new().at(Vec3::ZERO).with_aspect(16.0 / 9.0);
        let clip = camera.view_projection() * glam::Vec4::new(0.0, 0.0, -10.0, 1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn looking_at_normalizes_direction() {
        let camera = Camera::new().at(Vec3::ZERO).looking_at(Vec3::new(3.0, 0.0, 4.0));
        assert!((camera.forward.length() - 1.0).abs() < 1e-6);
    }
}
