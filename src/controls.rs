//! A pointer-lock first-person controller.
//!
//! [`PointerLockControls`] owns the viewer's position and look angles. Mouse look and
//! movement only apply while the controller is *engaged*, which mirrors whether the OS
//! cursor is currently grabbed by the window.
//!
//! Engagement is a two-step handshake: input handlers call [`PointerLockControls::lock`] or
//! [`PointerLockControls::unlock`] to record a request, the window layer tries to grab or
//! release the cursor, then reports the outcome with [`PointerLockControls::set_locked`].
//!
//! ```
//! use marblewalk::{PointerLockControls, Vec3};
//!
//! let mut controls = PointerLockControls::new().position(Vec3::new(0.0, 0.2, 2.0));
//! controls.lock();
//! assert_eq!(controls.take_lock_request(), Some(true));
//! controls.set_locked(true);
//!
//! controls.move_forward(0.5);
//! assert!((controls.position.z - 1.5).abs() < 1e-6);
//! ```

use glam::{Vec2, Vec3};

use crate::camera::Camera;

const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// First-person controller with yaw/pitch look and an engagement flag.
#[derive(Clone, Debug)]
pub struct PointerLockControls {
    pub position: Vec3,
    /// Horizontal angle in radians. 0 = looking toward -Z.
    pub yaw: f32,
    /// Vertical angle in radians. 0 = horizontal, positive = up.
    pub pitch: f32,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Radians of rotation per pixel of mouse motion.
    pub sensitivity: f32,
    locked: bool,
    pending: Option<bool>,
}

impl Default for PointerLockControls {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            fov: 60f32.to_radians(),
            near: 0.1,
            far: 1000.0,
            sensitivity: 0.002,
            locked: false,
            pending: None,
        }
    }
}

impl PointerLockControls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(mut self, position: impl Into<Vec3>) -> Self {
        self.position = position.into();
        self
    }

    /// Set the field of view in degrees.
    pub fn fov(mut self, fov_degrees: f32) -> Self {
        self.fov = fov_degrees.to_radians();
        self
    }

    pub fn clip_planes(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    pub fn sensitivity(mut self, sensitivity: f32) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    /// Ask for the pointer to be captured.
    pub fn lock(&mut self) {
        if !self.locked {
            self.pending = Some(true);
        }
    }

    /// Ask for the pointer to be released.
    pub fn unlock(&mut self) {
        if self.locked {
            self.pending = Some(false);
        }
    }

    /// Take the outstanding lock (`true`) or unlock (`false`) request, if any.
    pub fn take_lock_request(&mut self) -> Option<bool> {
        self.pending.take()
    }

    /// Record the engagement status after the window applied a request.
    pub fn set_locked(&mut self, locked: bool) {
        if self.locked != locked {
            log::info!("pointer {}", if locked { "locked" } else { "unlocked" });
        }
        self.locked = locked;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Rotate the view by a raw mouse delta in pixels. Ignored while disengaged.
    pub fn apply_look(&mut self, delta: Vec2) {
        if !self.locked {
            return;
        }
        self.yaw += delta.x * self.sensitivity;
        self.pitch = (self.pitch - delta.y * self.sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Move along the horizontal facing direction. Pitch does not affect movement.
    pub fn move_forward(&mut self, distance: f32) {
        self.position += self.flat_forward() * distance;
    }

    /// Strafe along the horizontal right vector.
    pub fn move_right(&mut self, distance: f32) {
        self.position += self.right_direction() * distance;
    }

    /// Full look direction from yaw and pitch.
    pub fn forward_direction(&self) -> Vec3 {
        Vec3::new(
            self.yaw.sin() * self.pitch.cos(),
            self.pitch.sin(),
            -self.yaw.cos() * self.pitch.cos(),
        )
        .normalize_or_zero()
    }

    fn flat_forward(&self) -> Vec3 {
        Vec3::new(self.yaw.sin(), 0.0, -self.yaw.cos())
    }

    fn right_direction(&self) -> Vec3 {
        Vec3::new(self.yaw.cos(), 0.0, self.yaw.sin())
    }

    /// Camera for the current pose and the given viewport aspect ratio.
    pub fn camera(&self, aspect: f32) -> Camera {
        Camera {
            position: self.position,
            forward: self.forward_direction(),
            up: Vec3::Y,
            fov: self.fov,
            near: self.near,
            far: self.far,
            aspect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engaged() -> PointerLockControls {
        let mut controls = PointerLockControls::new();
        controls.set_locked(true);
        controls
    }

    #[test]
    fn lock_request_only_when_disengaged() {
        let mut controls = PointerLockControls::new();
        controls.unlock();
        assert_eq!(controls.take_lock_request(), None);

        controls.lock();
        assert_eq!(controls.take_lock_request(), Some(true));
        assert_eq!(controls.take_lock_request(), None);

        controls.set_locked(true);
        controls.lock();
        assert_eq!(controls.take_lock_request(), None);
        controls.unlock();
        assert_eq!(controls.take_lock_request(), Some(false));
    }

    #[test]
    fn look_ignored_while_disengaged() {
        let mut controls = PointerLockControls::new();
        controls.apply_look(Vec2::new(100.0, 100.0));
        assert_eq!(controls.yaw, 0.0);
        assert_eq!(controls.pitch, 0.0);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut controls = engaged();
        controls.apply_look(Vec2::new(0.0, -1.0e6));
        assert!((controls.pitch - PITCH_LIMIT).abs() < 1e-6);
        controls.apply_look(Vec2::new(0.0, 1.0e6));
        assert!((controls.pitch + PITCH_LIMIT).abs() < 1e-6);
    }

    #[test]
    fn movement_ignores_pitch() {
        let mut controls = engaged();
        controls.apply_look(Vec2::new(0.0, -300.0));
        controls.move_forward(1.0);
        assert_eq!(controls.position.y, 0.0);
        assert!((controls.position.z + 1.0).abs() < 1e-6);
    }

    #[test]
    fn right_follows_yaw() {
        let mut controls = engaged();
        controls.yaw = std::f32::consts::FRAC_PI_2;
        // Facing +X, so right is +Z.
        controls.move_right(2.0);
        assert!((controls.position - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-5);
    }

    #[test]
    fn camera_looks_down_negative_z_by_default() {
        let camera = PointerLockControls::new().camera(1.5);
        assert!((camera.forward - Vec3::NEG_Z).length() < 1e-6);
        assert_eq!(camera.aspect, 1.5);
    }
}
