//! Damped first-person movement.
//!
//! Each frame the velocity decays exponentially, picks up an impulse from the held
//! movement keys, and is applied to the controller in its own yaw frame. The velocity is
//! expressed in controller-local axes: `-z` is forward and `+x` is right, so holding
//! forward drives `velocity.z` negative and the controller moves by `-velocity.z * delta`.

use glam::Vec3;

use crate::controls::PointerLockControls;
use crate::input::MoveKeys;

/// Integrates movement velocity for a [`PointerLockControls`].
#[derive(Clone, Debug)]
pub struct Locomotion {
    /// Controller-local velocity. `y` is always zero.
    pub velocity: Vec3,
    /// Impulse strength per second of held input.
    pub speed: f32,
    /// Exponential damping constant.
    pub damping: f32,
}

impl Default for Locomotion {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            speed: 25.0,
            damping: 10.0,
        }
    }
}

impl Locomotion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    /// Desired direction from held keys: `x` is right minus left, `z` is forward minus
    /// backward. Unit length when non-zero, exactly zero otherwise.
    pub fn direction(keys: MoveKeys) -> Vec3 {
        let axis = |positive: bool, negative: bool| positive as i8 as f32 - negative as i8 as f32;
        Vec3::new(
            axis(keys.right, keys.left),
            0.0,
            axis(keys.forward, keys.backward),
        )
        .normalize_or_zero()
    }

    /// Advance one frame of `delta` seconds.
    ///
    /// Does nothing while the controller is disengaged: the velocity stays frozen and the
    /// controller does not move.
    pub fn step(&mut self, keys: MoveKeys, controls: &mut PointerLockControls, delta: f32) {
        if !controls.is_locked() {
            return;
        }

        let decay = (self.damping * delta).min(1.0);
        self.velocity.x -= self.velocity.x * decay;
        self.velocity.z -= self.velocity.z * decay;
        self.velocity.y = 0.0;

        let direction = Self::direction(keys);
        if keys.forward || keys.backward {
            self.velocity.z -= direction.z * self.speed * delta;
        }
        if keys.left || keys.right {
            self.velocity.x -= direction.x * self.speed * delta;
        }

        if !self.velocity.is_finite() {
            log::warn!("non-finite velocity {:?}, resetting", self.velocity);
            self.velocity = Vec3::ZERO;
            return;
        }

        controls.move_right(-self.velocity.x * delta);
        controls.move_forward(-self.velocity.z * delta);
    }
}
