use std::collections::HashSet;

use glam::Vec2;
use winit::event::{DeviceEvent, ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// The four directional movement flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MoveKeys {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

impl MoveKeys {
    /// Only forward held.
    pub const FORWARD: Self = Self {
        forward: true,
        backward: false,
        left: false,
        right: false,
    };

    /// Derive the movement flags from held keys. WASD and the arrow keys are equivalent.
    pub fn from_input(input: &Input) -> Self {
        Self {
            forward: input.key_down(KeyCode::KeyW) || input.key_down(KeyCode::ArrowUp),
            backward: input.key_down(KeyCode::KeyS) || input.key_down(KeyCode::ArrowDown),
            left: input.key_down(KeyCode::KeyA) || input.key_down(KeyCode::ArrowLeft),
            right: input.key_down(KeyCode::KeyD) || input.key_down(KeyCode::ArrowRight),
        }
    }
}

/// Per-frame input consumed by the frame driver.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputState {
    pub keys: MoveKeys,
    /// Pointer in normalized device coordinates: origin at the viewport center, +Y up.
    pub pointer: Vec2,
    /// Raw mouse motion accumulated since the last frame, in pixels.
    pub look: Vec2,
}

/// Converts a cursor position in window pixels to normalized device coordinates.
///
/// Returns `None` for a zero-sized viewport.
pub fn pointer_ndc(cursor: Vec2, width: u32, height: u32) -> Option<Vec2> {
    if width == 0 || height == 0 {
        return None;
    }
    Some(Vec2::new(
        (cursor.x / width as f32) * 2.0 - 1.0,
        -(cursor.y / height as f32) * 2.0 + 1.0,
    ))
}

/// Tracks input state for keyboard and mouse.
pub struct Input {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    mouse_buttons_down: HashSet<MouseButton>,
    mouse_buttons_pressed: HashSet<MouseButton>,
    mouse_position: Vec2,
    pointer: Vec2,
    /// While set, cursor motion no longer moves the pointer NDC.
    pointer_frozen: bool,
    look_delta: Vec2,
    viewport: (u32, u32),
}

impl Default for Input {
    fn default() -> Self {
        Self {
            keys_down: HashSet::new(),
            keys_pressed: HashSet::new(),
            mouse_buttons_down: HashSet::new(),
            mouse_buttons_pressed: HashSet::new(),
            mouse_position: Vec2::ZERO,
            pointer: Vec2::ZERO,
            pointer_frozen: false,
            look_delta: Vec2::ZERO,
            viewport: (0, 0),
        }
    }
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call at the start of each frame to reset per-frame state.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.mouse_buttons_pressed.clear();
        self.look_delta = Vec2::ZERO;
    }

    /// Process a window event and update input state.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.press_key(key),
                        ElementState::Released => self.release_key(key),
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => self.press_button(*button),
                ElementState::Released => self.release_button(*button),
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.move_cursor(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::Resized(size) => self.set_viewport(size.width, size.height),
            // Keys and buttons released while unfocused never report a release.
            WindowEvent::Focused(false) => {
                self.keys_down.clear();
                self.mouse_buttons_down.clear();
            }
            _ => {}
        }
    }

    /// Process a raw device event. Mouse motion is recorded as look delta.
    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.look_delta += Vec2::new(delta.0 as f32, delta.1 as f32);
        }
    }

    pub fn press_key(&mut self, key: KeyCode) {
        if !self.keys_down.contains(&key) {
            self.keys_pressed.insert(key);
        }
        self.keys_down.insert(key);
    }

    pub fn release_key(&mut self, key: KeyCode) {
        self.keys_down.remove(&key);
    }

    pub fn press_button(&mut self, button: MouseButton) {
        if !self.mouse_buttons_down.contains(&button) {
            self.mouse_buttons_pressed.insert(button);
        }
        self.mouse_buttons_down.insert(button);
    }

    pub fn release_button(&mut self, button: MouseButton) {
        self.mouse_buttons_down.remove(&button);
    }

    /// Record a cursor position in window pixels and update the pointer NDC.
    ///
    /// The NDC pointer is left alone while frozen.
    pub fn move_cursor(&mut self, position: Vec2) {
        self.mouse_position = position;
        if self.pointer_frozen {
            return;
        }
        if let Some(ndc) = pointer_ndc(position, self.viewport.0, self.viewport.1) {
            self.pointer = ndc;
        }
    }

    /// Hold the NDC pointer in place, for as long as the cursor is captured.
    ///
    /// A confined cursor still reports motion; the pick ray must not follow it.
    pub fn set_pointer_frozen(&mut self, frozen: bool) {
        self.pointer_frozen = frozen;
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    /// Returns true if the key is currently held down.
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Returns true if the key was pressed this frame.
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Returns true if the mouse button is currently held down.
    pub fn mouse_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons_down.contains(&button)
    }

    /// Returns true if the mouse button was pressed this frame.
    pub fn mouse_pressed(&self, button: MouseButton) -> bool {
        self.mouse_buttons_pressed.contains(&button)
    }

    /// Current mouse position in window coordinates.
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    /// Last known pointer position in normalized device coordinates.
    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    /// Snapshot of everything the frame driver reads.
    pub fn state(&self) -> InputState {
        InputState {
            keys: MoveKeys::from_input(self),
            pointer: self.pointer,
            look: self.look_delta,
        }
    }
}
