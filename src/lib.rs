//! # Marblewalk
//!
//! **A first-person viewer for a single model standing on a marble floor.**
//!
//! Click the window to capture the pointer, walk with WASD or the arrow keys, and look
//! around with the mouse. Whatever part of the model sits under the pointer glows red.
//! Press Escape to release the pointer; while released, a small panel in the top-right
//! corner adjusts how metallic the floor looks.
//!
//! ## Quick Start
//!
//! ```no_run
//! use marblewalk::Config;
//!
//! fn main() -> Result<(), marblewalk::RunError> {
//!     let config = Config::new()
//!         .title("Gallery")
//!         .model("assets/statue.obj")
//!         .floor_texture("assets/marble.jpg");
//!     marblewalk::run(config)
//! }
//! ```
//!
//! ## Layout
//!
//! - [`FrameDriver`] runs the per-frame update and never touches the GPU, so the whole
//!   loop is testable with synthetic timestamps.
//! - [`PointerLockControls`] and [`Locomotion`] turn input into a camera pose.
//! - [`raycast`] and [`Highlighter`] decide what glows.
//! - The renderer, GPU context, and window live behind [`run`].

mod app;
mod camera;
mod config;
mod controls;
mod draw2d;
mod ecs;
mod frame;
mod geometry;
mod gpu;
mod highlight;
mod hud;
mod input;
mod loader;
mod locomotion;
mod mesh;
mod mesh_pass;
mod picking;
mod renderer;
mod scene;
mod texture;

pub use app::{RunError, run};
pub use camera::Camera;
pub use config::{
    CameraConfig, Config, ConfigError, HighlightConfig, LightsConfig, MovementConfig,
    SceneConfig, WindowConfig,
};
pub use controls::PointerLockControls;
pub use draw2d::{Color, Draw2d, Rect};
pub use ecs::{Material, ModelGeometry, SurfaceTexture};
pub use frame::{FrameDriver, FrameReport};
pub use geometry::{GeometryError, GeometryFormat, RawGeometry};
pub use gpu::{GpuContext, GpuError};
pub use highlight::{HighlightState, Highlighter};
pub use hud::{Hud, HudInput, PanelLayout};
pub use input::{Input, InputState, MoveKeys, pointer_ndc};
pub use loader::{AssetLoader, LoadError, LoadEvent};
pub use locomotion::Locomotion;
pub use mesh::{Mesh, Transform, Vertex3d};
pub use picking::{Collider, Ray, RayHit, raycast};
pub use scene::{Lights, SceneWorld};
pub use texture::{Texture, marble_image};

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3};

pub use hecs::{Entity, World};
