//! The per-frame update loop.
//!
//! [`FrameDriver`] owns all viewer state that changes from frame to frame: the controller,
//! the movement integrator, the highlighter, the scene, and the asset loader. One call to
//! [`FrameDriver::tick`] runs one iteration:
//!
//! 1. fold finished asset loads into the scene
//! 2. compute the frame delta from the previous timestamp
//! 3. apply mouse look and movement (only while engaged)
//! 4. cast a ray through the pointer and update the highlight
//!
//! Nothing here touches the GPU, so the whole loop can be driven from tests with synthetic
//! timestamps.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use glam::Vec3;
use hecs::Entity;

use crate::camera::Camera;
use crate::config::Config;
use crate::controls::PointerLockControls;
use crate::geometry::RawGeometry;
use crate::highlight::Highlighter;
use crate::input::InputState;
use crate::loader::{AssetLoader, LoadEvent};
use crate::locomotion::Locomotion;
use crate::mesh::Transform;
use crate::picking::{Ray, RayHit, raycast};
use crate::scene::SceneWorld;
use crate::texture::marble_image;

const MARBLE_SIZE: u32 = 256;

/// What happened during one [`FrameDriver::tick`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameReport {
    /// Seconds since the previous tick, after clamping.
    pub delta: f32,
    /// Nearest pickable under the pointer.
    pub hit: Option<RayHit>,
    /// Highlighted entity after the tick.
    pub highlighted: Option<Entity>,
    /// Entities that became pickable during the tick.
    pub appended: usize,
}

pub struct FrameDriver {
    pub controls: PointerLockControls,
    pub locomotion: Locomotion,
    pub highlighter: Highlighter,
    pub scene: SceneWorld,
    /// Input for the next tick. Look motion is consumed by each tick.
    pub input: InputState,
    loader: AssetLoader,
    model_transform: Transform,
    floor_texture: PathBuf,
    floor_repeat: f32,
    max_frame_delta: f32,
    aspect: f32,
    prev_time: Instant,
}

impl FrameDriver {
    /// Build the driver and the static scene. `start` is the timestamp the first frame's
    /// delta is measured from.
    pub fn new(config: &Config, start: Instant) -> Self {
        let controls = PointerLockControls::new()
            .position(Vec3::from(config.camera.position))
            .fov(config.camera.fov_degrees)
            .clip_planes(config.camera.near, config.camera.far)
            .sensitivity(config.camera.look_sensitivity);

        let locomotion = Locomotion::new()
            .speed(config.movement.speed)
            .damping(config.movement.damping);

        Self {
            controls,
            locomotion,
            highlighter: Highlighter::new(config.highlight.color),
            scene: SceneWorld::new(&config.scene, &config.lights),
            input: InputState::default(),
            loader: AssetLoader::new(),
            model_transform: Transform::from_position(Vec3::from(config.scene.model_position)),
            floor_texture: config.scene.floor_texture.clone(),
            floor_repeat: config.scene.floor_texture_repeat,
            max_frame_delta: config.movement.max_frame_delta,
            aspect: config.window.width as f32 / config.window.height.max(1) as f32,
            prev_time: start,
        }
    }

    /// Start the background loads for the configured model and floor texture.
    pub fn load_assets(&self, config: &Config) {
        self.loader.load_model(&config.scene.model_path);
        self.loader.load_texture(&config.scene.floor_texture);
    }

    /// Update the viewport aspect ratio. Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Camera for the current controller pose and viewport.
    pub fn camera(&self) -> Camera {
        self.controls.camera(self.aspect)
    }

    /// Add a loaded model to the scene and make it pickable.
    pub fn add_model(&mut self, geometry: Arc<RawGeometry>) -> Entity {
        self.scene.add_model(geometry, self.model_transform)
    }

    /// Run one frame.
    pub fn tick(&mut self, now: Instant) -> FrameReport {
        let appended = self.drain_loads();

        // Advanced even while disengaged so re-engaging never sees a stale timestamp.
        let delta = now
            .saturating_duration_since(self.prev_time)
            .as_secs_f32()
            .min(self.max_frame_delta);
        self.prev_time = now;

        self.controls.apply_look(self.input.look);
        self.input.look = glam::Vec2::ZERO;

        self.locomotion
            .step(self.input.keys, &mut self.controls, delta);

        let camera = self.camera();
        let ray = Ray::from_ndc(
            self.input.pointer,
            camera.view_matrix(),
            camera.projection_matrix(),
        );
        let hit = raycast(&self.scene.world, self.scene.pickables(), &ray);
        self.highlighter
            .update(&mut self.scene.world, hit.map(|h| h.entity));

        FrameReport {
            delta,
            hit,
            highlighted: self.highlighter.current(),
            appended,
        }
    }

    fn drain_loads(&mut self) -> usize {
        let mut appended = 0;
        for event in self.loader.poll() {
            let percent = event.percent();
            match event {
                LoadEvent::Progress { path, .. } => {
                    if let Some(percent) = percent {
                        log::debug!("{}: {percent:.0}% loaded", path.display());
                    }
                }
                LoadEvent::Model { path, geometry } => {
                    log::info!(
                        "loaded {}: {} vertices, {} triangles, extent {:?}",
                        path.display(),
                        geometry.vertices.len(),
                        geometry.triangle_count(),
                        geometry.size()
                    );
                    self.add_model(geometry);
                    appended += 1;
                }
                LoadEvent::Texture { path, image } => {
                    log::info!("loaded {} ({}x{})", path.display(), image.width(), image.height());
                    self.scene.set_floor_texture(image, self.floor_repeat);
                }
                LoadEvent::Failed(e) if e.path() == self.floor_texture => {
                    log::warn!("floor texture failed ({e}), using procedural marble");
                    let image = marble_image(MARBLE_SIZE, 0x6d61_7262);
                    self.scene.set_floor_texture(Arc::new(image), self.floor_repeat);
                }
                LoadEvent::Failed(e) => log::warn!("asset load failed: {e}"),
            }
        }
        appended
    }
}
