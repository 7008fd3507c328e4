//! The viewer's scene: a floor, lights, and whatever models have finished loading.
//!
//! [`SceneWorld`] owns the ECS world and the ordered list of pickable entities. Models only
//! join that list once their geometry is in memory; the list is never reordered or pruned.

use std::sync::Arc;

use glam::Vec3;
use hecs::{Entity, World};

use crate::config::{LightsConfig, SceneConfig};
use crate::draw2d::Color;
use crate::ecs::{GpuTexture, Material, ModelGeometry, SurfaceTexture};
use crate::geometry::RawGeometry;
use crate::mesh::Transform;
use crate::picking::Collider;

/// Scene lighting: one directional light plus a sky/ground hemisphere light.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lights {
    pub directional_color: Color,
    /// Unit vector pointing from the scene toward the light.
    pub directional_dir: Vec3,
    pub sky_color: Color,
    pub ground_color: Color,
}

impl From<&LightsConfig> for Lights {
    fn from(config: &LightsConfig) -> Self {
        Self {
            directional_color: config.directional_color,
            directional_dir: Vec3::from(config.directional_from).normalize_or(Vec3::Y),
            sky_color: config.sky_color,
            ground_color: config.ground_color,
        }
    }
}

impl Default for Lights {
    fn default() -> Self {
        Self::from(&LightsConfig::default())
    }
}

pub struct SceneWorld {
    pub world: World,
    pickables: Vec<Entity>,
    floor: Entity,
    pub lights: Lights,
    pub background: Color,
}

impl SceneWorld {
    /// Build the static scene: the floor plane and the lights.
    ///
    /// The floor is untextured until [`SceneWorld::set_floor_texture`] is called, and is
    /// never pickable.
    pub fn new(scene: &SceneConfig, lights: &LightsConfig) -> Self {
        let mut world = World::new();
        let floor = world.spawn((
            Transform::new(),
            Material::new(Color::WHITE).metalness(scene.floor_metalness),
            ModelGeometry(Arc::new(RawGeometry::plane(scene.floor_size))),
        ));

        Self {
            world,
            pickables: Vec::new(),
            floor,
            lights: Lights::from(lights),
            background: scene.background,
        }
    }

    /// Spawn a loaded model and append it to the pickable set.
    pub fn add_model(&mut self, geometry: Arc<RawGeometry>, transform: Transform) -> Entity {
        let entity = self.world.spawn((
            transform,
            Material::default(),
            Collider::mesh(geometry.clone()),
            ModelGeometry(geometry),
        ));
        self.append_pickable(entity);
        entity
    }

    /// Append an existing entity to the pickable set. Duplicates are ignored.
    pub fn append_pickable(&mut self, entity: Entity) {
        if !self.pickables.contains(&entity) {
            self.pickables.push(entity);
        }
    }

    pub fn pickables(&self) -> &[Entity] {
        &self.pickables
    }

    pub fn floor(&self) -> Entity {
        self.floor
    }

    /// Attach (or replace) the floor's texture.
    pub fn set_floor_texture(&mut self, image: Arc<image::RgbaImage>, repeat: f32) {
        let texture = SurfaceTexture { image, repeat };
        if let Err(e) = self.world.insert_one(self.floor, texture) {
            log::warn!("floor entity missing: {e}");
            return;
        }
        // Forces the renderer to upload the replacement.
        let _ = self.world.remove_one::<GpuTexture>(self.floor);
    }

    pub fn floor_metalness(&self) -> f32 {
        self.world
            .get::<&Material>(self.floor)
            .map(|m| m.metalness)
            .unwrap_or_default()
    }

    /// Write the floor's metalness, clamped to [0, 1]. Returns the stored value.
    pub fn set_floor_metalness(&mut self, value: f32) -> f32 {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        match self.world.get::<&mut Material>(self.floor) {
            Ok(mut material) => {
                material.metalness = value;
                value
            }
            Err(e) => {
                log::warn!("floor material missing: {e}");
                0.0
            }
        }
    }
}
