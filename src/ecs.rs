//! ECS components for scene entities.
//!
//! Scene objects live in a `hecs` world. A renderable entity carries a
//! [`Transform`](crate::Transform), a [`Material`], and CPU geometry in [`ModelGeometry`].
//! The renderer uploads that geometry on first sight and tags the entity with a
//! [`GpuMesh`]; textures follow the same pattern with [`SurfaceTexture`] and [`GpuTexture`].
//!
//! ```
//! use marblewalk::{Color, Material, ModelGeometry, RawGeometry, Transform};
//! use std::sync::Arc;
//!
//! let mut world = hecs::World::new();
//! world.spawn((
//!     Transform::new(),
//!     Material::new(Color::WHITE).metalness(0.13),
//!     ModelGeometry(Arc::new(RawGeometry::plane(10.0))),
//! ));
//! ```

use std::sync::Arc;

use crate::draw2d::Color;
use crate::geometry::RawGeometry;

/// Type-safe handle to a mesh owned by the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(pub(crate) usize);

/// Type-safe handle to a texture owned by the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub(crate) usize);

/// CPU geometry for an entity. Shared with its mesh collider, if it has one.
#[derive(Clone, Debug)]
pub struct ModelGeometry(pub Arc<RawGeometry>);

/// Marks an entity whose geometry has been uploaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GpuMesh(pub MeshId);

/// Surface appearance of a mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    /// Base color, multiplied with the texture if any.
    pub color: Color,
    /// Self-lit color added after lighting. Black means no emission.
    pub emissive: Color,
    /// 0 is fully dielectric, 1 fully metallic.
    pub metalness: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            emissive: Color::BLACK,
            metalness: 0.0,
        }
    }
}

impl Material {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            ..Default::default()
        }
    }

    pub fn emissive(mut self, emissive: Color) -> Self {
        self.emissive = emissive;
        self
    }

    /// Set metalness, clamped to [0, 1].
    pub fn metalness(mut self, metalness: f32) -> Self {
        self.metalness = metalness.clamp(0.0, 1.0);
        self
    }
}

/// Decoded image to be sampled across an entity's surface.
#[derive(Clone, Debug)]
pub struct SurfaceTexture {
    pub image: Arc<image::RgbaImage>,
    /// How many times the image tiles across the UV range on each axis.
    pub repeat: f32,
}

/// Marks an entity whose [`SurfaceTexture`] has been uploaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GpuTexture(pub TextureId);
