//! The render backend: GPU resources for the scene and the frame's passes.
//!
//! The renderer never owns scene state. Each frame it uploads whatever the world gained
//! since the last frame, then draws every entity that has a transform, a material, and an
//! uploaded mesh.

use std::sync::Arc;

use crate::camera::Camera;
use crate::draw2d::Draw2d;
use crate::ecs::{GpuMesh, GpuTexture, Material, MeshId, ModelGeometry, SurfaceTexture, TextureId};
use crate::geometry::RawGeometry;
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Transform};
use crate::mesh_pass::{DrawCall, MeshPass};
use crate::scene::SceneWorld;
use crate::texture::Texture;

/// GPU-side storage for meshes and textures plus the passes that draw them.
pub struct Renderer {
    mesh_pass: MeshPass,
    draw2d: Draw2d,
    meshes: Vec<Mesh>,
    /// Textures with their cached bind groups.
    textures: Vec<(Texture, wgpu::BindGroup)>,
}

impl Renderer {
    pub fn new(gpu: &GpuContext) -> Self {
        Self {
            mesh_pass: MeshPass::new(gpu),
            draw2d: Draw2d::new(gpu),
            meshes: Vec::new(),
            textures: Vec::new(),
        }
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        let idx = self.meshes.len();
        self.meshes.push(mesh);
        MeshId(idx)
    }

    pub fn add_texture(&mut self, gpu: &GpuContext, texture: Texture) -> TextureId {
        let bind_group = self.mesh_pass.create_texture_bind_group(gpu, &texture);
        let idx = self.textures.len();
        self.textures.push((texture, bind_group));
        TextureId(idx)
    }

    /// Upload geometry and textures that entities gained since the last call.
    pub fn sync(&mut self, gpu: &GpuContext, world: &mut hecs::World) {
        let pending_meshes: Vec<(hecs::Entity, Arc<RawGeometry>)> = world
            .query::<&ModelGeometry>()
            .without::<&GpuMesh>()
            .iter()
            .map(|(entity, geometry)| (entity, geometry.0.clone()))
            .collect();

        for (entity, geometry) in pending_meshes {
            let id = self.add_mesh(Mesh::new(gpu, &geometry.vertices, &geometry.indices));
            let _ = world.insert_one(entity, GpuMesh(id));
        }

        let pending_textures: Vec<(hecs::Entity, Arc<image::RgbaImage>)> = world
            .query::<&SurfaceTexture>()
            .without::<&GpuTexture>()
            .iter()
            .map(|(entity, texture)| (entity, texture.image.clone()))
            .collect();

        for (entity, image) in pending_textures {
            let texture = Texture::from_image(gpu, &image, "Surface Texture");
            let id = self.add_texture(gpu, texture);
            let _ = world.insert_one(entity, GpuTexture(id));
        }
    }

    /// Resize the depth buffer to the current surface.
    pub fn resize(&mut self, gpu: &GpuContext) {
        self.mesh_pass.ensure_depth_size(gpu);
    }

    /// Render the scene from `camera`, then the 2D overlay queued by `overlay`.
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        scene: &SceneWorld,
        camera: &Camera,
        overlay: impl FnOnce(&mut Draw2d),
    ) -> Result<(), wgpu::SurfaceError> {
        self.mesh_pass.ensure_depth_size(gpu);

        let output = gpu.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut draw_calls = Vec::new();
        let mut query = scene.world.query::<(
            &Transform,
            &Material,
            &GpuMesh,
            Option<&GpuTexture>,
            Option<&SurfaceTexture>,
        )>();
        for (_, (transform, material, gpu_mesh, gpu_texture, surface)) in query.iter() {
            let Some(mesh) = self.meshes.get(gpu_mesh.0.0) else {
                continue;
            };
            let texture = gpu_texture
                .and_then(|t| self.textures.get(t.0.0))
                .map(|(_, bind_group)| bind_group);
            draw_calls.push(DrawCall {
                mesh,
                transform: *transform,
                material: *material,
                texture,
                uv_repeat: surface.map_or(1.0, |s| s.repeat),
            });
        }

        self.mesh_pass
            .prepare(gpu, camera, &scene.lights, &draw_calls);

        self.draw2d.clear();
        overlay(&mut self.draw2d);

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let bg = scene.background;
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: bg.r as f64,
                            g: bg.g as f64,
                            b: bg.b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.mesh_pass.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.mesh_pass.render(&mut render_pass, &draw_calls);
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Overlay Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.draw2d.render(gpu, &mut render_pass);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
