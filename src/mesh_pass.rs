//! Lit 3D mesh rendering with depth testing and texture support.
//!
//! # Architecture
//!
//! The mesh pass uses three bind groups:
//! - **Group 0**: Scene uniforms (view-projection, camera position, lights)
//! - **Group 1**: Model uniforms (model matrix, normal matrix, material), one 256-byte aligned
//!   slot per draw call selected with a dynamic offset
//! - **Group 2**: Texture and sampler for the mesh surface
//!
//! Uniforms for the whole frame are written in [`MeshPass::prepare`] before the render pass
//! begins; [`MeshPass::render`] then only binds and draws. Writing every draw's uniforms to
//! the same buffer offset would leave all draws with the last draw's transform, since queue
//! writes land before the pass executes.
//!
//! # Lighting
//!
//! A hemisphere light (sky and ground colors blended by normal direction) plus one
//! directional light with a Blinn-Phong highlight. Metalness fades the diffuse term and
//! tints the highlight with the base color. Emissive is added last, unlit.

use crate::camera::Camera;
use crate::ecs::Material;
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Transform, Vertex3d};
use crate::scene::Lights;
use crate::texture::Texture;

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub light_dir: [f32; 4],
    pub light_color: [f32; 4],
    pub sky_color: [f32; 4],
    pub ground_color: [f32; 4],
}

impl SceneUniforms {
    pub fn new(camera: &Camera, lights: &Lights) -> Self {
        Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            camera_pos: camera.position.extend(1.0).to_array(),
            light_dir: lights.directional_dir.extend(0.0).to_array(),
            light_color: lights.directional_color.to_array(),
            sky_color: lights.sky_color.to_array(),
            ground_color: lights.ground_color.to_array(),
        }
    }
}

/// Per-draw model uniforms.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniforms {
    pub model: [[f32; 4]; 4],
    /// Inverse transpose of the model matrix.
    pub normal_matrix: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub emissive: [f32; 4],
    /// x: metalness, y: uv repeat.
    pub params: [f32; 4],
}

impl ModelUniforms {
    pub fn new(transform: &Transform, material: &Material, uv_repeat: f32) -> Self {
        let model = transform.matrix();
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: model.inverse().transpose().to_cols_array_2d(),
            color: material.color.to_array(),
            emissive: material.emissive.to_array(),
            params: [material.metalness, uv_repeat, 0.0, 0.0],
        }
    }
}

/// A draw call queued for rendering.
pub struct DrawCall<'a> {
    pub mesh: &'a Mesh,
    pub transform: Transform,
    pub material: Material,
    /// Bind group from [`MeshPass::create_texture_bind_group`]. `None` draws untextured.
    pub texture: Option<&'a wgpu::BindGroup>,
    pub uv_repeat: f32,
}

/// Round `size` up to a multiple of `alignment`.
pub(crate) fn align_to(size: u64, alignment: u64) -> u64 {
    size.div_ceil(alignment) * alignment
}

/// Handles 3D mesh rendering with depth testing.
pub struct MeshPass {
    pipeline: wgpu::RenderPipeline,
    scene_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    model_buffer: wgpu::Buffer,
    model_bind_group: wgpu::BindGroup,
    model_bind_group_layout: wgpu::BindGroupLayout,
    model_stride: u64,
    model_capacity: usize,
    pub(crate) depth_view: wgpu::TextureView,
    depth_size: (u32, u32),
    texture_bind_group_layout: wgpu::BindGroupLayout,
    default_bind_group: wgpu::BindGroup,
}

impl MeshPass {
    const INITIAL_CAPACITY: usize = 16;

    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/scene.wgsl").into()),
        });

        // Scene uniform buffer (group 0)
        let scene_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Uniforms"),
            size: std::mem::size_of::<SceneUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let scene_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Scene Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Bind Group"),
            layout: &scene_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_buffer.as_entire_binding(),
            }],
        });

        // Model uniform slots (group 1)
        let model_size = std::mem::size_of::<ModelUniforms>() as u64;
        let model_stride = align_to(
            model_size,
            device.limits().min_uniform_buffer_offset_alignment as u64,
        );

        let model_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Model Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(model_size),
                    },
                    count: None,
                }],
            });

        let (model_buffer, model_bind_group) = Self::create_model_slots(
            gpu,
            &model_bind_group_layout,
            model_stride,
            Self::INITIAL_CAPACITY,
        );

        // Texture bind group layout (group 2)
        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Texture Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let default_bind_group =
            Self::texture_bind_group(gpu, &texture_bind_group_layout, &Texture::white(gpu));

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[
                &scene_bind_group_layout,
                &model_bind_group_layout,
                &texture_bind_group_layout,
            ],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Mesh Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[Vertex3d::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            // Loaded models have no guaranteed winding, so both faces are drawn.
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            scene_buffer,
            scene_bind_group,
            model_buffer,
            model_bind_group,
            model_bind_group_layout,
            model_stride,
            model_capacity: Self::INITIAL_CAPACITY,
            depth_view: Self::create_depth_view(gpu),
            depth_size: (gpu.width(), gpu.height()),
            texture_bind_group_layout,
            default_bind_group,
        }
    }

    fn create_model_slots(
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        stride: u64,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Model Uniforms"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Model Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<ModelUniforms>() as u64),
                }),
            }],
        });

        (buffer, bind_group)
    }

    fn texture_bind_group(
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        texture: &Texture,
    ) -> wgpu::BindGroup {
        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Mesh Texture Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        })
    }

    /// Creates a bind group for a texture, to be cached by the caller.
    pub fn create_texture_bind_group(&self, gpu: &GpuContext, texture: &Texture) -> wgpu::BindGroup {
        Self::texture_bind_group(gpu, &self.texture_bind_group_layout, texture)
    }

    fn create_depth_view(gpu: &GpuContext) -> wgpu::TextureView {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: gpu.width(),
                height: gpu.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// Recreates the depth buffer if the surface size changed.
    pub fn ensure_depth_size(&mut self, gpu: &GpuContext) {
        if self.depth_size != (gpu.width(), gpu.height()) {
            self.depth_view = Self::create_depth_view(gpu);
            self.depth_size = (gpu.width(), gpu.height());
        }
    }

    /// Upload the frame's scene uniforms and one model slot per draw call.
    ///
    /// Must be called before the render pass that uses [`MeshPass::render`].
    pub fn prepare(
        &mut self,
        gpu: &GpuContext,
        camera: &Camera,
        lights: &Lights,
        draw_calls: &[DrawCall],
    ) {
        gpu.queue.write_buffer(
            &self.scene_buffer,
            0,
            bytemuck::cast_slice(&[SceneUniforms::new(camera, lights)]),
        );

        if draw_calls.len() > self.model_capacity {
            let capacity = draw_calls.len().next_power_of_two();
            let (buffer, bind_group) = Self::create_model_slots(
                gpu,
                &self.model_bind_group_layout,
                self.model_stride,
                capacity,
            );
            self.model_buffer = buffer;
            self.model_bind_group = bind_group;
            self.model_capacity = capacity;
            log::debug!("model uniform slots grown to {capacity}");
        }

        for (slot, call) in draw_calls.iter().enumerate() {
            let uniforms = ModelUniforms::new(&call.transform, &call.material, call.uv_repeat);
            gpu.queue.write_buffer(
                &self.model_buffer,
                slot as u64 * self.model_stride,
                bytemuck::cast_slice(&[uniforms]),
            );
        }
    }

    /// Draw the calls passed to the preceding [`MeshPass::prepare`], in the same order.
    pub fn render(&self, render_pass: &mut wgpu::RenderPass, draw_calls: &[DrawCall]) {
        if draw_calls.is_empty() {
            return;
        }

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.scene_bind_group, &[]);

        for (slot, call) in draw_calls.iter().take(self.model_capacity).enumerate() {
            let offset = (slot as u64 * self.model_stride) as u32;
            render_pass.set_bind_group(1, &self.model_bind_group, &[offset]);
            render_pass.set_bind_group(2, call.texture.unwrap_or(&self.default_bind_group), &[]);

            render_pass.set_vertex_buffer(0, call.mesh.vertex_buffer.slice(..));
            render_pass
                .set_index_buffer(call.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..call.mesh.index_count, 0, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw2d::Color;
    use glam::Vec3;

    #[test]
    fn model_slots_are_aligned() {
        let size = std::mem::size_of::<ModelUniforms>() as u64;
        assert_eq!(size, 176);
        assert_eq!(align_to(size, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(257, 256), 512);
    }

    #[test]
    fn model_uniforms_carry_material() {
        let material = Material::new(Color::WHITE)
            .emissive(Color::RED)
            .metalness(0.13);
        let uniforms = ModelUniforms::new(&Transform::from_position(Vec3::X), &material, 4.0);
        assert_eq!(uniforms.params[..2], [0.13, 4.0]);
        assert_eq!(uniforms.emissive, Color::RED.to_array());
        // Translation lives in the fourth column.
        assert_eq!(uniforms.model[3][..3], [1.0, 0.0, 0.0]);
    }
}
