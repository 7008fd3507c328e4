use serde::Deserialize;

use crate::gpu::GpuContext;

/// A rectangle in screen-space pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns true if the point lies inside the rectangle (edges inclusive).
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }

    /// A rectangle of the given size centered inside `self`.
    pub fn centered(&self, width: f32, height: f32) -> Rect {
        Rect::new(
            self.x + (self.width - width) * 0.5,
            self.y + (self.height - height) * 0.5,
            width,
            height,
        )
    }
}

/// RGBA color.
///
/// Channels are linear. Colors deserialize from either an sRGB `"#rrggbb"` string or a
/// linear `[r, g, b]` / `[r, g, b, a]` float array.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(try_from = "ColorRepr")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Build an opaque color from an sRGB `0xRRGGBB` value, decoding each channel to linear.
    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
        Self::rgb(channel(16), channel(8), channel(0))
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const RED: Color = Color::rgba(1.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    /// Semi-transparent dark background for debug panels.
    pub const DEBUG_BG: Color = Color::rgba(0.1, 0.1, 0.1, 0.85);
    /// Accent color for borders.
    pub const DEBUG_BORDER: Color = Color::rgba(0.4, 0.4, 0.4, 1.0);
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Hex(String),
    Channels(Vec<f32>),
}

impl TryFrom<ColorRepr> for Color {
    type Error = String;

    fn try_from(repr: ColorRepr) -> Result<Self, Self::Error> {
        match repr {
            ColorRepr::Hex(s) => {
                let digits = s.strip_prefix('#').unwrap_or(&s);
                if digits.len() != 6 {
                    return Err(format!("expected #rrggbb, got '{s}'"));
                }
                u32::from_str_radix(digits, 16)
                    .map(Color::from_hex)
                    .map_err(|e| format!("invalid hex color '{s}': {e}"))
            }
            ColorRepr::Channels(c) => match c.as_slice() {
                [r, g, b] => Ok(Color::rgb(*r, *g, *b)),
                [r, g, b, a] => Ok(Color::rgba(*r, *g, *b, *a)),
                _ => Err(format!("expected 3 or 4 color channels, got {}", c.len())),
            },
        }
    }
}

/// Vertex for 2D rendering.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex2d {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex2d {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex2d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            },
            // color
            wgpu::VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x4,
            },
        ],
    };
}

/// Uniforms for 2D rendering.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Draw2dUniforms {
    resolution: [f32; 2],
    _padding: [f32; 2],
}

const MAX_VERTICES: usize = 4096;

/// Immediate-mode 2D drawing for the HUD.
///
/// Rectangles are batched during the frame and rendered in a single draw at the end.
pub struct Draw2d {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    vertices: Vec<Vertex2d>,
}

impl Draw2d {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Draw2d Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/draw2d.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw2d Uniforms"),
            size: std::mem::size_of::<Draw2dUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Draw2d Uniform Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw2d Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Draw2d Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Draw2d Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[Vertex2d::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw2d Vertex Buffer"),
            size: (MAX_VERTICES * std::mem::size_of::<Vertex2d>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            pipeline,
            vertex_buffer,
            uniform_buffer,
            uniform_bind_group,
            vertices: Vec::with_capacity(256),
        }
    }

    /// Clear all draw calls for the new frame.
    pub fn clear(&mut self) {
        self.vertices.clear();
    }

    /// Draw a colored rectangle.
    pub fn rect(&mut self, rect: Rect, color: Color) {
        if self.vertices.len() + 6 > MAX_VERTICES {
            log::debug!("draw2d vertex budget exhausted, dropping rect");
            return;
        }
        let c = color.to_array();
        let (x, y, w, h) = (rect.x, rect.y, rect.width, rect.height);
        let v = |px: f32, py: f32| Vertex2d {
            position: [px, py],
            color: c,
        };
        self.vertices.extend_from_slice(&[
            v(x, y),
            v(x + w, y),
            v(x, y + h),
            v(x + w, y),
            v(x + w, y + h),
            v(x, y + h),
        ]);
    }

    /// Draw a rectangle outline of the given thickness.
    pub fn outline(&mut self, rect: Rect, thickness: f32, color: Color) {
        let t = thickness;
        self.rect(Rect::new(rect.x, rect.y, rect.width, t), color);
        self.rect(
            Rect::new(rect.x, rect.y + rect.height - t, rect.width, t),
            color,
        );
        self.rect(Rect::new(rect.x, rect.y, t, rect.height), color);
        self.rect(
            Rect::new(rect.x + rect.width - t, rect.y, t, rect.height),
            color,
        );
    }

    /// Render all batched rectangles.
    pub fn render(&self, gpu: &GpuContext, render_pass: &mut wgpu::RenderPass) {
        if self.vertices.is_empty() {
            return;
        }

        let uniforms = Draw2dUniforms {
            resolution: [gpu.width() as f32, gpu.height() as f32],
            _padding: [0.0, 0.0],
        };
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));
        gpu.queue
            .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&self.vertices));

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.draw(0..self.vertices.len() as u32, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_decoded_from_srgb() {
        let grey = Color::from_hex(0x808080);
        assert!((grey.r - 0.2158).abs() < 1e-3);
        assert_eq!(grey.r, grey.g);
        assert_eq!(grey.g, grey.b);

        let ground = Color::from_hex(0x444444);
        assert!((ground.r - 0.0578).abs() < 1e-3);

        // The low end of the curve is linear.
        assert!((Color::from_hex(0x000008).b - 8.0 / 255.0 / 12.92).abs() < 1e-6);

        assert_eq!(Color::from_hex(0xff0000), Color::RED);
        assert_eq!(Color::from_hex(0xffffff), Color::WHITE);
        assert_eq!(Color::from_hex(0x000000), Color::BLACK);
    }

    #[test]
    fn rect_contains_edges() {
        let r = Rect::new(10.0, 10.0, 100.0, 20.0);
        assert!(r.contains(10.0, 10.0));
        assert!(r.contains(110.0, 30.0));
        assert!(!r.contains(111.0, 15.0));
    }

    #[test]
    fn color_parses_from_hex_string_and_channels() {
        #[derive(Deserialize)]
        struct Wrapper {
            a: Color,
            b: Color,
        }
        let w: Wrapper = toml::from_str("a = \"#444444\"\nb = [0.5, 0.25, 1.0]").unwrap();
        assert_eq!(w.a, Color::from_hex(0x444444));
        assert_eq!(w.b, Color::rgb(0.5, 0.25, 1.0));
    }

    #[test]
    fn color_rejects_malformed_hex() {
        let err = Color::try_from(ColorRepr::Hex("#12345".into()));
        assert!(err.is_err());
    }
}
