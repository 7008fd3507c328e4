use crate::gpu::GpuContext;

/// A GPU texture that can be bound to shaders.
#[derive(Debug)]
pub struct Texture {
    #[allow(dead_code)]
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Create a texture from raw sRGB RGBA data.
    ///
    /// The sampler repeats in both directions so UVs outside [0, 1] tile the image.
    pub fn from_rgba(gpu: &GpuContext, data: &[u8], width: u32, height: u32, label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", label)),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }

    /// Upload a decoded image.
    pub fn from_image(gpu: &GpuContext, image: &image::RgbaImage, label: &str) -> Self {
        let (width, height) = image.dimensions();
        Self::from_rgba(gpu, image.as_raw(), width, height, label)
    }

    /// A single white texel, bound for untextured meshes.
    pub fn white(gpu: &GpuContext) -> Self {
        Self::from_rgba(gpu, &[255, 255, 255, 255], 1, 1, "White Texture")
    }
}

/// Generate a seamlessly tiling white marble image with grey veins.
///
/// Used when the floor texture cannot be loaded.
pub fn marble_image(size: u32, seed: u32) -> image::RgbaImage {
    const CELLS: u32 = 8;
    let size = size.max(1);

    image::RgbaImage::from_fn(size, size, |x, y| {
        let u = x as f32 / size as f32;
        let v = y as f32 / size as f32;

        // Three octaves of periodic value noise drive the turbulence.
        let mut turbulence = 0.0;
        let mut amplitude = 0.5;
        for octave in 0..3 {
            let cells = CELLS << octave;
            turbulence += amplitude * value_noise(u, v, cells, seed.wrapping_add(octave));
            amplitude *= 0.5;
        }

        // The vein phase advances a whole number of periods across the tile.
        let phase = (u + v) * 2.0 * std::f32::consts::TAU + turbulence * 6.0;
        let vein = 1.0 - phase.sin().abs().powf(0.25);
        let shade = 236.0 - vein * 90.0 - turbulence * 12.0;
        let grey = shade.clamp(0.0, 255.0) as u8;

        image::Rgba([grey, grey, grey.saturating_add(4), 255])
    })
}

/// Smoothly interpolated lattice noise in [0, 1], periodic over `cells` lattice cells.
fn value_noise(u: f32, v: f32, cells: u32, seed: u32) -> f32 {
    let x = u * cells as f32;
    let y = v * cells as f32;
    let (x0, y0) = (x.floor() as u32, y.floor() as u32);
    let (fx, fy) = (x - x.floor(), y - y.floor());

    let corner = |cx: u32, cy: u32| (hash(cx % cells, cy % cells, seed) & 0xffff) as f32 / 65535.0;
    let smooth = |t: f32| t * t * (3.0 - 2.0 * t);
    let (sx, sy) = (smooth(fx), smooth(fy));

    let top = corner(x0, y0) + (corner(x0 + 1, y0) - corner(x0, y0)) * sx;
    let bottom = corner(x0, y0 + 1) + (corner(x0 + 1, y0 + 1) - corner(x0, y0 + 1)) * sx;
    top + (bottom - top) * sy
}

fn hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_add(x.wrapping_mul(374761393));
    h = h.wrapping_add(y.wrapping_mul(668265263));
    h ^= h >> 13;
    h = h.wrapping_mul(1274126177);
    h ^= h >> 16;
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marble_is_mostly_light_and_opaque() {
        let img = marble_image(64, 7);
        assert_eq!(img.dimensions(), (64, 64));
        let mean = img.pixels().map(|p| p[0] as f32).sum::<f32>() / (64.0 * 64.0);
        assert!(mean > 150.0, "mean brightness {mean}");
        assert!(img.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn marble_is_deterministic() {
        assert_eq!(marble_image(16, 3), marble_image(16, 3));
    }

    #[test]
    fn value_noise_wraps_at_tile_edges() {
        for i in 0..10 {
            let t = i as f32 / 10.0;
            let left = value_noise(0.0, t, 8, 1);
            let right = value_noise(1.0, t, 8, 1);
            assert!((left - right).abs() < 1e-5);
        }
    }
}
