//! GPU textures for the water shaders.
//!
//! Two external maps drive everything in this crate: a tileable noise image
//! (sampled nearest-neighbor, so the waterfall's foam bands stay hard-edged)
//! and a tileable distortion ("dudv") image whose red/green channels offset
//! water UVs (sampled bilinear). Both address with repeat wrapping because
//! the shaders scroll them far past [0, 1].
//!
//! When no image assets are on hand, [`Texture::tileable_noise`] and
//! [`Texture::dudv`] generate equivalent maps procedurally; the demo scene
//! uses those.

use crate::gpu::GpuContext;

/// A GPU texture with its view and sampler, ready to bind to a shader.
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
    /// Create a repeat-wrapped texture from raw RGBA data.
    ///
    /// `filter` selects the min/mag sampling mode: `Nearest` for the noise
    /// map, `Linear` for the dudv map.
    pub fn from_rgba(
        gpu: &GpuContext,
        data: &[u8],
        width: u32,
        height: u32,
        filter: wgpu::FilterMode,
        label: &str,
    ) -> Self {
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
                format: wgpu::TextureFormat::Rgba8Unorm,
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
            mag_filter: filter,
            min_filter: filter,
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

    /// Load a texture from an image file on disk.
    pub fn from_file(
        gpu: &GpuContext,
        path: &str,
        filter: wgpu::FilterMode,
    ) -> Result<Self, image::ImageError> {
        let img = image::open(path)?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self::from_rgba(gpu, &img, width, height, filter, path))
    }

    /// Load a texture from embedded image bytes.
    pub fn from_bytes(
        gpu: &GpuContext,
        bytes: &[u8],
        filter: wgpu::FilterMode,
        label: &str,
    ) -> Result<Self, image::ImageError> {
        let img = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(Self::from_rgba(gpu, &img, width, height, filter, label))
    }

    /// Generate a tileable grayscale value-noise texture.
    ///
    /// Sampled nearest-neighbor, matching how the waterfall shader expects
    /// its noise input (hard-edged foam bands rather than smeared ones).
    pub fn tileable_noise(gpu: &GpuContext, size: u32, seed: u32) -> Self {
        let mut data = vec![0u8; (size * size * 4) as usize];

        for y in 0..size {
            for x in 0..size {
                let idx = ((y * size + x) * 4) as usize;
                let v = value_noise(x as f32, y as f32, size, size / 8, seed);
                let byte = (v * 255.0) as u8;
                data[idx] = byte;
                data[idx + 1] = byte;
                data[idx + 2] = byte;
                data[idx + 3] = 255;
            }
        }

        Self::from_rgba(
            gpu,
            &data,
            size,
            size,
            wgpu::FilterMode::Nearest,
            "Noise Texture",
        )
    }

    /// Generate a tileable distortion ("dudv") texture.
    ///
    /// Red and green hold independent smooth noise channels centered on 128;
    /// the water shader remaps them to signed UV offsets. Sampled bilinear so
    /// the distortion stays smooth.
    pub fn dudv(gpu: &GpuContext, size: u32, seed: u32) -> Self {
        let mut data = vec![0u8; (size * size * 4) as usize];

        for y in 0..size {
            for x in 0..size {
                let idx = ((y * size + x) * 4) as usize;
                let u = value_noise(x as f32, y as f32, size, size / 16, seed);
                let v = value_noise(x as f32, y as f32, size, size / 16, seed ^ 0x9e37_79b9);
                data[idx] = (u * 255.0) as u8;
                data[idx + 1] = (v * 255.0) as u8;
                data[idx + 2] = 128;
                data[idx + 3] = 255;
            }
        }

        Self::from_rgba(
            gpu,
            &data,
            size,
            size,
            wgpu::FilterMode::Linear,
            "Dudv Texture",
        )
    }
}

/// Tileable 2D value noise in [0, 1].
///
/// Random values on a wrapping lattice (`cell` pixels per lattice step),
/// smoothstep-interpolated between lattice points. Wrapping the lattice index
/// makes the result periodic in `size`, which is what makes the texture
/// tileable.
fn value_noise(x: f32, y: f32, size: u32, cell: u32, seed: u32) -> f32 {
    let cell = cell.max(1) as f32;
    let cells = (size as f32 / cell).max(1.0) as u32;

    let cx = x / cell;
    let cy = y / cell;
    let x0 = cx.floor() as u32 % cells;
    let y0 = cy.floor() as u32 % cells;
    let x1 = (x0 + 1) % cells;
    let y1 = (y0 + 1) % cells;

    let fx = smoothstep(cx.fract());
    let fy = smoothstep(cy.fract());

    let v00 = lattice(x0, y0, seed);
    let v10 = lattice(x1, y0, seed);
    let v01 = lattice(x0, y1, seed);
    let v11 = lattice(x1, y1, seed);

    let top = v00 + (v10 - v00) * fx;
    let bottom = v01 + (v11 - v01) * fx;
    top + (bottom - top) * fy
}

fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

/// Hash a lattice coordinate to a value in [0, 1].
fn lattice(x: u32, y: u32, seed: u32) -> f32 {
    let mut h = seed;
    h = h.wrapping_add(x.wrapping_mul(374761393));
    h = h.wrapping_add(y.wrapping_mul(668265263));
    h ^= h >> 13;
    h = h.wrapping_mul(1274126177);
    h ^= h >> 16;
    (h % 10_000) as f32 / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_noise_stays_in_range() {
        for y in 0..64 {
            for x in 0..64 {
                let v = value_noise(x as f32, y as f32, 64, 8, 7);
                assert!((0.0..=1.0).contains(&v), "out of range at {x},{y}: {v}");
            }
        }
    }

    #[test]
    fn value_noise_is_periodic_in_size() {
        // The lattice wraps, so sampling one full period apart is identical.
        for y in [0.0, 13.5, 40.0] {
            let a = value_noise(0.0, y, 64, 8, 42);
            let b = value_noise(64.0, y, 64, 8, 42);
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn value_noise_is_deterministic_per_seed() {
        let a = value_noise(10.0, 20.0, 64, 8, 1);
        let b = value_noise(10.0, 20.0, 64, 8, 1);
        let c = value_noise(10.0, 20.0, 64, 8, 2);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
