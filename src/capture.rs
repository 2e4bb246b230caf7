//! The offscreen target the depth pre-pass renders into.
//!
//! A [`CaptureTarget`] pairs a color attachment holding RGBA-packed depth
//! (what the water shader samples) with a real depth attachment (what makes
//! the pre-pass occlusion-correct). Both are allocated at the viewport's
//! physical resolution and recreated whenever that changes.
//!
//! A zero-sized viewport (minimized window, mid-resize) makes the target
//! unavailable rather than zero-sized; the frame orchestrator skips the
//! capture for such frames and the previously published texture stays bound.

use crate::frame::Viewport;
use crate::gpu::GpuContext;

/// Pixel format of the packed-depth color attachment.
pub const CAPTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Pixel format of the capture's depth attachment.
pub const CAPTURE_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Offscreen color+depth surfaces for the depth pre-pass.
pub struct CaptureTarget {
    #[allow(dead_code)]
    color: wgpu::Texture,
    /// View of the packed-depth color attachment; this is what gets
    /// published to the water shader after each capture.
    pub color_view: wgpu::TextureView,
    #[allow(dead_code)]
    depth: wgpu::Texture,
    /// View of the depth attachment.
    pub depth_view: wgpu::TextureView,
    width: u32,
    height: u32,
    was_available: bool,
}

impl CaptureTarget {
    /// Allocate a target at the viewport's current physical resolution.
    ///
    /// # Panics
    ///
    /// Panics if the viewport has no renderable area; scene setup happens
    /// against a live window, so a zero-sized initial viewport is a caller
    /// bug rather than a runtime condition.
    pub fn new(gpu: &GpuContext, viewport: &Viewport) -> Self {
        let (width, height) = viewport.physical_size();
        assert!(width > 0 && height > 0, "capture target needs a visible viewport");
        Self::allocate(gpu, width, height)
    }

    fn allocate(gpu: &GpuContext, width: u32, height: u32) -> Self {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let color = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Capture Color"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: CAPTURE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());

        let depth = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Capture Depth"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: CAPTURE_DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            color,
            color_view,
            depth,
            depth_view,
            width,
            height,
            was_available: true,
        }
    }

    /// Match the target to the viewport, reallocating after a resize.
    ///
    /// Returns whether the target is usable this frame. `false` means the
    /// viewport has no renderable area; the existing textures are kept (the
    /// previously published capture must stay valid) and the caller skips
    /// the capture.
    pub fn ensure_size(&mut self, gpu: &GpuContext, viewport: &Viewport) -> bool {
        let (width, height) = viewport.physical_size();

        if width == 0 || height == 0 {
            if self.was_available {
                log::warn!("viewport has no renderable area; reusing previous depth capture");
                self.was_available = false;
            }
            return false;
        }

        if (width, height) != (self.width, self.height) {
            log::info!(
                "reallocating depth capture {}x{} -> {}x{}",
                self.width,
                self.height,
                width,
                height
            );
            *self = Self::allocate(gpu, width, height);
        }
        self.was_available = true;
        true
    }

    /// Current physical size of the target.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
