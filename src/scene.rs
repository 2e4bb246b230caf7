//! The frame orchestrator.
//!
//! [`LakeScene`] owns everything the water pipeline touches and runs the
//! whole per-frame sequence inside one redraw callback, in this order:
//!
//! 1. refresh the camera projection,
//! 2. sync the CSG cutout to the tracked transform,
//! 3. hide the three water renderers ([`MaskGuard`]),
//! 4. encode the depth pass over every prop into the capture target,
//! 5. publish the capture's color view to the water parameter set,
//! 6. restore visibility (guard drop),
//!
//! then refreshes every renderer's parameters, encodes the visible pass, and
//! submits both passes together. Because both passes share one command
//! encoder and one submit, the capture write is ordered before the water
//! shader's sample by wgpu itself, and no intermediate state (hidden
//! renderers, half-filled capture) is observable by the visible render.
//!
//! If the capture target is unavailable (the viewport has no renderable
//! area mid-resize), steps 4 and 5 are skipped and the previously published
//! capture stays bound. The water renders with last frame's depths, which is
//! a stale reflection for one frame rather than a crash or a null binding.

use crate::camera::Camera;
use crate::capture::CaptureTarget;
use crate::depth_pass::{DepthMaskable, DepthPass, MaskGuard};
use crate::frame::{FrameContext, Viewport};
use crate::geometry::PlacementAsset;
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Transform};
use crate::params::ParamError;
use crate::scene_pass::{PropId, ScenePass};
use crate::texture::Texture;
use crate::veil::SprayVeil;
use crate::water::WaterSurface;
use crate::waterfall::Waterfall;
use glam::Vec2;

/// Static inputs for building a [`LakeScene`].
pub struct LakeSceneDesc<'a> {
    /// Side length of the square lake plane.
    pub lake_size: f32,
    /// Local-space cutout outline; see [`hull_footprint`](crate::hull_footprint).
    pub cutout_footprint: Vec<Vec2>,
    /// Waterfall geometry and placement, read once here.
    pub waterfall: &'a PlacementAsset,
    /// Spray veil dimensions (width, height).
    pub veil_size: (f32, f32),
    /// Tileable noise map (nearest-sampled).
    pub noise: &'a Texture,
    /// Tileable distortion map (bilinear-sampled).
    pub dudv: &'a Texture,
}

/// The water scene and its per-frame orchestration.
pub struct LakeScene {
    scene_pass: ScenePass,
    depth_pass: DepthPass,
    capture: CaptureTarget,
    water: WaterSurface,
    waterfall: Waterfall,
    veil: SprayVeil,
    tracked: Option<Transform>,
    background: wgpu::Color,
}

impl LakeScene {
    /// Build the scene. Fails only on shader parameter misconfiguration.
    pub fn new(
        gpu: &GpuContext,
        viewport: &Viewport,
        desc: &LakeSceneDesc,
    ) -> Result<Self, ParamError> {
        let scene_pass = ScenePass::new(gpu);
        let depth_pass = DepthPass::new(gpu, &scene_pass.camera_layout, &scene_pass.model_layout);
        let capture = CaptureTarget::new(gpu, viewport);

        let water = WaterSurface::new(
            gpu,
            desc.lake_size,
            desc.cutout_footprint.clone(),
            desc.dudv,
        )?;
        let waterfall = Waterfall::new(gpu, desc.waterfall, desc.noise, desc.dudv)?;
        let veil = SprayVeil::new(
            gpu,
            desc.waterfall.transform,
            desc.veil_size.0,
            desc.veil_size.1,
            desc.noise,
        )?;

        Ok(Self {
            scene_pass,
            depth_pass,
            capture,
            water,
            waterfall,
            veil,
            tracked: None,
            background: wgpu::Color {
                r: 0.35,
                g: 0.55,
                b: 0.75,
                a: 1.0,
            },
        })
    }

    /// Register a prop (terrain, rocks, the boat hull itself).
    pub fn add_prop(
        &mut self,
        gpu: &GpuContext,
        mesh: Mesh,
        transform: Transform,
        color: [f32; 4],
        texture: Option<&Texture>,
    ) -> PropId {
        self.scene_pass.add_prop(gpu, mesh, transform, color, texture)
    }

    /// Move a registered prop.
    pub fn set_prop_transform(&mut self, gpu: &GpuContext, id: PropId, transform: Transform) {
        self.scene_pass.set_transform(gpu, id, transform);
    }

    /// Feed the tracked object's pose for this frame.
    ///
    /// `None` (the default) means the object has not been placed yet; the
    /// cutout stays where it was.
    pub fn track(&mut self, transform: Option<Transform>) {
        self.tracked = transform;
    }

    /// The clear color behind the scene.
    pub fn set_background(&mut self, color: wgpu::Color) {
        self.background = color;
    }

    /// The water surface renderer, for palette tweaks at setup.
    pub fn water_mut(&mut self) -> &mut WaterSurface {
        &mut self.water
    }

    /// The waterfall renderer, for palette tweaks at setup.
    pub fn waterfall_mut(&mut self) -> &mut Waterfall {
        &mut self.waterfall
    }

    /// True when no renderer is left hidden from a previous depth pass.
    pub fn all_visible(&self) -> bool {
        !self.water.hidden_for_depth_pass()
            && !self.waterfall.hidden_for_depth_pass()
            && !self.veil.hidden_for_depth_pass()
    }

    /// Run one full frame: depth capture, parameter sync, visible render,
    /// present.
    pub fn render(&mut self, gpu: &GpuContext, camera: &mut Camera, viewport: Viewport, dt: f32) {
        // Acquire the frame first; without a surface there is nothing to
        // orchestrate and the stale capture carries over to the next frame.
        let output = match gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost, reconfiguring and skipping the frame");
                gpu.surface.configure(&gpu.device, &gpu.config);
                return;
            }
            Err(e) => {
                log::warn!("skipping frame, no surface texture: {e}");
                return;
            }
        };
        let screen_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        camera.update_projection(gpu.aspect());
        let ctx = FrameContext::new(dt, camera, viewport);

        self.scene_pass.update_camera(gpu, camera, &ctx);
        self.scene_pass.ensure_depth_size(gpu);

        // The cutout must match the tracked object before either pass draws
        // the lake.
        self.water.sync_cutout(gpu, self.tracked);

        let capture_ready = self.capture.ensure_size(gpu, &viewport);

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut masked: [&mut dyn DepthMaskable; 3] =
                [&mut self.water, &mut self.waterfall, &mut self.veil];
            let _guard = MaskGuard::hide(&mut masked);

            if capture_ready {
                self.depth_pass.render(
                    &mut encoder,
                    &self.scene_pass.camera_bind,
                    self.scene_pass.props(),
                    &self.capture,
                );
            }
            // Guard drop restores all three flags, even if encoding panicked.
        }

        // Publish after the mask scope closes; nothing renders in between,
        // so the visible pass still only ever sees restored flags and the
        // freshly captured texture.
        if capture_ready {
            self.water.set_depth_capture(gpu, &self.capture.color_view);
        }

        self.water.update(gpu, &ctx);
        self.waterfall.update(gpu, &ctx);
        self.veil.update(gpu, &ctx);

        debug_assert!(self.all_visible());

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Visible Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &screen_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.background),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.scene_pass.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.scene_pass.render(&mut pass);
            self.water.render(&mut pass);
            self.waterfall.render(&mut pass);
            self.veil.render(&mut pass);
        }

        // One submit for both passes: the driver orders the capture write
        // before the water shader's sample.
        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }
}
