//! The depth pre-pass and the visibility masking around it.
//!
//! Instead of a scene-wide override material, [`DepthPass`] is an explicit
//! pass object: it takes the prop list and rasterizes every prop through one
//! packed-depth pipeline, ignoring whatever material the visible pass uses.
//! Water-related renderers never appear in the prop list, but they still
//! carry per-frame visibility flags (the [`DepthMaskable`] capability) so
//! the orchestrator can assert the "hidden during capture, visible during
//! the real render" contract, and so anything composited between the two
//! passes skips them.
//!
//! [`MaskGuard`] hides a set of maskables for the duration of a scope and
//! restores them in `Drop`. Restoration therefore survives early returns and
//! unwinding; a frame that dies mid-capture cannot leave the water invisible.

use crate::capture::{CAPTURE_DEPTH_FORMAT, CAPTURE_FORMAT, CaptureTarget};
use crate::gpu::GpuContext;
use crate::mesh::Vertex3d;
use crate::scene_pass::Prop;

/// A renderer that must be excluded from the depth capture.
///
/// Implementors own their flag; only the frame orchestrator's [`MaskGuard`]
/// mutates it, and the visible render never observes it `true`.
pub trait DepthMaskable {
    /// Set or clear the hidden-for-depth-pass flag.
    fn set_hidden_for_depth_pass(&mut self, hidden: bool);

    /// Whether the renderer is currently hidden for the depth pass.
    fn hidden_for_depth_pass(&self) -> bool;
}

/// Hides a set of maskables until dropped.
pub struct MaskGuard<'a, 'm> {
    masked: &'a mut [&'m mut dyn DepthMaskable],
}

impl<'a, 'm> MaskGuard<'a, 'm> {
    /// Hide every maskable in the slice.
    pub fn hide(masked: &'a mut [&'m mut dyn DepthMaskable]) -> Self {
        for m in masked.iter_mut() {
            m.set_hidden_for_depth_pass(true);
        }
        Self { masked }
    }
}

impl Drop for MaskGuard<'_, '_> {
    fn drop(&mut self) {
        for m in self.masked.iter_mut() {
            m.set_hidden_for_depth_pass(false);
        }
    }
}

/// Renders the prop list with packed-depth output into a capture target.
pub struct DepthPass {
    pipeline: wgpu::RenderPipeline,
}

impl DepthPass {
    /// Build the depth pipeline against the scene pass's camera and model
    /// bind group layouts, so prop bind groups work unchanged here.
    pub fn new(
        gpu: &GpuContext,
        camera_layout: &wgpu::BindGroupLayout,
        model_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Depth Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/depth.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Depth Pipeline Layout"),
            bind_group_layouts: &[camera_layout, model_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Depth Pipeline"),
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
                    format: CAPTURE_FORMAT,
                    // No blending: packed depth bytes must land untouched.
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: CAPTURE_DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self { pipeline }
    }

    /// Encode the depth pass over `props` into the capture target.
    ///
    /// The clear color is white, which unpacks to far-plane depth: pixels no
    /// prop covers read as "nothing submerged" in the water shader.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        camera_bind: &wgpu::BindGroup,
        props: &[Prop],
        target: &CaptureTarget,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Depth Capture Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &target.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, camera_bind, &[]);

        for prop in props {
            pass.set_bind_group(1, &prop.model_bind, &[]);
            pass.set_vertex_buffer(0, prop.mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(prop.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..prop.mesh.index_count, 0, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flag {
        hidden: bool,
    }

    impl DepthMaskable for Flag {
        fn set_hidden_for_depth_pass(&mut self, hidden: bool) {
            self.hidden = hidden;
        }

        fn hidden_for_depth_pass(&self) -> bool {
            self.hidden
        }
    }

    #[test]
    fn guard_hides_then_restores() {
        let mut lake = Flag { hidden: false };
        let mut falls = Flag { hidden: false };
        let mut veil = Flag { hidden: false };

        {
            let mut masked: [&mut dyn DepthMaskable; 3] = [&mut lake, &mut falls, &mut veil];
            let guard = MaskGuard::hide(&mut masked);
            for m in guard.masked.iter() {
                assert!(m.hidden_for_depth_pass());
            }
        }

        assert!(!lake.hidden);
        assert!(!falls.hidden);
        assert!(!veil.hidden);
    }

    #[test]
    fn guard_restores_on_early_return() {
        fn capture_that_bails(masked: &mut [&mut dyn DepthMaskable]) -> Option<()> {
            let _guard = MaskGuard::hide(masked);
            // Simulates the skip path when the capture target is unavailable.
            None?;
            Some(())
        }

        let mut lake = Flag { hidden: false };
        let mut masked: [&mut dyn DepthMaskable; 1] = [&mut lake];
        assert!(capture_that_bails(&mut masked).is_none());
        assert!(!lake.hidden);
    }

    #[test]
    fn guard_restores_on_unwind() {
        let mut lake = Flag { hidden: false };

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut masked: [&mut dyn DepthMaskable; 1] = [&mut lake];
            let _guard = MaskGuard::hide(&mut masked);
            panic!("mid-capture failure");
        }));

        assert!(result.is_err());
        assert!(!lake.hidden);
    }
}
