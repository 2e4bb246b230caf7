//! The spray veil at the waterfall's base.
//!
//! Mirrors the waterfall's position and orientation and consumes the shared
//! noise map. The particle simulation itself is out of scope; this renders a
//! translucent mist sheet the noise map animates, which is all the depth
//! pass and visibility machinery care about.

use crate::depth_pass::DepthMaskable;
use crate::frame::{FlowClock, FrameContext};
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Transform, Vertex3d};
use crate::params::{ParamError, ShaderParams};
use crate::scene_pass::SCENE_DEPTH_FORMAT;
use crate::texture::Texture;

/// Parameters the veil shader consumes.
pub const VEIL_PARAMS: &[&str] = &["noise_map", "time"];

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct VeilUniforms {
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    time: f32,
    _pad: [f32; 3],
}

/// Renders the mist sheet in front of the waterfall.
pub struct SprayVeil {
    mesh: Mesh,
    transform: Transform,
    clock: FlowClock,
    params: ShaderParams,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind: wgpu::BindGroup,
    texture_bind: wgpu::BindGroup,
    hidden_for_depth_pass: bool,
}

impl SprayVeil {
    /// Build a `width`×`height` veil mirroring the waterfall's transform.
    pub fn new(
        gpu: &GpuContext,
        transform: Transform,
        width: f32,
        height: f32,
        noise: &Texture,
    ) -> Result<Self, ParamError> {
        let device = &gpu.device;

        // A vertical quad in the waterfall's local XY plane, feet at y = 0.
        let hw = width * 0.5;
        let vertices = [
            Vertex3d::new([-hw, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            Vertex3d::new([hw, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            Vertex3d::new([hw, height, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0]),
            Vertex3d::new([-hw, height, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
        ];
        let indices = [0u32, 1, 2, 2, 3, 0];
        let mesh = Mesh::new(gpu, &vertices, &indices);

        let mut params = ShaderParams::new();
        params.set_texture("noise_map", noise.view.clone());
        params.set_scalar("time", 0.0);
        params.require(VEIL_PARAMS)?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Veil Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/veil.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Veil Uniforms"),
            size: std::mem::size_of::<VeilUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Veil Uniform Layout"),
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

        let uniform_bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Veil Uniform Bind Group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Veil Texture Layout"),
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

        let texture_bind = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Veil Texture Bind Group"),
            layout: &texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(params.texture("noise_map")?),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&noise.sampler),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Veil Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Veil Pipeline"),
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
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: SCENE_DEPTH_FORMAT,
                // Mist reads depth but must not occlude what drifts behind it.
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            mesh,
            transform,
            clock: FlowClock::new(1.0),
            params,
            pipeline,
            uniform_buffer,
            uniform_bind,
            texture_bind,
            hidden_for_depth_pass: false,
        })
    }

    /// Advance the drift clock and upload this frame's uniforms.
    pub fn update(&mut self, gpu: &GpuContext, ctx: &FrameContext) {
        let time = self.clock.advance(ctx.dt);
        self.params.set_scalar("time", time);

        match self.pack_uniforms(ctx) {
            Ok(uniforms) => {
                gpu.queue
                    .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));
            }
            Err(e) => log::error!("veil parameters misconfigured: {e}"),
        }
    }

    fn pack_uniforms(&self, ctx: &FrameContext) -> Result<VeilUniforms, ParamError> {
        Ok(VeilUniforms {
            view_proj: ctx.camera.view_proj.to_cols_array_2d(),
            model: self.transform.matrix().to_cols_array_2d(),
            time: self.params.scalar("time")?,
            _pad: [0.0; 3],
        })
    }

    /// Draw the veil into the visible pass. No-op while hidden.
    pub fn render(&self, render_pass: &mut wgpu::RenderPass) {
        if self.hidden_for_depth_pass {
            return;
        }

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.uniform_bind, &[]);
        render_pass.set_bind_group(1, &self.texture_bind, &[]);
        render_pass.set_vertex_buffer(0, self.mesh.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.mesh.index_count, 0, 0..1);
    }
}

impl DepthMaskable for SprayVeil {
    fn set_hidden_for_depth_pass(&mut self, hidden: bool) {
        self.hidden_for_depth_pass = hidden;
    }

    fn hidden_for_depth_pass(&self) -> bool {
        self.hidden_for_depth_pass
    }
}
