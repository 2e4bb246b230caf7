//! The waterfall renderer.
//!
//! The mesh and its placement come from an externally authored
//! [`PlacementAsset`], read once at setup. The shader consumes the shared
//! noise and dudv maps, four gradient colors forming the dark and light
//! shading bands, a foam color, and a time scalar advanced at Δt/3. That is
//! twice the lake's rate, which is what makes the fall visibly outrun the
//! water below it.

use crate::depth_pass::DepthMaskable;
use crate::frame::{FlowClock, FrameContext};
use crate::geometry::PlacementAsset;
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Transform, Vertex3d};
use crate::params::{ParamError, ShaderParams};
use crate::scene_pass::SCENE_DEPTH_FORMAT;
use crate::texture::Texture;
use glam::Vec3;

/// Parameters the waterfall shader consumes.
pub const WATERFALL_PARAMS: &[&str] = &[
    "noise_map",
    "dudv_map",
    "top_dark_color",
    "bottom_dark_color",
    "top_light_color",
    "bottom_light_color",
    "foam_color",
    "time",
];

/// The waterfall's time divisor: Δt/3.
const FALLS_FLOW_DIVISOR: f32 = 3.0;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct WaterfallUniforms {
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    top_dark_color: [f32; 3],
    _pad0: f32,
    bottom_dark_color: [f32; 3],
    _pad1: f32,
    top_light_color: [f32; 3],
    _pad2: f32,
    bottom_light_color: [f32; 3],
    _pad3: f32,
    foam_color: [f32; 3],
    time: f32,
}

/// Renders the waterfall sheet.
pub struct Waterfall {
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

impl Waterfall {
    /// Build the waterfall from its placement asset and the two shared maps.
    pub fn new(
        gpu: &GpuContext,
        asset: &PlacementAsset,
        noise: &Texture,
        dudv: &Texture,
    ) -> Result<Self, ParamError> {
        let device = &gpu.device;

        let mesh = asset.geometry.upload(gpu);

        let mut params = ShaderParams::new();
        params.set_texture("noise_map", noise.view.clone());
        params.set_texture("dudv_map", dudv.view.clone());
        // Default palette: deep teal bands under pale green-white highlights.
        params.set_color("top_dark_color", Vec3::new(0.306, 0.478, 0.443));
        params.set_color("bottom_dark_color", Vec3::new(0.055, 0.459, 0.384));
        params.set_color("top_light_color", Vec3::new(0.690, 0.969, 0.914));
        params.set_color("bottom_light_color", Vec3::new(0.078, 0.776, 0.647));
        params.set_color("foam_color", Vec3::ONE);
        params.set_scalar("time", 0.0);
        params.require(WATERFALL_PARAMS)?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Waterfall Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/waterfall.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Waterfall Uniforms"),
            size: std::mem::size_of::<WaterfallUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Waterfall Uniform Layout"),
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
            label: Some("Waterfall Uniform Bind Group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Waterfall Texture Layout"),
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
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let texture_bind = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Waterfall Texture Bind Group"),
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
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(params.texture("dudv_map")?),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&dudv.sampler),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Waterfall Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Waterfall Pipeline"),
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
                // The sheet reads from both sides.
                cull_mode: None,
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: SCENE_DEPTH_FORMAT,
                depth_write_enabled: true,
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
            transform: asset.transform,
            clock: FlowClock::new(FALLS_FLOW_DIVISOR),
            params,
            pipeline,
            uniform_buffer,
            uniform_bind,
            texture_bind,
            hidden_for_depth_pass: false,
        })
    }

    /// Advance the flow clock and upload this frame's uniforms.
    pub fn update(&mut self, gpu: &GpuContext, ctx: &FrameContext) {
        let time = self.clock.advance(ctx.dt);
        self.params.set_scalar("time", time);

        match self.pack_uniforms(ctx) {
            Ok(uniforms) => {
                gpu.queue
                    .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));
            }
            Err(e) => log::error!("waterfall parameters misconfigured: {e}"),
        }
    }

    fn pack_uniforms(&self, ctx: &FrameContext) -> Result<WaterfallUniforms, ParamError> {
        Ok(WaterfallUniforms {
            view_proj: ctx.camera.view_proj.to_cols_array_2d(),
            model: self.transform.matrix().to_cols_array_2d(),
            top_dark_color: self.params.color("top_dark_color")?.to_array(),
            _pad0: 0.0,
            bottom_dark_color: self.params.color("bottom_dark_color")?.to_array(),
            _pad1: 0.0,
            top_light_color: self.params.color("top_light_color")?.to_array(),
            _pad2: 0.0,
            bottom_light_color: self.params.color("bottom_light_color")?.to_array(),
            _pad3: 0.0,
            foam_color: self.params.color("foam_color")?.to_array(),
            time: self.params.scalar("time")?,
        })
    }

    /// Draw the waterfall into the visible pass. No-op while hidden.
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

    /// Where the waterfall sits; the spray veil mirrors this.
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// The shader parameter set, for adjusting the palette at setup.
    pub fn params_mut(&mut self) -> &mut ShaderParams {
        &mut self.params
    }

    /// The accumulated waterfall time (Δt/3 per frame).
    pub fn flow_time(&self) -> f32 {
        self.clock.value()
    }
}

impl DepthMaskable for Waterfall {
    fn set_hidden_for_depth_pass(&mut self, hidden: bool) {
        self.hidden_for_depth_pass = hidden;
    }

    fn hidden_for_depth_pass(&self) -> bool {
        self.hidden_for_depth_pass
    }
}
