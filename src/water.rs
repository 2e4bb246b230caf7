//! The lake surface renderer.
//!
//! Owns the CSG cutout tracker, the lake mesh rebuilt from its combined
//! geometry, and the water shader's parameter set. Every frame the frame
//! orchestrator publishes the fresh depth capture here, and `update`
//! refreshes every parameter the shader consumes: time (advanced at Δt/6),
//! camera near/far, physical resolution, and the distortion map. Nothing is
//! allowed to go stale; a projection change reaches the shader the same
//! frame it reaches the depth pass.

use crate::csg::CutoutTracker;
use crate::depth_pass::DepthMaskable;
use crate::frame::{FlowClock, FrameContext};
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Transform, Vertex3d};
use crate::params::{ParamError, ShaderParams};
use crate::scene_pass::SCENE_DEPTH_FORMAT;
use crate::texture::Texture;
use glam::{Vec2, Vec3};

/// Parameters the water shader consumes; all must be bound before setup
/// completes.
pub const WATER_PARAMS: &[&str] = &[
    "depth_texture",
    "dudv_map",
    "water_color",
    "foam_color",
    "resolution",
    "time",
    "camera_near",
    "camera_far",
];

/// The lake's time divisor: Δt/6, a deliberate slow-motion factor.
const LAKE_FLOW_DIVISOR: f32 = 6.0;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct WaterUniforms {
    view_proj: [[f32; 4]; 4],
    water_color: [f32; 3],
    _pad0: f32,
    foam_color: [f32; 3],
    _pad1: f32,
    resolution: [f32; 2],
    time: f32,
    camera_near: f32,
    camera_far: f32,
    _pad2: [f32; 3],
}

/// Renders the lake plane with the boat cutout and depth-aware shading.
pub struct WaterSurface {
    tracker: CutoutTracker,
    mesh: Mesh,
    clock: FlowClock,
    params: ShaderParams,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind: wgpu::BindGroup,
    texture_layout: wgpu::BindGroupLayout,
    texture_bind: wgpu::BindGroup,
    depth_sampler: wgpu::Sampler,
    dudv_sampler: wgpu::Sampler,
    hidden_for_depth_pass: bool,
}

impl WaterSurface {
    /// Build the lake over a `plane_size` plane with the given cutout
    /// footprint, distorted by `dudv`.
    ///
    /// The depth capture parameter starts bound to a 1×1 far-plane texture:
    /// a frame rendered before the first capture treats the whole lake as
    /// unoccluded instead of sampling nothing.
    pub fn new(
        gpu: &GpuContext,
        plane_size: f32,
        footprint: Vec<Vec2>,
        dudv: &Texture,
    ) -> Result<Self, ParamError> {
        let device = &gpu.device;

        let tracker = CutoutTracker::new(plane_size, footprint);
        let mesh = tracker.combined().upload(gpu);

        // White packs to far-plane depth; see depth.wgsl.
        let far_plane = Texture::from_rgba(
            gpu,
            &[255, 255, 255, 255],
            1,
            1,
            wgpu::FilterMode::Nearest,
            "Far-Plane Depth Default",
        );

        let mut params = ShaderParams::new();
        params.set_texture("depth_texture", far_plane.view.clone());
        params.set_texture("dudv_map", dudv.view.clone());
        params.set_color("water_color", Vec3::new(0.05, 0.45, 0.55));
        params.set_color("foam_color", Vec3::ONE);
        params.set_vec2("resolution", Vec2::ONE);
        params.set_scalar("time", 0.0);
        params.set_scalar("camera_near", 0.1);
        params.set_scalar("camera_far", 500.0);
        params.require(WATER_PARAMS)?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Water Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/water.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Water Uniforms"),
            size: std::mem::size_of::<WaterUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Water Uniform Layout"),
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
            label: Some("Water Uniform Bind Group"),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Water Texture Layout"),
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

        // Packed depth must be read texel-exact; the dudv map wants the
        // same smooth repeat sampling its own texture carries.
        let depth_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Depth Capture Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let dudv_sampler = dudv.sampler.clone();

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Water Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Water Pipeline"),
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
                // The surface is visible from below when the camera dips.
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

        let texture_bind = Self::build_texture_bind(
            gpu,
            &texture_layout,
            &params,
            &depth_sampler,
            &dudv_sampler,
        )?;

        Ok(Self {
            tracker,
            mesh,
            clock: FlowClock::new(LAKE_FLOW_DIVISOR),
            params,
            pipeline,
            uniform_buffer,
            uniform_bind,
            texture_layout,
            texture_bind,
            depth_sampler,
            dudv_sampler,
            hidden_for_depth_pass: false,
        })
    }

    fn build_texture_bind(
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        params: &ShaderParams,
        depth_sampler: &wgpu::Sampler,
        dudv_sampler: &wgpu::Sampler,
    ) -> Result<wgpu::BindGroup, ParamError> {
        Ok(gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Water Texture Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(params.texture("depth_texture")?),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(depth_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(params.texture("dudv_map")?),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(dudv_sampler),
                },
            ],
        }))
    }

    /// Re-sync the cutout to the tracked transform and, if it moved,
    /// re-upload the lake mesh.
    ///
    /// Must run before this frame's depth pass: the cutout shape affects
    /// both the capture and the visible render.
    pub fn sync_cutout(&mut self, gpu: &GpuContext, tracked: Option<Transform>) {
        if self.tracker.sync(tracked) {
            self.mesh = self.tracker.combined().upload(gpu);
        }
    }

    /// Publish a freshly captured depth texture to the parameter set.
    pub fn set_depth_capture(&mut self, gpu: &GpuContext, view: &wgpu::TextureView) {
        self.params.set_texture("depth_texture", view.clone());
        match Self::build_texture_bind(
            gpu,
            &self.texture_layout,
            &self.params,
            &self.depth_sampler,
            &self.dudv_sampler,
        ) {
            Ok(bind) => self.texture_bind = bind,
            Err(e) => log::error!("water depth publish failed: {e}"),
        }
    }

    /// Refresh every shader parameter for this frame and upload uniforms.
    pub fn update(&mut self, gpu: &GpuContext, ctx: &FrameContext) {
        let time = self.clock.advance(ctx.dt);
        let (pw, ph) = ctx.viewport.physical_size();

        self.params.set_scalar("time", time);
        self.params.set_scalar("camera_near", ctx.camera.near);
        self.params.set_scalar("camera_far", ctx.camera.far);
        self.params
            .set_vec2("resolution", Vec2::new(pw as f32, ph as f32));

        match self.pack_uniforms(ctx) {
            Ok(uniforms) => {
                gpu.queue
                    .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));
            }
            // Construction validated the set, so this is unreachable unless a
            // caller rebinds a parameter to the wrong kind; the frame keeps
            // the previous uniforms rather than dying.
            Err(e) => log::error!("water parameters misconfigured: {e}"),
        }
    }

    fn pack_uniforms(&self, ctx: &FrameContext) -> Result<WaterUniforms, ParamError> {
        Ok(WaterUniforms {
            view_proj: ctx.camera.view_proj.to_cols_array_2d(),
            water_color: self.params.color("water_color")?.to_array(),
            _pad0: 0.0,
            foam_color: self.params.color("foam_color")?.to_array(),
            _pad1: 0.0,
            resolution: self.params.vec2("resolution")?.to_array(),
            time: self.params.scalar("time")?,
            camera_near: self.params.scalar("camera_near")?,
            camera_far: self.params.scalar("camera_far")?,
            _pad2: [0.0; 3],
        })
    }

    /// Draw the lake into the visible pass. No-op while hidden.
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

    /// The shader parameter set, for adjusting colors at setup.
    pub fn params_mut(&mut self) -> &mut ShaderParams {
        &mut self.params
    }

    /// The accumulated water time (Δt/6 per frame).
    pub fn flow_time(&self) -> f32 {
        self.clock.value()
    }

    /// The cutout tracker, mainly for inspecting the synced transform.
    pub fn tracker(&self) -> &CutoutTracker {
        &self.tracker
    }
}

impl DepthMaskable for WaterSurface {
    fn set_hidden_for_depth_pass(&mut self, hidden: bool) {
        self.hidden_for_depth_pass = hidden;
    }

    fn hidden_for_depth_pass(&self) -> bool {
        self.hidden_for_depth_pass
    }
}
