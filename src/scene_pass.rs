//! Forward rendering of ordinary scene props.
//!
//! Everything in the scene that is not water (terrain, the boat, rocks)
//! is a [`Prop`]: a mesh, a transform, a tint, and an optional texture.
//! [`ScenePass`] owns the forward pipeline and the prop registry; the same
//! registry is what the depth pre-pass rasterizes, which is how "every
//! visible mesh" ends up in the capture without any scene-wide material
//! override.
//!
//! Each prop carries its own model uniform buffer and bind group. All draws
//! in a wgpu render pass observe a buffer's final contents for the frame, so
//! a single rewritten model buffer would render every prop at the last
//! prop's transform.

use crate::camera::Camera;
use crate::frame::FrameContext;
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, Transform, Vertex3d};
use crate::texture::Texture;

/// Depth format shared by the visible pass and the water pipelines.
pub const SCENE_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Camera uniforms shared by the scene and depth pipelines (group 0).
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniforms {
    /// Combined view-projection matrix.
    pub view_proj: [[f32; 4]; 4],
    /// Camera position in world space.
    pub camera_pos: [f32; 3],
    /// Padding for 16-byte alignment.
    pub _pad: f32,
}

/// Per-prop uniforms (group 1).
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniforms {
    /// Model matrix.
    pub model: [[f32; 4]; 4],
    /// Inverse transpose of the model matrix.
    pub normal_matrix: [[f32; 4]; 4],
    /// RGBA tint.
    pub color: [f32; 4],
}

/// Handle to a registered prop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropId(usize);

/// A mesh placed in the scene with its GPU bindings.
pub struct Prop {
    pub(crate) mesh: Mesh,
    pub(crate) transform: Transform,
    color: [f32; 4],
    model_buffer: wgpu::Buffer,
    /// Group-1 bind group; shared with the depth pass, which is built
    /// against the same layout.
    pub(crate) model_bind: wgpu::BindGroup,
    texture_bind: wgpu::BindGroup,
}

/// Forward pass for props, with the prop registry the depth pass reuses.
pub struct ScenePass {
    pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    pub(crate) camera_bind: wgpu::BindGroup,
    pub(crate) camera_layout: wgpu::BindGroupLayout,
    pub(crate) model_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    default_texture: Texture,
    /// Depth buffer for the visible pass, sized to the surface.
    pub(crate) depth_view: wgpu::TextureView,
    depth_size: (u32, u32),
    props: Vec<Prop>,
}

impl ScenePass {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Prop Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/prop.wgsl").into()),
        });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Camera Uniforms"),
            size: std::mem::size_of::<CameraUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Camera Layout"),
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

        let camera_bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Camera Bind Group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Prop Model Layout"),
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

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Prop Texture Layout"),
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

        let default_texture = Texture::from_rgba(
            gpu,
            &[255, 255, 255, 255],
            1,
            1,
            wgpu::FilterMode::Linear,
            "Default White Texture",
        );

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Prop Pipeline Layout"),
            bind_group_layouts: &[&camera_layout, &model_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Prop Pipeline"),
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
                cull_mode: Some(wgpu::Face::Back),
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

        let depth_view = Self::create_depth_texture(gpu);

        Self {
            pipeline,
            camera_buffer,
            camera_bind,
            camera_layout,
            model_layout,
            texture_layout,
            default_texture,
            depth_view,
            depth_size: (gpu.width(), gpu.height()),
            props: Vec::new(),
        }
    }

    fn create_depth_texture(gpu: &GpuContext) -> wgpu::TextureView {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Scene Depth Texture"),
            size: wgpu::Extent3d {
                width: gpu.width(),
                height: gpu.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SCENE_DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// Recreate the visible pass's depth buffer if the surface was resized.
    pub fn ensure_depth_size(&mut self, gpu: &GpuContext) {
        if self.depth_size != (gpu.width(), gpu.height()) {
            self.depth_view = Self::create_depth_texture(gpu);
            self.depth_size = (gpu.width(), gpu.height());
        }
    }

    /// Register a prop and upload its uniforms.
    pub fn add_prop(
        &mut self,
        gpu: &GpuContext,
        mesh: Mesh,
        transform: Transform,
        color: [f32; 4],
        texture: Option<&Texture>,
    ) -> PropId {
        let model_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Prop Model Uniforms"),
            size: std::mem::size_of::<ModelUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let model_bind = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Prop Model Bind Group"),
            layout: &self.model_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: model_buffer.as_entire_binding(),
            }],
        });

        let texture = texture.unwrap_or(&self.default_texture);
        let texture_bind = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Prop Texture Bind Group"),
            layout: &self.texture_layout,
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
        });

        let prop = Prop {
            mesh,
            transform,
            color,
            model_buffer,
            model_bind,
            texture_bind,
        };
        Self::upload_model(gpu, &prop);

        let id = PropId(self.props.len());
        self.props.push(prop);
        id
    }

    /// Move a prop; its uniforms are re-uploaded immediately.
    pub fn set_transform(&mut self, gpu: &GpuContext, id: PropId, transform: Transform) {
        let prop = &mut self.props[id.0];
        prop.transform = transform;
        Self::upload_model(gpu, prop);
    }

    /// A registered prop's current transform.
    pub fn transform(&self, id: PropId) -> Transform {
        self.props[id.0].transform
    }

    fn upload_model(gpu: &GpuContext, prop: &Prop) {
        let model = prop.transform.matrix();
        let uniforms = ModelUniforms {
            model: model.to_cols_array_2d(),
            normal_matrix: model.inverse().transpose().to_cols_array_2d(),
            color: prop.color,
        };
        gpu.queue
            .write_buffer(&prop.model_buffer, 0, bytemuck::cast_slice(&[uniforms]));
    }

    /// Upload this frame's camera uniforms.
    ///
    /// The same bind group serves the depth pre-pass, so this must run before
    /// either pass is encoded.
    pub fn update_camera(&self, gpu: &GpuContext, camera: &Camera, ctx: &FrameContext) {
        let uniforms = CameraUniforms {
            view_proj: ctx.camera.view_proj.to_cols_array_2d(),
            camera_pos: camera.position.to_array(),
            _pad: 0.0,
        };
        gpu.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[uniforms]));
    }

    /// All registered props, in registration order.
    pub fn props(&self) -> &[Prop] {
        &self.props
    }

    /// Draw every prop into an already-begun render pass.
    pub fn render(&self, render_pass: &mut wgpu::RenderPass) {
        if self.props.is_empty() {
            return;
        }

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.camera_bind, &[]);

        for prop in &self.props {
            render_pass.set_bind_group(1, &prop.model_bind, &[]);
            render_pass.set_bind_group(2, &prop.texture_bind, &[]);
            render_pass.set_vertex_buffer(0, prop.mesh.vertex_buffer.slice(..));
            render_pass
                .set_index_buffer(prop.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..prop.mesh.index_count, 0, 0..1);
        }
    }
}
