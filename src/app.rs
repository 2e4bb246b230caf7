//! Window and frame-loop plumbing.
//!
//! [`run`] opens a window, builds the GPU context, hands a [`SetupContext`]
//! to the caller's setup closure to construct the scene, then drives the
//! per-frame callback. One frame callback executes per redraw; external
//! inputs, the depth capture, and the visible render all happen
//! synchronously inside it, which is what the orchestrator's ordering
//! guarantees rest on.

use std::sync::Arc;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::camera::Camera;
use crate::frame::Viewport;
use crate::gpu::GpuContext;
use crate::scene::LakeScene;

/// Window configuration.
pub struct AppConfig {
    pub title: String,
    /// Logical width in points.
    pub width: u32,
    /// Logical height in points.
    pub height: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Lagoon".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// Context handed to the setup closure.
pub struct SetupContext<'a> {
    pub gpu: &'a GpuContext,
    pub viewport: Viewport,
}

/// Context handed to the frame closure before each render.
///
/// This is where external per-frame inputs arrive: feed the tracked boat
/// transform via `tick.scene.track(..)`, move the camera, adjust parameters.
/// The scene renders right after the closure returns.
pub struct FrameTick<'a> {
    pub gpu: &'a GpuContext,
    pub scene: &'a mut LakeScene,
    pub camera: &'a mut Camera,
    /// Seconds since startup.
    pub time: f32,
    /// Seconds since the previous frame.
    pub dt: f32,
}

/// Run a lagoon application.
///
/// `setup` builds the scene once against the live GPU context and returns
/// the per-frame closure.
///
/// # Example
///
/// ```ignore
/// lagoon::run(AppConfig::new().title("Lake"), |ctx| {
///     let mut scene = LakeScene::new(ctx.gpu, &ctx.viewport, &desc).unwrap();
///     scene.add_prop(ctx.gpu, Mesh::cube(ctx.gpu), Transform::new(), WHITE, None);
///     (scene, move |tick: &mut FrameTick| {
///         tick.scene.track(Some(boat_pose(tick.time)));
///     })
/// });
/// ```
pub fn run<S, F>(config: AppConfig, setup: S)
where
    S: FnOnce(&SetupContext) -> (LakeScene, F) + 'static,
    F: FnMut(&mut FrameTick) + 'static,
{
    let event_loop = EventLoop::new().unwrap();
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = LagoonApp::Pending {
        config,
        setup: Some(Box::new(move |ctx| {
            let (scene, frame_fn) = setup(ctx);
            (scene, Box::new(frame_fn) as Box<dyn FnMut(&mut FrameTick)>)
        })),
    };

    event_loop.run_app(&mut app).unwrap();
}

type SetupFn = Box<dyn FnOnce(&SetupContext) -> (LakeScene, Box<dyn FnMut(&mut FrameTick)>)>;

enum LagoonApp {
    Pending {
        config: AppConfig,
        setup: Option<SetupFn>,
    },
    Running {
        window: Arc<Window>,
        gpu: GpuContext,
        scene: LakeScene,
        camera: Camera,
        viewport: Viewport,
        frame_fn: Box<dyn FnMut(&mut FrameTick)>,
        start_time: Instant,
        last_frame: Instant,
    },
}

impl ApplicationHandler for LagoonApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let LagoonApp::Pending { config, setup } = self {
            let window_attrs = WindowAttributes::default()
                .with_title(&config.title)
                .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));

            let window = Arc::new(event_loop.create_window(window_attrs).unwrap());
            let gpu = GpuContext::new(window.clone());

            let size = window.inner_size();
            let viewport =
                Viewport::from_physical(size.width, size.height, window.scale_factor() as f32);

            let setup_fn = setup.take().unwrap();
            let (scene, frame_fn) = setup_fn(&SetupContext {
                gpu: &gpu,
                viewport,
            });

            *self = LagoonApp::Running {
                window,
                gpu,
                scene,
                camera: Camera::new(),
                viewport,
                frame_fn,
                start_time: Instant::now(),
                last_frame: Instant::now(),
            };
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let LagoonApp::Running {
            window,
            gpu,
            scene,
            camera,
            viewport,
            frame_fn,
            start_time,
            last_frame,
        } = self
        else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                gpu.resize(size.width, size.height);
                *viewport =
                    Viewport::from_physical(size.width, size.height, viewport.scale_factor);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                let size = window.inner_size();
                *viewport =
                    Viewport::from_physical(size.width, size.height, scale_factor as f32);
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let time = start_time.elapsed().as_secs_f32();
                let dt = now.duration_since(*last_frame).as_secs_f32();
                *last_frame = now;

                let mut tick = FrameTick {
                    gpu: &*gpu,
                    scene: &mut *scene,
                    camera: &mut *camera,
                    time,
                    dt,
                };
                frame_fn(&mut tick);

                scene.render(gpu, camera, *viewport, dt);
                window.request_redraw();
            }
            _ => {}
        }
    }
}
