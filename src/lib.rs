//! # Lagoon
//!
//! **Depth-aware water rendering for wgpu.**
//!
//! A lake surface with a boat-shaped cutout that follows a moving rigid
//! body, a waterfall, and a spray veil, all shaded against a per-frame
//! depth capture of the surrounding scene. The crate's core is the frame
//! orchestration: every frame it hides the three water renderers, rasterizes
//! everything else through a packed-depth pass into an offscreen target,
//! publishes that texture to the water shader, restores visibility, and only
//! then renders the visible frame. No intermediate state is ever observable.
//!
//! ## Quick Start
//!
//! ```no_run
//! use lagoon::*;
//!
//! fn main() {
//!     run(AppConfig::new().title("Lake"), |ctx| {
//!         let noise = Texture::tileable_noise(ctx.gpu, 256, 7);
//!         let dudv = Texture::dudv(ctx.gpu, 256, 11);
//!         let falls = PlacementAsset::new(
//!             RawGeometry::plane(20.0),
//!             Transform::from_position(Vec3::new(0.0, 8.0, -90.0)),
//!         );
//!
//!         let desc = LakeSceneDesc {
//!             lake_size: 252.0,
//!             cutout_footprint: hull_footprint(12.0, 5.0),
//!             waterfall: &falls,
//!             veil_size: (22.0, 6.0),
//!             noise: &noise,
//!             dudv: &dudv,
//!         };
//!         let mut scene = LakeScene::new(ctx.gpu, &ctx.viewport, &desc).unwrap();
//!         scene.add_prop(
//!             ctx.gpu,
//!             Mesh::cube(ctx.gpu),
//!             Transform::new().uniform_scale(8.0),
//!             [1.0; 4],
//!             None,
//!         );
//!
//!         (scene, move |tick: &mut FrameTick| {
//!             // Feed the tracked boat pose each frame.
//!             let angle = tick.time * 0.2;
//!             tick.scene.track(Some(
//!                 Transform::from_position(Vec3::new(angle.cos() * 30.0, 0.0, angle.sin() * 30.0))
//!                     .rotation(Quat::from_rotation_y(-angle)),
//!             ));
//!         })
//!     });
//! }
//! ```
//!
//! ## Guarantees
//!
//! - The depth capture is written exactly once per frame, before the water
//!   shader samples it, within a single queue submission.
//! - The three visibility flags are restored on every exit path out of the
//!   capture scope, including unwinds.
//! - A mid-resize frame skips only the capture and reuses the previous one;
//!   the shader never sees an unbound or zero-sized texture.

mod app;
mod camera;
mod capture;
mod csg;
mod depth_pass;
mod frame;
mod geometry;
mod gpu;
mod mesh;
mod params;
mod scene;
mod scene_pass;
mod texture;
mod veil;
mod water;
mod waterfall;

pub use app::{AppConfig, FrameTick, SetupContext, run};
pub use camera::Camera;
pub use capture::CaptureTarget;
pub use csg::{CutoutTracker, hull_footprint};
pub use depth_pass::{DepthMaskable, DepthPass, MaskGuard};
pub use frame::{CameraState, FlowClock, FrameContext, Viewport};
pub use geometry::{AssetError, PlacementAsset, RawGeometry};
pub use gpu::GpuContext;
pub use mesh::{Mesh, Transform, Vertex3d};
pub use params::{ParamError, ParamValue, ShaderParams};
pub use scene::{LakeScene, LakeSceneDesc};
pub use scene_pass::{Prop, PropId, ScenePass};
pub use texture::Texture;
pub use veil::SprayVeil;
pub use water::{WATER_PARAMS, WaterSurface};
pub use waterfall::{WATERFALL_PARAMS, Waterfall};

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
