//! Per-frame context and time accumulation.
//!
//! Each rendered frame, [`LakeScene`](crate::LakeScene) builds one
//! [`FrameContext`] from the current camera, viewport, and frame delta, and
//! every shader-driven renderer refreshes its parameters from it. Nothing in
//! this module is persisted across frames except the [`FlowClock`]s, which
//! exist precisely to accumulate time.

use crate::camera::Camera;

/// Logical window size plus the monitor's pixel density.
///
/// The offscreen depth capture and the water shader's `resolution` parameter
/// both work in physical pixels (logical size × scale factor), so a viewport
/// change and a monitor change are the same event from their point of view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Logical width in points.
    pub width: f32,
    /// Logical height in points.
    pub height: f32,
    /// Pixel density scale factor (1.0 on standard-density displays).
    pub scale_factor: f32,
}

impl Viewport {
    /// Create a viewport from a logical size and scale factor.
    pub fn new(width: f32, height: f32, scale_factor: f32) -> Self {
        Self {
            width,
            height,
            scale_factor,
        }
    }

    /// Create a viewport from a physical size, deriving the logical size.
    pub fn from_physical(width: u32, height: u32, scale_factor: f32) -> Self {
        Self {
            width: width as f32 / scale_factor,
            height: height as f32 / scale_factor,
            scale_factor,
        }
    }

    /// Physical pixel dimensions, rounded to whole pixels.
    ///
    /// A minimized window yields `(0, 0)`; callers allocating GPU surfaces
    /// must treat that as "no target available", not as a 0×0 allocation.
    pub fn physical_size(&self) -> (u32, u32) {
        (
            (self.width * self.scale_factor).round() as u32,
            (self.height * self.scale_factor).round() as u32,
        )
    }

    /// Whether the viewport currently has a renderable area.
    pub fn is_renderable(&self) -> bool {
        let (w, h) = self.physical_size();
        w > 0 && h > 0
    }
}

/// Camera values the water shaders consume, snapshotted once per frame.
#[derive(Clone, Copy, Debug)]
pub struct CameraState {
    /// Near clip distance.
    pub near: f32,
    /// Far clip distance.
    pub far: f32,
    /// Combined view-projection matrix for the frame.
    pub view_proj: glam::Mat4,
    /// Camera position in world space.
    pub position: glam::Vec3,
}

/// Ephemeral context for a single rendered frame.
///
/// Produced once per frame, consumed by every renderer's `update`, dropped at
/// frame end.
#[derive(Clone, Copy, Debug)]
pub struct FrameContext {
    /// Seconds elapsed since the previous frame.
    pub dt: f32,
    /// Camera snapshot, taken after the projection refresh for this frame.
    pub camera: CameraState,
    /// Current viewport.
    pub viewport: Viewport,
}

impl FrameContext {
    /// Build the context for this frame.
    ///
    /// The camera's projection must already be refreshed for the current
    /// aspect ratio; the snapshot taken here is what both the depth pass and
    /// the water shader see, so a stale projection would disagree with the
    /// captured depth.
    pub fn new(dt: f32, camera: &Camera, viewport: Viewport) -> Self {
        Self {
            dt,
            camera: CameraState {
                near: camera.near,
                far: camera.far,
                view_proj: camera.view_proj(),
                position: camera.position,
            },
            viewport,
        }
    }
}

/// An accumulating time scalar advanced by `dt / divisor` per frame.
///
/// The lake advances at `dt / 6` and the waterfall at `dt / 3`, which is what
/// makes the two surfaces visibly flow at different rates: over the same wall
/// time the waterfall accumulates exactly twice what the lake does.
#[derive(Clone, Copy, Debug)]
pub struct FlowClock {
    value: f32,
    divisor: f32,
}

impl FlowClock {
    /// Create a clock that advances at `dt / divisor`.
    pub fn new(divisor: f32) -> Self {
        Self {
            value: 0.0,
            divisor,
        }
    }

    /// Advance by one frame delta and return the new accumulated value.
    pub fn advance(&mut self, dt: f32) -> f32 {
        self.value += dt / self.divisor;
        self.value
    }

    /// The accumulated value without advancing.
    pub fn value(&self) -> f32 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physical_size_scales_and_rounds() {
        let vp = Viewport::new(800.0, 600.0, 2.0);
        assert_eq!(vp.physical_size(), (1600, 1200));

        // Fractional scale factors round to whole pixels.
        let vp = Viewport::new(1024.0, 768.0, 1.25);
        assert_eq!(vp.physical_size(), (1280, 960));
    }

    #[test]
    fn zero_viewport_is_not_renderable() {
        let vp = Viewport::new(0.0, 600.0, 2.0);
        assert!(!vp.is_renderable());
        assert!(Viewport::new(800.0, 600.0, 1.0).is_renderable());
    }

    #[test]
    fn from_physical_round_trips() {
        let vp = Viewport::from_physical(1600, 1200, 2.0);
        assert_eq!(vp.physical_size(), (1600, 1200));
        assert!((vp.width - 800.0).abs() < 1e-6);
    }

    #[test]
    fn flow_clock_strictly_increases() {
        let mut clock = FlowClock::new(6.0);
        let mut prev = clock.value();
        for _ in 0..100 {
            let next = clock.advance(0.016);
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn waterfall_clock_runs_twice_as_fast_as_lake() {
        let mut lake = FlowClock::new(6.0);
        let mut falls = FlowClock::new(3.0);
        // Uneven frame pacing; the ratio only depends on total elapsed time.
        for dt in [0.016, 0.033, 0.008, 0.021, 0.016] {
            lake.advance(dt);
            falls.advance(dt);
        }
        assert!((falls.value() - 2.0 * lake.value()).abs() < 1e-6);
    }
}
