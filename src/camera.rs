//! Perspective camera with explicit clip planes.
//!
//! The water shader reconstructs view-space depth from the captured depth
//! buffer using the camera's near and far distances, so both are first-class
//! fields here rather than constants buried in a pass. The projection matrix
//! is cached and refreshed explicitly via [`Camera::update_projection`] each
//! frame before the depth pass runs; a projection that changes after the
//! capture would disagree with the depths already rasterized.

use glam::{Mat4, Vec3};

/// A look-at perspective camera.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    /// Camera position in world space.
    pub position: Vec3,
    /// Point the camera looks at.
    pub target: Vec3,
    /// Up direction.
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    /// Near clip distance.
    pub near: f32,
    /// Far clip distance.
    pub far: f32,
    proj: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 12.0, 30.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: std::f32::consts::FRAC_PI_3,
            near: 0.1,
            far: 500.0,
            proj: Mat4::IDENTITY,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn looking_at(mut self, target: Vec3) -> Self {
        self.target = target;
        self
    }

    pub fn with_fov(mut self, fov_degrees: f32) -> Self {
        self.fov = fov_degrees.to_radians();
        self
    }

    /// Set the near and far clip distances.
    pub fn with_clip(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    /// World-to-camera view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Recompute the cached projection matrix for the given aspect ratio.
    ///
    /// Must run before the depth pass that consumes it; the frame
    /// orchestrator calls this at the top of every frame.
    pub fn update_projection(&mut self, aspect: f32) {
        self.proj = Mat4::perspective_rh(self.fov, aspect, self.near, self.far);
    }

    /// The cached projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        self.proj
    }

    /// Combined view-projection matrix from the cached projection.
    pub fn view_proj(&self) -> Mat4 {
        self.proj * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_refresh_tracks_clip_planes() {
        let mut camera = Camera::new().with_clip(0.5, 250.0);
        camera.update_projection(16.0 / 9.0);

        // A point on the near plane projects to NDC z = 0 (wgpu convention),
        // a point on the far plane to z = 1.
        let near_clip = camera.projection_matrix() * glam::Vec4::new(0.0, 0.0, -0.5, 1.0);
        let far_clip = camera.projection_matrix() * glam::Vec4::new(0.0, 0.0, -250.0, 1.0);
        assert!((near_clip.z / near_clip.w).abs() < 1e-5);
        assert!((far_clip.z / far_clip.w - 1.0).abs() < 1e-5);
    }

    #[test]
    fn update_projection_replaces_stale_matrix() {
        let mut camera = Camera::new();
        camera.update_projection(1.0);
        let square = camera.projection_matrix();
        camera.update_projection(2.0);
        assert_ne!(square, camera.projection_matrix());
    }
}
