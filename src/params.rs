//! Named shader parameters with bind-time validation.
//!
//! Every shader-driven renderer owns a [`ShaderParams`] map and packs its
//! uniform block from it each frame. A parameter a shader consumes must be
//! bound before the pack runs; reading an unbound name (or a name bound to
//! the wrong kind of value) is a configuration error that fails renderer
//! setup, never a silently defaulted value. Parameters that legitimately
//! arrive late, like the depth capture before the first pass has run, are
//! pre-bound to a defined default at construction instead.

use glam::{Vec2, Vec3};
use std::collections::HashMap;
use thiserror::Error;

/// A value bound to a shader parameter name.
#[derive(Clone, Debug)]
pub enum ParamValue {
    /// A single float.
    Scalar(f32),
    /// A 2D vector (e.g. viewport resolution).
    Vec2(Vec2),
    /// An RGB color.
    Color(Vec3),
    /// A texture reference. Views are internally ref-counted, so this shares
    /// rather than owns the texture.
    Texture(wgpu::TextureView),
}

impl ParamValue {
    fn kind(&self) -> &'static str {
        match self {
            ParamValue::Scalar(_) => "scalar",
            ParamValue::Vec2(_) => "vec2",
            ParamValue::Color(_) => "color",
            ParamValue::Texture(_) => "texture",
        }
    }
}

/// Errors from reading the parameter set.
#[derive(Debug, Error)]
pub enum ParamError {
    #[error("shader parameter `{0}` is not bound")]
    Unbound(&'static str),
    #[error("shader parameter `{name}` is a {found}, expected {expected}")]
    WrongKind {
        name: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

/// A name → value map for one shader instance.
#[derive(Clone, Debug, Default)]
pub struct ShaderParams {
    values: HashMap<&'static str, ParamValue>,
}

impl ShaderParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind or rebind a parameter.
    pub fn set(&mut self, name: &'static str, value: ParamValue) {
        self.values.insert(name, value);
    }

    pub fn set_scalar(&mut self, name: &'static str, value: f32) {
        self.set(name, ParamValue::Scalar(value));
    }

    pub fn set_vec2(&mut self, name: &'static str, value: Vec2) {
        self.set(name, ParamValue::Vec2(value));
    }

    pub fn set_color(&mut self, name: &'static str, value: Vec3) {
        self.set(name, ParamValue::Color(value));
    }

    pub fn set_texture(&mut self, name: &'static str, view: wgpu::TextureView) {
        self.set(name, ParamValue::Texture(view));
    }

    /// Whether `name` has any binding.
    pub fn is_bound(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    fn get(&self, name: &'static str) -> Result<&ParamValue, ParamError> {
        self.values.get(name).ok_or(ParamError::Unbound(name))
    }

    pub fn scalar(&self, name: &'static str) -> Result<f32, ParamError> {
        match self.get(name)? {
            ParamValue::Scalar(v) => Ok(*v),
            other => Err(ParamError::WrongKind {
                name,
                expected: "scalar",
                found: other.kind(),
            }),
        }
    }

    pub fn vec2(&self, name: &'static str) -> Result<Vec2, ParamError> {
        match self.get(name)? {
            ParamValue::Vec2(v) => Ok(*v),
            other => Err(ParamError::WrongKind {
                name,
                expected: "vec2",
                found: other.kind(),
            }),
        }
    }

    pub fn color(&self, name: &'static str) -> Result<Vec3, ParamError> {
        match self.get(name)? {
            ParamValue::Color(v) => Ok(*v),
            other => Err(ParamError::WrongKind {
                name,
                expected: "color",
                found: other.kind(),
            }),
        }
    }

    pub fn texture(&self, name: &'static str) -> Result<&wgpu::TextureView, ParamError> {
        match self.get(name)? {
            ParamValue::Texture(v) => Ok(v),
            other => Err(ParamError::WrongKind {
                name,
                expected: "texture",
                found: other.kind(),
            }),
        }
    }

    /// Check that every name in `required` is bound.
    ///
    /// Renderers call this once at construction so a missing parameter fails
    /// setup with the parameter's name instead of surfacing mid-frame.
    pub fn require(&self, required: &[&'static str]) -> Result<(), ParamError> {
        for &name in required {
            if !self.is_bound(name) {
                return Err(ParamError::Unbound(name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_values_round_trip() {
        let mut params = ShaderParams::new();
        params.set_scalar("time", 1.5);
        params.set_vec2("resolution", Vec2::new(1920.0, 1080.0));
        params.set_color("foam_color", Vec3::ONE);

        assert_eq!(params.scalar("time").unwrap(), 1.5);
        assert_eq!(
            params.vec2("resolution").unwrap(),
            Vec2::new(1920.0, 1080.0)
        );
        assert_eq!(params.color("foam_color").unwrap(), Vec3::ONE);
    }

    #[test]
    fn unbound_read_names_the_parameter() {
        let params = ShaderParams::new();
        let err = params.scalar("camera_near").unwrap_err();
        assert!(matches!(err, ParamError::Unbound("camera_near")));
    }

    #[test]
    fn kind_mismatch_is_an_error() {
        let mut params = ShaderParams::new();
        params.set_scalar("resolution", 4.0);
        let err = params.vec2("resolution").unwrap_err();
        assert!(matches!(
            err,
            ParamError::WrongKind {
                name: "resolution",
                expected: "vec2",
                ..
            }
        ));
    }

    #[test]
    fn require_reports_the_first_missing_name() {
        let mut params = ShaderParams::new();
        params.set_scalar("time", 0.0);
        let err = params.require(&["time", "camera_far"]).unwrap_err();
        assert!(matches!(err, ParamError::Unbound("camera_far")));
        params.set_scalar("camera_far", 500.0);
        assert!(params.require(&["time", "camera_far"]).is_ok());
    }

    #[test]
    fn rebinding_replaces_the_value() {
        let mut params = ShaderParams::new();
        params.set_scalar("time", 1.0);
        params.set_scalar("time", 2.0);
        assert_eq!(params.scalar("time").unwrap(), 2.0);
    }
}
