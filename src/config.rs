//! Runtime configuration for rendering.

use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Engine selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EngineMode {
    /// Interpreter only
    Off,
    /// Always JIT; error if unsupported on this platform
    On,
    /// JIT when supported, interpreter otherwise
    #[default]
    Auto,
}

/// Whether the JIT backend exists in this build.
pub fn jit_supported() -> bool {
    cfg!(all(feature = "jit", target_arch = "x86_64", unix))
}

/// Timings output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingsFormat {
    Human,
    Json,
}

/// Render configuration.
///
/// Defaults reproduce the classic frame: 1600x900, 256 iterations, the view
/// spanning [-1.6, 1.6] x [-0.9, 0.9], escape when register `b` leaves the
/// circle of radius 2.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub width: usize,
    pub height: usize,
    /// Iteration cap per pixel.
    pub max_iter: u32,
    /// Half-extent of the view along the real axis.
    pub x_scale: f64,
    /// Half-extent of the view along the imaginary axis.
    pub y_scale: f64,
    /// Squared-magnitude escape threshold.
    pub escape: f64,
    /// Register whose magnitude the escape test watches.
    pub escape_register: u8,
    /// Size of the register file.
    pub register_count: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1600,
            height: 900,
            max_iter: 256,
            x_scale: 1.6,
            y_scale: 0.9,
            escape: 4.0,
            escape_register: 1,
            register_count: 4,
        }
    }
}

impl RenderConfig {
    /// Plane coordinate seeded into register 0 for pixel (x, y).
    pub fn plane_point(&self, x: usize, y: usize) -> crate::value::Complex {
        crate::value::Complex::new(
            2.0 * self.x_scale * (x as f64 / self.width as f64 - 0.5),
            2.0 * self.y_scale * (y as f64 / self.height as f64 - 0.5),
        )
    }
}

/// Scene file (TOML): a program plus overrides for the render
/// configuration.
///
/// ```toml
/// program = "*bb+ab"
/// width = 800
/// height = 450
/// max_iter = 128
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scene {
    pub program: Option<String>,
    pub width: Option<usize>,
    pub height: Option<usize>,
    pub max_iter: Option<u32>,
    pub x_scale: Option<f64>,
    pub y_scale: Option<f64>,
    pub escape: Option<f64>,
    pub escape_register: Option<u8>,
    pub registers: Option<usize>,
}

impl Scene {
    /// Load a scene from a TOML file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse {}: {}", path.display(), e))
    }

    /// Apply the scene's overrides onto `config`.
    pub fn apply(&self, config: &mut RenderConfig) {
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(max_iter) = self.max_iter {
            config.max_iter = max_iter;
        }
        if let Some(x_scale) = self.x_scale {
            config.x_scale = x_scale;
        }
        if let Some(y_scale) = self.y_scale {
            config.y_scale = y_scale;
        }
        if let Some(escape) = self.escape {
            config.escape = escape;
        }
        if let Some(escape_register) = self.escape_register {
            config.escape_register = escape_register;
        }
        if let Some(registers) = self.registers {
            config.register_count = registers;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_frame() {
        let config = RenderConfig::default();
        assert_eq!(config.width, 1600);
        assert_eq!(config.height, 900);
        assert_eq!(config.max_iter, 256);
        assert_eq!(config.escape, 4.0);
        assert_eq!(config.escape_register, 1);
        assert_eq!(config.register_count, 4);
    }

    #[test]
    fn test_plane_point_corners() {
        let config = RenderConfig::default();
        let top_left = config.plane_point(0, 0);
        assert_eq!(top_left.re, -1.6);
        assert_eq!(top_left.im, -0.9);
        let center = config.plane_point(800, 450);
        assert_eq!(center.re, 0.0);
        assert_eq!(center.im, 0.0);
    }

    #[test]
    fn test_scene_apply() {
        let scene: Scene = toml::from_str(
            r#"
            program = "*bb+ab"
            width = 80
            height = 24
            max_iter = 64
            "#,
        )
        .unwrap();
        let mut config = RenderConfig::default();
        scene.apply(&mut config);
        assert_eq!(config.width, 80);
        assert_eq!(config.height, 24);
        assert_eq!(config.max_iter, 64);
        // untouched fields keep their defaults
        assert_eq!(config.register_count, 4);
        assert_eq!(scene.program.as_deref(), Some("*bb+ab"));
    }

    #[test]
    fn test_scene_unknown_field_rejected() {
        assert!(toml::from_str::<Scene>("wdith = 80").is_err());
    }
}
