//! Viewer configuration.
//!
//! Every field has a default, so an empty TOML document (or no file at all) yields the stock
//! scene. Colors are written either as sRGB `"#rrggbb"` strings or linear `[r, g, b]` float
//! arrays.
//!
//! ```
//! use marblewalk::Config;
//!
//! let config = Config::from_toml_str(r##"
//!     [movement]
//!     speed = 30.0
//!
//!     [highlight]
//!     color = "#00ff00"
//! "##).unwrap();
//! assert_eq!(config.movement.speed, 30.0);
//! assert_eq!(config.movement.damping, 10.0);
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::draw2d::Color;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub movement: MovementConfig,
    pub scene: SceneConfig,
    pub lights: LightsConfig,
    pub highlight: HighlightConfig,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "marblewalk".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Radians of rotation per pixel of mouse motion.
    pub look_sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.2, 2.0],
            fov_degrees: 60.0,
            near: 0.1,
            far: 1000.0,
            look_sensitivity: 0.002,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MovementConfig {
    pub speed: f32,
    pub damping: f32,
    /// Upper bound on a single frame's delta, in seconds.
    pub max_frame_delta: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            speed: 25.0,
            damping: 10.0,
            max_frame_delta: 0.1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneConfig {
    pub model_path: PathBuf,
    pub model_position: [f32; 3],
    pub floor_texture: PathBuf,
    pub floor_size: f32,
    pub floor_texture_repeat: f32,
    pub floor_metalness: f32,
    pub background: Color,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("assets/models/cake2.obj"),
            model_position: [0.0, 0.0, 0.0],
            floor_texture: PathBuf::from("assets/images/marble.jpg"),
            floor_size: 10.0,
            floor_texture_repeat: 4.0,
            floor_metalness: 0.13,
            background: Color::BLACK,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LightsConfig {
    pub directional_color: Color,
    /// Direction the light comes *from*; normalized when used.
    pub directional_from: [f32; 3],
    pub sky_color: Color,
    pub ground_color: Color,
}

impl Default for LightsConfig {
    fn default() -> Self {
        Self {
            directional_color: Color::from_hex(0x9090aa),
            directional_from: [-10.0, 10.0, -10.0],
            sky_color: Color::WHITE,
            ground_color: Color::from_hex(0x444444),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HighlightConfig {
    pub color: Color,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self { color: Color::RED }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.window.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.window.width = width;
        self.window.height = height;
        self
    }

    pub fn model(mut self, path: impl Into<PathBuf>) -> Self {
        self.scene.model_path = path.into();
        self
    }

    pub fn floor_texture(mut self, path: impl Into<PathBuf>) -> Self {
        self.scene.floor_texture = path.into();
        self
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be positive, got {value}"),
                })
            }
        }

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid {
                field: "window.size",
                reason: format!("{}x{} has a zero side", self.window.width, self.window.height),
            });
        }
        positive("movement.speed", self.movement.speed)?;
        positive("movement.damping", self.movement.damping)?;
        positive("movement.max_frame_delta", self.movement.max_frame_delta)?;
        positive("camera.near", self.camera.near)?;
        positive("scene.floor_size", self.scene.floor_size)?;
        positive("scene.floor_texture_repeat", self.scene.floor_texture_repeat)?;

        if !(self.camera.fov_degrees > 0.0 && self.camera.fov_degrees < 180.0) {
            return Err(ConfigError::Invalid {
                field: "camera.fov_degrees",
                reason: format!("must be in (0, 180), got {}", self.camera.fov_degrees),
            });
        }
        if self.camera.far <= self.camera.near {
            return Err(ConfigError::Invalid {
                field: "camera.far",
                reason: format!("must exceed near plane {}", self.camera.near),
            });
        }
        if !(0.0..=1.0).contains(&self.scene.floor_metalness) {
            return Err(ConfigError::Invalid {
                field: "scene.floor_metalness",
                reason: format!("must be in [0, 1], got {}", self.scene.floor_metalness),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.camera.position, [0.0, 0.2, 2.0]);
        assert_eq!(config.scene.floor_metalness, 0.13);
        assert_eq!(config.lights.directional_color, Color::from_hex(0x9090aa));
        assert_eq!(config.highlight.color, Color::RED);
    }

    #[test]
    fn hex_light_colors_are_linear() {
        let config = Config::from_toml_str(
            r##"
            [lights]
            ground_color = "#444444"
            "##,
        )
        .unwrap();
        let ground = config.lights.ground_color;
        assert!((ground.r - 0.0578).abs() < 1e-3);
        assert!(ground.r < 0x44 as f32 / 255.0);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [scene]
            model_path = "models/teapot.stl"
            background = [0.1, 0.1, 0.2]
            "#,
        )
        .unwrap();
        assert_eq!(config.scene.model_path, PathBuf::from("models/teapot.stl"));
        assert_eq!(config.scene.background, Color::rgb(0.1, 0.1, 0.2));
        assert_eq!(config.scene.floor_size, 10.0);
        assert_eq!(config.window, WindowConfig::default());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let err = Config::from_toml_str("[scene]\nfloor_metalness = 1.5").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "scene.floor_metalness",
                ..
            }
        ));

        let err = Config::from_toml_str("[movement]\ndamping = 0.0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "movement.damping",
                ..
            }
        ));

        let err = Config::from_toml_str("[camera]\nfov_degrees = 180.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn rejects_unknown_keys_and_bad_colors() {
        assert!(matches!(
            Config::from_toml_str("[movement]\nsped = 3.0"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[highlight]\ncolor = \"red\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn builder_setters() {
        let config = Config::new()
            .title("demo")
            .size(640, 480)
            .model("a.obj")
            .floor_texture("b.png");
        assert_eq!(config.window.title, "demo");
        assert_eq!((config.window.width, config.window.height), (640, 480));
        assert_eq!(config.scene.model_path, PathBuf::from("a.obj"));
        assert_eq!(config.scene.floor_texture, PathBuf::from("b.png"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Config::load("definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn shipped_example_matches_defaults() {
        let config = Config::from_toml_str(include_str!("../marblewalk.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
