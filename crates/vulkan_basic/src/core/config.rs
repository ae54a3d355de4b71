//! # Application Configuration
//!
//! Every setting the textured quad needs, grouped by subsystem:
//!
//! - **Window**: title, size, resizability
//! - **Renderer**: instance metadata, validation, shaders, frames in flight
//! - **Assets**: texture location
//! - **Engine**: log level
//!
//! All sections carry `#[serde(default)]`, so a config file only has to name
//! the values it changes.

use serde::{Deserialize, Serialize};
use std::path::Path;

pub use crate::config::{Config, ConfigError};

/// Upper bound on the frames-in-flight ring
pub const MAX_FRAMES_IN_FLIGHT: usize = 8;

/// Window creation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Initial width in screen coordinates
    pub width: u32,
    /// Initial height in screen coordinates
    pub height: u32,
    /// Whether the user may resize the window
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Vulkan App".to_string(),
            width: 800,
            height: 600,
            resizable: true,
        }
    }
}

impl WindowConfig {
    /// Validate the window parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!(
                "Window size must be non-zero, got {}x{}",
                self.width, self.height
            ));
        }
        Ok(())
    }
}

/// # Shader Configuration
///
/// Locations of the two SPIR-V binaries the pipeline is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderConfig {
    /// Path to the vertex shader SPIR-V file
    pub vertex_shader_path: String,
    /// Path to the fragment shader SPIR-V file
    pub fragment_shader_path: String,
}

impl ShaderConfig {
    /// Directories searched, in order, by [`ShaderConfig::with_path_resolution`]
    pub const SEARCH_DIRS: [&'static str; 5] = [
        "target/shaders/",
        "shaders/",
        "resources/shaders/",
        "../target/shaders/",
        "./",
    ];

    /// Create a shader configuration from explicit paths
    pub fn new(vertex_path: impl Into<String>, fragment_path: impl Into<String>) -> Self {
        Self {
            vertex_shader_path: vertex_path.into(),
            fragment_shader_path: fragment_path.into(),
        }
    }

    /// Create shader config with automatic path resolution
    ///
    /// The first directory in [`Self::SEARCH_DIRS`] holding a file wins. Files
    /// that are found nowhere fall back to `shaders/<name>`.
    pub fn with_path_resolution(base_vertex: &str, base_fragment: &str) -> Self {
        let resolve = |name: &str| {
            Self::SEARCH_DIRS
                .iter()
                .map(|dir| format!("{dir}{name}"))
                .find(|candidate| Path::new(candidate).exists())
                .unwrap_or_else(|| format!("shaders/{name}"))
        };

        Self {
            vertex_shader_path: resolve(base_vertex),
            fragment_shader_path: resolve(base_fragment),
        }
    }

    /// Validate that shader files exist
    pub fn validate(&self) -> Result<(), String> {
        if !Path::new(&self.vertex_shader_path).exists() {
            return Err(format!("Vertex shader not found: {}", self.vertex_shader_path));
        }
        if !Path::new(&self.fragment_shader_path).exists() {
            return Err(format!("Fragment shader not found: {}", self.fragment_shader_path));
        }
        Ok(())
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self::with_path_resolution("textured_quad.vert.spv", "textured_quad.frag.spv")
    }
}

/// # Vulkan Renderer Configuration
///
/// Instance metadata, debug features and presentation tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Application name reported to the Vulkan instance
    pub application_name: String,
    /// Application version (major, minor, patch)
    pub application_version: (u32, u32, u32),
    /// Engine name reported to the Vulkan instance
    pub engine_name: String,
    /// Shader binaries
    pub shaders: ShaderConfig,
    /// Size of the frame synchronization ring; 1 keeps a single semaphore pair
    pub frames_in_flight: usize,
    /// Whether to enable validation layers; `None` follows the build profile
    pub enable_validation: Option<bool>,
    /// Clear color for the single color attachment
    pub clear_color: [f32; 4],
}

impl RendererConfig {
    /// Create a new renderer configuration
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            application_name: app_name.into(),
            application_version: (1, 0, 0),
            engine_name: "No Engine".to_string(),
            shaders: ShaderConfig::default(),
            frames_in_flight: 2,
            enable_validation: None,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }

    /// Set application version
    #[must_use]
    pub const fn with_version(mut self, major: u32, minor: u32, patch: u32) -> Self {
        self.application_version = (major, minor, patch);
        self
    }

    /// Set custom shader configuration
    #[must_use]
    pub fn with_shaders(mut self, shaders: ShaderConfig) -> Self {
        self.shaders = shaders;
        self
    }

    /// Set the size of the frames-in-flight ring
    #[must_use]
    pub const fn with_frames_in_flight(mut self, frames: usize) -> Self {
        self.frames_in_flight = frames;
        self
    }

    /// Enable or disable validation layers
    #[must_use]
    pub const fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = Some(enabled);
        self
    }

    /// Set the clear color
    #[must_use]
    pub const fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Whether validation layers should be requested
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.application_name.is_empty() {
            return Err("Application name cannot be empty".to_string());
        }

        if self.frames_in_flight == 0 {
            return Err("Frames in flight must be at least 1".to_string());
        }

        if self.frames_in_flight > MAX_FRAMES_IN_FLIGHT {
            return Err(format!(
                "Frames in flight must not exceed {MAX_FRAMES_IN_FLIGHT}, got {}",
                self.frames_in_flight
            ));
        }

        if self.clear_color.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(format!("Clear color components must be in [0, 1]: {:?}", self.clear_color));
        }

        self.shaders.validate()
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new("Hello Triangle")
    }
}

/// Asset locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Image file sampled by the quad
    pub texture_path: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            texture_path: "resources/textures/texture.png".to_string(),
        }
    }
}

/// Process-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log level filter used when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Validate the log level
    pub fn validate(&self) -> Result<(), String> {
        crate::foundation::logging::parse_level(&self.log_level)
            .map(|_| ())
            .ok_or_else(|| format!("Unknown log level: {}", self.log_level))
    }
}

/// # Application Configuration
///
/// Root of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Window settings
    pub window: WindowConfig,
    /// Renderer settings
    pub renderer: RendererConfig,
    /// Asset settings
    pub assets: AssetConfig,
    /// Engine settings
    pub engine: EngineConfig,
}

impl Config for ApplicationConfig {}

impl ApplicationConfig {
    /// Load from `path` when given, else from `default_path` if that file
    /// exists, else fall back to built-in defaults
    pub fn load_or_default(path: Option<&Path>, default_path: &Path) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_file(path),
            None if default_path.exists() => Self::load_from_file(default_path),
            None => Ok(Self::default()),
        }
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.window
            .validate()
            .and_then(|()| self.renderer.validate())
            .and_then(|()| self.engine.validate())
            .map_err(ConfigError::Invalid)?;

        if !Path::new(&self.assets.texture_path).exists() {
            return Err(ConfigError::Invalid(format!(
                "Texture not found: {}",
                self.assets.texture_path
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn config_with_files(dir: &Path) -> ApplicationConfig {
        let vertex = dir.join("quad.vert.spv");
        let fragment = dir.join("quad.frag.spv");
        let texture = dir.join("texture.png");
        for file in [&vertex, &fragment, &texture] {
            fs::write(file, [0u8; 4]).unwrap();
        }

        let mut config = ApplicationConfig::default();
        config.renderer.shaders = ShaderConfig::new(
            vertex.to_string_lossy(),
            fragment.to_string_lossy(),
        );
        config.assets.texture_path = texture.to_string_lossy().into_owned();
        config
    }

    #[test]
    fn test_defaults_match_sample_application() {
        let config = ApplicationConfig::default();
        assert_eq!(config.window.title, "Vulkan App");
        assert_eq!((config.window.width, config.window.height), (800, 600));
        assert_eq!(config.renderer.application_name, "Hello Triangle");
        assert_eq!(config.renderer.frames_in_flight, 2);
        assert_eq!(config.renderer.clear_color, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_validation_follows_build_profile_by_default() {
        let config = RendererConfig::default();
        assert_eq!(config.validation_enabled(), cfg!(debug_assertions));
        assert!(!config.with_validation(false).validation_enabled());
    }

    #[test]
    fn test_validate_accepts_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with_files(dir.path());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_frames_in_flight() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_with_files(dir.path());

        config.renderer.frames_in_flight = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.renderer.frames_in_flight = MAX_FRAMES_IN_FLIGHT + 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.renderer.frames_in_flight = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_shader() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_with_files(dir.path());
        config.renderer.shaders.fragment_shader_path = dir
            .path()
            .join("absent.frag.spv")
            .to_string_lossy()
            .into_owned();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Fragment shader not found"));
    }

    #[test]
    fn test_validate_rejects_zero_window_and_unknown_log_level() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_with_files(dir.path());
        config.window.height = 0;
        assert!(config.validate().is_err());

        config.window.height = 600;
        config.engine.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let text = r#"
            [window]
            title = "Resizable Quad"

            [renderer]
            frames_in_flight = 3
        "#;
        let config =
            ApplicationConfig::from_str_with_format(text, crate::config::ConfigFormat::Toml).unwrap();
        assert_eq!(config.window.title, "Resizable Quad");
        assert_eq!(config.window.width, 800);
        assert_eq!(config.renderer.frames_in_flight, 3);
        assert_eq!(config.renderer.application_name, "Hello Triangle");
    }

    #[test]
    fn test_load_or_default() {
        let dir = tempfile::tempdir().unwrap();
        let default_path = dir.path().join("textured_quad.toml");

        let config = ApplicationConfig::load_or_default(None, &default_path).unwrap();
        assert_eq!(config, ApplicationConfig::default());

        let mut custom = ApplicationConfig::default();
        custom.window.width = 1024;
        custom.save_to_file(&default_path).unwrap();
        let config = ApplicationConfig::load_or_default(None, &default_path).unwrap();
        assert_eq!(config.window.width, 1024);

        let ron_path = dir.path().join("other.ron");
        custom.window.width = 640;
        custom.save_to_file(&ron_path).unwrap();
        let config = ApplicationConfig::load_or_default(Some(&ron_path), &default_path).unwrap();
        assert_eq!(config.window.width, 640);
    }
}
