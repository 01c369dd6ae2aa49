//! Renderer configuration, stored as RON

use std::fs;
use std::path::Path;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::rasterizer::{
    Color, Vec3, FAR_CUTOFF, FAR_PLANE, HEIGHT, MIN_LIGHT, NEAR_PLANE, TRANSITION_DISTANCE, WIDTH,
};

/// Default location of the config file, relative to the working directory
pub const CONFIG_PATH: &str = "assets/render.ron";

/// Error type for config loading and saving
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("Serialize error: {0}")]
    Serialize(#[from] ron::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Framebuffer size in pixels
    pub width: usize,
    pub height: usize,
    /// Vertical field of view
    pub fov_degrees: f32,
    pub near_plane: f32,
    pub far_plane: f32,
    pub far_cutoff: f32,
    /// Average depth at which triangles move from the depth-tested pass to the painter's pass
    pub transition_distance: f32,
    pub min_light: f32,
    /// Direction towards the light; normalized on use
    pub light_dir: Vec3,
    pub sky_color: Color,
    /// Depth period of the water shimmer wave
    pub water_period: f32,
    pub texture_seed: u64,
    /// Window size as a multiple of the framebuffer
    pub window_scale: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: WIDTH,
            height: HEIGHT,
            fov_degrees: 60.0,
            near_plane: NEAR_PLANE,
            far_plane: FAR_PLANE,
            far_cutoff: FAR_CUTOFF,
            transition_distance: TRANSITION_DISTANCE,
            min_light: MIN_LIGHT,
            light_dir: Vec3::new(0.3, 0.8, 0.5),
            sky_color: Color::SKY,
            water_period: 50.0,
            texture_seed: 0x5eed,
            window_scale: 3,
        }
    }
}

impl RenderConfig {
    pub fn fov_radians(&self) -> f32 {
        self.fov_degrees.to_radians()
    }

    pub fn from_ron(s: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(s)?)
    }

    pub fn to_ron(&self) -> Result<String, ConfigError> {
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(2)
            .indentor("  ".to_string());
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    /// Load a config from a RON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_ron(&contents)
    }

    /// Load a config, falling back to defaults if it is missing or broken
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => {
                info!("Loaded render config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Using default render config ({}): {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}
