//! # Engine Configuration
//!
//! All configuration structures of the scene core in one place. Every field
//! has a default, so partial TOML/RON files load and fill the rest.
//!
//! ```toml
//! [camera]
//! fov_degrees = 60.0
//!
//! [spatial]
//! capacity = 8
//! ```

use serde::{Serialize, Deserialize};
use std::path::PathBuf;

use crate::config::Config;
use crate::foundation::math::Vec3;

/// # Logging Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level filter when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// # Scene Configuration
///
/// Controls the content created by [`Scene::initialize`](crate::scene::Scene::initialize).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Name given to the root entity
    pub root_name: String,
    /// Create the default camera and lights when initializing
    pub create_startup_content: bool,
    /// Initial world position of the main camera
    pub camera_position: Vec3,
    /// Point the main camera initially looks at
    pub camera_target: Vec3,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            root_name: "Scene".to_string(),
            create_startup_content: true,
            camera_position: Vec3::new(0.0, 5.0, 15.0),
            camera_target: Vec3::zeros(),
        }
    }
}

/// # Camera Configuration
///
/// Projection defaults and camera controller tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    /// Initial aspect ratio (width / height)
    pub aspect: f32,
    /// Near clipping plane distance
    pub near: f32,
    /// Far clipping plane distance
    pub far: f32,
    /// Strafe speed in units per second
    pub move_speed: f32,
    /// Mouse look speed in radians per pixel
    pub rotate_speed: f32,
    /// Distance moved per wheel step
    pub zoom_speed: f32,
    /// Duration of a focus transition in seconds
    pub focus_duration: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 60.0,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
            move_speed: 10.0,
            rotate_speed: 0.005,
            zoom_speed: 2.0,
            focus_duration: 0.5,
        }
    }
}

/// # Spatial Index Configuration
///
/// Quadtree container and subdivision limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialConfig {
    /// Centre of the quadtree container
    pub container_center: Vec3,
    /// Half size of the quadtree container
    pub container_half_extents: Vec3,
    /// Entities a leaf holds before it subdivides
    pub capacity: usize,
    /// Squared X/Z half extent at or below which a leaf never subdivides
    pub min_half_size_sq: f32,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            container_center: Vec3::zeros(),
            container_half_extents: Vec3::new(100.0, 100.0, 100.0),
            capacity: crate::spatial::DEFAULT_CAPACITY,
            min_half_size_sq: crate::spatial::DEFAULT_MIN_HALF_SIZE_SQ,
        }
    }
}

/// # Asset Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Last fallback directory searched for textures
    pub texture_dir: PathBuf,
    /// Models imported under the root after initialization
    pub startup_models: Vec<PathBuf>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            texture_dir: PathBuf::from("resources/textures"),
            startup_models: Vec::new(),
        }
    }
}

/// # Engine Configuration
///
/// Top-level configuration grouping every subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Logging settings
    pub logging: LoggingConfig,
    /// Scene startup content
    pub scene: SceneConfig,
    /// Camera projection and controller
    pub camera: CameraConfig,
    /// Quadtree settings
    pub spatial: SpatialConfig,
    /// Asset locations
    pub assets: AssetConfig,
}

impl Config for EngineConfig {}
