//! # Core Engine Module
//!
//! Shared configuration for every subsystem of the scene core.
//!
//! ## Organization
//!
//! - **Config**: Engine configuration (logging, scene, camera, spatial, assets)

pub mod config;

pub use config::{
    EngineConfig,
    LoggingConfig,
    SceneConfig,
    CameraConfig,
    SpatialConfig,
    AssetConfig,
};
pub use crate::config::{Config, ConfigError, ConfigFormat};
