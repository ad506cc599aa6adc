//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and pose decomposition
//! - Identity allocation for entities and components
//! - Logging utilities

pub mod math;
pub mod ids;
pub mod logging;
