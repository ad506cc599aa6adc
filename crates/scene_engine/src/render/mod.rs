//! Renderer boundary
//!
//! Vertex layout, backend trait and per-frame context used by component
//! hooks, plus an in-memory backend for headless runs.

mod backend;
mod recording;

pub use backend::{
    BackendResult, FrameContext, GizmoShape, GpuMeshHandle, RenderBackend, TextureHandle, TextureSlot,
    UniformValue,
};
pub use recording::{RecordingBackend, RenderCommand};

use bytemuck::{Pod, Zeroable};

/// Interleaved vertex as delivered by importers: position, normal, UV
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Position in 3D space
    pub position: [f32; 3],

    /// Normal vector
    pub normal: [f32; 3],

    /// Texture coordinates
    pub tex_coord: [f32; 2],
}

impl Vertex {
    /// Floats per interleaved vertex
    pub const FLOATS: usize = 8;

    /// Create a new vertex
    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coord,
        }
    }
}

/// Rendering errors
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    /// GPU resource creation failed
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// Backend-specific failure
    #[error("Backend error: {0}")]
    BackendError(String),
}
