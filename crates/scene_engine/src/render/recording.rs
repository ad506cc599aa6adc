//! In-memory backend that records every command
//!
//! Stands in for a graphics context in headless runs and tests. Buffer
//! handles are tracked so double releases and leaks are observable.

use std::collections::{HashMap, HashSet};

use crate::foundation::math::{Mat4, Vec3};
use crate::render::backend::{
    BackendResult, GizmoShape, GpuMeshHandle, RenderBackend, TextureHandle, TextureSlot, UniformValue,
};
use crate::render::{RenderError, Vertex};

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    /// `use_shader`
    UseShader(String),
    /// `set_uniform`
    SetUniform(String, UniformValue),
    /// `bind_texture`
    BindTexture(TextureSlot, TextureHandle),
    /// `create_texture`
    CreateTexture {
        /// Texture id
        id: u64,
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
    /// `create_mesh_buffers`, with the new buffer id and vertex count
    CreateMesh {
        /// Buffer id
        id: u64,
        /// Vertices uploaded
        vertex_count: usize,
    },
    /// `release_mesh_buffers`
    ReleaseMesh(u64),
    /// `draw_indexed`
    DrawIndexed {
        /// Buffer id
        id: u64,
        /// Indices drawn
        index_count: u32,
    },
    /// `draw_gizmo`
    DrawGizmo(GizmoShape),
}

/// Backend recording commands instead of drawing
#[derive(Debug, Default)]
pub struct RecordingBackend {
    commands: Vec<RenderCommand>,
    uniforms: HashMap<String, UniformValue>,
    live_meshes: HashSet<u64>,
    released_meshes: Vec<u64>,
    next_mesh_id: u64,
    next_texture_id: u64,
}

impl RecordingBackend {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command recorded since the last [`clear_commands`](Self::clear_commands)
    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    /// Forget recorded commands, keeping uniforms and buffer state
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Last value set for a uniform
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(name)
    }

    /// Number of indexed draws recorded
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, RenderCommand::DrawIndexed { .. }))
            .count()
    }

    /// Gizmos recorded, in order
    pub fn gizmos(&self) -> Vec<GizmoShape> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                RenderCommand::DrawGizmo(shape) => Some(*shape),
                _ => None,
            })
            .collect()
    }

    /// Number of textures created
    pub fn texture_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, RenderCommand::CreateTexture { .. }))
            .count()
    }

    /// Buffers created and not yet released
    pub fn live_mesh_count(&self) -> usize {
        self.live_meshes.len()
    }

    /// Ids of released buffers, in release order
    pub fn released_meshes(&self) -> &[u64] {
        &self.released_meshes
    }
}

impl RenderBackend for RecordingBackend {
    fn use_shader(&mut self, name: &str) {
        self.commands.push(RenderCommand::UseShader(name.to_string()));
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.uniforms.insert(name.to_string(), value);
        self.commands.push(RenderCommand::SetUniform(name.to_string(), value));
    }

    fn bind_texture(&mut self, slot: TextureSlot, texture: TextureHandle) {
        self.commands.push(RenderCommand::BindTexture(slot, texture));
    }

    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> BackendResult<TextureHandle> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(RenderError::ResourceCreationFailed(format!(
                "texture {}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                rgba.len()
            )));
        }

        self.next_texture_id += 1;
        let id = self.next_texture_id;
        self.commands.push(RenderCommand::CreateTexture { id, width, height });
        Ok(TextureHandle(id))
    }

    fn create_mesh_buffers(&mut self, vertices: &[Vertex], indices: &[u32]) -> BackendResult<GpuMeshHandle> {
        let index_count = u32::try_from(indices.len())
            .map_err(|_| RenderError::ResourceCreationFailed(format!("{} indices", indices.len())))?;

        self.next_mesh_id += 1;
        let id = self.next_mesh_id;
        self.live_meshes.insert(id);
        self.commands.push(RenderCommand::CreateMesh {
            id,
            vertex_count: vertices.len(),
        });
        Ok(GpuMeshHandle::new(id, index_count))
    }

    fn release_mesh_buffers(&mut self, handle: GpuMeshHandle) {
        if !self.live_meshes.remove(&handle.id()) {
            log::error!("Released mesh buffers {} that are not live", handle.id());
        }
        self.released_meshes.push(handle.id());
        self.commands.push(RenderCommand::ReleaseMesh(handle.id()));
    }

    fn draw_indexed(&mut self, mesh: &GpuMeshHandle) {
        self.commands.push(RenderCommand::DrawIndexed {
            id: mesh.id(),
            index_count: mesh.index_count(),
        });
    }

    fn draw_gizmo(&mut self, shape: GizmoShape, _model: &Mat4, _color: Vec3) {
        self.commands.push(RenderCommand::DrawGizmo(shape));
    }
}
