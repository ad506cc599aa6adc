//! Backend abstraction traits for the rendering system
//!
//! The scene never talks to a graphics API directly. Components push named
//! uniforms, bind textures and issue indexed draws through [`RenderBackend`];
//! an OpenGL or Vulkan implementation lives outside this crate.

use std::fmt;

use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::render::{RenderError, Vertex};

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// Handle to a texture already resident on the GPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// GPU vertex and index buffers of one mesh
///
/// Not clonable: the handle is consumed by
/// [`RenderBackend::release_mesh_buffers`], so buffers are released once.
#[derive(PartialEq, Eq, Hash)]
pub struct GpuMeshHandle {
    id: u64,
    index_count: u32,
}

impl GpuMeshHandle {
    /// Wrap a backend buffer id; only backends create handles
    pub fn new(id: u64, index_count: u32) -> Self {
        Self { id, index_count }
    }

    /// Backend buffer id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of indices to draw
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

impl fmt::Debug for GpuMeshHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GpuMeshHandle({}, {} indices)", self.id, self.index_count)
    }
}

/// Value of a named shader uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// Scalar float
    Float(f32),
    /// Scalar integer (also used for booleans and sampler units)
    Int(i32),
    /// 3-component vector
    Vec3(Vec3),
    /// 4-component vector
    Vec4(Vec4),
    /// 4x4 matrix with the transpose flag passed to the graphics API
    Mat4 {
        /// Matrix value
        value: Mat4,
        /// Whether the API must transpose on upload
        transpose: bool,
    },
}

impl UniformValue {
    /// A matrix in nalgebra's column-major layout, uploaded untransposed
    pub fn matrix(value: Mat4) -> Self {
        Self::Mat4 { value, transpose: false }
    }

    /// Boolean as integer uniform
    pub fn flag(value: bool) -> Self {
        Self::Int(i32::from(value))
    }
}

/// Material texture slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    /// Base colour
    Diffuse,
    /// Specular intensity
    Specular,
    /// Ambient occlusion
    Occlusion,
    /// Tangent-space normals
    Normal,
}

impl TextureSlot {
    /// Every slot in texture unit order
    pub const ALL: [TextureSlot; 4] = [
        TextureSlot::Diffuse,
        TextureSlot::Specular,
        TextureSlot::Occlusion,
        TextureSlot::Normal,
    ];

    /// Texture unit the slot binds to
    pub fn unit(self) -> u32 {
        match self {
            TextureSlot::Diffuse => 0,
            TextureSlot::Specular => 1,
            TextureSlot::Occlusion => 2,
            TextureSlot::Normal => 3,
        }
    }

    /// Sampler uniform name
    pub fn sampler_uniform(self) -> &'static str {
        match self {
            TextureSlot::Diffuse => "material.diffuse",
            TextureSlot::Specular => "material.specular",
            TextureSlot::Occlusion => "material.occlusion",
            TextureSlot::Normal => "material.normal",
        }
    }

    /// Presence flag uniform name
    pub fn presence_uniform(self) -> &'static str {
        match self {
            TextureSlot::Diffuse => "material.has_diffuse",
            TextureSlot::Specular => "material.has_specular",
            TextureSlot::Occlusion => "material.has_occlusion",
            TextureSlot::Normal => "material.has_normal",
        }
    }
}

/// Debug shape drawn for editor helpers such as lights
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GizmoShape {
    /// Point light
    Sphere,
    /// Directional light
    Arrow,
    /// Spot light
    Cone,
}

/// Main rendering backend trait
pub trait RenderBackend {
    /// Make the named shader program current
    fn use_shader(&mut self, name: &str);

    /// Set a named uniform on the current shader
    fn set_uniform(&mut self, name: &str, value: UniformValue);

    /// Bind a texture to a material slot
    fn bind_texture(&mut self, slot: TextureSlot, texture: TextureHandle);

    /// Upload RGBA8 pixels as a texture
    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> BackendResult<TextureHandle>;

    /// Upload vertex and index buffers, returning their handle
    fn create_mesh_buffers(&mut self, vertices: &[Vertex], indices: &[u32]) -> BackendResult<GpuMeshHandle>;

    /// Free buffers created by [`create_mesh_buffers`](Self::create_mesh_buffers)
    fn release_mesh_buffers(&mut self, handle: GpuMeshHandle);

    /// Draw indexed triangles from the given buffers
    fn draw_indexed(&mut self, mesh: &GpuMeshHandle);

    /// Draw an editor gizmo with a model matrix and colour
    fn draw_gizmo(&mut self, shape: GizmoShape, model: &Mat4, color: Vec3);
}

/// State shared by every component hook during one frame
pub struct FrameContext<'a> {
    /// Backend receiving the frame's commands
    pub backend: &'a mut dyn RenderBackend,

    directional_lights: u32,
    point_lights: u32,
    spot_lights: u32,
}

impl<'a> FrameContext<'a> {
    /// Start a frame on `backend` with zeroed light counters
    pub fn new(backend: &'a mut dyn RenderBackend) -> Self {
        Self {
            backend,
            directional_lights: 0,
            point_lights: 0,
            spot_lights: 0,
        }
    }

    /// Claim the next directional light slot
    pub fn next_directional_light(&mut self) -> u32 {
        let index = self.directional_lights;
        self.directional_lights += 1;
        index
    }

    /// Claim the next point light slot
    pub fn next_point_light(&mut self) -> u32 {
        let index = self.point_lights;
        self.point_lights += 1;
        index
    }

    /// Claim the next spot light slot
    pub fn next_spot_light(&mut self) -> u32 {
        let index = self.spot_lights;
        self.spot_lights += 1;
        index
    }

    /// Lights claimed so far as (directional, point, spot)
    pub fn light_counts(&self) -> (u32, u32, u32) {
        (self.directional_lights, self.point_lights, self.spot_lights)
    }

    /// Upload the light counts claimed this frame
    pub fn upload_light_counts(&mut self) {
        let to_int = |count: u32| UniformValue::Int(i32::try_from(count).unwrap_or(i32::MAX));
        self.backend.set_uniform("dir_light_count", to_int(self.directional_lights));
        self.backend.set_uniform("point_light_count", to_int(self.point_lights));
        self.backend.set_uniform("spot_light_count", to_int(self.spot_lights));
    }
}
