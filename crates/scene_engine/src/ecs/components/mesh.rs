//! Mesh component
//!
//! GPU-resident geometry built once from interleaved vertex data
//! (position, normal, UV: 8 floats per vertex) and triangle indices. A CPU
//! copy of the triangles and the local bounds is kept for picking and
//! bounding box aggregation.

use crate::ecs::components::ComponentTransform;
use crate::foundation::math::Vec3;
use crate::render::{FrameContext, GpuMeshHandle, RenderBackend, RenderError, UniformValue, Vertex};
use crate::spatial::{Ray, Segment, Triangle, AABB};

/// Errors raised while building a mesh
#[derive(thiserror::Error, Debug)]
pub enum MeshError {
    /// Vertex buffer length is not a multiple of [`Vertex::FLOATS`]
    #[error("Vertex buffer holds {0} floats, expected a multiple of 8")]
    VertexLayout(usize),

    /// Index buffer length is not a multiple of 3
    #[error("Index buffer holds {0} indices, expected whole triangles")]
    IndexCount(usize),

    /// An index refers past the last vertex
    #[error("Index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        /// Offending index
        index: u32,
        /// Vertices available
        vertex_count: usize,
    },

    /// Buffer reinterpretation failed
    #[error("Vertex cast failed: {0}")]
    Cast(String),

    /// GPU buffer creation failed
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Mesh component
#[derive(Debug)]
pub struct ComponentMesh {
    gpu: Option<GpuMeshHandle>,
    triangles: Vec<Triangle>,
    local_bounds: Option<AABB>,
    vertex_count: usize,
    culled: bool,
}

impl ComponentMesh {
    /// Validate raw buffers, upload them and cache picking data
    pub fn load(vertices: &[f32], indices: &[u32], renderer: &mut dyn RenderBackend) -> Result<Self, MeshError> {
        if vertices.len() % Vertex::FLOATS != 0 {
            return Err(MeshError::VertexLayout(vertices.len()));
        }
        if indices.len() % 3 != 0 {
            return Err(MeshError::IndexCount(indices.len()));
        }

        let records: &[Vertex] = bytemuck::try_cast_slice(vertices).map_err(|e| MeshError::Cast(e.to_string()))?;

        if let Some(&index) = indices.iter().find(|&&index| index as usize >= records.len()) {
            return Err(MeshError::IndexOutOfRange {
                index,
                vertex_count: records.len(),
            });
        }

        let position = |index: u32| Vec3::from(records[index as usize].position);
        let triangles = indices
            .chunks_exact(3)
            .map(|tri| Triangle::new(position(tri[0]), position(tri[1]), position(tri[2])))
            .collect();
        let local_bounds = AABB::from_points(records.iter().map(|vertex| Vec3::from(vertex.position)));

        let gpu = renderer.create_mesh_buffers(records, indices)?;
        log::debug!("Loaded mesh with {} vertices, {} indices", records.len(), indices.len());

        Ok(Self {
            gpu: Some(gpu),
            triangles,
            local_bounds,
            vertex_count: records.len(),
            culled: false,
        })
    }

    /// Triangles in the owner's local space
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Bounds of the vertices in local space, None for an empty mesh
    pub fn local_bounds(&self) -> Option<&AABB> {
        self.local_bounds.as_ref()
    }

    /// Number of vertices uploaded
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Whether GPU buffers are still held
    pub fn has_gpu_buffers(&self) -> bool {
        self.gpu.is_some()
    }

    /// Whether the last culling pass found the mesh outside the view
    pub fn is_culled(&self) -> bool {
        self.culled
    }

    /// Set by the scene's culling pass
    pub fn set_culled(&mut self, culled: bool) {
        self.culled = culled;
    }

    /// Closest triangle hit along a local-space segment, as a distance from its start
    pub fn intersect_local_segment(&self, segment: &Segment) -> Option<f32> {
        let length = segment.length();
        if length <= f32::EPSILON {
            return None;
        }
        let ray = segment.to_ray();

        let mut closest: Option<f32> = None;
        for triangle in &self.triangles {
            if let Some((t, _, _)) = triangle.intersect_ray(&ray) {
                if t <= length && closest.map_or(true, |best| t < best) {
                    closest = Some(t);
                }
            }
        }
        closest
    }

    /// Same as [`intersect_local_segment`](Self::intersect_local_segment) but returns the hit point
    pub fn intersect_local_point(&self, segment: &Segment) -> Option<Vec3> {
        let ray: Ray = segment.to_ray();
        self.intersect_local_segment(segment).map(|t| ray.point_at(t))
    }

    pub(crate) fn take_gpu_buffers(&mut self) -> Option<GpuMeshHandle> {
        self.gpu.take()
    }

    /// Draw unless culled
    pub(crate) fn update(&self, transform: &ComponentTransform, ctx: &mut FrameContext<'_>) {
        if self.culled {
            return;
        }
        let Some(gpu) = self.gpu.as_ref() else {
            return;
        };
        ctx.backend.set_uniform("model", UniformValue::matrix(*transform.global_matrix()));
        ctx.backend.draw_indexed(gpu);
    }
}

impl Drop for ComponentMesh {
    fn drop(&mut self) {
        if let Some(gpu) = self.gpu.as_ref() {
            log::warn!("Mesh dropped while still holding {:?}", gpu);
        }
    }
}

/// Interleaved unit cube centred on the origin, 24 vertices and 36 indices
pub fn cube_geometry(half_extent: f32) -> (Vec<f32>, Vec<u32>) {
    let h = half_extent;
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        ([0.0, 0.0, 1.0], [[-h, -h, h], [h, -h, h], [h, h, h], [-h, h, h]]),
        ([0.0, 0.0, -1.0], [[h, -h, -h], [-h, -h, -h], [-h, h, -h], [h, h, -h]]),
        ([1.0, 0.0, 0.0], [[h, -h, h], [h, -h, -h], [h, h, -h], [h, h, h]]),
        ([-1.0, 0.0, 0.0], [[-h, -h, -h], [-h, -h, h], [-h, h, h], [-h, h, -h]]),
        ([0.0, 1.0, 0.0], [[-h, h, h], [h, h, h], [h, h, -h], [-h, h, -h]]),
        ([0.0, -1.0, 0.0], [[-h, -h, -h], [h, -h, -h], [h, -h, h], [-h, -h, h]]),
    ];
    let uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

    let mut vertices = Vec::with_capacity(24 * Vertex::FLOATS);
    let mut indices = Vec::with_capacity(36);
    for (face, (normal, corners)) in faces.iter().enumerate() {
        for (corner, uv) in corners.iter().zip(uvs.iter()) {
            vertices.extend_from_slice(corner);
            vertices.extend_from_slice(normal);
            vertices.extend_from_slice(uv);
        }
        let base = (face * 4) as u32;
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (vertices, indices)
}
