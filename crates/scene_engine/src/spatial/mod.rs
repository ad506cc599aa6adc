//! Spatial partitioning data structures
//!
//! Bounding volumes, query shapes and the X/Z quadtree used to accelerate
//! culling and ray picking.

pub mod primitives;
mod quadtree;
mod spatial_query;

pub use primitives::{AABB, Frustum, OBB, Plane, Ray, Segment, Triangle};
pub use quadtree::{QuadTree, QuadTreeConfig, QuadTreeEntry, QuadTreeNode, Quadrant, MAX_DEPTH};
pub use spatial_query::SpatialShape;

/// Entries a quadtree leaf holds before it subdivides
pub const DEFAULT_CAPACITY: usize = 8;

/// Squared X/Z half extent at or below which a quadtree leaf never subdivides
pub const DEFAULT_MIN_HALF_SIZE_SQ: f32 = 10.0;
