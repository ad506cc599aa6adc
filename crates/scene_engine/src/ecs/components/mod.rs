//! Component types
//!
//! Transform and BoundingBox are mandatory on every entity. Camera, Mesh,
//! Material and Light are optional and attached through
//! [`World::add_component`](crate::ecs::World::add_component).

pub mod bounding_box;
pub mod camera;
pub mod lighting;
pub mod material;
pub mod mesh;
pub mod transform;

pub use bounding_box::ComponentBoundingBox;
pub use camera::{ComponentCamera, Projection};
pub use lighting::{ComponentLight, LightKind};
pub use material::{ComponentMaterial, DEFAULT_SHADER};
pub use mesh::{cube_geometry, ComponentMesh, MeshError};
pub use transform::{ComponentTransform, PoseMode};
