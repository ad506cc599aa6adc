//! # Scene Engine
//!
//! Core of a small 3D scene-authoring engine.
//!
//! ## Features
//!
//! - **Entity Hierarchy**: Parent/child tree with dual local/global transforms
//! - **Components**: Camera, mesh, material and light components with frame hooks
//! - **Events**: Synchronous change notifications with dirty-flag listeners
//! - **Spatial Index**: X/Z quadtree used for culling and ray picking
//! - **Model Import**: Wavefront OBJ/MTL import with texture fallback search
//! - **Renderer Boundary**: Backend trait with an in-memory recording backend
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! let config = EngineConfig::default();
//! let mut scene = Scene::new(&config);
//! let mut backend = RecordingBackend::new();
//!
//! scene.update_frame(&mut backend);
//! let picked = scene.pick(0.0, 0.0);
//! println!("picked: {picked:?}");
//! scene.shutdown(&mut backend);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod core;
pub mod config;

pub mod foundation;
pub mod events;
pub mod ecs;
pub mod spatial;
pub mod render;
pub mod input;
pub mod assets;
pub mod scene;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{AssetImporter, ImageTextureLoader, ModelImporter, ObjImporter, TextureLoader},
        core::{Config, EngineConfig},
        ecs::{
            components::{ComponentCamera, ComponentLight, ComponentMaterial, ComponentMesh},
            ComponentKind, Entity, EntityKey, World,
        },
        foundation::math::{Mat4, Quat, Vec3},
        input::{InputState, KeyCode, MouseButton, MouseState},
        render::{RecordingBackend, RenderBackend},
        scene::{CameraController, FocusState, Scene},
        spatial::{QuadTree, Segment, AABB, OBB},
    };
}
