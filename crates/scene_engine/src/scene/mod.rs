//! Scene management
//!
//! [`Scene`] owns the entity tree together with its selection, main camera,
//! mesh cache and quadtree. Editor operations on the tree live in
//! `editor`, the input-driven fly camera in [`CameraController`].

mod camera_controller;
mod editor;
#[allow(clippy::module_inception)]
mod scene;

pub use camera_controller::{CameraController, FocusState};
pub use scene::Scene;
