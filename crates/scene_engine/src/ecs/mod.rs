//! Entity Component System
//!
//! Entities live in a [`World`] arena and form trees through key-based
//! parent/child links. Every entity carries a Transform and a BoundingBox;
//! Camera, Mesh, Material and Light are attached as [`Component`]s.

pub mod component;
pub mod components;
pub mod entity;
pub mod world;

pub use component::{Component, ComponentData, ComponentKind, ComponentMask, ComponentVariant};
pub use entity::{Entity, EntityEvents, EntityKey, HierarchyChange};
pub use world::World;
