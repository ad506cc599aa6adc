//! ECS World implementation
//!
//! The world is the arena owning every entity. Tree structure is expressed
//! through keys: an entity's children are owned by index and its parent is
//! a non-owning key back-reference, so reparenting and deletion never leave
//! dangling references.
//!
//! Event listeners registered on entities only raise dirty flags. Work that
//! needs the arena (bounding boxes, camera views) happens in
//! [`World::refresh`].

use slotmap::SlotMap;

use crate::ecs::component::{Component, ComponentData, ComponentKind, ComponentVariant};
use crate::ecs::components::{ComponentCamera, ComponentMesh, ComponentTransform, PoseMode};
use crate::ecs::components::ComponentBoundingBox;
use crate::ecs::entity::{Entity, EntityEvents, EntityKey, HierarchyChange};
use crate::foundation::ids::{ComponentId, IdAllocator};
use crate::foundation::math::{inverse_or_identity, quat_from_euler, Mat4, Point3, Pose, Quat, Vec3};
use crate::render::{FrameContext, GpuMeshHandle, RenderBackend};
use crate::spatial::AABB;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameHook {
    PreUpdate,
    Update,
    PostUpdate,
}

/// Arena of entities forming one or more trees
pub struct World {
    entities: SlotMap<EntityKey, Entity>,
    ids: IdAllocator,
    released_meshes: Vec<GpuMeshHandle>,
}

impl World {
    /// Create a new world
    pub fn new() -> Self {
        Self::with_id_allocator(IdAllocator::new())
    }

    /// Create a world drawing ids from `ids`
    pub fn with_id_allocator(ids: IdAllocator) -> Self {
        Self {
            entities: SlotMap::with_key(),
            ids,
            released_meshes: Vec::new(),
        }
    }

    /// Create a parentless entity with its Transform and BoundingBox
    pub fn create_entity(&mut self, name: impl Into<String>) -> EntityKey {
        let id = self.ids.next_entity_id();
        let events = EntityEvents::default();
        let transform = ComponentTransform::new(self.ids.next_component_id());
        let bounding_box = ComponentBoundingBox::new(self.ids.next_component_id(), &events);

        let entity = Entity::new(id, name.into(), transform, bounding_box, events);
        log::trace!("Created entity {} '{}'", id, entity.name());
        self.entities.insert(entity)
    }

    /// Whether `key` refers to a live entity
    pub fn contains(&self, key: EntityKey) -> bool {
        self.entities.contains_key(key)
    }

    /// Entity behind `key`
    pub fn get(&self, key: EntityKey) -> Option<&Entity> {
        self.entities.get(key)
    }

    /// Mutable entity behind `key` (name, active flag, component flags)
    pub fn get_mut(&mut self, key: EntityKey) -> Option<&mut Entity> {
        self.entities.get_mut(key)
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the world holds no entity
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Every entity in arena order
    pub fn iter(&self) -> impl Iterator<Item = (EntityKey, &Entity)> {
        self.entities.iter()
    }

    /// Entities without a parent
    pub fn roots(&self) -> Vec<EntityKey> {
        self.entities
            .iter()
            .filter(|(_, entity)| entity.parent.is_none())
            .map(|(key, _)| key)
            .collect()
    }

    // ---- Components ----

    /// Attach a component, assigning its id and owner
    ///
    /// Returns None, dropping the component, when the entity is missing or
    /// already holds a component of a kind that allows only one. GPU
    /// buffers of a rejected mesh are queued for release.
    pub fn add_component(&mut self, key: EntityKey, data: impl Into<ComponentData>) -> Option<ComponentId> {
        let mut data = data.into();
        let kind = data.kind();

        let Some(entity) = self.entities.get_mut(key) else {
            log::warn!("Cannot add {:?} to a missing entity", kind);
            self.released_meshes.extend(data.take_gpu_buffers());
            return None;
        };

        if !kind.allows_multiple() && entity.get_component(kind).is_some() {
            log::debug!("Rejected second {:?} on '{}'", kind, entity.name());
            self.released_meshes.extend(data.take_gpu_buffers());
            return None;
        }

        let id = self.ids.next_component_id();
        data.on_attach(entity.events(), &entity.transform);
        entity.components.push(Component::new(id, key, data));

        self.invoke_components_changed_events(key, kind);
        Some(id)
    }

    /// Detach and destroy a component
    ///
    /// No-op returning false when the entity does not own `id`. Listeners
    /// are notified before the component is erased.
    pub fn remove_component(&mut self, key: EntityKey, id: ComponentId) -> bool {
        let Some(kind) = self
            .entities
            .get(key)
            .and_then(|entity| entity.component_by_id(id))
            .map(Component::kind)
        else {
            return false;
        };

        self.invoke_components_changed_events(key, kind);

        let Some(entity) = self.entities.get_mut(key) else {
            return false;
        };
        let Some(index) = entity.components.iter().position(|component| component.id() == id) else {
            return false;
        };
        let mut component = entity.components.remove(index);
        self.released_meshes.extend(component.data_mut().take_gpu_buffers());
        true
    }

    /// First component of `kind` on the entity
    pub fn get_component(&self, key: EntityKey, kind: ComponentKind) -> Option<&Component> {
        self.entities.get(key)?.get_component(kind)
    }

    /// Mutable component by id
    pub fn component_mut(&mut self, key: EntityKey, id: ComponentId) -> Option<&mut Component> {
        self.entities.get_mut(key)?.component_by_id_mut(id)
    }

    /// First component of type `T` on the entity
    pub fn get_component_as<T: ComponentVariant>(&self, key: EntityKey) -> Option<&T> {
        self.entities.get(key)?.get_component_as::<T>()
    }

    /// Mutable first component of type `T` on the entity
    pub fn get_component_as_mut<T: ComponentVariant>(&mut self, key: EntityKey) -> Option<&mut T> {
        self.entities.get_mut(key)?.get_component_as_mut::<T>()
    }

    /// Fire the entity's components-changed event and its parent's
    /// components-changed-in-descendants event (one hop only)
    pub fn invoke_components_changed_events(&self, key: EntityKey, kind: ComponentKind) {
        let Some(entity) = self.entities.get(key) else {
            return;
        };
        entity.events().components_changed.invoke(&kind);

        if let Some(parent) = entity.parent.and_then(|parent| self.entities.get(parent)) {
            parent.events().components_changed_in_descendants.invoke(&kind);
        }
    }

    // ---- Hierarchy ----

    /// Whether `ancestor` is a strict ancestor of `key`
    pub fn is_ancestor_of(&self, ancestor: EntityKey, key: EntityKey) -> bool {
        let mut current = self.entities.get(key).and_then(|entity| entity.parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.entities.get(parent).and_then(|entity| entity.parent);
        }
        false
    }

    /// Whether `key` and every one of its ancestors are active
    ///
    /// Frame hooks reach an entity only when this holds.
    pub fn is_active_in_hierarchy(&self, key: EntityKey) -> bool {
        let mut current = Some(key);
        while let Some(next) = current {
            match self.entities.get(next) {
                Some(entity) if entity.is_active() => current = entity.parent,
                _ => return false,
            }
        }
        true
    }

    /// Topmost ancestor of `key` (itself when parentless)
    pub fn root_of(&self, key: EntityKey) -> EntityKey {
        let mut current = key;
        while let Some(parent) = self.entities.get(current).and_then(|entity| entity.parent) {
            current = parent;
        }
        current
    }

    /// `key` followed by all its descendants, pre-order
    pub fn subtree(&self, key: EntityKey) -> Vec<EntityKey> {
        let mut order = Vec::new();
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            let Some(entity) = self.entities.get(current) else {
                continue;
            };
            order.push(current);
            stack.extend(entity.children.iter().rev().copied());
        }
        order
    }

    /// All descendants of `key`, pre-order
    pub fn descendants(&self, key: EntityKey) -> Vec<EntityKey> {
        let mut order = self.subtree(key);
        if !order.is_empty() {
            order.remove(0);
        }
        order
    }

    /// First entity named `name` in the subtree of `root`, pre-order
    pub fn find_by_name(&self, root: EntityKey, name: &str) -> Option<EntityKey> {
        self.subtree(root)
            .into_iter()
            .find(|key| self.entities.get(*key).is_some_and(|entity| entity.name() == name))
    }

    /// Move `child` under `new_parent`, or make it parentless with None
    ///
    /// Rejected (false) when either entity is missing, when `child` would
    /// become its own parent, or when `new_parent` is a descendant of
    /// `child`. The local pose is kept; the global pose is re-derived.
    pub fn set_parent(&mut self, child: EntityKey, new_parent: Option<EntityKey>) -> bool {
        let Some(old_parent) = self.entities.get(child).map(|entity| entity.parent) else {
            return false;
        };

        if let Some(parent) = new_parent {
            if parent == child {
                log::debug!("Rejected parenting an entity to itself");
                return false;
            }
            if !self.entities.contains_key(parent) {
                return false;
            }
            if self.is_ancestor_of(child, parent) {
                log::debug!("Rejected parenting an entity to its own descendant");
                return false;
            }
        }

        if old_parent == new_parent {
            return true;
        }

        if let Some(old) = old_parent {
            self.detach_from(old, child);
        }

        if let Some(parent) = new_parent {
            if let Some(entity) = self.entities.get_mut(parent) {
                entity.children.push(child);
            }
            if let Some(entity) = self.entities.get_mut(child) {
                entity.parent = Some(parent);
            }
            self.fire_children_changed(parent);
        }

        if let Some(entity) = self.entities.get(child) {
            entity.events().hierarchy_changed.invoke(&HierarchyChange::ParentChanged);
        }

        self.recompute_from_local(child);
        true
    }

    /// Add `child` under `parent`; false if it already is a child or the move is rejected
    pub fn add_child(&mut self, parent: EntityKey, child: EntityKey) -> bool {
        if self.entities.get(child).and_then(|entity| entity.parent) == Some(parent) {
            return false;
        }
        self.set_parent(child, Some(parent))
    }

    /// Make `child` parentless; false if it is not a child of `parent`
    pub fn remove_child(&mut self, parent: EntityKey, child: EntityKey) -> bool {
        if self.entities.get(child).and_then(|entity| entity.parent) != Some(parent) {
            return false;
        }
        self.set_parent(child, None)
    }

    /// Detach `key` from its parent, then destroy it and its whole subtree
    ///
    /// GPU buffers of destroyed meshes are queued for release.
    pub fn destroy_entity(&mut self, key: EntityKey) -> bool {
        let Some(parent) = self.entities.get(key).map(|entity| entity.parent) else {
            return false;
        };
        if let Some(parent) = parent {
            self.detach_from(parent, key);
        }

        let subtree = self.subtree(key);
        let count = subtree.len();
        for current in subtree.into_iter().rev() {
            if let Some(mut entity) = self.entities.remove(current) {
                for component in entity.components.iter_mut() {
                    self.released_meshes.extend(component.data_mut().take_gpu_buffers());
                }
            }
        }
        log::debug!("Destroyed {} entities", count);
        true
    }

    fn detach_from(&mut self, parent: EntityKey, child: EntityKey) {
        if let Some(entity) = self.entities.get_mut(parent) {
            entity.children.retain(|key| *key != child);
        }
        if let Some(entity) = self.entities.get_mut(child) {
            entity.parent = None;
        }
        self.fire_children_changed(parent);
    }

    /// ChildrenChanged on `key` and every ancestor up to the root
    fn fire_children_changed(&self, key: EntityKey) {
        let mut current = Some(key);
        while let Some(entity) = current.and_then(|key| self.entities.get(key)) {
            entity.events().hierarchy_changed.invoke(&HierarchyChange::ChildrenChanged);
            current = entity.parent;
        }
    }

    // ---- Transforms ----

    fn parent_global(&self, key: EntityKey) -> Option<Mat4> {
        let parent = self.entities.get(key)?.parent?;
        self.entities.get(parent).map(|entity| *entity.transform.global_matrix())
    }

    /// Re-derive the global pose of `key` and its descendants from their local poses
    fn recompute_from_local(&mut self, key: EntityKey) {
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            let parent_global = self.parent_global(current);
            let Some(entity) = self.entities.get_mut(current) else {
                continue;
            };
            entity.transform.recompute(PoseMode::GlobalFromLocal, parent_global.as_ref());
            stack.extend(entity.children.iter().rev().copied());
            self.invoke_components_changed_events(current, ComponentKind::Transform);
        }
    }

    /// Write the driving pose, recompute, notify, then carry descendants along
    fn mutate_transform(&mut self, key: EntityKey, mode: PoseMode, write: impl FnOnce(&mut ComponentTransform)) {
        let parent_global = self.parent_global(key);
        let Some(entity) = self.entities.get_mut(key) else {
            log::debug!("Transform change on a missing entity ignored");
            return;
        };

        write(&mut entity.transform);
        entity.transform.recompute(mode, parent_global.as_ref());
        let children = entity.children.clone();

        self.invoke_components_changed_events(key, ComponentKind::Transform);
        for child in children {
            self.recompute_from_local(child);
        }
    }

    /// Set world space position
    pub fn set_position(&mut self, key: EntityKey, position: Vec3) {
        self.mutate_transform(key, PoseMode::LocalFromGlobal, |t| t.global_pose_mut().position = position);
    }

    /// Set world space scale
    pub fn set_scale(&mut self, key: EntityKey, scale: Vec3) {
        self.mutate_transform(key, PoseMode::LocalFromGlobal, |t| t.global_pose_mut().scale = scale);
    }

    /// Set world space rotation
    pub fn set_rotation(&mut self, key: EntityKey, rotation: Quat) {
        self.mutate_transform(key, PoseMode::LocalFromGlobal, |t| t.global_pose_mut().rotation = rotation);
    }

    /// Set world space rotation from Euler angles (radians)
    pub fn set_euler_rotation(&mut self, key: EntityKey, euler: Vec3) {
        self.set_rotation(key, quat_from_euler(&euler));
    }

    /// Set position relative to the parent
    pub fn set_local_position(&mut self, key: EntityKey, position: Vec3) {
        self.mutate_transform(key, PoseMode::GlobalFromLocal, |t| t.local_pose_mut().position = position);
    }

    /// Set scale relative to the parent
    pub fn set_local_scale(&mut self, key: EntityKey, scale: Vec3) {
        self.mutate_transform(key, PoseMode::GlobalFromLocal, |t| t.local_pose_mut().scale = scale);
    }

    /// Set rotation relative to the parent
    pub fn set_local_rotation(&mut self, key: EntityKey, rotation: Quat) {
        self.mutate_transform(key, PoseMode::GlobalFromLocal, |t| t.local_pose_mut().rotation = rotation);
    }

    /// Set rotation relative to the parent from Euler angles (radians)
    pub fn set_local_euler_rotation(&mut self, key: EntityKey, euler: Vec3) {
        self.set_local_rotation(key, quat_from_euler(&euler));
    }

    /// Replace the whole local pose
    pub fn set_local_pose(&mut self, key: EntityKey, pose: Pose) {
        self.mutate_transform(key, PoseMode::GlobalFromLocal, |t| *t.local_pose_mut() = pose);
    }

    // ---- Derived state ----

    /// Bring camera views and bounding boxes up to date
    ///
    /// Boxes are recomputed in post-order, so a recomputed child notifies
    /// its parent before the parent is visited and bounds reach the root
    /// in one call.
    pub fn refresh(&mut self) {
        for entity in self.entities.values_mut() {
            let Entity { components, transform, .. } = entity;
            for component in components.iter_mut() {
                if let Some(camera) = component.as_variant_mut::<ComponentCamera>() {
                    if camera.is_view_dirty() {
                        camera.update_view(transform);
                    }
                }
            }
        }

        for root in self.roots() {
            let mut order = self.subtree(root);
            order.reverse();
            for key in order {
                let dirty = self
                    .entities
                    .get(key)
                    .is_some_and(|entity| entity.bounding_box.is_dirty());
                if !dirty {
                    continue;
                }

                let local_bounds = self.aggregate_mesh_bounds(key);
                if let Some(entity) = self.entities.get_mut(key) {
                    let owner_global = *entity.transform.global_matrix();
                    entity.bounding_box.apply(local_bounds, &owner_global);
                }
                self.invoke_components_changed_events(key, ComponentKind::BoundingBox);
            }
        }
    }

    /// Mark every bounding box dirty so the next refresh recomputes all of them
    pub fn invalidate_bounds(&self) {
        for entity in self.entities.values() {
            entity.bounding_box.mark_dirty();
        }
    }

    /// Union of the subtree's mesh bounds, in the local space of `key`
    fn aggregate_mesh_bounds(&self, key: EntityKey) -> Option<AABB> {
        let owner = self.entities.get(key)?;
        let to_owner_space = inverse_or_identity(owner.transform.global_matrix());

        let mut bounds = AABB::empty();
        for current in self.subtree(key) {
            let Some(entity) = self.entities.get(current) else {
                continue;
            };
            let to_owner = to_owner_space * entity.transform.global_matrix();
            let meshes = entity
                .get_components(ComponentKind::Mesh)
                .filter_map(Component::as_variant::<ComponentMesh>);
            for mesh in meshes {
                if let Some(local) = mesh.local_bounds() {
                    for corner in local.corners() {
                        bounds.grow(to_owner.transform_point(&Point3::from(corner)).coords);
                    }
                }
            }
        }

        (!bounds.is_empty()).then_some(bounds)
    }

    // ---- Frame hooks ----

    /// Run PreUpdate over the subtree of `root`
    pub fn pre_update(&self, root: EntityKey, ctx: &mut FrameContext<'_>) {
        self.run_hook(root, FrameHook::PreUpdate, ctx);
    }

    /// Run Update over the subtree of `root`
    pub fn update(&self, root: EntityKey, ctx: &mut FrameContext<'_>) {
        self.run_hook(root, FrameHook::Update, ctx);
    }

    /// Run PostUpdate over the subtree of `root`
    pub fn post_update(&self, root: EntityKey, ctx: &mut FrameContext<'_>) {
        self.run_hook(root, FrameHook::PostUpdate, ctx);
    }

    /// Components first, then children; inactive entities skip their whole subtree
    fn run_hook(&self, key: EntityKey, hook: FrameHook, ctx: &mut FrameContext<'_>) {
        let Some(entity) = self.entities.get(key) else {
            return;
        };
        if !entity.is_active() {
            return;
        }

        for component in entity.components.iter().filter(|component| component.is_enabled()) {
            match hook {
                FrameHook::PreUpdate => component.data().pre_update(&entity.transform, ctx),
                FrameHook::Update => component.data().update(&entity.transform, ctx),
                FrameHook::PostUpdate => component.data().post_update(&entity.transform, ctx),
            }
        }

        for child in &entity.children {
            self.run_hook(*child, hook, ctx);
        }
    }

    // ---- GPU resources ----

    /// Number of GPU buffers waiting to be released
    pub fn pending_release_count(&self) -> usize {
        self.released_meshes.len()
    }

    /// Hand every queued GPU buffer back to the backend
    pub fn release_gpu_resources(&mut self, backend: &mut dyn RenderBackend) {
        for handle in self.released_meshes.drain(..) {
            backend.release_mesh_buffers(handle);
        }
    }

    /// Destroy every entity and queue all their GPU buffers for release
    pub fn clear(&mut self) {
        for root in self.roots() {
            self.destroy_entity(root);
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.entities.len())
            .field("pending_releases", &self.released_meshes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::{cube_geometry, ComponentLight, ComponentMaterial};
    use crate::render::{GizmoShape, RecordingBackend, RenderCommand};
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn cube(backend: &mut RecordingBackend) -> ComponentMesh {
        let (vertices, indices) = cube_geometry(0.5);
        ComponentMesh::load(&vertices, &indices, backend).unwrap()
    }

    fn assert_composes(world: &World, key: EntityKey) {
        let entity = world.get(key).unwrap();
        let expected = match entity.parent() {
            Some(parent) => world.get(parent).unwrap().transform().global_matrix() * entity.transform().local_matrix(),
            None => *entity.transform().local_matrix(),
        };
        assert_relative_eq!(*entity.transform().global_matrix(), expected, epsilon = 1e-4);
    }

    #[test]
    fn test_create_entity_has_mandatory_components() {
        let mut world = World::new();
        let a = world.create_entity("a");
        let b = world.create_entity("b");

        let (a, b) = (world.get(a).unwrap(), world.get(b).unwrap());
        assert!(a.id() < b.id());
        assert!(a.has_component(ComponentKind::Transform));
        assert!(a.has_component(ComponentKind::BoundingBox));
        assert!(a.components().is_empty());
        assert!(a.is_active());
        assert!(a.parent().is_none());
        assert_ne!(a.transform().id(), a.bounding_box().id());
    }

    #[test]
    fn test_grandchild_global_position() {
        let mut world = World::new();
        let root = world.create_entity("root");
        let a = world.create_entity("A");
        let b = world.create_entity("B");

        assert!(world.add_child(root, a));
        world.set_local_position(a, Vec3::new(1.0, 0.0, 0.0));
        assert!(world.add_child(a, b));
        world.set_local_position(b, Vec3::new(0.0, 1.0, 0.0));
        world.set_position(root, Vec3::new(5.0, 0.0, 0.0));

        let b_position = world.get(b).unwrap().transform().position();
        assert_relative_eq!(b_position, Vec3::new(6.0, 1.0, 0.0), epsilon = 1e-5);
        for key in [root, a, b] {
            assert_composes(&world, key);
        }
    }

    #[test]
    fn test_global_matrix_composes_after_every_mutation() {
        let mut world = World::new();
        let parent = world.create_entity("parent");
        let child = world.create_entity("child");
        world.add_child(parent, child);

        world.set_local_euler_rotation(parent, Vec3::new(0.0, 0.8, 0.0));
        world.set_local_scale(parent, Vec3::new(2.0, 2.0, 2.0));
        assert_composes(&world, child);

        world.set_position(child, Vec3::new(3.0, -1.0, 4.0));
        assert_composes(&world, child);
        world.set_euler_rotation(child, Vec3::new(0.1, 0.2, 0.3));
        assert_composes(&world, child);
        world.set_scale(child, Vec3::new(1.0, 1.0, 1.0));
        assert_composes(&world, child);
    }

    #[test]
    fn test_global_local_position_roundtrip() {
        let mut world = World::new();
        let parent = world.create_entity("parent");
        let child = world.create_entity("child");
        world.add_child(parent, child);
        world.set_local_pose(
            parent,
            Pose {
                position: Vec3::new(2.0, 1.0, -3.0),
                rotation: quat_from_euler(&Vec3::new(0.3, -0.4, 0.5)),
                scale: Vec3::new(1.5, 1.5, 1.5),
            },
        );

        let target = Vec3::new(-4.0, 7.0, 2.5);
        world.set_position(child, target);
        let local = world.get(child).unwrap().transform().local_position();
        world.set_local_position(child, local);

        assert_relative_eq!(world.get(child).unwrap().transform().position(), target, epsilon = 1e-4);
    }

    #[test]
    fn test_euler_mirror_follows_rotation() {
        let mut world = World::new();
        let key = world.create_entity("spinner");
        let rotation = quat_from_euler(&Vec3::new(0.2, 0.3, 0.4));
        world.set_rotation(key, rotation);

        let euler = world.get(key).unwrap().transform().euler_rotation();
        assert_relative_eq!(euler, Vec3::new(0.2, 0.3, 0.4), epsilon = 1e-4);
    }

    #[test]
    fn test_second_camera_is_rejected() {
        let mut world = World::new();
        let key = world.create_entity("camera");

        assert!(world.add_component(key, ComponentCamera::perspective(1.0, 1.0, 0.1, 100.0)).is_some());
        assert!(world.add_component(key, ComponentCamera::perspective(1.0, 1.0, 0.1, 100.0)).is_none());

        let entity = world.get(key).unwrap();
        assert_eq!(entity.components().len(), 1);
        assert_eq!(entity.get_components(ComponentKind::Camera).count(), 1);
    }

    #[test]
    fn test_multiple_meshes_allowed() {
        let mut world = World::new();
        let mut backend = RecordingBackend::new();
        let key = world.create_entity("model");

        assert!(world.add_component(key, cube(&mut backend)).is_some());
        assert!(world.add_component(key, cube(&mut backend)).is_some());
        assert_eq!(world.get(key).unwrap().get_components(ComponentKind::Mesh).count(), 2);
    }

    #[test]
    fn test_rejected_mesh_buffers_are_released() {
        let mut world = World::new();
        let mut backend = RecordingBackend::new();
        let removed = world.create_entity("removed");
        world.destroy_entity(removed);

        assert!(world.add_component(removed, cube(&mut backend)).is_none());
        world.release_gpu_resources(&mut backend);
        assert_eq!(backend.live_mesh_count(), 0);
    }

    #[test]
    fn test_remove_absent_component_is_noop() {
        let mut world = World::new();
        let a = world.create_entity("a");
        let b = world.create_entity("b");
        world.add_component(a, ComponentMaterial::new());
        let foreign = world.add_component(b, ComponentMaterial::new()).unwrap();

        assert!(!world.remove_component(a, foreign));
        assert_eq!(world.get(a).unwrap().components().len(), 1);
        assert_eq!(world.get(b).unwrap().components().len(), 1);
    }

    #[test]
    fn test_remove_component_notifies_before_erasing() {
        let mut world = World::new();
        let key = world.create_entity("lit");
        let id = world.add_component(key, ComponentLight::point(Vec3::repeat(1.0), 1.0)).unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let _subscription = world
            .get(key)
            .unwrap()
            .events()
            .components_changed
            .subscribe(move |kind| log.borrow_mut().push(*kind));

        assert!(world.remove_component(key, id));
        assert!(!world.remove_component(key, id));
        assert_eq!(*seen.borrow(), vec![ComponentKind::Light]);
        assert!(world.get(key).unwrap().components().is_empty());
    }

    #[test]
    fn test_reparent_onto_descendant_is_rejected() {
        let mut world = World::new();
        let a = world.create_entity("a");
        let b = world.create_entity("b");
        let c = world.create_entity("c");
        world.add_child(a, b);
        world.add_child(b, c);

        assert!(!world.set_parent(a, Some(c)));
        assert!(!world.set_parent(a, Some(b)));
        assert!(!world.set_parent(a, Some(a)));
        assert!(world.get(a).unwrap().parent().is_none());
        assert_eq!(world.get(b).unwrap().parent(), Some(a));
    }

    #[test]
    fn test_add_and_remove_child_are_idempotent() {
        let mut world = World::new();
        let parent = world.create_entity("parent");
        let child = world.create_entity("child");

        assert!(world.add_child(parent, child));
        assert!(!world.add_child(parent, child));
        assert_eq!(world.get(parent).unwrap().children(), &[child]);

        assert!(world.remove_child(parent, child));
        assert!(!world.remove_child(parent, child));
        assert!(world.get(parent).unwrap().children().is_empty());
        assert!(world.get(child).unwrap().parent().is_none());
    }

    #[test]
    fn test_set_parent_keeps_local_pose() {
        let mut world = World::new();
        let old_parent = world.create_entity("old");
        let new_parent = world.create_entity("new");
        let child = world.create_entity("child");
        world.set_position(new_parent, Vec3::new(10.0, 0.0, 0.0));
        world.add_child(old_parent, child);
        world.set_local_position(child, Vec3::new(1.0, 2.0, 3.0));

        assert!(world.set_parent(child, Some(new_parent)));
        let transform = world.get(child).unwrap().transform();
        assert_relative_eq!(transform.local_position(), Vec3::new(1.0, 2.0, 3.0), epsilon = 1e-5);
        assert_relative_eq!(transform.position(), Vec3::new(11.0, 2.0, 3.0), epsilon = 1e-5);
        assert!(world.get(old_parent).unwrap().children().is_empty());
    }

    #[test]
    fn test_children_changed_reaches_every_ancestor() {
        let mut world = World::new();
        let root = world.create_entity("root");
        let middle = world.create_entity("middle");
        let leaf = world.create_entity("leaf");
        world.add_child(root, middle);

        let changes = Rc::new(RefCell::new(Vec::new()));
        let root_log = Rc::clone(&changes);
        let _on_root = world
            .get(root)
            .unwrap()
            .events()
            .hierarchy_changed
            .subscribe(move |change| root_log.borrow_mut().push(("root", *change)));
        let leaf_log = Rc::clone(&changes);
        let _on_leaf = world
            .get(leaf)
            .unwrap()
            .events()
            .hierarchy_changed
            .subscribe(move |change| leaf_log.borrow_mut().push(("leaf", *change)));

        world.add_child(middle, leaf);

        assert_eq!(
            *changes.borrow(),
            vec![
                ("root", HierarchyChange::ChildrenChanged),
                ("leaf", HierarchyChange::ParentChanged),
            ]
        );
    }

    #[test]
    fn test_descendant_change_is_single_hop() {
        let mut world = World::new();
        let root = world.create_entity("root");
        let middle = world.create_entity("middle");
        let leaf = world.create_entity("leaf");
        world.add_child(root, middle);
        world.add_child(middle, leaf);

        let root_calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&root_calls);
        let _subscription = world
            .get(root)
            .unwrap()
            .events()
            .components_changed_in_descendants
            .subscribe(move |kind| {
                if *kind == ComponentKind::Material {
                    *counter.borrow_mut() += 1;
                }
            });

        world.add_component(leaf, ComponentMaterial::new());
        assert_eq!(*root_calls.borrow(), 0);
        world.add_component(middle, ComponentMaterial::new());
        assert_eq!(*root_calls.borrow(), 1);
    }

    #[test]
    fn test_bounds_bubble_to_root() {
        let mut world = World::new();
        let mut backend = RecordingBackend::new();
        let root = world.create_entity("root");
        let child = world.create_entity("child");
        let grandchild = world.create_entity("grandchild");
        world.add_child(root, child);
        world.add_child(child, grandchild);
        world.set_local_position(grandchild, Vec3::new(10.0, 0.0, 0.0));
        world.add_component(grandchild, cube(&mut backend));

        world.refresh();

        let root_box = world.get(root).unwrap().bounding_box();
        let obb = root_box.obb().unwrap();
        assert_relative_eq!(obb.center, Vec3::new(10.0, 0.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(obb.half_extents, Vec3::repeat(0.5), epsilon = 1e-5);
        assert!(!root_box.is_dirty());

        world.set_local_position(child, Vec3::new(0.0, 3.0, 0.0));
        world.refresh();
        let obb = world.get(root).unwrap().bounding_box().obb().unwrap();
        assert_relative_eq!(obb.center, Vec3::new(10.0, 3.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_bounds_shrink_when_mesh_reparented_away() {
        let mut world = World::new();
        let mut backend = RecordingBackend::new();
        let root = world.create_entity("root");
        let holder = world.create_entity("holder");
        world.add_child(root, holder);
        world.add_component(holder, cube(&mut backend));
        world.refresh();
        assert!(world.get(root).unwrap().bounding_box().obb().is_some());

        world.set_parent(holder, None);
        world.refresh();
        assert!(world.get(root).unwrap().bounding_box().obb().is_none());
    }

    #[test]
    fn test_destroy_entity_releases_subtree_buffers() {
        let mut world = World::new();
        let mut backend = RecordingBackend::new();
        let root = world.create_entity("root");
        let child = world.create_entity("child");
        let grandchild = world.create_entity("grandchild");
        world.add_child(root, child);
        world.add_child(child, grandchild);
        world.add_component(child, cube(&mut backend));
        world.add_component(grandchild, cube(&mut backend));

        assert!(world.destroy_entity(child));
        assert!(!world.contains(grandchild));
        assert!(world.get(root).unwrap().children().is_empty());
        assert_eq!(world.pending_release_count(), 2);

        world.release_gpu_resources(&mut backend);
        assert_eq!(backend.live_mesh_count(), 0);
        assert_eq!(backend.released_meshes().len(), 2);
    }

    #[test]
    fn test_hooks_skip_inactive_subtrees_and_disabled_components() {
        let mut world = World::new();
        let root = world.create_entity("root");
        let lamp = world.create_entity("lamp");
        let hidden = world.create_entity("hidden");
        let hidden_child = world.create_entity("hidden child");
        world.add_child(root, lamp);
        world.add_child(root, hidden);
        world.add_child(hidden, hidden_child);

        let lamp_light = world.add_component(lamp, ComponentLight::point(Vec3::repeat(1.0), 1.0)).unwrap();
        world.add_component(hidden_child, ComponentLight::directional(Vec3::repeat(1.0), 1.0));
        world.get_mut(hidden).unwrap().set_active(false);

        let mut backend = RecordingBackend::new();
        world.post_update(root, &mut FrameContext::new(&mut backend));
        assert_eq!(backend.gizmos(), vec![GizmoShape::Sphere]);

        world.component_mut(lamp, lamp_light).unwrap().disable();
        backend.clear_commands();
        world.post_update(root, &mut FrameContext::new(&mut backend));
        assert!(backend.gizmos().is_empty());
    }

    #[test]
    fn test_active_in_hierarchy_follows_ancestors() {
        let mut world = World::new();
        let root = world.create_entity("root");
        let parent = world.create_entity("parent");
        let child = world.create_entity("child");
        world.add_child(root, parent);
        world.add_child(parent, child);
        assert!(world.is_active_in_hierarchy(child));

        world.get_mut(parent).unwrap().set_active(false);
        assert!(world.get(child).unwrap().is_active());
        assert!(!world.is_active_in_hierarchy(child));
        assert!(world.is_active_in_hierarchy(root));

        world.destroy_entity(parent);
        assert!(!world.is_active_in_hierarchy(child));
    }

    #[test]
    fn test_typed_access_keeps_component_kind() {
        let mut world = World::new();
        let key = world.create_entity("lamp");
        let light = world.add_component(key, ComponentLight::directional(Vec3::repeat(1.0), 1.0)).unwrap();

        let component = world.component_mut(key, light).unwrap();
        assert!(component.as_variant_mut::<ComponentCamera>().is_none());
        assert!(component.as_variant_mut::<ComponentLight>().is_some());
        assert_eq!(component.kind(), ComponentKind::Light);

        let entity = world.get(key).unwrap();
        assert_eq!(entity.get_components(ComponentKind::Camera).count(), 0);
        assert_eq!(entity.get_components(ComponentKind::Light).count(), 1);
    }

    #[test]
    fn test_update_draws_with_model_matrix() {
        let mut world = World::new();
        let mut backend = RecordingBackend::new();
        let key = world.create_entity("model");
        world.set_position(key, Vec3::new(1.0, 2.0, 3.0));
        world.add_component(key, ComponentMaterial::new());
        let mesh = world.add_component(key, cube(&mut backend)).unwrap();

        backend.clear_commands();
        world.update(key, &mut FrameContext::new(&mut backend));
        assert_eq!(backend.draw_count(), 1);
        assert!(matches!(backend.commands()[0], RenderCommand::UseShader(_)));

        world
            .component_mut(key, mesh)
            .and_then(|component| component.as_variant_mut::<ComponentMesh>())
            .unwrap()
            .set_culled(true);
        backend.clear_commands();
        world.update(key, &mut FrameContext::new(&mut backend));
        assert_eq!(backend.draw_count(), 0);
    }

    #[test]
    fn test_find_and_descendants() {
        let mut world = World::new();
        let root = world.create_entity("root");
        let a = world.create_entity("a");
        let b = world.create_entity("b");
        let c = world.create_entity("c");
        world.add_child(root, a);
        world.add_child(root, b);
        world.add_child(a, c);

        assert_eq!(world.descendants(root), vec![a, c, b]);
        assert_eq!(world.find_by_name(root, "c"), Some(c));
        assert_eq!(world.root_of(c), root);
        assert!(world.is_ancestor_of(root, c));
        assert!(!world.is_ancestor_of(c, root));
    }
}
