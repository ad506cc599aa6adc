//! Entity implementation
//!
//! An entity is one node of the scene tree. It is stored in the
//! [`World`](crate::ecs::World) arena and addressed by [`EntityKey`]; parent
//! and children are keys into the same arena.

use slotmap::new_key_type;

use crate::ecs::component::{Component, ComponentKind, ComponentVariant};
use crate::ecs::components::{ComponentBoundingBox, ComponentTransform};
use crate::events::Event;
use crate::foundation::ids::{ComponentId, EntityId};

new_key_type! {
    /// Arena handle of an entity
    pub struct EntityKey;
}

/// Structural change reported by [`EntityEvents::hierarchy_changed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyChange {
    /// The entity itself moved to another parent (or none)
    ParentChanged,
    /// A child was added or removed somewhere in the subtree
    ChildrenChanged,
}

/// Events published by one entity
#[derive(Debug, Default)]
pub struct EntityEvents {
    /// A component of this entity was added, removed or changed
    pub components_changed: Event<ComponentKind>,
    /// A component of a direct child changed
    pub components_changed_in_descendants: Event<ComponentKind>,
    /// Parent or children changed
    pub hierarchy_changed: Event<HierarchyChange>,
}

/// Node of the scene tree
#[derive(Debug)]
pub struct Entity {
    id: EntityId,
    name: String,
    active: bool,
    pub(crate) parent: Option<EntityKey>,
    pub(crate) children: Vec<EntityKey>,
    pub(crate) components: Vec<Component>,
    pub(crate) transform: ComponentTransform,
    pub(crate) bounding_box: ComponentBoundingBox,
    events: EntityEvents,
}

impl Entity {
    pub(crate) fn new(
        id: EntityId,
        name: String,
        transform: ComponentTransform,
        bounding_box: ComponentBoundingBox,
        events: EntityEvents,
    ) -> Self {
        Self {
            id,
            name,
            active: true,
            parent: None,
            children: Vec::new(),
            components: Vec::new(),
            transform,
            bounding_box,
            events,
        }
    }

    /// Get the entity ID
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the entity
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Whether frame hooks run for this entity (and its subtree)
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Toggle frame hooks for this entity; children keep their own flags
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Parent entity, None for a parentless entity
    pub fn parent(&self) -> Option<EntityKey> {
        self.parent
    }

    /// Children in insertion order
    pub fn children(&self) -> &[EntityKey] {
        &self.children
    }

    /// Optional components in attachment order
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Mandatory transform
    pub fn transform(&self) -> &ComponentTransform {
        &self.transform
    }

    /// Mandatory bounding box
    pub fn bounding_box(&self) -> &ComponentBoundingBox {
        &self.bounding_box
    }

    /// Events published by this entity
    pub fn events(&self) -> &EntityEvents {
        &self.events
    }

    /// First component of `kind` in attachment order
    pub fn get_component(&self, kind: ComponentKind) -> Option<&Component> {
        self.components.iter().find(|component| component.kind() == kind)
    }

    /// Every component of `kind` in attachment order
    pub fn get_components(&self, kind: ComponentKind) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(move |component| component.kind() == kind)
    }

    /// Component with this id
    pub fn component_by_id(&self, id: ComponentId) -> Option<&Component> {
        self.components.iter().find(|component| component.id() == id)
    }

    /// Mutable component with this id
    pub fn component_by_id_mut(&mut self, id: ComponentId) -> Option<&mut Component> {
        self.components.iter_mut().find(|component| component.id() == id)
    }

    /// First component of type `T`
    pub fn get_component_as<T: ComponentVariant>(&self) -> Option<&T> {
        self.get_component(T::KIND).and_then(Component::as_variant::<T>)
    }

    /// Mutable first component of type `T`
    pub fn get_component_as_mut<T: ComponentVariant>(&mut self) -> Option<&mut T> {
        self.components
            .iter_mut()
            .find(|component| component.kind() == T::KIND)
            .and_then(Component::as_variant_mut::<T>)
    }

    /// Whether a component of `kind` is present (Transform and BoundingBox always are)
    pub fn has_component(&self, kind: ComponentKind) -> bool {
        match kind {
            ComponentKind::Transform | ComponentKind::BoundingBox => true,
            _ => self.get_component(kind).is_some(),
        }
    }
}
