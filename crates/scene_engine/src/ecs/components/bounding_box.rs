//! Bounding box component
//!
//! Aggregates the local bounds of every mesh in the owner's subtree into an
//! oriented box in world space. The box never owns meshes; it only marks
//! itself dirty when the owner or a child reports a change, and
//! [`World::refresh`](crate::ecs::World::refresh) recomputes it.

use std::cell::Cell;
use std::rc::Rc;

use crate::ecs::component::ComponentKind;
use crate::ecs::entity::{EntityEvents, HierarchyChange};
use crate::events::Subscription;
use crate::foundation::ids::ComponentId;
use crate::foundation::math::Mat4;
use crate::spatial::{AABB, OBB};

/// Oriented bounds of an entity and its descendants' meshes
#[derive(Debug)]
pub struct ComponentBoundingBox {
    id: ComponentId,
    local_bounds: Option<AABB>,
    obb: Option<OBB>,
    dirty: Rc<Cell<bool>>,
    subscriptions: Vec<Subscription>,
}

impl ComponentBoundingBox {
    /// Create a dirty box listening to `events`
    pub(crate) fn new(id: ComponentId, events: &EntityEvents) -> Self {
        let dirty = Rc::new(Cell::new(true));

        // Own BoundingBox changes are our own output
        let own = Rc::clone(&dirty);
        let on_own = events.components_changed.subscribe(move |kind| {
            if *kind != ComponentKind::BoundingBox {
                own.set(true);
            }
        });

        let descendants = Rc::clone(&dirty);
        let on_descendants = events
            .components_changed_in_descendants
            .subscribe(move |_| descendants.set(true));

        let hierarchy = Rc::clone(&dirty);
        let on_hierarchy = events.hierarchy_changed.subscribe(move |change| {
            if *change == HierarchyChange::ChildrenChanged {
                hierarchy.set(true);
            }
        });

        Self {
            id,
            local_bounds: None,
            obb: None,
            dirty,
            subscriptions: vec![on_own, on_descendants, on_hierarchy],
        }
    }

    /// Component identity
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// World space box, None when the subtree holds no mesh
    pub fn obb(&self) -> Option<&OBB> {
        self.obb.as_ref()
    }

    /// Bounds in the owner's local space
    pub fn local_bounds(&self) -> Option<&AABB> {
        self.local_bounds.as_ref()
    }

    /// Radius of the sphere enclosing the box
    pub fn enclosing_radius(&self) -> f32 {
        self.obb.as_ref().map_or(0.0, OBB::enclosing_radius)
    }

    /// Whether a change arrived since the last recomputation
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Number of live event subscriptions
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub(crate) fn mark_dirty(&self) {
        self.dirty.set(true);
    }

    /// Store freshly aggregated local bounds, oriented by the owner's world matrix
    pub(crate) fn apply(&mut self, local_bounds: Option<AABB>, owner_global: &Mat4) {
        self.local_bounds = local_bounds;
        self.obb = local_bounds.map(|bounds| OBB::from_local_aabb(&bounds, owner_global));
        self.dirty.set(false);
    }
}
