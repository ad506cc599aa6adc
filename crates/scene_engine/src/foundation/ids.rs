//! Process-stable identifiers for entities and components
//!
//! Identifiers are handed out by an explicit [`IdAllocator`] owned by the
//! [`World`](crate::ecs::World) that creates the objects. Values increase
//! monotonically from 1 and are never reused.

use std::fmt;

/// Identity of an entity, unique within the allocator that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(u64);

impl EntityId {
    /// Raw numeric value
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a component, unique within the allocator that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(u64);

impl ComponentId {
    /// Raw numeric value
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Monotonic id source for entities and components
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next_entity: u64,
    next_component: u64,
}

impl IdAllocator {
    /// Create an allocator whose first ids are 1
    pub fn new() -> Self {
        Self {
            next_entity: 1,
            next_component: 1,
        }
    }

    /// Allocate the next entity id
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        id
    }

    /// Allocate the next component id
    pub fn next_component_id(&mut self) -> ComponentId {
        let id = ComponentId(self.next_component);
        self.next_component += 1;
        id
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
