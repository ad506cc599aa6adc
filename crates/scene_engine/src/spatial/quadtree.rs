//! Quadtree spatial partitioning over the horizontal X/Z plane
//!
//! Nodes split into four quadrants along X and Z only; every node keeps the
//! full Y range of its container. Entities are referenced by key together
//! with the axis-aligned box they were inserted with, so queries never touch
//! the scene.
//!
//! Containment and child placement only look at X/Z. The Y range of the
//! tree grows to cover whatever is inserted, so nothing is rejected for
//! sitting above or below the container.
//!
//! Quadrants are named looking down the Y axis with +X east and +Z north.

use std::collections::HashSet;

use crate::ecs::EntityKey;
use crate::foundation::math::Vec3;
use crate::spatial::primitives::{AABB, OBB};
use crate::spatial::spatial_query::SpatialShape;
use crate::spatial::{DEFAULT_CAPACITY, DEFAULT_MIN_HALF_SIZE_SQ};

/// Nodes at this depth never subdivide, whatever the configuration
pub const MAX_DEPTH: u32 = 16;

fn overlaps_xz(a: &AABB, b: &AABB) -> bool {
    a.min.x <= b.max.x && a.max.x >= b.min.x && a.min.z <= b.max.z && a.max.z >= b.min.z
}

/// Configuration for quadtree subdivision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadTreeConfig {
    /// Entries a leaf holds before it subdivides
    pub capacity: usize,

    /// Leaves whose squared X/Z half extent is at or below this never subdivide
    pub min_half_size_sq: f32,
}

impl Default for QuadTreeConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            min_half_size_sq: DEFAULT_MIN_HALF_SIZE_SQ,
        }
    }
}

impl QuadTreeConfig {
    /// Copy with a capacity of at least one and a finite, non-negative minimum size
    pub fn sanitized(self) -> Self {
        let capacity = self.capacity.max(1);
        let min_half_size_sq = if self.min_half_size_sq.is_finite() {
            self.min_half_size_sq.max(0.0)
        } else {
            DEFAULT_MIN_HALF_SIZE_SQ
        };
        if capacity != self.capacity || min_half_size_sq != self.min_half_size_sq {
            log::warn!(
                "Quadtree config {:?} adjusted to capacity {} and min_half_size_sq {}",
                self,
                capacity,
                min_half_size_sq
            );
        }
        Self {
            capacity,
            min_half_size_sq,
        }
    }
}

impl From<&crate::core::SpatialConfig> for QuadTreeConfig {
    fn from(config: &crate::core::SpatialConfig) -> Self {
        Self {
            capacity: config.capacity,
            min_half_size_sq: config.min_half_size_sq,
        }
        .sanitized()
    }
}

/// Child position inside an internal node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    /// +X, +Z
    NorthEast = 0,
    /// +X, -Z
    SouthEast = 1,
    /// -X, -Z
    SouthWest = 2,
    /// -X, +Z
    NorthWest = 3,
}

impl Quadrant {
    /// All quadrants in child storage order
    pub const ALL: [Quadrant; 4] = [
        Quadrant::NorthEast,
        Quadrant::SouthEast,
        Quadrant::SouthWest,
        Quadrant::NorthWest,
    ];

    fn signs(self) -> (f32, f32) {
        match self {
            Quadrant::NorthEast => (1.0, 1.0),
            Quadrant::SouthEast => (1.0, -1.0),
            Quadrant::SouthWest => (-1.0, -1.0),
            Quadrant::NorthWest => (-1.0, 1.0),
        }
    }
}

/// Entity reference stored in a node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadTreeEntry {
    /// Entity the bounds belong to
    pub entity: EntityKey,
    /// World-space axis-aligned bounds at insertion time
    pub bounds: AABB,
}

/// Single node in the quadtree hierarchy
#[derive(Debug, Clone)]
pub struct QuadTreeNode {
    /// World-space bounds of this node
    pub bounds: AABB,

    /// Entries held directly by this node
    pub entries: Vec<QuadTreeEntry>,

    /// Child nodes in [`Quadrant::ALL`] order, None if this is a leaf
    pub children: Option<Box<[QuadTreeNode; 4]>>,

    /// Depth in the tree (0 = root)
    pub depth: u32,
}

impl QuadTreeNode {
    /// Create a new leaf node
    pub fn new(bounds: AABB, depth: u32) -> Self {
        Self {
            bounds,
            entries: Vec::new(),
            children: None,
            depth,
        }
    }

    /// Check if this node is a leaf (has no children)
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Child node in `quadrant`, None for leaves
    pub fn child(&self, quadrant: Quadrant) -> Option<&QuadTreeNode> {
        self.children.as_ref().map(|children| &children[quadrant as usize])
    }

    /// Squared half extent over the X/Z plane
    fn half_size_sq(&self) -> f32 {
        let extents = self.bounds.extents();
        extents.x * extents.x + extents.z * extents.z
    }

    /// Split into four X/Z quadrants that keep this node's Y range
    fn subdivide(&mut self) {
        if self.children.is_some() {
            return;
        }

        let center = self.bounds.center();
        let extents = self.bounds.extents();
        let depth = self.depth + 1;
        let child_extents = Vec3::new(extents.x * 0.5, extents.y, extents.z * 0.5);

        let make_child = |quadrant: Quadrant| {
            let (x_sign, z_sign) = quadrant.signs();
            let child_center = Vec3::new(
                center.x + child_extents.x * x_sign,
                center.y,
                center.z + child_extents.z * z_sign,
            );
            QuadTreeNode::new(
                AABB::from_center_extents(child_center, child_extents),
                depth,
            )
        };

        self.children = Some(Box::new(Quadrant::ALL.map(make_child)));
    }

    /// Widen this node and its descendants to cover `min_y..=max_y`
    fn stretch_y(&mut self, min_y: f32, max_y: f32) {
        self.bounds.min.y = self.bounds.min.y.min(min_y);
        self.bounds.max.y = self.bounds.max.y.max(max_y);
        if let Some(ref mut children) = self.children {
            for child in children.iter_mut() {
                child.stretch_y(min_y, max_y);
            }
        }
    }

    /// Insert an entry into this node or its descendants
    pub fn insert(&mut self, entry: QuadTreeEntry, config: &QuadTreeConfig) {
        if self.is_leaf() {
            if self.entries.len() < config.capacity
                || self.half_size_sq() <= config.min_half_size_sq
                || self.depth >= MAX_DEPTH
            {
                self.entries.push(entry);
                return;
            }

            self.subdivide();
            self.entries.push(entry);
            let pending = std::mem::take(&mut self.entries);
            for entry in pending {
                self.place(entry, config);
            }
            return;
        }

        self.place(entry, config);
    }

    /// Keep an entry that straddles all four quadrants, push the rest down
    fn place(&mut self, entry: QuadTreeEntry, config: &QuadTreeConfig) {
        let Some(children) = self.children.as_mut() else {
            self.entries.push(entry);
            return;
        };

        let overlaps = children
            .iter()
            .map(|child| overlaps_xz(&child.bounds, &entry.bounds))
            .collect::<Vec<_>>();

        if overlaps.iter().all(|hit| *hit) {
            self.entries.push(entry);
            return;
        }

        for (child, hit) in children.iter_mut().zip(overlaps) {
            if hit {
                child.insert(entry, config);
            }
        }
    }

    /// Remove every entry referencing `entity` from this node and its descendants
    pub fn remove(&mut self, entity: EntityKey) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.entity != entity);
        let mut removed = self.entries.len() != before;

        if let Some(ref mut children) = self.children {
            for child in children.iter_mut() {
                removed |= child.remove(entity);
            }
        }

        removed
    }

    /// Depth-first query, returns the number of nodes visited
    fn collect_intersections<S: SpatialShape + ?Sized>(
        &self,
        shape: &S,
        hits: &mut Vec<(EntityKey, f32)>,
    ) -> usize {
        if !shape.intersects_aabb(&self.bounds) {
            return 0;
        }

        for entry in &self.entries {
            if shape.intersects_aabb(&entry.bounds) {
                let distance = shape.first_hit_aabb(&entry.bounds).unwrap_or(0.0);
                hits.push((entry.entity, distance));
            }
        }

        let mut visited = 1;
        if let Some(ref children) = self.children {
            for child in children.iter() {
                visited += child.collect_intersections(shape, hits);
            }
        }
        visited
    }

    /// Get all leaf nodes
    pub fn get_all_leaves<'a>(&'a self, leaves: &mut Vec<&'a QuadTreeNode>) {
        if self.is_leaf() {
            leaves.push(self);
        } else if let Some(ref children) = self.children {
            for child in children.iter() {
                child.get_all_leaves(leaves);
            }
        }
    }

    fn collect_entities(&self, entities: &mut HashSet<EntityKey>) {
        entities.extend(self.entries.iter().map(|entry| entry.entity));
        if let Some(ref children) = self.children {
            for child in children.iter() {
                child.collect_entities(entities);
            }
        }
    }

    fn node_count(&self) -> usize {
        1 + self
            .children
            .as_ref()
            .map_or(0, |children| children.iter().map(QuadTreeNode::node_count).sum())
    }

    fn max_depth(&self) -> u32 {
        self.children
            .as_ref()
            .map_or(self.depth, |children| {
                children.iter().map(QuadTreeNode::max_depth).max().unwrap_or(self.depth)
            })
    }
}

/// Quadtree over entity bounding volumes
///
/// The tree has no incremental "entity moved" update: callers clear it and
/// insert every entity again when positions change.
#[derive(Debug, Clone, Default)]
pub struct QuadTree {
    /// Root node, None until a container is set
    root: Option<QuadTreeNode>,

    config: QuadTreeConfig,
}

impl QuadTree {
    /// Create an empty tree with no container
    pub fn new(config: QuadTreeConfig) -> Self {
        Self {
            root: None,
            config: config.sanitized(),
        }
    }

    /// Create a tree bounded by `container`
    pub fn with_container(container: AABB, config: QuadTreeConfig) -> Self {
        let mut tree = Self::new(config);
        tree.set_container(container);
        tree
    }

    /// Discard the current tree and start a fresh root bounded by `container`
    pub fn set_container(&mut self, container: AABB) {
        self.root = Some(QuadTreeNode::new(container, 0));
    }

    /// Subdivision configuration
    pub fn config(&self) -> &QuadTreeConfig {
        &self.config
    }

    /// Root node, if a container has been set
    pub fn root(&self) -> Option<&QuadTreeNode> {
        self.root.as_ref()
    }

    /// Insert an entity's oriented bounds
    ///
    /// Returns false when there is no container or the bounds miss it.
    pub fn insert(&mut self, entity: EntityKey, obb: &OBB) -> bool {
        self.insert_aabb(entity, obb.enclosing_aabb())
    }

    /// Insert an entity with axis-aligned bounds
    ///
    /// Only the X/Z footprint has to touch the container.
    pub fn insert_aabb(&mut self, entity: EntityKey, bounds: AABB) -> bool {
        let Some(root) = self.root.as_mut() else {
            log::debug!("Quadtree insert rejected: no container set");
            return false;
        };

        if !overlaps_xz(&root.bounds, &bounds) {
            log::debug!("Quadtree insert rejected: {:?} is outside the container", entity);
            return false;
        }

        if bounds.min.y < root.bounds.min.y || bounds.max.y > root.bounds.max.y {
            root.stretch_y(bounds.min.y, bounds.max.y);
        }

        root.insert(QuadTreeEntry { entity, bounds }, &self.config);
        true
    }

    /// Remove an entity from every node referencing it
    pub fn remove(&mut self, entity: EntityKey) -> bool {
        self.root.as_mut().is_some_and(|root| root.remove(entity))
    }

    /// Append every entity whose bounds touch `shape` to `out`
    ///
    /// Each entity appears once. Shapes that order by distance produce
    /// nearest-first output. Returns the number of nodes visited.
    pub fn fill_with_intersections<S: SpatialShape + ?Sized>(
        &self,
        shape: &S,
        out: &mut Vec<EntityKey>,
    ) -> usize {
        let Some(root) = self.root.as_ref() else {
            return 0;
        };

        let mut hits = Vec::new();
        let visited = root.collect_intersections(shape, &mut hits);

        if shape.orders_by_distance() {
            hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        }

        let mut seen = HashSet::new();
        out.extend(
            hits.into_iter()
                .filter(|(entity, _)| seen.insert(*entity))
                .map(|(entity, _)| entity),
        );
        visited
    }

    /// Query returning a fresh vector
    pub fn query<S: SpatialShape + ?Sized>(&self, shape: &S) -> Vec<EntityKey> {
        let mut results = Vec::new();
        self.fill_with_intersections(shape, &mut results);
        results
    }

    /// Get all leaf nodes
    pub fn get_all_leaves(&self) -> Vec<&QuadTreeNode> {
        let mut leaves = Vec::new();
        if let Some(root) = self.root.as_ref() {
            root.get_all_leaves(&mut leaves);
        }
        leaves
    }

    /// Number of distinct entities stored
    pub fn entity_count(&self) -> usize {
        let mut entities = HashSet::new();
        if let Some(root) = self.root.as_ref() {
            root.collect_entities(&mut entities);
        }
        entities.len()
    }

    /// Total number of nodes
    pub fn node_count(&self) -> usize {
        self.root.as_ref().map_or(0, QuadTreeNode::node_count)
    }

    /// Depth of the deepest node (0 for a lone root)
    pub fn depth(&self) -> u32 {
        self.root.as_ref().map_or(0, QuadTreeNode::max_depth)
    }

    /// Drop every entry, keeping the container
    pub fn clear(&mut self) {
        if let Some(root) = self.root.as_mut() {
            *root = QuadTreeNode::new(root.bounds, 0);
        }
    }
}
