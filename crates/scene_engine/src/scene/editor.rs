//! Editor operations on the scene tree
//!
//! These back the hierarchy panel: creating, renaming, reparenting and
//! deleting entities, plus selection. The root itself can never be moved
//! or deleted.

use crate::ecs::EntityKey;
use crate::scene::Scene;

impl Scene {
    /// Create an empty entity under `parent` (the root when None)
    pub fn add_empty_child(&mut self, parent: Option<EntityKey>, name: impl Into<String>) -> Option<EntityKey> {
        let parent = parent.unwrap_or(self.root);
        if !self.world.contains(parent) {
            log::warn!("add_empty_child: parent does not exist");
            return None;
        }
        let key = self.world.create_entity(name);
        self.world.add_child(parent, key);
        Some(key)
    }

    /// Rename an entity
    pub fn rename(&mut self, key: EntityKey, name: impl Into<String>) -> bool {
        match self.world.get_mut(key) {
            Some(entity) => {
                entity.set_name(name);
                true
            }
            None => false,
        }
    }

    /// Reparent `dragged` under `target` (drag and drop in the hierarchy)
    ///
    /// Rejected when `dragged` is the root, or when `target` is `dragged`
    /// itself or one of its descendants.
    pub fn drop_onto(&mut self, dragged: EntityKey, target: EntityKey) -> bool {
        if dragged == self.root {
            log::debug!("drop_onto: the root cannot be moved");
            return false;
        }
        if dragged == target || self.world.is_ancestor_of(dragged, target) {
            log::debug!("drop_onto: cannot drop an entity onto its own subtree");
            return false;
        }
        if !self.world.contains(dragged) || !self.world.contains(target) {
            return false;
        }
        self.world.set_parent(dragged, Some(target))
    }

    /// Move an entity next to its parent, one level closer to the root
    pub fn move_up_one_level(&mut self, key: EntityKey) -> bool {
        let Some(parent) = self.world.get(key).and_then(|entity| entity.parent()) else {
            return false;
        };
        if parent == self.root {
            return false;
        }
        let grandparent = self.world.get(parent).and_then(|entity| entity.parent());
        grandparent.map_or(false, |grandparent| self.world.set_parent(key, Some(grandparent)))
    }

    /// Delete an entity and its subtree
    ///
    /// Selection and main camera references into the subtree are cleared.
    pub fn delete_entity(&mut self, key: EntityKey) -> bool {
        if key == self.root {
            log::warn!("delete_entity: the root cannot be deleted");
            return false;
        }
        if !self.world.contains(key) {
            return false;
        }

        let doomed = self.world.subtree(key);
        if self.selected.map_or(false, |selected| doomed.contains(&selected)) {
            self.selected = None;
        }
        if self.main_camera.map_or(false, |camera| doomed.contains(&camera)) {
            log::info!("Main camera deleted");
            self.main_camera = None;
        }
        self.world.destroy_entity(key)
    }

    /// Select an entity, or clear the selection
    pub fn select(&mut self, key: Option<EntityKey>) {
        self.selected = key.filter(|key| self.world.contains(*key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EngineConfig;
    use crate::foundation::math::Vec3;
    use approx::assert_relative_eq;

    fn scene() -> Scene {
        Scene::new(&EngineConfig::default())
    }

    #[test]
    fn test_add_and_rename() {
        let mut scene = scene();
        let key = scene.add_empty_child(None, "Empty").unwrap();
        assert_eq!(scene.world().get(key).unwrap().parent(), Some(scene.root()));

        assert!(scene.rename(key, "Renamed"));
        assert_eq!(scene.world().get(key).unwrap().name(), "Renamed");

        let nested = scene.add_empty_child(Some(key), "Nested").unwrap();
        assert_eq!(scene.world().get(nested).unwrap().parent(), Some(key));
    }

    #[test]
    fn test_drop_onto_rejects_cycles_and_root() {
        let mut scene = scene();
        let a = scene.add_empty_child(None, "A").unwrap();
        let b = scene.add_empty_child(Some(a), "B").unwrap();
        let root = scene.root();

        assert!(!scene.drop_onto(a, a));
        assert!(!scene.drop_onto(a, b));
        assert!(!scene.drop_onto(root, a));

        let c = scene.add_empty_child(None, "C").unwrap();
        assert!(scene.drop_onto(c, b));
        assert_eq!(scene.world().get(c).unwrap().parent(), Some(b));
    }

    #[test]
    fn test_drop_keeps_local_pose() {
        let mut scene = scene();
        let a = scene.add_empty_child(None, "A").unwrap();
        let b = scene.add_empty_child(None, "B").unwrap();
        scene.world_mut().set_position(a, Vec3::new(5.0, 0.0, 0.0));
        scene.world_mut().set_position(b, Vec3::new(1.0, 1.0, 0.0));

        assert!(scene.drop_onto(b, a));
        let position = scene.world().get(b).unwrap().transform().position();
        assert_relative_eq!(position, Vec3::new(6.0, 1.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_move_up_one_level() {
        let mut scene = scene();
        let a = scene.add_empty_child(None, "A").unwrap();
        let b = scene.add_empty_child(Some(a), "B").unwrap();

        assert!(scene.move_up_one_level(b));
        assert_eq!(scene.world().get(b).unwrap().parent(), Some(scene.root()));
        assert!(!scene.move_up_one_level(b));
        assert!(!scene.move_up_one_level(scene.root()));
    }

    #[test]
    fn test_delete_clears_selection_and_main_camera() {
        let mut scene = scene();
        let camera = scene.main_camera().unwrap();
        let group = scene.add_empty_child(None, "Group").unwrap();
        let child = scene.add_empty_child(Some(group), "Child").unwrap();
        scene.select(Some(child));

        assert!(scene.delete_entity(group));
        assert!(scene.selected().is_none());
        assert!(!scene.world().contains(child));

        assert!(scene.delete_entity(camera));
        assert!(scene.main_camera().is_none());
        assert!(scene.main_camera_component().is_none());

        let root = scene.root();
        assert!(!scene.delete_entity(root));
        assert!(scene.world().contains(root));
    }

    #[test]
    fn test_select_ignores_dead_entities() {
        let mut scene = scene();
        let key = scene.add_empty_child(None, "Gone").unwrap();
        scene.delete_entity(key);
        scene.select(Some(key));
        assert!(scene.selected().is_none());
    }
}
