//! Converts imported models into entity subtrees
//!
//! One entity per node. A node whose meshes use several materials gets
//! one child entity per extra material, since an entity holds a single
//! Material. The Material is always attached before the Meshes it shades.

use std::path::{Path, PathBuf};

use crate::assets::{AssetImporter, ImportedMaterial, ImportedMesh, ImportedModel, ImportedNode, TextureLoader};
use crate::core::AssetConfig;
use crate::ecs::components::{ComponentMaterial, ComponentMesh};
use crate::ecs::{EntityKey, World};
use crate::foundation::math::Pose;
use crate::render::{RenderBackend, TextureSlot};

/// Builds entity subtrees from model files
#[derive(Debug, Clone, Default)]
pub struct ModelImporter {
    texture_dir: PathBuf,
}

impl ModelImporter {
    /// Create an importer using the configured texture directory
    pub fn new(config: &AssetConfig) -> Self {
        Self::with_texture_dir(config.texture_dir.clone())
    }

    /// Create an importer searching `texture_dir` as the last texture fallback
    pub fn with_texture_dir(texture_dir: impl Into<PathBuf>) -> Self {
        Self {
            texture_dir: texture_dir.into(),
        }
    }

    /// Directory searched last for textures
    pub fn texture_dir(&self) -> &Path {
        &self.texture_dir
    }

    /// Import the model file at `path` under `parent`
    ///
    /// Returns the model's top entity, or None when the file cannot be read
    /// or parsed. Failures are logged; nothing is attached in that case.
    pub fn import_into(
        &self,
        world: &mut World,
        parent: EntityKey,
        path: &Path,
        importer: &dyn AssetImporter,
        textures: &mut dyn TextureLoader,
        renderer: &mut dyn RenderBackend,
    ) -> Option<EntityKey> {
        if !importer.supports(path) {
            log::warn!("No importer for {:?}", path);
            return None;
        }

        let model = match importer.import(path) {
            Ok(model) => model,
            Err(e) => {
                log::error!("Failed to import {:?}: {}", path, e);
                return None;
            }
        };

        let model_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let key = self.build(world, parent, &model, model_dir, textures, renderer);
        if key.is_some() {
            log::info!("Imported {:?} ({} meshes)", path, model.root.mesh_count());
        }
        key
    }

    /// Build the entity subtree of an already imported model under `parent`
    pub fn build(
        &self,
        world: &mut World,
        parent: EntityKey,
        model: &ImportedModel,
        model_dir: &Path,
        textures: &mut dyn TextureLoader,
        renderer: &mut dyn RenderBackend,
    ) -> Option<EntityKey> {
        if !world.contains(parent) {
            log::warn!("Import target entity no longer exists");
            return None;
        }

        let materials: Vec<ComponentMaterial> = model
            .materials
            .iter()
            .map(|material| self.material(material, model_dir, textures, renderer))
            .collect();

        Some(self.build_node(world, parent, &model.root, &materials, renderer))
    }

    fn build_node(
        &self,
        world: &mut World,
        parent: EntityKey,
        node: &ImportedNode,
        materials: &[ComponentMaterial],
        renderer: &mut dyn RenderBackend,
    ) -> EntityKey {
        let key = world.create_entity(node.name.as_str());
        world.add_child(parent, key);
        world.set_local_pose(
            key,
            Pose {
                position: node.position,
                rotation: node.rotation,
                scale: node.scale,
            },
        );

        for (index, (material, meshes)) in group_by_material(&node.meshes).into_iter().enumerate() {
            let target = if index == 0 {
                key
            } else {
                let child = world.create_entity(format!("{}_{}", node.name, index));
                world.add_child(key, child);
                child
            };

            if let Some(material) = material.and_then(|m| materials.get(m)) {
                world.add_component(target, material.clone());
            }
            for mesh in meshes {
                match ComponentMesh::load(&mesh.vertices, &mesh.indices, renderer) {
                    Ok(component) => {
                        world.add_component(target, component);
                    }
                    Err(e) => log::warn!("Skipping mesh of '{}': {}", node.name, e),
                }
            }
        }

        for child in &node.children {
            self.build_node(world, key, child, materials, renderer);
        }
        key
    }

    fn material(
        &self,
        imported: &ImportedMaterial,
        model_dir: &Path,
        textures: &mut dyn TextureLoader,
        renderer: &mut dyn RenderBackend,
    ) -> ComponentMaterial {
        let mut material = ComponentMaterial::new()
            .with_color(imported.color)
            .with_shininess(imported.shininess);

        for slot in TextureSlot::ALL {
            let Some(path) = imported.texture(slot) else {
                continue;
            };
            let handle = self
                .texture_candidates(path, model_dir)
                .iter()
                .find_map(|candidate| textures.load(candidate, renderer));
            if handle.is_none() {
                log::warn!("Texture {:?} of material '{}' not found", path, imported.name);
            }
            material.set_texture(slot, handle);
        }
        material
    }

    /// Path as written, then next to the model, then in the texture directory
    fn texture_candidates(&self, path: &Path, model_dir: &Path) -> Vec<PathBuf> {
        let mut candidates = vec![path.to_path_buf(), model_dir.join(path)];
        if let Some(file_name) = path.file_name() {
            candidates.push(self.texture_dir.join(file_name));
        }
        candidates
    }
}

/// Meshes grouped by material, groups ordered by first use
fn group_by_material(meshes: &[ImportedMesh]) -> Vec<(Option<usize>, Vec<&ImportedMesh>)> {
    let mut groups: Vec<(Option<usize>, Vec<&ImportedMesh>)> = Vec::new();
    for mesh in meshes {
        match groups.iter_mut().find(|(material, _)| *material == mesh.material) {
            Some((_, group)) => group.push(mesh),
            None => groups.push((mesh.material, vec![mesh])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{ImportError, ObjImporter};
    use crate::ecs::ComponentKind;
    use crate::ecs::components::cube_geometry;
    use crate::foundation::math::Vec3;
    use crate::render::{RecordingBackend, TextureHandle};
    use approx::assert_relative_eq;

    /// Hands out handles for paths it was told about, recording every attempt
    #[derive(Default)]
    struct FakeTextures {
        known: Vec<PathBuf>,
        attempts: Vec<PathBuf>,
    }

    impl TextureLoader for FakeTextures {
        fn load(&mut self, path: &Path, _renderer: &mut dyn RenderBackend) -> Option<TextureHandle> {
            self.attempts.push(path.to_path_buf());
            self.known
                .iter()
                .position(|known| known == path)
                .map(|index| TextureHandle(index as u64 + 1))
        }
    }

    fn cube_mesh(material: Option<usize>) -> ImportedMesh {
        let (vertices, indices) = cube_geometry(0.5);
        ImportedMesh {
            vertices,
            indices,
            material,
        }
    }

    fn textured_model() -> ImportedModel {
        let mut material = ImportedMaterial::new("crate");
        material.set_texture(TextureSlot::Diffuse, "textures/crate.png");
        let mut root = ImportedNode::new("crate");
        root.position = Vec3::new(0.0, 2.0, 0.0);
        root.meshes.push(cube_mesh(Some(0)));
        ImportedModel {
            root,
            materials: vec![material],
        }
    }

    #[test]
    fn test_material_attached_before_meshes() {
        let mut world = World::new();
        let mut backend = RecordingBackend::new();
        let mut textures = FakeTextures::default();
        let root = world.create_entity("root");

        let importer = ModelImporter::with_texture_dir("assets/textures");
        let key = importer
            .build(&mut world, root, &textured_model(), Path::new("models"), &mut textures, &mut backend)
            .unwrap();

        let entity = world.get(key).unwrap();
        let kinds: Vec<_> = entity.components().iter().map(|c| c.kind()).collect();
        assert_eq!(kinds, [ComponentKind::Material, ComponentKind::Mesh]);
        assert_eq!(entity.parent(), Some(root));
        assert_relative_eq!(entity.transform().position(), Vec3::new(0.0, 2.0, 0.0));

        world.clear();
        world.release_gpu_resources(&mut backend);
    }

    #[test]
    fn test_texture_fallback_order() {
        let mut world = World::new();
        let mut backend = RecordingBackend::new();
        let mut textures = FakeTextures {
            known: vec![PathBuf::from("assets/textures/crate.png")],
            ..Default::default()
        };
        let root = world.create_entity("root");

        let importer = ModelImporter::with_texture_dir("assets/textures");
        let key = importer
            .build(&mut world, root, &textured_model(), Path::new("models"), &mut textures, &mut backend)
            .unwrap();

        assert_eq!(
            textures.attempts,
            vec![
                PathBuf::from("textures/crate.png"),
                PathBuf::from("models/textures/crate.png"),
                PathBuf::from("assets/textures/crate.png"),
            ]
        );
        let material = world.get_component_as::<ComponentMaterial>(key).unwrap();
        assert_eq!(material.texture(TextureSlot::Diffuse), Some(TextureHandle(1)));

        world.clear();
        world.release_gpu_resources(&mut backend);
    }

    #[test]
    fn test_missing_texture_leaves_slot_empty() {
        let mut world = World::new();
        let mut backend = RecordingBackend::new();
        let mut textures = FakeTextures::default();
        let root = world.create_entity("root");

        let key = ModelImporter::default()
            .build(&mut world, root, &textured_model(), Path::new("models"), &mut textures, &mut backend)
            .unwrap();

        assert_eq!(textures.attempts.len(), 3);
        let material = world.get_component_as::<ComponentMaterial>(key).unwrap();
        assert_eq!(material.texture(TextureSlot::Diffuse), None);

        world.clear();
        world.release_gpu_resources(&mut backend);
    }

    #[test]
    fn test_mixed_materials_split_into_children() {
        let mut world = World::new();
        let mut backend = RecordingBackend::new();
        let mut textures = FakeTextures::default();
        let root = world.create_entity("root");

        let mut node = ImportedNode::new("pair");
        node.meshes = vec![cube_mesh(Some(0)), cube_mesh(Some(1)), cube_mesh(Some(0))];
        let model = ImportedModel {
            root: node,
            materials: vec![ImportedMaterial::new("a"), ImportedMaterial::new("b")],
        };

        let key = ModelImporter::default()
            .build(&mut world, root, &model, Path::new(""), &mut textures, &mut backend)
            .unwrap();

        let entity = world.get(key).unwrap();
        assert_eq!(entity.get_components(ComponentKind::Mesh).count(), 2);
        assert_eq!(entity.children().len(), 1);
        let split = world.get(entity.children()[0]).unwrap();
        assert_eq!(split.get_components(ComponentKind::Mesh).count(), 1);
        assert!(split.has_component(ComponentKind::Material));

        world.clear();
        world.release_gpu_resources(&mut backend);
        assert_eq!(backend.live_mesh_count(), 0);
    }

    #[test]
    fn test_unreadable_model_returns_none() {
        struct Failing;
        impl AssetImporter for Failing {
            fn supports(&self, _path: &Path) -> bool {
                true
            }
            fn import(&self, path: &Path) -> Result<ImportedModel, ImportError> {
                Err(ImportError::Empty(path.to_path_buf()))
            }
        }

        let mut world = World::new();
        let mut backend = RecordingBackend::new();
        let mut textures = FakeTextures::default();
        let root = world.create_entity("root");
        let importer = ModelImporter::default();

        assert!(importer
            .import_into(&mut world, root, Path::new("x.obj"), &Failing, &mut textures, &mut backend)
            .is_none());
        assert!(importer
            .import_into(&mut world, root, Path::new("x.fbx"), &ObjImporter, &mut textures, &mut backend)
            .is_none());
        assert!(world.get(root).unwrap().children().is_empty());
    }
}
