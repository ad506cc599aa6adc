//! Scene: root entity, selection, main camera and derived caches
//!
//! The scene listens to its root for structural changes and for
//! Transform, Mesh and BoundingBox changes reported by the root's
//! children. Those notifications only raise a flag; the mesh cache and the
//! quadtree are rebuilt from it on the next [`Scene::refresh`].

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

use crate::assets::{AssetImporter, ModelImporter, TextureLoader};
use crate::core::EngineConfig;
use crate::ecs::components::{ComponentCamera, ComponentLight, ComponentMesh, DEFAULT_SHADER};
use crate::ecs::{ComponentKind, ComponentMask, EntityKey, HierarchyChange, World};
use crate::events::Subscription;
use crate::foundation::ids::ComponentId;
use crate::foundation::math::{inverse_or_identity, look_rotation, Point3, Vec3};
use crate::render::{FrameContext, RenderBackend};
use crate::spatial::{QuadTree, QuadTreeConfig, Segment, AABB};

/// Component kinds whose changes invalidate visibility and spatial state
const SPATIAL_KINDS: ComponentMask = ComponentMask::TRANSFORM
    .union(ComponentMask::MESH)
    .union(ComponentMask::BOUNDING_BOX);

/// Editable scene rooted at a single entity
pub struct Scene {
    pub(crate) config: EngineConfig,
    pub(crate) world: World,
    pub(crate) root: EntityKey,
    pub(crate) selected: Option<EntityKey>,
    pub(crate) main_camera: Option<EntityKey>,
    mesh_cache: Vec<(EntityKey, ComponentId)>,
    content_changed: Rc<Cell<bool>>,
    spatial_stale: bool,
    quadtree: QuadTree,
    model_importer: ModelImporter,
    subscriptions: Vec<Subscription>,
}

impl Scene {
    /// Create and initialize a scene
    pub fn new(config: &EngineConfig) -> Self {
        let mut scene = Self {
            config: config.clone(),
            world: World::new(),
            root: EntityKey::default(),
            selected: None,
            main_camera: None,
            mesh_cache: Vec::new(),
            content_changed: Rc::new(Cell::new(true)),
            spatial_stale: true,
            quadtree: QuadTree::new(QuadTreeConfig::from(&config.spatial)),
            model_importer: ModelImporter::new(&config.assets),
            subscriptions: Vec::new(),
        };
        scene.initialize();
        scene
    }

    /// Tear down the current tree and build a fresh root with startup content
    ///
    /// GPU buffers of the old tree are queued; the next
    /// [`update_frame`](Self::update_frame) releases them.
    pub fn initialize(&mut self) {
        self.subscriptions.clear();
        self.world.clear();
        self.selected = None;
        self.main_camera = None;
        self.mesh_cache.clear();
        self.quadtree.clear();

        self.root = self.world.create_entity(self.config.scene.root_name.as_str());
        self.subscriptions = self.watch_root();
        self.content_changed.set(true);
        self.spatial_stale = true;

        if self.config.scene.create_startup_content {
            self.populate_startup_content();
        }
        self.refresh();
        log::info!("Scene '{}' initialized", self.config.scene.root_name);
    }

    fn watch_root(&self) -> Vec<Subscription> {
        let Some(root) = self.world.get(self.root) else {
            return Vec::new();
        };
        let events = root.events();

        let hierarchy = Rc::clone(&self.content_changed);
        let on_hierarchy = events.hierarchy_changed.subscribe(move |change| {
            if *change == HierarchyChange::ChildrenChanged {
                hierarchy.set(true);
            }
        });

        let descendants = Rc::clone(&self.content_changed);
        let on_descendants = events.components_changed_in_descendants.subscribe(move |kind| {
            if SPATIAL_KINDS.matches(*kind) {
                descendants.set(true);
            }
        });

        let own = Rc::clone(&self.content_changed);
        let on_own = events.components_changed.subscribe(move |kind| {
            if SPATIAL_KINDS.matches(*kind) {
                own.set(true);
            }
        });

        vec![on_hierarchy, on_descendants, on_own]
    }

    fn populate_startup_content(&mut self) {
        let scene_config = self.config.scene.clone();

        let camera = self.world.create_entity("Main Camera");
        self.world.add_child(self.root, camera);
        self.world.set_position(camera, scene_config.camera_position);
        self.world.set_rotation(
            camera,
            look_rotation(&(scene_config.camera_target - scene_config.camera_position)),
        );
        self.world.add_component(camera, ComponentCamera::from_config(&self.config.camera));
        self.set_main_camera(camera);

        let sun = self.world.create_entity("Directional Light");
        self.world.add_child(self.root, sun);
        self.world.set_rotation(sun, look_rotation(&Vec3::new(-0.3, -1.0, -0.5)));
        self.world.add_component(sun, ComponentLight::directional(Vec3::new(1.0, 1.0, 1.0), 1.0));

        let lamp = self.world.create_entity("Point Light");
        self.world.add_child(self.root, lamp);
        self.world.set_position(lamp, Vec3::new(0.0, 4.0, 2.0));
        self.world.add_component(lamp, ComponentLight::point(Vec3::new(1.0, 0.95, 0.8), 1.0));
    }

    /// Import every configured startup model under the root, returning how many loaded
    pub fn load_startup_models(
        &mut self,
        importer: &dyn AssetImporter,
        textures: &mut dyn TextureLoader,
        renderer: &mut dyn RenderBackend,
    ) -> usize {
        let paths = self.config.assets.startup_models.clone();
        paths
            .iter()
            .filter(|path| self.import_model(path, importer, textures, renderer).is_some())
            .count()
    }

    /// Import a model file under the root (the file-dropped entry point)
    pub fn import_model(
        &mut self,
        path: &Path,
        importer: &dyn AssetImporter,
        textures: &mut dyn TextureLoader,
        renderer: &mut dyn RenderBackend,
    ) -> Option<EntityKey> {
        self.model_importer
            .import_into(&mut self.world, self.root, path, importer, textures, renderer)
    }

    // ---- Accessors ----

    /// Entity arena
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable entity arena
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Root entity
    pub fn root(&self) -> EntityKey {
        self.root
    }

    /// Configuration the scene was created with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Selected entity, if any
    pub fn selected(&self) -> Option<EntityKey> {
        self.selected.filter(|key| self.world.contains(*key))
    }

    /// Entity holding the main camera
    pub fn main_camera(&self) -> Option<EntityKey> {
        self.main_camera.filter(|key| self.world.contains(*key))
    }

    /// The main camera component
    pub fn main_camera_component(&self) -> Option<&ComponentCamera> {
        self.world.get_component_as::<ComponentCamera>(self.main_camera()?)
    }

    /// Main camera if it can drive culling and picking
    ///
    /// A disabled camera component or an inactive owner chain counts as no camera.
    fn active_main_camera(&self) -> Option<&ComponentCamera> {
        let key = self.main_camera()?;
        let component = self.world.get_component(key, ComponentKind::Camera)?;
        if !component.is_enabled() || !self.world.is_active_in_hierarchy(key) {
            log::debug!("Main camera {:?} is disabled", key);
            return None;
        }
        component.as_variant::<ComponentCamera>()
    }

    /// Meshes found at the last refresh, as (owner, component id)
    pub fn cached_meshes(&self) -> &[(EntityKey, ComponentId)] {
        &self.mesh_cache
    }

    /// Spatial index, rebuilt first if stale
    pub fn spatial_index(&mut self) -> &QuadTree {
        self.refresh();
        self.ensure_spatial_index();
        &self.quadtree
    }

    // ---- Main camera ----

    /// Make the camera on `key` the main camera, unflagging every other camera
    ///
    /// Returns false when `key` holds no camera.
    pub fn set_main_camera(&mut self, key: EntityKey) -> bool {
        if self.world.get_component_as::<ComponentCamera>(key).is_none() {
            log::debug!("set_main_camera: entity has no camera");
            return false;
        }

        for other in self.world.subtree(self.root) {
            if let Some(camera) = self.world.get_component_as_mut::<ComponentCamera>(other) {
                camera.set_main(other == key);
            }
        }
        if let Some(camera) = self.world.get_component_as_mut::<ComponentCamera>(key) {
            camera.set_main(true);
        }

        self.main_camera = Some(key);
        true
    }

    /// Match the main camera's aspect ratio to a new window size
    pub fn on_window_resized(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::debug!("Ignoring resize to {}x{}", width, height);
            return;
        }
        let Some(key) = self.main_camera() else {
            return;
        };
        if let Some(camera) = self.world.get_component_as_mut::<ComponentCamera>(key) {
            camera.set_aspect_ratio(width as f32 / height as f32);
        }
    }

    // ---- Derived state ----

    /// Update bounds and camera views, then rebuild caches that were invalidated
    pub fn refresh(&mut self) {
        self.world.refresh();

        if self.content_changed.replace(false) {
            self.rebuild_mesh_cache();
            self.spatial_stale = true;
        }
    }

    fn rebuild_mesh_cache(&mut self) {
        self.mesh_cache.clear();
        for key in self.world.subtree(self.root) {
            let Some(entity) = self.world.get(key) else {
                continue;
            };
            self.mesh_cache.extend(
                entity
                    .get_components(ComponentKind::Mesh)
                    .map(|component| (key, component.id())),
            );
        }
        log::trace!("Mesh cache rebuilt: {} meshes", self.mesh_cache.len());
    }

    fn ensure_spatial_index(&mut self) {
        if !self.spatial_stale {
            return;
        }
        let spatial = &self.config.spatial;
        self.quadtree
            .set_container(AABB::from_center_extents(spatial.container_center, spatial.container_half_extents));

        let mut owners: Vec<EntityKey> = self.mesh_cache.iter().map(|(key, _)| *key).collect();
        owners.dedup();
        for key in owners {
            let Some(obb) = self.world.get(key).and_then(|entity| entity.bounding_box().obb().copied()) else {
                continue;
            };
            self.quadtree.insert(key, &obb);
        }

        self.spatial_stale = false;
        log::trace!(
            "Quadtree rebuilt: {} entities in {} nodes",
            self.quadtree.entity_count(),
            self.quadtree.node_count()
        );
    }

    /// Mark each cached mesh culled iff the main camera cannot see its owner's box
    ///
    /// Owners without a box are left untouched; without an enabled main camera
    /// nothing changes.
    pub fn cull_meshes(&mut self) {
        let Some(frustum) = self.active_main_camera().map(ComponentCamera::frustum) else {
            return;
        };

        for &(key, id) in &self.mesh_cache {
            let Some(obb) = self.world.get(key).and_then(|entity| entity.bounding_box().obb().copied()) else {
                continue;
            };
            let visible = frustum.intersects_obb(&obb);
            if let Some(mesh) = self
                .world
                .component_mut(key, id)
                .and_then(|component| component.as_variant_mut::<ComponentMesh>())
            {
                mesh.set_culled(!visible);
            }
        }
    }

    /// Select the entity owning the closest triangle hit by a world space segment
    ///
    /// Candidates come nearest-first from the quadtree; each candidate's
    /// meshes are tested in its local space. Entities that are not active in
    /// the hierarchy and disabled meshes are skipped, since neither is drawn.
    /// At equal distance the first mesh and triangle found win. A miss clears
    /// the selection.
    pub fn check_raycast(&mut self, segment: &Segment) -> Option<EntityKey> {
        self.refresh();
        self.ensure_spatial_index();

        let max_distance = segment.length();
        let mut best: Option<(f32, EntityKey)> = None;

        for key in self.quadtree.query(segment) {
            if !self.world.is_active_in_hierarchy(key) {
                continue;
            }
            let Some(entity) = self.world.get(key) else {
                continue;
            };
            let global = entity.transform().global_matrix();
            let local_segment = segment.transformed(&inverse_or_identity(global));

            let meshes = entity
                .get_components(ComponentKind::Mesh)
                .filter(|component| component.is_enabled())
                .filter_map(|component| component.as_variant::<ComponentMesh>());
            for mesh in meshes {
                let Some(local_hit) = mesh.intersect_local_point(&local_segment) else {
                    continue;
                };
                let world_hit = global.transform_point(&Point3::from(local_hit)).coords;
                let distance = (world_hit - segment.a).norm();
                if distance <= max_distance && best.map_or(true, |(closest, _)| distance < closest) {
                    best = Some((distance, key));
                }
            }
        }

        self.selected = best.map(|(_, key)| key);
        if let Some((distance, key)) = best {
            log::debug!("Picked {:?} at distance {:.3}", key, distance);
        }
        self.selected
    }

    /// Raycast from the main camera through an NDC point
    pub fn pick(&mut self, ndc_x: f32, ndc_y: f32) -> Option<EntityKey> {
        self.refresh();
        let Some(segment) = self
            .active_main_camera()
            .map(|camera| camera.picking_segment(ndc_x, ndc_y))
        else {
            log::debug!("Pick ignored: no enabled main camera");
            return None;
        };
        self.check_raycast(&segment)
    }

    // ---- Frame ----

    /// Refresh, cull, run the three frame passes from the root and release dead GPU buffers
    pub fn update_frame(&mut self, renderer: &mut dyn RenderBackend) {
        self.refresh();
        self.cull_meshes();

        {
            let mut ctx = FrameContext::new(&mut *renderer);
            ctx.backend.use_shader(DEFAULT_SHADER);
            self.world.pre_update(self.root, &mut ctx);
            ctx.upload_light_counts();
            self.world.update(self.root, &mut ctx);
            self.world.post_update(self.root, &mut ctx);
        }

        self.world.release_gpu_resources(renderer);
    }

    /// Destroy the whole tree and release every GPU buffer
    pub fn shutdown(mut self, renderer: &mut dyn RenderBackend) {
        self.subscriptions.clear();
        self.world.clear();
        self.world.release_gpu_resources(renderer);
        log::info!("Scene '{}' shut down", self.config.scene.root_name);
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("world", &self.world)
            .field("selected", &self.selected)
            .field("main_camera", &self.main_camera)
            .field("meshes", &self.mesh_cache.len())
            .finish()
    }
}
