//! # Camera Component
//!
//! Perspective or orthographic camera attached to an entity. The view
//! matrix follows the owner's transform; the projection matrix is derived
//! lazily from the projection parameters.
//!
//! ## Coordinate System
//! Right-handed, Y-up. The camera looks along its owner's `front` (+Z of
//! the entity) with the owner's `up`. Clip space uses OpenGL depth
//! conventions (z in [-w, w]), matching nalgebra's projection builders.

use std::cell::Cell;
use std::rc::Rc;

use crate::core::CameraConfig;
use crate::ecs::component::ComponentKind;
use crate::ecs::components::ComponentTransform;
use crate::ecs::entity::EntityEvents;
use crate::events::Subscription;
use crate::foundation::math::{inverse_or_identity, utils, Mat4, Point3, Vec3, Vec4};
use crate::render::{FrameContext, UniformValue};
use crate::spatial::{Frustum, OBB, Segment};

/// Smallest accepted aspect ratio, view volume extent and plane gap
const MIN_EXTENT: f32 = 1e-4;
const MAX_FOV: f32 = std::f32::consts::PI - MIN_EXTENT;

fn valid_extent(value: f32, what: &str) -> f32 {
    if value >= MIN_EXTENT {
        value
    } else {
        log::warn!("Camera {} {} is degenerate, using {}", what, value, MIN_EXTENT);
        MIN_EXTENT
    }
}

fn valid_fov(fov: f32) -> f32 {
    if fov >= MIN_EXTENT && fov <= MAX_FOV {
        fov
    } else {
        log::warn!("Camera field of view {} is out of range", fov);
        if fov.is_nan() { std::f32::consts::FRAC_PI_3 } else { fov.clamp(MIN_EXTENT, MAX_FOV) }
    }
}

/// Keep `far` strictly beyond `near`
fn valid_far(near: f32, far: f32) -> f32 {
    let min_far = near + MIN_EXTENT.max(near.abs() * MIN_EXTENT);
    if far >= min_far {
        far
    } else {
        log::warn!("Camera far plane {} is not beyond near plane {}", far, near);
        min_far
    }
}

fn valid_projection(projection: Projection) -> Projection {
    match projection {
        Projection::Perspective { vertical_fov, aspect } => Projection::Perspective {
            vertical_fov: valid_fov(vertical_fov),
            aspect: valid_extent(aspect, "aspect ratio"),
        },
        Projection::Orthographic { width, height } => Projection::Orthographic {
            width: valid_extent(width, "width"),
            height: valid_extent(height, "height"),
        },
    }
}

/// Projection mode with its mode-specific parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Perspective projection
    Perspective {
        /// Vertical field of view in radians
        vertical_fov: f32,
        /// Width / height
        aspect: f32,
    },
    /// Orthographic projection
    Orthographic {
        /// View volume width
        width: f32,
        /// View volume height
        height: f32,
    },
}

/// Camera component
///
/// Mutators only mark the projection dirty; the matrix is rebuilt the next
/// time it is read. Degenerate parameters (zero aspect, far not beyond
/// near) are clamped with a warning so the matrix is always invertible. The view matrix is recomputed by
/// [`World::refresh`](crate::ecs::World::refresh) after the owner's
/// transform changes.
pub struct ComponentCamera {
    projection: Projection,
    near: f32,
    far: f32,
    is_main: bool,

    projection_matrix: Cell<Mat4>,
    projection_dirty: Cell<bool>,

    view_matrix: Mat4,
    eye: Vec3,
    view_dirty: Rc<Cell<bool>>,
    subscription: Option<Subscription>,
}

impl ComponentCamera {
    /// Create an unattached perspective camera
    ///
    /// # Arguments
    /// * `vertical_fov` - Vertical field of view in radians
    /// * `aspect` - Width / height
    /// * `near`, `far` - Clipping plane distances
    pub fn perspective(vertical_fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self::with_projection(Projection::Perspective { vertical_fov, aspect }, near, far)
    }

    /// Create an unattached orthographic camera
    pub fn orthographic(width: f32, height: f32, near: f32, far: f32) -> Self {
        Self::with_projection(Projection::Orthographic { width, height }, near, far)
    }

    /// Perspective camera from configuration defaults
    pub fn from_config(config: &CameraConfig) -> Self {
        Self::perspective(
            utils::deg_to_rad(config.fov_degrees),
            config.aspect,
            config.near,
            config.far,
        )
    }

    fn with_projection(projection: Projection, near: f32, far: f32) -> Self {
        let near = if near.is_finite() { near } else { MIN_EXTENT };
        Self {
            projection: valid_projection(projection),
            near,
            far: valid_far(near, far),
            is_main: false,
            projection_matrix: Cell::new(Mat4::identity()),
            projection_dirty: Cell::new(true),
            view_matrix: Mat4::identity(),
            eye: Vec3::zeros(),
            view_dirty: Rc::new(Cell::new(true)),
            subscription: None,
        }
    }

    /// Subscribe to the owner's Transform changes and adopt its current pose
    pub(crate) fn bind(&mut self, events: &EntityEvents, transform: &ComponentTransform) {
        let view_dirty = Rc::clone(&self.view_dirty);
        self.subscription = Some(events.components_changed.subscribe(move |kind| {
            if *kind == ComponentKind::Transform {
                view_dirty.set(true);
            }
        }));
        self.update_view(transform);
    }

    /// Whether the owner moved since the view was last derived
    pub fn is_view_dirty(&self) -> bool {
        self.view_dirty.get()
    }

    /// Re-derive the view matrix from the owner's transform
    pub(crate) fn update_view(&mut self, transform: &ComponentTransform) {
        self.eye = transform.position();
        let target = self.eye + transform.front();
        self.view_matrix = Mat4::look_at_rh(
            &Point3::from(self.eye),
            &Point3::from(target),
            &transform.up(),
        );
        self.view_dirty.set(false);
    }

    /// Current projection mode
    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// Vertical field of view, None for orthographic cameras
    pub fn vertical_fov(&self) -> Option<f32> {
        match self.projection {
            Projection::Perspective { vertical_fov, .. } => Some(vertical_fov),
            Projection::Orthographic { .. } => None,
        }
    }

    /// Width / height of the view volume
    pub fn aspect_ratio(&self) -> f32 {
        match self.projection {
            Projection::Perspective { aspect, .. } => aspect,
            Projection::Orthographic { width, height } => {
                if height > f32::EPSILON { width / height } else { 1.0 }
            }
        }
    }

    /// Near clipping plane distance
    pub fn near_plane(&self) -> f32 {
        self.near
    }

    /// Far clipping plane distance
    pub fn far_plane(&self) -> f32 {
        self.far
    }

    /// Whether this camera drives rendering and culling
    pub fn is_main(&self) -> bool {
        self.is_main
    }

    pub(crate) fn set_main(&mut self, is_main: bool) {
        self.is_main = is_main;
    }

    /// Set the vertical field of view (radians); ignored by orthographic cameras
    pub fn set_fov(&mut self, fov: f32) {
        if let Projection::Perspective { ref mut vertical_fov, .. } = self.projection {
            *vertical_fov = valid_fov(fov);
            self.projection_dirty.set(true);
        }
    }

    /// Update the aspect ratio
    ///
    /// Orthographic cameras keep their height and adjust their width.
    pub fn set_aspect_ratio(&mut self, new_aspect: f32) {
        let new_aspect = valid_extent(new_aspect, "aspect ratio");
        match self.projection {
            Projection::Perspective { ref mut aspect, .. } => *aspect = new_aspect,
            Projection::Orthographic { ref mut width, height } => *width = height * new_aspect,
        }
        self.projection_dirty.set(true);
    }

    /// Set the near clipping plane distance
    ///
    /// The far plane is pushed out when it would no longer lie beyond `near`.
    pub fn set_near_plane(&mut self, near: f32) {
        if !near.is_finite() {
            log::warn!("Ignoring non-finite camera near plane");
            return;
        }
        self.near = near;
        self.far = valid_far(near, self.far);
        self.projection_dirty.set(true);
    }

    /// Set the far clipping plane distance
    pub fn set_far_plane(&mut self, far: f32) {
        self.far = valid_far(self.near, far);
        self.projection_dirty.set(true);
    }

    /// Switch to a perspective projection
    pub fn set_as_perspective(&mut self, vertical_fov: f32, aspect: f32) {
        self.projection = valid_projection(Projection::Perspective { vertical_fov, aspect });
        self.projection_dirty.set(true);
    }

    /// Switch to an orthographic projection
    pub fn set_as_orthographic(&mut self, width: f32, height: f32) {
        self.projection = valid_projection(Projection::Orthographic { width, height });
        self.projection_dirty.set(true);
    }

    /// Projection matrix, rebuilt first if a parameter changed
    pub fn projection_matrix(&self) -> Mat4 {
        if self.projection_dirty.get() {
            let matrix = match self.projection {
                Projection::Perspective { vertical_fov, aspect } => {
                    Mat4::new_perspective(aspect, vertical_fov, self.near, self.far)
                }
                Projection::Orthographic { width, height } => Mat4::new_orthographic(
                    -width * 0.5,
                    width * 0.5,
                    -height * 0.5,
                    height * 0.5,
                    self.near,
                    self.far,
                ),
            };
            self.projection_matrix.set(matrix);
            self.projection_dirty.set(false);
        }
        self.projection_matrix.get()
    }

    /// World to view space matrix
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    /// Combined `projection * view`
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix
    }

    /// Camera position in world space
    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    /// View volume planes in world space
    pub fn frustum(&self) -> Frustum {
        Frustum::from_matrix(&self.view_projection_matrix())
    }

    /// Whether any part of `obb` may be inside the view volume
    pub fn is_visible(&self, obb: &OBB) -> bool {
        self.frustum().intersects_obb(obb)
    }

    /// World space segment from the near to the far plane through an NDC point
    ///
    /// # Arguments
    /// * `ndc_x` - -1 (left) to 1 (right)
    /// * `ndc_y` - -1 (bottom) to 1 (top)
    pub fn picking_segment(&self, ndc_x: f32, ndc_y: f32) -> Segment {
        let inverse = inverse_or_identity(&self.view_projection_matrix());
        let unproject = |z: f32| {
            let point = inverse * Vec4::new(ndc_x, ndc_y, z, 1.0);
            if point.w.abs() > f32::EPSILON {
                Vec3::new(point.x, point.y, point.z) / point.w
            } else {
                Vec3::new(point.x, point.y, point.z)
            }
        };
        Segment::new(unproject(-1.0), unproject(1.0))
    }

    /// Upload view and projection when this is the main camera
    pub(crate) fn pre_update(&self, ctx: &mut FrameContext<'_>) {
        if !self.is_main {
            return;
        }
        ctx.backend.set_uniform("view", UniformValue::matrix(self.view_matrix));
        ctx.backend.set_uniform("projection", UniformValue::matrix(self.projection_matrix()));
        ctx.backend.set_uniform("view_position", UniformValue::Vec3(self.eye));
    }
}

impl std::fmt::Debug for ComponentCamera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentCamera")
            .field("projection", &self.projection)
            .field("near", &self.near)
            .field("far", &self.far)
            .field("is_main", &self.is_main)
            .field("eye", &self.eye)
            .field("bound", &self.subscription.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::ids::IdAllocator;
    use crate::foundation::math::Quat;
    use crate::ecs::components::PoseMode;
    use crate::spatial::AABB;
    use approx::assert_relative_eq;

    fn transform_at(position: Vec3, look_at: Vec3) -> ComponentTransform {
        let mut transform = ComponentTransform::new(IdAllocator::new().next_component_id());
        transform.local_pose_mut().position = position;
        transform.local_pose_mut().rotation = Quat::face_towards(&(look_at - position), &Vec3::y());
        transform.recompute(PoseMode::GlobalFromLocal, None);
        transform
    }

    #[test]
    fn test_projection_recomputed_lazily() {
        let mut camera = ComponentCamera::perspective(1.0, 1.0, 0.1, 100.0);
        let first = camera.projection_matrix();
        camera.set_aspect_ratio(2.0);
        let second = camera.projection_matrix();

        assert_relative_eq!(second[(0, 0)], first[(0, 0)] * 0.5, epsilon = 1e-5);

        camera.set_as_orthographic(10.0, 10.0);
        assert!(camera.vertical_fov().is_none());
        assert_relative_eq!(camera.projection_matrix()[(0, 0)], 0.2, epsilon = 1e-5);
    }

    #[test]
    fn test_zero_aspect_is_clamped() {
        let mut camera = ComponentCamera::perspective(1.0, 0.0, 0.1, 100.0);
        assert!(camera.aspect_ratio() > 0.0);
        camera.set_aspect_ratio(0.0);
        assert!(camera.aspect_ratio() > 0.0);
        assert!(camera.projection_matrix().iter().all(|v| v.is_finite()));

        camera.set_as_orthographic(0.0, 0.0);
        assert!(camera.projection_matrix().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_far_plane_stays_beyond_near() {
        let mut camera = ComponentCamera::perspective(1.0, 1.0, 0.1, 100.0);
        camera.set_near_plane(100.0);
        assert!(camera.far_plane() > camera.near_plane());
        let _ = camera.projection_matrix();

        camera.set_far_plane(50.0);
        assert!(camera.far_plane() > 100.0);
        assert_relative_eq!(camera.near_plane(), 100.0);

        let equal = ComponentCamera::perspective(1.0, 1.0, 5.0, 5.0);
        assert!(equal.far_plane() > equal.near_plane());
        assert!(equal.projection_matrix().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_view_follows_owner_transform_events() {
        let events = EntityEvents::default();
        let mut camera = ComponentCamera::perspective(1.0, 1.0, 0.1, 100.0);
        camera.bind(&events, &transform_at(Vec3::new(0.0, 0.0, 10.0), Vec3::zeros()));
        assert!(!camera.is_view_dirty());

        events.components_changed.invoke(&ComponentKind::Mesh);
        assert!(!camera.is_view_dirty());
        events.components_changed.invoke(&ComponentKind::Transform);
        assert!(camera.is_view_dirty());
    }

    #[test]
    fn test_visibility_and_picking() {
        let events = EntityEvents::default();
        let mut camera = ComponentCamera::perspective(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);
        camera.bind(&events, &transform_at(Vec3::new(0.0, 0.0, 10.0), Vec3::zeros()));

        let unit = AABB::from_center_extents(Vec3::zeros(), Vec3::repeat(1.0));
        let ahead = OBB::from_local_aabb(&unit, &Mat4::identity());
        let behind = OBB::from_local_aabb(&unit, &Mat4::new_translation(&Vec3::new(0.0, 0.0, 30.0)));
        assert!(camera.is_visible(&ahead));
        assert!(!camera.is_visible(&behind));

        let segment = camera.picking_segment(0.0, 0.0);
        assert_relative_eq!(segment.a, Vec3::new(0.0, 0.0, 9.9), epsilon = 1e-3);
        assert_relative_eq!(segment.b, Vec3::new(0.0, 0.0, -90.0), epsilon = 1e-1);
    }
}
