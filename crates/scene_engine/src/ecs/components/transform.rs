//! Transform component
//!
//! Holds the global pose and the pose relative to the parent. Exactly one
//! of the two drives each mutation; the other, the matrices and the basis
//! vectors are re-derived by [`ComponentTransform::recompute`], the single
//! recomputation entry point. Mutations go through the
//! [`World`](crate::ecs::World) setters so that change events fire and
//! descendants follow.

use crate::foundation::ids::ComponentId;
use crate::foundation::math::{euler_from_quat, inverse_or_identity, Mat4, Pose, Quat, Vec3};

/// Which pose drives a recomputation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseMode {
    /// Local pose is the input; global is derived as `parent_global * local`
    GlobalFromLocal,
    /// Global pose is the input; local is derived as `inverse(parent_global) * global`
    LocalFromGlobal,
}

/// Position, rotation and scale of an entity
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentTransform {
    id: ComponentId,

    global: Pose,
    local: Pose,
    global_euler: Vec3,
    local_euler: Vec3,

    local_matrix: Mat4,
    global_matrix: Mat4,

    right: Vec3,
    up: Vec3,
    front: Vec3,
}

impl ComponentTransform {
    /// Identity transform
    pub(crate) fn new(id: ComponentId) -> Self {
        Self {
            id,
            global: Pose::identity(),
            local: Pose::identity(),
            global_euler: Vec3::zeros(),
            local_euler: Vec3::zeros(),
            local_matrix: Mat4::identity(),
            global_matrix: Mat4::identity(),
            right: Vec3::x(),
            up: Vec3::y(),
            front: Vec3::z(),
        }
    }

    /// Component identity
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// World space position
    pub fn position(&self) -> Vec3 {
        self.global.position
    }

    /// World space rotation
    pub fn rotation(&self) -> Quat {
        self.global.rotation
    }

    /// World space scale
    pub fn scale(&self) -> Vec3 {
        self.global.scale
    }

    /// World space rotation as Euler angles (radians)
    pub fn euler_rotation(&self) -> Vec3 {
        self.global_euler
    }

    /// Position relative to the parent
    pub fn local_position(&self) -> Vec3 {
        self.local.position
    }

    /// Rotation relative to the parent
    pub fn local_rotation(&self) -> Quat {
        self.local.rotation
    }

    /// Scale relative to the parent
    pub fn local_scale(&self) -> Vec3 {
        self.local.scale
    }

    /// Rotation relative to the parent as Euler angles (radians)
    pub fn local_euler_rotation(&self) -> Vec3 {
        self.local_euler
    }

    /// World space pose
    pub fn global_pose(&self) -> &Pose {
        &self.global
    }

    /// Pose relative to the parent
    pub fn local_pose(&self) -> &Pose {
        &self.local
    }

    /// Matrix relative to the parent
    pub fn local_matrix(&self) -> &Mat4 {
        &self.local_matrix
    }

    /// World matrix
    pub fn global_matrix(&self) -> &Mat4 {
        &self.global_matrix
    }

    /// World space +X of the entity
    pub fn right(&self) -> Vec3 {
        self.right
    }

    /// World space +Y of the entity
    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// World space +Z of the entity
    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub(crate) fn global_pose_mut(&mut self) -> &mut Pose {
        &mut self.global
    }

    pub(crate) fn local_pose_mut(&mut self) -> &mut Pose {
        &mut self.local
    }

    /// Re-derive everything from the driving pose
    ///
    /// `parent_global` is None for parentless entities, in which case local
    /// and global coincide.
    pub fn recompute(&mut self, mode: PoseMode, parent_global: Option<&Mat4>) {
        match mode {
            PoseMode::GlobalFromLocal => {
                self.local_matrix = self.local.to_matrix();
                self.global_matrix = match parent_global {
                    Some(parent) => parent * self.local_matrix,
                    None => self.local_matrix,
                };
                self.global = Pose::from_matrix(&self.global_matrix);
            }
            PoseMode::LocalFromGlobal => {
                self.global_matrix = self.global.to_matrix();
                self.local_matrix = match parent_global {
                    Some(parent) => inverse_or_identity(parent) * self.global_matrix,
                    None => self.global_matrix,
                };
                self.local = Pose::from_matrix(&self.local_matrix);
            }
        }

        self.global_euler = euler_from_quat(&self.global.rotation);
        self.local_euler = euler_from_quat(&self.local.rotation);

        self.right = self.global.rotation * Vec3::x();
        self.up = self.global.rotation * Vec3::y();
        self.front = self.global.rotation * Vec3::z();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::quat_from_euler;
    use approx::assert_relative_eq;

    fn transform() -> ComponentTransform {
        ComponentTransform::new(crate::foundation::ids::IdAllocator::new().next_component_id())
    }

    #[test]
    fn test_global_from_local_composes_parent() {
        let parent = Mat4::new_translation(&Vec3::new(5.0, 0.0, 0.0));
        let mut t = transform();
        t.local_pose_mut().position = Vec3::new(0.0, 1.0, 0.0);
        t.recompute(PoseMode::GlobalFromLocal, Some(&parent));

        assert_relative_eq!(t.position(), Vec3::new(5.0, 1.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(*t.global_matrix(), parent * t.local_matrix(), epsilon = 1e-5);
    }

    #[test]
    fn test_local_from_global_inverts_parent() {
        let parent = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0)) * Mat4::new_scaling(2.0);
        let mut t = transform();
        t.global_pose_mut().position = Vec3::new(3.0, 2.0, 3.0);
        t.recompute(PoseMode::LocalFromGlobal, Some(&parent));

        assert_relative_eq!(t.local_position(), Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(t.local_scale(), Vec3::repeat(0.5), epsilon = 1e-5);
    }

    #[test]
    fn test_basis_follows_rotation() {
        let yaw = 0.7_f32;
        let mut t = transform();
        t.local_pose_mut().rotation = quat_from_euler(&Vec3::new(0.0, yaw, 0.0));
        t.recompute(PoseMode::GlobalFromLocal, None);

        assert_relative_eq!(t.front(), Vec3::new(yaw.sin(), 0.0, yaw.cos()), epsilon = 1e-5);
        assert_relative_eq!(t.right(), Vec3::new(yaw.cos(), 0.0, -yaw.sin()), epsilon = 1e-5);
        assert_relative_eq!(t.up(), Vec3::y(), epsilon = 1e-5);
        assert_relative_eq!(t.euler_rotation().y, yaw, epsilon = 1e-4);
    }
}
