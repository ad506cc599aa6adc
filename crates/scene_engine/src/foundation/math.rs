//! Math utilities and types
//!
//! Provides fundamental math types for 3D scene work.

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix3, Matrix4,
    Quaternion, Rotation3,
    Unit,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Position, rotation and scale of one frame of reference
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Pose {
    /// Create a new identity pose
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a pose with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Convert to a transformation matrix (TRS order)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Decompose an affine transformation matrix into a pose
    ///
    /// Shear introduced by non-uniform parent scale is discarded.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let position = Vec3::new(matrix.m14, matrix.m24, matrix.m34);

        let scale_x = Vec3::new(matrix.m11, matrix.m21, matrix.m31).magnitude();
        let scale_y = Vec3::new(matrix.m12, matrix.m22, matrix.m32).magnitude();
        let scale_z = Vec3::new(matrix.m13, matrix.m23, matrix.m33).magnitude();
        let scale = Vec3::new(scale_x, scale_y, scale_z);

        if scale_x <= f32::EPSILON || scale_y <= f32::EPSILON || scale_z <= f32::EPSILON {
            return Self {
                position,
                rotation: Quat::identity(),
                scale,
            };
        }

        let rotation_matrix = Mat3::new(
            matrix.m11 / scale_x, matrix.m12 / scale_y, matrix.m13 / scale_z,
            matrix.m21 / scale_x, matrix.m22 / scale_y, matrix.m23 / scale_z,
            matrix.m31 / scale_x, matrix.m32 / scale_y, matrix.m33 / scale_z,
        );
        let rotation = Quat::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rotation_matrix));

        Self {
            position,
            rotation,
            scale,
        }
    }
}

/// Euler angles (radians, roll/pitch/yaw about X/Y/Z) of a rotation
pub fn euler_from_quat(rotation: &Quat) -> Vec3 {
    let (roll, pitch, yaw) = rotation.euler_angles();
    Vec3::new(roll, pitch, yaw)
}

/// Rotation from Euler angles (radians, roll/pitch/yaw about X/Y/Z)
pub fn quat_from_euler(euler: &Vec3) -> Quat {
    Quat::from_euler_angles(euler.x, euler.y, euler.z)
}

/// Rotation turning +Z toward `direction` with +Y kept as close to world up as possible
pub fn look_rotation(direction: &Vec3) -> Quat {
    let Some(direction) = direction.try_normalize(f32::EPSILON) else {
        return Quat::identity();
    };
    let up = if direction.y.abs() > 0.999 { Vec3::z() } else { Vec3::y() };
    Quat::face_towards(&direction, &up)
}

/// Inverse of an affine matrix, identity when it is singular
pub fn inverse_or_identity(matrix: &Mat4) -> Mat4 {
    matrix.try_inverse().unwrap_or_else(|| {
        log::warn!("Singular transform matrix, using identity inverse");
        Mat4::identity()
    })
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Pi / 2
    pub const HALF_PI: f32 = PI * 0.5;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }

    /// Linear interpolation
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pose_matrix_roundtrip() {
        let pose = Pose {
            position: Vec3::new(1.0, -2.0, 3.5),
            rotation: Quat::from_euler_angles(0.3, -0.7, 1.1),
            scale: Vec3::new(2.0, 0.5, 1.5),
        };

        let decomposed = Pose::from_matrix(&pose.to_matrix());

        assert_relative_eq!(decomposed.position, pose.position, epsilon = 1e-5);
        assert_relative_eq!(decomposed.scale, pose.scale, epsilon = 1e-5);
        assert!(decomposed.rotation.angle_to(&pose.rotation) < 1e-4);
    }

    #[test]
    fn test_zero_scale_does_not_produce_nan() {
        let pose = Pose {
            scale: Vec3::zeros(),
            ..Pose::identity()
        };
        let decomposed = Pose::from_matrix(&pose.to_matrix());
        assert!(decomposed.rotation.coords.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_look_rotation_points_front() {
        let direction = Vec3::new(1.0, -1.0, 2.0);
        let front = look_rotation(&direction) * Vec3::z();
        assert_relative_eq!(front, direction.normalize(), epsilon = 1e-5);

        let straight_down = look_rotation(&Vec3::new(0.0, -3.0, 0.0)) * Vec3::z();
        assert_relative_eq!(straight_down, Vec3::new(0.0, -1.0, 0.0), epsilon = 1e-5);
        assert_eq!(look_rotation(&Vec3::zeros()), Quat::identity());
    }

    #[test]
    fn test_euler_mirror_matches_quaternion() {
        let euler = Vec3::new(0.2, 0.4, -0.6);
        let back = euler_from_quat(&quat_from_euler(&euler));
        assert_relative_eq!(back, euler, epsilon = 1e-5);
    }
}
