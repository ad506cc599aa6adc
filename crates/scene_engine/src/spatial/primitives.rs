//! Bounding volumes and intersection primitives
//!
//! Axis-aligned and oriented boxes, frustum planes, rays, segments and
//! triangles shared by culling, picking and the quadtree.

use crate::foundation::math::{Mat4, Point3, Vec3, Vec4};

/// Axis-Aligned Bounding Box for spatial queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// An inverted box that any [`grow`](Self::grow) call replaces
    pub fn empty() -> Self {
        Self {
            min: Vec3::repeat(f32::INFINITY),
            max: Vec3::repeat(f32::NEG_INFINITY),
        }
    }

    /// Smallest box containing every point, `None` for no points
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut aabb = Self::empty();
        for point in points {
            aabb.grow(point);
        }
        (!aabb.is_empty()).then_some(aabb)
    }

    /// Whether the box contains no point at all
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Extend the box to contain `point`
    pub fn grow(&mut self, point: Vec3) {
        self.min = self.min.inf(&point);
        self.max = self.max.sup(&point);
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// The eight corners
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Test ray intersection with this AABB using slab method
    /// Returns the distance to the entry point if the ray intersects, None otherwise
    pub fn intersect_ray(&self, ray_origin: Vec3, ray_dir: Vec3) -> Option<f32> {
        let inv_dir = Vec3::new(
            if ray_dir.x != 0.0 { 1.0 / ray_dir.x } else { f32::INFINITY },
            if ray_dir.y != 0.0 { 1.0 / ray_dir.y } else { f32::INFINITY },
            if ray_dir.z != 0.0 { 1.0 / ray_dir.z } else { f32::INFINITY },
        );

        let t1 = (self.min.x - ray_origin.x) * inv_dir.x;
        let t2 = (self.max.x - ray_origin.x) * inv_dir.x;
        let t3 = (self.min.y - ray_origin.y) * inv_dir.y;
        let t4 = (self.max.y - ray_origin.y) * inv_dir.y;
        let t5 = (self.min.z - ray_origin.z) * inv_dir.z;
        let t6 = (self.max.z - ray_origin.z) * inv_dir.z;

        // NaN (origin on a slab plane with zero direction) must not poison min/max
        let tmin = t1.min(t2).max(t3.min(t4)).max(t5.min(t6));
        let tmax = t1.max(t2).min(t3.max(t4)).min(t5.max(t6));

        if tmax >= tmin && tmax >= 0.0 {
            Some(tmin.max(0.0))
        } else {
            None
        }
    }
}

/// Box with arbitrary orientation, in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OBB {
    /// Centre of the box
    pub center: Vec3,
    /// Unit axes of the box (local X, Y, Z in world space)
    pub axes: [Vec3; 3],
    /// Half size along each axis
    pub half_extents: Vec3,
}

impl OBB {
    /// Orient a local-space box by an affine matrix
    ///
    /// Scale of `matrix` ends up in the half extents, rotation in the axes.
    pub fn from_local_aabb(local: &AABB, matrix: &Mat4) -> Self {
        let center = matrix.transform_point(&Point3::from(local.center())).coords;
        let extents = local.extents();

        let mut axes = [Vec3::x(), Vec3::y(), Vec3::z()];
        let mut half_extents = Vec3::zeros();
        for i in 0..3 {
            let column = Vec3::new(matrix[(0, i)], matrix[(1, i)], matrix[(2, i)]);
            let length = column.magnitude();
            if length > f32::EPSILON {
                axes[i] = column / length;
            }
            half_extents[i] = extents[i] * length;
        }

        Self {
            center,
            axes,
            half_extents,
        }
    }

    /// The eight corners
    pub fn corners(&self) -> [Vec3; 8] {
        let x = self.axes[0] * self.half_extents.x;
        let y = self.axes[1] * self.half_extents.y;
        let z = self.axes[2] * self.half_extents.z;
        let c = self.center;
        [
            c - x - y - z,
            c + x - y - z,
            c - x + y - z,
            c + x + y - z,
            c - x - y + z,
            c + x - y + z,
            c - x + y + z,
            c + x + y + z,
        ]
    }

    /// Radius of the sphere centred on the box that encloses it
    pub fn enclosing_radius(&self) -> f32 {
        self.half_extents.magnitude()
    }

    /// Smallest axis-aligned box containing this box
    pub fn enclosing_aabb(&self) -> AABB {
        let reach = Vec3::new(
            self.axes[0].x.abs() * self.half_extents.x
                + self.axes[1].x.abs() * self.half_extents.y
                + self.axes[2].x.abs() * self.half_extents.z,
            self.axes[0].y.abs() * self.half_extents.x
                + self.axes[1].y.abs() * self.half_extents.y
                + self.axes[2].y.abs() * self.half_extents.z,
            self.axes[0].z.abs() * self.half_extents.x
                + self.axes[1].z.abs() * self.half_extents.y
                + self.axes[2].z.abs() * self.half_extents.z,
        );
        AABB::from_center_extents(self.center, reach)
    }
}

/// Plane defined by normal and distance from origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Normal vector (normalized)
    pub normal: Vec3,
    /// Distance from origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Create a new plane from normal and distance
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal: normal.normalize(), distance }
    }

    /// Plane from raw `(a, b, c, d)` coefficients, normalized
    fn from_coefficients(coefficients: Vec4) -> Self {
        let normal = Vec3::new(coefficients.x, coefficients.y, coefficients.z);
        let length = normal.magnitude();
        if length <= f32::EPSILON {
            return Self { normal: Vec3::zeros(), distance: 0.0 };
        }
        Self {
            normal: normal / length,
            distance: coefficients.w / length,
        }
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.distance
    }
}

/// Frustum for visibility culling, planes pointing inwards
#[derive(Debug, Clone, PartialEq)]
pub struct Frustum {
    /// Six planes defining the frustum (left, right, bottom, top, near, far)
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Create a frustum from six planes
    pub fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Extract frustum planes from a view-projection matrix
    ///
    /// Gribb-Hartmann extraction for clip space with z in [-w, w].
    pub fn from_matrix(vp_matrix: &Mat4) -> Self {
        let row = |i: usize| -> Vec4 { vp_matrix.row(i).transpose() };
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        Self {
            planes: [
                Plane::from_coefficients(r3 + r0),
                Plane::from_coefficients(r3 - r0),
                Plane::from_coefficients(r3 + r1),
                Plane::from_coefficients(r3 - r1),
                Plane::from_coefficients(r3 + r2),
                Plane::from_coefficients(r3 - r2),
            ],
        }
    }

    /// Whether every point lies outside one plane
    fn all_outside_one_plane(&self, points: &[Vec3]) -> bool {
        self.planes.iter().any(|plane| {
            points.iter().all(|point| plane.distance_to_point(*point) < 0.0)
        })
    }

    /// Check if an AABB is inside or intersects the frustum
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        for plane in &self.planes {
            // Corner furthest along the plane normal
            let mut p = aabb.min;
            if plane.normal.x >= 0.0 { p.x = aabb.max.x; }
            if plane.normal.y >= 0.0 { p.y = aabb.max.y; }
            if plane.normal.z >= 0.0 { p.z = aabb.max.z; }

            if plane.distance_to_point(p) < 0.0 {
                return false;
            }
        }
        true
    }

    /// Check if an oriented box is inside or intersects the frustum
    ///
    /// Conservative: boxes near a frustum corner may be reported visible.
    pub fn intersects_obb(&self, obb: &OBB) -> bool {
        !self.all_outside_one_plane(&obb.corners())
    }
}

/// A ray for ray casting and picking
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// The origin point of the ray
    pub origin: Vec3,
    /// The direction of the ray (normalized)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray with the given origin and direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Finite line segment, used for mouse picking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Start point
    pub a: Vec3,
    /// End point
    pub b: Vec3,
}

impl Segment {
    /// Create a segment between two points
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self { a, b }
    }

    /// Distance between the end points
    pub fn length(&self) -> f32 {
        (self.b - self.a).magnitude()
    }

    /// Ray starting at `a` pointing at `b`
    pub fn to_ray(&self) -> Ray {
        Ray::new(self.a, self.b - self.a)
    }

    /// Both end points mapped through an affine matrix
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        Self {
            a: matrix.transform_point(&Point3::from(self.a)).coords,
            b: matrix.transform_point(&Point3::from(self.b)).coords,
        }
    }

    /// Distance from `a` to the first point inside `aabb`, if within the segment
    pub fn intersect_aabb(&self, aabb: &AABB) -> Option<f32> {
        let length = self.length();
        if length <= f32::EPSILON {
            return aabb.contains_point(self.a).then_some(0.0);
        }
        aabb.intersect_ray(self.a, (self.b - self.a) / length)
            .filter(|t| *t <= length)
    }
}

/// A triangle for ray intersection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First vertex
    pub v0: Vec3,
    /// Second vertex
    pub v1: Vec3,
    /// Third vertex
    pub v2: Vec3,
}

impl Triangle {
    /// Creates a new triangle
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Calculates the normal of the triangle (right-hand rule)
    ///
    /// Degenerate triangles have no normal and return zero.
    pub fn normal(&self) -> Vec3 {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        edge1.cross(&edge2).try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros)
    }

    /// Möller-Trumbore ray-triangle intersection algorithm
    /// Returns (t, u, v) barycentric coordinates if hit, None otherwise
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, f32, f32)> {
        const EPSILON: f32 = 0.000001;

        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction.cross(&edge2);
        let a = edge1.dot(&h);

        // Ray parallel to triangle
        if a.abs() < EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = f * ray.direction.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(&q);
        if t > EPSILON {
            Some((t, u, v))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Quat;
    use approx::assert_relative_eq;

    #[test]
    fn test_aabb_intersects() {
        let aabb1 = AABB::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 2.0, 2.0));
        let aabb2 = AABB::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(3.0, 3.0, 3.0));
        let aabb3 = AABB::new(Vec3::new(5.0, 5.0, 5.0), Vec3::new(7.0, 7.0, 7.0));

        assert!(aabb1.intersects(&aabb2));
        assert!(!aabb1.intersects(&aabb3));
    }

    #[test]
    fn test_triangle_normal() {
        let triangle = Triangle::new(Vec3::zeros(), Vec3::x(), Vec3::y());
        assert_relative_eq!(triangle.normal(), Vec3::z(), epsilon = 1e-6);

        let collinear = Triangle::new(Vec3::zeros(), Vec3::x(), Vec3::x() * 2.0);
        assert_eq!(collinear.normal(), Vec3::zeros());
        let point = Triangle::new(Vec3::repeat(1.0), Vec3::repeat(1.0), Vec3::repeat(1.0));
        assert!(point.normal().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_from_points_and_empty() {
        assert!(AABB::from_points(std::iter::empty()).is_none());
        let aabb = AABB::from_points([Vec3::new(1.0, -1.0, 0.0), Vec3::new(-2.0, 3.0, 4.0)]).unwrap();
        assert_eq!(aabb.min, Vec3::new(-2.0, -1.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 3.0, 4.0));
    }

    #[test]
    fn test_obb_from_rotated_matrix_encloses_corners() {
        let local = AABB::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        let rotation = Quat::from_euler_angles(0.0, std::f32::consts::FRAC_PI_4, 0.0);
        let matrix = Mat4::new_translation(&Vec3::new(10.0, 0.0, 0.0))
            * rotation.to_homogeneous()
            * Mat4::new_scaling(2.0);

        let obb = OBB::from_local_aabb(&local, &matrix);
        assert_relative_eq!(obb.center, Vec3::new(10.0, 0.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(obb.half_extents, Vec3::new(2.0, 2.0, 2.0), epsilon = 1e-5);

        let aabb = obb.enclosing_aabb();
        let reach = 2.0 * std::f32::consts::SQRT_2;
        assert_relative_eq!(aabb.max.x, 10.0 + reach, epsilon = 1e-4);
        assert_relative_eq!(aabb.max.y, 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_frustum_from_perspective_matrix() {
        let projection = Mat4::new_perspective(1.0, std::f32::consts::FRAC_PI_2, 0.1, 100.0);
        let view = Mat4::look_at_rh(
            &Point3::new(0.0, 0.0, 10.0),
            &Point3::origin(),
            &Vec3::y(),
        );
        let frustum = Frustum::from_matrix(&(projection * view));

        let in_front = AABB::from_center_extents(Vec3::zeros(), Vec3::repeat(1.0));
        let behind = AABB::from_center_extents(Vec3::new(0.0, 0.0, 20.0), Vec3::repeat(1.0));
        let far_left = AABB::from_center_extents(Vec3::new(-100.0, 0.0, 0.0), Vec3::repeat(1.0));

        assert!(frustum.intersects_aabb(&in_front));
        assert!(!frustum.intersects_aabb(&behind));
        assert!(!frustum.intersects_aabb(&far_left));

        let obb = OBB::from_local_aabb(&in_front, &Mat4::identity());
        assert!(frustum.intersects_obb(&obb));
    }

    #[test]
    fn test_triangle_ray_hit_and_miss() {
        let triangle = Triangle::new(
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        let hit = triangle.intersect_ray(&Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0)));
        let miss = triangle.intersect_ray(&Ray::new(Vec3::new(3.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0)));
        let behind = triangle.intersect_ray(&Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, 1.0)));

        assert_relative_eq!(hit.unwrap().0, 5.0, epsilon = 1e-5);
        assert!(miss.is_none());
        assert!(behind.is_none());
    }

    #[test]
    fn test_segment_respects_length() {
        let aabb = AABB::from_center_extents(Vec3::new(0.0, 0.0, -10.0), Vec3::repeat(1.0));
        let short = Segment::new(Vec3::zeros(), Vec3::new(0.0, 0.0, -5.0));
        let long = Segment::new(Vec3::zeros(), Vec3::new(0.0, 0.0, -50.0));

        assert!(short.intersect_aabb(&aabb).is_none());
        assert_relative_eq!(long.intersect_aabb(&aabb).unwrap(), 9.0, epsilon = 1e-5);
    }
}
