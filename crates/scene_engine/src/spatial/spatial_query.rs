//! Query shapes accepted by the spatial index
//!
//! A query shape only has to answer whether it touches an axis-aligned box.
//! Shapes with a notion of "first contact" (rays, segments) also report the
//! distance to it, which lets the index return candidates nearest-first.

use crate::spatial::primitives::{AABB, Frustum, Ray, Segment};

/// Shape the quadtree can be queried with
pub trait SpatialShape {
    /// Whether the shape touches `aabb`
    fn intersects_aabb(&self, aabb: &AABB) -> bool;

    /// Distance from the shape origin to its first contact with `aabb`
    ///
    /// Shapes without an origin return `None` and are never ordered.
    fn first_hit_aabb(&self, _aabb: &AABB) -> Option<f32> {
        None
    }

    /// Whether results for this shape are ordered by [`first_hit_aabb`](Self::first_hit_aabb)
    fn orders_by_distance(&self) -> bool {
        false
    }
}

impl SpatialShape for AABB {
    fn intersects_aabb(&self, aabb: &AABB) -> bool {
        self.intersects(aabb)
    }
}

impl SpatialShape for Frustum {
    fn intersects_aabb(&self, aabb: &AABB) -> bool {
        Frustum::intersects_aabb(self, aabb)
    }
}

impl SpatialShape for Ray {
    fn intersects_aabb(&self, aabb: &AABB) -> bool {
        self.first_hit_aabb(aabb).is_some()
    }

    fn first_hit_aabb(&self, aabb: &AABB) -> Option<f32> {
        aabb.intersect_ray(self.origin, self.direction)
    }

    fn orders_by_distance(&self) -> bool {
        true
    }
}

impl SpatialShape for Segment {
    fn intersects_aabb(&self, aabb: &AABB) -> bool {
        self.intersect_aabb(aabb).is_some()
    }

    fn first_hit_aabb(&self, aabb: &AABB) -> Option<f32> {
        self.intersect_aabb(aabb)
    }

    fn orders_by_distance(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    #[test]
    fn test_ray_reports_entry_distance() {
        let aabb = AABB::from_center_extents(Vec3::new(0.0, 0.0, -10.0), Vec3::repeat(2.0));
        let ray = Ray::new(Vec3::zeros(), Vec3::new(0.0, 0.0, -1.0));

        assert!(ray.intersects_aabb(&aabb));
        assert_eq!(ray.first_hit_aabb(&aabb), Some(8.0));
        assert!(ray.orders_by_distance());
    }

    #[test]
    fn test_aabb_shape_is_unordered() {
        let query = AABB::from_center_extents(Vec3::zeros(), Vec3::repeat(1.0));
        let other = AABB::from_center_extents(Vec3::new(1.5, 0.0, 0.0), Vec3::repeat(1.0));

        assert!(query.intersects_aabb(&other));
        assert!(query.first_hit_aabb(&other).is_none());
        assert!(!query.orders_by_distance());
    }
}
