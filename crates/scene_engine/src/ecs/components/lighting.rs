//! Light component
//!
//! Three light kinds, each with its own uniform set and editor gizmo:
//! - Directional: `dir_light.*`, direction from the owner's front
//! - Point: `point_lights[i].*`, position from the owner, distance attenuation
//! - Spot: `spot_lights[i].*`, position and direction from the owner, cone cutoffs
//!
//! Slot indices come from the per-frame counters in [`FrameContext`].

use crate::ecs::components::ComponentTransform;
use crate::foundation::math::{Mat4, Vec3};
use crate::render::{FrameContext, GizmoShape, UniformValue};

/// Kind-specific light parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Parallel rays along the owner's front
    Directional,
    /// Omnidirectional with `1 / (constant + linear d + quadratic d²)` falloff
    Point {
        /// Constant attenuation term
        constant: f32,
        /// Linear attenuation term
        linear: f32,
        /// Quadratic attenuation term
        quadratic: f32,
    },
    /// Cone along the owner's front
    Spot {
        /// Full intensity half angle (radians)
        inner_cutoff: f32,
        /// Zero intensity half angle (radians)
        outer_cutoff: f32,
    },
}

/// Light component
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentLight {
    kind: LightKind,
    color: Vec3,
    intensity: f32,
}

impl ComponentLight {
    /// Create a light of any kind
    pub fn new(kind: LightKind, color: Vec3, intensity: f32) -> Self {
        Self { kind, color, intensity }
    }

    /// Directional light
    pub fn directional(color: Vec3, intensity: f32) -> Self {
        Self::new(LightKind::Directional, color, intensity)
    }

    /// Point light with attenuation covering roughly 50 units
    pub fn point(color: Vec3, intensity: f32) -> Self {
        Self::new(
            LightKind::Point {
                constant: 1.0,
                linear: 0.09,
                quadratic: 0.032,
            },
            color,
            intensity,
        )
    }

    /// Spot light with cutoff half angles in radians
    pub fn spot(color: Vec3, intensity: f32, inner_cutoff: f32, outer_cutoff: f32) -> Self {
        Self::new(LightKind::Spot { inner_cutoff, outer_cutoff }, color, intensity)
    }

    /// Kind and its parameters
    pub fn kind(&self) -> LightKind {
        self.kind
    }

    /// Light colour
    pub fn color(&self) -> Vec3 {
        self.color
    }

    /// Set light colour
    pub fn set_color(&mut self, color: Vec3) {
        self.color = color;
    }

    /// Intensity multiplier
    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Set intensity multiplier
    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity;
    }

    /// Editor gizmo of this kind
    pub fn gizmo(&self) -> GizmoShape {
        match self.kind {
            LightKind::Directional => GizmoShape::Arrow,
            LightKind::Point { .. } => GizmoShape::Sphere,
            LightKind::Spot { .. } => GizmoShape::Cone,
        }
    }

    pub(crate) fn pre_update(&self, transform: &ComponentTransform, ctx: &mut FrameContext<'_>) {
        match self.kind {
            LightKind::Directional => {
                let index = ctx.next_directional_light();
                if index > 0 {
                    log::trace!("Ignoring directional light {}, only one is uploaded", index);
                    return;
                }
                let backend = &mut *ctx.backend;
                backend.set_uniform("dir_light.direction", UniformValue::Vec3(transform.front()));
                backend.set_uniform("dir_light.color", UniformValue::Vec3(self.color));
                backend.set_uniform("dir_light.intensity", UniformValue::Float(self.intensity));
            }
            LightKind::Point { constant, linear, quadratic } => {
                let prefix = format!("point_lights[{}]", ctx.next_point_light());
                let backend = &mut *ctx.backend;
                backend.set_uniform(&format!("{prefix}.position"), UniformValue::Vec3(transform.position()));
                backend.set_uniform(&format!("{prefix}.color"), UniformValue::Vec3(self.color));
                backend.set_uniform(&format!("{prefix}.intensity"), UniformValue::Float(self.intensity));
                backend.set_uniform(&format!("{prefix}.constant"), UniformValue::Float(constant));
                backend.set_uniform(&format!("{prefix}.linear"), UniformValue::Float(linear));
                backend.set_uniform(&format!("{prefix}.quadratic"), UniformValue::Float(quadratic));
            }
            LightKind::Spot { inner_cutoff, outer_cutoff } => {
                let prefix = format!("spot_lights[{}]", ctx.next_spot_light());
                let backend = &mut *ctx.backend;
                backend.set_uniform(&format!("{prefix}.position"), UniformValue::Vec3(transform.position()));
                backend.set_uniform(&format!("{prefix}.direction"), UniformValue::Vec3(transform.front()));
                backend.set_uniform(&format!("{prefix}.color"), UniformValue::Vec3(self.color));
                backend.set_uniform(&format!("{prefix}.intensity"), UniformValue::Float(self.intensity));
                // Shaders compare against the cosine of the angle
                backend.set_uniform(&format!("{prefix}.inner_cutoff"), UniformValue::Float(inner_cutoff.cos()));
                backend.set_uniform(&format!("{prefix}.outer_cutoff"), UniformValue::Float(outer_cutoff.cos()));
            }
        }
    }

    pub(crate) fn post_update(&self, transform: &ComponentTransform, ctx: &mut FrameContext<'_>) {
        // Gizmos ignore the owner's scale
        let model = Mat4::new_translation(&transform.position()) * transform.rotation().to_homogeneous();
        ctx.backend.draw_gizmo(self.gizmo(), &model, self.color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::ids::IdAllocator;
    use crate::render::RecordingBackend;

    #[test]
    fn test_point_lights_take_consecutive_slots() {
        let transform = ComponentTransform::new(IdAllocator::new().next_component_id());
        let first = ComponentLight::point(Vec3::new(1.0, 1.0, 1.0), 1.0);
        let second = ComponentLight::point(Vec3::new(0.0, 1.0, 0.0), 2.0);

        let mut backend = RecordingBackend::new();
        let mut ctx = FrameContext::new(&mut backend);
        first.pre_update(&transform, &mut ctx);
        second.pre_update(&transform, &mut ctx);
        assert_eq!(ctx.light_counts(), (0, 2, 0));
        ctx.upload_light_counts();

        assert_eq!(backend.uniform("point_lights[1].intensity"), Some(&UniformValue::Float(2.0)));
        assert_eq!(backend.uniform("point_light_count"), Some(&UniformValue::Int(2)));
    }

    #[test]
    fn test_each_kind_has_its_gizmo() {
        assert_eq!(ComponentLight::directional(Vec3::zeros(), 1.0).gizmo(), GizmoShape::Arrow);
        assert_eq!(ComponentLight::point(Vec3::zeros(), 1.0).gizmo(), GizmoShape::Sphere);
        assert_eq!(ComponentLight::spot(Vec3::zeros(), 1.0, 0.2, 0.3).gizmo(), GizmoShape::Cone);
    }
}
