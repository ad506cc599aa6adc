//! Component kinds, masks and attached component storage
//!
//! Transform and BoundingBox live directly on [`Entity`](crate::ecs::Entity);
//! every other kind is a [`ComponentData`] variant wrapped in a
//! [`Component`] once attached to an entity.

use bitflags::bitflags;

use crate::ecs::components::{
    ComponentCamera, ComponentLight, ComponentMaterial, ComponentMesh, ComponentTransform,
};
use crate::ecs::entity::{EntityEvents, EntityKey};
use crate::foundation::ids::ComponentId;
use crate::render::{FrameContext, GpuMeshHandle};

/// Discriminant of every component type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Local/global pose, one per entity
    Transform,
    /// Subtree bounds, one per entity
    BoundingBox,
    /// View and projection
    Camera,
    /// GPU geometry
    Mesh,
    /// Shading parameters
    Material,
    /// Light source
    Light,
}

impl ComponentKind {
    /// Whether an entity may hold more than one component of this kind
    pub fn allows_multiple(self) -> bool {
        matches!(self, ComponentKind::Mesh)
    }

    /// Single-bit mask of this kind
    pub fn mask(self) -> ComponentMask {
        match self {
            ComponentKind::Transform => ComponentMask::TRANSFORM,
            ComponentKind::BoundingBox => ComponentMask::BOUNDING_BOX,
            ComponentKind::Camera => ComponentMask::CAMERA,
            ComponentKind::Mesh => ComponentMask::MESH,
            ComponentKind::Material => ComponentMask::MATERIAL,
            ComponentKind::Light => ComponentMask::LIGHT,
        }
    }
}

bitflags! {
    /// Set of component kinds, used to filter change notifications
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ComponentMask: u8 {
        /// [`ComponentKind::Transform`]
        const TRANSFORM = 1 << 0;
        /// [`ComponentKind::BoundingBox`]
        const BOUNDING_BOX = 1 << 1;
        /// [`ComponentKind::Camera`]
        const CAMERA = 1 << 2;
        /// [`ComponentKind::Mesh`]
        const MESH = 1 << 3;
        /// [`ComponentKind::Material`]
        const MATERIAL = 1 << 4;
        /// [`ComponentKind::Light`]
        const LIGHT = 1 << 5;
    }
}

impl ComponentMask {
    /// Whether `kind` is in the set
    pub fn matches(self, kind: ComponentKind) -> bool {
        self.contains(kind.mask())
    }
}

/// Payload of an optional component
#[derive(Debug)]
pub enum ComponentData {
    /// Camera
    Camera(ComponentCamera),
    /// Mesh
    Mesh(ComponentMesh),
    /// Material
    Material(ComponentMaterial),
    /// Light
    Light(ComponentLight),
}

impl ComponentData {
    /// Kind of the payload
    pub fn kind(&self) -> ComponentKind {
        match self {
            ComponentData::Camera(_) => ComponentKind::Camera,
            ComponentData::Mesh(_) => ComponentKind::Mesh,
            ComponentData::Material(_) => ComponentKind::Material,
            ComponentData::Light(_) => ComponentKind::Light,
        }
    }

    /// Bind owner-dependent state when attached
    pub(crate) fn on_attach(&mut self, events: &EntityEvents, transform: &ComponentTransform) {
        if let ComponentData::Camera(camera) = self {
            camera.bind(events, transform);
        }
    }

    /// Move GPU buffers out so they can be released once
    pub(crate) fn take_gpu_buffers(&mut self) -> Option<GpuMeshHandle> {
        match self {
            ComponentData::Mesh(mesh) => mesh.take_gpu_buffers(),
            _ => None,
        }
    }

    pub(crate) fn pre_update(&self, transform: &ComponentTransform, ctx: &mut FrameContext<'_>) {
        match self {
            ComponentData::Camera(camera) => camera.pre_update(ctx),
            ComponentData::Light(light) => light.pre_update(transform, ctx),
            ComponentData::Mesh(_) | ComponentData::Material(_) => {}
        }
    }

    pub(crate) fn update(&self, transform: &ComponentTransform, ctx: &mut FrameContext<'_>) {
        match self {
            ComponentData::Material(material) => material.update(ctx),
            ComponentData::Mesh(mesh) => mesh.update(transform, ctx),
            ComponentData::Camera(_) | ComponentData::Light(_) => {}
        }
    }

    pub(crate) fn post_update(&self, transform: &ComponentTransform, ctx: &mut FrameContext<'_>) {
        if let ComponentData::Light(light) = self {
            light.post_update(transform, ctx);
        }
    }
}

impl From<ComponentCamera> for ComponentData {
    fn from(camera: ComponentCamera) -> Self {
        ComponentData::Camera(camera)
    }
}

impl From<ComponentMesh> for ComponentData {
    fn from(mesh: ComponentMesh) -> Self {
        ComponentData::Mesh(mesh)
    }
}

impl From<ComponentMaterial> for ComponentData {
    fn from(material: ComponentMaterial) -> Self {
        ComponentData::Material(material)
    }
}

impl From<ComponentLight> for ComponentData {
    fn from(light: ComponentLight) -> Self {
        ComponentData::Light(light)
    }
}

/// Typed view into [`ComponentData`]
pub trait ComponentVariant: Sized {
    /// Kind stored by this type
    const KIND: ComponentKind;

    /// Borrow the payload if it is this type
    fn from_data(data: &ComponentData) -> Option<&Self>;

    /// Mutably borrow the payload if it is this type
    fn from_data_mut(data: &mut ComponentData) -> Option<&mut Self>;
}

macro_rules! impl_component_variant {
    ($ty:ty, $variant:ident) => {
        impl ComponentVariant for $ty {
            const KIND: ComponentKind = ComponentKind::$variant;

            fn from_data(data: &ComponentData) -> Option<&Self> {
                match data {
                    ComponentData::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn from_data_mut(data: &mut ComponentData) -> Option<&mut Self> {
                match data {
                    ComponentData::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

impl_component_variant!(ComponentCamera, Camera);
impl_component_variant!(ComponentMesh, Mesh);
impl_component_variant!(ComponentMaterial, Material);
impl_component_variant!(ComponentLight, Light);

/// Optional component attached to an entity
#[derive(Debug)]
pub struct Component {
    id: ComponentId,
    owner: EntityKey,
    enabled: bool,
    data: ComponentData,
}

impl Component {
    pub(crate) fn new(id: ComponentId, owner: EntityKey, data: ComponentData) -> Self {
        Self {
            id,
            owner,
            enabled: true,
            data,
        }
    }

    /// Identity assigned on attach
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Entity the component is attached to
    pub fn owner(&self) -> EntityKey {
        self.owner
    }

    /// Kind of the payload
    pub fn kind(&self) -> ComponentKind {
        self.data.kind()
    }

    /// Whether frame hooks run for this component
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Run frame hooks again
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Skip frame hooks; the component stays attached and queryable
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Payload
    pub fn data(&self) -> &ComponentData {
        &self.data
    }

    /// Mutable payload; the variant must not be replaced
    pub(crate) fn data_mut(&mut self) -> &mut ComponentData {
        &mut self.data
    }

    /// Payload as a concrete type
    pub fn as_variant<T: ComponentVariant>(&self) -> Option<&T> {
        T::from_data(&self.data)
    }

    /// Mutable payload as a concrete type
    pub fn as_variant_mut<T: ComponentVariant>(&mut self) -> Option<&mut T> {
        T::from_data_mut(&mut self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_meshes_allow_multiples() {
        assert!(ComponentKind::Mesh.allows_multiple());
        for kind in [
            ComponentKind::Transform,
            ComponentKind::BoundingBox,
            ComponentKind::Camera,
            ComponentKind::Material,
            ComponentKind::Light,
        ] {
            assert!(!kind.allows_multiple());
        }
    }

    #[test]
    fn test_mask_filters_kinds() {
        let mask = ComponentMask::TRANSFORM | ComponentMask::MESH | ComponentMask::BOUNDING_BOX;
        assert!(mask.matches(ComponentKind::Mesh));
        assert!(mask.matches(ComponentKind::BoundingBox));
        assert!(!mask.matches(ComponentKind::Light));
        assert!(!mask.matches(ComponentKind::Material));
    }
}
