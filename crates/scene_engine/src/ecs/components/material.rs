//! Material component
//!
//! Shading parameters pushed as `material.*` uniforms before the owner's
//! meshes draw.

use crate::foundation::math::Vec3;
use crate::render::{FrameContext, TextureHandle, TextureSlot, UniformValue};

/// Shader used when a material does not name one
pub const DEFAULT_SHADER: &str = "default";

/// Material component
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentMaterial {
    shader: String,
    color: Vec3,
    shininess: f32,
    textures: [Option<TextureHandle>; 4],
}

impl Default for ComponentMaterial {
    fn default() -> Self {
        Self {
            shader: DEFAULT_SHADER.to_string(),
            color: Vec3::new(1.0, 1.0, 1.0),
            shininess: 32.0,
            textures: [None; 4],
        }
    }
}

impl ComponentMaterial {
    /// White material without textures
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: set base colour
    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = color;
        self
    }

    /// Builder pattern: set specular exponent
    pub fn with_shininess(mut self, shininess: f32) -> Self {
        self.shininess = shininess;
        self
    }

    /// Builder pattern: set shader program name
    pub fn with_shader(mut self, shader: impl Into<String>) -> Self {
        self.shader = shader.into();
        self
    }

    /// Shader program name
    pub fn shader(&self) -> &str {
        &self.shader
    }

    /// Base colour
    pub fn color(&self) -> Vec3 {
        self.color
    }

    /// Set base colour
    pub fn set_color(&mut self, color: Vec3) {
        self.color = color;
    }

    /// Specular exponent
    pub fn shininess(&self) -> f32 {
        self.shininess
    }

    /// Set specular exponent
    pub fn set_shininess(&mut self, shininess: f32) {
        self.shininess = shininess;
    }

    /// Texture bound to `slot`
    pub fn texture(&self, slot: TextureSlot) -> Option<TextureHandle> {
        self.textures[slot.unit() as usize]
    }

    /// Bind or clear the texture of `slot`
    pub fn set_texture(&mut self, slot: TextureSlot, texture: Option<TextureHandle>) {
        self.textures[slot.unit() as usize] = texture;
    }

    pub(crate) fn update(&self, ctx: &mut FrameContext<'_>) {
        let backend = &mut *ctx.backend;
        backend.use_shader(&self.shader);
        backend.set_uniform("material.color", UniformValue::Vec3(self.color));
        backend.set_uniform("material.shininess", UniformValue::Float(self.shininess));

        for slot in TextureSlot::ALL {
            let texture = self.texture(slot);
            if let Some(texture) = texture {
                backend.bind_texture(slot, texture);
                backend.set_uniform(slot.sampler_uniform(), UniformValue::Int(slot.unit() as i32));
            }
            backend.set_uniform(slot.presence_uniform(), UniformValue::flag(texture.is_some()));
        }
    }
}
