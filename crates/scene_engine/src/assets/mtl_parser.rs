//! MTL (Material Template Library) file parser
//!
//! Reads the Phong subset the scene shades with: diffuse colour (Kd),
//! specular exponent (Ns) and the four texture slots.
//!
//! | Statement                   | Slot      |
//! |-----------------------------|-----------|
//! | `map_Kd`                    | Diffuse   |
//! | `map_Ks`                    | Specular  |
//! | `map_Ka`, `map_ao`          | Occlusion |
//! | `map_Bump`, `bump`, `norm`  | Normal    |

use crate::assets::{ImportError, ImportedMaterial};
use crate::foundation::math::Vec3;
use crate::render::TextureSlot;

/// MTL file parser
pub struct MtlParser;

impl MtlParser {
    /// Parse MTL file contents into materials, in declaration order
    pub fn parse(contents: &str) -> Result<Vec<ImportedMaterial>, ImportError> {
        let mut materials = Vec::new();
        let mut current: Option<ImportedMaterial> = None;

        for (line_index, line) in contents.lines().enumerate() {
            let line_num = line_index + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let Some(command) = tokens.next() else {
                continue;
            };

            if command == "newmtl" {
                let name = tokens.collect::<Vec<_>>().join(" ");
                if name.is_empty() {
                    return Err(Self::error(line_num, "newmtl missing material name"));
                }
                materials.extend(current.replace(ImportedMaterial::new(name)));
                continue;
            }

            // Statements before the first newmtl have no material to apply to
            let Some(material) = current.as_mut() else {
                continue;
            };

            match command {
                "Kd" => material.color = Self::parse_vec3(&mut tokens, line_num, command)?,
                "Ns" => material.shininess = Self::parse_f32(&mut tokens, line_num, command)?,
                "map_Kd" => Self::parse_texture(material, TextureSlot::Diffuse, tokens, line_num, command)?,
                "map_Ks" => Self::parse_texture(material, TextureSlot::Specular, tokens, line_num, command)?,
                "map_Ka" | "map_ao" => {
                    Self::parse_texture(material, TextureSlot::Occlusion, tokens, line_num, command)?;
                }
                "map_Bump" | "map_bump" | "bump" | "norm" => {
                    Self::parse_texture(material, TextureSlot::Normal, tokens, line_num, command)?;
                }
                _ => {}
            }
        }

        materials.extend(current);
        Ok(materials)
    }

    fn error(line: usize, message: impl Into<String>) -> ImportError {
        ImportError::Parse {
            line,
            message: message.into(),
        }
    }

    fn parse_vec3<'a, I>(tokens: &mut I, line_num: usize, command: &str) -> Result<Vec3, ImportError>
    where
        I: Iterator<Item = &'a str>,
    {
        let r = Self::parse_f32(tokens, line_num, command)?;
        let g = Self::parse_f32(tokens, line_num, command)?;
        let b = Self::parse_f32(tokens, line_num, command)?;
        Ok(Vec3::new(r, g, b))
    }

    fn parse_f32<'a, I>(tokens: &mut I, line_num: usize, command: &str) -> Result<f32, ImportError>
    where
        I: Iterator<Item = &'a str>,
    {
        let token = tokens
            .next()
            .ok_or_else(|| Self::error(line_num, format!("{command} missing value")))?;
        token
            .parse::<f32>()
            .map_err(|_| Self::error(line_num, format!("{command} invalid float value '{token}'")))
    }

    /// Texture path is the rest of the line after any `-option value` pairs
    fn parse_texture<'a, I>(
        material: &mut ImportedMaterial,
        slot: TextureSlot,
        tokens: I,
        line_num: usize,
        command: &str,
    ) -> Result<(), ImportError>
    where
        I: Iterator<Item = &'a str>,
    {
        let tokens: Vec<&str> = tokens.collect();
        let mut start = 0;
        while start < tokens.len() && tokens[start].starts_with('-') {
            start += 2;
        }

        let path = tokens.get(start..).map(|rest| rest.join(" ")).unwrap_or_default();
        if path.is_empty() {
            return Err(Self::error(line_num, format!("{command} missing texture path")));
        }
        material.set_texture(slot, path);
        Ok(())
    }
}
