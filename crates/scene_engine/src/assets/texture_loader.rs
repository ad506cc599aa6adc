//! Image loading for material textures
//!
//! Decodes image files with the `image` crate, converts them to RGBA8 and
//! uploads them through the render backend. Each path is uploaded once.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::assets::TextureLoader;
use crate::render::{RenderBackend, TextureHandle};

/// Decoded RGBA8 pixels
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Raw RGBA pixel data
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl ImageData {
    /// Load an image from a file path
    pub fn from_file(path: &Path) -> Result<Self, image::ImageError> {
        let rgba = image::open(path)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        log::debug!("Decoded image {}x{} from {:?}", width, height, path);
        Ok(Self {
            data: rgba.into_raw(),
            width,
            height,
        })
    }

    /// Solid colour image
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = width as usize * height as usize;
        Self {
            data: color.repeat(pixel_count),
            width,
            height,
        }
    }
}

/// [`TextureLoader`] backed by image files on disk
#[derive(Debug, Default)]
pub struct ImageTextureLoader {
    cache: HashMap<PathBuf, TextureHandle>,
}

impl ImageTextureLoader {
    /// Create a loader with an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct textures uploaded
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }
}

impl TextureLoader for ImageTextureLoader {
    fn load(&mut self, path: &Path, renderer: &mut dyn RenderBackend) -> Option<TextureHandle> {
        if let Some(&handle) = self.cache.get(path) {
            return Some(handle);
        }
        if !path.is_file() {
            return None;
        }

        let image = match ImageData::from_file(path) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("Failed to decode texture {:?}: {}", path, e);
                return None;
            }
        };

        match renderer.create_texture(image.width, image.height, &image.data) {
            Ok(handle) => {
                log::info!("Loaded texture {:?} ({}x{})", path, image.width, image.height);
                self.cache.insert(path.to_path_buf(), handle);
                Some(handle)
            }
            Err(e) => {
                log::error!("Texture upload failed for {:?}: {}", path, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RecordingBackend;

    #[test]
    fn test_loads_and_caches_png() {
        let dir = std::env::temp_dir().join(format!("scene_engine_tex_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("red.png");
        let pixels = ImageData::solid_color(2, 2, [255, 0, 0, 255]);
        image::save_buffer(&path, &pixels.data, 2, 2, image::ColorType::Rgba8).unwrap();

        let mut backend = RecordingBackend::new();
        let mut loader = ImageTextureLoader::new();
        let first = loader.load(&path, &mut backend);
        let second = loader.load(&path, &mut backend);

        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(backend.texture_count(), 1);
        assert_eq!(loader.cached_count(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file_is_none() {
        let mut backend = RecordingBackend::new();
        let mut loader = ImageTextureLoader::new();
        assert!(loader.load(Path::new("does/not/exist.png"), &mut backend).is_none());
        assert_eq!(backend.texture_count(), 0);
    }
}
