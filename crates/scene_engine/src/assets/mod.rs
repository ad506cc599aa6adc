//! Model import boundary
//!
//! An [`AssetImporter`] turns a model file into an [`ImportedModel`]: a
//! tree of nodes carrying interleaved vertex data, triangle indices and
//! material references. [`ModelImporter`] converts that tree into an
//! entity subtree, resolving texture paths through a [`TextureLoader`].

pub mod model_import;
pub mod mtl_parser;
pub mod obj_loader;
pub mod texture_loader;

pub use model_import::ModelImporter;
pub use mtl_parser::MtlParser;
pub use obj_loader::ObjImporter;
pub use texture_loader::ImageTextureLoader;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::foundation::math::{Quat, Vec3};
use crate::render::{RenderBackend, TextureHandle, TextureSlot};

/// Model import errors
#[derive(Error, Debug)]
pub enum ImportError {
    /// IO error while reading the model
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed statement in the model file
    #[error("Parse error on line {line}: {message}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// What was wrong
        message: String,
    },

    /// The file parsed but holds no triangles
    #[error("No geometry in {0}")]
    Empty(PathBuf),

    /// No importer understands the file type
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Material description with texture paths as written in the source file
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedMaterial {
    /// Material name
    pub name: String,
    /// Base colour
    pub color: Vec3,
    /// Specular exponent
    pub shininess: f32,
    textures: [Option<PathBuf>; 4],
}

impl ImportedMaterial {
    /// White material without textures
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: Vec3::new(1.0, 1.0, 1.0),
            shininess: 32.0,
            textures: Default::default(),
        }
    }

    /// Texture path of `slot`
    pub fn texture(&self, slot: TextureSlot) -> Option<&Path> {
        self.textures[slot.unit() as usize].as_deref()
    }

    /// Set the texture path of `slot`
    pub fn set_texture(&mut self, slot: TextureSlot, path: impl Into<PathBuf>) {
        self.textures[slot.unit() as usize] = Some(path.into());
    }
}

/// One triangle mesh, 8 floats per vertex (position, normal, UV)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedMesh {
    /// Interleaved vertex data
    pub vertices: Vec<f32>,
    /// Triangle indices
    pub indices: Vec<u32>,
    /// Index into [`ImportedModel::materials`]
    pub material: Option<usize>,
}

/// Node of an imported model's hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedNode {
    /// Node name
    pub name: String,
    /// Position relative to the parent node
    pub position: Vec3,
    /// Rotation relative to the parent node
    pub rotation: Quat,
    /// Scale relative to the parent node
    pub scale: Vec3,
    /// Meshes drawn at this node
    pub meshes: Vec<ImportedMesh>,
    /// Child nodes
    pub children: Vec<ImportedNode>,
}

impl ImportedNode {
    /// Empty node at the identity pose
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Meshes in this node and every descendant
    pub fn mesh_count(&self) -> usize {
        self.meshes.len() + self.children.iter().map(ImportedNode::mesh_count).sum::<usize>()
    }
}

/// Result of importing a model file
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedModel {
    /// Root of the node hierarchy
    pub root: ImportedNode,
    /// Materials referenced by meshes
    pub materials: Vec<ImportedMaterial>,
}

/// Parses model files into [`ImportedModel`]s
pub trait AssetImporter {
    /// Whether this importer handles the file at `path`
    fn supports(&self, path: &Path) -> bool;

    /// Read and parse the model at `path`
    fn import(&self, path: &Path) -> Result<ImportedModel, ImportError>;
}

/// Resolves texture files to GPU-resident handles
pub trait TextureLoader {
    /// Load the texture at `path`, None when it is missing or unreadable
    fn load(&mut self, path: &Path, renderer: &mut dyn RenderBackend) -> Option<TextureHandle>;
}
