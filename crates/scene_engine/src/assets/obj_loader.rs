//! OBJ file importer for 3D models
//!
//! Each `o`/`g` statement starts a child node of the model root; each
//! `usemtl` inside a node starts a new mesh. Polygons are fan
//! triangulated. Materials come from `mtllib` files next to the model; a
//! missing or malformed library only loses its materials.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::assets::{AssetImporter, ImportError, ImportedMaterial, ImportedMesh, ImportedModel, ImportedNode, MtlParser};

/// Normal used when neither the file nor the face provides one
const DEFAULT_NORMAL: [f32; 3] = [0.0, 1.0, 0.0];

/// Built-in Wavefront OBJ importer
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjImporter;

type CornerKey = (usize, Option<usize>, Option<usize>);

/// Mesh under construction, deduplicating face corners
#[derive(Default)]
struct MeshBuilder {
    mesh: ImportedMesh,
    corners: HashMap<CornerKey, u32>,
}

impl MeshBuilder {
    fn with_material(material: Option<usize>) -> Self {
        Self {
            mesh: ImportedMesh {
                material,
                ..Default::default()
            },
            corners: HashMap::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.mesh.indices.is_empty()
    }

    fn corner(&mut self, key: CornerKey, position: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2]) -> u32 {
        if let Some(&index) = self.corners.get(&key) {
            return index;
        }
        let index = (self.mesh.vertices.len() / 8) as u32;
        self.mesh.vertices.extend_from_slice(&position);
        self.mesh.vertices.extend_from_slice(&normal);
        self.mesh.vertices.extend_from_slice(&tex_coord);
        self.corners.insert(key, index);
        index
    }
}

/// Node under construction
struct NodeBuilder {
    name: String,
    meshes: Vec<ImportedMesh>,
    current: MeshBuilder,
}

impl NodeBuilder {
    fn new(name: impl Into<String>, material: Option<usize>) -> Self {
        Self {
            name: name.into(),
            meshes: Vec::new(),
            current: MeshBuilder::with_material(material),
        }
    }

    fn switch_material(&mut self, material: Option<usize>) {
        if self.current.mesh.material == material {
            return;
        }
        let finished = std::mem::replace(&mut self.current, MeshBuilder::with_material(material));
        if !finished.is_empty() {
            self.meshes.push(finished.mesh);
        }
    }

    fn finish(mut self) -> ImportedNode {
        if !self.current.is_empty() {
            self.meshes.push(self.current.mesh);
        }
        let mut node = ImportedNode::new(self.name);
        node.meshes = self.meshes;
        node
    }
}

impl ObjImporter {
    /// Create a new importer
    pub fn new() -> Self {
        Self
    }

    /// Parse OBJ text; `base_dir` locates `mtllib` files
    pub fn parse(contents: &str, name: &str, base_dir: &Path) -> Result<ImportedModel, ImportError> {
        let mut positions: Vec<[f32; 3]> = Vec::new();
        let mut normals: Vec<[f32; 3]> = Vec::new();
        let mut tex_coords: Vec<[f32; 2]> = Vec::new();

        let mut materials: Vec<ImportedMaterial> = Vec::new();
        let mut current_material: Option<usize> = None;

        let mut root = NodeBuilder::new(name, None);
        let mut objects: Vec<NodeBuilder> = Vec::new();

        for (line_index, line) in contents.lines().enumerate() {
            let line_num = line_index + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts[0] {
                "v" => positions.push(Self::parse_floats::<3>(&parts, line_num, "vertex")?),
                "vn" => normals.push(Self::parse_floats::<3>(&parts, line_num, "normal")?),
                "vt" => tex_coords.push(Self::parse_floats::<2>(&parts, line_num, "tex coord")?),
                "o" | "g" => {
                    let object_name = if parts.len() > 1 { parts[1..].join(" ") } else { format!("{}_{}", name, objects.len()) };
                    objects.push(NodeBuilder::new(object_name, current_material));
                }
                "mtllib" => {
                    for library in &parts[1..] {
                        materials.extend(Self::load_library(&base_dir.join(library)));
                    }
                }
                "usemtl" => {
                    let material_name = parts[1..].join(" ");
                    current_material = materials.iter().position(|material| material.name == material_name);
                    if current_material.is_none() {
                        log::warn!("Line {}: unknown material '{}'", line_num, material_name);
                    }
                    let node = objects.last_mut().unwrap_or(&mut root);
                    node.switch_material(current_material);
                }
                "f" => {
                    if parts.len() < 4 {
                        return Err(Self::error(line_num, "face needs at least 3 vertices"));
                    }
                    let node = objects.last_mut().unwrap_or(&mut root);
                    Self::parse_face(&parts[1..], line_num, &positions, &normals, &tex_coords, &mut node.current)?;
                }
                _ => {
                    // Ignore other commands
                }
            }
        }

        let mut model_root = root.finish();
        model_root.children = objects
            .into_iter()
            .map(NodeBuilder::finish)
            .filter(|node| !node.meshes.is_empty())
            .collect();

        if model_root.mesh_count() == 0 {
            return Err(ImportError::Empty(base_dir.join(name)));
        }

        log::debug!(
            "Parsed OBJ '{}': {} positions, {} meshes, {} materials",
            name,
            positions.len(),
            model_root.mesh_count(),
            materials.len()
        );

        Ok(ImportedModel {
            root: model_root,
            materials,
        })
    }

    fn error(line: usize, message: impl Into<String>) -> ImportError {
        ImportError::Parse {
            line,
            message: message.into(),
        }
    }

    fn parse_floats<const N: usize>(parts: &[&str], line_num: usize, what: &str) -> Result<[f32; N], ImportError> {
        let mut values = [0.0; N];
        for (i, value) in values.iter_mut().enumerate() {
            let token = parts
                .get(i + 1)
                .ok_or_else(|| Self::error(line_num, format!("{what} needs {N} components")))?;
            *value = token
                .parse()
                .map_err(|_| Self::error(line_num, format!("Invalid {what} component '{token}'")))?;
        }
        Ok(values)
    }

    /// Resolve a 1-based (or negative, relative) OBJ index
    fn resolve_index(token: &str, len: usize, line_num: usize) -> Result<usize, ImportError> {
        let index: i64 = token
            .parse()
            .map_err(|_| Self::error(line_num, format!("Invalid index '{token}'")))?;
        let resolved = if index < 0 { len as i64 + index } else { index - 1 };
        if resolved < 0 || resolved as usize >= len {
            return Err(Self::error(line_num, format!("Index {index} out of bounds")));
        }
        Ok(resolved as usize)
    }

    fn parse_face(
        corners: &[&str],
        line_num: usize,
        positions: &[[f32; 3]],
        normals: &[[f32; 3]],
        tex_coords: &[[f32; 2]],
        mesh: &mut MeshBuilder,
    ) -> Result<(), ImportError> {
        let mut keys = Vec::with_capacity(corners.len());
        for corner in corners {
            let mut fields = corner.split('/');
            let position = Self::resolve_index(fields.next().unwrap_or_default(), positions.len(), line_num)?;
            let tex = match fields.next() {
                Some(token) if !token.is_empty() => Some(Self::resolve_index(token, tex_coords.len(), line_num)?),
                _ => None,
            };
            let normal = match fields.next() {
                Some(token) if !token.is_empty() => Some(Self::resolve_index(token, normals.len(), line_num)?),
                _ => None,
            };
            keys.push((position, tex, normal));
        }

        let face_normal = Self::face_normal(positions[keys[0].0], positions[keys[1].0], positions[keys[2].0]);

        let mut face_indices = Vec::with_capacity(keys.len());
        for key in keys {
            let (position, tex, normal) = key;
            let normal = normal.map_or(face_normal, |index| normals[index]);
            let tex_coord = tex.map_or([0.0, 0.0], |index| tex_coords[index]);
            face_indices.push(mesh.corner(key, positions[position], normal, tex_coord));
        }

        // Triangulate face (simple fan triangulation)
        for i in 1..(face_indices.len() - 1) {
            mesh.mesh
                .indices
                .extend_from_slice(&[face_indices[0], face_indices[i], face_indices[i + 1]]);
        }
        Ok(())
    }

    fn face_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
        let e1 = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        let e2 = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
        let n = [
            e1[1] * e2[2] - e1[2] * e2[1],
            e1[2] * e2[0] - e1[0] * e2[2],
            e1[0] * e2[1] - e1[1] * e2[0],
        ];
        let length = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        if length <= f32::EPSILON {
            return DEFAULT_NORMAL;
        }
        [n[0] / length, n[1] / length, n[2] / length]
    }

    fn load_library(path: &Path) -> Vec<ImportedMaterial> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                log::warn!("Cannot read material library {:?}: {}", path, e);
                return Vec::new();
            }
        };
        MtlParser::parse(&contents).unwrap_or_else(|e| {
            log::warn!("Material library {:?} ignored: {}", path, e);
            Vec::new()
        })
    }
}

impl AssetImporter for ObjImporter {
    fn supports(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| extension.eq_ignore_ascii_case("obj"))
    }

    fn import(&self, path: &Path) -> Result<ImportedModel, ImportError> {
        if !self.supports(path) {
            return Err(ImportError::UnsupportedFormat(path.display().to_string()));
        }
        let contents = fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("model");
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        Self::parse(&contents, name, base_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const QUAD: &str = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn test_quad_is_fan_triangulated() {
        let model = ObjImporter::parse(QUAD, "quad", Path::new("")).unwrap();
        let mesh = &model.root.meshes[0];

        assert_eq!(mesh.vertices.len(), 4 * 8);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(&mesh.vertices[8..16], &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0]);
        assert_eq!(model.root.name, "quad");
    }

    #[test]
    fn test_missing_normals_use_face_normal() {
        let contents = "v 0 0 0\nv 1 0 0\nv 0 0 -1\nf 1 2 3\n";
        let model = ObjImporter::parse(contents, "tri", Path::new("")).unwrap();
        let vertices = &model.root.meshes[0].vertices;
        assert_relative_eq!(vertices[3], 0.0);
        assert_relative_eq!(vertices[4], 1.0);
        assert_relative_eq!(vertices[5], 0.0);
    }

    #[test]
    fn test_objects_become_child_nodes() {
        let contents = "\
v 0 0 0
v 1 0 0
v 0 1 0
o first
f 1 2 3
o empty
o second
f -3 -2 -1
";
        let model = ObjImporter::parse(contents, "scene", Path::new("")).unwrap();
        assert!(model.root.meshes.is_empty());
        let names: Vec<_> = model.root.children.iter().map(|node| node.name.as_str()).collect();
        assert_eq!(names, ["first", "second"]);
        assert_eq!(model.root.mesh_count(), 2);
    }

    #[test]
    fn test_usemtl_splits_meshes() {
        let dir = std::env::temp_dir().join(format!("scene_engine_obj_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("two.mtl"), "newmtl red\nKd 1 0 0\nnewmtl blue\nKd 0 0 1\n").unwrap();

        let contents = "\
mtllib two.mtl
v 0 0 0
v 1 0 0
v 0 1 0
usemtl red
f 1 2 3
usemtl blue
f 1 3 2
";
        let model = ObjImporter::parse(contents, "two", &dir).unwrap();
        assert_eq!(model.materials.len(), 2);
        assert_eq!(model.root.meshes.len(), 2);
        assert_eq!(model.root.meshes[0].material, Some(0));
        assert_eq!(model.root.meshes[1].material, Some(1));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            ObjImporter::parse("v 0 0 0\nf 1 2 3\n", "bad", Path::new("")),
            Err(ImportError::Parse { line: 2, .. })
        ));
        assert!(matches!(
            ObjImporter::parse("v 0 0 0\n", "empty", Path::new("")),
            Err(ImportError::Empty(_))
        ));
        assert!(matches!(
            ObjImporter.import(Path::new("model.fbx")),
            Err(ImportError::UnsupportedFormat(_))
        ));
    }
}
