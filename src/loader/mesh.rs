//! Meshes and point clouds.
//!
//! Every format produces the same layout: a `mesh` mapping (vertices, faces
//! and optional normals) when faces are present, otherwise a `point_cloud`
//! mapping (points and optional colors/normals). Polygons are fan-triangulated.

use super::{decode_error, describe_array, Decoded};
use crate::data::{ArrayData, Fields, Metadata, NdArray, Value};
use crate::error::{DeepviewError, Result};
use crate::util::limits::LoaderConfig;
use ndarray::Array2;
use std::path::Path;

/// Geometry gathered by a parser.
#[derive(Debug, Default)]
struct Geometry {
    vertices: Vec<[f64; 3]>,
    faces: Vec<[i64; 3]>,
    normals: Vec<[f64; 3]>,
    colors: Vec<[f64; 3]>,
}

impl Geometry {
    fn add_polygon(&mut self, indices: &[i64]) {
        if let Some((&first, rest)) = indices.split_first() {
            for pair in rest.windows(2) {
                self.faces.push([first, pair[0], pair[1]]);
            }
        }
    }

    fn check_indices(&self) -> std::result::Result<(), String> {
        let n = self.vertices.len() as i64;
        match self.faces.iter().flatten().find(|&&i| i < 0 || i >= n) {
            Some(bad) => Err(format!("face index {} out of range for {} vertices", bad, n)),
            None => Ok(()),
        }
    }

    fn into_decoded(self, format: &str) -> Decoded {
        let mut metadata = Metadata::new().with("type", "3d_data").with("format", format);
        let mut parts = Fields::new();

        let key = if self.faces.is_empty() {
            metadata.insert("points_count", self.vertices.len());
            parts.insert("points".into(), Value::Array(float_rows(&self.vertices)));
            "point_cloud"
        } else {
            metadata.insert("vertices_count", self.vertices.len());
            metadata.insert("faces_count", self.faces.len());
            let vertices = float_rows(&self.vertices);
            describe_array(&mut metadata, &vertices);
            parts.insert("vertices".into(), Value::Array(vertices));
            parts.insert("faces".into(), Value::Array(int_rows(&self.faces)));
            "mesh"
        };
        if !self.normals.is_empty() {
            parts.insert("normals".into(), Value::Array(float_rows(&self.normals)));
        }
        if !self.colors.is_empty() {
            parts.insert("colors".into(), Value::Array(float_rows(&self.colors)));
        }

        let mut root = Fields::new();
        root.insert(key.to_string(), Value::map(parts));
        Decoded::new(Value::map(root), metadata)
    }
}

fn float_rows(rows: &[[f64; 3]]) -> NdArray {
    NdArray::from_data(ArrayData::Float(Array2::from(rows.to_vec()).into_dyn()))
}

fn int_rows(rows: &[[i64; 3]]) -> NdArray {
    NdArray::from_data(ArrayData::Int(Array2::from(rows.to_vec()).into_dyn()))
}

fn finish(path: &Path, geometry: Geometry, format: &str) -> Result<Decoded> {
    geometry
        .check_indices()
        .map_err(|e| DeepviewError::decode(path, e))?;
    tracing::debug!(
        "{}: {} vertices, {} faces",
        path.display(),
        geometry.vertices.len(),
        geometry.faces.len()
    );
    Ok(geometry.into_decoded(format))
}

#[cfg(feature = "mesh")]
pub(super) fn load_obj(path: &Path, _config: &LoaderConfig) -> Result<Decoded> {
    let options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    };
    let (models, _materials) = tobj::load_obj(path, &options).map_err(decode_error(path))?;

    let mut geometry = Geometry::default();
    for model in models {
        let mesh = model.mesh;
        let offset = geometry.vertices.len() as i64;
        geometry.vertices.extend(
            mesh.positions
                .chunks_exact(3)
                .map(|p| [p[0] as f64, p[1] as f64, p[2] as f64]),
        );
        geometry.normals.extend(
            mesh.normals
                .chunks_exact(3)
                .map(|n| [n[0] as f64, n[1] as f64, n[2] as f64]),
        );
        geometry.faces.extend(
            mesh.indices
                .chunks_exact(3)
                .map(|f| [f[0] as i64 + offset, f[1] as i64 + offset, f[2] as i64 + offset]),
        );
    }
    if geometry.normals.len() != geometry.vertices.len() {
        geometry.normals.clear();
    }
    finish(path, geometry, "obj")
}

#[cfg(feature = "mesh")]
pub(super) fn load_stl(path: &Path, _config: &LoaderConfig) -> Result<Decoded> {
    let mut file = std::fs::File::open(path).map_err(decode_error(path))?;
    let mesh = stl_io::read_stl(&mut file).map_err(decode_error(path))?;

    let mut geometry = Geometry::default();
    geometry.vertices = mesh
        .vertices
        .iter()
        .map(|v| [v[0] as f64, v[1] as f64, v[2] as f64])
        .collect();
    geometry.faces = mesh
        .faces
        .iter()
        .map(|f| [f.vertices[0] as i64, f.vertices[1] as i64, f.vertices[2] as i64])
        .collect();
    finish(path, geometry, "stl")
}

pub(super) fn load_ply(path: &Path, _config: &LoaderConfig) -> Result<Decoded> {
    let text = read_text(path)?;
    let geometry = parse_ply(&text).map_err(|e| DeepviewError::decode(path, e))?;
    finish(path, geometry, "ply")
}

pub(super) fn load_off(path: &Path, _config: &LoaderConfig) -> Result<Decoded> {
    let text = read_text(path)?;
    let geometry = parse_off(&text).map_err(|e| DeepviewError::decode(path, e))?;
    finish(path, geometry, "off")
}

pub(super) fn load_xyz(path: &Path, _config: &LoaderConfig) -> Result<Decoded> {
    let text = read_text(path)?;
    let geometry = parse_xyz(&text).map_err(|e| DeepviewError::decode(path, e))?;
    finish(path, geometry, "xyz")
}

fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(decode_error(path))?;
    String::from_utf8(bytes).map_err(|_| {
        DeepviewError::decode(path, "binary encoding is not supported; expected ASCII text")
    })
}

fn numbers<T: std::str::FromStr>(line: &str) -> std::result::Result<Vec<T>, String> {
    line.split_whitespace()
        .map(|token| {
            token
                .parse()
                .map_err(|_| format!("invalid number '{}'", token))
        })
        .collect()
}

/// Data lines, skipping blanks and `#` comments.
fn content_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
}

fn parse_ply(text: &str) -> std::result::Result<Geometry, String> {
    let mut lines = text.lines().map(str::trim);
    if lines.next() != Some("ply") {
        return Err("missing 'ply' magic".into());
    }

    let mut vertex_count = 0usize;
    let mut face_count = 0usize;
    let mut vertex_props: Vec<String> = Vec::new();
    let mut current = "";
    for line in lines.by_ref() {
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            ["format", kind, ..] if *kind != "ascii" => {
                return Err(format!("{} PLY is not supported", kind));
            },
            ["element", "vertex", n] => {
                vertex_count = n.parse().map_err(|_| "bad vertex count")?;
                current = "vertex";
            },
            ["element", "face", n] => {
                face_count = n.parse().map_err(|_| "bad face count")?;
                current = "face";
            },
            ["element", ..] => current = "other",
            ["property", .., name] if current == "vertex" => vertex_props.push(name.to_string()),
            ["end_header"] => break,
            _ => {},
        }
    }

    let position = |name: &str| vertex_props.iter().position(|p| p == name);
    let xyz = [position("x"), position("y"), position("z")];
    let normal = [position("nx"), position("ny"), position("nz")];
    let color = [position("red"), position("green"), position("blue")];

    let mut geometry = Geometry::default();
    let mut body = lines.filter(|line| !line.is_empty());
    for _ in 0..vertex_count {
        let line = body.next().ok_or("file ends inside the vertex list")?;
        let values: Vec<f64> = numbers(line)?;
        let pick = |slots: [Option<usize>; 3]| -> Option<[f64; 3]> {
            Some([
                *values.get(slots[0]?)?,
                *values.get(slots[1]?)?,
                *values.get(slots[2]?)?,
            ])
        };
        geometry
            .vertices
            .push(pick(xyz).ok_or("vertex is missing x/y/z")?);
        if let Some(n) = pick(normal) {
            geometry.normals.push(n);
        }
        if let Some(c) = pick(color) {
            geometry.colors.push(c);
        }
    }
    for _ in 0..face_count {
        let line = body.next().ok_or("file ends inside the face list")?;
        let values: Vec<i64> = numbers(line)?;
        let (count, rest) = values.split_first().ok_or("empty face")?;
        let indices = rest.get(..*count as usize).ok_or("short face record")?;
        geometry.add_polygon(indices);
    }
    Ok(geometry)
}

fn parse_off(text: &str) -> std::result::Result<Geometry, String> {
    let mut lines = content_lines(text);
    let first = lines.next().ok_or("empty file")?;
    let counts_line = match first.strip_prefix("OFF") {
        Some(rest) if rest.trim().is_empty() => lines.next().ok_or("missing counts")?,
        Some(rest) => rest.trim(),
        None => return Err("missing 'OFF' header".into()),
    };
    let counts: Vec<usize> = numbers(counts_line)?;
    let (vertex_count, face_count) = match counts.as_slice() {
        [v, f, ..] => (*v, *f),
        _ => return Err("bad counts line".into()),
    };

    let mut geometry = Geometry::default();
    for _ in 0..vertex_count {
        let values: Vec<f64> = numbers(lines.next().ok_or("file ends inside the vertex list")?)?;
        match values.as_slice() {
            [x, y, z, ..] => geometry.vertices.push([*x, *y, *z]),
            _ => return Err("vertex needs three coordinates".into()),
        }
    }
    for _ in 0..face_count {
        let line = lines.next().ok_or("file ends inside the face list")?;
        let values: Vec<i64> = line
            .split_whitespace()
            .map_while(|t| t.parse().ok())
            .collect();
        let (count, rest) = values.split_first().ok_or("empty face")?;
        let indices = rest.get(..*count as usize).ok_or("short face record")?;
        geometry.add_polygon(indices);
    }
    Ok(geometry)
}

fn parse_xyz(text: &str) -> std::result::Result<Geometry, String> {
    let mut geometry = Geometry::default();
    for line in content_lines(text) {
        let values: Vec<f64> = numbers(line)?;
        match values.as_slice() {
            [x, y, z] => geometry.vertices.push([*x, *y, *z]),
            [x, y, z, nx, ny, nz, ..] => {
                geometry.vertices.push([*x, *y, *z]);
                geometry.normals.push([*nx, *ny, *nz]);
            },
            [x, y, z, ..] => geometry.vertices.push([*x, *y, *z]),
            _ => return Err(format!("expected 'x y z', got '{}'", line)),
        }
    }
    if geometry.normals.len() != geometry.vertices.len() {
        geometry.normals.clear();
    }
    Ok(geometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{classify, resolve, Path as DataPath, ShapeKind};

    const CUBE_FACE_OFF: &str = "OFF\n# square\n4 1 0\n0 0 0\n1 0 0\n1 1 0\n0 1 0\n4 0 1 2 3\n";

    #[test]
    fn off_quad_is_fan_triangulated() {
        let geometry = parse_off(CUBE_FACE_OFF).unwrap();
        assert_eq!(geometry.vertices.len(), 4);
        assert_eq!(geometry.faces, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn off_file_decodes_to_mesh_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quad.off");
        std::fs::write(&path, CUBE_FACE_OFF).unwrap();

        let decoded = load_off(&path, &LoaderConfig::default()).unwrap();
        assert_mesh(&decoded, 4, 2);
        assert_eq!(decoded.metadata.get("type").unwrap().to_string(), "3d_data");
    }

    #[test]
    fn ascii_ply_point_cloud_with_colors() {
        let text = "ply\nformat ascii 1.0\nelement vertex 2\nproperty float x\nproperty float y\n\
                    property float z\nproperty uchar red\nproperty uchar green\nproperty uchar blue\n\
                    end_header\n0 0 0 255 0 0\n1 2 3 0 255 0\n";
        let geometry = parse_ply(text).unwrap();
        assert_eq!(geometry.vertices[1], [1.0, 2.0, 3.0]);
        assert_eq!(geometry.colors[0], [255.0, 0.0, 0.0]);
        assert!(geometry.faces.is_empty());

        let decoded = geometry.into_decoded("ply");
        assert!(decoded.value.as_map().unwrap().contains_key("point_cloud"));
        assert_eq!(decoded.metadata.get("points_count").unwrap().to_string(), "2");
    }

    #[test]
    fn binary_ply_is_rejected() {
        let err = parse_ply("ply\nformat binary_little_endian 1.0\nend_header\n").unwrap_err();
        assert!(err.contains("binary_little_endian"));
    }

    #[test]
    fn xyz_points() {
        let geometry = parse_xyz("1 2 3\n4 5 6\n").unwrap();
        assert_eq!(geometry.vertices.len(), 2);
        assert!(parse_xyz("1 2\n").is_err());
    }

    fn assert_mesh(decoded: &Decoded, vertices: usize, faces: usize) {
        let faces_path = "mesh.faces".parse::<DataPath>().unwrap();
        let vertices_path = "mesh.vertices".parse::<DataPath>().unwrap();
        let face_rows = resolve(&decoded.value, &faces_path, 8).unwrap();
        let vertex_rows = resolve(&decoded.value, &vertices_path, 8).unwrap();
        assert_eq!(classify(&vertex_rows), ShapeKind::NDArray);
        assert_eq!(vertex_rows.as_array().unwrap().shape(), &[vertices, 3]);
        assert_eq!(face_rows.as_array().unwrap().shape(), &[faces, 3]);
        assert_eq!(
            decoded.metadata.get("vertices_count").unwrap().to_string(),
            vertices.to_string()
        );
        assert_eq!(decoded.metadata.get("faces_count").unwrap().to_string(), faces.to_string());
    }

    #[cfg(feature = "mesh")]
    #[test]
    fn obj_quad_decodes_to_mesh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quad.obj");
        std::fs::write(&path, "o quad\nv 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n").unwrap();

        let decoded = load_obj(&path, &LoaderConfig::default()).unwrap();
        assert_mesh(&decoded, 4, 2);
        assert_eq!(decoded.metadata.get("format").unwrap().to_string(), "obj");
    }

    #[cfg(feature = "mesh")]
    #[test]
    fn ascii_stl_triangle_decodes_to_mesh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tri.stl");
        let text = "solid tri\n\
                    facet normal 0 0 1\n\
                    outer loop\n\
                    vertex 0 0 0\n\
                    vertex 1 0 0\n\
                    vertex 0 1 0\n\
                    endloop\n\
                    endfacet\n\
                    endsolid tri\n";
        std::fs::write(&path, text).unwrap();

        let decoded = load_stl(&path, &LoaderConfig::default()).unwrap();
        assert_mesh(&decoded, 3, 1);
        assert_eq!(decoded.metadata.get("type").unwrap().to_string(), "3d_data");
    }

    #[test]
    fn out_of_range_face_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.off");
        std::fs::write(&path, "OFF\n1 1 0\n0 0 0\n3 0 1 2\n").unwrap();
        let err = load_off(&path, &LoaderConfig::default()).unwrap_err();
        assert_eq!(err.category(), "DecodeError");
    }
}
