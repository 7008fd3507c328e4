//! CPU-side geometry: model file parsing and mesh-space utilities.
//!
//! Geometry is loaded and inspected on the CPU as [`RawGeometry`] and uploaded to the GPU
//! later by the renderer. Keeping a CPU copy also lets the picker intersect rays with the
//! actual triangles of a model.
//!
//! # Supported Formats
//!
//! | Format | Extensions | Notes |
//! |--------|------------|-------|
//! | OBJ    | `.obj`     | Triangulated; all objects in the file are merged; materials ignored |
//! | STL    | `.stl`     | Binary and ASCII, no UV coordinates |

use crate::mesh::Vertex3d;
use glam::Vec3;
use std::path::Path;

/// Errors that can occur when loading geometry.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    /// File could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// File format could not be determined from extension.
    #[error("unknown geometry format: '{0}'")]
    UnknownFormat(String),
    /// The geometry data was invalid or corrupt.
    #[error("parse error: {0}")]
    Parse(String),
    /// The file parsed but contained no triangles.
    #[error("geometry contains no triangles")]
    Empty,
}

/// Model file formats understood by [`RawGeometry::from_bytes`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeometryFormat {
    Obj,
    Stl,
}

impl GeometryFormat {
    /// Detect the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, GeometryError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "obj" => Ok(GeometryFormat::Obj),
            "stl" => Ok(GeometryFormat::Stl),
            _ => Err(GeometryError::UnknownFormat(ext)),
        }
    }
}

/// Raw geometry data before GPU upload.
#[derive(Clone, Debug, Default)]
pub struct RawGeometry {
    /// Vertex positions, normals, and UVs.
    pub vertices: Vec<Vertex3d>,
    /// Triangle indices.
    pub indices: Vec<u32>,
}

impl RawGeometry {
    /// Creates raw geometry from vertices and indices.
    pub fn new(vertices: Vec<Vertex3d>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// A flat square on the XZ plane, centered at the origin, normals pointing up (+Y).
    ///
    /// UVs span the full [0, 1] range across the plane; tiling is applied by the material.
    pub fn plane(size: f32) -> Self {
        let half = size * 0.5;
        let vertices = vec![
            Vertex3d::new([-half, 0.0, -half], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex3d::new([-half, 0.0, half], [0.0, 1.0, 0.0], [0.0, 1.0]),
            Vertex3d::new([half, 0.0, half], [0.0, 1.0, 0.0], [1.0, 1.0]),
            Vertex3d::new([half, 0.0, -half], [0.0, 1.0, 0.0], [1.0, 0.0]),
        ];
        // Counter-clockwise when seen from above.
        let indices = vec![0, 1, 2, 2, 3, 0];
        Self::new(vertices, indices)
    }

    /// Parse geometry from an in-memory file.
    pub fn from_bytes(bytes: &[u8], format: GeometryFormat) -> Result<Self, GeometryError> {
        let geometry = match format {
            GeometryFormat::Obj => Self::parse_obj(bytes)?,
            GeometryFormat::Stl => Self::parse_stl(bytes)?,
        };
        if geometry.triangle_count() == 0 {
            return Err(GeometryError::Empty);
        }
        Ok(geometry)
    }

    /// Number of complete triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Iterates triangles as position triples in model space.
    ///
    /// Triangles referencing out-of-range vertices are skipped.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(|tri| {
            let a = self.vertices.get(tri[0] as usize)?;
            let b = self.vertices.get(tri[1] as usize)?;
            let c = self.vertices.get(tri[2] as usize)?;
            Some([
                Vec3::from(a.position),
                Vec3::from(b.position),
                Vec3::from(c.position),
            ])
        })
    }

    /// Computes the axis-aligned bounding box.
    ///
    /// Returns `(min, max)` corners. Empty geometry yields a zero-sized box at the origin.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        if self.vertices.is_empty() {
            return (Vec3::ZERO, Vec3::ZERO);
        }

        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for v in &self.vertices {
            let p = Vec3::from(v.position);
            min = min.min(p);
            max = max.max(p);
        }

        (min, max)
    }

    /// Returns the size of the bounding box.
    pub fn size(&self) -> Vec3 {
        let (min, max) = self.bounds();
        max - min
    }

    /// Recalculates vertex normals from face geometry.
    ///
    /// Smooth normals: the area-weighted average of the face normals around each vertex.
    pub fn recalculate_normals(&mut self) {
        for v in &mut self.vertices {
            v.normal = [0.0, 0.0, 0.0];
        }

        for tri in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if i0.max(i1).max(i2) >= self.vertices.len() {
                continue;
            }

            let p0 = Vec3::from(self.vertices[i0].position);
            let p1 = Vec3::from(self.vertices[i1].position);
            let p2 = Vec3::from(self.vertices[i2].position);

            // Unnormalized cross product: length is twice the face area.
            let face_normal = (p1 - p0).cross(p2 - p0);

            for i in [i0, i1, i2] {
                let n = Vec3::from(self.vertices[i].normal) + face_normal;
                self.vertices[i].normal = n.into();
            }
        }

        for v in &mut self.vertices {
            v.normal = Vec3::from(v.normal).normalize_or_zero().into();
        }
    }

    fn parse_obj(bytes: &[u8]) -> Result<Self, GeometryError> {
        let load_opts = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        };
        let mut reader = std::io::Cursor::new(bytes);
        let (models, _materials) = tobj::load_obj_buf(&mut reader, &load_opts, |_| {
            Ok((Vec::new(), Default::default()))
        })
        .map_err(|e| GeometryError::Parse(format!("OBJ parse error: {e}")))?;

        let mut vertices: Vec<Vertex3d> = Vec::new();
        let mut indices: Vec<u32> = Vec::new();
        let mut missing_normals = false;

        for model in models {
            let mesh = model.mesh;
            let vcount = mesh.positions.len() / 3;
            let has_normals = mesh.normals.len() >= vcount * 3;
            let has_uvs = mesh.texcoords.len() >= vcount * 2;
            missing_normals |= !has_normals;

            let start = vertices.len() as u32;
            for i in 0..vcount {
                let position = [
                    mesh.positions[3 * i],
                    mesh.positions[3 * i + 1],
                    mesh.positions[3 * i + 2],
                ];
                let normal = if has_normals {
                    [
                        mesh.normals[3 * i],
                        mesh.normals[3 * i + 1],
                        mesh.normals[3 * i + 2],
                    ]
                } else {
                    [0.0, 1.0, 0.0]
                };
                // OBJ texture space has v pointing up; wgpu samples with v pointing down.
                let uv = if has_uvs {
                    [mesh.texcoords[2 * i], 1.0 - mesh.texcoords[2 * i + 1]]
                } else {
                    [0.0, 0.0]
                };
                vertices.push(Vertex3d::new(position, normal, uv));
            }

            if mesh.indices.is_empty() {
                indices.extend((0..vcount as u32).map(|i| start + i));
            } else {
                indices.extend(mesh.indices.iter().map(|&i| start + i));
            }
        }

        let mut geometry = RawGeometry::new(vertices, indices);
        if missing_normals {
            geometry.recalculate_normals();
        }
        Ok(geometry)
    }

    fn parse_stl(bytes: &[u8]) -> Result<Self, GeometryError> {
        let mut reader = std::io::Cursor::new(bytes);
        let stl = stl_io::read_stl(&mut reader)
            .map_err(|e| GeometryError::Parse(format!("STL parse error: {e}")))?;

        let mut vertices = Vec::with_capacity(stl.faces.len() * 3);
        let mut indices = Vec::with_capacity(stl.faces.len() * 3);

        // stl_io returns an indexed mesh; expand it so each face keeps its flat normal.
        for face in &stl.faces {
            let normal: [f32; 3] = face.normal.into();
            let base = vertices.len() as u32;
            for &vertex_idx in &face.vertices {
                let Some(vertex) = stl.vertices.get(vertex_idx) else {
                    return Err(GeometryError::Parse(format!(
                        "STL face references missing vertex {vertex_idx}"
                    )));
                };
                let position: [f32; 3] = (*vertex).into();
                vertices.push(Vertex3d::new(position, normal, [0.0, 0.0]));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2]);
        }

        Ok(RawGeometry::new(vertices, indices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_OBJ: &str = "\
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
";

    const TWO_OBJECTS_OBJ: &str = "\
o first
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
o second
v 0 0 1
v 1 0 1
v 1 1 1
v 0 1 1
f 4 5 6 7
";

    #[test]
    fn raw_geometry_bounds() {
        let vertices = vec![
            Vertex3d::new([0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex3d::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex3d::new([-1.0, -1.0, -1.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
        ];
        let geom = RawGeometry::new(vertices, vec![0, 1, 2]);

        let (min, max) = geom.bounds();
        assert_eq!(min, Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(max, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(geom.size(), Vec3::new(2.0, 3.0, 4.0));
    }

    #[test]
    fn empty_geometry_bounds_are_finite() {
        let geom = RawGeometry::default();
        assert_eq!(geom.bounds(), (Vec3::ZERO, Vec3::ZERO));
    }

    #[test]
    fn plane_faces_up_and_spans_size() {
        let plane = RawGeometry::plane(10.0);
        assert_eq!(plane.triangle_count(), 2);
        assert_eq!(plane.size(), Vec3::new(10.0, 0.0, 10.0));
        for [a, b, c] in plane.triangles() {
            let n = (b - a).cross(c - a);
            assert!(n.y > 0.0, "plane triangle winds downward");
        }
    }

    #[test]
    fn obj_without_normals_gets_smooth_normals() {
        let geom = RawGeometry::from_bytes(TRIANGLE_OBJ.as_bytes(), GeometryFormat::Obj).unwrap();
        assert_eq!(geom.triangle_count(), 1);
        for v in &geom.vertices {
            let n = Vec3::from(v.normal);
            assert!((n - Vec3::Z).length() < 1e-5, "normal was {n:?}");
        }
    }

    #[test]
    fn obj_objects_are_merged_and_quads_triangulated() {
        let geom =
            RawGeometry::from_bytes(TWO_OBJECTS_OBJ.as_bytes(), GeometryFormat::Obj).unwrap();
        assert_eq!(geom.triangle_count(), 3);
        assert_eq!(geom.vertices.len(), 7);
        assert!(geom.indices.iter().all(|&i| (i as usize) < geom.vertices.len()));
    }

    #[test]
    fn obj_without_faces_is_empty_error() {
        let err = RawGeometry::from_bytes(b"v 0 0 0\n", GeometryFormat::Obj).unwrap_err();
        assert!(matches!(err, GeometryError::Empty));
    }

    #[test]
    fn format_detection_is_case_insensitive() {
        assert_eq!(
            GeometryFormat::from_path(Path::new("models/cake2.OBJ")).unwrap(),
            GeometryFormat::Obj
        );
        assert!(matches!(
            GeometryFormat::from_path(Path::new("scene.gltf")),
            Err(GeometryError::UnknownFormat(ext)) if ext == "gltf"
        ));
    }
}
