//! STL parsing

use std::io::Cursor;

use super::normals::calculate_triangle_normal;
use super::{MeshError, MeshUnit, ParsedMesh, VisualGeometry};

/// Parse an ASCII or binary STL file into one flat shaded geometry
///
/// Face normals are recomputed from the vertices; the normals stored in the
/// file are often zero or stale.
pub fn parse_stl(bytes: &[u8], name: &str, unit: MeshUnit) -> Result<ParsedMesh, MeshError> {
    let mut reader = Cursor::new(bytes);
    let mesh = stl_io::read_stl(&mut reader).map_err(|e| MeshError::Parse(e.to_string()))?;

    if mesh.faces.is_empty() {
        return Err(MeshError::EmptyMesh);
    }

    let scale = unit.scale();
    let mut positions = Vec::with_capacity(mesh.faces.len() * 3);
    let mut normals = Vec::with_capacity(mesh.faces.len() * 3);
    let mut warnings = Vec::new();

    for (face_index, face) in mesh.faces.iter().enumerate() {
        let mut corners = [[0.0f32; 3]; 3];
        let mut valid = true;
        for (corner, &vertex_idx) in corners.iter_mut().zip(&face.vertices) {
            match mesh.vertices.get(vertex_idx) {
                Some(vertex) => {
                    *corner = [vertex[0] * scale, vertex[1] * scale, vertex[2] * scale];
                }
                None => valid = false,
            }
        }
        if !valid {
            warnings.push(format!("face {face_index} references a missing vertex"));
            continue;
        }

        let normal = calculate_triangle_normal(corners[0], corners[1], corners[2]);
        for corner in corners {
            positions.push(corner);
            normals.push(normal);
        }
    }

    let indices = (0..positions.len() as u32).collect();
    Ok(ParsedMesh {
        children: vec![VisualGeometry {
            name: name.to_string(),
            positions,
            normals,
            indices,
            material: None,
        }],
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = "solid tri
facet normal 0 0 0
  outer loop
    vertex 0 0 0
    vertex 1000 0 0
    vertex 0 1000 0
  endloop
endfacet
endsolid tri
";

    #[test]
    fn test_parse_ascii_stl_with_unit() {
        let parsed = parse_stl(TRIANGLE.as_bytes(), "tri", MeshUnit::Millimeters).unwrap();
        assert_eq!(parsed.children.len(), 1);

        let geom = &parsed.children[0];
        assert_eq!(geom.name, "tri");
        assert_eq!(geom.triangle_count(), 1);
        assert_eq!(geom.positions[1], [1.0, 0.0, 0.0]);
        assert_eq!(geom.normals[0], [0.0, 0.0, 1.0]);
        assert!(geom.material.is_none());
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(parse_stl(b"definitely not an stl", "x", MeshUnit::Meters).is_err());
    }
}
