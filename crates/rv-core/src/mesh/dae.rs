//! COLLADA (DAE) parsing

use std::collections::HashMap;
use std::io::Cursor;

use dae_parser::{ArrayElement, Document, Geometry, Primitive, Semantic};

use super::normals::flat_shade;
use super::{Material, MeshError, MeshUnit, ParsedMesh, VisualGeometry};

/// Float source data keyed by source id
struct FloatSource<'a> {
    data: &'a [f32],
    stride: usize,
}

impl FloatSource<'_> {
    fn vec3(&self, index: usize) -> Option<[f32; 3]> {
        let start = index.checked_mul(self.stride)?;
        let v = self.data.get(start..start + 3)?;
        Some([v[0], v[1], v[2]])
    }
}

/// Parse the triangle primitives of every mesh geometry in a COLLADA file
///
/// Each `<triangles>` element becomes one child geometry. Its material is
/// the element's material symbol (neutral gray) or None when the element
/// has no material binding. Other primitive kinds are skipped with a warning.
pub fn parse_dae(bytes: &[u8], unit: MeshUnit) -> Result<ParsedMesh, MeshError> {
    // dae_parser::Error only implements Debug
    let document = Document::from_reader(Cursor::new(bytes))
        .map_err(|e| MeshError::Parse(format!("{e:?}")))?;

    let scale = unit.scale();
    let mut children = Vec::new();
    let mut warnings = Vec::new();

    for geometry in document.iter::<Geometry>() {
        let name = geometry
            .name
            .clone()
            .or_else(|| geometry.id.clone())
            .unwrap_or_else(|| "geometry".to_string());

        let Some(mesh) = geometry.element.as_mesh() else {
            warnings.push(format!("geometry '{name}' is not a mesh"));
            continue;
        };

        let mut sources: HashMap<String, FloatSource<'_>> = HashMap::new();
        for source in &mesh.sources {
            let (Some(id), Some(ArrayElement::Float(array))) = (&source.id, &source.array) else {
                continue;
            };
            sources.insert(
                id.clone(),
                FloatSource {
                    data: &array.val[..],
                    stride: source.accessor.stride.max(1),
                },
            );
        }

        // <vertices> indirection: the VERTEX input points at POSITION (and maybe NORMAL)
        let mut vertex_position: Option<String> = None;
        let mut vertex_normal: Option<String> = None;
        if let Some(vertices) = &mesh.vertices {
            for input in vertices.inputs.iter() {
                match input.semantic {
                    Semantic::Position => vertex_position = Some(fragment(&input.source.to_string())),
                    Semantic::Normal => vertex_normal = Some(fragment(&input.source.to_string())),
                    _ => {}
                }
            }
        }

        for (prim_index, primitive) in mesh.elements.iter().enumerate() {
            let Primitive::Triangles(triangles) = primitive else {
                warnings.push(format!(
                    "geometry '{name}' primitive {prim_index} is not <triangles>, skipped"
                ));
                continue;
            };
            let Some(data) = triangles.data.as_deref() else {
                continue;
            };

            let mut stride = 1usize;
            let mut position_input: Option<(usize, String)> = None;
            let mut normal_input: Option<(usize, String)> = None;
            for input in triangles.inputs.inputs.iter() {
                let offset = input.offset as usize;
                stride = stride.max(offset + 1);
                match input.input.semantic {
                    Semantic::Vertex => {
                        if let Some(pos) = &vertex_position {
                            position_input = Some((offset, pos.clone()));
                        }
                        if let Some(norm) = &vertex_normal
                            && normal_input.is_none()
                        {
                            normal_input = Some((offset, norm.clone()));
                        }
                    }
                    Semantic::Position => {
                        position_input = Some((offset, fragment(&input.input.source.to_string())));
                    }
                    Semantic::Normal => {
                        normal_input = Some((offset, fragment(&input.input.source.to_string())));
                    }
                    _ => {}
                }
            }

            let Some((position_offset, position_id)) = position_input else {
                warnings.push(format!("geometry '{name}' triangles have no positions"));
                continue;
            };
            let Some(position_source) = sources.get(&position_id) else {
                warnings.push(format!("geometry '{name}' missing source '{position_id}'"));
                continue;
            };
            let normal_source = normal_input
                .as_ref()
                .and_then(|(offset, id)| sources.get(id).map(|s| (*offset, s)));

            let mut positions = Vec::new();
            let mut normals = Vec::new();
            let mut skipped = 0usize;
            // A trailing partial triangle is ignored by chunks_exact
            for triangle in data.chunks_exact(stride * 3) {
                let corners: Option<Vec<[f32; 3]>> = triangle
                    .chunks_exact(stride)
                    .map(|vertex| position_source.vec3(vertex[position_offset] as usize))
                    .collect();
                let Some(corners) = corners else {
                    skipped += 1;
                    continue;
                };
                for (vertex, p) in triangle.chunks_exact(stride).zip(corners) {
                    positions.push([p[0] * scale, p[1] * scale, p[2] * scale]);
                    if let Some((offset, source)) = normal_source {
                        normals.push(source.vec3(vertex[offset] as usize).unwrap_or([0.0, 0.0, 1.0]));
                    }
                }
            }
            if skipped > 0 {
                warnings.push(format!(
                    "geometry '{name}' has {skipped} triangles with out-of-range indices"
                ));
            }

            let (positions, normals, indices) = if normals.len() == positions.len() {
                let indices = (0..positions.len() as u32).collect();
                (positions, normals, indices)
            } else {
                let indices: Vec<u32> = (0..positions.len() as u32).collect();
                flat_shade(&positions, &indices)
            };

            if positions.is_empty() {
                continue;
            }

            children.push(VisualGeometry {
                name: name.clone(),
                positions,
                normals,
                indices,
                material: triangles
                    .material
                    .as_ref()
                    .map(|symbol| Material::named(symbol.clone(), [0.7, 0.7, 0.7, 1.0])),
            });
        }
    }

    if children.is_empty() {
        return Err(MeshError::EmptyMesh);
    }

    Ok(ParsedMesh { children, warnings })
}

/// Strip the leading `#` of a local URL reference
fn fragment(url: &str) -> String {
    url.strip_prefix('#').unwrap_or(url).to_string()
}

/// Minimal COLLADA document with one four-vertex geometry named `part`
///
/// `triangles` is spliced into the `<mesh>` after the `<vertices>` element.
#[cfg(test)]
pub(crate) fn sample_document(triangles: &str) -> String {
    format!(
        r##"<?xml version="1.0" encoding="utf-8"?>
<COLLADA xmlns="http://www.collada.org/2005/11/COLLADASchema" version="1.4.1">
  <asset>
    <created>2024-01-01T00:00:00</created>
    <modified>2024-01-01T00:00:00</modified>
  </asset>
  <library_geometries>
    <geometry id="part-mesh" name="part">
      <mesh>
        <source id="part-positions">
          <float_array id="part-positions-array" count="12">0 0 0 1 0 0 0 1 0 1 1 0</float_array>
          <technique_common>
            <accessor source="#part-positions-array" count="4" stride="3">
              <param name="X" type="float"/>
              <param name="Y" type="float"/>
              <param name="Z" type="float"/>
            </accessor>
          </technique_common>
        </source>
        <vertices id="part-vertices">
          <input semantic="POSITION" source="#part-positions"/>
        </vertices>
        {triangles}
      </mesh>
    </geometry>
  </library_geometries>
</COLLADA>
"##
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment() {
        assert_eq!(fragment("#Cube-mesh-positions"), "Cube-mesh-positions");
        assert_eq!(fragment("plain"), "plain");
    }

    #[test]
    fn test_parse_invalid_document() {
        assert!(parse_dae(b"<not-collada/>", MeshUnit::Meters).is_err());
    }

    fn triangles(material: Option<&str>, count: usize, indices: &str) -> String {
        let material = material
            .map(|m| format!(r#" material="{m}""#))
            .unwrap_or_default();
        format!(
            r##"<triangles{material} count="{count}">
          <input semantic="VERTEX" source="#part-vertices" offset="0"/>
          <p>{indices}</p>
        </triangles>"##
        )
    }

    #[test]
    fn test_parse_triangles_per_element() {
        let body = format!(
            "{}\n{}",
            triangles(Some("Red"), 2, "0 1 2 1 3 2"),
            triangles(None, 1, "0 1 3")
        );
        let parsed = parse_dae(sample_document(&body).as_bytes(), MeshUnit::Meters).unwrap();

        assert_eq!(parsed.children.len(), 2);
        let first = &parsed.children[0];
        assert_eq!(first.name, "part");
        assert_eq!(first.positions.len(), 6);
        assert_eq!(first.indices.len() / 3, 2);
        assert_eq!(first.normals.len(), first.positions.len());
        assert_eq!(first.material.as_ref().and_then(|m| m.name.as_deref()), Some("Red"));

        let second = &parsed.children[1];
        assert_eq!(second.indices.len() / 3, 1);
        assert!(second.material.is_none());
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn test_out_of_range_index_skips_whole_triangle() {
        let body = triangles(None, 2, "0 1 9 0 1 2");
        let parsed = parse_dae(sample_document(&body).as_bytes(), MeshUnit::Meters).unwrap();

        let child = &parsed.children[0];
        assert_eq!(
            child.positions,
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
        );
        assert_eq!(child.indices, vec![0, 1, 2]);
        assert_eq!(parsed.warnings.len(), 1);
        assert!(parsed.warnings[0].contains("1 triangles"));
    }

    #[test]
    fn test_unit_scale_applies_to_positions() {
        let body = triangles(None, 1, "0 1 3");
        let parsed =
            parse_dae(sample_document(&body).as_bytes(), MeshUnit::Millimeters).unwrap();
        assert_eq!(parsed.children[0].positions[1], [0.001, 0.0, 0.0]);
    }
}
