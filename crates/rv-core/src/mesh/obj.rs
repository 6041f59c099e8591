//! OBJ (+MTL) parsing

use std::io::Cursor;
use std::path::Path;

use super::normals::flat_shade;
use super::{Material, MeshError, MeshUnit, ParsedMesh, VisualGeometry};

/// Parse an OBJ file, loading its material libraries through `load_material`
///
/// `load_material` receives the library name as written after `mtllib`. A
/// library that cannot be fetched or parsed fails the whole load.
pub fn parse_obj(
    bytes: &[u8],
    unit: MeshUnit,
    load_material: &dyn Fn(&str) -> Result<Vec<u8>, MeshError>,
) -> Result<ParsedMesh, MeshError> {
    let options = tobj::LoadOptions {
        single_index: true,
        triangulate: true,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    };

    let mut reader = Cursor::new(bytes);
    let (models, materials) = tobj::load_obj_buf(&mut reader, &options, |path: &Path| {
        let name = path.to_string_lossy();
        match load_material(&name) {
            Ok(data) => tobj::load_mtl_buf(&mut Cursor::new(data)),
            Err(e) => {
                tracing::debug!("Material library '{}' unavailable: {}", name, e);
                Err(tobj::LoadError::OpenFileFailed)
            }
        }
    })
    .map_err(|e| MeshError::Parse(e.to_string()))?;

    let materials = materials.map_err(|e| MeshError::Material(e.to_string()))?;

    let scale = unit.scale();
    let mut warnings = Vec::new();
    let mut children = Vec::with_capacity(models.len());

    for model in models {
        let mesh = model.mesh;
        if mesh.indices.is_empty() {
            warnings.push(format!("object '{}' has no faces", model.name));
            continue;
        }

        let positions: Vec<[f32; 3]> = mesh
            .positions
            .chunks_exact(3)
            .map(|p| [p[0] * scale, p[1] * scale, p[2] * scale])
            .collect();

        let (positions, normals, indices) = if mesh.normals.len() == mesh.positions.len() {
            let normals = mesh
                .normals
                .chunks_exact(3)
                .map(|n| [n[0], n[1], n[2]])
                .collect();
            (positions, normals, mesh.indices)
        } else {
            flat_shade(&positions, &mesh.indices)
        };

        let material = match mesh.material_id {
            Some(id) => match materials.get(id) {
                Some(m) => Some(convert_material(m)),
                None => {
                    warnings.push(format!(
                        "object '{}' references missing material {}",
                        model.name, id
                    ));
                    None
                }
            },
            None => None,
        };

        children.push(VisualGeometry {
            name: model.name,
            positions,
            normals,
            indices,
            material,
        });
    }

    if children.is_empty() {
        return Err(MeshError::EmptyMesh);
    }

    Ok(ParsedMesh { children, warnings })
}

fn convert_material(material: &tobj::Material) -> Material {
    let [r, g, b] = material.diffuse.unwrap_or([1.0, 1.0, 1.0]);
    let alpha = material.dissolve.unwrap_or(1.0);
    Material::named(material.name.clone(), [r, g, b, alpha])
}
