//! Mesh container and its child geometries

/// Surface material of a loaded geometry
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: Option<String>,
    /// RGBA, 0.0 - 1.0
    pub color: [f32; 4],
}

impl Material {
    /// Color used for STL meshes without an override material (0x999999)
    pub const STL_DEFAULT_HEX: u32 = 0x999999;

    pub fn new(color: [f32; 4]) -> Self {
        Self { name: None, color }
    }

    pub fn named(name: impl Into<String>, color: [f32; 4]) -> Self {
        Self {
            name: Some(name.into()),
            color,
        }
    }

    /// Opaque material from a 0xRRGGBB value
    pub fn from_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xff) as f32 / 255.0;
        let g = ((hex >> 8) & 0xff) as f32 / 255.0;
        let b = (hex & 0xff) as f32 / 255.0;
        Self::new([r, g, b, 1.0])
    }

    pub fn stl_default() -> Self {
        Self::from_hex(Self::STL_DEFAULT_HEX)
    }
}

/// One visual geometry inside a mesh container
#[derive(Debug, Clone, Default)]
pub struct VisualGeometry {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    /// None when the file assigns no material
    pub material: Option<Material>,
}

impl VisualGeometry {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounds, None for an empty geometry
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let first = *self.positions.first()?;
        let (mut min, mut max) = (first, first);
        for p in &self.positions {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        Some((min, max))
    }
}

/// Container that accumulates the visual geometries of one mesh file
///
/// Created empty and populated once by a loader task.
#[derive(Debug, Clone, Default)]
pub struct MeshResource {
    pub uri: String,
    /// Log parser warnings while loading
    pub warnings: bool,
    children: Vec<VisualGeometry>,
    populated: bool,
}

impl MeshResource {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Default::default()
        }
    }

    pub fn with_warnings(mut self, warnings: bool) -> Self {
        self.warnings = warnings;
        self
    }

    /// Add the loaded children. Only the first call has an effect.
    pub fn populate(&mut self, children: Vec<VisualGeometry>) -> bool {
        if self.populated {
            tracing::warn!("Mesh resource {} already populated", self.uri);
            return false;
        }
        self.children = children;
        self.populated = true;
        true
    }

    pub fn children(&self) -> &[VisualGeometry] {
        &self.children
    }

    pub fn is_populated(&self) -> bool {
        self.populated
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_stl_default_color() {
        let m = Material::stl_default();
        assert_relative_eq!(m.color[0], 0.6);
        assert_relative_eq!(m.color[1], 0.6);
        assert_relative_eq!(m.color[2], 0.6);
        assert_eq!(m.color[3], 1.0);
    }

    #[test]
    fn test_populate_once() {
        let mut res = MeshResource::new("a.stl");
        assert!(res.populate(vec![VisualGeometry::default()]));
        assert!(!res.populate(vec![]));
        assert_eq!(res.children().len(), 1);
    }

    #[test]
    fn test_bounds() {
        let geom = VisualGeometry {
            positions: vec![[0.0, -1.0, 2.0], [3.0, 1.0, -2.0]],
            ..Default::default()
        };
        assert_eq!(geom.bounds(), Some(([0.0, -1.0, -2.0], [3.0, 1.0, 2.0])));
        assert_eq!(VisualGeometry::default().bounds(), None);
    }
}
