//! Vertex formats

use rv_core::heightmap::PlaneGeometry;
use rv_core::mesh::VisualGeometry;

/// Height map plane vertex (before displacement)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct HeightMapVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl HeightMapVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    /// Interleave a plane's attribute arrays
    pub fn from_plane(plane: &PlaneGeometry) -> Vec<Self> {
        plane
            .positions
            .iter()
            .zip(&plane.normals)
            .zip(&plane.uvs)
            .map(|((position, normal), uv)| Self {
                position: *position,
                normal: *normal,
                uv: *uv,
            })
            .collect()
    }
}

/// Mesh vertex with flat normal
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl MeshVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    /// Interleave a geometry's positions and normals. Missing normals are +Z.
    pub fn from_geometry(geometry: &VisualGeometry) -> Vec<Self> {
        geometry
            .positions
            .iter()
            .enumerate()
            .map(|(i, position)| Self {
                position: *position,
                normal: geometry.normals.get(i).copied().unwrap_or([0.0, 0.0, 1.0]),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_vertices_interleaved() {
        let plane = PlaneGeometry::new(6.0, 2.0, 3, 1);
        let vertices = HeightMapVertex::from_plane(&plane);
        assert_eq!(vertices.len(), plane.vertex_count());
        assert_eq!(vertices[0].position, plane.positions[0]);
        assert_eq!(vertices[0].uv, plane.uvs[0]);
        assert_eq!(vertices[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_mesh_vertex_missing_normals() {
        let geometry = VisualGeometry {
            name: "tri".into(),
            positions: vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![],
            indices: vec![0, 1, 2],
            material: None,
        };
        let vertices = MeshVertex::from_geometry(&geometry);
        assert_eq!(vertices.len(), 3);
        assert_eq!(vertices[2].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_vertex_strides() {
        assert_eq!(HeightMapVertex::layout().array_stride, 32);
        assert_eq!(MeshVertex::layout().array_stride, 24);
    }
}
