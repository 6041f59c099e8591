//! Planar grid geometry

use uuid::Uuid;

/// Subdivided plane in the XY plane facing +Z, centered on the origin
///
/// Vertex rows start at the top edge (+Y). The `v` texture coordinate is 1.0
/// on the top row and 0.0 on the bottom row, so data texture row 0 lands on
/// the bottom (-Y) edge.
#[derive(Debug, Clone)]
pub struct PlaneGeometry {
    pub id: Uuid,
    pub width: f32,
    pub height: f32,
    /// Segments along X (at least 1)
    pub width_segments: u32,
    /// Segments along Y (at least 1)
    pub height_segments: u32,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl PlaneGeometry {
    pub fn new(width: f32, height: f32, width_segments: u32, height_segments: u32) -> Self {
        let grid_x = width_segments.max(1);
        let grid_y = height_segments.max(1);
        let grid_x1 = grid_x + 1;
        let grid_y1 = grid_y + 1;

        let width_half = width / 2.0;
        let height_half = height / 2.0;
        let segment_width = width / grid_x as f32;
        let segment_height = height / grid_y as f32;

        let vertex_count = (grid_x1 * grid_y1) as usize;
        let mut positions = Vec::with_capacity(vertex_count);
        let mut normals = Vec::with_capacity(vertex_count);
        let mut uvs = Vec::with_capacity(vertex_count);

        for iy in 0..grid_y1 {
            let y = iy as f32 * segment_height - height_half;
            for ix in 0..grid_x1 {
                let x = ix as f32 * segment_width - width_half;
                positions.push([x, -y, 0.0]);
                normals.push([0.0, 0.0, 1.0]);
                uvs.push([
                    ix as f32 / grid_x as f32,
                    1.0 - iy as f32 / grid_y as f32,
                ]);
            }
        }

        let mut indices = Vec::with_capacity((grid_x * grid_y * 6) as usize);
        for iy in 0..grid_y {
            for ix in 0..grid_x {
                let a = ix + grid_x1 * iy;
                let b = ix + grid_x1 * (iy + 1);
                let c = (ix + 1) + grid_x1 * (iy + 1);
                let d = (ix + 1) + grid_x1 * iy;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        Self {
            id: Uuid::new_v4(),
            width,
            height,
            width_segments: grid_x,
            height_segments: grid_y,
            positions,
            normals,
            uvs,
            indices,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Texel sampled by a vertex at `uv` in a `width x height` texture
pub fn texel_for_uv(uv: [f32; 2], width: u32, height: u32) -> (u32, u32) {
    let max_col = width.saturating_sub(1);
    let max_row = height.saturating_sub(1);
    let col = (uv[0].clamp(0.0, 1.0) * max_col as f32).round() as u32;
    let row = (uv[1].clamp(0.0, 1.0) * max_row as f32).round() as u32;
    (col.min(max_col), row.min(max_row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_layout() {
        let plane = PlaneGeometry::new(6.0, 2.0, 3, 1);
        assert_eq!(plane.vertex_count(), 8);
        assert_eq!(plane.triangle_count(), 6);

        // First vertex is the top-left corner
        assert_eq!(plane.positions[0], [-3.0, 1.0, 0.0]);
        assert_eq!(plane.uvs[0], [0.0, 1.0]);
        // Last vertex is the bottom-right corner
        assert_eq!(plane.positions[7], [3.0, -1.0, 0.0]);
        assert_eq!(plane.uvs[7], [1.0, 0.0]);

        assert!(plane.normals.iter().all(|n| *n == [0.0, 0.0, 1.0]));
        assert!(plane.indices.iter().all(|&i| (i as usize) < plane.vertex_count()));
    }

    #[test]
    fn test_zero_segments_raised_to_one() {
        let plane = PlaneGeometry::new(1.0, 1.0, 0, 0);
        assert_eq!(plane.width_segments, 1);
        assert_eq!(plane.height_segments, 1);
        assert_eq!(plane.vertex_count(), 4);
        assert_eq!(plane.indices.len(), 6);
    }

    #[test]
    fn test_texel_for_uv() {
        assert_eq!(texel_for_uv([0.0, 0.0], 4, 3), (0, 0));
        assert_eq!(texel_for_uv([1.0, 1.0], 4, 3), (3, 2));
        assert_eq!(texel_for_uv([0.5, 0.5], 1, 1), (0, 0));
    }
}
