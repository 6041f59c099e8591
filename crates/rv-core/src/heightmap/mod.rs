//! Height-map construction from height grids
//!
//! A [`HeightMap`] is a planar grid with one vertex per cell, a data texture
//! carrying the encoded cell heights and a shader material that decodes them.
//! The vertex stage displaces each vertex along the plane normal by its
//! decoded height; the fragment stage color codes it.

mod encoding;
mod geometry;
mod material;
mod texture;

pub use encoding::*;
pub use geometry::*;
pub use material::*;
pub use texture::*;

use glam::{Mat4, Quat, Vec3};
use uuid::Uuid;

use crate::msg::{GridError, OccupancyGrid};
use crate::resource::{ResourceId, ResourceSink};

/// Displayable height map built from one grid message
///
/// Owns the ids of its GPU resources, so it is not `Clone`: [`HeightMap::dispose`]
/// consumes the only handle and each resource is released once.
#[derive(Debug)]
pub struct HeightMap {
    pub id: Uuid,
    /// Frame the grid was reported in
    pub frame_id: String,
    pub geometry: PlaneGeometry,
    pub texture: DataTexture,
    pub material: HeightMapMaterial,
    /// Center of the grid in its frame
    pub position: Vec3,
    pub rotation: Quat,
    /// (resolution, resolution, 1)
    pub scale: Vec3,
}

impl HeightMap {
    /// Build a height map from a grid message
    pub fn from_grid(grid: &OccupancyGrid, params: &HeightParams) -> Result<Self, GridError> {
        grid.validate()?;

        let info = &grid.info;
        let width = info.width;
        let height = info.height;

        let texels: Vec<u8> = grid
            .data
            .iter()
            .map(|&sample| params.encoding.encode(sample))
            .collect();

        let geometry = PlaneGeometry::new(
            width as f32,
            height as f32,
            width.saturating_sub(1),
            height.saturating_sub(1),
        );
        let texture = DataTexture::new(width, height, texels);
        let material = HeightMapMaterial::new(*params);

        let origin = info.origin.translation();
        let resolution = info.resolution;
        let position = Vec3::new(
            (width as f32 * resolution) / 2.0 + origin.x,
            (height as f32 * resolution) / 2.0 + origin.y,
            origin.z,
        );

        Ok(Self {
            id: Uuid::new_v4(),
            frame_id: grid.header.frame_id.clone(),
            geometry,
            texture,
            material,
            position,
            rotation: info.origin.rotation(),
            scale: Vec3::new(resolution, resolution, 1.0),
        })
    }

    pub fn params(&self) -> &HeightParams {
        &self.material.params
    }

    /// Transform from plane space to the grid frame
    pub fn local_transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Decoded height of a cell
    pub fn sample(&self, col: u32, row: u32) -> Option<f32> {
        self.texture
            .texel(col, row)
            .map(|texel| self.params().decode(texel))
    }

    /// Plane-space vertex positions after displacement, as the vertex shader computes them
    pub fn displaced_positions(&self) -> Vec<[f32; 3]> {
        let params = self.params();
        self.geometry
            .positions
            .iter()
            .zip(&self.geometry.normals)
            .zip(&self.geometry.uvs)
            .map(|((p, n), uv)| {
                let (col, row) = texel_for_uv(*uv, self.texture.width, self.texture.height);
                let texel = self.texture.texel(col, row).unwrap_or_default();
                let d = params.displacement(texel);
                [p[0] + n[0] * d, p[1] + n[1] * d, p[2] + n[2] * d]
            })
            .collect()
    }

    /// Resources that must be released when this height map is discarded
    pub fn resource_ids(&self) -> [ResourceId; 3] {
        [
            ResourceId::Texture(self.texture.id),
            ResourceId::Material(self.material.id),
            ResourceId::Geometry(self.geometry.id),
        ]
    }

    /// Release the texture, material and geometry
    ///
    /// Consumes the height map, so each resource is released exactly once.
    pub fn dispose(self, sink: &dyn ResourceSink) {
        tracing::debug!("Disposing height map {}", self.id);
        for id in self.resource_ids() {
            sink.release(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ReleaseQueue;
    use crate::types::{Pose, Quaternion, Vector3};
    use approx::assert_relative_eq;

    fn grid(width: u32, height: u32, resolution: f32, data: Vec<i8>) -> OccupancyGrid {
        let mut grid = OccupancyGrid::new(width, height, resolution, data);
        grid.header.frame_id = "map".to_string();
        grid
    }

    #[test]
    fn test_from_grid_transform() {
        let mut g = grid(4, 2, 0.5, vec![0; 8]);
        g.info.origin = Pose::new(Vector3::new(-1.0, 2.0, 0.25), Quaternion::IDENTITY);

        let map = HeightMap::from_grid(&g, &HeightParams::default()).unwrap();
        assert_eq!(map.frame_id, "map");
        assert_relative_eq!(map.position.x, 0.0);
        assert_relative_eq!(map.position.y, 2.5);
        assert_relative_eq!(map.position.z, 0.25);
        assert_eq!(map.scale, Vec3::new(0.5, 0.5, 1.0));
        assert_eq!(map.geometry.width_segments, 3);
        assert_eq!(map.geometry.height_segments, 1);
        assert_eq!(map.geometry.vertex_count(), 8);
    }

    #[test]
    fn test_from_grid_rejects_invalid() {
        let g = grid(2, 2, 1.0, vec![0; 3]);
        assert!(HeightMap::from_grid(&g, &HeightParams::default()).is_err());
    }

    #[test]
    fn test_texture_carries_recentered_samples() {
        let g = grid(2, 1, 1.0, vec![-128, 10]);
        let map = HeightMap::from_grid(&g, &HeightParams::default()).unwrap();
        assert_eq!(map.texture.texels, vec![0, 138]);
        assert_eq!(map.sample(0, 0), Some(-128.0));
        assert_eq!(map.sample(1, 0), Some(10.0));
        assert_eq!(map.sample(2, 0), None);
    }

    #[test]
    fn test_displacement_follows_cell_rows() {
        // Row 0 (bottom) raised, row 1 (top) flat
        let g = grid(2, 2, 1.0, vec![100, 100, 0, 0]);
        let map = HeightMap::from_grid(&g, &HeightParams::default()).unwrap();
        let displaced = map.displaced_positions();

        // Vertices 0 and 1 are the top row, 2 and 3 the bottom row
        assert_relative_eq!(displaced[0][2], 0.0);
        assert_relative_eq!(displaced[1][2], 0.0);
        assert_relative_eq!(displaced[2][2], 1.0);
        assert_relative_eq!(displaced[3][2], 1.0);
    }

    #[test]
    fn test_dispose_releases_each_resource_once() {
        let g = grid(1, 1, 1.0, vec![0]);
        let map = HeightMap::from_grid(&g, &HeightParams::default()).unwrap();
        let expected = map.resource_ids();

        let queue = ReleaseQueue::new();
        map.dispose(&queue);

        let released = queue.drain();
        assert_eq!(released, expected.to_vec());
    }

    #[test]
    fn test_maps_from_same_grid_share_no_resources() {
        let g = grid(1, 1, 1.0, vec![0]);
        let first = HeightMap::from_grid(&g, &HeightParams::default()).unwrap();
        let second = HeightMap::from_grid(&g, &HeightParams::default()).unwrap();

        let queue = ReleaseQueue::new();
        let first_ids = first.resource_ids();
        first.dispose(&queue);
        second.dispose(&queue);

        let released = queue.drain();
        assert_eq!(released.len(), 6);
        for id in first_ids {
            assert_eq!(released.iter().filter(|r| **r == id).count(), 1);
        }
    }
}
