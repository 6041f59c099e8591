//! Built-in sub-renderers.
//!
//! - [`HeightMapSubRenderer`]: height maps decoded and displaced on the GPU
//! - [`MeshSubRenderer`]: visual geometries of loaded mesh files

pub mod heightmap;
pub mod mesh;

pub use heightmap::{HeightMapSubRenderer, HeightMapUniform};
pub use mesh::{MeshSubRenderer, MeshUniform};

/// Render priorities for sub-renderers.
///
/// Lower values are rendered first.
pub mod priorities {
    /// Height maps are the ground layer
    pub const HEIGHT_MAP: i32 = 50;
    /// Meshes are drawn over the ground
    pub const MESH: i32 = 100;
}
