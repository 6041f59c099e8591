//! Height-map shader material parameters

use uuid::Uuid;

use super::HeightParams;

/// Shader material of a height map
#[derive(Debug, Clone)]
pub struct HeightMapMaterial {
    pub id: Uuid,
    pub params: HeightParams,
    /// Render both faces of the plane
    pub double_sided: bool,
    /// Alpha blended (needed by the legacy no-data cells)
    pub transparent: bool,
}

impl HeightMapMaterial {
    pub fn new(params: HeightParams) -> Self {
        Self {
            id: Uuid::new_v4(),
            params,
            double_sided: true,
            transparent: true,
        }
    }
}
