//! Single channel data texture

use uuid::Uuid;

/// R8 texture carrying one encoded height byte per grid cell
#[derive(Debug, Clone)]
pub struct DataTexture {
    pub id: Uuid,
    pub width: u32,
    pub height: u32,
    /// Row-major texels, row 0 first
    pub texels: Vec<u8>,
}

impl DataTexture {
    pub fn new(width: u32, height: u32, texels: Vec<u8>) -> Self {
        debug_assert_eq!(texels.len(), width as usize * height as usize);
        Self {
            id: Uuid::new_v4(),
            width,
            height,
            texels,
        }
    }

    pub fn texel(&self, col: u32, row: u32) -> Option<u8> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.texels
            .get(row as usize * self.width as usize + col as usize)
            .copied()
    }

    /// Size in bytes
    pub fn byte_len(&self) -> usize {
        self.texels.len()
    }
}
