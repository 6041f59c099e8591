//! nav_msgs/OccupancyGrid

use serde::{Deserialize, Serialize};

use super::{Header, Time};
use crate::types::Pose;

/// ROS type name of [`OccupancyGrid`]
pub const OCCUPANCY_GRID_TYPE: &str = "nav_msgs/OccupancyGrid";

/// nav_msgs/MapMetaData
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapMetaData {
    #[serde(default)]
    pub map_load_time: Time,
    /// Cell edge length in meters
    pub resolution: f32,
    /// Number of columns
    pub width: u32,
    /// Number of rows
    pub height: u32,
    /// Pose of cell (0, 0) in the map frame
    #[serde(default)]
    pub origin: Pose,
}

/// Height / occupancy grid message
///
/// `data` is row-major, starting at the origin cell. Each cell holds one
/// signed byte: an occupancy probability for plain maps, an elevation sample
/// for height maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OccupancyGrid {
    #[serde(default)]
    pub header: Header,
    pub info: MapMetaData,
    pub data: Vec<i8>,
}

impl OccupancyGrid {
    /// Create a grid with the given dimensions and cell data
    pub fn new(width: u32, height: u32, resolution: f32, data: Vec<i8>) -> Self {
        Self {
            header: Header::default(),
            info: MapMetaData {
                resolution,
                width,
                height,
                ..Default::default()
            },
            data,
        }
    }

    /// Number of cells described by the metadata
    pub fn cell_count(&self) -> usize {
        self.info.width as usize * self.info.height as usize
    }

    /// Check the metadata against the payload
    pub fn validate(&self) -> Result<(), GridError> {
        let info = &self.info;
        if info.width == 0 || info.height == 0 {
            return Err(GridError::EmptyGrid {
                width: info.width,
                height: info.height,
            });
        }
        if !info.resolution.is_finite() || info.resolution <= 0.0 {
            return Err(GridError::InvalidResolution(info.resolution));
        }
        if self.data.len() != self.cell_count() {
            return Err(GridError::DataLength {
                expected: self.cell_count(),
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    /// Cell value at column `col`, row `row`
    pub fn cell(&self, col: u32, row: u32) -> Option<i8> {
        if col >= self.info.width || row >= self.info.height {
            return None;
        }
        let index = row as usize * self.info.width as usize + col as usize;
        self.data.get(index).copied()
    }
}

/// Grid validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    #[error("Empty grid: {width}x{height}")]
    EmptyGrid { width: u32, height: u32 },
    #[error("Invalid resolution: {0}")]
    InvalidResolution(f32),
    #[error("Data length mismatch: expected {expected} cells, got {actual}")]
    DataLength { expected: usize, actual: usize },
}
