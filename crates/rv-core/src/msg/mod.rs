//! ROS message types consumed by the visualization helpers

mod occupancy_grid;

pub use occupancy_grid::*;

use serde::{Deserialize, Serialize};

/// ROS time stamp
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Time {
    #[serde(default)]
    pub secs: u32,
    #[serde(default)]
    pub nsecs: u32,
}

/// std_msgs/Header
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    #[serde(default)]
    pub seq: u32,
    #[serde(default)]
    pub stamp: Time,
    #[serde(default)]
    pub frame_id: String,
}
