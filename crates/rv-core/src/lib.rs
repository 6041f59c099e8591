//! RV Core Data Structures
//!
//! This crate contains the renderer-independent pieces of RV:
//! - ROS geometry and occupancy grid message types
//! - Height encoding and height-map construction
//! - Scene graph and explicit GPU resource release tracking
//! - Mesh loading (STL, OBJ, DAE) behind an extension-keyed dispatcher
//! - A cooperative task queue driving asynchronous loads

pub mod heightmap;
pub mod mesh;
pub mod msg;
pub mod resource;
pub mod scene;
pub mod task;
pub mod types;

pub use heightmap::*;
pub use msg::*;
pub use resource::*;
pub use scene::*;
pub use task::*;
pub use types::*;
