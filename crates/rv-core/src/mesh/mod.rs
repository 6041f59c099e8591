//! Mesh file loading (STL, OBJ, DAE formats)
//!
//! Parsing is delegated to the format crates; this module converts their
//! output into [`VisualGeometry`] children of a [`MeshResource`] container
//! and dispatches loads by file extension through [`MeshLoader`].

mod dae;
mod fetch;
mod loader;
mod normals;
mod obj;
mod resource;
mod stl;

pub use dae::parse_dae;
pub use fetch::{MeshFetcher, UriFetcher, extract_url_base, join_uri};
pub use loader::{
    ErrorHook, LoadOptions, LoaderFn, LoaderSettings, MeshLoader, OnDone, SUPPORTED_EXTENSIONS,
};
pub use normals::{calculate_triangle_normal, flat_shade};
pub use obj::parse_obj;
pub use resource::{Material, MeshResource, VisualGeometry};
pub use stl::parse_stl;

use serde::{Deserialize, Serialize};

/// Geometry and parser warnings produced by one file
#[derive(Debug, Clone, Default)]
pub struct ParsedMesh {
    pub children: Vec<VisualGeometry>,
    pub warnings: Vec<String>,
}

/// Unit of the coordinates stored in a mesh file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MeshUnit {
    #[default]
    Meters,
    Centimeters,
    Millimeters,
    Inches,
}

impl MeshUnit {
    /// Scale factor to meters
    pub fn scale(&self) -> f32 {
        match self {
            MeshUnit::Meters => 1.0,
            MeshUnit::Centimeters => 0.01,
            MeshUnit::Millimeters => 0.001,
            MeshUnit::Inches => 0.0254,
        }
    }
}

/// Detect mesh format from file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Stl,
    Obj,
    Dae,
    Unknown,
}

impl MeshFormat {
    /// Detect format from a URI or path, ignoring query and fragment
    pub fn from_uri(uri: &str) -> Self {
        match extension_of(uri).as_deref() {
            Some("stl") => MeshFormat::Stl,
            Some("obj") => MeshFormat::Obj,
            Some("dae") => MeshFormat::Dae,
            _ => MeshFormat::Unknown,
        }
    }

    /// Check if the format is supported
    pub fn is_supported(&self) -> bool {
        matches!(self, MeshFormat::Stl | MeshFormat::Obj | MeshFormat::Dae)
    }

    /// Get format name
    pub fn name(&self) -> &'static str {
        match self {
            MeshFormat::Stl => "STL",
            MeshFormat::Obj => "OBJ",
            MeshFormat::Dae => "DAE (COLLADA)",
            MeshFormat::Unknown => "Unknown",
        }
    }
}

/// Lowercase extension of the last path segment of a URI
pub fn extension_of(uri: &str) -> Option<String> {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    let file = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = file.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Mesh-related errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum MeshError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("HTTP error fetching '{uri}': {reason}")]
    Http { uri: String, reason: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Material library error: {0}")]
    Material(String),
    #[error("Empty mesh: no geometry found")]
    EmptyMesh,
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Unknown package in URI: {0}")]
    PackageNotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_uri() {
        assert_eq!(MeshFormat::from_uri("package://robot/meshes/base.STL"), MeshFormat::Stl);
        assert_eq!(MeshFormat::from_uri("http://host/a.dae?v=2#frag"), MeshFormat::Dae);
        assert_eq!(MeshFormat::from_uri("file:///tmp/wheel.obj"), MeshFormat::Obj);
        assert_eq!(MeshFormat::from_uri("meshes/base.ply"), MeshFormat::Unknown);
        assert_eq!(MeshFormat::from_uri("meshes.d/noext"), MeshFormat::Unknown);
        assert!(!MeshFormat::Unknown.is_supported());
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("a/b/c.Dae").as_deref(), Some("dae"));
        assert_eq!(extension_of(".hidden"), None);
        assert_eq!(extension_of("trailing."), None);
    }
}
