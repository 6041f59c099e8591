//! Mesh file fetching

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::MeshError;

/// Fetches the bytes behind a mesh URI
pub trait MeshFetcher: Send + Sync {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, MeshError>;
}

/// Where a URI points after resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedUri {
    Path(PathBuf),
    Http(String),
}

/// Fetcher for `file://`, `package://`, `http(s)://` and plain paths
///
/// Relative paths resolve against `base_dir`; `package://name/rest`
/// resolves `rest` under the directory registered for `name`.
#[derive(Debug, Clone)]
pub struct UriFetcher {
    base_dir: PathBuf,
    packages: HashMap<String, PathBuf>,
}

impl Default for UriFetcher {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            packages: HashMap::new(),
        }
    }
}

impl UriFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// Register the directory of a ROS package
    pub fn with_package(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.packages.insert(name.into(), path.into());
        self
    }

    pub fn resolve(&self, uri: &str) -> Result<ResolvedUri, MeshError> {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            return Ok(ResolvedUri::Http(uri.to_string()));
        }

        if let Some(rest) = uri.strip_prefix("package://") {
            let (package, relative) = rest.split_once('/').unwrap_or((rest, ""));
            let root = self
                .packages
                .get(package)
                .ok_or_else(|| MeshError::PackageNotFound(uri.to_string()))?;
            return Ok(ResolvedUri::Path(root.join(relative)));
        }

        let path_str = uri.strip_prefix("file://").unwrap_or(uri);
        let path = Path::new(path_str);
        if path.is_absolute() {
            Ok(ResolvedUri::Path(path.to_path_buf()))
        } else {
            Ok(ResolvedUri::Path(self.base_dir.join(path)))
        }
    }
}

impl MeshFetcher for UriFetcher {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, MeshError> {
        match self.resolve(uri)? {
            ResolvedUri::Path(path) => std::fs::read(&path)
                .map_err(|e| MeshError::Io(format!("{}: {}", path.display(), e))),
            ResolvedUri::Http(url) => fetch_http(&url),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn fetch_http(url: &str) -> Result<Vec<u8>, MeshError> {
    let http_error = |reason: String| MeshError::Http {
        uri: url.to_string(),
        reason,
    };
    let mut response = ureq::get(url).call().map_err(|e| http_error(e.to_string()))?;
    response
        .body_mut()
        .read_to_vec()
        .map_err(|e| http_error(e.to_string()))
}

#[cfg(target_arch = "wasm32")]
fn fetch_http(url: &str) -> Result<Vec<u8>, MeshError> {
    Err(MeshError::Http {
        uri: url.to_string(),
        reason: "blocking HTTP is unavailable on wasm32".to_string(),
    })
}

/// Everything up to and including the last `/` of a URI
pub fn extract_url_base(uri: &str) -> &str {
    match uri.rfind('/') {
        Some(index) => &uri[..=index],
        None => "",
    }
}

/// Resolve `relative` against the base of `uri`
pub fn join_uri(uri: &str, relative: &str) -> String {
    if relative.contains("://") || Path::new(relative).is_absolute() {
        return relative.to_string();
    }
    format!("{}{}", extract_url_base(uri), relative)
}
