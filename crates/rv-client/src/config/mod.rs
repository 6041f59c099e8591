//! Viewer configuration
//!
//! Settings for the height map client and the mesh loader, stored as RON.
//! Every section is `#[serde(default)]` so partial files load.

mod manager;

pub use manager::{ConfigError, ConfigManager, SharedConfig, create_shared_config};

use std::collections::BTreeMap;
use std::path::PathBuf;

use rv_core::mesh::{LoaderSettings, MeshUnit, UriFetcher};
use rv_core::{HeightEncoding, HeightParams};
use serde::{Deserialize, Serialize};

use crate::client::{DEFAULT_TOPIC, HeightMapClientOptions};
use crate::ros::Compression;

/// Current configuration format version
pub const CONFIG_VERSION: u32 = 1;

/// Height map client settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeightMapConfig {
    pub topic: String,
    pub compression: Compression,
    /// Track the message frame through TF
    pub use_tf: bool,
    /// Z offset of the map within its frame
    pub z_offset: f64,
    pub encoding: HeightEncoding,
    pub height_scale: f32,
    pub min_height: f32,
    pub max_height: f32,
    pub low_hue: f32,
    pub high_hue: f32,
}

impl Default for HeightMapConfig {
    fn default() -> Self {
        let params = HeightParams::default();
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            compression: Compression::default(),
            use_tf: false,
            z_offset: 0.0,
            encoding: params.encoding,
            height_scale: params.height_scale,
            min_height: params.min_height,
            max_height: params.max_height,
            low_hue: params.low_hue,
            high_hue: params.high_hue,
        }
    }
}

impl HeightMapConfig {
    pub fn params(&self) -> HeightParams {
        HeightParams {
            encoding: self.encoding,
            height_scale: self.height_scale,
            min_height: self.min_height,
            max_height: self.max_height,
            low_hue: self.low_hue,
            high_hue: self.high_hue,
        }
    }

    /// Client options without a TF client or root node
    pub fn client_options(&self) -> HeightMapClientOptions {
        HeightMapClientOptions {
            topic: self.topic.clone(),
            compression: self.compression,
            offset_pose: rv_core::Pose::from_position(0.0, 0.0, self.z_offset),
            params: self.params(),
            ..Default::default()
        }
    }
}

/// Mesh loading settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MeshConfig {
    /// Unit of mesh file coordinates
    pub unit: MeshUnit,
    /// Log parser warnings
    pub warnings: bool,
    /// Directory for relative mesh paths
    pub base_dir: Option<PathBuf>,
    /// `package://` name -> directory
    pub packages: BTreeMap<String, PathBuf>,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            unit: MeshUnit::Meters,
            warnings: true,
            base_dir: None,
            packages: BTreeMap::new(),
        }
    }
}

impl MeshConfig {
    pub fn fetcher(&self) -> UriFetcher {
        let mut fetcher = UriFetcher::new();
        if let Some(base_dir) = &self.base_dir {
            fetcher = fetcher.with_base_dir(base_dir.clone());
        }
        for (name, dir) in &self.packages {
            fetcher = fetcher.with_package(name.clone(), dir.clone());
        }
        fetcher
    }

    pub fn loader_settings(&self) -> LoaderSettings {
        LoaderSettings {
            fetcher: std::sync::Arc::new(self.fetcher()),
            unit: self.unit,
        }
    }
}

/// Complete viewer configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewerConfig {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub height_map: HeightMapConfig,
    #[serde(default)]
    pub mesh: MeshConfig,
}

impl ViewerConfig {
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            height_map: HeightMapConfig::default(),
            mesh: MeshConfig::default(),
        }
    }

    pub fn from_ron(content: &str) -> Result<Self, ConfigError> {
        ron::from_str(content).map_err(|e| ConfigError::Deserialize(e.to_string()))
    }

    pub fn to_ron(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_client() {
        let config = ViewerConfig::default();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.height_map.params(), HeightParams::default());
        assert_eq!(config.height_map.topic, "/map");
        assert_eq!(config.height_map.compression, Compression::Cbor);
    }

    #[test]
    fn test_partial_file_loads() {
        let config = ViewerConfig::from_ron(
            "(height_map: (topic: \"/elevation\", encoding: Legacy), mesh: (unit: Millimeters))",
        )
        .unwrap();
        assert_eq!(config.height_map.topic, "/elevation");
        assert_eq!(config.height_map.encoding, HeightEncoding::Legacy);
        assert_eq!(config.height_map.height_scale, 0.01);
        assert_eq!(config.mesh.unit, MeshUnit::Millimeters);
        assert!(config.mesh.warnings);
    }

    #[test]
    fn test_ron_roundtrip_with_packages() {
        let mut config = ViewerConfig::default();
        config
            .mesh
            .packages
            .insert("robot".into(), PathBuf::from("/opt/robot"));
        config.height_map.encoding = HeightEncoding::Linear { offset: 100 };

        let restored = ViewerConfig::from_ron(&config.to_ron().unwrap()).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_invalid_ron() {
        assert!(matches!(
            ViewerConfig::from_ron("(height_map: 5)"),
            Err(ConfigError::Deserialize(_))
        ));
    }

    #[test]
    fn test_client_options_offset() {
        let config = HeightMapConfig {
            z_offset: 0.25,
            ..Default::default()
        };
        let options = config.client_options();
        assert_eq!(options.offset_pose.position.z, 0.25);
        assert!(options.tf_client.is_none());
    }
}
