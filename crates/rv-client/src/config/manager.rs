//! Configuration manager for loading, saving, and tracking viewer configuration

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use super::ViewerConfig;

/// Shared configuration manager type
pub type SharedConfig = Arc<RwLock<ConfigManager>>;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

/// Loads, saves and tracks changes to a [`ViewerConfig`]
pub struct ConfigManager {
    config: ViewerConfig,
    config_path: PathBuf,
    dirty: bool,
}

impl ConfigManager {
    /// Load from the OS configuration directory, falling back to defaults
    pub fn new() -> Self {
        Self::with_path(Self::default_config_path())
    }

    /// Load from `path`, falling back to defaults if it is missing or invalid
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        let config_path = path.into();
        let config = match Self::load_from_path(&config_path) {
            Ok(config) => config,
            Err(ConfigError::Io(_)) => {
                tracing::info!("No config file found, using defaults");
                ViewerConfig::new()
            }
            Err(e) => {
                tracing::warn!("Failed to parse config file: {}", e);
                ViewerConfig::new()
            }
        };

        Self {
            config,
            config_path,
            dirty: false,
        }
    }

    /// OS-standard configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rv")
    }

    fn default_config_path() -> PathBuf {
        Self::config_dir().join("config.ron")
    }

    /// Read a configuration file
    pub fn load_from_path(path: &Path) -> Result<ViewerConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config = ViewerConfig::from_ron(&content)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Get a mutable reference to the configuration (marks as dirty)
    pub fn config_mut(&mut self) -> &mut ViewerConfig {
        self.dirty = true;
        &mut self.config
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Save the configuration if it has unsaved changes
    pub fn save(&mut self) -> Result<(), ConfigError> {
        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }

        let content = self.config.to_ron()?;
        std::fs::write(&self.config_path, &content).map_err(|e| ConfigError::Io(e.to_string()))?;

        tracing::info!("Saved config to {:?}", self.config_path);
        self.dirty = false;
        Ok(())
    }

    pub fn reset_to_defaults(&mut self) {
        self.config = ViewerConfig::new();
        self.dirty = true;
    }

    pub fn config_file_path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a new shared configuration manager
pub fn create_shared_config() -> SharedConfig {
    Arc::new(RwLock::new(ConfigManager::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rv_core::mesh::MeshUnit;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("rv-config-test-{}-{}", std::process::id(), name))
            .join("config.ron")
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let manager = ConfigManager::with_path(temp_path("missing"));
        assert_eq!(*manager.config(), ViewerConfig::new());
        assert!(!manager.is_dirty());
    }

    #[test]
    fn test_save_and_reload() {
        let path = temp_path("save");
        let mut manager = ConfigManager::with_path(&path);
        manager.config_mut().mesh.unit = MeshUnit::Inches;
        assert!(manager.is_dirty());
        manager.save().unwrap();
        assert!(!manager.is_dirty());

        let reloaded = ConfigManager::with_path(&path);
        assert_eq!(reloaded.config().mesh.unit, MeshUnit::Inches);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_clean_save_writes_nothing() {
        let path = temp_path("clean");
        let mut manager = ConfigManager::with_path(&path);
        manager.save().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_invalid_file_uses_defaults() {
        let path = temp_path("invalid");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not ron at all (").unwrap();

        let manager = ConfigManager::with_path(&path);
        assert_eq!(*manager.config(), ViewerConfig::new());
        assert!(matches!(
            ConfigManager::load_from_path(&path),
            Err(ConfigError::Deserialize(_))
        ));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_reset_marks_dirty() {
        let mut manager = ConfigManager::with_path(temp_path("reset"));
        manager.reset_to_defaults();
        assert!(manager.is_dirty());
    }
}
