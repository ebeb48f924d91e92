//! Sync tuning loaded from TOML with per-field defaults.

use crate::error::SyncError;
use entsync_core::fields;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::warn;

/// Default location of the sync config file.
pub const DEFAULT_SYNC_CONFIG_PATH: &str = "config/sync.toml";

/// Namespace used when callers do not name one.
pub const DEFAULT_NAMESPACE: &str = "entities";

/// Adapter-wide sync tuning.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Collection path entities land in when no namespace is given.
    pub default_namespace: String,
    /// Host sampling cadence in milliseconds.
    pub sync_interval_ms: f64,
    /// Skip publishing entities that have not moved.
    pub adaptive_sync: bool,
    /// Per-axis movement below which an entity counts as idle.
    pub adaptive_sync_threshold: f64,
    /// How far behind "now" the client renders, in milliseconds.
    pub target_render_delay_ms: f64,
    /// Fixed number of snapshot intervals to lag, replacing the computed value.
    pub interpolation_delay_override: Option<u32>,
    /// Properties sampled off tracked objects each tick.
    pub sync_properties: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_namespace: DEFAULT_NAMESPACE.to_string(),
            // ~60 Hz, one publish per rendered frame on the host.
            sync_interval_ms: 16.0,
            adaptive_sync: false,
            adaptive_sync_threshold: 1.0,
            target_render_delay_ms: 50.0,
            interpolation_delay_override: None,
            sync_properties: default_sync_properties(),
        }
    }
}

/// Position, rotation and alpha.
pub fn default_sync_properties() -> Vec<String> {
    [fields::X, fields::Y, fields::ROTATION, fields::ALPHA]
        .iter()
        .map(|field| field.to_string())
        .collect()
}

impl SyncConfig {
    /// Load sync configuration from the default path.
    pub fn load() -> Self {
        Self::load_from_path(Path::new(DEFAULT_SYNC_CONFIG_PATH))
    }

    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    SyncConfig::default()
                }
            },
            Err(err) => {
                if err.kind() == std::io::ErrorKind::NotFound {
                    warn!("Sync config not found at {}. Using defaults", path.display());
                } else {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                }
                SyncConfig::default()
            }
        }
    }

    /// Parse configuration, reporting malformed input instead of defaulting.
    pub fn from_toml_str(contents: &str) -> Result<Self, SyncError> {
        Ok(toml::from_str::<SyncConfig>(contents)?)
    }

    /// Save configuration to an explicit path.
    pub fn save_to_path(&self, path: &Path) -> Result<(), SyncError> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg = SyncConfig::from_toml_str("adaptive_sync = true\nsync_interval_ms = 50.0\n")
            .expect("valid toml");

        assert!(cfg.adaptive_sync);
        assert_eq!(cfg.sync_interval_ms, 50.0);
        assert_eq!(cfg.default_namespace, DEFAULT_NAMESPACE);
        assert_eq!(cfg.target_render_delay_ms, 50.0);
        assert_eq!(cfg.sync_properties, default_sync_properties());
    }

    #[test]
    fn test_malformed_file_is_an_error_when_strict() {
        let err = SyncConfig::from_toml_str("adaptive_sync = \"yes\"").unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = SyncConfig::load_from_path(&dir.path().join("nope.toml"));
        assert_eq!(cfg, SyncConfig::default());
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let shipped = include_str!("../../../config/sync.toml");
        let cfg = SyncConfig::from_toml_str(shipped).expect("shipped config parses");
        assert_eq!(cfg, SyncConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/sync.toml");
        let cfg = SyncConfig {
            interpolation_delay_override: Some(3),
            default_namespace: "world.sprites".into(),
            ..SyncConfig::default()
        };

        cfg.save_to_path(&path).expect("save");
        assert_eq!(SyncConfig::load_from_path(&path), cfg);
    }
}
