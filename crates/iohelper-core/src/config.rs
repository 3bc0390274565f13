use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::listing::ListingOrder;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelperConfig {
    /// Directory that relative paths are resolved against
    #[serde(default = "default_work_dir")]
    pub work_dir: String,

    /// Display order for `ls` output
    #[serde(default)]
    pub listing_order: ListingOrder,

    /// Compare SHA-256 digests of copy source and destination in the walkthrough
    #[serde(default = "default_verify_copies")]
    pub verify_copies: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_work_dir() -> String {
    ".".to_string()
}
fn default_verify_copies() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            listing_order: ListingOrder::default(),
            verify_copies: default_verify_copies(),
            log_level: default_log_level(),
        }
    }
}

impl HelperConfig {
    /// Default config file path for this platform
    pub fn default_path() -> PathBuf {
        if let Some(dirs) = directories::ProjectDirs::from("com", "iohelper", "iohelper") {
            dirs.config_dir().join("config.json")
        } else {
            PathBuf::from("iohelper-config.json")
        }
    }

    /// Load config from a file path
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;
        let config: Self =
            serde_json::from_str(&data).with_context(|| "failed to parse config JSON")?;
        Ok(config)
    }

    /// Load config if the file exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to a file path
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config dir {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)
            .with_context(|| format!("failed to write config to {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: HelperConfig = serde_json::from_str(r#"{"work_dir": "/srv/data"}"#).unwrap();
        assert_eq!(config.work_dir, "/srv/data");
        assert_eq!(config.listing_order, ListingOrder::Filesystem);
        assert!(config.verify_copies);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_listing_order_snake_case() {
        let config: HelperConfig =
            serde_json::from_str(r#"{"listing_order": "dirs_first"}"#).unwrap();
        assert_eq!(config.listing_order, ListingOrder::DirsFirst);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = HelperConfig {
            work_dir: "/tmp/work".to_string(),
            listing_order: ListingOrder::DirsFirst,
            verify_copies: false,
            log_level: "debug".to_string(),
        };

        config.save(&path).unwrap();
        assert_eq!(HelperConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = TempDir::new().unwrap();
        let config = HelperConfig::load_or_default(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, HelperConfig::default());
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = HelperConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to parse config JSON"));
    }
}
