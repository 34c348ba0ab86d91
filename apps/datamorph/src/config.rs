//! # Application Configuration
//!
//! `datamorph.toml` holds the conversion settings and an optional platform
//! schema:
//!
//! ```toml
//! platform = "platform.json"
//!
//! [conversion]
//! max_properties_per_container = 100
//! infer_inverse_connections = true
//! ```
//!
//! A relative `platform` path is resolved against the config file's
//! directory.

use datamorph_core::{ConversionConfig, DataModelError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "datamorph.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub conversion: ConversionConfig,

    /// Physical table (JSON) used as the platform base schema when lowering.
    pub platform: Option<PathBuf>,
}

impl AppConfig {
    /// Load the effective configuration.
    ///
    /// An explicit path must exist. Without one, `datamorph.toml` in the
    /// working directory is used when present, the defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, DataModelError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)?
                } else {
                    Self::default()
                }
            }
        };
        config.conversion.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, DataModelError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DataModelError::Io(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        let mut config = Self::parse(&content)?;

        if let Some(platform) = config.platform.take() {
            let base = path.parent().unwrap_or(Path::new("."));
            config.platform = Some(if platform.is_relative() {
                base.join(platform)
            } else {
                platform
            });
        }
        tracing::debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Parse TOML text. Missing keys take their defaults.
    pub fn parse(content: &str) -> Result<Self, DataModelError> {
        toml::from_str(content)
            .map_err(|e| DataModelError::Serialization(format!("Invalid config: {}", e)))
    }
}

// =============================================================================
// TESTS
// =============================================================================
