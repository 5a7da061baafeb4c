//! Stamping configuration
//!
//! Loaded from TOML. Every field is optional and falls back to the values
//! the stamping service has always used:
//!
//! ```toml
//! end_marker = "./."
//!
//! [placement]
//! padding = 10.0
//! primary = { width = 120.0, height = 50.0 }
//! counter = { width = 60.0, height = 25.0 }
//! ```

use crate::marker::DEFAULT_END_MARKER;
use crate::placement::{PlacementConfig, StampSize};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StampConfig {
    pub placement: PlacementConfig,
    /// Token that terminates the document body
    pub end_marker: String,
}

impl Default for StampConfig {
    fn default() -> Self {
        Self {
            placement: PlacementConfig::default(),
            end_marker: DEFAULT_END_MARKER.to_string(),
        }
    }
}

impl StampConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: StampConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_size("placement.primary", self.placement.primary)?;
        check_size("placement.counter", self.placement.counter)?;

        let padding = self.placement.padding;
        if !padding.is_finite() || padding < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "placement.padding must be non-negative, got {}",
                padding
            )));
        }
        if self.end_marker.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "end_marker must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_size(field: &str, size: StampSize) -> Result<(), ConfigError> {
    let positive = |v: f64| v.is_finite() && v > 0.0;
    if !positive(size.width) || !positive(size.height) {
        return Err(ConfigError::Invalid(format!(
            "{} must have positive width and height, got {}x{}",
            field, size.width, size.height
        )));
    }
    Ok(())
}
