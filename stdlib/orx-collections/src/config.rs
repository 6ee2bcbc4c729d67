//! Runtime limits for collections and the heap they live in.
//!
//! ```toml
//! [gc]
//! nursery_threshold = 2
//! max_objects = 1000000
//!
//! [arrays]
//! max_elements = 100000000
//! growth_threshold = 2000
//! small_growth_increment = 16
//! ```

use orx_rts_gc::GcConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read configuration file {path}")]
    Io {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for [`SpaceConfig`].
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Growth and size limits for arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrayConfig {
    /// Largest element count any array (or dimension product) may reach.
    pub max_elements: usize,
    /// Size below which reallocation adds `small_growth_increment` spare
    /// slots; at or above it the spare is half the new size.
    pub growth_threshold: usize,
    /// Spare slots added when a small array is reallocated.
    pub small_growth_increment: usize,
}

impl Default for ArrayConfig {
    fn default() -> Self {
        Self {
            max_elements: 100_000_000,
            growth_threshold: 2_000,
            small_growth_increment: 16,
        }
    }
}

impl ArrayConfig {
    /// Capacity to allocate when an array must grow to `new_size` slots.
    #[must_use]
    pub fn grown_capacity(&self, new_size: usize) -> usize {
        let slack = if new_size < self.growth_threshold {
            self.small_growth_increment
        } else {
            new_size / 2
        };
        new_size.saturating_add(slack).min(self.max_elements)
    }
}

/// Configuration of an object space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceConfig {
    /// Managed heap settings.
    pub gc: GcConfig,
    /// Array limits.
    pub arrays: ArrayConfig,
}

impl SpaceConfig {
    /// Load a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse a configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not valid TOML for this type.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Toml)
    }
}
