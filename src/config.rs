//! Run configuration
//!
//! All settings are optional; a missing file or section falls back to the
//! defaults. Example:
//!
//! ```toml
//! [placement]
//! inflate_boxes = true
//! footprint_spacing = 500000
//!
//! [libraries]
//! Passives = "/opt/footprints/passives"
//!
//! [fragments]
//! file_name = "layout.json"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::library::LibraryTable;
use crate::placement::PlacementConfig;

/// Errors that can occur when loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Where layout fragments are looked up
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FragmentConfig {
    /// File name of a fragment document inside its layout directory
    pub file_name: String,
}

impl Default for FragmentConfig {
    fn default() -> Self {
        Self {
            file_name: "layout.json".to_string(),
        }
    }
}

/// Configuration for a synchronization run
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub placement: PlacementConfig,
    /// Library nickname -> footprint directory
    pub libraries: BTreeMap<String, PathBuf>,
    pub fragments: FragmentConfig,
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn with_placement(mut self, placement: PlacementConfig) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_library(mut self, nickname: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        self.libraries.insert(nickname.into(), dir.into());
        self
    }

    pub fn with_fragment_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.fragments.file_name = file_name.into();
        self
    }

    /// Library table holding the configured libraries
    pub fn library_table(&self) -> LibraryTable {
        let mut table = LibraryTable::new();
        for (nickname, dir) in &self.libraries {
            table.insert(nickname.clone(), dir.clone());
        }
        table
    }
}
