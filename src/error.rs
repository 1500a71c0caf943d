//! Top-level error and warning types

use std::path::PathBuf;

use thiserror::Error;

use crate::board::DocumentError;
use crate::config::ConfigError;
use crate::library::ResolutionError;
use crate::netlist::NetlistError;
use crate::placement::PlacementError;

/// Fatal errors that abort a synchronization run
#[derive(Debug, Error)]
pub enum SyncError {
    /// Error reading or writing a layout document
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Error loading the netlist
    #[error(transparent)]
    Netlist(#[from] NetlistError),

    /// A footprint definition could not be resolved
    #[error("footprint resolution failed for {reference}: {source}")]
    Resolution {
        reference: String,
        source: ResolutionError,
    },

    /// The library table could not be loaded
    #[error("library table error: {0}")]
    Library(#[from] ResolutionError),

    /// No room found for an item while packing
    #[error("placement failed: {0}")]
    Placement(#[from] PlacementError),

    /// Invalid configuration file
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl SyncError {
    pub fn resolution(reference: impl Into<String>, source: ResolutionError) -> Self {
        Self::Resolution {
            reference: reference.into(),
            source,
        }
    }
}

/// How much attention a warning deserves
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
}

/// Non-fatal conditions collected during a run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncWarning {
    /// A leaf of a fragment-backed container has no counterpart in the fragment
    #[error("{path} in {container} has no match in its layout fragment")]
    UnmatchedTarget { container: String, path: String },

    /// The fragment contains an item the container does not have
    #[error("fragment of {container} has unused item {path}")]
    UnusedFragmentContent { container: String, path: String },

    /// A module declares a fragment that does not exist on disk
    #[error("layout fragment for {container} not found at {}", .path.display())]
    FragmentNotFound { container: String, path: PathBuf },

    /// A net pin references a component that is not on the board
    #[error("net {net} references missing component {reference}")]
    MissingComponent { net: String, reference: String },
}

impl SyncWarning {
    pub fn severity(&self) -> Severity {
        match self {
            Self::UnusedFragmentContent { .. } => Severity::Info,
            _ => Severity::Warning,
        }
    }
}
