//! Loading and saving board documents

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::Board;

/// Errors raised while reading or writing a board document
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read board {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write board {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("malformed board {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to encode board: {0}")]
    Encode(#[from] serde_json::Error),
}

impl Board {
    /// Load a board document from disk
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let content = fs::read_to_string(path).map_err(|source| DocumentError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content).map_err(|source| DocumentError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a board document from JSON text
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Serialize the board as pretty JSON
    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save the board, replacing any existing file atomically.
    ///
    /// The document is written to a sibling temporary file first and then
    /// renamed over the target.
    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        let content = self.to_json()?;
        let tmp = temp_path_for(path);
        let write_err = |source: io::Error| DocumentError::Write {
            path: path.to_path_buf(),
            source,
        };
        fs::write(&tmp, content).map_err(write_err)?;
        fs::rename(&tmp, path).map_err(write_err)?;
        Ok(())
    }

    /// Load the board at `path`, or create and save an empty one if missing
    pub fn load_or_create(path: &Path) -> Result<(Self, bool), DocumentError> {
        if path.exists() {
            return Ok((Self::load(path)?, false));
        }
        let board = Board::new();
        board.save(path)?;
        Ok((board, true))
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
