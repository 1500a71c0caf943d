//! Run-scoped context passed through every stage

use std::path::{Path, PathBuf};

use crate::config::SyncConfig;
use crate::error::{Severity, SyncWarning};
use crate::sync::SyncState;

/// Collector for non-fatal conditions.
///
/// Every recorded warning is also emitted as a tracing event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<SyncWarning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: SyncWarning) {
        match warning.severity() {
            Severity::Warning => tracing::warn!("{}", warning),
            Severity::Info => tracing::info!("{}", warning),
        }
        self.entries.push(warning);
    }

    pub fn entries(&self) -> &[SyncWarning] {
        &self.entries
    }

    /// Entries of `Warning` severity
    pub fn warnings(&self) -> impl Iterator<Item = &SyncWarning> {
        self.entries
            .iter()
            .filter(|w| w.severity() == Severity::Warning)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything one synchronization run needs besides the documents
#[derive(Debug)]
pub struct RunContext {
    pub config: SyncConfig,
    /// Directory of the output board; relative fragment paths resolve here
    pub board_dir: PathBuf,
    pub state: SyncState,
    pub diagnostics: Diagnostics,
}

impl RunContext {
    pub fn new(config: SyncConfig, board_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            board_dir: board_dir.into(),
            state: SyncState::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Where the fragment of a module with `layout_path` lives
    pub fn fragment_file(&self, layout_path: &str) -> PathBuf {
        let dir = Path::new(layout_path);
        let dir = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.board_dir.join(dir)
        };
        dir.join(&self.config.fragments.file_name)
    }
}
