//! Layout Sync - keep a board layout in step with a hierarchical netlist
//!
//! This library reconciles a persisted board document with a netlist of
//! components, nets and modules, copies pre-authored layout fragments onto
//! newly introduced modules, and packs every new item next to the existing
//! content.
//!
//! # Example
//!
//! ```rust
//! use layout_sync::board::Board;
//! use layout_sync::geometry::Rect;
//! use layout_sync::library::{FootprintTemplate, StaticLibrary};
//! use layout_sync::netlist::{Component, Netlist};
//! use layout_sync::{synchronize, RunContext, SyncConfig};
//!
//! let netlist = Netlist::new()
//!     .with_component(Component::new("R1", "Power.R1", "Lib:R"))
//!     .with_component(Component::new("R2", "Power.R2", "Lib:R"));
//! let resistor = FootprintTemplate {
//!     courtyard: Some(Rect::new(-800_000, -400_000, 1_600_000, 800_000)),
//!     ..Default::default()
//! };
//! let library = StaticLibrary::new().with("Lib:R", resistor);
//!
//! let mut board = Board::new();
//! let mut ctx = RunContext::new(SyncConfig::default(), ".");
//! let report = synchronize(&mut board, &netlist, &library, &mut ctx).unwrap();
//!
//! assert_eq!(report.added.len(), 2);
//! assert!(board.group("Power").is_some());
//! ```

pub mod board;
pub mod config;
pub mod context;
pub mod error;
pub mod fragment;
pub mod geometry;
pub mod library;
pub mod netlist;
pub mod placement;
pub mod snapshot;
pub mod sync;
pub mod vtree;

pub use config::SyncConfig;
pub use context::{Diagnostics, RunContext};
pub use error::{Severity, SyncError, SyncWarning};
pub use placement::{PlacementConfig, PlacementOutcome};

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

use board::{Board, FAB_LAYERS};
use library::{FootprintResolver, LibraryTable};
use netlist::Netlist;

/// Name of the KiCad-style library table looked up next to the board
pub const FP_LIB_TABLE: &str = "fp-lib-table";

/// Summary of one synchronization run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
    pub updated: BTreeSet<String>,
    /// Containers placed from a layout fragment
    pub synced: BTreeSet<String>,
    pub orphans_by_container: BTreeMap<String, Vec<String>>,
    pub placement: Option<PlacementOutcome>,
    pub diagnostics: Vec<SyncWarning>,
}

impl RunReport {
    /// Warnings of `Warning` severity
    pub fn warnings(&self) -> impl Iterator<Item = &SyncWarning> {
        self.diagnostics
            .iter()
            .filter(|w| w.severity() == Severity::Warning)
    }
}

/// Run `f` inside an info span, logging how long it took
fn stage<T>(name: &'static str, f: impl FnOnce() -> T) -> T {
    let span = tracing::info_span!("stage", name);
    let _guard = span.enter();
    let start = Instant::now();
    let out = f();
    tracing::info!("{} took {:.3} seconds", name, start.elapsed().as_secs_f64());
    out
}

/// Hide layers that never take part in placement
pub fn setup_board(board: &mut Board) {
    for layer in FAB_LAYERS {
        board.hide_layer(layer);
    }
}

/// Synchronize `board` with `netlist` and place everything new.
///
/// Stages run in order: board setup, netlist import, fragment matching and
/// placement. A fatal error stops the run; stages that already completed
/// leave their changes on the board.
pub fn synchronize<R: FootprintResolver + ?Sized>(
    board: &mut Board,
    netlist: &Netlist,
    resolver: &R,
    ctx: &mut RunContext,
) -> Result<RunReport, SyncError> {
    stage("setup", || setup_board(board));
    stage("import", || sync::import_netlist(board, netlist, resolver, ctx))?;
    stage("fragments", || fragment::sync_fragments(board, netlist, ctx))?;
    let placement = stage("placement", || {
        placement::place_new_items(&ctx.state.tree, board, &ctx.config.placement)
    })?;

    let state = &ctx.state;
    Ok(RunReport {
        added: state.added.clone(),
        removed: state.removed.clone(),
        updated: state.updated.clone(),
        synced: state.synced_paths.clone(),
        orphans_by_container: state.orphans_by_container.clone(),
        placement,
        diagnostics: ctx.diagnostics.entries().to_vec(),
    })
}

/// Inputs of a command-line run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub netlist: PathBuf,
    pub output: PathBuf,
    pub snapshot: Option<PathBuf>,
    /// Skip synchronization and only export the snapshot
    pub only_snapshot: bool,
    pub config: Option<PathBuf>,
}

impl RunOptions {
    pub fn new(netlist: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            netlist: netlist.into(),
            output: output.into(),
            ..Self::default()
        }
    }

    pub fn with_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot = Some(path.into());
        self
    }

    pub fn with_only_snapshot(mut self, only: bool) -> Self {
        self.only_snapshot = only;
        self
    }

    pub fn with_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.config = Some(path.into());
        self
    }
}

fn board_dir(output: &Path) -> PathBuf {
    match output.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Load everything from disk, synchronize, and save the results.
///
/// Returns `None` in snapshot-only mode.
pub fn run(options: &RunOptions) -> Result<Option<RunReport>, SyncError> {
    let config = match &options.config {
        Some(path) => SyncConfig::from_file(path)?,
        None => SyncConfig::default(),
    };

    let (mut board, created) = Board::load_or_create(&options.output)?;
    if created {
        tracing::info!("created empty board {}", options.output.display());
    }

    if options.only_snapshot {
        match &options.snapshot {
            Some(path) => stage("snapshot", || snapshot::write_snapshot(&board, path))?,
            None => tracing::warn!("snapshot-only run without a snapshot path"),
        }
        return Ok(None);
    }

    let netlist = stage("netlist", || Netlist::from_file(&options.netlist))?;
    let dir = board_dir(&options.output);

    let mut libraries: LibraryTable = config.library_table();
    libraries.load_fp_lib_table(&dir.join(FP_LIB_TABLE))?;

    let mut ctx = RunContext::new(config, dir);
    let report = synchronize(&mut board, &netlist, &libraries, &mut ctx)?;

    if let Some(path) = &options.snapshot {
        stage("snapshot", || snapshot::write_snapshot(&board, path))?;
    }
    stage("save", || board.save(&options.output))?;

    tracing::info!(
        "{} added, {} removed, {} updated, {} warnings",
        report.added.len(),
        report.removed.len(),
        report.updated.len(),
        report.warnings().count()
    );
    Ok(Some(report))
}
