//! Layout fragment matching
//!
//! A module may point at a previously laid out fragment of itself. When the
//! module's container is new on the board, the placement of every fragment
//! footprint is copied onto the footprint with the same path relative to the
//! container, and the container becomes a rigid pre-placed unit.

use std::collections::{BTreeMap, VecDeque};

use crate::board::Board;
use crate::context::RunContext;
use crate::error::{SyncError, SyncWarning};
use crate::netlist::Netlist;
use crate::vtree::{build_tree, LayoutTree, NodeId};

/// Result of matching one container against its fragment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSummary {
    pub matched: usize,
    /// Target leaf names without a fragment counterpart
    pub unmatched_targets: Vec<String>,
    /// Fragment leaf names without a target
    pub unused_sources: Vec<String>,
}

impl MatchSummary {
    pub fn synced(&self) -> bool {
        self.matched > 0
    }
}

/// Apply layout fragments to every newly added module container.
///
/// Traversal is breadth-first from the root. A container that has a fragment
/// on disk is not descended into; one whose fragment is missing is reported
/// and its children are visited as usual.
pub fn sync_fragments(
    board: &mut Board,
    netlist: &Netlist,
    ctx: &mut RunContext,
) -> Result<(), SyncError> {
    let mut tree = std::mem::take(&mut ctx.state.tree);
    let result = walk_containers(&mut tree, board, netlist, ctx);
    ctx.state.tree = tree;
    result
}

fn walk_containers(
    tree: &mut LayoutTree,
    board: &mut Board,
    netlist: &Netlist,
    ctx: &mut RunContext,
) -> Result<(), SyncError> {
    let mut queue: VecDeque<NodeId> = tree.sorted_children(tree.root()).into();

    while let Some(id) = queue.pop_front() {
        let node = tree.node(id);
        if !node.is_container() {
            continue;
        }

        let layout_path = netlist
            .module(&node.ident)
            .and_then(|m| m.layout_path.as_deref());
        if let (true, Some(layout_path)) = (tree.is_added(id), layout_path) {
            let file = ctx.fragment_file(layout_path);
            if file.exists() {
                tracing::info!("syncing {} from {}", node.ident, file.display());
                let fragment = Board::load(&file)?;
                match_container(tree, id, board, &fragment, ctx);
                continue;
            }
            ctx.diagnostics.push(SyncWarning::FragmentNotFound {
                container: node.ident.clone(),
                path: file,
            });
        }

        queue.extend(tree.sorted_children(id));
    }

    Ok(())
}

/// Key of a target leaf relative to its container, `None` if it lies outside
fn relative_key<'a>(container: &str, name: &'a str) -> Option<&'a str> {
    if name == container {
        return Some("");
    }
    name.strip_prefix(container)
        .and_then(|rest| rest.strip_prefix('.'))
}

/// Copy fragment placements onto the leaves of one container.
///
/// Marks the container synced when at least one leaf matched.
pub fn match_container(
    tree: &mut LayoutTree,
    container: NodeId,
    board: &mut Board,
    fragment: &Board,
    ctx: &mut RunContext,
) -> MatchSummary {
    let ident = tree.node(container).ident.clone();

    let mut targets: BTreeMap<String, NodeId> = BTreeMap::new();
    for leaf in tree.leaves_under(container) {
        if let Some(key) = relative_key(&ident, &tree.node(leaf).name) {
            targets.insert(key.to_string(), leaf);
        }
    }

    let fragment_tree = build_tree(fragment);
    let mut sources: BTreeMap<String, String> = BTreeMap::new();
    for leaf in fragment_tree.leaves_under(fragment_tree.root()) {
        let node = fragment_tree.node(leaf);
        if let Some(unit) = node.unit() {
            sources.insert(node.name.clone(), unit.to_string());
        }
    }

    let mut summary = MatchSummary::default();
    for (key, leaf) in &targets {
        let Some(unit) = tree.node(*leaf).unit() else {
            continue;
        };
        let source = sources.get(key).and_then(|uuid| fragment.footprint(uuid));
        match (source, board.footprint_mut(unit)) {
            (Some(source), Some(target)) => {
                tracing::debug!("{}: placing {} from fragment", ident, key);
                target.copy_placement_from(source);
                tree.invalidate(*leaf);
                summary.matched += 1;
            }
            (None, Some(_)) => {
                ctx.state.track_orphan(&ident, unit);
                ctx.diagnostics.push(SyncWarning::UnmatchedTarget {
                    container: ident.clone(),
                    path: tree.node(*leaf).name.clone(),
                });
                summary.unmatched_targets.push(tree.node(*leaf).name.clone());
            }
            (_, None) => {}
        }
    }

    for key in sources.keys().filter(|k| !targets.contains_key(*k)) {
        ctx.diagnostics.push(SyncWarning::UnusedFragmentContent {
            container: ident.clone(),
            path: key.clone(),
        });
        summary.unused_sources.push(key.clone());
    }

    if summary.synced() {
        tree.set_synced(container, true);
        ctx.state.synced_paths.insert(ident.clone());
    }
    tracing::info!(
        "{}: {} matched, {} unmatched, {} unused",
        ident,
        summary.matched,
        summary.unmatched_targets.len(),
        summary.unused_sources.len()
    );
    summary
}
