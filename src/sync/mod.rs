//! Netlist import: reconcile the board with the logical design
//!
//! Import runs in fixed stages: footprints (remove, add, update), nets,
//! groups, then the layout tree is rebuilt from the resulting board and every
//! footprint added in this run is flagged on it.

mod footprints;
mod groups;
mod nets;

pub use footprints::configure_footprint;
pub use groups::plan_groups;

use std::collections::{BTreeMap, BTreeSet};

use crate::board::Board;
use crate::context::RunContext;
use crate::error::SyncError;
use crate::library::FootprintResolver;
use crate::netlist::Netlist;
use crate::vtree::{build_tree, LayoutTree};

/// What the run knows about one footprint it touched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRecord {
    pub uuid: String,
    pub path: String,
    pub reference: String,
}

/// Mutable state shared by the stages of one run
#[derive(Debug, Default)]
pub struct SyncState {
    /// Footprints added or updated in this run, by uuid
    pub components: BTreeMap<String, ComponentRecord>,
    pub removed: BTreeSet<String>,
    pub added: BTreeSet<String>,
    pub updated: BTreeSet<String>,
    /// Container path -> uuids of target footprints its fragment did not cover
    pub orphans_by_container: BTreeMap<String, Vec<String>>,
    /// Containers whose placement came from a layout fragment
    pub synced_paths: BTreeSet<String>,
    pub tree: LayoutTree,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track_removed(&mut self, uuid: &str) {
        self.removed.insert(uuid.to_string());
        self.components.remove(uuid);
    }

    pub fn track_added(&mut self, record: ComponentRecord) {
        self.added.insert(record.uuid.clone());
        self.components.insert(record.uuid.clone(), record);
    }

    pub fn track_updated(&mut self, record: ComponentRecord) {
        self.updated.insert(record.uuid.clone());
        self.components.insert(record.uuid.clone(), record);
    }

    pub fn track_orphan(&mut self, container: &str, uuid: &str) {
        self.orphans_by_container
            .entry(container.to_string())
            .or_default()
            .push(uuid.to_string());
    }

    /// Records whose path starts with `prefix`
    pub fn records_by_path_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = &'a ComponentRecord> + 'a {
        self.components
            .values()
            .filter(move |r| r.path.starts_with(prefix))
    }

    /// Records of footprints added in this run
    pub fn newly_added(&self) -> impl Iterator<Item = &ComponentRecord> + '_ {
        self.added.iter().filter_map(|uuid| self.components.get(uuid))
    }
}

/// Three-way split of board identifiers against netlist identifiers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdDelta {
    /// On the board only
    pub stale: BTreeSet<String>,
    /// In the netlist only
    pub missing: BTreeSet<String>,
    /// In both
    pub present: BTreeSet<String>,
}

pub fn diff_ids(board: &BTreeSet<String>, netlist: &BTreeSet<String>) -> IdDelta {
    IdDelta {
        stale: board.difference(netlist).cloned().collect(),
        missing: netlist.difference(board).cloned().collect(),
        present: board.intersection(netlist).cloned().collect(),
    }
}

/// Bring the board in line with the netlist and rebuild the layout tree.
///
/// A footprint that cannot be resolved aborts the import; everything done
/// before that point stays on the board.
pub fn import_netlist<R: FootprintResolver + ?Sized>(
    board: &mut Board,
    netlist: &Netlist,
    resolver: &R,
    ctx: &mut RunContext,
) -> Result<(), SyncError> {
    footprints::sync_footprints(board, netlist, resolver, &mut ctx.state)?;
    nets::sync_nets(board, netlist, &mut ctx.diagnostics);
    groups::sync_groups(board, netlist);

    let mut tree = build_tree(board);
    for uuid in &ctx.state.added {
        if let Some(leaf) = tree.find_by_id(uuid) {
            tree.set_added(leaf, true);
        }
    }
    tracing::debug!("layout tree after import:\n{}", tree.render(board));
    ctx.state.tree = tree;

    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::board::{Footprint, Side};
    use crate::config::SyncConfig;
    use crate::geometry::Rect;
    use crate::library::{FootprintTemplate, StaticLibrary};
    use crate::netlist::{component_uuid, Component, Net};

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn library() -> StaticLibrary {
        StaticLibrary::new().with(
            "Lib:R",
            FootprintTemplate {
                courtyard: Some(Rect::new(-1_000_000, -500_000, 2_000_000, 1_000_000)),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_diff_ids() {
        let delta = diff_ids(&set(&["1", "2", "3"]), &set(&["2", "3", "4"]));
        assert_eq!(
            delta,
            IdDelta {
                stale: set(&["1"]),
                missing: set(&["4"]),
                present: set(&["2", "3"]),
            }
        );
    }

    #[test]
    fn test_import_adds_updates_and_removes() {
        let kept = Component::new("R2", "Power.R2", "Lib:R").with_value("10k");
        let mut board = Board::new();
        let mut stale = Footprint::new("stale", "Lib:R", "R9");
        stale.side = Side::Back;
        board.add_footprint(stale);
        board.add_footprint(Footprint::new(kept.uuid.clone(), "Lib:R", "R2"));

        let netlist = Netlist::new()
            .with_component(Component::new("R1", "Power.R1", "Lib:R"))
            .with_component(kept.clone())
            .with_net(Net::new("GND").with_node("R1", "1"));

        let mut ctx = RunContext::new(SyncConfig::default(), ".");
        import_netlist(&mut board, &netlist, &library(), &mut ctx).unwrap();

        let r1 = component_uuid("Power.R1");
        assert_eq!(ctx.state.removed, set(&["stale"]));
        assert_eq!(ctx.state.added, set(&[r1.as_str()]));
        assert_eq!(ctx.state.updated, set(&[kept.uuid.as_str()]));
        assert!(board.footprint("stale").is_none());
        assert_eq!(board.footprint(&kept.uuid).unwrap().value, "10k");
        assert!(board.nets.contains("GND"));

        let tree = &ctx.state.tree;
        let leaf = tree.leaf_for_unit(&r1).unwrap();
        assert!(tree.is_added(leaf));
        let kept_leaf = tree.leaf_for_unit(&kept.uuid).unwrap();
        assert!(!tree.is_added(kept_leaf));

        let power = tree.find_by_id("Power").unwrap();
        assert_eq!(tree.node(leaf).parent(), Some(power));
        assert_eq!(
            ctx.state.newly_added().map(|r| r.reference.as_str()).collect::<Vec<_>>(),
            vec!["R1"]
        );
        assert_eq!(ctx.state.records_by_path_prefix("Power.").count(), 2);
    }

    #[test]
    fn test_unresolvable_footprint_aborts() {
        let netlist =
            Netlist::new().with_component(Component::new("U1", "U1", "Missing:Chip"));
        let mut board = Board::new();
        let mut ctx = RunContext::new(SyncConfig::default(), ".");
        let err = import_netlist(&mut board, &netlist, &library(), &mut ctx).unwrap_err();
        assert!(matches!(err, SyncError::Resolution { ref reference, .. } if reference == "U1"));
    }
}
