//! Build a layout tree from a host's flat item list

use std::collections::{BTreeMap, BTreeSet};

use super::{LayoutHost, LayoutTree, NodeId};

/// Every dotted prefix of `path`, shortest first
fn prefixes(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('.')
        .map(move |(idx, _)| &path[..idx])
        .chain(std::iter::once(path))
}

/// Infer the container hierarchy from the units' paths and hang every unit
/// under its most specific container.
///
/// A path prefix becomes a container when some other prefix lies below it.
/// Paths and units are processed in sorted order so that the same document
/// always yields the same tree.
pub fn build_tree<H: LayoutHost + ?Sized>(host: &H) -> LayoutTree {
    let mut units = host.placement_units();
    units.sort_by(|a, b| a.id.cmp(&b.id));

    let mut all_paths: BTreeSet<&str> = BTreeSet::new();
    for unit in &units {
        if let Some(path) = unit.path.as_deref().filter(|p| !p.is_empty()) {
            all_paths.extend(prefixes(path));
        }
    }

    let container_paths: Vec<&str> = all_paths
        .iter()
        .copied()
        .filter(|path| {
            let nested = format!("{}.", path);
            all_paths.iter().any(|p| p.starts_with(&nested))
        })
        .collect();

    let mut tree = LayoutTree::new();
    let root = tree.root();

    let mut containers: BTreeMap<&str, NodeId> = BTreeMap::new();
    for path in &container_paths {
        containers.insert(*path, tree.new_container(*path, *path));
    }
    for path in &container_paths {
        let parent = path
            .rsplit_once('.')
            .and_then(|(parent, _)| containers.get(parent).copied())
            .unwrap_or(root);
        tree.add_child(parent, containers[path]);
    }

    for unit in &units {
        let path = unit.path.as_deref().filter(|p| !p.is_empty());
        let name = path.unwrap_or(&unit.label).to_string();
        let leaf = tree.new_leaf(unit.id.clone(), name);

        let parent = path
            .and_then(|p| {
                prefixes(p)
                    .collect::<Vec<_>>()
                    .into_iter()
                    .rev()
                    .find_map(|prefix| containers.get(prefix).copied())
            })
            .unwrap_or(root);
        tree.add_child(parent, leaf);
    }

    tree
}
