//! Group stage: mirror the module hierarchy as board groups

use std::collections::{BTreeMap, BTreeSet};

use crate::board::{Board, Group};
use crate::netlist::Netlist;

/// Every dotted prefix of `path`, longest first
fn prefixes_longest_first(path: &str) -> impl Iterator<Item = &str> {
    std::iter::once(path).chain(path.rmatch_indices('.').map(move |(idx, _)| &path[..idx]))
}

/// Hierarchical paths that deserve a group.
///
/// A path gets a group when it would have more than one direct child,
/// counting both components at that exact path and child paths.
pub fn plan_groups(netlist: &Netlist) -> BTreeSet<String> {
    let mut parts_at: BTreeMap<&str, usize> = BTreeMap::new();
    let mut all_paths: BTreeSet<&str> = BTreeSet::new();
    for component in &netlist.components {
        let path = component.path.as_str();
        if path.is_empty() {
            continue;
        }
        *parts_at.entry(path).or_default() += 1;
        all_paths.extend(prefixes_longest_first(path));
    }

    let mut child_paths: BTreeMap<&str, usize> = BTreeMap::new();
    for path in &all_paths {
        if let Some((parent, _)) = path.rsplit_once('.') {
            *child_paths.entry(parent).or_default() += 1;
        }
    }

    all_paths
        .iter()
        .filter(|path| {
            let count = parts_at.get(*path).copied().unwrap_or(0)
                + child_paths.get(*path).copied().unwrap_or(0);
            if count > 1 {
                tracing::debug!("will create group {} with {} children", path, count);
            }
            count > 1
        })
        .map(|path| path.to_string())
        .collect()
}

/// Nesting depth of a group through its parent links
fn group_depth(board: &Board, name: &str) -> usize {
    let mut depth = 0;
    let mut current = board.group(name).and_then(|g| g.parent.clone());
    while let Some(parent) = current {
        depth += 1;
        if depth > board.groups.len() {
            break;
        }
        current = board.group(&parent).and_then(|g| g.parent.clone());
    }
    depth
}

pub(super) fn sync_groups(board: &mut Board, netlist: &Netlist) {
    let planned = plan_groups(netlist);

    // sorted order puts parents before children
    for path in &planned {
        if board.group(path).is_some() {
            tracing::info!("using existing group {}", path);
            continue;
        }
        let mut group = Group::new(path.clone());
        group.parent = prefixes_longest_first(path)
            .skip(1)
            .find(|prefix| planned.contains(*prefix))
            .map(str::to_string);
        tracing::info!("created group {}", path);
        board.add_group(group);
    }

    for component in &netlist.components {
        if component.path.is_empty() || board.footprint(&component.uuid).is_none() {
            continue;
        }
        let best = prefixes_longest_first(&component.path).find(|p| planned.contains(*p));
        if let Some(best) = best {
            board.set_footprint_group(&component.uuid, Some(best));
            tracing::debug!("added {} to group {}", component.reference, best);
        }
    }

    let mut candidates: Vec<(usize, String)> = board
        .groups
        .iter()
        .map(|g| (group_depth(board, &g.name), g.name.clone()))
        .collect();
    candidates.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    for (_, name) in candidates {
        if board.group_member_count(&name) == 0 {
            tracing::info!("removing empty group {}", name);
            board.remove_group(&name);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::board::Footprint;
    use crate::netlist::Component;

    fn names(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    fn board_for(netlist: &Netlist) -> Board {
        let mut board = Board::new();
        for c in &netlist.components {
            board.add_footprint(Footprint::new(c.uuid.clone(), "Lib:R", c.reference.clone()));
        }
        board
    }

    #[test]
    fn test_single_child_path_gets_no_group() {
        let netlist = Netlist::new()
            .with_component(Component::new("R1", "Power.R1", "Lib:R"))
            .with_component(Component::new("R2", "Power.R2", "Lib:R"))
            .with_component(Component::new("C1", "Filter.C1", "Lib:C"));
        assert_eq!(names(&plan_groups(&netlist)), vec!["Power"]);
    }

    #[test]
    fn test_nested_groups_link_to_nearest_planned_ancestor() {
        let netlist = Netlist::new()
            .with_component(Component::new("R1", "Top.Mid.Reg.R1", "Lib:R"))
            .with_component(Component::new("R2", "Top.Mid.Reg.R2", "Lib:R"))
            .with_component(Component::new("R3", "Top.R3", "Lib:R"));
        assert_eq!(names(&plan_groups(&netlist)), vec!["Top", "Top.Mid.Reg"]);

        let mut board = board_for(&netlist);
        sync_groups(&mut board, &netlist);
        assert_eq!(board.group("Top.Mid.Reg").unwrap().parent.as_deref(), Some("Top"));
        let r1 = &netlist.components[0].uuid;
        let r3 = &netlist.components[2].uuid;
        assert_eq!(board.footprint(r1).unwrap().group.as_deref(), Some("Top.Mid.Reg"));
        assert_eq!(board.footprint(r3).unwrap().group.as_deref(), Some("Top"));
    }

    #[test]
    fn test_existing_group_is_reused_and_empty_groups_removed() {
        let netlist = Netlist::new()
            .with_component(Component::new("R1", "Power.R1", "Lib:R"))
            .with_component(Component::new("R2", "Power.R2", "Lib:R"));
        let mut board = board_for(&netlist);
        let mut existing = Group::new("Power");
        existing.locked = true;
        board.add_group(existing);
        board.add_group(Group::new("Old"));
        let mut nested = Group::new("Old.Inner");
        nested.parent = Some("Old".into());
        board.add_group(nested);

        sync_groups(&mut board, &netlist);
        assert_eq!(board.groups.len(), 1);
        assert!(board.group("Power").unwrap().locked);
        assert_eq!(board.group_member_count("Power"), 2);
    }
}
