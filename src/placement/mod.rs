//! Placement of newly added items
//!
//! The tree is walked depth first. Every container packs the new content
//! found below it with the corner-point algorithm, bottom up, so that a
//! module's parts are arranged before the module itself is arranged among
//! its siblings. Containers whose geometry came from a fragment are moved as
//! a whole and never looked into. Finally all new content is translated as
//! one block next to the content that was already on the board.

mod config;
mod error;
mod pack;

pub use config::PlacementConfig;
pub use error::PlacementError;
pub use pack::{pack, PackItem};

use crate::geometry::{Point, Rect};
use crate::vtree::{LayoutHost, LayoutTree, NodeId};

/// Sparse view over the nodes placed in this run.
///
/// Groups only hold the children that were placed; they never re-parent the
/// live tree's nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placed {
    Node(NodeId),
    Group {
        ident: String,
        name: String,
        children: Vec<Placed>,
    },
}

impl Placed {
    pub fn name<'a>(&'a self, tree: &'a LayoutTree) -> &'a str {
        match self {
            Placed::Node(id) => &tree.node(*id).name,
            Placed::Group { name, .. } => name,
        }
    }

    pub fn ident<'a>(&'a self, tree: &'a LayoutTree) -> &'a str {
        match self {
            Placed::Node(id) => &tree.node(*id).ident,
            Placed::Group { ident, .. } => ident,
        }
    }

    fn is_group(&self, tree: &LayoutTree) -> bool {
        match self {
            Placed::Node(id) => tree.node(*id).is_container(),
            Placed::Group { .. } => true,
        }
    }

    pub fn bbox<H: LayoutHost + ?Sized>(&self, tree: &LayoutTree, host: &H) -> Option<Rect> {
        match self {
            Placed::Node(id) => tree.bbox(*id, host),
            Placed::Group { children, .. } => {
                Rect::union_all(children.iter().filter_map(|c| c.bbox(tree, host)))
            }
        }
    }

    pub fn move_by<H: LayoutHost + ?Sized>(&self, tree: &LayoutTree, dx: i64, dy: i64, host: &mut H) {
        match self {
            Placed::Node(id) => tree.move_by(*id, dx, dy, host),
            Placed::Group { children, .. } => {
                for child in children {
                    child.move_by(tree, dx, dy, host);
                }
            }
        }
    }

    fn render<H: LayoutHost + ?Sized>(&self, tree: &LayoutTree, host: &H, depth: usize, out: &mut Vec<String>) {
        let bbox = self
            .bbox(tree, host)
            .map(|b| b.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push(format!("{}{} {}", "  ".repeat(depth), self.name(tree), bbox));
        if let Placed::Group { children, .. } = self {
            for child in children {
                child.render(tree, host, depth + 1, out);
            }
        }
    }
}

/// Summary of a placement pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementOutcome {
    /// Names of the top-level placed nodes
    pub top_level: Vec<String>,
    /// Translation applied to the whole block of new content
    pub offset: Point,
    /// Final box of all new content
    pub bbox: Rect,
}

/// Place every added item of the tree.
///
/// Returns `None` when nothing new needed placing.
pub fn place_new_items<H: LayoutHost + ?Sized>(
    tree: &LayoutTree,
    host: &mut H,
    config: &PlacementConfig,
) -> Result<Option<PlacementOutcome>, PlacementError> {
    let Some(sparse) = place_subtree(tree, tree.root(), host, config)? else {
        tracing::info!("no items were placed");
        return Ok(None);
    };

    let mut top_level = match sparse {
        Placed::Group { children, .. } => children,
        node => vec![node],
    };
    top_level.sort_by(|a, b| {
        (a.name(tree), a.ident(tree)).cmp(&(b.name(tree), b.ident(tree)))
    });

    let Some(added_bbox) = Rect::union_all(top_level.iter().filter_map(|p| p.bbox(tree, host)))
    else {
        tracing::info!("no bounding boxes found for added items");
        return Ok(None);
    };

    let existing = existing_bbox(tree, tree.root(), host);
    let (target_x, target_y) = match existing {
        Some(existing) => (
            existing.right() + config.existing_margin + added_bbox.width / 2,
            existing.center_y(),
        ),
        None => (config.canvas_width / 2, config.canvas_height / 2),
    };
    let offset = Point::new(target_x - added_bbox.center_x(), target_y - added_bbox.center_y());

    for item in &top_level {
        item.move_by(tree, offset.x, offset.y, host);
    }
    tracing::info!("positioned new content with offset ({}, {})", offset.x, offset.y);

    Ok(Some(PlacementOutcome {
        top_level: top_level.iter().map(|p| p.name(tree).to_string()).collect(),
        offset,
        bbox: added_bbox.translate(offset.x, offset.y),
    }))
}

/// Bottom-up placement of one subtree; returns the sparse view of what was
/// placed below `id`.
fn place_subtree<H: LayoutHost + ?Sized>(
    tree: &LayoutTree,
    id: NodeId,
    host: &mut H,
    config: &PlacementConfig,
) -> Result<Option<Placed>, PlacementError> {
    let node = tree.node(id);
    if node.is_leaf() || (id != tree.root() && tree.is_synced(id)) {
        return Ok(tree.is_added(id).then_some(Placed::Node(id)));
    }

    let mut placed = Vec::new();
    for child in tree.sorted_children(id) {
        if let Some(sub) = place_subtree(tree, child, host, config)? {
            placed.push(sub);
        }
    }
    if placed.is_empty() {
        return Ok(None);
    }

    tracing::info!("placing {} items in group {}", placed.len(), node.name);
    if tracing::enabled!(tracing::Level::DEBUG) {
        let mut lines = Vec::new();
        for child in &placed {
            child.render(tree, host, 1, &mut lines);
        }
        tracing::debug!("\n{}", lines.join("\n"));
    }

    pack_placed(tree, &placed, host, config)?;

    Ok(Some(Placed::Group {
        ident: node.ident.clone(),
        name: node.name.clone(),
        children: placed,
    }))
}

/// Arrange sibling placed nodes with corner-point packing
fn pack_placed<H: LayoutHost + ?Sized>(
    tree: &LayoutTree,
    items: &[Placed],
    host: &mut H,
    config: &PlacementConfig,
) -> Result<(), PlacementError> {
    let boxed: Vec<(&Placed, Rect)> = items
        .iter()
        .filter_map(|p| p.bbox(tree, host).map(|b| (p, b)))
        .collect();

    let pack_items: Vec<PackItem> = boxed
        .iter()
        .map(|(p, bbox)| {
            PackItem::new(p.name(tree), p.ident(tree), *bbox)
                .with_clearance(config.clearance(p.is_group(tree)))
        })
        .collect();

    let arranged = pack(&pack_items)?;
    for ((item, old), new) in boxed.iter().zip(arranged) {
        item.move_by(tree, new.x - old.x, new.y - old.y, host);
    }
    Ok(())
}

/// Union of pre-existing leaves, not descending into added containers
fn existing_bbox<H: LayoutHost + ?Sized>(tree: &LayoutTree, id: NodeId, host: &H) -> Option<Rect> {
    if tree.is_added(id) {
        return None;
    }
    if tree.node(id).is_leaf() {
        return tree.bbox(id, host);
    }
    Rect::union_all(
        tree.sorted_children(id)
            .into_iter()
            .filter_map(|child| existing_bbox(tree, child, host)),
    )
}
