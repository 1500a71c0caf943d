//! Virtual layout tree
//!
//! An arena of leaf and container nodes mirroring the items of a layout
//! document, independent of the document's own object model. Leaves point at
//! one placement unit in a [`LayoutHost`]; their boxes are always read from
//! the host. Containers memoize the union of their descendants' boxes behind
//! a dirty flag that every structural or geometric mutation clears up the
//! ancestor chain.

mod builder;

pub use builder::build_tree;

use std::cell::Cell;
use std::collections::HashMap;

use crate::geometry::Rect;

/// Identifier of the synthetic root container
pub const ROOT_ID: &str = "board";

/// One movable item in the underlying document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementUnit {
    /// Stable identifier (uuid)
    pub id: String,
    /// Dotted hierarchical path, if the item carries one
    pub path: Option<String>,
    /// Human-readable fallback name (reference designator)
    pub label: String,
}

/// The document side of the tree: enumerates units and owns their geometry
pub trait LayoutHost {
    fn placement_units(&self) -> Vec<PlacementUnit>;

    /// Current bounding box of a unit, `None` if the unit does not exist
    fn unit_bbox(&self, id: &str) -> Option<Rect>;

    fn translate_unit(&mut self, id: &str, dx: i64, dy: i64);
}

/// Index of a node in its tree's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug)]
pub enum NodeKind {
    Leaf {
        /// Identifier of the placement unit in the host
        unit: String,
        added: bool,
    },
    Container {
        children: Vec<NodeId>,
        synced: bool,
        cached_bbox: Cell<Option<Rect>>,
        dirty: Cell<bool>,
    },
}

#[derive(Debug)]
pub struct Node {
    pub ident: String,
    pub name: String,
    parent: Option<NodeId>,
    pub kind: NodeKind,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    pub fn is_container(&self) -> bool {
        matches!(self.kind, NodeKind::Container { .. })
    }

    /// Placement unit behind a leaf
    pub fn unit(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Leaf { unit, .. } => Some(unit),
            NodeKind::Container { .. } => None,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Leaf { .. } => &[],
            NodeKind::Container { children, .. } => children,
        }
    }
}

/// Arena-backed hierarchy of layout nodes
#[derive(Debug)]
pub struct LayoutTree {
    nodes: Vec<Node>,
    root: NodeId,
    leaves_by_unit: HashMap<String, NodeId>,
}

impl Default for LayoutTree {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutTree {
    /// Create a tree holding only the root container
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            leaves_by_unit: HashMap::new(),
        };
        tree.root = tree.new_container(ROOT_ID, "Board");
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    // ==================== Construction ====================

    /// Allocate a detached container
    pub fn new_container(&mut self, ident: impl Into<String>, name: impl Into<String>) -> NodeId {
        self.push(Node {
            ident: ident.into(),
            name: name.into(),
            parent: None,
            kind: NodeKind::Container {
                children: Vec::new(),
                synced: false,
                cached_bbox: Cell::new(None),
                dirty: Cell::new(true),
            },
        })
    }

    /// Allocate a detached leaf for a placement unit and register it for lookup
    pub fn new_leaf(&mut self, unit: impl Into<String>, name: impl Into<String>) -> NodeId {
        let unit = unit.into();
        let id = self.push(Node {
            ident: unit.clone(),
            name: name.into(),
            parent: None,
            kind: NodeKind::Leaf {
                unit: unit.clone(),
                added: false,
            },
        });
        self.leaves_by_unit.insert(unit, id);
        id
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Attach `child` under `parent`, detaching it from any previous parent.
    ///
    /// Panics if `parent` is a leaf or if the link would create a cycle.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        assert!(
            self.node(parent).is_container(),
            "cannot add children to leaf '{}'",
            self.node(parent).ident
        );
        assert!(
            !self.is_ancestor_or_self(child, parent),
            "linking '{}' under '{}' would create a cycle",
            self.node(child).ident,
            self.node(parent).ident
        );

        if let Some(old) = self.nodes[child.0].parent {
            self.remove_child(old, child);
        }
        if let NodeKind::Container { children, .. } = &mut self.nodes[parent.0].kind {
            children.push(child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.invalidate(parent);
    }

    /// Detach `child` from `parent`; no-op if it is not a child
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        let removed = match &mut self.nodes[parent.0].kind {
            NodeKind::Container { children, .. } => {
                let before = children.len();
                children.retain(|c| *c != child);
                before != children.len()
            }
            NodeKind::Leaf { .. } => false,
        };
        if removed {
            self.nodes[child.0].parent = None;
            self.invalidate(parent);
        }
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.node(id).parent;
        }
        false
    }

    // ==================== Flags ====================

    /// Whether the node was introduced in this run.
    ///
    /// Containers are added iff they have at least one child and every child
    /// is added.
    pub fn is_added(&self, id: NodeId) -> bool {
        match &self.node(id).kind {
            NodeKind::Leaf { added, .. } => *added,
            NodeKind::Container { children, .. } => {
                !children.is_empty() && children.iter().all(|c| self.is_added(*c))
            }
        }
    }

    /// Mark a leaf as added. Container flags are derived and cannot be set.
    pub fn set_added(&mut self, id: NodeId, value: bool) {
        if let NodeKind::Leaf { added, .. } = &mut self.nodes[id.0].kind {
            *added = value;
        }
    }

    pub fn is_synced(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Container { synced: true, .. })
    }

    pub fn set_synced(&mut self, id: NodeId, value: bool) {
        if let NodeKind::Container { synced, .. } = &mut self.nodes[id.0].kind {
            *synced = value;
        }
    }

    // ==================== Lookup ====================

    /// Depth-first search for a node by identifier
    pub fn find_by_id(&self, ident: &str) -> Option<NodeId> {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if node.ident == ident {
                return Some(id);
            }
            stack.extend(node.children().iter().rev());
        }
        None
    }

    /// Registry lookup of the leaf wrapping a placement unit
    pub fn leaf_for_unit(&self, unit: &str) -> Option<NodeId> {
        self.leaves_by_unit.get(unit).copied()
    }

    /// All leaves under `id` in depth-first order
    pub fn leaves_under(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_leaves(id, &mut out);
        out
    }

    fn collect_leaves(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let node = self.node(id);
        if node.is_leaf() {
            out.push(id);
            return;
        }
        for child in node.children() {
            self.collect_leaves(*child, out);
        }
    }

    /// Children ordered by (name, identifier)
    pub fn sorted_children(&self, id: NodeId) -> Vec<NodeId> {
        let mut children = self.node(id).children().to_vec();
        children.sort_by(|a, b| {
            let (na, nb) = (self.node(*a), self.node(*b));
            (na.name.as_str(), na.ident.as_str()).cmp(&(nb.name.as_str(), nb.ident.as_str()))
        });
        children
    }

    // ==================== Geometry ====================

    /// Bounding box of a node.
    ///
    /// Leaves ask the host every time. Containers return their memoized box
    /// unless a descendant changed since it was computed.
    pub fn bbox<H: LayoutHost + ?Sized>(&self, id: NodeId, host: &H) -> Option<Rect> {
        match &self.node(id).kind {
            NodeKind::Leaf { unit, .. } => host.unit_bbox(unit),
            NodeKind::Container {
                children,
                cached_bbox,
                dirty,
                ..
            } => {
                if !dirty.get() {
                    return cached_bbox.get();
                }
                let bbox = Rect::union_all(children.iter().filter_map(|c| self.bbox(*c, host)));
                cached_bbox.set(bbox);
                dirty.set(false);
                bbox
            }
        }
    }

    /// Mark `id` (if a container) and every ancestor as needing recomputation
    pub fn invalidate(&self, id: NodeId) {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id);
            if let NodeKind::Container { dirty, .. } = &node.kind {
                dirty.set(true);
            }
            current = node.parent;
        }
    }

    /// Translate a node and everything below it.
    ///
    /// The host sees the change immediately; cached boxes are only marked
    /// dirty.
    pub fn move_by<H: LayoutHost + ?Sized>(&self, id: NodeId, dx: i64, dy: i64, host: &mut H) {
        if dx == 0 && dy == 0 {
            return;
        }
        match &self.node(id).kind {
            NodeKind::Leaf { unit, .. } => {
                host.translate_unit(unit, dx, dy);
            }
            NodeKind::Container { children, .. } => {
                for child in children {
                    self.move_by(*child, dx, dy, host);
                }
            }
        }
        self.invalidate(id);
    }

    /// Move a node so its box's top-left corner lands on `(x, y)`
    pub fn move_to<H: LayoutHost + ?Sized>(&self, id: NodeId, x: i64, y: i64, host: &mut H) {
        if let Some(bbox) = self.bbox(id, host) {
            self.move_by(id, x - bbox.x, y - bbox.y, host);
        }
    }

    // ==================== Debug rendering ====================

    /// Indented outline of the tree with status markers and boxes
    pub fn render<H: LayoutHost + ?Sized>(&self, host: &H) -> String {
        let mut lines = Vec::new();
        self.render_node(self.root, 0, host, &mut lines);
        lines.join("\n")
    }

    fn render_node<H: LayoutHost + ?Sized>(
        &self,
        id: NodeId,
        depth: usize,
        host: &H,
        lines: &mut Vec<String>,
    ) {
        let node = self.node(id);
        let mut markers = Vec::new();
        if self.is_added(id) {
            markers.push("NEW");
        }
        if self.is_synced(id) {
            markers.push("SYNCED");
        }
        let status = if markers.is_empty() {
            String::new()
        } else {
            format!(" [{}]", markers.join(", "))
        };
        let bbox = match self.bbox(id, host) {
            Some(b) => b.to_string(),
            None => "-".to_string(),
        };
        lines.push(format!("{}{}{} {}", "  ".repeat(depth), node.name, status, bbox));
        for child in node.children() {
            self.render_node(*child, depth + 1, host, lines);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RectHost;
    use super::*;

    fn sample() -> (LayoutTree, RectHost, NodeId, NodeId, NodeId) {
        let host = RectHost::default()
            .with("a", Some("G.a"), Rect::new(0, 0, 10, 10))
            .with("b", Some("G.b"), Rect::new(20, 0, 10, 10));
        let mut tree = LayoutTree::new();
        let group = tree.new_container("G", "G");
        let a = tree.new_leaf("a", "G.a");
        let b = tree.new_leaf("b", "G.b");
        let root = tree.root();
        tree.add_child(root, group);
        tree.add_child(group, a);
        tree.add_child(group, b);
        (tree, host, group, a, b)
    }

    #[test]
    fn test_container_bbox_is_union() {
        let (tree, host, group, _, _) = sample();
        assert_eq!(tree.bbox(group, &host), Some(Rect::new(0, 0, 30, 10)));
        assert_eq!(tree.bbox(tree.root(), &host), Some(Rect::new(0, 0, 30, 10)));
    }

    #[test]
    fn test_move_invalidates_ancestors() {
        let (tree, mut host, group, a, _) = sample();
        // prime caches
        assert_eq!(tree.bbox(tree.root(), &host), Some(Rect::new(0, 0, 30, 10)));

        tree.move_by(a, 0, 50, &mut host);
        assert_eq!(host.unit_bbox("a"), Some(Rect::new(0, 50, 10, 10)));
        assert_eq!(tree.bbox(group, &host), Some(Rect::new(0, 0, 30, 60)));
        assert_eq!(tree.bbox(tree.root(), &host), Some(Rect::new(0, 0, 30, 60)));
    }

    #[test]
    fn test_structural_change_invalidates_cache() {
        let (mut tree, host, group, _, b) = sample();
        assert_eq!(tree.bbox(group, &host), Some(Rect::new(0, 0, 30, 10)));
        tree.remove_child(group, b);
        assert_eq!(tree.node(b).parent(), None);
        assert_eq!(tree.bbox(group, &host), Some(Rect::new(0, 0, 10, 10)));
    }

    #[test]
    fn test_move_container_moves_children() {
        let (tree, mut host, group, _, _) = sample();
        tree.move_to(group, 100, 200, &mut host);
        assert_eq!(host.unit_bbox("a"), Some(Rect::new(100, 200, 10, 10)));
        assert_eq!(host.unit_bbox("b"), Some(Rect::new(120, 200, 10, 10)));
        assert_eq!(tree.bbox(group, &host), Some(Rect::new(100, 200, 30, 10)));
    }

    #[test]
    fn test_added_flag_derivation() {
        let (mut tree, _, group, a, b) = sample();
        assert!(!tree.is_added(group));
        tree.set_added(a, true);
        assert!(!tree.is_added(group));
        tree.set_added(b, true);
        assert!(tree.is_added(group));

        let empty = tree.new_container("E", "E");
        assert!(!tree.is_added(empty));
        tree.set_added(empty, true);
        assert!(!tree.is_added(empty));
    }

    #[test]
    fn test_reparenting_keeps_single_parent() {
        let (mut tree, _, group, a, _) = sample();
        let other = tree.new_container("H", "H");
        let root = tree.root();
        tree.add_child(root, other);
        tree.add_child(other, a);
        assert_eq!(tree.node(a).parent(), Some(other));
        assert!(!tree.node(group).children().contains(&a));
    }

    #[test]
    fn test_find_by_id_and_registry() {
        let (tree, _, group, a, _) = sample();
        assert_eq!(tree.find_by_id("G"), Some(group));
        assert_eq!(tree.find_by_id("a"), Some(a));
        assert_eq!(tree.leaf_for_unit("a"), Some(a));
        assert_eq!(tree.find_by_id("zzz"), None);
    }

    #[test]
    #[should_panic(expected = "cycle")]
    fn test_cycle_is_rejected() {
        let (mut tree, _, group, _, _) = sample();
        let root = tree.root();
        tree.add_child(group, root);
    }

    #[test]
    fn test_render_outline() {
        let (mut tree, host, _, a, _) = sample();
        tree.set_added(a, true);
        insta::assert_snapshot!(tree.render(&host), @r"
        Board Rect(x=0, y=0, width=30, height=10)
          G Rect(x=0, y=0, width=30, height=10)
            G.a [NEW] Rect(x=0, y=0, width=10, height=10)
            G.b Rect(x=20, y=0, width=10, height=10)
        ");
    }
}
