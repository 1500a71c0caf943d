//! Board document model
//!
//! The board is the persisted physical layout: footprints, groups, copper
//! zones, free drawings and nets. It is the single source of geometric truth
//! for the virtual layout tree, which reads and moves footprints through the
//! [`LayoutHost`] implementation below.

mod footprint;
mod io;

pub use footprint::{
    flip_layer_name, normalize_orientation, Field, Footprint, Graphic, Pad, Side, FAB_LAYERS,
    PATH_FIELD, STANDARD_FIELDS,
};
pub use io::DocumentError;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};
use crate::vtree::{LayoutHost, PlacementUnit};

/// A named group of board items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub locked: bool,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            locked: false,
        }
    }
}

/// A copper zone outline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net: Option<String>,
    pub layer: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub filled: bool,
    #[serde(default = "default_hatch_style")]
    pub hatch_style: String,
    #[serde(default)]
    pub min_thickness: i64,
    #[serde(default)]
    pub outline: Vec<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

fn default_hatch_style() -> String {
    "edge".to_string()
}

/// A free graphic item on the board, optionally grouped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawing {
    pub shape: Graphic,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// The whole layout document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Board {
    #[serde(default)]
    pub footprints: Vec<Footprint>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub zones: Vec<Zone>,
    #[serde(default)]
    pub drawings: Vec<Drawing>,
    #[serde(default)]
    pub nets: BTreeSet<String>,
    #[serde(default)]
    pub hidden_layers: BTreeSet<String>,
}

impl Board {
    /// Create an empty board
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Footprints ====================

    pub fn footprint(&self, uuid: &str) -> Option<&Footprint> {
        self.footprints.iter().find(|fp| fp.uuid == uuid)
    }

    pub fn footprint_mut(&mut self, uuid: &str) -> Option<&mut Footprint> {
        self.footprints.iter_mut().find(|fp| fp.uuid == uuid)
    }

    /// Find a footprint by reference designator.
    ///
    /// When several footprints share a reference the one with the smallest
    /// uuid wins, so the answer does not depend on storage order.
    pub fn footprint_by_reference_mut(&mut self, reference: &str) -> Option<&mut Footprint> {
        self.footprints
            .iter_mut()
            .filter(|fp| fp.reference == reference)
            .min_by(|a, b| a.uuid.cmp(&b.uuid))
    }

    pub fn add_footprint(&mut self, footprint: Footprint) {
        self.footprints.push(footprint);
    }

    pub fn remove_footprint(&mut self, uuid: &str) -> Option<Footprint> {
        let idx = self.footprints.iter().position(|fp| fp.uuid == uuid)?;
        Some(self.footprints.remove(idx))
    }

    /// All footprint identifiers on the board
    pub fn footprint_ids(&self) -> BTreeSet<String> {
        self.footprints.iter().map(|fp| fp.uuid.clone()).collect()
    }

    /// Move a footprint into `group`, leaving any previous group.
    pub fn set_footprint_group(&mut self, uuid: &str, group: Option<&str>) -> bool {
        match self.footprint_mut(uuid) {
            Some(fp) => {
                fp.group = group.map(str::to_string);
                true
            }
            None => false,
        }
    }

    // ==================== Groups ====================

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn add_group(&mut self, group: Group) {
        self.groups.push(group);
    }

    /// Delete a group. Its members become ungrouped.
    pub fn remove_group(&mut self, name: &str) -> Option<Group> {
        let idx = self.groups.iter().position(|g| g.name == name)?;
        let removed = self.groups.remove(idx);

        let is_member = |group: &Option<String>| group.as_deref() == Some(name);
        for fp in &mut self.footprints {
            if is_member(&fp.group) {
                fp.group = None;
            }
        }
        for zone in &mut self.zones {
            if is_member(&zone.group) {
                zone.group = None;
            }
        }
        for drawing in &mut self.drawings {
            if is_member(&drawing.group) {
                drawing.group = None;
            }
        }
        for group in &mut self.groups {
            if is_member(&group.parent) {
                group.parent = None;
            }
        }
        Some(removed)
    }

    /// Footprints that are direct members of `group`
    pub fn group_footprints<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a Footprint> + 'a {
        self.footprints
            .iter()
            .filter(move |fp| fp.group.as_deref() == Some(group))
    }

    /// Groups nested directly inside `group`
    pub fn subgroups<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a Group> + 'a {
        self.groups
            .iter()
            .filter(move |g| g.parent.as_deref() == Some(group))
    }

    /// Drawings that are direct members of `group`
    pub fn group_drawings<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a Drawing> + 'a {
        self.drawings
            .iter()
            .filter(move |d| d.group.as_deref() == Some(group))
    }

    /// Number of direct members of any kind
    pub fn group_member_count(&self, group: &str) -> usize {
        self.group_footprints(group).count()
            + self.subgroups(group).count()
            + self.group_drawings(group).count()
            + self
                .zones
                .iter()
                .filter(|z| z.group.as_deref() == Some(group))
                .count()
    }

    /// Union of the bounding boxes of every footprint in `group` and its
    /// subgroups. Each group is visited once, even if parent links cycle.
    pub fn group_bbox(&self, group: &str) -> Option<Rect> {
        let mut visited = BTreeSet::new();
        let mut pending = vec![group];
        let mut boxes = Vec::new();
        while let Some(name) = pending.pop() {
            if !visited.insert(name) {
                continue;
            }
            boxes.extend(self.group_footprints(name).map(Footprint::bounding_box));
            pending.extend(self.subgroups(name).map(|g| g.name.as_str()));
        }
        Rect::union_all(boxes)
    }

    // ==================== Nets and layers ====================

    /// Register a net; returns true if it was new
    pub fn ensure_net(&mut self, name: &str) -> bool {
        self.nets.insert(name.to_string())
    }

    pub fn hide_layer(&mut self, layer: &str) {
        self.hidden_layers.insert(layer.to_string());
    }

    pub fn is_layer_visible(&self, layer: &str) -> bool {
        !self.hidden_layers.contains(layer)
    }
}

impl LayoutHost for Board {
    fn placement_units(&self) -> Vec<PlacementUnit> {
        self.footprints
            .iter()
            .map(|fp| PlacementUnit {
                id: fp.uuid.clone(),
                path: fp.path().map(str::to_string),
                label: fp.reference.clone(),
            })
            .collect()
    }

    fn unit_bbox(&self, id: &str) -> Option<Rect> {
        self.footprint(id).map(Footprint::bounding_box)
    }

    fn translate_unit(&mut self, id: &str, dx: i64, dy: i64) {
        if let Some(fp) = self.footprint_mut(id) {
            fp.translate(dx, dy);
        }
    }
}
