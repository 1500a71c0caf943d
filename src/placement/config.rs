//! Configuration for the placement engine

use serde::Deserialize;

use crate::geometry::MM;

/// Tunables for packing and global repositioning
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Clearance between sibling footprints
    pub footprint_spacing: i64,

    /// Clearance between sibling groups
    pub group_spacing: i64,

    /// Inflate boxes by the clearance when checking collisions
    pub inflate_boxes: bool,

    /// Gap between existing content and newly placed content
    pub existing_margin: i64,

    /// Canvas used to center new content on an empty board
    pub canvas_width: i64,
    pub canvas_height: i64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            footprint_spacing: 350_000,
            group_spacing: 5 * 350_000,
            inflate_boxes: false,
            existing_margin: 10 * MM,
            canvas_width: 297 * MM,
            canvas_height: 210 * MM,
        }
    }
}

impl PlacementConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the clearances between footprints and between groups
    pub fn with_spacing(mut self, footprint: i64, group: i64) -> Self {
        self.footprint_spacing = footprint;
        self.group_spacing = group;
        self
    }

    /// Enable or disable clearance inflation during collision checks
    pub fn with_inflate_boxes(mut self, inflate: bool) -> Self {
        self.inflate_boxes = inflate;
        self
    }

    pub fn with_existing_margin(mut self, margin: i64) -> Self {
        self.existing_margin = margin;
        self
    }

    /// Set the canvas size used for an otherwise empty board
    pub fn with_canvas(mut self, width: i64, height: i64) -> Self {
        self.canvas_width = width;
        self.canvas_height = height;
        self
    }

    /// Clearance of an item; zero unless inflation is enabled
    pub fn clearance(&self, is_group: bool) -> i64 {
        match (self.inflate_boxes, is_group) {
            (false, _) => 0,
            (true, false) => self.footprint_spacing,
            (true, true) => self.group_spacing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PlacementConfig::default();
        assert_eq!(config.footprint_spacing, 350_000);
        assert_eq!(config.group_spacing, 1_750_000);
        assert_eq!(config.existing_margin, 10_000_000);
        assert_eq!((config.canvas_width, config.canvas_height), (297_000_000, 210_000_000));
        assert!(!config.inflate_boxes);
    }

    #[test]
    fn test_clearance_only_when_inflating() {
        let config = PlacementConfig::new();
        assert_eq!(config.clearance(true), 0);
        let config = config.with_inflate_boxes(true).with_spacing(10, 50);
        assert_eq!(config.clearance(false), 10);
        assert_eq!(config.clearance(true), 50);
    }
}
