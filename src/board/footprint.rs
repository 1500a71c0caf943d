//! Footprints and their local geometry

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};

/// Field holding the dotted hierarchical path of a footprint
pub const PATH_FIELD: &str = "Path";

/// Fields that survive footprint reconfiguration
pub const STANDARD_FIELDS: [&str; 3] = ["Reference", "Value", "Datasheet"];

/// Fabrication layers never contribute to placement geometry
pub const FAB_LAYERS: [&str; 2] = ["F.Fab", "B.Fab"];

/// Board side a footprint is mounted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Side {
    #[default]
    #[serde(rename = "F.Cu")]
    Front,
    #[serde(rename = "B.Cu")]
    Back,
}

impl Side {
    pub fn copper_layer(&self) -> &'static str {
        match self {
            Side::Front => "F.Cu",
            Side::Back => "B.Cu",
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Front => Side::Back,
            Side::Back => Side::Front,
        }
    }
}

/// Swap a `F.*` layer name for its `B.*` counterpart and vice versa
pub fn flip_layer_name(layer: &str) -> String {
    if let Some(rest) = layer.strip_prefix("F.") {
        format!("B.{}", rest)
    } else if let Some(rest) = layer.strip_prefix("B.") {
        format!("F.{}", rest)
    } else {
        layer.to_string()
    }
}

/// A named text field on a footprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub text: String,
    #[serde(default)]
    pub visible: bool,
}

impl Field {
    pub fn hidden(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            visible: false,
        }
    }
}

/// A pad in footprint-local coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pad {
    pub number: String,
    pub offset: Point,
    pub size: Point,
    #[serde(default = "default_pad_layer")]
    pub layer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net: Option<String>,
}

fn default_pad_layer() -> String {
    "F.Cu".to_string()
}

impl Pad {
    /// Pad extent in footprint-local coordinates
    pub fn local_rect(&self) -> Rect {
        Rect::new(
            self.offset.x - self.size.x / 2,
            self.offset.y - self.size.y / 2,
            self.size.x,
            self.size.y,
        )
    }
}

/// A graphic primitive (line, rectangle outline, text) on some layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graphic {
    pub kind: String,
    pub layer: String,
    pub start: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub width: i64,
}

impl Graphic {
    fn points(&self) -> impl Iterator<Item = Point> + '_ {
        std::iter::once(self.start).chain(self.end)
    }
}

/// A placed footprint on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub uuid: String,
    pub fpid: String,
    pub reference: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub position: Point,
    #[serde(default)]
    pub orientation: f64,
    #[serde(default, rename = "layer")]
    pub side: Side,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub dnp: bool,
    #[serde(default)]
    pub fields: BTreeMap<String, Field>,
    #[serde(default)]
    pub reference_offset: Point,
    #[serde(default)]
    pub value_offset: Point,
    #[serde(default)]
    pub pads: Vec<Pad>,
    #[serde(default)]
    pub graphics: Vec<Graphic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub courtyard: Option<Rect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl Footprint {
    /// Create an empty footprint at the origin
    pub fn new(uuid: impl Into<String>, fpid: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            fpid: fpid.into(),
            reference: reference.into(),
            value: String::new(),
            position: Point::default(),
            orientation: 0.0,
            side: Side::Front,
            locked: false,
            dnp: false,
            fields: BTreeMap::new(),
            reference_offset: Point::default(),
            value_offset: Point::default(),
            pads: Vec::new(),
            graphics: Vec::new(),
            courtyard: None,
            group: None,
        }
    }

    /// Hierarchical path from the `Path` field, if set and non-empty
    pub fn path(&self) -> Option<&str> {
        self.fields
            .get(PATH_FIELD)
            .map(|f| f.text.as_str())
            .filter(|p| !p.is_empty())
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn set_field(&mut self, name: impl Into<String>, field: Field) {
        self.fields.insert(name.into(), field);
    }

    pub fn layer_name(&self) -> &'static str {
        self.side.copper_layer()
    }

    /// Transform a footprint-local point into board coordinates
    pub fn to_board(&self, local: Point) -> Point {
        let rotated = local.rotate(self.orientation);
        rotated.translate(self.position.x, self.position.y)
    }

    /// Bounding box on the board, ignoring fabrication layers.
    ///
    /// A footprint without any geometry collapses to a zero-size box at its
    /// position.
    pub fn bounding_box(&self) -> Rect {
        let mut points: Vec<Point> = Vec::new();
        if let Some(courtyard) = &self.courtyard {
            points.extend(courtyard.corners());
        }
        for pad in &self.pads {
            points.extend(pad.local_rect().corners());
        }
        for graphic in &self.graphics {
            if FAB_LAYERS.contains(&graphic.layer.as_str()) {
                continue;
            }
            points.extend(graphic.points());
        }

        Rect::enclosing(points.into_iter().map(|p| self.to_board(p)))
            .unwrap_or_else(|| Rect::new(self.position.x, self.position.y, 0, 0))
    }

    /// Absolute pad position on the board
    pub fn pad_position(&self, pad: &Pad) -> Point {
        self.to_board(pad.offset)
    }

    pub fn translate(&mut self, dx: i64, dy: i64) {
        self.position = self.position.translate(dx, dy);
    }

    /// Flip to the opposite side, mirroring left/right about the footprint's
    /// own position.
    ///
    /// Local geometry is mirrored top/bottom and the orientation becomes
    /// `180 - θ`, which together mirror the board-space footprint left/right.
    pub fn flip(&mut self) {
        for pad in &mut self.pads {
            pad.offset = pad.offset.mirror_y();
            pad.layer = flip_layer_name(&pad.layer);
        }
        for graphic in &mut self.graphics {
            graphic.start = graphic.start.mirror_y();
            graphic.end = graphic.end.map(|p| p.mirror_y());
            graphic.layer = flip_layer_name(&graphic.layer);
        }
        if let Some(courtyard) = self.courtyard {
            self.courtyard = Some(Rect::from_edges(
                courtyard.left(),
                -courtyard.bottom(),
                courtyard.right(),
                -courtyard.top(),
            ));
        }
        self.reference_offset = self.reference_offset.mirror_y();
        self.value_offset = self.value_offset.mirror_y();
        self.orientation = normalize_orientation(180.0 - self.orientation);
        self.side = self.side.opposite();
    }

    /// Take over the placement of `source`: side, position, orientation and
    /// the reference/value text offsets.
    pub fn copy_placement_from(&mut self, source: &Footprint) {
        if self.side != source.side {
            self.flip();
        }
        self.side = source.side;
        self.position = source.position;
        self.orientation = source.orientation;
        self.reference_offset = source.reference_offset;
        self.value_offset = source.value_offset;
    }
}

/// Normalize an angle into (-180, 180]
pub fn normalize_orientation(degrees: f64) -> f64 {
    let mut a = degrees.rem_euclid(360.0);
    if a > 180.0 {
        a -= 360.0;
    }
    if a == 0.0 {
        // avoid -0.0 leaking into snapshots
        0.0
    } else {
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resistor() -> Footprint {
        let mut fp = Footprint::new("u1", "Resistor_SMD:R_0603", "R1");
        fp.position = Point::new(1000, 2000);
        fp.pads = vec![
            Pad {
                number: "1".into(),
                offset: Point::new(-800, 0),
                size: Point::new(400, 400),
                layer: "F.Cu".into(),
                net: None,
            },
            Pad {
                number: "2".into(),
                offset: Point::new(800, 0),
                size: Point::new(400, 400),
                layer: "F.Cu".into(),
                net: None,
            },
        ];
        fp.courtyard = Some(Rect::new(-1200, -500, 2400, 1000));
        fp
    }

    #[test]
    fn test_bounding_box_uses_courtyard_and_pads() {
        let fp = resistor();
        assert_eq!(fp.bounding_box(), Rect::new(-200, 1500, 2400, 1000));
    }

    #[test]
    fn test_fab_graphics_are_ignored() {
        let mut fp = resistor();
        fp.graphics.push(Graphic {
            kind: "line".into(),
            layer: "F.Fab".into(),
            start: Point::new(-5000, 0),
            end: Some(Point::new(5000, 0)),
            text: None,
            width: 100,
        });
        assert_eq!(fp.bounding_box(), Rect::new(-200, 1500, 2400, 1000));
    }

    #[test]
    fn test_rotated_bounding_box() {
        let mut fp = resistor();
        fp.orientation = 90.0;
        assert_eq!(fp.bounding_box(), Rect::new(500, 800, 1000, 2400));
    }

    #[test]
    fn test_empty_footprint_has_point_box() {
        let mut fp = Footprint::new("u", "lib:fp", "X1");
        fp.position = Point::new(5, 7);
        assert_eq!(fp.bounding_box(), Rect::new(5, 7, 0, 0));
    }

    #[test]
    fn test_flip_keeps_position_and_swaps_layers() {
        let mut fp = resistor();
        fp.pads[0].offset = Point::new(-800, 100);
        fp.flip();
        assert_eq!(fp.side, Side::Back);
        assert_eq!(fp.position, Point::new(1000, 2000));
        assert_eq!(fp.pads[0].offset, Point::new(-800, -100));
        assert_eq!(fp.pads[0].layer, "B.Cu");
        assert_eq!(fp.orientation, 180.0);

        fp.flip();
        assert_eq!(fp.side, Side::Front);
        assert_eq!(fp.pads[0].offset, Point::new(-800, 100));
        assert_eq!(fp.orientation, 0.0);
    }

    #[test]
    fn test_flip_mirrors_left_right_on_board() {
        let mut fp = resistor();
        fp.pads[1].offset = Point::new(0, 300);
        let before: Vec<Point> = fp.pads.iter().map(|p| fp.pad_position(p)).collect();
        assert_eq!(before, vec![Point::new(200, 2000), Point::new(1000, 2300)]);

        fp.flip();
        let after: Vec<Point> = fp.pads.iter().map(|p| fp.pad_position(p)).collect();
        assert_eq!(after, vec![Point::new(1800, 2000), Point::new(1000, 2300)]);
        assert_eq!(fp.bounding_box(), Rect::new(-200, 1500, 2400, 1000));
    }

    #[test]
    fn test_flip_mirrors_rotated_footprint_about_position() {
        let mut fp = resistor();
        fp.orientation = 90.0;
        fp.pads[1].offset = Point::new(0, 300);
        assert_eq!(fp.pad_position(&fp.pads[1]), Point::new(1300, 2000));

        fp.flip();
        assert_eq!(fp.orientation, 90.0);
        assert_eq!(fp.pad_position(&fp.pads[1]), Point::new(700, 2000));
    }

    #[test]
    fn test_copy_placement_flips_to_source_side() {
        let mut target = resistor();
        let mut source = resistor();
        source.side = Side::Back;
        source.position = Point::new(50, 60);
        source.orientation = 90.0;
        source.reference_offset = Point::new(0, -900);

        target.copy_placement_from(&source);
        assert_eq!(target.side, Side::Back);
        assert_eq!(target.position, Point::new(50, 60));
        assert_eq!(target.orientation, 90.0);
        assert_eq!(target.reference_offset, Point::new(0, -900));
        // local geometry was mirrored by the flip
        assert_eq!(target.pads[0].offset, Point::new(-800, 0));
        assert_eq!(target.pads[0].layer, "B.Cu");
    }

    #[test]
    fn test_normalize_orientation() {
        assert_eq!(normalize_orientation(270.0), -90.0);
        assert_eq!(normalize_orientation(-180.0), 180.0);
        assert_eq!(normalize_orientation(360.0), 0.0);
    }

    #[test]
    fn test_path_field() {
        let mut fp = resistor();
        assert_eq!(fp.path(), None);
        fp.set_field(PATH_FIELD, Field::hidden("Power.R1"));
        assert_eq!(fp.path(), Some("Power.R1"));
        fp.set_field(PATH_FIELD, Field::hidden(""));
        assert_eq!(fp.path(), None);
    }
}
