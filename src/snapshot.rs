//! Deterministic JSON snapshot of a board
//!
//! Every list is sorted by a content key and every object is key-sorted, so
//! two boards with the same items produce byte-identical snapshots no matter
//! in which order the items are stored.

use std::path::Path;

use serde_json::{json, Value};

use crate::board::{Board, DocumentError, Drawing, Footprint, Graphic, Group, Zone};
use crate::geometry::Point;

/// Drop every non-ASCII character
pub fn ascii_only(text: &str) -> String {
    text.chars().filter(char::is_ascii).collect()
}

fn point(p: Point) -> Value {
    json!({ "x": p.x, "y": p.y })
}

/// Sort objects by their `position` then by their full encoding
fn sort_by_position(items: &mut [Value]) {
    fn key(v: &Value) -> (i64, i64) {
        let pos = &v["position"];
        (
            pos["x"].as_i64().unwrap_or_default(),
            pos["y"].as_i64().unwrap_or_default(),
        )
    }
    items.sort_by(|a, b| {
        key(a)
            .cmp(&key(b))
            .then_with(|| a.to_string().cmp(&b.to_string()))
    });
}

fn graphic_data(graphic: &Graphic, to_board: impl Fn(Point) -> Point) -> Value {
    json!({
        "type": graphic.kind,
        "layer": graphic.layer,
        "position": point(to_board(graphic.start)),
        "start": point(to_board(graphic.start)),
        "end": graphic.end.map(|p| point(to_board(p))),
        "text": graphic.text.as_deref().map(ascii_only),
        "width": graphic.width,
    })
}

fn footprint_data(fp: &Footprint) -> Value {
    let mut pads: Vec<Value> = fp
        .pads
        .iter()
        .map(|pad| {
            json!({
                "name": pad.number,
                "position": point(fp.pad_position(pad)),
                "layer": pad.layer,
            })
        })
        .collect();
    pads.sort_by(|a, b| {
        let key = |v: &Value| {
            (
                v["name"].as_str().unwrap_or_default().to_string(),
                v["position"]["x"].as_i64().unwrap_or_default(),
                v["position"]["y"].as_i64().unwrap_or_default(),
            )
        };
        key(a).cmp(&key(b))
    });

    let mut graphics: Vec<Value> = fp
        .graphics
        .iter()
        .map(|g| graphic_data(g, |p| fp.to_board(p)))
        .collect();
    sort_by_position(&mut graphics);

    json!({
        "footprint": fp.fpid,
        "group": fp.group.as_deref().map(ascii_only),
        "layer": fp.layer_name(),
        "locked": fp.locked,
        "orientation": fp.orientation,
        "position": point(fp.position),
        "reference": ascii_only(&fp.reference),
        "uuid": fp.uuid,
        "value": ascii_only(&fp.value),
        "dnp": fp.dnp,
        "pads": pads,
        "graphical_items": graphics,
    })
}

fn group_data(board: &Board, group: &Group) -> Value {
    let bounding_box = board.group_bbox(&group.name).map(|r| {
        json!({
            "bottom": r.bottom(),
            "left": r.left(),
            "right": r.right(),
            "top": r.top(),
        })
    });

    let mut footprints: Vec<&str> = board
        .group_footprints(&group.name)
        .map(|fp| fp.uuid.as_str())
        .collect();
    footprints.sort_unstable();

    let mut drawings: Vec<Value> = board
        .group_drawings(&group.name)
        .map(|d: &Drawing| graphic_data(&d.shape, |p| p))
        .collect();
    sort_by_position(&mut drawings);

    json!({
        "bounding_box": bounding_box,
        "footprints": footprints,
        "drawings": drawings,
        "locked": group.locked,
        "name": ascii_only(&group.name),
    })
}

fn zone_data(zone: &Zone) -> Value {
    json!({
        "name": ascii_only(&zone.name),
        "net_name": zone.net.as_deref().unwrap_or_default(),
        "layer": zone.layer,
        "locked": zone.locked,
        "filled": zone.filled,
        "hatch_style": zone.hatch_style,
        "min_thickness": zone.min_thickness,
        "points": zone.outline.iter().map(|p| point(*p)).collect::<Vec<_>>(),
    })
}

/// Build the snapshot as a JSON value
pub fn export_snapshot(board: &Board) -> Value {
    let mut footprints: Vec<&Footprint> = board.footprints.iter().collect();
    footprints.sort_by(|a, b| a.uuid.cmp(&b.uuid));

    let mut groups: Vec<&Group> = board.groups.iter().collect();
    groups.sort_by(|a, b| a.name.cmp(&b.name));

    let mut zones: Vec<&Zone> = board.zones.iter().collect();
    zones.sort_by(|a, b| {
        let first = |z: &Zone| z.outline.first().map(|p| (p.x, p.y));
        first(a)
            .cmp(&first(b))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| zone_data(a).to_string().cmp(&zone_data(b).to_string()))
    });

    json!({
        "footprints": footprints.into_iter().map(footprint_data).collect::<Vec<_>>(),
        "groups": groups.into_iter().map(|g| group_data(board, g)).collect::<Vec<_>>(),
        "zones": zones.into_iter().map(zone_data).collect::<Vec<_>>(),
    })
}

/// Snapshot as 2-space indented JSON text
pub fn snapshot_string(board: &Board) -> Result<String, DocumentError> {
    Ok(serde_json::to_string_pretty(&export_snapshot(board))?)
}

pub fn write_snapshot(board: &Board, path: &Path) -> Result<(), DocumentError> {
    let content = snapshot_string(board)?;
    std::fs::write(path, content).map_err(|source| DocumentError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!("saved layout snapshot to {}", path.display());
    Ok(())
}
