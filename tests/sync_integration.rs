//! End-to-end tests of the synchronization pipeline

use pretty_assertions::assert_eq;

use layout_sync::board::{Board, Field, Footprint, PATH_FIELD};
use layout_sync::geometry::{Point, Rect, MM};
use layout_sync::library::{FootprintTemplate, StaticLibrary};
use layout_sync::netlist::{component_uuid, Component, Module, Netlist};
use layout_sync::snapshot::{export_snapshot, snapshot_string};
use layout_sync::{synchronize, PlacementConfig, RunContext, SyncConfig, SyncWarning};

fn library() -> StaticLibrary {
    StaticLibrary::new()
        .with(
            "Lib:R",
            FootprintTemplate {
                courtyard: Some(Rect::new(-MM, -MM / 2, 2 * MM, MM)),
                ..Default::default()
            },
        )
        .with(
            "Lib:C",
            FootprintTemplate {
                courtyard: Some(Rect::new(-MM / 2, -MM / 2, MM, MM)),
                ..Default::default()
            },
        )
}

fn footprint_boxes(board: &Board) -> Vec<Rect> {
    board.footprints.iter().map(Footprint::bounding_box).collect()
}

fn assert_no_overlap(boxes: &[Rect]) {
    for (i, a) in boxes.iter().enumerate() {
        for b in &boxes[i + 1..] {
            assert!(!a.intersects(b), "{:?} overlaps {:?}", a, b);
        }
    }
}

#[test]
fn test_power_group_is_packed_and_centered() {
    let netlist = Netlist::new()
        .with_component(Component::new("R1", "Power.R1", "Lib:R"))
        .with_component(Component::new("R2", "Power.R2", "Lib:R"));
    let mut board = Board::new();
    let mut ctx = RunContext::new(SyncConfig::default(), ".");

    let report = synchronize(&mut board, &netlist, &library(), &mut ctx).expect("sync");

    assert_eq!(
        report.added.iter().map(String::as_str).collect::<Vec<_>>(),
        vec![
            "ad3b8b10-ba47-57c5-8f00-4f3771be3bb4",
            "af22c38c-01f1-5f54-bffa-a866b8a62586",
        ]
    );
    assert_eq!(board.group_member_count("Power"), 2);

    let boxes = footprint_boxes(&board);
    assert_no_overlap(&boxes);
    let merged = Rect::union_all(boxes).expect("placed boxes");
    assert_eq!(merged.center(), Point::new(148_500_000, 105_000_000));

    let snapshot = export_snapshot(&board);
    assert_eq!(snapshot["groups"][0]["name"], "Power");
    assert_eq!(
        snapshot["groups"][0]["footprints"],
        serde_json::json!([
            "ad3b8b10-ba47-57c5-8f00-4f3771be3bb4",
            "af22c38c-01f1-5f54-bffa-a866b8a62586",
        ])
    );
    for fp in snapshot["footprints"].as_array().expect("footprints") {
        assert_eq!(fp["group"], "Power");
    }
}

#[test]
fn test_new_items_go_right_of_existing_content() {
    let existing = Component::new("U1", "U1", "Lib:C");
    let mut board = Board::new();
    let mut fp = Footprint::new(existing.uuid.clone(), "Lib:C", "U1");
    fp.courtyard = Some(Rect::new(-MM / 2, -MM / 2, MM, MM));
    fp.position = Point::new(20 * MM, 40 * MM);
    fp.set_field(PATH_FIELD, Field::hidden("U1"));
    board.add_footprint(fp);

    let netlist = Netlist::new()
        .with_component(existing)
        .with_component(Component::new("R1", "Power.R1", "Lib:R"))
        .with_component(Component::new("R2", "Power.R2", "Lib:R"));
    let mut ctx = RunContext::new(SyncConfig::default(), ".");
    let report = synchronize(&mut board, &netlist, &library(), &mut ctx).expect("sync");
    assert_eq!(report.updated.len(), 1);

    let u1 = board.footprint(&component_uuid("U1")).expect("U1");
    assert_eq!(u1.position, Point::new(20 * MM, 40 * MM));

    let new_boxes: Vec<Rect> = ["Power.R1", "Power.R2"]
        .iter()
        .map(|p| board.footprint(&component_uuid(p)).expect("placed").bounding_box())
        .collect();
    let merged = Rect::union_all(new_boxes).expect("new content");
    assert_eq!(merged.left(), u1.bounding_box().right() + 10 * MM);
    assert_eq!(merged.center_y(), u1.bounding_box().center_y());
}

#[test]
fn test_fragment_is_transplanted_onto_new_module() {
    let dir = tempfile::tempdir().expect("tempdir");
    let fragment_dir = dir.path().join("filter");
    std::fs::create_dir_all(&fragment_dir).expect("mkdir");

    let mut fragment = Board::new();
    for (uuid, path, x) in [("f1", "C1", 0), ("f2", "C2", 3 * MM)] {
        let mut fp = Footprint::new(uuid, "Lib:C", path);
        fp.courtyard = Some(Rect::new(-MM / 2, -MM / 2, MM, MM));
        fp.position = Point::new(x, MM);
        fp.orientation = 90.0;
        fp.set_field(PATH_FIELD, Field::hidden(path));
        fragment.add_footprint(fp);
    }
    fragment.save(&fragment_dir.join("layout.json")).expect("save fragment");

    let netlist = Netlist::new()
        .with_module(Module::new("A"))
        .with_module(Module::new("A.B").with_layout("filter"))
        .with_component(Component::new("C1", "A.B.C1", "Lib:C"))
        .with_component(Component::new("C2", "A.B.C2", "Lib:C"))
        .with_component(Component::new("C3", "A.B.C3", "Lib:C"));
    let mut board = Board::new();
    let mut ctx = RunContext::new(SyncConfig::default(), dir.path());

    let report = synchronize(&mut board, &netlist, &library(), &mut ctx).expect("sync");

    assert!(report.synced.contains("A.B"));
    assert_eq!(
        report.warnings().cloned().collect::<Vec<_>>(),
        vec![SyncWarning::UnmatchedTarget {
            container: "A.B".into(),
            path: "A.B.C3".into(),
        }]
    );
    assert_eq!(
        report.orphans_by_container.get("A.B"),
        Some(&vec![component_uuid("A.B.C3")])
    );

    // the synced module moves as one rigid block
    let c1 = board.footprint(&component_uuid("A.B.C1")).expect("C1");
    let c2 = board.footprint(&component_uuid("A.B.C2")).expect("C2");
    assert_eq!(c1.orientation, 90.0);
    assert_eq!(c2.position.x - c1.position.x, 3 * MM);
    assert_eq!(c2.position.y, c1.position.y);
}

#[test]
fn test_missing_fragment_falls_back_to_packing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let netlist = Netlist::new()
        .with_module(Module::new("A").with_layout("nowhere"))
        .with_component(Component::new("C1", "A.C1", "Lib:C"))
        .with_component(Component::new("C2", "A.C2", "Lib:C"))
        .with_component(Component::new("C3", "A.C3", "Lib:C"));
    let mut board = Board::new();
    let mut ctx = RunContext::new(SyncConfig::default(), dir.path());

    let report = synchronize(&mut board, &netlist, &library(), &mut ctx).expect("sync");
    assert!(report.synced.is_empty());
    assert!(matches!(
        report.diagnostics.as_slice(),
        [SyncWarning::FragmentNotFound { container, .. }] if container == "A"
    ));
    assert_no_overlap(&footprint_boxes(&board));
}

#[test]
fn test_inflated_boxes_keep_spacing() {
    let netlist = Netlist::new()
        .with_component(Component::new("R1", "Power.R1", "Lib:R"))
        .with_component(Component::new("R2", "Power.R2", "Lib:R"));
    let config = SyncConfig::default()
        .with_placement(PlacementConfig::default().with_inflate_boxes(true));
    let mut board = Board::new();
    let mut ctx = RunContext::new(config, ".");
    synchronize(&mut board, &netlist, &library(), &mut ctx).expect("sync");

    let boxes = footprint_boxes(&board);
    let spacing = PlacementConfig::default().footprint_spacing;
    assert_no_overlap(
        &boxes
            .iter()
            .map(|r| r.inflate(spacing - 1))
            .collect::<Vec<_>>(),
    );
}

#[test]
fn test_snapshot_is_stable_across_runs() {
    let netlist = Netlist::new()
        .with_component(Component::new("R1", "Power.R1", "Lib:R"))
        .with_component(Component::new("R2", "Power.R2", "Lib:R"))
        .with_component(Component::new("C1", "Filter.C1", "Lib:C"));

    let run = || {
        let mut board = Board::new();
        let mut ctx = RunContext::new(SyncConfig::default(), ".");
        synchronize(&mut board, &netlist, &library(), &mut ctx).expect("sync");
        board
    };
    let first = run();
    let mut second = run();
    second.footprints.reverse();
    second.groups.reverse();

    assert_eq!(
        snapshot_string(&first).expect("snapshot"),
        snapshot_string(&second).expect("snapshot")
    );
}
