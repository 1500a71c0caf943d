//! Footprint stage: remove stale, instantiate missing, refresh present

use std::collections::BTreeSet;

use super::{diff_ids, ComponentRecord, SyncState};
use crate::board::{Board, Field, Footprint, PATH_FIELD, STANDARD_FIELDS};
use crate::error::SyncError;
use crate::library::FootprintResolver;
use crate::netlist::{Component, Netlist};

/// Overwrite a footprint's metadata with the component's.
///
/// Non-standard fields are dropped first, so properties removed from the
/// design disappear from the board too.
pub fn configure_footprint(footprint: &mut Footprint, component: &Component) {
    footprint
        .fields
        .retain(|name, _| STANDARD_FIELDS.contains(&name.as_str()));

    footprint.reference = component.reference.clone();
    footprint
        .fields
        .entry("Reference".to_string())
        .or_insert_with(|| Field {
            text: String::new(),
            visible: true,
        })
        .text = component.reference.clone();

    footprint.value = component.value.clone();
    footprint.set_field("Value", Field::hidden(component.value.clone()));
    footprint.set_field(PATH_FIELD, Field::hidden(component.path.clone()));
    footprint.fpid = component.footprint.clone();
    footprint.dnp = component.dnp();

    for (name, value) in &component.properties {
        let lower = name.to_lowercase();
        if lower == "value" || lower == "reference" {
            continue;
        }
        footprint.set_field(name.clone(), Field::hidden(value.clone()));
    }
}

fn record_for(component: &Component) -> ComponentRecord {
    ComponentRecord {
        uuid: component.uuid.clone(),
        path: component.path.clone(),
        reference: component.reference.clone(),
    }
}

pub(super) fn sync_footprints<R: FootprintResolver + ?Sized>(
    board: &mut Board,
    netlist: &Netlist,
    resolver: &R,
    state: &mut SyncState,
) -> Result<(), SyncError> {
    let netlist_ids: BTreeSet<String> =
        netlist.components.iter().map(|c| c.uuid.clone()).collect();
    let delta = diff_ids(&board.footprint_ids(), &netlist_ids);

    for uuid in &delta.stale {
        if let Some(footprint) = board.remove_footprint(uuid) {
            tracing::info!("{} ({}): removing from board", uuid, footprint.reference);
            state.track_removed(uuid);
        }
    }

    for uuid in &delta.missing {
        let Some(component) = netlist.component(uuid) else {
            continue;
        };
        tracing::info!("{} ({}): adding to board", uuid, component.reference);

        let template = resolver
            .resolve_spec(&component.footprint)
            .map_err(|e| SyncError::resolution(&component.reference, e))?;
        let mut footprint =
            template.instantiate(uuid, &component.footprint, &component.reference);
        configure_footprint(&mut footprint, component);
        board.add_footprint(footprint);
        state.track_added(record_for(component));
    }

    for uuid in &delta.present {
        let (Some(component), Some(footprint)) =
            (netlist.component(uuid), board.footprint_mut(uuid))
        else {
            continue;
        };
        tracing::info!("{} ({}): updating metadata", uuid, component.reference);
        configure_footprint(footprint, component);
        state.track_updated(record_for(component));
    }

    Ok(())
}
