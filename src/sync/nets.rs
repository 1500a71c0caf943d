//! Net stage: create nets and bind pads to them

use crate::board::Board;
use crate::context::Diagnostics;
use crate::error::SyncWarning;
use crate::netlist::Netlist;

pub(super) fn sync_nets(board: &mut Board, netlist: &Netlist, diagnostics: &mut Diagnostics) {
    for net in &netlist.nets {
        if board.ensure_net(&net.name) {
            tracing::info!("adding net {}", net.name);
        }

        for node in &net.nodes {
            let Some(footprint) = board.footprint_by_reference_mut(&node.reference) else {
                diagnostics.push(SyncWarning::MissingComponent {
                    net: net.name.clone(),
                    reference: node.reference.clone(),
                });
                continue;
            };
            // several pads may share a number (thermal pads, split pins)
            for pad in footprint.pads.iter_mut().filter(|p| p.number == node.pad) {
                tracing::debug!(
                    "connecting pad {}/{} to net {}",
                    node.reference,
                    pad.number,
                    net.name
                );
                pad.net = Some(net.name.clone());
            }
        }
    }
}
