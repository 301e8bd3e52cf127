// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The service function forwarder.
//!
//! A forwarder routes on the path a packet already carries. It never
//! changes the service index: that is the job of whoever hands the
//! packet back to it (a proxy, or an NSH-aware SF).

use super::ether::rewrite_macs;
use super::flow_table::FlowTable;
use super::node::NodeCtx;
use super::node::PORT1;
use super::nsh::peek_chain_header;
use super::nsh::pop_chain_header;
use super::packet::Packet;
use super::pipeline::DropReason;
use super::pipeline::Outcome;
use super::vxlan::decapsulate_tunnel;
use core::num::NonZeroU32;
use sfc_api::MacAddr;
use sfc_api::ServicePath;
use sfc_api::SfId;

/// The two lookups that resolve a path to a link-layer destination.
/// Forwarders and proxies each keep their own pair.
#[derive(Debug)]
pub struct NextHopTables {
    pub next_sf: FlowTable<ServicePath, SfId>,
    pub sf_addr: FlowTable<SfId, MacAddr>,
}

impl NextHopTables {
    pub fn new(
        prefix: &str,
        path_limit: NonZeroU32,
        sf_limit: NonZeroU32,
    ) -> Self {
        Self {
            next_sf: FlowTable::new(&format!("{prefix}-next-sf"), path_limit),
            sf_addr: FlowTable::new(&format!("{prefix}-sf-addr"), sf_limit),
        }
    }

    pub fn next_sf(&mut self, path: ServicePath) -> Result<SfId, DropReason> {
        self.next_sf.lookup(&path).ok_or(DropReason::NoNextSf(path))
    }

    pub fn sf_addr(&mut self, sf: SfId) -> Result<MacAddr, DropReason> {
        self.sf_addr.lookup(&sf).ok_or(DropReason::NoSfAddr(sf))
    }
}

pub fn process(ctx: &mut NodeCtx, pkt: Packet) -> Outcome {
    Outcome::from(forward(ctx, pkt))
}

fn forward(ctx: &mut NodeCtx, mut pkt: Packet) -> Result<Packet, DropReason> {
    let path = peek_chain_header(&pkt)?.path;
    let sf = ctx.forwarder.next_sf(path)?;

    if sf.is_end_of_chain() {
        // Deliver the original frame: both the chain header and the
        // tunnel go.
        pop_chain_header(&mut pkt)?;
        decapsulate_tunnel(&mut pkt)?;
        return Ok(pkt);
    }

    let dst = ctx.forwarder.sf_addr(sf)?;
    rewrite_macs(&mut pkt, ctx.port(PORT1).mac, dst)?;
    Ok(pkt)
}
