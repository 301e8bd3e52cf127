// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The SFC proxy, which fronts a legacy service function.
//!
//! Inbound traffic from the chain network has its chain header
//! removed before it is handed to the SF, and the header is cached
//! per inner flow. When the SF hands the packet back, the outbound
//! pipeline restores the cached header and returns the packet to the
//! forwarder.
//!
//! ```text
//!   chain network           proxy                legacy SF
//!   ------------- port 0 --> pop NSH   -- port 1 -->
//!                            cache hdr
//!   <------------ port 0 --- push NSH  <-- port 1 ---
//! ```

use super::ether::rewrite_macs;
use super::flow_table::FlowTable;
use super::forwarder::NextHopTables;
use super::node::NodeCtx;
use super::node::PORT0;
use super::node::PORT1;
use super::nsh::ChainHeader;
use super::nsh::INNER_FRAME_OFFSET_NSH;
use super::nsh::peek_chain_header;
use super::nsh::pop_chain_header;
use super::nsh::push_chain_header;
use super::packet::Packet;
use super::packet::extract_5tuple;
use super::pipeline::DropReason;
use super::pipeline::Outcome;
use super::vxlan::TUNNEL_HDR_SZ;
use core::num::NonZeroU32;
use sfc_api::FiveTuple;

pub(crate) struct ProxyState {
    /// Inner flow to the chain header restored on the way back out.
    pub(crate) flows: FlowTable<FiveTuple, ChainHeader>,
    pub(crate) hops: NextHopTables,
    full_warned: bool,
}

impl ProxyState {
    pub(crate) fn new(
        flow_limit: NonZeroU32,
        path_limit: NonZeroU32,
        sf_limit: NonZeroU32,
    ) -> Self {
        Self {
            flows: FlowTable::new("proxy-flows", flow_limit),
            hops: NextHopTables::new("proxy", path_limit, sf_limit),
            full_warned: false,
        }
    }
}

pub fn process_inbound(ctx: &mut NodeCtx, pkt: Packet) -> Outcome {
    Outcome::from(inbound(ctx, pkt))
}

pub fn process_outbound(ctx: &mut NodeCtx, pkt: Packet) -> Outcome {
    Outcome::from(outbound(ctx, pkt))
}

fn inbound(ctx: &mut NodeCtx, mut pkt: Packet) -> Result<Packet, DropReason> {
    let hdr = peek_chain_header(&pkt)?;
    let tuple = extract_5tuple(&pkt, INNER_FRAME_OFFSET_NSH)?;

    if ctx.proxy.flows.lookup(&tuple).is_none() {
        // First sight of the flow. The decremented index is what the
        // packet carries when it comes back from the SF; this packet
        // is still steered by the index it arrived with.
        let banked = hdr
            .path
            .decrement()
            .ok_or(DropReason::EndOfChain(hdr.path))?;
        let cached = ChainHeader { path: banked, ..hdr };

        // The lookup just missed, so the only failure left is a full
        // table.
        if let Err(e) = ctx.proxy.flows.insert(tuple, cached) {
            ctx.stats.flow_table_full.incr();
            if !ctx.proxy.full_warned {
                ctx.proxy.full_warned = true;
                ctx.log().warn(&format!("not caching flow {tuple}: {e}"));
            }
        }
    }

    pop_chain_header(&mut pkt)?;
    let sf = ctx.proxy.hops.next_sf(hdr.path)?;
    let dst = ctx.proxy.hops.sf_addr(sf)?;
    rewrite_macs(&mut pkt, ctx.port(PORT1).mac, dst)?;
    Ok(pkt)
}

fn outbound(ctx: &mut NodeCtx, mut pkt: Packet) -> Result<Packet, DropReason> {
    let tuple = extract_5tuple(&pkt, TUNNEL_HDR_SZ)?;
    let hdr =
        ctx.proxy.flows.lookup(&tuple).ok_or(DropReason::NoFlow(tuple))?;

    push_chain_header(&mut pkt, &hdr)?;
    rewrite_macs(&mut pkt, ctx.port(PORT0).mac, ctx.sff_mac())?;
    Ok(pkt)
}
