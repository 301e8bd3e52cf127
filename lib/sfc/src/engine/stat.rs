// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Packet counters kept by the burst loop.

use super::io::TxResult;
use super::pipeline::DropReason;
use core::ops::AddAssign;
use sfc_api::NodeStats;

/// A monotonically increasing 64-bit counter.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Counter {
    value: u64,
}

impl Counter {
    pub fn val(&self) -> u64 {
        self.value
    }

    pub fn incr(&mut self) {
        self.value += 1;
    }

    fn reset(&mut self) {
        self.value = 0;
    }
}

impl AddAssign<u64> for Counter {
    fn add_assign(&mut self, other: u64) {
        self.value += other;
    }
}

impl AddAssign<usize> for Counter {
    fn add_assign(&mut self, other: usize) {
        self.value += other as u64;
    }
}

#[derive(Clone, Debug, Default)]
pub struct NodeCounters {
    pub rx_pkts: Counter,
    pub tx_pkts: Counter,
    pub dropped_pkts: Counter,

    pub drop_malformed: Counter,
    pub drop_no_next_sf: Counter,
    pub drop_no_sf_addr: Counter,
    pub drop_no_flow: Counter,
    pub drop_end_of_chain: Counter,
    pub drop_encap: Counter,
    pub drop_tx_shortfall: Counter,

    pub flow_table_full: Counter,
}

impl NodeCounters {
    /// Count a packet dropped by a pipeline.
    pub fn record_drop(&mut self, reason: &DropReason) {
        self.dropped_pkts.incr();

        match reason {
            DropReason::Malformed(_) => self.drop_malformed.incr(),
            DropReason::NoNextSf(_) => self.drop_no_next_sf.incr(),
            DropReason::NoSfAddr(_) => self.drop_no_sf_addr.incr(),
            DropReason::NoFlow(_) => self.drop_no_flow.incr(),
            DropReason::EndOfChain(_) => self.drop_end_of_chain.incr(),
            DropReason::Encap(_) => self.drop_encap.incr(),
        }
    }

    /// Count the outcome of a transmit attempt. Packets the device
    /// refused were freed and count as drops.
    pub fn record_tx(&mut self, res: TxResult) {
        self.tx_pkts += res.sent;
        self.dropped_pkts += res.dropped;
        self.drop_tx_shortfall += res.dropped;
    }

    pub fn reset(&mut self) {
        for c in [
            &mut self.rx_pkts,
            &mut self.tx_pkts,
            &mut self.dropped_pkts,
            &mut self.drop_malformed,
            &mut self.drop_no_next_sf,
            &mut self.drop_no_sf_addr,
            &mut self.drop_no_flow,
            &mut self.drop_end_of_chain,
            &mut self.drop_encap,
            &mut self.drop_tx_shortfall,
            &mut self.flow_table_full,
        ] {
            c.reset();
        }
    }

    pub fn snapshot(&self) -> NodeStats {
        NodeStats {
            rx_pkts: self.rx_pkts.val(),
            tx_pkts: self.tx_pkts.val(),
            dropped_pkts: self.dropped_pkts.val(),
            drop_malformed: self.drop_malformed.val(),
            drop_no_next_sf: self.drop_no_next_sf.val(),
            drop_no_sf_addr: self.drop_no_sf_addr.val(),
            drop_no_flow: self.drop_no_flow.val(),
            drop_end_of_chain: self.drop_end_of_chain.val(),
            drop_encap: self.drop_encap.val(),
            drop_tx_shortfall: self.drop_tx_shortfall.val(),
            flow_table_full: self.flow_table_full.val(),
        }
    }
}
