// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Node counters as seen from outside the burst loop.

use serde::Deserialize;
use serde::Serialize;

/// A point-in-time copy of a node's counters.
///
/// `dropped_pkts` is the total; the `drop_*` fields break it down by
/// cause.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct NodeStats {
    pub rx_pkts: u64,
    pub tx_pkts: u64,
    pub dropped_pkts: u64,

    pub drop_malformed: u64,
    pub drop_no_next_sf: u64,
    pub drop_no_sf_addr: u64,
    pub drop_no_flow: u64,
    pub drop_end_of_chain: u64,
    pub drop_encap: u64,
    pub drop_tx_shortfall: u64,

    /// First-sight flows that could not be cached because the proxy
    /// flow table was full. The packets themselves were still
    /// processed.
    pub flow_table_full: u64,
}
