// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Shared setup for the pipeline benchmarks.

use criterion::measurement::Measurement;
use criterion::measurement::WallTime;
use rand::Rng;
use sfc::engine::NodeCtx;
use sfc::engine::Packet;
use sfc::provider::NullLog;
use sfc::provider::Providers;
use sfc_test_utils::*;

/// Additional labelling information for [`Measurement`]s for
/// pretty-printing and grouping.
pub trait MeasurementInfo: Measurement {
    fn label() -> &'static str;
}

impl MeasurementInfo for WallTime {
    fn label() -> &'static str {
        "wallclock"
    }
}

/// Packets per batch, matching a worker's receive burst.
pub const BATCH: usize = 64;

/// A node for `role` which discards its log output.
pub fn quiet_node(role: Role) -> NodeCtx {
    NodeCtx::new(node_cfg(role), Providers { log: Box::new(NullLog) })
        .unwrap()
}

/// Pick `n` distinct guest source ports.
pub fn flow_ports<R: Rng>(rng: &mut R, n: usize) -> Vec<u16> {
    let mut ports = Vec::with_capacity(n);
    while ports.len() < n {
        let port = rng.random_range(1024..=u16::MAX);
        if !ports.contains(&port) {
            ports.push(port);
        }
    }
    ports
}

/// A burst of guest frames cycling through `ports`.
pub fn guest_batch(ports: &[u16]) -> Vec<Packet> {
    ports
        .iter()
        .cycle()
        .take(BATCH)
        .map(|port| Packet::copy(&guest_udp(*port, b"bench")))
        .collect()
}

/// A burst of chain-encapsulated guest frames carrying `path`.
pub fn chained_batch(ports: &[u16], path: ServicePath) -> Vec<Packet> {
    ports
        .iter()
        .cycle()
        .take(BATCH)
        .map(|port| chain_encap(&guest_udp(*port, b"bench"), path))
        .collect()
}

/// A burst of tunnelled guest frames, as a legacy SF returns them.
pub fn tunnelled_batch(ports: &[u16]) -> Vec<Packet> {
    ports
        .iter()
        .cycle()
        .take(BATCH)
        .map(|port| tunnel_encap(&guest_udp(*port, b"bench")))
        .collect()
}
