// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Common routines for integration tests.

// This type of pedantry is more trouble than it's worth here.
#![allow(dead_code)]

pub mod io;
pub mod pcap;
pub mod pkt;

// Let's make our lives easier and pub use a bunch of stuff.
pub use io::MemIo;
pub use pkt::*;
pub use sfc::api::FiveTuple;
pub use sfc::api::MacAddr;
pub use sfc::api::Protocol;
pub use sfc::api::Role;
pub use sfc::api::ServicePath;
pub use sfc::api::SfId;
pub use sfc::api::SfcError;
pub use sfc::engine::DropReason;
pub use sfc::engine::NodeCfg;
pub use sfc::engine::NodeCtx;
pub use sfc::engine::Outcome;
pub use sfc::engine::Packet;
pub use sfc::engine::Pipeline;
pub use sfc::engine::node::PortCfg;
pub use sfc::engine::node::TableLimits;
pub use sfc::engine::nsh::ChainHeader;
pub use sfc::engine::nsh::INNER_FRAME_OFFSET_NSH;
pub use sfc::engine::vxlan::TUNNEL_HDR_SZ;
pub use sfc::engine::vxlan::Vni;
pub use sfc::provider::LogLevel;
pub use sfc::provider::LogProvider;
pub use sfc::provider::Providers;
pub use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::Mutex;

/// The MAC of port 0 of the node under test.
pub const PORT0_MAC: MacAddr =
    MacAddr::new([0x02, 0x08, 0x20, 0x00, 0x00, 0x10]);
/// The MAC of port 1 of the node under test.
pub const PORT1_MAC: MacAddr =
    MacAddr::new([0x02, 0x08, 0x20, 0x00, 0x00, 0x11]);
pub const PORT1_IP: Ipv4Addr = Ipv4Addr::new(172, 20, 0, 1);

pub const SFF_MAC: MacAddr =
    MacAddr::new([0x02, 0x08, 0x20, 0x00, 0xFF, 0x01]);
pub const SFF_IP: Ipv4Addr = Ipv4Addr::new(172, 20, 0, 254);

/// Endpoints of the inner flows.
pub const GUEST_MAC: MacAddr =
    MacAddr::new([0xA8, 0x40, 0x25, 0x00, 0x00, 0x01]);
pub const GUEST_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
pub const SERVER_MAC: MacAddr =
    MacAddr::new([0xA8, 0x40, 0x25, 0x00, 0x00, 0x02]);
pub const SERVER_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);

pub const TEST_VNI: u32 = 99;

/// The MAC of a service function, one per id.
pub fn sf_mac(sf: u16) -> MacAddr {
    let [hi, lo] = sf.to_be_bytes();
    MacAddr::from([0x02, 0x08, 0x20, 0x5F, hi, lo])
}

/// Keeps every log line for later inspection.
#[derive(Clone, Default)]
pub struct RecordingLog {
    lines: Arc<Mutex<Vec<(LogLevel, String)>>>,
}

impl RecordingLog {
    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines.lock().unwrap().clone()
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.lines.lock().unwrap().iter().filter(|(l, _)| *l == level).count()
    }
}

impl LogProvider for RecordingLog {
    fn log(&self, level: LogLevel, msg: &str) {
        self.lines.lock().unwrap().push((level, msg.to_string()));
    }
}

pub fn node_cfg(role: Role) -> NodeCfg {
    NodeCfg {
        role,
        ports: vec![
            PortCfg { id: 0, mac: PORT0_MAC, ip: None },
            PortCfg { id: 1, mac: PORT1_MAC, ip: Some(PORT1_IP) },
        ],
        sff_mac: SFF_MAC,
        sff_ip: Some(SFF_IP),
        vni: Vni::new(TEST_VNI).unwrap(),
        limits: TableLimits::default(),
    }
}

/// Build a node from `cfg`, returning a handle on its log.
pub fn node_from(cfg: NodeCfg) -> (NodeCtx, RecordingLog) {
    let log = RecordingLog::default();
    let ctx =
        NodeCtx::new(cfg, Providers { log: Box::new(log.clone()) }).unwrap();
    (ctx, log)
}

pub fn node(role: Role) -> NodeCtx {
    node_from(node_cfg(role)).0
}

/// A forwarder steering SPI 1 through SF 3 then SF 5, then off the
/// end of the chain.
pub fn forwarder_node() -> NodeCtx {
    let mut ctx = node(Role::Forwarder);
    for (si, sf) in [(255, 3), (254, 5), (253, 0)] {
        let path = ServicePath::new(1, si).unwrap();
        ctx.add_forwarder_sph_entry(path, SfId::new(sf)).unwrap();
    }
    for sf in [3, 5] {
        ctx.add_forwarder_sf_address(SfId::new(sf), sf_mac(sf)).unwrap();
    }
    ctx
}

/// A proxy fronting SF 3 at SPI 1, SI 255.
pub fn proxy_node() -> NodeCtx {
    let mut ctx = node(Role::Proxy);
    let path = ServicePath::new(1, 255).unwrap();
    ctx.add_proxy_sph_entry(path, SfId::new(3)).unwrap();
    ctx.add_proxy_sf_address_entry(SfId::new(3), sf_mac(3)).unwrap();
    ctx
}

/// The tuple of the default guest-to-server UDP flow.
pub fn guest_udp_tuple(src_port: u16) -> FiveTuple {
    FiveTuple::new(Protocol::UDP, GUEST_IP, SERVER_IP, src_port, 53)
}

/// Expect a pipeline to forward, returning the packet.
#[macro_export]
macro_rules! expect_forward {
    ($outcome:expr) => {
        match $outcome {
            Outcome::Forward(pkt) => pkt,
            Outcome::Drop(reason) => {
                panic!("expected forward, but dropped: {reason}")
            }
        }
    };
}

/// Expect a pipeline to drop with a reason matching a pattern.
#[macro_export]
macro_rules! assert_drop {
    ($outcome:expr, $expected:pat) => {
        match $outcome {
            Outcome::Drop(reason) => assert!(
                matches!(reason, $expected),
                "expected drop {}, but got: {reason}",
                stringify!($expected),
            ),
            Outcome::Forward(pkt) => {
                panic!("expected drop, but forwarded: {pkt:?}")
            }
        }
    };
}
