// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Integration tests.
//!
//! These drive whole nodes through the burst loop with an in-memory
//! device, then check the egress bytes with smoltcp's wire types
//! rather than the engine's own header codec.

use common::pcap::PcapBuilder;
use common::pcap::read_frames;
use common::*;
use sfc::engine::nsh::NSH_HDR_SZ;
use sfc::engine::vxlan::VXLAN_NP_ETHERNET;
use sfc::engine::vxlan::VXLAN_NP_NSH;
use sfc::engine::vxlan::VXLAN_PORT;
use sfc::engine::worker::BURST_TX_DRAIN_US;
use sfc::engine::worker::Worker;
use sfc_test_utils as common;
use smoltcp::wire::EthernetAddress;
use smoltcp::wire::EthernetFrame;
use smoltcp::wire::EthernetProtocol;
use smoltcp::wire::IpProtocol;
use smoltcp::wire::Ipv4Address;
use smoltcp::wire::Ipv4Packet;
use smoltcp::wire::UdpPacket;
use std::num::NonZeroU32;
use std::time::Duration;
use std::time::Instant;

const VXLAN_OFF: usize = 14 + 20 + 8;

fn worker(ctx: NodeCtx) -> Worker<MemIo> {
    Worker::new(ctx, MemIo::new(), Duration::from_micros(BURST_TX_DRAIN_US))
}

/// Push `pkts` into `port`, run one iteration and a drain, and return
/// what left through `egress`.
fn run_once(
    w: &mut Worker<MemIo>,
    port: u16,
    egress: u16,
    pkts: Vec<Packet>,
) -> Vec<Packet> {
    w.io_mut().inject(port, pkts);
    w.poll(Instant::now());
    w.flush_all();
    w.io_mut().take_sent(egress)
}

/// Check the outer tunnel of a chain packet and return its chain
/// header.
fn check_outer(
    bytes: &[u8],
    eth_src: MacAddr,
    eth_dst: MacAddr,
    next_proto: u8,
) -> ChainHeader {
    let eth = EthernetFrame::new_checked(bytes).unwrap();
    assert_eq!(eth.src_addr(), EthernetAddress(eth_src.bytes()));
    assert_eq!(eth.dst_addr(), EthernetAddress(eth_dst.bytes()));
    assert_eq!(eth.ethertype(), EthernetProtocol::Ipv4);

    let ip = Ipv4Packet::new_checked(eth.payload()).unwrap();
    assert!(ip.verify_checksum());
    assert!(ip.dont_frag());
    assert_eq!(ip.hop_limit(), 64);
    assert_eq!(ip.next_header(), IpProtocol::Udp);
    assert_eq!(usize::from(ip.total_len()), bytes.len() - 14);

    let udp = UdpPacket::new_checked(ip.payload()).unwrap();
    assert_eq!(udp.dst_port(), VXLAN_PORT);
    assert_eq!(usize::from(udp.len()), bytes.len() - 14 - 20);
    assert_eq!(udp.checksum(), 0);

    let vxlan = &bytes[VXLAN_OFF..VXLAN_OFF + 8];
    assert_eq!(vxlan[0], 0x0C);
    assert_eq!(vxlan[3], next_proto);
    assert_eq!(&vxlan[4..7], &TEST_VNI.to_be_bytes()[1..]);

    let nsh: [u8; NSH_HDR_SZ] =
        bytes[TUNNEL_HDR_SZ..INNER_FRAME_OFFSET_NSH].try_into().unwrap();
    ChainHeader::decode(nsh)
}

#[test]
fn classifier_tags_known_flow() {
    let frame = guest_udp(1000, b"flow payload");
    let mut ctx = node(Role::Classifier);
    let path = ServicePath::from_raw(0x0100);
    ctx.add_classifier_entry(guest_udp_tuple(1000), path).unwrap();

    let mut w = worker(ctx);
    let out = run_once(&mut w, 0, 1, vec![Packet::copy(&frame)]);
    assert_eq!(out.len(), 1);

    let bytes = out[0].bytes();
    assert_eq!(bytes.len(), frame.len() + INNER_FRAME_OFFSET_NSH);
    let hdr = check_outer(bytes, PORT1_MAC, SFF_MAC, VXLAN_NP_NSH);
    assert_eq!(hdr.path, ServicePath::from_raw(0x01FF));
    assert_eq!(hdr, ChainHeader::new(ServicePath::from_raw(0x01FF)));

    let ip = Ipv4Packet::new_checked(&bytes[14..]).unwrap();
    assert_eq!(ip.src_addr(), Ipv4Address::from_bytes(&PORT1_IP.octets()));
    assert_eq!(ip.dst_addr(), Ipv4Address::from_bytes(&SFF_IP.octets()));
    assert_eq!(&bytes[INNER_FRAME_OFFSET_NSH..], frame.as_slice());

    let stats = w.ctx().stats();
    assert_eq!((stats.rx_pkts, stats.tx_pkts, stats.dropped_pkts), (1, 1, 0));
}

#[test]
fn classifier_passes_unknown_flows() {
    let mut ctx = node(Role::Classifier);
    let path = ServicePath::from_raw(0x0100);
    ctx.add_classifier_entry(guest_udp_tuple(1000), path).unwrap();

    let frames = vec![
        guest_udp(1001, b"other port"),
        gen_tcp_syn(GUEST_MAC, SERVER_MAC, GUEST_IP, SERVER_IP, 1000, 53),
        gen_icmp_echo_req(
            GUEST_MAC, SERVER_MAC, GUEST_IP, SERVER_IP, 7, 1, b"ping",
        ),
    ];

    let mut w = worker(ctx);
    let out = run_once(
        &mut w,
        0,
        1,
        frames.iter().map(|f| Packet::copy(f)).collect(),
    );

    let out: Vec<&[u8]> = out.iter().map(Packet::bytes).collect();
    let expected: Vec<&[u8]> = frames.iter().map(Vec::as_slice).collect();
    assert_eq!(out, expected);
}

#[test]
fn classifier_passes_non_ipv4() {
    let mut w = worker(node(Role::Classifier));
    let arp = gen_arp_req(GUEST_MAC, GUEST_IP, SERVER_IP);
    let out = run_once(&mut w, 0, 1, vec![Packet::copy(&arp)]);

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].bytes(), arp.as_slice());
    let stats = w.ctx().stats();
    assert_eq!((stats.rx_pkts, stats.tx_pkts, stats.dropped_pkts), (1, 1, 0));
}

#[test]
fn forwarder_steers_and_terminates() {
    let frame = guest_udp(2000, b"abc");
    let mut w = worker(forwarder_node());

    let out = run_once(&mut w, 0, 1, vec![
        chain_encap(&frame, ServicePath::new(1, 255).unwrap()),
        chain_encap(&frame, ServicePath::new(1, 254).unwrap()),
        chain_encap(&frame, ServicePath::new(1, 253).unwrap()),
    ]);
    assert_eq!(out.len(), 3);

    let hdr = check_outer(out[0].bytes(), PORT1_MAC, sf_mac(3), VXLAN_NP_NSH);
    assert_eq!(hdr.path, ServicePath::new(1, 255).unwrap());
    let hdr = check_outer(out[1].bytes(), PORT1_MAC, sf_mac(5), VXLAN_NP_NSH);
    assert_eq!(hdr.path, ServicePath::new(1, 254).unwrap());

    // End of chain: the original frame, 58 bytes lighter.
    assert_eq!(out[2].bytes(), frame.as_slice());
}

#[test]
fn forwarder_counts_misses() {
    let frame = guest_udp(2000, b"abc");
    let mut ctx = forwarder_node();
    // A path to an SF with no address.
    let path = ServicePath::new(2, 255).unwrap();
    ctx.add_forwarder_sph_entry(path, SfId::new(8)).unwrap();

    let mut w = worker(ctx);
    let out = run_once(&mut w, 0, 1, vec![
        chain_encap(&frame, ServicePath::new(1, 9).unwrap()),
        chain_encap(&frame, ServicePath::new(2, 255).unwrap()),
        Packet::copy(&frame),
    ]);
    assert!(out.is_empty());

    let stats = w.ctx().stats();
    assert_eq!(stats.rx_pkts, 3);
    assert_eq!(stats.tx_pkts, 0);
    assert_eq!(stats.dropped_pkts, 3);
    assert_eq!(stats.drop_no_next_sf, 1);
    assert_eq!(stats.drop_no_sf_addr, 1);
    assert_eq!(stats.drop_malformed, 1);
}

#[test]
fn proxy_round_trip() {
    let frame = guest_udp(3000, b"through the SF");
    let tuple = guest_udp_tuple(3000);
    let mut w = worker(proxy_node());

    let to_sf = run_once(&mut w, 0, 1, vec![chain_encap(
        &frame,
        ServicePath::new(1, 255).unwrap(),
    )]);
    assert_eq!(to_sf.len(), 1);
    let bytes = to_sf[0].bytes();
    assert_eq!(bytes.len(), TUNNEL_HDR_SZ + frame.len());
    assert_eq!(&bytes[0..6], &sf_mac(3).bytes());
    assert_eq!(&bytes[6..12], &PORT1_MAC.bytes());
    assert_eq!(bytes[VXLAN_OFF + 3], VXLAN_NP_ETHERNET);
    assert_eq!(&bytes[TUNNEL_HDR_SZ..], frame.as_slice());

    // The banked header is one hop further along.
    let cached = w.ctx().proxy_flow(&tuple).unwrap();
    assert_eq!(cached.path, ServicePath::new(1, 254).unwrap());

    // The SF sends the packet back unchanged.
    let to_sff = run_once(&mut w, 1, 0, to_sf);
    assert_eq!(to_sff.len(), 1);
    let hdr = check_outer(to_sff[0].bytes(), PORT0_MAC, SFF_MAC, VXLAN_NP_NSH);
    assert_eq!(hdr, cached);
    assert_eq!(&to_sff[0].bytes()[INNER_FRAME_OFFSET_NSH..], frame.as_slice());

    let flows = w.ctx().dump_tables().proxy_flows.unwrap();
    assert_eq!(flows.entries.len(), 1);
    assert_eq!(flows.entries[0].key, tuple);
    assert_eq!(flows.entries[0].val, cached.to_u64());
    // One lookup on the way out.
    assert_eq!(flows.entries[0].hits, 1);
}

#[test]
fn proxy_outbound_needs_inbound_first() {
    let mut w = worker(proxy_node());
    let out = run_once(&mut w, 1, 0, vec![tunnel_encap(&guest_udp(4000, b""))]);

    assert!(out.is_empty());
    assert_eq!(w.ctx().stats().drop_no_flow, 1);
}

#[test]
fn proxy_drops_exhausted_chain() {
    let mut ctx = proxy_node();
    let path = ServicePath::new(1, 0).unwrap();
    ctx.add_proxy_sph_entry(path, SfId::new(3)).unwrap();
    let mut w = worker(ctx);

    let out = run_once(&mut w, 0, 1, vec![chain_encap(
        &guest_udp(4000, b""),
        path,
    )]);
    assert!(out.is_empty());
    assert_eq!(w.ctx().stats().drop_end_of_chain, 1);
    assert!(w.ctx().proxy_flow(&guest_udp_tuple(4000)).is_none());
}

#[test]
fn proxy_full_flow_table_warns_once() {
    let mut cfg = node_cfg(Role::Proxy);
    cfg.limits.proxy_flows = NonZeroU32::new(1).unwrap();
    let (mut ctx, log) = node_from(cfg);
    let path = ServicePath::new(1, 255).unwrap();
    ctx.add_proxy_sph_entry(path, SfId::new(3)).unwrap();
    ctx.add_proxy_sf_address_entry(SfId::new(3), sf_mac(3)).unwrap();

    let mut w = worker(ctx);
    let pkts = (0..4)
        .map(|port| chain_encap(&guest_udp(5000 + port, b""), path))
        .collect();
    let out = run_once(&mut w, 0, 1, pkts);

    // Every packet still reaches the SF.
    assert_eq!(out.len(), 4);
    assert_eq!(w.ctx().stats().flow_table_full, 3);
    assert_eq!(log.count(LogLevel::Warn), 1);
}

/// Classifier, forwarder, proxy, and back through the forwarder to
/// the end of the chain.
#[test]
fn full_chain_walk() {
    let frame = guest_udp(6000, b"end to end");
    let capture = std::env::temp_dir().join("sfc-full-chain-walk.pcap");
    let mut pcap = PcapBuilder::create(&capture);

    let mut classifier = node(Role::Classifier);
    let path = ServicePath::from_raw(0x0100);
    classifier.add_classifier_entry(guest_udp_tuple(6000), path).unwrap();

    let mut forwarder = node(Role::Forwarder);
    for (si, sf) in [(255, 3), (254, 0)] {
        let path = ServicePath::new(1, si).unwrap();
        forwarder.add_forwarder_sph_entry(path, SfId::new(sf)).unwrap();
    }
    forwarder.add_forwarder_sf_address(SfId::new(3), sf_mac(3)).unwrap();

    let mut nodes =
        [worker(classifier), worker(forwarder), worker(proxy_node())];

    let mut pkts = vec![Packet::copy(&frame)];
    pcap.record(&pkts[0]);
    for (node, port, egress) in [
        (0, 0, 1),
        (1, 0, 1),
        (2, 0, 1),
        // The legacy SF hands the packet back.
        (2, 1, 0),
        (1, 0, 1),
    ] {
        pkts = run_once(&mut nodes[node], port, egress, pkts);
        assert_eq!(pkts.len(), 1);
        pcap.record(&pkts[0]);
    }

    assert_eq!(pkts[0].bytes(), frame.as_slice());
    assert_eq!(nodes[1].ctx().stats().tx_pkts, 2);

    assert_eq!(pcap.hops(), 6);
    pcap.finish();
    let frames = read_frames(&std::fs::read(&capture).unwrap());
    assert_eq!(frames.len(), 6);
    assert_eq!(frames[0], frames[5]);
    assert_eq!(frames[1].len(), frame.len() + INNER_FRAME_OFFSET_NSH);
    assert_eq!(frames[3].len(), frame.len() + TUNNEL_HDR_SZ);
}

#[test]
fn duplicate_entries_rejected() {
    let mut ctx = forwarder_node();
    let path = ServicePath::new(1, 255).unwrap();

    for sf in [3, 4] {
        assert!(matches!(
            ctx.add_forwarder_sph_entry(path, SfId::new(sf)),
            Err(SfcError::DuplicateKey { .. })
        ));
    }
    assert!(matches!(
        ctx.add_forwarder_sf_address(SfId::new(3), sf_mac(3)),
        Err(SfcError::DuplicateKey { .. })
    ));

    // The original entries still steer traffic.
    let pkt = chain_encap(&guest_udp(1, b""), path);
    let out = expect_forward!(Pipeline::Forwarder.process(&mut ctx, pkt));
    assert_eq!(&out.bytes()[0..6], &sf_mac(3).bytes());
}

#[test]
fn drop_reasons_surface_per_packet() {
    let mut ctx = proxy_node();
    assert_drop!(
        Pipeline::ProxyOutbound.process(&mut ctx, Packet::copy(&[0u8; 10])),
        DropReason::Malformed(_)
    );
    assert_drop!(
        Pipeline::ProxyInbound.process(
            &mut ctx,
            chain_encap(&guest_udp(1, b""), ServicePath::new(7, 3).unwrap())
        ),
        DropReason::NoNextSf(_)
    );
}

#[test]
fn tx_shortfall_frees_and_counts() {
    let mut w = worker(node(Role::Loopback));
    w.io_mut().set_tx_limit(Some(10));
    let pkts = (0..20u16).map(|p| Packet::copy(&guest_udp(p, b""))).collect();
    let out = run_once(&mut w, 0, 1, pkts);

    assert_eq!(out.len(), 10);
    let stats = w.ctx().stats();
    assert_eq!(stats.rx_pkts, 20);
    assert_eq!(stats.tx_pkts, 10);
    assert_eq!(stats.drop_tx_shortfall, 10);
    assert_eq!(stats.dropped_pkts, 10);
}

#[test]
fn large_bursts_flush_without_drain() {
    let mut w = worker(node(Role::Loopback));
    let pkts: Vec<Packet> =
        (0..100u16).map(|p| Packet::copy(&guest_udp(p, b""))).collect();
    w.io_mut().inject(0, pkts);

    // The first poll reads one burst of 64 and sends it at once.
    let start = Instant::now();
    w.poll(start);
    assert_eq!(w.io().sent(1).len(), 64);
    assert_eq!(w.io().pending(0), 36);

    w.poll(start);
    assert_eq!(w.io().sent(1).len(), 64);
    assert_eq!(w.buffered(1), 36);

    w.poll(start + Duration::from_millis(1));
    assert_eq!(w.io().sent(1).len(), 100);
    assert_eq!(w.ctx().stats().tx_pkts, 100);
}
