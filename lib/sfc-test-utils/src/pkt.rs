// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Frame generation.
//!
//! Inner frames are emitted with smoltcp's wire types, so they are
//! built independently of the engine's own header codec.

use crate::SFF_IP;
use crate::SFF_MAC;
use crate::TEST_VNI;
use sfc::api::MacAddr;
use sfc::api::ServicePath;
use sfc::engine::Packet;
use sfc::engine::nsh::ChainHeader;
use sfc::engine::nsh::push_chain_header;
use sfc::engine::vxlan::TunnelEncap;
use sfc::engine::vxlan::Vni;
use sfc::engine::vxlan::encapsulate_tunnel;
use smoltcp::phy::ChecksumCapabilities;
use smoltcp::wire::ArpOperation;
use smoltcp::wire::ArpPacket;
use smoltcp::wire::ArpRepr;
use smoltcp::wire::EthernetAddress;
use smoltcp::wire::EthernetFrame;
use smoltcp::wire::EthernetProtocol;
use smoltcp::wire::EthernetRepr;
use smoltcp::wire::Icmpv4Packet;
use smoltcp::wire::Icmpv4Repr;
use smoltcp::wire::IpAddress;
use smoltcp::wire::IpProtocol;
use smoltcp::wire::Ipv4Address;
use smoltcp::wire::Ipv4Packet;
use smoltcp::wire::Ipv4Repr;
use smoltcp::wire::TcpPacket;
use smoltcp::wire::TcpSeqNumber;
use smoltcp::wire::UdpPacket;
use smoltcp::wire::UdpRepr;
use std::net::Ipv4Addr;

pub const ETH_LEN: usize = 14;
pub const IP4_LEN: usize = 20;
pub const UDP_LEN: usize = 8;
pub const TCP_LEN: usize = 20;

fn eth_addr(mac: MacAddr) -> EthernetAddress {
    EthernetAddress(mac.bytes())
}

fn ip4_addr(ip: Ipv4Addr) -> Ipv4Address {
    Ipv4Address::from_bytes(&ip.octets())
}

/// Emit Ethernet and IPv4 headers in front of a `ulp` already written
/// into `buf[ETH_LEN + IP4_LEN..]`.
fn emit_eth_ip4(
    buf: &mut [u8],
    eth_src: MacAddr,
    eth_dst: MacAddr,
    ip_src: Ipv4Addr,
    ip_dst: Ipv4Addr,
    proto: IpProtocol,
) {
    let eth = EthernetRepr {
        src_addr: eth_addr(eth_src),
        dst_addr: eth_addr(eth_dst),
        ethertype: EthernetProtocol::Ipv4,
    };
    eth.emit(&mut EthernetFrame::new_unchecked(&mut buf[..]));

    let ip = Ipv4Repr {
        src_addr: ip4_addr(ip_src),
        dst_addr: ip4_addr(ip_dst),
        next_header: proto,
        payload_len: buf.len() - ETH_LEN - IP4_LEN,
        hop_limit: 64,
    };
    ip.emit(
        &mut Ipv4Packet::new_unchecked(&mut buf[ETH_LEN..]),
        &ChecksumCapabilities::default(),
    );
}

pub fn gen_udp_frame(
    eth_src: MacAddr,
    eth_dst: MacAddr,
    ip_src: Ipv4Addr,
    ip_dst: Ipv4Addr,
    src_port: u16,
    dst_port: u16,
    payload: &[u8],
) -> Vec<u8> {
    let mut buf = vec![0u8; ETH_LEN + IP4_LEN + UDP_LEN + payload.len()];

    let udp = UdpRepr { src_port, dst_port };
    udp.emit(
        &mut UdpPacket::new_unchecked(&mut buf[ETH_LEN + IP4_LEN..]),
        &IpAddress::Ipv4(ip4_addr(ip_src)),
        &IpAddress::Ipv4(ip4_addr(ip_dst)),
        payload.len(),
        |buf| buf.copy_from_slice(payload),
        &ChecksumCapabilities::default(),
    );

    emit_eth_ip4(&mut buf, eth_src, eth_dst, ip_src, ip_dst, IpProtocol::Udp);
    buf
}

/// A bare TCP SYN.
pub fn gen_tcp_syn(
    eth_src: MacAddr,
    eth_dst: MacAddr,
    ip_src: Ipv4Addr,
    ip_dst: Ipv4Addr,
    src_port: u16,
    dst_port: u16,
) -> Vec<u8> {
    let mut buf = vec![0u8; ETH_LEN + IP4_LEN + TCP_LEN];

    let mut tcp = TcpPacket::new_unchecked(&mut buf[ETH_LEN + IP4_LEN..]);
    tcp.set_src_port(src_port);
    tcp.set_dst_port(dst_port);
    tcp.set_seq_number(TcpSeqNumber(0x1000));
    tcp.set_header_len(TCP_LEN as u8);
    tcp.clear_flags();
    tcp.set_syn(true);
    tcp.set_window_len(64240);
    tcp.fill_checksum(
        &IpAddress::Ipv4(ip4_addr(ip_src)),
        &IpAddress::Ipv4(ip4_addr(ip_dst)),
    );

    emit_eth_ip4(&mut buf, eth_src, eth_dst, ip_src, ip_dst, IpProtocol::Tcp);
    buf
}

pub fn gen_icmp_echo_req(
    eth_src: MacAddr,
    eth_dst: MacAddr,
    ip_src: Ipv4Addr,
    ip_dst: Ipv4Addr,
    ident: u16,
    seq_no: u16,
    data: &[u8],
) -> Vec<u8> {
    let icmp = Icmpv4Repr::EchoRequest { ident, seq_no, data };
    let mut buf = vec![0u8; ETH_LEN + IP4_LEN + icmp.buffer_len()];
    icmp.emit(
        &mut Icmpv4Packet::new_unchecked(&mut buf[ETH_LEN + IP4_LEN..]),
        &ChecksumCapabilities::default(),
    );

    emit_eth_ip4(&mut buf, eth_src, eth_dst, ip_src, ip_dst, IpProtocol::Icmp);
    buf
}

/// An ARP request from `eth_src`/`ip_src` asking for `ip_target`.
pub fn gen_arp_req(
    eth_src: MacAddr,
    ip_src: Ipv4Addr,
    ip_target: Ipv4Addr,
) -> Vec<u8> {
    let arp = ArpRepr::EthernetIpv4 {
        operation: ArpOperation::Request,
        source_hardware_addr: eth_addr(eth_src),
        source_protocol_addr: ip4_addr(ip_src),
        target_hardware_addr: EthernetAddress([0; 6]),
        target_protocol_addr: ip4_addr(ip_target),
    };
    let mut buf = vec![0u8; ETH_LEN + arp.buffer_len()];

    let eth = EthernetRepr {
        src_addr: eth_addr(eth_src),
        dst_addr: EthernetAddress::BROADCAST,
        ethertype: EthernetProtocol::Arp,
    };
    eth.emit(&mut EthernetFrame::new_unchecked(&mut buf[..]));
    arp.emit(&mut ArpPacket::new_unchecked(&mut buf[ETH_LEN..]));
    buf
}

/// The guest's UDP frame towards the server.
pub fn guest_udp(src_port: u16, payload: &[u8]) -> Vec<u8> {
    gen_udp_frame(
        crate::GUEST_MAC,
        crate::SERVER_MAC,
        crate::GUEST_IP,
        crate::SERVER_IP,
        src_port,
        53,
        payload,
    )
}

/// Wrap `frame` the way a classifier would: tunnel from the SFF plus
/// a chain header carrying `path`.
pub fn chain_encap(frame: &[u8], path: ServicePath) -> Packet {
    let mut pkt = tunnel_encap(frame);
    push_chain_header(&mut pkt, &ChainHeader::new(path)).unwrap();
    pkt
}

/// Wrap `frame` in the outer tunnel only, as a proxy hands it to a
/// legacy SF.
pub fn tunnel_encap(frame: &[u8]) -> Packet {
    let mut pkt = Packet::copy(frame);
    let encap = TunnelEncap {
        src_mac: SFF_MAC,
        dst_mac: crate::PORT0_MAC,
        src_ip: SFF_IP,
        dst_ip: crate::PORT1_IP,
        vni: Vni::new(TEST_VNI).unwrap(),
        entropy: 0xC0DE,
    };
    encapsulate_tunnel(&mut pkt, &encap).unwrap();
    pkt
}
