// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The outer tunnel: Ethernet + IPv4 + UDP + VXLAN-GPE.
//!
//! Chain-encapsulated traffic travels between SFC elements inside this
//! tunnel, with the chain header (if any) immediately after the VXLAN
//! header and the original Ethernet frame after that:
//!
//! ```text
//! | Ethernet | IPv4 | UDP | VXLAN-GPE | [NSH] | inner Ethernet frame |
//!  <------------ 50 bytes ----------->  8 B
//! ```
use super::ether::ETHER_HDR_SZ;
use super::ether::ETHER_TYPE_IPV4;
use super::ether::EtherHdrRaw;
use super::ip4::IPV4_HDR_SZ;
use super::ip4::Ipv4HdrRaw;
use super::packet::Packet;
use super::packet::WriteError;
use super::udp::UDP_HDR_SZ;
use super::udp::UdpHdrRaw;
use alloc::string::String;
use core::fmt;
use core::fmt::Display;
use core::hash::Hash;
use core::net::Ipv4Addr;
use crc32fast::Hasher;
use serde::Deserialize;
use serde::Serialize;
use sfc_api::FiveTuple;
use sfc_api::MacAddr;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;

pub const VXLAN_PORT: u16 = 4789;
pub const VXLAN_HDR_SZ: usize = size_of::<VxlanHdrRaw>();
pub const TUNNEL_HDR_SZ: usize = size_of::<TunnelHdrRaw>();

/// The I (VNI valid) and P (next protocol present) flags.
pub const VXLAN_GPE_FLAGS: u8 = 0x0C;
pub const VXLAN_NP_ETHERNET: u8 = 0x03;
pub const VXLAN_NP_NSH: u8 = 0x04;

const IP_PROTO_UDP: u8 = 0x11;

/// Source ports are drawn from the IANA dynamic range so that
/// middleboxes see a plausible ephemeral port.
const ENTROPY_PORT_BASE: u16 = 0xC000;
const ENTROPY_PORT_MASK: u16 = 0x3FFF;

/// Source port for frames without a readable IPv4 flow.
pub const FIXED_ENTROPY: u16 = ENTROPY_PORT_BASE;

/// A 24-bit VXLAN Network Identifier.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub struct Vni(u32);

impl Vni {
    pub const MAX: u32 = 0x00FF_FFFF;

    pub fn new(val: u32) -> Result<Self, String> {
        if val > Self::MAX {
            return Err(format!("VNI value exceeds maximum: {val}"));
        }

        Ok(Self(val))
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    fn bytes(&self) -> [u8; 3] {
        let [_, hi, mid, lo] = self.0.to_be_bytes();
        [hi, mid, lo]
    }
}

impl TryFrom<u32> for Vni {
    type Error = String;

    fn try_from(val: u32) -> Result<Self, Self::Error> {
        Self::new(val)
    }
}

impl From<Vni> for u32 {
    fn from(vni: Vni) -> u32 {
        vni.0
    }
}

impl Display for Vni {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[repr(C)]
#[derive(
    Clone, Debug, FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
)]
pub struct VxlanHdrRaw {
    pub flags: u8,
    pub reserved: [u8; 2],
    pub next_proto: u8,
    pub vni: [u8; 3],
    pub reserved2: u8,
}

/// The complete outer header stack, laid out as it sits on the wire.
#[repr(C)]
#[derive(
    Clone, Debug, FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
)]
pub struct TunnelHdrRaw {
    pub eth: EtherHdrRaw,
    pub ip: Ipv4HdrRaw,
    pub udp: UdpHdrRaw,
    pub vxlan: VxlanHdrRaw,
}

/// The addressing used for the outer tunnel of a packet.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TunnelEncap {
    pub src_mac: MacAddr,
    pub dst_mac: MacAddr,
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub vni: Vni,
    /// UDP source port; see [`flow_entropy()`].
    pub entropy: u16,
}

/// Derive a UDP source port from the inner flow so that one flow
/// always takes the same path through ECMP underlays.
pub fn flow_entropy(tuple: &FiveTuple) -> u16 {
    let mut hasher = Hasher::new();
    tuple.hash(&mut hasher);
    let hash = hasher.finalize();
    ENTROPY_PORT_BASE | ((hash as u16) & ENTROPY_PORT_MASK)
}

fn len_field(len: usize) -> Result<u16, WriteError> {
    u16::try_from(len).map_err(|_| WriteError::TooLong { len })
}

/// Wrap the whole packet in a new outer tunnel.
///
/// The VXLAN next protocol is Ethernet; pushing a chain header
/// afterwards switches it to NSH.
pub fn encapsulate_tunnel(
    pkt: &mut Packet,
    encap: &TunnelEncap,
) -> Result<(), WriteError> {
    let udp_len = len_field(UDP_HDR_SZ + VXLAN_HDR_SZ + pkt.len())?;
    let ip_len = len_field(IPV4_HDR_SZ + usize::from(udp_len))?;

    let hdr = TunnelHdrRaw {
        eth: EtherHdrRaw::new(encap.src_mac, encap.dst_mac, ETHER_TYPE_IPV4),
        ip: Ipv4HdrRaw::new(encap.src_ip, encap.dst_ip, IP_PROTO_UDP, ip_len),
        udp: UdpHdrRaw::new(encap.entropy, VXLAN_PORT, udp_len),
        vxlan: VxlanHdrRaw {
            flags: VXLAN_GPE_FLAGS,
            reserved: [0; 2],
            next_proto: VXLAN_NP_ETHERNET,
            vni: encap.vni.bytes(),
            reserved2: 0,
        },
    };

    pkt.prepend(TUNNEL_HDR_SZ)?.copy_from_slice(hdr.as_bytes());
    Ok(())
}

/// Strip the outer tunnel, leaving whatever followed it at the front
/// of the packet.
pub fn decapsulate_tunnel(pkt: &mut Packet) -> Result<(), WriteError> {
    pkt.trim_front(TUNNEL_HDR_SZ)
}

/// Bring the outer lengths, IPv4 checksum, and VXLAN next protocol
/// back in line after the bytes behind the tunnel changed.
pub(crate) fn refresh_tunnel(
    pkt: &mut Packet,
    next_proto: u8,
) -> Result<(), WriteError> {
    let len = pkt.len();
    let ip_len = len_field(len.saturating_sub(ETHER_HDR_SZ))?;
    let udp_len = len_field(len.saturating_sub(ETHER_HDR_SZ + IPV4_HDR_SZ))?;

    let tun: &mut TunnelHdrRaw = pkt
        .hdr_mut(0, "tunnel")
        .map_err(|_| WriteError::TooShort { needed: TUNNEL_HDR_SZ, len })?;
    tun.ip.set_total_len(ip_len);
    tun.udp.len.set(udp_len);
    tun.vxlan.next_proto = next_proto;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn encap() -> TunnelEncap {
        TunnelEncap {
            src_mac: MacAddr::from([0xA8, 0x40, 0x25, 0x00, 0x00, 0x01]),
            dst_mac: MacAddr::from([0xA8, 0x40, 0x25, 0x00, 0x00, 0x02]),
            src_ip: Ipv4Addr::new(10, 0, 0, 1),
            dst_ip: Ipv4Addr::new(10, 0, 0, 2),
            vni: Vni::new(0x123456).unwrap(),
            entropy: 0xC0DE,
        }
    }

    #[test]
    fn tunnel_is_fifty_bytes() {
        assert_eq!(TUNNEL_HDR_SZ, 50);
        assert_eq!(VXLAN_HDR_SZ, 8);
    }

    #[test]
    fn encap_bytes() {
        let inner = [0xEE; 16];
        let mut pkt = Packet::copy(&inner);
        encapsulate_tunnel(&mut pkt, &encap()).unwrap();
        assert_eq!(pkt.len(), 66);

        #[rustfmt::skip]
        let expected_hdr = [
            // Ethernet
            0xA8, 0x40, 0x25, 0x00, 0x00, 0x02,
            0xA8, 0x40, 0x25, 0x00, 0x00, 0x01,
            0x08, 0x00,
            // IPv4: total length 52, checksum 0x26B7
            0x45, 0x00, 0x00, 0x34,
            0x00, 0x00, 0x40, 0x00,
            0x40, 0x11, 0x26, 0xB7,
            0x0A, 0x00, 0x00, 0x01,
            0x0A, 0x00, 0x00, 0x02,
            // UDP: length 32, checksum 0
            0xC0, 0xDE, 0x12, 0xB5,
            0x00, 0x20, 0x00, 0x00,
            // VXLAN-GPE
            0x0C, 0x00, 0x00, 0x03,
            0x12, 0x34, 0x56, 0x00,
        ];
        assert_eq!(&pkt.bytes()[..TUNNEL_HDR_SZ], &expected_hdr);
        assert_eq!(&pkt.bytes()[TUNNEL_HDR_SZ..], &inner);
    }

    #[test]
    fn decap_undoes_encap() {
        let orig = Packet::copy(&[0x5A; 64]);
        let mut pkt = orig.clone();
        encapsulate_tunnel(&mut pkt, &encap()).unwrap();
        decapsulate_tunnel(&mut pkt).unwrap();
        assert_eq!(pkt, orig);
        assert_eq!(pkt.headroom(), orig.headroom());
    }

    #[test]
    fn encap_without_headroom() {
        let mut pkt = Packet::new(TUNNEL_HDR_SZ - 1, &[0; 20]);
        assert_eq!(
            encapsulate_tunnel(&mut pkt, &encap()),
            Err(WriteError::InsufficientHeadroom {
                needed: TUNNEL_HDR_SZ,
                avail: TUNNEL_HDR_SZ - 1,
            })
        );
        assert_eq!(pkt.len(), 20);
    }

    #[test]
    fn decap_runt() {
        let mut pkt = Packet::copy(&[0; 49]);
        assert_eq!(
            decapsulate_tunnel(&mut pkt),
            Err(WriteError::TooShort { needed: 50, len: 49 })
        );
    }

    #[test]
    fn entropy_is_stable_and_ephemeral() {
        let tuple = FiveTuple {
            proto: 17,
            src_ip: 0x0A00_0001,
            dst_ip: 0x0A00_0002,
            src_port: 1000,
            dst_port: 2000,
        };
        let port = flow_entropy(&tuple);
        assert_eq!(port, flow_entropy(&tuple));
        assert!(port >= 0xC000);
    }

    #[test]
    fn vni_range() {
        assert!(Vni::new(0x0100_0000).is_err());
        assert_eq!(Vni::new(7).unwrap().bytes(), [0, 0, 7]);
    }
}
