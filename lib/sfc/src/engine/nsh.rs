// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The chain header, an 8-byte NSH base + service path header.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |Ver|   Flags   |    Length     |  Rsvd |MD Type| Next Protocol |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |          Service Path Identifier              | Service Index |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! The header sits between the outer tunnel and the inner frame. No
//! context headers follow it.

use super::packet::Packet;
use super::packet::ParseError;
use super::packet::WriteError;
use super::vxlan::TUNNEL_HDR_SZ;
use super::vxlan::VXLAN_NP_ETHERNET;
use super::vxlan::VXLAN_NP_NSH;
use super::vxlan::refresh_tunnel;
use core::fmt;
use core::fmt::Display;
use sfc_api::ServicePath;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;
use zerocopy::byteorder::network_endian::U16;
use zerocopy::byteorder::network_endian::U32;

pub const NSH_HDR_SZ: usize = size_of::<NshHdrRaw>();

/// Where the inner Ethernet frame starts in a chain-encapsulated
/// packet.
pub const INNER_FRAME_OFFSET_NSH: usize = TUNNEL_HDR_SZ + NSH_HDR_SZ;

pub const NSH_VERSION: u8 = 0;
/// Header length in 4-byte words for a header with no context
/// headers.
pub const NSH_BASE_LEN: u8 = 2;
pub const NSH_MD_TYPE_2: u8 = 0x2;
pub const NSH_NP_ETHERNET: u8 = 0x3;

const VERSION_MASK: u8 = 0x03;
const FLAGS_MASK: u8 = 0x3F;
const MD_TYPE_MASK: u8 = 0x0F;

#[repr(C)]
#[derive(
    Clone, Debug, FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
)]
pub struct NshHdrRaw {
    pub ver_flags_len: U16,
    pub md_type: u8,
    pub next_proto: u8,
    pub path: U32,
}

/// A decoded chain header.
///
/// A header is valid when `version`, `flags`, and `md_type` fit their
/// 2, 6, and 4 bit fields. Encoding masks out anything wider.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChainHeader {
    pub version: u8,
    pub flags: u8,
    pub length: u8,
    pub md_type: u8,
    pub next_proto: u8,
    pub path: ServicePath,
}

impl ChainHeader {
    /// The header this node puts on traffic it tags: no flags, no
    /// context headers, carrying Ethernet.
    pub fn new(path: ServicePath) -> Self {
        Self {
            version: NSH_VERSION,
            flags: 0,
            length: NSH_BASE_LEN,
            md_type: NSH_MD_TYPE_2,
            next_proto: NSH_NP_ETHERNET,
            path,
        }
    }

    pub fn encode(&self) -> [u8; NSH_HDR_SZ] {
        let ver_flags_len = (u16::from(self.version & VERSION_MASK) << 14)
            | (u16::from(self.flags & FLAGS_MASK) << 8)
            | u16::from(self.length);

        let raw = NshHdrRaw {
            ver_flags_len: U16::new(ver_flags_len),
            md_type: self.md_type & MD_TYPE_MASK,
            next_proto: self.next_proto,
            path: U32::new(self.path.raw()),
        };
        zerocopy::transmute!(raw)
    }

    /// Decode the 8 header bytes. Every byte pattern decodes; the
    /// reserved bits are dropped.
    pub fn decode(bytes: [u8; NSH_HDR_SZ]) -> Self {
        let raw: NshHdrRaw = zerocopy::transmute!(bytes);
        Self::from(&raw)
    }

    /// The big-endian reading of the encoded header, for storing a
    /// whole header as a table value.
    pub fn to_u64(&self) -> u64 {
        u64::from_be_bytes(self.encode())
    }

    pub fn from_u64(val: u64) -> Self {
        Self::decode(val.to_be_bytes())
    }
}

impl From<&NshHdrRaw> for ChainHeader {
    fn from(raw: &NshHdrRaw) -> Self {
        let ver_flags_len = raw.ver_flags_len.get();
        Self {
            version: (ver_flags_len >> 14) as u8,
            flags: ((ver_flags_len >> 8) as u8) & FLAGS_MASK,
            length: ver_flags_len as u8,
            md_type: raw.md_type & MD_TYPE_MASK,
            next_proto: raw.next_proto,
            path: ServicePath::from_raw(raw.path.get()),
        }
    }
}

impl Display for ChainHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "NSH path={} md={} np={}",
            self.path, self.md_type, self.next_proto
        )
    }
}

/// Read the chain header of a chain-encapsulated packet.
pub fn peek_chain_header(pkt: &Packet) -> Result<ChainHeader, ParseError> {
    let raw: &NshHdrRaw = pkt.hdr(TUNNEL_HDR_SZ, "NSH")?;
    Ok(ChainHeader::from(raw))
}

/// Insert `hdr` between the outer tunnel and the inner frame.
pub fn push_chain_header(
    pkt: &mut Packet,
    hdr: &ChainHeader,
) -> Result<(), WriteError> {
    pkt.insert_at(TUNNEL_HDR_SZ, NSH_HDR_SZ)?.copy_from_slice(&hdr.encode());
    refresh_tunnel(pkt, VXLAN_NP_NSH)
}

/// Remove the chain header, leaving the tunnel directly in front of
/// the inner frame.
pub fn pop_chain_header(pkt: &mut Packet) -> Result<(), WriteError> {
    pkt.remove_at(TUNNEL_HDR_SZ, NSH_HDR_SZ)?;
    refresh_tunnel(pkt, VXLAN_NP_ETHERNET)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::engine::vxlan::TunnelEncap;
    use crate::engine::vxlan::TunnelHdrRaw;
    use crate::engine::vxlan::Vni;
    use crate::engine::vxlan::encapsulate_tunnel;
    use core::net::Ipv4Addr;
    use rand::Rng;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use sfc_api::MacAddr;

    #[test]
    fn encode_bits() {
        let hdr = ChainHeader {
            version: 0x1,
            flags: 0x2A,
            length: 6,
            md_type: NSH_MD_TYPE_2,
            next_proto: NSH_NP_ETHERNET,
            path: ServicePath::new(0x000102, 0xFE).unwrap(),
        };

        #[rustfmt::skip]
        let expected = [
            // ver 01, flags 101010, length 6
            0x6A, 0x06,
            // md type
            0x02,
            // next protocol
            0x03,
            // SPI 0x000102, SI 0xFE
            0x00, 0x01, 0x02, 0xFE,
        ];
        assert_eq!(hdr.encode(), expected);
        assert_eq!(ChainHeader::decode(expected), hdr);
        assert_eq!(hdr.to_u64(), 0x6A06_0203_0001_02FE);
        assert_eq!(ChainHeader::from_u64(hdr.to_u64()), hdr);
    }

    #[test]
    fn round_trips() {
        let mut rng = StdRng::seed_from_u64(0x4E5348);
        for _ in 0..4096 {
            let hdr = ChainHeader {
                version: rng.random_range(0..=VERSION_MASK),
                flags: rng.random_range(0..=FLAGS_MASK),
                length: rng.random(),
                md_type: rng.random_range(0..=MD_TYPE_MASK),
                next_proto: rng.random(),
                path: ServicePath::from_raw(rng.random()),
            };
            assert_eq!(ChainHeader::decode(hdr.encode()), hdr);
            assert_eq!(ChainHeader::from_u64(hdr.to_u64()), hdr);

            // And from the wire side, with the reserved nibble clear.
            let raw = rng.random::<u64>() & !0x0000_F000_0000_0000;
            assert_eq!(ChainHeader::from_u64(raw).to_u64(), raw);
        }
    }

    #[test]
    fn decode_drops_reserved_bits() {
        let bytes = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        let hdr = ChainHeader::decode(bytes);
        assert_eq!(hdr.version, 0x3);
        assert_eq!(hdr.flags, 0x3F);
        assert_eq!(hdr.md_type, 0xF);
        assert_eq!(hdr.path.raw(), u32::MAX);
        assert_eq!(
            hdr.encode(),
            [0xFF, 0xFF, 0x0F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(ChainHeader::decode(hdr.encode()), hdr);
    }

    #[test]
    fn default_header() {
        let hdr = ChainHeader::new(ServicePath::chain_start(1).unwrap());
        assert_eq!(
            hdr.encode(),
            [0x00, 0x02, 0x02, 0x03, 0x00, 0x00, 0x01, 0xFF]
        );
    }

    #[test]
    fn push_pop_keeps_tunnel_consistent() {
        let encap = TunnelEncap {
            src_mac: MacAddr::ZERO,
            dst_mac: MacAddr::BROADCAST,
            src_ip: Ipv4Addr::new(10, 0, 0, 1),
            dst_ip: Ipv4Addr::new(10, 0, 0, 2),
            vni: Vni::default(),
            entropy: 0xC001,
        };
        let mut pkt = Packet::copy(&[0x11; 42]);
        encapsulate_tunnel(&mut pkt, &encap).unwrap();
        let encapped = pkt.clone();

        let hdr = ChainHeader::new(ServicePath::new(9, 3).unwrap());
        push_chain_header(&mut pkt, &hdr).unwrap();
        assert_eq!(pkt.len(), encapped.len() + NSH_HDR_SZ);
        assert_eq!(peek_chain_header(&pkt).unwrap(), hdr);
        assert_eq!(&pkt.bytes()[INNER_FRAME_OFFSET_NSH..], &[0x11; 42]);

        let tun: &TunnelHdrRaw = pkt.hdr(0, "tunnel").unwrap();
        assert_eq!(usize::from(tun.ip.total_len.get()), pkt.len() - 14);
        assert_eq!(usize::from(tun.udp.len.get()), pkt.len() - 34);
        assert_eq!(tun.vxlan.next_proto, VXLAN_NP_NSH);

        pop_chain_header(&mut pkt).unwrap();
        assert_eq!(pkt, encapped);
    }

    #[test]
    fn peek_runt() {
        let pkt = Packet::copy(&[0; TUNNEL_HDR_SZ + 4]);
        assert!(matches!(
            peek_chain_header(&pkt),
            Err(ParseError::Truncated { hdr: "NSH", .. })
        ));
    }
}
