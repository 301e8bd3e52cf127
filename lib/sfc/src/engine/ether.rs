// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Ethernet frames.

use super::packet::Packet;
use super::packet::ParseError;
use sfc_api::MacAddr;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;
use zerocopy::byteorder::network_endian::U16;

pub const ETHER_TYPE_IPV4: u16 = 0x0800;
pub const ETHER_TYPE_ARP: u16 = 0x0806;

pub const ETHER_HDR_SZ: usize = size_of::<EtherHdrRaw>();

#[repr(C)]
#[derive(
    Clone, Debug, FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
)]
pub struct EtherHdrRaw {
    pub dst: [u8; 6],
    pub src: [u8; 6],
    pub ether_type: U16,
}

impl EtherHdrRaw {
    pub fn new(src: MacAddr, dst: MacAddr, ether_type: u16) -> Self {
        Self {
            dst: dst.bytes(),
            src: src.bytes(),
            ether_type: U16::new(ether_type),
        }
    }
}

/// Overwrite the source and destination of the outermost Ethernet
/// header.
pub fn rewrite_macs(
    pkt: &mut Packet,
    src: MacAddr,
    dst: MacAddr,
) -> Result<(), ParseError> {
    let eth: &mut EtherHdrRaw = pkt.hdr_mut(0, "Ethernet")?;
    eth.src = src.bytes();
    eth.dst = dst.bytes();
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rewrite() {
        #[rustfmt::skip]
        let bytes = [
            0x02, 0x00, 0x00, 0x00, 0x00, 0x02,
            0x02, 0x00, 0x00, 0x00, 0x00, 0x01,
            0x08, 0x06,
            0xDE, 0xAD,
        ];
        let mut pkt = Packet::copy(&bytes);
        let src = MacAddr::from([0xA8, 0x40, 0x25, 0x00, 0x00, 0x0A]);
        let dst = MacAddr::from([0xA8, 0x40, 0x25, 0x00, 0x00, 0x0B]);
        rewrite_macs(&mut pkt, src, dst).unwrap();

        #[rustfmt::skip]
        let expected = [
            0xA8, 0x40, 0x25, 0x00, 0x00, 0x0B,
            0xA8, 0x40, 0x25, 0x00, 0x00, 0x0A,
            0x08, 0x06,
            0xDE, 0xAD,
        ];
        assert_eq!(pkt.bytes(), &expected);
    }

    #[test]
    fn rewrite_runt() {
        let mut pkt = Packet::copy(&[0u8; 13]);
        assert!(rewrite_macs(&mut pkt, MacAddr::ZERO, MacAddr::ZERO).is_err());
    }
}
