// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! IPv4 headers.

use super::checksum::Checksum;
use super::checksum::HeaderChecksum;
use core::net::Ipv4Addr;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;
use zerocopy::byteorder::network_endian::U16;
use zerocopy::byteorder::network_endian::U32;

pub const IPV4_HDR_SZ: usize = size_of::<Ipv4HdrRaw>();
pub const DEF_TTL: u8 = 64;

/// Version 4, 5 words of header.
const VER_HDR_LEN: u8 = 0x45;
/// Don't Fragment, offset 0.
const FLAGS_DF: [u8; 2] = [0x40, 0x00];

/// An IPv4 header without options.
#[repr(C)]
#[derive(
    Clone, Debug, FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
)]
pub struct Ipv4HdrRaw {
    pub ver_hdr_len: u8,
    pub dscp_ecn: u8,
    pub total_len: U16,
    pub ident: U16,
    pub frag_and_flags: [u8; 2],
    pub ttl: u8,
    pub proto: u8,
    pub csum: [u8; 2],
    pub src: U32,
    pub dst: U32,
}

impl Ipv4HdrRaw {
    /// A DF-marked header for a datagram of `total_len` bytes, header
    /// included, with its checksum filled in.
    pub fn new(
        src: Ipv4Addr,
        dst: Ipv4Addr,
        proto: u8,
        total_len: u16,
    ) -> Self {
        let mut hdr = Self {
            ver_hdr_len: VER_HDR_LEN,
            dscp_ecn: 0,
            total_len: U16::new(total_len),
            ident: U16::ZERO,
            frag_and_flags: FLAGS_DF,
            ttl: DEF_TTL,
            proto,
            csum: [0; 2],
            src: U32::new(u32::from(src)),
            dst: U32::new(u32::from(dst)),
        };
        hdr.compute_csum();
        hdr
    }

    /// Update the total length and recompute the header checksum.
    pub fn set_total_len(&mut self, total_len: u16) {
        self.total_len = U16::new(total_len);
        self.compute_csum();
    }

    pub fn compute_csum(&mut self) {
        self.csum = [0; 2];
        let csum = Checksum::compute(self.as_bytes());
        self.csum = HeaderChecksum::from(csum).bytes();
    }
}
