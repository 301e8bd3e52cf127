// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! UDP headers.

use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;
use zerocopy::byteorder::network_endian::U16;

pub const UDP_HDR_SZ: usize = size_of::<UdpHdrRaw>();

#[repr(C)]
#[derive(
    Clone, Debug, FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
)]
pub struct UdpHdrRaw {
    pub src_port: U16,
    pub dst_port: U16,
    pub len: U16,
    pub csum: [u8; 2],
}

impl UdpHdrRaw {
    /// A header for a datagram of `len` bytes, header included. The
    /// checksum is left at zero, which IPv4 permits.
    pub fn new(src_port: u16, dst_port: u16, len: u16) -> Self {
        Self {
            src_port: U16::new(src_port),
            dst_port: U16::new(dst_port),
            len: U16::new(len),
            csum: [0; 2],
        }
    }
}
