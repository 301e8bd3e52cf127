// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Packet buffers and the fixed-offset header reads done on them.

use super::ether::ETHER_HDR_SZ;
use super::ether::ETHER_TYPE_IPV4;
use super::ether::EtherHdrRaw;
use super::ip4::IPV4_HDR_SZ;
use super::ip4::Ipv4HdrRaw;
use alloc::vec::Vec;
use core::fmt;
use core::fmt::Debug;
use sfc_api::FiveTuple;
use sfc_api::Protocol;
use zerocopy::FromBytes;
use zerocopy::Immutable;
use zerocopy::IntoBytes;
use zerocopy::KnownLayout;
use zerocopy::Unaligned;
use zerocopy::byteorder::network_endian::U16;

/// Headroom reserved in front of a received frame, matching the usual
/// DPDK mbuf headroom.
pub const DEFAULT_HEADROOM: usize = 128;

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error(
        "{hdr} header truncated: need {needed} bytes at offset {offset}, \
         packet has {len}"
    )]
    Truncated { hdr: &'static str, offset: usize, needed: usize, len: usize },
    #[error("expected IPv4 ethertype, found 0x{0:04X}")]
    BadEtherType(u16),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum WriteError {
    #[error("need {needed} bytes of headroom, have {avail}")]
    InsufficientHeadroom { needed: usize, avail: usize },
    #[error("cannot remove {needed} bytes from a {len} byte packet")]
    TooShort { needed: usize, len: usize },
    #[error("{len} bytes does not fit a 16-bit length field")]
    TooLong { len: usize },
}

/// A single frame with room to grow at the front.
///
/// The frame occupies `buf[start..]`; everything before `start` is
/// headroom that encapsulation may claim. Ownership of a `Packet` is
/// ownership of the buffer: dropping it frees it.
#[derive(Clone)]
pub struct Packet {
    buf: Vec<u8>,
    start: usize,
}

impl Packet {
    /// Copy `data` into a new packet with `headroom` spare bytes in
    /// front of it.
    pub fn new(headroom: usize, data: &[u8]) -> Self {
        let mut buf = vec![0u8; headroom + data.len()];
        buf[headroom..].copy_from_slice(data);
        Self { buf, start: headroom }
    }

    /// Copy `data` into a new packet with [`DEFAULT_HEADROOM`].
    pub fn copy(data: &[u8]) -> Self {
        Self::new(DEFAULT_HEADROOM, data)
    }

    pub fn len(&self) -> usize {
        self.buf.len() - self.start
    }

    pub fn headroom(&self) -> usize {
        self.start
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf[self.start..]
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buf[self.start..]
    }

    /// Grow the frame by `n` bytes at the front and return the new
    /// bytes. Their contents are unspecified.
    pub fn prepend(&mut self, n: usize) -> Result<&mut [u8], WriteError> {
        if n > self.start {
            return Err(WriteError::InsufficientHeadroom {
                needed: n,
                avail: self.start,
            });
        }

        self.start -= n;
        Ok(&mut self.buf[self.start..self.start + n])
    }

    /// Remove `n` bytes from the front of the frame.
    pub fn trim_front(&mut self, n: usize) -> Result<(), WriteError> {
        if n > self.len() {
            return Err(WriteError::TooShort { needed: n, len: self.len() });
        }

        self.start += n;
        Ok(())
    }

    /// Open an `n` byte gap at `offset`, moving the first `offset`
    /// bytes towards the front, and return the gap.
    pub fn insert_at(
        &mut self,
        offset: usize,
        n: usize,
    ) -> Result<&mut [u8], WriteError> {
        if offset > self.len() {
            return Err(WriteError::TooShort {
                needed: offset,
                len: self.len(),
            });
        }

        self.prepend(n)?;
        let start = self.start;
        self.buf.copy_within(start + n..start + n + offset, start);
        Ok(&mut self.buf[start + offset..start + offset + n])
    }

    /// Remove `n` bytes at `offset`, closing the gap by moving the
    /// first `offset` bytes back.
    pub fn remove_at(
        &mut self,
        offset: usize,
        n: usize,
    ) -> Result<(), WriteError> {
        if offset + n > self.len() {
            return Err(WriteError::TooShort {
                needed: offset + n,
                len: self.len(),
            });
        }

        let start = self.start;
        self.buf.copy_within(start..start + offset, start + n);
        self.start += n;
        Ok(())
    }

    /// View the header of type `H` at `offset`.
    pub fn hdr<H>(
        &self,
        offset: usize,
        name: &'static str,
    ) -> Result<&H, ParseError>
    where
        H: FromBytes + KnownLayout + Immutable + Unaligned,
    {
        let truncated = || ParseError::Truncated {
            hdr: name,
            offset,
            needed: size_of::<H>(),
            len: self.len(),
        };

        let bytes = self.bytes().get(offset..).ok_or_else(truncated)?;
        H::ref_from_prefix(bytes).map(|(hdr, _)| hdr).map_err(|_| truncated())
    }

    /// Mutably view the header of type `H` at `offset`.
    pub fn hdr_mut<H>(
        &mut self,
        offset: usize,
        name: &'static str,
    ) -> Result<&mut H, ParseError>
    where
        H: FromBytes + IntoBytes + KnownLayout + Unaligned,
    {
        let len = self.len();
        let truncated = ParseError::Truncated {
            hdr: name,
            offset,
            needed: size_of::<H>(),
            len,
        };

        let bytes = self.bytes_mut().get_mut(offset..).ok_or(truncated)?;
        H::mut_from_prefix(bytes).map(|(hdr, _)| hdr).map_err(|_| truncated)
    }
}

// Headroom contents are scratch space; two packets are equal when
// their frames are.
impl PartialEq for Packet {
    fn eq(&self, other: &Self) -> bool {
        self.bytes() == other.bytes()
    }
}

impl Eq for Packet {}

impl Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Packet")
            .field("len", &self.len())
            .field("headroom", &self.headroom())
            .finish()
    }
}

#[repr(C)]
#[derive(
    Clone, Debug, FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned,
)]
struct UlpPortsRaw {
    src: U16,
    dst: U16,
}

/// Read the IPv4 5-tuple of the Ethernet frame that starts at
/// `offset`.
///
/// The IPv4 header is assumed to be exactly 20 bytes; options are not
/// supported. Only TCP and UDP contribute ports, every other protocol
/// leaves them at zero.
pub fn extract_5tuple(
    pkt: &Packet,
    offset: usize,
) -> Result<FiveTuple, ParseError> {
    let eth: &EtherHdrRaw = pkt.hdr(offset, "Ethernet")?;
    let ether_type = eth.ether_type.get();
    if ether_type != ETHER_TYPE_IPV4 {
        return Err(ParseError::BadEtherType(ether_type));
    }

    let ip_off = offset + ETHER_HDR_SZ;
    let ip: &Ipv4HdrRaw = pkt.hdr(ip_off, "IPv4")?;
    let proto = Protocol::from(ip.proto);

    let (src_port, dst_port) = if proto.has_ports() {
        let ports: &UlpPortsRaw = pkt.hdr(ip_off + IPV4_HDR_SZ, "ULP")?;
        (ports.src.get(), ports.dst.get())
    } else {
        (0, 0)
    };

    Ok(FiveTuple {
        proto: ip.proto,
        src_ip: ip.src.get(),
        dst_ip: ip.dst.get(),
        src_port,
        dst_port,
    })
}
