// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Service chain identity: paths and service function identifiers.

use alloc::string::String;
use core::fmt;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

/// The service index a classifier stamps on a newly tagged flow.
///
/// Each proxy along the chain banks a decrement of this value, so a
/// chain can have at most this many hops.
pub const SI_CHAIN_START: u8 = 0xFF;

/// A position in a service chain: the 24-bit Service Path Identifier
/// (SPI) in the upper bits and the 8-bit Service Index (SI) in the low
/// byte.
///
/// This is the key of every next-hop table.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub struct ServicePath(u32);

impl ServicePath {
    pub const SPI_MAX: u32 = 0x00FF_FFFF;

    pub fn new(spi: u32, si: u8) -> Result<Self, String> {
        if spi > Self::SPI_MAX {
            return Err(format!("SPI value exceeds 24 bits: {spi}"));
        }

        Ok(Self((spi << 8) | u32::from(si)))
    }

    /// The first hop of the chain identified by `spi`.
    pub fn chain_start(spi: u32) -> Result<Self, String> {
        Self::new(spi, SI_CHAIN_START)
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u32 {
        self.0
    }

    pub const fn spi(&self) -> u32 {
        self.0 >> 8
    }

    pub const fn si(&self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    pub const fn with_si(&self, si: u8) -> Self {
        Self((self.0 & !0xFF) | si as u32)
    }

    /// The same path one hop further along, or `None` if the index is
    /// already exhausted.
    pub fn decrement(&self) -> Option<Self> {
        self.si().checked_sub(1).map(|si| self.with_si(si))
    }
}

impl From<u32> for ServicePath {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl Display for ServicePath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.spi(), self.si())
    }
}

/// Identifies a service function within a forwarder's or proxy's
/// tables.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub struct SfId(u16);

impl SfId {
    /// A next-SF entry holding this value terminates the chain.
    pub const END_OF_CHAIN: Self = Self(0);

    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    pub const fn val(&self) -> u16 {
        self.0
    }

    pub fn is_end_of_chain(&self) -> bool {
        *self == Self::END_OF_CHAIN
    }
}

impl From<u16> for SfId {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

impl Display for SfId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_end_of_chain() {
            write!(f, "END")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
