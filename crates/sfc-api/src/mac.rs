// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

use alloc::str::FromStr;
use alloc::string::String;
use core::fmt;
use serde::Deserialize;
use serde::Serialize;

pub const MAC_LEN: usize = 6;

/// A link-layer address: a port's own, the SFF's, or an SF's.
#[derive(
    Clone,
    Copy,
    Default,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub struct MacAddr([u8; MAC_LEN]);

impl MacAddr {
    pub const BROADCAST: Self = Self([0xFF; MAC_LEN]);
    pub const ZERO: Self = Self([0; MAC_LEN]);

    pub const fn new(octets: [u8; MAC_LEN]) -> Self {
        Self(octets)
    }

    /// The address in wire order.
    #[inline]
    pub const fn bytes(&self) -> [u8; MAC_LEN] {
        self.0
    }
}

impl From<[u8; MAC_LEN]> for MacAddr {
    fn from(octets: [u8; MAC_LEN]) -> Self {
        Self(octets)
    }
}

/// Parse the colon-separated hex form, e.g. `02:08:20:00:ff:01`.
impl FromStr for MacAddr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; MAC_LEN];
        let mut parts = s.split(':');
        for (i, slot) in octets.iter_mut().enumerate() {
            let part = parts
                .next()
                .ok_or_else(|| format!("{s}: expected 6 octets, got {i}"))?;
            *slot = u8::from_str_radix(part, 16)
                .map_err(|_| format!("{s}: bad octet {part:?}"))?;
        }
        if parts.next().is_some() {
            return Err(format!("{s}: more than 6 octets"));
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "MacAddr({self})")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn parse_and_display() {
        let mac: MacAddr = "02:08:20:00:FF:01".parse().unwrap();
        assert_eq!(mac.bytes(), [0x02, 0x08, 0x20, 0x00, 0xFF, 0x01]);
        assert_eq!(mac.to_string(), "02:08:20:00:ff:01");
        assert_eq!(format!("{mac:?}"), "MacAddr(02:08:20:00:ff:01)");
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            "02:08:20:00:ff".parse::<MacAddr>().unwrap_err(),
            "02:08:20:00:ff: expected 6 octets, got 5"
        );
        assert_eq!(
            "02:08:20:00:ff:01:02".parse::<MacAddr>().unwrap_err(),
            "02:08:20:00:ff:01:02: more than 6 octets"
        );
        assert_eq!(
            "02:08:20:00:ff:zz".parse::<MacAddr>().unwrap_err(),
            "02:08:20:00:ff:zz: bad octet \"zz\""
        );
    }
}
