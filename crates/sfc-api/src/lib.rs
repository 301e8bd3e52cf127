// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

#![no_std]
#![deny(unreachable_patterns)]
#![deny(unused_must_use)]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

#[macro_use]
extern crate alloc;

use alloc::string::String;
use core::fmt;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

pub mod chain;
pub mod cmd;
pub mod flow;
pub mod mac;
pub mod stat;

pub use chain::*;
pub use cmd::*;
pub use flow::*;
pub use mac::*;
pub use stat::*;

/// The SFC entity a node plays.
///
/// All roles share the same engine; the role decides which tables are
/// populated from configuration and which pipeline is attached to each
/// ingress port.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Role {
    /// Assigns new flows to a chain and tags them.
    Classifier,
    /// Translates between chain-encapsulated traffic and legacy SFs.
    Proxy,
    /// Advances a packet to the next hop of its chain.
    Forwarder,
    /// Reflects everything from port 0 out of port 1. Testing only.
    Loopback,
}

impl core::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "classifier" => Ok(Role::Classifier),
            "proxy" => Ok(Role::Proxy),
            "forwarder" | "sff" => Ok(Role::Forwarder),
            "loopback" => Ok(Role::Loopback),
            _ => Err(format!("invalid role: {}", s)),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let role = match self {
            Role::Classifier => "classifier",
            Role::Proxy => "proxy",
            Role::Forwarder => "forwarder",
            Role::Loopback => "loopback",
        };

        write!(f, "{}", role)
    }
}
