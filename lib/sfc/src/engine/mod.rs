// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The SFC engine.

pub mod checksum;
pub mod classifier;
pub mod ether;
pub mod flow_table;
pub mod forwarder;
pub mod io;
pub mod ip4;
pub mod node;
pub mod nsh;
pub mod packet;
pub mod pipeline;
pub mod proxy;
pub mod stat;
pub mod udp;
pub mod vxlan;
#[cfg(feature = "std")]
pub mod worker;

pub use node::NodeCfg;
pub use node::NodeCtx;
pub use packet::Packet;
pub use pipeline::DropReason;
pub use pipeline::Outcome;
pub use pipeline::Pipeline;
