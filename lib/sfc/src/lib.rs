// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! A service function chaining (SFC) data-plane node.
//!
//! One engine serves every SFC role. A *classifier* tags new flows
//! with a chain, a *forwarder* steers tagged packets to the next
//! service function (SF) of their chain, and a *proxy* strips and
//! restores the chain header around legacy SFs that do not understand
//! it.
//!
//! The pieces, leaves first:
//!
//! * [`engine::nsh`], [`engine::vxlan`], [`engine::packet`]: the wire
//!   codec for the outer tunnel, the chain header, and inner 5-tuple
//!   extraction.
//! * [`engine::flow_table`]: fixed-capacity exact-match tables.
//! * [`engine::classifier`], [`engine::forwarder`], [`engine::proxy`]:
//!   the per-role packet pipelines, tied together by
//!   [`engine::pipeline::Pipeline`].
//! * [`engine::worker`]: the burst receive/process/transmit loop.
#![cfg_attr(not(feature = "std"), no_std)]
#![allow(clippy::len_without_is_empty)]
#![deny(unreachable_patterns)]
#![deny(unused_must_use)]

#[macro_use]
extern crate alloc;

/// The shared types, re-exported so hosts need only depend on this
/// crate.
pub mod api {
    pub use sfc_api::*;
}
#[cfg(feature = "std")]
pub mod cfg;
pub mod engine;
#[cfg(feature = "std")]
pub mod print;
pub mod provider;
