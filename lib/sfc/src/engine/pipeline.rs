// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The per-port packet pipelines.
//!
//! Each ingress port of a node runs at most one [`Pipeline`]. A
//! pipeline takes a received batch by value and decides, packet by
//! packet, whether to forward it out of the pipeline's egress port or
//! drop it. Nothing escapes `process_batch` but [`Outcome`]s: a parse
//! failure or table miss is a drop, never an error.

use super::classifier;
use super::forwarder;
use super::node::NodeCtx;
use super::node::PORT0;
use super::node::PORT1;
use super::packet::Packet;
use super::packet::ParseError;
use super::packet::WriteError;
use super::proxy;
use alloc::vec::Vec;
use core::fmt;
use core::fmt::Display;
use sfc_api::FiveTuple;
use sfc_api::Role;
use sfc_api::ServicePath;
use sfc_api::SfId;

/// Why a pipeline dropped a packet.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DropReason {
    /// The headers at the expected offsets could not be read.
    Malformed(ParseError),
    /// No next-SF entry for the packet's path.
    NoNextSf(ServicePath),
    /// No address for the resolved SF.
    NoSfAddr(SfId),
    /// Proxy outbound traffic for a flow never seen inbound.
    NoFlow(FiveTuple),
    /// A new flow arrived at a proxy with its service index exhausted.
    EndOfChain(ServicePath),
    /// Adding or removing headers failed.
    Encap(WriteError),
}

impl Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Malformed(e) => write!(f, "malformed: {e}"),
            Self::NoNextSf(path) => write!(f, "no next SF for path {path}"),
            Self::NoSfAddr(sf) => write!(f, "no address for SF {sf}"),
            Self::NoFlow(tuple) => write!(f, "no flow for {tuple}"),
            Self::EndOfChain(path) => write!(f, "chain exhausted at {path}"),
            Self::Encap(e) => write!(f, "encap: {e}"),
        }
    }
}

impl From<ParseError> for DropReason {
    fn from(e: ParseError) -> Self {
        Self::Malformed(e)
    }
}

impl From<WriteError> for DropReason {
    fn from(e: WriteError) -> Self {
        Self::Encap(e)
    }
}

/// The fate of a single packet.
#[derive(Debug)]
pub enum Outcome {
    /// Transmit the (possibly rewritten) packet.
    Forward(Packet),
    /// The packet has been freed.
    Drop(DropReason),
}

impl<E: Into<DropReason>> From<Result<Packet, E>> for Outcome {
    fn from(res: Result<Packet, E>) -> Self {
        match res {
            Ok(pkt) => Self::Forward(pkt),
            Err(e) => Self::Drop(e.into()),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Pipeline {
    Classifier,
    ProxyInbound,
    ProxyOutbound,
    Forwarder,
    Loopback,
}

impl Pipeline {
    /// The pipeline `role` runs on packets received on `port`, if any.
    pub fn for_port(role: Role, port: usize) -> Option<Self> {
        match (role, port) {
            (Role::Classifier, PORT0) => Some(Self::Classifier),
            (Role::Proxy, PORT0) => Some(Self::ProxyInbound),
            (Role::Proxy, PORT1) => Some(Self::ProxyOutbound),
            (Role::Forwarder, PORT0) => Some(Self::Forwarder),
            (Role::Loopback, PORT0) => Some(Self::Loopback),
            _ => None,
        }
    }

    /// The port forwarded packets leave through.
    pub fn egress_port(&self) -> usize {
        match self {
            Self::ProxyOutbound => PORT0,
            _ => PORT1,
        }
    }

    pub fn process_batch(
        &self,
        ctx: &mut NodeCtx,
        pkts: Vec<Packet>,
    ) -> Vec<Outcome> {
        pkts.into_iter().map(|pkt| self.process(ctx, pkt)).collect()
    }

    pub fn process(&self, ctx: &mut NodeCtx, pkt: Packet) -> Outcome {
        match self {
            Self::Classifier => classifier::process(ctx, pkt),
            Self::ProxyInbound => proxy::process_inbound(ctx, pkt),
            Self::ProxyOutbound => proxy::process_outbound(ctx, pkt),
            Self::Forwarder => forwarder::process(ctx, pkt),
            Self::Loopback => Outcome::Forward(pkt),
        }
    }
}

impl Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Classifier => "classifier",
            Self::ProxyInbound => "proxy-in",
            Self::ProxyOutbound => "proxy-out",
            Self::Forwarder => "forwarder",
            Self::Loopback => "loopback",
        };
        write!(f, "{name}")
    }
}
