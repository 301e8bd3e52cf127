// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The burst loop.
//!
//! One [`Worker`] owns the [`NodeCtx`] and the device. Each iteration
//! it first drains every transmit buffer if the drain interval has
//! passed, then polls each ingress port once: receive a burst, run it
//! through the port's pipeline, count the drops, and buffer the rest
//! for the pipeline's egress port. Nothing blocks; an idle port is
//! simply skipped.

use super::io::BURST_SIZE;
use super::io::PacketIo;
use super::io::TxBuffer;
use super::io::TxResult;
use super::node::NUM_PORTS;
use super::node::NodeCtx;
use super::packet::Packet;
use super::pipeline::DropReason;
use super::pipeline::Outcome;
use super::pipeline::Pipeline;
use core::ops::ControlFlow;
use itertools::Either;
use itertools::Itertools;
use std::time::Duration;
use std::time::Instant;

/// How long a packet may sit in a transmit buffer of a quiet port.
pub const BURST_TX_DRAIN_US: u64 = 100;

/// The only queue used on each port.
const QUEUE: u16 = 0;

pub struct Worker<IO> {
    ctx: NodeCtx,
    io: IO,
    ingress: Vec<(usize, Pipeline)>,
    tx: Vec<TxBuffer>,
    drain: Duration,
    last_drain: Instant,
}

impl<IO: PacketIo> Worker<IO> {
    pub fn new(ctx: NodeCtx, io: IO, drain: Duration) -> Self {
        let ingress: Vec<(usize, Pipeline)> = (0..NUM_PORTS)
            .filter_map(|idx| {
                Pipeline::for_port(ctx.role(), idx).map(|p| (idx, p))
            })
            .collect();

        for (idx, pipeline) in &ingress {
            let egress = pipeline.egress_port();
            ctx.log().note(&format!(
                "{} pipeline: port {} -> port {}",
                pipeline,
                ctx.port(*idx).id,
                ctx.port(egress).id,
            ));
        }

        let tx =
            ctx.ports().iter().map(|p| TxBuffer::new(p.id, QUEUE)).collect();

        Self { ctx, io, ingress, tx, drain, last_drain: Instant::now() }
    }

    pub fn ctx(&self) -> &NodeCtx {
        &self.ctx
    }

    pub fn ctx_mut(&mut self) -> &mut NodeCtx {
        &mut self.ctx
    }

    pub fn io(&self) -> &IO {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut IO {
        &mut self.io
    }

    pub fn into_parts(self) -> (NodeCtx, IO) {
        (self.ctx, self.io)
    }

    /// Packets currently waiting in the transmit buffer of port index
    /// `idx`.
    pub fn buffered(&self, idx: usize) -> usize {
        self.tx[idx].len()
    }

    /// Run one iteration of the loop as of `now`, returning the number
    /// of packets received.
    pub fn poll(&mut self, now: Instant) -> usize {
        if now.saturating_duration_since(self.last_drain) > self.drain {
            self.flush_all();
            self.last_drain = now;
        }

        let mut received = 0;

        for i in 0..self.ingress.len() {
            let (idx, pipeline) = self.ingress[i];
            let port_id = self.ctx.port(idx).id;
            let pkts = self.io.rx_burst(port_id, QUEUE, BURST_SIZE);
            if pkts.is_empty() {
                continue;
            }

            received += pkts.len();
            self.ctx.counters_mut().rx_pkts += pkts.len();

            let (fwd, drops): (Vec<Packet>, Vec<DropReason>) = pipeline
                .process_batch(&mut self.ctx, pkts)
                .into_iter()
                .partition_map(|outcome| match outcome {
                    Outcome::Forward(pkt) => Either::Left(pkt),
                    Outcome::Drop(reason) => Either::Right(reason),
                });

            let stats = self.ctx.counters_mut();
            for reason in &drops {
                stats.record_drop(reason);
            }

            let egress = &mut self.tx[pipeline.egress_port()];
            let mut res = TxResult::default();
            for pkt in fwd {
                res += egress.buffer(&mut self.io, pkt);
            }
            self.ctx.counters_mut().record_tx(res);
        }

        received
    }

    /// Hand every buffered packet to the device now.
    pub fn flush_all(&mut self) {
        let mut res = TxResult::default();
        for buf in &mut self.tx {
            res += buf.flush(&mut self.io);
        }
        self.ctx.counters_mut().record_tx(res);
    }

    /// Poll until `control` breaks, then flush what is left.
    ///
    /// `control` runs between iterations with full access to the
    /// node; it is where counters are printed or reset and where the
    /// caller decides to stop.
    pub fn run<F>(&mut self, mut control: F)
    where
        F: FnMut(&mut NodeCtx, &IO) -> ControlFlow<()>,
    {
        loop {
            self.poll(Instant::now());
            if control(&mut self.ctx, &self.io).is_break() {
                break;
            }
        }

        self.flush_all();
    }
}
