// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! An in-memory packet device.

use sfc::engine::Packet;
use sfc::engine::io::PacketIo;
use std::collections::BTreeMap;
use std::collections::VecDeque;

/// A device whose ports are plain queues.
///
/// Received packets are whatever the test injected. Transmitted
/// packets are kept per port for inspection. A transmit limit makes
/// the device accept at most that many packets per `tx_burst()` call.
#[derive(Debug, Default)]
pub struct MemIo {
    rx: BTreeMap<u16, VecDeque<Packet>>,
    tx: BTreeMap<u16, Vec<Packet>>,
    tx_limit: Option<usize>,
    tx_calls: usize,
}

impl MemIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject<I>(&mut self, port: u16, pkts: I)
    where
        I: IntoIterator<Item = Packet>,
    {
        self.rx.entry(port).or_default().extend(pkts);
    }

    pub fn pending(&self, port: u16) -> usize {
        self.rx.get(&port).map_or(0, VecDeque::len)
    }

    pub fn sent(&self, port: u16) -> &[Packet] {
        self.tx.get(&port).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn take_sent(&mut self, port: u16) -> Vec<Packet> {
        self.tx.remove(&port).unwrap_or_default()
    }

    pub fn set_tx_limit(&mut self, limit: Option<usize>) {
        self.tx_limit = limit;
    }

    /// The number of times the device was offered packets.
    pub fn tx_calls(&self) -> usize {
        self.tx_calls
    }
}

impl PacketIo for MemIo {
    fn rx_burst(&mut self, port: u16, _queue: u16, max: usize) -> Vec<Packet> {
        match self.rx.get_mut(&port) {
            Some(q) => {
                let n = max.min(q.len());
                q.drain(..n).collect()
            }
            None => Vec::new(),
        }
    }

    fn tx_burst(
        &mut self,
        port: u16,
        _queue: u16,
        pkts: &mut Vec<Packet>,
    ) -> usize {
        self.tx_calls += 1;
        let n = self.tx_limit.unwrap_or(usize::MAX).min(pkts.len());
        self.tx.entry(port).or_default().extend(pkts.drain(..n));
        n
    }
}
