// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The packet I/O boundary and per-port transmit buffering.

use super::packet::Packet;
use alloc::vec::Vec;
use core::ops::AddAssign;

/// The most packets received, or buffered for transmit, at once.
pub const BURST_SIZE: usize = 64;

/// A device the burst loop can receive from and transmit to.
///
/// The engine never touches hardware. Whatever hosts it, a NIC
/// driver, a pcap replay, or a test harness, implements this trait.
pub trait PacketIo {
    /// Receive at most `max` packets. This must not block: an idle
    /// port yields an empty `Vec`.
    fn rx_burst(&mut self, port: u16, queue: u16, max: usize) -> Vec<Packet>;

    /// Offer `pkts` for transmission.
    ///
    /// The device removes the packets it accepts from the front of
    /// `pkts` and returns how many that was. Any packets left in
    /// `pkts` were refused and remain the caller's.
    fn tx_burst(
        &mut self,
        port: u16,
        queue: u16,
        pkts: &mut Vec<Packet>,
    ) -> usize;
}

/// What became of the packets handed to the device.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TxResult {
    pub sent: usize,
    /// Refused by the device and freed.
    pub dropped: usize,
}

impl AddAssign for TxResult {
    fn add_assign(&mut self, other: Self) {
        self.sent += other.sent;
        self.dropped += other.dropped;
    }
}

/// Packets waiting to go out of one port.
///
/// The buffer is handed to the device as soon as it holds
/// [`BURST_SIZE`] packets, or whenever [`TxBuffer::flush()`] is called.
/// A short send is never retried: refused packets are freed on the
/// spot.
#[derive(Debug)]
pub struct TxBuffer {
    port: u16,
    queue: u16,
    pkts: heapless::Vec<Packet, BURST_SIZE>,
}

impl TxBuffer {
    pub fn new(port: u16, queue: u16) -> Self {
        Self { port, queue, pkts: heapless::Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.pkts.len()
    }

    /// Queue `pkt`, sending the whole buffer if that filled it.
    pub fn buffer<IO: PacketIo>(
        &mut self,
        io: &mut IO,
        pkt: Packet,
    ) -> TxResult {
        // The buffer is sent the moment it fills, so there is always
        // room for one more.
        let pushed = self.pkts.push(pkt);
        debug_assert!(pushed.is_ok(), "tx buffer for port {} full", self.port);

        if self.pkts.is_full() {
            return self.flush(io);
        }
        TxResult::default()
    }

    /// Hand everything buffered to the device.
    pub fn flush<IO: PacketIo>(&mut self, io: &mut IO) -> TxResult {
        if self.pkts.is_empty() {
            return TxResult::default();
        }

        let mut pkts: Vec<Packet> =
            core::mem::take(&mut self.pkts).into_iter().collect();
        let queued = pkts.len();
        let sent = io.tx_burst(self.port, self.queue, &mut pkts);
        let dropped = pkts.len();
        debug_assert_eq!(sent + dropped, queued);
        TxResult { sent, dropped }
    }
}
