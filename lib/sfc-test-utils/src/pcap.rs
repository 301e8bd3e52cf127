// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Capture files for walking a packet through several nodes.
//!
//! Each recorded packet is stamped one microsecond after the last, so
//! a capture opened in a dissector reads as the sequence of hops.

use pcap_parser::Linktype;
use pcap_parser::ToVec;
use pcap_parser::pcap::LegacyPcapBlock;
use pcap_parser::pcap::PcapHeader;
use pcap_parser::pcap::parse_pcap_frame;
use pcap_parser::pcap::parse_pcap_header;
use sfc::engine::Packet;
use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;

const SNAPLEN: u32 = 65535;

/// Pull every frame out of the raw bytes of a capture.
pub fn read_frames(bytes: &[u8]) -> Vec<Vec<u8>> {
    let (mut rest, hdr) = parse_pcap_header(bytes)
        .unwrap_or_else(|e| panic!("bad capture header: {e:?}"));
    assert_eq!(hdr.network, Linktype::ETHERNET);

    let mut frames = vec![];
    while !rest.is_empty() {
        let (next, block) = parse_pcap_frame(rest)
            .unwrap_or_else(|e| panic!("bad capture block: {e:?}"));
        // Truncated frames would hide header bugs.
        assert_eq!(block.caplen, block.origlen);
        frames.push(block.data.to_vec());
        rest = next;
    }
    frames
}

/// Record packets, hop by hop, into a capture file.
pub struct PcapBuilder {
    out: BufWriter<File>,
    hops: u32,
}

impl PcapBuilder {
    pub fn create<P: AsRef<Path>>(path: P) -> Self {
        let mut out = BufWriter::new(File::create(path).unwrap());
        let mut hdr = PcapHeader {
            snaplen: SNAPLEN,
            network: Linktype::ETHERNET,
            ..PcapHeader::new()
        };
        out.write_all(&hdr.to_vec().unwrap()).unwrap();
        Self { out, hops: 0 }
    }

    /// Append `pkt` as the next hop.
    pub fn record(&mut self, pkt: &Packet) {
        let data = pkt.bytes();
        let len = u32::try_from(data.len()).unwrap();
        let mut block = LegacyPcapBlock {
            ts_sec: 0,
            ts_usec: self.hops,
            caplen: len,
            origlen: len,
            data,
        };
        self.out.write_all(&block.to_vec().unwrap()).unwrap();
        self.hops += 1;
    }

    pub fn hops(&self) -> u32 {
        self.hops
    }

    pub fn finish(mut self) {
        self.out.flush().unwrap();
    }
}
