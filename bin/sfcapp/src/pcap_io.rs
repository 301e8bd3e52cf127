// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! A packet device backed by capture files.
//!
//! Each port may replay one input capture and writes everything
//! transmitted on it to an output capture.

use anyhow::Context;
use anyhow::anyhow;
use pcap_parser::Linktype;
use pcap_parser::ToVec;
use pcap_parser::pcap;
use pcap_parser::pcap::LegacyPcapBlock;
use pcap_parser::pcap::PcapHeader;
use sfc::engine::Packet;
use sfc::engine::io::PacketIo;
use sfc::engine::packet::DEFAULT_HEADROOM;
use slog::Logger;
use std::collections::VecDeque;
use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;

const SNAPLEN: u32 = 65535;

/// Read every frame of a legacy pcap file.
pub fn read_capture(path: &Path) -> anyhow::Result<Vec<Packet>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("reading {}", path.display()))?;

    let (mut rest, hdr) = pcap::parse_pcap_header(&bytes)
        .map_err(|e| anyhow!("{}: bad pcap header: {e:?}", path.display()))?;
    if hdr.network != Linktype::ETHERNET {
        anyhow::bail!("{}: not an Ethernet capture", path.display());
    }

    let mut pkts = Vec::new();
    while !rest.is_empty() {
        let (new_rest, block) = pcap::parse_pcap_frame(rest).map_err(|e| {
            anyhow!("{}: bad frame {}: {e:?}", path.display(), pkts.len())
        })?;
        pkts.push(Packet::new(DEFAULT_HEADROOM, block.data));
        rest = new_rest;
    }

    Ok(pkts)
}

struct CaptureWriter {
    out: BufWriter<File>,
}

impl CaptureWriter {
    fn create(path: &Path) -> anyhow::Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        let mut out = BufWriter::new(file);

        let mut hdr = PcapHeader {
            magic_number: 0xa1b2c3d4,
            version_major: 2,
            version_minor: 4,
            thiszone: 0,
            sigfigs: 0,
            snaplen: SNAPLEN,
            network: Linktype::ETHERNET,
        };
        let bytes = hdr
            .to_vec()
            .map_err(|e| anyhow!("serializing pcap header: {e:?}"))?;
        out.write_all(&bytes)?;

        Ok(Self { out })
    }

    fn write(&mut self, pkt: &Packet) -> anyhow::Result<()> {
        let data = pkt.bytes();
        let mut block = LegacyPcapBlock {
            ts_sec: 0,
            ts_usec: 0,
            caplen: data.len() as u32,
            origlen: data.len() as u32,
            data,
        };
        let bytes = block
            .to_vec()
            .map_err(|e| anyhow!("serializing pcap frame: {e:?}"))?;
        self.out.write_all(&bytes)?;
        Ok(())
    }
}

struct PcapPort {
    rx: VecDeque<Packet>,
    tx: CaptureWriter,
}

pub struct PcapIo {
    ports: Vec<PcapPort>,
    log: Logger,
}

impl PcapIo {
    /// Open one device port per entry of `ports`: an optional input
    /// capture and the output capture.
    pub fn open(
        ports: &[(Option<&Path>, &Path)],
        log: Logger,
    ) -> anyhow::Result<Self> {
        let ports = ports
            .iter()
            .map(|(rx, tx)| -> anyhow::Result<PcapPort> {
                let rx = match rx {
                    Some(path) => read_capture(path)?.into(),
                    None => VecDeque::new(),
                };
                Ok(PcapPort { rx, tx: CaptureWriter::create(tx)? })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self { ports, log })
    }

    /// True once every input capture has been fully replayed.
    pub fn rx_done(&self) -> bool {
        self.ports.iter().all(|p| p.rx.is_empty())
    }

    pub fn finish(&mut self) -> anyhow::Result<()> {
        for port in &mut self.ports {
            port.tx.out.flush()?;
        }
        Ok(())
    }
}

impl PacketIo for PcapIo {
    fn rx_burst(&mut self, port: u16, _queue: u16, max: usize) -> Vec<Packet> {
        match self.ports.get_mut(usize::from(port)) {
            Some(p) => {
                let n = max.min(p.rx.len());
                p.rx.drain(..n).collect()
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
        let Some(p) = self.ports.get_mut(usize::from(port)) else {
            return 0;
        };

        // Stop at the first packet the capture cannot take; the rest
        // are refused.
        let mut sent = 0;
        for pkt in pkts.iter() {
            if let Err(e) = p.tx.write(pkt) {
                slog::error!(self.log, "capture write failed";
                    "port" => port, "err" => %e);
                break;
            }
            sent += 1;
        }

        pkts.drain(..sent);
        sent
    }
}
