// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The classifier: the entry point of the chain network.
//!
//! A packet whose flow maps to a chain leaves wrapped in the outer
//! tunnel and a chain header addressed to the service function
//! forwarder. Anything else leaves exactly as it arrived.

use super::flow_table::FlowTable;
use super::node::NodeCtx;
use super::node::PORT1;
use super::nsh::ChainHeader;
use super::nsh::push_chain_header;
use super::packet::Packet;
use super::packet::ParseError;
use super::packet::extract_5tuple;
use super::pipeline::DropReason;
use super::pipeline::Outcome;
use super::vxlan::FIXED_ENTROPY;
use super::vxlan::TunnelEncap;
use super::vxlan::encapsulate_tunnel;
use super::vxlan::flow_entropy;
use alloc::boxed::Box;
use core::net::Ipv4Addr;
use core::num::NonZeroU32;
use sfc_api::FiveTuple;
use sfc_api::ServicePath;

/// An external classification engine.
///
/// Given the raw bytes of an inbound frame, return the raw 32-bit
/// chain path (`SPI << 8 | SI`) it belongs to, or 0 for none. How the
/// decision is made is up to the implementation.
pub trait ClassifyProgram: Send {
    fn classify(&self, frame: &[u8]) -> u32;
}

impl<F> ClassifyProgram for F
where
    F: Fn(&[u8]) -> u32 + Send,
{
    fn classify(&self, frame: &[u8]) -> u32 {
        self(frame)
    }
}

pub(crate) struct ClassifierState {
    pub(crate) flows: FlowTable<FiveTuple, ServicePath>,
    pub(crate) program: Option<Box<dyn ClassifyProgram>>,
}

impl ClassifierState {
    pub(crate) fn new(limit: NonZeroU32) -> Self {
        Self { flows: FlowTable::new("classifier", limit), program: None }
    }

    /// Resolve the chain for `pkt`, along with the outer source port
    /// to encapsulate it with.
    ///
    /// A program sees every frame. The table only holds IPv4 flows, so
    /// any other ethertype is a miss.
    fn classify(
        &mut self,
        pkt: &Packet,
    ) -> Result<Option<(ServicePath, u16)>, ParseError> {
        if let Some(prog) = &self.program {
            let raw = prog.classify(pkt.bytes());
            if raw == 0 {
                return Ok(None);
            }
            let entropy = extract_5tuple(pkt, 0)
                .map_or(FIXED_ENTROPY, |tuple| flow_entropy(&tuple));
            return Ok(Some((ServicePath::from_raw(raw), entropy)));
        }

        let tuple = match extract_5tuple(pkt, 0) {
            Ok(tuple) => tuple,
            Err(ParseError::BadEtherType(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(self.flows.lookup(&tuple).map(|path| (path, flow_entropy(&tuple))))
    }
}

pub fn process(ctx: &mut NodeCtx, pkt: Packet) -> Outcome {
    Outcome::from(classify(ctx, pkt))
}

fn classify(ctx: &mut NodeCtx, mut pkt: Packet) -> Result<Packet, DropReason> {
    let Some((path, entropy)) = ctx.classifier.classify(&pkt)? else {
        return Ok(pkt);
    };

    let egress = ctx.port(PORT1);
    let encap = TunnelEncap {
        src_mac: egress.mac,
        dst_mac: ctx.sff_mac(),
        src_ip: egress.ip.unwrap_or(Ipv4Addr::UNSPECIFIED),
        dst_ip: ctx.sff_ip().unwrap_or(Ipv4Addr::UNSPECIFIED),
        vni: ctx.vni(),
        entropy,
    };

    encapsulate_tunnel(&mut pkt, &encap)?;
    push_chain_header(&mut pkt, &ChainHeader::new(path))?;
    Ok(pkt)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::engine::node::test::node;
    use crate::engine::nsh::INNER_FRAME_OFFSET_NSH;
    use crate::engine::nsh::peek_chain_header;
    use sfc_api::Protocol;
    use sfc_api::Role;

    fn udp_frame() -> ([u8; 42], FiveTuple) {
        #[rustfmt::skip]
        let frame = [
            // Ethernet
            0x02, 0, 0, 0, 0, 0xB, 0x02, 0, 0, 0, 0, 0xA, 0x08, 0x00,
            // IPv4: 10.0.0.1 -> 10.0.0.2, UDP, checksum not checked
            0x45, 0x00, 0x00, 0x1C, 0x00, 0x00, 0x40, 0x00,
            0x40, 0x11, 0x00, 0x00, 10, 0, 0, 1, 10, 0, 0, 2,
            // UDP 1000 -> 2000
            0x03, 0xE8, 0x07, 0xD0, 0x00, 0x08, 0x00, 0x00,
        ];
        let tuple = FiveTuple::new(
            Protocol::UDP,
            Ipv4Addr::new(10, 0, 0, 1),
            Ipv4Addr::new(10, 0, 0, 2),
            1000,
            2000,
        );
        (frame, tuple)
    }

    #[test]
    fn miss_is_untouched() {
        let mut node = node(Role::Classifier);
        let (frame, _) = udp_frame();
        let Outcome::Forward(out) = process(&mut node, Packet::copy(&frame))
        else {
            panic!("expected forward");
        };
        assert_eq!(out.bytes(), &frame);
    }

    #[test]
    fn hit_is_tagged() {
        let mut node = node(Role::Classifier);
        let (frame, tuple) = udp_frame();
        node.add_classifier_entry(tuple, ServicePath::from_raw(0x0100))
            .unwrap();

        let Outcome::Forward(out) = process(&mut node, Packet::copy(&frame))
        else {
            panic!("expected forward");
        };
        assert_eq!(out.len(), frame.len() + INNER_FRAME_OFFSET_NSH);
        assert_eq!(&out.bytes()[0..6], &node.sff_mac().bytes());
        assert_eq!(&out.bytes()[6..12], &node.port(PORT1).mac.bytes());
        assert_eq!(
            peek_chain_header(&out).unwrap().path,
            ServicePath::from_raw(0x01FF)
        );
        assert_eq!(&out.bytes()[INNER_FRAME_OFFSET_NSH..], &frame);
    }

    #[test]
    fn program_replaces_table() {
        let mut node = node(Role::Classifier);
        let (frame, tuple) = udp_frame();
        node.add_classifier_entry(tuple, ServicePath::from_raw(0x0100))
            .unwrap();
        // Chain only frames whose inner IPv4 TTL is 64.
        node.set_classify_program(Box::new(|frame: &[u8]| -> u32 {
            if frame.get(22) == Some(&0x40) { 0x0002_05FF } else { 0 }
        }));

        let Outcome::Forward(out) = process(&mut node, Packet::copy(&frame))
        else {
            panic!("expected forward");
        };
        assert_eq!(
            peek_chain_header(&out).unwrap().path,
            ServicePath::from_raw(0x0002_05FF)
        );

        let mut other = frame;
        other[22] = 0x3F;
        let Outcome::Forward(out) = process(&mut node, Packet::copy(&other))
        else {
            panic!("expected forward");
        };
        assert_eq!(out.bytes(), &other);
    }

    #[test]
    fn non_ipv4_is_untouched() {
        let mut node = node(Role::Classifier);
        let (mut frame, tuple) = udp_frame();
        node.add_classifier_entry(tuple, ServicePath::from_raw(0x0100))
            .unwrap();
        frame[12..14].copy_from_slice(&[0x08, 0x06]);

        let Outcome::Forward(out) = process(&mut node, Packet::copy(&frame))
        else {
            panic!("expected forward");
        };
        assert_eq!(out.bytes(), &frame);
    }

    #[test]
    fn runt_is_dropped() {
        let mut node = node(Role::Classifier);
        let (frame, _) = udp_frame();
        assert!(matches!(
            process(&mut node, Packet::copy(&frame[..20])),
            Outcome::Drop(DropReason::Malformed(_))
        ));
    }

    #[test]
    fn program_sees_non_ipv4() {
        let mut node = node(Role::Classifier);
        let (mut frame, _) = udp_frame();
        frame[12..14].copy_from_slice(&[0x08, 0x06]);
        node.set_classify_program(Box::new(|frame: &[u8]| -> u32 {
            let arp = frame.get(12..14) == Some(&[0x08, 0x06][..]);
            if arp { 0x0000_07FF } else { 0 }
        }));

        let Outcome::Forward(out) = process(&mut node, Packet::copy(&frame))
        else {
            panic!("expected forward");
        };
        assert_eq!(
            peek_chain_header(&out).unwrap().path,
            ServicePath::from_raw(0x0000_07FF)
        );
        // Outer UDP source port, right after Ethernet and IPv4.
        assert_eq!(&out.bytes()[34..36], &FIXED_ENTROPY.to_be_bytes());
        assert_eq!(&out.bytes()[INNER_FRAME_OFFSET_NSH..], &frame);
    }
}
