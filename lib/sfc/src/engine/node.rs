// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The node context: everything a pipeline reads or updates.
//!
//! A [`NodeCtx`] owns the port identities, the role's tables, and the
//! counters. It is passed by `&mut` into every pipeline call; there is
//! no other shared state. A single worker drives it, so the proxy's
//! lookup-then-insert on a new flow cannot race.

use super::classifier::ClassifierState;
use super::classifier::ClassifyProgram;
use super::forwarder::NextHopTables;
use super::nsh::ChainHeader;
use super::proxy::ProxyState;
use super::stat::NodeCounters;
use super::vxlan::Vni;
use crate::provider::LogProvider;
use crate::provider::Providers;
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::net::Ipv4Addr;
use core::num::NonZeroU32;
use sfc_api::DumpTablesResp;
use sfc_api::FiveTuple;
use sfc_api::MacAddr;
use sfc_api::NodeStats;
use sfc_api::Role;
use sfc_api::ServicePath;
use sfc_api::SfId;
use sfc_api::SfcError;

/// The first port. Ingress for every pipeline except proxy outbound.
pub const PORT0: usize = 0;
/// The second port. Egress towards the chain for classifiers and
/// forwarders, towards the legacy SF for proxies.
pub const PORT1: usize = 1;

pub const NUM_PORTS: usize = 2;

/// The identity of one of the node's ports.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PortCfg {
    /// The device's port number.
    pub id: u16,
    pub mac: MacAddr,
    pub ip: Option<Ipv4Addr>,
}

/// Table capacities.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TableLimits {
    pub classifier_flows: NonZeroU32,
    pub forwarder_paths: NonZeroU32,
    pub forwarder_sfs: NonZeroU32,
    pub proxy_flows: NonZeroU32,
    pub proxy_paths: NonZeroU32,
    pub proxy_sfs: NonZeroU32,
}

const fn limit(n: u32) -> NonZeroU32 {
    match NonZeroU32::new(n) {
        Some(n) => n,
        None => NonZeroU32::MIN,
    }
}

impl Default for TableLimits {
    fn default() -> Self {
        Self {
            classifier_flows: limit(1024),
            forwarder_paths: limit(64),
            forwarder_sfs: limit(64),
            proxy_flows: limit(1024),
            proxy_paths: limit(64),
            proxy_sfs: limit(64),
        }
    }
}

/// Static configuration for a node.
#[derive(Clone, Debug)]
pub struct NodeCfg {
    pub role: Role,
    /// Exactly [`NUM_PORTS`] ports.
    pub ports: Vec<PortCfg>,
    /// The MAC of the service function forwarder this node sends
    /// chain traffic to.
    pub sff_mac: MacAddr,
    /// The IPv4 address of that forwarder, used as the outer
    /// destination by the classifier.
    pub sff_ip: Option<Ipv4Addr>,
    pub vni: Vni,
    pub limits: TableLimits,
}

pub struct NodeCtx {
    role: Role,
    ports: [PortCfg; NUM_PORTS],
    sff_mac: MacAddr,
    sff_ip: Option<Ipv4Addr>,
    vni: Vni,
    pub(crate) classifier: ClassifierState,
    pub(crate) forwarder: NextHopTables,
    pub(crate) proxy: ProxyState,
    pub(crate) stats: NodeCounters,
    log: Box<dyn LogProvider>,
}

impl NodeCtx {
    pub fn new(cfg: NodeCfg, providers: Providers) -> Result<Self, SfcError> {
        let ports: [PortCfg; NUM_PORTS] = match cfg.ports.as_slice() {
            [p0, p1] => [*p0, *p1],
            ports if ports.len() < NUM_PORTS => {
                return Err(SfcError::MissingPort {
                    role: cfg.role,
                    needed: NUM_PORTS,
                    found: ports.len(),
                });
            }
            ports => {
                return Err(SfcError::BadConfig(format!(
                    "{} ports configured, a node uses exactly {NUM_PORTS}",
                    ports.len()
                )));
            }
        };

        let limits = cfg.limits;

        Ok(Self {
            role: cfg.role,
            ports,
            sff_mac: cfg.sff_mac,
            sff_ip: cfg.sff_ip,
            vni: cfg.vni,
            classifier: ClassifierState::new(limits.classifier_flows),
            forwarder: NextHopTables::new(
                "forwarder",
                limits.forwarder_paths,
                limits.forwarder_sfs,
            ),
            proxy: ProxyState::new(
                limits.proxy_flows,
                limits.proxy_paths,
                limits.proxy_sfs,
            ),
            stats: NodeCounters::default(),
            log: providers.log,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn port(&self, idx: usize) -> &PortCfg {
        &self.ports[idx]
    }

    pub fn ports(&self) -> &[PortCfg] {
        &self.ports
    }

    pub fn sff_mac(&self) -> MacAddr {
        self.sff_mac
    }

    pub fn sff_ip(&self) -> Option<Ipv4Addr> {
        self.sff_ip
    }

    pub fn vni(&self) -> Vni {
        self.vni
    }

    pub fn log(&self) -> &dyn LogProvider {
        &*self.log
    }

    pub fn counters_mut(&mut self) -> &mut NodeCounters {
        &mut self.stats
    }

    pub fn stats(&self) -> NodeStats {
        self.stats.snapshot()
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Tag `tuple` with the chain `path` names.
    ///
    /// The service index of `path` is replaced with
    /// [`sfc_api::SI_CHAIN_START`]: a classifier always starts a
    /// packet at the head of its chain.
    pub fn add_classifier_entry(
        &mut self,
        tuple: FiveTuple,
        path: ServicePath,
    ) -> Result<(), SfcError> {
        let path = path.with_si(sfc_api::SI_CHAIN_START);
        self.classifier.flows.insert(tuple, path)?;
        self.log.note(&format!("added classifier entry {tuple} -> {path}"));
        Ok(())
    }

    /// Install a classification program. While one is installed it
    /// replaces the classifier table.
    pub fn set_classify_program(&mut self, prog: Box<dyn ClassifyProgram>) {
        self.classifier.program = Some(prog);
        self.log.note("installed classification program");
    }

    pub fn add_forwarder_sph_entry(
        &mut self,
        path: ServicePath,
        sf: SfId,
    ) -> Result<(), SfcError> {
        self.forwarder.next_sf.insert(path, sf)?;
        self.log.note(&format!("added forwarder path {path} -> SF {sf}"));
        Ok(())
    }

    pub fn add_forwarder_sf_address(
        &mut self,
        sf: SfId,
        mac: MacAddr,
    ) -> Result<(), SfcError> {
        self.forwarder.sf_addr.insert(sf, mac)?;
        self.log.note(&format!("added forwarder SF {sf} at {mac}"));
        Ok(())
    }

    pub fn add_proxy_sph_entry(
        &mut self,
        path: ServicePath,
        sf: SfId,
    ) -> Result<(), SfcError> {
        self.proxy.hops.next_sf.insert(path, sf)?;
        self.log.note(&format!("added proxy path {path} -> SF {sf}"));
        Ok(())
    }

    pub fn add_proxy_sf_address_entry(
        &mut self,
        sf: SfId,
        mac: MacAddr,
    ) -> Result<(), SfcError> {
        self.proxy.hops.sf_addr.insert(sf, mac)?;
        self.log.note(&format!("added proxy SF {sf} at {mac}"));
        Ok(())
    }

    /// The chain header cached for `tuple` by the proxy, if any.
    pub fn proxy_flow(&self, tuple: &FiveTuple) -> Option<ChainHeader> {
        self.proxy.flows.get(tuple).map(|entry| *entry.state())
    }

    /// Dump the tables this node's role uses.
    pub fn dump_tables(&self) -> DumpTablesResp {
        let mut resp = DumpTablesResp {
            role: self.role,
            classifier: None,
            next_sf: None,
            sf_addr: None,
            proxy_flows: None,
        };

        match self.role {
            Role::Classifier => {
                resp.classifier = Some(self.classifier.flows.dump());
            }
            Role::Forwarder => {
                resp.next_sf = Some(self.forwarder.next_sf.dump());
                resp.sf_addr = Some(self.forwarder.sf_addr.dump());
            }
            Role::Proxy => {
                resp.next_sf = Some(self.proxy.hops.next_sf.dump());
                resp.sf_addr = Some(self.proxy.hops.sf_addr.dump());
                resp.proxy_flows =
                    Some(self.proxy.flows.dump_with(ChainHeader::to_u64));
            }
            Role::Loopback => {}
        }

        resp
    }
}
