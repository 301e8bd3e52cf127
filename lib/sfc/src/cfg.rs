// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Node configuration files.
//!
//! A node is described by a single TOML file: its ports, the SFF it
//! sends chain traffic to, and the static table entries for its role.
//!
//! ```toml
//! sff_mac = "02:00:00:00:ff:01"
//! sff_ip = "10.0.0.254"
//!
//! [[port]]
//! mac = "02:00:00:00:00:01"
//!
//! [[port]]
//! mac = "02:00:00:00:00:02"
//! ip = "10.0.0.1"
//!
//! [[classifier]]
//! proto = "udp"
//! src_ip = "10.0.0.1"
//! dst_ip = "10.0.0.2"
//! src_port = 1000
//! dst_port = 2000
//! spi = 1
//! ```
//!
//! The `[[sph]]` and `[[sf]]` tables populate the forwarder tables of
//! a forwarder and the proxy tables of a proxy. Sections a role has
//! no use for are ignored.

use crate::engine::node::NodeCfg;
use crate::engine::node::NodeCtx;
use crate::engine::node::PortCfg;
use crate::engine::node::TableLimits;
use crate::engine::vxlan::Vni;
use crate::engine::worker::BURST_TX_DRAIN_US;
use serde::Deserialize;
use serde::Deserializer;
use sfc_api::FiveTuple;
use sfc_api::MacAddr;
use sfc_api::Protocol;
use sfc_api::Role;
use sfc_api::ServicePath;
use sfc_api::SfId;
use sfc_api::SfcError;
use std::net::Ipv4Addr;
use std::num::NonZeroU32;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid {field}: {msg}")]
    Invalid { field: &'static str, msg: String },

    #[error(transparent)]
    Node(#[from] SfcError),
}

impl ConfigError {
    fn invalid(field: &'static str, msg: impl Into<String>) -> Self {
        Self::Invalid { field, msg: msg.into() }
    }
}

fn mac_from_str<'de, D>(deserializer: D) -> Result<MacAddr, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    MacAddr::from_str(&s).map_err(serde::de::Error::custom)
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SfcConfig {
    #[serde(deserialize_with = "mac_from_str")]
    pub sff_mac: MacAddr,
    #[serde(default)]
    pub sff_ip: Option<Ipv4Addr>,
    #[serde(default)]
    pub vni: Option<Vni>,
    /// Transmit drain interval in microseconds.
    #[serde(default)]
    pub drain_us: Option<u64>,
    #[serde(default, rename = "port")]
    pub ports: Vec<PortEntry>,
    #[serde(default)]
    pub limits: LimitsEntry,
    #[serde(default)]
    pub classifier: Vec<ClassifierEntry>,
    #[serde(default)]
    pub sph: Vec<SphEntry>,
    #[serde(default)]
    pub sf: Vec<SfEntry>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortEntry {
    #[serde(deserialize_with = "mac_from_str")]
    pub mac: MacAddr,
    #[serde(default)]
    pub ip: Option<Ipv4Addr>,
}

/// Overrides for [`TableLimits`]. Zero is rejected.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsEntry {
    pub classifier_flows: Option<NonZeroU32>,
    pub forwarder_paths: Option<NonZeroU32>,
    pub forwarder_sfs: Option<NonZeroU32>,
    pub proxy_flows: Option<NonZeroU32>,
    pub proxy_paths: Option<NonZeroU32>,
    pub proxy_sfs: Option<NonZeroU32>,
}

impl From<&LimitsEntry> for TableLimits {
    fn from(entry: &LimitsEntry) -> Self {
        let def = TableLimits::default();
        Self {
            classifier_flows: entry
                .classifier_flows
                .unwrap_or(def.classifier_flows),
            forwarder_paths: entry
                .forwarder_paths
                .unwrap_or(def.forwarder_paths),
            forwarder_sfs: entry.forwarder_sfs.unwrap_or(def.forwarder_sfs),
            proxy_flows: entry.proxy_flows.unwrap_or(def.proxy_flows),
            proxy_paths: entry.proxy_paths.unwrap_or(def.proxy_paths),
            proxy_sfs: entry.proxy_sfs.unwrap_or(def.proxy_sfs),
        }
    }
}

/// An IP protocol given either by number or by name.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum ProtoEntry {
    Num(u8),
    Name(String),
}

impl TryFrom<&ProtoEntry> for Protocol {
    type Error = ConfigError;

    fn try_from(entry: &ProtoEntry) -> Result<Self, Self::Error> {
        match entry {
            ProtoEntry::Num(n) => Ok(Protocol::from(*n)),
            ProtoEntry::Name(s) => Protocol::from_str(s)
                .map_err(|e| ConfigError::invalid("proto", e)),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifierEntry {
    pub proto: ProtoEntry,
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    #[serde(default)]
    pub src_port: u16,
    #[serde(default)]
    pub dst_port: u16,
    pub spi: u32,
}

/// A next-SF entry: packets on `spi`/`si` go to `sf_id`.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SphEntry {
    pub spi: u32,
    pub si: u8,
    pub sf_id: u16,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SfEntry {
    pub sf_id: u16,
    #[serde(deserialize_with = "mac_from_str")]
    pub mac: MacAddr,
}

impl FromStr for SfcConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

impl SfcConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        contents.parse()
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_micros(self.drain_us.unwrap_or(BURST_TX_DRAIN_US))
    }

    /// The static node configuration for running as `role`.
    pub fn node_cfg(&self, role: Role) -> Result<NodeCfg, ConfigError> {
        let ports = self
            .ports
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let id = u16::try_from(i)
                    .map_err(|_| ConfigError::invalid("port", "too many"))?;
                Ok(PortCfg { id, mac: p.mac, ip: p.ip })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(NodeCfg {
            role,
            ports,
            sff_mac: self.sff_mac,
            sff_ip: self.sff_ip,
            vni: self.vni.unwrap_or_default(),
            limits: TableLimits::from(&self.limits),
        })
    }

    /// Install the table entries relevant to the node's role.
    ///
    /// The first entry that cannot be added stops the whole load: a
    /// node never runs with a partial table.
    pub fn apply(&self, ctx: &mut NodeCtx) -> Result<(), ConfigError> {
        match ctx.role() {
            Role::Classifier => {
                for entry in &self.classifier {
                    let (tuple, path) = entry.resolve()?;
                    ctx.add_classifier_entry(tuple, path)?;
                }
            }

            Role::Forwarder => {
                for entry in &self.sph {
                    let (path, sf) = entry.resolve()?;
                    ctx.add_forwarder_sph_entry(path, sf)?;
                }
                for entry in &self.sf {
                    ctx.add_forwarder_sf_address(
                        SfId::new(entry.sf_id),
                        entry.mac,
                    )?;
                }
            }

            Role::Proxy => {
                for entry in &self.sph {
                    let (path, sf) = entry.resolve()?;
                    ctx.add_proxy_sph_entry(path, sf)?;
                }
                for entry in &self.sf {
                    ctx.add_proxy_sf_address_entry(
                        SfId::new(entry.sf_id),
                        entry.mac,
                    )?;
                }
            }

            Role::Loopback => {}
        }

        Ok(())
    }
}

impl ClassifierEntry {
    fn resolve(&self) -> Result<(FiveTuple, ServicePath), ConfigError> {
        let proto = Protocol::try_from(&self.proto)?;
        let tuple = FiveTuple::new(
            proto,
            self.src_ip,
            self.dst_ip,
            self.src_port,
            self.dst_port,
        );
        let path = ServicePath::chain_start(self.spi)
            .map_err(|e| ConfigError::invalid("spi", e))?;
        Ok((tuple, path))
    }
}

impl SphEntry {
    fn resolve(&self) -> Result<(ServicePath, SfId), ConfigError> {
        let path = ServicePath::new(self.spi, self.si)
            .map_err(|e| ConfigError::invalid("spi", e))?;
        Ok((path, SfId::new(self.sf_id)))
    }
}
