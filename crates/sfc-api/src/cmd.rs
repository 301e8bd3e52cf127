// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Control-side request errors and table dump responses.

use super::FiveTuple;
use super::MacAddr;
use super::Role;
use super::ServicePath;
use super::SfId;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::fmt::Display;
use serde::Deserialize;
use serde::Serialize;

/// Errors raised while building a node or populating its tables.
///
/// These are setup-time failures: a node refuses to start with an
/// incomplete table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum SfcError {
    /// The key is already present. Inserts never overwrite.
    DuplicateKey { table: String, key: String },
    /// The table already holds `limit` entries.
    MaxCapacity { table: String, limit: u64 },
    /// The role needs more ports than were configured.
    MissingPort { role: Role, needed: usize, found: usize },
    BadConfig(String),
}

impl Display for SfcError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::DuplicateKey { table, key } => {
                write!(f, "duplicate key {key} in table {table}")
            }
            Self::MaxCapacity { table, limit } => {
                write!(f, "table {table} is full ({limit} entries)")
            }
            Self::MissingPort { role, needed, found } => {
                write!(f, "{role} needs {needed} ports, {found} configured")
            }
            Self::BadConfig(msg) => write!(f, "bad config: {msg}"),
        }
    }
}

impl core::error::Error for SfcError {}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TableEntryDump<K, V> {
    pub key: K,
    pub val: V,
    pub hits: u64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TableDump<K, V> {
    pub name: String,
    pub limit: u64,
    pub entries: Vec<TableEntryDump<K, V>>,
}

/// The contents of every table a node uses for its role.
///
/// Proxy flow values are the 64-bit encoding of the cached chain
/// header.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DumpTablesResp {
    pub role: Role,
    pub classifier: Option<TableDump<FiveTuple, ServicePath>>,
    pub next_sf: Option<TableDump<ServicePath, SfId>>,
    pub sf_addr: Option<TableDump<SfId, MacAddr>>,
    pub proxy_flows: Option<TableDump<FiveTuple, u64>>,
}
