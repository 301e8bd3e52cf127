// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Fixed-capacity exact-match tables.
//!
//! Every table a node uses (classifier flows, next-SF, SF addresses,
//! proxy flows) is a [`FlowTable`]: a fixed-size key mapping to a
//! fixed-size value, with a capacity chosen at creation. There are no
//! wildcards and no prefix matching.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::string::ToString;
use alloc::vec::Vec;
use core::fmt::Display;
use core::num::NonZeroU32;
use sfc_api::SfcError;
use sfc_api::TableDump;
use sfc_api::TableEntryDump;

#[derive(Debug)]
pub struct FlowTable<K, V> {
    name: String,
    limit: NonZeroU32,
    map: BTreeMap<K, FlowEntry<V>>,
}

impl<K, V> FlowTable<K, V>
where
    K: Copy + Display + Ord,
    V: Copy,
{
    pub fn new(name: &str, limit: NonZeroU32) -> Self {
        Self { name: name.to_string(), limit, map: BTreeMap::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn limit(&self) -> NonZeroU32 {
        self.limit
    }

    pub fn num_entries(&self) -> u32 {
        self.map.len() as u32
    }

    /// Add a new entry.
    ///
    /// An existing key is never overwritten: re-inserting it fails with
    /// [`SfcError::DuplicateKey`] whatever the value.
    pub fn insert(&mut self, key: K, val: V) -> Result<(), SfcError> {
        if self.map.contains_key(&key) {
            return Err(SfcError::DuplicateKey {
                table: self.name.clone(),
                key: key.to_string(),
            });
        }

        if self.num_entries() >= self.limit.get() {
            return Err(SfcError::MaxCapacity {
                table: self.name.clone(),
                limit: u64::from(self.limit.get()),
            });
        }

        self.map.insert(key, FlowEntry::new(val));
        Ok(())
    }

    /// Look up `key`, counting a hit on the entry if present.
    pub fn lookup(&mut self, key: &K) -> Option<V> {
        self.map.get_mut(key).map(|entry| {
            entry.hit();
            entry.state
        })
    }

    pub fn get(&self, key: &K) -> Option<&FlowEntry<V>> {
        self.map.get(key)
    }

    /// Dump every entry in key order, converting each value with `f`.
    pub fn dump_with<D, F>(&self, f: F) -> TableDump<K, D>
    where
        F: Fn(&V) -> D,
    {
        let entries = self
            .map
            .iter()
            .map(|(key, entry)| TableEntryDump {
                key: *key,
                val: f(&entry.state),
                hits: entry.hits,
            })
            .collect::<Vec<_>>();

        TableDump {
            name: self.name.clone(),
            limit: u64::from(self.limit.get()),
            entries,
        }
    }

    pub fn dump(&self) -> TableDump<K, V> {
        self.dump_with(|v| *v)
    }
}

#[derive(Clone, Debug)]
pub struct FlowEntry<V> {
    state: V,
    hits: u64,
}

impl<V> FlowEntry<V> {
    fn new(state: V) -> Self {
        Self { state, hits: 0 }
    }

    pub fn state(&self) -> &V {
        &self.state
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    fn hit(&mut self) {
        self.hits += 1;
    }
}
