// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Print table dumps and counters in a human-friendly manner.
//!
//! Shared by `sfcapp` and the integration tests.

use crate::engine::nsh::ChainHeader;
use sfc_api::DumpTablesResp;
use sfc_api::NodeStats;
use sfc_api::TableDump;
use std::fmt::Display;
use std::io::Write;
use tabwriter::TabWriter;

/// Print a [`DumpTablesResp`].
pub fn print_tables(resp: &DumpTablesResp) -> std::io::Result<()> {
    print_tables_into(&mut std::io::stdout(), resp)
}

/// Print a [`DumpTablesResp`] into a given writer.
pub fn print_tables_into(
    writer: &mut impl Write,
    resp: &DumpTablesResp,
) -> std::io::Result<()> {
    let mut t = TabWriter::new(writer);

    writeln!(t, "Role {}", resp.role)?;
    write_hrb(&mut t)?;

    if let Some(dump) = &resp.classifier {
        print_table(&mut t, dump, "FLOW", "PATH", |path| path.to_string())?;
    }

    if let Some(dump) = &resp.next_sf {
        print_table(&mut t, dump, "PATH", "SF", |sf| sf.to_string())?;
    }

    if let Some(dump) = &resp.sf_addr {
        print_table(&mut t, dump, "SF", "MAC", |mac| mac.to_string())?;
    }

    if let Some(dump) = &resp.proxy_flows {
        print_table(&mut t, dump, "FLOW", "HEADER", |raw| {
            format!("{raw:#018X} ({})", ChainHeader::from_u64(*raw))
        })?;
    }

    t.flush()
}

fn print_table<K, V, F>(
    t: &mut impl Write,
    dump: &TableDump<K, V>,
    key_hdr: &str,
    val_hdr: &str,
    fmt_val: F,
) -> std::io::Result<()>
where
    K: Display,
    F: Fn(&V) -> String,
{
    writeln!(t, "\n{}: {}/{}", dump.name, dump.entries.len(), dump.limit)?;
    write_hr(t)?;
    writeln!(t, "{key_hdr}\t{val_hdr}\tHITS")?;
    for entry in &dump.entries {
        writeln!(t, "{}\t{}\t{}", entry.key, fmt_val(&entry.val), entry.hits)?;
    }
    Ok(())
}

/// Print a [`NodeStats`].
pub fn print_stats(stats: &NodeStats) -> std::io::Result<()> {
    print_stats_into(&mut std::io::stdout(), stats)
}

/// Print a [`NodeStats`] into a given writer.
pub fn print_stats_into(
    writer: &mut impl Write,
    stats: &NodeStats,
) -> std::io::Result<()> {
    let mut t = TabWriter::new(writer);

    writeln!(t, "RX\tTX\tDROPPED")?;
    writeln!(
        t,
        "{}\t{}\t{}",
        stats.rx_pkts, stats.tx_pkts, stats.dropped_pkts
    )?;
    t.flush()?;

    writeln!(t)?;
    writeln!(t, "DROP REASON\tCOUNT")?;
    write_hr(&mut t)?;
    for (name, val) in [
        ("malformed", stats.drop_malformed),
        ("no next SF", stats.drop_no_next_sf),
        ("no SF address", stats.drop_no_sf_addr),
        ("no flow", stats.drop_no_flow),
        ("end of chain", stats.drop_end_of_chain),
        ("encap", stats.drop_encap),
        ("tx shortfall", stats.drop_tx_shortfall),
    ] {
        writeln!(t, "{name}\t{val}")?;
    }
    writeln!(t, "flow table full\t{}", stats.flow_table_full)?;
    t.flush()
}

/// Print a horizontal rule in bold.
pub fn write_hrb(t: &mut impl Write) -> std::io::Result<()> {
    writeln!(t, "{:=<70}", "=")
}

/// Print a horizontal rule.
pub fn write_hr(t: &mut impl Write) -> std::io::Result<()> {
    writeln!(t, "{:-<70}", "-")
}
