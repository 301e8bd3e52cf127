// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Run an SFC node.

use anyhow::Context;
use clap::Parser;
use sfc::api::NodeStats;
use sfc::api::Role;
use sfc::cfg::SfcConfig;
use sfc::engine::NodeCtx;
use sfc::engine::worker::Worker;
use sfc::print::print_stats;
use sfc::print::print_tables;
use sfc::provider::Providers;
use slog::Logger;
use std::ops::ControlFlow;
use std::path::Path;
use std::path::PathBuf;

mod logging;
mod pcap_io;
mod signal;

use logging::SlogLog;
use pcap_io::PcapIo;

/// Service function chaining data-plane node
#[derive(Debug, Parser)]
#[command(version)]
enum Command {
    /// Replay captures through a node and write what it transmits.
    Run {
        #[command(flatten)]
        node: NodeArgs,

        /// Capture replayed as traffic received on port 0.
        #[arg(long)]
        rx0: PathBuf,

        /// Capture replayed as traffic received on port 1.
        #[arg(long)]
        rx1: Option<PathBuf>,

        /// Where to write traffic sent on port 0.
        #[arg(long)]
        tx0: PathBuf,

        /// Where to write traffic sent on port 1.
        #[arg(long)]
        tx1: PathBuf,

        /// Keep polling after the captures are exhausted, until
        /// SIGQUIT.
        #[arg(long)]
        wait: bool,

        /// Print the final counters as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Load a configuration and print the resulting tables.
    ShowTables {
        #[command(flatten)]
        node: NodeArgs,

        /// Print the tables as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, clap::Args)]
struct NodeArgs {
    /// The node's role: classifier, proxy, forwarder (sff), or
    /// loopback.
    #[arg(short = 't', long = "type")]
    role: Role,

    /// Path to the node's TOML configuration.
    #[arg(short, long)]
    config: PathBuf,

    #[arg(short, long)]
    verbose: bool,
}

impl NodeArgs {
    fn build(&self, log: &Logger) -> anyhow::Result<(NodeCtx, SfcConfig)> {
        let cfg = SfcConfig::load(&self.config).with_context(|| {
            format!("loading {}", self.config.display())
        })?;

        let providers = Providers { log: Box::new(SlogLog::new(log.clone())) };
        let mut ctx = NodeCtx::new(cfg.node_cfg(self.role)?, providers)?;
        cfg.apply(&mut ctx)?;
        Ok((ctx, cfg))
    }
}

fn main() -> anyhow::Result<()> {
    let cmd = Command::parse();
    match cmd {
        Command::Run { node, rx0, rx1, tx0, tx1, wait, json } => {
            let log = logging::root_logger(node.verbose);
            let ports = [
                (Some(rx0.as_path()), tx0.as_path()),
                (rx1.as_deref(), tx1.as_path()),
            ];
            let res = run(&node, &log, ports, wait);

            match res {
                Ok(stats) if json => {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                }
                Ok(stats) => print_stats(&stats)?,
                Err(e) => {
                    slog::error!(log, "{:#}", e);
                    return Err(e);
                }
            }
        }

        Command::ShowTables { node, json } => {
            let log = logging::root_logger(node.verbose);
            let (ctx, _) = node.build(&log)?;
            let resp = ctx.dump_tables();
            if json {
                println!("{}", serde_json::to_string_pretty(&resp)?);
            } else {
                print_tables(&resp)?;
            }
        }
    }

    Ok(())
}

fn run(
    node: &NodeArgs,
    log: &Logger,
    ports: [(Option<&Path>, &Path); 2],
    wait: bool,
) -> anyhow::Result<NodeStats> {
    let (ctx, cfg) = node.build(log)?;
    let io = PcapIo::open(&ports, log.clone())?;
    signal::install().context("installing signal handlers")?;

    slog::info!(log, "starting"; "role" => %node.role);
    let mut worker = Worker::new(ctx, io, cfg.drain_interval());

    worker.run(|ctx, io| {
        let pending = signal::take();
        if pending.reset {
            ctx.reset_stats();
            ctx.log().note("counters reset");
        }
        if pending.print || pending.quit {
            if let Err(e) = print_stats(&ctx.stats()) {
                ctx.log().warn(&format!("failed to print counters: {e}"));
            }
        }

        if pending.quit || (!wait && io.rx_done()) {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });

    let (ctx, mut io) = worker.into_parts();
    io.finish()?;
    slog::info!(log, "stopped"; "role" => %ctx.role());
    Ok(ctx.stats())
}
