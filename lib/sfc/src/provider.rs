// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Services the engine needs from whatever hosts it.
//!
//! The engine never writes to stdout or picks a logging framework on
//! its own. The host hands it a [`Providers`] value when the node is
//! built: unit tests use [`PrintlnLog`], the `sfcapp` daemon plugs in
//! an slog-backed logger.

use alloc::boxed::Box;
use core::fmt;
use core::fmt::Display;

/// The set of host-supplied services a node uses.
pub struct Providers {
    pub log: Box<dyn LogProvider>,
}

/// A destination for log messages.
///
/// Only control-side events and rare fast-path conditions are logged.
/// Per-packet outcomes are counted, not logged.
pub trait LogProvider: Send + Sync {
    /// Log a message at the specified level.
    fn log(&self, level: LogLevel, msg: &str);

    fn note(&self, msg: &str) {
        self.log(LogLevel::Note, msg);
    }

    fn warn(&self, msg: &str) {
        self.log(LogLevel::Warn, msg);
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LogLevel {
    Note,
    Warn,
    Error,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let level_s = match self {
            Self::Note => "[NOTE]",
            Self::Warn => "[WARN]",
            Self::Error => "[ERROR]",
        };
        write!(f, "{level_s}")
    }
}

#[cfg(feature = "std")]
#[derive(Clone, Copy)]
pub struct PrintlnLog;

#[cfg(feature = "std")]
impl LogProvider for PrintlnLog {
    fn log(&self, level: LogLevel, msg: &str) {
        println!("{level} {msg}");
    }
}

/// Discards everything. Useful for benchmarks.
#[derive(Clone, Copy)]
pub struct NullLog;

impl LogProvider for NullLog {
    fn log(&self, _level: LogLevel, _msg: &str) {}
}
