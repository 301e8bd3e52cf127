// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Operator signals.
//!
//! * `SIGUSR1`: reset the counters.
//! * `SIGINT`: print the counters.
//! * `SIGQUIT`: print the counters and stop.
//!
//! The handlers only raise flags; the burst loop acts on them between
//! iterations.

use nix::libc::c_int;
use nix::sys::signal::SaFlags;
use nix::sys::signal::SigAction;
use nix::sys::signal::SigHandler;
use nix::sys::signal::SigSet;
use nix::sys::signal::Signal;
use nix::sys::signal::sigaction;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

static RESET: AtomicBool = AtomicBool::new(false);
static PRINT: AtomicBool = AtomicBool::new(false);
static QUIT: AtomicBool = AtomicBool::new(false);

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Pending {
    pub reset: bool,
    pub print: bool,
    pub quit: bool,
}

extern "C" fn handle(sig: c_int) {
    let flag = match Signal::try_from(sig) {
        Ok(Signal::SIGUSR1) => &RESET,
        Ok(Signal::SIGINT) => &PRINT,
        Ok(Signal::SIGQUIT) => &QUIT,
        _ => return,
    };
    flag.store(true, Ordering::Relaxed);
}

pub fn install() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(handle),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );

    for sig in [Signal::SIGUSR1, Signal::SIGINT, Signal::SIGQUIT] {
        // SAFETY: `handle` only performs atomic stores.
        unsafe { sigaction(sig, &action) }?;
    }

    Ok(())
}

/// Take the signals raised since the last call.
pub fn take() -> Pending {
    Pending {
        reset: RESET.swap(false, Ordering::Relaxed),
        print: PRINT.swap(false, Ordering::Relaxed),
        quit: QUIT.swap(false, Ordering::Relaxed),
    }
}
