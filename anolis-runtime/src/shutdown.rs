// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::Relaxed)
}

pub fn request_shutdown() {
    SHUTDOWN_REQUESTED.store(true, Ordering::Relaxed);
}

/// Installs SIGINT/SIGTERM handlers that only set the shutdown flag. No
/// I/O, allocation, or locking happens in signal context; the main loop
/// polls the flag.
#[cfg(unix)]
pub fn install_signal_handlers() -> std::io::Result<()> {
    use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

    extern "C" fn handle_signal(_signo: i32) {
        SHUTDOWN_REQUESTED.store(true, Ordering::Relaxed);
    }

    let action = SigAction::new(
        SigHandler::Handler(handle_signal),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for signal in [Signal::SIGINT, Signal::SIGTERM] {
        // SAFETY: the handler is async-signal-safe; it only stores to an
        // atomic flag.
        unsafe { sigaction(signal, &action) }.map_err(std::io::Error::from)?;
    }
    Ok(())
}

/// Console control events are left to the host on Windows; the flag can
/// still be set programmatically.
#[cfg(windows)]
pub fn install_signal_handlers() -> std::io::Result<()> {
    Ok(())
}
