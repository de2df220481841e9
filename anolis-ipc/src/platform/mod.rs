// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

//! Platform split for pipe readiness. POSIX file descriptors poll(2);
//! Windows pipe HANDLEs peek. Everything above this module sees one trait.

use std::io::{self, Read};
use std::time::Duration;

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

/// A readable byte stream that can additionally be polled for readability
/// under a deadline without consuming anything.
///
/// EOF counts as readable: the subsequent read observes it as a zero-length
/// read and the caller distinguishes clean exit from protocol error there.
pub trait PollRead: Read {
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool>;
}

#[cfg(unix)]
impl PollRead for std::process::ChildStdout {
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        unix::wait_readable(self, timeout)
    }
}

#[cfg(windows)]
impl PollRead for std::process::ChildStdout {
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        windows::wait_readable(self, timeout)
    }
}
