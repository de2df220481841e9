// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::io;
use std::os::fd::AsFd;
use std::time::{Duration, Instant};

/// Blocks up to `timeout` for the descriptor to become readable. Readable
/// includes hangup, so EOF is reported to the reader rather than swallowed.
pub(crate) fn wait_readable<F: AsFd>(fd: &F, timeout: Duration) -> io::Result<bool> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        // poll(2) timeouts are bounded; long waits run in slices.
        let slice_ms = remaining.as_millis().min(u128::from(u16::MAX)) as u16;
        let mut fds = [PollFd::new(fd.as_fd(), PollFlags::POLLIN)];
        match poll(&mut fds, PollTimeout::from(slice_ms)) {
            Ok(0) => {}
            Ok(_) => return Ok(true),
            Err(nix::errno::Errno::EINTR) => {}
            Err(e) => return Err(io::Error::from(e)),
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
    }
}
