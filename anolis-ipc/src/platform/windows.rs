// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

use std::io;
use std::os::windows::io::AsRawHandle;
use std::ptr;
use std::time::{Duration, Instant};
use windows_sys::Win32::Foundation::{ERROR_BROKEN_PIPE, HANDLE};
use windows_sys::Win32::System::Pipes::PeekNamedPipe;

const PEEK_INTERVAL: Duration = Duration::from_millis(5);

/// Anonymous pipes have no waitable read event, so readiness is a peek loop.
/// A broken pipe is reported as readable; the next read observes EOF.
pub(crate) fn wait_readable<H: AsRawHandle>(handle: &H, timeout: Duration) -> io::Result<bool> {
    let deadline = Instant::now() + timeout;
    let raw = handle.as_raw_handle() as HANDLE;
    loop {
        let mut available: u32 = 0;
        let ok = unsafe {
            PeekNamedPipe(
                raw,
                ptr::null_mut(),
                0,
                ptr::null_mut(),
                &mut available,
                ptr::null_mut(),
            )
        };
        if ok == 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(ERROR_BROKEN_PIPE as i32) {
                return Ok(true);
            }
            return Err(err);
        }
        if available > 0 {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        std::thread::sleep(PEEK_INTERVAL);
    }
}
