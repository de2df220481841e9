// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

use crate::error::IpcError;
use crate::framed::{ChildChannel, FramedChannel};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const REAP_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// One spawned provider executable. Owns the OS process handle; the pipe
/// ends travel separately in the [`ChildChannel`] returned by
/// [`ChildProcess::spawn`].
///
/// Shutdown discipline is EOF-then-kill: the channel half-closes stdin, the
/// child is expected to exit on EOF, and only after the bounded wait does
/// the parent terminate it forcibly. Dropping the handle runs the same
/// sequence.
#[derive(Debug)]
pub struct ChildProcess {
    child: Child,
    executable: PathBuf,
    shutdown_timeout: Duration,
}

impl ChildProcess {
    /// Spawns `executable` with stdin/stdout redirected to fresh anonymous
    /// pipes and stderr inherited from the parent.
    pub fn spawn(
        executable: &Path,
        args: &[String],
        shutdown_timeout: Duration,
    ) -> Result<(ChildProcess, ChildChannel), IpcError> {
        let mut child = Command::new(executable)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    IpcError::ExecutableNotFound(executable.to_path_buf())
                } else {
                    IpcError::Spawn(e)
                }
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| IpcError::Spawn(io::Error::other("child stdin was not piped")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| IpcError::Spawn(io::Error::other("child stdout was not piped")))?;

        debug!(
            executable = %executable.display(),
            pid = child.id(),
            "spawned provider process"
        );

        Ok((
            ChildProcess {
                child,
                executable: executable.to_path_buf(),
                shutdown_timeout,
            },
            FramedChannel::new(stdout, stdin),
        ))
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Non-blocking liveness check.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Waits up to `timeout` for the child to exit on its own. Returns true
    /// once the child has been reaped.
    pub fn wait_timeout(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    debug!(
                        executable = %self.executable.display(),
                        %status,
                        "provider process exited"
                    );
                    return true;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        executable = %self.executable.display(),
                        error = %e,
                        "failed to query provider process status"
                    );
                    return false;
                }
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(REAP_POLL_INTERVAL);
        }
    }

    /// Forcibly terminates and reaps the child.
    pub fn kill(&mut self) {
        if let Err(e) = self.child.kill() {
            debug!(error = %e, "kill failed (process already gone?)");
        }
        let _ = self.child.wait();
    }

    /// Bounded-wait shutdown. The caller must have closed stdin already so
    /// the child sees EOF; this waits, then kills if still alive.
    pub fn shutdown(&mut self, timeout: Duration) {
        if self.wait_timeout(timeout) {
            return;
        }
        warn!(
            executable = %self.executable.display(),
            pid = self.child.id(),
            "provider ignored EOF, terminating forcibly"
        );
        self.kill();
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if self.is_running() {
            self.shutdown(self.shutdown_timeout);
        }
    }
}
