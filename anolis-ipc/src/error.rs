// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

use anolis_protocol::pb;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Everything that can go wrong between the runtime and one provider
/// process. Variants map onto the ADPP status-code taxonomy via
/// [`IpcError::status_code`].
#[derive(Debug, Error)]
pub enum IpcError {
    #[error("Frame too large: {0} bytes (limit {limit} bytes)", limit = crate::MAX_FRAME_SIZE)]
    FrameTooLarge(usize),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Clean EOF from the peer. Distinguished from [`IpcError::Io`] so the
    /// caller can tell an orderly exit from a broken pipe.
    #[error("Channel closed by peer")]
    ClosedByPeer,

    #[error("Provider process is not running")]
    ProcessExited,

    #[error("Provider executable not found: {0}")]
    ExecutableNotFound(PathBuf),

    #[error("Failed to spawn provider process: {0}")]
    Spawn(#[source] io::Error),

    /// The session was already marked unhealthy by an earlier failure;
    /// the call failed fast without touching the wire.
    #[error("Session unhealthy: {0}")]
    SessionUnhealthy(String),

    /// Wire-level invariant violation: request-id mismatch, wrong response
    /// kind, missing status. Always session-fatal.
    #[error("Protocol violation: {0}")]
    Protocol(String),

    /// Non-OK status reported by the provider. Surfaced to the caller
    /// unchanged; does not poison the session.
    #[error("Provider returned {}: {message}", .code.as_str_name())]
    Status {
        code: pb::StatusCode,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] prost::DecodeError),
}

impl IpcError {
    /// The status code surfaced to kernel API callers for this failure.
    pub fn status_code(&self) -> pb::StatusCode {
        match self {
            IpcError::Timeout(_) => pb::StatusCode::DeadlineExceeded,
            IpcError::Status { code, .. } => *code,
            IpcError::ClosedByPeer
            | IpcError::ProcessExited
            | IpcError::ExecutableNotFound(_)
            | IpcError::Spawn(_)
            | IpcError::SessionUnhealthy(_) => pb::StatusCode::Unavailable,
            IpcError::FrameTooLarge(_) => pb::StatusCode::InvalidArgument,
            IpcError::Protocol(_) | IpcError::Io(_) | IpcError::Decode(_) => {
                pb::StatusCode::Internal
            }
        }
    }

    /// Whether this failure poisons the session. A poisoned session fails
    /// all subsequent calls fast until the supervisor restarts the provider.
    pub fn is_session_fatal(&self) -> bool {
        !matches!(self, IpcError::Status { .. } | IpcError::FrameTooLarge(_))
    }
}
