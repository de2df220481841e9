// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

//! Provider-facing IPC: length-prefixed ADPP frames over a child process's
//! stdio, plus the blocking request/response client on top.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

mod child;
mod error;
mod framed;
pub mod platform;
mod rpc;

pub use child::ChildProcess;
pub use error::IpcError;
pub use framed::{ChildChannel, FramedChannel, MAX_FRAME_SIZE};
pub use rpc::{RpcClient, RpcTimeouts};
