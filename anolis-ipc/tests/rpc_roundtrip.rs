// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

//! RPC client behavior against a real child process: request-id
//! correlation, single-in-flight sequencing, deadline handling, and the
//! session-health latch.

use anolis_ipc::{IpcError, RpcClient, RpcTimeouts};
use anolis_protocol::pb;
use std::path::PathBuf;
use std::time::{Duration, Instant};

fn provider_exe() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_adpp-test-provider"))
}

fn timeouts(operation_ms: u64) -> RpcTimeouts {
    RpcTimeouts {
        operation: Duration::from_millis(operation_ms),
        hello: Duration::from_secs(5),
        ready: Duration::from_secs(5),
        shutdown: Duration::from_secs(2),
    }
}

fn args(flags: &[&str]) -> Vec<String> {
    flags.iter().map(|f| f.to_string()).collect()
}

#[test]
fn handshake_then_sequential_requests() {
    let client = RpcClient::start(&provider_exe(), &[], timeouts(5_000), "test").unwrap();
    assert_eq!(client.hello_info().provider_name, "adpp-test-provider");
    assert!(!client.supports_wait_ready());

    // Several requests back to back; each correlates by id.
    assert!(client.list_devices().unwrap().devices.is_empty());
    let described = client.describe_device("dev0").unwrap();
    assert_eq!(described.device_id, "dev0");
    assert!(client.read_signals("dev0", &[]).unwrap().values.is_empty());

    assert!(client.is_healthy());
    assert_eq!(client.last_status_code(), pb::StatusCode::Ok);
    client.shutdown();
}

#[test]
fn mismatched_request_id_poisons_the_session() {
    let client = RpcClient::start(
        &provider_exe(),
        &args(&["--wrong-id-after-hello"]),
        timeouts(5_000),
        "test",
    )
    .unwrap();

    let err = client.list_devices().unwrap_err();
    assert!(matches!(err, IpcError::Protocol(_)), "{err:?}");
    assert!(!client.is_healthy());

    // Subsequent calls fail fast without touching the wire.
    let started = Instant::now();
    let err = client.describe_device("dev0").unwrap_err();
    assert!(matches!(err, IpcError::SessionUnhealthy(_)), "{err:?}");
    assert!(started.elapsed() < Duration::from_millis(100));
    client.shutdown();
}

#[test]
fn slow_provider_hits_the_operation_deadline() {
    let client = RpcClient::start(
        &provider_exe(),
        &args(&["--sleep-ms", "2000"]),
        // Hello tolerates the delay; operations do not.
        RpcTimeouts {
            operation: Duration::from_millis(200),
            hello: Duration::from_secs(10),
            ready: Duration::from_secs(10),
            shutdown: Duration::from_secs(2),
        },
        "test",
    )
    .unwrap();

    let err = client.list_devices().unwrap_err();
    assert!(matches!(err, IpcError::Timeout(_)), "{err:?}");
    assert_eq!(err.status_code(), pb::StatusCode::DeadlineExceeded);
    assert!(!client.is_healthy());
    client.shutdown();
}

#[test]
fn hanging_provider_times_out_without_dying() {
    let client = RpcClient::start(
        &provider_exe(),
        &args(&["--hang-after-hello"]),
        timeouts(300),
        "test",
    )
    .unwrap();

    let started = Instant::now();
    let err = client.list_devices().unwrap_err();
    assert!(matches!(err, IpcError::Timeout(_)), "{err:?}");
    // The deadline is honored with slack for the poll increments.
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert!(started.elapsed() < Duration::from_secs(3));
    client.shutdown();
}

#[test]
fn shutdown_is_clean_via_stdin_eof() {
    let client = RpcClient::start(&provider_exe(), &[], timeouts(5_000), "test").unwrap();
    assert_eq!(client.probe_process_alive(), Some(true));
    client.shutdown();
    assert_eq!(client.probe_process_alive(), Some(false));
}
