// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

//! Minimal scripted ADPP responder for the RPC integration tests. Flags
//! select a misbehavior:
//!
//! - `--wrong-id-after-hello`: answers everything after Hello with a bad
//!   request id, so the client must poison the session.
//! - `--hang-after-hello`: reads requests after Hello but never answers.
//! - `--sleep-ms N`: delays every response by N milliseconds.

use anolis_ipc::MAX_FRAME_SIZE;
use anolis_protocol::pb::{self, request_envelope::Request, response_envelope::Response};
use anolis_protocol::PROTOCOL_VERSION;
use prost::Message;
use std::io::{self, Read, Write};
use std::time::Duration;

struct Behavior {
    wrong_id_after_hello: bool,
    hang_after_hello: bool,
    sleep: Option<Duration>,
}

fn behavior() -> Behavior {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let sleep = args
        .iter()
        .position(|a| a == "--sleep-ms")
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis);
    Behavior {
        wrong_id_after_hello: args.iter().any(|a| a == "--wrong-id-after-hello"),
        hang_after_hello: args.iter().any(|a| a == "--hang-after-hello"),
        sleep,
    }
}

fn main() {
    if let Err(e) = serve(behavior()) {
        eprintln!("adpp-test-provider: {e}");
        std::process::exit(1);
    }
}

fn serve(behavior: Behavior) -> io::Result<()> {
    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    let mut hello_done = false;

    loop {
        let mut prefix = [0u8; 4];
        match stdin.read_exact(&mut prefix) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e),
        }
        let len = u32::from_le_bytes(prefix) as usize;
        if len > MAX_FRAME_SIZE {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "frame too large"));
        }
        let mut payload = vec![0u8; len];
        stdin.read_exact(&mut payload)?;

        let envelope = pb::RequestEnvelope::decode(payload.as_slice())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if hello_done && behavior.hang_after_hello {
            continue;
        }
        if let Some(delay) = behavior.sleep {
            std::thread::sleep(delay);
        }

        let request_id = if hello_done && behavior.wrong_id_after_hello {
            envelope.request_id + 1
        } else {
            envelope.request_id
        };
        let response = match envelope.request {
            Some(Request::Hello(_)) => {
                hello_done = true;
                Response::Hello(pb::HelloResponse {
                    protocol_version: PROTOCOL_VERSION,
                    provider_name: "adpp-test-provider".to_string(),
                    provider_version: env!("CARGO_PKG_VERSION").to_string(),
                    metadata: Default::default(),
                })
            }
            Some(Request::WaitReady(_)) => Response::WaitReady(pb::WaitReadyResponse {}),
            Some(Request::ListDevices(_)) => {
                Response::ListDevices(pb::ListDevicesResponse { devices: vec![] })
            }
            Some(Request::DescribeDevice(req)) => {
                Response::DescribeDevice(pb::DescribeDeviceResponse {
                    device_id: req.device_id,
                    ..Default::default()
                })
            }
            Some(Request::ReadSignals(_)) => {
                Response::ReadSignals(pb::ReadSignalsResponse { values: vec![] })
            }
            Some(Request::Call(_)) => Response::Call(pb::CallResponse::default()),
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "empty request envelope",
                ))
            }
        };

        let reply = pb::ResponseEnvelope {
            request_id,
            status: Some(pb::Status::ok()),
            response: Some(response),
        };
        let bytes = reply.encode_to_vec();
        stdout.write_all(&(bytes.len() as u32).to_le_bytes())?;
        stdout.write_all(&bytes)?;
        stdout.flush()?;
    }
}
