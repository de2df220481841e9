// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

//! Simulation provider speaking ADPP over stdio: a temperature controller
//! and a motor controller. Used by the end-to-end tests and as a worked
//! example of the provider side of the protocol.
//!
//! `--crash-on-start` exits immediately, simulating a provider that cannot
//! come up. The hidden `abort` function (id 99 on tempctl0) exits without
//! answering, simulating a mid-session crash.

use anolis_ipc::MAX_FRAME_SIZE;
use anolis_protocol::pb::{self, request_envelope::Request, response_envelope::Response};
use anolis_protocol::{Value, METADATA_SUPPORTS_WAIT_READY, PROTOCOL_VERSION};
use prost::Message;
use std::collections::HashMap;
use std::io::{self, Read, Write};

fn main() {
    if std::env::args().skip(1).any(|a| a == "--crash-on-start") {
        eprintln!("anolis-sim-provider: simulated startup crash");
        std::process::exit(3);
    }
    if let Err(e) = serve() {
        eprintln!("anolis-sim-provider: {e}");
        std::process::exit(1);
    }
}

fn serve() -> io::Result<()> {
    let mut stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    let mut sim = Sim::new();

    loop {
        let mut prefix = [0u8; 4];
        match stdin.read_exact(&mut prefix) {
            Ok(()) => {}
            // EOF at a frame boundary is the shutdown signal.
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
        let response = sim.handle(envelope);

        let bytes = response.encode_to_vec();
        stdout.write_all(&(bytes.len() as u32).to_le_bytes())?;
        stdout.write_all(&bytes)?;
        stdout.flush()?;
    }
}

const TEMPCTL: &str = "tempctl0";
const MOTORCTL: &str = "motorctl0";
const FN_SET_MOTOR: u32 = 1;
const FN_SET_SETPOINT: u32 = 2;
const FN_ABORT: u32 = 99;

struct Sim {
    values: HashMap<(&'static str, &'static str), Value>,
}

impl Sim {
    fn new() -> Sim {
        Sim {
            values: HashMap::from([
                ((TEMPCTL, "temp"), Value::Double(20.0)),
                ((TEMPCTL, "target_temp"), Value::Double(20.0)),
                ((MOTORCTL, "duty"), Value::Double(0.0)),
            ]),
        }
    }

    fn handle(&mut self, envelope: pb::RequestEnvelope) -> pb::ResponseEnvelope {
        let request_id = envelope.request_id;
        let result = match envelope.request {
            Some(Request::Hello(_)) => Ok(Response::Hello(hello())),
            Some(Request::WaitReady(_)) => Ok(Response::WaitReady(pb::WaitReadyResponse {})),
            Some(Request::ListDevices(_)) => Ok(Response::ListDevices(list_devices())),
            Some(Request::DescribeDevice(req)) => describe_device(&req.device_id)
                .map(Response::DescribeDevice)
                .ok_or_else(|| not_found(format!("unknown device {:?}", req.device_id))),
            Some(Request::ReadSignals(req)) => self.read_signals(&req).map(Response::ReadSignals),
            Some(Request::Call(req)) => self.call(&req).map(Response::Call),
            None => Err(status(
                pb::StatusCode::InvalidArgument,
                "empty request envelope".to_string(),
            )),
        };

        match result {
            Ok(response) => pb::ResponseEnvelope {
                request_id,
                status: Some(pb::Status::ok()),
                response: Some(response),
            },
            Err(status) => pb::ResponseEnvelope {
                request_id,
                status: Some(status),
                response: None,
            },
        }
    }

    fn signal_value(&self, device_id: &str, signal_id: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|((d, s), _)| *d == device_id && *s == signal_id)
            .map(|(_, v)| v)
    }

    fn read_signals(&self, request: &pb::ReadSignalsRequest) -> Result<pb::ReadSignalsResponse, pb::Status> {
        let device = describe_device(&request.device_id)
            .ok_or_else(|| not_found(format!("unknown device {:?}", request.device_id)))?;
        let requested: Vec<String> = if request.signal_ids.is_empty() {
            device.signals.iter().map(|s| s.signal_id.clone()).collect()
        } else {
            request.signal_ids.clone()
        };

        let mut values = Vec::with_capacity(requested.len());
        for id in &requested {
            // All-or-nothing: any unknown signal fails the whole read.
            let value = self
                .signal_value(&request.device_id, id)
                .ok_or_else(|| not_found(format!("unknown signal {id:?}")))?;
            values.push(pb::SignalValue {
                signal_id: id.clone(),
                value: Some(value.to_pb()),
                quality: pb::QualityCode::Ok as i32,
            });
        }
        Ok(pb::ReadSignalsResponse { values })
    }

    fn call(&mut self, request: &pb::CallRequest) -> Result<pb::CallResponse, pb::Status> {
        let arg = |name: &str| {
            request
                .args
                .get(name)
                .and_then(Value::from_pb)
                .ok_or_else(|| {
                    status(
                        pb::StatusCode::InvalidArgument,
                        format!("missing argument {name:?}"),
                    )
                })
        };

        match (request.device_id.as_str(), request.function_id) {
            (TEMPCTL, FN_SET_SETPOINT) => {
                self.values.insert((TEMPCTL, "target_temp"), arg("value")?);
            }
            (MOTORCTL, FN_SET_MOTOR) => {
                self.values.insert((MOTORCTL, "duty"), arg("duty")?);
            }
            (TEMPCTL, FN_ABORT) => {
                // Simulated crash: die without answering.
                eprintln!("anolis-sim-provider: abort requested");
                std::process::exit(4);
            }
            _ => {
                return Err(not_found(format!(
                    "unknown function {} on {:?}",
                    request.function_id, request.device_id
                )))
            }
        }
        Ok(pb::CallResponse::default())
    }
}

fn hello() -> pb::HelloResponse {
    pb::HelloResponse {
        protocol_version: PROTOCOL_VERSION,
        provider_name: "anolis-sim-provider".to_string(),
        provider_version: env!("CARGO_PKG_VERSION").to_string(),
        metadata: HashMap::from([(METADATA_SUPPORTS_WAIT_READY.to_string(), "true".to_string())]),
    }
}

fn list_devices() -> pb::ListDevicesResponse {
    pb::ListDevicesResponse {
        devices: vec![
            pb::DeviceEntry {
                device_id: TEMPCTL.to_string(),
                label: "Simulated temperature controller".to_string(),
            },
            pb::DeviceEntry {
                device_id: MOTORCTL.to_string(),
                label: "Simulated motor controller".to_string(),
            },
        ],
    }
}

fn describe_device(device_id: &str) -> Option<pb::DescribeDeviceResponse> {
    match device_id {
        TEMPCTL => Some(pb::DescribeDeviceResponse {
            device_id: TEMPCTL.to_string(),
            label: "Simulated temperature controller".to_string(),
            signals: vec![
                double_signal("temp", "Current temperature"),
                double_signal("target_temp", "Setpoint"),
            ],
            functions: vec![
                pb::FunctionSpec {
                    function_id: FN_SET_SETPOINT,
                    name: "set_setpoint".to_string(),
                    args: vec![double_arg("value", 0.0, 100.0)],
                },
                pb::FunctionSpec {
                    function_id: FN_ABORT,
                    name: "abort".to_string(),
                    args: vec![],
                },
            ],
        }),
        MOTORCTL => Some(pb::DescribeDeviceResponse {
            device_id: MOTORCTL.to_string(),
            label: "Simulated motor controller".to_string(),
            signals: vec![double_signal("duty", "Duty cycle")],
            functions: vec![pb::FunctionSpec {
                function_id: FN_SET_MOTOR,
                name: "set_motor".to_string(),
                args: vec![double_arg("duty", 0.0, 1.0)],
            }],
        }),
        _ => None,
    }
}

fn double_signal(id: &str, label: &str) -> pb::SignalSpec {
    pb::SignalSpec {
        signal_id: id.to_string(),
        value_type: pb::ValueType::Double as i32,
        poll_hint_hz: None,
        stale_after_ms: None,
        label: label.to_string(),
        auto_poll: true,
    }
}

fn double_arg(name: &str, min: f64, max: f64) -> pb::ArgSpec {
    pb::ArgSpec {
        name: name.to_string(),
        value_type: pb::ValueType::Double as i32,
        required: true,
        min: Some(Value::Double(min).to_pb()),
        max: Some(Value::Double(max).to_pb()),
        allowed_values: vec![],
        description: String::new(),
        unit: String::new(),
    }
}

fn status(code: pb::StatusCode, message: String) -> pb::Status {
    let mut status = pb::Status {
        message,
        ..Default::default()
    };
    status.set_code(code);
    status
}

fn not_found(message: String) -> pb::Status {
    status(pb::StatusCode::NotFound, message)
}
