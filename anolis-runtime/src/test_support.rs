// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

//! In-process provider double and pre-wired registries for unit tests.

use crate::config::{ProviderConfig, RestartPolicy};
use crate::service::device_registry::DeviceRegistry;
use crate::service::events::EventBus;
use crate::service::provider::{ProviderClient, ProviderHandle};
use crate::service::provider_registry::ProviderRegistry;
use crate::service::state_cache::StateCache;
use anolis_common::MutexExt;
use anolis_ipc::IpcError;
use anolis_protocol::{pb, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted in-process provider: two devices mirroring the simulation
/// provider binary (`tempctl0` with a setpoint function, `motorctl0` with a
/// duty function).
pub(crate) struct MockProvider {
    devices: Mutex<Vec<pb::DescribeDeviceResponse>>,
    values: Mutex<HashMap<(String, String), Value>>,
    qualities: Mutex<HashMap<(String, String), pb::QualityCode>>,
    calls: Mutex<Vec<pb::CallRequest>>,
    healthy: AtomicBool,
    include_unknown_signal: AtomicBool,
}

fn double_signal(id: &str, auto_poll: bool) -> pb::SignalSpec {
    let mut spec = pb::SignalSpec {
        signal_id: id.to_string(),
        label: id.to_string(),
        auto_poll,
        ..Default::default()
    };
    spec.set_value_type(pb::ValueType::Double);
    spec
}

fn double_arg(name: &str, min: f64, max: f64) -> pb::ArgSpec {
    let mut arg = pb::ArgSpec {
        name: name.to_string(),
        required: true,
        min: Some(Value::Double(min).to_pb()),
        max: Some(Value::Double(max).to_pb()),
        ..Default::default()
    };
    arg.set_value_type(pb::ValueType::Double);
    arg
}

impl MockProvider {
    pub(crate) fn simulated() -> MockProvider {
        let tempctl = pb::DescribeDeviceResponse {
            device_id: "tempctl0".to_string(),
            label: "Temperature controller".to_string(),
            signals: vec![double_signal("temp", true), double_signal("target_temp", true)],
            functions: vec![pb::FunctionSpec {
                function_id: 2,
                name: "set_setpoint".to_string(),
                args: vec![double_arg("value", 0.0, 100.0)],
            }],
        };
        let motorctl = pb::DescribeDeviceResponse {
            device_id: "motorctl0".to_string(),
            label: "Motor controller".to_string(),
            signals: vec![double_signal("duty", true)],
            functions: vec![pb::FunctionSpec {
                function_id: 1,
                name: "set_motor".to_string(),
                args: vec![double_arg("duty", 0.0, 1.0)],
            }],
        };

        let values = HashMap::from([
            (key("tempctl0", "temp"), Value::Double(20.0)),
            (key("tempctl0", "target_temp"), Value::Double(20.0)),
            (key("motorctl0", "duty"), Value::Double(0.0)),
        ]);

        MockProvider {
            devices: Mutex::new(vec![tempctl, motorctl]),
            values: Mutex::new(values),
            qualities: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            healthy: AtomicBool::new(true),
            include_unknown_signal: AtomicBool::new(false),
        }
    }

    pub(crate) fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Release);
    }

    pub(crate) fn set_include_unknown_signal(&self, include: bool) {
        self.include_unknown_signal.store(include, Ordering::Release);
    }

    pub(crate) fn set_signal(&self, device: &str, signal: &str, value: Value) {
        self.values.lock_or_panic().insert(key(device, signal), value);
    }

    pub(crate) fn set_quality(&self, device: &str, signal: &str, quality: pb::QualityCode) {
        self.qualities
            .lock_or_panic()
            .insert(key(device, signal), quality);
    }

    pub(crate) fn retain_only_device(&self, device_id: &str) {
        self.devices
            .lock_or_panic()
            .retain(|d| d.device_id == device_id);
    }

    pub(crate) fn recorded_calls(&self) -> Vec<pb::CallRequest> {
        self.calls.lock_or_panic().clone()
    }

    fn check_healthy(&self) -> Result<(), IpcError> {
        if self.healthy.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(IpcError::SessionUnhealthy("mock provider down".to_string()))
        }
    }

    fn describe(&self, device_id: &str) -> Option<pb::DescribeDeviceResponse> {
        self.devices
            .lock_or_panic()
            .iter()
            .find(|d| d.device_id == device_id)
            .cloned()
    }
}

fn key(device: &str, signal: &str) -> (String, String) {
    (device.to_string(), signal.to_string())
}

impl ProviderClient for MockProvider {
    fn list_devices(&self) -> Result<pb::ListDevicesResponse, IpcError> {
        self.check_healthy()?;
        Ok(pb::ListDevicesResponse {
            devices: self
                .devices
                .lock_or_panic()
                .iter()
                .map(|d| pb::DeviceEntry {
                    device_id: d.device_id.clone(),
                    label: d.label.clone(),
                })
                .collect(),
        })
    }

    fn describe_device(&self, device_id: &str) -> Result<pb::DescribeDeviceResponse, IpcError> {
        self.check_healthy()?;
        self.describe(device_id).ok_or_else(|| IpcError::Status {
            code: pb::StatusCode::NotFound,
            message: format!("unknown device {device_id:?}"),
        })
    }

    fn read_signals(
        &self,
        device_id: &str,
        signal_ids: &[String],
    ) -> Result<pb::ReadSignalsResponse, IpcError> {
        self.check_healthy()?;
        let device = self.describe(device_id).ok_or_else(|| IpcError::Status {
            code: pb::StatusCode::NotFound,
            message: format!("unknown device {device_id:?}"),
        })?;

        let requested: Vec<String> = if signal_ids.is_empty() {
            device.signals.iter().map(|s| s.signal_id.clone()).collect()
        } else {
            signal_ids.to_vec()
        };

        let values = self.values.lock_or_panic();
        let qualities = self.qualities.lock_or_panic();
        let mut out = Vec::new();
        for id in &requested {
            // All-or-nothing: one unknown signal fails the whole request.
            if !device.signals.iter().any(|s| &s.signal_id == id) {
                return Err(IpcError::Status {
                    code: pb::StatusCode::NotFound,
                    message: format!("unknown signal {id:?}"),
                });
            }
            let mut reading = pb::SignalValue {
                signal_id: id.clone(),
                value: values.get(&key(device_id, id)).map(Value::to_pb),
                ..Default::default()
            };
            reading.set_quality(
                qualities
                    .get(&key(device_id, id))
                    .copied()
                    .unwrap_or(pb::QualityCode::Ok),
            );
            out.push(reading);
        }

        if self.include_unknown_signal.load(Ordering::Acquire) {
            out.push(pb::SignalValue {
                signal_id: "__bogus".to_string(),
                value: Some(Value::Double(0.0).to_pb()),
                ..Default::default()
            });
        }

        Ok(pb::ReadSignalsResponse { values: out })
    }

    fn call(&self, request: pb::CallRequest) -> Result<pb::CallResponse, IpcError> {
        self.check_healthy()?;
        self.calls.lock_or_panic().push(request.clone());

        let arg = |name: &str| {
            request
                .args
                .get(name)
                .and_then(Value::from_pb)
                .ok_or_else(|| IpcError::Status {
                    code: pb::StatusCode::InvalidArgument,
                    message: format!("missing argument {name:?}"),
                })
        };

        match (request.device_id.as_str(), request.function_id) {
            ("tempctl0", 2) => {
                let value = arg("value")?;
                self.set_signal("tempctl0", "target_temp", value);
            }
            ("motorctl0", 1) => {
                let duty = arg("duty")?;
                self.set_signal("motorctl0", "duty", duty);
            }
            _ => {
                return Err(IpcError::Status {
                    code: pb::StatusCode::NotFound,
                    message: format!(
                        "unknown function {} on {:?}",
                        request.function_id, request.device_id
                    ),
                })
            }
        }
        Ok(pb::CallResponse::default())
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    fn probe_process_alive(&self) -> Option<bool> {
        Some(self.healthy.load(Ordering::Acquire))
    }

    fn shutdown(&self) {
        self.healthy.store(false, Ordering::Release);
    }
}

pub(crate) fn sim_provider_config(id: &str) -> ProviderConfig {
    ProviderConfig {
        id: id.to_string(),
        executable: "/usr/bin/true".into(),
        args: vec![],
        operation_timeout_ms: 5_000,
        hello_timeout_ms: 5_000,
        ready_timeout_ms: 30_000,
        shutdown_timeout_ms: 3_000,
        restart: RestartPolicy::default(),
    }
}

/// Registries, cache, and bus wired around one mock provider `sim0` with
/// discovery already run and the cache seeded.
pub(crate) fn sim_runtime_parts() -> (
    Arc<MockProvider>,
    ProviderRegistry,
    Arc<DeviceRegistry>,
    StateCache,
    Arc<EventBus>,
) {
    let provider = Arc::new(MockProvider::simulated());
    let devices = Arc::new(DeviceRegistry::new());
    #[allow(clippy::unwrap_used)]
    devices.discover_provider("sim0", provider.as_ref()).unwrap();

    let providers = ProviderRegistry::new();
    providers.insert(ProviderHandle::new(
        sim_provider_config("sim0"),
        Arc::clone(&provider) as Arc<dyn ProviderClient>,
    ));

    let events = Arc::new(EventBus::new(16, 8));
    let cache = StateCache::new(
        Arc::clone(&devices),
        Arc::clone(&events),
        Duration::from_secs(5),
    );
    cache.initialize();
    (provider, providers, devices, cache, events)
}
