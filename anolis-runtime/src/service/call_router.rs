// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

use crate::config::ManualCallPolicy;
use crate::service::device::{validate_value, Device, FunctionSpec};
use crate::service::device_registry::DeviceRegistry;
use crate::service::mode::{ModeManager, RuntimeMode};
use crate::service::provider_registry::ProviderRegistry;
use crate::service::state_cache::StateCache;
use anolis_common::MutexExt;
use anolis_protocol::{pb, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// One control call as submitted by a collaborator (gateway, BT engine,
/// CLI). `function_id` wins when both id and name are given.
#[derive(Debug, Clone)]
pub struct CallRequest {
    pub provider_id: String,
    pub device_id: String,
    pub function_id: Option<u32>,
    pub function_name: Option<String>,
    pub args: HashMap<String, Value>,
    pub automated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallResult {
    pub success: bool,
    pub status_code: pb::StatusCode,
    pub error_message: Option<String>,
    pub post_call_poll_triggered: bool,
}

impl CallResult {
    fn ok(post_call_poll_triggered: bool) -> CallResult {
        CallResult {
            success: true,
            status_code: pb::StatusCode::Ok,
            error_message: None,
            post_call_poll_triggered,
        }
    }

    fn rejected(status_code: pb::StatusCode, message: String) -> CallResult {
        CallResult {
            success: false,
            status_code,
            error_message: Some(message),
            post_call_poll_triggered: false,
        }
    }
}

/// Validates and executes control calls: mode gate, lookups, argument
/// validation, per-provider serialization, then the wire call followed by a
/// targeted poll.
pub struct CallRouter {
    mode: Arc<ModeManager>,
    devices: Arc<DeviceRegistry>,
    cache: Arc<StateCache>,
    manual_call_policy: ManualCallPolicy,
    call_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CallRouter {
    pub fn new(
        mode: Arc<ModeManager>,
        devices: Arc<DeviceRegistry>,
        cache: Arc<StateCache>,
        manual_call_policy: ManualCallPolicy,
    ) -> CallRouter {
        CallRouter {
            mode,
            devices,
            cache,
            manual_call_policy,
            call_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn execute_call(&self, request: &CallRequest, providers: &ProviderRegistry) -> CallResult {
        // 1. Mode gate, before anything touches the wire.
        let mode = self.mode.get();
        match mode {
            RuntimeMode::Idle | RuntimeMode::Fault => {
                return CallResult::rejected(
                    pb::StatusCode::FailedPrecondition,
                    format!("Calls are not permitted in {mode} mode"),
                );
            }
            RuntimeMode::Auto if !request.automated => match self.manual_call_policy {
                ManualCallPolicy::Block => {
                    return CallResult::rejected(
                        pb::StatusCode::FailedPrecondition,
                        "Manual call blocked in AUTO mode".to_string(),
                    );
                }
                ManualCallPolicy::Override => {}
            },
            _ => {}
        }

        // 2. Provider lookup.
        let Some(handle) = providers.get(&request.provider_id) else {
            return CallResult::rejected(
                pb::StatusCode::NotFound,
                format!("Unknown provider: {}", request.provider_id),
            );
        };
        if !handle.is_available() {
            return CallResult::rejected(
                pb::StatusCode::Unavailable,
                format!("Provider {} is not available", request.provider_id),
            );
        }

        // 3/4. Device, function, and argument validation.
        let (_device, function) = match self.resolve(request) {
            Ok(resolved) => resolved,
            Err((code, message)) => return CallResult::rejected(code, message),
        };

        // 5. Per-provider serialization; all wire traffic for one provider
        // passes through this lock.
        let call_lock = self.call_lock(&request.provider_id);
        let _guard = call_lock.lock_or_panic();

        // 6. The call itself.
        let wire_request = pb::CallRequest {
            device_id: request.device_id.clone(),
            function_id: function.function_id,
            function_name: function.name.clone(),
            args: request
                .args
                .iter()
                .map(|(name, value)| (name.clone(), value.to_pb()))
                .collect(),
        };
        if let Err(e) = handle.client().call(wire_request) {
            return CallResult {
                success: false,
                status_code: e.status_code(),
                error_message: Some(e.to_string()),
                post_call_poll_triggered: false,
            };
        }

        // 7. Targeted poll so readers observe the post-call state promptly.
        let polled =
            self.cache
                .poll_device_now(&request.provider_id, &request.device_id, providers);
        debug!(
            provider = %request.provider_id,
            device = %request.device_id,
            function = %function.name,
            polled,
            "control call executed"
        );
        CallResult::ok(polled)
    }

    /// Pure validation entry point: device/function/argument checks without
    /// the mode gate and without wire traffic.
    pub fn validate_call(&self, request: &CallRequest) -> Result<(), (pb::StatusCode, String)> {
        self.resolve(request).map(|_| ())
    }

    fn resolve(
        &self,
        request: &CallRequest,
    ) -> Result<(Device, FunctionSpec), (pb::StatusCode, String)> {
        let device = self
            .devices
            .get_device_copy(&request.provider_id, &request.device_id)
            .ok_or_else(|| {
                (
                    pb::StatusCode::NotFound,
                    format!(
                        "Unknown device: {}/{}",
                        request.provider_id, request.device_id
                    ),
                )
            })?;

        let function = match (request.function_id, request.function_name.as_deref()) {
            (Some(id), _) => device.function_by_id(id).ok_or_else(|| {
                (
                    pb::StatusCode::NotFound,
                    format!("Unknown function id {id} on {}", device.handle()),
                )
            })?,
            (None, Some(name)) => device.function_by_name(name).ok_or_else(|| {
                (
                    pb::StatusCode::NotFound,
                    format!("Unknown function {name:?} on {}", device.handle()),
                )
            })?,
            (None, None) => {
                return Err((
                    pb::StatusCode::InvalidArgument,
                    "Call names neither a function id nor a function name".to_string(),
                ))
            }
        }
        .clone();

        for arg_spec in &function.args {
            match request.args.get(&arg_spec.name) {
                None if arg_spec.required => {
                    return Err((
                        pb::StatusCode::InvalidArgument,
                        format!("Missing required argument: {}", arg_spec.name),
                    ))
                }
                None => {}
                Some(value) => validate_value(
                    &arg_spec.name,
                    value,
                    arg_spec.value_type,
                    arg_spec.min.as_ref(),
                    arg_spec.max.as_ref(),
                    &arg_spec.allowed_values,
                )
                .map_err(|message| (pb::StatusCode::InvalidArgument, message))?,
            }
        }
        for name in request.args.keys() {
            if !function.args.iter().any(|a| &a.name == name) {
                return Err((
                    pb::StatusCode::InvalidArgument,
                    format!("Unknown argument: {name}"),
                ));
            }
        }

        Ok((device, function))
    }

    /// Get-or-insert of the per-provider lock under one exclusive critical
    /// section, so a provider's lock is never constructed twice.
    fn call_lock(&self, provider_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.call_locks.lock_or_panic();
        Arc::clone(locks.entry(provider_id.to_string()).or_default())
    }

    #[cfg(test)]
    fn call_lock_count(&self) -> usize {
        self.call_locks.lock_or_panic().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sim_runtime_parts;

    struct Fixture {
        provider: Arc<crate::test_support::MockProvider>,
        providers: ProviderRegistry,
        router: CallRouter,
        mode: Arc<ModeManager>,
        cache: Arc<StateCache>,
    }

    fn fixture(policy: ManualCallPolicy) -> Fixture {
        let (provider, providers, devices, cache, events) = sim_runtime_parts();
        let cache = Arc::new(cache);
        let mode = Arc::new(ModeManager::new(events));
        let router = CallRouter::new(
            Arc::clone(&mode),
            devices,
            Arc::clone(&cache),
            policy,
        );
        Fixture {
            provider,
            providers,
            router,
            mode,
            cache,
        }
    }

    fn setpoint_call(value: f64) -> CallRequest {
        CallRequest {
            provider_id: "sim0".to_string(),
            device_id: "tempctl0".to_string(),
            function_id: Some(2),
            function_name: None,
            args: HashMap::from([("value".to_string(), Value::Double(value))]),
            automated: false,
        }
    }

    #[test]
    fn happy_call_in_manual_mode() {
        let f = fixture(ManualCallPolicy::Block);
        f.mode.set(RuntimeMode::Manual).unwrap();

        let result = f.router.execute_call(&setpoint_call(50.0), &f.providers);
        assert!(result.success, "{result:?}");
        assert_eq!(result.status_code, pb::StatusCode::Ok);
        assert!(result.post_call_poll_triggered);

        let value = f
            .cache
            .get_signal_value("sim0/tempctl0", "target_temp")
            .unwrap();
        assert_eq!(value.value, Some(Value::Double(50.0)));
        assert_eq!(value.quality, pb::QualityCode::Ok);
    }

    #[test]
    fn idle_mode_rejects_without_wire_traffic() {
        let f = fixture(ManualCallPolicy::Block);
        let result = f.router.execute_call(&setpoint_call(50.0), &f.providers);
        assert!(!result.success);
        assert_eq!(result.status_code, pb::StatusCode::FailedPrecondition);
        assert!(f.provider.recorded_calls().is_empty());
    }

    #[test]
    fn fault_mode_rejects_even_automated_calls() {
        let f = fixture(ManualCallPolicy::Override);
        f.mode.set(RuntimeMode::Fault).unwrap();
        let mut request = setpoint_call(50.0);
        request.automated = true;
        let result = f.router.execute_call(&request, &f.providers);
        assert_eq!(result.status_code, pb::StatusCode::FailedPrecondition);
        assert!(f.provider.recorded_calls().is_empty());
    }

    #[test]
    fn auto_mode_blocks_manual_calls_under_block_policy() {
        let f = fixture(ManualCallPolicy::Block);
        f.mode.set(RuntimeMode::Manual).unwrap();
        f.mode.set(RuntimeMode::Auto).unwrap();

        let request = CallRequest {
            provider_id: "sim0".to_string(),
            device_id: "motorctl0".to_string(),
            function_id: None,
            function_name: Some("set_motor".to_string()),
            args: HashMap::from([("duty".to_string(), Value::Double(0.75))]),
            automated: false,
        };
        let result = f.router.execute_call(&request, &f.providers);
        assert_eq!(result.status_code, pb::StatusCode::FailedPrecondition);
        assert!(result
            .error_message
            .as_deref()
            .unwrap()
            .contains("blocked in AUTO"));
        assert!(f.provider.recorded_calls().is_empty());
    }

    #[test]
    fn auto_mode_override_policy_lets_manual_calls_through() {
        let f = fixture(ManualCallPolicy::Override);
        f.mode.set(RuntimeMode::Manual).unwrap();
        f.mode.set(RuntimeMode::Auto).unwrap();
        let result = f.router.execute_call(&setpoint_call(42.0), &f.providers);
        assert!(result.success, "{result:?}");
    }

    #[test]
    fn auto_mode_always_accepts_automated_calls() {
        let f = fixture(ManualCallPolicy::Block);
        f.mode.set(RuntimeMode::Manual).unwrap();
        f.mode.set(RuntimeMode::Auto).unwrap();
        let mut request = setpoint_call(42.0);
        request.automated = true;
        assert!(f.router.execute_call(&request, &f.providers).success);
    }

    #[test]
    fn unknown_provider_is_not_found() {
        let f = fixture(ManualCallPolicy::Block);
        f.mode.set(RuntimeMode::Manual).unwrap();
        let mut request = setpoint_call(1.0);
        request.provider_id = "ghost".to_string();
        let result = f.router.execute_call(&request, &f.providers);
        assert_eq!(result.status_code, pb::StatusCode::NotFound);
    }

    #[test]
    fn unavailable_provider_is_reported() {
        let f = fixture(ManualCallPolicy::Block);
        f.mode.set(RuntimeMode::Manual).unwrap();
        f.provider.set_healthy(false);
        let result = f.router.execute_call(&setpoint_call(1.0), &f.providers);
        assert_eq!(result.status_code, pb::StatusCode::Unavailable);
    }

    #[test]
    fn argument_validation_matches_the_spec_messages() {
        let f = fixture(ManualCallPolicy::Block);

        let err = f.router.validate_call(&setpoint_call(150.0)).unwrap_err();
        assert_eq!(err.0, pb::StatusCode::InvalidArgument);
        assert!(err.1.contains("above maximum"));

        let mut missing = setpoint_call(0.0);
        missing.args.clear();
        let err = f.router.validate_call(&missing).unwrap_err();
        assert!(err.1.contains("Missing required argument: value"));

        f.router.validate_call(&setpoint_call(0.0)).unwrap();
        f.router.validate_call(&setpoint_call(100.0)).unwrap();
    }

    #[test]
    fn unknown_argument_is_invalid() {
        let f = fixture(ManualCallPolicy::Block);
        let mut request = setpoint_call(10.0);
        request
            .args
            .insert("extra".to_string(), Value::Bool(true));
        let err = f.router.validate_call(&request).unwrap_err();
        assert!(err.1.contains("Unknown argument: extra"));
    }

    #[test]
    fn function_id_wins_over_name() {
        let f = fixture(ManualCallPolicy::Block);
        f.mode.set(RuntimeMode::Manual).unwrap();
        let mut request = setpoint_call(30.0);
        request.function_name = Some("set_motor".to_string());
        let result = f.router.execute_call(&request, &f.providers);
        assert!(result.success, "{result:?}");
        let calls = f.provider.recorded_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function_name, "set_setpoint");
    }

    #[test]
    fn unknown_device_and_function_are_not_found() {
        let f = fixture(ManualCallPolicy::Block);
        let mut request = setpoint_call(1.0);
        request.device_id = "ghostctl".to_string();
        assert_eq!(
            f.router.validate_call(&request).unwrap_err().0,
            pb::StatusCode::NotFound
        );

        let mut request = setpoint_call(1.0);
        request.function_id = Some(99);
        assert_eq!(
            f.router.validate_call(&request).unwrap_err().0,
            pb::StatusCode::NotFound
        );
    }

    #[test]
    fn one_call_lock_per_provider() {
        let f = fixture(ManualCallPolicy::Block);
        f.mode.set(RuntimeMode::Manual).unwrap();
        f.router.execute_call(&setpoint_call(1.0), &f.providers);
        f.router.execute_call(&setpoint_call(2.0), &f.providers);
        assert_eq!(f.router.call_lock_count(), 1);
    }
}
