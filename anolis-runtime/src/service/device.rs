// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

use anolis_protocol::{pb, Value};
use serde::Serialize;

/// Builds the canonical `"{provider}/{device}"` handle.
pub fn format_handle(provider_id: &str, device_id: &str) -> String {
    format!("{provider_id}/{device_id}")
}

/// Splits a device handle. Exactly one `/` with non-empty halves.
pub fn parse_handle(handle: &str) -> Option<(&str, &str)> {
    let (provider, device) = handle.split_once('/')?;
    if provider.is_empty() || device.is_empty() || device.contains('/') {
        return None;
    }
    Some((provider, device))
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalSpec {
    pub signal_id: String,
    pub value_type: pb::ValueType,
    pub poll_hint_hz: Option<f64>,
    pub stale_after_ms: Option<u64>,
    pub label: String,
    pub auto_poll: bool,
}

impl SignalSpec {
    pub fn from_pb(spec: &pb::SignalSpec) -> SignalSpec {
        SignalSpec {
            signal_id: spec.signal_id.clone(),
            value_type: spec.value_type(),
            poll_hint_hz: spec.poll_hint_hz,
            stale_after_ms: spec.stale_after_ms,
            label: spec.label.clone(),
            auto_poll: spec.auto_poll,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgSpec {
    pub name: String,
    pub value_type: pb::ValueType,
    pub required: bool,
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub allowed_values: Vec<String>,
    pub description: String,
    pub unit: String,
}

impl ArgSpec {
    pub fn from_pb(spec: &pb::ArgSpec) -> ArgSpec {
        ArgSpec {
            name: spec.name.clone(),
            value_type: spec.value_type(),
            required: spec.required,
            min: spec.min.as_ref().and_then(Value::from_pb),
            max: spec.max.as_ref().and_then(Value::from_pb),
            allowed_values: spec.allowed_values.clone(),
            description: spec.description.clone(),
            unit: spec.unit.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSpec {
    pub function_id: u32,
    pub name: String,
    pub args: Vec<ArgSpec>,
}

impl FunctionSpec {
    pub fn from_pb(spec: &pb::FunctionSpec) -> FunctionSpec {
        FunctionSpec {
            function_id: spec.function_id,
            name: spec.name.clone(),
            args: spec.args.iter().map(ArgSpec::from_pb).collect(),
        }
    }
}

/// One discovered device with its full capability set. Frozen at discovery;
/// a provider restart replaces the whole object.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub provider_id: String,
    pub device_id: String,
    pub label: String,
    pub signals: Vec<SignalSpec>,
    pub functions: Vec<FunctionSpec>,
}

impl Device {
    pub fn from_describe(provider_id: &str, response: &pb::DescribeDeviceResponse) -> Device {
        Device {
            provider_id: provider_id.to_string(),
            device_id: response.device_id.clone(),
            label: response.label.clone(),
            signals: response.signals.iter().map(SignalSpec::from_pb).collect(),
            functions: response
                .functions
                .iter()
                .map(FunctionSpec::from_pb)
                .collect(),
        }
    }

    pub fn handle(&self) -> String {
        format_handle(&self.provider_id, &self.device_id)
    }

    pub fn signal(&self, signal_id: &str) -> Option<&SignalSpec> {
        self.signals.iter().find(|s| s.signal_id == signal_id)
    }

    pub fn function_by_id(&self, function_id: u32) -> Option<&FunctionSpec> {
        self.functions.iter().find(|f| f.function_id == function_id)
    }

    pub fn function_by_name(&self, name: &str) -> Option<&FunctionSpec> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Signals read by the periodic poll: the auto-poll subset, or every
    /// signal when a provider marked none.
    pub fn poll_set(&self) -> Vec<String> {
        let auto: Vec<String> = self
            .signals
            .iter()
            .filter(|s| s.auto_poll)
            .map(|s| s.signal_id.clone())
            .collect();
        if auto.is_empty() {
            self.signals.iter().map(|s| s.signal_id.clone()).collect()
        } else {
            auto
        }
    }

    pub fn summary(&self) -> DeviceSummary {
        DeviceSummary {
            provider_id: self.provider_id.clone(),
            device_id: self.device_id.clone(),
            label: self.label.clone(),
            signal_count: self.signals.len(),
            function_count: self.functions.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSummary {
    pub provider_id: String,
    pub device_id: String,
    pub label: String,
    pub signal_count: usize,
    pub function_count: usize,
}

/// Validates one value against a declared type and constraint set. Shared
/// by call-argument and parameter validation. Bounds are inclusive.
pub fn validate_value(
    name: &str,
    value: &Value,
    value_type: pb::ValueType,
    min: Option<&Value>,
    max: Option<&Value>,
    allowed_values: &[String],
) -> Result<(), String> {
    if value.value_type() != value_type {
        return Err(format!(
            "Argument {name} has type {}, expected {}",
            value.value_type().as_str_name(),
            value_type.as_str_name()
        ));
    }

    if let (Some(min), Some(v)) = (min.and_then(Value::as_f64), value.as_f64()) {
        if v < min {
            return Err(format!("Argument {name} is below minimum: {v} < {min}"));
        }
    }
    if let (Some(max), Some(v)) = (max.and_then(Value::as_f64), value.as_f64()) {
        if v > max {
            return Err(format!("Argument {name} is above maximum: {v} > {max}"));
        }
    }

    if !allowed_values.is_empty() {
        if let Value::String(s) = value {
            if !allowed_values.iter().any(|a| a == s) {
                return Err(format!("Argument {name} is not an allowed value: {s:?}"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_roundtrip() {
        let handle = format_handle("sim0", "tempctl0");
        assert_eq!(parse_handle(&handle), Some(("sim0", "tempctl0")));
    }

    #[test]
    fn malformed_handles_are_rejected() {
        assert_eq!(parse_handle("no-slash"), None);
        assert_eq!(parse_handle("/dev"), None);
        assert_eq!(parse_handle("prov/"), None);
        assert_eq!(parse_handle("a/b/c"), None);
    }

    #[test]
    fn poll_set_prefers_auto_poll_signals() {
        let device = Device {
            provider_id: "p".into(),
            device_id: "d".into(),
            label: String::new(),
            signals: vec![
                SignalSpec {
                    signal_id: "a".into(),
                    value_type: pb::ValueType::Double,
                    poll_hint_hz: None,
                    stale_after_ms: None,
                    label: String::new(),
                    auto_poll: true,
                },
                SignalSpec {
                    signal_id: "b".into(),
                    value_type: pb::ValueType::Double,
                    poll_hint_hz: None,
                    stale_after_ms: None,
                    label: String::new(),
                    auto_poll: false,
                },
            ],
            functions: vec![],
        };
        assert_eq!(device.poll_set(), vec!["a".to_string()]);
    }

    #[test]
    fn poll_set_falls_back_to_all_signals() {
        let device = Device {
            provider_id: "p".into(),
            device_id: "d".into(),
            label: String::new(),
            signals: vec![SignalSpec {
                signal_id: "only".into(),
                value_type: pb::ValueType::Bool,
                poll_hint_hz: None,
                stale_after_ms: None,
                label: String::new(),
                auto_poll: false,
            }],
            functions: vec![],
        };
        assert_eq!(device.poll_set(), vec!["only".to_string()]);
    }

    #[test]
    fn validate_value_bounds_are_inclusive() {
        let min = Value::Double(0.0);
        let max = Value::Double(100.0);
        for v in [0.0, 50.0, 100.0] {
            validate_value(
                "value",
                &Value::Double(v),
                pb::ValueType::Double,
                Some(&min),
                Some(&max),
                &[],
            )
            .unwrap();
        }
        let err = validate_value(
            "value",
            &Value::Double(150.0),
            pb::ValueType::Double,
            Some(&min),
            Some(&max),
            &[],
        )
        .unwrap_err();
        assert!(err.contains("above maximum"));

        let err = validate_value(
            "value",
            &Value::Double(-1.0),
            pb::ValueType::Double,
            Some(&min),
            Some(&max),
            &[],
        )
        .unwrap_err();
        assert!(err.contains("below minimum"));
    }

    #[test]
    fn validate_value_checks_type() {
        let err = validate_value(
            "duty",
            &Value::Int64(1),
            pb::ValueType::Double,
            None,
            None,
            &[],
        )
        .unwrap_err();
        assert!(err.contains("has type"));
    }

    #[test]
    fn validate_value_checks_allowed_strings() {
        let allowed = vec!["slow".to_string(), "fast".to_string()];
        validate_value(
            "speed",
            &Value::String("slow".into()),
            pb::ValueType::String,
            None,
            None,
            &allowed,
        )
        .unwrap();
        let err = validate_value(
            "speed",
            &Value::String("warp".into()),
            pb::ValueType::String,
            None,
            None,
            &allowed,
        )
        .unwrap_err();
        assert!(err.contains("not an allowed value"));
    }
}
