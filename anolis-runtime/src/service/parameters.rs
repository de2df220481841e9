// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

use crate::config::ParameterConfig;
use crate::service::device::validate_value;
use crate::service::events::{EventBus, EventKind};
use anolis_common::MutexExt;
use anolis_protocol::{pb, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One named runtime parameter with its current value and constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub allowed_values: Vec<String>,
    pub description: String,
    pub unit: String,
}

impl Parameter {
    fn from_config(config: &ParameterConfig) -> Parameter {
        Parameter {
            name: config.name.clone(),
            value: config.value.clone(),
            min: config.min.clone(),
            max: config.max.clone(),
            allowed_values: config.allowed_values.clone(),
            description: config.description.clone(),
            unit: config.unit.clone(),
        }
    }
}

/// Configuration-defined parameters, read-only to collaborators except for
/// the validated set entry point. Every accepted change is announced.
pub struct ParameterStore {
    parameters: Mutex<HashMap<String, Parameter>>,
    events: Arc<EventBus>,
}

impl ParameterStore {
    pub fn from_config(configs: &[ParameterConfig], events: Arc<EventBus>) -> ParameterStore {
        ParameterStore {
            parameters: Mutex::new(
                configs
                    .iter()
                    .map(|c| (c.name.clone(), Parameter::from_config(c)))
                    .collect(),
            ),
            events,
        }
    }

    pub fn get(&self, name: &str) -> Option<Parameter> {
        self.parameters.lock_or_panic().get(name).cloned()
    }

    pub fn list(&self) -> Vec<Parameter> {
        let mut all: Vec<_> = self.parameters.lock_or_panic().values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Validates against the parameter's own constraints (declared type,
    /// inclusive bounds, allowed strings), commits, and emits the change.
    pub fn set(&self, name: &str, value: Value) -> Result<(), (pb::StatusCode, String)> {
        let old = {
            let mut parameters = self.parameters.lock_or_panic();
            let Some(parameter) = parameters.get_mut(name) else {
                return Err((
                    pb::StatusCode::NotFound,
                    format!("Unknown parameter: {name}"),
                ));
            };
            validate_value(
                name,
                &value,
                parameter.value.value_type(),
                parameter.min.as_ref(),
                parameter.max.as_ref(),
                &parameter.allowed_values,
            )
            .map_err(|message| (pb::StatusCode::InvalidArgument, message))?;

            let old = parameter.value.clone();
            parameter.value = value.clone();
            old
        };

        if old != value {
            self.events.emit(EventKind::ParameterChange {
                name: name.to_string(),
                old,
                new: value,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::events::EventFilter;

    fn store() -> (ParameterStore, Arc<EventBus>) {
        let events = Arc::new(EventBus::new(16, 4));
        let configs = vec![ParameterConfig {
            name: "max_temp".to_string(),
            value: Value::Double(80.0),
            min: Some(Value::Double(0.0)),
            max: Some(Value::Double(120.0)),
            allowed_values: vec![],
            description: "Temperature ceiling".to_string(),
            unit: "degC".to_string(),
        }];
        (
            ParameterStore::from_config(&configs, Arc::clone(&events)),
            events,
        )
    }

    #[test]
    fn set_validates_and_emits() {
        let (store, events) = store();
        let sub = events.subscribe(EventFilter::default(), None).unwrap();

        store.set("max_temp", Value::Double(90.0)).unwrap();
        assert_eq!(store.get("max_temp").unwrap().value, Value::Double(90.0));

        match sub.try_pop().unwrap().kind {
            EventKind::ParameterChange { name, old, new } => {
                assert_eq!(name, "max_temp");
                assert_eq!(old, Value::Double(80.0));
                assert_eq!(new, Value::Double(90.0));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn out_of_range_set_is_rejected() {
        let (store, _) = store();
        let err = store.set("max_temp", Value::Double(130.0)).unwrap_err();
        assert_eq!(err.0, pb::StatusCode::InvalidArgument);
        assert_eq!(store.get("max_temp").unwrap().value, Value::Double(80.0));
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let (store, _) = store();
        let err = store.set("max_temp", Value::Int64(90)).unwrap_err();
        assert_eq!(err.0, pb::StatusCode::InvalidArgument);
    }

    #[test]
    fn unknown_parameter_is_not_found() {
        let (store, _) = store();
        assert_eq!(
            store.set("ghost", Value::Double(1.0)).unwrap_err().0,
            pb::StatusCode::NotFound
        );
    }

    #[test]
    fn same_value_set_emits_nothing() {
        let (store, events) = store();
        let sub = events.subscribe(EventFilter::default(), None).unwrap();
        store.set("max_temp", Value::Double(80.0)).unwrap();
        assert!(sub.try_pop().is_none());
    }
}
