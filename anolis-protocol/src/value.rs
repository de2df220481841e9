// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

use crate::pb;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Owned, typed value as the runtime handles it. The wire form is
/// [`pb::Value`]; conversions in both directions live here so nothing else
/// has to touch the oneof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Double(f64),
    Int64(i64),
    UInt64(u64),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn value_type(&self) -> pb::ValueType {
        match self {
            Value::Double(_) => pb::ValueType::Double,
            Value::Int64(_) => pb::ValueType::Int64,
            Value::UInt64(_) => pb::ValueType::Uint64,
            Value::Bool(_) => pb::ValueType::Bool,
            Value::String(_) => pb::ValueType::String,
            Value::Bytes(_) => pb::ValueType::Bytes,
        }
    }

    /// Decodes a wire value. `None` when the oneof is unset (a provider bug;
    /// callers decide whether that is a protocol violation).
    pub fn from_pb(value: &pb::Value) -> Option<Value> {
        Some(match value.kind.as_ref()? {
            pb::value::Kind::DoubleValue(v) => Value::Double(*v),
            pb::value::Kind::Int64Value(v) => Value::Int64(*v),
            pb::value::Kind::Uint64Value(v) => Value::UInt64(*v),
            pb::value::Kind::BoolValue(v) => Value::Bool(*v),
            pb::value::Kind::StringValue(v) => Value::String(v.clone()),
            pb::value::Kind::BytesValue(v) => Value::Bytes(v.clone()),
        })
    }

    pub fn to_pb(&self) -> pb::Value {
        let kind = match self {
            Value::Double(v) => pb::value::Kind::DoubleValue(*v),
            Value::Int64(v) => pb::value::Kind::Int64Value(*v),
            Value::UInt64(v) => pb::value::Kind::Uint64Value(*v),
            Value::Bool(v) => pb::value::Kind::BoolValue(*v),
            Value::String(v) => pb::value::Kind::StringValue(v.clone()),
            Value::Bytes(v) => pb::value::Kind::BytesValue(v.clone()),
        };
        pb::Value { kind: Some(kind) }
    }

    /// Numeric view used for range checks. Non-numeric values return `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Int64(v) => Some(*v as f64),
            Value::UInt64(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Double(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

/// Worst-of aggregation over signal and device quality.
pub trait QualityCodeExt {
    fn worst(self, other: Self) -> Self;
}

impl QualityCodeExt for pb::QualityCode {
    fn worst(self, other: Self) -> Self {
        self.max(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pb_roundtrip_all_variants() {
        let values = vec![
            Value::Double(50.0),
            Value::Int64(-3),
            Value::UInt64(u64::MAX),
            Value::Bool(true),
            Value::String("duty".to_string()),
            Value::Bytes(vec![0xde, 0xad]),
        ];
        for v in values {
            assert_eq!(Value::from_pb(&v.to_pb()), Some(v));
        }
    }

    #[test]
    fn unset_oneof_is_none() {
        assert_eq!(Value::from_pb(&pb::Value::default()), None);
    }

    #[test]
    fn as_f64_only_for_numerics() {
        assert_eq!(Value::Int64(-2).as_f64(), Some(-2.0));
        assert_eq!(Value::Bool(true).as_f64(), None);
        assert_eq!(Value::String("1".into()).as_f64(), None);
    }

    #[test]
    fn worst_takes_the_more_severe() {
        use pb::QualityCode::*;
        assert_eq!(Ok.worst(Stale), Stale);
        assert_eq!(Fault.worst(Ok), Fault);
        assert_eq!(Unavailable.worst(Stale), Unavailable);
    }
}
