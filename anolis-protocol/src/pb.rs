// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

// This file has been automatically generated from build.rs

// This file is @generated by prost-build.
/// A typed signal or argument value.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Value {
    #[prost(oneof = "value::Kind", tags = "1, 2, 3, 4, 5, 6")]
    pub kind: ::core::option::Option<value::Kind>,
}
/// Nested message and enum types in `Value`.
pub mod value {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Kind {
        #[prost(double, tag = "1")]
        DoubleValue(f64),
        #[prost(int64, tag = "2")]
        Int64Value(i64),
        #[prost(uint64, tag = "3")]
        Uint64Value(u64),
        #[prost(bool, tag = "4")]
        BoolValue(bool),
        #[prost(string, tag = "5")]
        StringValue(::prost::alloc::string::String),
        #[prost(bytes, tag = "6")]
        BytesValue(::prost::alloc::vec::Vec<u8>),
    }
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Status {
    #[prost(enumeration = "StatusCode", tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: ::prost::alloc::string::String,
    #[prost(map = "string, string", tag = "3")]
    pub details: ::std::collections::HashMap<
        ::prost::alloc::string::String,
        ::prost::alloc::string::String,
    >,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HelloRequest {
    #[prost(uint32, tag = "1")]
    pub protocol_version: u32,
    #[prost(string, tag = "2")]
    pub client_name: ::prost::alloc::string::String,
}
/// metadata\["supports_wait_ready"\] == "true" opts the provider into a
/// second, long-timeout WaitReady call before discovery.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HelloResponse {
    #[prost(uint32, tag = "1")]
    pub protocol_version: u32,
    #[prost(string, tag = "2")]
    pub provider_name: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub provider_version: ::prost::alloc::string::String,
    #[prost(map = "string, string", tag = "4")]
    pub metadata: ::std::collections::HashMap<
        ::prost::alloc::string::String,
        ::prost::alloc::string::String,
    >,
}
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct WaitReadyRequest {}
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct WaitReadyResponse {}
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ListDevicesRequest {}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeviceEntry {
    #[prost(string, tag = "1")]
    pub device_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub label: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListDevicesResponse {
    #[prost(message, repeated, tag = "1")]
    pub devices: ::prost::alloc::vec::Vec<DeviceEntry>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DescribeDeviceRequest {
    #[prost(string, tag = "1")]
    pub device_id: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignalSpec {
    #[prost(string, tag = "1")]
    pub signal_id: ::prost::alloc::string::String,
    #[prost(enumeration = "ValueType", tag = "2")]
    pub value_type: i32,
    #[prost(double, optional, tag = "3")]
    pub poll_hint_hz: ::core::option::Option<f64>,
    #[prost(uint64, optional, tag = "4")]
    pub stale_after_ms: ::core::option::Option<u64>,
    #[prost(string, tag = "5")]
    pub label: ::prost::alloc::string::String,
    #[prost(bool, tag = "6")]
    pub auto_poll: bool,
}
/// min/max are typed values so that int64/uint64 bounds keep full precision.
/// Bounds are inclusive.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ArgSpec {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(enumeration = "ValueType", tag = "2")]
    pub value_type: i32,
    #[prost(bool, tag = "3")]
    pub required: bool,
    #[prost(message, optional, tag = "4")]
    pub min: ::core::option::Option<Value>,
    #[prost(message, optional, tag = "5")]
    pub max: ::core::option::Option<Value>,
    #[prost(string, repeated, tag = "6")]
    pub allowed_values: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(string, tag = "7")]
    pub description: ::prost::alloc::string::String,
    #[prost(string, tag = "8")]
    pub unit: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FunctionSpec {
    #[prost(uint32, tag = "1")]
    pub function_id: u32,
    #[prost(string, tag = "2")]
    pub name: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "3")]
    pub args: ::prost::alloc::vec::Vec<ArgSpec>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DescribeDeviceResponse {
    #[prost(string, tag = "1")]
    pub device_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub label: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "3")]
    pub signals: ::prost::alloc::vec::Vec<SignalSpec>,
    #[prost(message, repeated, tag = "4")]
    pub functions: ::prost::alloc::vec::Vec<FunctionSpec>,
}
/// An empty signal_ids list selects the device's full signal set.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReadSignalsRequest {
    #[prost(string, tag = "1")]
    pub device_id: ::prost::alloc::string::String,
    #[prost(string, repeated, tag = "2")]
    pub signal_ids: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignalValue {
    #[prost(string, tag = "1")]
    pub signal_id: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub value: ::core::option::Option<Value>,
    #[prost(enumeration = "QualityCode", tag = "3")]
    pub quality: i32,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReadSignalsResponse {
    #[prost(message, repeated, tag = "1")]
    pub values: ::prost::alloc::vec::Vec<SignalValue>,
}
/// function_id wins when both id and name are supplied.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CallRequest {
    #[prost(string, tag = "1")]
    pub device_id: ::prost::alloc::string::String,
    #[prost(uint32, tag = "2")]
    pub function_id: u32,
    #[prost(string, tag = "3")]
    pub function_name: ::prost::alloc::string::String,
    #[prost(map = "string, message", tag = "4")]
    pub args: ::std::collections::HashMap<::prost::alloc::string::String, Value>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CallResponse {
    #[prost(map = "string, message", tag = "1")]
    pub outputs: ::std::collections::HashMap<::prost::alloc::string::String, Value>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestEnvelope {
    #[prost(uint64, tag = "1")]
    pub request_id: u64,
    #[prost(oneof = "request_envelope::Request", tags = "2, 3, 4, 5, 6, 7")]
    pub request: ::core::option::Option<request_envelope::Request>,
}
/// Nested message and enum types in `RequestEnvelope`.
pub mod request_envelope {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Request {
        #[prost(message, tag = "2")]
        Hello(super::HelloRequest),
        #[prost(message, tag = "3")]
        WaitReady(super::WaitReadyRequest),
        #[prost(message, tag = "4")]
        ListDevices(super::ListDevicesRequest),
        #[prost(message, tag = "5")]
        DescribeDevice(super::DescribeDeviceRequest),
        #[prost(message, tag = "6")]
        ReadSignals(super::ReadSignalsRequest),
        #[prost(message, tag = "7")]
        Call(super::CallRequest),
    }
}
/// request_id echoes the request; a mismatch is session-fatal for the
/// runtime side.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResponseEnvelope {
    #[prost(uint64, tag = "1")]
    pub request_id: u64,
    #[prost(message, optional, tag = "2")]
    pub status: ::core::option::Option<Status>,
    #[prost(oneof = "response_envelope::Response", tags = "3, 4, 5, 6, 7, 8")]
    pub response: ::core::option::Option<response_envelope::Response>,
}
/// Nested message and enum types in `ResponseEnvelope`.
pub mod response_envelope {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Response {
        #[prost(message, tag = "3")]
        Hello(super::HelloResponse),
        #[prost(message, tag = "4")]
        WaitReady(super::WaitReadyResponse),
        #[prost(message, tag = "5")]
        ListDevices(super::ListDevicesResponse),
        #[prost(message, tag = "6")]
        DescribeDevice(super::DescribeDeviceResponse),
        #[prost(message, tag = "7")]
        ReadSignals(super::ReadSignalsResponse),
        #[prost(message, tag = "8")]
        Call(super::CallResponse),
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ValueType {
    Unspecified = 0,
    Double = 1,
    Int64 = 2,
    Uint64 = 3,
    Bool = 4,
    String = 5,
    Bytes = 6,
}
impl ValueType {
    /// String value of the enum field names used in the ProtoBuf definition.
    ///
    /// The values are not transformed in any way and thus are considered stable
    /// (if the ProtoBuf definition does not change) and safe for programmatic use.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Unspecified => "VALUE_TYPE_UNSPECIFIED",
            Self::Double => "VALUE_TYPE_DOUBLE",
            Self::Int64 => "VALUE_TYPE_INT64",
            Self::Uint64 => "VALUE_TYPE_UINT64",
            Self::Bool => "VALUE_TYPE_BOOL",
            Self::String => "VALUE_TYPE_STRING",
            Self::Bytes => "VALUE_TYPE_BYTES",
        }
    }
    /// Creates an enum from field names used in the ProtoBuf definition.
    pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
        match value {
            "VALUE_TYPE_UNSPECIFIED" => Some(Self::Unspecified),
            "VALUE_TYPE_DOUBLE" => Some(Self::Double),
            "VALUE_TYPE_INT64" => Some(Self::Int64),
            "VALUE_TYPE_UINT64" => Some(Self::Uint64),
            "VALUE_TYPE_BOOL" => Some(Self::Bool),
            "VALUE_TYPE_BYTES" => Some(Self::Bytes),
            "VALUE_TYPE_STRING" => Some(Self::String),
            _ => None,
        }
    }
}
/// Signal quality, ordered by severity. Worst-of aggregation relies on the
/// numeric order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum QualityCode {
    Ok = 0,
    Stale = 1,
    Unavailable = 2,
    Fault = 3,
}
impl QualityCode {
    /// String value of the enum field names used in the ProtoBuf definition.
    ///
    /// The values are not transformed in any way and thus are considered stable
    /// (if the ProtoBuf definition does not change) and safe for programmatic use.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Ok => "QUALITY_CODE_OK",
            Self::Stale => "QUALITY_CODE_STALE",
            Self::Unavailable => "QUALITY_CODE_UNAVAILABLE",
            Self::Fault => "QUALITY_CODE_FAULT",
        }
    }
    /// Creates an enum from field names used in the ProtoBuf definition.
    pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
        match value {
            "QUALITY_CODE_OK" => Some(Self::Ok),
            "QUALITY_CODE_STALE" => Some(Self::Stale),
            "QUALITY_CODE_UNAVAILABLE" => Some(Self::Unavailable),
            "QUALITY_CODE_FAULT" => Some(Self::Fault),
            _ => None,
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum StatusCode {
    Ok = 0,
    InvalidArgument = 1,
    NotFound = 2,
    FailedPrecondition = 3,
    Unavailable = 4,
    DeadlineExceeded = 5,
    Unimplemented = 6,
    Internal = 7,
}
impl StatusCode {
    /// String value of the enum field names used in the ProtoBuf definition.
    ///
    /// The values are not transformed in any way and thus are considered stable
    /// (if the ProtoBuf definition does not change) and safe for programmatic use.
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Self::Ok => "STATUS_CODE_OK",
            Self::InvalidArgument => "STATUS_CODE_INVALID_ARGUMENT",
            Self::NotFound => "STATUS_CODE_NOT_FOUND",
            Self::FailedPrecondition => "STATUS_CODE_FAILED_PRECONDITION",
            Self::Unavailable => "STATUS_CODE_UNAVAILABLE",
            Self::DeadlineExceeded => "STATUS_CODE_DEADLINE_EXCEEDED",
            Self::Unimplemented => "STATUS_CODE_UNIMPLEMENTED",
            Self::Internal => "STATUS_CODE_INTERNAL",
        }
    }
    /// Creates an enum from field names used in the ProtoBuf definition.
    pub fn from_str_name(value: &str) -> ::core::option::Option<Self> {
        match value {
            "STATUS_CODE_OK" => Some(Self::Ok),
            "STATUS_CODE_INVALID_ARGUMENT" => Some(Self::InvalidArgument),
            "STATUS_CODE_NOT_FOUND" => Some(Self::NotFound),
            "STATUS_CODE_FAILED_PRECONDITION" => Some(Self::FailedPrecondition),
            "STATUS_CODE_UNAVAILABLE" => Some(Self::Unavailable),
            "STATUS_CODE_DEADLINE_EXCEEDED" => Some(Self::DeadlineExceeded),
            "STATUS_CODE_UNIMPLEMENTED" => Some(Self::Unimplemented),
            "STATUS_CODE_INTERNAL" => Some(Self::Internal),
            _ => None,
        }
    }
}
