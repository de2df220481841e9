// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

//! ADPP message types and the typed value model shared by the runtime and
//! its provider-facing IPC layer.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod pb;
mod value;

pub use value::{QualityCodeExt, Value};

/// ADPP protocol version spoken by this crate.
pub const PROTOCOL_VERSION: u32 = 1;

/// Hello metadata key a provider sets to `"true"` to opt into WaitReady.
pub const METADATA_SUPPORTS_WAIT_READY: &str = "supports_wait_ready";

impl pb::Status {
    pub fn ok() -> Self {
        pb::Status::default()
    }

    pub fn is_ok(&self) -> bool {
        self.code() == pb::StatusCode::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn request_envelope_roundtrip() {
        let envelope = pb::RequestEnvelope {
            request_id: 42,
            request: Some(pb::request_envelope::Request::ReadSignals(
                pb::ReadSignalsRequest {
                    device_id: "tempctl0".to_string(),
                    signal_ids: vec!["temp".to_string(), "target_temp".to_string()],
                },
            )),
        };

        let bytes = envelope.encode_to_vec();
        let decoded = pb::RequestEnvelope::decode(bytes.as_slice()).unwrap();
        assert_eq!(envelope, decoded);
    }

    #[test]
    fn response_envelope_roundtrip_with_status() {
        let mut status = pb::Status {
            message: "bad argument".to_string(),
            ..Default::default()
        };
        status.set_code(pb::StatusCode::InvalidArgument);
        let envelope = pb::ResponseEnvelope {
            request_id: 7,
            status: Some(status),
            response: None,
        };

        let decoded = pb::ResponseEnvelope::decode(envelope.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.request_id, 7);
        let status = decoded.status.unwrap();
        assert_eq!(status.code(), pb::StatusCode::InvalidArgument);
        assert!(!status.is_ok());
    }

    #[test]
    fn default_status_is_ok() {
        assert!(pb::Status::ok().is_ok());
    }

    #[test]
    fn quality_orders_by_severity() {
        assert!(pb::QualityCode::Ok < pb::QualityCode::Stale);
        assert!(pb::QualityCode::Stale < pb::QualityCode::Unavailable);
        assert!(pb::QualityCode::Unavailable < pb::QualityCode::Fault);
    }
}
