// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

use crate::child::ChildProcess;
use crate::error::IpcError;
use crate::framed::ChildChannel;
use anolis_common::MutexExt;
use anolis_protocol::pb::{self, request_envelope::Request, response_envelope::Response};
use anolis_protocol::{METADATA_SUPPORTS_WAIT_READY, PROTOCOL_VERSION};
use prost::Message;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How often the response wait loop wakes to re-check liveness.
const RESPONSE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Per-request-kind deadlines, taken from the provider's configuration.
#[derive(Debug, Clone, Copy)]
pub struct RpcTimeouts {
    pub operation: Duration,
    pub hello: Duration,
    pub ready: Duration,
    pub shutdown: Duration,
}

impl Default for RpcTimeouts {
    fn default() -> Self {
        RpcTimeouts {
            operation: Duration::from_secs(5),
            hello: Duration::from_secs(5),
            ready: Duration::from_secs(30),
            shutdown: Duration::from_secs(3),
        }
    }
}

// Field order matters: dropping the channel half-closes stdin before the
// child handle runs its EOF-then-kill shutdown.
struct Session {
    channel: ChildChannel,
    child: ChildProcess,
}

/// Blocking ADPP request/response client for one provider process.
///
/// One request is in flight at a time (the session mutex), request ids are
/// monotonic, and any wire-level failure latches the session unhealthy so
/// later calls fail fast until the supervisor replaces the client.
pub struct RpcClient {
    session: Mutex<Session>,
    request_id: AtomicU64,
    healthy: AtomicBool,
    last_error: Mutex<Option<String>>,
    last_status_code: AtomicI32,
    timeouts: RpcTimeouts,
    hello: pb::HelloResponse,
}

impl RpcClient {
    /// Spawns the provider and performs the startup handshake: Hello, then
    /// WaitReady when the provider's metadata opts in.
    pub fn start(
        executable: &Path,
        args: &[String],
        timeouts: RpcTimeouts,
        client_name: &str,
    ) -> Result<RpcClient, IpcError> {
        let (child, channel) = ChildProcess::spawn(executable, args, timeouts.shutdown)?;
        let mut client = RpcClient {
            session: Mutex::new(Session { channel, child }),
            request_id: AtomicU64::new(0),
            healthy: AtomicBool::new(true),
            last_error: Mutex::new(None),
            last_status_code: AtomicI32::new(pb::StatusCode::Ok as i32),
            timeouts,
            hello: pb::HelloResponse::default(),
        };

        let hello_req = Request::Hello(pb::HelloRequest {
            protocol_version: PROTOCOL_VERSION,
            client_name: client_name.to_string(),
        });
        client.hello = match client.request(hello_req, timeouts.hello)? {
            Response::Hello(h) => h,
            other => {
                return Err(IpcError::Protocol(format!(
                    "hello answered with {}",
                    response_kind(&other)
                )))
            }
        };
        debug!(
            provider = %client.hello.provider_name,
            version = %client.hello.provider_version,
            "provider handshake complete"
        );

        if client.supports_wait_ready() {
            match client.request(Request::WaitReady(pb::WaitReadyRequest {}), timeouts.ready) {
                Ok(_) => {}
                Err(IpcError::Status {
                    code: pb::StatusCode::Unimplemented,
                    ..
                }) => {
                    // Advertised but not honored: downgrade, don't fail the
                    // session.
                    warn!(
                        provider = %client.hello.provider_name,
                        "provider advertised supports_wait_ready but rejected WaitReady, \
                         continuing without readiness gate"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok(client)
    }

    pub fn supports_wait_ready(&self) -> bool {
        self.hello
            .metadata
            .get(METADATA_SUPPORTS_WAIT_READY)
            .is_some_and(|v| v == "true")
    }

    pub fn hello_info(&self) -> &pb::HelloResponse {
        &self.hello
    }

    pub fn timeouts(&self) -> RpcTimeouts {
        self.timeouts
    }

    pub fn list_devices(&self) -> Result<pb::ListDevicesResponse, IpcError> {
        match self.request(
            Request::ListDevices(pb::ListDevicesRequest {}),
            self.timeouts.operation,
        )? {
            Response::ListDevices(r) => Ok(r),
            other => Err(IpcError::Protocol(format!(
                "list_devices answered with {}",
                response_kind(&other)
            ))),
        }
    }

    pub fn describe_device(&self, device_id: &str) -> Result<pb::DescribeDeviceResponse, IpcError> {
        match self.request(
            Request::DescribeDevice(pb::DescribeDeviceRequest {
                device_id: device_id.to_string(),
            }),
            self.timeouts.operation,
        )? {
            Response::DescribeDevice(r) => Ok(r),
            other => Err(IpcError::Protocol(format!(
                "describe_device answered with {}",
                response_kind(&other)
            ))),
        }
    }

    pub fn read_signals(
        &self,
        device_id: &str,
        signal_ids: &[String],
    ) -> Result<pb::ReadSignalsResponse, IpcError> {
        match self.request(
            Request::ReadSignals(pb::ReadSignalsRequest {
                device_id: device_id.to_string(),
                signal_ids: signal_ids.to_vec(),
            }),
            self.timeouts.operation,
        )? {
            Response::ReadSignals(r) => Ok(r),
            other => Err(IpcError::Protocol(format!(
                "read_signals answered with {}",
                response_kind(&other)
            ))),
        }
    }

    pub fn call(&self, request: pb::CallRequest) -> Result<pb::CallResponse, IpcError> {
        match self.request(Request::Call(request), self.timeouts.operation)? {
            Response::Call(r) => Ok(r),
            other => Err(IpcError::Protocol(format!(
                "call answered with {}",
                response_kind(&other)
            ))),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock_or_panic().clone()
    }

    pub fn last_status_code(&self) -> pb::StatusCode {
        pb::StatusCode::try_from(self.last_status_code.load(Ordering::Relaxed))
            .unwrap_or(pb::StatusCode::Internal)
    }

    /// Non-blocking liveness probe. `None` when the wire is busy; the
    /// in-flight call performs its own liveness checks in that case.
    pub fn probe_process_alive(&self) -> Option<bool> {
        match self.session.try_lock() {
            Ok(mut session) => Some(session.child.is_running()),
            Err(_) => None,
        }
    }

    /// EOF-then-kill shutdown of the provider process.
    pub fn shutdown(&self) {
        let mut session = self.session.lock_or_panic();
        session.channel.close_stdin();
        session.child.shutdown(self.timeouts.shutdown);
    }

    fn request(&self, request: Request, timeout: Duration) -> Result<Response, IpcError> {
        if !self.healthy.load(Ordering::Acquire) {
            let msg = self
                .last_error
                .lock_or_panic()
                .clone()
                .unwrap_or_else(|| "session poisoned".to_string());
            return Err(IpcError::SessionUnhealthy(msg));
        }

        let mut session = self.session.lock_or_panic();
        let request_id = self.request_id.fetch_add(1, Ordering::Relaxed) + 1;
        let envelope = pb::RequestEnvelope {
            request_id,
            request: Some(request),
        };
        let result = self.request_locked(&mut session, &envelope, timeout);
        drop(session);

        match result {
            Ok(response) => {
                self.last_status_code
                    .store(pb::StatusCode::Ok as i32, Ordering::Relaxed);
                Ok(response)
            }
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    fn request_locked(
        &self,
        session: &mut Session,
        envelope: &pb::RequestEnvelope,
        timeout: Duration,
    ) -> Result<Response, IpcError> {
        session
            .channel
            .write_frame(&envelope.encode_to_vec(), timeout)?;

        // Wait in small increments so a dead child is noticed well before
        // the full deadline.
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(IpcError::Timeout(timeout));
            }
            if session
                .channel
                .wait_for_data(remaining.min(RESPONSE_POLL_INTERVAL))?
            {
                break;
            }
            if !session.child.is_running() {
                return Err(IpcError::ProcessExited);
            }
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(IpcError::Timeout(timeout));
        }
        let frame = session.channel.read_frame(remaining)?;
        let response = pb::ResponseEnvelope::decode(frame.as_slice())?;
        check_envelope(envelope, response)
    }

    fn record_failure(&self, error: &IpcError) {
        self.last_status_code
            .store(error.status_code() as i32, Ordering::Relaxed);
        *self.last_error.lock_or_panic() = Some(error.to_string());
        if error.is_session_fatal() && self.healthy.swap(false, Ordering::AcqRel) {
            warn!(error = %error, "provider session marked unhealthy");
        }
    }
}

/// Validates one response envelope against the request that produced it:
/// id echo, status, then payload kind.
fn check_envelope(
    request: &pb::RequestEnvelope,
    response: pb::ResponseEnvelope,
) -> Result<Response, IpcError> {
    if response.request_id != request.request_id {
        return Err(IpcError::Protocol(format!(
            "response id {} does not match request id {}",
            response.request_id, request.request_id
        )));
    }

    let status = response
        .status
        .ok_or_else(|| IpcError::Protocol("response carries no status".to_string()))?;
    if !status.is_ok() {
        return Err(IpcError::Status {
            code: status.code(),
            message: status.message,
        });
    }

    let payload = response
        .response
        .ok_or_else(|| IpcError::Protocol("OK response carries no payload".to_string()))?;
    let request_payload = request
        .request
        .as_ref()
        .ok_or_else(|| IpcError::Protocol("request envelope carries no payload".to_string()))?;
    if !response_matches(request_payload, &payload) {
        return Err(IpcError::Protocol(format!(
            "{} request answered with {}",
            request_kind(request_payload),
            response_kind(&payload)
        )));
    }
    Ok(payload)
}

fn response_matches(request: &Request, response: &Response) -> bool {
    matches!(
        (request, response),
        (Request::Hello(_), Response::Hello(_))
            | (Request::WaitReady(_), Response::WaitReady(_))
            | (Request::ListDevices(_), Response::ListDevices(_))
            | (Request::DescribeDevice(_), Response::DescribeDevice(_))
            | (Request::ReadSignals(_), Response::ReadSignals(_))
            | (Request::Call(_), Response::Call(_))
    )
}

fn request_kind(request: &Request) -> &'static str {
    match request {
        Request::Hello(_) => "hello",
        Request::WaitReady(_) => "wait_ready",
        Request::ListDevices(_) => "list_devices",
        Request::DescribeDevice(_) => "describe_device",
        Request::ReadSignals(_) => "read_signals",
        Request::Call(_) => "call",
    }
}

fn response_kind(response: &Response) -> &'static str {
    match response {
        Response::Hello(_) => "hello",
        Response::WaitReady(_) => "wait_ready",
        Response::ListDevices(_) => "list_devices",
        Response::DescribeDevice(_) => "describe_device",
        Response::ReadSignals(_) => "read_signals",
        Response::Call(_) => "call",
    }
}
