// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

use crate::config::ProviderConfig;
use anolis_ipc::{IpcError, RpcClient, RpcTimeouts};
use anolis_protocol::pb;
use std::sync::Arc;

/// Name the runtime introduces itself with in Hello.
pub const CLIENT_NAME: &str = "anolis-core";

/// The wire surface one provider session exposes to the kernel. The real
/// implementation is [`RpcClient`]; tests substitute in-process doubles.
pub trait ProviderClient: Send + Sync {
    fn list_devices(&self) -> Result<pb::ListDevicesResponse, IpcError>;
    fn describe_device(&self, device_id: &str) -> Result<pb::DescribeDeviceResponse, IpcError>;
    fn read_signals(
        &self,
        device_id: &str,
        signal_ids: &[String],
    ) -> Result<pb::ReadSignalsResponse, IpcError>;
    fn call(&self, request: pb::CallRequest) -> Result<pb::CallResponse, IpcError>;
    fn is_healthy(&self) -> bool;
    /// Non-blocking process liveness probe. `None` when indeterminate (wire
    /// busy); the in-flight operation checks liveness itself in that case.
    fn probe_process_alive(&self) -> Option<bool>;
    fn shutdown(&self);
}

impl ProviderClient for RpcClient {
    fn list_devices(&self) -> Result<pb::ListDevicesResponse, IpcError> {
        RpcClient::list_devices(self)
    }

    fn describe_device(&self, device_id: &str) -> Result<pb::DescribeDeviceResponse, IpcError> {
        RpcClient::describe_device(self, device_id)
    }

    fn read_signals(
        &self,
        device_id: &str,
        signal_ids: &[String],
    ) -> Result<pb::ReadSignalsResponse, IpcError> {
        RpcClient::read_signals(self, device_id, signal_ids)
    }

    fn call(&self, request: pb::CallRequest) -> Result<pb::CallResponse, IpcError> {
        RpcClient::call(self, request)
    }

    fn is_healthy(&self) -> bool {
        RpcClient::is_healthy(self)
    }

    fn probe_process_alive(&self) -> Option<bool> {
        RpcClient::probe_process_alive(self)
    }

    fn shutdown(&self) {
        RpcClient::shutdown(self)
    }
}

/// One provider as registered with the runtime: its configuration plus the
/// live session. Replaced wholesale on restart; readers holding the old Arc
/// keep a valid (if dead) object until they drop it.
pub struct ProviderHandle {
    config: ProviderConfig,
    client: Arc<dyn ProviderClient>,
}

impl ProviderHandle {
    pub fn new(config: ProviderConfig, client: Arc<dyn ProviderClient>) -> ProviderHandle {
        ProviderHandle { config, client }
    }

    /// Spawns the provider executable and runs the startup handshake.
    pub fn spawn(config: &ProviderConfig, timeouts: RpcTimeouts) -> Result<ProviderHandle, IpcError> {
        let client = RpcClient::start(&config.executable, &config.args, timeouts, CLIENT_NAME)?;
        Ok(ProviderHandle {
            config: config.clone(),
            client: Arc::new(client),
        })
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn client(&self) -> &Arc<dyn ProviderClient> {
        &self.client
    }

    /// Whether the session is currently serviceable: handshake done, no
    /// fatal wire error since, and the process not observed dead.
    pub fn is_available(&self) -> bool {
        self.client.is_healthy() && self.client.probe_process_alive() != Some(false)
    }
}
