// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

use crate::service::device::{parse_handle, Device, DeviceSummary};
use crate::service::provider::ProviderClient;
use anolis_common::RwLockExt;
use anolis_ipc::IpcError;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::info;

/// Immutable-per-session store of discovered device capabilities.
/// Many-reader/single-writer; writers appear only at discovery and at the
/// pre-restart clear, and never hold the lock across wire I/O.
#[derive(Default)]
pub struct DeviceRegistry {
    // provider-id -> device-id -> capabilities
    devices: RwLock<HashMap<String, HashMap<String, Device>>>,
}

impl DeviceRegistry {
    pub fn new() -> DeviceRegistry {
        DeviceRegistry::default()
    }

    /// Runs ListDevices + DescribeDevice against the provider, then installs
    /// the resulting set atomically, replacing any prior generation.
    pub fn discover_provider(
        &self,
        provider_id: &str,
        client: &dyn ProviderClient,
    ) -> Result<usize, IpcError> {
        let listing = client.list_devices()?;
        let mut discovered = HashMap::new();
        for entry in &listing.devices {
            let described = client.describe_device(&entry.device_id)?;
            let device = Device::from_describe(provider_id, &described);
            discovered.insert(device.device_id.clone(), device);
        }

        let count = discovered.len();
        self.devices
            .write_or_panic()
            .insert(provider_id.to_string(), discovered);
        info!(provider = provider_id, devices = count, "device discovery complete");
        Ok(count)
    }

    /// Drops every device of the provider. Used ahead of restart-driven
    /// rediscovery so readers never see a half-replaced generation.
    pub fn clear_provider_devices(&self, provider_id: &str) {
        self.devices.write_or_panic().remove(provider_id);
    }

    pub fn get_device_copy(&self, provider_id: &str, device_id: &str) -> Option<Device> {
        self.devices
            .read_or_panic()
            .get(provider_id)
            .and_then(|devices| devices.get(device_id))
            .cloned()
    }

    pub fn get_all_devices(&self) -> Vec<Device> {
        let mut all: Vec<Device> = self
            .devices
            .read_or_panic()
            .values()
            .flat_map(|devices| devices.values().cloned())
            .collect();
        all.sort_by(|a, b| a.handle().cmp(&b.handle()));
        all
    }

    pub fn list_devices(&self) -> Vec<DeviceSummary> {
        self.get_all_devices().iter().map(Device::summary).collect()
    }

    pub fn lookup_by_handle(&self, handle: &str) -> Option<Device> {
        let (provider_id, device_id) = parse_handle(handle)?;
        self.get_device_copy(provider_id, device_id)
    }

    pub fn provider_device_ids(&self, provider_id: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .devices
            .read_or_panic()
            .get(provider_id)
            .map(|devices| devices.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }
}
