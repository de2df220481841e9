// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

use crate::service::device::Device;
use crate::service::device_registry::DeviceRegistry;
use crate::service::events::{EventBus, EventKind};
use crate::service::provider_registry::ProviderRegistry;
use anolis_common::MutexExt;
use anolis_protocol::{pb, QualityCodeExt, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Last observation of one signal. `value` is `None` until the first
/// successful read; quality reflects the provider's report combined with
/// freshness at access time.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedSignalValue {
    pub value: Option<Value>,
    pub quality: pb::QualityCode,
    pub observed_at: Instant,
}

impl CachedSignalValue {
    pub fn is_stale(&self, limit: Duration, now: Instant) -> bool {
        self.quality == pb::QualityCode::Stale
            || now.saturating_duration_since(self.observed_at) >= limit
    }
}

/// Per-device view of the cache. Copied out to readers; a single signal
/// value is never torn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceState {
    pub signals: HashMap<String, CachedSignalValue>,
    pub available: bool,
}

impl DeviceState {
    /// Worst-of over the device's signals.
    pub fn quality(&self) -> pb::QualityCode {
        self.signals
            .values()
            .map(|s| s.quality)
            .fold(pb::QualityCode::Ok, |acc, q| acc.worst(q))
    }
}

type Reading = (String, Option<Value>, pb::QualityCode);

/// Authoritative last-known signal state, fed by the periodic poll loop and
/// by targeted post-call polls.
pub struct StateCache {
    // handle -> device state
    entries: Mutex<HashMap<String, DeviceState>>,
    devices: Arc<DeviceRegistry>,
    events: Arc<EventBus>,
    default_stale_after: Duration,
}

impl StateCache {
    pub fn new(
        devices: Arc<DeviceRegistry>,
        events: Arc<EventBus>,
        default_stale_after: Duration,
    ) -> StateCache {
        StateCache {
            entries: Mutex::new(HashMap::new()),
            devices,
            events,
            default_stale_after,
        }
    }

    /// Seeds per-device, per-signal UNAVAILABLE entries for everything the
    /// registry currently knows.
    pub fn initialize(&self) {
        let now = Instant::now();
        let mut entries = self.entries.lock_or_panic();
        for device in self.devices.get_all_devices() {
            entries
                .entry(device.handle())
                .or_insert_with(|| unavailable_state(&device, now));
        }
    }

    /// Replaces the cached entries of one provider with fresh UNAVAILABLE
    /// seeds for its (re)discovered devices.
    pub fn seed_provider(&self, provider_id: &str) {
        let now = Instant::now();
        let prefix = format!("{provider_id}/");
        let mut entries = self.entries.lock_or_panic();
        entries.retain(|handle, _| !handle.starts_with(&prefix));
        for device in self.devices.get_all_devices() {
            if device.provider_id == provider_id {
                entries.insert(device.handle(), unavailable_state(&device, now));
            }
        }
    }

    pub fn remove_provider(&self, provider_id: &str) {
        let prefix = format!("{provider_id}/");
        self.entries
            .lock_or_panic()
            .retain(|handle, _| !handle.starts_with(&prefix));
    }

    /// One poll cycle over every known device. Devices whose provider is
    /// missing or unavailable are marked UNAVAILABLE for this tick.
    pub fn poll_once(&self, providers: &ProviderRegistry) {
        for device in self.devices.get_all_devices() {
            self.poll_device(&device, providers);
        }
    }

    /// Targeted poll used after a successful control call so readers see
    /// the post-call state promptly.
    pub fn poll_device_now(
        &self,
        provider_id: &str,
        device_id: &str,
        providers: &ProviderRegistry,
    ) -> bool {
        match self.devices.get_device_copy(provider_id, device_id) {
            Some(device) => self.poll_device(&device, providers),
            None => false,
        }
    }

    fn poll_device(&self, device: &Device, providers: &ProviderRegistry) -> bool {
        let client = providers
            .get(&device.provider_id)
            .filter(|handle| handle.is_available())
            .map(|handle| Arc::clone(handle.client()));

        let Some(client) = client else {
            self.mark_device_unavailable(device);
            return false;
        };

        let poll_set = device.poll_set();
        match client.read_signals(&device.device_id, &poll_set) {
            Ok(response) => match validate_readings(device, &poll_set, &response) {
                Ok(readings) => {
                    self.commit_update(device, readings);
                    true
                }
                Err(violation) => {
                    warn!(
                        handle = %device.handle(),
                        %violation,
                        "discarding read_signals response"
                    );
                    self.mark_device_unavailable(device);
                    false
                }
            },
            Err(e) => {
                debug!(handle = %device.handle(), error = %e, "signal poll failed");
                self.mark_device_unavailable(device);
                false
            }
        }
    }

    /// Commits readings under one lock acquisition so readers always see a
    /// consistent per-device snapshot. Events go out after the lock drops.
    fn commit_update(&self, device: &Device, readings: Vec<Reading>) {
        let now = Instant::now();
        let handle = device.handle();
        let mut pending = Vec::with_capacity(readings.len() + 1);

        {
            let mut entries = self.entries.lock_or_panic();
            let state = entries.entry(handle).or_default();
            if !state.available {
                state.available = true;
                pending.push(EventKind::DeviceAvailability {
                    provider_id: device.provider_id.clone(),
                    device_id: device.device_id.clone(),
                    available: true,
                });
            }
            for (signal_id, value, quality) in readings {
                pending.push(EventKind::StateUpdate {
                    provider_id: device.provider_id.clone(),
                    device_id: device.device_id.clone(),
                    signal_id: signal_id.clone(),
                    value: value.clone(),
                    quality,
                });
                state.signals.insert(
                    signal_id,
                    CachedSignalValue {
                        value,
                        quality,
                        observed_at: now,
                    },
                );
            }
        }

        for kind in pending {
            self.events.emit(kind);
        }
    }

    fn mark_device_unavailable(&self, device: &Device) {
        let mut flipped = false;
        {
            let mut entries = self.entries.lock_or_panic();
            let state = entries
                .entry(device.handle())
                .or_insert_with(|| unavailable_state(device, Instant::now()));
            if state.available {
                state.available = false;
                flipped = true;
            }
            for signal in state.signals.values_mut() {
                // Keep the last-known value and its timestamp; only the
                // quality degrades.
                signal.quality = pb::QualityCode::Unavailable;
            }
        }
        if flipped {
            self.events.emit(EventKind::DeviceAvailability {
                provider_id: device.provider_id.clone(),
                device_id: device.device_id.clone(),
                available: false,
            });
        }
    }

    pub fn get_signal_value(&self, handle: &str, signal_id: &str) -> Option<CachedSignalValue> {
        self.get_device_state(handle)?.signals.remove(signal_id)
    }

    pub fn get_device_state(&self, handle: &str) -> Option<DeviceState> {
        let mut state = self.entries.lock_or_panic().get(handle).cloned()?;
        if let Some(device) = self.devices.lookup_by_handle(handle) {
            self.apply_freshness(&device, &mut state, Instant::now());
        }
        Some(state)
    }

    pub fn snapshot(&self) -> HashMap<String, DeviceState> {
        let mut snapshot = self.entries.lock_or_panic().clone();
        let now = Instant::now();
        for (handle, state) in snapshot.iter_mut() {
            if let Some(device) = self.devices.lookup_by_handle(handle) {
                self.apply_freshness(&device, state, now);
            }
        }
        snapshot
    }

    /// Degrades OK readings that have outlived their staleness limit. The
    /// stored entry is untouched; only the returned copy changes.
    fn apply_freshness(&self, device: &Device, state: &mut DeviceState, now: Instant) {
        for spec in &device.signals {
            if let Some(value) = state.signals.get_mut(&spec.signal_id) {
                let limit = spec
                    .stale_after_ms
                    .map(Duration::from_millis)
                    .unwrap_or(self.default_stale_after);
                if value.quality == pb::QualityCode::Ok && value.is_stale(limit, now) {
                    value.quality = pb::QualityCode::Stale;
                }
            }
        }
    }
}

fn unavailable_state(device: &Device, now: Instant) -> DeviceState {
    DeviceState {
        signals: device
            .signals
            .iter()
            .map(|spec| {
                (
                    spec.signal_id.clone(),
                    CachedSignalValue {
                        value: None,
                        quality: pb::QualityCode::Unavailable,
                        observed_at: now,
                    },
                )
            })
            .collect(),
        available: false,
    }
}

/// All-or-nothing check: the response must cover exactly the requested
/// signal set. Unknown or missing signals invalidate the whole read.
fn validate_readings(
    device: &Device,
    requested: &[String],
    response: &pb::ReadSignalsResponse,
) -> Result<Vec<Reading>, String> {
    let mut readings = Vec::with_capacity(response.values.len());
    let mut seen = std::collections::HashSet::new();
    for reading in &response.values {
        if !requested.iter().any(|id| id == &reading.signal_id) {
            return Err(format!(
                "response contains unrequested signal {:?}",
                reading.signal_id
            ));
        }
        if device.signal(&reading.signal_id).is_none() {
            return Err(format!("response contains unknown signal {:?}", reading.signal_id));
        }
        if !seen.insert(reading.signal_id.clone()) {
            return Err(format!("response repeats signal {:?}", reading.signal_id));
        }
        readings.push((
            reading.signal_id.clone(),
            reading.value.as_ref().and_then(Value::from_pb),
            reading.quality(),
        ));
    }
    for id in requested {
        if !seen.contains(id) {
            return Err(format!("response is missing signal {id:?}"));
        }
    }
    Ok(readings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::events::EventFilter;
    use crate::test_support::sim_runtime_parts;

    #[test]
    fn initialize_seeds_unavailable_entries() {
        let (_provider, _providers, _devices, cache, _events) = sim_runtime_parts();
        let state = cache.get_device_state("sim0/tempctl0").unwrap();
        assert_eq!(state.quality(), pb::QualityCode::Unavailable);
        assert!(state.signals.values().all(|s| s.value.is_none()));
    }

    #[test]
    fn poll_commits_values_and_emits_updates() {
        let (_provider, providers, _devices, cache, events) = sim_runtime_parts();
        let sub = events.subscribe(EventFilter::default(), Some(64)).unwrap();

        cache.poll_once(&providers);

        let value = cache.get_signal_value("sim0/tempctl0", "temp").unwrap();
        assert_eq!(value.quality, pb::QualityCode::Ok);
        assert_eq!(value.value, Some(Value::Double(20.0)));

        let mut saw_availability = false;
        let mut saw_state_update = false;
        while let Some(event) = sub.try_pop() {
            match event.kind {
                EventKind::DeviceAvailability { available, .. } => {
                    assert!(available);
                    saw_availability = true;
                }
                EventKind::StateUpdate { .. } => saw_state_update = true,
                _ => {}
            }
        }
        assert!(saw_availability);
        assert!(saw_state_update);
    }

    #[test]
    fn unhealthy_provider_marks_devices_unavailable() {
        let (provider, providers, _devices, cache, events) = sim_runtime_parts();
        cache.poll_once(&providers);
        assert_eq!(
            cache.get_device_state("sim0/tempctl0").unwrap().quality(),
            pb::QualityCode::Ok
        );

        let sub = events.subscribe(EventFilter::default(), Some(64)).unwrap();
        provider.set_healthy(false);
        cache.poll_once(&providers);

        let state = cache.get_device_state("sim0/tempctl0").unwrap();
        assert_eq!(state.quality(), pb::QualityCode::Unavailable);
        // Last-known value is retained.
        assert_eq!(
            state.signals.get("temp").unwrap().value,
            Some(Value::Double(20.0))
        );

        let mut saw_unavailable = false;
        while let Some(event) = sub.try_pop() {
            if let EventKind::DeviceAvailability { available: false, .. } = event.kind {
                saw_unavailable = true;
            }
        }
        assert!(saw_unavailable);
    }

    #[test]
    fn timestamps_never_go_backwards() {
        let (_provider, providers, _devices, cache, _events) = sim_runtime_parts();
        cache.poll_once(&providers);
        let first = cache.get_signal_value("sim0/tempctl0", "temp").unwrap();
        cache.poll_once(&providers);
        let second = cache.get_signal_value("sim0/tempctl0", "temp").unwrap();
        assert!(second.observed_at >= first.observed_at);
    }

    #[test]
    fn ok_readings_degrade_to_stale_past_the_limit() {
        let (provider, providers, devices, _cache, events) = sim_runtime_parts();
        // Zero staleness budget: everything is stale the moment it lands.
        let cache = StateCache::new(devices, events, Duration::ZERO);
        cache.initialize();
        let _ = provider;
        cache.poll_once(&providers);
        let value = cache.get_signal_value("sim0/tempctl0", "temp").unwrap();
        assert_eq!(value.quality, pb::QualityCode::Stale);
    }

    #[test]
    fn unrequested_signal_invalidates_the_whole_read() {
        let (provider, providers, _devices, cache, _events) = sim_runtime_parts();
        provider.set_include_unknown_signal(true);
        cache.poll_once(&providers);
        assert_eq!(
            cache.get_device_state("sim0/tempctl0").unwrap().quality(),
            pb::QualityCode::Unavailable
        );
    }

    #[test]
    fn targeted_poll_updates_one_device() {
        let (provider, providers, _devices, cache, _events) = sim_runtime_parts();
        provider.set_signal("tempctl0", "target_temp", Value::Double(50.0));
        assert!(cache.poll_device_now("sim0", "tempctl0", &providers));
        assert_eq!(
            cache
                .get_signal_value("sim0/tempctl0", "target_temp")
                .unwrap()
                .value,
            Some(Value::Double(50.0))
        );
        // The other device was not polled.
        assert_eq!(
            cache.get_device_state("sim0/motorctl0").unwrap().quality(),
            pb::QualityCode::Unavailable
        );
    }

    #[test]
    fn provider_reported_quality_is_kept() {
        let (provider, providers, _devices, cache, _events) = sim_runtime_parts();
        provider.set_quality("tempctl0", "temp", pb::QualityCode::Fault);
        cache.poll_once(&providers);
        let value = cache.get_signal_value("sim0/tempctl0", "temp").unwrap();
        assert_eq!(value.quality, pb::QualityCode::Fault);
        assert_eq!(
            cache.get_device_state("sim0/tempctl0").unwrap().quality(),
            pb::QualityCode::Fault
        );
    }

    #[test]
    fn mock_provider_is_wired_into_the_registry() {
        let (_provider, providers, devices, _cache, _events) = sim_runtime_parts();
        assert_eq!(providers.ids(), vec!["sim0".to_string()]);
        assert_eq!(devices.list_devices().len(), 2);
    }
}
