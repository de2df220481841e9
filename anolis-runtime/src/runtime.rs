// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

use crate::config::{ProviderConfig, RuntimeConfig};
use crate::service::call_router::{CallRequest, CallResult, CallRouter};
use crate::service::device::{format_handle, Device, DeviceSummary};
use crate::service::device_registry::DeviceRegistry;
use crate::service::events::{EventBus, EventFilter, EventKind, Subscription};
use crate::service::mode::{ModeManager, RuntimeMode};
use crate::service::parameters::{Parameter, ParameterStore};
use crate::service::provider::ProviderHandle;
use crate::service::provider_registry::ProviderRegistry;
use crate::service::state_cache::{CachedSignalValue, DeviceState, StateCache};
use crate::service::supervisor::{SupervisionSnapshot, Supervisor};
use anolis_ipc::IpcError;
use anolis_protocol::{pb, Value};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, warn};

/// How finely the worker loops slice their sleeps so shutdown is noticed
/// promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum StartError {
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
    #[error("provider {id} failed to start: {source}")]
    ProviderStart {
        id: String,
        #[source]
        source: IpcError,
    },
}

struct RuntimeInner {
    config: RuntimeConfig,
    providers: ProviderRegistry,
    devices: Arc<DeviceRegistry>,
    cache: Arc<StateCache>,
    router: CallRouter,
    supervisor: Supervisor,
    mode: Arc<ModeManager>,
    events: Arc<EventBus>,
    parameters: ParameterStore,
    stop: AtomicBool,
}

/// Composes the kernel: spawns and supervises providers, runs the poll
/// loop, and fronts the collaborator-facing API. Cheap to clone; all state
/// is shared behind one Arc.
#[derive(Clone)]
pub struct MachineRuntime {
    inner: Arc<RuntimeInner>,
}

impl std::fmt::Debug for MachineRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MachineRuntime").finish_non_exhaustive()
    }
}

impl MachineRuntime {
    /// Validates the config, spawns every configured provider, discovers
    /// devices, and seeds the cache. A provider that fails to start is
    /// handed to the supervisor when its restart policy allows; otherwise
    /// startup fails.
    pub fn start(config: RuntimeConfig) -> Result<MachineRuntime, StartError> {
        config.validate()?;

        let events = Arc::new(EventBus::new(
            config.events.queue_capacity,
            config.events.max_subscribers,
        ));
        let devices = Arc::new(DeviceRegistry::new());
        let cache = Arc::new(StateCache::new(
            Arc::clone(&devices),
            Arc::clone(&events),
            config.default_stale_after(),
        ));
        let mode = Arc::new(ModeManager::new(Arc::clone(&events)));
        let router = CallRouter::new(
            Arc::clone(&mode),
            Arc::clone(&devices),
            Arc::clone(&cache),
            config.manual_call_policy,
        );
        let parameters = ParameterStore::from_config(&config.parameters, Arc::clone(&events));
        let providers = ProviderRegistry::new();
        let supervisor = Supervisor::new();

        for provider_config in &config.providers {
            supervisor.register_provider(&provider_config.id, provider_config.restart.clone());
            match spawn_and_discover(provider_config, &devices) {
                Ok(handle) => {
                    providers.insert(handle);
                }
                Err(e) if provider_config.restart.enabled => {
                    warn!(
                        provider = %provider_config.id,
                        error = %e,
                        "provider failed to start, handing to supervisor"
                    );
                    supervisor.mark_crash_detected(&provider_config.id);
                    if !supervisor.record_crash(&provider_config.id) {
                        error!(provider = %provider_config.id, "restart circuit open at startup");
                    }
                }
                Err(e) => {
                    return Err(StartError::ProviderStart {
                        id: provider_config.id.clone(),
                        source: e,
                    });
                }
            }
        }

        cache.initialize();
        info!(
            providers = providers.len(),
            devices = devices.list_devices().len(),
            "runtime started in IDLE mode"
        );

        Ok(MachineRuntime {
            inner: Arc::new(RuntimeInner {
                config,
                providers,
                devices,
                cache,
                router,
                supervisor,
                mode,
                events,
                parameters,
                stop: AtomicBool::new(false),
            }),
        })
    }

    /// Starts the poll thread and the supervision tick thread.
    pub fn spawn_threads(&self) -> io::Result<Vec<JoinHandle<()>>> {
        let poll = {
            let runtime = self.clone();
            std::thread::Builder::new()
                .name("anolis-poll".to_string())
                .spawn(move || runtime.poll_loop())?
        };
        let supervision = {
            let runtime = self.clone();
            std::thread::Builder::new()
                .name("anolis-supervise".to_string())
                .spawn(move || runtime.supervision_loop())?
        };
        Ok(vec![poll, supervision])
    }

    /// Stops the worker loops and shuts every provider down (EOF, bounded
    /// wait, kill). Idempotent.
    pub fn shutdown(&self) {
        if self.inner.stop.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("runtime shutting down");
        for handle in self.inner.providers.get_all_providers() {
            handle.client().shutdown();
        }
    }

    pub fn is_stopping(&self) -> bool {
        self.inner.stop.load(Ordering::Acquire)
    }

    // ---- kernel API -----------------------------------------------------

    pub fn list_devices(&self) -> Vec<DeviceSummary> {
        self.inner.devices.list_devices()
    }

    pub fn get_capabilities(&self, provider_id: &str, device_id: &str) -> Option<Device> {
        self.inner.devices.get_device_copy(provider_id, device_id)
    }

    pub fn get_all_state(&self) -> HashMap<String, DeviceState> {
        self.inner.cache.snapshot()
    }

    pub fn get_device_state(&self, provider_id: &str, device_id: &str) -> Option<DeviceState> {
        self.inner
            .cache
            .get_device_state(&format_handle(provider_id, device_id))
    }

    pub fn get_signal_value(
        &self,
        provider_id: &str,
        device_id: &str,
        signal_id: &str,
    ) -> Option<CachedSignalValue> {
        self.inner
            .cache
            .get_signal_value(&format_handle(provider_id, device_id), signal_id)
    }

    pub fn execute_call(&self, request: &CallRequest) -> CallResult {
        self.inner.router.execute_call(request, &self.inner.providers)
    }

    pub fn validate_call(&self, request: &CallRequest) -> Result<(), (pb::StatusCode, String)> {
        self.inner.router.validate_call(request)
    }

    pub fn get_mode(&self) -> RuntimeMode {
        self.inner.mode.get()
    }

    pub fn set_mode(&self, mode: RuntimeMode) -> Result<(), (pb::StatusCode, String)> {
        self.inner.mode.set(mode)
    }

    pub fn get_supervision_snapshot(&self, provider_id: &str) -> Option<SupervisionSnapshot> {
        let available = self.provider_available(provider_id);
        self.inner.supervisor.get_snapshot(provider_id, available)
    }

    pub fn get_all_supervision_snapshots(&self) -> Vec<SupervisionSnapshot> {
        self.inner
            .supervisor
            .get_all_snapshots(|id| self.provider_available(id))
    }

    /// Operator acknowledgment: closes an open circuit and zeroes the
    /// recovery state so supervision may spawn the provider again.
    pub fn reset_provider(&self, provider_id: &str) {
        self.inner.supervisor.record_success(provider_id);
    }

    pub fn subscribe(&self, filter: EventFilter, capacity: Option<usize>) -> Option<Subscription> {
        self.inner.events.subscribe(filter, capacity)
    }

    pub fn get_parameter(&self, name: &str) -> Option<Parameter> {
        self.inner.parameters.get(name)
    }

    pub fn list_parameters(&self) -> Vec<Parameter> {
        self.inner.parameters.list()
    }

    pub fn set_parameter(&self, name: &str, value: Value) -> Result<(), (pb::StatusCode, String)> {
        self.inner.parameters.set(name, value)
    }

    // ---- worker loops ---------------------------------------------------

    fn poll_loop(&self) {
        let interval = self.inner.config.poll_interval();
        info!(interval_ms = interval.as_millis() as u64, "poll loop running");
        while !self.inner.stop.load(Ordering::Acquire) {
            let started = Instant::now();
            self.inner.cache.poll_once(&self.inner.providers);
            // The interval is a target: an overrunning cycle rolls straight
            // into the next one.
            self.sleep_until_stop(interval.saturating_sub(started.elapsed()));
        }
    }

    fn supervision_loop(&self) {
        let interval = self.inner.config.supervision_interval();
        while !self.inner.stop.load(Ordering::Acquire) {
            self.supervision_tick();
            self.sleep_until_stop(interval);
        }
    }

    fn sleep_until_stop(&self, mut remaining: Duration) {
        while remaining > Duration::ZERO && !self.inner.stop.load(Ordering::Acquire) {
            let chunk = remaining.min(SLEEP_SLICE);
            std::thread::sleep(chunk);
            remaining = remaining.saturating_sub(chunk);
        }
    }

    /// One supervision pass: heartbeat the healthy, tear down and count the
    /// crashed, respawn those whose backoff elapsed.
    fn supervision_tick(&self) {
        for provider_config in &self.inner.config.providers {
            let id = provider_config.id.as_str();
            let handle = self.inner.providers.get(id);
            let available = handle.as_ref().is_some_and(|h| h.is_available());

            if available {
                self.inner.supervisor.record_heartbeat(id);
                if self.inner.supervisor.should_mark_recovered(id) {
                    self.inner.supervisor.record_success(id);
                }
                continue;
            }

            let newly_detected = self.inner.supervisor.mark_crash_detected(id);
            if newly_detected || handle.is_some() {
                if newly_detected {
                    warn!(provider = id, "provider became unavailable");
                }
                self.teardown_provider(id);
                self.inner.supervisor.record_crash(id);
                continue;
            }

            if self.inner.supervisor.should_restart(id) {
                self.restart_provider(provider_config);
            }
        }
    }

    /// Clears devices and cache entries, announces the loss, and destroys
    /// the dead handle.
    fn teardown_provider(&self, provider_id: &str) {
        let device_ids = self.inner.devices.provider_device_ids(provider_id);
        self.inner.devices.clear_provider_devices(provider_id);
        self.inner.cache.remove_provider(provider_id);
        for device_id in device_ids {
            self.inner.events.emit(EventKind::DeviceAvailability {
                provider_id: provider_id.to_string(),
                device_id,
                available: false,
            });
        }
        if let Some(old) = self.inner.providers.remove(provider_id) {
            old.client().shutdown();
        }
    }

    fn restart_provider(&self, provider_config: &ProviderConfig) {
        let id = provider_config.id.as_str();
        info!(provider = id, "attempting provider restart");
        match ProviderHandle::spawn(provider_config, provider_config.attempt_rpc_timeouts()) {
            Ok(handle) => {
                match self
                    .inner
                    .devices
                    .discover_provider(id, handle.client().as_ref())
                {
                    Ok(count) => {
                        self.inner.cache.seed_provider(id);
                        self.inner.providers.insert(handle);
                        info!(provider = id, devices = count, "provider restarted");
                    }
                    Err(e) => {
                        warn!(provider = id, error = %e, "rediscovery after restart failed");
                        handle.client().shutdown();
                        self.inner.supervisor.record_crash(id);
                    }
                }
            }
            Err(e) => {
                warn!(provider = id, error = %e, "provider restart attempt failed");
                self.inner.supervisor.record_crash(id);
            }
        }
    }

    fn provider_available(&self, provider_id: &str) -> bool {
        self.inner
            .providers
            .get(provider_id)
            .is_some_and(|h| h.is_available())
    }
}

fn spawn_and_discover(
    config: &ProviderConfig,
    devices: &DeviceRegistry,
) -> Result<ProviderHandle, IpcError> {
    let handle = ProviderHandle::spawn(config, config.rpc_timeouts())?;
    if let Err(e) = devices.discover_provider(&config.id, handle.client().as_ref()) {
        handle.client().shutdown();
        return Err(e);
    }
    Ok(handle)
}

impl StartError {
    /// Process exit code for the runtime binary: config errors are 1,
    /// unretryable provider-start failures are 2.
    pub fn exit_code(&self) -> i32 {
        match self {
            StartError::Config(_) => 1,
            StartError::ProviderStart { .. } => 2,
        }
    }
}
