// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

pub mod call_router;
pub mod device;
pub mod device_registry;
pub mod events;
pub mod mode;
pub mod parameters;
pub mod provider;
pub mod provider_registry;
pub mod state_cache;
pub mod supervisor;

// public types we want at the top level of service:: scope
pub use call_router::{CallRequest, CallResult, CallRouter};
pub use device::{Device, DeviceSummary};
pub use device_registry::DeviceRegistry;
pub use events::{Event, EventBus, EventFilter, EventKind, Subscription};
pub use mode::{ModeManager, RuntimeMode};
pub use parameters::{Parameter, ParameterStore};
pub use provider::{ProviderClient, ProviderHandle};
pub use provider_registry::ProviderRegistry;
pub use state_cache::{CachedSignalValue, DeviceState, StateCache};
pub use supervisor::{ProviderLifecycle, SupervisionSnapshot, Supervisor};
