// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

use crate::service::provider::ProviderHandle;
use anolis_common::RwLockExt;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe provider-id → handle map. Readers take Arc snapshots that
/// survive a concurrent restart-driven replacement.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<ProviderHandle>>>,
}

impl ProviderRegistry {
    pub fn new() -> ProviderRegistry {
        ProviderRegistry::default()
    }

    pub fn get(&self, provider_id: &str) -> Option<Arc<ProviderHandle>> {
        self.providers.read_or_panic().get(provider_id).cloned()
    }

    /// Installs or replaces the handle for its provider id.
    pub fn insert(&self, handle: ProviderHandle) -> Arc<ProviderHandle> {
        let handle = Arc::new(handle);
        self.providers
            .write_or_panic()
            .insert(handle.id().to_string(), Arc::clone(&handle));
        handle
    }

    pub fn remove(&self, provider_id: &str) -> Option<Arc<ProviderHandle>> {
        self.providers.write_or_panic().remove(provider_id)
    }

    pub fn get_all_providers(&self) -> Vec<Arc<ProviderHandle>> {
        let mut all: Vec<_> = self.providers.read_or_panic().values().cloned().collect();
        all.sort_by(|a, b| a.id().cmp(b.id()));
        all
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.providers.read_or_panic().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.providers.read_or_panic().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
