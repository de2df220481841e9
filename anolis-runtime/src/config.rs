// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

use anolis_ipc::RpcTimeouts;
use anolis_protocol::Value;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

const ENV_ANOLIS_LOG: &str = "ANOLIS_LOG";
const DEFAULT_LOG_LEVEL: &str = "info";

const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
const DEFAULT_STALE_AFTER_MS: u64 = 5_000;
const DEFAULT_SUPERVISION_INTERVAL_MS: u64 = 200;
const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_HELLO_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_READY_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_ATTEMPT_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_SUCCESS_RESET_MS: u64 = 30_000;
const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 16;
const DEFAULT_MAX_SUBSCRIBERS: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("provider id may not be empty")]
    EmptyProviderId,
    #[error("provider id {0:?} contains '/'")]
    SlashInProviderId(String),
    #[error("provider id {0:?} is not unique")]
    DuplicateProvider(String),
    #[error("provider {id}: executable path is empty")]
    EmptyExecutable { id: String },
    #[error("provider {id}: restart max_attempts must be >= 1")]
    ZeroAttempts { id: String },
    #[error("provider {id}: backoff_ms has {got} entries, expected {expected} (one per attempt)")]
    BackoffLength {
        id: String,
        got: usize,
        expected: usize,
    },
    #[error("poll_interval_ms must be > 0")]
    ZeroPollInterval,
    #[error("event queue_capacity must be >= 1")]
    ZeroQueueCapacity,
    #[error("parameter {0:?} is not unique")]
    DuplicateParameter(String),
}

/// Crash-recovery policy for one provider. `backoff_ms` is ordered and has
/// exactly one delay per attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestartPolicy {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub backoff_ms: Vec<u64>,
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
    /// Healthy run length after a restart before the attempt counter resets.
    #[serde(default = "default_success_reset_ms")]
    pub success_reset_ms: u64,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        RestartPolicy {
            enabled: false,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_ms: vec![],
            attempt_timeout_ms: DEFAULT_ATTEMPT_TIMEOUT_MS,
            success_reset_ms: DEFAULT_SUCCESS_RESET_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub executable: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
    #[serde(default = "default_hello_timeout_ms")]
    pub hello_timeout_ms: u64,
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
    #[serde(default)]
    pub restart: RestartPolicy,
}

impl ProviderConfig {
    pub fn rpc_timeouts(&self) -> RpcTimeouts {
        RpcTimeouts {
            operation: Duration::from_millis(self.operation_timeout_ms),
            hello: Duration::from_millis(self.hello_timeout_ms),
            ready: Duration::from_millis(self.ready_timeout_ms),
            shutdown: Duration::from_millis(self.shutdown_timeout_ms),
        }
    }

    /// Timeouts for one supervised restart attempt: the handshake may not
    /// outlive the policy's per-attempt budget.
    pub fn attempt_rpc_timeouts(&self) -> RpcTimeouts {
        let cap = Duration::from_millis(self.restart.attempt_timeout_ms);
        let base = self.rpc_timeouts();
        RpcTimeouts {
            hello: base.hello.min(cap),
            ready: base.ready.min(cap),
            ..base
        }
    }
}

/// What happens to a non-automated call while the runtime is in AUTO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ManualCallPolicy {
    Block,
    Override,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    #[serde(default = "default_event_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_max_subscribers")]
    pub max_subscribers: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        EventConfig {
            queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
            max_subscribers: DEFAULT_MAX_SUBSCRIBERS,
        }
    }
}

/// One named runtime parameter with its constraints. Read-only to
/// collaborators except through the parameter-change entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterConfig {
    pub name: String,
    pub value: Value,
    #[serde(default)]
    pub min: Option<Value>,
    #[serde(default)]
    pub max: Option<Value>,
    #[serde(default)]
    pub allowed_values: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unit: String,
}

/// The validated configuration record the runtime consumes. An external
/// loader (YAML or otherwise) produces this; the runtime only revalidates.
/// Unknown top-level fields are collected into `unknown_fields` and logged
/// as warnings at load, never errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_stale_after_ms")]
    pub default_stale_after_ms: u64,
    #[serde(default = "default_supervision_interval_ms")]
    pub supervision_interval_ms: u64,
    #[serde(default)]
    pub automation_enabled: bool,
    #[serde(default = "default_manual_call_policy")]
    pub manual_call_policy: ManualCallPolicy,
    #[serde(default)]
    pub events: EventConfig,
    #[serde(default)]
    pub parameters: Vec<ParameterConfig>,
    /// Fields the record carries that this runtime does not know about.
    #[serde(flatten)]
    pub unknown_fields: serde_json::Map<String, serde_json::Value>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            providers: vec![],
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            default_stale_after_ms: DEFAULT_STALE_AFTER_MS,
            supervision_interval_ms: DEFAULT_SUPERVISION_INTERVAL_MS,
            automation_enabled: false,
            manual_call_policy: ManualCallPolicy::Block,
            events: EventConfig::default(),
            parameters: vec![],
            unknown_fields: serde_json::Map::new(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_json_file(path: &Path) -> Result<RuntimeConfig, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: RuntimeConfig = serde_json::from_str(&raw)?;
        for field in config.unknown_fields.keys() {
            warn!(%field, "ignoring unknown configuration field");
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.events.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }

        let mut seen = std::collections::HashSet::new();
        for provider in &self.providers {
            if provider.id.is_empty() {
                return Err(ConfigError::EmptyProviderId);
            }
            if provider.id.contains('/') {
                return Err(ConfigError::SlashInProviderId(provider.id.clone()));
            }
            if !seen.insert(provider.id.clone()) {
                return Err(ConfigError::DuplicateProvider(provider.id.clone()));
            }
            if provider.executable.as_os_str().is_empty() {
                return Err(ConfigError::EmptyExecutable {
                    id: provider.id.clone(),
                });
            }
            if provider.restart.enabled {
                if provider.restart.max_attempts == 0 {
                    return Err(ConfigError::ZeroAttempts {
                        id: provider.id.clone(),
                    });
                }
                if provider.restart.backoff_ms.len() != provider.restart.max_attempts as usize {
                    return Err(ConfigError::BackoffLength {
                        id: provider.id.clone(),
                        got: provider.restart.backoff_ms.len(),
                        expected: provider.restart.max_attempts as usize,
                    });
                }
            }
        }

        let mut names = std::collections::HashSet::new();
        for parameter in &self.parameters {
            if !names.insert(parameter.name.clone()) {
                return Err(ConfigError::DuplicateParameter(parameter.name.clone()));
            }
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn default_stale_after(&self) -> Duration {
        Duration::from_millis(self.default_stale_after_ms)
    }

    pub fn supervision_interval(&self) -> Duration {
        Duration::from_millis(self.supervision_interval_ms)
    }
}

/// Environment overrides in front of the config record.
pub struct FromEnv {}

impl FromEnv {
    pub fn log_level() -> String {
        match std::env::var(ENV_ANOLIS_LOG) {
            Ok(level) if !level.is_empty() => level,
            _ => DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}
fn default_attempt_timeout_ms() -> u64 {
    DEFAULT_ATTEMPT_TIMEOUT_MS
}
fn default_success_reset_ms() -> u64 {
    DEFAULT_SUCCESS_RESET_MS
}
fn default_operation_timeout_ms() -> u64 {
    DEFAULT_OPERATION_TIMEOUT_MS
}
fn default_hello_timeout_ms() -> u64 {
    DEFAULT_HELLO_TIMEOUT_MS
}
fn default_ready_timeout_ms() -> u64 {
    DEFAULT_READY_TIMEOUT_MS
}
fn default_shutdown_timeout_ms() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_MS
}
fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}
fn default_stale_after_ms() -> u64 {
    DEFAULT_STALE_AFTER_MS
}
fn default_supervision_interval_ms() -> u64 {
    DEFAULT_SUPERVISION_INTERVAL_MS
}
fn default_manual_call_policy() -> ManualCallPolicy {
    ManualCallPolicy::Block
}
fn default_event_queue_capacity() -> usize {
    DEFAULT_EVENT_QUEUE_CAPACITY
}
fn default_max_subscribers() -> usize {
    DEFAULT_MAX_SUBSCRIBERS
}
