// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

use crate::config::RestartPolicy;
use anolis_common::MutexExt;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Derived lifecycle, computed on demand and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderLifecycle {
    Running,
    Unavailable,
    Restarting,
    CircuitOpen,
}

/// Immutable value copy handed to observers.
///
/// `next_restart_in_ms` is `None` both when healthy and when the circuit is
/// open; `circuit_open` disambiguates the two.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupervisionSnapshot {
    pub provider_id: String,
    pub lifecycle: ProviderLifecycle,
    pub attempt_count: u32,
    pub circuit_open: bool,
    pub crash_detected: bool,
    pub next_restart_in_ms: Option<u64>,
    pub last_healthy_age_ms: Option<u64>,
}

struct Entry {
    policy: RestartPolicy,
    attempt_count: u32,
    circuit_open: bool,
    crash_detected: bool,
    next_restart_at: Option<Instant>,
    process_start: Option<Instant>,
    last_healthy: Option<Instant>,
}

impl Entry {
    fn new(policy: RestartPolicy) -> Entry {
        Entry {
            policy,
            attempt_count: 0,
            circuit_open: false,
            crash_detected: false,
            next_restart_at: None,
            process_start: None,
            last_healthy: None,
        }
    }

    fn next_restart_in_ms(&self, now: Instant) -> Option<u64> {
        if self.attempt_count == 0 || self.circuit_open {
            return None;
        }
        match self.next_restart_at {
            Some(at) if now < at => Some(at.duration_since(now).as_millis() as u64),
            _ => Some(0),
        }
    }

    fn lifecycle(&self, is_available: bool) -> ProviderLifecycle {
        if self.circuit_open {
            ProviderLifecycle::CircuitOpen
        } else if self.attempt_count > 0 {
            ProviderLifecycle::Restarting
        } else if is_available {
            ProviderLifecycle::Running
        } else {
            ProviderLifecycle::Unavailable
        }
    }
}

/// Per-provider crash accounting: attempt counter, ordered backoff schedule,
/// circuit breaker, and the stability window that resets the counter after
/// a healthy run. Short critical sections only; no I/O under the lock.
#[derive(Default)]
pub struct Supervisor {
    entries: Mutex<HashMap<String, Entry>>,
}

impl Supervisor {
    pub fn new() -> Supervisor {
        Supervisor::default()
    }

    /// Installs the policy with zeroed state, replacing any prior entry.
    pub fn register_provider(&self, provider_id: &str, policy: RestartPolicy) {
        self.entries
            .lock_or_panic()
            .insert(provider_id.to_string(), Entry::new(policy));
    }

    /// True iff this is a new crash; repeated detections within one
    /// recovery cycle return false.
    pub fn mark_crash_detected(&self, provider_id: &str) -> bool {
        let mut entries = self.entries.lock_or_panic();
        match entries.get_mut(provider_id) {
            Some(entry) if !entry.crash_detected => {
                entry.crash_detected = true;
                true
            }
            _ => false,
        }
    }

    /// Counts one crash and schedules the next restart. Returns false once
    /// the attempt budget is exhausted and the circuit opens.
    pub fn record_crash(&self, provider_id: &str) -> bool {
        let mut entries = self.entries.lock_or_panic();
        let Some(entry) = entries.get_mut(provider_id) else {
            return false;
        };
        if entry.circuit_open {
            return false;
        }

        entry.attempt_count += 1;
        entry.process_start = None;
        if entry.attempt_count > entry.policy.max_attempts {
            entry.circuit_open = true;
            entry.next_restart_at = None;
            warn!(
                provider = provider_id,
                max_attempts = entry.policy.max_attempts,
                "restart attempts exhausted, circuit open"
            );
            return false;
        }

        let backoff_ms = entry
            .policy
            .backoff_ms
            .get(entry.attempt_count as usize - 1)
            .copied()
            .unwrap_or(0);
        entry.next_restart_at = Some(Instant::now() + Duration::from_millis(backoff_ms));
        info!(
            provider = provider_id,
            attempt = entry.attempt_count,
            backoff_ms,
            "provider crash recorded"
        );
        true
    }

    pub fn should_restart(&self, provider_id: &str) -> bool {
        let entries = self.entries.lock_or_panic();
        let Some(entry) = entries.get(provider_id) else {
            return false;
        };
        entry.policy.enabled
            && !entry.circuit_open
            && entry.next_restart_at.is_some_and(|at| Instant::now() >= at)
    }

    pub fn record_heartbeat(&self, provider_id: &str) {
        let now = Instant::now();
        let mut entries = self.entries.lock_or_panic();
        if let Some(entry) = entries.get_mut(provider_id) {
            entry.last_healthy = Some(now);
            if entry.process_start.is_none() {
                entry.process_start = Some(now);
            }
        }
    }

    /// Whether the post-restart run has been healthy for the stability
    /// window and the attempt counter may reset.
    pub fn should_mark_recovered(&self, provider_id: &str) -> bool {
        let entries = self.entries.lock_or_panic();
        let Some(entry) = entries.get(provider_id) else {
            return false;
        };
        entry.policy.enabled
            && !entry.circuit_open
            && entry.attempt_count > 0
            && entry.process_start.is_some_and(|start| {
                Instant::now().saturating_duration_since(start)
                    >= Duration::from_millis(entry.policy.success_reset_ms)
            })
    }

    /// Resets the recovery state. Also the operator's out-of-band way to
    /// close a recovery cycle after a circuit opened.
    pub fn record_success(&self, provider_id: &str) {
        let mut entries = self.entries.lock_or_panic();
        if let Some(entry) = entries.get_mut(provider_id) {
            entry.attempt_count = 0;
            entry.circuit_open = false;
            entry.crash_detected = false;
            entry.next_restart_at = None;
            entry.process_start = None;
            info!(provider = provider_id, "provider recovery complete");
        }
    }

    pub fn get_snapshot(&self, provider_id: &str, is_available: bool) -> Option<SupervisionSnapshot> {
        let entries = self.entries.lock_or_panic();
        let entry = entries.get(provider_id)?;
        Some(snapshot_of(provider_id, entry, is_available))
    }

    pub fn get_all_snapshots<F>(&self, is_available: F) -> Vec<SupervisionSnapshot>
    where
        F: Fn(&str) -> bool,
    {
        let entries = self.entries.lock_or_panic();
        let mut snapshots: Vec<_> = entries
            .iter()
            .map(|(id, entry)| snapshot_of(id, entry, is_available(id)))
            .collect();
        snapshots.sort_by(|a, b| a.provider_id.cmp(&b.provider_id));
        snapshots
    }
}

fn snapshot_of(provider_id: &str, entry: &Entry, is_available: bool) -> SupervisionSnapshot {
    let now = Instant::now();
    SupervisionSnapshot {
        provider_id: provider_id.to_string(),
        lifecycle: entry.lifecycle(is_available),
        attempt_count: entry.attempt_count,
        circuit_open: entry.circuit_open,
        crash_detected: entry.crash_detected,
        next_restart_in_ms: entry.next_restart_in_ms(now),
        last_healthy_age_ms: entry
            .last_healthy
            .map(|t| now.saturating_duration_since(t).as_millis() as u64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_attempts: u32, backoff_ms: Vec<u64>) -> RestartPolicy {
        RestartPolicy {
            enabled: true,
            max_attempts,
            backoff_ms,
            attempt_timeout_ms: 1_000,
            success_reset_ms: 0,
        }
    }

    #[test]
    fn crash_counting_until_circuit_opens() {
        let supervisor = Supervisor::new();
        supervisor.register_provider("sim0", policy(3, vec![0, 0, 0]));

        assert!(supervisor.record_crash("sim0"));
        assert!(supervisor.record_crash("sim0"));
        assert!(supervisor.record_crash("sim0"));
        // Fourth crash exceeds the budget.
        assert!(!supervisor.record_crash("sim0"));

        let snap = supervisor.get_snapshot("sim0", false).unwrap();
        assert!(snap.circuit_open);
        assert_eq!(snap.lifecycle, ProviderLifecycle::CircuitOpen);
        assert_eq!(snap.next_restart_in_ms, None);
        assert!(!supervisor.should_restart("sim0"));

        // Once open, further crashes neither count nor close it.
        assert!(!supervisor.record_crash("sim0"));
        assert_eq!(
            supervisor.get_snapshot("sim0", false).unwrap().attempt_count,
            4
        );
    }

    #[test]
    fn next_restart_tri_state() {
        let supervisor = Supervisor::new();
        supervisor.register_provider("sim0", policy(2, vec![60_000, 60_000]));

        // Healthy: null.
        assert_eq!(
            supervisor
                .get_snapshot("sim0", true)
                .unwrap()
                .next_restart_in_ms,
            None
        );

        // Inside the backoff window: positive.
        supervisor.record_crash("sim0");
        let remaining = supervisor
            .get_snapshot("sim0", false)
            .unwrap()
            .next_restart_in_ms
            .unwrap();
        assert!(remaining > 0 && remaining <= 60_000);
        assert!(!supervisor.should_restart("sim0"));

        // Circuit open: null again.
        supervisor.record_crash("sim0");
        assert!(!supervisor.record_crash("sim0"));
        let snap = supervisor.get_snapshot("sim0", false).unwrap();
        assert!(snap.circuit_open);
        assert_eq!(snap.next_restart_in_ms, None);
    }

    #[test]
    fn elapsed_backoff_reads_zero_and_allows_restart() {
        let supervisor = Supervisor::new();
        supervisor.register_provider("sim0", policy(2, vec![0, 0]));
        supervisor.record_crash("sim0");
        assert_eq!(
            supervisor
                .get_snapshot("sim0", false)
                .unwrap()
                .next_restart_in_ms,
            Some(0)
        );
        assert!(supervisor.should_restart("sim0"));
    }

    #[test]
    fn crash_detection_is_idempotent_per_cycle() {
        let supervisor = Supervisor::new();
        supervisor.register_provider("sim0", policy(3, vec![0, 0, 0]));
        assert!(supervisor.mark_crash_detected("sim0"));
        assert!(!supervisor.mark_crash_detected("sim0"));
        supervisor.record_success("sim0");
        assert!(supervisor.mark_crash_detected("sim0"));
    }

    #[test]
    fn stability_window_gates_recovery() {
        let supervisor = Supervisor::new();
        let mut p = policy(3, vec![0, 0, 0]);
        p.success_reset_ms = 60_000;
        supervisor.register_provider("sim0", p);

        supervisor.record_crash("sim0");
        supervisor.record_heartbeat("sim0");
        // Healthy, but not long enough yet.
        assert!(!supervisor.should_mark_recovered("sim0"));
    }

    #[test]
    fn record_success_resets_everything() {
        let supervisor = Supervisor::new();
        supervisor.register_provider("sim0", policy(3, vec![0, 0, 0]));
        supervisor.mark_crash_detected("sim0");
        supervisor.record_crash("sim0");
        supervisor.record_heartbeat("sim0");
        assert!(supervisor.should_mark_recovered("sim0"));

        supervisor.record_success("sim0");
        let snap = supervisor.get_snapshot("sim0", true).unwrap();
        assert_eq!(snap.attempt_count, 0);
        assert!(!snap.circuit_open);
        assert!(!snap.crash_detected);
        assert_eq!(snap.next_restart_in_ms, None);
        assert_eq!(snap.lifecycle, ProviderLifecycle::Running);
    }

    #[test]
    fn record_success_closes_an_open_circuit() {
        let supervisor = Supervisor::new();
        supervisor.register_provider("sim0", policy(1, vec![0]));
        supervisor.record_crash("sim0");
        assert!(!supervisor.record_crash("sim0"));
        assert!(supervisor.get_snapshot("sim0", false).unwrap().circuit_open);

        supervisor.record_success("sim0");
        assert!(!supervisor.get_snapshot("sim0", false).unwrap().circuit_open);
    }

    #[test]
    fn lifecycle_derivation() {
        let supervisor = Supervisor::new();
        supervisor.register_provider("sim0", policy(2, vec![60_000, 60_000]));

        assert_eq!(
            supervisor.get_snapshot("sim0", true).unwrap().lifecycle,
            ProviderLifecycle::Running
        );
        assert_eq!(
            supervisor.get_snapshot("sim0", false).unwrap().lifecycle,
            ProviderLifecycle::Unavailable
        );
        supervisor.record_crash("sim0");
        assert_eq!(
            supervisor.get_snapshot("sim0", false).unwrap().lifecycle,
            ProviderLifecycle::Restarting
        );
    }

    #[test]
    fn disabled_policy_never_restarts() {
        let supervisor = Supervisor::new();
        let mut p = policy(2, vec![0, 0]);
        p.enabled = false;
        supervisor.register_provider("sim0", p);
        supervisor.record_crash("sim0");
        assert!(!supervisor.should_restart("sim0"));
    }

    #[test]
    fn unknown_provider_is_inert() {
        let supervisor = Supervisor::new();
        assert!(!supervisor.mark_crash_detected("ghost"));
        assert!(!supervisor.record_crash("ghost"));
        assert!(!supervisor.should_restart("ghost"));
        assert!(supervisor.get_snapshot("ghost", false).is_none());
    }
}
