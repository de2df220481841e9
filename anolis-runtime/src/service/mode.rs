// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

use crate::service::events::{EventBus, EventKind};
use anolis_common::MutexExt;
use anolis_protocol::pb;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuntimeMode {
    Idle,
    Manual,
    Auto,
    Fault,
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RuntimeMode::Idle => "IDLE",
            RuntimeMode::Manual => "MANUAL",
            RuntimeMode::Auto => "AUTO",
            RuntimeMode::Fault => "FAULT",
        };
        f.write_str(s)
    }
}

/// The runtime-mode state machine. Startup mode is IDLE, not configurable.
///
/// FAULT recovery requires explicit operator acknowledgment through MANUAL;
/// neither AUTO nor IDLE may bypass it.
pub struct ModeManager {
    mode: Mutex<RuntimeMode>,
    events: Arc<EventBus>,
}

impl ModeManager {
    pub fn new(events: Arc<EventBus>) -> ModeManager {
        ModeManager {
            mode: Mutex::new(RuntimeMode::Idle),
            events,
        }
    }

    pub fn get(&self) -> RuntimeMode {
        *self.mode.lock_or_panic()
    }

    /// Applies the transition matrix. Same-mode is a no-op (accepted, no
    /// event). Disallowed transitions leave the mode unchanged.
    pub fn set(&self, to: RuntimeMode) -> Result<(), (pb::StatusCode, String)> {
        let mut mode = self.mode.lock_or_panic();
        let from = *mode;
        if from == to {
            return Ok(());
        }
        if !transition_allowed(from, to) {
            return Err((
                pb::StatusCode::FailedPrecondition,
                format!("Mode transition {from} -> {to} is not allowed"),
            ));
        }
        *mode = to;
        drop(mode);

        info!(%from, %to, "runtime mode changed");
        self.events.emit(EventKind::ModeChange {
            previous: from,
            new: to,
        });
        Ok(())
    }
}

fn transition_allowed(from: RuntimeMode, to: RuntimeMode) -> bool {
    use RuntimeMode::*;
    matches!(
        (from, to),
        (Idle, Manual)
            | (Idle, Fault)
            | (Manual, Idle)
            | (Manual, Auto)
            | (Manual, Fault)
            | (Auto, Manual)
            | (Auto, Fault)
            | (Fault, Manual)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::events::EventFilter;

    fn manager() -> (ModeManager, Arc<EventBus>) {
        let events = Arc::new(EventBus::new(16, 4));
        (ModeManager::new(Arc::clone(&events)), events)
    }

    #[test]
    fn startup_mode_is_idle() {
        let (manager, _) = manager();
        assert_eq!(manager.get(), RuntimeMode::Idle);
    }

    #[test]
    fn full_transition_matrix() {
        use RuntimeMode::*;
        let allowed = [
            (Idle, Manual),
            (Idle, Fault),
            (Manual, Idle),
            (Manual, Auto),
            (Manual, Fault),
            (Auto, Manual),
            (Auto, Fault),
            (Fault, Manual),
        ];
        for from in [Idle, Manual, Auto, Fault] {
            for to in [Idle, Manual, Auto, Fault] {
                if from == to {
                    continue;
                }
                assert_eq!(
                    transition_allowed(from, to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn rejected_transition_keeps_current_mode() {
        let (manager, _) = manager();
        let err = manager.set(RuntimeMode::Auto).unwrap_err();
        assert_eq!(err.0, pb::StatusCode::FailedPrecondition);
        assert_eq!(manager.get(), RuntimeMode::Idle);
    }

    #[test]
    fn accepted_transition_emits_mode_change() {
        let (manager, events) = manager();
        let sub = events.subscribe(EventFilter::default(), None).unwrap();
        manager.set(RuntimeMode::Manual).unwrap();
        match sub.try_pop().unwrap().kind {
            EventKind::ModeChange { previous, new } => {
                assert_eq!(previous, RuntimeMode::Idle);
                assert_eq!(new, RuntimeMode::Manual);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn same_mode_set_is_a_silent_no_op() {
        let (manager, events) = manager();
        let sub = events.subscribe(EventFilter::default(), None).unwrap();
        manager.set(RuntimeMode::Idle).unwrap();
        assert!(sub.try_pop().is_none());
    }

    #[test]
    fn fault_recovery_goes_through_manual() {
        let (manager, _) = manager();
        manager.set(RuntimeMode::Fault).unwrap();
        assert!(manager.set(RuntimeMode::Auto).is_err());
        assert!(manager.set(RuntimeMode::Idle).is_err());
        manager.set(RuntimeMode::Manual).unwrap();
        manager.set(RuntimeMode::Auto).unwrap();
    }
}
