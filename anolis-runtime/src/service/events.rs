// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

use crate::service::mode::RuntimeMode;
use anolis_common::MutexExt;
use anolis_protocol::{pb, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::time::{Duration, Instant, SystemTime};

/// Everything the kernel announces on the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    StateUpdate {
        provider_id: String,
        device_id: String,
        signal_id: String,
        value: Option<Value>,
        quality: pb::QualityCode,
    },
    DeviceAvailability {
        provider_id: String,
        device_id: String,
        available: bool,
    },
    ModeChange {
        previous: RuntimeMode,
        new: RuntimeMode,
    },
    ParameterChange {
        name: String,
        old: Value,
        new: Value,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_id: u64,
    pub timestamp: SystemTime,
    pub kind: EventKind,
}

/// Optional per-subscriber filter. A populated field must match the event's
/// corresponding field; events without that field (mode and parameter
/// changes) only pass an empty filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    pub provider_id: Option<String>,
    pub device_id: Option<String>,
    pub signal_id: Option<String>,
}

impl EventFilter {
    fn matches(&self, kind: &EventKind) -> bool {
        let (provider, device, signal) = match kind {
            EventKind::StateUpdate {
                provider_id,
                device_id,
                signal_id,
                ..
            } => (Some(provider_id), Some(device_id), Some(signal_id)),
            EventKind::DeviceAvailability {
                provider_id,
                device_id,
                ..
            } => (Some(provider_id), Some(device_id), None),
            EventKind::ModeChange { .. } | EventKind::ParameterChange { .. } => (None, None, None),
        };

        fn field_matches(want: &Option<String>, got: Option<&String>) -> bool {
            match want {
                None => true,
                Some(want) => got.is_some_and(|got| got == want),
            }
        }

        field_matches(&self.provider_id, provider)
            && field_matches(&self.device_id, device)
            && field_matches(&self.signal_id, signal)
    }
}

struct SubscriberInner {
    queue: Mutex<VecDeque<Event>>,
    ready: Condvar,
    capacity: usize,
    filter: EventFilter,
    dropped: AtomicU64,
}

impl SubscriberInner {
    /// Enqueue with drop-oldest; never blocks the producer.
    fn offer(&self, event: Event) {
        let mut queue = self.queue.lock_or_panic();
        if queue.len() == self.capacity {
            queue.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        queue.push_back(event);
        drop(queue);
        self.ready.notify_one();
    }
}

/// A live subscription. Dropping it unsubscribes: the bus only holds a weak
/// reference and prunes it on the next emit.
pub struct Subscription {
    inner: Arc<SubscriberInner>,
}

impl Subscription {
    /// Blocking pop with a deadline. `None` on timeout.
    pub fn pop(&self, timeout: Duration) -> Option<Event> {
        let deadline = Instant::now() + timeout;
        let mut queue = self.inner.queue.lock_or_panic();
        loop {
            if let Some(event) = queue.pop_front() {
                return Some(event);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            queue = match self.inner.ready.wait_timeout(queue, remaining) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    pub fn try_pop(&self) -> Option<Event> {
        self.inner.queue.lock_or_panic().pop_front()
    }

    pub fn dropped_count(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    pub fn queue_len(&self) -> usize {
        self.inner.queue.lock_or_panic().len()
    }
}

/// Fan-out pub/sub with bounded, drop-oldest per-subscriber queues. Slow
/// subscribers lose their oldest events; they never slow producers or each
/// other.
pub struct EventBus {
    subscribers: Mutex<Vec<Weak<SubscriberInner>>>,
    next_event_id: AtomicU64,
    default_capacity: usize,
    max_subscribers: usize,
}

impl EventBus {
    pub fn new(default_capacity: usize, max_subscribers: usize) -> EventBus {
        EventBus {
            subscribers: Mutex::new(Vec::new()),
            next_event_id: AtomicU64::new(0),
            default_capacity: default_capacity.max(1),
            max_subscribers,
        }
    }

    /// `None` when the subscriber cap is reached.
    pub fn subscribe(&self, filter: EventFilter, capacity: Option<usize>) -> Option<Subscription> {
        let mut subscribers = self.subscribers.lock_or_panic();
        subscribers.retain(|s| s.strong_count() > 0);
        if subscribers.len() >= self.max_subscribers {
            return None;
        }

        let inner = Arc::new(SubscriberInner {
            queue: Mutex::new(VecDeque::new()),
            ready: Condvar::new(),
            capacity: capacity.unwrap_or(self.default_capacity).max(1),
            filter,
            dropped: AtomicU64::new(0),
        });
        subscribers.push(Arc::downgrade(&inner));
        Some(Subscription { inner })
    }

    /// Non-blocking fan-out. Ids are assigned under the subscriber lock so
    /// they are strictly increasing in delivery order everywhere.
    pub fn emit(&self, kind: EventKind) {
        let mut subscribers = self.subscribers.lock_or_panic();
        subscribers.retain(|s| s.strong_count() > 0);

        let event = Event {
            event_id: self.next_event_id.fetch_add(1, Ordering::Relaxed) + 1,
            timestamp: SystemTime::now(),
            kind,
        };

        for weak in subscribers.iter() {
            if let Some(subscriber) = weak.upgrade() {
                if subscriber.filter.matches(&event.kind) {
                    subscriber.offer(event.clone());
                }
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock_or_panic();
        subscribers.retain(|s| s.strong_count() > 0);
        subscribers.len()
    }
}
